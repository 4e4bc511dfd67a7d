//! Activity log and event naming for sequence template changes.
//!
//! Each persisted change produces one activity entry and one platform
//! event. Both are written best-effort after a successful write; a failure
//! to record either never changes the outcome of the request.

use std::fmt;

/// Entity type name used for sequence template activity and events.
pub const ENTITY_SEQUENCE_TEMPLATE: &str = "sequence_template";

/// A persisted change to a sequence template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceChange {
    Created,
    Updated,
    Deactivated,
}

impl SequenceChange {
    pub const ALL: [SequenceChange; 3] = [Self::Created, Self::Updated, Self::Deactivated];

    /// Action recorded in `activity_log.action`.
    pub fn action(self) -> &'static str {
        match self {
            Self::Created => "sequence_template_created",
            Self::Updated => "sequence_template_updated",
            Self::Deactivated => "sequence_template_deactivated",
        }
    }

    /// Dot-separated platform event name. Must match a seeded
    /// `event_types.name`.
    pub fn event_name(self) -> &'static str {
        match self {
            Self::Created => "sequence_template.created",
            Self::Updated => "sequence_template.updated",
            Self::Deactivated => "sequence_template.deactivated",
        }
    }
}

impl fmt::Display for SequenceChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.action())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_and_event_names_line_up() {
        for change in SequenceChange::ALL {
            let (prefix, verb) = change.event_name().split_once('.').unwrap();
            assert_eq!(prefix, ENTITY_SEQUENCE_TEMPLATE);
            assert_eq!(change.action(), format!("{prefix}_{verb}"));
        }
    }

    #[test]
    fn display_is_the_action() {
        assert_eq!(SequenceChange::Deactivated.to_string(), "sequence_template_deactivated");
    }
}
