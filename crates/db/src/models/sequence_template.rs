//! Sequence template model.

use outreach_core::error::CoreError;
use outreach_core::sequence::CampaignSequenceStep;
use outreach_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `sequence_templates` table.
///
/// `steps` holds the validated step list exactly as the assembler produced
/// it. It is only ever written as a whole.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SequenceTemplate {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub service_id: Option<String>,
    pub schedule_definition_id: Option<DbId>,
    pub steps: serde_json::Value,
    pub version: i32,
    pub is_active: bool,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl SequenceTemplate {
    /// Decode the stored step list.
    pub fn decode_steps(&self) -> Result<Vec<CampaignSequenceStep>, CoreError> {
        serde_json::from_value(self.steps.clone()).map_err(|e| {
            CoreError::Internal(format!(
                "sequence template {} has unreadable steps: {e}",
                self.id
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use outreach_core::sequence::Channel;
    use serde_json::json;

    fn row(steps: serde_json::Value) -> SequenceTemplate {
        SequenceTemplate {
            id: 7,
            name: "Row".to_string(),
            description: None,
            service_id: None,
            schedule_definition_id: None,
            steps,
            version: 1,
            is_active: true,
            created_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn stored_steps_decode() {
        let template = row(json!([{
            "order": 1,
            "channel": "sms",
            "content_template_id": "tpl-1",
            "delay_days": 0,
            "send_at": "09:00"
        }]));
        let steps = template.decode_steps().unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].channel, Channel::Sms);
    }

    #[test]
    fn corrupt_steps_are_an_internal_error() {
        let template = row(json!({"not": "a list"}));
        match template.decode_steps() {
            Err(CoreError::Internal(msg)) => assert!(msg.contains("sequence template 7")),
            other => panic!("expected internal error, got {other:?}"),
        }
    }
}
