//! Canonical step types for sequence templates.
//!
//! A [`CampaignSequenceStep`] only ever holds canonical values. Legacy mirror
//! fields (`wait_days`, `send_time`) are derived on output through
//! [`StepOutput`] and never stored.

use std::fmt;

use chrono::NaiveTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// Outbound channel a step is delivered through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Sms,
    Whatsapp,
    Linkedin,
}

impl Channel {
    /// All channels, in display order.
    pub const ALL: [Channel; 4] = [
        Channel::Email,
        Channel::Sms,
        Channel::Whatsapp,
        Channel::Linkedin,
    ];

    /// Parse a channel name. Matching is case-insensitive and ignores
    /// surrounding whitespace.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Invalid channel '{value}'. Must be one of: email, sms, whatsapp, linkedin"
                ))
            })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Sms => "sms",
            Channel::Whatsapp => "whatsapp",
            Channel::Linkedin => "linkedin",
        }
    }

    /// Only email steps carry a subject line.
    pub fn requires_subject(self) -> bool {
        matches!(self, Channel::Email)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SendAt
// ---------------------------------------------------------------------------

/// Fixed 24-hour time of day, written strictly as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SendAt(NaiveTime);

impl SendAt {
    /// Parse a strict `HH:MM` string (`00`–`23` hours, `00`–`59` minutes).
    ///
    /// Single-digit hours (`9:00`), seconds (`09:00:00`) and surrounding
    /// whitespace are all rejected.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        let invalid = || {
            CoreError::Validation(format!(
                "send_at '{value}' must be a 24-hour time in HH:MM format"
            ))
        };

        let bytes = value.as_bytes();
        if bytes.len() != 5 || bytes[2] != b':' {
            return Err(invalid());
        }
        let digits = [bytes[0], bytes[1], bytes[3], bytes[4]];
        if !digits.iter().all(u8::is_ascii_digit) {
            return Err(invalid());
        }

        let hour = u32::from(digits[0] - b'0') * 10 + u32::from(digits[1] - b'0');
        let minute = u32::from(digits[2] - b'0') * 10 + u32::from(digits[3] - b'0');
        NaiveTime::from_hms_opt(hour, minute, 0)
            .map(SendAt)
            .ok_or_else(invalid)
    }

    /// Build from hour and minute components.
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(SendAt)
    }

    pub fn time(self) -> NaiveTime {
        self.0
    }
}

impl fmt::Display for SendAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl Serialize for SendAt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SendAt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        SendAt::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Branch conditions
// ---------------------------------------------------------------------------

/// Behavioral event a branch reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchSlot {
    OnOpened,
    OnClicked,
    OnReplied,
    OnIgnored,
}

impl BranchSlot {
    pub const ALL: [BranchSlot; 4] = [
        BranchSlot::OnOpened,
        BranchSlot::OnClicked,
        BranchSlot::OnReplied,
        BranchSlot::OnIgnored,
    ];

    /// Canonical (snake_case) slot name, used in error messages and output.
    pub fn as_str(self) -> &'static str {
        match self {
            BranchSlot::OnOpened => "on_opened",
            BranchSlot::OnClicked => "on_clicked",
            BranchSlot::OnReplied => "on_replied",
            BranchSlot::OnIgnored => "on_ignored",
        }
    }

    fn camel_case(self) -> &'static str {
        match self {
            BranchSlot::OnOpened => "onOpened",
            BranchSlot::OnClicked => "onClicked",
            BranchSlot::OnReplied => "onReplied",
            BranchSlot::OnIgnored => "onIgnored",
        }
    }
}

impl fmt::Display for BranchSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Next-step targets keyed by recipient behavior. Every slot is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchConditions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_opened: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_clicked: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_replied: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_ignored: Option<u32>,
}

impl BranchConditions {
    pub fn target(&self, slot: BranchSlot) -> Option<u32> {
        match slot {
            BranchSlot::OnOpened => self.on_opened,
            BranchSlot::OnClicked => self.on_clicked,
            BranchSlot::OnReplied => self.on_replied,
            BranchSlot::OnIgnored => self.on_ignored,
        }
    }

    fn set(&mut self, slot: BranchSlot, target: Option<u32>) {
        match slot {
            BranchSlot::OnOpened => self.on_opened = target,
            BranchSlot::OnClicked => self.on_clicked = target,
            BranchSlot::OnReplied => self.on_replied = target,
            BranchSlot::OnIgnored => self.on_ignored = target,
        }
    }

    /// Non-null targets in slot order.
    pub fn targets(&self) -> impl Iterator<Item = (BranchSlot, u32)> + '_ {
        BranchSlot::ALL
            .into_iter()
            .filter_map(|slot| self.target(slot).map(|t| (slot, t)))
    }

    pub fn is_empty(&self) -> bool {
        self.targets().next().is_none()
    }

    /// Parse a raw branch-condition value.
    ///
    /// Accepts `null`, an object keyed by `on_opened`/`onOpened` (and the
    /// other three slots), or a JSON-encoded string holding such an object.
    /// Targets may be integers or integer strings; `null` targets are unset.
    pub fn parse(value: &Value) -> Result<Self, CoreError> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::String(raw) if raw.trim().is_empty() => Ok(Self::default()),
            Value::String(raw) => match serde_json::from_str::<Value>(raw) {
                Ok(decoded @ (Value::Object(_) | Value::Null)) => Self::parse(&decoded),
                _ => Err(not_an_object()),
            },
            Value::Object(map) => {
                let mut conditions = Self::default();
                for slot in BranchSlot::ALL {
                    let raw = map
                        .get(slot.camel_case())
                        .filter(|v| !v.is_null())
                        .or_else(|| map.get(slot.as_str()));
                    let target = match raw {
                        None | Some(Value::Null) => None,
                        Some(v) => Some(parse_target(slot, v)?),
                    };
                    conditions.set(slot, target);
                }
                Ok(conditions)
            }
            _ => Err(not_an_object()),
        }
    }
}

fn not_an_object() -> CoreError {
    CoreError::Validation("branch_conditions must be an object".to_string())
}

fn parse_target(slot: BranchSlot, value: &Value) -> Result<u32, CoreError> {
    let number = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or_else(|| CoreError::Validation(format!("branch target {slot} must be a step number")))?;

    u32::try_from(number)
        .ok()
        .filter(|n| *n >= 1)
        .ok_or_else(|| {
            CoreError::Validation(format!("branch target {slot} references non-existent step"))
        })
}

// ---------------------------------------------------------------------------
// Attachments
// ---------------------------------------------------------------------------

/// Opaque document handle attached to a step. Passed through unvalidated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Human-readable size, e.g. `"2.4 MB"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, alias = "webUrl", skip_serializing_if = "Option::is_none")]
    pub web_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

// ---------------------------------------------------------------------------
// CampaignSequenceStep
// ---------------------------------------------------------------------------

/// One validated step of a sequence template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignSequenceStep {
    /// 1-based dense position within the template.
    pub order: u32,
    pub channel: Channel,
    /// Reference to an externally resolved content template.
    pub content_template_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Whole days elapsed since the previous step's dispatch.
    pub delay_days: u32,
    pub send_at: SendAt,
    #[serde(default, skip_serializing_if = "BranchConditions::is_empty")]
    pub branch_conditions: BranchConditions,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

/// Serialization view of a step with the legacy mirrors filled in.
///
/// Older clients still read `wait_days` and `send_time`; both are derived
/// from the canonical fields here and nowhere else.
#[derive(Debug, Serialize)]
pub struct StepOutput<'a> {
    #[serde(flatten)]
    pub step: &'a CampaignSequenceStep,
    pub wait_days: u32,
    pub send_time: SendAt,
}

impl<'a> From<&'a CampaignSequenceStep> for StepOutput<'a> {
    fn from(step: &'a CampaignSequenceStep) -> Self {
        Self {
            step,
            wait_days: step.delay_days,
            send_time: step.send_at,
        }
    }
}

/// `serialize_with` helper that writes every step as a [`StepOutput`].
pub fn serialize_with_mirrors<S: Serializer>(
    steps: &[CampaignSequenceStep],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(steps.iter().map(StepOutput::from))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    // -- Channel ------------------------------------------------------------

    #[test]
    fn channel_parse_is_case_insensitive() {
        assert_eq!(Channel::parse("Email").unwrap(), Channel::Email);
        assert_eq!(Channel::parse(" WhatsApp ").unwrap(), Channel::Whatsapp);
        assert_eq!(Channel::parse("linkedin").unwrap(), Channel::Linkedin);
    }

    #[test]
    fn channel_parse_rejects_unknown() {
        assert_matches!(Channel::parse("fax"), Err(CoreError::Validation(_)));
        assert_matches!(Channel::parse(""), Err(CoreError::Validation(_)));
    }

    #[test]
    fn only_email_requires_subject() {
        assert!(Channel::Email.requires_subject());
        assert!(!Channel::Sms.requires_subject());
        assert!(!Channel::Whatsapp.requires_subject());
        assert!(!Channel::Linkedin.requires_subject());
    }

    // -- SendAt -------------------------------------------------------------

    #[test]
    fn send_at_accepts_valid_times() {
        assert_eq!(SendAt::parse("00:00").unwrap().to_string(), "00:00");
        assert_eq!(SendAt::parse("09:30").unwrap().to_string(), "09:30");
        assert_eq!(SendAt::parse("23:59").unwrap().to_string(), "23:59");
    }

    #[test]
    fn send_at_rejects_malformed_times() {
        for bad in ["9:00", "25:00", "", "12:60", "24:00", "09:00:00", " 9:00", "ab:cd", "0900"] {
            assert_matches!(
                SendAt::parse(bad),
                Err(CoreError::Validation(_)),
                "expected {:?} to be rejected",
                bad
            );
        }
    }

    #[test]
    fn send_at_serializes_as_string() {
        let value = serde_json::to_value(SendAt::from_hm(7, 5).unwrap()).unwrap();
        assert_eq!(value, json!("07:05"));
        let back: SendAt = serde_json::from_value(json!("07:05")).unwrap();
        assert_eq!(back, SendAt::from_hm(7, 5).unwrap());
    }

    // -- BranchConditions ---------------------------------------------------

    #[test]
    fn branch_conditions_accept_both_casings() {
        let parsed = BranchConditions::parse(&json!({
            "onOpened": 2,
            "on_replied": "3",
            "on_ignored": null
        }))
        .unwrap();
        assert_eq!(parsed.on_opened, Some(2));
        assert_eq!(parsed.on_replied, Some(3));
        assert_eq!(parsed.on_clicked, None);
        assert_eq!(parsed.on_ignored, None);
    }

    #[test]
    fn branch_conditions_accept_encoded_string() {
        let parsed = BranchConditions::parse(&json!("{\"onClicked\": 4}")).unwrap();
        assert_eq!(parsed.on_clicked, Some(4));
        assert!(BranchConditions::parse(&json!("")).unwrap().is_empty());
    }

    #[test]
    fn branch_conditions_reject_non_object() {
        assert_matches!(
            BranchConditions::parse(&json!([1, 2])),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            BranchConditions::parse(&json!("not json")),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn branch_target_must_be_a_positive_number() {
        let err = BranchConditions::parse(&json!({"on_opened": "soon"})).unwrap_err();
        assert!(err.to_string().contains("on_opened"));

        let err = BranchConditions::parse(&json!({"on_clicked": 0})).unwrap_err();
        assert!(err
            .to_string()
            .contains("branch target on_clicked references non-existent step"));
    }

    #[test]
    fn targets_iterates_in_slot_order() {
        let conditions = BranchConditions {
            on_ignored: Some(1),
            on_opened: Some(3),
            ..Default::default()
        };
        let targets: Vec<_> = conditions.targets().collect();
        assert_eq!(
            targets,
            vec![(BranchSlot::OnOpened, 3), (BranchSlot::OnIgnored, 1)]
        );
    }

    // -- StepOutput ---------------------------------------------------------

    #[test]
    fn step_output_derives_legacy_mirrors() {
        let step = CampaignSequenceStep {
            order: 2,
            channel: Channel::Sms,
            content_template_id: "tpl-1".to_string(),
            subject: None,
            body: Some("Hi".to_string()),
            delay_days: 3,
            send_at: SendAt::parse("10:15").unwrap(),
            branch_conditions: BranchConditions::default(),
            attachments: Vec::new(),
        };

        let value = serde_json::to_value(StepOutput::from(&step)).unwrap();
        assert_eq!(value["delay_days"], 3);
        assert_eq!(value["wait_days"], 3);
        assert_eq!(value["send_at"], "10:15");
        assert_eq!(value["send_time"], "10:15");
        assert_eq!(value["channel"], "sms");
        assert!(value.get("branch_conditions").is_none());
    }
}
