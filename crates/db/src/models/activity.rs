//! Activity log model.

use outreach_core::types::DbId;

/// Insert DTO for a new activity entry.
#[derive(Debug, Clone)]
pub struct NewActivity<'a> {
    pub actor_user_id: Option<DbId>,
    pub action: &'a str,
    pub entity_type: &'a str,
    pub entity_id: Option<DbId>,
    pub details: serde_json::Value,
}
