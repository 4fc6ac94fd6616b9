//! Creation/update audit metadata and soft-delete flag
//!
//! Every persisted entity embeds an [`AuditMeta`]. Deletes are always
//! logical: `deleted` rows stay in storage but are invisible to every read
//! path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::ActorId;

/// Audit trail carried by every entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditMeta {
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// User who created the record
    pub created_by: ActorId,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
    /// User who last updated the record
    pub updated_by: ActorId,
    /// Logical-delete flag
    pub deleted: bool,
}

impl AuditMeta {
    /// Stamp a freshly created record
    pub fn new(actor: ActorId) -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            created_by: actor,
            updated_at: now,
            updated_by: actor,
            deleted: false,
        }
    }

    /// Stamp an update
    pub fn touch(&mut self, actor: ActorId) {
        self.updated_at = Utc::now();
        self.updated_by = actor;
    }
}
