//! Identity records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An authenticated principal as persisted by the identity store.
#[derive(Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    /// Lower-cased, unique across all identities.
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub(crate) password_hash: String,
    pub is_active: bool,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    /// Build a new, active, non-admin identity.
    pub fn new(
        email: String,
        password_hash: String,
        first_name: Option<String>,
        last_name: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            first_name,
            last_name,
            password_hash,
            is_active: true,
            is_admin: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn view(&self) -> IdentityView {
        IdentityView::from(self)
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("is_active", &self.is_active)
            .field("is_admin", &self.is_admin)
            .finish_non_exhaustive()
    }
}

/// Public shape of an identity returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityView {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: bool,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Identity> for IdentityView {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id,
            email: identity.email.clone(),
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
            is_active: identity.is_active,
            is_admin: identity.is_admin,
            created_at: identity.created_at,
            updated_at: identity.updated_at,
        }
    }
}
