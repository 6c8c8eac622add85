// crates/jd-core/src/session.rs
//
// Session types as returned by the external identity provider. This layer
// only reads sessions; it never stores or issues them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The authenticated identity inside a session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: SessionUser,
    /// When the provider considers the session expired.
    #[serde(default)]
    pub expires: Option<DateTime<Utc>>,
}

impl Session {
    pub fn user_id(&self) -> Option<&str> {
        self.user.id.as_deref()
    }

    /// Display name, falling back to the email address.
    pub fn display_name(&self) -> Option<&str> {
        self.user.name.as_deref().or(self.user.email.as_deref())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires.map(|e| e <= now).unwrap_or(false)
    }
}
