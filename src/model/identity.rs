//! Identity base shared by every entity kind

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use super::{timestamp, Document};
use crate::Result;

/// Unique id plus creation/update timestamps.
///
/// The id is fixed once assigned. `updated_at` only moves through
/// [`Identity::touch`] and never drops below `created_at`.
#[derive(Debug, Clone)]
pub struct Identity {
    id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Identity {
    /// Create an identity, generating a UUID v4 when `id` is absent or empty.
    #[must_use]
    pub fn new(id: Option<String>) -> Self {
        let now = timestamp::now();
        Self {
            id: id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild an identity from its stored text form.
    ///
    /// Timestamps that are absent keep their construction-time value.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidTimestamp` if a present timestamp is not ISO-8601.
    pub fn from_stored(
        id: Option<String>,
        created_at: Option<&str>,
        updated_at: Option<&str>,
    ) -> Result<Self> {
        let mut identity = Self::new(id);
        if let Some(text) = created_at {
            identity.created_at = timestamp::parse("created_at", text)?;
        }
        if let Some(text) = updated_at {
            identity.updated_at = timestamp::parse("updated_at", text)?;
        }
        identity.updated_at = identity.updated_at.max(identity.created_at);
        Ok(identity)
    }

    /// Get the id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Get the last update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Set `updated_at` to now.
    pub fn touch(&mut self) {
        self.updated_at = timestamp::now().max(self.created_at).max(self.updated_at);
    }

    /// Start a representation with `_id`, `created_at` and `updated_at`.
    #[must_use]
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert("_id".into(), Value::from(self.id.clone()));
        doc.insert(
            "created_at".into(),
            Value::from(timestamp::format(self.created_at)),
        );
        doc.insert(
            "updated_at".into(),
            Value::from(timestamp::format(self.updated_at)),
        );
        doc
    }
}
