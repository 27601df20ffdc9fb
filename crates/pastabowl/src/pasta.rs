//! The pasta record and its on-disk encoding.
//!
//! Each pasta directory holds a `pasta.json` file with all five fields.
//! Every field is required when decoding, so a truncated or hand-edited
//! record is reported as corrupt rather than silently filled with defaults.

use serde::{Deserialize, Serialize};

/// Name of the metadata file inside a pasta directory.
pub const METADATA_FILE: &str = "pasta.json";

/// Name of the payload file inside a pasta directory.
pub const PAYLOAD_FILE: &str = "data";

/// Metadata for one stored pasta.
///
/// `Pasta::default()` is the "not found" value returned by
/// [`PastaStore::get_pasta`](crate::PastaStore::get_pasta): its `id` is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pasta {
    /// Directory-safe identifier, unique within the bowl.
    /// Leave empty on insert to have one generated.
    pub id: String,

    /// Owner secret. Leave empty on insert to have one generated.
    /// The bowl stores it but never checks it.
    pub token: String,

    /// Display name, may be empty.
    pub name: String,

    /// MIME type of the payload (e.g., "text/plain").
    pub mime: String,

    /// Unix timestamp after which the pasta is expired; 0 means never.
    pub expire_date: i64,
}

impl Pasta {
    /// Create a pasta with a name and MIME type; id and token are left for
    /// the bowl to generate.
    pub fn new(name: impl Into<String>, mime: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            ..Self::default()
        }
    }

    /// Set the expiration timestamp.
    pub fn with_expire_date(mut self, expire_date: i64) -> Self {
        self.expire_date = expire_date;
        self
    }

    /// Whether this value refers to a stored pasta (non-empty id).
    pub fn is_found(&self) -> bool {
        !self.id.is_empty()
    }

    /// The expiration timestamp, or `None` for pastas that never expire.
    pub fn expires_at(&self) -> Option<i64> {
        (self.expire_date != 0).then_some(self.expire_date)
    }

    /// Whether the pasta has expired at Unix time `now`.
    ///
    /// The bowl never evicts anything; this is for front ends that enforce
    /// expiry on read.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at().is_some_and(|ts| ts <= now)
    }

    pub(crate) fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }

    pub(crate) fn decode(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}
