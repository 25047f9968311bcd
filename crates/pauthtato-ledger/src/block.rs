//! Block model and canonical serialization.
//!
//! A block's hash is the SHA-256 of its canonical payload: compact JSON with
//! the fields written in a fixed order.
//!
//! ```text
//! {"index":N,"previousHash":"…","data":{"userID":"…","serviceName":"…",
//!  "serviceID":"…","uuid":"…","publicKey":"…","obkupID":"…"},"timestamp":N}
//! ```
//!
//! The `data` order matches the persisted record layout. Strings use JSON
//! escaping, so any implementation with a conforming JSON string encoder
//! produces byte-identical input.

use pauthtato_crypto::ContentHash;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bundle::IdentityBundle;

/// The registration payload carried by a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockData {
    /// Bundle `userID`.
    #[serde(rename = "userID")]
    pub user_id: String,
    /// Name of the registering service.
    pub service_name: String,
    /// Bundle `serviceID`.
    #[serde(rename = "serviceID")]
    pub service_id: String,
    /// Bundle UUID.
    #[serde(with = "canonical_uuid")]
    pub uuid: Uuid,
    /// Bundle public key (hex).
    pub public_key: String,
    /// Bundle backup identifier (hex).
    #[serde(rename = "obkupID")]
    pub obkup_id: String,
}

impl BlockData {
    /// Combine a bundle with the service name that requested it.
    #[must_use]
    pub fn from_bundle(service_name: impl Into<String>, bundle: &IdentityBundle) -> Self {
        Self {
            user_id: bundle.user_id.clone(),
            service_name: service_name.into(),
            service_id: bundle.service_id.clone(),
            uuid: bundle.uuid,
            public_key: bundle.public_key.clone(),
            obkup_id: bundle.obkup_id.clone(),
        }
    }
}

/// One committed ledger entry.
///
/// Serializes flat: `index, previousHash, userID, serviceName, serviceID,
/// uuid, publicKey, obkupID, timestamp, hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Position in the chain, starting at 0.
    pub index: u64,
    /// Hash of the predecessor, or the zero sentinel for index 0.
    pub previous_hash: ContentHash,
    /// Registration payload.
    #[serde(flatten)]
    pub data: BlockData,
    /// Append time in epoch milliseconds.
    pub timestamp: u64,
    /// SHA-256 of the canonical payload.
    pub hash: ContentHash,
}

impl Block {
    /// Build a block and compute its hash.
    #[must_use]
    pub fn seal(index: u64, previous_hash: ContentHash, data: BlockData, timestamp: u64) -> Self {
        let mut block = Self {
            index,
            previous_hash,
            data,
            timestamp,
            hash: ContentHash::zero(),
        };
        block.hash = block.compute_hash();
        block
    }

    /// The canonical hash input for this block's payload fields.
    ///
    /// The stored `hash` is not part of its own input.
    #[must_use]
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let d = &self.data;
        format!(
            "{{\"index\":{},\"previousHash\":{},\"data\":{{\"userID\":{},\"serviceName\":{},\
             \"serviceID\":{},\"uuid\":{},\"publicKey\":{},\"obkupID\":{}}},\"timestamp\":{}}}",
            self.index,
            json_str(&self.previous_hash.to_hex()),
            json_str(&d.user_id),
            json_str(&d.service_name),
            json_str(&d.service_id),
            json_str(&d.uuid.hyphenated().to_string()),
            json_str(&d.public_key),
            json_str(&d.obkup_id),
            self.timestamp,
        )
        .into_bytes()
    }

    /// Recompute the hash from this block's fields.
    #[must_use]
    pub fn compute_hash(&self) -> ContentHash {
        ContentHash::hash(&self.canonical_bytes())
    }

    /// Whether the stored hash matches the payload.
    #[must_use]
    pub fn is_self_consistent(&self) -> bool {
        self.hash == self.compute_hash()
    }

    /// Whether this block links to `previous`.
    #[must_use]
    pub fn follows(&self, previous: &Block) -> bool {
        previous.index.checked_add(1) == Some(self.index)
            && self.previous_hash == previous.compute_hash()
    }
}

/// UUIDs as lowercase hyphenated text, the form that is hashed.
///
/// Other spellings of the same UUID are rejected on input.
mod canonical_uuid {
    use serde::{Deserialize, Deserializer, Serializer, de};
    use uuid::Uuid;

    pub(super) fn serialize<S: Serializer>(uuid: &Uuid, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&uuid.hyphenated())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Uuid, D::Error> {
        let text = String::deserialize(deserializer)?;
        let uuid = Uuid::parse_str(&text).map_err(de::Error::custom)?;
        if uuid.hyphenated().to_string() == text {
            Ok(uuid)
        } else {
            Err(de::Error::custom(format!(
                "uuid '{text}' is not in lowercase hyphenated form"
            )))
        }
    }
}

/// JSON string literal with standard escaping.
fn json_str(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

/// Persisted record layout, one row per block.
///
/// Field order is fixed and matches the canonical hash input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    /// Block index.
    pub index: u64,
    /// Predecessor hash (hex).
    pub previous_hash: ContentHash,
    /// Bundle `userID`.
    pub user_id: String,
    /// Registering service.
    pub service_name: String,
    /// Bundle `serviceID`.
    pub service_id: String,
    /// Bundle UUID.
    #[serde(with = "canonical_uuid")]
    pub uuid: Uuid,
    /// Bundle public key.
    pub public_key: String,
    /// Bundle backup identifier.
    pub obkup_id: String,
    /// Append time in epoch milliseconds.
    pub timestamp: u64,
    /// Block hash (hex).
    pub hash: ContentHash,
}

impl From<&Block> for BlockRecord {
    fn from(block: &Block) -> Self {
        Self {
            index: block.index,
            previous_hash: block.previous_hash,
            user_id: block.data.user_id.clone(),
            service_name: block.data.service_name.clone(),
            service_id: block.data.service_id.clone(),
            uuid: block.data.uuid,
            public_key: block.data.public_key.clone(),
            obkup_id: block.data.obkup_id.clone(),
            timestamp: block.timestamp,
            hash: block.hash,
        }
    }
}

impl From<BlockRecord> for Block {
    fn from(record: BlockRecord) -> Self {
        Self {
            index: record.index,
            previous_hash: record.previous_hash,
            data: BlockData {
                user_id: record.user_id,
                service_name: record.service_name,
                service_id: record.service_id,
                uuid: record.uuid,
                public_key: record.public_key,
                obkup_id: record.obkup_id,
            },
            timestamp: record.timestamp,
            hash: record.hash,
        }
    }
}
