use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Addr, Binary};
use cw_storage_plus::{Item, Map};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Anchored DID record, stored as camelCase JSON under its `did`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DidRecord {
    /// Primary key (did:...)
    pub did: String,
    /// Long-form variant recorded at creation
    pub long_form_did: String,
    /// DID Document (JSON text), opaque to the registry
    pub document: String,
    /// Created timestamp (ISO-8601)
    pub created_at: String,
    /// Updated timestamp (ISO-8601)
    pub updated_at: String,
    /// Starts at 1, +1 per update or recovery
    pub version: u64,
    /// Set by the first recovery, never reset
    #[serde(default)]
    pub recovered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovered_at: Option<String>,
}

/// What happens to `recoveredAt` when an already recovered DID is recovered again
#[cw_serde]
#[derive(Default)]
pub enum RecoveredAtPolicy {
    /// Keep the timestamp of the first recovery
    #[default]
    PreserveFirst,
    /// Stamp every recovery
    OverwriteLatest,
}

#[cw_serde]
pub struct Config {
    /// May change this config
    pub admin: Addr,
    /// Upper bound on the document size in bytes
    pub max_document_bytes: u64,
    pub recovered_at_policy: RecoveredAtPolicy,
    /// ed25519 key checked on updates; unset = signatures not verified
    pub update_key: Option<Binary>,
    /// ed25519 key checked on recoveries; unset = signatures not verified
    pub recovery_key: Option<Binary>,
}

/// One write under a key, as seen by the ledger's change log
#[cw_serde]
pub struct KeyModification {
    pub tx_id: String,
    pub timestamp: String,
    pub is_delete: bool,
    pub value: Binary,
}

pub const DEFAULT_MAX_DOCUMENT_BYTES: u64 = 10_000; // 10KB

pub const CONFIG: Item<Config> = Item::new("config");

/// Raw record bytes live under this namespace, keyed by DID
pub const RECORDS_NAMESPACE: &[u8] = b"dids";

/// Change log: (key, sequence) -> modification
pub const HISTORY: Map<(&str, u64), KeyModification> = Map::new("did_history");

/// Number of change log entries per key
pub const HISTORY_LEN: Map<&str, u64> = Map::new("did_history_len");
