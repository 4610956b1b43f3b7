use cosmwasm_schema::{cw_serde, QueryResponses};
use cosmwasm_std::{Addr, Binary};

use crate::state::{DidRecord, KeyModification, RecoveredAtPolicy};

#[cw_serde]
#[derive(Default)]
pub struct InstantiateMsg {
    /// Defaults to the instantiating sender
    pub admin: Option<String>,
    pub max_document_bytes: Option<u64>,
    pub recovered_at_policy: Option<RecoveredAtPolicy>,
    /// ed25519 public key (32 bytes) for update signatures
    pub update_key: Option<Binary>,
    /// ed25519 public key (32 bytes) for recovery signatures
    pub recovery_key: Option<Binary>,
}

#[cw_serde]
pub enum KeyUpdate {
    Set(Binary),
    Clear {},
}

#[cw_serde]
pub enum ExecuteMsg {
    /// Anchor a new DID document
    CreateDid {
        did: String,
        long_form_did: String,
        /// JSON text, stored exactly as sent
        document: String,
    },
    /// Replace the document (e.g. rotate keys, add services)
    UpdateDid {
        did: String,
        document: String,
        signature: Binary,
    },
    /// Replace the document after key loss and mark the DID as recovered
    RecoverDid {
        did: String,
        document: String,
        signature: Binary,
    },
    /// Change registry settings (admin only)
    UpdateConfig {
        admin: Option<String>,
        max_document_bytes: Option<u64>,
        recovered_at_policy: Option<RecoveredAtPolicy>,
        update_key: Option<KeyUpdate>,
        recovery_key: Option<KeyUpdate>,
    },
}

#[cw_serde]
#[derive(QueryResponses)]
pub enum QueryMsg {
    /// Current record for a DID
    #[returns(DidRecord)]
    GetDid { did: String },

    /// Summaries for keys in [start_key, end_key); missing bounds are open
    #[returns(DidListResponse)]
    ListDids {
        start_key: Option<String>,
        end_key: Option<String>,
        limit: Option<u32>,
    },

    /// Every write ever recorded for a DID, oldest first
    #[returns(DidHistoryResponse)]
    DidHistory { did: String },

    #[returns(ConfigResponse)]
    Config {},
}

// Response types

#[cw_serde]
pub struct DidSummary {
    pub did: String,
    pub created_at: String,
    pub updated_at: String,
    pub version: u64,
    pub recovered: bool,
}

impl From<DidRecord> for DidSummary {
    fn from(record: DidRecord) -> Self {
        DidSummary {
            did: record.did,
            created_at: record.created_at,
            updated_at: record.updated_at,
            version: record.version,
            recovered: record.recovered,
        }
    }
}

#[cw_serde]
pub struct DidListResponse {
    pub dids: Vec<DidSummary>,
}

#[cw_serde]
pub struct HistoryEntry {
    pub tx_id: String,
    pub timestamp: String,
    pub is_delete: bool,
    /// Stored bytes as written, not decoded
    pub value: String,
}

impl From<KeyModification> for HistoryEntry {
    fn from(modification: KeyModification) -> Self {
        HistoryEntry {
            tx_id: modification.tx_id,
            timestamp: modification.timestamp,
            is_delete: modification.is_delete,
            value: String::from_utf8_lossy(modification.value.as_slice()).into_owned(),
        }
    }
}

#[cw_serde]
pub struct DidHistoryResponse {
    pub entries: Vec<HistoryEntry>,
}

#[cw_serde]
pub struct ConfigResponse {
    pub admin: Addr,
    pub max_document_bytes: u64,
    pub recovered_at_policy: RecoveredAtPolicy,
    pub update_key: Option<Binary>,
    pub recovery_key: Option<Binary>,
}
