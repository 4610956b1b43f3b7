use cosmwasm_std::StdError;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ContractError {
    #[error("{0}")]
    Std(#[from] StdError),

    #[error("Unauthorized")]
    Unauthorized {},

    #[error("DID {did} does not exist")]
    DidNotFound { did: String },

    #[error("DID {did} already exists")]
    DidExists { did: String },

    #[error("Malformed DID record under key {key}: {reason}")]
    MalformedRecord { key: String, reason: String },

    #[error("DID and long-form DID must not be empty")]
    InvalidDid {},

    #[error("Invalid DID document: {reason}")]
    InvalidDocument { reason: String },

    #[error("DID document too large ({size} bytes, max {max})")]
    DocumentTooLarge { size: u64, max: u64 },

    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },
}
