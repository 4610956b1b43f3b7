use cosmwasm_std::{from_json, to_json_vec, StdResult};

use crate::error::ContractError;
use crate::state::DidRecord;

pub fn encode(record: &DidRecord) -> StdResult<Vec<u8>> {
    to_json_vec(record)
}

/// `key` only feeds the error message
pub fn decode(key: &str, bytes: &[u8]) -> Result<DidRecord, ContractError> {
    from_json(bytes).map_err(|err| ContractError::MalformedRecord {
        key: key.to_string(),
        reason: err.to_string(),
    })
}
