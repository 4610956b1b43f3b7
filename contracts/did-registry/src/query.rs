use cosmwasm_std::{Api, StdResult};

use crate::codec;
use crate::error::ContractError;
use crate::ledger::LedgerRead;
use crate::lifecycle;
use crate::msg::{DidSummary, HistoryEntry};

/// Summaries of the records stored in `[start_key, end_key)`, in key order.
///
/// Values that do not decode are logged and left out; they never fail the
/// listing. `limit` caps the number of summaries, not the number of keys
/// visited.
pub fn list_dids<L: LedgerRead + ?Sized>(
    api: &dyn Api,
    ledger: &L,
    start_key: &str,
    end_key: &str,
    limit: Option<u32>,
) -> Result<Vec<DidSummary>, ContractError> {
    let limit = limit.map_or(usize::MAX, |l| l as usize);
    let mut dids = Vec::new();

    for item in ledger.scan(start_key, end_key) {
        if dids.len() >= limit {
            break;
        }
        let (key, value) = item?;
        match codec::decode(&key, &value) {
            Ok(record) => dids.push(DidSummary::from(record)),
            Err(err) => api.debug(&format!("skipping entry: {err}")),
        }
    }

    Ok(dids)
}

/// Full change trail for `did`, oldest first, values undecoded
pub fn did_history<L: LedgerRead + ?Sized>(
    ledger: &L,
    did: &str,
) -> Result<Vec<HistoryEntry>, ContractError> {
    if !lifecycle::exists(ledger, did)? {
        return Err(ContractError::DidNotFound {
            did: did.to_string(),
        });
    }

    let entries = ledger
        .change_history(did)
        .map(|item| item.map(HistoryEntry::from))
        .collect::<StdResult<Vec<_>>>()?;
    Ok(entries)
}
