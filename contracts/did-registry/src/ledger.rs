//! Key-value ledger the registry is written against.
//!
//! The registry only needs four primitives: point read, point write, ordered
//! range scan and per-key change history. [`ContractLedger`] and
//! [`ContractLedgerMut`] provide them on top of contract storage. Contract
//! storage has no history of its own, so every `put` also appends a
//! [`KeyModification`] to a per-key change log.

use cosmwasm_std::{Binary, Env, Order, StdError, StdResult, Storage};
use cosmwasm_storage::{to_length_prefixed, PrefixedStorage, ReadonlyPrefixedStorage};
use sha2::{Digest, Sha256};

use crate::state::{KeyModification, HISTORY, HISTORY_LEN, RECORDS_NAMESPACE};

pub type KvPair = (String, Vec<u8>);

pub type LedgerIter<'a, T> = Box<dyn Iterator<Item = StdResult<T>> + 'a>;

pub trait LedgerRead {
    /// Point lookup, `None` when nothing is stored
    fn get(&self, key: &str) -> StdResult<Option<Vec<u8>>>;

    /// Ascending scan over `[start, end)`. An empty bound is open.
    ///
    /// The cursor is held by the returned iterator and released when it is
    /// dropped, whether or not it ran to the end.
    fn scan<'a>(&'a self, start: &str, end: &str) -> LedgerIter<'a, KvPair>;

    /// Every value written under `key`, oldest first
    fn change_history<'a>(&'a self, key: &str) -> LedgerIter<'a, KeyModification>;
}

pub trait LedgerWrite: LedgerRead {
    /// Upsert. Values must not be empty.
    fn put(&mut self, key: &str, value: &[u8]) -> StdResult<()>;
}

/// Identity and time of the transaction performing writes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxContext {
    pub tx_id: String,
    pub timestamp: String,
}

impl TxContext {
    /// Id is hex SHA-256 of chain id, block height and transaction index.
    ///
    /// Without `env.transaction` the index falls back to `u32::MAX`, so every
    /// write in that block shares one `tx_id`.
    pub fn from_env(env: &Env) -> StdResult<Self> {
        let tx_index = env.transaction.as_ref().map(|tx| tx.index).unwrap_or(u32::MAX);

        let mut hasher = Sha256::new();
        hasher.update(env.block.chain_id.as_bytes());
        hasher.update(env.block.height.to_be_bytes());
        hasher.update(tx_index.to_be_bytes());

        Ok(TxContext {
            tx_id: hex::encode(hasher.finalize()),
            timestamp: shared::iso8601(env.block.time)?,
        })
    }
}

/// Read-only view for queries
pub struct ContractLedger<'a> {
    storage: &'a dyn Storage,
}

impl<'a> ContractLedger<'a> {
    pub fn new(storage: &'a dyn Storage) -> Self {
        ContractLedger { storage }
    }
}

impl<'s> LedgerRead for ContractLedger<'s> {
    fn get(&self, key: &str) -> StdResult<Option<Vec<u8>>> {
        Ok(read_record(self.storage, key))
    }

    fn scan<'a>(&'a self, start: &str, end: &str) -> LedgerIter<'a, KvPair> {
        scan_records(self.storage, start, end)
    }

    fn change_history<'a>(&'a self, key: &str) -> LedgerIter<'a, KeyModification> {
        read_history(self.storage, key)
    }
}

/// Writable view bound to one transaction
pub struct ContractLedgerMut<'a> {
    storage: &'a mut dyn Storage,
    tx: TxContext,
}

impl<'a> ContractLedgerMut<'a> {
    pub fn new(storage: &'a mut dyn Storage, tx: TxContext) -> Self {
        ContractLedgerMut { storage, tx }
    }
}

impl<'s> LedgerRead for ContractLedgerMut<'s> {
    fn get(&self, key: &str) -> StdResult<Option<Vec<u8>>> {
        Ok(read_record(&*self.storage, key))
    }

    fn scan<'a>(&'a self, start: &str, end: &str) -> LedgerIter<'a, KvPair> {
        scan_records(&*self.storage, start, end)
    }

    fn change_history<'a>(&'a self, key: &str) -> LedgerIter<'a, KeyModification> {
        read_history(&*self.storage, key)
    }
}

impl<'s> LedgerWrite for ContractLedgerMut<'s> {
    fn put(&mut self, key: &str, value: &[u8]) -> StdResult<()> {
        if value.is_empty() {
            return Err(StdError::generic_err("ledger values must not be empty"));
        }

        PrefixedStorage::new(self.storage, RECORDS_NAMESPACE).set(key.as_bytes(), value);

        let seq = HISTORY_LEN.may_load(self.storage, key)?.unwrap_or_default();
        HISTORY.save(
            self.storage,
            (key, seq),
            &KeyModification {
                tx_id: self.tx.tx_id.clone(),
                timestamp: self.tx.timestamp.clone(),
                is_delete: false,
                value: Binary::from(value),
            },
        )?;
        HISTORY_LEN.save(self.storage, key, &(seq + 1))?;
        Ok(())
    }
}

fn read_record(storage: &dyn Storage, key: &str) -> Option<Vec<u8>> {
    ReadonlyPrefixedStorage::new(storage, RECORDS_NAMESPACE).get(key.as_bytes())
}

fn scan_records<'a>(storage: &'a dyn Storage, start: &str, end: &str) -> LedgerIter<'a, KvPair> {
    let prefix = to_length_prefixed(RECORDS_NAMESPACE);
    let start_key = [prefix.as_slice(), start.as_bytes()].concat();
    let end_key = if end.is_empty() {
        namespace_upper_bound(&prefix)
    } else {
        [prefix.as_slice(), end.as_bytes()].concat()
    };
    let prefix_len = prefix.len();

    let iter = storage
        .range(Some(start_key.as_slice()), Some(end_key.as_slice()), Order::Ascending)
        .map(move |(raw_key, value)| -> StdResult<KvPair> {
            let key = String::from_utf8(raw_key[prefix_len..].to_vec())
                .map_err(|err| StdError::invalid_utf8(err.to_string()))?;
            Ok((key, value))
        });
    Box::new(iter)
}

fn read_history<'a>(storage: &'a dyn Storage, key: &str) -> LedgerIter<'a, KeyModification> {
    let iter = HISTORY
        .prefix(key)
        .range(storage, None, None, Order::Ascending)
        .map(|item| item.map(|(_, modification)| modification));
    Box::new(iter)
}

/// Smallest key greater than every key starting with `prefix`
fn namespace_upper_bound(prefix: &[u8]) -> Vec<u8> {
    let mut bound = prefix.to_vec();
    while let Some(last) = bound.pop() {
        if last < u8::MAX {
            bound.push(last + 1);
            return bound;
        }
    }
    // all 0xff; nothing sorts after it within a finite key
    vec![u8::MAX; prefix.len() + 1]
}
