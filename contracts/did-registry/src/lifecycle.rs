//! Create / update / recover / get on a single DID record.
//!
//! Every mutation is one read followed by one `put` under the same key. The
//! chain executes transactions one after another, which is what keeps two
//! updates of the same DID from both writing the same next version; nothing
//! in here locks.

use cosmwasm_std::{Api, OverflowError, OverflowOperation, StdError};

use crate::auth::{verifier_for, AuthorizationVerifier, Operation, OperationKind};
use crate::codec;
use crate::error::ContractError;
use crate::ledger::{LedgerRead, LedgerWrite};
use crate::state::{Config, DidRecord, RecoveredAtPolicy};

/// Current record for `did`
pub fn get<L: LedgerRead + ?Sized>(ledger: &L, did: &str) -> Result<DidRecord, ContractError> {
    match ledger.get(did)? {
        Some(bytes) if !bytes.is_empty() => codec::decode(did, &bytes),
        _ => Err(ContractError::DidNotFound {
            did: did.to_string(),
        }),
    }
}

/// Whether a non-empty value is stored under `did`
pub fn exists<L: LedgerRead + ?Sized>(ledger: &L, did: &str) -> Result<bool, ContractError> {
    Ok(ledger.get(did)?.map_or(false, |bytes| !bytes.is_empty()))
}

pub struct LifecycleManager<'a, L> {
    ledger: L,
    api: &'a dyn Api,
    now: String,
    max_document_bytes: u64,
    recovered_at_policy: RecoveredAtPolicy,
    update_verifier: Box<dyn AuthorizationVerifier>,
    recovery_verifier: Box<dyn AuthorizationVerifier>,
}

impl<'a, L: LedgerWrite> LifecycleManager<'a, L> {
    /// Manager with verifiers chosen from the configured keys
    pub fn new(ledger: L, api: &'a dyn Api, config: &Config, now: String) -> Self {
        LifecycleManager {
            ledger,
            api,
            now,
            max_document_bytes: config.max_document_bytes,
            recovered_at_policy: config.recovered_at_policy.clone(),
            update_verifier: verifier_for(config, OperationKind::Update),
            recovery_verifier: verifier_for(config, OperationKind::Recover),
        }
    }

    pub fn with_verifiers(
        mut self,
        update_verifier: Box<dyn AuthorizationVerifier>,
        recovery_verifier: Box<dyn AuthorizationVerifier>,
    ) -> Self {
        self.update_verifier = update_verifier;
        self.recovery_verifier = recovery_verifier;
        self
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn create(
        &mut self,
        did: &str,
        long_form_did: &str,
        document: String,
    ) -> Result<DidRecord, ContractError> {
        if did.is_empty() || long_form_did.is_empty() {
            return Err(ContractError::InvalidDid {});
        }

        if exists(&self.ledger, did)? {
            return Err(ContractError::DidExists {
                did: did.to_string(),
            });
        }

        self.check_document(&document)?;

        let record = DidRecord {
            did: did.to_string(),
            long_form_did: long_form_did.to_string(),
            document,
            created_at: self.now.clone(),
            updated_at: self.now.clone(),
            version: 1,
            recovered: false,
            recovered_at: None,
        };

        self.ledger.put(did, &codec::encode(&record)?)?;
        Ok(record)
    }

    pub fn update(
        &mut self,
        did: &str,
        document: String,
        signature: &[u8],
    ) -> Result<DidRecord, ContractError> {
        self.mutate(OperationKind::Update, did, document, signature)
    }

    pub fn recover(
        &mut self,
        did: &str,
        document: String,
        signature: &[u8],
    ) -> Result<DidRecord, ContractError> {
        self.mutate(OperationKind::Recover, did, document, signature)
    }

    fn mutate(
        &mut self,
        kind: OperationKind,
        did: &str,
        document: String,
        signature: &[u8],
    ) -> Result<DidRecord, ContractError> {
        let mut record = get(&self.ledger, did)?;
        self.check_document(&document)?;

        let version = record.version.checked_add(1).ok_or_else(|| {
            StdError::overflow(OverflowError::new(
                OverflowOperation::Add,
                record.version,
                1,
            ))
        })?;
        let op = Operation {
            kind,
            did,
            version,
            document: document.as_bytes(),
        };
        let verifier = match kind {
            OperationKind::Update => &self.update_verifier,
            OperationKind::Recover => &self.recovery_verifier,
        };
        verifier.verify(self.api, &op, signature)?;

        record.document = document;
        record.updated_at = self.now.clone();
        record.version = version;

        if kind == OperationKind::Recover {
            record.recovered = true;
            record.recovered_at = match (&self.recovered_at_policy, record.recovered_at) {
                (RecoveredAtPolicy::PreserveFirst, Some(first)) => Some(first),
                _ => Some(self.now.clone()),
            };
        }

        self.ledger.put(did, &codec::encode(&record)?)?;
        Ok(record)
    }

    /// Size limit first, then well-formedness
    fn check_document(&self, document: &str) -> Result<(), ContractError> {
        let size = document.len() as u64;
        if size > self.max_document_bytes {
            return Err(ContractError::DocumentTooLarge {
                size,
                max: self.max_document_bytes,
            });
        }
        shared::validate_json(document).map_err(|err| ContractError::InvalidDocument {
            reason: err.to_string(),
        })
    }
}
