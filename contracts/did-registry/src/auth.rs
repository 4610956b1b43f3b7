//! Authorization of update and recovery operations.
//!
//! A verifier sees the operation about to be applied and the caller supplied
//! signature. [`verifier_for`] picks an ed25519 check when the registry has a
//! key configured for that kind of operation, and [`Unverified`] otherwise.

use cosmwasm_std::{Api, Binary};
use sha2::{Digest, Sha256};

use crate::error::ContractError;
use crate::state::Config;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationKind {
    Update,
    Recover,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Update => "update",
            OperationKind::Recover => "recover",
        }
    }
}

/// A mutation as it will be written
#[derive(Clone, Debug)]
pub struct Operation<'a> {
    pub kind: OperationKind,
    pub did: &'a str,
    /// Version the record will have after the mutation
    pub version: u64,
    /// Replacement document, JSON text as sent
    pub document: &'a [u8],
}

/// Message a signer must sign for `op`
pub fn operation_digest(op: &Operation) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(op.kind.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(op.did.as_bytes());
    hasher.update([0u8]);
    hasher.update(op.version.to_be_bytes());
    hasher.update(op.document);
    hasher.finalize().to_vec()
}

pub trait AuthorizationVerifier {
    fn verify(
        &self,
        api: &dyn Api,
        op: &Operation,
        signature: &[u8],
    ) -> Result<(), ContractError>;
}

/// Accepts every signature
pub struct Unverified;

impl AuthorizationVerifier for Unverified {
    fn verify(
        &self,
        api: &dyn Api,
        op: &Operation,
        _signature: &[u8],
    ) -> Result<(), ContractError> {
        api.debug(&format!(
            "{} of {}: signature not verified, no {} key configured",
            op.kind.as_str(),
            op.did,
            op.kind.as_str()
        ));
        Ok(())
    }
}

pub struct Ed25519Verifier {
    public_key: Binary,
}

impl Ed25519Verifier {
    pub fn new(public_key: Binary) -> Self {
        Ed25519Verifier { public_key }
    }
}

impl AuthorizationVerifier for Ed25519Verifier {
    fn verify(
        &self,
        api: &dyn Api,
        op: &Operation,
        signature: &[u8],
    ) -> Result<(), ContractError> {
        let message = operation_digest(op);
        match api.ed25519_verify(&message, signature, self.public_key.as_slice()) {
            Ok(true) => Ok(()),
            _ => Err(ContractError::Unauthorized {}),
        }
    }
}

pub fn verifier_for(config: &Config, kind: OperationKind) -> Box<dyn AuthorizationVerifier> {
    let key = match kind {
        OperationKind::Update => &config.update_key,
        OperationKind::Recover => &config.recovery_key,
    };
    match key {
        Some(public_key) => Box::new(Ed25519Verifier::new(public_key.clone())),
        None => Box::new(Unverified),
    }
}

pub const ED25519_PUBKEY_LEN: usize = 32;

pub fn validate_key(key: &Binary) -> Result<(), ContractError> {
    if key.len() != ED25519_PUBKEY_LEN {
        return Err(ContractError::InvalidConfig {
            reason: format!("ed25519 public key must be {ED25519_PUBKEY_LEN} bytes"),
        });
    }
    Ok(())
}
