pub mod auth;
pub mod codec;
pub mod contract;
mod error;
pub mod ledger;
pub mod lifecycle;
pub mod msg;
pub mod query;
pub mod state;

pub use crate::error::ContractError;
