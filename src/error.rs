//! Error types for policycalc

use thiserror::Error;

use crate::model::{EntityRef, TargetRef};

/// Errors from calculator, codec and store operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalcError {
    /// Malformed plane string, bit shift or bit index
    #[error("invalid bit width: {0}")]
    InvalidBitWidth(String),

    /// Target chain violates the root-to-leaf shift ordering
    #[error("invalid target chain: {0}")]
    InvalidChain(String),

    /// A target or one of its ancestors could not be resolved
    #[error("unresolved target: {0}")]
    UnresolvedTarget(TargetRef),

    /// Mutation requested on a (target, entity) pair that was never built
    #[error("no cell for {entity} on {target}")]
    UnknownCell { target: TargetRef, entity: EntityRef },

    /// Caller lacks ACL visibility on the target, so the cell is read-only
    #[error("no ACL visibility for {entity} on {target}")]
    NoVisibility { target: TargetRef, entity: EntityRef },

    /// LMDB or encoding failure in the policy store
    #[error("store error: {0}")]
    Store(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("encoding error: {0}")]
    Encoding(String),
}

/// Result type alias for policycalc operations
pub type Result<T> = std::result::Result<T, CalcError>;

/// Convert any store-side error to CalcError
pub fn err<E: std::error::Error>(e: E) -> CalcError {
    CalcError::Store(e.to_string())
}
