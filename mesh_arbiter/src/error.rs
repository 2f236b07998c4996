//! Error types for mesh_arbiter.

use thiserror::Error;

use crate::messages::Hsid;

/// Result type for arbiter operations.
pub type Result<T> = std::result::Result<T, ArbiterError>;

/// Errors that can occur during failure arbitration.
///
/// `LedgerIncomplete` and `UnresolvedWatermark` are fatal: they mean the
/// cluster's agreement assumptions no longer hold and the caller must crash
/// this site rather than act on a partial decision.
#[derive(Debug, Error)]
pub enum ArbiterError {
    /// The ledger does not cover every (survivor, failing) pair at decision
    /// extraction.
    #[error("ledger incomplete at extraction: {missing} (survivor, failing) pairs unaccounted for")]
    LedgerIncomplete { missing: usize },

    /// A kill decision was reached for a site without a usable safe
    /// transaction id.
    #[error("no safe transaction id resolved for site {0}")]
    UnresolvedWatermark(Hsid),

    /// Message encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<bincode::Error> for ArbiterError {
    fn from(err: bincode::Error) -> Self {
        ArbiterError::Serialization(err.to_string())
    }
}
