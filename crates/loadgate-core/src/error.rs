//! Controller error types.

use crate::replication::ReplicationError;

/// Errors surfaced by [`TransferController`](crate::TransferController).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControllerError {
    /// A replicated state was applied to the authoritative controller,
    /// which owns its state and never mirrors one.
    #[error("authoritative controller cannot apply replicated state {token:?}")]
    NotAReplica {
        /// The token that was offered.
        token: String,
    },

    /// The replicated token could not be resolved.
    #[error("replication error: {source}")]
    Replication {
        /// The underlying replication error.
        #[from]
        source: ReplicationError,
    },
}
