use thiserror::Error;

/// Failure reading the escrow contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// RPC transport or contract-call failure.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// The node answered but the payload could not be decoded.
    #[error("ledger response undecodable: {0}")]
    Decode(String),

    /// No endpoint is configured for the requested chain.
    #[error("no ledger endpoint configured for chain {0}")]
    UnknownChain(u64),

    #[error("invalid on-chain order id '{0}'")]
    InvalidOrderId(String),
}

/// Failure of an off-chain store or sink operation.
///
/// Variants keep the distinctions operators need in logs (permission vs.
/// availability vs. rejection).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store refused the write (constraint, conflict, validation).
    #[error("write rejected: {0}")]
    Rejected(String),

    #[error("store error: {0}")]
    Other(String),
}

impl StoreError {
    /// Stable short label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::NotFound(_) => "not_found",
            StoreError::PermissionDenied(_) => "permission_denied",
            StoreError::Unavailable(_) => "unavailable",
            StoreError::Rejected(_) => "rejected",
            StoreError::Other(_) => "other",
        }
    }
}
