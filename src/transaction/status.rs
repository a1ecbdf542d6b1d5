use std::fmt;

/// Lifecycle of a [`ManagedTransaction`](super::ManagedTransaction).
///
/// `Open` until something has to reach the backend inside an explicit
/// transaction; `Committed` and `Rollbacked` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionStatus {
    #[default]
    Open,
    /// `BEGIN TRANSACTION` was sent.
    Started,
    /// A savepoint was released; the outer transaction is still running.
    Released,
    Committed,
    Rollbacked,
}

impl TransactionStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Open | Self::Started | Self::Released)
    }

    /// A backend transaction is running and must be ended with COMMIT or ROLLBACK.
    pub fn is_started(&self) -> bool {
        matches!(self, Self::Started | Self::Released)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Started => write!(f, "started"),
            Self::Released => write!(f, "released"),
            Self::Committed => write!(f, "committed"),
            Self::Rollbacked => write!(f, "rollbacked"),
        }
    }
}
