//! Managed transactions: statements are stacked locally and reach the
//! backend on commit, or earlier when the transaction has to be started.

mod coordinator;
mod managed;
mod status;

pub use coordinator::CommitCoordinator;
pub use managed::ManagedTransaction;
pub use status::TransactionStatus;

/// Keywords sent to the backend.
pub mod commands {
    pub const BEGIN: &str = "BEGIN TRANSACTION";
    pub const COMMIT: &str = "COMMIT TRANSACTION";
    pub const ROLLBACK: &str = "ROLLBACK TRANSACTION";
}
