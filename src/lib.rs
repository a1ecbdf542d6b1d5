//! # rowmap
//!
//! Maps plain Rust models to relational tables and compiles typed builder
//! calls into parameterized SQL.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use rowmap::prelude::*;
//!
//! #[derive(Default)]
//! struct Brand { id: i64, name: String }
//! rowmap::model!(Brand { id, name });
//!
//! let registry = MapperRegistry::builder()
//!     .map::<Brand>(|m| {
//!         m.key("id", PrimaryKeyType::AutoIncrement)?.auto_mapper()?;
//!         Ok(())
//!     })?
//!     .build();
//!
//! let session = Session::connect(registry, RowmapConfig::default()).await?;
//! session.create_table::<Brand>().await?;
//! session.insert(&Brand { id: 0, name: "Acme".into() }).await?;
//!
//! let mut query = session.query_for::<Brand>()?;
//! query.filter(|w| {
//!     w.equal("name", "Acme")?;
//!     Ok(())
//! })?;
//! let rows = session.fetch(&query).await?;
//! ```
//!
//! Statements can also be stacked in a [`ManagedTransaction`] and sent on
//! commit.

pub mod backend;
pub mod config;
pub mod engine;
pub mod session;
pub mod transaction;

pub use rowmap_core::{ast, error, metadata, model, path, transpiler};

pub use backend::{Backend, ConnectionLease, QueryResult, Row};
pub use config::RowmapConfig;
pub use engine::SqlxBackend;
pub use session::Session;
pub use transaction::{CommitCoordinator, ManagedTransaction, TransactionStatus};

pub mod prelude {
    pub use rowmap_core::prelude::*;

    pub use crate::backend::{Backend, ConnectionLease, QueryResult, Row};
    pub use crate::config::RowmapConfig;
    pub use crate::session::Session;
    pub use crate::transaction::{ManagedTransaction, TransactionStatus};
}
