//! Value model shared by the mapper and the statement compilers.

pub mod operators;
pub mod types;
pub mod values;

pub use operators::*;
pub use types::*;
pub use values::*;
