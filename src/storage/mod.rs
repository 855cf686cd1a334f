//! Store collaborators.
//!
//! The traits define what the oracle needs from the versioned store; the
//! in-memory backend is a reference implementation for embedded use and
//! tests.

mod life;
mod memory;
mod traits;

pub use life::{AttributeLife, LifeEntry};
pub use memory::InMemoryHistoryStore;
pub use traits::{AttributeHistoryProvider, ReferenceKind, ReferenceResolver, StoreError};
