//! Persistence: roster, point tallies and notes.
//!
//! - `store` - the [`Store`] trait every backend implements
//! - `mongo` - MongoDB backend
//! - `memory` - process-local backend

mod memory;
mod models;
mod mongo;
mod store;

pub use memory::MemoryStore;
pub use models::*;
pub use mongo::MongoStore;
pub use store::{Store, StoreError, StoreResult};
