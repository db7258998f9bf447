//! External collaborator contracts.
//!
//! The data core never talks to the managed backend's auth or object
//! storage directly; it goes through the two traits here. Production
//! deployments implement them against the real services, and the in-memory
//! adapters keep tests and single-process runs hermetic.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod blob;
mod identity;

pub use blob::{BlobError, BlobStore, InMemoryBlobStore, StoredObject};
pub use identity::{IdentityError, IdentityProvider, StaticTokenDirectory};
