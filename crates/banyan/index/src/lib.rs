//! Key scheme and relationship-pointer maintenance.
//!
//! The flat namespace emulates relations with two key families:
//! - entity records under `{kind}:{id}`
//! - pointer records under `owner:{ownerId}:{kind}:{childId}`, whose value
//!   is just the child id
//!
//! The pointer set of a record is a pure function of its foreign-key
//! fields, so the maintainer can attach pointers on create and retract
//! exactly the same set on delete without any index-of-indexes bookkeeping.
//! Pointers never carry entity data; readers always resolve them back
//! through the entity record.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod keys;
mod maintainer;

pub use keys::{entity_key, entity_prefix, Relation};
pub use maintainer::{IndexMaintainer, PointerEntry, PointerSet};
