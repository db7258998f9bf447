//! Shared vocabulary for the Banyan data core.
//!
//! This crate defines the identifiers, roles, and record shapes that the
//! storage, index, and service layers exchange:
//! - string-backed entity ids (users come from the identity provider, the
//!   rest are generated locally)
//! - the four persisted record kinds (user, domain, paper, message)
//! - draft/update payloads accepted at the service surface
//!
//! Records serialize with camelCase field names; that is the shape stored in
//! the key-value table and the shape external tooling reads back.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

mod ids;
mod model;

pub use ids::{DomainId, MessageId, PaperId, UserId};
pub use model::{
    EntityKind, InvalidRole, Message, NewDomain, NewMessage, NewPaper, NewProfile, Paper,
    ProfileUpdate, ResearchDomain, Role, UserProfile,
};
