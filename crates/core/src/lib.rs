//! `storefront-core` — domain foundation building blocks.
//!
//! Pure domain primitives shared by the catalog and kit crates (no IO, no storage).

pub mod entity;
pub mod error;
pub mod id;
pub mod money;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::AggregateId;
pub use money::Money;
