//! Infrastructure layer: stores, configuration and the reservation coordinator.
//!
//! - `store`: the [`store::KitStore`] trait with in-memory and Postgres
//!   implementations; each stock-moving operation is one transaction
//! - `coordinator`: validates requests, drives the store, recomputes kit
//!   pricing and publishes events after commit
//! - `read_model`: catalog and kit views assembled from current store state
//! - `config`: environment-driven settings

pub mod config;
pub mod coordinator;
pub mod read_model;
pub mod store;

pub use config::{AppConfig, ConfigError, DatabaseConfig};
pub use coordinator::{CoordinatorError, CoordinatorResult, ReservationCoordinator};
pub use store::{InMemoryKitStore, KitStore, PostgresKitStore, StoreError, StoreResult};
