//! Backend protocol clients
//!
//! Implementations of the [`ProtocolClient`](crate::domain::ports::ProtocolClient)
//! and [`StorageService`](crate::domain::ports::StorageService) ports.

pub mod simulated;
pub mod standard;

pub use simulated::{Availability, Fixture, SimulatedBmc, SimulatedChassis, SimulatedConnector, SimulatedController};
pub use standard::StandardClient;
