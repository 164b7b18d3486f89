//! Multi-controller storage provisioning
//!
//! - `types`: controller, drive and RAID request/response shapes
//! - `inventory`: live correlation of controllers and storage configurations
//! - `raid`: create/read/delete across controllers with failure aggregation
//! - `erase`: sanitize erase of unassigned drives

pub mod erase;
pub mod inventory;
pub mod raid;
pub mod types;

pub use erase::EraseEngine;
pub use inventory::InventoryResolver;
pub use raid::{group_by_controller, AggregatedOutcome, ControllerGroups, RaidEngine};
pub use types::*;
