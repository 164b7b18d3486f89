//! Capability-routing client facade
//!
//! - `support`: which operations the non-legacy protocols implement
//! - `profile`: server generation resolved at connect time
//! - `router`: per-operation protocol selection
//! - `facade`: the [`BmcClient`] facade and its factory
//! - `cache`: bounded pool of facade instances

pub mod cache;
pub mod facade;
pub mod profile;
pub mod router;
pub mod support;

pub use cache::{CacheStats, ClientCache};
pub use facade::{BackendHandle, BmcClient, ClientFactory};
pub use profile::{Generation, LegacyState, ServerProfile};
pub use router::Router;
pub use support::SupportTables;
