//! OOB Manager - Out-of-band BMC management client
//!
//! Inspects and controls physical servers through their Baseboard
//! Management Controller across three generations of management protocols,
//! and provisions RAID across every controller of a chassis.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                              Client Cache                                    │
//! │                  (insertion-ordered, keyed by identity)                      │
//! ├─────────────────────────────────────────────────────────────────────────────┤
//! │                           BMC Client Facade                                  │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────────┐  │
//! │  │  Server Profile │  │  Support Tables │  │      Capability Router      │  │
//! │  │  (generation)   │  │  (static sets)  │  │   (operation → protocol)    │  │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────────┘  │
//! ├─────────────────────────────────────────────────────────────────────────────┤
//! │                          Protocol Clients                                    │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────────┐  │
//! │  │     Legacy      │  │   Predecessor   │  │         Standard            │  │
//! │  │   (XML-style)   │  │  (REST, mid)    │  │  (REST, newest) + storage   │  │
//! │  └─────────────────┘  └─────────────────┘  └──────────────┬──────────────┘  │
//! ├───────────────────────────────────────────────────────────┼─────────────────┤
//! │                        Storage Engine                     │                  │
//! │  ┌─────────────────────────────┐  ┌───────────────────────┴─────────────┐   │
//! │  │  RAID create / read / delete│  │  Sanitize erase / erase status      │   │
//! │  └──────────────┬──────────────┘  └──────────────────┬──────────────────┘   │
//! │                 └──────────── Inventory Resolver ────┘                      │
//! └─────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`client`]: Routing facade, factory and instance cache
//! - [`storage`]: Multi-controller RAID and disk erase engine
//! - [`backends`]: Standard protocol client and the simulated BMC
//! - [`domain`]: Operation vocabulary and port traits
//! - [`config`]: Connection and client options
//! - [`error`]: Error types and handling

pub mod backends;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod storage;

// Re-export commonly used types
pub use backends::{Fixture, SimulatedChassis, SimulatedConnector, StandardClient};

pub use client::{
    BmcClient, ClientCache, ClientFactory, Generation, LegacyState, Router, ServerProfile,
    SupportTables,
};

pub use config::{ClientOptions, ConnectionConfig, ConnectionIdentity, SnmpCredentials};

pub use domain::operation::Operation;
pub use domain::ports::{
    DiskSizeProbe, IpmiTarget, NicCapacityProbe, Protocol, ProtocolClient, ProtocolConnector,
    StorageService,
};

pub use error::{ControllerFailure, Error, Result};

pub use storage::{
    DiskSize, EraseEngine, ErasePattern, LogicalDiskSpec, MediaType, RaidConfigRequest,
    RaidConfiguration, RaidEngine, RaidLevel,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
