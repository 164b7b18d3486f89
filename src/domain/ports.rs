//! Domain Ports - Core trait definitions for the management client
//!
//! These traits define the boundaries between the routing/RAID policy layer
//! and the external systems it drives. Adapters implement these traits to
//! provide concrete protocol transports and probes.

use crate::config::{ConnectionConfig, SnmpCredentials};
use crate::domain::operation::Operation;
use crate::error::Result;
use crate::storage::types::{
    Controller, ErasePattern, LogicalDiskSpec, MediaType, PhysicalDrive, StorageConfig,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

// =============================================================================
// Protocols
// =============================================================================

/// Backend management protocols, one per server generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Legacy XML-style protocol
    Legacy,
    /// REST predecessor protocol (mid generation)
    Predecessor,
    /// Standardized REST protocol (newest generation)
    Standard,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Legacy => write!(f, "legacy"),
            Protocol::Predecessor => write!(f, "predecessor"),
            Protocol::Standard => write!(f, "standard"),
        }
    }
}

// =============================================================================
// Protocol Client Port
// =============================================================================

/// Port for a backend protocol client
///
/// Every backend exposes a subset of the shared [`Operation`] vocabulary.
/// Operations it does not implement fail with `CommandNotSupported`.
#[async_trait]
pub trait ProtocolClient: Send + Sync {
    /// Protocol spoken by this client
    fn protocol(&self) -> Protocol;

    /// Invoke an operation with named arguments
    async fn invoke(&self, op: Operation, args: Value) -> Result<Value>;
}

/// Port that builds protocol clients for a connection
#[async_trait]
pub trait ProtocolConnector: Send + Sync {
    /// Build a client for `protocol` against the BMC described by `config`
    async fn connect(
        &self,
        protocol: Protocol,
        config: &ConnectionConfig,
    ) -> Result<Arc<dyn ProtocolClient>>;
}

// =============================================================================
// Storage Service Port
// =============================================================================

/// Storage resource surface of the standardized protocol
///
/// Values are never cached by callers: every RAID operation re-reads live
/// inventory through this port.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Array controllers in enumeration order
    async fn array_controllers(&self) -> Result<Vec<Controller>>;

    /// Physical drives attached to a controller
    async fn physical_drives(&self, controller: &Controller) -> Result<Vec<PhysicalDrive>>;

    /// Storage configuration resource ids; `None` when the BMC does not
    /// expose the collection at all
    async fn storage_config_ids(&self) -> Result<Option<Vec<String>>>;

    /// Fetch one storage configuration resource
    async fn storage_config(&self, config_id: &str) -> Result<StorageConfig>;

    /// Apply logical drives on a controller
    async fn create_logical_drives(&self, config_id: &str, specs: &[LogicalDiskSpec]) -> Result<()>;

    /// Remove all logical drives of a controller
    async fn delete_logical_drives(&self, config_id: &str) -> Result<()>;

    /// Start sanitize erase of the given drives
    async fn erase_drives(
        &self,
        config_id: &str,
        locations: &[String],
        media: MediaType,
        pattern: ErasePattern,
    ) -> Result<()>;
}

// =============================================================================
// Probe Ports
// =============================================================================

/// Out-of-band disk size probe (SNMP)
#[async_trait]
pub trait DiskSizeProbe: Send + Sync {
    /// Local disk size in GB, `None` when it could not be determined
    async fn local_gb(&self, host: &str, credentials: &SnmpCredentials) -> Result<Option<u64>>;
}

/// Target handed to the NIC capacity probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpmiTarget {
    /// Raw address (IPv6 without brackets)
    pub address: String,
    pub username: String,
    pub password: String,
}

/// NIC capacity probe (BMC command-line tooling)
#[async_trait]
pub trait NicCapacityProbe: Send + Sync {
    /// Maximum NIC capacity (e.g. "10Gb"), `None` when unknown
    async fn nic_capacity(
        &self,
        target: &IpmiTarget,
        firmware_major_minor: Option<&str>,
    ) -> Result<Option<String>>;
}

// =============================================================================
// Type Aliases for Arc'd Traits
// =============================================================================

pub type ProtocolClientRef = Arc<dyn ProtocolClient>;
pub type ProtocolConnectorRef = Arc<dyn ProtocolConnector>;
pub type StorageServiceRef = Arc<dyn StorageService>;
pub type DiskSizeProbeRef = Arc<dyn DiskSizeProbe>;
pub type NicCapacityProbeRef = Arc<dyn NicCapacityProbe>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_display() {
        assert_eq!(format!("{}", Protocol::Legacy), "legacy");
        assert_eq!(format!("{}", Protocol::Predecessor), "predecessor");
        assert_eq!(format!("{}", Protocol::Standard), "standard");
    }
}
