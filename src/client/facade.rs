//! BMC Client Facade
//!
//! Resolves the server generation once at connect time, then routes every
//! operation to the backend protocol client that implements it.

use crate::client::profile::{Generation, ServerProfile};
use crate::client::router::Router;
use crate::client::support::SupportTables;
use crate::config::{ClientOptions, ConnectionConfig, ConnectionIdentity};
use crate::domain::operation::Operation;
use crate::domain::ports::{
    DiskSizeProbeRef, IpmiTarget, NicCapacityProbeRef, Protocol, ProtocolClientRef,
    ProtocolConnector, ProtocolConnectorRef,
};
use crate::error::{Error, Result};
use crate::storage::types::{ErasePattern, MediaType, RaidConfigRequest, RaidConfiguration};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

// =============================================================================
// Backend Handles
// =============================================================================

/// A protocol client owned by one facade instance
#[derive(Clone)]
pub enum BackendHandle {
    Legacy(ProtocolClientRef),
    Predecessor(ProtocolClientRef),
    Standard(ProtocolClientRef),
}

impl BackendHandle {
    fn new(protocol: Protocol, client: ProtocolClientRef) -> Self {
        match protocol {
            Protocol::Legacy => BackendHandle::Legacy(client),
            Protocol::Predecessor => BackendHandle::Predecessor(client),
            Protocol::Standard => BackendHandle::Standard(client),
        }
    }

    pub fn protocol(&self) -> Protocol {
        match self {
            BackendHandle::Legacy(_) => Protocol::Legacy,
            BackendHandle::Predecessor(_) => Protocol::Predecessor,
            BackendHandle::Standard(_) => Protocol::Standard,
        }
    }

    pub fn client(&self) -> &ProtocolClientRef {
        match self {
            BackendHandle::Legacy(c) | BackendHandle::Predecessor(c) | BackendHandle::Standard(c) => c,
        }
    }
}

async fn build_handle(
    connector: &dyn ProtocolConnector,
    protocol: Protocol,
    config: &ConnectionConfig,
) -> Result<BackendHandle> {
    let client = connector.connect(protocol, config).await?;
    Ok(BackendHandle::new(protocol, client))
}

async fn probe_product_name(handle: &BackendHandle) -> Result<String> {
    let value = handle
        .client()
        .invoke(Operation::GetProductName, Value::Null)
        .await?;
    decode(Operation::GetProductName, value)
}

fn decode<T: DeserializeOwned>(op: Operation, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| {
        Error::operation_with_context(format!("Unexpected result from '{}'", op), e.to_string())
    })
}

// =============================================================================
// BMC Client
// =============================================================================

/// Routing facade for one BMC connection
pub struct BmcClient {
    config: ConnectionConfig,
    router: Router,
    handles: Vec<BackendHandle>,
    disk_size_probe: Option<DiskSizeProbeRef>,
    nic_probe: Option<NicCapacityProbeRef>,
}

impl std::fmt::Debug for BmcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BmcClient")
            .field("identity", &self.config.identity())
            .field("profile", self.router.profile())
            .field(
                "backends",
                &self.handles.iter().map(|h| h.protocol()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl BmcClient {
    /// Connect to a BMC and resolve its generation
    pub async fn connect(
        config: &ConnectionConfig,
        connector: &dyn ProtocolConnector,
        options: &ClientOptions,
    ) -> Result<Self> {
        config.validate()?;

        let (profile, handles) = if config.force_standard {
            let standard = build_handle(connector, Protocol::Standard, config).await?;
            let product_name = probe_product_name(&standard).await?;
            (
                ServerProfile::standard_only(product_name, &options.markers),
                vec![standard],
            )
        } else {
            let legacy = build_handle(connector, Protocol::Legacy, config).await?;
            match probe_product_name(&legacy).await {
                Ok(product_name) => {
                    let profile = ServerProfile::probed(product_name, &options.markers);
                    let mut handles = vec![legacy];
                    match profile.generation {
                        Generation::Newest => handles
                            .push(build_handle(connector, Protocol::Standard, config).await?),
                        Generation::Mid => handles
                            .push(build_handle(connector, Protocol::Predecessor, config).await?),
                        Generation::Legacy => {}
                    }
                    (profile, handles)
                }
                Err(e) if e.indicates_legacy_unavailable() => {
                    warn!(
                        "Legacy protocol unavailable on {} ({}), assuming newest generation",
                        config.address, e
                    );
                    let standard = build_handle(connector, Protocol::Standard, config).await?;
                    let product_name = probe_product_name(&standard).await?;
                    (ServerProfile::legacy_disabled(product_name), vec![standard])
                }
                Err(e) => return Err(e),
            }
        };

        info!(
            "Connected to {} ({}, generation {})",
            config.address, profile.product_name, profile.generation
        );

        Ok(Self {
            config: config.clone(),
            router: Router::new(profile, SupportTables::builtin()),
            handles,
            disk_size_probe: None,
            nic_probe: None,
        })
    }

    pub fn with_disk_size_probe(mut self, probe: DiskSizeProbeRef) -> Self {
        self.disk_size_probe = Some(probe);
        self
    }

    pub fn with_nic_capacity_probe(mut self, probe: NicCapacityProbeRef) -> Self {
        self.nic_probe = Some(probe);
        self
    }

    pub fn identity(&self) -> ConnectionIdentity {
        self.config.identity()
    }

    pub fn profile(&self) -> &ServerProfile {
        self.router.profile()
    }

    /// Protocols this instance holds clients for
    pub fn protocols(&self) -> Vec<Protocol> {
        self.handles.iter().map(|h| h.protocol()).collect()
    }

    /// Route and invoke `op`, passing arguments and results through
    pub async fn dispatch(&self, op: Operation, args: Value) -> Result<Value> {
        let protocol = self.router.route(op)?;
        let handle = self
            .handles
            .iter()
            .find(|h| h.protocol() == protocol)
            .ok_or_else(|| Error::not_supported(op.as_str()))?;
        debug!("dispatching {} to the {} protocol", op, protocol);
        handle.client().invoke(op, args).await
    }

    /// Dispatch by wire name
    pub async fn dispatch_by_name(&self, name: &str, args: Value) -> Result<Value> {
        let op: Operation = name.parse()?;
        self.dispatch(op, args).await
    }

    async fn call<T: DeserializeOwned>(&self, op: Operation, args: Value) -> Result<T> {
        let value = self.dispatch(op, args).await?;
        decode(op, value)
    }

    // =========================================================================
    // Typed Operations
    // =========================================================================

    pub async fn get_product_name(&self) -> Result<String> {
        self.call(Operation::GetProductName, Value::Null).await
    }

    pub async fn get_host_power_status(&self) -> Result<String> {
        self.call(Operation::GetHostPowerStatus, Value::Null).await
    }

    pub async fn create_raid_configuration(&self, request: &RaidConfigRequest) -> Result<()> {
        self.dispatch(
            Operation::CreateRaidConfiguration,
            json!({ "raid_config": request }),
        )
        .await?;
        Ok(())
    }

    /// Current logical drives; pass the create request to read only the
    /// controllers it targeted
    pub async fn read_raid_configuration(
        &self,
        request: Option<&RaidConfigRequest>,
    ) -> Result<RaidConfiguration> {
        self.call(
            Operation::ReadRaidConfiguration,
            json!({ "raid_config": request }),
        )
        .await
    }

    pub async fn delete_raid_configuration(&self) -> Result<()> {
        self.dispatch(Operation::DeleteRaidConfiguration, Value::Null)
            .await?;
        Ok(())
    }

    /// Sanitize erase every unassigned drive of `media`
    pub async fn do_disk_erase(&self, media: MediaType, pattern: Option<ErasePattern>) -> Result<()> {
        if let Some(pattern) = pattern {
            pattern.validate_for(media)?;
        }
        self.dispatch(
            Operation::DoDiskErase,
            json!({ "disk_type": media, "pattern": pattern }),
        )
        .await?;
        Ok(())
    }

    pub async fn has_disk_erase_completed(&self) -> Result<bool> {
        self.call(Operation::HasDiskEraseCompleted, Value::Null).await
    }

    pub async fn get_available_disk_types(&self) -> Result<Vec<MediaType>> {
        self.call(Operation::GetAvailableDiskTypes, Value::Null).await
    }

    /// Essential scheduling properties
    ///
    /// A zero `local_gb` is replaced by the SNMP disk size when inspection is
    /// enabled and the probe finds one.
    pub async fn get_essential_properties(&self) -> Result<Value> {
        let mut data = self
            .dispatch(Operation::GetEssentialProperties, Value::Null)
            .await?;
        if data.pointer("/properties/local_gb").and_then(Value::as_u64) != Some(0) {
            return Ok(data);
        }

        let credentials = self.config.snmp.as_ref().filter(|c| c.snmp_inspection);
        match (credentials, &self.disk_size_probe) {
            (Some(credentials), Some(probe)) => {
                match probe.local_gb(&self.config.transport_host(), credentials).await? {
                    Some(size) if size > 0 => {
                        if let Some(slot) = data.pointer_mut("/properties/local_gb") {
                            *slot = json!(size);
                        }
                    }
                    _ => debug!("SNMP inspection failed to get the disk size. Returning local_gb as 0."),
                }
            }
            (Some(_), None) => debug!("No disk size probe configured. Returning local_gb as 0."),
            _ => debug!(
                "SNMP credentials were not set and the backend failed to get the disk size. \
                 Returning local_gb as 0."
            ),
        }
        Ok(data)
    }

    /// Hardware capabilities used for scheduling
    ///
    /// Below the newest generation the NIC capacity probe adds `nic_capacity`.
    pub async fn get_server_capabilities(&self) -> Result<Value> {
        let mut capabilities = self
            .dispatch(Operation::GetServerCapabilities, Value::Null)
            .await?;

        let profile = self.profile();
        if profile.generation == Generation::Newest || profile.standard_only {
            return Ok(capabilities);
        }
        let Some(probe) = &self.nic_probe else {
            return Ok(capabilities);
        };

        let major_minor = self
            .dispatch(Operation::GetIloFirmwareVersionAsMajorMinor, Value::Null)
            .await?;
        let target = IpmiTarget {
            address: self.config.address.clone(),
            username: self.config.username.clone(),
            password: self.config.password.clone(),
        };
        if let Some(capacity) = probe.nic_capacity(&target, major_minor.as_str()).await? {
            if let Value::Object(map) = &mut capabilities {
                map.insert("nic_capacity".to_string(), Value::String(capacity));
            }
        }
        Ok(capabilities)
    }
}

// =============================================================================
// Client Factory
// =============================================================================

/// Builds facade instances over one connector
#[derive(Clone)]
pub struct ClientFactory {
    connector: ProtocolConnectorRef,
    options: ClientOptions,
    disk_size_probe: Option<DiskSizeProbeRef>,
    nic_probe: Option<NicCapacityProbeRef>,
}

impl ClientFactory {
    pub fn new(connector: ProtocolConnectorRef, options: ClientOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            connector,
            options,
            disk_size_probe: None,
            nic_probe: None,
        })
    }

    pub fn with_disk_size_probe(mut self, probe: DiskSizeProbeRef) -> Self {
        self.disk_size_probe = Some(probe);
        self
    }

    pub fn with_nic_capacity_probe(mut self, probe: NicCapacityProbeRef) -> Self {
        self.nic_probe = Some(probe);
        self
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Connect a new facade instance
    pub async fn connect(&self, config: &ConnectionConfig) -> Result<BmcClient> {
        let mut client = BmcClient::connect(config, self.connector.as_ref(), &self.options).await?;
        client.disk_size_probe = self.disk_size_probe.clone();
        client.nic_probe = self.nic_probe.clone();
        Ok(client)
    }
}
