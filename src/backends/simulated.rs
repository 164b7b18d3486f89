//! Simulated BMC backend
//!
//! In-memory protocol clients and storage chassis, driven by a YAML fixture.
//! Used by the CLI for dry runs and by tests to observe routing and storage
//! calls.

use crate::backends::standard::StandardClient;
use crate::client::support::SupportTables;
use crate::config::{ClientOptions, ConnectionConfig, DEFAULT_UNSUPPORTED_ERASE_PATTERN};
use crate::domain::operation::Operation;
use crate::domain::ports::{Protocol, ProtocolClient, ProtocolClientRef, ProtocolConnector, StorageService};
use crate::error::{Error, Result};
use crate::storage::types::{
    Controller, DiskSize, ErasePattern, LogicalDiskSpec, LogicalDrive, MediaType, PhysicalDrive,
    StorageConfig, ERASE_COMPLETED,
};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Shared log of (protocol, operation) pairs served by simulated clients
pub type CallLog = Arc<Mutex<Vec<(Protocol, Operation)>>>;

// =============================================================================
// Simulated Protocol Client
// =============================================================================

/// How a simulated protocol endpoint answers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    /// Answers normally
    #[default]
    Available,
    /// Reachable, but refuses every command
    Disabled,
    /// Transport cannot reach the endpoint
    Unreachable,
}

/// Protocol client answering from canned responses
pub struct SimulatedBmc {
    protocol: Protocol,
    address: String,
    availability: Availability,
    responses: BTreeMap<Operation, Value>,
    calls: CallLog,
}

impl SimulatedBmc {
    pub fn new(protocol: Protocol, address: impl Into<String>) -> Self {
        Self {
            protocol,
            address: address.into(),
            availability: Availability::Available,
            responses: BTreeMap::new(),
            calls: CallLog::default(),
        }
    }

    pub fn with_availability(mut self, availability: Availability) -> Self {
        self.availability = availability;
        self
    }

    pub fn with_response(mut self, op: Operation, value: Value) -> Self {
        self.responses.insert(op, value);
        self
    }

    pub fn with_responses(mut self, responses: BTreeMap<Operation, Value>) -> Self {
        self.responses.extend(responses);
        self
    }

    /// Record into a log shared with other clients
    pub fn with_call_log(mut self, calls: CallLog) -> Self {
        self.calls = calls;
        self
    }

    pub fn calls(&self) -> Vec<(Protocol, Operation)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ProtocolClient for SimulatedBmc {
    fn protocol(&self) -> Protocol {
        self.protocol
    }

    async fn invoke(&self, op: Operation, _args: Value) -> Result<Value> {
        self.calls.lock().push((self.protocol, op));
        match self.availability {
            Availability::Unreachable => {
                return Err(Error::Connection {
                    address: self.address.clone(),
                    reason: "connection refused".into(),
                })
            }
            Availability::Disabled => {
                return Err(Error::operation(format!(
                    "The {} protocol is disabled on this server",
                    self.protocol
                )))
            }
            Availability::Available => {}
        }

        let implemented = SupportTables::builtin().supports(self.protocol, op);
        match self.responses.get(&op) {
            Some(value) if implemented => Ok(value.clone()),
            _ => Err(Error::CommandNotSupported {
                operation: op.to_string(),
                protocol: self.protocol.to_string(),
            }),
        }
    }
}

// =============================================================================
// Simulated Storage Chassis
// =============================================================================

/// Controller description used to seed a [`SimulatedChassis`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatedController {
    pub model: String,
    pub location: String,
    #[serde(default)]
    pub drives: Vec<PhysicalDrive>,
    #[serde(default)]
    pub logical_drives: Vec<LogicalDrive>,
}

impl SimulatedController {
    pub fn new(model: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            location: location.into(),
            drives: Vec::new(),
            logical_drives: Vec::new(),
        }
    }

    pub fn with_drive(mut self, location: impl Into<String>, media: MediaType, capacity_gb: u64) -> Self {
        let location = location.into();
        self.drives.push(PhysicalDrive {
            serial_number: format!("SN-{}", location.replace(':', "")),
            location,
            media_type: media,
            capacity_gb,
            erase_reasons: Vec::new(),
        });
        self
    }

    pub fn with_logical_drive(mut self, drive: LogicalDrive) -> Self {
        self.logical_drives.push(drive);
        self
    }
}

/// Erase request observed by the chassis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EraseCall {
    pub config_id: String,
    pub locations: Vec<String>,
    pub media: MediaType,
    pub pattern: ErasePattern,
}

#[derive(Debug)]
struct ControllerState {
    controller: Controller,
    config_id: String,
    drives: Vec<PhysicalDrive>,
    logical_drives: Vec<LogicalDrive>,
}

#[derive(Debug, Default)]
struct ChassisState {
    controllers: Vec<ControllerState>,
    config_collection_missing: bool,
    next_logical_id: u64,
    create_calls: Vec<(String, Vec<LogicalDiskSpec>)>,
    delete_calls: Vec<String>,
    erase_calls: Vec<EraseCall>,
    /// Injected failures keyed by controller model
    create_failures: HashMap<String, String>,
    delete_failures: HashMap<String, String>,
    erase_failures: HashMap<String, String>,
}

impl ChassisState {
    fn by_config(&mut self, config_id: &str) -> Result<&mut ControllerState> {
        self.controllers
            .iter_mut()
            .find(|c| c.config_id == config_id)
            .ok_or_else(|| Error::operation(format!("Unknown storage configuration {}", config_id)))
    }

    fn by_model(&mut self, model: &str) -> Option<&mut ControllerState> {
        self.controllers.iter_mut().find(|c| c.controller.model == model)
    }
}

/// In-memory chassis implementing the storage service
pub struct SimulatedChassis {
    state: RwLock<ChassisState>,
}

impl SimulatedChassis {
    pub fn new(controllers: Vec<SimulatedController>) -> Self {
        let controllers: Vec<ControllerState> = controllers
            .into_iter()
            .enumerate()
            .map(|(index, c)| ControllerState {
                controller: Controller {
                    model: c.model,
                    location: c.location,
                    identity: format!("/storage/array-controllers/{}", index),
                },
                config_id: format!("storage-config-{}", index),
                drives: c.drives,
                logical_drives: c.logical_drives,
            })
            .collect();
        let next_logical_id = controllers
            .iter()
            .map(|c| c.logical_drives.len() as u64)
            .sum::<u64>()
            + 1;
        Self {
            state: RwLock::new(ChassisState {
                controllers,
                next_logical_id,
                ..Default::default()
            }),
        }
    }

    /// Hide the storage configuration collection
    pub fn set_config_collection_missing(&self, missing: bool) {
        self.state.write().config_collection_missing = missing;
    }

    pub fn config_id_of(&self, model: &str) -> Option<String> {
        self.state
            .read()
            .controllers
            .iter()
            .find(|c| c.controller.model == model)
            .map(|c| c.config_id.clone())
    }

    pub fn add_logical_drive(&self, model: &str, drive: LogicalDrive) {
        if let Some(controller) = self.state.write().by_model(model) {
            controller.logical_drives.push(drive);
        }
    }

    /// Mark the drive at `location` as erased
    pub fn complete_erase(&self, location: &str) {
        let mut state = self.state.write();
        for controller in state.controllers.iter_mut() {
            for drive in controller.drives.iter_mut().filter(|d| d.location == location) {
                drive.erase_reasons = vec![ERASE_COMPLETED.to_string()];
            }
        }
    }

    pub fn fail_create_on(&self, model: &str, message: &str) {
        self.state
            .write()
            .create_failures
            .insert(model.to_string(), message.to_string());
    }

    pub fn fail_delete_on(&self, model: &str, message: &str) {
        self.state
            .write()
            .delete_failures
            .insert(model.to_string(), message.to_string());
    }

    pub fn fail_erase_on(&self, model: &str, message: &str) {
        self.state
            .write()
            .erase_failures
            .insert(model.to_string(), message.to_string());
    }

    pub fn create_calls(&self) -> Vec<(String, Vec<LogicalDiskSpec>)> {
        self.state.read().create_calls.clone()
    }

    pub fn delete_calls(&self) -> Vec<String> {
        self.state.read().delete_calls.clone()
    }

    pub fn erase_calls(&self) -> Vec<EraseCall> {
        self.state.read().erase_calls.clone()
    }
}

#[async_trait]
impl StorageService for SimulatedChassis {
    async fn array_controllers(&self) -> Result<Vec<Controller>> {
        Ok(self
            .state
            .read()
            .controllers
            .iter()
            .map(|c| c.controller.clone())
            .collect())
    }

    async fn physical_drives(&self, controller: &Controller) -> Result<Vec<PhysicalDrive>> {
        self.state
            .read()
            .controllers
            .iter()
            .find(|c| c.controller.identity == controller.identity)
            .map(|c| c.drives.clone())
            .ok_or_else(|| Error::operation(format!("Unknown array controller {}", controller.model)))
    }

    async fn storage_config_ids(&self) -> Result<Option<Vec<String>>> {
        let state = self.state.read();
        if state.config_collection_missing {
            return Ok(None);
        }
        Ok(Some(state.controllers.iter().map(|c| c.config_id.clone()).collect()))
    }

    async fn storage_config(&self, config_id: &str) -> Result<StorageConfig> {
        let mut state = self.state.write();
        let controller = state.by_config(config_id)?;
        Ok(StorageConfig {
            id: controller.config_id.clone(),
            location: controller.controller.location.clone(),
            logical_drives: controller.logical_drives.clone(),
        })
    }

    async fn create_logical_drives(&self, config_id: &str, specs: &[LogicalDiskSpec]) -> Result<()> {
        let mut state = self.state.write();
        let model = state.by_config(config_id)?.controller.model.clone();
        if let Some(message) = state.create_failures.get(&model) {
            return Err(Error::operation(message.clone()));
        }

        let mut next_id = state.next_logical_id;
        let controller = state.by_config(config_id)?;
        for spec in specs {
            let capacity_gb = match spec.size_gb {
                DiskSize::Gb(gb) => gb,
                DiskSize::Max(_) => controller.drives.iter().map(|d| d.capacity_gb).sum(),
            };
            controller.logical_drives.push(LogicalDrive {
                id: next_id.to_string(),
                name: format!("LogicalDrive {}", next_id),
                capacity_mib: capacity_gb * 1024,
                raid: spec.raid_level.controller_name().to_string(),
                volume_unique_id: format!("600508B1001C{:020X}", next_id),
                data_drives: spec.physical_disks.clone().unwrap_or_default(),
            });
            next_id += 1;
        }
        state.next_logical_id = next_id;
        state
            .create_calls
            .push((config_id.to_string(), specs.to_vec()));
        debug!("created {} logical drive(s) on {}", specs.len(), model);
        Ok(())
    }

    async fn delete_logical_drives(&self, config_id: &str) -> Result<()> {
        let mut state = self.state.write();
        let model = state.by_config(config_id)?.controller.model.clone();
        if let Some(message) = state.delete_failures.get(&model) {
            return Err(Error::operation(message.clone()));
        }
        let controller = state.by_config(config_id)?;
        if controller.logical_drives.is_empty() {
            return Err(Error::LogicalDriveNotFound(format!(
                "No logical drives found on {}",
                model
            )));
        }
        controller.logical_drives.clear();
        state.delete_calls.push(config_id.to_string());
        Ok(())
    }

    async fn erase_drives(
        &self,
        config_id: &str,
        locations: &[String],
        media: MediaType,
        pattern: ErasePattern,
    ) -> Result<()> {
        let mut state = self.state.write();
        let model = state.by_config(config_id)?.controller.model.clone();
        if let Some(message) = state.erase_failures.get(&model) {
            return Err(Error::operation(message.clone()));
        }
        let controller = state.by_config(config_id)?;
        for drive in controller
            .drives
            .iter_mut()
            .filter(|d| locations.contains(&d.location))
        {
            drive.erase_reasons = vec!["EraseInProgress".to_string()];
        }
        state.erase_calls.push(EraseCall {
            config_id: config_id.to_string(),
            locations: locations.to_vec(),
            media,
            pattern,
        });
        Ok(())
    }
}

// =============================================================================
// Fixture-driven Connector
// =============================================================================

/// Description of a simulated server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fixture {
    pub product_name: String,
    /// Legacy protocol endpoint behaviour
    #[serde(default)]
    pub legacy: Availability,
    /// Canned responses keyed by operation wire name
    #[serde(default)]
    pub responses: BTreeMap<Operation, Value>,
    #[serde(default)]
    pub controllers: Vec<SimulatedController>,
}

impl Fixture {
    pub fn new(product_name: impl Into<String>) -> Self {
        Self {
            product_name: product_name.into(),
            legacy: Availability::Available,
            responses: BTreeMap::new(),
            controllers: Vec::new(),
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }
}

/// Connector building simulated clients for one fixture
pub struct SimulatedConnector {
    fixture: Fixture,
    chassis: Arc<SimulatedChassis>,
    unsupported_erase_pattern: String,
    calls: CallLog,
    connections: AtomicUsize,
}

impl SimulatedConnector {
    pub fn new(fixture: Fixture) -> Self {
        let chassis = Arc::new(SimulatedChassis::new(fixture.controllers.clone()));
        Self {
            fixture,
            chassis,
            unsupported_erase_pattern: DEFAULT_UNSUPPORTED_ERASE_PATTERN.to_string(),
            calls: CallLog::default(),
            connections: AtomicUsize::new(0),
        }
    }

    /// Take the unsupported-erase pattern from client options
    pub fn with_options(mut self, options: &ClientOptions) -> Self {
        self.unsupported_erase_pattern = options.unsupported_erase_pattern.clone();
        self
    }

    pub fn chassis(&self) -> &Arc<SimulatedChassis> {
        &self.chassis
    }

    /// Every (protocol, operation) served so far
    pub fn calls(&self) -> Vec<(Protocol, Operation)> {
        self.calls.lock().clone()
    }

    /// Number of protocol clients built
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProtocolConnector for SimulatedConnector {
    async fn connect(&self, protocol: Protocol, config: &ConnectionConfig) -> Result<ProtocolClientRef> {
        self.connections.fetch_add(1, Ordering::SeqCst);
        info!(
            "Connecting simulated {} client to {}:{}",
            protocol,
            config.transport_host(),
            config.port
        );

        let availability = match protocol {
            Protocol::Legacy => self.fixture.legacy,
            Protocol::Predecessor | Protocol::Standard => Availability::Available,
        };
        let bmc = SimulatedBmc::new(protocol, config.address.clone())
            .with_availability(availability)
            .with_responses(self.fixture.responses.clone())
            .with_response(
                Operation::GetProductName,
                Value::String(self.fixture.product_name.clone()),
            )
            .with_call_log(self.calls.clone());

        match protocol {
            Protocol::Standard => Ok(Arc::new(StandardClient::new(
                Arc::new(bmc),
                self.chassis.clone(),
                &self.unsupported_erase_pattern,
            )?)),
            _ => Ok(Arc::new(bmc)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use std::io::Write;

    const FIXTURE: &str = r#"
product_name: ProLiant DL380 Gen10
legacy: disabled
responses:
  get_host_power_status: "ON"
controllers:
  - model: HPE Smart Array P408i-a SR Gen10
    location: Slot 0
    drives:
      - location: "1I:1:1"
        media_type: HDD
        capacity_gb: 600
"#;

    #[test]
    fn test_fixture_from_yaml() {
        let fixture = Fixture::from_yaml(FIXTURE).unwrap();
        assert_eq!(fixture.product_name, "ProLiant DL380 Gen10");
        assert_eq!(fixture.legacy, Availability::Disabled);
        assert_eq!(
            fixture.responses.get(&Operation::GetHostPowerStatus),
            Some(&json!("ON"))
        );
        assert_eq!(fixture.controllers[0].drives[0].media_type, MediaType::Hdd);
    }

    #[test]
    fn test_fixture_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FIXTURE.as_bytes()).unwrap();
        let fixture = Fixture::from_yaml_file(file.path()).unwrap();
        assert_eq!(fixture.controllers.len(), 1);
    }

    #[test]
    fn test_fixture_rejects_unknown_operation() {
        let yaml = "product_name: x\nresponses:\n  frobnicate: 1\n";
        assert_matches!(Fixture::from_yaml(yaml), Err(Error::YamlParse(_)));
    }

    #[tokio::test]
    async fn test_bmc_availability() {
        let bmc = SimulatedBmc::new(Protocol::Legacy, "10.0.0.1")
            .with_availability(Availability::Unreachable);
        assert_matches!(
            bmc.invoke(Operation::GetProductName, Value::Null).await,
            Err(Error::Connection { .. })
        );

        let bmc = SimulatedBmc::new(Protocol::Legacy, "10.0.0.1")
            .with_availability(Availability::Disabled);
        assert_matches!(
            bmc.invoke(Operation::GetProductName, Value::Null).await,
            Err(Error::Operation { .. })
        );
    }

    #[tokio::test]
    async fn test_bmc_rejects_operations_outside_its_protocol() {
        let bmc = SimulatedBmc::new(Protocol::Predecessor, "10.0.0.1")
            .with_response(Operation::DoDiskErase, Value::Null);
        assert_matches!(
            bmc.invoke(Operation::DoDiskErase, Value::Null).await,
            Err(Error::CommandNotSupported { .. })
        );
    }

    #[tokio::test]
    async fn test_chassis_create_and_delete() {
        let chassis = SimulatedChassis::new(vec![SimulatedController::new("P408i", "Slot 0")
            .with_drive("1I:1:1", MediaType::Hdd, 600)
            .with_drive("1I:1:2", MediaType::Hdd, 600)]);
        let id = chassis.config_id_of("P408i").unwrap();

        chassis
            .create_logical_drives(
                &id,
                &[LogicalDiskSpec::new(crate::storage::types::RaidLevel::Raid0, DiskSize::MAX)],
            )
            .await
            .unwrap();
        let config = chassis.storage_config(&id).await.unwrap();
        assert_eq!(config.logical_drives[0].capacity_mib, 1200 * 1024);

        chassis.delete_logical_drives(&id).await.unwrap();
        assert_matches!(
            chassis.delete_logical_drives(&id).await,
            Err(Error::LogicalDriveNotFound(_))
        );
    }
}
