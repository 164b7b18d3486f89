//! RAID Provisioning Engine
//!
//! Creates, reads and deletes logical drives across every RAID controller of
//! a chassis. Controllers are independent: a failure on one is collected into
//! an [`AggregatedOutcome`] and the remaining controllers are still
//! processed. Nothing is rolled back, so a failed create may leave logical
//! drives applied on the controllers that succeeded.

use crate::error::{ControllerFailure, Error, Result};
use crate::storage::inventory::InventoryResolver;
use crate::storage::types::{
    Controller, LogicalDiskInfo, LogicalDiskSpec, RaidConfigRequest, RaidConfiguration,
};
use futures::future::join_all;
use indexmap::IndexMap;
use tracing::{debug, info, warn};

/// Specs grouped by controller model; the default controller comes first
pub type ControllerGroups = IndexMap<String, Vec<LogicalDiskSpec>>;

// =============================================================================
// Aggregated Outcome
// =============================================================================

/// Per-controller failures collected while iterating controllers
#[derive(Debug, Default)]
pub struct AggregatedOutcome {
    failures: Vec<ControllerFailure>,
}

impl AggregatedOutcome {
    pub fn record(&mut self, controller: impl Into<String>, message: impl Into<String>) {
        let failure = ControllerFailure {
            controller: controller.into(),
            message: message.into(),
        };
        warn!(
            "Storage operation failed on controller {}: {}",
            failure.controller, failure.message
        );
        self.failures.push(failure);
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures(&self) -> &[ControllerFailure] {
        &self.failures
    }

    /// `Ok` when nothing failed, else one error naming every failure
    pub fn into_result(self, operation: &str) -> Result<()> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(Error::ControllerFailures {
                operation: operation.to_string(),
                failures: self.failures,
            })
        }
    }
}

/// Group specs by target controller, preserving input order in each group
pub fn group_by_controller(request: &RaidConfigRequest, default_controller: &str) -> ControllerGroups {
    let mut groups = ControllerGroups::new();
    groups.insert(default_controller.to_string(), Vec::new());
    for spec in &request.logical_disks {
        let controller = spec.controller.as_deref().unwrap_or(default_controller);
        groups
            .entry(controller.to_string())
            .or_default()
            .push(spec.clone());
    }
    groups
}

// =============================================================================
// Per-controller Results
// =============================================================================

/// Result of one controller's share of a multi-controller call
enum ControllerResult<T> {
    Done(T),
    NoLogicalDrives,
    Failed(String),
}

// =============================================================================
// RAID Engine
// =============================================================================

/// Multi-controller RAID provisioning engine
#[derive(Clone)]
pub struct RaidEngine {
    inventory: InventoryResolver,
}

impl RaidEngine {
    pub fn new(inventory: InventoryResolver) -> Self {
        Self { inventory }
    }

    pub fn inventory(&self) -> &InventoryResolver {
        &self.inventory
    }

    /// Group a request against the chassis's default controller
    pub async fn group(&self, request: &RaidConfigRequest) -> Result<ControllerGroups> {
        let default = self.inventory.default_controller().await?;
        Ok(group_by_controller(request, &default.model))
    }

    async fn controller_not_found(&self, model: &str) -> String {
        let models = self.inventory.controller_models().await.unwrap_or_default();
        debug!("controller {} not present, available: {:?}", model, models);
        format!("Controller not found. Available controllers are: {:?}", models)
    }

    /// Create the requested logical drives
    pub async fn create_raid(&self, request: &RaidConfigRequest) -> Result<()> {
        self.inventory.require_storage_configs().await?;
        let groups = self.group(request).await?;
        info!(
            "Creating {} logical drive(s) across {} controller group(s)",
            request.logical_disks.len(),
            groups.len()
        );

        let results = join_all(
            groups
                .iter()
                .map(|(controller, specs)| self.create_on_controller(controller, specs)),
        )
        .await;

        let mut outcome = AggregatedOutcome::default();
        for ((controller, _), result) in groups.iter().zip(results) {
            if let ControllerResult::Failed(message) = result {
                outcome.record(controller.as_str(), message);
            }
        }
        outcome.into_result("create")
    }

    async fn create_on_controller(
        &self,
        controller: &str,
        specs: &[LogicalDiskSpec],
    ) -> ControllerResult<()> {
        let config = match self.inventory.config_for_controller(controller).await {
            Ok(Some(config)) => config,
            Ok(None) => return ControllerResult::Failed(self.controller_not_found(controller).await),
            Err(e) => return ControllerResult::Failed(e.to_string()),
        };
        if specs.is_empty() {
            debug!("no logical drives requested on controller {}", controller);
            return ControllerResult::Done(());
        }
        match self
            .inventory
            .service()
            .create_logical_drives(&config.id, specs)
            .await
        {
            Ok(()) => {
                info!(
                    "Submitted {} logical drive(s) to controller {}",
                    specs.len(),
                    controller
                );
                ControllerResult::Done(())
            }
            Err(e) => ControllerResult::Failed(e.to_string()),
        }
    }

    /// Delete every logical drive on every controller
    pub async fn delete_raid(&self) -> Result<()> {
        let ids = self.inventory.require_storage_configs().await?;
        let controllers = self.inventory.controllers().await?;
        info!("Deleting raid configuration on {} controller(s)", ids.len());

        let results = join_all(ids.iter().map(|id| self.delete_on_config(id, &controllers))).await;

        let mut outcome = AggregatedOutcome::default();
        let mut not_found = 0usize;
        for (label, result) in results {
            match result {
                ControllerResult::Done(()) => {}
                ControllerResult::NoLogicalDrives => not_found += 1,
                ControllerResult::Failed(message) => outcome.record(label, message),
            }
        }

        outcome.into_result("delete")?;
        if not_found == ids.len() {
            return Err(Error::LogicalDriveNotFound(
                "No logical drives are found in any controllers. Nothing to delete.".into(),
            ));
        }
        Ok(())
    }

    async fn delete_on_config(
        &self,
        config_id: &str,
        controllers: &[Controller],
    ) -> (String, ControllerResult<()>) {
        let service = self.inventory.service();
        let config = match service.storage_config(config_id).await {
            Ok(config) => config,
            Err(e) => return (config_id.to_string(), ControllerResult::Failed(e.to_string())),
        };
        let label = label_for(&config.location, config_id, controllers);
        if config.logical_drives.is_empty() {
            debug!("no logical drives on {}", label);
            return (label, ControllerResult::NoLogicalDrives);
        }
        let result = match service.delete_logical_drives(config_id).await {
            Ok(()) => ControllerResult::Done(()),
            Err(Error::LogicalDriveNotFound(_)) => ControllerResult::NoLogicalDrives,
            Err(e) => ControllerResult::Failed(e.to_string()),
        };
        (label, result)
    }

    /// Read logical drives
    ///
    /// With a request (after create) only the requested controllers are
    /// read; without one (after delete) every controller is.
    pub async fn read_raid(&self, request: Option<&RaidConfigRequest>) -> Result<RaidConfiguration> {
        self.inventory.require_storage_configs().await?;
        match request {
            Some(request) => self.read_requested(request).await,
            None => self.read_all().await,
        }
    }

    async fn read_requested(&self, request: &RaidConfigRequest) -> Result<RaidConfiguration> {
        let groups = self.group(request).await?;
        let results = join_all(groups.keys().map(|controller| self.read_controller(controller))).await;

        let mut config = RaidConfiguration::default();
        let mut outcome = AggregatedOutcome::default();
        let mut not_found = 0usize;
        for (controller, result) in groups.keys().zip(results) {
            match result {
                ControllerResult::Done(disks) => config.logical_disks.extend(disks),
                ControllerResult::NoLogicalDrives => not_found += 1,
                ControllerResult::Failed(message) => outcome.record(controller.as_str(), message),
            }
        }

        if not_found == groups.len() {
            return Err(Error::LogicalDriveNotFound(
                "No logical drives are found in any controllers.".into(),
            ));
        }
        outcome.into_result("read")?;
        Ok(config)
    }

    async fn read_controller(&self, controller: &str) -> ControllerResult<Vec<LogicalDiskInfo>> {
        match self.inventory.config_for_controller(controller).await {
            Ok(Some(config)) if config.logical_drives.is_empty() => ControllerResult::NoLogicalDrives,
            Ok(Some(config)) => ControllerResult::Done(
                config
                    .logical_drives
                    .iter()
                    .map(|drive| LogicalDiskInfo::from_drive(drive, controller))
                    .collect(),
            ),
            Ok(None) => ControllerResult::Failed(self.controller_not_found(controller).await),
            Err(e) => ControllerResult::Failed(e.to_string()),
        }
    }

    async fn read_all(&self) -> Result<RaidConfiguration> {
        let ids = self.inventory.require_storage_configs().await?;
        let controllers = self.inventory.controllers().await?;
        let service = self.inventory.service();

        let results = join_all(ids.iter().map(|id| service.storage_config(id))).await;

        let mut config = RaidConfiguration::default();
        let mut outcome = AggregatedOutcome::default();
        for (id, result) in ids.iter().zip(results) {
            match result {
                Ok(storage) => {
                    let Some(controller) =
                        controllers.iter().find(|c| c.location == storage.location)
                    else {
                        debug!("no array controller at {}, skipping {}", storage.location, id);
                        continue;
                    };
                    config.logical_disks.extend(
                        storage
                            .logical_drives
                            .iter()
                            .map(|drive| LogicalDiskInfo::from_drive(drive, &controller.model)),
                    );
                }
                Err(e) => outcome.record(id.as_str(), e.to_string()),
            }
        }

        outcome.into_result("read")?;
        Ok(config)
    }
}

/// Controller model at `location`, falling back to the configuration id
fn label_for(location: &str, config_id: &str, controllers: &[Controller]) -> String {
    controllers
        .iter()
        .find(|c| c.location == location)
        .map(|c| c.model.clone())
        .unwrap_or_else(|| config_id.to_string())
}
