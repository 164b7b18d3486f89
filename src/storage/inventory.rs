//! Controller/Drive Inventory Resolver
//!
//! Correlates controller models, array controllers and storage configuration
//! resources of one chassis. Nothing is cached; every call reads live
//! inventory through the [`StorageService`] port.

use crate::domain::ports::StorageService;
use crate::error::{Error, Result};
use crate::storage::types::{
    Controller, DiskProperties, MediaType, PhysicalDrive, StorageConfig,
};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Resolves live storage inventory of a chassis
#[derive(Clone)]
pub struct InventoryResolver {
    service: Arc<dyn StorageService>,
}

impl InventoryResolver {
    pub fn new(service: Arc<dyn StorageService>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &Arc<dyn StorageService> {
        &self.service
    }

    /// All array controllers in enumeration order
    pub async fn controllers(&self) -> Result<Vec<Controller>> {
        self.service.array_controllers().await
    }

    /// Models of all array controllers
    pub async fn controller_models(&self) -> Result<Vec<String>> {
        Ok(self
            .controllers()
            .await?
            .into_iter()
            .map(|c| c.model)
            .collect())
    }

    /// The first enumerated controller
    pub async fn default_controller(&self) -> Result<Controller> {
        self.controllers()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::operation("No array controllers found in the chassis"))
    }

    pub async fn controller_by_model(&self, model: &str) -> Result<Option<Controller>> {
        Ok(self
            .controllers()
            .await?
            .into_iter()
            .find(|c| c.model == model))
    }

    /// Storage configuration ids, failing when the collection is missing
    pub async fn require_storage_configs(&self) -> Result<Vec<String>> {
        match self.service.storage_config_ids().await? {
            Some(ids) => Ok(ids),
            None => {
                debug!("storage configuration collection is missing");
                Err(Error::operation(
                    "The storage controller failed to get the storage configuration \
                     controller configurations.",
                ))
            }
        }
    }

    /// Storage configuration of the controller with `model`
    ///
    /// `None` when no controller has that model, or no configuration shares
    /// its location.
    pub async fn config_for_controller(&self, model: &str) -> Result<Option<StorageConfig>> {
        let Some(controller) = self.controller_by_model(model).await? else {
            return Ok(None);
        };
        let ids = self
            .service
            .storage_config_ids()
            .await?
            .unwrap_or_default();
        for id in ids {
            let config = self.service.storage_config(&id).await?;
            if config.location == controller.location {
                return Ok(Some(config));
            }
        }
        Ok(None)
    }

    /// Locations of every drive that is a member of any logical drive
    pub async fn drives_with_raid(&self) -> Result<HashSet<String>> {
        let mut drives = HashSet::new();
        for id in self.require_storage_configs().await? {
            let config = self.service.storage_config(&id).await?;
            for logical in &config.logical_drives {
                drives.extend(logical.data_drives.iter().cloned());
            }
        }
        Ok(drives)
    }

    pub async fn physical_drives(&self, controller: &Controller) -> Result<Vec<PhysicalDrive>> {
        self.service.physical_drives(controller).await
    }

    /// Drives of `controller` with the given media type
    pub async fn drives_of_type(
        &self,
        controller: &Controller,
        media: MediaType,
    ) -> Result<Vec<PhysicalDrive>> {
        Ok(self
            .physical_drives(controller)
            .await?
            .into_iter()
            .filter(|d| d.media_type == media)
            .collect())
    }

    /// Properties of the drive at `location`, searching every controller
    pub async fn disk_properties(&self, location: &str) -> Result<Option<DiskProperties>> {
        for controller in self.controllers().await? {
            if let Some(drive) = self
                .physical_drives(&controller)
                .await?
                .into_iter()
                .find(|d| d.location == location)
            {
                return Ok(Some(drive.properties()));
            }
        }
        Ok(None)
    }

    /// Distinct media types present in the chassis
    pub async fn available_disk_types(&self) -> Result<Vec<MediaType>> {
        let mut types = BTreeSet::new();
        for controller in self.controllers().await? {
            for drive in self.physical_drives(&controller).await? {
                types.insert(drive.media_type);
            }
        }
        Ok(types.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::simulated::{SimulatedChassis, SimulatedController};
    use crate::storage::types::LogicalDrive;

    fn chassis() -> Arc<SimulatedChassis> {
        let a = SimulatedController::new("HPE Smart Array P408i-a SR Gen10", "Slot 0")
            .with_drive("1I:1:1", MediaType::Hdd, 600)
            .with_drive("1I:1:2", MediaType::Hdd, 600)
            .with_logical_drive(LogicalDrive {
                id: "1".into(),
                name: "ld1".into(),
                capacity_mib: 102_400,
                raid: "Raid1".into(),
                volume_unique_id: "AAAA".into(),
                data_drives: vec!["1I:1:1".into(), "1I:1:2".into()],
            });
        let b = SimulatedController::new("HPE Smart Array P816i-a SR Gen10", "Slot 3")
            .with_drive("2I:1:1", MediaType::Ssd, 480);
        Arc::new(SimulatedChassis::new(vec![a, b]))
    }

    #[tokio::test]
    async fn test_default_controller_is_first() {
        let inventory = InventoryResolver::new(chassis());
        let default = inventory.default_controller().await.unwrap();
        assert_eq!(default.model, "HPE Smart Array P408i-a SR Gen10");
    }

    #[tokio::test]
    async fn test_config_correlates_by_location() {
        let inventory = InventoryResolver::new(chassis());
        let config = inventory
            .config_for_controller("HPE Smart Array P816i-a SR Gen10")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(config.location, "Slot 3");
        assert!(inventory
            .config_for_controller("No Such Controller")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_drives_with_raid_spans_chassis() {
        let inventory = InventoryResolver::new(chassis());
        let assigned = inventory.drives_with_raid().await.unwrap();
        assert_eq!(assigned.len(), 2);
        assert!(assigned.contains("1I:1:1"));
        assert!(!assigned.contains("2I:1:1"));
    }

    #[tokio::test]
    async fn test_disk_properties_and_types() {
        let inventory = InventoryResolver::new(chassis());
        let props = inventory.disk_properties("2I:1:1").await.unwrap().unwrap();
        assert_eq!(props.media_type, MediaType::Ssd);
        assert_eq!(props.size_gb, 480);

        let types = inventory.available_disk_types().await.unwrap();
        assert_eq!(types, vec![MediaType::Hdd, MediaType::Ssd]);
    }

    #[tokio::test]
    async fn test_missing_config_collection_fails_fast() {
        let chassis = chassis();
        chassis.set_config_collection_missing(true);
        let inventory = InventoryResolver::new(chassis);
        assert!(matches!(
            inventory.require_storage_configs().await,
            Err(Error::Operation { .. })
        ));
    }
}
