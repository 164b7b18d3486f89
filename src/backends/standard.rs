//! Standardized protocol client
//!
//! Serves the RAID and disk-erase operations from the storage engine and
//! passes everything else through to the underlying transport.

use crate::domain::operation::{optional_arg, required_arg, Operation};
use crate::domain::ports::{Protocol, ProtocolClient, ProtocolClientRef, StorageServiceRef};
use crate::error::Result;
use crate::storage::{
    EraseEngine, ErasePattern, InventoryResolver, MediaType, RaidConfigRequest, RaidEngine,
};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

/// Standardized-protocol client with multi-controller storage support
pub struct StandardClient {
    transport: ProtocolClientRef,
    raid: RaidEngine,
    eraser: EraseEngine,
}

impl StandardClient {
    /// Wrap `transport`, serving storage operations through `storage`
    pub fn new(
        transport: ProtocolClientRef,
        storage: StorageServiceRef,
        unsupported_erase_pattern: &str,
    ) -> Result<Self> {
        let inventory = InventoryResolver::new(storage);
        Ok(Self {
            transport,
            raid: RaidEngine::new(inventory.clone()),
            eraser: EraseEngine::with_unsupported_pattern(inventory, unsupported_erase_pattern)?,
        })
    }

    pub fn raid(&self) -> &RaidEngine {
        &self.raid
    }

    pub fn eraser(&self) -> &EraseEngine {
        &self.eraser
    }
}

#[async_trait]
impl ProtocolClient for StandardClient {
    fn protocol(&self) -> Protocol {
        Protocol::Standard
    }

    async fn invoke(&self, op: Operation, args: Value) -> Result<Value> {
        match op {
            Operation::CreateRaidConfiguration => {
                let request: RaidConfigRequest = required_arg(op, &args, "raid_config")?;
                self.raid.create_raid(&request).await?;
                Ok(Value::Null)
            }
            Operation::ReadRaidConfiguration => {
                let request: Option<RaidConfigRequest> = optional_arg(op, &args, "raid_config")?;
                let config = self.raid.read_raid(request.as_ref()).await?;
                Ok(serde_json::to_value(config)?)
            }
            Operation::DeleteRaidConfiguration => {
                self.raid.delete_raid().await?;
                Ok(Value::Null)
            }
            Operation::DoDiskErase => {
                let media: MediaType = required_arg(op, &args, "disk_type")?;
                let pattern: Option<ErasePattern> = optional_arg(op, &args, "pattern")?;
                self.eraser.erase(media, pattern).await?;
                Ok(Value::Null)
            }
            Operation::HasDiskEraseCompleted => {
                Ok(Value::Bool(self.eraser.erase_completed().await?))
            }
            Operation::GetAvailableDiskTypes => {
                let types = self.eraser.available_disk_types().await?;
                Ok(serde_json::to_value(types)?)
            }
            _ => {
                debug!("passing {} through to the standard transport", op);
                self.transport.invoke(op, args).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::simulated::{SimulatedBmc, SimulatedChassis, SimulatedController};
    use crate::config::DEFAULT_UNSUPPORTED_ERASE_PATTERN;
    use crate::error::Error;
    use assert_matches::assert_matches;
    use serde_json::json;
    use std::sync::Arc;

    fn client() -> (StandardClient, Arc<SimulatedChassis>, Arc<SimulatedBmc>) {
        let chassis = Arc::new(SimulatedChassis::new(vec![SimulatedController::new(
            "HPE Smart Array P408i-a SR Gen10",
            "Slot 0",
        )
        .with_drive("1I:1:1", MediaType::Hdd, 600)
        .with_drive("1I:1:2", MediaType::Hdd, 600)]));
        let transport = Arc::new(
            SimulatedBmc::new(Protocol::Standard, "10.0.0.1")
                .with_response(Operation::GetHostPowerStatus, json!("ON")),
        );
        let client = StandardClient::new(
            transport.clone(),
            chassis.clone(),
            DEFAULT_UNSUPPORTED_ERASE_PATTERN,
        )
        .unwrap();
        (client, chassis, transport)
    }

    #[tokio::test]
    async fn test_storage_operations_served_locally() {
        let (client, chassis, transport) = client();
        let args = json!({
            "raid_config": {
                "logical_disks": [{"raid_level": "1", "size_gb": 100}]
            }
        });
        client
            .invoke(Operation::CreateRaidConfiguration, args.clone())
            .await
            .unwrap();
        assert_eq!(chassis.create_calls().len(), 1);

        let read = client
            .invoke(Operation::ReadRaidConfiguration, args)
            .await
            .unwrap();
        assert_eq!(read["logical_disks"][0]["raid_level"], json!("1"));
        assert_eq!(read["logical_disks"][0]["size_gb"], json!(100));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_other_operations_pass_through() {
        let (client, _, transport) = client();
        let status = client
            .invoke(Operation::GetHostPowerStatus, Value::Null)
            .await
            .unwrap();
        assert_eq!(status, json!("ON"));
        assert_eq!(transport.calls(), vec![(Protocol::Standard, Operation::GetHostPowerStatus)]);
    }

    #[tokio::test]
    async fn test_erase_arguments_are_decoded() {
        let (client, chassis, _) = client();
        client
            .invoke(Operation::DoDiskErase, json!({"disk_type": "HDD", "pattern": null}))
            .await
            .unwrap();
        assert_eq!(chassis.erase_calls()[0].pattern, ErasePattern::Overwrite);

        assert_matches!(
            client.invoke(Operation::DoDiskErase, json!({})).await,
            Err(Error::InvalidInput(_))
        );
        assert_matches!(
            client
                .invoke(Operation::DoDiskErase, json!({"disk_type": "TAPE"}))
                .await,
            Err(Error::InvalidInput(_))
        );
    }

    #[tokio::test]
    async fn test_disk_types_and_erase_status() {
        let (client, _, _) = client();
        let types = client
            .invoke(Operation::GetAvailableDiskTypes, Value::Null)
            .await
            .unwrap();
        assert_eq!(types, json!(["HDD"]));
        let done = client
            .invoke(Operation::HasDiskEraseCompleted, Value::Null)
            .await
            .unwrap();
        assert_eq!(done, json!(false));
    }
}
