//! Sanitize disk erase
//!
//! Erases every unassigned drive of one media type across the chassis.
//! Drives that are members of a logical drive are never submitted, and
//! controllers in the unsupported-erase family are skipped entirely.

use crate::config::DEFAULT_UNSUPPORTED_ERASE_PATTERN;
use crate::error::{Error, Result};
use crate::storage::inventory::InventoryResolver;
use crate::storage::types::{DiskProperties, ErasePattern, MediaType};
use regex::Regex;
use tracing::{debug, info, warn};

/// Disk erase engine bound to one chassis
#[derive(Clone)]
pub struct EraseEngine {
    inventory: InventoryResolver,
    unsupported: Regex,
}

impl std::fmt::Debug for EraseEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EraseEngine")
            .field("unsupported", &self.unsupported)
            .finish_non_exhaustive()
    }
}

impl EraseEngine {
    /// Engine using the default unsupported-controller pattern
    pub fn new(inventory: InventoryResolver) -> Result<Self> {
        Self::with_unsupported_pattern(inventory, DEFAULT_UNSUPPORTED_ERASE_PATTERN)
    }

    pub fn with_unsupported_pattern(inventory: InventoryResolver, pattern: &str) -> Result<Self> {
        let unsupported = Regex::new(pattern).map_err(|e| {
            Error::Configuration(format!("Invalid unsupported erase pattern '{}': {}", pattern, e))
        })?;
        Ok(Self {
            inventory,
            unsupported,
        })
    }

    /// Whether controllers of this model cannot sanitize erase
    pub fn is_unsupported(&self, model: &str) -> bool {
        self.unsupported.is_match(model)
    }

    /// Erase all unassigned drives of `media`
    ///
    /// The first backend error aborts; controllers already submitted keep
    /// erasing.
    pub async fn erase(&self, media: MediaType, pattern: Option<ErasePattern>) -> Result<()> {
        let pattern = match pattern {
            Some(pattern) => {
                pattern.validate_for(media)?;
                pattern
            }
            None => ErasePattern::default_for(media),
        };

        let assigned = self.inventory.drives_with_raid().await?;
        for controller in self.inventory.controllers().await? {
            if self.is_unsupported(&controller.model) {
                warn!(
                    "Smart array controller: {}, doesn't support sanitize disk erase. \
                     All the disks of the controller are ignored.",
                    controller.model
                );
                continue;
            }

            let (skipped, unassigned): (Vec<_>, Vec<_>) = self
                .inventory
                .drives_of_type(&controller, media)
                .await
                .map_err(|e| erase_failure(&controller.model, media, e))?
                .into_iter()
                .partition(|d| assigned.contains(&d.location));

            if !unassigned.is_empty() {
                let config = self
                    .inventory
                    .config_for_controller(&controller.model)
                    .await
                    .map_err(|e| erase_failure(&controller.model, media, e))?
                    .ok_or_else(|| {
                        Error::operation(format!(
                            "No storage configuration found for controller {}",
                            controller.model
                        ))
                    })?;
                let locations: Vec<String> =
                    unassigned.into_iter().map(|d| d.location).collect();
                info!(
                    "Erasing {} {} drive(s) on {} with pattern {}",
                    locations.len(),
                    media,
                    controller.model,
                    pattern
                );
                self.inventory
                    .service()
                    .erase_drives(&config.id, &locations, media, pattern)
                    .await
                    .map_err(|e| erase_failure(&controller.model, media, e))?;
            } else {
                debug!("no unassigned {} drives on {}", media, controller.model);
            }

            if !skipped.is_empty() {
                let disks: Vec<DiskProperties> = skipped.iter().map(|d| d.properties()).collect();
                warn!(
                    "Skipping disk erase of {:?} with logical volumes on them.",
                    disks
                );
            }
        }
        Ok(())
    }

    /// True when every unassigned drive of every erase-capable controller
    /// reports completion
    ///
    /// Members of a logical drive are never submitted by [`erase`] and are
    /// not waited on.
    ///
    /// [`erase`]: EraseEngine::erase
    pub async fn erase_completed(&self) -> Result<bool> {
        let assigned = self
            .inventory
            .drives_with_raid()
            .await
            .map_err(status_failure)?;
        for controller in self.inventory.controllers().await? {
            if self.is_unsupported(&controller.model) {
                continue;
            }
            let drives = self
                .inventory
                .physical_drives(&controller)
                .await
                .map_err(status_failure)?;
            let pending = drives
                .iter()
                .filter(|d| !assigned.contains(&d.location))
                .any(|d| !d.erase_completed());
            if pending {
                debug!("erase still pending on {}", controller.model);
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Sorted distinct media types present in the chassis
    pub async fn available_disk_types(&self) -> Result<Vec<MediaType>> {
        self.inventory.available_disk_types().await
    }
}

fn status_failure(e: Error) -> Error {
    Error::operation_with_context(
        "The storage controller failed to get the status of sanitize disk erase",
        e.to_string(),
    )
}

fn erase_failure(controller: &str, media: MediaType, e: Error) -> Error {
    Error::operation_with_context(
        format!(
            "The storage controller failed to perform the sanitize disk erase on \
             smart storage controller: {}, on disk_type: {}",
            controller, media
        ),
        e.to_string(),
    )
}
