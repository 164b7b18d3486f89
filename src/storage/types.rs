//! Storage resource types
//!
//! Controllers, drives and RAID request/response shapes exchanged between
//! the RAID engine, the storage service port and callers.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Erase-reason code reported by a drive once sanitize erase has finished
pub const ERASE_COMPLETED: &str = "EraseCompleted";

// =============================================================================
// Media Type
// =============================================================================

/// Physical drive media type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MediaType {
    Hdd,
    Ssd,
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaType::Hdd => write!(f, "HDD"),
            MediaType::Ssd => write!(f, "SSD"),
        }
    }
}

impl FromStr for MediaType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "HDD" => Ok(MediaType::Hdd),
            "SSD" => Ok(MediaType::Ssd),
            other => Err(Error::InvalidInput(format!(
                "Invalid disk type '{}'. Valid values are HDD or SSD",
                other
            ))),
        }
    }
}

// =============================================================================
// Erase Pattern
// =============================================================================

/// Sanitize erase pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErasePattern {
    /// Overwrite (HDD only)
    Overwrite,
    /// Block erase (SSD only)
    Block,
    /// Cryptographic erase
    Crypto,
    /// Zero fill
    Zero,
}

impl ErasePattern {
    /// Pattern used when the caller does not pick one
    pub fn default_for(media: MediaType) -> Self {
        match media {
            MediaType::Hdd => ErasePattern::Overwrite,
            MediaType::Ssd => ErasePattern::Block,
        }
    }

    /// Check the pattern applies to the media type
    pub fn validate_for(self, media: MediaType) -> Result<()> {
        let allowed = match (self, media) {
            (ErasePattern::Overwrite, MediaType::Ssd) => false,
            (ErasePattern::Block, MediaType::Hdd) => false,
            _ => true,
        };
        if allowed {
            Ok(())
        } else {
            Err(Error::InvalidInput(format!(
                "Erase pattern '{}' is not valid for {} drives",
                self, media
            )))
        }
    }
}

impl fmt::Display for ErasePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErasePattern::Overwrite => write!(f, "overwrite"),
            ErasePattern::Block => write!(f, "block"),
            ErasePattern::Crypto => write!(f, "crypto"),
            ErasePattern::Zero => write!(f, "zero"),
        }
    }
}

impl FromStr for ErasePattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "overwrite" => Ok(ErasePattern::Overwrite),
            "block" => Ok(ErasePattern::Block),
            "crypto" => Ok(ErasePattern::Crypto),
            "zero" => Ok(ErasePattern::Zero),
            other => Err(Error::InvalidInput(format!("Unknown erase pattern '{}'", other))),
        }
    }
}

// =============================================================================
// RAID Level
// =============================================================================

/// RAID level as requested by callers ("0", "1", "1+0", ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RaidLevelRepr", into = "String")]
pub enum RaidLevel {
    Raid0,
    Raid1,
    Raid10,
    Raid5,
    Raid6,
    Raid50,
    Raid60,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RaidLevelRepr {
    Number(u64),
    Text(String),
}

impl TryFrom<RaidLevelRepr> for RaidLevel {
    type Error = Error;

    fn try_from(repr: RaidLevelRepr) -> Result<Self> {
        match repr {
            RaidLevelRepr::Number(n) => n.to_string().parse(),
            RaidLevelRepr::Text(s) => s.parse(),
        }
    }
}

impl From<RaidLevel> for String {
    fn from(level: RaidLevel) -> Self {
        level.to_string()
    }
}

impl RaidLevel {
    /// Name the controller firmware uses for this level
    pub fn controller_name(&self) -> &'static str {
        match self {
            RaidLevel::Raid0 => "Raid0",
            RaidLevel::Raid1 => "Raid1",
            RaidLevel::Raid10 => "Raid10",
            RaidLevel::Raid5 => "Raid5",
            RaidLevel::Raid6 => "Raid6",
            RaidLevel::Raid50 => "Raid50",
            RaidLevel::Raid60 => "Raid60",
        }
    }

    /// Parse the controller firmware name
    pub fn from_controller_name(name: &str) -> Option<Self> {
        match name {
            "Raid0" => Some(RaidLevel::Raid0),
            "Raid1" => Some(RaidLevel::Raid1),
            "Raid10" | "Raid1ADM" | "Raid10ADM" => Some(RaidLevel::Raid10),
            "Raid5" => Some(RaidLevel::Raid5),
            "Raid6" => Some(RaidLevel::Raid6),
            "Raid50" => Some(RaidLevel::Raid50),
            "Raid60" => Some(RaidLevel::Raid60),
            _ => None,
        }
    }
}

impl fmt::Display for RaidLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RaidLevel::Raid0 => "0",
            RaidLevel::Raid1 => "1",
            RaidLevel::Raid10 => "1+0",
            RaidLevel::Raid5 => "5",
            RaidLevel::Raid6 => "6",
            RaidLevel::Raid50 => "5+0",
            RaidLevel::Raid60 => "6+0",
        };
        f.write_str(s)
    }
}

impl FromStr for RaidLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "0" => Ok(RaidLevel::Raid0),
            "1" => Ok(RaidLevel::Raid1),
            "1+0" | "10" => Ok(RaidLevel::Raid10),
            "5" => Ok(RaidLevel::Raid5),
            "6" => Ok(RaidLevel::Raid6),
            "5+0" | "50" => Ok(RaidLevel::Raid50),
            "6+0" | "60" => Ok(RaidLevel::Raid60),
            other => Err(Error::InvalidInput(format!("Unsupported raid level '{}'", other))),
        }
    }
}

// =============================================================================
// Logical Disk Size
// =============================================================================

/// Requested logical disk size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DiskSize {
    /// Size in GiB
    Gb(u64),
    /// Use all remaining capacity ("MAX")
    Max(MaxMarker),
}

/// The literal `"MAX"` size marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaxMarker {
    #[serde(rename = "MAX")]
    Max,
}

impl DiskSize {
    pub const MAX: DiskSize = DiskSize::Max(MaxMarker::Max);
}

// =============================================================================
// Request Shapes
// =============================================================================

/// One requested logical disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalDiskSpec {
    pub raid_level: RaidLevel,
    pub size_gb: DiskSize,
    /// Explicit member drives by location (e.g. "1I:1:1")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_disks: Option<Vec<String>>,
    /// Target controller model; absent means the default controller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<String>,
    /// Backend-specific keys carried through untouched
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl LogicalDiskSpec {
    pub fn new(raid_level: RaidLevel, size_gb: DiskSize) -> Self {
        Self {
            raid_level,
            size_gb,
            physical_disks: None,
            controller: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn on_controller(mut self, controller: impl Into<String>) -> Self {
        self.controller = Some(controller.into());
        self
    }

    pub fn with_physical_disks<I, S>(mut self, disks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.physical_disks = Some(disks.into_iter().map(Into::into).collect());
        self
    }
}

/// Target RAID configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RaidConfigRequest {
    pub logical_disks: Vec<LogicalDiskSpec>,
}

// =============================================================================
// Hardware Inventory
// =============================================================================

/// RAID controller as enumerated from the chassis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Controller {
    /// Model name, unique within a chassis
    pub model: String,
    /// Slot/location, correlates with a storage configuration
    pub location: String,
    /// Resource identity path
    pub identity: String,
}

/// Physical drive attached to a controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalDrive {
    pub location: String,
    pub media_type: MediaType,
    pub capacity_gb: u64,
    #[serde(default)]
    pub serial_number: String,
    /// Status reasons, e.g. "EraseInProgress", "EraseCompleted"
    #[serde(default)]
    pub erase_reasons: Vec<String>,
}

impl PhysicalDrive {
    pub fn erase_completed(&self) -> bool {
        self.erase_reasons.iter().any(|r| r == ERASE_COMPLETED)
    }

    pub fn properties(&self) -> DiskProperties {
        DiskProperties {
            serial_number: self.serial_number.clone(),
            size_gb: self.capacity_gb,
            media_type: self.media_type,
            location: self.location.clone(),
        }
    }
}

/// Summary of a drive reported when it is skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskProperties {
    pub serial_number: String,
    pub size_gb: u64,
    pub media_type: MediaType,
    pub location: String,
}

/// Logical drive as read back from a controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalDrive {
    pub id: String,
    pub name: String,
    pub capacity_mib: u64,
    /// Controller firmware raid name (e.g. "Raid1")
    pub raid: String,
    pub volume_unique_id: String,
    /// Member drive locations
    #[serde(default)]
    pub data_drives: Vec<String>,
}

/// Per-controller storage configuration resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub id: String,
    pub location: String,
    #[serde(default)]
    pub logical_drives: Vec<LogicalDrive>,
}

// =============================================================================
// Read Shapes
// =============================================================================

/// Root device hint for a logical disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootDeviceHint {
    pub wwn: String,
}

/// Logical disk as reported to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalDiskInfo {
    pub size_gb: u64,
    pub raid_level: String,
    pub controller: String,
    pub physical_disks: Vec<String>,
    pub volume_name: String,
    pub root_device_hint: RootDeviceHint,
}

impl LogicalDiskInfo {
    pub fn from_drive(drive: &LogicalDrive, controller: &str) -> Self {
        let raid_level = RaidLevel::from_controller_name(&drive.raid)
            .map(|level| level.to_string())
            .unwrap_or_else(|| drive.raid.clone());
        Self {
            size_gb: drive.capacity_mib / 1024,
            raid_level,
            controller: controller.to_string(),
            physical_disks: drive.data_drives.clone(),
            volume_name: drive.name.clone(),
            root_device_hint: RootDeviceHint {
                wwn: format!("0x{}", drive.volume_unique_id),
            },
        }
    }
}

/// Current RAID configuration across controllers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaidConfiguration {
    pub logical_disks: Vec<LogicalDiskInfo>,
}
