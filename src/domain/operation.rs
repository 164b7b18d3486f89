//! Operation vocabulary shared by every backend protocol client
//!
//! Each variant has a stable snake_case wire name. Arguments travel as a
//! JSON object of named parameters; results come back as plain JSON values.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

macro_rules! operations {
    ($($variant:ident => $name:literal,)+) => {
        /// Named operation of the shared management vocabulary
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum Operation {
            $($variant,)+
        }

        impl Operation {
            /// Every operation, in declaration order
            pub const ALL: &'static [Operation] = &[$(Operation::$variant,)+];

            /// Wire name of the operation
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Operation::$variant => $name,)+
                }
            }
        }

        impl FromStr for Operation {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($name => Ok(Operation::$variant),)+
                    other => Err(Error::not_supported(other)),
                }
            }
        }
    };
}

operations! {
    // Licensing and identity
    ActivateLicense => "activate_license",
    GetAllLicenses => "get_all_licenses",
    GetProductName => "get_product_name",
    GetHostUuid => "get_host_uuid",
    GetIloFirmwareVersionAsMajorMinor => "get_ilo_firmware_version_as_major_minor",
    GetEssentialProperties => "get_essential_properties",
    GetServerCapabilities => "get_server_capabilities",

    // Power control
    GetHostPowerStatus => "get_host_power_status",
    GetHostPostState => "get_host_post_state",
    SetHostPower => "set_host_power",
    ResetServer => "reset_server",
    PressPwrBtn => "press_pwr_btn",
    HoldPwrBtn => "hold_pwr_btn",
    InjectNmi => "inject_nmi",
    ResetIlo => "reset_ilo",
    ResetIloCredential => "reset_ilo_credential",

    // Health
    GetHostHealthData => "get_host_health_data",
    GetHostHealthPresentPowerReading => "get_host_health_present_power_reading",
    GetHostHealthPowerSupplies => "get_host_health_power_supplies",
    GetHostHealthFanSensors => "get_host_health_fan_sensors",
    GetHostHealthTemperatureSensors => "get_host_health_temperature_sensors",
    GetHostHealthAtAGlance => "get_host_health_at_a_glance",
    GetHostPowerReadings => "get_host_power_readings",

    // Boot configuration
    GetOneTimeBoot => "get_one_time_boot",
    SetOneTimeBoot => "set_one_time_boot",
    GetCurrentBootMode => "get_current_boot_mode",
    GetPendingBootMode => "get_pending_boot_mode",
    GetSupportedBootMode => "get_supported_boot_mode",
    SetPendingBootMode => "set_pending_boot_mode",
    GetPersistentBoot => "get_persistent_boot",
    GetPersistentBootDevice => "get_persistent_boot_device",
    SetPersistentBoot => "set_persistent_boot",
    UpdatePersistentBoot => "update_persistent_boot",
    GetSecureBootMode => "get_secure_boot_mode",
    SetSecureBootMode => "set_secure_boot_mode",
    ResetSecureBootKeys => "reset_secure_boot_keys",
    ClearSecureBootKeys => "clear_secure_boot_keys",
    GetHttpBootUrl => "get_http_boot_url",
    SetHttpBootUrl => "set_http_boot_url",

    // BIOS settings
    GetCurrentBiosSettings => "get_current_bios_settings",
    GetPendingBiosSettings => "get_pending_bios_settings",
    GetDefaultBiosSettings => "get_default_bios_settings",
    SetBiosSettings => "set_bios_settings",
    GetBiosSettingsResult => "get_bios_settings_result",
    ResetBiosToDefault => "reset_bios_to_default",

    // Virtual media
    GetVmStatus => "get_vm_status",
    SetVmStatus => "set_vm_status",
    InsertVirtualMedia => "insert_virtual_media",
    EjectVirtualMedia => "eject_virtual_media",

    // iSCSI
    SetIscsiInfo => "set_iscsi_info",
    UnsetIscsiInfo => "unset_iscsi_info",
    GetIscsiInitiatorInfo => "get_iscsi_initiator_info",
    SetIscsiInitiatorInfo => "set_iscsi_initiator_info",

    // Firmware
    UpdateFirmware => "update_firmware",

    // RAID and disk erase
    CreateRaidConfiguration => "create_raid_configuration",
    DeleteRaidConfiguration => "delete_raid_configuration",
    ReadRaidConfiguration => "read_raid_configuration",
    DoDiskErase => "do_disk_erase",
    HasDiskEraseCompleted => "has_disk_erase_completed",
    DoOneButtonSecureErase => "do_one_button_secure_erase",
    GetAvailableDiskTypes => "get_available_disk_types",

    // Security and TLS
    AddTlsCertificate => "add_tls_certificate",
    RemoveTlsCertificate => "remove_tls_certificate",
    GetSecurityDashboardValues => "get_security_dashboard_values",
    UpdatePasswordComplexity => "update_password_complexity",
    UpdateRequireLoginForIloRbsu => "update_require_login_for_ilo_rbsu",
    UpdateRequireHostAuthentication => "update_require_host_authentication",
    UpdateMinimumPasswordLength => "update_minimum_password_length",
    UpdateIpmiOverLan => "update_ipmi_over_lan",
    UpdateAuthenticationFailureLogging => "update_authentication_failure_logging",
    UpdateSecureBoot => "update_secure_boot",
    CreateCsr => "create_csr",
    AddHttpsCertificate => "add_https_certificate",
    AddSslCertificate => "add_ssl_certificate",
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Argument Helpers
// =============================================================================

/// Decode a required named argument
pub fn required_arg<T: DeserializeOwned>(op: Operation, args: &Value, name: &str) -> Result<T> {
    optional_arg(op, args, name)?.ok_or_else(|| {
        Error::InvalidInput(format!("'{}' requires the '{}' argument", op, name))
    })
}

/// Decode an optional named argument; `null` counts as absent
pub fn optional_arg<T: DeserializeOwned>(
    op: Operation,
    args: &Value,
    name: &str,
) -> Result<Option<T>> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone()).map(Some).map_err(|e| {
            Error::InvalidInput(format!("invalid '{}' argument for '{}': {}", name, op, e))
        }),
    }
}
