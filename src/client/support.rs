//! Operation support tables
//!
//! Which operations the predecessor and standardized protocols implement.
//! Anything absent from both is served by the legacy protocol.

use crate::domain::operation::Operation;
use crate::domain::ports::Protocol;
use once_cell::sync::Lazy;
use std::collections::HashSet;

use Operation::*;

const PREDECESSOR_OPERATIONS: &[Operation] = &[
    ActivateLicense,
    ClearSecureBootKeys,
    CreateRaidConfiguration,
    DeleteRaidConfiguration,
    EjectVirtualMedia,
    GetBiosSettingsResult,
    GetCurrentBiosSettings,
    GetCurrentBootMode,
    GetHostPostState,
    GetDefaultBiosSettings,
    GetHostPowerStatus,
    GetHttpBootUrl,
    GetIloFirmwareVersionAsMajorMinor,
    GetOneTimeBoot,
    GetPendingBiosSettings,
    GetPendingBootMode,
    GetPersistentBootDevice,
    GetProductName,
    GetSecureBootMode,
    GetServerCapabilities,
    GetSupportedBootMode,
    GetVmStatus,
    HoldPwrBtn,
    InjectNmi,
    InsertVirtualMedia,
    PressPwrBtn,
    ReadRaidConfiguration,
    ResetBiosToDefault,
    ResetIloCredential,
    ResetSecureBootKeys,
    ResetServer,
    SetBiosSettings,
    SetHostPower,
    SetHttpBootUrl,
    SetOneTimeBoot,
    SetPendingBootMode,
    SetSecureBootMode,
    SetIscsiInfo,
    UnsetIscsiInfo,
    GetIscsiInitiatorInfo,
    SetIscsiInitiatorInfo,
    SetVmStatus,
    UpdateFirmware,
    UpdatePersistentBoot,
];

const STANDARD_OPERATIONS: &[Operation] = &[
    CreateRaidConfiguration,
    DeleteRaidConfiguration,
    DoDiskErase,
    DoOneButtonSecureErase,
    HasDiskEraseCompleted,
    GetProductName,
    GetHostPostState,
    GetHostPowerStatus,
    SetHostPower,
    ResetServer,
    PressPwrBtn,
    HoldPwrBtn,
    GetBiosSettingsResult,
    GetCurrentBiosSettings,
    GetAvailableDiskTypes,
    GetDefaultBiosSettings,
    GetPendingBiosSettings,
    SetBiosSettings,
    GetOneTimeBoot,
    GetPendingBootMode,
    GetCurrentBootMode,
    ActivateLicense,
    EjectVirtualMedia,
    InjectNmi,
    InsertVirtualMedia,
    SetVmStatus,
    UpdateFirmware,
    GetPersistentBootDevice,
    SetOneTimeBoot,
    UpdatePersistentBoot,
    SetPendingBootMode,
    ReadRaidConfiguration,
    ResetIloCredential,
    ResetBiosToDefault,
    GetSecureBootMode,
    SetSecureBootMode,
    ResetSecureBootKeys,
    ClearSecureBootKeys,
    GetServerCapabilities,
    GetSupportedBootMode,
    GetEssentialProperties,
    SetIscsiInfo,
    UnsetIscsiInfo,
    GetIscsiInitiatorInfo,
    SetIscsiInitiatorInfo,
    SetHttpBootUrl,
    GetHttpBootUrl,
    AddTlsCertificate,
    RemoveTlsCertificate,
    GetSecurityDashboardValues,
    UpdatePasswordComplexity,
    UpdateRequireLoginForIloRbsu,
    UpdateRequireHostAuthentication,
    UpdateMinimumPasswordLength,
    UpdateIpmiOverLan,
    UpdateAuthenticationFailureLogging,
    UpdateSecureBoot,
    CreateCsr,
    AddHttpsCertificate,
    AddSslCertificate,
];

static BUILTIN: Lazy<SupportTables> = Lazy::new(|| {
    SupportTables::new(
        PREDECESSOR_OPERATIONS.iter().copied(),
        STANDARD_OPERATIONS.iter().copied(),
    )
});

/// Read-only operation support sets of the two non-legacy protocols
#[derive(Debug, Clone, Default)]
pub struct SupportTables {
    predecessor: HashSet<Operation>,
    standard: HashSet<Operation>,
}

impl SupportTables {
    pub fn new(
        predecessor: impl IntoIterator<Item = Operation>,
        standard: impl IntoIterator<Item = Operation>,
    ) -> Self {
        Self {
            predecessor: predecessor.into_iter().collect(),
            standard: standard.into_iter().collect(),
        }
    }

    /// Process-wide tables, built once on first use
    pub fn builtin() -> &'static SupportTables {
        &BUILTIN
    }

    /// Whether `protocol` is listed as implementing `op`
    ///
    /// The legacy protocol has no table; it is the fallback for everything.
    pub fn supports(&self, protocol: Protocol, op: Operation) -> bool {
        match protocol {
            Protocol::Legacy => true,
            Protocol::Predecessor => self.predecessor.contains(&op),
            Protocol::Standard => self.standard.contains(&op),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_tables() {
        let tables = SupportTables::builtin();
        assert!(tables.supports(Protocol::Standard, DoDiskErase));
        assert!(!tables.supports(Protocol::Predecessor, DoDiskErase));
        assert!(tables.supports(Protocol::Predecessor, GetIloFirmwareVersionAsMajorMinor));
        assert!(!tables.supports(Protocol::Standard, GetIloFirmwareVersionAsMajorMinor));
        assert!(!tables.supports(Protocol::Standard, GetAllLicenses));
        assert!(tables.supports(Protocol::Legacy, GetAllLicenses));
    }

    #[test]
    fn test_builtin_is_shared() {
        assert!(std::ptr::eq(SupportTables::builtin(), SupportTables::builtin()));
    }
}
