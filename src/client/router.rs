//! Capability router
//!
//! Pure routing decision: given a resolved [`ServerProfile`] and the support
//! tables, pick the protocol that must serve an operation.

use crate::client::profile::{Generation, LegacyState, ServerProfile};
use crate::client::support::SupportTables;
use crate::domain::operation::Operation;
use crate::domain::ports::Protocol;
use crate::error::{Error, Result};

/// Routes operations for one server profile
#[derive(Debug, Clone)]
pub struct Router {
    profile: ServerProfile,
    tables: &'static SupportTables,
}

impl Router {
    pub fn new(profile: ServerProfile, tables: &'static SupportTables) -> Self {
        Self { profile, tables }
    }

    pub fn profile(&self) -> &ServerProfile {
        &self.profile
    }

    /// Protocol that serves `op`, or `NotSupported`
    pub fn route(&self, op: Operation) -> Result<Protocol> {
        if self.profile.standard_only {
            return if self.tables.supports(Protocol::Standard, op) {
                Ok(Protocol::Standard)
            } else {
                Err(Error::not_supported(op.as_str()))
            };
        }

        match self.profile.generation {
            Generation::Newest => {
                if self.tables.supports(Protocol::Standard, op) {
                    Ok(Protocol::Standard)
                } else if self.profile.legacy == LegacyState::Disabled {
                    Err(Error::not_supported(op.as_str()))
                } else {
                    Ok(Protocol::Legacy)
                }
            }
            Generation::Mid if self.tables.supports(Protocol::Predecessor, op) => {
                Ok(Protocol::Predecessor)
            }
            _ => Ok(Protocol::Legacy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerationMarkers;

    fn router(profile: ServerProfile) -> Router {
        Router::new(profile, SupportTables::builtin())
    }

    #[test]
    fn test_newest_generation_routing() {
        let r = router(ServerProfile::probed(
            "ProLiant DL380 Gen10",
            &GenerationMarkers::default(),
        ));
        assert_eq!(r.route(Operation::DoDiskErase).unwrap(), Protocol::Standard);
        assert_eq!(r.route(Operation::GetAllLicenses).unwrap(), Protocol::Legacy);
    }

    #[test]
    fn test_legacy_disabled_has_no_fallback() {
        let r = router(ServerProfile::legacy_disabled("ProLiant DL380 Gen10"));
        assert_eq!(r.route(Operation::SetHostPower).unwrap(), Protocol::Standard);
        assert!(matches!(
            r.route(Operation::GetAllLicenses),
            Err(Error::NotSupported { .. })
        ));
    }

    #[test]
    fn test_mid_generation_routing() {
        let r = router(ServerProfile::probed(
            "ProLiant BL460c Gen9",
            &GenerationMarkers::default(),
        ));
        assert_eq!(
            r.route(Operation::GetIloFirmwareVersionAsMajorMinor).unwrap(),
            Protocol::Predecessor
        );
        assert_eq!(r.route(Operation::DoDiskErase).unwrap(), Protocol::Legacy);
        assert_eq!(r.route(Operation::GetHostUuid).unwrap(), Protocol::Legacy);
    }

    #[test]
    fn test_legacy_generation_always_legacy() {
        let r = router(ServerProfile::probed(
            "ProLiant DL360 G7",
            &GenerationMarkers::default(),
        ));
        for op in Operation::ALL {
            assert_eq!(r.route(*op).unwrap(), Protocol::Legacy);
        }
    }

    #[test]
    fn test_forced_mode_is_exhaustive_and_deterministic() {
        let tables = SupportTables::builtin();
        let r = router(ServerProfile::standard_only(
            "ProLiant DL380 Gen9",
            &GenerationMarkers::default(),
        ));
        for op in Operation::ALL {
            let first = r.route(*op);
            let second = r.route(*op);
            if tables.supports(Protocol::Standard, *op) {
                assert_eq!(first.unwrap(), Protocol::Standard);
                assert_eq!(second.unwrap(), Protocol::Standard);
            } else {
                assert!(matches!(first, Err(Error::NotSupported { .. })));
                assert!(matches!(second, Err(Error::NotSupported { .. })));
            }
        }
    }
}
