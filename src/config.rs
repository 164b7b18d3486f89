//! Client configuration
//!
//! Connection parameters, SNMP inspection credentials and facade options.
//! Everything here deserializes from YAML so callers can keep it in files.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv6Addr;
use std::path::{Path, PathBuf};
use tracing::debug;

// =============================================================================
// Defaults
// =============================================================================

/// Default transport timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default HTTPS port of the BMC
pub const DEFAULT_PORT: u16 = 443;

/// Default capacity of the client cache
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Controller family that cannot sanitize-erase drives
pub const DEFAULT_UNSUPPORTED_ERASE_PATTERN: &str = r"^HPE Smart Array S[0-9]{3}";

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

// =============================================================================
// Connection Identity
// =============================================================================

/// Cache key of a facade instance
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ConnectionIdentity {
    pub address: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for ConnectionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionIdentity")
            .field("address", &self.address)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

// =============================================================================
// SNMP Credentials
// =============================================================================

/// Out-of-band inspection credentials (SNMPv3)
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnmpCredentials {
    /// Whether SNMP inspection should be used at all
    #[serde(default)]
    pub snmp_inspection: bool,
    #[serde(default)]
    pub auth_user: Option<String>,
    #[serde(default)]
    pub auth_prot_pp: Option<String>,
    #[serde(default)]
    pub auth_priv_pp: Option<String>,
    /// SHA or MD5 (MD5 when absent)
    #[serde(default)]
    pub auth_protocol: Option<String>,
    /// AES or DES (DES when absent)
    #[serde(default)]
    pub priv_protocol: Option<String>,
}

impl fmt::Debug for SnmpCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnmpCredentials")
            .field("snmp_inspection", &self.snmp_inspection)
            .field("auth_user", &self.auth_user)
            .field("auth_protocol", &self.auth_protocol)
            .field("priv_protocol", &self.priv_protocol)
            .finish_non_exhaustive()
    }
}

impl SnmpCredentials {
    /// Validate the credentials
    ///
    /// With inspection enabled the user and both pass phrases are all
    /// required, and the protocols must come from their small value sets.
    pub fn validate(&self) -> Result<()> {
        if !self.snmp_inspection {
            debug!("snmp_inspection set to false, SNMP inspection will not be performed");
            return Ok(());
        }

        let present = |v: &Option<String>| v.as_deref().map(|s| !s.is_empty()).unwrap_or(false);
        if !(present(&self.auth_user) && present(&self.auth_prot_pp) && present(&self.auth_priv_pp))
        {
            return Err(Error::InvalidInput(
                "Either few or all mandatory SNMP credentials are missing.".into(),
            ));
        }

        match self.auth_protocol.as_deref() {
            None => debug!("SNMP auth protocol not provided, MD5 will be used"),
            Some("SHA") | Some("MD5") => {}
            Some(_) => {
                return Err(Error::InvalidInput(
                    "Invalid SNMP auth protocol provided. Valid values are SHA or MD5".into(),
                ))
            }
        }

        match self.priv_protocol.as_deref() {
            None => debug!("SNMP privacy protocol not provided, DES will be used"),
            Some("AES") | Some("DES") => {}
            Some(_) => {
                return Err(Error::InvalidInput(
                    "Invalid SNMP privacy protocol provided. Valid values are AES or DES".into(),
                ))
            }
        }

        Ok(())
    }

    /// Effective auth protocol
    pub fn auth_protocol(&self) -> &str {
        self.auth_protocol.as_deref().unwrap_or("MD5")
    }

    /// Effective privacy protocol
    pub fn priv_protocol(&self) -> &str {
        self.priv_protocol.as_deref().unwrap_or("DES")
    }
}

// =============================================================================
// Connection Configuration
// =============================================================================

/// Parameters for connecting to one BMC
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub address: String,
    pub username: String,
    pub password: String,
    /// Transport timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub bios_password: Option<String>,
    /// CA bundle used to verify the BMC certificate
    #[serde(default)]
    pub cacert: Option<PathBuf>,
    #[serde(default)]
    pub snmp: Option<SnmpCredentials>,
    /// Skip protocol detection and use only the standardized protocol
    #[serde(default)]
    pub force_standard: bool,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("address", &self.address)
            .field("username", &self.username)
            .field("timeout_secs", &self.timeout_secs)
            .field("port", &self.port)
            .field("cacert", &self.cacert)
            .field("snmp", &self.snmp)
            .field("force_standard", &self.force_standard)
            .finish_non_exhaustive()
    }
}

impl ConnectionConfig {
    /// Create a configuration with default timeout and port
    pub fn new(
        address: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            username: username.into(),
            password: password.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            port: DEFAULT_PORT,
            bios_password: None,
            cacert: None,
            snmp: None,
            force_standard: false,
        }
    }

    pub fn with_snmp(mut self, snmp: SnmpCredentials) -> Self {
        self.snmp = Some(snmp);
        self
    }

    pub fn standard_only(mut self) -> Self {
        self.force_standard = true;
        self
    }

    /// Load a connection configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Cache key for this connection
    pub fn identity(&self) -> ConnectionIdentity {
        ConnectionIdentity {
            address: self.address.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }

    /// Validate everything that can be checked locally
    pub fn validate(&self) -> Result<()> {
        if self.address.trim().is_empty() {
            return Err(Error::InvalidInput("BMC address is required".into()));
        }
        if self.username.is_empty() {
            return Err(Error::InvalidInput("BMC username is required".into()));
        }
        if let Some(snmp) = &self.snmp {
            snmp.validate()?;
        } else {
            debug!("SNMP credentials not provided, SNMP inspection will not be performed");
        }
        Ok(())
    }

    /// Host as used by the protocol transports (IPv6 literals bracketed)
    pub fn transport_host(&self) -> String {
        let bare = self.address.split('%').next().unwrap_or_default();
        if bare.parse::<Ipv6Addr>().is_ok() {
            format!("[{}]", self.address)
        } else {
            self.address.clone()
        }
    }
}

// =============================================================================
// Generation Markers
// =============================================================================

/// Product-name markers used to classify server generations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationMarkers {
    /// Substrings identifying the newest generation
    pub newest: Vec<String>,
    /// Substrings identifying the mid generation
    pub mid: Vec<String>,
}

impl Default for GenerationMarkers {
    fn default() -> Self {
        Self {
            newest: vec!["Gen10".to_string()],
            mid: vec!["Gen9".to_string()],
        }
    }
}

// =============================================================================
// Client Options
// =============================================================================

/// Facade-wide options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// Keep one facade instance per connection identity
    pub caching: bool,
    /// Maximum number of cached instances
    pub cache_capacity: usize,
    /// Generation classification markers
    pub markers: GenerationMarkers,
    /// Regex of controller models that cannot sanitize-erase
    pub unsupported_erase_pattern: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            caching: true,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            markers: GenerationMarkers::default(),
            unsupported_erase_pattern: DEFAULT_UNSUPPORTED_ERASE_PATTERN.to_string(),
        }
    }
}

impl ClientOptions {
    pub fn validate(&self) -> Result<()> {
        if self.caching && self.cache_capacity == 0 {
            return Err(Error::Configuration(
                "cache_capacity must be at least 1 when caching is enabled".into(),
            ));
        }
        regex::Regex::new(&self.unsupported_erase_pattern).map_err(|e| {
            Error::Configuration(format!("Invalid unsupported_erase_pattern: {}", e))
        })?;
        Ok(())
    }
}
