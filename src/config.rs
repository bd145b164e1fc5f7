//! Declarative manifest and the raw, untyped parameter sets it carries.
//!
//! Parameters are kept as [`serde_json::Value`] so that a wrongly typed entry
//! is reported by the validators with the operator-facing message, instead of
//! failing JSON decoding with a serde error.
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::DeployError;

pub const DEFAULT_TTL: u64 = 86400;
pub const DEFAULT_REFRESH: u64 = 28800;
pub const DEFAULT_RETRY: u64 = 7200;
pub const DEFAULT_EXPIRE: u64 = 864000;
pub const DEFAULT_CONTROL_PORT: u16 = 8952;
pub const DEFAULT_SERVER_PORT: u16 = 53;
pub const DEFAULT_ZONESDIR: &str = "/etc/nsd";
pub const DEFAULT_CONFIG_FILE: &str = "/etc/nsd/nsd.conf";

/// Everything to render for one NSD host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Manifest {
    pub server: ServerParams,
    pub remote: Option<RemoteParams>,
    pub zones: Vec<ZoneParams>,
}

impl Manifest {
    pub fn from_json(text: &str) -> Result<Self, DeployError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Read and decode a manifest file.
pub fn load_manifest(path: &Path) -> Result<Manifest, DeployError> {
    let text = std::fs::read_to_string(path).map_err(|e| DeployError::io(path, e))?;
    Manifest::from_json(&text)
}

/// Parameters of the `server:` clause and the location of nsd.conf.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerParams {
    pub zonesdir: Value,
    pub ip_address: Value,
    pub port: Value,
    pub config_file: Value,
}

impl Default for ServerParams {
    fn default() -> Self {
        Self {
            zonesdir: json!(DEFAULT_ZONESDIR),
            ip_address: json!([]),
            port: json!(DEFAULT_SERVER_PORT),
            config_file: json!(DEFAULT_CONFIG_FILE),
        }
    }
}

/// Parameters of one managed zone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ZoneParams {
    pub domain: String,
    /// Defaults to `admin@<domain>`.
    #[serde(default)]
    pub admin_email: Option<Value>,
    #[serde(default)]
    pub serial_number: Option<Value>,
    #[serde(default = "empty_array")]
    pub nameservers: Value,
    #[serde(default = "default_ttl")]
    pub ttl: Value,
    #[serde(default = "default_refresh")]
    pub refresh: Value,
    #[serde(default = "default_retry")]
    pub retry: Value,
    #[serde(default = "default_expire")]
    pub expire: Value,
    /// Priority (as a decimal string key) to exchanger hostname.
    #[serde(default = "empty_object")]
    pub mxservers: Value,
    #[serde(default = "empty_array")]
    pub records: Value,
}

impl ZoneParams {
    /// A parameter set with every default applied.
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            admin_email: None,
            serial_number: None,
            nameservers: empty_array(),
            ttl: default_ttl(),
            refresh: default_refresh(),
            retry: default_retry(),
            expire: default_expire(),
            mxservers: empty_object(),
            records: empty_array(),
        }
    }
}

/// Parameters of the `remote-control:` clause and its TLS credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteParams {
    pub enable: Value,
    pub port: Value,
    /// A single address or an array of them.
    pub interface: Value,
    pub server_key_manage: Value,
    pub server_key_file: Option<Value>,
    pub server_cert_manage: Value,
    pub server_cert_file: Option<Value>,
    pub control_key_manage: Value,
    pub control_key_file: Option<Value>,
    pub control_cert_manage: Value,
    pub control_cert_file: Option<Value>,
}

impl Default for RemoteParams {
    fn default() -> Self {
        Self {
            enable: json!(true),
            port: json!(DEFAULT_CONTROL_PORT),
            interface: json!(["127.0.0.1"]),
            server_key_manage: json!(false),
            server_key_file: None,
            server_cert_manage: json!(false),
            server_cert_file: None,
            control_key_manage: json!(false),
            control_key_file: None,
            control_cert_manage: json!(false),
            control_cert_file: None,
        }
    }
}

fn empty_array() -> Value {
    json!([])
}

fn empty_object() -> Value {
    json!({})
}

fn default_ttl() -> Value {
    json!(DEFAULT_TTL)
}

fn default_refresh() -> Value {
    json!(DEFAULT_REFRESH)
}

fn default_retry() -> Value {
    json!(DEFAULT_RETRY)
}

fn default_expire() -> Value {
    json!(DEFAULT_EXPIRE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_manifest_uses_defaults() {
        let manifest = Manifest::from_json("{}").unwrap();
        assert!(manifest.remote.is_none());
        assert!(manifest.zones.is_empty());
        assert_eq!(manifest.server.port, json!(53));
        assert_eq!(manifest.server.zonesdir, json!("/etc/nsd"));
    }

    #[test]
    fn zone_defaults_are_filled_in() {
        let manifest = Manifest::from_json(
            r#"{"zones": [{"domain": "example.com", "serial_number": 1}]}"#,
        )
        .unwrap();
        let zone = &manifest.zones[0];
        assert_eq!(zone.domain, "example.com");
        assert!(zone.admin_email.is_none());
        assert_eq!(zone.ttl, json!(86400));
        assert_eq!(zone.refresh, json!(28800));
        assert_eq!(zone.retry, json!(7200));
        assert_eq!(zone.expire, json!(864000));
        assert_eq!(zone.nameservers, json!([]));
        assert_eq!(zone.mxservers, json!({}));
        assert_eq!(zone.records, json!([]));
    }

    #[test]
    fn remote_defaults_are_filled_in() {
        let manifest = Manifest::from_json(r#"{"remote": {"port": 2222}}"#).unwrap();
        let remote = manifest.remote.unwrap();
        assert_eq!(remote.enable, json!(true));
        assert_eq!(remote.port, json!(2222));
        assert_eq!(remote.interface, json!(["127.0.0.1"]));
        assert_eq!(remote.server_key_manage, json!(false));
        assert!(remote.server_key_file.is_none());
    }

    #[test]
    fn wrongly_typed_values_still_decode() {
        let manifest = Manifest::from_json(
            r#"{"zones": [{"domain": "example.com", "ttl": "ttl", "nameservers": "ns1."}]}"#,
        )
        .unwrap();
        assert_eq!(manifest.zones[0].ttl, json!("ttl"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Manifest::from_json(r#"{"zone": []}"#).is_err());
        assert!(Manifest::from_json(r#"{"remote": {"prot": 1}}"#).is_err());
    }
}
