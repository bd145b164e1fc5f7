//! The `server:` clause that opens nsd.conf.
use std::fmt::Write as _;
use std::net::IpAddr;
use std::path::PathBuf;

use crate::config::ServerParams;
use crate::error::ValidationError;
use crate::validation::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSpec {
    pub zonesdir: PathBuf,
    pub ip_addresses: Vec<IpAddr>,
    pub port: u16,
    pub config_file: PathBuf,
}

impl ServerSpec {
    pub fn from_params(params: &ServerParams) -> Result<Self, ValidationError> {
        let zonesdir = absolute_path(&params.zonesdir, "zonesdir")?;
        let ip_addresses = validate_ip_address_array(&[&params.ip_address])?;
        let port = validate_positive_integer(&params.port, "Server port")?;
        let port = u16::try_from(port)
            .map_err(|_| ValidationError::value_error("Server port must be at most 65535."))?;
        let config_file = absolute_path(&params.config_file, "config_file")?;

        Ok(Self {
            zonesdir,
            ip_addresses,
            port,
            config_file,
        })
    }

    pub fn render_fragment(&self) -> String {
        let mut out = String::new();
        // writing into a String cannot fail
        let _ = self.write_fragment(&mut out);
        out
    }

    fn write_fragment(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, "server:")?;
        writeln!(out, "  zonesdir: \"{}\"", self.zonesdir.display())?;
        for addr in &self.ip_addresses {
            writeln!(out, "  ip-address: {addr}")?;
        }
        writeln!(out, "  port: {}", self.port)
    }
}

fn absolute_path(value: &serde_json::Value, what: &str) -> Result<PathBuf, ValidationError> {
    let path = PathBuf::from(validate_string(value)?);
    if !path.is_absolute() {
        return Err(ValidationError::value_error(format!(
            "{what} must be an absolute path, got {value}"
        )));
    }
    Ok(path)
}
