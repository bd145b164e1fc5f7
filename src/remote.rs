//! The `remote-control:` clause of nsd.conf and the TLS credentials it uses.
use std::fmt::Write as _;
use std::net::IpAddr;

use serde_json::Value;

use crate::config::RemoteParams;
use crate::deploy::ManagedFile;
use crate::error::ValidationError;
use crate::validation::*;

pub const CREDENTIAL_MODE: u32 = 0o640;

/// One of the four key/cert files nsd-control needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CredentialSlot {
    ServerKey,
    ServerCert,
    ControlKey,
    ControlCert,
}

impl CredentialSlot {
    pub const ALL: [CredentialSlot; 4] = [
        CredentialSlot::ServerKey,
        CredentialSlot::ServerCert,
        CredentialSlot::ControlKey,
        CredentialSlot::ControlCert,
    ];

    /// Fixed deployment target.
    pub fn destination(self) -> &'static str {
        match self {
            CredentialSlot::ServerKey => "/etc/nsd/nsd_server.key",
            CredentialSlot::ServerCert => "/etc/nsd/nsd_server.pem",
            CredentialSlot::ControlKey => "/etc/nsd/nsd_control.key",
            CredentialSlot::ControlCert => "/etc/nsd/nsd_control.pem",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CredentialSlot::ServerKey => "server key",
            CredentialSlot::ServerCert => "server cert",
            CredentialSlot::ControlKey => "control key",
            CredentialSlot::ControlCert => "control cert",
        }
    }

    /// nsd.conf option naming the file.
    pub fn option(self) -> &'static str {
        match self {
            CredentialSlot::ServerKey => "server-key-file",
            CredentialSlot::ServerCert => "server-cert-file",
            CredentialSlot::ControlKey => "control-key-file",
            CredentialSlot::ControlCert => "control-cert-file",
        }
    }

    fn params(self, params: &RemoteParams) -> (&Value, Option<&Value>) {
        match self {
            CredentialSlot::ServerKey => {
                (&params.server_key_manage, params.server_key_file.as_ref())
            }
            CredentialSlot::ServerCert => {
                (&params.server_cert_manage, params.server_cert_file.as_ref())
            }
            CredentialSlot::ControlKey => {
                (&params.control_key_manage, params.control_key_file.as_ref())
            }
            CredentialSlot::ControlCert => {
                (&params.control_cert_manage, params.control_cert_file.as_ref())
            }
        }
    }
}

/// A credential to deploy: slot plus the location to copy it from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub slot: CredentialSlot,
    pub source: String,
}

/// Validated remote-control settings. A disabled spec carries nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteControlSpec {
    enable: bool,
    port: u16,
    interfaces: Vec<IpAddr>,
    credentials: Vec<Credential>,
}

impl RemoteControlSpec {
    pub fn disabled() -> Self {
        Self {
            enable: false,
            port: 0,
            interfaces: Vec::new(),
            credentials: Vec::new(),
        }
    }

    pub fn from_params(params: &RemoteParams) -> Result<Self, ValidationError> {
        if !validate_boolean(&params.enable)? {
            return Ok(Self::disabled());
        }

        let port = validate_positive_integer(&params.port, "Control port")?;
        let port = u16::try_from(port).map_err(|_| {
            ValidationError::value_error("Control port must be at most 65535.")
        })?;

        let interfaces = if params.interface.is_array() {
            validate_ip_address_array(&[&params.interface])?
        } else {
            validate_ip_address_array(&[&Value::Array(vec![params.interface.clone()])])?
        };

        let mut managed = Vec::new();
        for slot in CredentialSlot::ALL {
            let (manage, _) = slot.params(params);
            if validate_boolean(manage)? {
                managed.push(slot);
            }
        }

        let mut credentials = Vec::new();
        for slot in managed {
            let (_, file) = slot.params(params);
            let source = match file {
                None | Some(Value::Null) => None,
                Some(value) => Some(validate_string(value)?),
            };
            match source.filter(|s| !s.trim().is_empty()) {
                Some(source) => credentials.push(Credential {
                    slot,
                    source: source.to_string(),
                }),
                None => {
                    return Err(ValidationError::value_error(format!(
                        "You must specify a source to manage the {}.",
                        slot.label()
                    )));
                }
            }
        }

        Ok(Self {
            enable: true,
            port,
            interfaces,
            credentials,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enable
    }

    /// The clause text, empty when disabled.
    pub fn render_fragment(&self) -> String {
        if !self.enable {
            return String::new();
        }

        let mut out = String::new();
        // writing into a String cannot fail
        let _ = self.write_fragment(&mut out);
        out
    }

    fn write_fragment(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, "remote-control:")?;
        writeln!(out, "  control-enable: yes")?;
        for addr in &self.interfaces {
            writeln!(out, "  control-interface: {addr}")?;
        }
        writeln!(out, "  control-port: {}", self.port)?;
        for cred in &self.credentials {
            writeln!(
                out,
                "  {}: \"{}\"",
                cred.slot.option(),
                cred.slot.destination()
            )?;
        }
        Ok(())
    }

    /// One deployment directive per managed credential.
    pub fn credential_files(&self) -> Vec<ManagedFile> {
        self.credentials
            .iter()
            .map(|cred| {
                ManagedFile::sourced(cred.slot.destination(), &cred.source, CREDENTIAL_MODE)
            })
            .collect()
    }
}

/// Rendered clause plus the credential files to put in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteOutput {
    pub fragment: String,
    pub files: Vec<ManagedFile>,
}

pub fn generate_remote_fragment(params: &RemoteParams) -> Result<RemoteOutput, ValidationError> {
    let spec = RemoteControlSpec::from_params(params)?;
    Ok(RemoteOutput {
        fragment: spec.render_fragment(),
        files: spec.credential_files(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::FileContent;
    use crate::error::ErrorKind;
    use serde_json::json;
    use std::path::Path;

    fn generate(params: &RemoteParams) -> Result<RemoteOutput, ValidationError> {
        generate_remote_fragment(params)
    }

    #[test]
    fn defaults() {
        let out = generate(&RemoteParams::default()).unwrap();
        assert_eq!(
            out.fragment,
            "remote-control:\n  control-enable: yes\n  control-interface: 127.0.0.1\n  control-port: 8952\n"
        );
        assert!(out.files.is_empty());
    }

    #[test]
    fn non_default_port_and_interfaces() {
        let params = RemoteParams {
            port: json!(2222),
            interface: json!(["127.0.0.2", "127.0.0.3"]),
            ..Default::default()
        };
        let out = generate(&params).unwrap();
        assert!(out.fragment.contains("control-enable: yes\n"));
        assert!(out.fragment.contains("control-port: 2222\n"));
        assert!(out.fragment.contains(
            "  control-interface: 127.0.0.2\n  control-interface: 127.0.0.3\n"
        ));
    }

    #[test]
    fn scalar_interface_is_wrapped() {
        let params = RemoteParams {
            interface: json!("127.0.0.5"),
            ..Default::default()
        };
        let out = generate(&params).unwrap();
        assert!(out.fragment.contains("control-interface: 127.0.0.5\n"));
    }

    #[test]
    fn ipv6_interface() {
        let params = RemoteParams {
            interface: json!(["::1"]),
            ..Default::default()
        };
        assert!(generate(&params).unwrap().fragment.contains("control-interface: ::1\n"));
    }

    #[test]
    fn garbage_interface() {
        let params = RemoteParams {
            interface: json!(["127.0.0.7", "not.an.ip.addr"]),
            ..Default::default()
        };
        let err = generate(&params).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);
        assert_eq!(err.message(), r#""not.an.ip.addr" is not a valid IP address."#);
    }

    #[test]
    fn bad_port() {
        let params = RemoteParams {
            port: json!("port"),
            ..Default::default()
        };
        let err = generate(&params).unwrap_err();
        assert!(err.message().contains("Expected first argument to be an Integer"));

        let params = RemoteParams {
            port: json!(70000),
            ..Default::default()
        };
        assert_eq!(
            generate(&params).unwrap_err().message(),
            "Control port must be at most 65535."
        );
    }

    #[test]
    fn disabled_skips_everything_else() {
        let params = RemoteParams {
            enable: json!(false),
            port: json!("port"),
            interface: json!(["garbage"]),
            server_key_manage: json!(true),
            ..Default::default()
        };
        let out = generate(&params).unwrap();
        assert!(!out.fragment.contains("remote-control:"));
        assert!(out.fragment.is_empty());
        assert!(out.files.is_empty());
    }

    #[test]
    fn enable_must_be_boolean() {
        let params = RemoteParams {
            enable: json!("no"),
            ..Default::default()
        };
        assert_eq!(generate(&params).unwrap_err().message(), r#""no" is not a boolean"#);
    }

    fn set_manage(params: &mut RemoteParams, slot: CredentialSlot, value: Value) {
        match slot {
            CredentialSlot::ServerKey => params.server_key_manage = value,
            CredentialSlot::ServerCert => params.server_cert_manage = value,
            CredentialSlot::ControlKey => params.control_key_manage = value,
            CredentialSlot::ControlCert => params.control_cert_manage = value,
        }
    }

    fn set_file(params: &mut RemoteParams, slot: CredentialSlot, value: Value) {
        match slot {
            CredentialSlot::ServerKey => params.server_key_file = Some(value),
            CredentialSlot::ServerCert => params.server_cert_file = Some(value),
            CredentialSlot::ControlKey => params.control_key_file = Some(value),
            CredentialSlot::ControlCert => params.control_cert_file = Some(value),
        }
    }

    #[test]
    fn manage_flags_must_be_boolean() {
        for slot in CredentialSlot::ALL {
            let mut params = RemoteParams::default();
            set_manage(&mut params, slot, json!("no"));
            let err = generate(&params).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Type);
            assert_eq!(err.message(), r#""no" is not a boolean"#);
        }
    }

    #[test]
    fn managed_slot_needs_a_source() {
        for slot in CredentialSlot::ALL {
            let mut params = RemoteParams::default();
            set_manage(&mut params, slot, json!(true));
            let err = generate(&params).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Value);
            assert_eq!(
                err.message(),
                format!("You must specify a source to manage the {}.", slot.label())
            );

            set_file(&mut params, slot, json!(""));
            assert!(generate(&params).is_err());
        }
    }

    #[test]
    fn managed_slot_deploys_file() {
        let expected = [
            (CredentialSlot::ServerKey, "/etc/nsd/nsd_server.key", "server-key-file"),
            (CredentialSlot::ServerCert, "/etc/nsd/nsd_server.pem", "server-cert-file"),
            (CredentialSlot::ControlKey, "/etc/nsd/nsd_control.key", "control-key-file"),
            (CredentialSlot::ControlCert, "/etc/nsd/nsd_control.pem", "control-cert-file"),
        ];
        for (slot, path, option) in expected {
            let mut params = RemoteParams::default();
            set_manage(&mut params, slot, json!(true));
            set_file(&mut params, slot, json!("file:///root/credential"));

            let out = generate(&params).unwrap();
            assert_eq!(out.files.len(), 1);
            let file = &out.files[0];
            assert_eq!(file.path, Path::new(path));
            assert_eq!(file.mode, 0o640);
            assert_eq!((file.owner, file.group), (0, 0));
            assert_eq!(
                file.content,
                FileContent::Source("file:///root/credential".into())
            );
            assert!(out.fragment.contains(&format!("  {option}: \"{path}\"\n")));
        }
    }

    #[test]
    fn unmanaged_file_is_ignored() {
        let params = RemoteParams {
            server_key_file: Some(json!("file:///root/server.key")),
            ..Default::default()
        };
        let out = generate(&params).unwrap();
        assert!(out.files.is_empty());
        assert!(!out.fragment.contains("server-key-file"));
    }
}
