//! Turns a whole manifest into the set of files to deploy.
use std::collections::BTreeSet;

use serde_json::json;
use tracing::{debug, info};

use crate::concat::FragmentSet;
use crate::config::Manifest;
use crate::deploy::{FileWriter, ManagedFile, WriteOutcome};
use crate::error::{BuildError, DeployError, ValidationError};
use crate::remote::RemoteControlSpec;
use crate::server::ServerSpec;
use crate::zonefile::ZoneSpec;

pub const CONFIG_MODE: u32 = 0o644;
pub const ZONE_MODE: u32 = 0o644;

const CONFIG_HEADER: &str = "# nsd.conf - managed by nsdconf, local changes will be overwritten\n";

const SERVER_ORDER: &str = "01";
const REMOTE_ORDER: &str = "10";
const ZONE_ORDER: &str = "20";

/// Every file a manifest produces, in deployment order.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub files: Vec<ManagedFile>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeployReport {
    pub written: usize,
    pub unchanged: usize,
}

impl Plan {
    /// Validate everything first; nothing is produced if any instance fails.
    pub fn build(manifest: &Manifest) -> Result<Self, BuildError> {
        let server = ServerSpec::from_params(&manifest.server).map_err(BuildError::Server)?;

        let remote = manifest
            .remote
            .as_ref()
            .map(RemoteControlSpec::from_params)
            .transpose()
            .map_err(BuildError::Remote)?;

        // each domain owns one zone file and one zone clause
        let mut seen = BTreeSet::new();
        let mut zones = Vec::with_capacity(manifest.zones.len());
        for params in &manifest.zones {
            let zone = ZoneSpec::from_params(params).map_err(|source| BuildError::Zone {
                domain: params.domain.clone(),
                source,
            })?;
            if !seen.insert(zone.domain().to_string()) {
                return Err(BuildError::Zone {
                    domain: params.domain.clone(),
                    source: ValidationError::value_error(format!(
                        "Zone {} is declared more than once.",
                        json!(zone.domain())
                    )),
                });
            }
            zones.push(zone);
        }

        let mut conf = FragmentSet::new().with_header(CONFIG_HEADER);
        conf.add("nsd-server", SERVER_ORDER, server.render_fragment());

        let mut files = Vec::new();
        if let Some(remote) = &remote {
            if !remote.is_enabled() {
                debug!("remote-control disabled");
            }
            conf.add("nsd-remote", REMOTE_ORDER, remote.render_fragment());
            files.extend(remote.credential_files());
        }

        for zone in &zones {
            conf.add(
                format!("nsd-zone-{}", zone.domain()),
                ZONE_ORDER,
                zone.fragment(),
            );
            files.push(ManagedFile::inline(
                server.zonesdir.join(zone.file_name()),
                zone.render(),
                ZONE_MODE,
            ));
        }

        debug!("nsd.conf fragments: {}", conf.names().join(", "));

        // credentials and zones must exist before the config that names them
        files.push(ManagedFile::inline(
            &server.config_file,
            conf.assemble(),
            CONFIG_MODE,
        ));

        info!(
            "planned {} file(s) for {} zone(s)",
            files.len(),
            zones.len()
        );
        Ok(Self { files })
    }

    pub fn deploy(&self, writer: &dyn FileWriter) -> Result<DeployReport, DeployError> {
        let mut report = DeployReport::default();
        for file in &self.files {
            match writer.write_file(file)? {
                WriteOutcome::Written => report.written += 1,
                WriteOutcome::Unchanged => report.unchanged += 1,
            }
        }
        info!(
            "deployed: {} written, {} unchanged",
            report.written, report.unchanged
        );
        Ok(report)
    }
}
