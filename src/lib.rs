//! Crate entrypoint: validates declarative NSD parameters and renders
//! nsd.conf, zone files, and remote-control credentials from them.

pub mod concat;
pub mod config;
pub mod deploy;
pub mod error;
pub mod plan;
pub mod remote;
pub mod server;
pub mod validation;
pub mod zonefile;

pub use config::{Manifest, RemoteParams, ServerParams, ZoneParams, load_manifest};
pub use error::{BuildError, DeployError, ErrorKind, ValidationError};
pub use plan::{DeployReport, Plan};
pub use remote::{RemoteControlSpec, RemoteOutput, generate_remote_fragment};
pub use zonefile::{ZoneSpec, generate_zone};
