//! Zone file generation.
//!
//! A [`ZoneSpec`] is built from [`ZoneParams`] by validating every field in a
//! fixed order; the first failure aborts the build. Rendering a validated spec
//! cannot fail and is deterministic.
use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde_json::{Value, json};

use crate::config::ZoneParams;
use crate::error::ValidationError;
use crate::validation::*;

/// A generic resource record emitted verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub name: String,
    pub rtype: String,
    pub location: String,
}

/// A fully validated zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneSpec {
    domain: String, // without trailing dot
    admin_email: String,
    serial_number: i64,
    ttl: u64,
    refresh: u64,
    retry: u64,
    expire: u64,
    nameservers: Vec<String>,
    mxservers: BTreeMap<u16, String>,
    records: Vec<Record>,
}

impl ZoneSpec {
    pub fn from_params(params: &ZoneParams) -> Result<Self, ValidationError> {
        let domain = validate_domain(&params.domain)?;

        let admin_email = match &params.admin_email {
            Some(value) => validate_string(value)?.to_string(),
            None => format!("admin@{domain}"),
        };
        validate_email(&admin_email)?;

        let ttl = validate_positive_integer(&params.ttl, "Time to live")?;
        let refresh = validate_positive_integer(&params.refresh, "Refresh value")?;
        let retry = validate_positive_integer(&params.retry, "Retry value")?;
        let expire = validate_positive_integer(&params.expire, "Expire value")?;

        let serial_number = match &params.serial_number {
            Some(value) => validate_integer(value, "Serial number")?,
            None => {
                return Err(ValidationError::value_error(
                    "You must specify a serial number.",
                ));
            }
        };

        let nameservers = parse_nameservers(&params.nameservers)?;
        let mxservers = parse_mxservers(&params.mxservers)?;
        let records = parse_records(&params.records)?;

        Ok(Self {
            domain,
            admin_email,
            serial_number,
            ttl,
            refresh,
            retry,
            expire,
            nameservers,
            mxservers,
            records,
        })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// `<domain>.zone`
    pub fn file_name(&self) -> String {
        format!("{}.zone", self.domain)
    }

    /// SOA RNAME form of the admin address.
    pub fn contact(&self) -> String {
        contact_from_email(&self.admin_email)
    }

    /// The complete zone file text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        // writing into a String cannot fail
        let _ = self.write_zone(&mut out);
        out
    }

    fn write_zone(&self, out: &mut String) -> std::fmt::Result {
        writeln!(
            out,
            "; {} - managed by nsdconf, local changes will be overwritten",
            self.file_name()
        )?;
        writeln!(out, "$ORIGIN {}.", self.domain)?;
        writeln!(out, "$TTL {}", self.ttl)?;
        writeln!(out)?;

        // SOA timers are ordered serial, refresh, retry, expire, minimum
        writeln!(
            out,
            "@ IN SOA {} {} ( {} {} {} {} {} )",
            self.nameservers[0],
            self.contact(),
            self.serial_number,
            self.refresh,
            self.retry,
            self.expire,
            self.ttl
        )?;
        writeln!(out)?;

        for ns in &self.nameservers {
            writeln!(out, " NS {ns}")?;
        }

        if !self.mxservers.is_empty() {
            writeln!(out)?;
            for (priority, host) in &self.mxservers {
                writeln!(out, " MX {priority} {host}")?;
            }
        }

        if !self.records.is_empty() {
            writeln!(out)?;
            for record in &self.records {
                writeln!(out, "{} {} {}", record.name, record.rtype, record.location)?;
            }
        }

        Ok(())
    }

    /// The `zone:` clause pointing NSD at this zone's file.
    pub fn fragment(&self) -> String {
        format!(
            "zone:\n  name: \"{}\"\n  zonefile: \"{}\"\n",
            self.domain,
            self.file_name()
        )
    }
}

/// Validate and render in one step.
pub fn generate_zone(params: &ZoneParams) -> Result<String, ValidationError> {
    Ok(ZoneSpec::from_params(params)?.render())
}

/// `admin@example.com` becomes `admin.example.com.`
pub fn contact_from_email(email: &str) -> String {
    format!("{}.", email.replace('@', "."))
}

fn validate_domain(domain: &str) -> Result<String, ValidationError> {
    let d = domain.trim().trim_end_matches('.');
    if d.is_empty() {
        return Err(ValidationError::value_error("You must specify a domain."));
    }
    // these would break out of the quoted `name:` in the zone clause
    if d.chars().any(|c| matches!(c, '/' | '"' | ';' | '\\') || c.is_whitespace()) {
        return Err(ValidationError::value_error(format!(
            "{} is not a valid zone name.",
            json!(domain)
        )));
    }
    Ok(d.to_string())
}

fn parse_nameservers(value: &Value) -> Result<Vec<String>, ValidationError> {
    validate_nameserver_array(&[value])?;
    let items = value.as_array().map(Vec::as_slice).unwrap_or_default();
    if items.is_empty() {
        return Err(ValidationError::value_error(
            "You must specify at least one nameserver.",
        ));
    }
    items
        .iter()
        .map(|ns| validate_string(ns).map(str::to_string))
        .collect()
}

fn parse_mxservers(value: &Value) -> Result<BTreeMap<u16, String>, ValidationError> {
    let map = value.as_object().ok_or_else(|| {
        ValidationError::type_error(format!(
            "{value} is not a Hash.  It looks to be a {}",
            type_name(value)
        ))
    })?;

    // BTreeMap keeps the priorities ascending
    let mut mx = BTreeMap::new();
    for (key, host) in map {
        let priority = key.trim().parse::<u16>().map_err(|_| {
            ValidationError::value_error(format!(
                "{} is not a valid MX priority.",
                json!(key)
            ))
        })?;
        let host = validate_string(host)?.to_string();
        if mx.insert(priority, host).is_some() {
            return Err(ValidationError::value_error(format!(
                "MX priority {priority} is declared more than once."
            )));
        }
    }
    Ok(mx)
}

fn parse_records(value: &Value) -> Result<Vec<Record>, ValidationError> {
    let items = value.as_array().ok_or_else(|| {
        ValidationError::type_error(format!(
            "{value} is not an Array.  It looks to be a {}",
            type_name(value)
        ))
    })?;

    items
        .iter()
        .map(|item| {
            let field = |key: &str| -> Result<String, ValidationError> {
                match item.get(key) {
                    Some(v) => Ok(validate_string(v)?.to_string()),
                    None => Err(ValidationError::value_error(format!(
                        "Record {item} is missing '{key}'."
                    ))),
                }
            };
            if !item.is_object() {
                return Err(ValidationError::type_error(format!(
                    "{item} is not a Hash.  It looks to be a {}",
                    type_name(item)
                )));
            }
            Ok(Record {
                name: field("name")?,
                rtype: field("type")?,
                location: field("location")?,
            })
        })
        .collect()
}
