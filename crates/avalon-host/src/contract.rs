//! Host and config contracts and their validator.
//!
//! Adapters declare what they implement through an [`Interface`]: member
//! name to parameter names. Before an adapter is accepted as the registered
//! host or config, its declaration is checked against a fixed contract
//! table. Each required member must be declared, and its declared
//! parameters must include the required names. Every shortfall is reported
//! at once.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{HostError, HostResult};

/// A contract row: member name and required parameter names.
pub type ContractMember = (&'static str, &'static [&'static str]);

/// Members every host must implement.
pub const HOST_CONTRACT: &[ContractMember] = &[
    ("load", &["loader", "representation"]),
    ("create", &["name", "family", "asset", "options", "data"]),
    ("ls", &[]),
    ("update", &["container", "version"]),
    ("remove", &["container"]),
];

/// Members every config must implement.
pub const CONFIG_CONTRACT: &[ContractMember] = &[("install", &[]), ("uninstall", &[])];

/// Members an adapter implements, with their parameter names.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Interface {
    members: BTreeMap<String, Vec<String>>,
}

impl Interface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `member` with parameter names `params`.
    pub fn member(mut self, member: &str, params: &[&str]) -> Self {
        self.members.insert(
            member.to_string(),
            params.iter().map(|p| p.to_string()).collect(),
        );
        self
    }

    /// Whether `member` is declared.
    pub fn has(&self, member: &str) -> bool {
        self.members.contains_key(member)
    }

    /// Declared parameter names of `member`.
    pub fn params(&self, member: &str) -> Option<&[String]> {
        self.members.get(member).map(Vec::as_slice)
    }

    pub fn members(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }
}

/// A declared member whose parameters lack required names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvalidMember {
    pub member: String,
    pub signature: Vec<String>,
    pub required: Vec<String>,
}

/// Every contract shortfall of one adapter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractReport {
    pub subject: String,
    pub missing: Vec<String>,
    pub invalid: Vec<InvalidMember>,
}

impl ContractReport {
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.invalid.is_empty()
    }
}

impl fmt::Display for ContractReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines = Vec::new();
        if !self.missing.is_empty() {
            let missing: Vec<String> = self.missing.iter().map(|m| format!("'{m}'")).collect();
            lines.push(format!(
                "Incomplete interface for '{}'\nMissing: {}",
                self.subject,
                missing.join(", ")
            ));
        }
        if !self.invalid.is_empty() {
            lines.push(format!(
                "'{}': One or more members were found, but didn't have the right argument signature.",
                self.subject
            ));
            for invalid in &self.invalid {
                lines.push(format!(
                    "     Found: {}({})",
                    invalid.member,
                    invalid.signature.join(", ")
                ));
                lines.push(format!(
                    "  Expected: {}({})",
                    invalid.member,
                    invalid.required.join(", ")
                ));
            }
        }
        f.write_str(&lines.join("\n"))
    }
}

/// Check `interface` against `contract`.
///
/// Returns [`HostError::ContractViolation`] listing every missing and every
/// invalid member.
pub fn validate_interface(subject: &str, interface: &Interface, contract: &[ContractMember]) -> HostResult<()> {
    let mut report = ContractReport {
        subject: subject.to_string(),
        missing: Vec::new(),
        invalid: Vec::new(),
    };

    for (member, required) in contract {
        let Some(signature) = interface.params(member) else {
            report.missing.push(member.to_string());
            continue;
        };
        let complete = required
            .iter()
            .all(|name| signature.iter().any(|param| param == name));
        if !complete {
            report.invalid.push(InvalidMember {
                member: member.to_string(),
                signature: signature.to_vec(),
                required: required.iter().map(|r| r.to_string()).collect(),
            });
        }
    }

    if report.is_empty() {
        Ok(())
    } else {
        Err(HostError::ContractViolation(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_host() -> Interface {
        Interface::new()
            .member("ls", &[])
            .member("load", &["loader", "representation", "name", "namespace", "options"])
            .member("create", &["name", "family", "asset", "options", "data"])
            .member("update", &["container", "version"])
            .member("remove", &["container"])
    }

    #[test]
    fn complete_interface_passes() {
        assert!(validate_interface("debugHost", &full_host(), HOST_CONTRACT).is_ok());
    }

    #[test]
    fn extra_parameters_are_allowed() {
        let interface = full_host().member("remove", &["self", "container", "force"]);
        assert!(validate_interface("host", &interface, HOST_CONTRACT).is_ok());
    }

    #[test]
    fn every_shortfall_is_reported() {
        let interface = Interface::new()
            .member("ls", &[])
            .member("load", &["representation"])
            .member("create", &["name", "family", "asset", "options", "data"])
            .member("update", &["container"]);

        let err = validate_interface("brokenHost", &interface, HOST_CONTRACT).unwrap_err();
        let HostError::ContractViolation(report) = &err else {
            panic!("expected contract violation, got {err:?}");
        };
        assert_eq!(report.missing, vec!["remove"]);
        let invalid: Vec<&str> = report.invalid.iter().map(|i| i.member.as_str()).collect();
        assert_eq!(invalid, vec!["load", "update"]);

        let message = err.to_string();
        assert!(message.contains("Missing: 'remove'"));
        assert!(message.contains("     Found: load(representation)"));
        assert!(message.contains("  Expected: load(loader, representation)"));
        assert!(message.contains("  Expected: update(container, version)"));
    }

    #[test]
    fn config_contract() {
        let ok = Interface::new().member("install", &[]).member("uninstall", &[]);
        assert!(validate_interface("studio", &ok, CONFIG_CONTRACT).is_ok());

        let err = validate_interface("studio", &Interface::new(), CONFIG_CONTRACT).unwrap_err();
        assert!(err.to_string().contains("Missing: 'install', 'uninstall'"));
    }
}
