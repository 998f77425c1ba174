//! Host and config adapters for the Avalon pipeline kernel.
//!
//! A [`Host`] wraps a DCC application: it lists the containers in its
//! scene, loads representations through loader plug-ins, creates publish
//! instances, and updates or removes containers. A [`Config`] carries a
//! studio's pipeline setup and may extend individual hosts through
//! [`ConfigHostHooks`].
//!
//! Both are checked against a fixed contract before the kernel accepts
//! them; see [`validate_host`] and [`validate_config`].
//!
//! Two reference hosts ship with the crate. [`DefaultHost`] stands in while
//! nothing is registered. [`DebugHost`] implements the full surface against
//! an in-memory scene.

pub mod contract;
pub mod debug;
pub mod default;
pub mod error;
pub mod traits;

pub use contract::{
    validate_interface, ContractMember, ContractReport, Interface, InvalidMember,
    CONFIG_CONTRACT, HOST_CONTRACT,
};
pub use debug::{DebugHost, FIXTURE_REPRESENTATION_1, FIXTURE_REPRESENTATION_2};
pub use default::DefaultHost;
pub use error::{HostError, HostResult};
pub use traits::{Config, ConfigHostHooks, Host};

/// Check `host` against [`HOST_CONTRACT`].
pub fn validate_host(host: &dyn Host) -> HostResult<()> {
    validate_interface(host.name(), &host.interface(), HOST_CONTRACT)
}

/// Check `config` against [`CONFIG_CONTRACT`].
pub fn validate_config(config: &dyn Config) -> HostResult<()> {
    validate_interface(config.name(), &config.interface(), CONFIG_CONTRACT)
}
