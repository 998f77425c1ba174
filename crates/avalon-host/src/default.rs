use avalon_types::Container;

use crate::contract::Interface;
use crate::error::HostResult;
use crate::traits::Host;

/// Stand-in host used while no real host is registered.
///
/// Implements only `ls`, which finds nothing. It is never validated against
/// the host contract; the kernel installs it directly when a host is
/// deregistered.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultHost;

impl Host for DefaultHost {
    fn name(&self) -> &str {
        "defaultHost"
    }

    fn interface(&self) -> Interface {
        Interface::new().member("ls", &[])
    }

    fn ls(&self) -> HostResult<Vec<Container>> {
        Ok(Vec::new())
    }
}
