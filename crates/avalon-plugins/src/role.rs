use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The abstract roles a plug-in can fill.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PluginRole {
    Loader,
    Creator,
    Action,
    InventoryAction,
}

impl PluginRole {
    pub const ALL: [PluginRole; 4] = [
        Self::Loader,
        Self::Creator,
        Self::Action,
        Self::InventoryAction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loader => "Loader",
            Self::Creator => "Creator",
            Self::Action => "Action",
            Self::InventoryAction => "InventoryAction",
        }
    }
}

impl fmt::Display for PluginRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PluginRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| format!("unknown plug-in role: {s:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_agree() {
        for role in PluginRole::ALL {
            assert_eq!(role.to_string().parse::<PluginRole>().unwrap(), role);
        }
        assert!("loader".parse::<PluginRole>().is_err());
    }
}
