//! Install profile: the deployment facts that decide which kickstart entry a
//! node should boot.

use crate::{KickstartTag, NodeType, SecurityProfile};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Deployment topology of the system being installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemType {
    /// All-in-one simplex
    AioSx,
    /// All-in-one duplex
    AioDx,
    Regular,
    Storage,
}

impl SystemType {
    /// Node type an installer entry must provision for this topology.
    pub fn node_type(&self) -> NodeType {
        match self {
            SystemType::AioSx | SystemType::AioDx => NodeType::Cpe,
            SystemType::Regular | SystemType::Storage => NodeType::Standard,
        }
    }
}

impl FromStr for SystemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "aio_sx" | "simplex" => Ok(SystemType::AioSx),
            "aio_dx" | "duplex" => Ok(SystemType::AioDx),
            "regular" | "standard" => Ok(SystemType::Regular),
            "storage" => Ok(SystemType::Storage),
            _ => Err(format!(
                "Invalid system type: '{}'. Use 'aio_sx', 'aio_dx', 'regular' or 'storage'.",
                s
            )),
        }
    }
}

/// Facts about the install that influence kickstart classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallProfile {
    #[serde(default)]
    pub system_type: Option<SystemType>,
    #[serde(default)]
    pub low_latency: bool,
    #[serde(default)]
    pub security: SecurityProfile,
}

impl InstallProfile {
    /// Node type implied by the profile. Low latency wins over the topology.
    pub fn node_type(&self) -> Option<NodeType> {
        if self.low_latency {
            Some(NodeType::LowLatency)
        } else {
            self.system_type.map(|t| t.node_type())
        }
    }

    /// The kickstart entry a node with this profile should boot.
    pub fn kickstart_target(&self) -> KickstartTag {
        KickstartTag {
            node_type: self.node_type(),
            security: self.security,
            ..KickstartTag::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_type_node_type() {
        assert_eq!(SystemType::AioSx.node_type(), NodeType::Cpe);
        assert_eq!(SystemType::AioDx.node_type(), NodeType::Cpe);
        assert_eq!(SystemType::Storage.node_type(), NodeType::Standard);
    }

    #[test]
    fn test_low_latency_overrides_topology() {
        let profile = InstallProfile {
            system_type: Some(SystemType::Regular),
            low_latency: true,
            security: SecurityProfile::Standard,
        };
        assert_eq!(profile.node_type(), Some(NodeType::LowLatency));
    }

    #[test]
    fn test_kickstart_target() {
        let profile = InstallProfile {
            system_type: Some(SystemType::AioDx),
            low_latency: false,
            security: SecurityProfile::Extended,
        };
        let tag = profile.kickstart_target();
        assert_eq!(tag.node_type, Some(NodeType::Cpe));
        assert_eq!(tag.security, SecurityProfile::Extended);
    }

    #[test]
    fn test_system_type_from_str() {
        assert_eq!("AIO-SX".parse::<SystemType>().unwrap(), SystemType::AioSx);
        assert_eq!("regular".parse::<SystemType>().unwrap(), SystemType::Regular);
        assert!("cluster".parse::<SystemType>().is_err());
    }
}
