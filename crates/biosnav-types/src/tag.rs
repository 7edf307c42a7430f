//! Semantic tags inferred from option labels.
//!
//! BIOS POST screens get a single coarse tag. Kickstart boot menus get a
//! small set of named attributes so a caller can ask for "the standard
//! controller install with extended security" without knowing the label text.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tag for an entry on a BIOS POST hot-key screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiosTag {
    /// Enters a boot device or network boot menu
    BootMenu,
    /// Enters firmware setup
    Setup,
}

impl BiosTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            BiosTag::BootMenu => "boot menu",
            BiosTag::Setup => "setup",
        }
    }
}

/// Operating system an installer entry boots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OsHint {
    #[default]
    Centos,
    Wrl,
}

/// Node personality an installer entry provisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    /// All-in-one / small footprint
    Cpe,
    /// Standard controller
    Standard,
    #[serde(rename = "lowlat")]
    LowLatency,
}

impl FromStr for NodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cpe" | "aio" | "all-in-one" => Ok(NodeType::Cpe),
            "standard" | "controller" => Ok(NodeType::Standard),
            "lowlat" | "low_lat" | "low lat" | "lowlatency" => Ok(NodeType::LowLatency),
            _ => Err(format!("Invalid node type: '{}'. Use 'cpe', 'standard' or 'lowlat'.", s)),
        }
    }
}

/// Security profile an installer entry applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityProfile {
    #[default]
    Standard,
    Extended,
}

impl SecurityProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityProfile::Standard => "standard",
            SecurityProfile::Extended => "extended",
        }
    }
}

impl FromStr for SecurityProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "standard" => Ok(SecurityProfile::Standard),
            "extended" => Ok(SecurityProfile::Extended),
            _ => Err(format!("Invalid security profile: '{}'. Use 'standard' or 'extended'.", s)),
        }
    }
}

/// Console an installer entry directs output to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsoleHint {
    #[default]
    Serial,
    Graphical,
}

/// Structured tag for a kickstart boot menu entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KickstartTag {
    #[serde(default)]
    pub os: OsHint,
    #[serde(default, rename = "type")]
    pub node_type: Option<NodeType>,
    #[serde(default)]
    pub security: SecurityProfile,
    #[serde(default)]
    pub console: ConsoleHint,
}

/// Semantic classification of a menu option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionTag {
    Bios(BiosTag),
    Kickstart(KickstartTag),
}

impl From<BiosTag> for OptionTag {
    fn from(tag: BiosTag) -> Self {
        OptionTag::Bios(tag)
    }
}

impl From<KickstartTag> for OptionTag {
    fn from(tag: KickstartTag) -> Self {
        OptionTag::Kickstart(tag)
    }
}

impl fmt::Display for OptionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionTag::Bios(tag) => write!(f, "{}", tag.as_str()),
            OptionTag::Kickstart(tag) => write!(
                f,
                "os={:?} type={:?} security={} console={:?}",
                tag.os,
                tag.node_type,
                tag.security.as_str(),
                tag.console
            ),
        }
    }
}
