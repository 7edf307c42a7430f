//! CLI configuration.

use anyhow::{Context, Result};
use biosnav_core::{NavigationConfig, NavigationStrategy};
use biosnav_types::{ConsoleHint, InstallProfile, SecurityProfile, SystemType};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub console: ConsoleConfig,
    /// Lab or hardware identifier used to pick the BIOS dialect
    #[serde(default)]
    pub hardware: Option<String>,
    #[serde(default)]
    pub navigation: NavigationSettings,
    #[serde(default)]
    pub install: InstallSettings,
}

/// Console server the target's serial line is reachable through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationSettings {
    #[serde(default)]
    pub strategy: NavigationStrategy,
    #[serde(default = "default_presses_per_step")]
    pub presses_per_step: usize,
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,
    #[serde(default = "default_parse_timeout")]
    pub parse_timeout_secs: u64,
    /// How long to look for a sub-menu screen before moving on
    #[serde(default = "default_sub_menu_timeout")]
    pub sub_menu_timeout_secs: u64,
    /// Times the BIOS boot hot key is sent; POST screens drop keys
    #[serde(default = "default_bios_hotkey_repeats")]
    pub bios_hotkey_repeats: usize,
}

/// How the installer is reached once the boot device is picked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BootType {
    #[default]
    Pxe,
    Uefi,
    PxeIso,
    Usb,
}

impl FromStr for BootType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "pxe" => Ok(BootType::Pxe),
            "uefi" => Ok(BootType::Uefi),
            "pxe_iso" => Ok(BootType::PxeIso),
            "usb" => Ok(BootType::Usb),
            _ => Err(format!(
                "Invalid boot type: '{}'. Use 'pxe', 'uefi', 'pxe_iso' or 'usb'.",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallSettings {
    #[serde(default)]
    pub system_type: Option<SystemType>,
    #[serde(default)]
    pub low_latency: bool,
    #[serde(default)]
    pub security: SecurityProfile,
    #[serde(default)]
    pub console: ConsoleHint,
    /// Regex picking the entry in the boot device menu
    #[serde(default = "default_boot_device_pattern")]
    pub boot_device_pattern: String,
    #[serde(default)]
    pub boot_type: BootType,
    /// Free-text kickstart request ("cpe", "standard", "security", ...);
    /// derived from the profile when absent
    #[serde(default)]
    pub kickstart_request: Option<String>,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    23
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_presses_per_step() -> usize {
    1
}

fn default_step_delay_ms() -> u64 {
    1000
}

fn default_parse_timeout() -> u64 {
    60
}

fn default_sub_menu_timeout() -> u64 {
    5
}

fn default_bios_hotkey_repeats() -> usize {
    3
}

fn default_boot_device_pattern() -> String {
    "PXE|IBA|Network".to_string()
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Default for NavigationSettings {
    fn default() -> Self {
        Self {
            strategy: NavigationStrategy::default(),
            presses_per_step: default_presses_per_step(),
            step_delay_ms: default_step_delay_ms(),
            parse_timeout_secs: default_parse_timeout(),
            sub_menu_timeout_secs: default_sub_menu_timeout(),
            bios_hotkey_repeats: default_bios_hotkey_repeats(),
        }
    }
}

impl Default for InstallSettings {
    fn default() -> Self {
        Self {
            system_type: None,
            low_latency: false,
            security: SecurityProfile::default(),
            console: ConsoleHint::default(),
            boot_device_pattern: default_boot_device_pattern(),
            boot_type: BootType::default(),
            kickstart_request: None,
        }
    }
}

impl ConsoleConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl NavigationSettings {
    pub fn navigation_config(&self) -> NavigationConfig {
        NavigationConfig {
            step_delay: Duration::from_millis(self.step_delay_ms),
            ..NavigationConfig::default()
        }
        .with_strategy(self.strategy)
        .with_presses_per_step(self.presses_per_step)
    }

    pub fn parse_timeout(&self) -> Duration {
        Duration::from_secs(self.parse_timeout_secs)
    }

    pub fn sub_menu_timeout(&self) -> Duration {
        Duration::from_secs(self.sub_menu_timeout_secs)
    }
}

impl InstallSettings {
    pub fn profile(&self) -> InstallProfile {
        InstallProfile {
            system_type: self.system_type,
            low_latency: self.low_latency,
            security: self.security,
        }
    }
}

impl Config {
    /// Load config from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Load the first existing file among `candidates`, or fall back to defaults.
    pub fn load_first(candidates: &[PathBuf]) -> Result<Self> {
        match candidates.iter().find(|path| path.exists()) {
            Some(path) => Self::load_from(path),
            None => Ok(Config::default()),
        }
    }

    /// Load config from config/default.toml, then the user config directory,
    /// or fall back to defaults.
    pub fn load() -> Result<Self> {
        let mut candidates = vec![PathBuf::from("config/default.toml")];
        if let Some(dir) = dirs::config_dir() {
            candidates.push(dir.join("biosnav").join("config.toml"));
        }
        Self::load_first(&candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.console.port, 23);
        assert_eq!(config.navigation.bios_hotkey_repeats, 3);
        assert_eq!(config.navigation.navigation_config().step_delay, Duration::from_secs(1));
        assert_eq!(config.install.boot_type, BootType::Pxe);
        assert!(config.hardware.is_none());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
hardware = "yow-cgcs-wildcat-76"

[console]
host = "cons-lab-3"
port = 2031

[navigation]
strategy = "shortest_path"
presses_per_step = 2

[install]
system_type = "aio_dx"
low_latency = true
boot_type = "usb"
"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.hardware.as_deref(), Some("yow-cgcs-wildcat-76"));
        assert_eq!(config.console.host, "cons-lab-3");
        assert_eq!(config.console.connect_timeout_secs, 10);

        let nav = config.navigation.navigation_config();
        assert_eq!(nav.strategy, NavigationStrategy::ShortestPath);
        assert_eq!(nav.presses_per_step, 2);
        assert_eq!(config.navigation.parse_timeout(), Duration::from_secs(60));

        let profile = config.install.profile();
        assert_eq!(profile.system_type, Some(SystemType::AioDx));
        assert!(profile.low_latency);
        assert_eq!(config.install.boot_type, BootType::Usb);
        assert_eq!(config.install.boot_device_pattern, "PXE|IBA|Network");
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[navigation]\nstrategy = \"sideways\"").unwrap();
        let err = Config::load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("Invalid config"));
    }

    #[test]
    fn test_load_first_existing_candidate() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.toml");
        let present = dir.path().join("present.toml");
        std::fs::write(&present, "[console]\nport = 7001\n").unwrap();

        let config = Config::load_first(&[missing.clone(), present]).unwrap();
        assert_eq!(config.console.port, 7001);

        let config = Config::load_first(&[missing]).unwrap();
        assert_eq!(config.console.port, 23);
    }

    #[test]
    fn test_example_config_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/biosnav.example.toml");
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.console.port, 2031);
        assert_eq!(config.install.system_type, Some(SystemType::AioSx));
        assert_eq!(config.install.console, ConsoleHint::Serial);
    }

    #[test]
    fn test_boot_type_from_str() {
        assert_eq!("PXE-ISO".parse::<BootType>().unwrap(), BootType::PxeIso);
        assert_eq!("uefi".parse::<BootType>().unwrap(), BootType::Uefi);
        assert!("floppy".parse::<BootType>().is_err());
    }
}
