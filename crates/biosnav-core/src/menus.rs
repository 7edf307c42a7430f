//! Ready-made menus for each boot phase.

use crate::classifier::kickstart_request_tag;
use crate::dialect::Dialect;
use crate::menu::{Menu, Target};
use crate::session::ConsoleSession;
use crate::{MenuError, Result};
use biosnav_types::{BiosTag, MenuOption, OptionTag};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

static WOLFPASS_SELECTION_PROMPT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Use the . and . keys to change the selection").expect("Invalid wolfpass prompt regex")
});

static WILDCAT_CONTROLLER_PROMPT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(\x1b.*\*?.*\sController Configuration\s.*\*?(\x1b\[\d+;\d+H)?)|Use the . and . keys to change the selection",
    )
    .expect("Invalid controller prompt regex")
});

static WILDCAT_CONSOLE_PROMPT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(\x1b.*\*?.*\s(Serial)|(Graphical) Console(\s).*\*?)|Use the \^ and v keys to change the selection",
    )
    .expect("Invalid console prompt regex")
});

/// Server families whose ISO menus draw their sub-menus differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostFamily {
    Wolfpass,
    Wildcat,
}

impl HostFamily {
    /// Family named in a host name, if any.
    pub fn from_host(host: &str) -> Option<Self> {
        let lower = host.to_lowercase();
        if lower.contains("wolfpass") {
            Some(HostFamily::Wolfpass)
        } else if lower.contains("wildcat") {
            Some(HostFamily::Wildcat)
        } else {
            None
        }
    }

    /// Screen prompt of a pre-registered sub-menu on this family.
    pub fn sub_menu_prompt(self, sub_menu: Dialect) -> Option<&'static Regex> {
        match (self, sub_menu) {
            (HostFamily::Wolfpass, Dialect::ControllerConfiguration | Dialect::Console) => {
                Some(&WOLFPASS_SELECTION_PROMPT)
            }
            (HostFamily::Wildcat, Dialect::ControllerConfiguration) => Some(&WILDCAT_CONTROLLER_PROMPT),
            (HostFamily::Wildcat, Dialect::Console) => Some(&WILDCAT_CONSOLE_PROMPT),
            _ => None,
        }
    }
}

impl Menu {
    /// Hot-key menu of a BIOS POST screen for a hardware identifier.
    ///
    /// # Errors
    ///
    /// Returns [`MenuError::UnsupportedHardware`] for unknown hardware.
    pub fn bios(hardware_id: &str) -> Result<Self> {
        let dialect = Dialect::for_hardware(hardware_id)?;
        Ok(Menu::new(dialect))
    }

    /// The option that enters the boot selection screen.
    pub fn boot_option(&self) -> Option<&MenuOption> {
        let boot_menu = OptionTag::from(BiosTag::BootMenu);
        self.options().iter().find(|o| o.tag.as_ref() == Some(&boot_menu))
    }

    /// One-shot boot device picker.
    pub fn boot_device() -> Self {
        Menu::new(Dialect::BootDevice)
    }

    /// Legacy PXE installer menu.
    pub fn pxe_kickstart() -> Self {
        Menu::new(Dialect::PxeKickstart)
    }

    /// UEFI installer menu.
    pub fn uefi_kickstart() -> Self {
        Menu::new(Dialect::UefiKickstart)
    }

    /// Kernel options menu of a PXE-booted ISO, with its configuration
    /// sub-menus already registered.
    pub fn pxe_iso(host: &str) -> Self {
        with_config_sub_menus(Menu::new(Dialect::PxeIso), host)
    }

    /// Kernel options menu of a USB-booted ISO, with its configuration
    /// sub-menus already registered.
    pub fn usb_boot(host: &str) -> Self {
        with_config_sub_menus(Menu::new(Dialect::Usb), host)
    }

    /// Select the kickstart entry matching a free-text request such as
    /// "standard", "cpe", "lowlat" or "security".
    ///
    /// # Errors
    ///
    /// Same as [`Menu::select`].
    pub fn select_request(&mut self, session: &mut dyn ConsoleSession, request: &str) -> Result<MenuOption> {
        let tag = OptionTag::from(kickstart_request_tag(request, self.profile()));
        info!(target: "biosnav::nav", "{} request '{}' resolved to {}", self.name(), request, tag);
        self.select(session, &Target::Tag(tag))
    }

    /// Select this BIOS screen's boot menu entry.
    ///
    /// # Errors
    ///
    /// Returns [`MenuError::OptionNotFound`] when no option is tagged as the
    /// boot menu, otherwise the same as [`Menu::select`].
    pub fn select_boot_option(&mut self, session: &mut dyn ConsoleSession) -> Result<MenuOption> {
        if self.state() != crate::MenuState::Uninitialized && self.boot_option().is_none() {
            return Err(MenuError::OptionNotFound {
                menu: self.name().to_string(),
                target: BiosTag::BootMenu.as_str().to_string(),
            });
        }
        self.select(session, &Target::Tag(BiosTag::BootMenu.into()))
    }
}

fn with_config_sub_menus(mut menu: Menu, host: &str) -> Menu {
    let family = HostFamily::from_host(host);
    for child in [Dialect::ControllerConfiguration, Dialect::Console] {
        let mut sub_menu = Menu::new(child);
        if let Some(prompt) = family.and_then(|f| f.sub_menu_prompt(child)) {
            sub_menu = sub_menu.with_prompt(prompt.clone());
        }
        menu.add_sub_menu(sub_menu);
    }
    debug!(
        target: "biosnav::parser",
        "{} sub menus for {} ({:?}): {:?}",
        menu.name(),
        host,
        family,
        menu.sub_menus().iter().map(|m| m.name()).collect::<Vec<_>>()
    );
    menu
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ReplaySession;
    use crate::{MenuState, NavigationConfig};
    use biosnav_types::{InstallProfile, KickstartTag, NodeType, SecurityProfile, SystemType};

    #[test]
    fn test_bios_menu_is_preset() {
        let menu = Menu::bios("SuperMicro-Lab-07").unwrap();
        assert_eq!(menu.state(), MenuState::Ready);
        assert_eq!(menu.boot_option().unwrap().name, "Boot Menu");
    }

    #[test]
    fn test_bios_menu_unknown_hardware() {
        assert!(matches!(
            Menu::bios("unknown-vendor-42"),
            Err(MenuError::UnsupportedHardware(_))
        ));
    }

    #[test]
    fn test_host_family() {
        assert_eq!(HostFamily::from_host("yow-cgcs-wildcat-76"), Some(HostFamily::Wildcat));
        assert_eq!(HostFamily::from_host("WolfPass-3"), Some(HostFamily::Wolfpass));
        assert_eq!(HostFamily::from_host("r730-1"), None);
    }

    #[test]
    fn test_iso_sub_menus_use_host_prompts() {
        let menu = Menu::usb_boot("yow-cgcs-wildcat-76");
        let names: Vec<&str> = menu.sub_menus().iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["Controller Configuration", "Console"]);

        let console = menu.sub_menu("Console", true).unwrap();
        assert!(console.prompt().is_match("Use the ^ and v keys to change the selection"));
        assert_eq!(console.state(), MenuState::Ready);
    }

    #[test]
    fn test_iso_sub_menus_default_prompts() {
        let menu = Menu::pxe_iso("lab-host");
        let controller = menu.sub_menu("Controller", false).unwrap();
        assert_eq!(
            controller.prompt().as_str(),
            Dialect::ControllerConfiguration.spec().prompt.as_str()
        );
    }

    #[test]
    fn test_select_request_by_profile() {
        let transcript = concat!(
            "\x1b[4;3H 1) Controller Install",
            "\x1b[5;3H 2) All-in-one Install",
            "\x1b[6;3H 3) Security Profile Enabled Boot Options  > ",
            "\x1b[20;1HAutomatic boot in 10 seconds",
        );
        let profile = InstallProfile {
            system_type: Some(SystemType::AioSx),
            ..InstallProfile::default()
        };
        let mut menu = Menu::uefi_kickstart()
            .with_profile(profile)
            .with_navigation(NavigationConfig::immediate());
        let mut session = ReplaySession::new(transcript);

        let selected = menu.select_request(&mut session, "security").unwrap();

        assert_eq!(selected.index, 2);
        assert_eq!(
            selected.tag,
            Some(
                KickstartTag {
                    node_type: Some(NodeType::Cpe),
                    security: SecurityProfile::Extended,
                    ..KickstartTag::default()
                }
                .into()
            )
        );
        assert_eq!(session.written(), b"\x1b[B\x1b[B\r");
    }

    #[test]
    fn test_select_boot_option_on_parsed_menu_without_one() {
        let mut menu = Menu::new(Dialect::Hp).with_options(vec![MenuOption::new(
            "Continue",
            0,
            biosnav_types::KeySequence::confirm(),
            None,
        )]);
        let mut session = ReplaySession::new("");
        assert!(matches!(
            menu.select_boot_option(&mut session),
            Err(MenuError::OptionNotFound { .. })
        ));
    }
}
