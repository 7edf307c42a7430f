//! End-to-end boot flow: POST hot key, boot device, installer entry, then
//! any configuration sub-menus the installer shows.

use crate::config::{BootType, Config};
use anyhow::{Context, Result};
use biosnav_core::{display_label, ConsoleSession, Dialect, Menu, Target};
use biosnav_types::{ConsoleHint, InstallProfile, KickstartTag, MenuOption, OptionTag};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

/// One committed selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub menu: String,
    pub option: String,
    pub index: usize,
}

impl Selection {
    fn new(menu: &Menu, option: &MenuOption) -> Self {
        Self {
            menu: menu.name().to_string(),
            option: display_label(option),
            index: option.index,
        }
    }
}

/// Every selection the flow made, in order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BootReport {
    pub selections: Vec<Selection>,
}

/// Drives a host from power-on to the installer.
pub struct BootFlow<'a> {
    config: &'a Config,
}

impl<'a> BootFlow<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Run every stage against an open console session.
    pub fn run(&self, session: &mut dyn ConsoleSession) -> Result<BootReport> {
        let mut report = BootReport::default();

        let selection = self.enter_boot_menu(session)?;
        report.selections.push(selection);

        let selection = self.pick_boot_device(session)?;
        report.selections.push(selection);

        let mut installer = self.installer_menu();
        let option = self.pick_installer_entry(session, &mut installer)?;
        report.selections.push(Selection::new(&installer, &option));

        self.walk_sub_menus(session, &mut installer, option.index, &mut report)?;

        info!(target: "biosnav::flow", "Boot flow finished after {} selections", report.selections.len());
        Ok(report)
    }

    fn navigated(&self, menu: Menu) -> Menu {
        let nav = &self.config.navigation;
        menu.with_navigation(nav.navigation_config())
            .with_parse_timeout(nav.parse_timeout())
            .with_profile(self.config.install.profile())
    }

    fn enter_boot_menu(&self, session: &mut dyn ConsoleSession) -> Result<Selection> {
        let hardware = self
            .config
            .hardware
            .as_deref()
            .context("No hardware identifier configured; pass --hardware or set `hardware`")?;
        let nav = &self.config.navigation;

        let mut bios = Menu::bios(hardware)?
            .with_navigation(nav.navigation_config().with_commit_repeats(nav.bios_hotkey_repeats))
            .with_parse_timeout(nav.parse_timeout());

        info!(target: "biosnav::flow", "Waiting for {} POST screen", bios.name());
        bios.wait_for_prompt(session, nav.parse_timeout())
            .with_context(|| format!("{} POST screen never appeared", bios.name()))?;

        let option = bios.select_boot_option(session)?;
        Ok(Selection::new(&bios, &option))
    }

    fn pick_boot_device(&self, session: &mut dyn ConsoleSession) -> Result<Selection> {
        let pattern = &self.config.install.boot_device_pattern;
        let target = Regex::new(pattern).with_context(|| format!("Invalid boot device pattern '{}'", pattern))?;

        let mut devices = self.navigated(Menu::boot_device());
        let option = devices
            .select(session, &Target::Matches(target))
            .context("Failed to select boot device")?;
        Ok(Selection::new(&devices, &option))
    }

    fn installer_menu(&self) -> Menu {
        let host = &self.config.console.host;
        let menu = match self.config.install.boot_type {
            BootType::Pxe => Menu::pxe_kickstart(),
            BootType::Uefi => Menu::uefi_kickstart(),
            BootType::PxeIso => Menu::pxe_iso(host),
            BootType::Usb => Menu::usb_boot(host),
        };
        self.navigated(menu)
    }

    fn pick_installer_entry(&self, session: &mut dyn ConsoleSession, menu: &mut Menu) -> Result<MenuOption> {
        menu.find_options(session)
            .with_context(|| format!("{} never finished drawing", menu.name()))?;

        let option = match self.config.install.kickstart_request.as_deref() {
            Some(request) => menu.select_request(session, request)?,
            // ISO menus preselect the entry matching the image
            None if matches!(menu.dialect(), Dialect::PxeIso | Dialect::Usb) => {
                let current = menu.current_index();
                menu.select(session, &Target::Index(current))?
            }
            None => {
                let target = self.config.install.profile().kickstart_target();
                menu.select(session, &Target::Tag(target.into()))?
            }
        };
        Ok(option)
    }

    /// Visit the sub-menus the committed option can lead to, in order; those
    /// whose screen does not show up within the sub-menu timeout are skipped.
    fn walk_sub_menus(
        &self,
        session: &mut dyn ConsoleSession,
        menu: &mut Menu,
        committed: usize,
        report: &mut BootReport,
    ) -> Result<()> {
        let appear_timeout = self.config.navigation.sub_menu_timeout();
        let profile = self.config.install.profile();
        let console = self.config.install.console;

        for sub_menu in menu.sub_menus_mut() {
            if !sub_menu.reachable_from(committed) {
                debug!(target: "biosnav::flow", "{} not behind option {}, skipping", sub_menu.name(), committed);
                continue;
            }

            match sub_menu.wait_for_prompt(session, appear_timeout) {
                Ok(_) => {}
                Err(e) if e.is_timeout() => {
                    debug!(target: "biosnav::flow", "{} not shown, skipping", sub_menu.name());
                    continue;
                }
                Err(e) => return Err(e.into()),
            }

            // Preset screens still report where their cursor starts
            if sub_menu.dialect().spec().highlight_code.is_some() {
                sub_menu
                    .find_options(session)
                    .with_context(|| format!("{} never finished drawing", sub_menu.name()))?;
            }

            let target = sub_menu_target(sub_menu.dialect(), &profile, console);
            info!(target: "biosnav::flow", "Entered {}, selecting {}", sub_menu.name(), target);
            let option = sub_menu.select(session, &target)?;
            report.selections.push(Selection::new(sub_menu, &option));

            self.walk_sub_menus(session, sub_menu, option.index, report)?;
        }
        Ok(())
    }
}

/// What to pick in a configuration sub-menu for this install.
pub fn sub_menu_target(dialect: Dialect, profile: &InstallProfile, console: ConsoleHint) -> Target {
    match dialect {
        Dialect::PxeSecurity => Target::Tag(OptionTag::from(KickstartTag {
            node_type: profile.node_type(),
            ..KickstartTag::default()
        })),
        Dialect::ControllerConfiguration => Target::Contains(match console {
            ConsoleHint::Serial => "Serial Console".to_string(),
            ConsoleHint::Graphical => "Graphical Console".to_string(),
        }),
        Dialect::Console => Target::Contains(format!("{} Security", profile.security.as_str().to_uppercase())),
        _ => Target::Index(0),
    }
}
