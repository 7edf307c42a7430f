//! Vendor dialect registry.
//!
//! A dialect is the fixed set of markers and patterns needed to read one
//! vendor's (or one boot phase's) console output. The set is closed: an
//! unknown hardware identifier is an error, never a guess, because a wrong
//! end-of-menu marker either blocks the parse forever or turns decoration
//! into options.

use crate::classifier::infer_bios_tag;
use crate::{MenuError, Result};
use biosnav_types::{BiosTag, KeySequence, MenuOption};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Highlight attribute the PXE (syslinux) menus use for the selected row.
pub const PXE_HIGHLIGHT_CODE: &str = "\x1b[0;7;37;40m";

/// Highlight attribute the UEFI (grub) menus use for the selected row.
pub const UEFI_HIGHLIGHT_CODE: &str = "\x1b[0m\x1b[37m\x1b[40m";

/// Runs of cursor-positioning codes (`ESC [ row ; col H`).
pub(crate) const CURSOR_POSITION_RUN: &str = r"(\x1b\[\d+;\d+H)+";

const KICKSTART_END_OF_MENU: &str =
    r"([Aa]utomatic(ally)?( boot)? in)|Press (\[Tab\]|'e') to edit";

const KICKSTART_OPTION_IDENTIFIER: &str =
    r"(\dm?\)\s+[\w]+)|Boot from hard drive\s+|([\w]+\s)+\s+> ";

const BIOS_OPTION_IDENTIFIER: &str = r"(?i)\b(press|use)\b";

const CONTROLLER_CONFIGURATION_PROMPT: &str =
    r"(\x1b.*\*?.*\sController Configuration\s.*\*?(\x1b\[\d+;\d+H)?)";

const CONSOLE_PROMPT: &str = r"\x1b.*\*?.*\s(Serial)|(Graphical) Console(\s).*\*?";

/// Every console menu this engine knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    AmericanMegatrends,
    Hp,
    Ironpass,
    Ml350,
    PowerEdge,
    Phoenix,
    Supermicro,
    /// One-shot boot device picker reached from the BIOS boot hot key
    BootDevice,
    /// Legacy PXE kickstart menu (syslinux)
    PxeKickstart,
    /// UEFI kickstart menu (grub)
    UefiKickstart,
    /// Security profile sub-menu of the PXE kickstart menu
    PxeSecurity,
    ControllerConfiguration,
    Console,
    /// Kernel options menu of a PXE-booted ISO
    PxeIso,
    /// Kernel options menu of a USB-booted ISO
    Usb,
}

/// Which classifier reads a dialect's option labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialectFamily {
    /// POST hot-key screens
    Bios,
    /// Boot device picker; generic labels
    BootDevice,
    /// Installer boot menus; structured tags
    Kickstart,
}

/// How a captured buffer is cut into candidate option segments.
#[derive(Debug, Clone)]
pub enum Segmentation {
    /// Split on every match of the pattern.
    Split(Regex),
    /// Split on cursor-positioning runs, keeping only runs that move to a
    /// lower row than the run before them.
    AscendingRows(Regex),
}

/// Decides whether a segment is an option rather than decoration.
#[derive(Debug, Clone)]
pub struct OptionFilter {
    pattern: Regex,
    /// Matches starting with this text do not count
    skip_prefix: Option<&'static str>,
}

impl OptionFilter {
    pub fn new(pattern: Regex) -> Self {
        Self {
            pattern,
            skip_prefix: None,
        }
    }

    fn skipping(pattern: Regex, prefix: &'static str) -> Self {
        Self {
            pattern,
            skip_prefix: Some(prefix),
        }
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// Whether the segment contains an identifier match that is not excluded.
    pub fn accepts(&self, segment: &str) -> bool {
        match self.skip_prefix {
            None => self.pattern.is_match(segment),
            Some(prefix) => self
                .pattern
                .find_iter(segment)
                .any(|m| !segment[m.start()..].starts_with(prefix)),
        }
    }
}

/// Parsing parameters for one dialect.
#[derive(Debug, Clone)]
pub struct DialectSpec {
    /// Menu name shown in logs
    pub name: &'static str,
    pub family: DialectFamily,
    /// Appears once the whole menu has been drawn
    pub end_of_menu: Regex,
    pub option_filter: OptionFilter,
    pub segmentation: Segmentation,
    /// Escape sequence marking the remote side's current selection
    pub highlight_code: Option<&'static str>,
    /// Identifies the screen before parsing starts
    pub prompt: Regex,
    pub wrap_around: bool,
}

/// Ordered identifier fragments; the first match wins.
static HARDWARE_TABLE: Lazy<Vec<(Regex, Dialect)>> = Lazy::new(|| {
    [
        ("wolfpass|wildcat|grizzly", Dialect::AmericanMegatrends),
        ("hp", Dialect::Hp),
        ("ironpass", Dialect::Ironpass),
        ("ml350", Dialect::Ml350),
        ("r730|r430", Dialect::PowerEdge),
        ("r720", Dialect::Phoenix),
        ("supermicro", Dialect::Supermicro),
    ]
    .into_iter()
    .map(|(fragments, dialect)| {
        let re = Regex::new(&format!("(?i){}", fragments)).expect("Invalid hardware fragment regex");
        (re, dialect)
    })
    .collect()
});

static SPECS: Lazy<HashMap<Dialect, DialectSpec>> =
    Lazy::new(|| Dialect::ALL.iter().map(|d| (*d, build_spec(*d))).collect());

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("Invalid dialect regex")
}

fn bios_spec(name: &'static str, boot_option: &str) -> DialectSpec {
    let boot_option = format!("(?i){}", boot_option);
    DialectSpec {
        name,
        family: DialectFamily::Bios,
        end_of_menu: re(&boot_option),
        option_filter: OptionFilter::new(re(BIOS_OPTION_IDENTIFIER)),
        segmentation: Segmentation::Split(re(r"\r?\n")),
        highlight_code: None,
        prompt: re(&boot_option),
        wrap_around: false,
    }
}

fn kickstart_spec(
    name: &'static str,
    prompt: &str,
    option_filter: OptionFilter,
    highlight_code: &'static str,
    wrap_around: bool,
) -> DialectSpec {
    DialectSpec {
        name,
        family: DialectFamily::Kickstart,
        end_of_menu: re(KICKSTART_END_OF_MENU),
        option_filter,
        segmentation: Segmentation::Split(re(CURSOR_POSITION_RUN)),
        highlight_code: Some(highlight_code),
        prompt: re(prompt),
        wrap_around,
    }
}

fn build_spec(dialect: Dialect) -> DialectSpec {
    match dialect {
        Dialect::AmericanMegatrends => bios_spec("American Megatrends", "boot menu"),
        Dialect::Ironpass => bios_spec("American Megatrends", "boot menu"),
        Dialect::Supermicro => bios_spec("American Megatrends", "boot menu"),
        Dialect::Hp => bios_spec("Hewlett-Packard", "network boot"),
        Dialect::Ml350 => bios_spec("Hewlett", "network boot"),
        Dialect::PowerEdge => bios_spec("PowerEdge", "pxe boot"),
        Dialect::Phoenix => bios_spec("Phoenix", r"PXE(\x1b\[\d;\d+H|\s)Boot"),
        Dialect::BootDevice => DialectSpec {
            name: "boot device menu",
            family: DialectFamily::BootDevice,
            end_of_menu: re(r"\^ and v to move selection|_q{40,}_"),
            // The heading is not selectable; the cursor starts on the first device
            option_filter: OptionFilter::skipping(re(r"[A-Z][A-Za-z]"), "Please select"),
            segmentation: Segmentation::AscendingRows(re(CURSOR_POSITION_RUN)),
            highlight_code: None,
            prompt: re(r"Please select boot device|Boot(\x1b\[\d+;\d+H)*(\s)*From"),
            wrap_around: true,
        },
        Dialect::PxeKickstart => kickstart_spec(
            "PXE boot menu",
            "Automatic Anaconda / Kickstart Boot Menu",
            OptionFilter::new(re(KICKSTART_OPTION_IDENTIFIER)),
            PXE_HIGHLIGHT_CODE,
            true,
        ),
        Dialect::UefiKickstart => kickstart_spec(
            "UEFI boot menu",
            "Automatic Anaconda / Kickstart Boot Menu",
            OptionFilter::new(re(KICKSTART_OPTION_IDENTIFIER)),
            UEFI_HIGHLIGHT_CODE,
            false,
        ),
        Dialect::PxeSecurity => kickstart_spec(
            "PXE Security Menu",
            "Security Profile Enabled Boot Options",
            OptionFilter::new(re(r"\dm?\)\s[\w]+")),
            PXE_HIGHLIGHT_CODE,
            true,
        ),
        Dialect::ControllerConfiguration => kickstart_spec(
            "Controller Configuration",
            CONTROLLER_CONFIGURATION_PROMPT,
            OptionFilter::new(re("Serial|Graphical")),
            UEFI_HIGHLIGHT_CODE,
            true,
        ),
        Dialect::Console => kickstart_spec(
            "Console",
            CONSOLE_PROMPT,
            OptionFilter::new(re("STANDARD|EXTENDED")),
            UEFI_HIGHLIGHT_CODE,
            true,
        ),
        Dialect::PxeIso => DialectSpec {
            end_of_menu: re(r"(utomatic(ally)?( boot)? in)"),
            ..kickstart_spec(
                "PXE ISO boot menu",
                "Boot from hard drive",
                OptionFilter::new(re(r"[A-Z][A-Za-z]")),
                PXE_HIGHLIGHT_CODE,
                true,
            )
        },
        Dialect::Usb => DialectSpec {
            end_of_menu: re(
                r"(utomatic(ally)?( boot)? in)|(Press (\[Tab\]|'e') to edit\s.*(\.)$)|keys to change the selection\.",
            ),
            ..kickstart_spec(
                "USB boot menu",
                "Select kernel options and boot kernel",
                OptionFilter::skipping(re(r"[A-Z][A-Za-z]"), "Press"),
                UEFI_HIGHLIGHT_CODE,
                true,
            )
        },
    }
}

/// Preset entries: label, key tokens, explicit tag.
type PresetRow = (&'static str, &'static [&'static str], Option<BiosTag>);

const AMERICAN_MEGATRENDS_PRESET: &[PresetRow] = &[
    ("direct boot", &["Enter"], None),
    ("setup", &["F2"], None),
    ("boot menu", &["F6"], Some(BiosTag::BootMenu)),
    ("network boot", &["F12"], None),
];

const IRONPASS_PRESET: &[PresetRow] = &[
    ("direct boot", &["Enter"], None),
    ("setup", &["F2"], None),
    ("Boot Menu", &["F6"], Some(BiosTag::BootMenu)),
    ("network boot", &["F12"], None),
];

const SUPERMICRO_PRESET: &[PresetRow] = &[
    ("Setup", &["Del"], None),
    ("Boot Menu", &["Esc", "!"], Some(BiosTag::BootMenu)),
    ("PXE/LAN", &["F12"], None),
];

const HP_PRESET: &[PresetRow] = &[
    ("continue", &["Esc", "1"], None),
    ("Setup", &["Esc", "9"], None),
    ("Intelligent Provisioning", &["ESC", "0"], None),
    ("Boot Override", &["ESC", "!"], None),
    ("Network Boot", &["ESC", "@"], Some(BiosTag::BootMenu)),
];

const ML350_PRESET: &[PresetRow] = &[
    ("System Utilities", &["ESC", "O", "p"], None),
    ("Intelligent Provisioning", &["ESC", "0"], None),
    ("One Time Boot", &["ESC", "!"], None),
    ("Network Boot", &["ESC", "@"], Some(BiosTag::BootMenu)),
];

const POWER_EDGE_PRESET: &[PresetRow] = &[
    ("System Setup", &["ESC", "2"], None),
    ("Lifecycle Controller", &["ESC", "0"], None),
    ("Boot Manager", &["ESC", "!"], None),
    ("PXE Boot", &["ESC", "@"], Some(BiosTag::BootMenu)),
];

const PHOENIX_PRESET: &[PresetRow] = &[
    ("System Setup", &["F2"], None),
    ("Lifecycle Controller", &["F10"], None),
    ("BIOS Boot Manager", &["F11"], None),
    ("PXE Boot", &["F12"], Some(BiosTag::BootMenu)),
];

const CONTROLLER_CONFIGURATION_PRESET: &[PresetRow] = &[
    ("Serial Console", &["Enter"], None),
    ("Graphical Console", &["Enter"], None),
];

const CONSOLE_PRESET: &[PresetRow] = &[
    ("STANDARD Security", &["Enter"], None),
    ("EXTENDED Security", &["Enter"], None),
];

impl Dialect {
    pub const ALL: [Dialect; 15] = [
        Dialect::AmericanMegatrends,
        Dialect::Hp,
        Dialect::Ironpass,
        Dialect::Ml350,
        Dialect::PowerEdge,
        Dialect::Phoenix,
        Dialect::Supermicro,
        Dialect::BootDevice,
        Dialect::PxeKickstart,
        Dialect::UefiKickstart,
        Dialect::PxeSecurity,
        Dialect::ControllerConfiguration,
        Dialect::Console,
        Dialect::PxeIso,
        Dialect::Usb,
    ];

    /// Resolve the BIOS dialect for a free-text lab or hardware identifier.
    ///
    /// # Errors
    ///
    /// Returns [`MenuError::UnsupportedHardware`] when no fragment matches.
    pub fn for_hardware(identifier: &str) -> Result<Dialect> {
        match HARDWARE_TABLE.iter().find(|(re, _)| re.is_match(identifier)) {
            Some((_, dialect)) => {
                debug!(target: "biosnav::dialect", "Hardware '{}' resolved to {}", identifier, dialect);
                Ok(*dialect)
            }
            None => Err(MenuError::UnsupportedHardware(identifier.to_string())),
        }
    }

    /// Parsing parameters for this dialect.
    pub fn spec(self) -> &'static DialectSpec {
        &SPECS[&self]
    }

    pub fn family(self) -> DialectFamily {
        self.spec().family
    }

    /// Options known ahead of time, for screens that are not worth parsing.
    ///
    /// Preset tags fall back to keyword inference when the row has none.
    pub fn preset_options(self) -> Vec<MenuOption> {
        let rows: &[PresetRow] = match self {
            Dialect::AmericanMegatrends => AMERICAN_MEGATRENDS_PRESET,
            Dialect::Ironpass => IRONPASS_PRESET,
            Dialect::Supermicro => SUPERMICRO_PRESET,
            Dialect::Hp => HP_PRESET,
            Dialect::Ml350 => ML350_PRESET,
            Dialect::PowerEdge => POWER_EDGE_PRESET,
            Dialect::Phoenix => PHOENIX_PRESET,
            Dialect::ControllerConfiguration => CONTROLLER_CONFIGURATION_PRESET,
            Dialect::Console => CONSOLE_PRESET,
            _ => &[],
        };

        rows.iter()
            .enumerate()
            .map(|(index, (name, keys, tag))| {
                let tag = tag.or_else(|| infer_bios_tag(&name.to_lowercase()));
                MenuOption::new(*name, index, KeySequence::from(*keys), tag.map(Into::into))
            })
            .collect()
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl FromStr for Dialect {
    type Err = String;

    /// Accepts the variant name in any case, with or without `-`/`_`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted: String = s.chars().filter(|c| *c != '-' && *c != '_').collect::<String>().to_lowercase();
        Dialect::ALL
            .into_iter()
            .find(|d| d.to_string().to_lowercase() == wanted)
            .ok_or_else(|| format!("Unknown dialect: '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supermicro_resolution_is_case_insensitive() {
        assert_eq!(Dialect::for_hardware("SuperMicro-Lab-07").unwrap(), Dialect::Supermicro);
    }

    #[test]
    fn test_unknown_vendor_fails_closed() {
        let err = Dialect::for_hardware("unknown-vendor-42").unwrap_err();
        assert!(matches!(err, MenuError::UnsupportedHardware(ref id) if id == "unknown-vendor-42"));
    }

    #[test]
    fn test_alternation_fragments() {
        assert_eq!(Dialect::for_hardware("yow-cgcs-wildcat-76").unwrap(), Dialect::AmericanMegatrends);
        assert_eq!(Dialect::for_hardware("R430-3").unwrap(), Dialect::PowerEdge);
        assert_eq!(Dialect::for_hardware("lab-r720-1").unwrap(), Dialect::Phoenix);
        assert_eq!(Dialect::for_hardware("ml350-g10").unwrap(), Dialect::Ml350);
    }

    #[test]
    fn test_every_dialect_has_a_spec() {
        for dialect in Dialect::ALL {
            assert!(!dialect.spec().name.is_empty());
        }
    }

    #[test]
    fn test_highlight_codes() {
        assert_eq!(Dialect::PxeKickstart.spec().highlight_code, Some(PXE_HIGHLIGHT_CODE));
        assert_eq!(Dialect::UefiKickstart.spec().highlight_code, Some(UEFI_HIGHLIGHT_CODE));
        assert_eq!(Dialect::BootDevice.spec().highlight_code, None);
        assert_eq!(Dialect::Hp.spec().highlight_code, None);
    }

    #[test]
    fn test_bios_presets_are_contiguous() {
        for dialect in [Dialect::Hp, Dialect::Phoenix, Dialect::Supermicro] {
            let options = dialect.preset_options();
            for (i, option) in options.iter().enumerate() {
                assert_eq!(option.index, i);
            }
        }
    }

    #[test]
    fn test_preset_tags_fall_back_to_inference() {
        let options = Dialect::AmericanMegatrends.preset_options();
        assert_eq!(options[1].tag, Some(BiosTag::Setup.into()));
        assert_eq!(options[2].tag, Some(BiosTag::BootMenu.into()));
        // "network boot" is inferred as a boot menu entry too
        assert_eq!(options[3].tag, Some(BiosTag::BootMenu.into()));
        assert_eq!(options[0].tag, None);
    }

    #[test]
    fn test_usb_filter_skips_press_prompts() {
        let filter = &Dialect::Usb.spec().option_filter;
        assert!(!filter.accepts("Press"));
        assert!(filter.accepts("Press Tab to edit"));
        assert!(filter.accepts("Graphical Console"));
        assert!(!filter.accepts("   "));
    }

    #[test]
    fn test_boot_device_filter_rejects_heading() {
        let filter = &Dialect::BootDevice.spec().option_filter;
        assert!(!filter.accepts("Please select boot device:"));
        assert!(filter.accepts("UEFI: SanDisk Cruzer 1.26"));
    }

    #[test]
    fn test_dialect_from_str() {
        assert_eq!("pxe-kickstart".parse::<Dialect>().unwrap(), Dialect::PxeKickstart);
        assert_eq!("BootDevice".parse::<Dialect>().unwrap(), Dialect::BootDevice);
        assert_eq!("usb".parse::<Dialect>().unwrap(), Dialect::Usb);
        assert!("floppy".parse::<Dialect>().is_err());
    }

    #[test]
    fn test_phoenix_prompt_spans_cursor_codes() {
        let prompt = &Dialect::Phoenix.spec().prompt;
        assert!(prompt.is_match("F12 = PXE\x1b[5;22HBoot"));
    }
}
