//! Console menu navigation for BIOS, boot device and installer screens.

mod classifier;
mod dialect;
mod error;
mod menu;
mod menus;
mod navigation;
mod parser;
mod session;
mod submenu;
mod telnet;

pub use classifier::{classify_bios, classify_kickstart, infer_key, kickstart_request_tag, kickstart_tag};
pub use dialect::{
    Dialect, DialectFamily, DialectSpec, OptionFilter, Segmentation, PXE_HIGHLIGHT_CODE, UEFI_HIGHLIGHT_CODE,
};
pub use error::{MenuError, SessionError};
pub use menu::{Menu, MenuState, Target, DEFAULT_PARSE_TIMEOUT};
pub use menus::HostFamily;
pub use navigation::{plan_moves, CursorMove, NavigationConfig, NavigationStrategy, DEFAULT_STEP_DELAY};
pub use parser::{display_label, parse_menu, segments, strip_ansi_codes, ParsedMenu};
pub use session::{ConsoleSession, ReplaySession};
pub use submenu::{discover_sub_menus, SubMenuRule, SUB_MENU_RULES};
pub use telnet::TelnetSession;

/// Result type for menu operations.
pub type Result<T> = std::result::Result<T, MenuError>;
