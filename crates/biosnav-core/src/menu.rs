//! Menu model and navigation engine.
//!
//! A [`Menu`] owns the options of one console screen and the engine's view
//! of where the remote cursor is. Two positions are tracked separately:
//! `believed_index` is this engine's own bookkeeping, `observed_index` is
//! read from highlight codes at parse time. When an observation exists,
//! navigation starts from it and the belief is ignored.

use crate::dialect::Dialect;
use crate::navigation::{plan_moves, CursorMove, NavigationConfig};
use crate::parser::{display_label, parse_menu};
use crate::session::ConsoleSession;
use crate::submenu::discover_sub_menus;
use crate::{MenuError, Result};
use biosnav_types::{InstallProfile, KeySequence, MenuOption, OptionTag};
use regex::Regex;
use std::fmt;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

/// How long `find_options` waits for the end-of-menu marker.
pub const DEFAULT_PARSE_TIMEOUT: Duration = Duration::from_secs(60);

/// Lifecycle of a menu instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuState {
    /// No options yet
    Uninitialized,
    /// Options parsed or preset
    Ready,
    /// Cursor keys are being sent
    Navigating,
    /// Commit key sent; terminal until the menu is parsed again
    Selected,
}

/// Which option `select` should activate.
#[derive(Debug, Clone)]
pub enum Target {
    /// Exact position
    Index(usize),
    /// Literal substring of the option name
    Contains(String),
    /// Regex searched in the option name
    Matches(Regex),
    /// Exact tag, including structured kickstart tags
    Tag(OptionTag),
}

impl Target {
    pub fn matches(&self, option: &MenuOption) -> bool {
        match self {
            Target::Index(index) => option.index == *index,
            Target::Contains(text) => option.name.contains(text.as_str()),
            Target::Matches(re) => re.is_match(&option.name),
            Target::Tag(tag) => option.tag.as_ref() == Some(tag),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Index(index) => write!(f, "index {}", index),
            Target::Contains(text) => write!(f, "pattern '{}'", text),
            Target::Matches(re) => write!(f, "pattern /{}/", re),
            Target::Tag(tag) => write!(f, "tag {}", tag),
        }
    }
}

impl From<usize> for Target {
    fn from(index: usize) -> Self {
        Target::Index(index)
    }
}

impl From<Regex> for Target {
    fn from(re: Regex) -> Self {
        Target::Matches(re)
    }
}

impl From<OptionTag> for Target {
    fn from(tag: OptionTag) -> Self {
        Target::Tag(tag)
    }
}

/// An ordered, indexed set of options for one console screen.
#[derive(Debug)]
pub struct Menu {
    name: String,
    dialect: Dialect,
    prompt: Regex,
    options: Vec<MenuOption>,
    believed_index: usize,
    observed_index: Option<usize>,
    wrap_around: bool,
    sub_menus: Vec<Menu>,
    /// Parent option leading to this menu; `None` when any entry can
    opened_by: Option<usize>,
    state: MenuState,
    navigation: NavigationConfig,
    parse_timeout: Duration,
    profile: InstallProfile,
}

impl Menu {
    /// Create a menu for a dialect, seeded with the dialect's preset options.
    pub fn new(dialect: Dialect) -> Self {
        let spec = dialect.spec();
        let options = dialect.preset_options();
        let state = if options.is_empty() {
            MenuState::Uninitialized
        } else {
            MenuState::Ready
        };

        Self {
            name: spec.name.to_string(),
            dialect,
            prompt: spec.prompt.clone(),
            options,
            believed_index: 0,
            observed_index: None,
            wrap_around: spec.wrap_around,
            sub_menus: Vec::new(),
            opened_by: None,
            state,
            navigation: NavigationConfig::default(),
            parse_timeout: DEFAULT_PARSE_TIMEOUT,
            profile: InstallProfile::default(),
        }
    }

    pub fn with_prompt(mut self, prompt: Regex) -> Self {
        self.prompt = prompt;
        self
    }

    /// Replace the options, e.g. with a known layout. Indices are reassigned
    /// in order.
    pub fn with_options(mut self, options: Vec<MenuOption>) -> Self {
        self.options = options
            .into_iter()
            .enumerate()
            .map(|(index, option)| MenuOption { index, ..option })
            .collect();
        self.state = if self.options.is_empty() {
            MenuState::Uninitialized
        } else {
            MenuState::Ready
        };
        self
    }

    pub fn with_wrap_around(mut self, wrap_around: bool) -> Self {
        self.wrap_around = wrap_around;
        self
    }

    pub fn with_navigation(mut self, navigation: NavigationConfig) -> Self {
        self.navigation = navigation;
        for sub_menu in &mut self.sub_menus {
            sub_menu.navigation = navigation;
        }
        self
    }

    pub fn with_parse_timeout(mut self, timeout: Duration) -> Self {
        self.parse_timeout = timeout;
        for sub_menu in &mut self.sub_menus {
            sub_menu.parse_timeout = timeout;
        }
        self
    }

    pub fn with_profile(mut self, profile: InstallProfile) -> Self {
        self.profile = profile;
        for sub_menu in &mut self.sub_menus {
            sub_menu.profile = profile;
        }
        self
    }

    /// Mark this menu as reached only through the parent option at `index`.
    pub fn with_opened_by(mut self, index: usize) -> Self {
        self.opened_by = Some(index);
        self
    }

    /// Start navigation from this cursor position.
    pub fn with_index(mut self, index: usize) -> Self {
        self.believed_index = index;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Pattern identifying this screen.
    pub fn prompt(&self) -> &Regex {
        &self.prompt
    }

    pub fn options(&self) -> &[MenuOption] {
        &self.options
    }

    pub fn state(&self) -> MenuState {
        self.state
    }

    pub fn wrap_around(&self) -> bool {
        self.wrap_around
    }

    pub fn profile(&self) -> &InstallProfile {
        &self.profile
    }

    pub fn believed_index(&self) -> usize {
        self.believed_index
    }

    pub fn observed_index(&self) -> Option<usize> {
        self.observed_index
    }

    /// Where navigation will start: the observed highlight if one was
    /// parsed, otherwise the engine's own belief.
    pub fn current_index(&self) -> usize {
        self.observed_index.unwrap_or(self.believed_index)
    }

    /// The option under the cursor, if any.
    pub fn current_option(&self) -> Option<&MenuOption> {
        self.options.get(self.current_index())
    }

    /// Parent option this menu is reached through, if restricted to one.
    pub fn opened_by(&self) -> Option<usize> {
        self.opened_by
    }

    /// Whether committing the parent option at `index` can lead here.
    pub fn reachable_from(&self, index: usize) -> bool {
        self.opened_by.is_none_or(|opener| opener == index)
    }

    pub fn sub_menus(&self) -> &[Menu] {
        &self.sub_menus
    }

    pub fn sub_menus_mut(&mut self) -> &mut [Menu] {
        &mut self.sub_menus
    }

    /// Find a sub-menu by exact name, or by substring when not `strict`.
    pub fn sub_menu(&self, name: &str, strict: bool) -> Option<&Menu> {
        self.sub_menus
            .iter()
            .find(|m| if strict { m.name == name } else { m.name.contains(name) })
    }

    /// Mutable variant of [`Menu::sub_menu`].
    ///
    /// # Errors
    ///
    /// Returns [`MenuError::UnknownSubMenu`] when nothing matches.
    pub fn sub_menu_mut(&mut self, name: &str, strict: bool) -> Result<&mut Menu> {
        self.sub_menus
            .iter_mut()
            .find(|m| if strict { m.name == name } else { m.name.contains(name) })
            .ok_or_else(|| MenuError::UnknownSubMenu(name.to_string()))
    }

    /// Register a nested menu unless one with the same name exists.
    pub fn add_sub_menu(&mut self, sub_menu: Menu) {
        if self.sub_menu(&sub_menu.name, true).is_none() {
            debug!(target: "biosnav::parser", "Sub menu added to {}: {}", self.name, sub_menu.name);
            self.sub_menus.push(sub_menu);
        }
    }

    /// Wait for this menu's screen to appear.
    ///
    /// # Errors
    ///
    /// Propagates the session failure, typically a timeout.
    pub fn wait_for_prompt(&self, session: &mut dyn ConsoleSession, timeout: Duration) -> Result<String> {
        debug!(target: "biosnav::parser", "Waiting for {} prompt {}", self.name, self.prompt);
        Ok(session.expect(&self.prompt, timeout)?)
    }

    /// Read the menu from the console, replacing any existing options.
    ///
    /// Blocks until the dialect's end-of-menu marker appears. On timeout the
    /// error is returned as is and nothing is written.
    ///
    /// # Errors
    ///
    /// Returns [`MenuError::Session`] when the marker never shows up.
    pub fn find_options(&mut self, session: &mut dyn ConsoleSession) -> Result<()> {
        let spec = self.dialect.spec();
        let buffer = session.expect(&spec.end_of_menu, self.parse_timeout)?;
        self.load_buffer(&buffer);
        Ok(())
    }

    /// Parse an already captured buffer, replacing any existing options.
    ///
    /// Dialects with preset options fall back to the presets when the
    /// screen yields none.
    pub fn load_buffer(&mut self, buffer: &str) {
        let parsed = parse_menu(self.dialect, buffer, &self.profile);
        let presets = if parsed.options.is_empty() {
            self.dialect.preset_options()
        } else {
            Vec::new()
        };
        if !presets.is_empty() {
            debug!(target: "biosnav::parser", "{} screen had no options, using presets", self.name);
            self.options = presets;
            self.observed_index = None;
            self.state = MenuState::Ready;
            return;
        }
        self.options = parsed.options;
        self.observed_index = parsed.highlighted;
        self.state = MenuState::Ready;

        if let Some(option) = self.current_option() {
            debug!(
                target: "biosnav::parser",
                "{} current option = {} index = {}",
                self.name,
                display_label(option),
                option.index
            );
        }

        for (child, opener) in discover_sub_menus(self.dialect, &self.options) {
            let sub_menu = Menu::new(child)
                .with_navigation(self.navigation)
                .with_parse_timeout(self.parse_timeout)
                .with_profile(self.profile)
                .with_opened_by(opener);
            self.add_sub_menu(sub_menu);
        }
    }

    fn resolve(&self, target: &Target) -> Result<&MenuOption> {
        self.options
            .iter()
            .find(|option| target.matches(option))
            .ok_or_else(|| MenuError::OptionNotFound {
                menu: self.name.clone(),
                target: target.to_string(),
            })
    }

    /// Navigate to and commit the option matching `target`.
    ///
    /// Parses first if the menu has no options yet. Options committed with
    /// the plain confirm key get the cursor walked onto them first; hot-key
    /// options are sent directly. Returns the committed option.
    ///
    /// # Errors
    ///
    /// - [`MenuError::AlreadySelected`] if this menu already committed
    /// - [`MenuError::Session`] if parsing times out or a write fails
    /// - [`MenuError::OptionNotFound`] if nothing matches `target`
    pub fn select(&mut self, session: &mut dyn ConsoleSession, target: &Target) -> Result<MenuOption> {
        if self.state == MenuState::Selected {
            return Err(MenuError::AlreadySelected(self.name.clone()));
        }

        if self.state == MenuState::Uninitialized {
            self.find_options(session)?;
        }

        let option = self.resolve(target)?.clone();
        info!(
            target: "biosnav::nav",
            "Attempt to select {} option {} index {}",
            self.name,
            display_label(&option),
            option.index
        );

        self.state = MenuState::Navigating;
        if option.needs_cursor() {
            self.align_cursor(session, option.index)?;
        }
        self.commit(session, &option)?;

        self.believed_index = 0;
        self.observed_index = None;
        self.state = MenuState::Selected;
        Ok(option)
    }

    fn align_cursor(&mut self, session: &mut dyn ConsoleSession, target_index: usize) -> Result<()> {
        let mut current = self.current_index();
        let moves = plan_moves(
            current,
            target_index,
            self.options.len(),
            self.wrap_around,
            self.navigation.strategy,
        );

        for cursor_move in moves {
            debug!(target: "biosnav::nav", "Current index = {}", current);
            self.press_move(session, cursor_move)?;
            current = cursor_move.apply(current, self.options.len(), self.wrap_around);
            self.believed_index = current;
            if !self.navigation.step_delay.is_zero() {
                thread::sleep(self.navigation.step_delay);
            }
        }

        self.observed_index = None;
        self.believed_index = current;
        Ok(())
    }

    fn press_move(&self, session: &mut dyn ConsoleSession, cursor_move: CursorMove) -> Result<()> {
        let bytes = KeySequence::single(cursor_move.key_name()).encode();
        for _ in 0..self.navigation.presses_per_step {
            info!(target: "biosnav::nav", "Press: {}", cursor_move.key_name());
            session.write(&bytes)?;
        }
        Ok(())
    }

    fn commit(&self, session: &mut dyn ConsoleSession, option: &MenuOption) -> Result<()> {
        let bytes = option.key.encode();
        for _ in 0..self.navigation.commit_repeats.max(1) {
            info!(
                target: "biosnav::nav",
                "Press {} ({:?}) to select {} option",
                option.key,
                String::from_utf8_lossy(&bytes),
                display_label(option)
            );
            session.write(&bytes)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::PXE_HIGHLIGHT_CODE;
    use crate::session::ReplaySession;
    use crate::SessionError;
    use biosnav_types::BiosTag;

    const DOWN: &[u8] = b"\x1b[B";
    const UP: &[u8] = b"\x1b[A";

    fn four_option_menu() -> Menu {
        let options = (0..4)
            .map(|i| MenuOption::new(format!("Option {}", i), i, KeySequence::confirm(), None))
            .collect();
        Menu::new(Dialect::BootDevice)
            .with_options(options)
            .with_wrap_around(true)
            .with_navigation(NavigationConfig::immediate())
    }

    fn repeat(bytes: &[u8], times: usize) -> Vec<u8> {
        bytes.repeat(times)
    }

    #[test]
    fn test_monotonic_walk_does_not_wrap() {
        let mut menu = four_option_menu();
        let mut session = ReplaySession::new("");

        let selected = menu.select(&mut session, &Target::Index(3)).unwrap();

        let mut expected = repeat(DOWN, 3);
        expected.extend_from_slice(b"\r");
        assert_eq!(session.written(), expected.as_slice());
        assert_eq!(selected.index, 3);
    }

    #[test]
    fn test_shortest_path_wraps_when_configured() {
        let mut menu = four_option_menu().with_navigation(
            NavigationConfig::immediate().with_strategy(crate::NavigationStrategy::ShortestPath),
        );
        let mut session = ReplaySession::new("");

        menu.select(&mut session, &Target::Index(3)).unwrap();

        let mut expected = UP.to_vec();
        expected.extend_from_slice(b"\r");
        assert_eq!(session.written(), expected.as_slice());
    }

    #[test]
    fn test_walk_up_from_believed_index() {
        let mut menu = four_option_menu().with_index(3);
        let mut session = ReplaySession::new("");

        menu.select(&mut session, &Target::Contains("Option 1".into())).unwrap();

        let mut expected = repeat(UP, 2);
        expected.extend_from_slice(b"\r");
        assert_eq!(session.written(), expected.as_slice());
    }

    #[test]
    fn test_presses_per_step() {
        let mut menu = four_option_menu()
            .with_navigation(NavigationConfig::immediate().with_presses_per_step(2));
        let mut session = ReplaySession::new("");

        menu.select(&mut session, &Target::Index(1)).unwrap();

        let mut expected = repeat(DOWN, 2);
        expected.extend_from_slice(b"\r");
        assert_eq!(session.written(), expected.as_slice());
    }

    #[test]
    fn test_hot_key_option_skips_cursor() {
        let mut menu = Menu::new(Dialect::Supermicro).with_navigation(NavigationConfig::immediate());
        let mut session = ReplaySession::new("");

        let selected = menu
            .select(&mut session, &Target::Tag(BiosTag::BootMenu.into()))
            .unwrap();

        assert_eq!(selected.name, "Boot Menu");
        assert_eq!(session.written(), b"\x1b!");
    }

    #[test]
    fn test_commit_repeats() {
        let mut menu = Menu::new(Dialect::Hp)
            .with_navigation(NavigationConfig::immediate().with_commit_repeats(3));
        let mut session = ReplaySession::new("");

        menu.select(&mut session, &Target::Tag(BiosTag::BootMenu.into())).unwrap();

        assert_eq!(session.written(), b"\x1b@\x1b@\x1b@");
    }

    #[test]
    fn test_index_resets_after_select() {
        let mut menu = four_option_menu();
        let mut session = ReplaySession::new("");

        menu.select(&mut session, &Target::Index(2)).unwrap();

        assert_eq!(menu.current_index(), 0);
        assert_eq!(menu.state(), MenuState::Selected);
    }

    #[test]
    fn test_selected_is_terminal() {
        let mut menu = four_option_menu();
        let mut session = ReplaySession::new("");

        menu.select(&mut session, &Target::Index(1)).unwrap();
        let err = menu.select(&mut session, &Target::Index(1)).unwrap_err();
        assert!(matches!(err, MenuError::AlreadySelected(_)));
    }

    #[test]
    fn test_target_not_found() {
        let mut menu = four_option_menu();
        let mut session = ReplaySession::new("");

        let err = menu.select(&mut session, &Target::Index(7)).unwrap_err();
        assert!(matches!(err, MenuError::OptionNotFound { .. }));
        assert!(session.written().is_empty());

        let err = menu
            .select(&mut session, &Target::Matches(Regex::new("^Nope").unwrap()))
            .unwrap_err();
        assert!(err.to_string().contains("/^Nope/"));
    }

    #[test]
    fn test_parse_on_first_select() {
        let transcript = concat!(
            "\x1b[3;20HPlease select boot device:",
            "\x1b[5;20HUEFI: PXE IP4 Intel(R) Ethernet",
            "\x1b[6;20HSATA: Samsung SSD 860",
            "\x1b[7;20HUSB: SanDisk Cruzer",
            "\x1b[10;20H^ and v to move selection",
        );
        let mut menu = Menu::new(Dialect::BootDevice).with_navigation(NavigationConfig::immediate());
        assert_eq!(menu.state(), MenuState::Uninitialized);
        let mut session = ReplaySession::new(transcript);

        let selected = menu
            .select(&mut session, &Target::Matches(Regex::new("USB|SanDisk").unwrap()))
            .unwrap();

        assert_eq!(selected.index, 2);
        let mut expected = repeat(DOWN, 2);
        expected.extend_from_slice(b"\r");
        assert_eq!(session.written(), expected.as_slice());
    }

    #[test]
    fn test_highlight_overrides_belief() {
        let transcript = format!(
            concat!(
                "\x1b[4;3H 1) Serial Controller Install",
                "\x1b[5;3H 2) Serial CPE Install",
                "\x1b[6;3H{} 3) Serial Low Latency Install",
                "\x1b[7;3H 4) Graphical Controller Install",
                "\x1b[20;1HAutomatic boot in 10 seconds",
            ),
            PXE_HIGHLIGHT_CODE
        );
        let mut menu = Menu::new(Dialect::PxeKickstart)
            .with_index(0)
            .with_navigation(NavigationConfig::immediate());
        let mut session = ReplaySession::new(transcript);

        menu.find_options(&mut session).unwrap();
        assert_eq!(menu.current_index(), 2);
        assert_eq!(menu.believed_index(), 0);

        menu.select(&mut session, &Target::Index(0)).unwrap();
        let mut expected = repeat(UP, 2);
        expected.extend_from_slice(b"\r");
        assert_eq!(session.written(), expected.as_slice());
    }

    #[test]
    fn test_parse_timeout_writes_nothing() {
        let mut menu = Menu::new(Dialect::BootDevice);
        let mut session = ReplaySession::new("garbage without a marker");

        let err = menu.select(&mut session, &Target::Index(0)).unwrap_err();

        assert!(matches!(err, MenuError::Session(SessionError::Timeout { .. })));
        assert!(err.is_timeout());
        assert!(session.written().is_empty());
        assert_eq!(menu.state(), MenuState::Uninitialized);
    }

    #[test]
    fn test_with_options_reindexes() {
        let menu = Menu::new(Dialect::BootDevice).with_options(vec![
            MenuOption::new("a", 5, KeySequence::confirm(), None),
            MenuOption::new("b", 9, KeySequence::confirm(), None),
        ]);
        let indices: Vec<usize> = menu.options().iter().map(|o| o.index).collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn test_preset_menu_reads_highlight_from_screen() {
        let screen = format!(
            concat!(
                "\x1b[4;3H Serial Console\r\n",
                "\x1b[5;3H{} Graphical Console\r\n",
                "\x1b[20;1HAutomatic boot in 5 seconds",
            ),
            crate::dialect::UEFI_HIGHLIGHT_CODE
        );
        let mut menu = Menu::new(Dialect::ControllerConfiguration).with_navigation(NavigationConfig::immediate());
        let mut session = ReplaySession::new(screen);

        menu.find_options(&mut session).unwrap();
        assert_eq!(menu.current_index(), 1);

        menu.select(&mut session, &Target::Contains("Serial Console".into())).unwrap();
        let mut expected = UP.to_vec();
        expected.extend_from_slice(b"\r");
        assert_eq!(session.written(), expected.as_slice());
    }

    #[test]
    fn test_empty_screen_keeps_presets() {
        let mut menu = Menu::new(Dialect::Console);
        menu.load_buffer("\x1b[20;1HAutomatic boot in 5 seconds");

        assert_eq!(menu.state(), MenuState::Ready);
        assert_eq!(menu.options().len(), 2);
        assert_eq!(menu.observed_index(), None);
    }

    #[test]
    fn test_discovered_sub_menu_records_opener() {
        let transcript = concat!(
            "\x1b[4;3H 1) Standard Controller Install",
            "\x1b[5;3H 2) Security Profile Enabled Boot Options  > ",
            "\x1b[20;1HAutomatic boot in 10 seconds",
        );
        let mut menu = Menu::new(Dialect::PxeKickstart)
            .with_parse_timeout(Duration::from_secs(7));
        menu.load_buffer(transcript);

        let security = menu.sub_menu("Security", false).unwrap();
        assert_eq!(security.opened_by(), Some(1));
        assert!(security.reachable_from(1));
        assert!(!security.reachable_from(0));
        assert!(Menu::new(Dialect::Console).reachable_from(0));
    }

    #[test]
    fn test_sub_menu_lookup() {
        let mut menu = Menu::new(Dialect::PxeKickstart);
        menu.add_sub_menu(Menu::new(Dialect::Console));
        menu.add_sub_menu(Menu::new(Dialect::Console));

        assert_eq!(menu.sub_menus().len(), 1);
        assert!(menu.sub_menu("Console", true).is_some());
        assert!(menu.sub_menu("Cons", true).is_none());
        assert!(menu.sub_menu("Cons", false).is_some());
        assert!(matches!(
            menu.sub_menu_mut("Security", false),
            Err(MenuError::UnknownSubMenu(_))
        ));
    }
}
