//! Nested menus discovered from parsed option labels.

use crate::dialect::Dialect;
use biosnav_types::MenuOption;

/// A parent option whose label matches spawns a child menu.
#[derive(Debug, Clone, Copy)]
pub struct SubMenuRule {
    pub parent: Dialect,
    /// Every fragment must appear in the lower-cased label
    pub all_of: &'static [&'static str],
    /// At least one fragment must appear in the lower-cased label
    pub any_of: &'static [&'static str],
    pub child: Dialect,
}

impl SubMenuRule {
    fn matches(&self, lower_label: &str) -> bool {
        self.all_of.iter().all(|f| lower_label.contains(f))
            && self.any_of.iter().any(|f| lower_label.contains(f))
    }
}

pub const SUB_MENU_RULES: &[SubMenuRule] = &[
    SubMenuRule {
        parent: Dialect::PxeKickstart,
        all_of: &["security"],
        any_of: &["  >", "options", "extended"],
        child: Dialect::PxeSecurity,
    },
    SubMenuRule {
        parent: Dialect::PxeKickstart,
        all_of: &["controller configuration"],
        any_of: &["  >"],
        child: Dialect::ControllerConfiguration,
    },
    SubMenuRule {
        parent: Dialect::PxeKickstart,
        all_of: &["console"],
        any_of: &["  >"],
        child: Dialect::Console,
    },
];

/// Child dialects spawned by the options of a `parent` menu, in rule order,
/// without duplicates. Each child comes with the index of the first option
/// that opens it.
pub fn discover_sub_menus(parent: Dialect, options: &[MenuOption]) -> Vec<(Dialect, usize)> {
    let labels: Vec<String> = options.iter().map(|o| o.name.to_lowercase()).collect();

    SUB_MENU_RULES
        .iter()
        .filter(|rule| rule.parent == parent)
        .filter_map(|rule| {
            labels
                .iter()
                .position(|label| rule.matches(label))
                .map(|position| (rule.child, options[position].index))
        })
        .fold(Vec::new(), |mut children: Vec<(Dialect, usize)>, (child, index)| {
            if !children.iter().any(|(known, _)| *known == child) {
                children.push((child, index));
            }
            children
        })
}
