//! Menu parser: turns a captured console buffer into an ordered option list.
//!
//! The buffer is cut into candidate segments using the dialect's
//! segmentation, decoration is dropped with the dialect's option filter, and
//! each remaining segment is classified in document order. Highlight-aware
//! dialects additionally report which option the remote side has selected.

use crate::classifier::{classify_bios, classify_kickstart};
use crate::dialect::{Dialect, DialectFamily, Segmentation};
use biosnav_types::{InstallProfile, MenuOption};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

/// Row number of a cursor-positioning code (`ESC [ row ; col H`).
static ROW_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(\d+)").expect("Invalid row regex"));

/// Result of parsing one menu screen.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMenu {
    pub options: Vec<MenuOption>,
    /// Index of the first option carrying the dialect's highlight code
    pub highlighted: Option<usize>,
}

/// Parse a captured buffer with the given dialect.
pub fn parse_menu(dialect: Dialect, buffer: &str, profile: &InstallProfile) -> ParsedMenu {
    let spec = dialect.spec();

    let options: Vec<MenuOption> = segments(&spec.segmentation, buffer)
        .into_iter()
        .filter(|segment| spec.option_filter.accepts(segment))
        .enumerate()
        .map(|(index, segment)| match spec.family {
            DialectFamily::Kickstart => classify_kickstart(segment, index, profile),
            DialectFamily::Bios | DialectFamily::BootDevice => classify_bios(segment, index),
        })
        .collect();

    let highlighted = spec.highlight_code.and_then(|code| {
        options
            .iter()
            .find(|option| option.name.contains(code))
            .map(|option| option.index)
    });

    debug!(
        target: "biosnav::parser",
        "{} parsed {} options (highlighted: {:?}): {:?}",
        spec.name,
        options.len(),
        highlighted,
        options.iter().map(|o| strip_ansi_codes(&o.name)).collect::<Vec<_>>()
    );

    ParsedMenu {
        options,
        highlighted,
    }
}

/// Cut a buffer into candidate option segments.
pub fn segments<'a>(segmentation: &Segmentation, buffer: &'a str) -> Vec<&'a str> {
    match segmentation {
        Segmentation::Split(pattern) => pattern.split(buffer).collect(),
        Segmentation::AscendingRows(positioning) => ascending_row_segments(positioning, buffer),
    }
}

/// Split on cursor-positioning runs that move to a lower row than the run
/// immediately before them. The span after the last boundary is dropped.
fn ascending_row_segments<'a>(positioning: &Regex, buffer: &'a str) -> Vec<&'a str> {
    let runs: Vec<(usize, u32)> = positioning
        .find_iter(buffer)
        .map(|m| (m.start(), row_of(m.as_str())))
        .collect();

    let Some(first) = runs.first() else {
        trace!(target: "biosnav::parser", "No cursor-positioning codes in buffer");
        return Vec::new();
    };

    let mut boundaries = vec![first.0];
    for pair in runs.windows(2) {
        if pair[1].1 > pair[0].1 {
            boundaries.push(pair[1].0);
        }
    }

    boundaries
        .windows(2)
        .map(|bounds| &buffer[bounds[0]..bounds[1]])
        .collect()
}

fn row_of(code: &str) -> u32 {
    ROW_RE
        .captures(code)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Strip ANSI escape codes from text.
pub fn strip_ansi_codes(text: &str) -> String {
    static ANSI_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"\x1b\[[0-9;?]*[a-zA-Z]|\x1b[()][0-9A-Za-z]|\x1b[=>]")
            .expect("Invalid ANSI regex")
    });

    ANSI_RE.replace_all(text, "").to_string()
}

/// Option label with escape codes removed and whitespace collapsed, for
/// logs and reports.
pub fn display_label(option: &MenuOption) -> String {
    strip_ansi_codes(&option.name)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
