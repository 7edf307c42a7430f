//! Option classifier: infers the activation key and semantic tag of an
//! option from its captured label. Pure functions of text, no I/O.

use biosnav_types::{
    canonical_key_name, BiosTag, ConsoleHint, InstallProfile, KeySequence, KickstartTag,
    MenuOption, NodeType, OptionTag, OsHint, SecurityProfile,
};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{trace, warn};

/// "Press F2", "<Press DEL>", "Use Tab", ...
static KEY_PHRASE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(press|use)\b\W*(\w+)").expect("Invalid key phrase regex"));

/// Infer the key that activates an option from its label.
///
/// A known key name is normalized to the key table spelling; any other token
/// is used verbatim. Labels without a press/use phrase take the confirm key.
pub fn infer_key(label: &str) -> KeySequence {
    let token = KEY_PHRASE_RE
        .captures(label)
        .and_then(|caps| caps.get(2))
        .map(|m| m.as_str())
        .filter(|token| !token.is_empty());

    match token {
        Some(token) => match canonical_key_name(token) {
            Some(name) => KeySequence::single(name),
            None => KeySequence::single(token),
        },
        None => KeySequence::confirm(),
    }
}

/// BIOS tag from an already lower-cased label.
pub(crate) fn infer_bios_tag(lower: &str) -> Option<BiosTag> {
    if lower.contains("boot menu") || lower.contains("network boot") || lower.contains("pxe boot") {
        Some(BiosTag::BootMenu)
    } else if lower.contains("setup") {
        Some(BiosTag::Setup)
    } else {
        None
    }
}

fn mentions_low_latency(lower: &str) -> bool {
    lower.contains("lowlat") || lower.contains("low lat") || lower.contains("low_lat")
}

/// Classify an entry of a BIOS POST screen or boot device menu.
pub fn classify_bios(label: &str, index: usize) -> MenuOption {
    let key = infer_key(label);
    let tag = infer_bios_tag(&label.to_lowercase()).map(OptionTag::from);
    trace!(target: "biosnav::parser", "Option {} key {} tag {:?}", index, key, tag);
    MenuOption::new(label, index, key, tag)
}

/// Structured tag for a kickstart entry label.
///
/// Each keyword check is independent; a later check only overrides an
/// earlier one when its own keyword matched.
pub fn kickstart_tag(label: &str, profile: &InstallProfile) -> KickstartTag {
    let lower = label.to_lowercase();
    let mut tag = KickstartTag::default();

    if lower.contains("wrl") || lower.contains("wrlinux") {
        tag.os = OsHint::Wrl;
    }

    if lower.contains("all-in-one") || lower.contains("cpe") || lower.contains("aio") {
        tag.node_type = Some(NodeType::Cpe);
    } else if lower.contains("controller") {
        tag.node_type = Some(NodeType::Standard);
    }

    if lower.contains("security") && lower.contains("extended") {
        tag.security = SecurityProfile::Extended;
    }

    if lower.contains("security profile enabled") {
        tag.security = SecurityProfile::Extended;
        if let Some(system_type) = profile.system_type {
            tag.node_type = Some(system_type.node_type());
        }
    }

    if mentions_low_latency(&lower) {
        tag.node_type = Some(NodeType::LowLatency);
    }

    if lower.contains("graphic") {
        tag.console = ConsoleHint::Graphical;
    }

    tag
}

/// Classify an entry of a kickstart boot menu.
pub fn classify_kickstart(label: &str, index: usize, profile: &InstallProfile) -> MenuOption {
    let key = infer_key(label);
    let tag = kickstart_tag(label, profile);
    trace!(target: "biosnav::parser", "Kickstart option {} key {} tag {:?}", index, key, tag);
    MenuOption::new(label, index, key, Some(tag.into()))
}

/// Turn a caller's free-text request ("standard", "cpe", "security", ...)
/// into the structured tag a kickstart entry must carry.
///
/// A security request takes its node type from the install profile; any
/// other request names the node type directly.
pub fn kickstart_request_tag(request: &str, profile: &InstallProfile) -> KickstartTag {
    let lower = request.to_lowercase();
    let mut tag = KickstartTag::default();

    if lower.contains("security") || lower.contains("extended") {
        tag.security = SecurityProfile::Extended;
        tag.node_type = profile.node_type();
    } else {
        tag.node_type = match lower.parse::<NodeType>() {
            Ok(node_type) => Some(node_type),
            Err(e) => {
                warn!(target: "biosnav::parser", "{}; requesting an untyped entry", e);
                None
            }
        };
    }

    tag
}
