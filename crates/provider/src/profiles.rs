//! Static label registry for H.264 profiles.
//!
//! Provides readable profile names for `profile_idc` values.
//! Used by the reporter and sinks to enrich SPS output.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Profile metadata: display name and whether the SPS carries the
/// chroma/bit-depth extension fields.
#[derive(Debug, Clone)]
pub struct ProfileLabel {
    pub name: &'static str,
    pub high_family: bool,
}

impl ProfileLabel {
    const fn new(name: &'static str, high_family: bool) -> Self {
        Self { name, high_family }
    }
}

/// Returns the label for a known `profile_idc`, if any.
pub fn lookup(profile_idc: u8) -> Option<&'static ProfileLabel> {
    KNOWN_PROFILES.get(&profile_idc)
}

/// Profile name refined by the constraint flags (`constraint_flags` is the
/// raw byte following `profile_idc`).
pub fn describe(profile_idc: u8, constraint_flags: u8) -> String {
    let set1 = constraint_flags & 0x40 != 0;
    let set3 = constraint_flags & 0x10 != 0;

    match (profile_idc, set1, set3) {
        (66, true, _) => "Constrained Baseline".to_string(),
        (244, _, true) => "High 4:4:4 Intra".to_string(),
        (110 | 122, _, true) => match lookup(profile_idc) {
            Some(l) => format!("{} Intra", l.name),
            None => unknown_label(profile_idc),
        },
        _ => match lookup(profile_idc) {
            Some(l) => l.name.to_string(),
            None => unknown_label(profile_idc),
        },
    }
}

fn unknown_label(profile_idc: u8) -> String {
    format!("Unknown ({profile_idc})")
}

/// Whether an SPS with this profile carries `chroma_format_idc` and friends.
pub fn has_chroma_info(profile_idc: u8) -> bool {
    lookup(profile_idc).map_or(false, |l| l.high_family)
}

static KNOWN_PROFILES: LazyLock<HashMap<u8, ProfileLabel>> = LazyLock::new(|| {
    let mut m = HashMap::new();

    // ── Base profiles ───────────────────────────────────────
    m.insert(66, ProfileLabel::new("Baseline", false));
    m.insert(77, ProfileLabel::new("Main", false));
    m.insert(88, ProfileLabel::new("Extended", false));

    // ── High profiles ───────────────────────────────────────
    m.insert(100, ProfileLabel::new("High", true));
    m.insert(110, ProfileLabel::new("High 10", true));
    m.insert(122, ProfileLabel::new("High 4:2:2", true));
    m.insert(244, ProfileLabel::new("High 4:4:4 Predictive", true));
    m.insert(44, ProfileLabel::new("CAVLC 4:4:4 Intra", true));

    // ── Scalable / multiview ────────────────────────────────
    m.insert(83, ProfileLabel::new("Scalable Baseline", true));
    m.insert(86, ProfileLabel::new("Scalable High", true));
    m.insert(118, ProfileLabel::new("Multiview High", true));
    m.insert(128, ProfileLabel::new("Stereo High", true));
    m.insert(138, ProfileLabel::new("Multiview Depth High", true));
    m.insert(139, ProfileLabel::new("Enhanced Multiview Depth High", true));
    m.insert(134, ProfileLabel::new("MFC High", true));
    m.insert(135, ProfileLabel::new("MFC Depth High", true));

    m
});
