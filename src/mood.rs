//! Mood catalog and display resolution.
//!
//! Resolution prefers the name snapshotted at capture time over the live
//! catalog, and never shows a raw internal identifier to the user. Colors
//! are deterministic: the same label maps to the same color across sessions.

use crate::moment::{MoodId, CUSTOM_MOOD_PREFIX};

/// A built-in mood definition.
#[derive(Debug, Clone, Copy)]
pub struct CatalogMood {
    pub id: &'static str,
    pub name: &'static str,
    pub color: &'static str,
}

/// System-defined moods. User-defined moods live outside this table and
/// resolve through the snapshot fallback chain.
pub const MOOD_CATALOG: &[CatalogMood] = &[
    CatalogMood { id: "happy", name: "Happy", color: "#F6C453" },
    CatalogMood { id: "calm", name: "Calm", color: "#7FB8A4" },
    CatalogMood { id: "excited", name: "Excited", color: "#F2845C" },
    CatalogMood { id: "grateful", name: "Grateful", color: "#C79BD4" },
    CatalogMood { id: "content", name: "Content", color: "#9CC97C" },
    CatalogMood { id: "tired", name: "Tired", color: "#8E9BBF" },
    CatalogMood { id: "sad", name: "Sad", color: "#6E93C9" },
    CatalogMood { id: "anxious", name: "Anxious", color: "#D98A9E" },
    CatalogMood { id: "stressed", name: "Stressed", color: "#C96E6E" },
    CatalogMood { id: "angry", name: "Angry", color: "#B8504F" },
    CatalogMood { id: "loved", name: "Loved", color: "#E58BB1" },
    CatalogMood { id: "bored", name: "Bored", color: "#A8A39B" },
];

/// Shown when a custom mood has no usable snapshot text.
pub const CUSTOM_MOOD_LABEL: &str = "Custom Mood";

/// Final color fallback for unresolvable labels.
pub const NEUTRAL_COLOR: &str = "#9AA0A6";

/// Palette for moods outside the catalog, indexed by label hash.
const DERIVED_PALETTE: &[&str] = &[
    "#E8A04C", "#6FB3B8", "#C97BA8", "#8FA861", "#7C8FD9",
    "#D9896C", "#5FA88C", "#B08BC9", "#C9B45F", "#6E9FC9",
];

pub fn catalog_lookup(raw_id: &str) -> Option<&'static CatalogMood> {
    MOOD_CATALOG.iter().find(|m| m.id == raw_id)
}

/// Resolve a display label, in priority order:
///
/// 1. the capture-time snapshot, when it is non-empty, differs from the raw
///    identifier, and does not itself look like a raw custom identifier;
/// 2. the catalog's canonical name;
/// 3. for custom moods, the snapshot verbatim when any text exists,
///    otherwise the generic custom-mood label;
/// 4. the raw identifier, title-cased.
pub fn resolve_label(mood: &MoodId, snapshot: Option<&str>) -> String {
    let raw = mood.raw();

    if let Some(name) = snapshot {
        let trimmed = name.trim();
        if !trimmed.is_empty() && trimmed != raw && !trimmed.starts_with(CUSTOM_MOOD_PREFIX) {
            return trimmed.to_string();
        }
    }

    if let Some(entry) = catalog_lookup(&raw) {
        return entry.name.to_string();
    }

    if mood.is_custom() {
        return match snapshot.map(str::trim) {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => CUSTOM_MOOD_LABEL.to_string(),
        };
    }

    title_case(&raw)
}

/// Deterministic color for a mood: the catalog color when known, otherwise
/// a palette entry picked by a stable hash of the resolved label.
pub fn resolve_color(mood: &MoodId, snapshot: Option<&str>) -> String {
    if let Some(entry) = catalog_lookup(&mood.raw()) {
        return entry.color.to_string();
    }

    let label = resolve_label(mood, snapshot);
    derived_color(&label)
}

/// Stable label-to-color mapping. Same label, same color, every session.
pub fn derived_color(label: &str) -> String {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        return NEUTRAL_COLOR.to_string();
    }
    let index = (fnv1a(trimmed) % DERIVED_PALETTE.len() as u64) as usize;
    DERIVED_PALETTE[index].to_string()
}

/// FNV-1a; stable across platforms and releases, unlike the std hasher.
pub(crate) fn fnv1a(text: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    text.bytes().fold(OFFSET, |hash, byte| (hash ^ u64::from(byte)).wrapping_mul(PRIME))
}

fn title_case(raw: &str) -> String {
    raw.split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
