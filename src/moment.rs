//! Domain records for captured moments.
//!
//! A moment is immutable once created: the mood display name is snapshotted
//! at capture time so historical rendering never depends on a catalog entry
//! that might later be renamed or deleted. Deletion is a hard delete; every
//! derived aggregate is recomputed from the surviving collection.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::period::Period;

/// Namespace prefix raw custom-mood identifiers arrive with.
pub const CUSTOM_MOOD_PREFIX: &str = "custom_";

/// A mood identifier, resolved from its raw wire form exactly once at the
/// boundary. Downstream code never re-parses the string convention.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MoodId {
    /// References a built-in catalog entry, e.g. `"calm"`.
    System(String),
    /// User-defined mood, identified by the uuid after the namespace prefix.
    Custom(String),
}

impl MoodId {
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix(CUSTOM_MOOD_PREFIX) {
            Some(id) => MoodId::Custom(id.to_string()),
            None => MoodId::System(raw.to_string()),
        }
    }

    /// The wire form this identifier arrived as.
    pub fn raw(&self) -> String {
        match self {
            MoodId::System(id) => id.clone(),
            MoodId::Custom(id) => format!("{CUSTOM_MOOD_PREFIX}{id}"),
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, MoodId::Custom(_))
    }
}

impl From<String> for MoodId {
    fn from(raw: String) -> Self {
        MoodId::parse(&raw)
    }
}

impl From<MoodId> for String {
    fn from(mood: MoodId) -> Self {
        mood.raw()
    }
}

/// One captured photo+mood moment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Moment {
    pub id: String,
    /// None for local-only/guest captures.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Source of all windowing.
    pub created_at: DateTime<Local>,
    pub mood: MoodId,
    /// Display name snapshotted at capture time.
    #[serde(default)]
    pub mood_name: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub image_ref: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Explicit `false` is the only opt-out from insight aggregation.
    #[serde(default = "default_include_in_insights")]
    pub include_in_insights: bool,
}

fn default_include_in_insights() -> bool {
    true
}

impl Moment {
    pub fn is_eligible(&self) -> bool {
        self.include_in_insights
    }
}

/// Eligible moments whose creation instant falls inside the window, bounds
/// inclusive. Pure: same inputs always yield the same slice.
pub fn filter_for_period<'a>(moments: &'a [Moment], period: &Period) -> Vec<&'a Moment> {
    moments
        .iter()
        .filter(|m| m.is_eligible() && period.contains(m.created_at))
        .collect()
}

/// A named collection of moments. Membership is a join relation; member
/// resolution against the live collection happens at aggregation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub moment_ids: Vec<String>,
}

impl Album {
    /// Eligible members present in the live collection, in collection order.
    pub fn members<'a>(&self, moments: &'a [Moment]) -> Vec<&'a Moment> {
        moments
            .iter()
            .filter(|m| m.is_eligible() && self.moment_ids.iter().any(|id| *id == m.id))
            .collect()
    }
}
