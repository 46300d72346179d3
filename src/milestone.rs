//! Milestone ladder: maps the lifetime completion counter to a mood and a
//! progress-bar cap.
//!
//! The ladder is configuration. Both backends must be driven by the same
//! table, otherwise they would derive different moods from identical counters.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, TrackerError};

/// Mood label shown by the mascot. Always trimmed and lowercase, whichever
/// way it entered (config, store, caller).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Mood(String);

impl Mood {
    /// Normalize a raw mood label (trimmed, lowercase).
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InvalidArgument`] for an empty label.
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized = normalize(raw);
        if normalized.is_empty() {
            return Err(TrackerError::InvalidArgument(
                "mood cannot be empty".to_owned(),
            ));
        }
        Ok(Self(normalized))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Mood {
    type Error = TrackerError;

    fn try_from(raw: String) -> Result<Self> {
        Self::parse(&raw)
    }
}

impl From<Mood> for String {
    fn from(mood: Mood) -> Self {
        mood.0
    }
}

fn normalize(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One rung of the ladder as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneTier {
    /// Lifetime completions needed to reach this rung.
    pub threshold: u64,
    /// Mood derived while on this rung.
    pub mood: Mood,
    /// Progress-bar maximum while on this rung.
    pub cap: u64,
}

impl MilestoneTier {
    /// Convenience constructor. The label is normalized like [`Mood::parse`];
    /// a blank one is rejected later by [`MilestoneTable::new`].
    pub fn new(threshold: u64, mood: &str, cap: u64) -> Self {
        Self {
            threshold,
            mood: Mood(normalize(mood)),
            cap,
        }
    }
}

/// Resolved rung for a given counter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub index: usize,
    pub mood: Mood,
    pub threshold: u64,
    pub max_value: u64,
}

impl Milestone {
    /// Progress shown on the bar: completions past this rung, capped.
    #[must_use]
    pub fn display_completed(&self, all_time_completed: u64) -> u64 {
        all_time_completed
            .saturating_sub(self.threshold)
            .min(self.max_value)
    }
}

/// Validated, ascending milestone ladder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MilestoneTable {
    tiers: Vec<MilestoneTier>,
}

impl MilestoneTable {
    /// Validate and build a table.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Config`] when the table is empty, does not start
    /// at threshold 0, is not strictly ascending, or has a blank mood.
    pub fn new(tiers: Vec<MilestoneTier>) -> Result<Self> {
        let Some(first) = tiers.first() else {
            return Err(TrackerError::Config(
                "milestone table must have at least one entry".to_owned(),
            ));
        };
        if first.threshold != 0 {
            return Err(TrackerError::Config(format!(
                "first milestone threshold must be 0, got {}",
                first.threshold
            )));
        }
        for pair in tiers.windows(2) {
            if pair[1].threshold <= pair[0].threshold {
                return Err(TrackerError::Config(format!(
                    "milestone thresholds must be strictly ascending ({} then {})",
                    pair[0].threshold, pair[1].threshold
                )));
            }
        }
        if let Some(blank) = tiers.iter().find(|t| t.mood.as_str().trim().is_empty()) {
            return Err(TrackerError::Config(format!(
                "milestone at threshold {} has an empty mood",
                blank.threshold
            )));
        }
        Ok(Self { tiers })
    }

    /// The configured rungs, ascending.
    #[must_use]
    pub fn tiers(&self) -> &[MilestoneTier] {
        &self.tiers
    }

    /// Mood a freshly created record starts with.
    #[must_use]
    pub fn initial_mood(&self) -> Mood {
        self.tiers[0].mood.clone()
    }

    /// Highest rung whose threshold is at or below `all_time_completed`.
    ///
    /// Falls back to rung 0. Past the last threshold the result no longer
    /// changes.
    #[must_use]
    pub fn milestone_for(&self, all_time_completed: u64) -> Milestone {
        let index = self
            .tiers
            .iter()
            .rposition(|tier| tier.threshold <= all_time_completed)
            .unwrap_or(0);
        let tier = &self.tiers[index];
        Milestone {
            index,
            mood: tier.mood.clone(),
            threshold: tier.threshold,
            max_value: tier.cap,
        }
    }
}

impl Default for MilestoneTable {
    fn default() -> Self {
        Self {
            tiers: default_tiers(),
        }
    }
}

/// Built-in ladder used when configuration does not override it.
#[must_use]
pub fn default_tiers() -> Vec<MilestoneTier> {
    vec![
        MilestoneTier::new(0, "sleepy", 10),
        MilestoneTier::new(10, "calm", 15),
        MilestoneTier::new(25, "happy", 25),
        MilestoneTier::new(50, "excited", 50),
        MilestoneTier::new(100, "radiant", 100),
    ]
}
