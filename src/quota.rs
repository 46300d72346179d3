//! Daily quotas for mood check-ins and AI splits.
//!
//! Counters live on the progress record and are zeroed by the daily reset.
//! Check and increment happen on the same in-memory record, and callers hold
//! the owner lock around load -> [`QuotaLimiter::try_increment`] -> save.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::progress::ProgressRecord;
use crate::task::OwnerId;

/// A named daily-use cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaClass {
    MoodCheckIn,
    AiSplit,
}

impl QuotaClass {
    /// Wire name of the counter this class consumes.
    #[must_use]
    pub fn counter_field(self) -> &'static str {
        match self {
            Self::MoodCheckIn => "dailyMoodChecks",
            Self::AiSplit => "dailyAISplits",
        }
    }

    fn counter(self, record: &ProgressRecord) -> u64 {
        match self {
            Self::MoodCheckIn => record.daily_mood_checks,
            Self::AiSplit => record.daily_ai_splits,
        }
    }

    fn counter_mut(self, record: &mut ProgressRecord) -> &mut u64 {
        match self {
            Self::MoodCheckIn => &mut record.daily_mood_checks,
            Self::AiSplit => &mut record.daily_ai_splits,
        }
    }
}

/// Subscription tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Premium,
}

/// Per-day limits for one tier. `None` (or an omitted key) means unlimited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaLimits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood_check_ins: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_splits: Option<u32>,
}

impl QuotaLimits {
    #[must_use]
    pub fn unlimited() -> Self {
        Self {
            mood_check_ins: None,
            ai_splits: None,
        }
    }

    #[must_use]
    pub fn limit(&self, class: QuotaClass) -> Option<u32> {
        match class {
            QuotaClass::MoodCheckIn => self.mood_check_ins,
            QuotaClass::AiSplit => self.ai_splits,
        }
    }
}

impl Default for QuotaLimits {
    fn default() -> Self {
        Self {
            mood_check_ins: Some(1),
            ai_splits: Some(1),
        }
    }
}

/// Quota configuration for all tiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    pub free: QuotaLimits,
    pub premium: QuotaLimits,
    /// Owners on the premium tier.
    pub premium_owners: Vec<String>,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            free: QuotaLimits::default(),
            premium: QuotaLimits::unlimited(),
            premium_owners: Vec::new(),
        }
    }
}

impl QuotaConfig {
    #[must_use]
    pub fn limits(&self, tier: Tier) -> &QuotaLimits {
        match tier {
            Tier::Free => &self.free,
            Tier::Premium => &self.premium,
        }
    }
}

/// Looks up an owner's subscription tier.
pub trait TierSource: Send + Sync {
    fn tier(&self, owner: &OwnerId) -> Tier;
}

/// Tier lookup from a fixed set of premium owners.
#[derive(Debug, Default, Clone)]
pub struct StaticTiers {
    premium: HashSet<OwnerId>,
}

impl StaticTiers {
    pub fn new<I, S>(premium: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            premium: premium.into_iter().map(|s| OwnerId::new(s)).collect(),
        }
    }
}

impl TierSource for StaticTiers {
    fn tier(&self, owner: &OwnerId) -> Tier {
        if self.premium.contains(owner) {
            Tier::Premium
        } else {
            Tier::Free
        }
    }
}

/// Result of a check-and-increment. Never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaOutcome {
    pub class: QuotaClass,
    pub success: bool,
    /// Counter value after the call.
    pub counter: u64,
    pub limit_reached: bool,
}

impl QuotaOutcome {
    /// Wire shape: `{ success, <counter field>, limitReached }`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        map.insert("success".to_owned(), self.success.into());
        map.insert(self.class.counter_field().to_owned(), self.counter.into());
        map.insert("limitReached".to_owned(), self.limit_reached.into());
        serde_json::Value::Object(map)
    }
}

/// Quota check-and-increment against a progress record.
#[derive(Clone)]
pub struct QuotaLimiter {
    config: QuotaConfig,
    tiers: Arc<dyn TierSource>,
}

impl QuotaLimiter {
    pub fn new(config: QuotaConfig, tiers: Arc<dyn TierSource>) -> Self {
        Self { config, tiers }
    }

    /// Same limits, different tier lookup.
    #[must_use]
    pub fn with_tiers(self, tiers: Arc<dyn TierSource>) -> Self {
        Self { tiers, ..self }
    }

    /// Limit for this owner and class, `None` when unlimited.
    #[must_use]
    pub fn limit(&self, owner: &OwnerId, class: QuotaClass) -> Option<u32> {
        self.config.limits(self.tiers.tier(owner)).limit(class)
    }

    #[must_use]
    pub fn can_perform(&self, record: &ProgressRecord, class: QuotaClass) -> bool {
        match self.limit(&record.owner_id, class) {
            Some(limit) => class.counter(record) < u64::from(limit),
            None => true,
        }
    }

    /// Re-check the limit and, only when still under it, increment the
    /// counter and mark the record modified. The caller persists it.
    pub fn try_increment(
        &self,
        record: &mut ProgressRecord,
        class: QuotaClass,
        now: DateTime<Utc>,
    ) -> QuotaOutcome {
        let limit = self.limit(&record.owner_id, class).map(u64::from);
        let current = class.counter(record);

        if limit.is_some_and(|limit| current >= limit) {
            return QuotaOutcome {
                class,
                success: false,
                counter: current,
                limit_reached: true,
            };
        }

        let counter = class.counter_mut(record);
        *counter = counter.saturating_add(1);
        let counter = *counter;
        record.touch(now);

        QuotaOutcome {
            class,
            success: true,
            counter,
            limit_reached: limit.is_some_and(|limit| counter >= limit),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::milestone::Mood;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_700_000_000_000).unwrap()
    }

    fn record(owner: &str) -> ProgressRecord {
        ProgressRecord::new(OwnerId::from(owner), Mood::parse("calm").unwrap(), now())
    }

    fn limiter(config: QuotaConfig) -> QuotaLimiter {
        let tiers = StaticTiers::new(config.premium_owners.clone());
        QuotaLimiter::new(config, Arc::new(tiers))
    }

    #[test]
    fn free_tier_mood_check_sequence_is_exact() {
        let limiter = limiter(QuotaConfig::default());
        let mut r = record("free");

        assert!(limiter.can_perform(&r, QuotaClass::MoodCheckIn));

        let first = limiter.try_increment(&mut r, QuotaClass::MoodCheckIn, now());
        assert!(first.success);
        assert_eq!(first.counter, 1);

        assert!(!limiter.can_perform(&r, QuotaClass::MoodCheckIn));

        let version = r.version;
        let second = limiter.try_increment(&mut r, QuotaClass::MoodCheckIn, now());
        assert!(!second.success);
        assert!(second.limit_reached);
        assert_eq!(second.counter, 1);
        assert_eq!(r.daily_mood_checks, 1);
        assert_eq!(r.version, version);
    }

    #[test]
    fn success_reports_limit_reached_on_last_slot() {
        let config = QuotaConfig {
            free: QuotaLimits {
                mood_check_ins: Some(1),
                ai_splits: Some(2),
            },
            ..QuotaConfig::default()
        };
        let limiter = limiter(config);
        let mut r = record("free");

        let first = limiter.try_increment(&mut r, QuotaClass::AiSplit, now());
        assert!(first.success && !first.limit_reached);
        let second = limiter.try_increment(&mut r, QuotaClass::AiSplit, now());
        assert!(second.success && second.limit_reached);
        assert_eq!(r.daily_ai_splits, 2);
    }

    #[test]
    fn classes_are_independent() {
        let limiter = limiter(QuotaConfig::default());
        let mut r = record("free");
        limiter.try_increment(&mut r, QuotaClass::MoodCheckIn, now());
        assert!(limiter.can_perform(&r, QuotaClass::AiSplit));
    }

    #[test]
    fn premium_is_unlimited() {
        let config = QuotaConfig {
            premium_owners: vec!["vip".to_owned()],
            ..QuotaConfig::default()
        };
        let limiter = limiter(config);
        let mut r = record("vip");
        for _ in 0..5 {
            let outcome = limiter.try_increment(&mut r, QuotaClass::AiSplit, now());
            assert!(outcome.success);
            assert!(!outcome.limit_reached);
        }
        assert_eq!(r.daily_ai_splits, 5);
        assert!(limiter.can_perform(&r, QuotaClass::AiSplit));
    }

    #[test]
    fn outcome_json_uses_counter_field() {
        let outcome = QuotaOutcome {
            class: QuotaClass::AiSplit,
            success: true,
            counter: 1,
            limit_reached: true,
        };
        let json = outcome.to_json();
        assert_eq!(json["dailyAISplits"], 1);
        assert_eq!(json["limitReached"], true);
        assert!(json.get("counter").is_none());
    }

    #[test]
    fn unlimited_premium_survives_toml_round_trip() {
        let config = QuotaConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let back: QuotaConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn quota_config_parses_from_toml() {
        let config: QuotaConfig = toml::from_str(
            r#"
            premium_owners = ["a"]
            [free]
            ai_splits = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.free.ai_splits, Some(2));
        assert_eq!(config.free.mood_check_ins, None);
        assert_eq!(config.premium, QuotaLimits::unlimited());
        assert_eq!(config.premium_owners, vec!["a".to_owned()]);
    }
}
