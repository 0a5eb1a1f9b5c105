//! Score Engine.
//!
//! Maps a verified evidence record plus rolling population maxima to a score
//! in [0, 100]. All weights live in [`ScoringPolicy`]:
//!
//! | group       | metric        | default |
//! |-------------|---------------|---------|
//! | top level   | profile power | 0.3     |
//! |             | content       | 0.4     |
//! |             | originality   | 0.2     |
//! |             | positivity    | 0.1     |
//! | profile     | followers     | 0.4     |
//! |             | following     | 0.1     |
//! |             | posts         | 0.2     |
//! |             | likes         | 0.2     |
//! |             | listed        | 0.1     |
//! | engagement  | amplification | 0.2     |
//! |             | replies       | 0.2     |
//! |             | likes         | 0.2     |
//! |             | quotes        | 0.2     |
//! |             | bookmarks     | 0.1     |
//! |             | impressions   | 0.1     |
//!
//! Each group must sum to 1.0.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{EngagementMetrics, EvidenceRecord, PopulationMaxima, ProfileMetrics, Result, ValidatorError};

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Upper bound on either freshness age, in days.
const MAX_FRESHNESS_DAYS: u64 = 36_500;

/// Weight of each component of the final score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopLevelWeights {
    pub profile: f64,
    pub content: f64,
    pub originality: f64,
    pub positivity: f64,
}

impl Default for TopLevelWeights {
    fn default() -> Self {
        Self {
            profile: 0.3,
            content: 0.4,
            originality: 0.2,
            positivity: 0.1,
        }
    }
}

/// Per-metric weights of the profile power score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileWeights {
    pub followers: f64,
    pub following: f64,
    pub posts: f64,
    pub likes: f64,
    pub listed: f64,
}

impl Default for ProfileWeights {
    fn default() -> Self {
        Self {
            followers: 0.4,
            following: 0.1,
            posts: 0.2,
            likes: 0.2,
            listed: 0.1,
        }
    }
}

/// Per-metric weights of the content strength score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngagementWeights {
    pub amplification: f64,
    pub replies: f64,
    pub likes: f64,
    pub quotes: f64,
    pub bookmarks: f64,
    pub impressions: f64,
}

impl Default for EngagementWeights {
    fn default() -> Self {
        Self {
            amplification: 0.2,
            replies: 0.2,
            likes: 0.2,
            quotes: 0.2,
            bookmarks: 0.1,
            impressions: 0.1,
        }
    }
}

/// Linear decay on content age.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreshnessDecay {
    /// Full credit up to this age
    pub full_credit_hours: u64,
    /// No credit from this age
    pub zero_credit_days: u64,
}

impl Default for FreshnessDecay {
    fn default() -> Self {
        Self {
            full_credit_hours: 36,
            zero_credit_days: 7,
        }
    }
}

impl FreshnessDecay {
    /// Both ages bounded, and zero credit strictly after full credit.
    pub fn validate(&self) -> Result<()> {
        if self.full_credit_hours > MAX_FRESHNESS_DAYS * 24 {
            return Err(ValidatorError::Config(format!(
                "scoring.freshness.full_credit_hours must be at most {}",
                MAX_FRESHNESS_DAYS * 24
            )));
        }
        if self.zero_credit_days > MAX_FRESHNESS_DAYS {
            return Err(ValidatorError::Config(format!(
                "scoring.freshness.zero_credit_days must be at most {}",
                MAX_FRESHNESS_DAYS
            )));
        }
        if self.zero_credit_days * 24 <= self.full_credit_hours {
            return Err(ValidatorError::Config(format!(
                "scoring.freshness.zero_credit_days ({}d) must come after full_credit_hours ({}h)",
                self.zero_credit_days, self.full_credit_hours
            )));
        }
        Ok(())
    }

    /// Multiplier in [0, 1] for content created at `created_at`.
    pub fn multiplier(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        let age = (now - created_at).num_seconds().max(0) as f64;
        let full = self.full_credit_hours.saturating_mul(3600) as f64;
        let zero = self.zero_credit_days.saturating_mul(86_400) as f64;

        if age <= full {
            1.0
        } else if age >= zero || zero <= full {
            0.0
        } else {
            1.0 - (age - full) / (zero - full)
        }
    }
}

/// Tunable scoring policy table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    pub top_level: TopLevelWeights,
    pub profile: ProfileWeights,
    pub engagement: EngagementWeights,
    /// Rolling window for maxima and similarity, in days
    pub window_days: u32,
    /// Optional age decay, off by default
    pub freshness: Option<FreshnessDecay>,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            top_level: TopLevelWeights::default(),
            profile: ProfileWeights::default(),
            engagement: EngagementWeights::default(),
            window_days: 30,
            freshness: None,
        }
    }
}

impl ScoringPolicy {
    /// Enable age decay.
    pub fn with_freshness(mut self, decay: FreshnessDecay) -> Self {
        self.freshness = Some(decay);
        self
    }

    /// Every weight group must be non-negative and sum to 1.0, and the
    /// freshness decay, when set, must be well ordered.
    pub fn validate(&self) -> Result<()> {
        let t = &self.top_level;
        let p = &self.profile;
        let e = &self.engagement;

        check_group("top_level", &[t.profile, t.content, t.originality, t.positivity])?;
        check_group("profile", &[p.followers, p.following, p.posts, p.likes, p.listed])?;
        check_group(
            "engagement",
            &[e.amplification, e.replies, e.likes, e.quotes, e.bookmarks, e.impressions],
        )?;

        if self.window_days == 0 {
            return Err(ValidatorError::Config("scoring.window_days must be at least 1".into()));
        }
        if let Some(decay) = &self.freshness {
            decay.validate()?;
        }
        Ok(())
    }
}

fn check_group(name: &str, weights: &[f64]) -> Result<()> {
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(ValidatorError::Config(format!(
            "scoring.{} weights must be non-negative",
            name
        )));
    }

    let sum: f64 = weights.iter().sum();
    if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(ValidatorError::Config(format!(
            "scoring.{} weights sum to {}, expected 1.0",
            name, sum
        )));
    }
    Ok(())
}

/// `value / max` clamped to [0, 1]; a zero max contributes nothing.
fn normalize(value: u64, max: u64) -> f64 {
    if max == 0 {
        return 0.0;
    }
    (value as f64 / max as f64).min(1.0)
}

/// Pure scoring function over a policy.
#[derive(Debug, Clone, Default)]
pub struct ScoreEngine {
    policy: ScoringPolicy,
}

impl ScoreEngine {
    pub fn new(policy: ScoringPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    /// Profile power in [0, 1].
    pub fn profile_power(&self, metrics: &ProfileMetrics, maxima: &ProfileMetrics) -> f64 {
        let w = &self.policy.profile;

        normalize(metrics.followers, maxima.followers) * w.followers
            + normalize(metrics.following, maxima.following) * w.following
            + normalize(metrics.posts, maxima.posts) * w.posts
            + normalize(metrics.likes, maxima.likes) * w.likes
            + normalize(metrics.listed, maxima.listed) * w.listed
    }

    /// Content strength in [0, 1].
    pub fn content_strength(&self, metrics: &EngagementMetrics, maxima: &EngagementMetrics) -> f64 {
        let w = &self.policy.engagement;

        normalize(metrics.amplification, maxima.amplification) * w.amplification
            + normalize(metrics.replies, maxima.replies) * w.replies
            + normalize(metrics.likes, maxima.likes) * w.likes
            + normalize(metrics.quotes, maxima.quotes) * w.quotes
            + normalize(metrics.bookmarks, maxima.bookmarks) * w.bookmarks
            + normalize(metrics.impressions, maxima.impressions) * w.impressions
    }

    /// Score in [0, 100] as of now.
    pub fn score(&self, evidence: &EvidenceRecord, maxima: &PopulationMaxima) -> f64 {
        self.score_at(evidence, maxima, Utc::now())
    }

    /// Score in [0, 100] as of `now`.
    pub fn score_at(&self, evidence: &EvidenceRecord, maxima: &PopulationMaxima, now: DateTime<Utc>) -> f64 {
        let top = &self.policy.top_level;

        let profile = self.profile_power(&evidence.profile, &maxima.profile);
        let content = self.content_strength(&evidence.engagement, &maxima.engagement);
        let originality = 1.0 - evidence.similarity.clamp(0.0, 1.0);
        let positivity = evidence.positivity.clamp(0.0, 100.0) / 100.0;

        let mut total = profile * top.profile
            + content * top.content
            + originality * top.originality
            + positivity * top.positivity;

        if let Some(decay) = &self.policy.freshness {
            total *= decay.multiplier(evidence.created_at, now);
        }

        let score = total * 100.0;
        if score.is_finite() {
            score.clamp(0.0, 100.0)
        } else {
            0.0
        }
    }
}
