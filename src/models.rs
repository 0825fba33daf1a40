use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::features::FeatureVector;

/// One row as it arrives from the source, before any coercion.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub transactions: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub balance: Option<String>,
    #[serde(default)]
    pub stepcount: Option<String>,
    #[serde(default)]
    pub pushup: Option<String>,
    #[serde(default)]
    pub squat: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub username: String,
    pub team: String,
    pub email: String,
    pub transactions: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub stepcount: f64,
    pub pushup: f64,
    pub squat: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ZScores {
    pub stepcount_z: f64,
    pub pushup_z: f64,
    pub squat_z: f64,
    pub balance_z: f64,
}

impl ZScores {
    pub fn max_abs(&self) -> f64 {
        [self.stepcount_z, self.pushup_z, self.squat_z, self.balance_z]
            .iter()
            .fold(0.0_f64, |acc, z| acc.max(z.abs()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeType {
    Steps,
    Pushup,
    Squat,
}

impl ChallengeType {
    pub fn label(self) -> &'static str {
        match self {
            ChallengeType::Steps => "steps",
            ChallengeType::Pushup => "pushup",
            ChallengeType::Squat => "squat",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Challenge {
    pub challenge_type: ChallengeType,
    pub deadline: NaiveDate,
    #[serde(rename = "challenge_ratio")]
    pub worst_ratio: f64,
}

/// A record plus everything the metric passes derived for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRecord {
    #[serde(flatten)]
    pub record: Record,
    pub cluster: usize,
    pub engagement_index: f64,
    pub activity_consistency: f64,
    #[serde(flatten)]
    pub z_scores: ZScores,
    pub is_outlier: bool,
    pub recommended_pushup: i64,
    pub similar_user: Option<String>,
    pub similar_user_distance: Option<f64>,
    #[serde(flatten)]
    pub challenge: Option<Challenge>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterSummary {
    pub id: usize,
    pub size: usize,
    pub centroid: FeatureVector,
    pub avg_engagement_index: f64,
    pub avg_activity_consistency: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamStat {
    pub team: String,
    pub members: usize,
    pub avg_stepcount: f64,
    pub avg_pushup: f64,
    pub avg_squat: f64,
    pub avg_balance: f64,
    pub avg_engagement_index: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MetricStats {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub stddev: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Statistics {
    pub stepcount: MetricStats,
    pub pushup: MetricStats,
    pub squat: MetricStats,
    pub balance: MetricStats,
    pub engagement_index: MetricStats,
    pub activity_consistency: MetricStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedUser {
    pub username: String,
    pub team: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Rankings {
    pub top_engagement: Vec<RankedUser>,
    pub top_consistency: Vec<RankedUser>,
    pub outliers: Vec<RankedUser>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_records: usize,
    pub team_count: usize,
    pub outlier_count: usize,
    pub correlation_balance_stepcount: f64,
    pub cluster_count: usize,
    pub inertia: f64,
    pub clusters: Vec<ClusterSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsResult {
    pub run_id: Uuid,
    pub generated_on: NaiveDate,
    pub summary: Summary,
    pub records: Vec<EnrichedRecord>,
    pub teams: Vec<TeamStat>,
    pub rankings: Rankings,
    pub statistics: Statistics,
}
