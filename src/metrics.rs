use chrono::{Duration, NaiveDate};

use crate::features::{FeatureVector, Metric};
use crate::models::{Challenge, ChallengeType, Record, ZScores};
use crate::stats;

pub const OUTLIER_Z_THRESHOLD: f64 = 3.0;
pub const PUSHUP_TARGET_FACTOR: f64 = 1.1;
pub const CHALLENGE_BASE_DAYS: i64 = 30;

pub fn engagement_index(record: &Record) -> f64 {
    0.4 * record.stepcount + 0.2 * record.pushup + 0.2 * record.squat + 0.2 * record.balance
}

/// Cross-metric balance of one record: `1 / (1 + σ)` over its step, pushup
/// and squat counts (population σ). Reported as `activity_consistency`, but
/// it measures how evenly a single observation is spread across the three
/// activities, not stability over time. 1.0 only when all three are equal.
pub fn activity_consistency(record: &Record) -> f64 {
    let values = [record.stepcount, record.pushup, record.squat];
    1.0 / (1.0 + stats::population_stddev(&values))
}

/// Population mean and standard deviation of each feature dimension.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopulationMoments {
    means: [f64; 4],
    stddevs: [f64; 4],
}

impl PopulationMoments {
    pub fn from_records(records: &[Record]) -> Self {
        let mut means = [0.0; 4];
        let mut stddevs = [0.0; 4];
        for metric in Metric::ALL {
            let values: Vec<f64> = records.iter().map(|record| metric.of(record)).collect();
            means[metric.index()] = stats::mean(&values);
            stddevs[metric.index()] = stats::population_stddev(&values);
        }
        Self { means, stddevs }
    }

    /// 0 when the metric has no spread.
    pub fn z(&self, metric: Metric, value: f64) -> f64 {
        let stddev = self.stddevs[metric.index()];
        if stddev == 0.0 {
            return 0.0;
        }
        (value - self.means[metric.index()]) / stddev
    }

    pub fn z_scores(&self, record: &Record) -> ZScores {
        ZScores {
            stepcount_z: self.z(Metric::Stepcount, record.stepcount),
            pushup_z: self.z(Metric::Pushup, record.pushup),
            squat_z: self.z(Metric::Squat, record.squat),
            balance_z: self.z(Metric::Balance, record.balance),
        }
    }
}

pub fn z_scores(records: &[Record]) -> Vec<ZScores> {
    let moments = PopulationMoments::from_records(records);
    records.iter().map(|record| moments.z_scores(record)).collect()
}

pub fn is_outlier(z_scores: &ZScores) -> bool {
    z_scores.max_abs() > OUTLIER_Z_THRESHOLD
}

pub fn recommended_pushup(centroid: &FeatureVector) -> i64 {
    (centroid.get(Metric::Pushup) * PUSHUP_TARGET_FACTOR).round() as i64
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub distance: f64,
}

/// Exact nearest neighbour of every vector, self excluded. Candidates are
/// scanned in input order and only a strictly closer one replaces the
/// current best, so the earliest index wins ties.
pub fn nearest_neighbors(features: &[FeatureVector]) -> Vec<Option<Neighbor>> {
    features
        .iter()
        .enumerate()
        .map(|(index, vector)| {
            let mut best: Option<Neighbor> = None;
            for (other, candidate) in features.iter().enumerate() {
                if other == index {
                    continue;
                }
                let distance = vector.distance(candidate);
                if best.map_or(true, |current| distance < current.distance) {
                    best = Some(Neighbor {
                        index: other,
                        distance,
                    });
                }
            }
            best
        })
        .collect()
}

const CHALLENGE_CANDIDATES: [(ChallengeType, Metric); 3] = [
    (ChallengeType::Steps, Metric::Stepcount),
    (ChallengeType::Pushup, Metric::Pushup),
    (ChallengeType::Squat, Metric::Squat),
];

/// Own value over cluster centroid value; 0 when the centroid is not positive.
pub fn centroid_ratio(value: f64, centroid_value: f64) -> f64 {
    if centroid_value <= 0.0 {
        0.0
    } else {
        value / centroid_value
    }
}

/// Picks the activity furthest below the cluster centroid. Ties resolve in
/// the order steps, pushup, squat.
pub fn assign_challenge(record: &Record, centroid: &FeatureVector, today: NaiveDate) -> Challenge {
    let (mut challenge_type, first_metric) = CHALLENGE_CANDIDATES[0];
    let mut worst_ratio = centroid_ratio(first_metric.of(record), centroid.get(first_metric));

    for (candidate, metric) in CHALLENGE_CANDIDATES.iter().skip(1) {
        let ratio = centroid_ratio(metric.of(record), centroid.get(*metric));
        if ratio < worst_ratio {
            worst_ratio = ratio;
            challenge_type = *candidate;
        }
    }

    Challenge {
        challenge_type,
        deadline: today + Duration::days(CHALLENGE_BASE_DAYS + escalation_days(worst_ratio)),
        worst_ratio,
    }
}

pub fn escalation_days(worst_ratio: f64) -> i64 {
    if worst_ratio < 0.5 {
        14
    } else if worst_ratio < 0.8 {
        7
    } else {
        0
    }
}
