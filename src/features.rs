use serde::Serialize;

use crate::models::Record;

pub const DIMENSIONS: usize = 4;

/// Feature dimensions in vector order. Clustering and challenge assignment
/// index centroids positionally, so the discriminants are load-bearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Stepcount = 0,
    Pushup = 1,
    Squat = 2,
    Balance = 3,
}

impl Metric {
    pub const ALL: [Metric; DIMENSIONS] = [
        Metric::Stepcount,
        Metric::Pushup,
        Metric::Squat,
        Metric::Balance,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn of(self, record: &Record) -> f64 {
        match self {
            Metric::Stepcount => record.stepcount,
            Metric::Pushup => record.pushup,
            Metric::Squat => record.squat,
            Metric::Balance => record.balance,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct FeatureVector(pub [f64; DIMENSIONS]);

impl FeatureVector {
    pub fn from_record(record: &Record) -> Self {
        FeatureVector([
            record.stepcount,
            record.pushup,
            record.squat,
            record.balance,
        ])
    }

    pub fn get(&self, metric: Metric) -> f64 {
        self.0[metric.index()]
    }

    pub fn squared_distance(&self, other: &FeatureVector) -> f64 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }

    pub fn distance(&self, other: &FeatureVector) -> f64 {
        self.squared_distance(other).sqrt()
    }
}

pub fn build_features(records: &[Record]) -> Vec<FeatureVector> {
    records.iter().map(FeatureVector::from_record).collect()
}
