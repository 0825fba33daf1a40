use linfa::prelude::*;
use linfa_clustering::{KMeans, KMeansInit};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{ClusterConfig, InitStrategy};
use crate::error::{AnalyticsError, Result};
use crate::features::{FeatureVector, DIMENSIONS};

/// Output of one k-means fit. Cluster ids are `0..centroids.len()`, which
/// is always the requested `k`; ids beyond the fitted cluster count never
/// receive members.
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    pub assignments: Vec<usize>,
    pub centroids: Vec<FeatureVector>,
    pub inertia: f64,
}

impl Clustering {
    pub fn k(&self) -> usize {
        self.centroids.len()
    }

    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.k()];
        for &cluster in &self.assignments {
            sizes[cluster] += 1;
        }
        sizes
    }

    pub fn members(&self, cluster: usize) -> impl Iterator<Item = usize> + '_ {
        self.assignments
            .iter()
            .enumerate()
            .filter(move |(_, &assigned)| assigned == cluster)
            .map(|(index, _)| index)
    }
}

fn to_matrix(points: &[FeatureVector]) -> Array2<f64> {
    let mut matrix = Array2::zeros((points.len(), DIMENSIONS));
    for (mut row, point) in matrix.rows_mut().into_iter().zip(points) {
        for (cell, value) in row.iter_mut().zip(point.0.iter()) {
            *cell = *value;
        }
    }
    matrix
}

fn distinct_points(points: &[FeatureVector]) -> usize {
    let mut distinct: Vec<&FeatureVector> = Vec::new();
    for point in points {
        if !distinct.contains(&point) {
            distinct.push(point);
        }
    }
    distinct.len()
}

/// Sum of squared distances between each point and its assigned centroid.
fn compute_inertia(points: &[FeatureVector], centroids: &[FeatureVector], assignments: &[usize]) -> f64 {
    points
        .iter()
        .zip(assignments)
        .map(|(point, &cluster)| point.squared_distance(&centroids[cluster]))
        .sum()
}

/// Fits k-means with linfa. `k` is clamped to the number of distinct points
/// before fitting; the centroid list is then padded back to `k` by repeating
/// fitted centroids, so those extra clusters stay empty.
pub fn kmeans(points: &[FeatureVector], config: &ClusterConfig) -> Result<Clustering> {
    if config.k == 0 {
        return Err(AnalyticsError::InvalidClusterCount(config.k));
    }
    if points.is_empty() {
        return Err(AnalyticsError::EmptyDataset);
    }

    let k_fit = config.k.min(distinct_points(points));
    if k_fit < config.k {
        tracing::warn!(k = config.k, k_fit, "fewer distinct points than clusters");
    }

    let rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let init = match config.init {
        InitStrategy::KmeansPlusPlus => KMeansInit::KMeansPlusPlus,
        InitStrategy::Random => KMeansInit::Random,
    };

    let matrix = to_matrix(points);
    let dataset = DatasetBase::from(matrix.clone());
    let model = KMeans::params_with_rng(k_fit, rng)
        .init_method(init)
        .max_n_iterations(config.max_iterations.max(1) as u64)
        .tolerance(config.tolerance)
        .fit(&dataset)?;

    let labels: Array1<usize> = model.predict(&matrix);
    let assignments: Vec<usize> = labels.iter().copied().collect();
    let mut centroids: Vec<FeatureVector> = model
        .centroids()
        .rows()
        .into_iter()
        .map(|row| {
            let mut vector = FeatureVector::default();
            for (slot, value) in vector.0.iter_mut().zip(row.iter()) {
                *slot = *value;
            }
            vector
        })
        .collect();

    let mut next = 0;
    while centroids.len() < config.k {
        centroids.push(centroids[next % k_fit]);
        next += 1;
    }

    let inertia = compute_inertia(points, &centroids, &assignments);
    tracing::debug!(k_fit, inertia, "k-means fit complete");

    Ok(Clustering {
        assignments,
        centroids,
        inertia,
    })
}
