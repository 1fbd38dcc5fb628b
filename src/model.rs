//! Seeded K-Means over a single numeric column

use linfa::prelude::*;
use linfa_clustering::{KMeans, KMeansInit};
use linfa_nn::distance::L2Dist;
use ndarray::{Array1, Array2};
use polars::prelude::{DataFrame, DataType};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::error::{Error, Result};

/// Smallest cluster count offered to callers
pub const MIN_CLUSTERS: usize = 2;
/// Largest cluster count offered to callers
pub const MAX_CLUSTERS: usize = 6;
pub const DEFAULT_CLUSTERS: usize = 3;

const SEED: u64 = 42;
const N_RUNS: usize = 10;
const MAX_ITERS: u64 = 300;
const TOLERANCE: f64 = 1e-4;

/// Cluster label of one row that took part in clustering
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClusterAssignment {
    /// Row index in the table the feature came from
    pub row: usize,
    pub value: f64,
    pub label: usize,
}

/// Outcome of one clustering run
#[derive(Debug, Clone, Serialize)]
pub struct Clustering {
    pub n_clusters: usize,
    pub assignments: Vec<ClusterAssignment>,
    /// Centroid of each label, indexed by label
    pub centroids: Vec<f64>,
    /// Within-cluster sum of squares
    pub inertia: f64,
}

impl Clustering {
    /// Number of rows carrying each label
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.n_clusters];
        for assignment in &self.assignments {
            if assignment.label < self.n_clusters {
                sizes[assignment.label] += 1;
            }
        }
        sizes
    }

    /// Label of the centroid nearest to `value`
    pub fn predict(&self, value: f64) -> usize {
        let mut min_distance = f64::INFINITY;
        let mut closest_cluster = 0;

        for (cluster_idx, centroid) in self.centroids.iter().enumerate() {
            let distance = (value - centroid).abs();
            if distance < min_distance {
                min_distance = distance;
                closest_cluster = cluster_idx;
            }
        }

        closest_cluster
    }
}

/// Cluster the rows of `table` on `feature_column` into `k` groups
///
/// Rows with a missing feature are dropped first. Runs k-means++ with
/// several restarts from a fixed seed, so the same input and `k` always give
/// the same labels.
pub fn cluster(table: &DataFrame, feature_column: &str, k: usize) -> Result<Clustering> {
    let series = table
        .column(feature_column)
        .map_err(|_| Error::column_not_found(feature_column))?;

    if !series.dtype().is_numeric() {
        return Err(Error::InvalidParameter(format!(
            "column `{}` is not numeric ({})",
            feature_column,
            series.dtype()
        )));
    }

    let values = series.cast(&DataType::Float64)?;
    let (rows, features): (Vec<usize>, Vec<f64>) = values
        .f64()?
        .into_iter()
        .enumerate()
        .filter_map(|(row, value)| value.map(|v| (row, v)))
        .unzip();

    fit_kmeans(&rows, &features, k)
}

/// Fit K-Means on already filtered feature values
fn fit_kmeans(rows: &[usize], features: &[f64], k: usize) -> Result<Clustering> {
    if !(MIN_CLUSTERS..=MAX_CLUSTERS).contains(&k) {
        return Err(Error::InvalidParameter(format!(
            "number of clusters must be between {} and {}, got {}",
            MIN_CLUSTERS, MAX_CLUSTERS, k
        )));
    }

    if features.len() < k {
        return Err(Error::InvalidParameter(format!(
            "number of data points ({}) must be at least equal to number of clusters ({})",
            features.len(),
            k
        )));
    }

    let n_samples = features.len();
    let records = Array2::from_shape_vec((n_samples, 1), features.to_vec())
        .map_err(|err| Error::Clustering(err.to_string()))?;
    let dataset = DatasetBase::from(records);

    let rng = StdRng::seed_from_u64(SEED);
    let model = KMeans::params_with(k, rng, L2Dist)
        .n_runs(N_RUNS)
        .init_method(KMeansInit::KMeansPlusPlus)
        .max_n_iterations(MAX_ITERS)
        .tolerance(TOLERANCE)
        .fit(&dataset)
        .map_err(|err| Error::Clustering(err.to_string()))?;

    let labels: Array1<usize> = model.predict(dataset.records());
    let centroids: Vec<f64> = model.centroids().column(0).to_vec();
    let inertia = compute_inertia(features, &labels, &centroids);

    tracing::debug!(k, rows = n_samples, inertia, "k-means fitted");

    let assignments = rows
        .iter()
        .zip(features)
        .zip(labels.iter())
        .map(|((&row, &value), &label)| ClusterAssignment { row, value, label })
        .collect();

    Ok(Clustering {
        n_clusters: k,
        assignments,
        centroids,
        inertia,
    })
}

/// Compute within-cluster sum of squares (inertia)
fn compute_inertia(features: &[f64], labels: &Array1<usize>, centroids: &[f64]) -> f64 {
    features
        .iter()
        .zip(labels.iter())
        .filter(|(_, &label)| label < centroids.len())
        .map(|(value, &label)| (value - centroids[label]).powi(2))
        .sum()
}
