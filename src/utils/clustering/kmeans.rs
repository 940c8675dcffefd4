use crate::{Errors, EPS};
use anyhow::Result;
use itertools::Itertools;
use nalgebra::{Point2, Vector2};
use rand::Rng;

/// Iteration cap matching the widget's historical estimator configuration.
pub const DEFAULT_KMEANS_MAX_ITER: usize = 10_000;

/// Lloyd's k-means over 2D points with k-means++ seeding.
///
/// The estimator itself is stateless between fits; the orchestration layer
/// recreates it whenever the requested cluster count changes.
///
#[derive(Debug, Clone)]
pub struct KMeans {
    n_clusters: usize,
    max_iter: usize,
}

impl KMeans {
    pub fn new(n_clusters: usize) -> Self {
        assert!(n_clusters > 0, "Cluster count must be a positive number");
        Self {
            n_clusters,
            max_iter: DEFAULT_KMEANS_MAX_ITER,
        }
    }

    pub fn max_iter(mut self, n: usize) -> Self {
        self.max_iter = n;
        self
    }

    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    /// Cluster centers for `points`, one per requested cluster.
    ///
    pub fn fit(&self, points: &[Point2<f32>]) -> Result<Vec<Point2<f32>>> {
        Ok(self
            .fit_with_sizes(points)?
            .into_iter()
            .map(|(c, _)| c)
            .collect())
    }

    /// Cluster centers together with their population sizes.
    ///
    pub fn fit_with_sizes(&self, points: &[Point2<f32>]) -> Result<Vec<(Point2<f32>, usize)>> {
        if points.is_empty() {
            return Err(Errors::EmptyMask.into());
        }
        if points.len() < self.n_clusters {
            return Err(Errors::InsufficientSamples(self.n_clusters, points.len()).into());
        }

        let k = self.n_clusters;
        let mut centers = self.plus_plus_init(points);
        let mut assignment = vec![usize::MAX; points.len()];

        for _ in 0..self.max_iter {
            let mut changed = false;
            for (i, p) in points.iter().enumerate() {
                let best = nearest(&centers, p);
                if assignment[i] != best {
                    assignment[i] = best;
                    changed = true;
                }
            }
            if !changed {
                break;
            }

            let mut sums = vec![Vector2::<f32>::zeros(); k];
            let mut counts = vec![0usize; k];
            for (i, p) in points.iter().enumerate() {
                sums[assignment[i]] += p.coords;
                counts[assignment[i]] += 1;
            }
            for j in 0..k {
                // an emptied cluster keeps its previous center
                if counts[j] > 0 {
                    centers[j] = Point2::from(sums[j] / counts[j] as f32);
                }
            }
        }

        let mut counts = vec![0usize; k];
        for &a in &assignment {
            counts[a] += 1;
        }
        Ok(centers.into_iter().zip(counts).collect())
    }

    /// K-means++: each next center is sampled proportionally to the squared
    /// distance from the already chosen ones.
    fn plus_plus_init(&self, points: &[Point2<f32>]) -> Vec<Point2<f32>> {
        let mut rng = rand::thread_rng();
        let mut centers = vec![points[rng.gen_range(0..points.len())]];

        while centers.len() < self.n_clusters {
            let dists = points
                .iter()
                .map(|p| {
                    centers
                        .iter()
                        .map(|c| (c - p).norm_squared())
                        .fold(f32::INFINITY, f32::min)
                })
                .collect::<Vec<_>>();
            let total: f32 = dists.iter().sum();
            if total <= EPS {
                // all remaining points coincide with chosen centers
                centers.push(points[rng.gen_range(0..points.len())]);
                continue;
            }
            let mut target = rng.gen::<f32>() * total;
            let mut chosen = points.len() - 1;
            for (i, d) in dists.iter().enumerate() {
                if target <= *d {
                    chosen = i;
                    break;
                }
                target -= d;
            }
            centers.push(points[chosen]);
        }
        centers
    }
}

fn nearest(centers: &[Point2<f32>], p: &Point2<f32>) -> usize {
    centers
        .iter()
        .map(|c| (c - p).norm_squared())
        .position_min_by(f32::total_cmp)
        .unwrap()
}
