use crate::utils::clustering::kmeans::KMeans;
use crate::Errors;
use anyhow::Result;
use itertools::Itertools;
use nalgebra::{Matrix2, Point2, Vector2};
use std::cmp::Reverse;
use std::f32::consts::PI;

/// EM iteration cap matching the widget's historical estimator configuration.
pub const DEFAULT_GMM_MAX_ITER: usize = 2_000;

const COVARIANCE_REGULARIZATION: f32 = 1e-3;
const CONVERGENCE_TOL: f32 = 1e-4;

#[derive(Debug, Clone)]
struct Component {
    weight: f32,
    mean: Vector2<f32>,
    covariance: Matrix2<f32>,
}

/// Full-covariance 2D Gaussian mixture fitted with EM.
///
/// The first fit initializes component means from a k-means pass; later fits
/// warm-start from the current means so the component order, and therefore
/// the object index correspondence, is preserved from frame to frame.
///
#[derive(Debug, Clone)]
pub struct GaussianMixture {
    n_components: usize,
    max_iter: usize,
    components: Vec<Component>,
}

impl GaussianMixture {
    pub fn new(n_components: usize) -> Self {
        assert!(n_components > 0, "Component count must be a positive number");
        Self {
            n_components,
            max_iter: DEFAULT_GMM_MAX_ITER,
            components: Vec::new(),
        }
    }

    pub fn max_iter(mut self, n: usize) -> Self {
        self.max_iter = n;
        self
    }

    pub fn n_components(&self) -> usize {
        self.n_components
    }

    /// Current component means, one position per tracked object.
    ///
    pub fn means(&self) -> Vec<Point2<f32>> {
        self.components
            .iter()
            .map(|c| Point2::from(c.mean))
            .collect()
    }

    /// Overwrites component means with externally supplied seed positions.
    /// Extra positions are ignored, missing ones leave the component as is.
    ///
    pub fn set_means(&mut self, means: &[Point2<f32>]) {
        for (c, m) in self.components.iter_mut().zip(means) {
            c.mean = m.coords;
        }
    }

    /// Refits the mixture against `points`.
    ///
    /// `n_init_clusters` is only consulted on a cold start: it is the k of
    /// the k-means initialization pass, of which the most populated clusters
    /// become the initial component means.
    ///
    pub fn fit(&mut self, points: &[Point2<f32>], n_init_clusters: usize) -> Result<()> {
        if points.is_empty() {
            return Err(Errors::EmptyMask.into());
        }
        if self.components.is_empty() {
            self.init_components(points, n_init_clusters)?;
        }

        let k = self.components.len();
        let n = points.len() as f32;
        let mut resp = vec![0.0f32; points.len() * k];
        let mut prev_log_likelihood = f32::NEG_INFINITY;

        for _ in 0..self.max_iter {
            // E-step
            let mut log_likelihood = 0.0f32;
            for (i, p) in points.iter().enumerate() {
                let mut total = 0.0f32;
                for (j, c) in self.components.iter().enumerate() {
                    let d = c.weight * density(c, p);
                    resp[i * k + j] = d;
                    total += d;
                }
                let total = total.max(f32::MIN_POSITIVE);
                for j in 0..k {
                    resp[i * k + j] /= total;
                }
                log_likelihood += total.ln();
            }

            // M-step
            for (j, c) in self.components.iter_mut().enumerate() {
                let nj: f32 = points
                    .iter()
                    .enumerate()
                    .map(|(i, _)| resp[i * k + j])
                    .sum::<f32>()
                    .max(f32::MIN_POSITIVE);

                let mut mean = Vector2::zeros();
                for (i, p) in points.iter().enumerate() {
                    mean += resp[i * k + j] * p.coords;
                }
                mean /= nj;

                let mut covariance = Matrix2::zeros();
                for (i, p) in points.iter().enumerate() {
                    let d = p.coords - mean;
                    covariance += resp[i * k + j] * (d * d.transpose());
                }
                covariance /= nj;
                covariance += Matrix2::identity() * COVARIANCE_REGULARIZATION;

                c.weight = nj / n;
                c.mean = mean;
                c.covariance = covariance;
            }

            let scale = log_likelihood.abs().max(1.0);
            if (log_likelihood - prev_log_likelihood).abs() < CONVERGENCE_TOL * scale {
                break;
            }
            prev_log_likelihood = log_likelihood;
        }
        Ok(())
    }

    fn init_components(&mut self, points: &[Point2<f32>], n_init_clusters: usize) -> Result<()> {
        let k = n_init_clusters.max(self.n_components);
        let clusters = KMeans::new(k).fit_with_sizes(points)?;
        let centers = clusters
            .into_iter()
            .sorted_by_key(|(_, size)| Reverse(*size))
            .take(self.n_components)
            .map(|(c, _)| c)
            .collect::<Vec<_>>();

        let centroid: Vector2<f32> =
            points.iter().map(|p| p.coords).sum::<Vector2<f32>>() / points.len() as f32;
        let variance = (points
            .iter()
            .map(|p| (p.coords - centroid).norm_squared())
            .sum::<f32>()
            / (2.0 * points.len() as f32))
            .max(1.0);

        let weight = 1.0 / self.n_components as f32;
        self.components = centers
            .into_iter()
            .map(|c| Component {
                weight,
                mean: c.coords,
                covariance: Matrix2::identity() * variance,
            })
            .collect();
        Ok(())
    }
}

fn density(c: &Component, p: &Point2<f32>) -> f32 {
    let det = c.covariance.determinant();
    if det <= 0.0 {
        return 0.0;
    }
    let inv = match c.covariance.try_inverse() {
        Some(inv) => inv,
        None => return 0.0,
    };
    let d = p.coords - c.mean;
    let mahalanobis = (d.transpose() * inv * d)[(0, 0)];
    (-0.5 * mahalanobis).exp() / (2.0 * PI * det.sqrt())
}

#[cfg(test)]
mod tests {
    use super::GaussianMixture;
    use crate::Errors;
    use nalgebra::Point2;

    fn grid(cx: f32, cy: f32, half: i32) -> Vec<Point2<f32>> {
        let mut pts = Vec::new();
        for dx in -half..=half {
            for dy in -half..=half {
                pts.push(Point2::new(cx + dx as f32, cy + dy as f32));
            }
        }
        pts
    }

    #[test]
    fn fit_two_groups() {
        let mut points = grid(20.0, 20.0, 2);
        points.extend(grid(60.0, 40.0, 2));

        let mut gmm = GaussianMixture::new(2);
        gmm.fit(&points, 2).unwrap();

        let means = gmm.means();
        assert_eq!(means.len(), 2);
        for expected in [Point2::new(20.0, 20.0), Point2::new(60.0, 40.0)] {
            assert!(
                means.iter().any(|m| (m - expected).norm() < 1.0),
                "no mean near {:?}, got {:?}",
                expected,
                means
            );
        }
    }

    #[test]
    fn warm_refit_keeps_component_order() {
        let mut points = grid(20.0, 20.0, 2);
        points.extend(grid(60.0, 40.0, 2));

        let mut gmm = GaussianMixture::new(2);
        gmm.fit(&points, 2).unwrap();
        let before = gmm.means();

        // both groups move a little, the refit must follow without swapping
        let mut moved = grid(22.0, 21.0, 2);
        moved.extend(grid(62.0, 41.0, 2));
        gmm.fit(&moved, 2).unwrap();
        let after = gmm.means();

        for (b, a) in before.iter().zip(&after) {
            assert!((b - a).norm() < 4.0, "component jumped: {:?} -> {:?}", b, a);
        }
    }

    #[test]
    fn set_means_overwrites() {
        let points = grid(30.0, 30.0, 3);
        let mut gmm = GaussianMixture::new(1);
        gmm.fit(&points, 1).unwrap();

        gmm.set_means(&[Point2::new(5.0, 7.0)]);
        assert_eq!(gmm.means(), vec![Point2::new(5.0, 7.0)]);
    }

    #[test]
    fn empty_input() {
        let mut gmm = GaussianMixture::new(2);
        let err = gmm.fit(&[], 2).unwrap_err();
        assert!(matches!(err.downcast_ref(), Some(Errors::EmptyMask)));
    }

    #[test]
    fn extra_init_clusters() {
        let mut points = grid(15.0, 15.0, 2);
        points.extend(grid(70.0, 50.0, 2));

        // the secondary control may exceed the component count
        let mut gmm = GaussianMixture::new(2);
        gmm.fit(&points, 3).unwrap();
        assert_eq!(gmm.means().len(), 2);
    }
}
