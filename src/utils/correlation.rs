use crate::frame::GrayImage;
use crate::utils::bbox::BoundingBox;
use crate::EPS;
use nalgebra::Point2;
use ndarray::Array2;
use thiserror::Error;

const MIN_PEAK_CORRELATION: f32 = 0.3;
const TEMPLATE_LEARNING_RATE: f32 = 0.125;
const MIN_SEARCH_MARGIN: i64 = 8;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackerUpdateError {
    #[error("No part of the search region fits the frame.")]
    OutOfBounds,
    #[error("Flat appearance in the search region - correlation is undefined.")]
    FlatAppearance,
    #[error("Correlation peak {0} is below the acceptance threshold.")]
    WeakPeak(f32),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackerSeedError {
    #[error("The seed region lies outside the frame.")]
    OutsideFrame,
}

/// Visual correlation tracker over a single rectangular region.
///
/// `start_track` captures an appearance template from the seeded region;
/// every `update` scans a search window around the last known position with
/// zero-mean normalized cross-correlation, moves to the peak and blends the
/// template toward the newly observed appearance.
///
/// On a failed update the position is left untouched, so `position()` always
/// returns the last successfully tracked center.
///
#[derive(Debug, Clone)]
pub struct CorrelationTracker {
    template: Array2<f32>,
    position: Point2<f32>,
}

impl CorrelationTracker {
    /// Starts tracking the given region of `img`. The region is clipped to
    /// the frame; a region entirely outside of it is an error.
    ///
    pub fn start_track(img: &GrayImage, region: &BoundingBox) -> Result<Self, TrackerSeedError> {
        let left = (region.x().round() as i64).max(0);
        let top = (region.y().round() as i64).max(0);
        let right = ((region.x() + region.width()).round() as i64).min(img.width() as i64);
        let bottom = ((region.y() + region.height()).round() as i64).min(img.height() as i64);

        if right <= left || bottom <= top {
            return Err(TrackerSeedError::OutsideFrame);
        }

        let width = (right - left) as usize;
        let height = (bottom - top) as usize;
        let template = img
            .patch(left, top, width, height)
            .ok_or(TrackerSeedError::OutsideFrame)?;

        Ok(Self {
            template,
            position: Point2::new(
                left as f32 + width as f32 / 2.0,
                top as f32 + height as f32 / 2.0,
            ),
        })
    }

    /// Last successfully tracked center position.
    ///
    pub fn position(&self) -> Point2<f32> {
        self.position
    }

    /// Locates the template in `img` and returns the new center position.
    ///
    pub fn update(&mut self, img: &GrayImage) -> Result<Point2<f32>, TrackerUpdateError> {
        let (height, width) = self.template.dim();
        let base_left = (self.position.x - width as f32 / 2.0).round() as i64;
        let base_top = (self.position.y - height as f32 / 2.0).round() as i64;
        let margin = MIN_SEARCH_MARGIN.max(width.max(height) as i64 / 2);

        let mut best: Option<(f32, i64, i64)> = None;
        let mut any_candidate = false;

        for dy in -margin..=margin {
            for dx in -margin..=margin {
                let (left, top) = (base_left + dx, base_top + dy);
                let candidate = match img.patch(left, top, width, height) {
                    Some(p) => p,
                    None => continue,
                };
                any_candidate = true;
                if let Some(score) = zncc(&self.template, &candidate) {
                    if best.map(|(s, _, _)| score > s).unwrap_or(true) {
                        best = Some((score, left, top));
                    }
                }
            }
        }

        if !any_candidate {
            return Err(TrackerUpdateError::OutOfBounds);
        }
        let (score, left, top) = best.ok_or(TrackerUpdateError::FlatAppearance)?;
        if score < MIN_PEAK_CORRELATION {
            return Err(TrackerUpdateError::WeakPeak(score));
        }

        // slow template adaptation to appearance drift
        let winner = img
            .patch(left, top, width, height)
            .ok_or(TrackerUpdateError::OutOfBounds)?;
        self.template
            .zip_mut_with(&winner, |t, &w| *t += TEMPLATE_LEARNING_RATE * (w - *t));

        self.position = Point2::new(
            left as f32 + width as f32 / 2.0,
            top as f32 + height as f32 / 2.0,
        );
        Ok(self.position)
    }
}

/// Zero-mean normalized cross-correlation of equally sized patches. `None`
/// when either patch has no variance.
fn zncc(a: &Array2<f32>, b: &Array2<f32>) -> Option<f32> {
    let n = a.len() as f32;
    let mean_a = a.sum() / n;
    let mean_b = b.sum() / n;

    let mut num = 0.0f32;
    let mut var_a = 0.0f32;
    let mut var_b = 0.0f32;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (dx, dy) = (x - mean_a, y - mean_b);
        num += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    let denom = (var_a * var_b).sqrt();
    if denom < EPS {
        return None;
    }
    Some(num / denom)
}
