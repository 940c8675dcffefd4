use crate::frame::GrayImage;
use crate::utils::bbox::{BoundingBox, WindowSize};
use crate::EstimateClose;
use anyhow::Result;
use nalgebra::Point2;

/// Correlation tracking estimator with one visual tracker per object
pub mod correlation;

/// Group tracking estimator backed by a single Gaussian mixture
pub mod group;

/// Per-object estimate produced for a single frame.
///
#[derive(Debug, Clone)]
pub struct Estimate {
    pub position: Point2<f32>,
    pub rect: Option<BoundingBox>,
}

impl EstimateClose for Estimate {
    fn almost_same(&self, other: &Self, eps: f32) -> bool {
        (self.position - other.position).norm() < eps
            && match (&self.rect, &other.rect) {
                (Some(a), Some(b)) => a.almost_same(b, eps),
                (None, None) => true,
                _ => false,
            }
    }
}

/// Declares which estimate fields an estimator produces, so a generic host
/// can render results without estimator-specific knowledge.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EstimateAttributes {
    pub position: bool,
    pub rect: bool,
}

/// Observer for estimator-initiated lifecycle events.
///
pub trait EventSink {
    /// Estimator state was cleared; the host is expected to resupply seed
    /// positions through `seed`.
    fn reset_requested(&mut self);

    /// The host should fully reinitialize the pipeline upstream.
    fn restart_requested(&mut self);
}

/// Sink that drops all events.
#[derive(Default, Clone, Debug)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn reset_requested(&mut self) {}
    fn restart_requested(&mut self) {}
}

/// Control values the host view exposes to an estimator: desired object
/// count, the secondary cluster count and the estimate window size.
///
/// The secondary count is floored by the object count - raising the object
/// count raises the floor, and the setter clamps, so it can never sit below
/// the primary value.
///
#[derive(Debug, Clone)]
pub struct TrackingControls {
    n_objects: usize,
    n_clusters: usize,
    window: WindowSize,
}

impl Default for TrackingControls {
    fn default() -> Self {
        Self::new(1, WindowSize::new(20.0, 20.0))
    }
}

impl TrackingControls {
    pub fn new(n_objects: usize, window: WindowSize) -> Self {
        assert!(n_objects > 0, "Object count must be a positive number");
        Self {
            n_objects,
            n_clusters: n_objects,
            window,
        }
    }

    pub fn n_objects(&self) -> usize {
        self.n_objects
    }

    pub fn set_n_objects(&mut self, n: usize) {
        assert!(n > 0, "Object count must be a positive number");
        self.n_objects = n;
        if self.n_clusters < n {
            self.n_clusters = n;
        }
    }

    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    pub fn set_n_clusters(&mut self, n: usize) {
        self.n_clusters = n.max(self.n_objects);
    }

    pub fn window(&self) -> WindowSize {
        self.window
    }

    pub fn set_window(&mut self, window: WindowSize) {
        self.window = window;
    }
}

/// Contract shared by the frame estimators and consumed by the host: a
/// display name, an attribute descriptor, the per-frame entry point and the
/// seeding/reset lifecycle.
///
pub trait FrameEstimator {
    fn name(&self) -> &'static str;

    fn attributes(&self) -> EstimateAttributes;

    fn controls(&self) -> &TrackingControls;

    fn controls_mut(&mut self) -> &mut TrackingControls;

    /// Processes one frame pair and returns the per-object estimates.
    fn track(&mut self, original: &GrayImage, mask: &GrayImage) -> Result<Vec<Estimate>>;

    /// (Re)seeds estimator state from externally supplied center positions.
    fn seed(&mut self, positions: &[Point2<f32>]);

    /// Clears estimator state and reports the reset to the event sink.
    fn reset(&mut self);

    /// Reports a restart request to the event sink.
    fn restart(&mut self);
}
