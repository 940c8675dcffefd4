use crate::frame::GrayImage;
use crate::trackers::{
    Estimate, EstimateAttributes, EventSink, FrameEstimator, NoopEventSink, TrackingControls,
};
use crate::utils::clustering::gmm::GaussianMixture;
use anyhow::Result;
use log::debug;
use nalgebra::Point2;

enum EstimatorState {
    Uninitialized,
    Seeded(GaussianMixture),
}

/// Group tracking estimator: a single Gaussian mixture whose component means
/// are the per-object positions, refit every frame against the foreground
/// mask. Emits positions only, never rectangles.
///
pub struct GroupTrackingEstimator<N: EventSink = NoopEventSink> {
    controls: TrackingControls,
    sink: N,
    state: EstimatorState,
}

impl GroupTrackingEstimator<NoopEventSink> {
    pub fn new(controls: TrackingControls) -> Self {
        Self::with_sink(controls, NoopEventSink)
    }
}

impl<N: EventSink> GroupTrackingEstimator<N> {
    pub fn with_sink(controls: TrackingControls, sink: N) -> Self {
        Self {
            controls,
            sink,
            state: EstimatorState::Uninitialized,
        }
    }

    pub fn sink(&self) -> &N {
        &self.sink
    }

    /// Current component means, `None` while uninitialized.
    ///
    pub fn means(&self) -> Option<Vec<Point2<f32>>> {
        match &self.state {
            EstimatorState::Uninitialized => None,
            EstimatorState::Seeded(gmm) => Some(gmm.means()),
        }
    }
}

impl<N: EventSink> FrameEstimator for GroupTrackingEstimator<N> {
    fn name(&self) -> &'static str {
        "Group Tracker GMM"
    }

    fn attributes(&self) -> EstimateAttributes {
        EstimateAttributes {
            position: true,
            rect: false,
        }
    }

    fn controls(&self) -> &TrackingControls {
        &self.controls
    }

    fn controls_mut(&mut self) -> &mut TrackingControls {
        &mut self.controls
    }

    fn track(&mut self, original: &GrayImage, mask: &GrayImage) -> Result<Vec<Estimate>> {
        debug_assert_eq!(
            (original.width(), original.height()),
            (mask.width(), mask.height())
        );
        let points = mask.nonzero_points();

        if matches!(self.state, EstimatorState::Uninitialized) {
            let n_objects = self.controls.n_objects();
            debug!("creating mixture model with {} components", n_objects);
            self.state = EstimatorState::Seeded(GaussianMixture::new(n_objects));
        }
        let EstimatorState::Seeded(gmm) = &mut self.state else {
            unreachable!()
        };

        gmm.fit(&points, self.controls.n_clusters())?;
        Ok(gmm
            .means()
            .into_iter()
            .map(|position| Estimate {
                position,
                rect: None,
            })
            .collect())
    }

    /// Overwrites component means with externally supplied positions. No-op
    /// while the mixture model does not exist yet.
    fn seed(&mut self, positions: &[Point2<f32>]) {
        if let EstimatorState::Seeded(gmm) = &mut self.state {
            gmm.set_means(positions);
        }
    }

    fn reset(&mut self) {
        self.state = EstimatorState::Uninitialized;
        self.sink.reset_requested();
    }

    fn restart(&mut self) {
        self.sink.restart_requested();
    }
}
