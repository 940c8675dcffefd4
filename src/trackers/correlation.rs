use crate::frame::GrayImage;
use crate::trackers::{
    Estimate, EstimateAttributes, EventSink, FrameEstimator, NoopEventSink, TrackingControls,
};
use crate::utils::bbox::BoundingBox;
use crate::utils::clustering::kmeans::KMeans;
use crate::utils::correlation::CorrelationTracker;
use anyhow::Result;
use log::{debug, warn};
use nalgebra::Point2;

enum EstimatorState {
    Uninitialized,
    Seeded(Vec<CorrelationTracker>),
}

/// Correlation tracking estimator: one independent visual tracker per object.
///
/// While uninitialized, the first processed frame clusters the foreground
/// mask into the configured number of groups and seeds one tracker per
/// cluster center; afterwards every frame steps the trackers against the raw
/// image. A per-tracker update failure is logged and the object retains its
/// last known position; the remaining trackers are still attempted.
///
pub struct CorrelationTrackingEstimator<N: EventSink = NoopEventSink> {
    controls: TrackingControls,
    sink: N,
    k_means: Option<KMeans>,
    state: EstimatorState,
    frame: Option<GrayImage>,
}

impl CorrelationTrackingEstimator<NoopEventSink> {
    pub fn new(controls: TrackingControls) -> Self {
        Self::with_sink(controls, NoopEventSink)
    }
}

impl<N: EventSink> CorrelationTrackingEstimator<N> {
    pub fn with_sink(controls: TrackingControls, sink: N) -> Self {
        Self {
            controls,
            sink,
            k_means: None,
            state: EstimatorState::Uninitialized,
            frame: None,
        }
    }

    pub fn sink(&self) -> &N {
        &self.sink
    }

    /// Number of currently running trackers; zero while uninitialized or
    /// after a seed request that could produce no trackers.
    ///
    pub fn tracker_count(&self) -> usize {
        match &self.state {
            EstimatorState::Uninitialized => 0,
            EstimatorState::Seeded(trackers) => trackers.len(),
        }
    }

    /// Cluster count of the lazily created k-means estimator, if any.
    ///
    pub fn cluster_count(&self) -> Option<usize> {
        self.k_means.as_ref().map(|km| km.n_clusters())
    }

    /// Created with the object count; recreated with the secondary cluster
    /// count whenever that differs from the current one.
    fn ensure_k_means(&mut self) -> &KMeans {
        let n_clusters = self.controls.n_clusters();
        if let Some(km) = &self.k_means {
            if km.n_clusters() != n_clusters {
                self.k_means = Some(KMeans::new(n_clusters));
            }
        }
        let n_objects = self.controls.n_objects();
        self.k_means.get_or_insert_with(|| KMeans::new(n_objects))
    }

    /// Starts one tracker per center against the most recently stored frame.
    /// Without an observed frame no trackers are produced and tracking stays
    /// disabled until the next reseed.
    fn seed_trackers(&mut self, centers: &[Point2<f32>]) {
        let mut trackers = Vec::with_capacity(centers.len());
        match &self.frame {
            Some(frame) => {
                let window = self.controls.window();
                for center in centers {
                    let region = BoundingBox::from_center(center, &window);
                    match CorrelationTracker::start_track(frame, &region) {
                        Ok(tracker) => trackers.push(tracker),
                        Err(e) => {
                            warn!("skipping tracker at ({}, {}): {}", center.x, center.y, e)
                        }
                    }
                }
                debug!("seeded {} of {} trackers", trackers.len(), centers.len());
            }
            None => warn!("seed requested before any frame was observed, no trackers produced"),
        }
        self.state = EstimatorState::Seeded(trackers);
    }
}

impl<N: EventSink> FrameEstimator for CorrelationTrackingEstimator<N> {
    fn name(&self) -> &'static str {
        "Correlation Tracking"
    }

    fn attributes(&self) -> EstimateAttributes {
        EstimateAttributes {
            position: true,
            rect: true,
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
        self.frame = Some(original.clone());
        self.ensure_k_means();

        let positions = if matches!(self.state, EstimatorState::Uninitialized) {
            let points = mask.nonzero_points();
            let centers = self.ensure_k_means().fit(&points)?;
            self.seed_trackers(&centers);
            // on the seeding frame the estimate is the cluster centers
            centers
        } else {
            let EstimatorState::Seeded(trackers) = &mut self.state else {
                unreachable!()
            };
            let mut positions = Vec::with_capacity(trackers.len());
            for (i, tracker) in trackers.iter_mut().enumerate() {
                match tracker.update(original) {
                    Ok(p) => positions.push(p),
                    Err(e) => {
                        warn!("tracker {} update failed ({}), keeping last position", i, e);
                        positions.push(tracker.position());
                    }
                }
            }
            positions
        };

        let window = self.controls.window();
        Ok(positions
            .into_iter()
            .map(|position| Estimate {
                position,
                rect: Some(BoundingBox::from_center(&position, &window)),
            })
            .collect())
    }

    fn seed(&mut self, positions: &[Point2<f32>]) {
        self.seed_trackers(positions);
    }

    fn reset(&mut self) {
        self.k_means = None;
        self.state = EstimatorState::Uninitialized;
        self.sink.reset_requested();
    }

    fn restart(&mut self) {
        self.sink.restart_requested();
    }
}

#[cfg(test)]
mod tests {
    use super::CorrelationTrackingEstimator;
    use crate::frame::GrayImage;
    use crate::test_stuff::blob_frame;
    use crate::trackers::{EventSink, FrameEstimator, TrackingControls};
    use crate::utils::bbox::WindowSize;
    use crate::{EstimateClose, Errors};
    use nalgebra::Point2;

    fn estimator(n_objects: usize) -> CorrelationTrackingEstimator {
        CorrelationTrackingEstimator::new(TrackingControls::new(
            n_objects,
            WindowSize::new(14.0, 14.0),
        ))
    }

    fn close_to(positions: &[Point2<f32>], expected: (f32, f32), eps: f32) -> bool {
        positions
            .iter()
            .any(|p| (p - Point2::new(expected.0, expected.1)).norm() < eps)
    }

    #[test]
    fn first_frame_seeds_from_clusters() {
        let mut t = estimator(2);
        let frame = blob_frame(120, 90, &[(30, 30), (90, 60)], 3);

        let estimates = t.track(&frame, &frame).unwrap();
        assert_eq!(estimates.len(), 2);
        assert_eq!(t.tracker_count(), 2);

        let positions = estimates.iter().map(|e| e.position).collect::<Vec<_>>();
        assert!(close_to(&positions, (30.0, 30.0), 0.5));
        assert!(close_to(&positions, (90.0, 60.0), 0.5));

        // rectangles are window-sized around the positions
        for e in &estimates {
            let rect = e.rect.unwrap();
            assert!((rect.center() - e.position).norm() < 1e-4);
            assert_eq!((rect.width(), rect.height()), (14.0, 14.0));
        }
    }

    #[test]
    fn trackers_follow_moving_objects() {
        let mut t = estimator(2);
        let frame = blob_frame(120, 90, &[(30, 30), (90, 60)], 3);
        t.track(&frame, &frame).unwrap();

        let moved = blob_frame(120, 90, &[(33, 32), (87, 58)], 3);
        let estimates = t.track(&moved, &moved).unwrap();
        assert_eq!(estimates.len(), 2);

        let positions = estimates.iter().map(|e| e.position).collect::<Vec<_>>();
        assert!(close_to(&positions, (33.0, 32.0), 0.75));
        assert!(close_to(&positions, (87.0, 58.0), 0.75));
    }

    #[test]
    fn failed_update_keeps_last_position_for_that_object_only() {
        let mut t = estimator(2);
        let frame = blob_frame(120, 90, &[(30, 30), (90, 60)], 3);
        t.track(&frame, &frame).unwrap();

        // first object moves, the second one's region goes blank
        let partial = blob_frame(120, 90, &[(33, 31)], 3);
        let estimates = t.track(&partial, &partial).unwrap();
        assert_eq!(estimates.len(), 2);

        let positions = estimates.iter().map(|e| e.position).collect::<Vec<_>>();
        assert!(close_to(&positions, (33.0, 31.0), 0.75));
        assert!(close_to(&positions, (90.0, 60.0), 0.5));
    }

    #[test]
    fn all_failed_updates_keep_all_positions() {
        let mut t = estimator(2);
        let frame = blob_frame(120, 90, &[(30, 30), (90, 60)], 3);
        t.track(&frame, &frame).unwrap();

        let blank = GrayImage::zeros(120, 90);
        let estimates = t.track(&blank, &blank).unwrap();
        let positions = estimates.iter().map(|e| e.position).collect::<Vec<_>>();
        assert!(close_to(&positions, (30.0, 30.0), 0.5));
        assert!(close_to(&positions, (90.0, 60.0), 0.5));
    }

    #[test]
    fn rect_recomputed_from_current_window() {
        let mut t = estimator(1);
        let frame = blob_frame(80, 80, &[(40, 40)], 3);
        t.track(&frame, &frame).unwrap();

        t.controls_mut().set_window(WindowSize::new(40.0, 10.0));
        let estimates = t.track(&frame, &frame).unwrap();
        let rect = estimates[0].rect.unwrap();
        assert_eq!((rect.width(), rect.height()), (40.0, 10.0));
    }

    #[test]
    fn window_arithmetic_matches_contract() {
        let mut t = CorrelationTrackingEstimator::new(TrackingControls::new(
            1,
            WindowSize::new(20.0, 30.0),
        ));
        let frame = blob_frame(200, 200, &[(100, 100)], 3);
        let estimates = t.track(&frame, &frame).unwrap();

        let rect = estimates[0].rect.unwrap();
        assert!((rect.top_left() - Point2::new(90.0, 85.0)).norm() < 0.5);
        assert!((rect.bottom_right() - Point2::new(110.0, 115.0)).norm() < 0.5);
    }

    #[test]
    fn seed_before_any_frame_produces_no_trackers() {
        let mut t = estimator(1);
        t.seed(&[Point2::new(10.0, 10.0)]);
        assert_eq!(t.tracker_count(), 0);

        // tracking is disabled: the step produces no estimates
        let frame = blob_frame(40, 40, &[(10, 10)], 3);
        let estimates = t.track(&frame, &frame).unwrap();
        assert!(estimates.is_empty());
    }

    #[test]
    fn external_reseed_after_frames() {
        let mut t = estimator(1);
        let frame = blob_frame(80, 80, &[(20, 20)], 3);
        t.track(&frame, &frame).unwrap();

        t.seed(&[Point2::new(20.0, 20.0)]);
        assert_eq!(t.tracker_count(), 1);

        let moved = blob_frame(80, 80, &[(23, 22)], 3);
        let estimates = t.track(&moved, &moved).unwrap();
        assert!((estimates[0].position - Point2::new(23.0, 22.0)).norm() < 0.75);
    }

    #[test]
    fn empty_mask_on_seeding_frame_is_an_error() {
        let mut t = estimator(1);
        let blank = GrayImage::zeros(40, 40);
        let err = t.track(&blank, &blank).unwrap_err();
        assert!(matches!(err.downcast_ref(), Some(Errors::EmptyMask)));
    }

    #[test]
    fn k_means_recreated_when_secondary_count_changes() {
        let mut t = estimator(2);
        let frame = blob_frame(120, 90, &[(30, 30), (90, 60)], 3);
        t.track(&frame, &frame).unwrap();
        assert_eq!(t.cluster_count(), Some(2));

        t.controls_mut().set_n_clusters(4);
        t.track(&frame, &frame).unwrap();
        assert_eq!(t.cluster_count(), Some(4));
    }

    #[test]
    fn reset_clears_state_and_reports() {
        #[derive(Default)]
        struct CountingSink {
            resets: usize,
            restarts: usize,
        }
        impl EventSink for CountingSink {
            fn reset_requested(&mut self) {
                self.resets += 1;
            }
            fn restart_requested(&mut self) {
                self.restarts += 1;
            }
        }

        let mut t = CorrelationTrackingEstimator::with_sink(
            TrackingControls::new(1, WindowSize::new(14.0, 14.0)),
            CountingSink::default(),
        );
        let frame = blob_frame(60, 60, &[(30, 30)], 3);
        t.track(&frame, &frame).unwrap();
        assert_eq!(t.tracker_count(), 1);

        t.reset();
        assert_eq!(t.tracker_count(), 0);
        assert_eq!(t.cluster_count(), None);
        assert_eq!(t.sink().resets, 1);

        t.restart();
        assert_eq!(t.sink().restarts, 1);

        // next frame reseeds from scratch
        let estimates = t.track(&frame, &frame).unwrap();
        assert_eq!(estimates.len(), 1);
        assert_eq!(t.tracker_count(), 1);
    }

    #[test]
    fn estimates_compare_with_tolerance() {
        let mut t = estimator(1);
        let frame = blob_frame(60, 60, &[(30, 30)], 3);
        let a = t.track(&frame, &frame).unwrap();
        let b = t.track(&frame, &frame).unwrap();
        assert!(a[0].almost_same(&b[0], 0.5));
    }
}
