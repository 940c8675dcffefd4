use crate::trackers;
use crate::utils;

pub use crate::frame::GrayImage;
pub use trackers::correlation::CorrelationTrackingEstimator;
pub use trackers::group::GroupTrackingEstimator;
pub use trackers::{
    Estimate, EstimateAttributes, EventSink, FrameEstimator, NoopEventSink, TrackingControls,
};
pub use utils::bbox::{BoundingBox, WindowSize};
