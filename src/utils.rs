/// Bounding boxes built from a position and a fixed window size
pub mod bbox;

/// Clustering estimators used to seed and drive the trackers
pub mod clustering;

/// Appearance-template visual correlation tracker
pub mod correlation;
