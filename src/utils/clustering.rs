/// Gaussian mixture estimator refit per frame by the group tracker
pub mod gmm;

/// K-means estimator used to seed trackers from foreground-mask pixels
pub mod kmeans;
