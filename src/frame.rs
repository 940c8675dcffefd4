use nalgebra::Point2;
use ndarray::{s, Array2};

/// Single-channel `f32` raster in row-major layout (`[row, col]` indexing).
///
/// Both the raw frame and the foreground mask arrive as `GrayImage`. The mask
/// is binary-like: any non-zero pixel marks candidate object presence.
///
#[derive(Clone, Debug)]
pub struct GrayImage {
    data: Array2<f32>,
}

impl GrayImage {
    pub fn new(data: Array2<f32>) -> Self {
        Self { data }
    }

    pub fn zeros(width: usize, height: usize) -> Self {
        Self {
            data: Array2::zeros((height, width)),
        }
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[[y, x]]
    }

    pub fn put(&mut self, x: usize, y: usize, value: f32) {
        self.data[[y, x]] = value;
    }

    pub fn data(&self) -> &Array2<f32> {
        &self.data
    }

    /// Coordinates of non-zero pixels as `(x, y)` points, enumerated x-major
    /// (all rows of column 0, then column 1, ...).
    ///
    pub fn nonzero_points(&self) -> Vec<Point2<f32>> {
        let mut points = Vec::new();
        for x in 0..self.width() {
            for y in 0..self.height() {
                if self.data[[y, x]] != 0.0 {
                    points.push(Point2::new(x as f32, y as f32));
                }
            }
        }
        points
    }

    /// Copy of the `width x height` region with the given top-left corner, or
    /// `None` when the region does not fully fit the raster.
    ///
    pub(crate) fn patch(
        &self,
        left: i64,
        top: i64,
        width: usize,
        height: usize,
    ) -> Option<Array2<f32>> {
        if left < 0 || top < 0 {
            return None;
        }
        let (left, top) = (left as usize, top as usize);
        if left + width > self.width() || top + height > self.height() {
            return None;
        }
        Some(
            self.data
                .slice(s![top..top + height, left..left + width])
                .to_owned(),
        )
    }
}
