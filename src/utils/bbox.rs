use crate::EstimateClose;
use nalgebra::Point2;

/// Bounding box in the format (x, y, width, height) with (x, y) the top-left
/// corner
///
#[derive(Clone, Default, Debug, Copy)]
pub struct BoundingBox {
    _x: f32,
    _y: f32,
    _width: f32,
    _height: f32,
}

impl BoundingBox {
    /// Constructor
    ///
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            _x: x,
            _y: y,
            _width: width,
            _height: height,
        }
    }

    /// Fixed-size box centered on an estimated position: corners are
    /// `center +/- window / 2`.
    ///
    pub fn from_center(center: &Point2<f32>, window: &WindowSize) -> Self {
        Self::new(
            center.x - window.width / 2.0,
            center.y - window.height / 2.0,
            window.width,
            window.height,
        )
    }

    pub fn x(&self) -> f32 {
        self._x
    }

    pub fn y(&self) -> f32 {
        self._y
    }

    pub fn width(&self) -> f32 {
        self._width
    }

    pub fn height(&self) -> f32 {
        self._height
    }

    pub fn top_left(&self) -> Point2<f32> {
        Point2::new(self._x, self._y)
    }

    pub fn bottom_right(&self) -> Point2<f32> {
        Point2::new(self._x + self._width, self._y + self._height)
    }

    pub fn center(&self) -> Point2<f32> {
        Point2::new(self._x + self._width / 2.0, self._y + self._height / 2.0)
    }
}

impl EstimateClose for BoundingBox {
    /// Allows comparing bboxes
    ///
    fn almost_same(&self, other: &Self, eps: f32) -> bool {
        (self._x - other._x).abs() < eps
            && (self._y - other._y).abs() < eps
            && (self._width - other._width).abs() < eps
            && (self._height - other._height).abs() < eps
    }
}

/// Window dimensions applied uniformly to every estimated position,
/// independent of any tracker's internal scale.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowSize {
    pub width: f32,
    pub height: f32,
}

impl WindowSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

#[cfg(test)]
mod tests {
    use super::{BoundingBox, WindowSize};
    use crate::{EstimateClose, EPS};
    use nalgebra::Point2;

    #[test]
    fn window_centered_box() {
        let bb = BoundingBox::from_center(&Point2::new(100.0, 100.0), &WindowSize::new(20.0, 30.0));
        assert_eq!(bb.top_left(), Point2::new(90.0, 85.0));
        assert_eq!(bb.bottom_right(), Point2::new(110.0, 115.0));
        assert_eq!(bb.center(), Point2::new(100.0, 100.0));
    }

    #[test]
    fn almost_same() {
        let bb = BoundingBox::new(1.0, 2.0, 10.0, 20.0);
        assert!(bb.almost_same(&BoundingBox::new(1.0, 2.0, 10.0, 20.0), EPS));
        assert!(!bb.almost_same(&BoundingBox::new(1.1, 2.0, 10.0, 20.0), EPS));
    }
}
