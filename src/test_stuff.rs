//! Synthetic frame builders shared by tests and demo binaries.

use crate::frame::GrayImage;

/// Frame with a square blob of ones (side `2 * half + 1`) around every
/// center, clipped to the frame bounds. Usable both as a raw frame and as a
/// foreground mask.
///
pub fn blob_frame(width: usize, height: usize, centers: &[(i64, i64)], half: i64) -> GrayImage {
    let mut img = GrayImage::zeros(width, height);
    for &(cx, cy) in centers {
        for y in cy - half..=cy + half {
            for x in cx - half..=cx + half {
                if x >= 0 && y >= 0 && (x as usize) < width && (y as usize) < height {
                    img.put(x as usize, y as usize, 1.0);
                }
            }
        }
    }
    img
}
