// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A finished color buffer, ready to be handed to whatever presents it.

use crate::palette::Rgb;
use crate::planes::{IntegralPlane, Viewport};

/// The output of one complete render pass.  Frames are only ever built
/// from a fully populated buffer; there is no such thing as a partial
/// frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    /// Width of the pixel grid.
    pub width: usize,
    /// Height of the pixel grid.
    pub height: usize,
    /// The render pass that produced this frame.  Passes are numbered
    /// from 1 in the order the scheduler started them; 0 means the frame
    /// was rendered outside a scheduler.
    pub generation: u64,
    /// The viewport snapshot the pass rendered.
    pub viewport: Viewport,
    /// Row-major pixels, `width * height` of them.
    pub pixels: Vec<Rgb>,
}

impl Frame {
    /// Wraps a finished buffer.
    pub fn new(plane: IntegralPlane, viewport: Viewport, pixels: Vec<Rgb>) -> Self {
        debug_assert_eq!(pixels.len(), plane.len());
        Frame {
            width: plane.0,
            height: plane.1,
            generation: 0,
            viewport,
            pixels,
        }
    }

    /// The pixel at column `x`, row `y`, if it is on the grid.
    pub fn pixel(&self, x: usize, y: usize) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y * self.width + x).cloned()
    }

    /// Packed 8-bit RGB, three bytes per pixel, suitable for texture
    /// upload or image encoding.
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 3);
        for &Rgb(r, g, b) in &self.pixels {
            bytes.extend_from_slice(&[r, g, b]);
        }
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn striped() -> Frame {
        let pixels = vec![Rgb(1, 2, 3), Rgb(4, 5, 6), Rgb(7, 8, 9), Rgb(10, 11, 12)];
        Frame::new(IntegralPlane(2, 2), Viewport::default(), pixels)
    }

    #[test]
    fn pixels_are_row_major() {
        let frame = striped();
        assert_eq!(frame.pixel(1, 0), Some(Rgb(4, 5, 6)));
        assert_eq!(frame.pixel(0, 1), Some(Rgb(7, 8, 9)));
        assert_eq!(frame.pixel(2, 0), None);
    }

    #[test]
    fn packs_rgb_bytes() {
        let bytes = striped().to_rgb_bytes();
        assert_eq!(bytes.len(), 12);
        assert_eq!(&bytes[..6], &[1, 2, 3, 4, 5, 6]);
    }
}
