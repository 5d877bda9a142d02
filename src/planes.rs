// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Contains the Viewport, which describes where the camera sits on the
//! complex plane, and the PlaneMapper, which relates a rectangle on the
//! integral plane (the pixel grid, origin at 0,0) to the region of the
//! complex plane the viewport currently frames.
use num::Complex;

use crate::errors::ViewportError;

/// Describes the width and height of an integral plane that is assumed to start at
/// 0,0 and all values are assumed to be non-negative integers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct IntegralPlane(pub usize, pub usize);

impl IntegralPlane {
    /// The total number of points in the integral grid.  Used to
    /// calculate memory needs.
    pub fn len(&self) -> usize {
        self.0 * self.1
    }

    /// Describes that the integral plane is of a size.
    pub fn is_empty(&self) -> bool {
        self.0 == 0 || self.1 == 0
    }
}

/// Describes the x, y of a point in a region.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Pixel(pub usize, pub usize);

/// The zoom and pan state of the explorer.  A zoom of 1.0 frames a
/// region two units wide, centered on `center`; doubling the zoom
/// halves the width.  The zoom is always finite and strictly positive.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Viewport {
    zoom: f64,
    center: Complex<f64>,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport {
            zoom: 1.0,
            center: Complex::new(0.0, 0.0),
        }
    }
}

impl Viewport {
    /// Builds a viewport, refusing zooms that are zero, negative, or not
    /// finite, and centers that are not finite.
    pub fn new(zoom: f64, center: Complex<f64>) -> Result<Self, ViewportError> {
        if !zoom.is_finite() || zoom <= 0.0 {
            return Err(ViewportError::InvalidZoom(zoom));
        }
        if !center.re.is_finite() || !center.im.is_finite() {
            return Err(ViewportError::InvalidCenter(center.re, center.im));
        }
        Ok(Viewport { zoom, center })
    }

    /// The scale factor.
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// The point of the complex plane at the middle of the screen.
    pub fn center(&self) -> Complex<f64> {
        self.center
    }

    /// The same pan with a different zoom.
    pub fn with_zoom(self, zoom: f64) -> Result<Self, ViewportError> {
        Viewport::new(zoom, self.center)
    }

    /// The same zoom with a different pan.
    pub fn with_center(self, center: Complex<f64>) -> Result<Self, ViewportError> {
        Viewport::new(self.zoom, center)
    }
}

/// Maps between the pixel grid and the region of the complex plane a
/// given viewport frames.  Built once per render pass from a viewport
/// snapshot, so every worker sees exactly the same transform.
#[derive(Copy, Clone, Debug)]
pub struct PlaneMapper {
    /// The right-upper hand corner of the integral cartesian plane.
    /// The left-lower is assumed to be at 0,0
    pub integral_plane: IntegralPlane,
    /// The snapshot of zoom and pan this mapper was built from.
    pub viewport: Viewport,
    // Half the width and height of the pixel grid, and the number of
    // pixels per unit of the complex plane along each axis.
    half: (f64, f64),
    grid_factors: (f64, f64),
}

impl PlaneMapper {
    /// Takes a region describing the integral plane and the viewport
    /// that frames the complex plane.
    pub fn new(integral_plane: IntegralPlane, viewport: Viewport) -> PlaneMapper {
        let width = integral_plane.0 as f64;
        let height = integral_plane.1 as f64;
        PlaneMapper {
            integral_plane,
            viewport,
            half: (width / 2.0, height / 2.0),
            grid_factors: (0.5 * viewport.zoom * width, 0.5 * viewport.zoom * height),
        }
    }

    /// Given a pixel on the integral cartesian plane, map it to a point
    /// on the complex plane.  Each axis is an independent affine map:
    /// `(pixel - half_screen) / (0.5 * zoom * screen) + center`.
    pub fn pixel_to_point(&self, pixel: &Pixel) -> Complex<f64> {
        Complex::new(
            ((pixel.0 as f64) - self.half.0) / self.grid_factors.0 + self.viewport.center.re,
            ((pixel.1 as f64) - self.half.1) / self.grid_factors.1 + self.viewport.center.im,
        )
    }

    /// Given a complex number, map it as closely as possible to a pixel.
    /// Returns None when the point falls outside the grid.
    pub fn point_to_pixel(&self, point: &Complex<f64>) -> Option<Pixel> {
        let left = (point.re - self.viewport.center.re) * self.grid_factors.0 + self.half.0;
        let top = (point.im - self.viewport.center.im) * self.grid_factors.1 + self.half.1;
        if left < 0.0
            || top < 0.0
            || left >= (self.integral_plane.0 as f64)
            || top >= (self.integral_plane.1 as f64)
        {
            return None;
        }
        Some(Pixel(left as usize, top as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn viewport_rejects_bad_zoom() {
        let origin = Complex::new(0.0, 0.0);
        assert_eq!(Viewport::new(0.0, origin), Err(ViewportError::InvalidZoom(0.0)));
        assert_eq!(Viewport::new(-2.0, origin), Err(ViewportError::InvalidZoom(-2.0)));
        assert!(Viewport::new(std::f64::NAN, origin).is_err());
        assert!(Viewport::new(std::f64::INFINITY, origin).is_err());
        assert!(Viewport::new(1e-9, origin).is_ok());
    }

    #[test]
    fn viewport_rejects_bad_center() {
        assert!(Viewport::new(1.0, Complex::new(std::f64::NAN, 0.0)).is_err());
        assert!(Viewport::default()
            .with_center(Complex::new(0.0, std::f64::NEG_INFINITY))
            .is_err());
    }

    #[test]
    fn screen_center_maps_to_viewport_center() {
        let viewport = Viewport::new(3.0, Complex::new(-0.75, 0.1)).unwrap();
        let pm = PlaneMapper::new(IntegralPlane(640, 480), viewport);
        assert_eq!(pm.pixel_to_point(&Pixel(320, 240)), Complex::new(-0.75, 0.1));
    }

    #[test]
    fn pixel_to_point_on_default_viewport() {
        let pm = PlaneMapper::new(IntegralPlane(4, 4), Viewport::default());
        assert_eq!(pm.pixel_to_point(&Pixel(0, 0)), Complex::new(-1.0, -1.0));
        assert_eq!(pm.pixel_to_point(&Pixel(2, 2)), Complex::new(0.0, 0.0));
        assert_eq!(pm.pixel_to_point(&Pixel(4, 4)), Complex::new(1.0, 1.0));
        assert_eq!(pm.pixel_to_point(&Pixel(3, 1)), Complex::new(0.5, -0.5));
    }

    #[test]
    fn zooming_narrows_the_region() {
        let viewport = Viewport::default().with_zoom(2.0).unwrap();
        let pm = PlaneMapper::new(IntegralPlane(8, 8), viewport);
        assert_eq!(pm.pixel_to_point(&Pixel(0, 0)), Complex::new(-0.5, -0.5));
        assert_eq!(pm.pixel_to_point(&Pixel(8, 8)), Complex::new(0.5, 0.5));
    }

    #[test]
    fn pixel_to_point_is_repeatable() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let plane = IntegralPlane(rng.gen_range(1, 2000), rng.gen_range(1, 2000));
            let viewport = Viewport::new(
                rng.gen_range(0.01, 1000.0),
                Complex::new(rng.gen_range(-2.0, 2.0), rng.gen_range(-2.0, 2.0)),
            )
            .unwrap();
            let pixel = Pixel(rng.gen_range(0, plane.0), rng.gen_range(0, plane.1));
            let first = PlaneMapper::new(plane, viewport).pixel_to_point(&pixel);
            let second = PlaneMapper::new(plane, viewport).pixel_to_point(&pixel);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn point_to_pixel_inverts_pixel_to_point() {
        let pm = PlaneMapper::new(IntegralPlane(640, 640), Viewport::default());
        assert_eq!(pm.point_to_pixel(&Complex::new(0.0, 0.0)), Some(Pixel(320, 320)));
        assert_eq!(pm.point_to_pixel(&Complex::new(-1.0, -1.0)), Some(Pixel(0, 0)));
        assert_eq!(pm.point_to_pixel(&Complex::new(0.5, 0.75)), Some(Pixel(480, 560)));
    }

    #[test]
    fn point_to_pixel_rejects_points_off_screen() {
        let pm = PlaneMapper::new(IntegralPlane(640, 640), Viewport::default());
        assert_eq!(pm.point_to_pixel(&Complex::new(1.0, 0.0)), None);
        assert_eq!(pm.point_to_pixel(&Complex::new(0.0, -1.5)), None);
    }

    #[test]
    fn integral_plane_size() {
        assert_eq!(IntegralPlane(5, 4).len(), 20);
        assert!(IntegralPlane(0, 4).is_empty());
        assert!(!IntegralPlane(1, 1).is_empty());
    }
}
