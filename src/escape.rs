// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The escape-time function.  Pure and allocation-free, so any number
//! of workers may call it at once.

use num::Complex;

const D4: f64 = 1.0 / 4.0;
const D16: f64 = D4 / 4.0;

/// As I understand it, the two halves of the `and` expression
/// represent false if the point is guaranteed to be inside the
/// mandelbrot set: the first half rules out the main cardioid, the
/// second the period-2 bulb.  It does *not* guarantee that a point
/// will be outside; there are points inside the set for which this
/// still returns true, and those have to be iterated.
pub fn maybe_outside(point: Complex<f64>) -> bool {
    let y = point.im * point.im;
    let q = y + (point.re - D4) * (point.re - D4);
    q * (q + point.re - D4) > (y * D4) && (point.re + 1.0_f64) * (point.re + 1.0_f64) + y > D16
}

/// This is our classic iterator function.  Starting from zero it
/// applies `z = z * z + point` until `|z| >= 2` or `limit` steps have
/// been taken, and returns the number of steps.  A return of `limit`
/// means the point never escaped.
pub fn escape_time(point: Complex<f64>, limit: usize) -> usize {
    if !maybe_outside(point) {
        return limit;
    }
    let mut z = Complex {
        re: 0.0_f64,
        im: 0.0_f64,
    };
    let mut i = 0;
    while i < limit && z.norm_sqr() < 4.0 {
        z = z * z + point;
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::iproduct;
    use rand::Rng;

    #[test]
    fn origin_never_escapes() {
        assert_eq!(escape_time(Complex::new(0.0, 0.0), 1000), 1000);
        assert_eq!(escape_time(Complex::new(0.0, 0.0), 1), 1);
    }

    #[test]
    fn far_points_escape_quickly() {
        assert!(escape_time(Complex::new(5.0, 5.0), 1000) <= 3);
        assert_eq!(escape_time(Complex::new(5.0, 5.0), 1000), 1);
        assert_eq!(escape_time(Complex::new(-3.0, 0.0), 1000), 1);
    }

    #[test]
    fn boundary_points_take_a_while() {
        // Just past the cusp of the cardioid.
        assert_eq!(escape_time(Complex::new(0.26, 0.0), 1000), 30);
        assert_eq!(escape_time(Complex::new(-0.75, 0.1), 1000), 33);
    }

    #[test]
    fn zero_limit_returns_zero() {
        assert_eq!(escape_time(Complex::new(5.0, 5.0), 0), 0);
        assert_eq!(escape_time(Complex::new(0.0, 0.0), 0), 0);
    }

    fn iterate(point: Complex<f64>, limit: usize) -> usize {
        let mut z = Complex::new(0.0, 0.0);
        let mut i = 0;
        while i < limit && z.norm_sqr() < 4.0 {
            z = z * z + point;
            i += 1;
        }
        i
    }

    #[test]
    fn cardioid_shortcut_agrees_with_iteration() {
        assert!(!maybe_outside(Complex::new(-0.1, 0.1)));
        assert!(!maybe_outside(Complex::new(-1.0, 0.0)));
        assert!(maybe_outside(Complex::new(0.5, 0.5)));

        let limit = 500;
        for (x, y) in iproduct!(0..200, 0..200) {
            let point = Complex::new(-2.0 + x as f64 * 0.0125, -1.25 + y as f64 * 0.0125);
            assert_eq!(escape_time(point, limit), iterate(point, limit), "at {}", point);
        }
    }

    #[test]
    fn result_is_always_within_limit() {
        let mut rng = rand::thread_rng();
        for _ in 0..1000 {
            let c = Complex::new(rng.gen_range(-3.0, 3.0), rng.gen_range(-3.0, 3.0));
            let limit = rng.gen_range(0, 300);
            assert!(escape_time(c, limit) <= limit);
        }
    }
}
