// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Maps an escape time to a color.  Points that never escaped, and
//! points that escaped immediately, are both black; the bands between
//! run through blue, green and orange.

use num::clamp;

/// One pixel of the color buffer.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Black.
    pub const BLACK: Rgb = Rgb(0, 0, 0);
}

fn channel(v: f64) -> u8 {
    clamp(v * 255.0, 0.0, 255.0) as u8
}

/// The polynomial palette: with `t = iterations / limit`, red peaks
/// late, green in the middle and blue early.
pub fn color_for(iterations: usize, limit: usize) -> Rgb {
    if limit == 0 {
        return Rgb::BLACK;
    }
    let t = iterations as f64 / limit as f64;
    let u = 1.0 - t;
    Rgb(
        channel(9.0 * u * t * t * t),
        channel(15.0 * u * u * t * t),
        channel(8.5 * u * u * u * t),
    )
}
