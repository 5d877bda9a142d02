// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Writes a finished frame to disk.  The format follows the file
//! extension: `.bmp`, `.png`, or one of the PNM family.

use failure::Error;
use image::ColorType;
use std::path::Path;

use crate::frame::Frame;

/// Encodes `frame` as 24-bit RGB into `path`.
pub fn write_image<P: AsRef<Path>>(path: P, frame: &Frame) -> Result<(), Error> {
    image::save_buffer(
        path,
        &frame.to_rgb_bytes(),
        frame.width as u32,
        frame.height as u32,
        ColorType::RGB(8),
    )?;
    Ok(())
}
