// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The coordinate record: the last viewport, saved on exit as three
//! whitespace-separated numbers, `zoom pan_x pan_y`, so a later session
//! can pick up where this one left off.

use num::Complex;
use std::fs;
use std::path::Path;

use crate::errors::RecordError;
use crate::planes::Viewport;

/// Formats a viewport as a coordinate record.
pub fn format_record(viewport: &Viewport) -> String {
    format!(
        "{} {} {}\n",
        viewport.zoom(),
        viewport.center().re,
        viewport.center().im
    )
}

/// Parses a coordinate record.
pub fn parse_record(s: &str) -> Result<Viewport, RecordError> {
    let numbers = s
        .split_whitespace()
        .map(|word| {
            word.parse::<f64>()
                .map_err(|_| RecordError::Malformed(format!("'{}' is not a number", word)))
        })
        .collect::<Result<Vec<f64>, RecordError>>()?;
    match numbers.as_slice() {
        [zoom, re, im] => Ok(Viewport::new(*zoom, Complex::new(*re, *im))?),
        _ => Err(RecordError::Malformed(format!(
            "expected 3 numbers, found {}",
            numbers.len()
        ))),
    }
}

/// Writes the record for `viewport` to `path`.
pub fn save_coordinates<P: AsRef<Path>>(path: P, viewport: &Viewport) -> Result<(), RecordError> {
    fs::write(path, format_record(viewport))?;
    Ok(())
}

/// Reads a viewport back from `path`.
pub fn load_coordinates<P: AsRef<Path>>(path: P) -> Result<Viewport, RecordError> {
    parse_record(&fs::read_to_string(path)?)
}
