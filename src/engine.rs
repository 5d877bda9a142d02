// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The parallel compute engine.
//!
//! A render pass takes a snapshot of the viewport, cuts the pixel grid
//! into horizontal strips of contiguous rows, and hands each strip to
//! its own scoped thread.  Every strip owns a disjoint `&mut` slice of
//! the color buffer, so the workers need no locks and cannot step on
//! each other; the borrow checker guarantees it.  The scope joins every
//! worker before the pass returns, and only a fully populated buffer is
//! ever wrapped in a Frame.
//!
//! Because each pixel is computed from the same snapshot with the same
//! arithmetic no matter which strip it lands in, the output is
//! bit-for-bit identical for any number of workers.

use itertools::iproduct;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;
use tracing::{debug, trace};

use crate::errors::RenderError;
use crate::escape::escape_time;
use crate::frame::Frame;
use crate::palette::{color_for, Rgb};
use crate::planes::{IntegralPlane, Pixel, PlaneMapper, Viewport};

/// The number of hardware threads, discovered at call time.  Never
/// less than one.
pub fn worker_count() -> usize {
    num_cpus::get().max(1)
}

/// Splits `0..height` into `parts` contiguous, non-overlapping ranges
/// whose union is exactly `0..height`.  Range `i` is
/// `i * height / parts .. (i + 1) * height / parts`, so lengths differ by
/// at most one row.  When there are more parts than rows, some ranges
/// are empty.  A request for zero parts is treated as one.
pub fn row_ranges(height: usize, parts: usize) -> Vec<Range<usize>> {
    let parts = parts.max(1);
    (0..parts)
        .map(|i| (i * height / parts)..((i + 1) * height / parts))
        .collect()
}

/// A horizontal band of the pixel grid and the slice of the color
/// buffer that backs it.
#[derive(Debug)]
pub struct Strip<'a> {
    rows: Range<usize>,
    width: usize,
    pixels: &'a mut [Rgb],
}

impl<'a> Strip<'a> {
    /// The rows of the grid this strip covers.
    pub fn rows(&self) -> Range<usize> {
        self.rows.clone()
    }

    /// Runs the escape-time function over every pixel of the strip.
    pub fn fill(&mut self, plane: &PlaneMapper, limit: usize) {
        let first = self.rows.start;
        for (row, column) in iproduct!(self.rows.clone(), 0..self.width) {
            let point = plane.pixel_to_point(&Pixel(column, row));
            self.pixels[(row - first) * self.width + column] =
                color_for(escape_time(point, limit), limit);
        }
    }
}

/// Cuts a row-major buffer into strips along `ranges`, which must be
/// contiguous and start at row zero (as `row_ranges` produces them).
pub fn split_strips<'a>(
    pixels: &'a mut [Rgb],
    width: usize,
    ranges: &[Range<usize>],
) -> Vec<Strip<'a>> {
    let mut rest = pixels;
    let mut strips = Vec::with_capacity(ranges.len());
    for rows in ranges {
        let (head, tail) = std::mem::take(&mut rest).split_at_mut(rows.len() * width);
        rest = tail;
        strips.push(Strip {
            rows: rows.clone(),
            width,
            pixels: head,
        });
    }
    strips
}

/// Anything that can turn a viewport snapshot into a finished frame.
/// The redraw scheduler drives one of these from its own thread.
pub trait Render: Send {
    /// Renders one complete frame of `viewport`.
    fn render(&mut self, viewport: &Viewport) -> Result<Frame, RenderError>;

    /// Hands back the buffer of a frame nobody is looking at any more,
    /// so the next pass can overwrite it instead of allocating.
    fn recycle(&mut self, _pixels: Vec<Rgb>) {}
}

/// Renders the Mandelbrot set over a fixed pixel grid.
#[derive(Debug)]
pub struct Renderer {
    plane: IntegralPlane,
    limit: usize,
    threads: Option<usize>,
    spare: Option<Vec<Rgb>>,
}

impl Renderer {
    /// Requires the size of the pixel grid and the iteration cap.  The
    /// worker count is discovered on every pass unless fixed with
    /// `with_threads`.
    pub fn new(plane: IntegralPlane, limit: usize) -> Self {
        Renderer {
            plane,
            limit,
            threads: None,
            spare: None,
        }
    }

    /// Pins the number of workers per pass.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads.max(1));
        self
    }

    /// The pixel grid.
    pub fn plane(&self) -> IntegralPlane {
        self.plane
    }

    /// The iteration cap.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Workers the next pass will use.
    pub fn threads(&self) -> usize {
        self.threads.unwrap_or_else(worker_count)
    }

    /// Renders on the calling thread.
    pub fn render_single(&self, viewport: &Viewport) -> Frame {
        let mut pixels = vec![Rgb::BLACK; self.plane.len()];
        let plane = PlaneMapper::new(self.plane, *viewport);
        let ranges = [0..self.plane.1];
        for mut strip in split_strips(&mut pixels, self.plane.0, &ranges) {
            strip.fill(&plane, self.limit);
        }
        Frame::new(self.plane, *viewport, pixels)
    }

    /// Renders a new frame with exactly `threads` workers (capped at the
    /// number of rows).
    pub fn render_with(&self, viewport: &Viewport, threads: usize) -> Result<Frame, RenderError> {
        let mut pixels = vec![Rgb::BLACK; self.plane.len()];
        self.render_into(viewport, &mut pixels, threads)?;
        Ok(Frame::new(self.plane, *viewport, pixels))
    }

    /// Overwrites `pixels` with a render of `viewport`.  With one worker
    /// the pass runs synchronously on the calling thread.
    pub fn render_into(
        &self,
        viewport: &Viewport,
        pixels: &mut [Rgb],
        threads: usize,
    ) -> Result<(), RenderError> {
        if pixels.len() != self.plane.len() {
            return Err(RenderError::BufferSize(pixels.len(), self.plane.len()));
        }
        let started = Instant::now();
        let plane = PlaneMapper::new(self.plane, *viewport);
        let parts = threads.min(self.plane.1).max(1);
        let ranges = row_ranges(self.plane.1, parts);
        let strips = split_strips(pixels, self.plane.0, &ranges);
        let limit = self.limit;

        if parts == 1 {
            panic::catch_unwind(AssertUnwindSafe(|| {
                for mut strip in strips {
                    strip.fill(&plane, limit);
                }
            }))
            .map_err(|_| RenderError::WorkerPanicked)?;
        } else {
            crossbeam::scope(|spawner| {
                for mut strip in strips {
                    spawner.spawn(move |_| {
                        trace!(rows = ?strip.rows(), "strip started");
                        strip.fill(&plane, limit);
                    });
                }
            })
            .map_err(|_| RenderError::WorkerPanicked)?;
        }

        debug!(
            workers = parts,
            zoom = viewport.zoom(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "render pass complete"
        );
        Ok(())
    }
}

impl Render for Renderer {
    fn render(&mut self, viewport: &Viewport) -> Result<Frame, RenderError> {
        let len = self.plane.len();
        let mut pixels = match self.spare.take() {
            Some(pixels) if pixels.len() == len => pixels,
            _ => vec![Rgb::BLACK; len],
        };
        let threads = self.threads();
        self.render_into(viewport, &mut pixels, threads)?;
        Ok(Frame::new(self.plane, *viewport, pixels))
    }

    fn recycle(&mut self, pixels: Vec<Rgb>) {
        if pixels.len() == self.plane.len() {
            self.spare = Some(pixels);
        }
    }
}
