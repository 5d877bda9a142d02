// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error types for every fallible corner of the explorer.  The compute
//! core itself is pure arithmetic; the only way a render pass can fail
//! is a worker panicking or a caller handing us the wrong buffer.

use failure::Fail;

/// Rejected viewport parameters.
#[derive(Debug, Fail, PartialEq)]
pub enum ViewportError {
    /// Zoom must be a finite, strictly positive scale factor.
    #[fail(display = "zoom must be finite and greater than zero, got {}", _0)]
    InvalidZoom(f64),
    /// The center of the viewport must be a finite complex number.
    #[fail(display = "viewport center must be finite, got {},{}", _0, _1)]
    InvalidCenter(f64, f64),
}

/// A render pass that did not produce a frame.
#[derive(Debug, Fail, PartialEq)]
pub enum RenderError {
    /// At least one strip worker panicked.  All workers were joined
    /// before this was reported and the partial buffer was discarded.
    #[fail(display = "a render worker panicked; the pass was discarded")]
    WorkerPanicked,
    /// The target buffer does not match the pixel grid.
    #[fail(display = "buffer holds {} pixels but the plane needs {}", _0, _1)]
    BufferSize(usize, usize),
}

/// Start-up configuration that cannot be used.
#[derive(Debug, Fail, PartialEq)]
pub enum ConfigError {
    /// Width or height is zero.
    #[fail(display = "image size must be non-zero, got {}x{}", _0, _1)]
    EmptyPlane(usize, usize),
    /// The iteration cap is zero.
    #[fail(display = "iteration limit must be at least 1")]
    IterationLimit,
    /// A zero debounce window would render on every event.
    #[fail(display = "debounce window must be longer than zero")]
    ZeroDebounce,
    /// The debounce window is longer than the scheduler will wait.
    #[fail(display = "debounce window must be at most {} ms, got {} ms", _0, _1)]
    DebounceTooLong(u128, u128),
    /// An explicit thread count of zero was requested.
    #[fail(display = "thread count must be at least 1")]
    ZeroThreads,
}

/// Problems reading or writing a saved coordinate record.
#[derive(Debug, Fail)]
pub enum RecordError {
    /// The record is not three whitespace-separated numbers.
    #[fail(display = "malformed coordinate record: {}", _0)]
    Malformed(String),
    /// The record names a viewport that cannot exist.
    #[fail(display = "invalid coordinate record: {}", _0)]
    Viewport(#[cause] ViewportError),
    /// The file could not be read or written.
    #[fail(display = "coordinate record I/O failed: {}", _0)]
    Io(#[cause] std::io::Error),
}

impl From<std::io::Error> for RecordError {
    fn from(err: std::io::Error) -> Self {
        RecordError::Io(err)
    }
}

impl From<ViewportError> for RecordError {
    fn from(err: ViewportError) -> Self {
        RecordError::Viewport(err)
    }
}

/// The redraw scheduler could not start.
#[derive(Debug, Fail)]
pub enum SchedulerError {
    /// The operating system refused to create the scheduler thread.
    #[fail(display = "could not start the redraw thread: {}", _0)]
    Spawn(#[cause] std::io::Error),
}
