#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Interactive Mandelbrot explorer
//!
//! The Mandelbrot set is the set of points `c` on the complex plane for
//! which repeatedly squaring `z` and adding `c`, starting from zero,
//! never runs off to infinity.  Coloring each pixel by how quickly its
//! point escapes gives the familiar picture.
//!
//! The arithmetic is the easy part.  The interesting part is keeping
//! an interactive view responsive: every frame is a full recompute of
//! every pixel, and input arrives far faster than frames can be made.
//! This crate splits the work into two pieces:
//!
//! * the [`engine`], which cuts the pixel grid into disjoint strips of
//!   rows and renders them on as many threads as the machine has, and
//! * the [`scheduler`], which waits for a burst of input to go quiet,
//!   then renders the latest viewport once, never running more than one
//!   pass at a time.
//!
//! Windowing is left to the caller.  Feed viewport changes in through
//! [`RedrawScheduler::on_viewport_change`] and pull finished frames out
//! through [`RedrawScheduler::latest_frame`].

extern crate crossbeam;
extern crate image;
extern crate itertools;
extern crate num;
extern crate num_cpus;

pub mod config;
pub mod engine;
pub mod errors;
pub mod escape;
pub mod export;
pub mod frame;
pub mod input;
pub mod palette;
pub mod planes;
pub mod record;
pub mod scheduler;

pub use config::Config;
pub use engine::{Render, Renderer};
pub use frame::Frame;
pub use planes::{IntegralPlane, Pixel, PlaneMapper, Viewport};
pub use scheduler::RedrawScheduler;
