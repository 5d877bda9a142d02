// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Turns user input into viewport changes.
//!
//! Discrete events (wheel zoom, explicit pans) are applied as they
//! arrive.  Arrow keys are different: while one is held the view keeps
//! drifting, so the controller tracks which keys are down and samples
//! them once per control-loop tick.  Every mutation goes through the
//! controller, which clamps the zoom before it can reach the viewport.

use num::Complex;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use crate::planes::Viewport;

/// Each zoom step multiplies or divides the zoom by this much.
pub const ZOOM_STEP: f64 = 1.1;
/// One pan step moves the view by this fraction of the zoomed unit.
pub const PAN_STEP: f64 = 0.1;
/// The widest view the controller allows.
pub const MIN_ZOOM: f64 = 1e-3;
/// Past this, `f64` runs out of precision.
pub const MAX_ZOOM: f64 = 1e13;

/// A discrete input event.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Event {
    /// Wheel forward.
    ZoomIn,
    /// Wheel back.
    ZoomOut,
    /// Move the view by `dx`, `dy` pan steps.
    Pan {
        /// Horizontal steps; positive moves right.
        dx: f64,
        /// Vertical steps; positive moves down.
        dy: f64,
    },
    /// The window changed size.
    Resize {
        /// New width.
        width: usize,
        /// New height.
        height: usize,
    },
    /// The user asked to quit.
    Close,
}

/// The keys that pan while held.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Key {
    /// Pan left.
    Left,
    /// Pan right.
    Right,
    /// Pan up.
    Up,
    /// Pan down.
    Down,
}

impl FromStr for Key {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(Key::Left),
            "right" => Ok(Key::Right),
            "up" => Ok(Key::Up),
            "down" => Ok(Key::Down),
            other => Err(format!("unknown key '{}'", other)),
        }
    }
}

/// Which pan keys are down right now.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct HeldKeys {
    left: bool,
    right: bool,
    up: bool,
    down: bool,
}

impl HeldKeys {
    fn slot(&mut self, key: Key) -> &mut bool {
        match key {
            Key::Left => &mut self.left,
            Key::Right => &mut self.right,
            Key::Up => &mut self.up,
            Key::Down => &mut self.down,
        }
    }

    /// Marks `key` as held.
    pub fn press(&mut self, key: Key) {
        *self.slot(key) = true;
    }

    /// Marks `key` as released.
    pub fn release(&mut self, key: Key) {
        *self.slot(key) = false;
    }

    /// The net pan direction, in steps, of the keys held.
    pub fn direction(&self) -> (f64, f64) {
        let axis = |neg: bool, pos: bool| (pos as i8 - neg as i8) as f64;
        (axis(self.left, self.right), axis(self.up, self.down))
    }
}

/// Owns the live viewport and applies input to it.
#[derive(Debug)]
pub struct Controller {
    viewport: Viewport,
    held: HeldKeys,
    closed: bool,
}

impl Controller {
    /// Starts from `viewport`.
    pub fn new(viewport: Viewport) -> Self {
        Controller {
            viewport,
            held: HeldKeys::default(),
            closed: false,
        }
    }

    /// The live viewport.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// True once a `Close` event has been seen.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Applies one event.  Returns true if the viewport changed.
    pub fn apply(&mut self, event: &Event) -> bool {
        match *event {
            Event::ZoomIn => self.zoom_to(self.viewport.zoom() * ZOOM_STEP),
            Event::ZoomOut => self.zoom_to(self.viewport.zoom() / ZOOM_STEP),
            Event::Pan { dx, dy } => self.pan(dx, dy),
            Event::Resize { width, height } => {
                debug!(width, height, "resize ignored; the pixel grid is fixed");
                false
            }
            Event::Close => {
                self.closed = true;
                false
            }
        }
    }

    /// Marks a pan key as held.
    pub fn press(&mut self, key: Key) {
        self.held.press(key);
    }

    /// Marks a pan key as released.
    pub fn release(&mut self, key: Key) {
        self.held.release(key);
    }

    /// Samples the held keys once.  Returns true if the viewport changed.
    pub fn tick(&mut self) -> bool {
        let (dx, dy) = self.held.direction();
        self.pan(dx, dy)
    }

    fn zoom_to(&mut self, zoom: f64) -> bool {
        let zoom = num::clamp(zoom, MIN_ZOOM, MAX_ZOOM);
        if zoom == self.viewport.zoom() {
            return false;
        }
        self.replace(self.viewport.with_zoom(zoom))
    }

    fn pan(&mut self, dx: f64, dy: f64) -> bool {
        if dx == 0.0 && dy == 0.0 {
            return false;
        }
        let step = PAN_STEP / self.viewport.zoom();
        let center = self.viewport.center() + Complex::new(dx * step, dy * step);
        self.replace(self.viewport.with_center(center))
    }

    fn replace(&mut self, next: Result<Viewport, crate::errors::ViewportError>) -> bool {
        match next {
            Ok(viewport) => {
                self.viewport = viewport;
                true
            }
            Err(err) => {
                debug!(error = %err, "input ignored");
                false
            }
        }
    }
}

/// One line of a scripted input session.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Command {
    /// A discrete event.
    Event(Event),
    /// A pan key went down.
    Press(Key),
    /// A pan key came up.
    Release(Key),
    /// One control-loop tick.
    Tick,
    /// Keep ticking for this long.
    Wait(Duration),
}

fn number<T: FromStr>(word: Option<&str>, what: &str) -> Result<T, String> {
    word.ok_or_else(|| format!("missing {}", what))?
        .parse()
        .map_err(|_| format!("could not parse {}", what))
}

impl FromStr for Command {
    type Err = String;

    /// Parses `zoom-in`, `zoom-out`, `pan DX DY`, `press KEY`,
    /// `release KEY`, `tick`, `wait MS`, `resize W H` or `close`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let verb = words.next().ok_or_else(|| "empty command".to_string())?;
        let command = match verb {
            "zoom-in" => Command::Event(Event::ZoomIn),
            "zoom-out" => Command::Event(Event::ZoomOut),
            "pan" => Command::Event(Event::Pan {
                dx: number(words.next(), "pan dx")?,
                dy: number(words.next(), "pan dy")?,
            }),
            "resize" => Command::Event(Event::Resize {
                width: number(words.next(), "width")?,
                height: number(words.next(), "height")?,
            }),
            "close" => Command::Event(Event::Close),
            "press" => Command::Press(number(words.next(), "key")?),
            "release" => Command::Release(number(words.next(), "key")?),
            "tick" => Command::Tick,
            "wait" => Command::Wait(Duration::from_millis(number(words.next(), "milliseconds")?)),
            other => return Err(format!("unknown command '{}'", other)),
        };
        match words.next() {
            Some(extra) => Err(format!("unexpected '{}' after {}", extra, verb)),
            None => Ok(command),
        }
    }
}
