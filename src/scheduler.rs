// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The redraw scheduler.
//!
//! Input arrives as a stream of "the viewport changed" signals, often
//! dozens a second while a key is held or the wheel is spinning.  A
//! full render is far too expensive to run for each one, so the
//! scheduler waits for the input to go quiet before rendering:
//!
//! * In `Idle`, a change arms a quiet-period timer (`PendingDebounce`).
//! * In `PendingDebounce`, every further change restarts the timer, so
//!   an unbroken burst never renders until it stops.
//! * When the timer runs out the scheduler takes a snapshot of the
//!   latest viewport and starts a pass (`Rendering`).
//! * Changes during a pass are remembered but never interrupt it.  When
//!   the pass completes, a remembered change re-arms the timer; with
//!   none the scheduler goes back to `Idle`.
//!
//! The scheduler starts out pending with an expired timer, so the first
//! frame renders immediately and unconditionally, using the initial
//! viewport.
//!
//! [`RedrawState`] is the bare state machine, driven by explicit
//! instants.  [`RedrawScheduler`] runs it on one persistent background
//! thread, guarded by a single mutex, and sleeps on a condition
//! variable with a timeout so a new signal can wake it early.  The
//! render itself runs outside the lock; signalling a change never waits
//! for a pass.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, debug_span, error, info, trace};

use crate::engine::Render;
use crate::errors::{RenderError, SchedulerError};
use crate::frame::Frame;
use crate::planes::Viewport;

/// The longest quiet period the scheduler will wait.  Longer windows
/// are cut down to this.
pub const MAX_DEBOUNCE: Duration = Duration::from_secs(24 * 60 * 60);

/// Where the scheduler is in its cycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Nothing to do until the viewport changes.
    Idle,
    /// Waiting for input to stay quiet until `deadline`.
    PendingDebounce {
        /// When the quiet period ends.
        deadline: Instant,
    },
    /// A render pass is in flight.
    Rendering,
}

/// What the driver of a [`RedrawState`] should do next.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Action {
    /// Sleep until something is signalled.
    Wait,
    /// Sleep until `Instant`, or until something is signalled.
    WaitUntil(Instant),
    /// Start render pass number `generation` on this snapshot.
    Render {
        /// The snapshot to render.
        viewport: Viewport,
        /// The pass number, counting from 1.
        generation: u64,
    },
}

/// Counters describing what the scheduler has done so far.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Viewport changes signalled.
    pub signals: u64,
    /// Render passes started.
    pub renders: u64,
    /// Render passes that produced a frame.
    pub completed: u64,
    /// Render passes that failed.
    pub failed: u64,
}

/// The debounce and coalesce state machine, without any threads.
#[derive(Debug)]
pub struct RedrawState {
    phase: Phase,
    debounce: Duration,
    viewport: Viewport,
    // The startup pass renders this snapshot no matter what arrives
    // before it begins.
    startup: Option<Viewport>,
    changed_during_render: bool,
    stats: SchedulerStats,
}

impl RedrawState {
    /// A machine whose first pass is due at `now`, rendering `initial`.
    pub fn new(initial: Viewport, debounce: Duration, now: Instant) -> Self {
        RedrawState {
            phase: Phase::PendingDebounce { deadline: now },
            debounce: debounce.min(MAX_DEBOUNCE),
            viewport: initial,
            startup: Some(initial),
            changed_during_render: false,
            stats: SchedulerStats::default(),
        }
    }

    /// The current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The most recently signalled viewport.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// The counters.
    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// True when nothing is pending or in flight.
    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    // An instant too far out to represent means the window never
    // closes on its own; fall back to rendering right away.
    fn deadline(&self, now: Instant) -> Instant {
        now.checked_add(self.debounce).unwrap_or(now)
    }

    /// Records that the viewport changed to `viewport` at `now`.
    pub fn on_change(&mut self, viewport: Viewport, now: Instant) {
        self.viewport = viewport;
        self.stats.signals += 1;
        match self.phase {
            Phase::Idle => {
                self.phase = Phase::PendingDebounce {
                    deadline: self.deadline(now),
                };
            }
            Phase::PendingDebounce { .. } if self.startup.is_some() => {
                self.changed_during_render = true;
            }
            Phase::PendingDebounce { .. } => {
                self.phase = Phase::PendingDebounce {
                    deadline: self.deadline(now),
                };
            }
            Phase::Rendering => {
                self.changed_during_render = true;
            }
        }
    }

    /// Decides what to do at `now`.  Returns `Action::Render` exactly
    /// once per pass; the machine is then `Rendering` until
    /// `on_complete` is called.
    pub fn poll(&mut self, now: Instant) -> Action {
        match self.phase {
            Phase::Idle | Phase::Rendering => Action::Wait,
            Phase::PendingDebounce { deadline } if now < deadline => Action::WaitUntil(deadline),
            Phase::PendingDebounce { .. } => {
                self.phase = Phase::Rendering;
                self.stats.renders += 1;
                let viewport = self.startup.take().unwrap_or(self.viewport);
                Action::Render {
                    viewport,
                    generation: self.stats.renders,
                }
            }
        }
    }

    /// Records the end of the pass in flight.  `succeeded` only feeds
    /// the counters; a failed pass re-arms exactly like a good one.
    pub fn on_complete(&mut self, succeeded: bool, now: Instant) {
        if self.phase != Phase::Rendering {
            return;
        }
        if succeeded {
            self.stats.completed += 1;
        } else {
            self.stats.failed += 1;
        }
        self.phase = if self.changed_during_render {
            self.changed_during_render = false;
            Phase::PendingDebounce {
                deadline: self.deadline(now),
            }
        } else {
            Phase::Idle
        };
    }
}

struct Inner {
    machine: RedrawState,
    latest: Option<Arc<Frame>>,
    presented: u64,
    running: bool,
}

struct Shared {
    inner: Mutex<Inner>,
    // Wakes the scheduler thread: new signals and shutdown.
    wake: Condvar,
    // Wakes observers: published frames and returns to idle.
    settled: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Runs a [`RedrawState`] on a background thread, driving a renderer.
pub struct RedrawScheduler {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl RedrawScheduler {
    /// Starts the scheduler thread.  The first pass, of `initial`,
    /// begins right away.
    pub fn spawn<R>(
        renderer: R,
        initial: Viewport,
        debounce: Duration,
    ) -> Result<Self, SchedulerError>
    where
        R: Render + 'static,
    {
        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner {
                machine: RedrawState::new(initial, debounce, Instant::now()),
                latest: None,
                presented: 0,
                running: true,
            }),
            wake: Condvar::new(),
            settled: Condvar::new(),
        });
        let worker = shared.clone();
        let handle = thread::Builder::new()
            .name("redraw".to_string())
            .spawn(move || run(&worker, renderer))
            .map_err(SchedulerError::Spawn)?;
        info!(debounce_ms = debounce.as_millis() as u64, "redraw scheduler started");
        Ok(RedrawScheduler {
            shared,
            handle: Some(handle),
        })
    }

    /// The sole ingress: tells the scheduler the viewport is now
    /// `viewport`.  Returns immediately.
    pub fn on_viewport_change(&self, viewport: Viewport) {
        let mut inner = self.shared.lock();
        inner.machine.on_change(viewport, Instant::now());
        trace!(phase = ?inner.machine.phase(), "viewport change signalled");
        self.shared.wake.notify_one();
    }

    /// The most recent completed frame, if any.  Never waits for a
    /// render.
    pub fn latest_frame(&self) -> Option<Arc<Frame>> {
        self.shared.lock().latest.clone()
    }

    /// The most recent completed frame, but only if it is newer than the
    /// last frame this method returned.
    pub fn take_ready_frame(&self) -> Option<Arc<Frame>> {
        let mut inner = self.shared.lock();
        let frame = inner.latest.clone()?;
        if frame.generation <= inner.presented {
            return None;
        }
        inner.presented = frame.generation;
        Some(frame)
    }

    /// Blocks until nothing is pending or in flight, or until `timeout`
    /// elapses.  Returns true if the scheduler settled.
    pub fn wait_until_idle(&self, timeout: Duration) -> bool {
        let inner = self.shared.lock();
        let (inner, _) = self
            .shared
            .settled
            .wait_timeout_while(inner, timeout, |inner| inner.running && !inner.machine.is_idle())
            .unwrap_or_else(PoisonError::into_inner);
        inner.machine.is_idle()
    }

    /// The counters so far.
    pub fn stats(&self) -> SchedulerStats {
        self.shared.lock().machine.stats()
    }

    /// The phase right now.
    pub fn phase(&self) -> Phase {
        self.shared.lock().machine.phase()
    }

    /// Stops the scheduler thread, letting a pass in flight finish, and
    /// returns the last completed frame.
    pub fn shutdown(mut self) -> Option<Arc<Frame>> {
        self.stop();
        self.latest_frame()
    }

    fn stop(&mut self) {
        {
            let mut inner = self.shared.lock();
            inner.running = false;
        }
        self.shared.wake.notify_all();
        self.shared.settled.notify_all();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("redraw thread panicked");
            }
        }
    }
}

impl Drop for RedrawScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run<R: Render>(shared: &Shared, mut renderer: R) {
    loop {
        let (viewport, generation) = {
            let mut inner = shared.lock();
            loop {
                if !inner.running {
                    debug!("redraw scheduler stopping");
                    return;
                }
                let now = Instant::now();
                match inner.machine.poll(now) {
                    Action::Wait => {
                        inner = shared.wake.wait(inner).unwrap_or_else(PoisonError::into_inner);
                    }
                    Action::WaitUntil(deadline) => {
                        let timeout = deadline.saturating_duration_since(now);
                        inner = shared
                            .wake
                            .wait_timeout(inner, timeout)
                            .unwrap_or_else(PoisonError::into_inner)
                            .0;
                    }
                    Action::Render {
                        viewport,
                        generation,
                    } => break (viewport, generation),
                }
            }
        };

        let span = debug_span!("render", generation);
        let _entered = span.enter();
        let result = panic::catch_unwind(AssertUnwindSafe(|| renderer.render(&viewport)))
            .unwrap_or(Err(RenderError::WorkerPanicked));

        let superseded = {
            let mut inner = shared.lock();
            inner.machine.on_complete(result.is_ok(), Instant::now());
            match result {
                Ok(mut frame) => {
                    frame.generation = generation;
                    let newer = inner
                        .latest
                        .as_ref()
                        .map_or(true, |latest| latest.generation < generation);
                    if newer {
                        debug!(zoom = viewport.zoom(), "frame published");
                        inner.latest.replace(Arc::new(frame))
                    } else {
                        None
                    }
                }
                Err(err) => {
                    error!(error = %err, "render pass failed");
                    None
                }
            }
        };
        shared.settled.notify_all();

        if let Some(old) = superseded {
            if let Ok(frame) = Arc::try_unwrap(old) {
                renderer.recycle(frame.pixels);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num::Complex;

    const WINDOW: Duration = Duration::from_millis(500);

    fn zoomed(zoom: f64) -> Viewport {
        Viewport::new(zoom, Complex::new(0.0, 0.0)).unwrap()
    }

    fn ms(start: Instant, millis: u64) -> Instant {
        start + Duration::from_millis(millis)
    }

    /// Drives the machine through the startup pass and back to idle.
    fn settled(start: Instant) -> RedrawState {
        let mut state = RedrawState::new(Viewport::default(), WINDOW, start);
        match state.poll(start) {
            Action::Render { .. } => {}
            other => panic!("expected the startup render, got {:?}", other),
        }
        state.on_complete(true, start);
        assert!(state.is_idle());
        state
    }

    #[test]
    fn startup_renders_immediately_with_the_initial_viewport() {
        let start = Instant::now();
        let initial = zoomed(2.5);
        let mut state = RedrawState::new(initial, WINDOW, start);
        assert_eq!(
            state.poll(start),
            Action::Render {
                viewport: initial,
                generation: 1
            }
        );
        assert_eq!(state.phase(), Phase::Rendering);
        state.on_complete(true, start);
        assert_eq!(state.phase(), Phase::Idle);
        assert_eq!(state.poll(ms(start, 10_000)), Action::Wait);
        assert_eq!(state.stats().renders, 1);
    }

    #[test]
    fn early_changes_do_not_delay_the_startup_pass() {
        let start = Instant::now();
        let mut state = RedrawState::new(Viewport::default(), WINDOW, start);
        state.on_change(zoomed(3.0), ms(start, 1));
        match state.poll(ms(start, 2)) {
            Action::Render { viewport, .. } => assert_eq!(viewport, Viewport::default()),
            other => panic!("expected a render, got {:?}", other),
        }
        state.on_complete(true, ms(start, 50));
        assert_eq!(
            state.phase(),
            Phase::PendingDebounce {
                deadline: ms(start, 550)
            }
        );
        assert_eq!(
            state.poll(ms(start, 550)),
            Action::Render {
                viewport: zoomed(3.0),
                generation: 2
            }
        );
    }

    #[test]
    fn a_burst_coalesces_into_one_trailing_render() {
        let start = Instant::now();
        let mut state = settled(start);
        let mut last = start;
        for k in 0..20u64 {
            last = ms(start, 100 + k * 50);
            state.on_change(zoomed(1.0 + k as f64), last);
            assert_eq!(state.poll(last), Action::WaitUntil(last + WINDOW));
        }
        assert_eq!(
            state.poll(last + WINDOW - Duration::from_millis(1)),
            Action::WaitUntil(last + WINDOW)
        );
        assert_eq!(
            state.poll(last + WINDOW),
            Action::Render {
                viewport: zoomed(20.0),
                generation: 2
            }
        );
        assert_eq!(state.stats().signals, 20);
        assert_eq!(state.stats().renders, 2);
    }

    #[test]
    fn each_change_restarts_rather_than_extends_the_window() {
        let start = Instant::now();
        let mut state = settled(start);
        state.on_change(zoomed(2.0), ms(start, 0));
        state.on_change(zoomed(2.0), ms(start, 400));
        assert_eq!(state.poll(ms(start, 500)), Action::WaitUntil(ms(start, 900)));
    }

    #[test]
    fn changes_during_a_render_rearm_once() {
        let start = Instant::now();
        let mut state = settled(start);
        state.on_change(zoomed(2.0), ms(start, 0));
        assert!(match state.poll(ms(start, 500)) {
            Action::Render { generation: 2, .. } => true,
            _ => false,
        });
        for k in 0..5u64 {
            state.on_change(zoomed(3.0 + k as f64), ms(start, 510 + k));
            assert_eq!(state.phase(), Phase::Rendering);
            assert_eq!(state.poll(ms(start, 510 + k)), Action::Wait);
        }
        state.on_complete(true, ms(start, 800));
        assert_eq!(state.poll(ms(start, 1299)), Action::WaitUntil(ms(start, 1300)));
        assert_eq!(
            state.poll(ms(start, 1300)),
            Action::Render {
                viewport: zoomed(7.0),
                generation: 3
            }
        );
        state.on_complete(true, ms(start, 1400));
        assert!(state.is_idle());
        assert_eq!(state.stats().renders, 3);
    }

    #[test]
    fn rearm_uses_the_viewport_at_render_time() {
        let start = Instant::now();
        let mut state = settled(start);
        state.on_change(zoomed(2.0), ms(start, 0));
        state.poll(ms(start, 500));
        state.on_change(zoomed(4.0), ms(start, 600));
        state.on_complete(true, ms(start, 700));
        state.on_change(zoomed(8.0), ms(start, 800));
        match state.poll(ms(start, 1300)) {
            Action::Render { viewport, .. } => assert_eq!(viewport, zoomed(8.0)),
            other => panic!("expected a render, got {:?}", other),
        }
    }

    #[test]
    fn failed_passes_still_complete_the_cycle() {
        let start = Instant::now();
        let mut state = RedrawState::new(Viewport::default(), WINDOW, start);
        state.poll(start);
        state.on_complete(false, start);
        assert!(state.is_idle());
        assert_eq!(state.stats().failed, 1);
        assert_eq!(state.stats().completed, 0);
    }

    #[test]
    fn an_enormous_window_is_capped() {
        let start = Instant::now();
        let forever = Duration::from_secs(u64::MAX);
        let mut state = RedrawState::new(Viewport::default(), forever, start);
        state.poll(start);
        state.on_complete(true, start);
        state.on_change(zoomed(2.0), ms(start, 10));
        let deadline = ms(start, 10) + MAX_DEBOUNCE;
        assert_eq!(state.poll(ms(start, 10)), Action::WaitUntil(deadline));
    }

    #[test]
    fn stray_completion_is_ignored() {
        let start = Instant::now();
        let mut state = settled(start);
        state.on_complete(true, start);
        assert!(state.is_idle());
        assert_eq!(state.stats().completed, 1);
    }
}
