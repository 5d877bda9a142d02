// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Start-up settings.  Everything here is fixed for the life of the
//! process.

use std::time::Duration;

use crate::engine::Renderer;
use crate::errors::ConfigError;
use crate::planes::{IntegralPlane, Viewport};
use crate::scheduler::MAX_DEBOUNCE;

/// Default grid width.
pub const WIDTH: usize = 1280;
/// Default grid height.
pub const HEIGHT: usize = 800;
/// Default iteration cap.
pub const MAX_ITERATIONS: usize = 1000;
/// Default quiet period before a redraw.
pub const DEBOUNCE: Duration = Duration::from_millis(500);

/// Everything the explorer needs to know before it starts.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Config {
    /// The pixel grid.
    pub plane: IntegralPlane,
    /// The iteration cap of the escape-time function.
    pub max_iterations: usize,
    /// The quiet period the scheduler waits for.
    pub debounce: Duration,
    /// Where the view starts.
    pub initial: Viewport,
    /// Workers per render pass; `None` uses every hardware thread.
    pub threads: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            plane: IntegralPlane(WIDTH, HEIGHT),
            max_iterations: MAX_ITERATIONS,
            debounce: DEBOUNCE,
            initial: Viewport::default(),
            threads: None,
        }
    }
}

impl Config {
    /// Checks the settings are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.plane.is_empty() {
            return Err(ConfigError::EmptyPlane(self.plane.0, self.plane.1));
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::IterationLimit);
        }
        if self.debounce == Duration::from_millis(0) {
            return Err(ConfigError::ZeroDebounce);
        }
        if self.debounce > MAX_DEBOUNCE {
            return Err(ConfigError::DebounceTooLong(
                MAX_DEBOUNCE.as_millis(),
                self.debounce.as_millis(),
            ));
        }
        if self.threads == Some(0) {
            return Err(ConfigError::ZeroThreads);
        }
        Ok(())
    }

    /// A renderer for this configuration.
    pub fn renderer(&self) -> Result<Renderer, ConfigError> {
        self.validate()?;
        let renderer = Renderer::new(self.plane, self.max_iterations);
        Ok(match self.threads {
            Some(threads) => renderer.with_threads(threads),
            None => renderer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(Config::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_unusable_settings() {
        let mut config = Config::default();
        config.plane = IntegralPlane(0, 10);
        assert_eq!(config.validate(), Err(ConfigError::EmptyPlane(0, 10)));

        let mut config = Config::default();
        config.max_iterations = 0;
        assert_eq!(config.validate(), Err(ConfigError::IterationLimit));

        let mut config = Config::default();
        config.debounce = Duration::from_millis(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroDebounce));

        let mut config = Config::default();
        config.debounce = Duration::from_secs(u64::MAX);
        assert!(match config.validate() {
            Err(ConfigError::DebounceTooLong(_, _)) => true,
            _ => false,
        });
        config.debounce = MAX_DEBOUNCE;
        assert_eq!(config.validate(), Ok(()));

        let mut config = Config::default();
        config.threads = Some(0);
        assert!(config.renderer().is_err());
    }

    #[test]
    fn renderer_follows_the_settings() {
        let mut config = Config::default();
        config.plane = IntegralPlane(32, 24);
        config.threads = Some(3);
        let renderer = config.renderer().unwrap();
        assert_eq!(renderer.plane(), IntegralPlane(32, 24));
        assert_eq!(renderer.threads(), 3);
        assert_eq!(renderer.limit(), MAX_ITERATIONS);
    }
}
