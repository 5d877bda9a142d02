// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Headless driver for the explorer.  Reads input commands from a
//! script or stdin, feeds them to the redraw scheduler, and "presents"
//! frames by logging them at the display refresh rate.

use clap::{App, Arg, ArgMatches};
use failure::{format_err, Error};
use num::Complex;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::str::FromStr;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use mandelbrot::input::{Command, Controller, Event};
use mandelbrot::{export, record, Config, IntegralPlane, RedrawScheduler, Viewport};

/// Splits `s` at the first `separator` and parses both halves.
fn parse_pair<T: FromStr>(s: &str, separator: char) -> Option<(T, T)> {
    let index = s.find(separator)?;
    let left = s[..index].parse().ok()?;
    let right = s[index + 1..].parse().ok()?;
    Some((left, right))
}

fn parse_complex(s: &str) -> Option<Complex<f64>> {
    parse_pair(s, ',').map(|(re, im)| Complex::new(re, im))
}

fn validate_pair<T: FromStr>(s: &str, separator: char, err: &str) -> Result<(), String> {
    parse_pair::<T>(s, separator)
        .map(|_| ())
        .ok_or_else(|| err.to_string())
}

fn validate_range<T: FromStr + Ord>(
    s: &str,
    low: T,
    high: T,
    not_a_number: &str,
    out_of_range: &str,
) -> Result<(), String> {
    match s.parse::<T>() {
        Ok(value) if value >= low && value <= high => Ok(()),
        Ok(_) => Err(out_of_range.to_string()),
        Err(_) => Err(not_a_number.to_string()),
    }
}

fn validate_positive(s: &str, err: &str) -> Result<(), String> {
    match f64::from_str(s) {
        Ok(v) if v.is_finite() && v > 0.0 => Ok(()),
        _ => Err(err.to_string()),
    }
}

const SIZE: &str = "size";
const ITERATIONS: &str = "iterations";
const DEBOUNCE: &str = "debounce";
const THREADS: &str = "threads";
const ZOOM: &str = "zoom";
const CENTER: &str = "center";
const RESUME: &str = "resume";
const SCRIPT: &str = "script";
const OUTPUT: &str = "output";
const COORDINATES: &str = "coordinates";

const MAX_THREADS: usize = 256;

// Roughly one display refresh.
const REFRESH: Duration = Duration::from_millis(16);
const SETTLE_TIMEOUT: Duration = Duration::from_secs(120);

fn args<'a>() -> ArgMatches<'a> {
    App::new("mandel")
        .version("0.1.0")
        .author("Elf M. Sternberg <elf.sternberg@gmail.com>")
        .about("Interactive Mandelbrot explorer")
        .arg(
            Arg::with_name(SIZE)
                .long(SIZE)
                .short("s")
                .takes_value(true)
                .default_value("1280x800")
                .validator(|s| validate_pair::<usize>(&s, 'x', "Could not parse image size"))
                .help("Size of the pixel grid"),
        )
        .arg(
            Arg::with_name(ITERATIONS)
                .long(ITERATIONS)
                .short("i")
                .takes_value(true)
                .default_value("1000")
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        1_000_000,
                        "Could not parse iteration count",
                        "Iteration count must be between 1 and 1000000",
                    )
                })
                .help("Iteration cap of the escape-time function"),
        )
        .arg(
            Arg::with_name(DEBOUNCE)
                .long(DEBOUNCE)
                .short("d")
                .takes_value(true)
                .default_value("500")
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        60_000,
                        "Could not parse debounce window",
                        "Debounce window must be between 1 and 60000 ms",
                    )
                })
                .help("Quiet period, in milliseconds, before a redraw"),
        )
        .arg(
            Arg::with_name(THREADS)
                .long(THREADS)
                .short("t")
                .takes_value(true)
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        MAX_THREADS,
                        "Could not parse thread count",
                        &format!("Thread count must be between 1 and {}", MAX_THREADS),
                    )
                })
                .help("Workers per render pass [default: one per hardware thread]"),
        )
        .arg(
            Arg::with_name(ZOOM)
                .long(ZOOM)
                .short("z")
                .takes_value(true)
                .default_value("1.0")
                .validator(|s| validate_positive(&s, "Zoom must be a number greater than zero"))
                .help("Initial zoom"),
        )
        .arg(
            Arg::with_name(CENTER)
                .long(CENTER)
                .short("c")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("0.0,0.0")
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse center point"))
                .help("Initial center of the view, as re,im"),
        )
        .arg(
            Arg::with_name(RESUME)
                .long(RESUME)
                .short("r")
                .takes_value(true)
                .help("Start from a saved coordinate record (overrides --zoom and --center)"),
        )
        .arg(
            Arg::with_name(SCRIPT)
                .long(SCRIPT)
                .takes_value(true)
                .help("Read input commands from this file instead of stdin"),
        )
        .arg(
            Arg::with_name(OUTPUT)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .help("Export the last frame to this image file (.bmp, .png, .ppm)"),
        )
        .arg(
            Arg::with_name(COORDINATES)
                .long(COORDINATES)
                .takes_value(true)
                .default_value("last_coordinates.txt")
                .help("Where to save the final zoom and pan"),
        )
        .get_matches()
}

fn value<T: FromStr>(matches: &ArgMatches, name: &str) -> Result<T, Error> {
    let raw = matches
        .value_of(name)
        .ok_or_else(|| format_err!("missing --{}", name))?;
    T::from_str(raw).map_err(|_| format_err!("could not parse --{} '{}'", name, raw))
}

fn config(matches: &ArgMatches) -> Result<Config, Error> {
    let size = matches.value_of(SIZE).unwrap_or_default();
    let (width, height) = parse_pair::<usize>(size, 'x')
        .ok_or_else(|| format_err!("could not parse --size '{}'", size))?;

    let initial = match matches.value_of(RESUME) {
        Some(path) => record::load_coordinates(path)?,
        None => {
            let center = matches.value_of(CENTER).unwrap_or_default();
            let center = parse_complex(center)
                .ok_or_else(|| format_err!("could not parse --center '{}'", center))?;
            Viewport::new(value(matches, ZOOM)?, center)?
        }
    };

    let threads = match matches.value_of(THREADS) {
        Some(_) => Some(value(matches, THREADS)?),
        None => None,
    };

    let config = Config {
        plane: IntegralPlane(width, height),
        max_iterations: value(matches, ITERATIONS)?,
        debounce: Duration::from_millis(value(matches, DEBOUNCE)?),
        initial,
        threads,
    };
    config.validate()?;
    Ok(config)
}

/// Stands in for the display: uploads (here, logs) each new frame.
#[derive(Default)]
struct Presenter {
    presented: u64,
}

impl Presenter {
    fn present(&mut self, scheduler: &RedrawScheduler) {
        if let Some(frame) = scheduler.take_ready_frame() {
            self.presented += 1;
            info!(
                generation = frame.generation,
                zoom = frame.viewport.zoom(),
                re = frame.viewport.center().re,
                im = frame.viewport.center().im,
                "frame presented"
            );
        }
    }
}

/// The control loop: owns the live viewport and never waits on a
/// render.
struct Session {
    controller: Controller,
    presenter: Presenter,
}

impl Session {
    fn tick(&mut self, scheduler: &RedrawScheduler) {
        if self.controller.tick() {
            scheduler.on_viewport_change(self.controller.viewport());
        }
        self.presenter.present(scheduler);
    }

    fn wait(&mut self, scheduler: &RedrawScheduler, duration: Duration) {
        let until = Instant::now() + duration;
        loop {
            self.tick(scheduler);
            let now = Instant::now();
            if now >= until {
                break;
            }
            thread::sleep(REFRESH.min(until - now));
        }
    }

    fn run<R: BufRead>(&mut self, scheduler: &RedrawScheduler, input: R) -> Result<(), Error> {
        for (number, line) in input.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let command = line
                .parse::<Command>()
                .map_err(|err| format_err!("line {}: {}", number + 1, err))?;
            debug!(?command, "input");
            match command {
                Command::Event(event) => {
                    if self.controller.apply(&event) {
                        scheduler.on_viewport_change(self.controller.viewport());
                    }
                    if event == Event::Close {
                        break;
                    }
                }
                Command::Press(key) => self.controller.press(key),
                Command::Release(key) => self.controller.release(key),
                Command::Tick => self.tick(scheduler),
                Command::Wait(duration) => self.wait(scheduler, duration),
            }
        }
        Ok(())
    }
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let matches = args();
    let config = config(&matches)?;
    let renderer = config.renderer()?;
    info!(
        width = config.plane.0,
        height = config.plane.1,
        iterations = config.max_iterations,
        threads = renderer.threads(),
        "starting"
    );

    let scheduler = RedrawScheduler::spawn(renderer, config.initial, config.debounce)?;
    let mut session = Session {
        controller: Controller::new(config.initial),
        presenter: Presenter::default(),
    };
    match matches.value_of(SCRIPT) {
        Some(path) => session.run(&scheduler, BufReader::new(File::open(path)?))?,
        None => {
            let stdin = io::stdin();
            session.run(&scheduler, stdin.lock())?;
        }
    }

    if !scheduler.wait_until_idle(SETTLE_TIMEOUT) {
        warn!("gave up waiting for the last render");
    }
    session.presenter.present(&scheduler);
    let stats = scheduler.stats();
    let frame = scheduler.shutdown();
    let viewport = session.controller.viewport();

    if let Some(path) = matches.value_of(COORDINATES) {
        if let Err(err) = record::save_coordinates(path, &viewport) {
            warn!(error = %err, path, "could not save coordinates");
        }
    }
    if let (Some(path), Some(frame)) = (matches.value_of(OUTPUT), frame.as_ref()) {
        if let Err(err) = export::write_image(path, frame) {
            warn!(error = %err, path, "could not export image");
        }
    }

    println!("renders: {}", stats.renders);
    println!("presented: {}", session.presenter.presented);
    println!(
        "zoom: {} center: {},{}",
        viewport.zoom(),
        viewport.center().re,
        viewport.center().im
    );
    Ok(())
}
