// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

#[macro_use]
extern crate criterion;

use criterion::Criterion;
use mandelbrot::engine::worker_count;
use mandelbrot::{IntegralPlane, Renderer, Viewport};
use num::Complex;

fn seahorse() -> Viewport {
    Viewport::new(40.0, Complex::new(-0.745, 0.11)).unwrap()
}

fn render_single(c: &mut Criterion) {
    let renderer = Renderer::new(IntegralPlane(320, 200), 500);
    c.bench_function("render 320x200 single", move |b| {
        b.iter(|| renderer.render_single(&seahorse()))
    });
}

fn render_parallel(c: &mut Criterion) {
    let renderer = Renderer::new(IntegralPlane(320, 200), 500);
    let threads = worker_count();
    c.bench_function("render 320x200 all workers", move |b| {
        b.iter(|| renderer.render_with(&seahorse(), threads))
    });
}

criterion_group!(benches, render_single, render_parallel);
criterion_main!(benches);
