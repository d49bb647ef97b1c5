// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the quire-document crate: composition of a small
// attachment list and thumbnailing of the resulting stream.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{Rgb, RgbImage};

use quire_core::{Attachment, EngineConfig};
use quire_document::{PageComposer, ThumbnailFormat, ThumbnailRenderer};

fn png_bytes(rgb: [u8; 3], width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb(rgb));
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut cursor, image::ImageFormat::Png)
        .expect("png encode");
    buffer
}

/// Benchmark composing three attachments (two images, one placeholder) into
/// one page stream — the hot path of every document build.
fn bench_compose(c: &mut Criterion) {
    let composer = PageComposer::new(EngineConfig::default());
    let attachments = vec![
        Attachment::image(png_bytes([200, 40, 40], 64, 96), 64, 96),
        Attachment::image(png_bytes([40, 200, 40], 96, 64), 96, 64),
        Attachment::unsupported("slides.key"),
    ];

    c.bench_function("compose (2 images + placeholder)", |b| {
        b.iter(|| {
            let bytes = composer.compose(black_box(&attachments)).unwrap();
            black_box(bytes);
        });
    });
}

/// Benchmark first-page thumbnailing of a composed stream.
fn bench_thumbnail(c: &mut Criterion) {
    let composer = PageComposer::new(EngineConfig::default());
    let stream = composer
        .compose(&[Attachment::image(png_bytes([20, 90, 200], 64, 96), 64, 96)])
        .unwrap();
    let renderer = ThumbnailRenderer::from_config(&EngineConfig::default());

    c.bench_function("thumbnail (first page, 120x150)", |b| {
        b.iter(|| {
            let thumb = renderer.render(black_box(&stream), ThumbnailFormat::Png);
            black_box(thumb);
        });
    });
}

criterion_group!(benches, bench_compose, bench_thumbnail);
criterion_main!(benches);
