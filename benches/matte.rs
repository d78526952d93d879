use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{ImageBuffer, Rgb};

use greenkey::{
    composite::{composite, Overflow},
    matte::{FrameMatter, MatteConfig},
    video::Frame,
};

fn studio_frame(width: u32, height: u32) -> Frame {
    Frame::new(ImageBuffer::from_fn(width, height, |x, y| {
        let dx = x as i64 - width as i64 / 2;
        let dy = y as i64 - height as i64 / 2;
        if dx * dx + dy * dy < (height as i64 / 3).pow(2) {
            Rgb([200, 150, 120])
        } else {
            Rgb([30, 200, 60])
        }
    }))
}

fn bench_matte(c: &mut Criterion) {
    let frame = studio_frame(1280, 720);
    let refined = FrameMatter::new(MatteConfig::default());
    let raw = FrameMatter::new(MatteConfig::unrefined());

    c.bench_function("matte_720p_refined", |b| b.iter(|| refined.extract(black_box(&frame))));
    c.bench_function("matte_720p_unrefined", |b| b.iter(|| raw.extract(black_box(&frame))));

    let matte = refined.extract(&frame);
    let background = Frame::new_filled(1280, 720, [0, 0, 255]);
    c.bench_function("composite_720p", |b| {
        b.iter(|| composite(black_box(&matte.foreground), &matte.mask, &background, Overflow::Wrapping))
    });
}

criterion_group!(benches, bench_matte);
criterion_main!(benches);
