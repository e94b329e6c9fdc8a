//! Benchmarks for planning, collection, and FFmpeg decoding.
//!
//! Run with: cargo bench
//!
//! The FFmpeg benchmarks require fixture files from
//! `tests/fixtures/generate_fixtures.sh` and are skipped without them.

use std::{path::Path, time::Duration};

use criterion::{BenchmarkId, Criterion};
use ffmpeg_next::util::log::Level as LogLevel;
use filmstrip::{
    CollectOptions, DecodeOptions, FfmpegFrameDecoder, FilmstripError, FrameCollector,
    FrameDecoder, FrameHandler, FrameReport, RequestPlan, compose_strip,
};
use image::{DynamicImage, RgbImage};
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tokio::runtime::Runtime;

const SAMPLE_VIDEO: &str = "tests/fixtures/sample_video.mp4";

/// Answers every request on the rayon pool with a blank preview.
struct InstantDecoder;

impl FrameDecoder for InstantDecoder {
    fn load_duration(&self) -> Result<f64, FilmstripError> {
        Ok(120.0)
    }

    fn generate_images(
        &self,
        times: &[f64],
        options: &DecodeOptions,
        handler: FrameHandler,
    ) -> Result<(), FilmstripError> {
        let (width, height) = (options.maximum_width, options.maximum_height);
        let times = times.to_vec();
        rayon::spawn(move || {
            times.into_par_iter().for_each(|time| {
                let image = DynamicImage::ImageRgb8(RgbImage::new(width, height));
                (*handler)(FrameReport::succeeded(time, time, image));
            });
        });
        Ok(())
    }

    fn cancel_all(&self) {}
}

fn benchmark_planning(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("plan");
    for duration in [20.0, 95.0, 7200.0] {
        group.bench_with_input(
            BenchmarkId::from_parameter(duration),
            &duration,
            |bencher, &duration| {
                bencher.iter(|| RequestPlan::for_duration(std::hint::black_box(duration)));
            },
        );
    }
    group.finish();

    let plan = RequestPlan::for_duration(120.0);
    criterion.bench_function("recover 60 indices", |bencher| {
        bencher.iter(|| {
            plan.timestamps()
                .iter()
                .map(|&time| plan.index_for(time + 0.3))
                .sum::<usize>()
        });
    });
}

fn benchmark_collection(criterion: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let collector = FrameCollector::new(InstantDecoder);

    let mut group = criterion.benchmark_group("collect");
    for duration in [20.0, 60.0, 120.0] {
        let plan = RequestPlan::for_duration(duration);
        group.bench_with_input(
            BenchmarkId::from_parameter(plan.len()),
            &plan,
            |bencher, plan| {
                bencher.iter(|| runtime.block_on(collector.collect(plan)).unwrap());
            },
        );
    }
    group.finish();

    let frames = runtime
        .block_on(collector.collect(&RequestPlan::for_duration(120.0)))
        .unwrap();
    criterion.bench_function("compose 60-frame sheet", |bencher| {
        bencher.iter(|| compose_strip(&frames, 10).unwrap());
    });
}

fn benchmark_ffmpeg_generation(criterion: &mut Criterion) {
    ffmpeg_next::util::log::set_level(LogLevel::Error);

    if !Path::new(SAMPLE_VIDEO).exists() {
        eprintln!("Skipping benchmark: fixture not found");
        return;
    }

    let runtime = Runtime::new().unwrap();
    let collector = FrameCollector::new(FfmpegFrameDecoder::new(SAMPLE_VIDEO));
    let options = CollectOptions::new();

    let mut group = criterion.benchmark_group("ffmpeg");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(10);
    group.bench_function("generate default strip", |bencher| {
        bencher.iter(|| runtime.block_on(collector.generate(None, &options)).unwrap());
    });
    group.bench_function("load duration", |bencher| {
        bencher.iter(|| collector.decoder().load_duration().unwrap());
    });
    group.finish();
}

criterion::criterion_group!(
    benches,
    benchmark_planning,
    benchmark_collection,
    benchmark_ffmpeg_generation,
);

criterion::criterion_main!(benches);
