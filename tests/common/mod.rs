//! A scripted in-memory decoder for exercising the collector.
//!
//! Every requested timestamp is answered from its own OS thread, in a
//! shuffled order derived from a seed, so reports race each other the way
//! a real decoder's worker threads do.

#![allow(dead_code)]

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use std::thread;
use std::time::Duration;

use filmstrip::{DecodeOptions, FilmstripError, FrameDecoder, FrameHandler, FrameReport};
use image::{DynamicImage, Rgb, RgbImage};

/// What the decoder does for one ordinal index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Script {
    /// Decode successfully at exactly the requested time.
    Succeed,
    /// Decode successfully but report a different settled time.
    SucceedAt(f64),
    /// Report a failure.
    Fail,
    /// Wait until cancelled, then report cancellation.
    Hang,
}

type ScriptFn = Box<dyn Fn(usize, f64) -> Script + Send + Sync>;

pub struct ScriptedDecoder {
    duration: Option<f64>,
    panic_on_duration: bool,
    reject_batch: bool,
    report_limit: Option<usize>,
    duplicate_reports: usize,
    seed: u64,
    script: ScriptFn,
    pub requested: AtomicUsize,
    pub batches: AtomicUsize,
    pub cancel_calls: AtomicUsize,
    pub last_options: std::sync::Mutex<Option<DecodeOptions>>,
    cancelled: Arc<AtomicBool>,
}

impl ScriptedDecoder {
    /// Every request succeeds.
    pub fn new() -> Self {
        Self {
            duration: Some(20.0),
            panic_on_duration: false,
            reject_batch: false,
            report_limit: None,
            duplicate_reports: 0,
            seed: 0x9E37_79B9_7F4A_7C15,
            script: Box::new(|_, _| Script::Succeed),
            requested: AtomicUsize::new(0),
            batches: AtomicUsize::new(0),
            cancel_calls: AtomicUsize::new(0),
            last_options: std::sync::Mutex::new(None),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_script<F>(mut self, script: F) -> Self
    where
        F: Fn(usize, f64) -> Script + Send + Sync + 'static,
    {
        self.script = Box::new(script);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed.max(1);
        self
    }

    pub fn with_duration(mut self, duration: Option<f64>) -> Self {
        self.duration = duration;
        self
    }

    /// Panic inside `load_duration`.
    pub fn panicking_on_duration(mut self) -> Self {
        self.panic_on_duration = true;
        self
    }

    /// Fail `generate_images` before scheduling anything.
    pub fn rejecting(mut self) -> Self {
        self.reject_batch = true;
        self
    }

    /// Only answer the first `limit` requests, then drop the handler.
    pub fn answering_only(mut self, limit: usize) -> Self {
        self.report_limit = Some(limit);
        self
    }

    /// Send `count` extra reports after every request has been answered.
    pub fn with_duplicate_reports(mut self, count: usize) -> Self {
        self.duplicate_reports = count;
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// A tiny frame whose first red byte records the ordinal index.
pub fn tagged_image(index: usize) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 2, Rgb([index as u8, 0, 0])))
}

/// Read back the tag written by [`tagged_image`].
pub fn tag_of(image: &DynamicImage) -> usize {
    image.to_rgb8().get_pixel(0, 0)[0] as usize
}

pub fn tags(images: &[DynamicImage]) -> Vec<usize> {
    images.iter().map(tag_of).collect()
}

/// Deterministic Fisher-Yates shuffle driven by xorshift64.
pub fn shuffled(count: usize, seed: u64) -> Vec<usize> {
    let mut state = seed.max(1);
    let mut order: Vec<usize> = (0..count).collect();
    for i in (1..count).rev() {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let j = (state % (i as u64 + 1)) as usize;
        order.swap(i, j);
    }
    order
}

fn report_for(script: Script, index: usize, time: f64, cancelled: &AtomicBool) -> FrameReport {
    match script {
        Script::Succeed => FrameReport::succeeded(time, time, tagged_image(index)),
        Script::SucceedAt(actual) => FrameReport::succeeded(time, actual, tagged_image(index)),
        Script::Fail => FrameReport::failed(time),
        Script::Hang => {
            while !cancelled.load(Ordering::Acquire) {
                thread::sleep(Duration::from_millis(1));
            }
            FrameReport::cancelled(time)
        }
    }
}

impl FrameDecoder for ScriptedDecoder {
    fn load_duration(&self) -> Result<f64, FilmstripError> {
        if self.panic_on_duration {
            panic!("duration probe crashed");
        }
        self.duration
            .ok_or_else(|| FilmstripError::FileOpen {
                path: "scripted.mp4".into(),
                reason: "unreadable".to_string(),
            })
    }

    fn generate_images(
        &self,
        times: &[f64],
        options: &DecodeOptions,
        handler: FrameHandler,
    ) -> Result<(), FilmstripError> {
        if self.reject_batch {
            return Err(FilmstripError::NoVideoStream);
        }
        self.batches.fetch_add(1, Ordering::SeqCst);
        self.requested.fetch_add(times.len(), Ordering::SeqCst);
        *self.last_options.lock().unwrap() = Some(options.clone());

        let limit = self.report_limit.unwrap_or(times.len()).min(times.len());
        let order = shuffled(times.len(), self.seed);
        let answered = Arc::new(AtomicUsize::new(0));
        let duplicates = self.duplicate_reports;
        let total = times.len();

        for (position, &index) in order.iter().enumerate().take(limit) {
            let time = times[index];
            let script = (self.script)(index, time);
            let cancelled = Arc::clone(&self.cancelled);
            let handler = Arc::clone(&handler);
            let answered = Arc::clone(&answered);
            thread::spawn(move || {
                // Stagger start-up so arrival roughly follows the shuffle.
                thread::sleep(Duration::from_micros(200 * position as u64));
                let report = report_for(script, index, time, &cancelled);
                handler(report);

                if answered.fetch_add(1, Ordering::SeqCst) + 1 == total {
                    for _ in 0..duplicates {
                        handler(FrameReport::succeeded(time, time, tagged_image(index)));
                    }
                }
            });
        }

        Ok(())
    }

    fn cancel_all(&self) {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        self.cancelled.store(true, Ordering::Release);
    }
}
