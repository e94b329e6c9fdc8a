//! Fan-out/fan-in frame collection.
//!
//! [`FrameCollector`] issues every timestamp of a [`RequestPlan`] to its
//! [`FrameDecoder`] in one batch, then gathers the reports as they arrive on
//! the decoder's worker threads. Each report is mapped back to its ordinal
//! slot, and the report that settles the last outstanding request assembles
//! the ordered strip and resolves the [`CollectionFuture`]. Frames that fail
//! to decode leave a gap; the strip is never padded.
//!
//! # Example
//!
//! ```no_run
//! use filmstrip::{FfmpegFrameDecoder, FilmstripError, FrameCollector, RequestPlan};
//!
//! # async fn example() -> Result<(), FilmstripError> {
//! let collector = FrameCollector::new(FfmpegFrameDecoder::new("input.mp4"));
//! let plan = RequestPlan::for_duration(42.0);
//! let frames = collector.collect(&plan).await?;
//! println!("collected {} of {} frames", frames.len(), plan.len());
//! # Ok(())
//! # }
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};

use image::DynamicImage;
use tokio::sync::oneshot::{self, Receiver, Sender};
use tokio::time::{Instant, Sleep};

use crate::configuration::CollectOptions;
use crate::decoder::{FrameDecoder, FrameHandler, FrameReport};
use crate::error::FilmstripError;
use crate::planner::RequestPlan;
use crate::progress::{ProgressCallback, ProgressTracker};

/// Coordinates one or more collection runs against a single decoder.
///
/// The collector itself holds no per-run state: every call to
/// [`collect`](FrameCollector::collect) gets its own accumulator, so runs
/// never observe each other's frames.
pub struct FrameCollector<D: FrameDecoder> {
    decoder: Arc<D>,
}

impl<D: FrameDecoder> Debug for FrameCollector<D> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("FrameCollector").finish_non_exhaustive()
    }
}

impl<D: FrameDecoder> FrameCollector<D> {
    /// Create a collector driving `decoder`.
    pub fn new(decoder: D) -> Self {
        Self {
            decoder: Arc::new(decoder),
        }
    }

    /// The decoder this collector drives.
    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Collect every frame in `plan` with default options.
    ///
    /// See [`collect_with_options`](FrameCollector::collect_with_options).
    pub fn collect(&self, plan: &RequestPlan) -> CollectionFuture {
        self.collect_with_options(plan, &CollectOptions::default())
    }

    /// Issue all of `plan` to the decoder and return a future for the strip.
    ///
    /// The requests are scheduled before this method returns; the future
    /// only waits for them. It resolves exactly once:
    ///
    /// - immediately with an empty strip when `plan` is empty (nothing is
    ///   sent to the decoder),
    /// - immediately with the decoder's error when it rejects the batch,
    /// - otherwise with the decoded frames in plan order once every request
    ///   has reported, or with the frames gathered so far when the
    ///   configured timeout elapses first.
    pub fn collect_with_options(
        &self,
        plan: &RequestPlan,
        options: &CollectOptions,
    ) -> CollectionFuture {
        let expected = plan.len();
        if expected == 0 {
            log::debug!("Empty request plan, nothing to collect");
            return CollectionFuture::ready(Ok(Vec::new()));
        }

        log::debug!(
            "Collecting {} frames (interval={:.3}s, timeout={:?})",
            expected,
            plan.interval(),
            options.timeout
        );

        let (resolver, receiver) = oneshot::channel();
        let state = Arc::new(Mutex::new(CollectionState::new(expected, resolver)));
        let tracker = ProgressTracker::new(expected);
        let handler = frame_handler(
            Arc::clone(&state),
            plan.clone(),
            tracker,
            Arc::clone(&options.progress),
        );

        // Handlers own the only strong references to the state, so a decoder
        // that drops them early also drops the resolver.
        let weak_state = Arc::downgrade(&state);
        drop(state);

        let deadline = options.timeout.map(|timeout| Instant::now() + timeout);

        if let Err(error) = self
            .decoder
            .generate_images(plan.timestamps(), &options.decode, handler)
        {
            log::warn!("Decoder rejected batch of {expected} frames: {error}");
            return CollectionFuture::ready(Err(error));
        }

        let decoder: Arc<dyn FrameDecoder> = self.decoder.clone();
        CollectionFuture {
            inner: Inner::Waiting(Waiting {
                receiver,
                state: weak_state,
                decoder,
                deadline,
                sleep: None,
            }),
        }
    }

    /// Load the asset duration, plan, and collect.
    ///
    /// `count` overrides the default sampling density; it is clamped to
    /// [`MIN_FRAME_COUNT`](crate::MIN_FRAME_COUNT)..=[`MAX_FRAME_COUNT`](crate::MAX_FRAME_COUNT).
    /// An unusable duration produces an empty strip.
    ///
    /// # Errors
    ///
    /// Returns the decoder's error when the duration cannot be loaded or the
    /// batch is rejected. Individual frame failures are not errors.
    ///
    /// # Panics
    ///
    /// A panic inside [`FrameDecoder::load_duration`] is propagated to the
    /// caller.
    pub async fn generate(
        &self,
        count: Option<usize>,
        options: &CollectOptions,
    ) -> Result<Vec<DynamicImage>, FilmstripError> {
        let decoder = Arc::clone(&self.decoder);
        let duration = match tokio::task::spawn_blocking(move || decoder.load_duration()).await {
            Ok(loaded) => loaded,
            Err(error) if error.is_panic() => std::panic::resume_unwind(error.into_panic()),
            Err(_) => return Err(FilmstripError::Cancelled),
        }
        .inspect_err(|error| log::warn!("Failed to load duration: {error}"))?;

        let plan = match count {
            Some(count) => RequestPlan::with_count(duration, count),
            None => RequestPlan::for_duration(duration),
        };
        log::debug!(
            "Planned {} frames for {:.3}s of content",
            plan.len(),
            duration
        );

        self.collect_with_options(&plan, options).await
    }

    /// Ask the decoder to abandon all outstanding requests.
    ///
    /// This does not resolve pending futures by itself. Cancelled requests
    /// still report back, and the run resolves normally once they have,
    /// usually with fewer frames.
    pub fn cancel(&self) {
        log::debug!("Cancelling outstanding frame requests");
        self.decoder.cancel_all();
    }
}

/// Mutable state of one collection run, guarded by a single mutex.
struct CollectionState {
    slots: Vec<Option<DynamicImage>>,
    settled: usize,
    decoded: usize,
    expected: usize,
    resolver: Option<Sender<Vec<DynamicImage>>>,
}

impl CollectionState {
    fn new(expected: usize, resolver: Sender<Vec<DynamicImage>>) -> Self {
        Self {
            slots: vec![None; expected],
            settled: 0,
            decoded: 0,
            expected,
            resolver: Some(resolver),
        }
    }

    /// Take the resolver and the ordered frames if nobody has yet.
    fn resolve(&mut self) -> Option<(Sender<Vec<DynamicImage>>, Vec<DynamicImage>)> {
        let resolver = self.resolver.take()?;
        let frames = self.slots.iter_mut().filter_map(Option::take).collect();
        Some((resolver, frames))
    }
}

fn lock_state(state: &Mutex<CollectionState>) -> MutexGuard<'_, CollectionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Build the per-run callback handed to the decoder.
fn frame_handler(
    state: Arc<Mutex<CollectionState>>,
    plan: RequestPlan,
    tracker: ProgressTracker,
    progress: Arc<dyn ProgressCallback>,
) -> FrameHandler {
    Arc::new(move |report: FrameReport| {
        let actual_time = report.actual_time;
        let status = report.status;
        let index = plan.index_for(actual_time);
        let image = report.into_image();

        let (snapshot, finished) = {
            let mut state = lock_state(&state);
            if state.resolver.is_none() {
                log::trace!("Ignoring report at {actual_time:.3}s after resolution");
                return;
            }

            if let Some(image) = image {
                // Last write wins when two reports round to the same slot.
                if state.slots[index].replace(image).is_none() {
                    state.decoded += 1;
                }
            }
            state.settled += 1;

            let snapshot = (state.settled, state.decoded);
            let finished = if state.settled == state.expected {
                state.resolve()
            } else {
                None
            };
            (snapshot, finished)
        };

        log::trace!(
            "Frame {index} settled at {actual_time:.3}s ({status:?}), {}/{}",
            snapshot.0,
            plan.len()
        );
        progress.on_progress(&tracker.snapshot(snapshot.0, snapshot.1, Some(actual_time)));

        if let Some((resolver, frames)) = finished {
            log::debug!("Collected {} of {} frames", frames.len(), plan.len());
            // The caller may have dropped the future; nothing to deliver then.
            let _ = resolver.send(frames);
        }
    })
}

/// A future resolving to the ordered frames of one collection run.
///
/// Created by [`FrameCollector::collect`]. Dropping it does not stop the
/// decoder; call [`FrameCollector::cancel`] for that.
#[must_use = "futures do nothing unless polled"]
pub struct CollectionFuture {
    inner: Inner,
}

enum Inner {
    Ready(Result<Vec<DynamicImage>, FilmstripError>),
    Waiting(Waiting),
    Done,
}

struct Waiting {
    receiver: Receiver<Vec<DynamicImage>>,
    state: Weak<Mutex<CollectionState>>,
    decoder: Arc<dyn FrameDecoder>,
    deadline: Option<Instant>,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl CollectionFuture {
    fn ready(outcome: Result<Vec<DynamicImage>, FilmstripError>) -> Self {
        Self {
            inner: Inner::Ready(outcome),
        }
    }
}

impl Debug for CollectionFuture {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let state = match &self.inner {
            Inner::Ready(_) => "ready",
            Inner::Waiting(_) => "waiting",
            Inner::Done => "done",
        };
        f.debug_struct("CollectionFuture")
            .field("state", &state)
            .finish()
    }
}

impl Future for CollectionFuture {
    type Output = Result<Vec<DynamicImage>, FilmstripError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match std::mem::replace(&mut this.inner, Inner::Done) {
            Inner::Ready(outcome) => Poll::Ready(outcome),
            Inner::Waiting(mut waiting) => match waiting.poll_outcome(cx) {
                Poll::Ready(outcome) => Poll::Ready(outcome),
                Poll::Pending => {
                    this.inner = Inner::Waiting(waiting);
                    Poll::Pending
                }
            },
            Inner::Done => panic!("CollectionFuture polled after completion"),
        }
    }
}

impl Waiting {
    fn poll_outcome(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Vec<DynamicImage>, FilmstripError>> {
        if let Poll::Ready(result) = Pin::new(&mut self.receiver).poll(cx) {
            return Poll::Ready(result.map_err(|_| {
                log::warn!("Decoder dropped its frame handler before reporting every frame");
                FilmstripError::CollectionAbandoned
            }));
        }

        if let Some(deadline) = self.deadline {
            let sleep = self
                .sleep
                .get_or_insert_with(|| Box::pin(tokio::time::sleep_until(deadline)));
            if sleep.as_mut().poll(cx).is_ready() {
                self.deadline = None;
                self.sleep = None;
                if let Some(frames) = self.resolve_on_timeout() {
                    return Poll::Ready(Ok(frames));
                }
                // A callback already claimed the resolver, or every handler
                // is gone. Either way the receiver is about to settle.
            }
        }

        Poll::Pending
    }

    fn resolve_on_timeout(&self) -> Option<Vec<DynamicImage>> {
        let state = self.state.upgrade()?;
        let (settled, expected, frames) = {
            let mut state = lock_state(&state);
            let (_resolver, frames) = state.resolve()?;
            (state.settled, state.expected, frames)
        };

        log::warn!(
            "Collection timed out with {settled}/{expected} settled, resolving with {} frames",
            frames.len()
        );
        self.decoder.cancel_all();
        Some(frames)
    }
}
