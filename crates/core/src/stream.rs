//! Pausable entry stream
//!
//! [`EntryStream`] normalizes raw records one at a time as the consumer polls it.
//! A consumer can throttle production with [`EntryStream::pause`] and
//! [`EntryStream::resume`], either directly or from another task through a
//! [`PauseHandle`]. Nothing is read ahead of the consumer: at most one record is
//! in flight, and a record that arrives after `pause()` is parked until `resume()`.

use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll, Waker};

use futures::stream::{BoxStream, FusedStream};
use futures::{Stream, StreamExt};

use crate::entry::{DirectoryEntry, ListingContext, RawRecord, normalize};
use crate::error::{Error, Result};

/// Source of raw records feeding an [`EntryStream`]
pub type RecordStream = BoxStream<'static, Result<RawRecord>>;

/// Production state of an entry stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Streaming,
    Paused,
    Ended,
}

/// Event observed by a consumer of [`EntryStream::next_event`]
#[derive(Debug)]
pub enum StreamEvent {
    Data(DirectoryEntry),
    Error(Error),
    End,
}

#[derive(Debug)]
struct Control {
    state: StreamState,
    waker: Option<Waker>,
}

/// Cloneable pause/resume switch for an [`EntryStream`]
#[derive(Debug, Clone)]
pub struct PauseHandle {
    control: Arc<Mutex<Control>>,
}

impl PauseHandle {
    fn new() -> Self {
        Self {
            control: Arc::new(Mutex::new(Control {
                state: StreamState::Streaming,
                waker: None,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Control> {
        // Control holds no invariants a panicking holder could break
        self.control.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Stop producing entries until [`resume`](Self::resume) is called
    ///
    /// No-op when already paused or ended.
    pub fn pause(&self) {
        let mut control = self.lock();
        if control.state == StreamState::Streaming {
            control.state = StreamState::Paused;
            tracing::trace!("entry stream paused");
        }
    }

    /// Continue producing entries
    ///
    /// No-op unless paused. Wakes a consumer that is waiting on the paused stream.
    pub fn resume(&self) {
        let waker = {
            let mut control = self.lock();
            if control.state != StreamState::Paused {
                return;
            }
            control.state = StreamState::Streaming;
            control.waker.take()
        };
        tracing::trace!("entry stream resumed");
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    pub fn state(&self) -> StreamState {
        self.lock().state
    }

    fn finish(&self) {
        let mut control = self.lock();
        control.state = StreamState::Ended;
        control.waker = None;
    }

    /// Returns false and parks `waker` when the stream is paused
    fn may_produce(&self, waker: &Waker) -> Option<bool> {
        let mut control = self.lock();
        match control.state {
            StreamState::Streaming => Some(true),
            StreamState::Paused => {
                control.waker = Some(waker.clone());
                Some(false)
            }
            StreamState::Ended => None,
        }
    }
}

/// Stream of normalized directory entries with pause/resume backpressure
pub struct EntryStream {
    records: RecordStream,
    context: ListingContext,
    control: PauseHandle,
    parked: Option<Result<DirectoryEntry>>,
    end_reported: bool,
    produced: u64,
}

impl EntryStream {
    /// Create a stream over `records`; it starts in the `Streaming` state
    pub fn new(records: RecordStream, context: ListingContext) -> Self {
        Self {
            records,
            context,
            control: PauseHandle::new(),
            parked: None,
            end_reported: false,
            produced: 0,
        }
    }

    /// Create a stream over records already in memory
    pub fn from_records(records: Vec<RawRecord>, context: ListingContext) -> Self {
        Self::new(futures::stream::iter(records.into_iter().map(Ok)).boxed(), context)
    }

    pub fn pause(&self) {
        self.control.pause();
    }

    pub fn resume(&self) {
        self.control.resume();
    }

    pub fn state(&self) -> StreamState {
        self.control.state()
    }

    /// Handle that can pause or resume this stream from elsewhere
    pub fn handle(&self) -> PauseHandle {
        self.control.clone()
    }

    /// Number of data and error items produced so far
    pub fn produced(&self) -> u64 {
        self.produced
    }

    /// Wait for the next event
    ///
    /// Yields one `Data` or `Error` per record, then `End` once, then `None`.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        if self.end_reported {
            return None;
        }
        match self.next().await {
            Some(Ok(entry)) => Some(StreamEvent::Data(entry)),
            Some(Err(err)) => Some(StreamEvent::Error(err)),
            None => {
                self.end_reported = true;
                Some(StreamEvent::End)
            }
        }
    }
}

impl Stream for EntryStream {
    type Item = Result<DirectoryEntry>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        match this.control.may_produce(cx.waker()) {
            None => return Poll::Ready(None),
            Some(false) => return Poll::Pending,
            Some(true) => {}
        }

        if let Some(item) = this.parked.take() {
            this.produced += 1;
            return Poll::Ready(Some(item));
        }

        let item = match this.records.poll_next_unpin(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(None) => {
                this.control.finish();
                tracing::debug!(produced = this.produced, "entry stream ended");
                return Poll::Ready(None);
            }
            Poll::Ready(Some(Ok(record))) => normalize(record, &this.context),
            Poll::Ready(Some(Err(err))) => Err(err),
        };

        if let Err(err) = &item {
            tracing::warn!(error = %err, "entry stream record failed");
        }

        // The consumer may have paused while the record was in flight
        if this.control.may_produce(cx.waker()) == Some(false) {
            this.parked = Some(item);
            return Poll::Pending;
        }

        this.produced += 1;
        Poll::Ready(Some(item))
    }
}

impl FusedStream for EntryStream {
    fn is_terminated(&self) -> bool {
        self.control.state() == StreamState::Ended
    }
}
