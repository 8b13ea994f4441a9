use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent};

use crate::session::Event;

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum SpanEvent {
    Key(KeyEvent),
    Resize,
    Tick,
    /// reported by background work such as a running presentation
    Session(Event),
}

/// Source of terminal and background events
pub trait SpanEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<SpanEvent, RecvTimeoutError>;

    /// Handle for worker threads to feed events into the same queue
    fn sender(&self) -> Sender<SpanEvent>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    tx: Sender<SpanEvent>,
    rx: Receiver<SpanEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        let input_tx = tx.clone();

        std::thread::spawn(move || loop {
            let forwarded = match event::read() {
                Ok(CtEvent::Key(key)) => input_tx.send(SpanEvent::Key(key)),
                Ok(CtEvent::Resize(_, _)) => input_tx.send(SpanEvent::Resize),
                Ok(_) => Ok(()),
                Err(_) => break,
            };
            if forwarded.is_err() {
                break;
            }
        });

        Self { tx, rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SpanEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<SpanEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    fn sender(&self) -> Sender<SpanEvent> {
        self.tx.clone()
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Channel-backed event source for tests
pub struct TestEventSource {
    tx: Sender<SpanEvent>,
    rx: Receiver<SpanEvent>,
}

impl TestEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }
}

impl Default for TestEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SpanEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<SpanEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    fn sender(&self) -> Sender<SpanEvent> {
        self.tx.clone()
    }
}

/// Runner that advances the application one event/tick at a time
pub struct Runner<E: SpanEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: SpanEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    pub fn sender(&self) -> Sender<SpanEvent> {
        self.event_source.sender()
    }

    /// Blocks up to tick interval and returns the next event, or Tick on timeout
    pub fn step(&self) -> SpanEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => SpanEvent::Tick,
        }
    }
}

#[derive(Debug, Clone)]
struct PendingTimer {
    due: Instant,
    event: Event,
}

/// Delayed session transitions, keyed by the round generation they belong to
#[derive(Debug, Default)]
pub struct Timers {
    pending: Vec<PendingTimer>,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, now: Instant, delay: Duration, event: Event) {
        self.pending.push(PendingTimer {
            due: now + delay,
            event,
        });
    }

    /// Cancels every timer that does not belong to `generation`
    pub fn retain_generation(&mut self, generation: u64) {
        self.pending
            .retain(|t| t.event.generation().map_or(true, |g| g == generation));
    }

    /// Removes and returns the events that are due, earliest first
    pub fn take_due(&mut self, now: Instant) -> Vec<Event> {
        let (mut due, pending): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|t| t.due <= now);
        self.pending = pending;
        due.sort_by_key(|t| t.due);
        due.into_iter().map(|t| t.event).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
