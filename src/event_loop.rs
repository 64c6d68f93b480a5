//! Single-threaded cooperative scheduler.
//!
//! There is exactly one logical thread of control: the script and the host
//! event loop interleave only at defined suspension points (`sleep`, the
//! interrupt hook, and the run loop between script evaluations). Engine
//! backends report completions over a bounded channel; the scheduler moves
//! them into a pending queue that the controller drains and dispatches.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::sync::mpsc::{sync_channel, Receiver, RecvTimeoutError, SyncSender};
use std::time::Duration;

use crate::engine::EngineEvent;

/// Capacity of the engine-callback channel. Backends block when it fills,
/// which keeps a runaway producer from outpacing the single consumer.
const EVENT_QUEUE_BOUND: usize = 64;

/// Default pump slice used by `sleep` and the run loop.
pub const PUMP_SLICE: Duration = Duration::from_millis(25);

pub struct Scheduler {
    tx: SyncSender<EngineEvent>,
    rx: Receiver<EngineEvent>,
    pending: RefCell<VecDeque<EngineEvent>>,
    quit: Cell<bool>,
}

impl Scheduler {
    pub fn new() -> Self {
        let (tx, rx) = sync_channel(EVENT_QUEUE_BOUND);
        Self {
            tx,
            rx,
            pending: RefCell::new(VecDeque::new()),
            quit: Cell::new(false),
        }
    }

    /// Sender handed to engine backends; completions posted here surface on
    /// the next pump.
    pub fn sender(&self) -> SyncSender<EngineEvent> {
        self.tx.clone()
    }

    /// Service the channel for up to `slice`, moving whatever arrived into
    /// the pending queue without dispatching it. This is the cooperative
    /// yield point used by the interrupt hook.
    pub fn poll_slice(&self, slice: Duration) {
        let mut pending = self.pending.borrow_mut();
        match self.rx.recv_timeout(slice) {
            Ok(event) => pending.push_back(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => return,
        }
        // Drain anything else that is already waiting.
        while let Ok(event) = self.rx.try_recv() {
            pending.push_back(event);
        }
    }

    /// Poll one slice and hand back everything now pending.
    pub fn pump(&self, slice: Duration) -> Vec<EngineEvent> {
        self.poll_slice(slice);
        self.take_pending()
    }

    pub fn take_pending(&self) -> Vec<EngineEvent> {
        self.pending.borrow_mut().drain(..).collect()
    }

    /// Request termination on the next run-loop iteration. Work already in
    /// flight finishes first; nothing is torn down synchronously.
    pub fn request_quit(&self) {
        self.quit.set(true);
    }

    pub fn quit_requested(&self) -> bool {
        self.quit.get()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
