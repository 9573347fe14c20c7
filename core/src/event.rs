//! The process-wide event queue: a single FIFO of received frames and
//! other notifications, drained serially by the application thread
//! (spec §4.4).

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// How a frame's FEC was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FecType {
    None,
    Fx25,
}

/// How many bit-flip retries (if any) it took the dispatcher to validate
/// this frame's CRC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryIndicator {
    None,
    Fixed(u8),
}

/// Audio-level descriptor carried alongside a received frame, for
/// diagnostics (spec §3 "Frame Event").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RxLevel {
    pub level: i16,
    pub min: i16,
    pub max: i16,
}

/// A single validated (or passall-marked) received frame.
#[derive(Debug, Clone)]
pub struct FrameEvent {
    pub channel: usize,
    pub sub_channel: usize,
    pub slicer: usize,
    pub rx_level: RxLevel,
    pub packet: Vec<u8>,
    pub fec_type: FecType,
    pub retries: RetryIndicator,
    /// Short description of which decoder(s) caught this frame, e.g.
    /// "A1200" or "fx25+A1200".
    pub spectrum: String,
    /// Set when delivered under `passall` despite a CRC that did not
    /// validate (spec §4.3, §12 "passall").
    pub passed_all: bool,
}

/// Non-frame notifications sharing the same queue.
#[derive(Debug, Clone)]
pub enum Event {
    Frame(FrameEvent),
    ChannelActivity { channel: usize, busy: bool },
    Diagnostic(String),
}

/// Thread-safe single-consumer, multi-producer FIFO.
///
/// Rust's ownership model hands each dequeued `Event` to its single owner
/// and drops it automatically, so the balanced-alloc/free invariant the
/// original design tracked with a manual counter is structural here rather
/// than monitored; what remains to watch is the queue-overflow diagnostic.
pub struct EventQueue {
    inner: Mutex<VecDeque<Event>>,
    not_empty: Condvar,
}

/// Emit a diagnostic once the queue holds more than this many pending
/// items — the documented symptom of a blocked consumer (spec §4.4).
const OVERFLOW_WARNING_THRESHOLD: usize = 10;

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
            not_empty: Condvar::new(),
        }
    }

    pub fn enqueue(&self, event: Event) {
        let mut queue = self.inner.lock().unwrap();
        queue.push_back(event);
        if queue.len() > OVERFLOW_WARNING_THRESHOLD {
            log::warn!(
                "event queue has {} pending items - is the consumer blocked?",
                queue.len()
            );
        }
        self.not_empty.notify_one();
    }

    /// Block until the queue is non-empty or `timeout` elapses. Returns
    /// `true` if the wait timed out with nothing delivered.
    pub fn wait_nonempty(&self, timeout: Duration) -> bool {
        let queue = self.inner.lock().unwrap();
        if !queue.is_empty() {
            return false;
        }
        let (_guard, result) = self
            .not_empty
            .wait_timeout_while(queue, timeout, |q| q.is_empty())
            .unwrap();
        result.timed_out()
    }

    pub fn dequeue(&self) -> Option<Event> {
        self.inner.lock().unwrap().pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order_preserved() {
        let queue = EventQueue::new();
        queue.enqueue(Event::Diagnostic("first".into()));
        queue.enqueue(Event::Diagnostic("second".into()));
        match queue.dequeue() {
            Some(Event::Diagnostic(s)) => assert_eq!(s, "first"),
            _ => panic!("expected diagnostic"),
        }
        match queue.dequeue() {
            Some(Event::Diagnostic(s)) => assert_eq!(s, "second"),
            _ => panic!("expected diagnostic"),
        }
        assert!(queue.dequeue().is_none());
    }

    #[test]
    fn wait_nonempty_returns_immediately_when_populated() {
        let queue = EventQueue::new();
        queue.enqueue(Event::ChannelActivity {
            channel: 0,
            busy: true,
        });
        assert!(!queue.wait_nonempty(Duration::from_millis(50)));
    }

    #[test]
    fn wait_nonempty_times_out_when_empty() {
        let queue = EventQueue::new();
        assert!(queue.wait_nonempty(Duration::from_millis(20)));
    }
}
