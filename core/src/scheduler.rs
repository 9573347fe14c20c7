//! Transmit Scheduler: p-persistent CSMA channel-access arbitration (spec
//! §4.6). This module is the pure decision logic — state transitions and
//! bundle selection — driven by a clock and inputs the `app` crate's
//! transmit worker supplies each tick; actual PTT/audio I/O lives there.

use crate::address::AddressList;
use crate::channel::Channel;
use crate::txqueue::SendQueue;

const WAIT_CHECK_EVERY_MS: u64 = 10;
const WAIT_TIMEOUT_MS: u64 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    WaitClear,
    AcquireDevice,
}

/// The frames to key up and send in one PTT cycle, plus the preamble and
/// postamble durations to shape around them.
#[derive(Debug, Clone)]
pub struct TransmissionPlan {
    pub frames: Vec<Vec<u8>>,
    pub txdelay_ms: u64,
    pub txtail_ms: u64,
}

/// What the caller should do this tick.
#[derive(Debug, Clone)]
pub enum CsmaOutcome {
    /// Nothing queued; stay idle.
    Idle,
    /// Still arbitrating; call `poll` again (the caller decides how long
    /// to sleep — `WAIT_CHECK_EVERY_MS` is a reasonable default).
    Waiting,
    /// Need the per-audio-device transmit lock before proceeding.
    AcquireDeviceLock,
    /// Channel access granted: key up and send this bundle.
    BeginTransmission(TransmissionPlan),
    /// The 60 s hard timeout elapsed; the head frame was dropped.
    Timeout,
}

/// Per-channel p-persistent CSMA state machine.
pub struct CsmaScheduler {
    state: State,
    entered_state_at_ms: u64,
    dwait_done: bool,
    next_slot_at_ms: u64,
}

impl Default for CsmaScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl CsmaScheduler {
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            entered_state_at_ms: 0,
            dwait_done: false,
            next_slot_at_ms: 0,
        }
    }

    fn enter(&mut self, state: State, now_ms: u64) {
        self.state = state;
        self.entered_state_at_ms = now_ms;
    }

    /// Advance the state machine by one tick.
    ///
    /// `persistence_draw` is a caller-supplied uniform byte in `0..=255`
    /// — kept as an explicit parameter rather than an internal RNG so the
    /// p=255/p=0 boundary behavior (spec testable property 5) is directly
    /// testable without seeding a generator.
    pub fn poll(
        &mut self,
        channel: &Channel,
        now_ms: u64,
        dcd_asserted: bool,
        tx_inhibit: bool,
        device_lock_acquired: bool,
        queue: &mut SendQueue,
        persistence_draw: u8,
    ) -> CsmaOutcome {
        match self.state {
            State::Idle => {
                if queue.is_empty() {
                    return CsmaOutcome::Idle;
                }
                self.enter(State::WaitClear, now_ms);
                self.dwait_done = false;
                self.next_slot_at_ms = now_ms;
                CsmaOutcome::Waiting
            }

            State::WaitClear => {
                if now_ms.saturating_sub(self.entered_state_at_ms) >= WAIT_TIMEOUT_MS {
                    queue.dequeue();
                    self.enter(State::Idle, now_ms);
                    return CsmaOutcome::Timeout;
                }

                if channel.timing.fulldup {
                    self.enter(State::AcquireDevice, now_ms);
                    return CsmaOutcome::AcquireDeviceLock;
                }

                if dcd_asserted || tx_inhibit {
                    // Any carrier re-assertion restarts the wait from the top.
                    self.dwait_done = false;
                    self.next_slot_at_ms = now_ms + WAIT_CHECK_EVERY_MS;
                    return CsmaOutcome::Waiting;
                }

                if !self.dwait_done {
                    let dwait_deadline =
                        self.entered_state_at_ms + (channel.timing.dwait as u64) * 10;
                    if now_ms < dwait_deadline {
                        return CsmaOutcome::Waiting;
                    }
                    self.dwait_done = true;
                    self.next_slot_at_ms = now_ms;
                }

                if queue.has_high_priority() {
                    self.enter(State::AcquireDevice, now_ms);
                    return CsmaOutcome::AcquireDeviceLock;
                }

                if now_ms < self.next_slot_at_ms {
                    return CsmaOutcome::Waiting;
                }

                if persistence_draw <= channel.timing.persist {
                    self.enter(State::AcquireDevice, now_ms);
                    return CsmaOutcome::AcquireDeviceLock;
                }
                self.next_slot_at_ms = now_ms + (channel.timing.slottime as u64) * 10;
                CsmaOutcome::Waiting
            }

            State::AcquireDevice => {
                if now_ms.saturating_sub(self.entered_state_at_ms) >= WAIT_TIMEOUT_MS {
                    queue.dequeue();
                    self.enter(State::Idle, now_ms);
                    return CsmaOutcome::Timeout;
                }
                if !device_lock_acquired {
                    return CsmaOutcome::AcquireDeviceLock;
                }
                let plan = build_bundle(channel, queue);
                self.enter(State::Idle, now_ms);
                CsmaOutcome::BeginTransmission(plan)
            }
        }
    }
}

fn frame_is_aprs_digipeated(packet: &[u8]) -> bool {
    AddressList::decode(packet)
        .map(|(list, _)| list.is_aprs_digipeated())
        .unwrap_or(false)
}

/// Dequeue the first eligible frame and, unless it's an APRS-digipeated
/// frame (which must go alone), keep bundling up to the channel's cap.
fn build_bundle(channel: &Channel, queue: &mut SendQueue) -> TransmissionPlan {
    let mut frames = Vec::new();
    let mut cap = channel.bundle_cap;

    if let Some(first) = queue.dequeue() {
        if frame_is_aprs_digipeated(&first.packet) {
            cap = 1;
        }
        frames.push(first.packet);

        while frames.len() < cap {
            match queue.dequeue() {
                Some(next) if frame_is_aprs_digipeated(&next.packet) => {
                    queue.requeue_front(next);
                    break;
                }
                Some(next) => frames.push(next.packet),
                None => break,
            }
        }
    }

    TransmissionPlan {
        frames,
        txdelay_ms: (channel.timing.txdelay as u64) * 10,
        txtail_ms: (channel.timing.txtail as u64) * 10,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::txqueue::Priority;

    fn test_channel() -> Channel {
        let mut channel = Channel::new(0);
        channel.timing.slottime = 10;
        channel.timing.persist = 255;
        channel.timing.dwait = 0;
        channel
    }

    #[test]
    fn persist_255_proceeds_after_one_slot() {
        let channel = test_channel();
        let mut queue = SendQueue::new();
        queue.enqueue(vec![0; 20], Priority::Low);
        let mut scheduler = CsmaScheduler::new();

        // Idle -> WaitClear
        assert!(matches!(
            scheduler.poll(&channel, 0, false, false, false, &mut queue, 0),
            CsmaOutcome::Waiting
        ));
        // Still within the first slot: waiting.
        assert!(matches!(
            scheduler.poll(&channel, 50, false, false, false, &mut queue, 0),
            CsmaOutcome::Waiting
        ));
        // One slottime (100ms) later, persist=255 means any draw <= 255 wins immediately.
        assert!(matches!(
            scheduler.poll(&channel, 100, false, false, false, &mut queue, 255),
            CsmaOutcome::AcquireDeviceLock
        ));
    }

    #[test]
    fn persist_zero_only_succeeds_on_draw_zero() {
        let mut channel = test_channel();
        channel.timing.persist = 0;
        let mut queue = SendQueue::new();
        queue.enqueue(vec![0; 20], Priority::Low);
        let mut scheduler = CsmaScheduler::new();

        scheduler.poll(&channel, 0, false, false, false, &mut queue, 0);
        // A non-zero draw at the slot boundary must not proceed.
        assert!(matches!(
            scheduler.poll(&channel, 100, false, false, false, &mut queue, 1),
            CsmaOutcome::Waiting
        ));
        // Only a draw of exactly 0 succeeds.
        assert!(matches!(
            scheduler.poll(&channel, 200, false, false, false, &mut queue, 0),
            CsmaOutcome::AcquireDeviceLock
        ));
    }

    #[test]
    fn dcd_restarts_the_wait() {
        let channel = test_channel();
        let mut queue = SendQueue::new();
        queue.enqueue(vec![0; 20], Priority::Low);
        let mut scheduler = CsmaScheduler::new();

        scheduler.poll(&channel, 0, false, false, false, &mut queue, 0);
        assert!(matches!(
            scheduler.poll(&channel, 100, true, false, false, &mut queue, 0),
            CsmaOutcome::Waiting
        ));
        // Even with a winning draw, DCD being asserted holds it at bay.
        assert!(matches!(
            scheduler.poll(&channel, 110, true, false, false, &mut queue, 0),
            CsmaOutcome::Waiting
        ));
    }

    #[test]
    fn timeout_after_60_seconds_drops_head_frame() {
        let channel = test_channel();
        let mut queue = SendQueue::new();
        queue.enqueue(vec![0; 20], Priority::Low);
        let mut scheduler = CsmaScheduler::new();

        scheduler.poll(&channel, 0, true, false, false, &mut queue, 0);
        let outcome = scheduler.poll(&channel, 60_000, true, false, false, &mut queue, 0);
        assert!(matches!(outcome, CsmaOutcome::Timeout));
        assert!(queue.is_empty());
    }

    #[test]
    fn digipeated_frame_is_never_bundled() {
        use crate::address::{AddressList, Ax25Address};

        let dest = Ax25Address::new("APRS", 0).unwrap();
        let src = Ax25Address::new("WB2OSZ", 15).unwrap();
        let rpt = Ax25Address::new("WIDE1", 1).unwrap();
        let mut digipeated = AddressList::encode(&dest, &src, &[rpt], true);
        digipeated[20] |= 0x80; // mark has-been-repeated
        digipeated.extend_from_slice(b"\x03\xf0payload");

        let mut queue = SendQueue::new();
        queue.enqueue(digipeated, Priority::High);
        queue.enqueue(vec![1; 20], Priority::Low);
        queue.enqueue(vec![2; 20], Priority::Low);

        let channel = test_channel();
        let plan = build_bundle(&channel, &mut queue);
        assert_eq!(plan.frames.len(), 1);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn ordinary_frames_bundle_up_to_cap() {
        let mut channel = test_channel();
        channel.bundle_cap = 256;
        let mut queue = SendQueue::new();
        queue.enqueue(vec![1; 20], Priority::Low);
        queue.enqueue(vec![2; 20], Priority::Low);
        queue.enqueue(vec![3; 20], Priority::Low);

        let plan = build_bundle(&channel, &mut queue);
        assert_eq!(plan.frames.len(), 3);
        assert!(queue.is_empty());
    }
}
