//! The audio sample boundary (spec §6 "Audio sample interface"). A
//! `Sample` producer yields `(device_index, sample)` pairs at the device's
//! configured rate; this crate treats audio device I/O itself as an
//! external collaborator and only specifies the contract an [`InputSource`]
//! / [`OutputSink`] pair must meet. [`crate::soundcard`] is the one
//! concrete, real-I/O implementation it ships.

use std::collections::VecDeque;
use std::sync::mpsc::SyncSender;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// Events flowing out of an audio worker into the per-device receive loop.
pub enum AudioEvent {
    /// A batch of samples read from the input device (mono, or the first
    /// channel of a stereo stream per spec §6).
    BasebandInput(Arc<[i16]>),
    DidReadFromOutputBuffer { len: usize, timestamp: Instant },
    OutputUnderrun,
}

/// A source of receive-side audio samples for one device.
pub trait InputSource: Send + Sync + 'static {
    fn start(&self, samples: SyncSender<AudioEvent>);
    fn close(&self);
}

/// A sink for transmit-side audio samples for one device.
pub trait OutputSink: Send + Sync + 'static {
    fn start(&self, event_tx: SyncSender<AudioEvent>, buffer: Arc<RwLock<OutputBuffer>>);
    fn close(&self);
}

/// Samples queued for playout, shared between the transmit worker (which
/// fills it) and the output device callback (which drains it).
pub struct OutputBuffer {
    pub idling: bool,
    pub samples: VecDeque<i16>,
    pub latency: Duration,
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self {
            idling: true,
            samples: VecDeque::new(),
            latency: Duration::ZERO,
        }
    }
}

/// An input source that never produces anything but silence — useful for
/// a channel with no receiver attached, or for tests that only exercise
/// the transmit side.
#[derive(Default)]
pub struct NullInputSource;

impl InputSource for NullInputSource {
    fn start(&self, _samples: SyncSender<AudioEvent>) {}
    fn close(&self) {}
}

/// An output sink that discards everything written to it.
#[derive(Default)]
pub struct NullOutputSink;

impl OutputSink for NullOutputSink {
    fn start(&self, _event_tx: SyncSender<AudioEvent>, _buffer: Arc<RwLock<OutputBuffer>>) {}
    fn close(&self) {}
}
