//! The `Station`: the concurrency fabric wiring one or more configured
//! channels' audio, PTT, and CSMA scheduling together (spec §5, §9 design
//! note: "own these in a `Station` value holding `channels: Vec<Channel>`,
//! each channel owning its sub-channel decoder states and its send queue;
//! threads borrow handles into the station; shared atomics back the DCD
//! matrix").
//!
//! Per spec §5 each physical audio device gets its own receive path; this
//! implementation spawns one receive worker per configured channel against
//! that channel's `InputSource` handle rather than literally one thread per
//! device, since a stereo device shared by two channels already hands out
//! independent per-channel handles from the same underlying `Soundcard`
//! (see [`crate::soundcard`]) — documented in DESIGN.md.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::sync_channel;
use std::sync::{Arc, Mutex, RwLock};
use std::thread;
use std::time::Instant;

use rand::Rng;

use ax25tnc_core::channel::Channel;
use ax25tnc_core::dispatcher::{DispatcherConfig, FrameDispatcher};
use ax25tnc_core::event::{Event, EventQueue, RxLevel};
use ax25tnc_core::fx25::Fx25Deframer;
use ax25tnc_core::hdlc::{Ax25Serializer, HdlcDeframer};
use ax25tnc_core::scheduler::{CsmaOutcome, CsmaScheduler};
use ax25tnc_core::txqueue::{Priority, SendQueue};

use crate::audio::{AudioEvent, InputSource, OutputBuffer, OutputSink};
use crate::demod::Demodulator;
use crate::dcd::DcdMatrix;
use crate::error::AppError;
use crate::modem::AfskModulator;
use crate::ptt::Ptt;

/// Everything the caller supplies to bring one channel's hardware/software
/// collaborators under `Station` management. `config.rs` builds these from
/// a parsed tag-grammar configuration; tests build them directly with null
/// implementations.
pub struct ChannelSetup {
    pub channel: Channel,
    pub dispatcher_config: DispatcherConfig,
    pub input: Arc<dyn InputSource>,
    pub output: Arc<dyn OutputSink>,
    pub demod: Box<dyn Demodulator>,
    pub ptt: Box<dyn Ptt>,
}

struct ChannelRuntime {
    id: usize,
    channel: RwLock<Channel>,
    queue: Mutex<SendQueue>,
    input: Arc<dyn InputSource>,
    output: Arc<dyn OutputSink>,
    /// Mirrors each received frame back out unmodified over the same
    /// transport that accepted it, for the `KISSCOPY` diagnostic setting
    /// (spec §9).
    kiss_copy: AtomicBool,
}

/// The running station: one or more channels, each with its own receive
/// and transmit workers, sharing a DCD matrix and a single event queue.
pub struct Station {
    channels: Vec<Arc<ChannelRuntime>>,
    dcd: Arc<DcdMatrix>,
    events: Arc<EventQueue>,
}

impl Station {
    pub fn new(setups: Vec<ChannelSetup>) -> Self {
        let dcd = Arc::new(DcdMatrix::new(setups.len()));
        let events = Arc::new(EventQueue::new());

        let mut device_locks: Vec<Arc<Mutex<()>>> = Vec::new();
        let mut runtimes = Vec::with_capacity(setups.len());

        for setup in setups {
            let id = setup.channel.id;
            while device_locks.len() <= setup.channel.device_index() {
                device_locks.push(Arc::new(Mutex::new(())));
            }
            let device_lock = device_locks[setup.channel.device_index()].clone();

            let runtime = Arc::new(ChannelRuntime {
                id,
                channel: RwLock::new(setup.channel),
                queue: Mutex::new(SendQueue::new()),
                input: setup.input.clone(),
                output: setup.output.clone(),
                kiss_copy: AtomicBool::new(false),
            });

            spawn_receive_worker(
                runtime.clone(),
                setup.input,
                setup.demod,
                setup.dispatcher_config,
                dcd.clone(),
                events.clone(),
            );
            spawn_transmit_worker(runtime.clone(), setup.output, setup.ptt, dcd.clone(), device_lock, events.clone());

            runtimes.push(runtime);
        }

        Self {
            channels: runtimes,
            dcd,
            events,
        }
    }

    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    pub fn dcd(&self) -> &DcdMatrix {
        &self.dcd
    }

    fn runtime(&self, channel_id: usize) -> Result<&Arc<ChannelRuntime>, AppError> {
        self.channels
            .iter()
            .find(|c| c.id == channel_id)
            .ok_or(AppError::UnknownChannel(channel_id))
    }

    /// Queue a packet (no FCS) for transmission on `channel_id` (spec §3
    /// "Send Queue").
    pub fn enqueue_frame(&self, channel_id: usize, packet: Vec<u8>, priority: Priority) -> Result<(), AppError> {
        let runtime = self.runtime(channel_id)?;
        runtime.queue.lock().unwrap().enqueue(packet, priority);
        Ok(())
    }

    pub fn set_kiss_copy(&self, channel_id: usize, enabled: bool) -> Result<(), AppError> {
        let runtime = self.runtime(channel_id)?;
        runtime.kiss_copy.store(enabled, Ordering::Relaxed);
        Ok(())
    }

    /// Whether `KISSCOPY` is enabled for this channel (spec §9: a
    /// connected client's own transmitted frame is echoed back to it). A
    /// single active client per transport is assumed, so "echo to all
    /// KISS clients" reduces to echoing back to the one client that sent
    /// it, recorded in DESIGN.md.
    pub fn kiss_copy_enabled(&self, channel_id: usize) -> bool {
        self.runtime(channel_id)
            .map(|r| r.kiss_copy.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    /// Apply one of the KISS timing parameter commands (`TXDELAY`, `P`,
    /// `SLOTTIME`, `TXTAIL`, `FULLDUP`) to a channel at runtime, as a
    /// connected client is entitled to do (spec §6 "Transmit timing").
    pub fn set_timing<F: FnOnce(&mut ax25tnc_core::channel::TransmitTiming)>(
        &self,
        channel_id: usize,
        f: F,
    ) -> Result<(), AppError> {
        let runtime = self.runtime(channel_id)?;
        f(&mut runtime.channel.write().unwrap().timing);
        Ok(())
    }

    pub fn set_tx_inhibit(&self, channel_id: usize, asserted: bool) -> Result<(), AppError> {
        self.runtime(channel_id)?;
        self.dcd.row(channel_id).set_tx_inhibit(asserted);
        Ok(())
    }

    /// Shut down every channel's audio I/O. Workers exit once their input
    /// channel closes; this does not join them.
    pub fn close(&self) {
        for runtime in &self.channels {
            runtime.input.close();
            runtime.output.close();
        }
    }
}

fn spawn_receive_worker(
    runtime: Arc<ChannelRuntime>,
    input: Arc<dyn InputSource>,
    mut demod: Box<dyn Demodulator>,
    dispatcher_config: DispatcherConfig,
    dcd: Arc<DcdMatrix>,
    events: Arc<EventQueue>,
) {
    thread::spawn(move || {
        let (tx, rx) = sync_channel::<AudioEvent>(64);
        input.start(tx);

        let (num_sub, num_slicers) = {
            let channel = runtime.channel.read().unwrap();
            (
                channel.num_sub_channels as usize,
                channel.num_slicers_per_sub_channel as usize,
            )
        };
        let dispatcher = FrameDispatcher::new(dispatcher_config);
        let mut hdlc: Vec<Vec<HdlcDeframer>> = (0..num_sub)
            .map(|sub| (0..num_slicers).map(|slicer| HdlcDeframer::new(runtime.id, sub, slicer)).collect())
            .collect();
        // FX.25 correlation runs in parallel with plain HDLC regardless of
        // this channel's own transmit FEC preference: a receiver cannot
        // know in advance whether the far end sent FX.25 (spec §4.2).
        let mut fx25: Vec<Vec<Fx25Deframer>> = (0..num_sub)
            .map(|sub| (0..num_slicers).map(|slicer| Fx25Deframer::new(runtime.id, sub, slicer)).collect())
            .collect();

        while let Ok(AudioEvent::BasebandInput(samples)) = rx.recv() {
            for &sample in samples.iter() {
                for bit in demod.process_sample(sample) {
                    dcd.row(runtime.id).set(
                        bit.sub_channel,
                        bit.slicer,
                        demod.data_carrier_detect(bit.sub_channel, bit.slicer),
                    );

                    if let Some(row) = hdlc.get_mut(bit.sub_channel) {
                        if let Some(deframer) = row.get_mut(bit.slicer) {
                            if let Some(candidate) = deframer.on_bit(bit.raw) {
                                if let Some(event) =
                                    dispatcher.validate_hdlc_candidate(&candidate, RxLevel::default())
                                {
                                    events.enqueue(Event::Frame(event));
                                }
                            }
                        }
                    }

                    if let Some(row) = fx25.get_mut(bit.sub_channel) {
                        if let Some(deframer) = row.get_mut(bit.slicer) {
                            if let Some(candidate) = deframer.on_bit(bit.raw) {
                                let event = dispatcher.deliver_fx25_candidate(candidate, RxLevel::default());
                                events.enqueue(Event::Frame(event));
                            }
                        }
                    }
                }
            }
        }
    });
}

/// Flag-octet duration in milliseconds at `bits_per_second`.
fn flag_duration_ms(bits_per_second: u32) -> f64 {
    8_000.0 / bits_per_second as f64
}

fn spawn_transmit_worker(
    runtime: Arc<ChannelRuntime>,
    output: Arc<dyn OutputSink>,
    mut ptt: Box<dyn Ptt>,
    dcd: Arc<DcdMatrix>,
    device_lock: Arc<Mutex<()>>,
    events: Arc<EventQueue>,
) {
    thread::spawn(move || {
        let (output_event_tx, output_event_rx) = sync_channel::<AudioEvent>(64);
        let buffer = Arc::new(RwLock::new(OutputBuffer::default()));
        output.start(output_event_tx, buffer.clone());
        // Drain output-side notifications so the device callback never
        // blocks on a full channel; this worker drives PTT timing off the
        // sample count it queues instead (see module doc simplification).
        thread::spawn(move || while output_event_rx.recv().is_ok() {});

        let mut scheduler = CsmaScheduler::new();
        let clock = Instant::now();
        let mut rng = rand::thread_rng();

        loop {
            let now_ms = clock.elapsed().as_millis() as u64;
            let channel = runtime.channel.read().unwrap().clone();
            let dcd_asserted = dcd.is_busy(runtime.id);
            let persistence_draw: u8 = rng.gen();

            let lock_attempt = device_lock.try_lock();
            let device_lock_acquired = lock_attempt.is_ok();

            let outcome = {
                let mut queue = runtime.queue.lock().unwrap();
                scheduler.poll(
                    &channel,
                    now_ms,
                    dcd_asserted,
                    false,
                    device_lock_acquired,
                    &mut queue,
                    persistence_draw,
                )
            };

            match outcome {
                CsmaOutcome::BeginTransmission(plan) => {
                    let _device_guard = lock_attempt.ok();
                    transmit_plan(&channel, &plan, ptt.as_mut(), &buffer);
                }
                CsmaOutcome::Idle => {
                    thread::sleep(std::time::Duration::from_millis(50));
                }
                CsmaOutcome::Timeout => {
                    log::warn!("channel {}: transmit wait timed out, dropped head frame", runtime.id);
                }
                CsmaOutcome::Waiting | CsmaOutcome::AcquireDeviceLock => {
                    thread::sleep(std::time::Duration::from_millis(10));
                }
            }
        }
    });
}

fn transmit_plan(channel: &Channel, plan: &ax25tnc_core::scheduler::TransmissionPlan, ptt: &mut dyn Ptt, buffer: &Arc<RwLock<OutputBuffer>>) {
    if let Err(e) = ptt.ptt_on() {
        log::warn!("channel {}: PTT on failed: {e}", channel.id);
        return;
    }

    let mut serializer = Ax25Serializer::new();
    let mut bits = Vec::new();
    let flag_ms = flag_duration_ms(channel.bits_per_second);
    let txdelay_flags = ((plan.txdelay_ms as f64 / flag_ms).round() as usize).max(1);
    let txtail_flags = ((plan.txtail_ms as f64 / flag_ms).round() as usize).max(1);
    serializer.emit_flags(txdelay_flags, &mut bits);
    for frame in &plan.frames {
        let corrupt = channel.xmit_error_rate > 0 && rand::thread_rng().gen_range(0..100) < channel.xmit_error_rate;
        serializer.serialize_frame(frame, corrupt, &mut bits);
    }
    serializer.emit_flags(txtail_flags, &mut bits);

    let mut modulator = AfskModulator::new(channel);
    let mut samples = Vec::with_capacity(bits.len() * 40);
    for bit in bits {
        modulator.set_bit(bit);
        while !modulator.bit_complete() {
            samples.push(modulator.next_sample());
        }
    }

    let playback_ms = (samples.len() as u64 * 1000) / crate::modem::SAMPLE_RATE_HZ as u64;
    {
        let mut buffer = buffer.write().unwrap();
        buffer.idling = false;
        buffer.samples.extend(samples);
    }
    thread::sleep(std::time::Duration::from_millis(playback_ms));
    {
        let mut buffer = buffer.write().unwrap();
        buffer.idling = true;
        buffer.samples.clear();
    }

    if let Err(e) = ptt.ptt_off() {
        log::warn!("channel {}: PTT off failed: {e}", channel.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{NullInputSource, NullOutputSink};
    use crate::demod::NullDemodulator;
    use crate::ptt::NullPtt;

    fn null_setup(id: usize) -> ChannelSetup {
        ChannelSetup {
            channel: Channel::new(id),
            dispatcher_config: DispatcherConfig::default(),
            input: Arc::new(NullInputSource),
            output: Arc::new(NullOutputSink),
            demod: Box::new(NullDemodulator),
            ptt: Box::new(NullPtt),
        }
    }

    #[test]
    fn enqueue_frame_rejects_unknown_channel() {
        let station = Station::new(vec![null_setup(0)]);
        assert!(matches!(
            station.enqueue_frame(7, vec![1, 2, 3], Priority::Low),
            Err(AppError::UnknownChannel(7))
        ));
    }

    #[test]
    fn enqueue_frame_accepts_configured_channel() {
        let station = Station::new(vec![null_setup(0)]);
        assert!(station.enqueue_frame(0, vec![1, 2, 3], Priority::Low).is_ok());
    }

    #[test]
    fn tx_inhibit_is_visible_on_the_dcd_matrix() {
        let station = Station::new(vec![null_setup(0)]);
        assert!(!station.dcd().is_busy(0));
        station.set_tx_inhibit(0, true).unwrap();
        assert!(station.dcd().is_busy(0));
    }
}
