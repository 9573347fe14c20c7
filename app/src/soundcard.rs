//! A real sound card, via `cpal`, providing the [`InputSource`] /
//! [`OutputSink`] contract against an actual audio device.

use std::{
    borrow::Borrow,
    sync::{
        mpsc::{sync_channel, Receiver, SyncSender},
        Arc, RwLock,
    },
    time::Instant,
};

use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    BuildStreamError, DevicesError, PlayStreamError, SampleFormat, SampleRate, Stream,
    StreamError, SupportedStreamConfigRange, SupportedStreamConfigsError,
};
use thiserror::Error;

use crate::audio::{AudioEvent, InputSource, OutputBuffer, OutputSink};

/// A sound card used for transmitting/receiving baseband on one channel's
/// audio device.
///
/// Use `input()` and `output()` to retrieve source/sink handles; it is fine
/// to use an input from one `Soundcard` and an output from another if
/// receive and transmit live on different physical devices.
pub struct Soundcard {
    event_tx: SyncSender<SoundcardEvent>,
}

impl Soundcard {
    pub fn new<S: Into<String>>(card_name: S) -> Result<Self, SoundcardError> {
        let (card_tx, card_rx) = sync_channel(128);
        let (setup_tx, setup_rx) = sync_channel(1);
        spawn_soundcard_worker(card_rx, setup_tx, card_name.into());
        match setup_rx.recv() {
            Ok(Ok(())) => Ok(Self { event_tx: card_tx }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(SoundcardError::SoundcardInit),
        }
    }

    pub fn input(&self) -> SoundcardInputSource {
        SoundcardInputSource {
            event_tx: self.event_tx.clone(),
        }
    }

    pub fn output(&self) -> SoundcardOutputSink {
        SoundcardOutputSink {
            event_tx: self.event_tx.clone(),
        }
    }

    pub fn set_rx_inverted(&self, inverted: bool) {
        let _ = self.event_tx.send(SoundcardEvent::SetRxInverted(inverted));
    }

    pub fn set_tx_inverted(&self, inverted: bool) {
        let _ = self.event_tx.send(SoundcardEvent::SetTxInverted(inverted));
    }

    /// Soundcards usable as this TNC's audio devices. Requires support for
    /// a 48kHz sample rate.
    pub fn supported_output_cards() -> Vec<String> {
        let mut out = vec![];
        let host = cpal::default_host();
        let Ok(output_devices) = host.output_devices() else {
            return out;
        };
        for d in output_devices {
            let Ok(mut configs) = d.supported_output_configs() else {
                continue;
            };
            if configs.any(config_is_compatible) {
                let Ok(name) = d.name() else { continue };
                out.push(name);
            }
        }
        out.sort();
        out
    }

    pub fn supported_input_cards() -> Vec<String> {
        let mut out = vec![];
        let host = cpal::default_host();
        let Ok(input_devices) = host.input_devices() else {
            return out;
        };
        for d in input_devices {
            let Ok(mut configs) = d.supported_input_configs() else {
                continue;
            };
            if configs.any(config_is_compatible) {
                let Ok(name) = d.name() else { continue };
                out.push(name);
            }
        }
        out.sort();
        out
    }
}

fn config_is_compatible<C: Borrow<SupportedStreamConfigRange>>(config: C) -> bool {
    let config = config.borrow();
    (config.channels() == 1 || config.channels() == 2)
        && config.sample_format() == SampleFormat::I16
        && config.min_sample_rate().0 <= 48000
        && config.max_sample_rate().0 >= 48000
}

enum SoundcardEvent {
    SetRxInverted(bool),
    SetTxInverted(bool),
    StartInput { samples: SyncSender<AudioEvent> },
    CloseInput,
    StartOutput {
        event_tx: SyncSender<AudioEvent>,
        buffer: Arc<RwLock<OutputBuffer>>,
    },
    CloseOutput,
}

pub struct SoundcardInputSource {
    event_tx: SyncSender<SoundcardEvent>,
}

impl InputSource for SoundcardInputSource {
    fn start(&self, samples: SyncSender<AudioEvent>) {
        let _ = self.event_tx.send(SoundcardEvent::StartInput { samples });
    }

    fn close(&self) {
        let _ = self.event_tx.send(SoundcardEvent::CloseInput);
    }
}

pub struct SoundcardOutputSink {
    event_tx: SyncSender<SoundcardEvent>,
}

impl OutputSink for SoundcardOutputSink {
    fn start(&self, event_tx: SyncSender<AudioEvent>, buffer: Arc<RwLock<OutputBuffer>>) {
        let _ = self
            .event_tx
            .send(SoundcardEvent::StartOutput { event_tx, buffer });
    }

    fn close(&self) {
        let _ = self.event_tx.send(SoundcardEvent::CloseOutput);
    }
}

fn spawn_soundcard_worker(
    event_rx: Receiver<SoundcardEvent>,
    setup_tx: SyncSender<Result<(), SoundcardError>>,
    card_name: String,
) {
    std::thread::spawn(move || {
        let host = cpal::default_host();
        let Ok(mut devices) = host.devices() else {
            let _ = setup_tx.send(Err(SoundcardError::Host(DevicesError::BackendSpecific {
                err: cpal::BackendSpecificError {
                    description: "could not enumerate devices".into(),
                },
            })));
            return;
        };
        let Some(device) = devices.find(|d| d.name().map(|n| n == card_name).unwrap_or(false))
        else {
            let _ = setup_tx.send(Err(SoundcardError::CardNotFound(card_name)));
            return;
        };

        let _ = setup_tx.send(Ok(()));
        let mut rx_inverted = false;
        let mut tx_inverted = false;
        let mut input_stream: Option<Stream> = None;
        let mut output_stream: Option<Stream> = None;

        while let Ok(ev) = event_rx.recv() {
            match ev {
                SoundcardEvent::SetRxInverted(inv) => rx_inverted = inv,
                SoundcardEvent::SetTxInverted(inv) => tx_inverted = inv,
                SoundcardEvent::StartInput { samples } => {
                    let Ok(mut input_configs) = device.supported_input_configs() else {
                        continue;
                    };
                    let Some(input_config) = input_configs.find(config_is_compatible) else {
                        continue;
                    };
                    let input_config = input_config.with_sample_rate(SampleRate(48000));
                    let channels = input_config.channels();
                    let stream = match device.build_input_stream(
                        &input_config.into(),
                        move |data: &[i16], _info: &cpal::InputCallbackInfo| {
                            let mut out = vec![];
                            for d in data.chunks(channels as usize) {
                                let mut sample = d[0];
                                if rx_inverted {
                                    sample = sample.saturating_neg();
                                }
                                out.push(sample);
                            }
                            let _ = samples.try_send(AudioEvent::BasebandInput(out.into()));
                        },
                        move |_e| {},
                        None,
                    ) {
                        Ok(s) => s,
                        Err(_) => continue,
                    };
                    if stream.play().is_err() {
                        continue;
                    }
                    input_stream = Some(stream);
                }
                SoundcardEvent::CloseInput => {
                    let _ = input_stream.take();
                }
                SoundcardEvent::StartOutput { event_tx, buffer } => {
                    let Ok(mut output_configs) = device.supported_output_configs() else {
                        continue;
                    };
                    let Some(output_config) = output_configs.find(config_is_compatible) else {
                        continue;
                    };
                    let output_config = output_config.with_sample_rate(SampleRate(48000));
                    let channels = output_config.channels();
                    let stream = match device.build_output_stream(
                        &output_config.into(),
                        move |data: &mut [i16], info: &cpal::OutputCallbackInfo| {
                            let mut taken = 0;
                            let ts = info.timestamp();
                            let latency = ts
                                .playback
                                .duration_since(&ts.callback)
                                .unwrap_or_default();
                            let mut buffer = buffer.write().unwrap();
                            buffer.latency = latency;
                            for out in data.chunks_mut(channels as usize) {
                                if let Some(s) = buffer.samples.pop_front() {
                                    out.fill(if tx_inverted { s.saturating_neg() } else { s });
                                    taken += 1;
                                } else if buffer.idling {
                                    out.fill(0);
                                } else {
                                    let _ = event_tx.send(AudioEvent::OutputUnderrun);
                                    break;
                                }
                            }
                            let _ = event_tx.send(AudioEvent::DidReadFromOutputBuffer {
                                len: taken,
                                timestamp: Instant::now(),
                            });
                        },
                        move |_e| {},
                        None,
                    ) {
                        Ok(s) => s,
                        Err(_) => continue,
                    };
                    if stream.play().is_err() {
                        continue;
                    }
                    output_stream = Some(stream);
                }
                SoundcardEvent::CloseOutput => {
                    let _ = output_stream.take();
                }
            }
        }
    });
}

#[derive(Debug, Error)]
pub enum SoundcardError {
    #[error("sound card init aborted unexpectedly")]
    SoundcardInit,

    #[error("unable to enumerate devices: {0}")]
    Host(DevicesError),

    #[error("unable to locate sound card '{0}' - is it in use?")]
    CardNotFound(String),

    #[error("error occurred in soundcard i/o: {0}")]
    Stream(#[source] StreamError),

    #[error("unable to retrieve supported configs for soundcard: {0}")]
    SupportedConfigs(#[source] SupportedStreamConfigsError),

    #[error("could not find a suitable soundcard config")]
    NoValidConfigAvailable,

    #[error("unable to build soundcard stream: {0}")]
    StreamBuild(#[source] BuildStreamError),

    #[error("unable to play stream")]
    StreamPlay(#[source] PlayStreamError),
}
