//! Capture engine: owns the session state and executes effects.
//!
//! A single loop task is the only writer of the recording state. Surfaces
//! send events through an mpsc channel and observe the session through a
//! `watch` snapshot channel. Hardware and network work happens in spawned
//! tasks that report back as events, so the reducer stays pure and the
//! loop never blocks on I/O it can defer.
//!
//! One engine instance serves one capture surface; the destination
//! parameter decides which backend endpoint receives the finished blob.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use crate::api::media::{AudioUploader, MediaDestination};
use crate::codec::{select_audio_encoding, CodecSupport};
use crate::error::PortalError;

use super::recorder::{ActiveTrack, AudioInput};
use super::state::{reduce, Effect, Event, PcmFormat, State};
use super::wav::frame_wav;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Observable phase of the session, mirroring `State` without the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    RequestingMic,
    Recording,
    Stopping,
    Uploading,
    Ready,
    Failed,
}

/// What observers see. Chunk bytes stay inside the loop; surfaces only
/// need the phase and the finished result.
#[derive(Debug, Clone, Default)]
pub struct RecordingSnapshot {
    pub phase: Phase,
    pub chunk_count: usize,
    pub transcript: Option<String>,
    pub media_url: Option<String>,
    pub error: Option<String>,
}

impl From<&State> for RecordingSnapshot {
    fn from(state: &State) -> Self {
        match state {
            State::Idle => Self::default(),
            State::RequestingMic { chunks, .. } => Self {
                phase: Phase::RequestingMic,
                chunk_count: chunks.len(),
                ..Self::default()
            },
            State::Recording { chunks, .. } => Self {
                phase: Phase::Recording,
                chunk_count: chunks.len(),
                ..Self::default()
            },
            State::Stopping { chunks, .. } => Self {
                phase: Phase::Stopping,
                chunk_count: chunks.len(),
                ..Self::default()
            },
            State::Uploading { .. } => Self {
                phase: Phase::Uploading,
                ..Self::default()
            },
            State::Ready {
                transcript,
                media_url,
                ..
            } => Self {
                phase: Phase::Ready,
                transcript: Some(transcript.clone()),
                media_url: Some(media_url.clone()),
                ..Self::default()
            },
            State::Failed { error } => Self {
                phase: Phase::Failed,
                error: Some(error.to_string()),
                ..Self::default()
            },
        }
    }
}

/// Handle to one capture surface's engine. Cloneable; all clones talk to
/// the same loop task.
#[derive(Clone)]
pub struct CaptureEngine {
    events_tx: mpsc::Sender<Event>,
    snapshot_rx: watch::Receiver<RecordingSnapshot>,
    /// Negotiated up front; `None` means no candidate passed both the
    /// encode and playback checks and recording must be refused.
    mime_type: Option<String>,
}

impl CaptureEngine {
    pub fn new(
        input: Arc<dyn AudioInput>,
        uploader: Arc<dyn AudioUploader>,
        destination: MediaDestination,
        candidates: &[String],
        support: &dyn CodecSupport,
    ) -> Self {
        let mime_type = select_audio_encoding(candidates, support);
        match &mime_type {
            Some(mime) => log::info!("Negotiated recording format: {}", mime),
            None => log::warn!("No mutually supported recording format; capture disabled"),
        }

        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (snapshot_tx, snapshot_rx) = watch::channel(RecordingSnapshot::default());

        let loop_events_tx = events_tx.clone();
        tokio::spawn(async move {
            engine_loop(
                events_rx,
                loop_events_tx,
                snapshot_tx,
                input,
                uploader,
                destination,
            )
            .await;
        });

        Self {
            events_tx,
            snapshot_rx,
            mime_type,
        }
    }

    /// Begin a recording session. Refuses up front when codec negotiation
    /// found no format that can be both recorded and played back.
    pub async fn start(&self) -> Result<(), PortalError> {
        let mime_type = self
            .mime_type
            .clone()
            .ok_or(PortalError::UnsupportedFormat)?;
        self.events_tx
            .send(Event::StartPressed { mime_type })
            .await
            .map_err(|_| PortalError::Capture("capture engine stopped".to_string()))
    }

    pub async fn stop(&self) -> Result<(), PortalError> {
        self.events_tx
            .send(Event::StopPressed)
            .await
            .map_err(|_| PortalError::Capture("capture engine stopped".to_string()))
    }

    pub fn snapshot(&self) -> RecordingSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RecordingSnapshot> {
        self.snapshot_rx.clone()
    }
}

/// The live hardware track, shared between the loop and the blocking
/// tasks that open and close it. At most one entry, keyed by session id.
type TrackSlot = Arc<std::sync::Mutex<Option<(Uuid, Box<dyn ActiveTrack>)>>>;

fn lock_slot(slot: &TrackSlot) -> std::sync::MutexGuard<'_, Option<(Uuid, Box<dyn ActiveTrack>)>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Single-writer loop: consume events, reduce, execute effects.
///
/// Hardware effects run on blocking tasks that report back as events, so
/// a slow device open or close never stalls event processing (a stop
/// press must be seen promptly even while the mic is still opening).
async fn engine_loop(
    mut events_rx: mpsc::Receiver<Event>,
    events_tx: mpsc::Sender<Event>,
    snapshot_tx: watch::Sender<RecordingSnapshot>,
    input: Arc<dyn AudioInput>,
    uploader: Arc<dyn AudioUploader>,
    destination: MediaDestination,
) {
    let mut state = State::default();
    let track_slot: TrackSlot = Arc::new(std::sync::Mutex::new(None));
    // Sample layout reported when the track finalized; consumed by the
    // next Upload effect.
    let mut pcm_format: Option<PcmFormat> = None;

    while let Some(event) = events_rx.recv().await {
        if let Event::TracksReleased { format, .. } = &event {
            pcm_format = Some(*format);
        }

        let (next, effects) = reduce(&state, event);
        state = next;

        for effect in effects {
            match effect {
                Effect::RequestMic { id } => {
                    let input = Arc::clone(&input);
                    let chunk_tx = events_tx.clone();
                    let events_tx = events_tx.clone();
                    let slot = Arc::clone(&track_slot);
                    tokio::task::spawn_blocking(move || {
                        match input.start(id, chunk_tx) {
                            Ok(handle) => {
                                *lock_slot(&slot) = Some((id, handle));
                                let _ = events_tx.blocking_send(Event::MicGranted { id });
                            }
                            Err(e) => {
                                let _ = events_tx.blocking_send(Event::MicDenied {
                                    id,
                                    reason: e.to_string(),
                                });
                            }
                        }
                    });
                }

                Effect::ReleaseTracks { id } => {
                    let events_tx = events_tx.clone();
                    let slot = Arc::clone(&track_slot);
                    tokio::task::spawn_blocking(move || {
                        let handle = {
                            let mut guard = lock_slot(&slot);
                            match guard.take() {
                                Some((track_id, handle)) if track_id == id => Some(handle),
                                // Stale release; leave a current track alone.
                                other => {
                                    *guard = other;
                                    None
                                }
                            }
                        };
                        let Some(handle) = handle else {
                            return;
                        };
                        let event = match handle.stop() {
                            Ok(format) => Event::TracksReleased { id, format },
                            Err(e) => Event::TrackFailed {
                                id,
                                err: e.to_string(),
                            },
                        };
                        let _ = events_tx.blocking_send(event);
                    });
                }

                Effect::Upload { id, pcm, mime_type } => {
                    let format = pcm_format.unwrap_or(PcmFormat {
                        sample_rate: 48_000,
                        channels: 1,
                    });
                    let uploader = Arc::clone(&uploader);
                    let events_tx = events_tx.clone();
                    tokio::spawn(async move {
                        let outcome = match frame_wav(format, &pcm) {
                            Ok(blob) => {
                                uploader.upload_audio(destination, blob, &mime_type).await
                            }
                            Err(e) => Err(PortalError::Capture(e)),
                        };
                        let event = match outcome {
                            Ok(result) => Event::UploadOk {
                                id,
                                transcript: result.transcript,
                                media_url: result.media_url,
                            },
                            Err(error) => Event::UploadFail { id, error },
                        };
                        let _ = events_tx.send(event).await;
                    });
                }

                Effect::EmitState => {
                    let _ = snapshot_tx.send(RecordingSnapshot::from(&state));
                }
            }
        }
    }

    // Engine shutting down with a live track would leave the microphone
    // open; release it here.
    if let Some((_, handle)) = lock_slot(&track_slot).take() {
        if let Err(e) = handle.stop() {
            log::warn!("Failed to release track on shutdown: {}", e);
        }
    };
}
