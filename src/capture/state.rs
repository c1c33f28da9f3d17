//! Recording session state machine.
//!
//! All capture transitions go through the pure `reduce()` function, which
//! returns the next state and a list of effects to execute. The reducer
//! never touches hardware or the network; the engine owns that.
//!
//! One surface owns at most one live session. Starting a new recording
//! replaces the previous session wholesale; events tagged with a stale
//! session id are dropped silently.

use uuid::Uuid;

use crate::error::PortalError;

/// Sample layout of the captured PCM, needed to frame the final blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

/// Authoritative state of one recording session.
#[derive(Debug, Clone)]
pub enum State {
    Idle,
    /// Waiting for the user to grant microphone permission. This is the
    /// pipeline's only user-mediated suspension point. Some input sources
    /// deliver their first chunks before the grant event is processed;
    /// those are buffered here so no leading audio is lost.
    RequestingMic {
        recording_id: Uuid,
        mime_type: String,
        chunks: Vec<Vec<u8>>,
    },
    Recording {
        recording_id: Uuid,
        mime_type: String,
        /// Encoded chunks in arrival order. Order must be preserved when
        /// the final blob is assembled.
        chunks: Vec<Vec<u8>>,
    },
    /// Stop requested; waiting for the hardware track to finalize and
    /// release. Stopping always proceeds to upload — there is no
    /// cancel-without-upload path.
    Stopping {
        recording_id: Uuid,
        mime_type: String,
        chunks: Vec<Vec<u8>>,
    },
    Uploading {
        recording_id: Uuid,
        mime_type: String,
    },
    Ready {
        recording_id: Uuid,
        transcript: String,
        media_url: String,
    },
    Failed {
        error: PortalError,
    },
}

impl Default for State {
    fn default() -> Self {
        State::Idle
    }
}

/// Events fed into the reducer by the surface and the effect runner.
#[derive(Debug, Clone)]
pub enum Event {
    /// User pressed "start recording". Carries the negotiated MIME type;
    /// negotiation happens before this event is ever dispatched.
    StartPressed { mime_type: String },
    /// User pressed "stop recording".
    StopPressed,

    MicGranted {
        id: Uuid,
    },
    MicDenied {
        id: Uuid,
        reason: String,
    },
    ChunkCaptured {
        id: Uuid,
        bytes: Vec<u8>,
    },
    /// The hardware track finalized and was released.
    TracksReleased {
        id: Uuid,
        format: PcmFormat,
    },
    /// Device error while recording or finalizing.
    TrackFailed {
        id: Uuid,
        err: String,
    },

    UploadOk {
        id: Uuid,
        transcript: String,
        media_url: String,
    },
    UploadFail {
        id: Uuid,
        error: PortalError,
    },
}

/// Effects produced by transitions, executed asynchronously by the engine.
#[derive(Debug, Clone)]
pub enum Effect {
    RequestMic {
        id: Uuid,
    },
    /// Stop and release the hardware track. Issued on every exit from
    /// Recording, including error exits — a leaked track leaves the
    /// microphone indicator lit.
    ReleaseTracks {
        id: Uuid,
    },
    Upload {
        id: Uuid,
        pcm: Vec<u8>,
        mime_type: String,
    },
    /// Publish a snapshot to observers.
    EmitState,
}

/// Concatenate chunks in arrival order: `[a, b, c]` yields `a‖b‖c`.
pub fn assemble_chunks(chunks: &[Vec<u8>]) -> Vec<u8> {
    let total: usize = chunks.iter().map(|c| c.len()).sum();
    let mut blob = Vec::with_capacity(total);
    for chunk in chunks {
        blob.extend_from_slice(chunk);
    }
    blob
}

/// Reducer: (state, event) -> (next_state, effects).
pub fn reduce(state: &State, event: Event) -> (State, Vec<Effect>) {
    use Effect::*;
    use Event::*;
    use State::*;

    let current_id: Option<Uuid> = match state {
        Idle | Failed { .. } => None,
        RequestingMic { recording_id, .. }
        | Recording { recording_id, .. }
        | Stopping { recording_id, .. }
        | Uploading { recording_id, .. }
        | Ready { recording_id, .. } => Some(*recording_id),
    };

    let is_stale = |eid: Uuid| Some(eid) != current_id;

    match (state, event) {
        // -----------------
        // Starting a session
        // -----------------
        (Idle | Ready { .. } | Failed { .. }, StartPressed { mime_type }) => {
            let id = Uuid::new_v4();
            (
                RequestingMic {
                    recording_id: id,
                    mime_type,
                    chunks: Vec::new(),
                },
                vec![RequestMic { id }, EmitState],
            )
        }
        // Only one live session per surface: start while busy is a no-op,
        // never a silent restart.
        (RequestingMic { .. } | Recording { .. } | Stopping { .. } | Uploading { .. }, StartPressed { .. }) => {
            (state.clone(), vec![])
        }

        // -----------------
        // Permission outcome
        // -----------------
        (
            RequestingMic {
                recording_id,
                mime_type,
                chunks,
            },
            MicGranted { id },
        ) if *recording_id == id => (
            Recording {
                recording_id: id,
                mime_type: mime_type.clone(),
                chunks: chunks.clone(),
            },
            vec![EmitState],
        ),
        // The stream may start delivering before the grant event lands;
        // keep those chunks so the session opens with them.
        (
            RequestingMic {
                recording_id,
                mime_type,
                chunks,
            },
            ChunkCaptured { id, bytes },
        ) if *recording_id == id => {
            let mut next = chunks.clone();
            next.push(bytes);
            (
                RequestingMic {
                    recording_id: id,
                    mime_type: mime_type.clone(),
                    chunks: next,
                },
                vec![EmitState],
            )
        }
        (RequestingMic { recording_id, .. }, MicDenied { id, reason }) if *recording_id == id => (
            Failed {
                error: PortalError::PermissionDenied(reason),
            },
            vec![EmitState],
        ),

        // -----------------
        // Recording
        // -----------------
        (
            Recording {
                recording_id,
                mime_type,
                chunks,
            },
            ChunkCaptured { id, bytes },
        ) if *recording_id == id => {
            let mut next = chunks.clone();
            next.push(bytes);
            (
                Recording {
                    recording_id: id,
                    mime_type: mime_type.clone(),
                    chunks: next,
                },
                vec![EmitState],
            )
        }
        (
            Recording {
                recording_id,
                mime_type,
                chunks,
            },
            StopPressed,
        ) => (
            Stopping {
                recording_id: *recording_id,
                mime_type: mime_type.clone(),
                chunks: chunks.clone(),
            },
            vec![
                ReleaseTracks {
                    id: *recording_id,
                },
                EmitState,
            ],
        ),
        (Recording { recording_id, .. }, TrackFailed { id, err }) if *recording_id == id => (
            Failed {
                error: PortalError::Capture(err),
            },
            // Release on the error exit too.
            vec![ReleaseTracks { id }, EmitState],
        ),

        // -----------------
        // Stopping → Uploading
        // -----------------
        (
            Stopping {
                recording_id,
                mime_type,
                chunks,
            },
            TracksReleased { id, format: _ },
        ) if *recording_id == id => (
            Uploading {
                recording_id: id,
                mime_type: mime_type.clone(),
            },
            vec![
                Upload {
                    id,
                    pcm: assemble_chunks(chunks),
                    mime_type: mime_type.clone(),
                },
                EmitState,
            ],
        ),
        (Stopping { recording_id, .. }, TrackFailed { id, err }) if *recording_id == id => (
            Failed {
                error: PortalError::Capture(err),
            },
            vec![EmitState],
        ),

        // -----------------
        // Upload outcome
        // -----------------
        (
            Uploading { recording_id, .. },
            UploadOk {
                id,
                transcript,
                media_url,
            },
        ) if *recording_id == id => (
            Ready {
                recording_id: id,
                transcript,
                media_url,
            },
            vec![EmitState],
        ),
        (Uploading { recording_id, .. }, UploadFail { id, error }) if *recording_id == id => {
            (Failed { error }, vec![EmitState])
        }

        // -----------------
        // Stale or out-of-state events (drop silently)
        // -----------------
        (_, MicGranted { id })
        | (_, MicDenied { id, .. })
        | (_, ChunkCaptured { id, .. })
        | (_, TracksReleased { id, .. })
        | (_, TrackFailed { id, .. })
        | (_, UploadOk { id, .. })
        | (_, UploadFail { id, .. })
            if is_stale(id) =>
        {
            (state.clone(), vec![])
        }

        // -----------------
        // Unhandled: no transition
        // -----------------
        _ => (state.clone(), vec![]),
    }
}
