//! Audio capture pipeline: state machine, microphone recorder, WAV
//! framing, and the engine loop that ties them to the upload client.

pub mod engine;
pub mod recorder;
pub mod state;
pub mod wav;

pub use engine::{CaptureEngine, Phase, RecordingSnapshot};
pub use recorder::{ActiveTrack, AudioInput, CaptureError, CpalAudioInput};
pub use state::{assemble_chunks, reduce, Effect, Event, PcmFormat, State};
pub use wav::frame_wav;
