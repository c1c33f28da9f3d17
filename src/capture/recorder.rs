//! Microphone capture using CPAL.
//!
//! Opening the default input device is the desktop analogue of the browser
//! permission prompt: it either grants a live track or fails up front. The
//! stream lives on a dedicated audio thread so the handle stays `Send`;
//! stopping the track drops the stream, which releases the hardware.

use std::sync::mpsc as std_mpsc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::state::{Event, PcmFormat};

/// Errors that can occur while acquiring or running the input stream.
#[derive(Debug, Clone)]
pub enum CaptureError {
    NoInputDevice,
    NoSupportedConfig,
    StreamCreationFailed(String),
    TrackLost(String),
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureError::NoInputDevice => write!(f, "No audio input device found"),
            CaptureError::NoSupportedConfig => write!(f, "No supported audio configuration"),
            CaptureError::StreamCreationFailed(e) => {
                write!(f, "Failed to create audio stream: {}", e)
            }
            CaptureError::TrackLost(e) => write!(f, "Audio track lost: {}", e),
        }
    }
}

impl std::error::Error for CaptureError {}

/// Seam between the capture engine and the microphone hardware.
/// Tests substitute a stub that counts live tracks.
pub trait AudioInput: Send + Sync + 'static {
    /// Open the microphone and start delivering `ChunkCaptured` events.
    /// Failure here surfaces as a denied/unavailable microphone.
    fn start(
        &self,
        id: Uuid,
        events: mpsc::Sender<Event>,
    ) -> Result<Box<dyn ActiveTrack>, CaptureError>;
}

/// A live hardware track. `stop` finalizes the capture and releases the
/// device; it must be called on every exit path.
pub trait ActiveTrack: Send {
    fn stop(self: Box<Self>) -> Result<PcmFormat, CaptureError>;
}

/// Real CPAL-backed input.
pub struct CpalAudioInput;

struct CpalTrack {
    stop_tx: std_mpsc::Sender<()>,
    done_rx: std_mpsc::Receiver<PcmFormat>,
}

impl ActiveTrack for CpalTrack {
    fn stop(self: Box<Self>) -> Result<PcmFormat, CaptureError> {
        // Ignore send failure: if the audio thread already exited we still
        // drain done_rx to learn whether the track finalized.
        let _ = self.stop_tx.send(());
        self.done_rx
            .recv()
            .map_err(|_| CaptureError::TrackLost("audio thread exited early".to_string()))
    }
}

impl AudioInput for CpalAudioInput {
    fn start(
        &self,
        id: Uuid,
        events: mpsc::Sender<Event>,
    ) -> Result<Box<dyn ActiveTrack>, CaptureError> {
        let (ready_tx, ready_rx) = std_mpsc::channel::<Result<(), CaptureError>>();
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();
        let (done_tx, done_rx) = std_mpsc::channel::<PcmFormat>();

        std::thread::spawn(move || {
            audio_thread(id, events, ready_tx, stop_rx, done_tx);
        });

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Box::new(CpalTrack { stop_tx, done_rx })),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(CaptureError::StreamCreationFailed(
                "audio thread died during setup".to_string(),
            )),
        }
    }
}

/// Owns the CPAL stream for the lifetime of one recording. Dropping the
/// stream at the end releases the microphone.
fn audio_thread(
    id: Uuid,
    events: mpsc::Sender<Event>,
    ready_tx: std_mpsc::Sender<Result<(), CaptureError>>,
    stop_rx: std_mpsc::Receiver<()>,
    done_tx: std_mpsc::Sender<PcmFormat>,
) {
    let host = cpal::default_host();

    let device = match host.default_input_device() {
        Some(d) => d,
        None => {
            let _ = ready_tx.send(Err(CaptureError::NoInputDevice));
            return;
        }
    };

    log::info!("Using audio input device: {:?}", device.name());

    let supported_config = match device.default_input_config() {
        Ok(c) => c,
        Err(_) => {
            let _ = ready_tx.send(Err(CaptureError::NoSupportedConfig));
            return;
        }
    };

    let sample_format = supported_config.sample_format();
    let config: StreamConfig = supported_config.into();
    let format = PcmFormat {
        sample_rate: config.sample_rate.0,
        channels: config.channels,
    };

    log::info!(
        "Audio config: {} Hz, {} channels, {:?}",
        format.sample_rate,
        format.channels,
        sample_format
    );

    let stream = match build_stream(&device, &config, sample_format, id, events) {
        Ok(s) => s,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(CaptureError::StreamCreationFailed(format!(
            "Failed to start stream: {}",
            e
        ))));
        return;
    }

    let _ = ready_tx.send(Ok(()));

    // Block until stop is requested, then drop the stream to release the
    // hardware before reporting the format back.
    let _ = stop_rx.recv();
    drop(stream);
    log::info!("Recording stopped, microphone released");
    let _ = done_tx.send(format);
}

fn build_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    sample_format: SampleFormat,
    id: Uuid,
    events: mpsc::Sender<Event>,
) -> Result<cpal::Stream, CaptureError> {
    let err_fn = |err| log::error!("Audio stream error: {}", err);

    match sample_format {
        SampleFormat::I16 => build_stream_typed::<i16>(device, config, id, events, err_fn),
        SampleFormat::U16 => build_stream_typed::<u16>(device, config, id, events, err_fn),
        SampleFormat::F32 => build_stream_typed::<f32>(device, config, id, events, err_fn),
        _ => Err(CaptureError::NoSupportedConfig),
    }
}

fn build_stream_typed<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    id: Uuid,
    events: mpsc::Sender<Event>,
    err_fn: impl FnMut(cpal::StreamError) + Send + 'static,
) -> Result<cpal::Stream, CaptureError>
where
    T: cpal::Sample<Float = f32> + cpal::SizedSample + Send + 'static,
{
    let stream = device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let mut bytes = Vec::with_capacity(data.len() * 2);
                for &sample in data {
                    bytes.extend_from_slice(&sample_to_i16(sample).to_le_bytes());
                }
                // The callback runs on the realtime audio thread: never
                // block. A full channel drops the chunk with a warning.
                if let Err(e) = events.try_send(Event::ChunkCaptured { id, bytes }) {
                    log::warn!("Dropping audio chunk: {}", e);
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| CaptureError::StreamCreationFailed(e.to_string()))?;

    Ok(stream)
}

/// Convert any sample type to i16 for the WAV payload.
fn sample_to_i16<T: cpal::Sample<Float = f32>>(sample: T) -> i16 {
    let f32_sample: f32 = sample.to_float_sample();
    let clamped = f32_sample.clamp(-1.0, 1.0);
    (clamped * i16::MAX as f32) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_to_i16() {
        assert_eq!(sample_to_i16(0.0f32), 0);
        assert_eq!(sample_to_i16(1.0f32), i16::MAX);
        assert_eq!(sample_to_i16(-1.0f32), -i16::MAX);

        // Clamping
        assert_eq!(sample_to_i16(2.0f32), i16::MAX);
        assert_eq!(sample_to_i16(-2.0f32), -i16::MAX);
    }

    #[test]
    fn capture_error_display() {
        assert!(CaptureError::NoInputDevice.to_string().contains("input device"));
        assert!(CaptureError::TrackLost("gone".to_string())
            .to_string()
            .contains("gone"));
    }
}
