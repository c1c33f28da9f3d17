//! WAV container framing for assembled PCM.
//!
//! The final blob sent to the transcription endpoint is the session's
//! chunks, concatenated in arrival order, wrapped in a WAV header. The
//! data section is byte-for-byte the assembled PCM.

use std::io::Cursor;

use hound::{WavSpec, WavWriter};

use super::state::PcmFormat;

/// Wrap 16-bit little-endian PCM bytes in a WAV container.
pub fn frame_wav(format: PcmFormat, pcm: &[u8]) -> Result<Vec<u8>, String> {
    let spec = WavSpec {
        channels: format.channels,
        sample_rate: format.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec)
            .map_err(|e| format!("Failed to create WAV writer: {}", e))?;
        for sample in pcm.chunks_exact(2) {
            writer
                .write_sample(i16::from_le_bytes([sample[0], sample[1]]))
                .map_err(|e| format!("Failed to write sample: {}", e))?;
        }
        writer
            .finalize()
            .map_err(|e| format!("Failed to finalize WAV: {}", e))?;
    }

    Ok(cursor.into_inner())
}
