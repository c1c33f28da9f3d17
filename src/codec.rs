//! Audio encoding negotiation.
//!
//! A recording is only useful if it can be replayed inside the portal, so a
//! candidate encoding must pass BOTH checks: the capture side can encode it
//! and the playback side can decode it. Picking an encode-only format would
//! silently create audio attachments the visit view can never play.

/// Capability probe for one side of the pipeline.
pub trait CodecSupport {
    /// Can the capture subsystem produce this MIME type?
    fn can_encode(&self, mime: &str) -> bool;
    /// Can the in-app playback path decode this MIME type?
    fn can_play(&self, mime: &str) -> bool;
}

/// Select the first candidate, in caller-supplied priority order, that both
/// sides support. Returns `None` when nothing qualifies; the caller must
/// refuse to start recording in that case.
pub fn select_audio_encoding(candidates: &[String], support: &dyn CodecSupport) -> Option<String> {
    candidates
        .iter()
        .find(|mime| support.can_encode(mime) && support.can_play(mime))
        .cloned()
}

/// What this crate can actually do natively: encode WAV via hound and play
/// WAV back. Anything else fails one side or the other.
pub struct NativeCodecSupport;

impl CodecSupport for NativeCodecSupport {
    fn can_encode(&self, mime: &str) -> bool {
        is_wav(mime)
    }

    fn can_play(&self, mime: &str) -> bool {
        is_wav(mime)
    }
}

fn is_wav(mime: &str) -> bool {
    let base = mime.split(';').next().unwrap_or("").trim();
    base.eq_ignore_ascii_case("audio/wav") || base.eq_ignore_ascii_case("audio/wave")
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Support table driven by explicit lists, for asymmetric scenarios.
    struct TableSupport {
        encodable: Vec<&'static str>,
        playable: Vec<&'static str>,
    }

    impl CodecSupport for TableSupport {
        fn can_encode(&self, mime: &str) -> bool {
            self.encodable.contains(&mime)
        }
        fn can_play(&self, mime: &str) -> bool {
            self.playable.contains(&mime)
        }
    }

    fn candidates(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn picks_first_candidate_supported_on_both_sides() {
        let support = TableSupport {
            encodable: vec!["audio/webm;codecs=opus", "audio/wav"],
            playable: vec!["audio/webm;codecs=opus", "audio/wav"],
        };
        let picked = select_audio_encoding(
            &candidates(&["audio/webm;codecs=opus", "audio/wav"]),
            &support,
        );
        assert_eq!(picked.as_deref(), Some("audio/webm;codecs=opus"));
    }

    #[test]
    fn skips_encodable_but_unplayable_candidate() {
        // Encoder supports both, playback only WAV: must pick WAV, not the
        // first candidate.
        let support = TableSupport {
            encodable: vec!["audio/webm;codecs=opus", "audio/wav"],
            playable: vec!["audio/wav"],
        };
        let picked = select_audio_encoding(
            &candidates(&["audio/webm;codecs=opus", "audio/wav"]),
            &support,
        );
        assert_eq!(picked.as_deref(), Some("audio/wav"));
    }

    #[test]
    fn skips_playable_but_unencodable_candidate() {
        let support = TableSupport {
            encodable: vec!["audio/wav"],
            playable: vec!["audio/webm;codecs=opus", "audio/wav"],
        };
        let picked = select_audio_encoding(
            &candidates(&["audio/webm;codecs=opus", "audio/wav"]),
            &support,
        );
        assert_eq!(picked.as_deref(), Some("audio/wav"));
    }

    #[test]
    fn returns_none_when_nothing_qualifies() {
        let support = TableSupport {
            encodable: vec!["audio/wav"],
            playable: vec!["audio/ogg"],
        };
        let picked = select_audio_encoding(
            &candidates(&["audio/wav", "audio/ogg", "audio/mp4"]),
            &support,
        );
        assert_eq!(picked, None);
    }

    #[test]
    fn empty_candidate_list_yields_none() {
        let picked = select_audio_encoding(&[], &NativeCodecSupport);
        assert_eq!(picked, None);
    }

    #[test]
    fn native_support_accepts_wav_with_parameters() {
        assert!(NativeCodecSupport.can_encode("audio/wav"));
        assert!(NativeCodecSupport.can_play("audio/wav;rate=48000"));
        assert!(!NativeCodecSupport.can_encode("audio/webm;codecs=opus"));
    }
}
