//! Multipart media uploads (recorded audio, report images).
//!
//! All audio destinations share one wire shape: a multipart `file` part
//! with a filename and MIME type, answered with a stored URL plus either a
//! transcript or a summary depending on the endpoint. The differences are
//! folded into [`AudioUploadOutcome`] so the capture engine stays agnostic
//! about which surface it is recording for.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};

use crate::auth::AuthSession;
use crate::error::PortalError;

use super::types::{AudioUploadResponse, ImageUploadResponse};
use super::{decode, ApiClient};

/// Which surface a recording belongs to. Each maps to its own endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaDestination {
    /// Patient asking a question by voice; the backend stores it as a
    /// pending question and returns the transcript.
    QuestionAudio,
    /// Doctor dictating a visit summary; the backend returns a summary.
    VisitSummary,
    /// Voice input for the chat screen; transcribed like a question.
    ChatVoice,
}

impl MediaDestination {
    fn endpoint(&self) -> &'static str {
        match self {
            MediaDestination::QuestionAudio | MediaDestination::ChatVoice => {
                "/upload-question-audio"
            }
            MediaDestination::VisitSummary => "/summarize-audio",
        }
    }

    fn file_name(&self) -> &'static str {
        match self {
            MediaDestination::QuestionAudio => "question.wav",
            MediaDestination::VisitSummary => "visit-summary.wav",
            MediaDestination::ChatVoice => "chat.wav",
        }
    }
}

/// Normalized result of an audio upload: the text the backend produced
/// (transcript or summary) and the playable stored URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioUploadOutcome {
    pub transcript: String,
    pub media_url: String,
}

impl AudioUploadOutcome {
    fn from_response(response: AudioUploadResponse) -> Self {
        Self {
            transcript: response
                .transcript
                .or(response.summary)
                .unwrap_or_default(),
            media_url: response.audio_url,
        }
    }
}

/// Result of uploading a report image for OCR/summarization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportAttachment {
    pub summary: String,
    pub report_type: String,
    pub image_url: String,
}

/// Seam between the capture engine and the transcription backend.
#[async_trait]
pub trait AudioUploader: Send + Sync + 'static {
    async fn upload_audio(
        &self,
        destination: MediaDestination,
        blob: Vec<u8>,
        mime_type: &str,
    ) -> Result<AudioUploadOutcome, PortalError>;
}

/// Uploader bound to one API client and one authenticated session.
#[derive(Debug, Clone)]
pub struct PortalUploader {
    api: ApiClient,
    session: AuthSession,
}

impl PortalUploader {
    pub fn new(api: ApiClient, session: AuthSession) -> Self {
        Self { api, session }
    }
}

#[async_trait]
impl AudioUploader for PortalUploader {
    async fn upload_audio(
        &self,
        destination: MediaDestination,
        blob: Vec<u8>,
        mime_type: &str,
    ) -> Result<AudioUploadOutcome, PortalError> {
        upload_audio(&self.api, &self.session, destination, blob, mime_type).await
    }
}

/// Send a framed recording to the destination's endpoint. No retries: a
/// failure surfaces once and the recording session ends in `Failed`.
pub async fn upload_audio(
    api: &ApiClient,
    session: &AuthSession,
    destination: MediaDestination,
    blob: Vec<u8>,
    mime_type: &str,
) -> Result<AudioUploadOutcome, PortalError> {
    log::info!(
        "Uploading {} bytes of audio to {}",
        blob.len(),
        destination.endpoint()
    );

    let part = Part::bytes(blob)
        .file_name(destination.file_name())
        .mime_str(mime_type)
        .map_err(|e| PortalError::Network(format!("Invalid MIME type: {}", e)))?;
    let form = Form::new().part("file", part);

    let response = api
        .http()
        .post(format!("{}{}", api.base_url(), destination.endpoint()))
        .header("Authorization", &session.user_id)
        .multipart(form)
        .send()
        .await
        .map_err(|e| PortalError::Network(e.to_string()))?;

    let body: AudioUploadResponse = decode(response).await?;
    Ok(AudioUploadOutcome::from_response(body))
}

/// Upload a report image and get back its summary for attachment to a
/// visit draft.
pub async fn upload_report_image(
    api: &ApiClient,
    session: &AuthSession,
    image: Vec<u8>,
    file_name: &str,
    mime_type: &str,
) -> Result<ReportAttachment, PortalError> {
    let part = Part::bytes(image)
        .file_name(file_name.to_string())
        .mime_str(mime_type)
        .map_err(|e| PortalError::Network(format!("Invalid MIME type: {}", e)))?;
    let form = Form::new().part("file", part);

    let response = api
        .http()
        .post(format!("{}/summarize-image", api.base_url()))
        .header("Authorization", &session.user_id)
        .multipart(form)
        .send()
        .await
        .map_err(|e| PortalError::Network(e.to_string()))?;

    let body: ImageUploadResponse = decode(response).await?;
    Ok(ReportAttachment {
        summary: body.summary,
        report_type: body.reporttype,
        image_url: body.image_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_prefers_transcript_over_summary() {
        let outcome = AudioUploadOutcome::from_response(AudioUploadResponse {
            transcript: Some("when should I take it?".to_string()),
            summary: None,
            audio_url: "https://x/q.wav".to_string(),
        });
        assert_eq!(outcome.transcript, "when should I take it?");

        let outcome = AudioUploadOutcome::from_response(AudioUploadResponse {
            transcript: None,
            summary: Some("stable vitals".to_string()),
            audio_url: "https://x/s.wav".to_string(),
        });
        assert_eq!(outcome.transcript, "stable vitals");
        assert_eq!(outcome.media_url, "https://x/s.wav");
    }

    #[test]
    fn destinations_route_to_their_endpoints() {
        assert_eq!(
            MediaDestination::QuestionAudio.endpoint(),
            "/upload-question-audio"
        );
        assert_eq!(MediaDestination::VisitSummary.endpoint(), "/summarize-audio");
        assert_eq!(
            MediaDestination::ChatVoice.endpoint(),
            "/upload-question-audio"
        );
    }
}
