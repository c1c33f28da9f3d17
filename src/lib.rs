pub mod api;
pub mod auth;
pub mod capture;
pub mod chat;
pub mod codec;
pub mod config;
pub mod consultation;
pub mod dashboard;
pub mod error;

pub use api::media::{AudioUploadOutcome, MediaDestination, PortalUploader, ReportAttachment};
pub use api::ApiClient;
pub use auth::{signin, signup, AuthSession};
pub use capture::{CaptureEngine, Phase, RecordingSnapshot};
pub use chat::ChatThread;
pub use codec::{select_audio_encoding, NativeCodecSupport};
pub use config::{load_settings, save_settings, ClientSettings};
pub use consultation::{ConsultationSession, VisitDraft, REDIRECT_DELAY};
pub use dashboard::{load_doctor_dashboard, load_patient_dashboard};
pub use error::PortalError;
