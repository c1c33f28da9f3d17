//! One clinical encounter: vitals entry, dictated summary, report image,
//! committed as a single visit update.
//!
//! The commit is a PATCH of the visit followed by at most one report
//! POST, strictly in that order. The report never goes out before the
//! vitals landed. A failure at either step keeps the draft so the doctor
//! can retry without re-entering anything. On retry, writes that already
//! landed are skipped: committed vitals are not re-PATCHed and a
//! committed report is never POSTed a second time.

use std::time::Duration;

use async_trait::async_trait;

use crate::api::media::{AudioUploadOutcome, ReportAttachment};
use crate::api::types::{NewReport, Visit, VisitUpdate};
use crate::api::ApiClient;
use crate::auth::AuthSession;
use crate::error::PortalError;

/// Pause before navigating back after a successful submit, long enough
/// for the confirmation to register.
pub const REDIRECT_DELAY: Duration = Duration::from_millis(1500);

/// Mutable draft owned by one consultation screen. Setters trim input;
/// blank values stay `None` and are omitted from the PATCH body.
#[derive(Debug, Clone, Default)]
pub struct VisitDraft {
    blood_pressure: Option<String>,
    oxygen_level: Option<String>,
    sugar_level: Option<String>,
    weight: Option<String>,
    height: Option<String>,
    recommendation: Option<String>,
    recording: Option<AudioUploadOutcome>,
    report: Option<ReportAttachment>,
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl VisitDraft {
    pub fn set_blood_pressure(&mut self, value: &str) {
        self.blood_pressure = non_empty(value);
    }

    pub fn set_oxygen_level(&mut self, value: &str) {
        self.oxygen_level = non_empty(value);
    }

    pub fn set_sugar_level(&mut self, value: &str) {
        self.sugar_level = non_empty(value);
    }

    pub fn set_weight(&mut self, value: &str) {
        self.weight = non_empty(value);
    }

    pub fn set_height(&mut self, value: &str) {
        self.height = non_empty(value);
    }

    pub fn set_recommendation(&mut self, value: &str) {
        self.recommendation = non_empty(value);
    }

    /// Attach (or replace) the finished recording. Idempotent.
    pub fn attach_recording(&mut self, outcome: AudioUploadOutcome) {
        self.recording = Some(outcome);
    }

    /// Attach (or replace) an uploaded report. Idempotent.
    pub fn attach_report(&mut self, attachment: ReportAttachment) {
        self.report = Some(attachment);
    }

    pub fn recording(&self) -> Option<&AudioUploadOutcome> {
        self.recording.as_ref()
    }

    pub fn report(&self) -> Option<&ReportAttachment> {
        self.report.as_ref()
    }

    /// Project the draft into the PATCH body. The dictated summary rides
    /// along as `content` with its playable URL as `visitsummaryaudio`.
    fn to_update(&self) -> VisitUpdate {
        VisitUpdate {
            bloodpressure: self.blood_pressure.clone(),
            oxygenlevel: self.oxygen_level.clone(),
            sugarlevel: self.sugar_level.clone(),
            weight: self.weight.clone(),
            height: self.height.clone(),
            doctorrecommendation: self.recommendation.clone(),
            content: self.recording.as_ref().map(|r| r.transcript.clone()),
            visitsummaryaudio: self.recording.as_ref().map(|r| r.media_url.clone()),
        }
    }
}

/// Backend writes the session needs; tests substitute a counting stub.
#[async_trait]
pub trait VisitApi: Send + Sync {
    async fn update_visit(
        &self,
        session: &AuthSession,
        visit_id: i64,
        update: &VisitUpdate,
    ) -> Result<(), PortalError>;

    async fn add_report(
        &self,
        session: &AuthSession,
        report: &NewReport,
    ) -> Result<(), PortalError>;

    async fn fetch_visit(
        &self,
        session: &AuthSession,
        visit_id: i64,
    ) -> Result<Visit, PortalError>;
}

#[async_trait]
impl VisitApi for ApiClient {
    async fn update_visit(
        &self,
        session: &AuthSession,
        visit_id: i64,
        update: &VisitUpdate,
    ) -> Result<(), PortalError> {
        ApiClient::update_visit(self, session, visit_id, update).await
    }

    async fn add_report(
        &self,
        session: &AuthSession,
        report: &NewReport,
    ) -> Result<(), PortalError> {
        ApiClient::add_report(self, session, report).await
    }

    async fn fetch_visit(
        &self,
        session: &AuthSession,
        visit_id: i64,
    ) -> Result<Visit, PortalError> {
        ApiClient::visit(self, session, visit_id).await
    }
}

/// One consultation in progress for a specific visit.
#[derive(Debug)]
pub struct ConsultationSession {
    visit_id: i64,
    patient_id: String,
    draft: VisitDraft,
    /// The exact PATCH body that last succeeded, so a retry never
    /// re-sends identical vitals but a draft edited after a failed
    /// submit still gets its changes through.
    committed_update: Option<VisitUpdate>,
    /// The report that already landed, so a retry after a later failure
    /// never creates a duplicate report row.
    committed_report: Option<ReportAttachment>,
}

impl ConsultationSession {
    pub fn new(visit_id: i64, patient_id: String) -> Self {
        Self {
            visit_id,
            patient_id,
            draft: VisitDraft::default(),
            committed_update: None,
            committed_report: None,
        }
    }

    pub fn draft(&self) -> &VisitDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut VisitDraft {
        &mut self.draft
    }

    /// Commit the draft: PATCH the visit, then POST the report if one is
    /// attached, then re-fetch the updated visit. Any failure aborts the
    /// remaining steps and keeps the draft intact for a retry.
    pub async fn submit(
        &mut self,
        backend: &dyn VisitApi,
        session: &AuthSession,
    ) -> Result<Visit, PortalError> {
        let update = self.draft.to_update();
        if !update.is_empty() && self.committed_update.as_ref() != Some(&update) {
            backend
                .update_visit(session, self.visit_id, &update)
                .await?;
            self.committed_update = Some(update);
            log::info!("Visit {} vitals committed", self.visit_id);
        }

        if let Some(report) = self.draft.report() {
            if self.committed_report.as_ref() != Some(report) {
                let new_report = NewReport {
                    patient_id: self.patient_id.clone(),
                    reportcontent: report.summary.clone(),
                    reporttype: report.report_type.clone(),
                    reportdate: chrono::Utc::now().format("%Y-%m-%d").to_string(),
                };
                backend.add_report(session, &new_report).await?;
                self.committed_report = Some(report.clone());
                log::info!("Visit {} report attached", self.visit_id);
            }
        }

        let visit = backend.fetch_visit(session, self.visit_id).await?;
        self.draft = VisitDraft::default();
        self.committed_update = None;
        self.committed_report = None;
        Ok(visit)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::api::types::Role;

    use super::*;

    #[derive(Default)]
    struct StubBackend {
        patches: AtomicUsize,
        posts: AtomicUsize,
        fetches: AtomicUsize,
        last_update: Mutex<Option<VisitUpdate>>,
        last_report: Mutex<Option<NewReport>>,
        fail_patch: bool,
        fail_post: bool,
        fail_fetch: bool,
    }

    #[async_trait]
    impl VisitApi for StubBackend {
        async fn update_visit(
            &self,
            _session: &AuthSession,
            _visit_id: i64,
            update: &VisitUpdate,
        ) -> Result<(), PortalError> {
            self.patches.fetch_add(1, Ordering::SeqCst);
            if self.fail_patch {
                return Err(PortalError::Server {
                    status: 422,
                    message: "invalid blood pressure".to_string(),
                });
            }
            *self.last_update.lock().unwrap() = Some(update.clone());
            Ok(())
        }

        async fn add_report(
            &self,
            _session: &AuthSession,
            report: &NewReport,
        ) -> Result<(), PortalError> {
            self.posts.fetch_add(1, Ordering::SeqCst);
            if self.fail_post {
                return Err(PortalError::Network("connection reset".to_string()));
            }
            *self.last_report.lock().unwrap() = Some(report.clone());
            Ok(())
        }

        async fn fetch_visit(
            &self,
            _session: &AuthSession,
            visit_id: i64,
        ) -> Result<Visit, PortalError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail_fetch {
                return Err(PortalError::Network("connection reset".to_string()));
            }
            Ok(Visit {
                id: visit_id,
                bloodpressure: Some("120/80".to_string()),
                ..Default::default()
            })
        }
    }

    fn doctor() -> AuthSession {
        AuthSession {
            user_id: "d1".to_string(),
            role: Role::Doctor,
        }
    }

    fn session_with_recording() -> ConsultationSession {
        let mut session = ConsultationSession::new(7, "p1".to_string());
        session.draft_mut().set_blood_pressure("120/80");
        session.draft_mut().attach_recording(AudioUploadOutcome {
            transcript: "BP looks good".to_string(),
            media_url: "https://x/a.webm".to_string(),
        });
        session
    }

    #[tokio::test]
    async fn submit_patches_vitals_with_transcript_and_audio_url() {
        let backend = StubBackend::default();
        let mut session = session_with_recording();

        let visit = session.submit(&backend, &doctor()).await.unwrap();

        assert_eq!(backend.patches.load(Ordering::SeqCst), 1);
        assert_eq!(backend.posts.load(Ordering::SeqCst), 0);
        assert_eq!(visit.bloodpressure.as_deref(), Some("120/80"));

        let update = backend.last_update.lock().unwrap().clone().unwrap();
        let body = serde_json::to_value(&update).unwrap();
        assert_eq!(body["bloodpressure"], "120/80");
        assert_eq!(body["content"], "BP looks good");
        assert_eq!(body["visitsummaryaudio"], "https://x/a.webm");
        // Untouched vitals must be omitted, not sent as empty strings.
        assert!(body.get("oxygenlevel").is_none());
    }

    #[tokio::test]
    async fn report_follows_vitals_exactly_once() {
        let backend = StubBackend::default();
        let mut session = session_with_recording();
        session.draft_mut().attach_report(ReportAttachment {
            summary: "chest x-ray clear".to_string(),
            report_type: "xray".to_string(),
            image_url: "https://x/r.png".to_string(),
        });

        session.submit(&backend, &doctor()).await.unwrap();

        assert_eq!(backend.patches.load(Ordering::SeqCst), 1);
        assert_eq!(backend.posts.load(Ordering::SeqCst), 1);
        let report = backend.last_report.lock().unwrap().clone().unwrap();
        assert_eq!(report.patient_id, "p1");
        assert_eq!(report.reportcontent, "chest x-ray clear");
    }

    #[tokio::test]
    async fn rejected_vitals_never_send_the_report() {
        let backend = StubBackend {
            fail_patch: true,
            ..Default::default()
        };
        let mut session = session_with_recording();
        session.draft_mut().attach_report(ReportAttachment {
            summary: "chest x-ray clear".to_string(),
            report_type: "xray".to_string(),
            image_url: "https://x/r.png".to_string(),
        });

        let err = session.submit(&backend, &doctor()).await.unwrap_err();
        assert!(matches!(err, PortalError::Server { status: 422, .. }));
        assert_eq!(backend.posts.load(Ordering::SeqCst), 0);
        // Draft survives for a retry.
        assert!(session.draft().report().is_some());
        assert!(session.draft().recording().is_some());
    }

    #[tokio::test]
    async fn retry_after_failed_report_does_not_repatch_vitals() {
        let mut backend = StubBackend {
            fail_post: true,
            ..Default::default()
        };
        let mut session = session_with_recording();
        session.draft_mut().attach_report(ReportAttachment {
            summary: "chest x-ray clear".to_string(),
            report_type: "xray".to_string(),
            image_url: "https://x/r.png".to_string(),
        });

        session.submit(&backend, &doctor()).await.unwrap_err();
        assert_eq!(backend.patches.load(Ordering::SeqCst), 1);
        assert_eq!(backend.posts.load(Ordering::SeqCst), 1);

        backend.fail_post = false;
        session.submit(&backend, &doctor()).await.unwrap();
        // The vitals PATCH was not repeated; only the report went again.
        assert_eq!(backend.patches.load(Ordering::SeqCst), 1);
        assert_eq!(backend.posts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn retry_after_failed_refetch_does_not_duplicate_the_report() {
        let mut backend = StubBackend {
            fail_fetch: true,
            ..Default::default()
        };
        let mut session = session_with_recording();
        session.draft_mut().attach_report(ReportAttachment {
            summary: "chest x-ray clear".to_string(),
            report_type: "xray".to_string(),
            image_url: "https://x/r.png".to_string(),
        });

        // PATCH and POST both land; only the final re-fetch fails.
        session.submit(&backend, &doctor()).await.unwrap_err();
        assert_eq!(backend.patches.load(Ordering::SeqCst), 1);
        assert_eq!(backend.posts.load(Ordering::SeqCst), 1);

        backend.fail_fetch = false;
        session.submit(&backend, &doctor()).await.unwrap();
        // The retry only repeats the fetch: at most one PATCH and one
        // report row ever exist for this submit.
        assert_eq!(backend.patches.load(Ordering::SeqCst), 1);
        assert_eq!(backend.posts.load(Ordering::SeqCst), 1);
        assert!(session.draft().report().is_none());
    }

    #[tokio::test]
    async fn vitals_added_after_a_failed_submit_are_patched_on_retry() {
        let mut backend = StubBackend {
            fail_post: true,
            ..Default::default()
        };
        // Report-only draft: the first submit has nothing to PATCH and
        // its report POST fails.
        let mut session = ConsultationSession::new(7, "p1".to_string());
        session.draft_mut().attach_report(ReportAttachment {
            summary: "chest x-ray clear".to_string(),
            report_type: "xray".to_string(),
            image_url: "https://x/r.png".to_string(),
        });
        session.submit(&backend, &doctor()).await.unwrap_err();
        assert_eq!(backend.patches.load(Ordering::SeqCst), 0);

        // Vitals entered before the retry must still reach the backend.
        backend.fail_post = false;
        session.draft_mut().set_blood_pressure("120/80");
        session.submit(&backend, &doctor()).await.unwrap();
        assert_eq!(backend.patches.load(Ordering::SeqCst), 1);
        assert_eq!(backend.posts.load(Ordering::SeqCst), 2);
        let update = backend.last_update.lock().unwrap().clone().unwrap();
        assert_eq!(update.bloodpressure.as_deref(), Some("120/80"));
    }

    #[tokio::test]
    async fn successful_submit_clears_the_draft() {
        let backend = StubBackend::default();
        let mut session = session_with_recording();

        session.submit(&backend, &doctor()).await.unwrap();
        assert!(session.draft().recording().is_none());
        assert_eq!(backend.fetches.load(Ordering::SeqCst), 1);

        // A fresh, empty draft submits without patching anything.
        session.submit(&backend, &doctor()).await.unwrap();
        assert_eq!(backend.patches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn setters_trim_and_blank_out() {
        let mut draft = VisitDraft::default();
        draft.set_blood_pressure("  120/80  ");
        draft.set_oxygen_level("   ");
        let update = draft.to_update();
        assert_eq!(update.bloodpressure.as_deref(), Some("120/80"));
        assert!(update.oxygenlevel.is_none());
    }
}
