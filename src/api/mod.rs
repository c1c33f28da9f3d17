//! REST client for the portal backend.
//!
//! One shared HTTP client (avoids TLS handshake overhead) with a fixed
//! request timeout; the backend itself imposes none. The `Authorization`
//! header carries the opaque user id from an explicitly passed
//! [`AuthSession`] — there is no ambient auth state anywhere in the crate.

pub mod media;
pub mod types;

use std::sync::OnceLock;
use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::auth::AuthSession;
use crate::config::ClientSettings;
use crate::error::PortalError;

use types::*;

/// Global HTTP client for reuse across requests.
static HTTP_CLIENT: OnceLock<Client> = OnceLock::new();

fn http_client(timeout: Duration) -> &'static Client {
    HTTP_CLIENT.get_or_init(|| {
        Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client")
    })
}

/// Shape of the backend's error payloads: `{"error": "..."}`.
#[derive(Debug, serde::Deserialize)]
struct ApiErrorBody {
    error: String,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    timeout: Duration,
}

impl ApiClient {
    pub fn new(settings: &ClientSettings) -> Self {
        Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(settings.request_timeout_secs),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn http(&self) -> &'static Client {
        http_client(self.timeout)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        session: &AuthSession,
        path: &str,
    ) -> Result<T, PortalError> {
        let response = self
            .http()
            .get(self.url(path))
            .header("Authorization", &session.user_id)
            .send()
            .await
            .map_err(|e| PortalError::Network(e.to_string()))?;
        decode(response).await
    }

    pub(crate) async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        session: Option<&AuthSession>,
        path: &str,
        body: &B,
    ) -> Result<T, PortalError> {
        let mut request = self.http().post(self.url(path)).json(body);
        if let Some(session) = session {
            request = request.header("Authorization", &session.user_id);
        }
        let response = request
            .send()
            .await
            .map_err(|e| PortalError::Network(e.to_string()))?;
        decode(response).await
    }

    pub(crate) async fn patch_json<B: Serialize, T: DeserializeOwned>(
        &self,
        session: &AuthSession,
        path: &str,
        body: &B,
    ) -> Result<T, PortalError> {
        let response = self
            .http()
            .patch(self.url(path))
            .header("Authorization", &session.user_id)
            .json(body)
            .send()
            .await
            .map_err(|e| PortalError::Network(e.to_string()))?;
        decode(response).await
    }

    // -- Visits -------------------------------------------------------------

    pub async fn visit(&self, session: &AuthSession, visit_id: i64) -> Result<Visit, PortalError> {
        self.get_json(session, &format!("/visit/{}", visit_id)).await
    }

    pub async fn update_visit(
        &self,
        session: &AuthSession,
        visit_id: i64,
        update: &VisitUpdate,
    ) -> Result<(), PortalError> {
        let _: serde_json::Value = self
            .patch_json(session, &format!("/update-visit/{}", visit_id), update)
            .await?;
        Ok(())
    }

    pub async fn create_appointment(
        &self,
        session: &AuthSession,
        appointment: &NewAppointment,
    ) -> Result<(), PortalError> {
        let _: serde_json::Value = self
            .post_json(Some(session), "/create-appointment", appointment)
            .await?;
        Ok(())
    }

    // -- Patient data -------------------------------------------------------

    pub async fn patient_summary(
        &self,
        session: &AuthSession,
        patient_id: &str,
    ) -> Result<PatientSummary, PortalError> {
        self.get_json(session, &format!("/patient-summary/{}", patient_id))
            .await
    }

    pub async fn appointment_summary(
        &self,
        session: &AuthSession,
        patient_id: &str,
    ) -> Result<AppointmentSummary, PortalError> {
        self.get_json(session, &format!("/appointment-summary/{}", patient_id))
            .await
    }

    pub async fn add_report(
        &self,
        session: &AuthSession,
        report: &NewReport,
    ) -> Result<(), PortalError> {
        let _: serde_json::Value = self.post_json(Some(session), "/add-report", report).await?;
        Ok(())
    }

    pub async fn add_medication(
        &self,
        session: &AuthSession,
        medication: &NewMedication,
    ) -> Result<(), PortalError> {
        let _: serde_json::Value = self
            .post_json(Some(session), "/add-medication", medication)
            .await?;
        Ok(())
    }

    // -- Dashboard feeds ----------------------------------------------------

    pub async fn dashboard_data(&self, session: &AuthSession) -> Result<DashboardData, PortalError> {
        self.get_json(session, "/dashboard-data").await
    }

    pub async fn past_visits(&self, session: &AuthSession) -> Result<Vec<Visit>, PortalError> {
        self.get_json(session, "/get-past-visits").await
    }

    pub async fn upcoming_visits(
        &self,
        session: &AuthSession,
    ) -> Result<Vec<UpcomingVisit>, PortalError> {
        self.get_json(session, "/upcoming-visits").await
    }

    pub async fn today_visits(
        &self,
        session: &AuthSession,
    ) -> Result<Vec<ScheduledVisit>, PortalError> {
        self.get_json(session, "/today-visits").await
    }

    pub async fn future_visits(
        &self,
        session: &AuthSession,
    ) -> Result<Vec<ScheduledVisit>, PortalError> {
        self.get_json(session, "/future-visits").await
    }

    pub async fn doctor_profile(&self, session: &AuthSession) -> Result<DoctorProfile, PortalError> {
        self.get_json(session, "/doctor-profile").await
    }

    pub async fn list_patients(
        &self,
        session: &AuthSession,
    ) -> Result<Vec<PatientListEntry>, PortalError> {
        self.get_json(session, "/list-patients").await
    }

    pub async fn pending_questions_for_doctor(
        &self,
        session: &AuthSession,
    ) -> Result<Vec<PendingQuestion>, PortalError> {
        self.get_json(session, "/pending-questions-for-doctor").await
    }

    pub async fn search_patient(
        &self,
        session: &AuthSession,
        name: &str,
    ) -> Result<Vec<PatientListEntry>, PortalError> {
        self.post_json(
            Some(session),
            "/search-patient",
            &serde_json::json!({ "name": name }),
        )
        .await
    }

    // -- Chat ---------------------------------------------------------------

    pub async fn chat(&self, session: &AuthSession, question: &str) -> Result<String, PortalError> {
        let reply: ChatResponse = self
            .post_json(
                Some(session),
                "/chat",
                &ChatRequest {
                    question: question.to_string(),
                },
            )
            .await?;
        Ok(reply.answer)
    }
}

/// Map a response to the caller's type, folding non-2xx statuses into
/// `PortalError::Server` with the backend's message when one is present.
pub(crate) async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, PortalError> {
    let status = response.status();

    if status.is_success() {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| PortalError::Network(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| PortalError::Server {
            status: status.as_u16(),
            message: format!("Unexpected response body: {}", e),
        })
    } else {
        let text = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ApiErrorBody>(&text) {
            Ok(body) => body.error,
            Err(_) => text,
        };
        log::error!("Portal API error ({}): {}", status.as_u16(), message);
        Err(PortalError::Server {
            status: status.as_u16(),
            message,
        })
    }
}
