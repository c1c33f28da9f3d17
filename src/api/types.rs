//! Wire models for the portal backend.
//!
//! Field names follow the backend's column naming (`bloodpressure`,
//! `visitsummaryaudio`, `medicationname`, ...) rather than Rust
//! conventions, so the serialized payloads match what the server accepts.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
}

#[derive(Debug, Clone, Serialize)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub role: Role,
    pub extra_info: ProfileInfo,
}

/// Role-dependent profile fields collected at signup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferredlanguage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hospital: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub message: String,
    pub user_id: String,
    pub role: Role,
}

// ---------------------------------------------------------------------------
// Visits
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Visit {
    pub id: i64,
    pub patient_id: Option<String>,
    pub doctor_id: Option<String>,
    pub visitdate: Option<String>,
    pub content: Option<String>,
    pub bloodpressure: Option<String>,
    pub oxygenlevel: Option<f64>,
    pub sugarlevel: Option<f64>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub doctorrecommendation: Option<String>,
    pub visitsummaryaudio: Option<String>,
}

/// PATCH body for `/update-visit/:id`. Empty fields are omitted entirely,
/// never sent as empty strings; the server owns required-vitals policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VisitUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bloodpressure: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oxygenlevel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sugarlevel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctorrecommendation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visitsummaryaudio: Option<String>,
}

impl VisitUpdate {
    pub fn is_empty(&self) -> bool {
        *self == VisitUpdate::default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpcomingVisit {
    pub visit_id: i64,
    pub date: String,
    pub doctor_id: Option<String>,
    #[serde(default)]
    pub summary: String,
}

/// Doctor-side schedule entry (`/today-visits`, `/future-visits`).
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduledVisit {
    pub id: i64,
    pub patient_id: Option<String>,
    pub doctor_id: Option<String>,
    pub visitdate: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewAppointment {
    pub patient_id: String,
    pub doctor_id: String,
    pub visitdate: String,
    pub memo: String,
}

// ---------------------------------------------------------------------------
// Patient summary / profile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct PatientSummary {
    pub patient: ProfileInfo,
    #[serde(default)]
    pub medications: Vec<Medication>,
    #[serde(default)]
    pub recent_visits: Vec<Visit>,
    #[serde(default)]
    pub reports: Vec<Report>,
    #[serde(default)]
    pub pending_questions: Vec<PendingQuestion>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppointmentSummary {
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatientListEntry {
    pub patient_id: String,
    pub name: String,
    pub last_visit: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DoctorProfile {
    pub name: String,
    pub hospital: String,
    pub specialization: String,
}

// ---------------------------------------------------------------------------
// Medications / reports / questions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Medication {
    pub medicationname: Option<String>,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub startdate: Option<String>,
    pub enddate: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewMedication {
    pub patient_id: String,
    pub medicationname: String,
    pub dosage: String,
    pub frequency: String,
    pub startdate: String,
    pub enddate: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Report {
    pub reporttype: Option<String>,
    pub reportcontent: Option<String>,
    pub reportdate: Option<String>,
}

/// POST body for `/add-report`, built from a summarized report image.
#[derive(Debug, Clone, Serialize)]
pub struct NewReport {
    pub patient_id: String,
    pub reportcontent: String,
    pub reporttype: String,
    pub reportdate: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PendingQuestion {
    pub id: i64,
    #[serde(alias = "patientid")]
    pub patient_id: Option<String>,
    pub questiontext: String,
    pub daterecorded: Option<String>,
    pub status: Option<String>,
}

// ---------------------------------------------------------------------------
// Dashboard feeds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DashboardData {
    pub health_summary: HealthSummary,
    pub health_trends: HealthTrends,
    pub medications: Vec<Medication>,
    pub active_questions: Vec<ActiveQuestion>,
}

/// Latest visit projected as the patient's current numbers. The backend
/// sends `{}` when there is no visit yet.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HealthSummary {
    pub bloodpressure: Option<String>,
    pub oxygenlevel: Option<f64>,
    pub sugarlevel: Option<f64>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub doctorrecommendation: Option<String>,
    pub visitdate: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HealthTrends {
    pub blood_pressure: Vec<TrendPoint>,
    pub oxygen_level: Vec<TrendPoint>,
    pub sugar_level: Vec<TrendPoint>,
}

/// One dated sample. Blood pressure values arrive as `"120/80"` strings,
/// the other series as numbers, so the value stays untyped JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct TrendPoint {
    pub date: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActiveQuestion {
    pub id: String,
    pub question_text: String,
}

// ---------------------------------------------------------------------------
// Chat + media uploads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub question: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
}

/// Raw reply from the audio endpoints. `/upload-question-audio` fills
/// `transcript`, `/summarize-audio` fills `summary`; both carry the stored
/// media URL.
#[derive(Debug, Clone, Deserialize)]
pub struct AudioUploadResponse {
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(rename = "audioUrl")]
    pub audio_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageUploadResponse {
    pub summary: String,
    pub reporttype: String,
    #[serde(rename = "imageUrl")]
    pub image_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visit_update_omits_unset_fields() {
        let update = VisitUpdate {
            bloodpressure: Some("120/80".to_string()),
            content: Some("BP looks good".to_string()),
            ..Default::default()
        };
        let body = serde_json::to_value(&update).unwrap();
        assert_eq!(body["bloodpressure"], "120/80");
        assert_eq!(body["content"], "BP looks good");
        assert!(body.get("oxygenlevel").is_none());
        assert!(body.get("visitsummaryaudio").is_none());
    }

    #[test]
    fn role_round_trips_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Doctor).unwrap(), "\"doctor\"");
        let role: Role = serde_json::from_str("\"patient\"").unwrap();
        assert_eq!(role, Role::Patient);
    }

    #[test]
    fn audio_response_accepts_either_field() {
        let q: AudioUploadResponse = serde_json::from_str(
            r#"{"transcript": "when should I take it?", "audioUrl": "https://x/q.wav"}"#,
        )
        .unwrap();
        assert_eq!(q.transcript.as_deref(), Some("when should I take it?"));
        assert!(q.summary.is_none());

        let s: AudioUploadResponse =
            serde_json::from_str(r#"{"summary": "stable vitals", "audioUrl": "https://x/s.wav"}"#)
                .unwrap();
        assert_eq!(s.summary.as_deref(), Some("stable vitals"));
    }

    #[test]
    fn empty_health_summary_deserializes() {
        let data: DashboardData = serde_json::from_str(
            r#"{"health_summary": {}, "health_trends": {"blood_pressure": [], "oxygen_level": [], "sugar_level": []}, "medications": [], "active_questions": []}"#,
        )
        .unwrap();
        assert!(data.health_summary.bloodpressure.is_none());
    }
}
