//! Dashboard aggregation: fan out the independent feeds concurrently,
//! fan in to one render-ready view model.
//!
//! All-or-nothing: if any feed fails, the whole load fails with that one
//! error. A dashboard that silently renders half its panels would hide
//! clinical data, so there is no partial view.

use async_trait::async_trait;

use crate::api::types::{
    DashboardData, DoctorProfile, PatientListEntry, PendingQuestion, ScheduledVisit,
    UpcomingVisit, Visit,
};
use crate::api::ApiClient;
use crate::auth::AuthSession;
use crate::error::PortalError;

/// Everything the patient home screen renders.
#[derive(Debug, Clone)]
pub struct PatientDashboard {
    pub overview: DashboardData,
    pub past_visits: Vec<Visit>,
    pub upcoming_visits: Vec<UpcomingVisit>,
}

/// Everything the doctor home screen renders.
#[derive(Debug, Clone)]
pub struct DoctorDashboard {
    pub profile: DoctorProfile,
    pub today_visits: Vec<ScheduledVisit>,
    pub pending_questions: Vec<PendingQuestion>,
    pub patients: Vec<PatientListEntry>,
}

/// Feeds backing the patient dashboard.
#[async_trait]
pub trait PatientFeed: Send + Sync {
    async fn dashboard_data(&self, session: &AuthSession) -> Result<DashboardData, PortalError>;
    async fn past_visits(&self, session: &AuthSession) -> Result<Vec<Visit>, PortalError>;
    async fn upcoming_visits(
        &self,
        session: &AuthSession,
    ) -> Result<Vec<UpcomingVisit>, PortalError>;
}

/// Feeds backing the doctor dashboard.
#[async_trait]
pub trait DoctorFeed: Send + Sync {
    async fn profile(&self, session: &AuthSession) -> Result<DoctorProfile, PortalError>;
    async fn today_visits(
        &self,
        session: &AuthSession,
    ) -> Result<Vec<ScheduledVisit>, PortalError>;
    async fn pending_questions(
        &self,
        session: &AuthSession,
    ) -> Result<Vec<PendingQuestion>, PortalError>;
    async fn patients(&self, session: &AuthSession)
        -> Result<Vec<PatientListEntry>, PortalError>;
}

#[async_trait]
impl PatientFeed for ApiClient {
    async fn dashboard_data(&self, session: &AuthSession) -> Result<DashboardData, PortalError> {
        ApiClient::dashboard_data(self, session).await
    }

    async fn past_visits(&self, session: &AuthSession) -> Result<Vec<Visit>, PortalError> {
        ApiClient::past_visits(self, session).await
    }

    async fn upcoming_visits(
        &self,
        session: &AuthSession,
    ) -> Result<Vec<UpcomingVisit>, PortalError> {
        ApiClient::upcoming_visits(self, session).await
    }
}

#[async_trait]
impl DoctorFeed for ApiClient {
    async fn profile(&self, session: &AuthSession) -> Result<DoctorProfile, PortalError> {
        ApiClient::doctor_profile(self, session).await
    }

    async fn today_visits(
        &self,
        session: &AuthSession,
    ) -> Result<Vec<ScheduledVisit>, PortalError> {
        ApiClient::today_visits(self, session).await
    }

    async fn pending_questions(
        &self,
        session: &AuthSession,
    ) -> Result<Vec<PendingQuestion>, PortalError> {
        ApiClient::pending_questions_for_doctor(self, session).await
    }

    async fn patients(
        &self,
        session: &AuthSession,
    ) -> Result<Vec<PatientListEntry>, PortalError> {
        ApiClient::list_patients(self, session).await
    }
}

pub async fn load_patient_dashboard(
    feed: &dyn PatientFeed,
    session: &AuthSession,
) -> Result<PatientDashboard, PortalError> {
    let (overview, past_visits, upcoming_visits) = tokio::try_join!(
        feed.dashboard_data(session),
        feed.past_visits(session),
        feed.upcoming_visits(session),
    )?;
    Ok(PatientDashboard {
        overview,
        past_visits,
        upcoming_visits,
    })
}

pub async fn load_doctor_dashboard(
    feed: &dyn DoctorFeed,
    session: &AuthSession,
) -> Result<DoctorDashboard, PortalError> {
    let (profile, today_visits, pending_questions, patients) = tokio::try_join!(
        feed.profile(session),
        feed.today_visits(session),
        feed.pending_questions(session),
        feed.patients(session),
    )?;
    Ok(DoctorDashboard {
        profile,
        today_visits,
        pending_questions,
        patients,
    })
}

#[cfg(test)]
mod tests {
    use crate::api::types::Role;

    use super::*;

    struct StubPatientFeed {
        fail_past_visits: bool,
    }

    #[async_trait]
    impl PatientFeed for StubPatientFeed {
        async fn dashboard_data(
            &self,
            _session: &AuthSession,
        ) -> Result<DashboardData, PortalError> {
            Ok(DashboardData::default())
        }

        async fn past_visits(&self, _session: &AuthSession) -> Result<Vec<Visit>, PortalError> {
            if self.fail_past_visits {
                return Err(PortalError::Server {
                    status: 500,
                    message: "visits table unavailable".to_string(),
                });
            }
            Ok(vec![Visit {
                id: 7,
                ..Default::default()
            }])
        }

        async fn upcoming_visits(
            &self,
            _session: &AuthSession,
        ) -> Result<Vec<UpcomingVisit>, PortalError> {
            Ok(vec![])
        }
    }

    fn patient() -> AuthSession {
        AuthSession {
            user_id: "p1".to_string(),
            role: Role::Patient,
        }
    }

    #[tokio::test]
    async fn all_feeds_compose_into_one_view() {
        let feed = StubPatientFeed {
            fail_past_visits: false,
        };
        let dashboard = load_patient_dashboard(&feed, &patient()).await.unwrap();
        assert_eq!(dashboard.past_visits.len(), 1);
        assert!(dashboard.upcoming_visits.is_empty());
    }

    #[tokio::test]
    async fn one_failed_feed_fails_the_whole_load() {
        let feed = StubPatientFeed {
            fail_past_visits: true,
        };
        let err = load_patient_dashboard(&feed, &patient()).await.unwrap_err();
        // The single failure surfaces; no partial dashboard exists.
        assert!(matches!(err, PortalError::Server { status: 500, .. }));
    }
}
