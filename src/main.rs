use std::env;
use std::sync::Arc;

use carelink::api::media::MediaDestination;
use carelink::api::types::Role;
use carelink::capture::CpalAudioInput;
use carelink::{
    load_doctor_dashboard, load_patient_dashboard, load_settings, signin, ApiClient, AuthSession,
    CaptureEngine, ConsultationSession, NativeCodecSupport, Phase, PortalUploader, REDIRECT_DELAY,
};

#[tokio::main]
async fn main() {
    // Load .env file if present (for development convenience)
    // Silently ignore if not found - production uses system env vars
    let _ = dotenvy::dotenv();
    env_logger::init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = load_settings();
    let api = ApiClient::new(&settings);
    log::info!("Portal backend: {}", api.base_url());

    let email = env::var("PORTAL_EMAIL")?;
    let password = env::var("PORTAL_PASSWORD")?;
    let session = signin(&api, &email, &password).await?;

    match session.role {
        Role::Patient => {
            let dashboard = load_patient_dashboard(&api, &session).await?;
            println!("Signed in as patient {}", session.user_id);
            if let Some(bp) = &dashboard.overview.health_summary.bloodpressure {
                println!("Latest blood pressure: {}", bp);
            }
            println!(
                "{} past visits, {} upcoming, {} medications",
                dashboard.past_visits.len(),
                dashboard.upcoming_visits.len(),
                dashboard.overview.medications.len()
            );
        }
        Role::Doctor => {
            let dashboard = load_doctor_dashboard(&api, &session).await?;
            println!(
                "Signed in as Dr. {} ({})",
                dashboard.profile.name, dashboard.profile.hospital
            );
            println!(
                "{} visits today, {} pending questions, {} patients",
                dashboard.today_visits.len(),
                dashboard.pending_questions.len(),
                dashboard.patients.len()
            );

            if let Ok(visit_id) = env::var("PORTAL_VISIT_ID") {
                let visit_id: i64 = visit_id.parse()?;
                run_consultation(&api, &session, &settings.codec_candidates, visit_id).await?;
            }
        }
    }

    Ok(())
}

/// Doctor demo flow: dictate a visit summary, enter vitals, commit.
async fn run_consultation(
    api: &ApiClient,
    session: &AuthSession,
    codec_candidates: &[String],
    visit_id: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    let visit = api.visit(session, visit_id).await?;
    let patient_id = visit.patient_id.clone().unwrap_or_default();
    println!(
        "Consultation for visit {} (patient {})",
        visit_id, patient_id
    );

    let engine = CaptureEngine::new(
        Arc::new(CpalAudioInput),
        Arc::new(PortalUploader::new(api.clone(), session.clone())),
        MediaDestination::VisitSummary,
        codec_candidates,
        &NativeCodecSupport,
    );

    engine.start().await?;
    println!("Recording... press Enter to stop.");
    read_line().await?;
    engine.stop().await?;

    // Wait for the upload to finish one way or the other.
    let mut rx = engine.subscribe();
    let outcome = loop {
        let snapshot = rx.borrow().clone();
        match snapshot.phase {
            Phase::Ready | Phase::Failed => break snapshot,
            _ => {
                if rx.changed().await.is_err() {
                    break snapshot;
                }
            }
        }
    };

    let mut consultation = ConsultationSession::new(visit_id, patient_id);

    match (outcome.transcript, outcome.media_url) {
        (Some(transcript), Some(media_url)) => {
            println!("Summary: {}", transcript);
            consultation
                .draft_mut()
                .attach_recording(carelink::AudioUploadOutcome {
                    transcript,
                    media_url,
                });
        }
        _ => {
            // Vitals can still be committed without a recording.
            println!(
                "Recording unavailable: {}",
                outcome.error.unwrap_or_else(|| "unknown".to_string())
            );
        }
    }

    println!("Blood pressure (e.g. 120/80, blank to skip):");
    let bp = read_line().await?;
    consultation.draft_mut().set_blood_pressure(&bp);

    println!("Recommendation (blank to skip):");
    let recommendation = read_line().await?;
    consultation.draft_mut().set_recommendation(&recommendation);

    let updated = consultation.submit(api, session).await?;
    println!("Visit {} updated.", updated.id);

    tokio::time::sleep(REDIRECT_DELAY).await;
    Ok(())
}

async fn read_line() -> Result<String, Box<dyn std::error::Error>> {
    let line = tokio::task::spawn_blocking(|| {
        let mut buf = String::new();
        std::io::stdin().read_line(&mut buf).map(|_| buf)
    })
    .await??;
    Ok(line)
}
