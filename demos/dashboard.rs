//! Dashboard walkthrough against the in-memory backend
//!
//! Run with `RUST_LOG=leadboard=debug cargo run --example dashboard`
//! to see every refresh the mirror performs. An optional argument names a
//! YAML config file.

use chrono::Utc;
use futures::StreamExt;
use leadboard::core::follow_up::FollowUpDraft;
use leadboard::core::notify::ChannelNotifier;
use leadboard::prelude::*;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn draft(name: &str, portfolio: Portfolio, revenue: &str, next_follow_up: &str) -> LeadDraft {
    LeadDraft {
        name: name.to_string(),
        organization: format!("{} Ltd", name),
        email: format!("{}@example.com", name.to_lowercase()),
        contact_number: "+255700000000".to_string(),
        portfolio,
        lead_type: "Inbound".to_string(),
        lead_source: LeadSource::Referral,
        next_follow_up: next_follow_up.to_string(),
        expected_revenue: revenue.to_string(),
        lead_owner: "Asha".to_string(),
        requirements: String::new(),
        status: LeadStatus::New,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => MirrorConfig::from_yaml_file(&path)?,
        None => MirrorConfig::default(),
    };

    let backend = Arc::new(InMemoryBackend::with_capacity(config.event_capacity));
    let session = Session::new(Uuid::new_v4()).with_email("asha@example.com");
    let sessions = Arc::new(InMemorySessionProvider::signed_in(session.clone()));
    let (notifier, mut notices) = ChannelNotifier::new();

    let mirror = MirrorBuilder::new()
        .with_backend_arc(backend.clone())
        .with_session_provider(sessions.clone())
        .with_notifier(Arc::new(notifier))
        .with_config(config)
        .build()?;

    // Toast layer
    tokio::spawn(async move {
        while let Some(notice) = notices.recv().await {
            println!("[{:?}] {}: {}", notice.level, notice.title, notice.description);
        }
    });

    // Re-render on every change
    let mut changes = mirror.changes();
    tokio::spawn(async move {
        while let Some(snapshot) = changes.next().await {
            println!(
                "  -> {} leads, {} with follow-ups",
                snapshot.leads.len(),
                snapshot.follow_ups_by_lead.len()
            );
        }
    });

    mirror.init().await;

    let today = Utc::now().date_naive();
    let today_str = today.format("%Y-%m-%d").to_string();

    let school = mirror
        .add_lead(draft("Kibo", Portfolio::Academy, "$12,500", &today_str))
        .await?;
    let clinic = mirror
        .add_lead(draft("Pwani", Portfolio::HrSolutions, "TZS 1,200,000", "2020-01-01"))
        .await?;
    mirror
        .add_lead(draft("Ruvu", Portfolio::TechSolutions, "$80,000", &today_str))
        .await?;

    mirror
        .add_follow_up(FollowUpDraft {
            lead_id: school.id.clone(),
            day_number: mirror.snapshot().next_day_number(&school.id),
            notes: "Intro call, interested in the spring cohort".to_string(),
            updated_by: "Asha".to_string(),
            follow_up_date: today_str.clone(),
            work_status: "contacted".to_string(),
            next_step: "send brochure".to_string(),
        })
        .await?;

    mirror.update_lead_status(&school.id, LeadStatus::Won).await?;
    mirror.update_lead_status(&clinic.id, LeadStatus::Qualified).await?;

    // A write from another tab arrives through the change feed
    backend
        .insert_lead(
            &session,
            draft("Tanga", Portfolio::Academy, "$3,000", &today_str).to_columns(),
        )
        .await?;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let snapshot = mirror.snapshot();
    let metrics = snapshot.metrics();
    println!();
    println!("Total leads:     {}", metrics.total_leads);
    println!("Won:             {}", metrics.won_leads);
    println!("Conversion rate: {}%", metrics.conversion_rate);
    println!(
        "Pipeline:        {}",
        format_compact_currency(metrics.expected_revenue)
    );
    for status in LeadStatus::ALL {
        println!("  {:<12} {}", status.label(), metrics.count(status));
    }
    for summary in &metrics.portfolios {
        println!(
            "  {:<20} {} leads, {}",
            summary.portfolio.label(),
            summary.leads,
            format_compact_currency(summary.revenue)
        );
    }

    println!();
    for reminder in snapshot.reminders(today, mirror.config().reminders.horizon_days) {
        println!(
            "{:<9} {} ({})",
            reminder.urgency.label(),
            reminder.lead.name,
            reminder.due
        );
    }

    mirror.sign_out().await?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    println!();
    println!("After sign out: {} leads", mirror.leads().len());

    mirror.dispose();
    Ok(())
}
