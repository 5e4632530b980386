use serde_json::json;

use crate::cli::commands::open_pool;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config;
use crate::services::action_item_service::{ActionItemCreate, ActionItemService};
use crate::services::risk_service::{RiskCreate, RiskService};
use crate::services::user_service::{UserCreate, UserService};
use crate::services::{Actor, ServiceError};
use crate::auth::roles::Role;

const DEMO_EMAIL: &str = "demo@riskworks.local";
const DEMO_PASSWORD: &str = "riskworks-demo";

const SAMPLE_RISKS: [(&str, &str, i64, i64, &str); 8] = [
    ("Primary datacenter outage", "Infrastructure", 2, 5, "Platform"),
    ("Key supplier insolvency", "Supply Chain", 3, 4, "Procurement"),
    ("Ransomware incident", "Security", 3, 5, "Security"),
    ("GDPR non-compliance finding", "Compliance", 2, 4, "Legal"),
    ("Senior engineer attrition", "People", 4, 3, "Engineering"),
    ("Cloud cost overrun", "Financial", 4, 2, "Finance"),
    ("API rate-limit breach by partner", "Technical", 3, 2, "Platform"),
    ("Office flood damage", "Facilities", 1, 3, "Operations"),
];

const SAMPLE_ACTIONS: [(&str, &str, &str); 3] = [
    ("Document recovery runbook", "mitigation", "high"),
    ("Negotiate secondary supplier", "transfer", "medium"),
    ("Quarterly tabletop exercise", "contingency", "low"),
];

/// Create a demo editor account and a spread of sample risks with a few
/// action items, so a fresh install has something to look at.
pub async fn handle(risk_count: usize, format: OutputFormat) -> anyhow::Result<()> {
    let pool = open_pool().await?;
    let users = UserService::new(pool.clone(), config::config().security.clone());

    let demo = match users
        .create(UserCreate {
            email: DEMO_EMAIL.to_string(),
            password: DEMO_PASSWORD.to_string(),
            full_name: Some("Demo Editor".to_string()),
            role: Some("editor".to_string()),
        })
        .await
    {
        Ok(user) => user,
        Err(ServiceError::Conflict(_)) => {
            // Re-seeding against an existing demo account is fine
            let existing = users.list().await?;
            existing
                .into_iter()
                .find(|u| u.email == DEMO_EMAIL)
                .ok_or_else(|| anyhow::anyhow!("Demo account exists but was not found"))?
        }
        Err(e) => return Err(e.into()),
    };

    let actor = Actor {
        user_id: demo.id,
        role: Role::Editor,
    };
    let risks = RiskService::new(pool.clone());
    let actions = ActionItemService::new(pool.clone());

    let mut risks_created = 0usize;
    let mut actions_created = 0usize;
    for i in 0..risk_count {
        let (name, category, probability, impact, owner) = SAMPLE_RISKS[i % SAMPLE_RISKS.len()];
        let suffix = if i >= SAMPLE_RISKS.len() {
            format!(" #{}", i / SAMPLE_RISKS.len() + 1)
        } else {
            String::new()
        };

        let risk = risks
            .create(
                RiskCreate {
                    risk_name: format!("{}{}", name, suffix),
                    risk_description: Some(format!("Seeded sample risk in {}", category)),
                    category: Some(category.to_string()),
                    rbs_node_id: None,
                    probability: Some(probability),
                    impact: Some(impact),
                    status: None,
                    risk_owner: Some(owner.to_string()),
                    latest_reviewed_date: None,
                    probability_basis: None,
                    impact_basis: None,
                    notes: None,
                },
                &actor,
            )
            .await?;
        risks_created += 1;

        // A couple of remediation items on the higher-scored risks
        if risk.score.unwrap_or(0) >= 8 {
            for (title, action_type, priority) in SAMPLE_ACTIONS.iter().take(2) {
                actions
                    .create(
                        ActionItemCreate {
                            risk_id: risk.risk.id,
                            title: title.to_string(),
                            description: None,
                            action_type: Some(action_type.to_string()),
                            priority: Some(priority.to_string()),
                            status: None,
                            progress_percent: None,
                            assigned_to: Some(owner.to_string()),
                            due_date: None,
                        },
                        &actor,
                    )
                    .await?;
                actions_created += 1;
            }
        }
    }

    output_success(
        format,
        &format!(
            "Seeded {} risks and {} action items (demo account: {})",
            risks_created, actions_created, DEMO_EMAIL
        ),
        Some(json!({
            "risks": risks_created,
            "action_items": actions_created,
            "demo_email": DEMO_EMAIL,
        })),
    );
    Ok(())
}
