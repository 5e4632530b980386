use std::fs;
use std::path::Path;

use clap::ValueEnum;
use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::AppConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EnvTarget {
    Local,
    Cloud,
}

/// Write a .env for the chosen deployment target. Secrets are never
/// written; JWT_SECRET stays a manual step.
pub fn handle(target: EnvTarget, format: OutputFormat) -> anyhow::Result<()> {
    let content = render(target);
    fs::write(Path::new(".env"), &content)?;

    let name = match target {
        EnvTarget::Local => "local",
        EnvTarget::Cloud => "cloud",
    };
    output_success(
        format,
        &format!("Wrote .env for the {} target", name),
        Some(json!({ "target": name, "file": ".env" })),
    );
    Ok(())
}

fn render(target: EnvTarget) -> String {
    let (name, preset) = match target {
        EnvTarget::Local => ("local", AppConfig::local()),
        EnvTarget::Cloud => ("cloud", AppConfig::cloud()),
    };

    let mut lines = vec![
        format!("# RiskWorks deployment target: {}", name),
        format!("RISKWORKS_ENV={}", name),
        format!("DATABASE_URL={}", preset.database.url),
        format!("HOST={}", preset.api.host),
        format!("PORT={}", preset.api.port),
        format!("FRONTEND_ORIGIN={}", preset.api.frontend_origin),
    ];
    if target == EnvTarget::Cloud {
        lines.push("# Set a real signing secret before deploying:".to_string());
        lines.push("# JWT_SECRET=".to_string());
    }
    lines.join("\n") + "\n"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_local() {
        let content = render(EnvTarget::Local);
        assert!(content.contains("RISKWORKS_ENV=local"));
        assert!(content.contains("FRONTEND_ORIGIN=http://localhost:5173"));
        assert!(!content.contains("JWT_SECRET="));
    }

    #[test]
    fn test_render_cloud_flags_the_secret() {
        let content = render(EnvTarget::Cloud);
        assert!(content.contains("RISKWORKS_ENV=cloud"));
        assert!(content.contains("HOST=0.0.0.0"));
        assert!(content.contains("# JWT_SECRET="));
    }
}
