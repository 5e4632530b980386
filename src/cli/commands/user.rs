use clap::Subcommand;
use serde_json::json;

use crate::cli::commands::{cli_actor, open_pool};
use crate::cli::utils::{output_list, output_success};
use crate::cli::OutputFormat;
use crate::config;
use crate::database::models::User;
use crate::services::user_service::{UserCreate, UserService, UserUpdate};

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Create a user account")]
    Add {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long, default_value = "viewer")]
        role: String,
    },

    #[command(about = "List all accounts")]
    List,

    #[command(about = "Change an account's role")]
    SetRole {
        #[arg(long)]
        email: String,
        #[arg(long)]
        role: String,
    },
}

pub async fn handle(cmd: UserCommands, format: OutputFormat) -> anyhow::Result<()> {
    let pool = open_pool().await?;
    let service = UserService::new(pool.clone(), config::config().security.clone());

    match cmd {
        UserCommands::Add {
            email,
            password,
            full_name,
            role,
        } => {
            let user = service
                .create(UserCreate {
                    email,
                    password,
                    full_name,
                    role: Some(role),
                })
                .await?;
            output_success(
                format,
                &format!("Created user {} with role {}", user.email, user.role),
                Some(serde_json::to_value(&user)?),
            );
        }

        UserCommands::List => {
            let users = service.list().await?;
            output_list(format, &users, |u| {
                format!(
                    "{:>4}  {:<32} {:<8} {}",
                    u.id,
                    u.email,
                    u.role,
                    if u.is_active { "active" } else { "inactive" }
                )
            });
        }

        UserCommands::SetRole { email, role } => {
            let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
                .bind(email.trim().to_lowercase())
                .fetch_optional(&pool)
                .await?
                .ok_or_else(|| anyhow::anyhow!("No account with email '{}'", email))?;

            let updated = service
                .update(
                    user.id,
                    UserUpdate {
                        role: Some(role),
                        ..Default::default()
                    },
                    &cli_actor(),
                )
                .await?;
            output_success(
                format,
                &format!("Set role of {} to {}", updated.email, updated.role),
                Some(json!({ "id": updated.id, "role": updated.role })),
            );
        }
    }

    Ok(())
}
