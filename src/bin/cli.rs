use clap::{Parser, Subcommand};
use shopauth::{
    config::AppConfig,
    db,
    models::User,
    repositories::SqliteUserRepository,
    services::user_service::{CreateUserRequest, UpdatePasswordRequest, UserService},
};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "shopauth-cli")]
#[command(about = "CLI tool for managing shop accounts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Account management commands
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create a new account
    Create {
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short = 'n', long)]
        user_name: String,

        /// Password (will prompt if not provided)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// List accounts
    List {
        #[arg(short, long, default_value_t = 100)]
        limit: i64,

        #[arg(short = 'o', long, default_value_t = 0)]
        offset: i64,
    },

    /// Delete an account
    Delete {
        #[arg(short, long)]
        email: String,
    },

    /// Set a new password, discarding any pending reset link
    SetPassword {
        #[arg(short, long)]
        email: String,

        /// New password (will prompt if not provided)
        #[arg(short, long)]
        password: Option<String>,
    },
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn prompt_password(prompt: &str) -> CliResult<String> {
    use std::io::{self, Write};
    print!("{}: ", prompt);
    io::stdout().flush()?;
    Ok(rpassword::read_password()?)
}

/// Uses the flag value when given, otherwise prompts twice.
fn password_with_confirmation(given: Option<String>, prompt: &str) -> CliResult<(String, String)> {
    match given {
        Some(password) => Ok((password.clone(), password)),
        None => Ok((prompt_password(prompt)?, prompt_password("Confirm password")?)),
    }
}

async fn require_user(user_service: &UserService, email: &str) -> CliResult<User> {
    user_service
        .find_user_by_email(email)
        .await?
        .ok_or_else(|| format!("User '{}' not found", email).into())
}

async fn run(user_service: &UserService, command: UserCommands) -> CliResult<()> {
    match command {
        UserCommands::Create {
            email,
            user_name,
            password,
        } => {
            let (password, password_confirm) = password_with_confirmation(password, "Password")?;
            let user = user_service
                .create_user(CreateUserRequest {
                    email,
                    user_name,
                    password,
                    password_confirm: Some(password_confirm),
                })
                .await?;

            println!("✅ User created successfully!");
            println!("  ID: {}", user.id);
            println!("  Email: {}", user.email);
            println!("  Name: {}", user.user_name);
        }

        UserCommands::List { limit, offset } => {
            let users = user_service.list_users(Some(limit), Some(offset)).await?;
            if users.is_empty() {
                println!("No users found.");
                return Ok(());
            }

            println!(
                "{:<5} {:<40} {:<20} {:<14} {:<20}",
                "ID", "Email", "Name", "Reset pending", "Created"
            );
            println!("{}", "-".repeat(101));
            for user in users {
                println!(
                    "{:<5} {:<40} {:<20} {:<14} {:<20}",
                    user.id,
                    user.email,
                    user.user_name,
                    if user.has_pending_reset() { "Yes" } else { "No" },
                    user.created_at.as_deref().unwrap_or("N/A")
                );
            }
        }

        UserCommands::Delete { email } => {
            let user = require_user(user_service, &email).await?;
            user_service.delete_user(user.id).await?;
            println!("✅ User '{}' deleted successfully!", user.email);
        }

        UserCommands::SetPassword { email, password } => {
            let user = require_user(user_service, &email).await?;
            let (new_password, new_password_confirm) =
                password_with_confirmation(password, "New password")?;

            user_service
                .update_password(UpdatePasswordRequest {
                    user_id: user.id,
                    new_password,
                    new_password_confirm: Some(new_password_confirm),
                })
                .await?;
            println!("✅ Password updated successfully for '{}'!", user.email);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> CliResult<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::from_env()?;
    let pool = db::create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let user_service = UserService::new(Arc::new(SqliteUserRepository::new(pool)));

    let Commands::User { command } = cli.command;
    if let Err(err) = run(&user_service, command).await {
        eprintln!("❌ {}", err);
        std::process::exit(1);
    }

    Ok(())
}
