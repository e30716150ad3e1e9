use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;

use laundry_api::{
    auth::Role,
    config::{self, AppConfig},
    db::{self, DbPool},
    seed,
    services::{accounts::AccountResponse, AppServices},
};

#[derive(Parser)]
#[command(name = "laundry-admin", about = "Maintenance tasks for the laundry API", version)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending schema migrations
    Migrate,
    /// Insert the configured admin account and default services if missing
    Seed,
    /// Delete orders whose account or service no longer exists
    CleanupOrphans,
    /// Create an account with any role, including admin
    CreateAccount(CreateAccountArgs),
}

#[derive(Args)]
struct CreateAccountArgs {
    #[arg(long, help = "Login name (3 to 50 characters)")]
    username: String,
    #[arg(long, help = "Password (at least 8 characters)")]
    password: String,
    #[arg(long, value_parser = parse_role, default_value = "customer", help = "customer, staff or admin")]
    role: Role,
}

fn parse_role(raw: &str) -> Result<Role, String> {
    raw.parse::<Role>()
        .map_err(|_| format!("unknown role '{}'; expected customer, staff or admin", raw))
}

struct CliContext {
    config: AppConfig,
    db: Arc<DbPool>,
    services: AppServices,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;
        let db = Arc::new(db_pool);

        Ok(Self {
            services: AppServices::new(db.clone()),
            config,
            db,
        })
    }

    async fn migrate(&self) -> Result<()> {
        db::run_migrations(&self.db)
            .await
            .context("failed to run migrations")
    }
}

#[derive(Serialize)]
struct CleanupOutput {
    removed: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize().await?;

    match cli.command {
        Commands::Migrate => {
            context.migrate().await?;
            println!("Migrations applied");
        }
        Commands::Seed => {
            context.migrate().await?;
            let report = seed::seed_defaults(&context.services, &context.config)
                .await
                .context("failed to seed defaults")?;
            if cli.json {
                print_json(&report)?;
            } else {
                println!(
                    "Admin account {} • {} service(s) added",
                    if report.admin_created { "created" } else { "already present" },
                    report.services_created
                );
            }
        }
        Commands::CleanupOrphans => {
            context.migrate().await?;
            let removed = context
                .services
                .orders
                .cleanup_orphans()
                .await
                .context("orphan cleanup failed")?;
            if cli.json {
                print_json(&CleanupOutput { removed })?;
            } else {
                println!("Removed {} orphaned order(s)", removed);
            }
        }
        Commands::CreateAccount(args) => {
            context.migrate().await?;
            if !(3..=50).contains(&args.username.trim().chars().count()) {
                anyhow::bail!("username must be 3 to 50 characters");
            }
            if args.password.chars().count() < 8 {
                anyhow::bail!("password must be at least 8 characters");
            }
            let account = context
                .services
                .accounts
                .create_account(args.username.trim(), &args.password, args.role)
                .await
                .context("failed to create account")?;
            let account = AccountResponse::from(account);
            if cli.json {
                print_json(&account)?;
            } else {
                println!(
                    "Created {} account '{}' (id {})",
                    account.role, account.username, account.id
                );
            }
        }
    }

    db::close_pool((*context.db).clone())
        .await
        .context("failed to close database pool")?;
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
