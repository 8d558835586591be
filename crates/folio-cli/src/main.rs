//! Folio CLI — tenant lifecycle administration.
//!
//! Talks to the central database directly. Set DATABASE_URL (a .env file
//! is honored).

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use folio_core::models::{CreateTenantRequest, TenantPlan};
use folio_core::Config;
use folio_db::{CentralSchema, TenantRepository};
use folio_tenancy::{backup_tenant, seed, Migrator, ReportingService, TenantPools, TenantProvisioner};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "folio", about = "Folio tenant administration CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision a new tenant with an isolated database
    Provision {
        /// Tenant display name
        name: String,
        /// Contact email
        #[arg(long)]
        email: String,
        /// Primary domain, e.g. acme.example.com
        #[arg(long)]
        domain: String,
        /// Plan: free, starter, professional, enterprise
        #[arg(long, default_value = "free")]
        plan: TenantPlan,
        /// Start a trial period
        #[arg(long)]
        trial: bool,
        /// Seed default content after provisioning
        #[arg(long)]
        seed: bool,
    },
    /// Destroy a tenant: removes central rows, then drops the database
    Destroy {
        /// Tenant UUID
        tenant_id: Uuid,
        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },
    /// List all tenants
    List,
    /// Apply pending migrations to a tenant database
    Migrate {
        /// Tenant UUID
        tenant_id: Uuid,
    },
    /// Revert the last applied migrations of a tenant database
    Rollback {
        /// Tenant UUID
        tenant_id: Uuid,
        /// Number of migrations to revert
        #[arg(long, default_value = "1")]
        steps: u32,
    },
    /// Run a named seeder against a tenant database
    Seed {
        /// Tenant UUID
        tenant_id: Uuid,
        /// Seeder name: default, demo
        #[arg(long, default_value = "default")]
        name: String,
    },
    /// Dump a tenant database with pg_dump
    Backup {
        /// Tenant UUID
        tenant_id: Uuid,
    },
    /// Print a platform-wide usage report
    Report,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

fn print_json(value: &impl Serialize) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

async fn connect(config: &Config) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.central_database_url)
        .await
        .context("Failed to connect to the central database")?;
    CentralSchema::ensure(&pool).await?;
    Ok(pool)
}

async fn tenant_context(
    pool: &PgPool,
    config: &Config,
    tenant_id: Uuid,
) -> Result<folio_tenancy::TenantContext> {
    let tenant = TenantRepository::new(pool.clone())
        .get_required(tenant_id)
        .await?;
    let pools = TenantPools::new(config.clone());
    Ok(pools.context_for(&tenant).await?)
}

fn confirm_destroy(tenant_id: Uuid) -> Result<bool> {
    eprint!(
        "This permanently drops tenant {} and its database. Type the tenant id to confirm: ",
        tenant_id
    );
    let mut input = String::new();
    std::io::stdin()
        .read_line(&mut input)
        .context("Failed to read confirmation")?;
    Ok(input.trim() == tenant_id.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let pool = connect(&config).await?;

    match cli.command {
        Commands::Provision {
            name,
            email,
            domain,
            plan,
            trial,
            seed,
        } => {
            let pools = TenantPools::new(config.clone());
            let provisioner = TenantProvisioner::new(pool, config, pools);
            let request = CreateTenantRequest {
                name,
                email,
                domain,
                plan,
                trial,
                seed,
            };
            let tenant = provisioner.provision(&request).await?;
            print_json(&tenant)?;
        }
        Commands::Destroy { tenant_id, force } => {
            if !force && !confirm_destroy(tenant_id)? {
                bail!("Aborted: confirmation did not match");
            }
            let pools = TenantPools::new(config.clone());
            let provisioner = TenantProvisioner::new(pool, config, pools);
            provisioner.destroy(tenant_id).await?;
            println!("Destroyed tenant {}", tenant_id);
        }
        Commands::List => {
            let tenants = TenantRepository::new(pool).list().await?;
            print_json(&tenants)?;
        }
        Commands::Migrate { tenant_id } => {
            let ctx = tenant_context(&pool, &config, tenant_id).await?;
            let applied = Migrator::migrate(&ctx).await?;
            println!("Applied {} migration(s)", applied);
        }
        Commands::Rollback { tenant_id, steps } => {
            let ctx = tenant_context(&pool, &config, tenant_id).await?;
            let reverted = Migrator::rollback(&ctx, steps).await?;
            println!("Reverted {} migration(s)", reverted);
        }
        Commands::Seed { tenant_id, name } => {
            let ctx = tenant_context(&pool, &config, tenant_id).await?;
            seed::run(&ctx, &name).await?;
            println!("Seeded tenant {} with '{}'", tenant_id, name);
        }
        Commands::Backup { tenant_id } => {
            let ctx = tenant_context(&pool, &config, tenant_id).await?;
            let path = backup_tenant(&config, &ctx).await?;
            println!("Backup written to {}", path.display());
        }
        Commands::Report => {
            let reporting = ReportingService::new(pool, config);
            let report = reporting.platform_report().await?;
            print_json(&report)?;
        }
    }

    Ok(())
}
