//! Platform daemon: wires the Postgres repositories, the fabric client, and
//! the provisioning core together, then runs the lifecycle scheduler until
//! interrupted.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use vmgrid_config::Config;
use vmgrid_core::allocation::AddressAllocator;
use vmgrid_core::billing::{BillingEngine, RateTable};
use vmgrid_core::database::postgres::{
    PostgresAddressPoolRepository, PostgresBillingRepository, PostgresInstanceRepository,
    PostgresProjectRepository, PostgresSessionRepository, PostgresTenantRepository,
};
use vmgrid_core::fabric::http::FabricEndpoint;
use vmgrid_core::fabric::{HttpFabricClient, LogNotifier, SerializedFabric, TcpProbe};
use vmgrid_core::lifecycle::jobs::{
    BillingRun, ExpirySweep, SessionCleanup, StatusReconciliation,
};
use vmgrid_core::lifecycle::{JobCadence, LifecycleScheduler, SystemClock};
use vmgrid_core::provisioning::{Provisioner, ProvisioningSettings};

#[derive(Debug, Parser)]
#[command(name = "vmgridd", about = "vmgrid platform daemon", version)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "vmgrid.toml", env = "VMGRID_CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run migrations, seed the address pool, and start the scheduler.
    Serve,
    /// Run migrations, seed the address pool, and exit.
    InitDb,
}

fn build_allocator(config: &Config, pool: &sqlx::PgPool) -> AddressAllocator {
    AddressAllocator::new(
        Arc::new(PostgresAddressPoolRepository::new(pool.clone())),
        Arc::new(TcpProbe::default()),
        config.network.segments.clone(),
        config.fabric.probe_timeout,
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;

    match cli.command {
        Command::InitDb => init_db(&config).await,
        Command::Serve => serve(config).await,
    }
}

async fn connect(config: &Config) -> anyhow::Result<sqlx::PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
        .context("failed to connect to the database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run migrations")?;

    Ok(pool)
}

async fn init_db(config: &Config) -> anyhow::Result<()> {
    let pool = connect(config).await?;
    build_allocator(config, &pool)
        .initialize()
        .await
        .context("failed to seed the address pool")?;
    info!("database schema up to date");
    pool.close().await;
    Ok(())
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let pool = connect(&config).await?;

    let instances = Arc::new(PostgresInstanceRepository::new(pool.clone()));
    let projects = Arc::new(PostgresProjectRepository::new(pool.clone()));
    let billing = Arc::new(PostgresBillingRepository::new(pool.clone()));
    let tenants = Arc::new(PostgresTenantRepository::new(pool.clone()));
    let sessions = Arc::new(PostgresSessionRepository::new(pool.clone()));

    let http_client = HttpFabricClient::new(FabricEndpoint {
        host: config.fabric.host.clone(),
        port: config.fabric.port,
        username: config.fabric.username.clone(),
        password: config.fabric.password.clone(),
    })
    .context("failed to build fabric client")?;
    // The management gateway tolerates only one request at a time.
    let fabric = Arc::new(SerializedFabric::new(Arc::new(http_client)));

    let allocator = Arc::new(build_allocator(&config, &pool));
    allocator
        .initialize()
        .await
        .context("failed to seed the address pool")?;

    let shutdown = CancellationToken::new();

    // The API surface consumes the provisioner; it stays alive alongside the
    // scheduler until that surface is wired in.
    let _provisioner = Arc::new(Provisioner::new(
        instances.clone(),
        projects.clone(),
        allocator.clone(),
        fabric.clone(),
        ProvisioningSettings {
            clone_timeout: config.fabric.clone_timeout,
            poll_interval: config.fabric.poll_interval,
        },
        shutdown.clone(),
    ));

    let engine = Arc::new(BillingEngine::new(
        instances.clone(),
        billing.clone(),
        RateTable {
            cpu_per_core: config.pricing.cpu_per_core,
            memory_per_gb: config.pricing.memory_per_gb,
            disk_per_100gb: config.pricing.disk_per_100gb,
            gpu: config.pricing.gpu.clone(),
        },
    ));

    let mut scheduler = LifecycleScheduler::new(Arc::new(SystemClock), shutdown.clone());
    scheduler.register(
        Arc::new(ExpirySweep::new(
            instances.clone(),
            tenants,
            fabric.clone(),
            Arc::new(LogNotifier),
        )),
        JobCadence::DailyAt(config.scheduler.expiry_sweep_at),
    );
    scheduler.register(
        Arc::new(BillingRun::new(engine)),
        JobCadence::DailyAt(config.scheduler.billing_run_at),
    );
    scheduler.register(
        Arc::new(StatusReconciliation::new(instances, fabric)),
        JobCadence::Every(config.scheduler.status_sync_every),
    );
    scheduler.register(
        Arc::new(SessionCleanup::new(sessions)),
        JobCadence::Every(config.scheduler.session_cleanup_every),
    );

    info!("vmgridd running, press ctrl-c to stop");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    info!("shutting down");
    shutdown.cancel();
    scheduler.join().await;
    pool.close().await;

    Ok(())
}
