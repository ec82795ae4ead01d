//! Vaulty CLI: archive video libraries and buckets into cold storage, catalog vault
//! inventories and bulk-delete archives.
//!
//! AWS credentials come from the default chain. See `VaultyConfig` for the environment
//! variables; a `.env` file is honoured.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use vaulty_cli::{
    finish_run, init_tracing, job_output_value, print_json, run_ledger_path, JsonLinesReporter,
};
use vaulty_core::models::{JobKind, Platform};
use vaulty_core::{LogLevel, VaultyConfig, WorkflowError};
use vaulty_db::{catalog_file_name, Ledger};
use vaulty_services::{
    ArchiveService, AwsServices, BucketProvider, ContentProvider, NotificationService,
    VimeoProvider,
};
use vaulty_storage::{create_storage, Storage};
use vaulty_worker::{
    ensure_bucket, ensure_vault, ArchiveDestination, BucketDestination, BulkResultProcessor,
    CancellationToken, CatalogEntry, CoordinatedJob, CoordinatorConfig, DeleteArchive,
    InventorySweep, ItemRunner, JobHandler, NotificationCoordinator, PaginatedSource,
    TransferDestination, TransferExecutor,
};

#[derive(Parser)]
#[command(name = "vaulty", about = "Cold-storage archive workflows", version)]
struct Cli {
    /// Directory ledgers and catalogs are written to
    #[arg(long, global = true)]
    base_path: Option<String>,

    /// Remove topic, queue and subscription once a job ends
    #[arg(long, global = true)]
    cleanup: bool,

    /// Give up waiting for a job notification after this many seconds
    #[arg(long, global = true, value_name = "SECS")]
    listen_timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Destination {
    Archive,
    Bucket,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload every video of a platform's library
    Upload {
        /// openhpi, opensap or moochouse
        platform: Platform,
        /// Target vault or bucket (default: videos_<platform>)
        #[arg(long)]
        vault: Option<String>,
        #[arg(long, value_enum, default_value = "archive")]
        destination: Destination,
        /// Existing ledger to resume
        #[arg(long)]
        ledger: Option<PathBuf>,
    },
    /// Archive every object of a bucket into a vault
    ArchiveBucket {
        bucket: String,
        /// Target vault (default: the bucket name)
        #[arg(long)]
        vault: Option<String>,
        #[arg(long)]
        ledger: Option<PathBuf>,
    },
    /// List all vaults
    ListVaults,
    /// List the jobs of a vault
    GetVaultJobs { vault: String },
    /// Print the output of a finished job
    GetJobOutput { vault: String, job_id: String },
    /// Retrieve a vault inventory and catalog every archive
    GetVaultInventory {
        vault: String,
        /// Wait for an already submitted job instead of starting one
        #[arg(long)]
        job_id: Option<String>,
    },
    /// Retrieve a vault inventory and delete every archive in it
    DeleteArchives {
        vault: String,
        #[arg(long)]
        job_id: Option<String>,
        #[arg(long)]
        ledger: Option<PathBuf>,
    },
    /// Delete every archive recorded in an upload ledger
    DeleteByLedger {
        vault: String,
        /// Ledger written by an upload run
        upload_ledger: PathBuf,
        #[arg(long)]
        ledger: Option<PathBuf>,
    },
    /// List all buckets
    ListBuckets,
    /// Create a private bucket
    CreateBucket { bucket: String },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = VaultyConfig::from_env()
        .context("Failed to load configuration")?
        .with_base_path(cli.base_path.as_deref());
    if cli.cleanup {
        config.cleanup_notifications = true;
    }
    if let Some(secs) = cli.listen_timeout {
        config.listen_timeout = Some(Duration::from_secs(secs));
    }

    init_tracing(&config.log_format);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping");
            on_signal.cancel();
        }
    });

    let result = run(cli.command, &config, cancel).await;
    if let Err(e) = &result {
        if let Some(workflow) = e.downcast_ref::<WorkflowError>() {
            match workflow.log_level() {
                LogLevel::Warn => tracing::warn!(error = %workflow, "Workflow stopped"),
                LogLevel::Error => tracing::error!(error = %workflow, state = ?workflow.state(), "Workflow failed"),
            }
        }
    }
    result
}

async fn run(command: Commands, config: &VaultyConfig, cancel: CancellationToken) -> anyhow::Result<()> {
    match command {
        Commands::Upload {
            platform,
            vault,
            destination,
            ledger,
        } => upload(config, platform, vault, destination, ledger, cancel).await,
        Commands::ArchiveBucket {
            bucket,
            vault,
            ledger,
        } => archive_bucket(config, bucket, vault, ledger, cancel).await,
        Commands::ListVaults => {
            let services = AwsServices::load(config.aws_region.as_deref()).await;
            print_json(&services.archive.list_containers().await?)
        }
        Commands::GetVaultJobs { vault } => {
            let services = AwsServices::load(config.aws_region.as_deref()).await;
            print_json(&services.archive.list_jobs(&vault).await?)
        }
        Commands::GetJobOutput { vault, job_id } => {
            let services = AwsServices::load(config.aws_region.as_deref()).await;
            let output = services.archive.get_job_output(&vault, &job_id).await?;
            print_json(&job_output_value(&output))
        }
        Commands::GetVaultInventory { vault, job_id } => {
            let services = AwsServices::load(config.aws_region.as_deref()).await;
            let catalog = Ledger::open(config.base_path.join(catalog_file_name(&vault))).await?;
            let runner = ItemRunner::new("inventory", &vault, &JsonLinesReporter)
                .with_ledger(&catalog)
                .with_cancellation(cancel.clone());
            let sweep = InventorySweep::new(runner, CatalogEntry);

            let result = coordinate(
                &services.archive,
                &services.notifier,
                config,
                cancel,
                &vault,
                job_id.as_deref(),
                &sweep,
            )
            .await;
            print_job(finish_run(result, close_ledger(catalog).await)?)
        }
        Commands::DeleteArchives {
            vault,
            job_id,
            ledger,
        } => {
            let AwsServices { archive, notifier } =
                AwsServices::load(config.aws_region.as_deref()).await;
            let archive: Arc<dyn ArchiveService> = Arc::new(archive);

            let ledger = Ledger::open(run_ledger_path(&config.base_path, "delete", &vault, ledger)).await?;
            let runner = ItemRunner::new("delete", &vault, &JsonLinesReporter)
                .with_ledger(&ledger)
                .with_cancellation(cancel.clone());
            let sweep = InventorySweep::new(runner, DeleteArchive::new(archive.clone(), vault.as_str()));

            let result = coordinate(
                archive.as_ref(),
                &notifier,
                config,
                cancel,
                &vault,
                job_id.as_deref(),
                &sweep,
            )
            .await;
            print_job(finish_run(result, close_ledger(ledger).await)?)
        }
        Commands::DeleteByLedger {
            vault,
            upload_ledger,
            ledger,
        } => delete_by_ledger(config, vault, upload_ledger, ledger, cancel).await,
        Commands::ListBuckets => {
            let storage = create_storage(config).await?;
            print_json(&storage.list_containers().await?)
        }
        Commands::CreateBucket { bucket } => {
            let storage = create_storage(config).await?;
            let created = ensure_bucket(storage.as_ref(), &bucket).await?;
            print_json(&serde_json::json!({ "bucket": bucket, "created": created }))
        }
    }
}

async fn upload(
    config: &VaultyConfig,
    platform: Platform,
    vault: Option<String>,
    destination: Destination,
    ledger: Option<PathBuf>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let token = config
        .vimeo_token(platform)
        .with_context(|| format!("{} is not set", platform.token_env_var()))?;
    let provider = VimeoProvider::new(&config.vimeo_api_url, token.to_string())?;
    let container = vault.unwrap_or_else(|| platform.default_vault_name());

    let destination: Box<dyn TransferDestination> = match destination {
        Destination::Archive => {
            let services = AwsServices::load(config.aws_region.as_deref()).await;
            let archive: Arc<dyn ArchiveService> = Arc::new(services.archive);
            ensure_vault(archive.as_ref(), &container).await?;
            Box::new(ArchiveDestination::new(archive, container.as_str()))
        }
        Destination::Bucket => {
            let storage = create_storage(config).await?;
            ensure_bucket(storage.as_ref(), &container).await?;
            Box::new(BucketDestination::new(storage, container.as_str()))
        }
    };

    transfer(config, "upload", &provider, destination.as_ref(), ledger, cancel).await
}

async fn archive_bucket(
    config: &VaultyConfig,
    bucket: String,
    vault: Option<String>,
    ledger: Option<PathBuf>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let storage: Arc<dyn Storage> = create_storage(config).await?;
    let provider = BucketProvider::new(storage, bucket.as_str());
    let vault = vault.unwrap_or_else(|| bucket.clone());

    let services = AwsServices::load(config.aws_region.as_deref()).await;
    let archive: Arc<dyn ArchiveService> = Arc::new(services.archive);
    ensure_vault(archive.as_ref(), &vault).await?;
    let destination = ArchiveDestination::new(archive, vault.as_str());

    transfer(config, "archive-bucket", &provider, &destination, ledger, cancel).await
}

/// Copy every item of `provider` into `destination`, recording progress in a run ledger.
async fn transfer(
    config: &VaultyConfig,
    kind: &str,
    provider: &dyn ContentProvider,
    destination: &dyn TransferDestination,
    ledger: Option<PathBuf>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let path = run_ledger_path(&config.base_path, kind, destination.container(), ledger);
    let ledger = Ledger::open(&path).await?;
    tracing::info!(ledger = %path.display(), source = %provider.name(), "Transfer started");

    let runner = ItemRunner::new(kind, destination.container(), &JsonLinesReporter)
        .with_ledger(&ledger)
        .with_cancellation(cancel);
    let executor = TransferExecutor::new(provider, destination);
    let result = PaginatedSource::new(provider)
        .run(config.per_page, &runner, &executor)
        .await;

    print_json(&finish_run(result, close_ledger(ledger).await)?)
}

async fn delete_by_ledger(
    config: &VaultyConfig,
    vault: String,
    upload_ledger: PathBuf,
    ledger: Option<PathBuf>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let uploads = Ledger::open(&upload_ledger).await?;
    let records = uploads.records().await;
    let records = finish_run(records, close_ledger(uploads).await)?;
    tracing::info!(records = records.len(), ledger = %upload_ledger.display(), "Upload ledger loaded");

    let services = AwsServices::load(config.aws_region.as_deref()).await;
    let archive: Arc<dyn ArchiveService> = Arc::new(services.archive);

    let ledger = Ledger::open(run_ledger_path(&config.base_path, "delete-by-ledger", &vault, ledger)).await?;
    let runner = ItemRunner::new("delete-by-ledger", &vault, &JsonLinesReporter)
        .with_ledger(&ledger)
        .with_cancellation(cancel);
    let result = BulkResultProcessor::new(runner)
        .process_all(&records, &DeleteArchive::new(archive, vault.as_str()))
        .await;

    print_json(&finish_run(result, close_ledger(ledger).await)?)
}

async fn coordinate<H: JobHandler>(
    archive: &dyn ArchiveService,
    notifier: &dyn NotificationService,
    config: &VaultyConfig,
    cancel: CancellationToken,
    vault: &str,
    job_id: Option<&str>,
    handler: &H,
) -> Result<CoordinatedJob<H::Output>, WorkflowError> {
    let coordinator =
        NotificationCoordinator::new(archive, notifier, CoordinatorConfig::from_config(config))
    .with_cancellation(cancel);

    match job_id {
        Some(job_id) => coordinator.await_job(vault, job_id, handler).await,
        None => coordinator.run(vault, JobKind::InventoryRetrieval, handler).await,
    }
}

fn print_job<T: serde::Serialize>(job: CoordinatedJob<T>) -> anyhow::Result<()> {
    print_json(&serde_json::json!({
        "job": job.descriptor,
        "result": job.output,
    }))
}

async fn close_ledger(ledger: Ledger) -> anyhow::Result<()> {
    let path = ledger.path().display().to_string();
    ledger
        .close()
        .await
        .with_context(|| format!("Failed to close ledger {}", path))
}
