use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{ArgGroup, Args, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use uniguide::aggregate::{self, AggregateOptions, AggregateRequest, Marks};
use uniguide::db::{self, PgStore};
use uniguide::store::ingest_file;
use uniguide::{build_router, deadlines, report, AppState, DeadlineClock, DeadlineFilter};
use uniguide::{MemoryStore, Settings, UniversityStore};

#[derive(Parser)]
#[command(name = "uniguide")]
#[command(
    about = "Admissions deadlines and merit aggregates for Pakistani universities",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
#[command(group(
    ArgGroup::new("scope")
        .args(["university", "city"])
        .multiple(false)
))]
struct Scope {
    #[arg(long)]
    university: Option<String>,
    #[arg(long)]
    city: Option<String>,
}

impl From<Scope> for DeadlineFilter {
    fn from(scope: Scope) -> Self {
        DeadlineFilter {
            university: scope.university,
            city: scope.city,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load sample university documents
    Seed,
    /// Store scraper output (university documents or deadline rows) from a JSON file
    Ingest {
        #[arg(long)]
        json: PathBuf,
    },
    /// Print upcoming and past deadlines
    Deadlines {
        #[command(flatten)]
        scope: Scope,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Generate a markdown deadline digest
    Report {
        #[command(flatten)]
        scope: Scope,
        #[arg(long, default_value = "deadlines.md")]
        out: PathBuf,
    },
    /// Export normalized deadlines as CSV
    Export {
        #[command(flatten)]
        scope: Scope,
        #[arg(long)]
        out: PathBuf,
    },
    /// Compute a merit aggregate
    Aggregate {
        #[arg(long)]
        university: String,
        #[arg(long)]
        matric_obtained: f64,
        #[arg(long)]
        matric_total: f64,
        #[arg(long)]
        inter_obtained: f64,
        #[arg(long)]
        inter_total: f64,
        #[arg(long)]
        test_obtained: f64,
        #[arg(long)]
        test_total: f64,
        #[arg(long)]
        engineering: bool,
        #[arg(long, default_value_t = 100.0)]
        weightage: f64,
        #[arg(long, default_value_t = 0)]
        gap_years: u32,
        #[arg(long)]
        hafiz: bool,
    },
    /// Serve the REST API
    Serve {
        #[arg(long)]
        bind: Option<String>,
        /// Serve seeded in-memory data instead of Postgres
        #[arg(long)]
        memory: bool,
    },
}

fn init_tracing(log_json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn connect(settings: &Settings) -> anyhow::Result<PgStore> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(settings.database_url()?)
        .await
        .context("failed to connect to Postgres")?;
    Ok(PgStore::new(pool))
}

async fn load_digest(
    settings: &Settings,
    filter: &DeadlineFilter,
) -> anyhow::Result<(DeadlineClock, uniguide::DeadlineDigest)> {
    let store = connect(settings).await?;
    let docs = store.find_all().await?;
    let standalone = store.find_all_deadlines().await?;
    let clock = DeadlineClock::now(settings.deadline_offset);
    let digest = deadlines::digest_documents(&docs, &standalone, filter, &clock);
    Ok((clock, digest))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::from_env()?;
    init_tracing(settings.log_json);

    match cli.command {
        Commands::InitDb => {
            let store = connect(&settings).await?;
            db::init_db(store.pool()).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let store = connect(&settings).await?;
            let seeded = db::seed(&store).await?;
            println!("Seeded {seeded} universities.");
        }
        Commands::Ingest { json } => {
            let store = connect(&settings).await?;
            let stored = ingest_file(&store, &json).await?;
            println!(
                "Stored {} universities and {} standalone deadlines from {}.",
                stored.universities,
                stored.deadlines,
                json.display()
            );
        }
        Commands::Deadlines { scope, limit } => {
            let filter = DeadlineFilter::from(scope);
            let (clock, digest) = load_digest(&settings, &filter).await?;

            if digest.total_deadlines == 0 {
                println!("No dated deadlines found.");
                return Ok(());
            }

            println!(
                "{} deadlines as of {} ({} upcoming, {} past):",
                digest.total_deadlines, clock.today, digest.upcoming_count, digest.past_count
            );
            for deadline in digest.deadlines.iter().take(limit) {
                println!(
                    "- {} {} | {} | {}",
                    if deadline.is_past { "closed" } else { "open  " },
                    deadline.parsed_date,
                    deadline.record.university_name,
                    deadline.record.title
                );
            }
        }
        Commands::Report { scope, out } => {
            let filter = DeadlineFilter::from(scope);
            let (clock, digest) = load_digest(&settings, &filter).await?;
            let markdown = report::build_report(filter.label(), clock.today, &digest);
            std::fs::write(&out, markdown)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export { scope, out } => {
            let filter = DeadlineFilter::from(scope);
            let (_, digest) = load_digest(&settings, &filter).await?;
            let file = std::fs::File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            let written = report::export_csv(file, &digest.deadlines)?;
            println!("Exported {written} deadlines to {}.", out.display());
        }
        Commands::Aggregate {
            university,
            matric_obtained,
            matric_total,
            inter_obtained,
            inter_total,
            test_obtained,
            test_total,
            engineering,
            weightage,
            gap_years,
            hafiz,
        } => {
            let request = AggregateRequest {
                university,
                marks: Marks {
                    matric_obtained,
                    matric_total,
                    inter_obtained,
                    inter_total,
                    test_obtained,
                    test_total,
                },
                is_engineering: engineering,
                options: AggregateOptions {
                    hafiz,
                    weightage,
                    gap_years,
                    ..AggregateOptions::default()
                },
            };
            let value = aggregate::calculate(&request)?;
            println!("Aggregate for {}: {value:.2}%", request.university.trim());
        }
        Commands::Serve { bind, memory } => {
            let store: Arc<dyn UniversityStore> = if memory {
                let store = MemoryStore::default();
                db::seed(&store).await?;
                Arc::new(store)
            } else {
                Arc::new(connect(&settings).await?)
            };

            let bind_addr = bind.unwrap_or_else(|| settings.bind_addr.clone());
            let app = build_router(AppState::new(store, settings));
            let listener = TcpListener::bind(&bind_addr)
                .await
                .with_context(|| format!("failed to bind {bind_addr}"))?;
            info!("uniguide listening on {bind_addr}");

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("server error")?;
        }
    }

    Ok(())
}
