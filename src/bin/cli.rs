use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use music_researcher as lib;
use lib::config::Config;
use lib::models::{GenreList, Parameters, Results};
use lib::server::{AppState, TIMEOUT_HEADER};
use lib::service::MusicResearcherService;
use lib::Researcher;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::subscriber as tracing_subscriber_global;
use tracing_appender::rolling::RollingFileAppender;
use tracing_log::LogTracer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;

#[derive(Parser)]
#[command(name = "music-researcher", version)]
struct Cli {
    /// Path to config TOML
    #[arg(long, value_name = "FILE", env = "MUSIC_RESEARCHER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the service (long-running)
    Serve,
    /// Search tracks through a running service
    Search {
        /// Free-text query
        query: String,
        /// Restrict results to a genre; repeat for several
        #[arg(long = "genre")]
        genres: Vec<String>,
        /// Maximum results per page; 0 uses the server default
        #[arg(long, default_value_t = 3)]
        limit: i64,
        /// Base URL of the service
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        host: String,
        /// Give up after this many milliseconds
        #[arg(long, default_value_t = 10_000)]
        timeout_ms: u64,
    },
    /// List the genres accepted as filters
    Genres {
        /// Base URL of the service
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        host: String,
    },
    /// Validate config file and exit
    ConfigValidate,
}

/// Explicit --config wins; otherwise /etc, then the user config dir. No file
/// at all is fine: defaults plus environment.
fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return Some(p.to_path_buf());
    }
    let etc_path = Path::new("/etc/music-researcher/config.toml");
    if etc_path.exists() {
        return Some(etc_path.to_path_buf());
    }
    dirs::config_dir()
        .map(|d| d.join("music-researcher").join("config.toml"))
        .filter(|p| p.exists())
}

fn init_logging(cfg: &Config) -> tracing_appender::non_blocking::WorkerGuard {
    // Bridge `log` records from dependencies into tracing.
    let _ = LogTracer::init();
    let file_appender: RollingFileAppender =
        tracing_appender::rolling::daily(&cfg.log_dir, "music-researcher.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Honor RUST_LOG if set, otherwise default to info.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer);

    if let Err(e) = tracing_subscriber_global::set_global_default(subscriber) {
        eprintln!("failed to set global tracing subscriber: {}", e);
    }
    guard
}

fn endpoint(host: &str, path: &str) -> Result<Url> {
    let base = Url::parse(host).with_context(|| format!("invalid host url {}", host))?;
    base.join(path)
        .with_context(|| format!("joining {} onto {}", path, host))
}

async fn error_body(resp: reqwest::Response) -> anyhow::Error {
    let status = resp.status();
    let txt = resp.text().await.unwrap_or_default();
    anyhow!("request failed: {} => {}", status, txt)
}

async fn serve(cfg: Config) -> Result<()> {
    let credentials = cfg.credentials().context("loading spotify credentials")?;
    let researcher = Arc::new(Researcher::spotify(
        credentials,
        &cfg.spotify.auth_base,
        &cfg.spotify.api_base,
    ));
    let state = AppState {
        service: Arc::new(MusicResearcherService::with_log_reporter(researcher)),
        service_name: cfg.service_name.clone(),
        request_timeout: cfg.request_timeout(),
        shutdown: CancellationToken::new(),
    };
    let listener = tokio::net::TcpListener::bind(&cfg.listen_addr)
        .await
        .with_context(|| format!("binding {}", cfg.listen_addr))?;
    lib::server::run(
        listener,
        state,
        cfg.shutdown_grace(),
        lib::server::shutdown_signal(),
    )
    .await
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let resolved_config_path = resolve_config_path(cli.config.as_deref());

    let cfg = Config::load(resolved_config_path.as_deref()).with_context(|| match &resolved_config_path {
        Some(p) => format!("loading config from {}", p.display()),
        None => "loading config from environment".to_string(),
    })?;

    match cli.command {
        Commands::Serve => {
            let _guard = init_logging(&cfg);
            serve(cfg).await.context("running server")?;
        }
        Commands::Search {
            query,
            genres,
            limit,
            host,
            timeout_ms,
        } => {
            let params = Parameters {
                query,
                genre_filters: genres,
                limit,
            };
            let resp = reqwest::Client::new()
                .post(endpoint(&host, "/v1/search")?)
                .header(TIMEOUT_HEADER, timeout_ms.to_string())
                .timeout(std::time::Duration::from_millis(timeout_ms))
                .json(&params)
                .send()
                .await?;
            if !resp.status().is_success() {
                return Err(error_body(resp).await);
            }
            let results: Results = resp.json().await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
            eprintln!("{} tracks", results.tracks.len());
        }
        Commands::Genres { host } => {
            let resp = reqwest::Client::new()
                .get(endpoint(&host, "/v1/genres")?)
                .send()
                .await?;
            if !resp.status().is_success() {
                return Err(error_body(resp).await);
            }
            let list: GenreList = resp.json().await?;
            println!("{}", serde_json::to_string_pretty(&list)?);
        }
        Commands::ConfigValidate => match cfg.credentials() {
            Ok(_) => println!("OK"),
            Err(e) => {
                eprintln!("Config validation failed: {}", e);
                std::process::exit(2);
            }
        },
    }

    Ok(())
}
