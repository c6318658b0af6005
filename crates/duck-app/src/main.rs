mod cli;
mod generate;
mod repl;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use duck_ai::{ClientConfig, HttpTransport, ModelType, Session};
use duck_config::{DuckConfig, HttpConfig};
use duck_platform::HistoryStore;
use tracing_subscriber::EnvFilter;

use generate::Generated;
use repl::{Repl, UiContext};

const DEFAULT_LOG_DIRECTIVE: &str = "duck=warn";

/// `--log-level` wins over `RUST_LOG`, which wins over the default.
fn log_filter(level: Option<&str>) -> EnvFilter {
    if let Some(level) = level {
        match EnvFilter::try_new(level) {
            Ok(filter) => return filter,
            Err(e) => eprintln!("ignoring invalid --log-level {level:?}: {e}"),
        }
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVE))
}

fn config_path(args: &cli::Args) -> Result<PathBuf, duck_common::ConfigError> {
    match &args.config {
        Some(path) => Ok(PathBuf::from(path)),
        None => duck_config::default_config_path(),
    }
}

fn load_config(path: Option<&Path>) -> DuckConfig {
    let loaded = match path {
        Some(path) => duck_config::toml_loader::load_or_default(path),
        None => duck_config::load_config(),
    };
    loaded.unwrap_or_else(|e| {
        tracing::warn!("Config load failed, using defaults: {e}");
        DuckConfig::default()
    })
}

fn client_config(http: &HttpConfig) -> ClientConfig {
    let mut config = ClientConfig::new()
        .with_connect_timeout(Duration::from_secs(http.connect_timeout_secs))
        .with_timeout(http.timeout_secs.map(Duration::from_secs));
    if let Some(user_agent) = &http.user_agent {
        config = config.with_user_agent(user_agent.clone());
    }
    config
}

fn generate(args: &cli::Args) -> ExitCode {
    let written = config_path(args).and_then(|path| generate::write_default_config(&path));
    match written {
        Ok(Generated::Written(path)) => {
            println!("Wrote default config to {}", path.display());
            ExitCode::SUCCESS
        }
        Ok(Generated::AlreadyExists(path)) => {
            println!("Config already exists at {}, leaving it as is", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to write config: {e}");
            ExitCode::FAILURE
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(log_filter(args.log_level.as_deref()))
        .init();

    tracing::info!("duck-chat v{} starting", env!("CARGO_PKG_VERSION"));

    if args.generate {
        return generate(&args);
    }

    if let Some(ref path) = args.config {
        tracing::info!("Using config override: {path}");
    }
    let config = load_config(args.config.as_deref().map(Path::new));

    if let Err(e) = duck_platform::ensure_dirs() {
        tracing::warn!("Failed to create directories: {e}");
    }
    let store = match HistoryStore::open_default() {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Cannot locate the history directory: {e}");
            return ExitCode::FAILURE;
        }
    };

    let transport = match HttpTransport::new(client_config(&config.http)) {
        Ok(transport) => Arc::new(transport),
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let mut repl = match Repl::new(store) {
        Ok(repl) => repl,
        Err(e) => {
            eprintln!("Failed to start the line editor: {e}");
            return ExitCode::FAILURE;
        }
    };

    let configured = config.model.as_deref().map(ModelType::resolve_or_default);
    let model = match args.model.or(configured) {
        Some(model) => model,
        None => match repl.pick_model() {
            Ok(Some(model)) => model,
            Ok(None) => return ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("input error: {e}");
                return ExitCode::FAILURE;
            }
        },
    };

    let mut session = Session::new(transport, model);
    if let Err(e) = session.refresh_token().await {
        // The first question retries the handshake.
        tracing::warn!("initial handshake failed: {e}");
    }

    let ctx = UiContext::new(
        args.multiline || config.multiline,
        args.stream || config.stream,
    );
    repl.run(session, ctx).await;

    tracing::info!("Shutdown complete");
    ExitCode::SUCCESS
}
