use anyhow::{Context, Result};
use edudesk::{
    api::routes::create_app,
    cli::{
        init,
        output::{Output, Status},
        Cli, Commands,
    },
    db::DatabaseProvider,
    utils::toml_config::EduConfig,
    AppState,
};
use owo_colors::OwoColorize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = Output::new(!cli.no_color);

    match cli.command {
        Some(Commands::Init { path, force }) => match init::run(&path, force, &output) {
            init::InitResult::Error(e) => anyhow::bail!("init failed: {}", e),
            _ => Ok(()),
        },
        Some(Commands::Config { validate }) => show_config(&cli.config, validate, &output),
        None => serve(&cli.config, cli.verbose).await,
    }
}

fn show_config(path: &std::path::Path, validate: bool, output: &Output) -> Result<()> {
    let config = EduConfig::load_unchecked(path)
        .with_context(|| format!("failed to load {}", path.display()))?;

    output.heading("Configuration");
    output.field("file", &path.display().to_string());
    output.field("listen", &config.bind_address());
    output.field("log", &format!("{} ({})", config.server.log_level, config.server.log_format));
    output.field("database", &config.database.url);
    output.field(
        "token lifetimes",
        &format!(
            "access {} min, refresh {} min",
            config.auth.access_ttl_minutes, config.auth.refresh_ttl_minutes
        ),
    );
    output.field(
        "share links",
        &format!(
            "{} chars, PIN {} digits",
            config.sharing.link_length, config.sharing.pin_length
        ),
    );

    if validate {
        match config.validate() {
            Ok(()) => output.status(Status::Done, "configuration is valid"),
            Err(e) => {
                output.status(Status::Fail, &e.to_string());
                anyhow::bail!("configuration is invalid");
            }
        }
    }

    Ok(())
}

fn init_tracing(config: &EduConfig, verbose: bool) -> Result<()> {
    let level = if verbose {
        "debug"
    } else {
        config.server.log_level.as_str()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{},tower_http=info", level))
    });

    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.server.log_format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    result.map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))
}

async fn serve(config_path: &std::path::Path, verbose: bool) -> Result<()> {
    let config = EduConfig::load(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;

    init_tracing(&config, verbose)?;

    let provider = DatabaseProvider::from_config(&config.database);
    tracing::info!(kind = provider.kind(), "opening database");
    let db = Arc::new(provider.create_client().await?);

    let state = AppState::from_config(config, db)?;
    let addr = state.config.bind_address();

    let app = create_app(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("EduDesk listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }
}
