use std::net::SocketAddr;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use oncall_watch::config::Config;
use oncall_watch::jobs::poller::{self, Poller};
use oncall_watch::metrics::HealthState;
use oncall_watch::squadcast::{self, ApiClient, TokenManager};
use oncall_watch::verifier::ScheduleVerifier;
use oncall_watch::{cli, config, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Export spans over OTLP only when a collector is configured.
    use opentelemetry::KeyValue;
    use opentelemetry_sdk::{trace as sdktrace, Resource};

    let telemetry_layer = if std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() {
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(opentelemetry_otlp::new_exporter().tonic())
            .with_trace_config(sdktrace::config().with_resource(Resource::new(vec![
                KeyValue::new("service.name", "oncall-watch"),
            ])))
            .install_batch(opentelemetry_sdk::runtime::Tokio)
            .context("failed to install OpenTelemetry tracer")?;
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "oncall_watch=info,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .with(telemetry_layer)
        .init();

    let args = cli::Cli::parse();
    let cfg = config::load()?.apply(&args.overrides());
    tracing::debug!(config = ?cfg, "loaded configuration");

    let result = match args.command {
        Some(cli::Commands::Check) => run_check(cfg).await,
        Some(cli::Commands::Serve) | None => run_server(cfg).await,
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

struct Components {
    tokens: TokenManager,
    verifier: ScheduleVerifier,
}

fn build(cfg: &Config) -> anyhow::Result<Components> {
    let client = ApiClient::new(cfg.base_url.clone(), cfg.request_timeout)
        .context("failed to build Squadcast client")?;
    let source = squadcast::source_for(cfg.api_shape, client.clone());
    Ok(Components {
        tokens: TokenManager::new(client, cfg.refresh_token.clone()),
        verifier: ScheduleVerifier::new(source, cfg.future_window)
            .context("invalid future window")?,
    })
}

async fn run_server(cfg: Config) -> anyhow::Result<()> {
    let Components { tokens, verifier } = build(&cfg)?;
    let health = HealthState::new().context("failed to register metrics")?;

    // Without a first token nothing can be verified.
    let credential = tokens
        .acquire()
        .await
        .context("could not get access token")?;

    let poll = Poller::new(tokens, verifier, health.clone(), cfg.interval, credential);
    poller::spawn(poll);

    let app = server::router(health);
    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(
        api = ?cfg.api_shape,
        interval_secs = cfg.interval.as_secs(),
        future_window_secs = cfg.future_window.as_secs(),
        "oncall-watch listening on {}",
        addr
    );
    axum::serve(listener, app).await?;

    Ok(())
}

async fn run_check(cfg: Config) -> anyhow::Result<()> {
    let Components { tokens, verifier } = build(&cfg)?;
    let credential = tokens
        .acquire()
        .await
        .context("could not get access token")?;

    if verifier.verify_all(credential.token()).await {
        println!("ok: someone is on call for every schedule, now and in {:?}", cfg.future_window);
        Ok(())
    } else {
        println!("FAIL: at least one schedule has nobody on call");
        std::process::exit(1);
    }
}
