use std::{env, sync::Arc};

use config::{DEFAULT_CONFIG_PATH, ResolverConfig, load_config};
use global::Global;
use local::Local;
use middleware::remotehosts::RemoteHostsMiddleware;
use sinkhole_context::DnsMiddleware;
use sinkhole_hosts::{BlackholeStore, Fetcher, RefreshScheduler, Reloader};
use sinkhole_resolver::forwarder::ForwardResolver;
use sinkhole_server::{DnsServer, ServerState};
use tokio::signal;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking;
use tracing_subscriber::{Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod global;
mod local;
mod middleware;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let (nb, _guard) = non_blocking(std::io::stdout());

    let config_path = env::var("SINKHOLE_CONFIG").unwrap_or(DEFAULT_CONFIG_PATH.to_string());

    let config = load_config(&config_path)?;

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(nb)
                .with_target(false)
                .with_filter(LevelFilter::from(config.server.log_level)),
        )
        .init();

    let remotehosts = config.remotehosts.validate()?;
    let server_addr = config.server.bind_addr()?;

    tracing::info!(
        "loading {} hosts lists, policy {}, reload every {:?}",
        remotehosts.sources.len(),
        remotehosts.policy,
        remotehosts.reload
    );

    let blackhole = Arc::new(BlackholeStore::new());
    let reloader = Reloader::new(
        Fetcher::new(remotehosts.fetch_timeout)?,
        remotehosts.sources,
        blackhole.clone(),
    )
    .with_policy(remotehosts.policy);

    let scheduler = RefreshScheduler::new(Arc::new(reloader), remotehosts.reload)
        .with_fail_on_initial_error(remotehosts.fail_on_initial_error)
        .start()
        .await?;

    let ResolverConfig::Forwarder { upstreams } = config.resolver;

    let global = Arc::new(Global::new(blackhole));
    let middlewares: Vec<Arc<dyn DnsMiddleware<Global, Local>>> = vec![Arc::new(RemoteHostsMiddleware)];
    let state = ServerState {
        resolver: Arc::new(ForwardResolver::new(&upstreams)),
        middlewares: Arc::new(middlewares),
        global: global.clone(),
        timeout: config.server.timeout(),
    };

    let server = DnsServer::<Global, Local>::bind(server_addr, state).await?;

    tokio::select! {
        r = server.run() => {
            if let Err(e) = r {
                tracing::error!("DNS server exited with error: {}", e);
            }
        },
        _ = signal::ctrl_c() => {
            tracing::info!("Shutting down DNS server...");
        },
    }

    scheduler.shutdown();
    scheduler.join().await;

    let stats = global.live_stats();
    tracing::info!(
        "served {} sinkhole answers, blocklist holds {} names",
        stats.hits,
        stats.size
    );

    Ok(())
}
