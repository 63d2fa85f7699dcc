mod api;
mod config;
mod directory;
mod dns;
mod error;
mod hook;
mod iface;
mod mdns;
mod rewrite;

use std::sync::Arc;
use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use crate::config::Config;
use crate::directory::Directory;
use crate::dns::forward::Forwarder;
use crate::dns::server::DnsServer;
use crate::dns::{Handler, MdnsResponder};
use crate::mdns::browser::{run_browser, Browser};
use crate::mdns::daemon::MdnsSd;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("mdns_dnsd=info"))
        )
        .init();

    tracing::info!("Starting mdns-dnsd");

    // Load config
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/etc/mdns-dnsd/mdns-dnsd.toml".to_string());

    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path))?;

    tracing::info!("Loaded config from {}, serving domain {}", config_path, config.mdns.domain);

    let public_name = match &config.mdns.public_name {
        Some(name) => name.clone(),
        None => mdns::advertise::default_public_name()
            .context("Failed to derive public name from hostname")?,
    };

    let directory = Directory::new();
    let cancel = CancellationToken::new();

    // Handler chain: our domain first, everything else upstream
    let mut responder = MdnsResponder::new(&config.mdns.domain, directory.clone(), config.dns.ttl);
    if let Some(upstream) = config.upstream()? {
        tracing::info!("Forwarding other domains to {}", upstream);
        responder = responder.with_next(Arc::new(Forwarder::new(upstream, config.upstream_timeout())));
    }
    let handler: Arc<dyn Handler> = Arc::new(responder);

    let dns_listen = config.dns_listen()?;
    let server = DnsServer::bind(dns_listen).await?;
    tracing::info!("DNS listening on {}", server.local_addr()?);

    // Spawn DNS server task
    let server_cancel = cancel.clone();
    let server_handle = tokio::spawn(server.run(handler, server_cancel));

    // Spawn mDNS browser task
    let browser = Browser::new(MdnsSd, directory.clone(), config.browse_settings());
    let browser_handle = tokio::spawn(run_browser(browser, cancel.clone()));

    // Spawn self-advertisement task; failure only affects this task
    let adv_cancel = cancel.clone();
    let adv_prefix = config.mdns.filter.clone();
    let adv_interface = config.mdns.interface.clone();
    let adv_handle = tokio::spawn(async move {
        if let Err(e) = mdns::advertise::advertise(
            &MdnsSd,
            &adv_prefix,
            &public_name,
            &adv_interface,
            adv_cancel,
        )
        .await
        {
            tracing::error!("Start public hostname failed: {}", e);
        }
    });

    // Optional status API
    let api_handle = match config.api_listen()? {
        Some(listen) => {
            let state = api::routes::AppState {
                directory: directory.clone(),
                info: Arc::new(api::routes::ConfigResponse {
                    domain: config.mdns.domain.clone(),
                    filter: config.mdns.filter.clone(),
                    service_type: config.mdns.service_type.clone(),
                }),
            };
            let app = api::routes::router(state);
            let listener = tokio::net::TcpListener::bind(listen)
                .await
                .with_context(|| format!("Failed to bind to {}", listen))?;
            tracing::info!("API listening on {}", listen);

            let api_cancel = cancel.clone();
            Some(tokio::spawn(async move {
                if let Err(e) = axum::serve(listener, app)
                    .with_graceful_shutdown(async move { api_cancel.cancelled().await })
                    .await
                {
                    tracing::error!("Server error: {}", e);
                }
            }))
        }
        None => None,
    };

    hook::on_startup(&config.hook.resolv_conf, &config.hook.nameservers);

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutdown signal received");

    // Trigger cancellation
    cancel.cancel();

    // Wait for all tasks to complete
    let _ = tokio::join!(server_handle, browser_handle, adv_handle);
    if let Some(handle) = api_handle {
        let _ = handle.await;
    }

    hook::on_shutdown(&config.hook.resolv_conf, &config.hook.nameservers);

    tracing::info!("Shutdown complete");
    Ok(())
}
