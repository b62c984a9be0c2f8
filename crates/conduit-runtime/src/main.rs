//! Host process entry point.
//!
//! Loads the ambient [`conduit_config::HostConfig`], binds a physical
//! endpoint, and wires the request/reply, routing, and dispatch layers on
//! top of it. There is no CLI surface here and nothing is persisted to
//! disk — assembling the in-process collaborators is this binary's whole
//! job. Registering handlers against the resulting dispatcher and driving
//! its receive loop is left to the embedding application; everything else
//! (resolving dependencies, supervising the process, packaging a release)
//! is out of scope.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

use std::process::ExitCode;
use std::sync::Arc;

use conduit_config::ConfigLoader;
use conduit_coordination::{CoordinationService, InMemoryCoordinationService, SessionToken};
use conduit_core::EndPointAddress;
use conduit_dispatch::{HandlerRegistry, MessageDispatcher, MessageTypeHierarchy};
use conduit_reqrep::{LogicalEndpoint, ReqRepEndpoint};
use conduit_routing::{MessageRouter, RouteManager};
use conduit_transport::TcpPhysicalEndpoint;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> ExitCode {
    let filter = EnvFilter::builder().with_default_directive(Level::INFO.into()).from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to create tokio runtime");

    match runtime.block_on(run()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "host process exited with an error");
            ExitCode::FAILURE
        }
    }
}

/// Bind the host's logical endpoint, wire routing and dispatch on top of
/// it, and block until the process is asked to shut down.
///
/// The returned collaborators are not retained past this function: a real
/// embedding binary would hold on to `dispatcher` to register handlers and
/// to `logical` to drive its own receive loop. This entry point exists to
/// prove the wiring is sound, not to host a fixed set of handlers.
async fn run() -> anyhow::Result<()> {
    let config = ConfigLoader::new().load()?;

    let coordination: Arc<dyn CoordinationService> = Arc::new(InMemoryCoordinationService::default());
    let session = SessionToken::new("conduit-host");

    let physical = TcpPhysicalEndpoint::bind_with_queue_depth(config.transport.bind_addr, config.transport.inbound_queue_depth).await?;
    let local_addr = physical.local_addr();
    info!(%local_addr, "bound physical endpoint");

    let address = EndPointAddress::from("conduit-host");
    let logical = Arc::new(LogicalEndpoint::new(
        address.clone(),
        session.clone(),
        Arc::clone(&coordination),
        ReqRepEndpoint::new(physical),
        config.logical_endpoint.clone(),
    ));
    logical.advertise(local_addr).await?;
    info!(%address, "advertised logical endpoint");

    let route_manager = RouteManager::new(Arc::clone(&coordination), session);
    let router = Arc::new(MessageRouter::new(route_manager, Arc::clone(&logical)));

    let registry = HandlerRegistry::new();
    let hierarchy = Arc::new(MessageTypeHierarchy::new());
    let _dispatcher: Arc<MessageDispatcher<TcpPhysicalEndpoint>> = MessageDispatcher::new(registry, hierarchy, router);

    info!("conduit host ready, awaiting shutdown signal");
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    Ok(())
}
