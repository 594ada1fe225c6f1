use clap::Parser;
use employee_tonic_core::proto::{FILE_DESCRIPTOR_SET, employees_server::EmployeesServer};
use employee_tonic_server::server::{
    config::{CliArgs, ServerConfig},
    service::handler::{EmployeeService, build_employee_service},
    store::MemoryStore,
    telemetry::{TelemetryProviders, init_telemetry},
};
use futures::Stream;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tonic::transport::{Server, server::Connected};
use tonic_health::server::HealthReporter;
use tower_http::cors::CorsLayer;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Health status is reported under the employee service name.
type Served = EmployeesServer<EmployeeService>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let config = ServerConfig::try_from(CliArgs::parse())?;
    let providers = init_telemetry()?;

    tracing::info!(
        addr = %config.server_addr,
        uds = config.uds,
        stream_interval = ?config.stream_interval,
        store_capacity = ?config.store_capacity,
        "Starting employee service"
    );

    let store = Arc::new(MemoryStore::with_capacity(config.store_capacity));
    let service = EmployeeService::new(config.clone(), store);

    if !config.uds {
        let listener = tokio::net::TcpListener::bind(&config.server_addr).await?;
        let incoming = tokio_stream::wrappers::TcpListenerStream::new(listener);
        return serve(incoming, service, providers).await;
    }

    #[cfg(unix)]
    {
        let listener = tokio::net::UnixListener::bind(&config.server_addr)?;
        let incoming = tokio_stream::wrappers::UnixListenerStream::new(listener);
        let res = serve(incoming, service, providers).await;
        let _ = std::fs::remove_file(&config.server_addr);
        res
    }

    #[cfg(not(unix))]
    {
        anyhow::bail!("Unix domain sockets are not supported on this platform");
    }
}

/// Hosts the employee service, health and reflection on `incoming` until a
/// shutdown signal arrives and the streaming calls have wound down.
async fn serve<I, IO, IE>(
    incoming: I,
    service: EmployeeService,
    providers: TelemetryProviders,
) -> anyhow::Result<()>
where
    I: Stream<Item = Result<IO, IE>>,
    IO: AsyncRead + AsyncWrite + Connected + Unpin + Send + 'static,
    IE: Into<tower::BoxError>,
{
    let (health, health_service) = tonic_health::server::health_reporter();
    health.set_serving::<Served>().await;

    let reflection = tonic_reflection::server::Builder::configure()
        .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .build_v1()?;

    // gRPC-Web clients call from browsers, hence the permissive CORS.
    let web = tower::ServiceBuilder::new()
        .layer(CorsLayer::very_permissive())
        .layer(tonic_web::GrpcWebLayer::new());

    let res = Server::builder()
        .accept_http1(true)
        .http2_adaptive_window(Some(true))
        .layer(web)
        .add_service(health_service)
        .add_service(reflection)
        .add_service(build_employee_service(service.clone()))
        .serve_with_incoming_shutdown(incoming, drain_on_signal(service, health))
        .await;

    providers.shutdown();
    res?;
    tracing::info!("Employee service stopped");
    Ok(())
}

/// Resolves once the process is asked to stop, after the service has been
/// marked not serving and its streams have been drained or interrupted.
async fn drain_on_signal(service: EmployeeService, health: HealthReporter) {
    let signal = wait_for_signal().await;
    tracing::info!(signal, "Shutting down");

    health.set_not_serving::<Served>().await;
    service.shutdown().await;
}

async fn wait_for_signal() -> &'static str {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                res.expect("failed to install Ctrl+C handler");
                "SIGINT"
            }
            _ = term.recv() => "SIGTERM",
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
        "Ctrl+C"
    }
}
