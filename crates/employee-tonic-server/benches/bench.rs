use core::{fmt, hint::black_box};
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use employee_tonic_core::proto::{
    EmployeeIdRequest, EmployeeRequest, employees_client::EmployeesClient,
};
use employee_tonic_server::server::{
    config::ServerConfig,
    service::handler::{EmployeeService, build_employee_service},
    store::MemoryStore,
};
use futures::stream::FuturesUnordered;
use std::{
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::runtime::{Builder, Runtime};
use tokio_stream::{StreamExt, wrappers::TcpListenerStream};
use tonic::{
    codec::CompressionEncoding,
    transport::{Channel, Server},
};

/// Employees seeded before benchmarking; lookups cycle through these ids.
const SEEDED: u64 = 1_000;

#[derive(Clone, Copy, Debug)]
enum Compression {
    None,
    Deflate,
    Gzip,
    Zstd,
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compression::None => write!(f, "none"),
            Compression::Deflate => write!(f, "deflate"),
            Compression::Gzip => write!(f, "gzip"),
            Compression::Zstd => write!(f, "zstd"),
        }
    }
}

impl From<Compression> for Option<CompressionEncoding> {
    fn from(value: Compression) -> Self {
        match value {
            Compression::None => None,
            Compression::Deflate => Some(CompressionEncoding::Deflate),
            Compression::Gzip => Some(CompressionEncoding::Gzip),
            Compression::Zstd => Some(CompressionEncoding::Zstd),
        }
    }
}

fn client(channel: &Channel, compression: Compression) -> EmployeesClient<Channel> {
    let client = EmployeesClient::new(channel.clone());
    match compression.into() {
        Some(encoding) => client.accept_compressed(encoding).send_compressed(encoding),
        None => client,
    }
}

/// Starts an in-process server with a seeded store and returns its address.
fn start_server(rt: &Runtime) -> SocketAddr {
    rt.block_on(async {
        let config = ServerConfig {
            stream_interval: Duration::ZERO,
            stream_buffer_size: 64,
            max_batch_size: 100_000,
            store_capacity: None,
            shutdown_timeout: Duration::from_secs(1),
            server_addr: "127.0.0.1:0".to_string(),
            uds: false,
        };
        let listener = tokio::net::TcpListener::bind(&config.server_addr)
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();

        let service = EmployeeService::new(config, Arc::new(MemoryStore::new()));
        tokio::spawn(
            Server::builder()
                .add_service(build_employee_service(service))
                .serve_with_incoming(TcpListenerStream::new(listener)),
        );

        let channel = Channel::from_shared(format!("http://{addr}"))
            .unwrap()
            .connect()
            .await
            .unwrap();
        let seed = tokio_stream::iter((0..SEEDED).map(|i| EmployeeRequest {
            name: format!("Employee {i}"),
            email: format!("employee{i}@example.com"),
            address: format!("{i} Main Street"),
        }));
        EmployeesClient::new(channel)
            .save_multiple_employees(seed)
            .await
            .unwrap();

        addr
    })
}

fn grpc_bench(c: &mut Criterion) {
    let rt = Builder::new_multi_thread().enable_all().build().unwrap();
    let addr = start_server(&rt);
    let channel = rt.block_on(async {
        Channel::from_shared(format!("http://{addr}"))
            .unwrap()
            .connect()
            .await
            .unwrap()
    });

    let compression_cases = [
        Compression::None,
        Compression::Zstd,
        Compression::Gzip,
        Compression::Deflate,
    ];

    for &concurrency in &[1usize, 8, 32] {
        let mut group = c.benchmark_group("grpc/get_employee_by_id");
        group.throughput(Throughput::Elements(concurrency as u64));
        group.bench_function(format!("conc/{concurrency}"), |b| {
            b.to_async(&rt).iter_custom(|iters| {
                let channel = channel.clone();
                async move {
                    let start = Instant::now();
                    for _ in 0..iters {
                        run_unary_bench(&channel, concurrency).await;
                    }
                    start.elapsed()
                }
            });
        });
        group.finish();
    }

    for &ids_per_stream in &[100u64, 1_000, 10_000] {
        for &compression in &compression_cases {
            let mut group = c.benchmark_group("grpc/get_employee_by_id_stream");
            group.throughput(Throughput::Elements(ids_per_stream));
            group.bench_function(format!("ids/{ids_per_stream}/comp/{compression}"), |b| {
                b.to_async(&rt).iter_custom(|iters| {
                    let channel = channel.clone();
                    async move {
                        let start = Instant::now();
                        for _ in 0..iters {
                            run_lookup_bench(&channel, ids_per_stream, compression).await;
                        }
                        start.elapsed()
                    }
                });
            });
            group.finish();
        }
    }
}

async fn run_unary_bench(channel: &Channel, concurrency: usize) {
    let mut tasks = FuturesUnordered::new();

    for i in 0..concurrency {
        let mut client = client(channel, Compression::None);
        tasks.push(tokio::spawn(async move {
            let id = (i as u64 % SEEDED) + 1;
            let resp = client
                .get_employee_by_id(EmployeeIdRequest { id })
                .await
                .expect("unary call failed");
            black_box(resp.into_inner());
        }));
    }

    while let Some(res) = tasks.next().await {
        res.unwrap();
    }
}

async fn run_lookup_bench(channel: &Channel, ids_per_stream: u64, compression: Compression) {
    let mut client = client(channel, compression);
    // Half the ids are unknown so placeholders are exercised as well.
    let ids = tokio_stream::iter(
        (0..ids_per_stream).map(|i| EmployeeIdRequest { id: (i % (SEEDED * 2)) + 1 }),
    );

    let mut answers = client
        .get_employee_by_id_stream(ids)
        .await
        .expect("stream call failed")
        .into_inner();

    let mut received = 0;
    while let Some(answer) = answers.next().await {
        black_box(answer.expect("answer"));
        received += 1;
    }
    assert_eq!(received, ids_per_stream, "Missing answers on lookup stream");
}

criterion_group!(grpc_benches, grpc_bench);
criterion_main!(grpc_benches);
