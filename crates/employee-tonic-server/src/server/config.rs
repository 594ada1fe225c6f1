use anyhow::bail;
use clap::Parser;
use core::time::Duration;

/// Runtime configuration for the `employee-tonic-server` binary.
///
/// These settings control stream pacing, buffering, upload limits and the
/// in-memory record store. All values are parsed from CLI arguments or
/// environment variables (a `.env` file is honoured), with defaults suitable
/// for local development.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "employee-tonic-server",
    version,
    about = "A gRPC employee directory with unary and streaming calls"
)]
pub struct CliArgs {
    /// Pause between two consecutive employees on `GetAllEmployeesStream`,
    /// in milliseconds.
    ///
    /// Environment variable: `STREAM_INTERVAL_MS`
    #[arg(long, env = "STREAM_INTERVAL_MS", default_value_t = 1500)]
    pub stream_interval_ms: u64,

    /// Capacity of the response buffer between a stream task and the gRPC
    /// response stream.
    ///
    /// This bounds how far a producer may run ahead of a slow client. A
    /// value of 1 makes the bidirectional lookup strictly lock-step.
    ///
    /// Environment variable: `STREAM_BUFFER_SIZE`
    #[arg(long, env = "STREAM_BUFFER_SIZE", default_value_t = 8)]
    pub stream_buffer_size: usize,

    /// Maximum number of employees accepted by one `SaveMultipleEmployees`
    /// call.
    ///
    /// Environment variable: `MAX_BATCH_SIZE`
    #[arg(long, env = "MAX_BATCH_SIZE", default_value_t = 10_000)]
    pub max_batch_size: usize,

    /// Maximum number of records the in-memory store holds. Unlimited when
    /// unset.
    ///
    /// Environment variable: `STORE_CAPACITY`
    #[arg(long, env = "STORE_CAPACITY")]
    pub store_capacity: Option<usize>,

    /// Seconds to wait for in-flight streams to finish during shutdown before
    /// they are interrupted.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT`
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = 3)]
    pub shutdown_timeout: u64,

    /// Address to listen on (TCP or Unix socket path; use --uds for Unix
    /// socket).
    ///
    /// Example: "0.0.0.0:50051" or "/tmp/employee-uds.sock"
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:50051"))]
    pub server_addr: String,

    /// Listen on a Unix socket instead of TCP. If set, `SERVER_ADDR` must be a
    /// file path.
    #[arg(short, long, default_value_t = false)]
    pub uds: bool,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub stream_interval: Duration,
    pub stream_buffer_size: usize,
    pub max_batch_size: usize,
    pub store_capacity: Option<usize>,
    pub shutdown_timeout: Duration,
    pub server_addr: String,
    pub uds: bool,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.stream_buffer_size == 0 {
            bail!("STREAM_BUFFER_SIZE must be greater than 0");
        }

        if args.max_batch_size == 0 {
            bail!("MAX_BATCH_SIZE must be greater than 0");
        }

        if args.store_capacity == Some(0) {
            bail!("STORE_CAPACITY must be greater than 0 when set");
        }

        Ok(Self {
            stream_interval: Duration::from_millis(args.stream_interval_ms),
            stream_buffer_size: args.stream_buffer_size,
            max_batch_size: args.max_batch_size,
            store_capacity: args.store_capacity,
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout),
            server_addr: args.server_addr,
            uds: args.uds,
        })
    }
}
