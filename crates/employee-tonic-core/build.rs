/// Builds the gRPC client and server code for the `employee.proto` definition
/// using `tonic-prost-build`.
///
/// The Protocol Buffer definitions in `proto/` are compiled into Rust modules
/// written to the crate's `OUT_DIR`, alongside an encoded file descriptor set
/// (`employee_descriptor.bin`) that the server registers with gRPC
/// reflection.
///
/// # Files and Paths
///
/// - Proto file: `proto/employee.proto`
/// - Includes: `proto/`
///
/// # Panics
///
/// Panics if `OUT_DIR` is unset or code generation fails; both abort the
/// build with the underlying error.
///
/// # Output
///
/// Generated code is accessible in Rust via:
///
/// ```rust
/// pub mod proto {
///     tonic::include_proto!("employee");
/// }
/// ```
use std::env;
use std::path::PathBuf;

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let descriptor_path = out_dir.join("employee_descriptor.bin");

    let mut config = tonic_prost_build::Config::new();
    config.file_descriptor_set_path(&descriptor_path);

    tonic_prost_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_with_config(config, &["proto/employee.proto"], &["proto"])
        .unwrap();
}
