//! Shared building blocks for the employee service and its clients.
//!
//! - [`proto`] - Generated protobuf messages, client and server stubs.
//! - [`types`] - Storage-side record shapes.
//! - [`mapper`] - Conversions between records and wire messages.
//! - [`error`] - Error taxonomy and the status classifier.

pub mod error;
pub mod mapper;
pub mod types;

pub use error::{Error, ErrorKind, Result, classify};

/// gRPC service and message definitions generated from
/// `proto/employee.proto`.
///
/// ## Service
///
/// - `Employees` - unary CRUD calls, a paced server stream, a client-streamed
///   bulk upload and a bidirectional lookup stream.
///
/// Use `employees_server::EmployeesServer` to host an implementation and
/// `employees_client::EmployeesClient` to call one.
pub mod proto {
    #![allow(clippy::doc_markdown)]
    tonic::include_proto!("employee");

    /// Encoded file descriptor set for registering with gRPC reflection.
    pub const FILE_DESCRIPTOR_SET: &[u8] =
        tonic::include_file_descriptor_set!("employee_descriptor");
}
