//! gRPC service implementation.
//!
//! - [`handler`] - gRPC service entry point (`EmployeeService`).

pub mod handler;
