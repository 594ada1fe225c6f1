//! gRPC service implementation for the employee directory.
//!
//! This module defines [`EmployeeService`], the concrete implementation of the
//! [`Employees`] gRPC service defined in the protobuf schema. It covers all
//! four RPC shapes:
//!
//! - Unary: create, get, update, delete and list.
//! - Server streaming: the paced `GetAllEmployeesStream`.
//! - Client streaming: the `SaveMultipleEmployees` bulk upload.
//! - Bidirectional streaming: the `GetEmployeeByIdStream` lookup.
//!
//! ## Responsibilities
//!
//! - Translate wire messages to store records and back.
//! - Map every failure to a stable status through [`Error`].
//! - Run streaming work on spawned tasks that feed bounded channels.
//! - Register streaming calls with the [`StreamLifecycle`] so shutdown can
//!   drain and interrupt them.

use crate::server::{
    config::ServerConfig,
    lifecycle::StreamLifecycle,
    store::{RecordStore, StoreError},
    streaming::{lookup::serve_lookups, paced::feed_paced, upload::collect_batch},
    telemetry::{increment_requests, increment_stream_errors, record_batch_size},
};
use core::pin::Pin;
use employee_tonic_core::{
    Error,
    proto::{
        DeleteEmployeeResponse, Empty, EmployeeIdRequest, EmployeeList, EmployeeRequest,
        EmployeeResponse, UpdateEmployeeRequest, UploadStatus,
        employees_server::{Employees, EmployeesServer},
    },
    types::NewEmployee,
};
use futures::TryStreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::{Stream, wrappers::ReceiverStream};
use tonic::{Request, Response, Status, Streaming, codec::CompressionEncoding};
use tracing::Instrument;

type EmployeeStream = Pin<Box<dyn Stream<Item = Result<EmployeeResponse, Status>> + Send>>;

/// gRPC front end over a [`RecordStore`].
///
/// Cloning is cheap: the store and the stream lifecycle are shared, so every
/// clone serves the same records and is drained by the same shutdown.
#[derive(Clone)]
pub struct EmployeeService {
    config: ServerConfig,
    store: Arc<dyn RecordStore>,
    lifecycle: Arc<StreamLifecycle>,
}

impl EmployeeService {
    pub fn new(config: ServerConfig, store: Arc<dyn RecordStore>) -> Self {
        let lifecycle = Arc::new(StreamLifecycle::new(config.shutdown_timeout));
        Self {
            config,
            store,
            lifecycle,
        }
    }

    /// Number of streaming calls currently running.
    pub fn streams_inflight(&self) -> usize {
        self.lifecycle.inflight()
    }

    /// Refuses new streaming calls, waits for running ones to drain, then
    /// interrupts the rest.
    pub async fn shutdown(&self) {
        self.lifecycle.shutdown().await;
    }

    /// Wraps a response channel so every error item is counted.
    fn respond(rx: mpsc::Receiver<Result<EmployeeResponse, Status>>) -> EmployeeStream {
        let stream = ReceiverStream::new(rx).inspect_err(|_| increment_stream_errors());
        Box::pin(stream)
    }
}

#[tonic::async_trait]
impl Employees for EmployeeService {
    type GetAllEmployeesStreamStream = EmployeeStream;
    type GetEmployeeByIdStreamStream = EmployeeStream;

    #[tracing::instrument(skip_all)]
    async fn create_employee(
        &self,
        req: Request<EmployeeRequest>,
    ) -> Result<Response<EmployeeResponse>, Status> {
        increment_requests("CreateEmployee");

        let employee = self
            .store
            .save(NewEmployee::from(req.into_inner()))
            .await
            .map_err(|e| Error::internal("Failed to create employee", e))?;

        tracing::debug!(id = employee.id, "Employee created");
        Ok(Response::new(employee.into()))
    }

    #[tracing::instrument(skip_all, fields(id = req.get_ref().id))]
    async fn get_employee_by_id(
        &self,
        req: Request<EmployeeIdRequest>,
    ) -> Result<Response<EmployeeResponse>, Status> {
        increment_requests("GetEmployeeById");
        let id = req.into_inner().id;

        let employee = self
            .store
            .find_by_id(id)
            .await
            .map_err(|e| Error::internal("Something went wrong", e))?
            .ok_or_else(|| Error::not_found(format!("Employee with ID {id} not found")))?;

        Ok(Response::new(employee.into()))
    }

    #[tracing::instrument(skip_all, fields(id = req.get_ref().id))]
    async fn update_employee_by_id(
        &self,
        req: Request<UpdateEmployeeRequest>,
    ) -> Result<Response<EmployeeResponse>, Status> {
        increment_requests("UpdateEmployeeById");
        let (id, details) = req.into_inner().into_parts();
        let missing = || format!("Employee not found with ID: {id}");

        let mut employee = match self.store.find_by_id(id).await {
            Ok(Some(employee)) => employee,
            Ok(None) => return Err(Error::not_found(missing()).into()),
            Err(e) => return Err(Error::internal("Failed to update employee", e).into()),
        };
        employee.replace_details(details);

        // A concurrent delete between the read and the write surfaces as a
        // missing record.
        let updated = self.store.update(employee).await.map_err(|e| match e {
            StoreError::Missing { .. } => Error::not_found(missing()),
            e => Error::internal("Failed to update employee", e),
        })?;

        Ok(Response::new(updated.into()))
    }

    #[tracing::instrument(skip_all, fields(id = req.get_ref().id))]
    async fn delete_employee_by_id(
        &self,
        req: Request<EmployeeIdRequest>,
    ) -> Result<Response<DeleteEmployeeResponse>, Status> {
        increment_requests("DeleteEmployeeById");
        let id = req.into_inner().id;

        let employee = match self.store.find_by_id(id).await {
            Ok(Some(employee)) => employee,
            Ok(None) => {
                return Err(
                    Error::not_found(format!("Employee not found for deletion with ID {id}"))
                        .into(),
                );
            }
            Err(e) => return Err(Error::internal("Failed to delete employee", e).into()),
        };

        self.store
            .delete(&employee)
            .await
            .map_err(|e| Error::internal("Failed to delete employee", e))?;

        Ok(Response::new(DeleteEmployeeResponse {
            success: true,
            message: "Employee deleted successfully.".to_string(),
        }))
    }

    #[tracing::instrument(skip_all)]
    async fn get_all_employees(
        &self,
        _req: Request<Empty>,
    ) -> Result<Response<EmployeeList>, Status> {
        increment_requests("GetAllEmployees");

        let employees = self
            .store
            .find_all()
            .await
            .map_err(|e| Error::internal("Failed to fetch employees", e))?;

        if employees.is_empty() {
            return Err(Error::not_found("No employees found.").into());
        }

        Ok(Response::new(employees.into_iter().collect()))
    }

    /// Streams every employee with a fixed pause between messages.
    ///
    /// An empty store yields an empty stream rather than `NOT_FOUND`.
    #[tracing::instrument(skip_all)]
    async fn get_all_employees_stream(
        &self,
        _req: Request<Empty>,
    ) -> Result<Response<Self::GetAllEmployeesStreamStream>, Status> {
        increment_requests("GetAllEmployeesStream");
        let guard = self.lifecycle.register()?;

        let employees = self
            .store
            .find_all()
            .await
            .map_err(|e| Error::internal("Failed to fetch employees", e))?;

        let (resp_tx, resp_rx) = mpsc::channel(self.config.stream_buffer_size);
        let interval = self.config.stream_interval;
        let shutdown = self.lifecycle.token();
        let total = employees.len();

        let fut = async move {
            let _guard = guard;
            match feed_paced::<_, EmployeeResponse>(employees, interval, resp_tx, shutdown).await
            {
                Ok(sent) => tracing::debug!(sent, "Paced stream complete"),
                Err(Error::RequestCancelled) => tracing::debug!("Client went away mid-stream"),
                Err(e) => tracing::warn!("Paced stream failed: {e}"),
            }
        };
        tokio::spawn(fut.instrument(tracing::info_span!("paced_stream", total)));

        Ok(Response::new(Self::respond(resp_rx)))
    }

    /// Stores a client-streamed batch in one all-or-nothing write.
    #[tracing::instrument(skip_all)]
    async fn save_multiple_employees(
        &self,
        req: Request<Streaming<EmployeeRequest>>,
    ) -> Result<Response<UploadStatus>, Status> {
        increment_requests("SaveMultipleEmployees");
        let _guard = self.lifecycle.register()?;

        let batch = collect_batch(
            req.into_inner(),
            self.config.max_batch_size,
            self.lifecycle.token(),
        )
        .await
        .inspect_err(|_| increment_stream_errors())?;
        let count = batch.len();
        record_batch_size(count as f64);

        self.store
            .save_all(batch)
            .await
            .map_err(|e| Error::internal("Failed to save employees", e))?;

        tracing::debug!(count, "Batch stored");
        Ok(Response::new(UploadStatus {
            success: true,
            message: format!("{count} employees saved successfully using batch insert."),
        }))
    }

    /// Answers each inbound id with the record or a `"Not Found"`
    /// placeholder, in arrival order.
    #[tracing::instrument(skip_all)]
    async fn get_employee_by_id_stream(
        &self,
        req: Request<Streaming<EmployeeIdRequest>>,
    ) -> Result<Response<Self::GetEmployeeByIdStreamStream>, Status> {
        increment_requests("GetEmployeeByIdStream");
        let guard = self.lifecycle.register()?;

        let inbound = req.into_inner();
        let (resp_tx, resp_rx) = mpsc::channel(self.config.stream_buffer_size);
        let store = Arc::clone(&self.store);
        let shutdown = self.lifecycle.token();

        let fut = async move {
            let _guard = guard;
            match serve_lookups(inbound, store, resp_tx, shutdown).await {
                Ok(answered) => tracing::debug!(answered, "Lookup stream complete"),
                Err(Error::RequestCancelled) => tracing::debug!("Client went away mid-stream"),
                Err(e) => tracing::warn!("Lookup stream failed: {e}"),
            }
        };
        tokio::spawn(fut.instrument(tracing::info_span!("lookup_stream")));

        Ok(Response::new(Self::respond(resp_rx)))
    }
}

/// Wraps `service` in the generated gRPC server with every supported
/// compression encoding enabled.
pub fn build_employee_service(service: EmployeeService) -> EmployeesServer<EmployeeService> {
    EmployeesServer::new(service)
        .send_compressed(CompressionEncoding::Zstd)
        .send_compressed(CompressionEncoding::Gzip)
        .send_compressed(CompressionEncoding::Deflate)
        .accept_compressed(CompressionEncoding::Zstd)
        .accept_compressed(CompressionEncoding::Gzip)
        .accept_compressed(CompressionEncoding::Deflate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::store::{MemoryStore, StoreResult};
    use employee_tonic_core::types::{Employee, EmployeeId};
    use std::time::Duration;
    use tonic::Code;

    fn config() -> ServerConfig {
        ServerConfig {
            stream_interval: Duration::from_millis(10),
            stream_buffer_size: 4,
            max_batch_size: 10,
            store_capacity: None,
            shutdown_timeout: Duration::from_millis(10),
            server_addr: "127.0.0.1:0".to_string(),
            uds: false,
        }
    }

    struct OfflineStore;

    #[tonic::async_trait]
    impl RecordStore for OfflineStore {
        async fn save(&self, _: NewEmployee) -> StoreResult<Employee> {
            Err(StoreError::Unavailable("disk gone".into()))
        }
        async fn save_all(&self, _: Vec<NewEmployee>) -> StoreResult<Vec<Employee>> {
            Err(StoreError::Unavailable("disk gone".into()))
        }
        async fn update(&self, _: Employee) -> StoreResult<Employee> {
            Err(StoreError::Unavailable("disk gone".into()))
        }
        async fn find_by_id(&self, _: EmployeeId) -> StoreResult<Option<Employee>> {
            Err(StoreError::Unavailable("disk gone".into()))
        }
        async fn find_all(&self) -> StoreResult<Vec<Employee>> {
            Err(StoreError::Unavailable("disk gone".into()))
        }
        async fn delete(&self, _: &Employee) -> StoreResult<()> {
            Err(StoreError::Unavailable("disk gone".into()))
        }
    }

    fn offline() -> EmployeeService {
        EmployeeService::new(config(), Arc::new(OfflineStore))
    }

    #[tokio::test]
    async fn storage_failures_surface_as_internal_with_cause() {
        let service = offline();

        let status = service
            .create_employee(Request::new(EmployeeRequest::default()))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::Internal);
        assert_eq!(
            status.message(),
            "Failed to create employee: record store unavailable: disk gone"
        );

        let status = service
            .get_employee_by_id(Request::new(EmployeeIdRequest { id: 1 }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::Internal);
        assert!(status.message().starts_with("Something went wrong: "));

        let status = service
            .update_employee_by_id(Request::new(UpdateEmployeeRequest::default()))
            .await
            .unwrap_err();
        assert!(status.message().starts_with("Failed to update employee: "));

        let status = service
            .delete_employee_by_id(Request::new(EmployeeIdRequest { id: 1 }))
            .await
            .unwrap_err();
        assert!(status.message().starts_with("Failed to delete employee: "));

        let status = service
            .get_all_employees(Request::new(Empty {}))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::Internal);
        assert!(status.message().starts_with("Failed to fetch employees: "));
    }

    #[tokio::test]
    async fn paced_stream_fails_before_first_message_on_fetch_error() {
        let status = offline()
            .get_all_employees_stream(Request::new(Empty {}))
            .await
            .err()
            .unwrap();

        assert_eq!(status.code(), Code::Internal);
        assert!(status.message().starts_with("Failed to fetch employees: "));
    }

    #[tokio::test]
    async fn stream_guard_released_when_stream_completes() {
        let service = EmployeeService::new(config(), Arc::new(MemoryStore::new()));
        service
            .create_employee(Request::new(EmployeeRequest::default()))
            .await
            .unwrap();

        let stream = service
            .get_all_employees_stream(Request::new(Empty {}))
            .await
            .unwrap()
            .into_inner();
        let received: Vec<_> = futures::StreamExt::collect(stream).await;
        assert_eq!(received.len(), 1);

        // The producer task drops its guard right after closing the channel.
        tokio::time::timeout(Duration::from_secs(1), async {
            while service.streams_inflight() > 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn streams_are_refused_after_shutdown() {
        let service = EmployeeService::new(config(), Arc::new(MemoryStore::new()));
        service.shutdown().await;

        let status = service
            .get_all_employees_stream(Request::new(Empty {}))
            .await
            .err()
            .unwrap();
        assert_eq!(status.code(), Code::Unavailable);

        // Unary calls are not gated.
        service
            .create_employee(Request::new(EmployeeRequest::default()))
            .await
            .unwrap();
    }
}
