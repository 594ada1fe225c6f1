//! Record store collaborator.
//!
//! The service never owns employee state; it talks to a [`RecordStore`]
//! through the operations below. Each operation is atomic on its own and
//! reports failure as a [`StoreError`], which is distinct from the normal
//! "no such record" outcome of [`RecordStore::find_by_id`].
//!
//! [`MemoryStore`] is the implementation the binary runs with.

mod memory;

pub use memory::MemoryStore;

use employee_tonic_core::types::{Employee, EmployeeId, NewEmployee};

pub type StoreResult<T> = core::result::Result<T, StoreError>;

/// Failures raised by a record store.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum StoreError {
    /// Accepting the write would exceed the configured capacity.
    #[error("record store is full ({capacity} records)")]
    CapacityExceeded { capacity: usize },

    /// An overwrite targeted a record that no longer exists.
    #[error("record {id} does not exist")]
    Missing { id: EmployeeId },

    /// The backing storage could not be reached.
    #[error("record store unavailable: {0}")]
    Unavailable(String),
}

/// Keyed storage for employee records.
#[tonic::async_trait]
pub trait RecordStore: Send + Sync + 'static {
    /// Persists new details and returns the record with its assigned id.
    async fn save(&self, employee: NewEmployee) -> StoreResult<Employee>;

    /// Persists every record or none of them. Ids are assigned in input
    /// order.
    async fn save_all(&self, employees: Vec<NewEmployee>) -> StoreResult<Vec<Employee>>;

    /// Overwrites an existing record. Last write wins.
    async fn update(&self, employee: Employee) -> StoreResult<Employee>;

    async fn find_by_id(&self, id: EmployeeId) -> StoreResult<Option<Employee>>;

    /// Returns every record in ascending id order.
    async fn find_all(&self) -> StoreResult<Vec<Employee>>;

    /// Removes a record. Removing an absent record is a no-op.
    async fn delete(&self, employee: &Employee) -> StoreResult<()>;
}
