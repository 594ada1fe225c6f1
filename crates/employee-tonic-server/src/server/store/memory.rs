use super::{RecordStore, StoreError, StoreResult};
use employee_tonic_core::types::{Employee, EmployeeId, NewEmployee};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// In-process [`RecordStore`] backed by an ordered map.
///
/// Ids come from an identity sequence starting at 1 and are never reused, so
/// ascending id order is also insertion order. All operations take the lock
/// once, which makes each of them atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    capacity: Option<usize>,
}

#[derive(Debug)]
struct Inner {
    records: BTreeMap<EmployeeId, Employee>,
    next_id: EmployeeId,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            records: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl Inner {
    fn ensure_room(&self, capacity: Option<usize>, incoming: usize) -> StoreResult<()> {
        match capacity {
            Some(capacity) if self.records.len() + incoming > capacity => {
                Err(StoreError::CapacityExceeded { capacity })
            }
            _ => Ok(()),
        }
    }

    fn insert(&mut self, details: NewEmployee) -> Employee {
        let employee = Employee::with_id(self.next_id, details);
        self.next_id += 1;
        self.records.insert(employee.id, employee.clone());
        employee
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that refuses writes beyond `capacity` records.
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            inner: RwLock::default(),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[tonic::async_trait]
impl RecordStore for MemoryStore {
    async fn save(&self, employee: NewEmployee) -> StoreResult<Employee> {
        let mut inner = self.inner.write();
        inner.ensure_room(self.capacity, 1)?;
        Ok(inner.insert(employee))
    }

    async fn save_all(&self, employees: Vec<NewEmployee>) -> StoreResult<Vec<Employee>> {
        let mut inner = self.inner.write();
        inner.ensure_room(self.capacity, employees.len())?;
        Ok(employees
            .into_iter()
            .map(|details| inner.insert(details))
            .collect())
    }

    async fn update(&self, employee: Employee) -> StoreResult<Employee> {
        let mut inner = self.inner.write();
        match inner.records.get_mut(&employee.id) {
            Some(slot) => {
                *slot = employee.clone();
                Ok(employee)
            }
            None => Err(StoreError::Missing { id: employee.id }),
        }
    }

    async fn find_by_id(&self, id: EmployeeId) -> StoreResult<Option<Employee>> {
        Ok(self.inner.read().records.get(&id).cloned())
    }

    async fn find_all(&self) -> StoreResult<Vec<Employee>> {
        Ok(self.inner.read().records.values().cloned().collect())
    }

    async fn delete(&self, employee: &Employee) -> StoreResult<()> {
        self.inner.write().records.remove(&employee.id);
        Ok(())
    }
}
