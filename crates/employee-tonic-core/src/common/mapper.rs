//! Conversions between storage records and wire messages.
//!
//! Every conversion is pure and total. A persisted [`Employee`] always maps to
//! a fully populated [`EmployeeResponse`]; the only partially synthetic
//! response is the placeholder produced for [`Lookup::Missing`].

use crate::proto::{EmployeeList, EmployeeRequest, EmployeeResponse, UpdateEmployeeRequest};
use crate::types::{Employee, EmployeeId, Lookup, NewEmployee};

/// Name carried by the placeholder answering an unknown id.
pub const NOT_FOUND_NAME: &str = "Not Found";

/// Email and address carried by the placeholder answering an unknown id.
pub const NOT_AVAILABLE: &str = "N/A";

impl From<Employee> for EmployeeResponse {
    fn from(employee: Employee) -> Self {
        Self {
            id: employee.id,
            name: employee.name,
            email: employee.email,
            address: employee.address,
        }
    }
}

impl From<EmployeeRequest> for NewEmployee {
    fn from(req: EmployeeRequest) -> Self {
        Self {
            name: req.name,
            email: req.email,
            address: req.address,
        }
    }
}

impl From<NewEmployee> for EmployeeRequest {
    fn from(details: NewEmployee) -> Self {
        Self {
            name: details.name,
            email: details.email,
            address: details.address,
        }
    }
}

impl From<Lookup> for EmployeeResponse {
    fn from(lookup: Lookup) -> Self {
        match lookup {
            Lookup::Found(employee) => employee.into(),
            Lookup::Missing(id) => Self::not_found(id),
        }
    }
}

impl FromIterator<Employee> for EmployeeList {
    fn from_iter<I: IntoIterator<Item = Employee>>(iter: I) -> Self {
        Self {
            employees: iter.into_iter().map(EmployeeResponse::from).collect(),
        }
    }
}

impl EmployeeResponse {
    /// Placeholder answering a lookup of an id the store does not hold.
    pub fn not_found(id: EmployeeId) -> Self {
        Self {
            id,
            name: NOT_FOUND_NAME.to_string(),
            email: NOT_AVAILABLE.to_string(),
            address: NOT_AVAILABLE.to_string(),
        }
    }
}

impl UpdateEmployeeRequest {
    /// Splits the request into the target id and the replacement details.
    pub fn into_parts(self) -> (EmployeeId, NewEmployee) {
        (
            self.id,
            NewEmployee {
                name: self.name,
                email: self.email,
                address: self.address,
            },
        )
    }
}
