//! # Employee Record Types
//!
//! Storage-side shapes of the employee aggregate. These are what the record
//! store accepts and returns; the wire messages live in
//! [`crate::proto`] and are converted by [`crate::mapper`].
//!
//! - [`NewEmployee`] - the three editable fields, before an id exists.
//! - [`Employee`] - a persisted record carrying its store-assigned id.
//! - [`Lookup`] - the outcome of an id lookup that must never fail on
//!   absence.

/// Identifier assigned by the record store on creation.
pub type EmployeeId = u64;

/// Employee details without an id. No field is validated; empty strings are
/// legal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewEmployee {
    pub name: String,
    pub email: String,
    pub address: String,
}

/// A persisted employee record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    pub email: String,
    pub address: String,
}

impl Employee {
    /// Attaches a freshly assigned id to unsaved details.
    pub fn with_id(id: EmployeeId, details: NewEmployee) -> Self {
        Self {
            id,
            name: details.name,
            email: details.email,
            address: details.address,
        }
    }

    /// Overwrites every non-id field. The id is never touched.
    pub fn replace_details(&mut self, details: NewEmployee) {
        self.name = details.name;
        self.email = details.email;
        self.address = details.address;
    }
}

/// Result of looking an id up on the bidirectional stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lookup {
    Found(Employee),
    Missing(EmployeeId),
}

impl Lookup {
    pub fn from_option(id: EmployeeId, found: Option<Employee>) -> Self {
        match found {
            Some(employee) => Self::Found(employee),
            None => Self::Missing(id),
        }
    }
}
