pub mod error;
pub mod service;

pub use error::{Error, ErrorKind};
pub use service::{BankDetails, LeadIntake, NewService, RejectedRecords, Result, Service};
