#![allow(warnings)]
#[macro_use]
extern crate diesel;

pub mod schema;
pub mod types;
pub mod db;
pub mod employee;
pub mod sequence;
pub mod document;
pub mod lead;
pub mod lead_status;
pub mod lead_log;
pub mod otp;
pub mod applicant;
pub mod kyc;
pub mod bank_account;
pub mod cam;
pub mod application;
pub mod sanction;
pub mod disbursal;
pub mod ledger;
pub mod providers;
pub mod origination;
pub mod api;

#[cfg(test)]
mod testutil;

pub use crate::db::PgPool;
pub use crate::employee::{Actor, Employee, Role};
pub use crate::lead::Lead;
pub use crate::lead_status::Stage;
pub use crate::origination::{Error, ErrorKind, Service};
pub use crate::types::{Date, Id, Page, Paged, Time};
