use diesel::prelude::*;
use serde::Serialize;

use crate::db;
use crate::schema::applicant_banks;
use crate::types::{Id, Time};

/// Verified bank account the disbursal will be paid into
#[derive(Queryable, Identifiable, PartialEq, Debug, Serialize)]
#[table_name = "applicant_banks"]
#[serde(rename_all = "camelCase")]
pub struct BankAccount {
	pub id: Id,
	pub applicant_id: Id,
	pub beneficiary_name: String,
	pub bank_acc_no: String,
	pub account_type: String,
	pub ifsc_code: String,
	pub bank_name: String,
	pub branch_name: String,
	pub created_at: Time,
}

#[derive(Insertable)]
#[table_name = "applicant_banks"]
pub struct NewBankAccount<'a> {
	pub applicant_id: &'a Id,
	pub beneficiary_name: &'a str,
	pub bank_acc_no: &'a str,
	pub account_type: &'a str,
	pub ifsc_code: &'a str,
	pub bank_name: &'a str,
	pub branch_name: &'a str,
}

#[derive(AsChangeset, Default)]
#[table_name = "applicant_banks"]
pub struct UpdateBankAccount {
	pub beneficiary_name: Option<String>,
	pub bank_acc_no: Option<String>,
	pub account_type: Option<String>,
	pub ifsc_code: Option<String>,
	pub bank_name: Option<String>,
	pub branch_name: Option<String>,
}

pub struct Repo {
	db: db::PgPool,
}

impl Repo {
	pub fn new(db: db::PgPool) -> Self {
		Repo { db }
	}

	pub fn create(&self, new_account: NewBankAccount) -> db::Result<BankAccount> {
		let conn = &self.db.get()?;
		diesel::insert_into(applicant_banks::table)
			.values(&new_account)
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn find_by_applicant(&self, applicant_id: &Id) -> db::Result<BankAccount> {
		let conn = &self.db.get()?;
		applicant_banks::table
			.filter(applicant_banks::applicant_id.eq(applicant_id))
			.first(conn)
			.map_err(Into::into)
	}

	pub fn find_by_account_no(&self, bank_acc_no: &str) -> db::Result<BankAccount> {
		let conn = &self.db.get()?;
		applicant_banks::table
			.filter(applicant_banks::bank_acc_no.eq(bank_acc_no))
			.first(conn)
			.map_err(Into::into)
	}

	pub fn update(&self, id: &Id, changes: UpdateBankAccount) -> db::Result<BankAccount> {
		let conn = &self.db.get()?;
		diesel::update(applicant_banks::table)
			.filter(applicant_banks::id.eq(id))
			.set(changes)
			.get_result(conn)
			.map_err(Into::into)
	}
}
