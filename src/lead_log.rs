use diesel::prelude::*;
use serde::Serialize;

use crate::db;
use crate::schema::lead_logs;
use crate::types::{Id, Time};

/// Audit-trail line written whenever a lead moves or is touched
#[derive(Queryable, Identifiable, PartialEq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadLog {
	pub id: Id,
	pub lead_id: Id,
	pub status: String,
	pub borrower: String,
	pub remark: String,
	pub created_at: Time,
}

#[derive(Insertable)]
#[table_name = "lead_logs"]
pub struct NewLeadLog<'a> {
	pub lead_id: &'a Id,
	pub status: &'a str,
	pub borrower: &'a str,
	pub remark: &'a str,
}

pub struct Repo {
	db: db::PgPool,
}

impl Repo {
	pub fn new(db: db::PgPool) -> Self {
		Repo { db }
	}

	pub fn post(&self, lead_id: &Id, status: &str, borrower: &str, remark: &str) -> db::Result<LeadLog> {
		let conn = &self.db.get()?;
		diesel::insert_into(lead_logs::table)
			.values(&NewLeadLog { lead_id, status, borrower, remark })
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn find_by_lead(&self, lead_id: &Id) -> db::Result<Vec<LeadLog>> {
		let conn = &self.db.get()?;
		lead_logs::table
			.filter(lead_logs::lead_id.eq(lead_id))
			.order(lead_logs::created_at.desc())
			.load(conn)
			.map_err(Into::into)
	}
}
