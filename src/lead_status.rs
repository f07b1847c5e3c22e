use std::str::FromStr;

use diesel::{
	deserialize::{self, FromSql},
	pg::Pg,
	prelude::*,
	serialize,
	serialize::{Output, ToSql},
	sql_types::Varchar,
};
use serde::Serialize;
use strum;
use strum_macros::{Display, EnumString};

use crate::db;
use crate::schema::lead_statuses;
use crate::types::{Id, Time};

/// Shadow record tracking where a lead currently sits in the pipeline
///
/// Mirrors flags from the live stage records; always written alongside them.
#[derive(Queryable, Identifiable, PartialEq, Debug, Clone, Serialize)]
#[table_name = "lead_statuses"]
#[serde(rename_all = "camelCase")]
pub struct LeadStatus {
	pub id: Id,
	pub lead_no: String,
	pub pan: String,
	pub stage: Stage,
	pub is_in_process: bool,
	pub is_rejected: bool,
	pub is_approved: bool,
	pub updated_at: Time,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, AsExpression, FromSqlRow, EnumString, Display, Serialize)]
#[sql_type = "Varchar"]
#[strum(serialize_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum Stage {
	Lead,
	Application,
	Sanction,
	Disbursal,
	Closed,
}

impl Default for Stage {
	fn default() -> Self { Stage::Lead }
}

impl ToSql<Varchar, Pg> for Stage {
	fn to_sql<W: std::io::Write>(&self, out: &mut Output<W, Pg>) -> serialize::Result {
		ToSql::<Varchar, Pg>::to_sql(&self.to_string(), out)
	}
}

impl FromSql<Varchar, Pg> for Stage {
	fn from_sql(bytes: Option<&[u8]>) -> deserialize::Result<Self> {
		let bytes = bytes.ok_or_else(|| "error deserializing from varchar")?;
		let s = std::str::from_utf8(bytes)?;

		Stage::from_str(s).map_err(|_| "invalid pipeline stage".into())
	}
}

#[derive(Insertable)]
#[table_name = "lead_statuses"]
pub struct NewLeadStatus<'a> {
	pub lead_no: &'a str,
	pub pan: &'a str,
	pub stage: Stage,
	pub is_in_process: bool,
}

pub struct Repo {
	db: db::PgPool,
}

impl Repo {
	pub fn new(db: db::PgPool) -> Self {
		Repo { db }
	}

	pub fn create(&self, new_status: NewLeadStatus) -> db::Result<LeadStatus> {
		let conn = &self.db.get()?;
		diesel::insert_into(lead_statuses::table)
			.values(&new_status)
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn find_by_id(&self, id: &Id) -> db::Result<LeadStatus> {
		let conn = &self.db.get()?;
		lead_statuses::table
			.find(id)
			.first(conn)
			.map_err(Into::into)
	}

	pub fn find_by_lead_no(&self, lead_no: &str) -> db::Result<LeadStatus> {
		let conn = &self.db.get()?;
		lead_statuses::table
			.filter(lead_statuses::lead_no.eq(lead_no))
			.first(conn)
			.map_err(Into::into)
	}

	pub fn set_stage(&self, id: &Id, stage: Stage) -> db::Result<LeadStatus> {
		let conn = &self.db.get()?;
		diesel::update(lead_statuses::table)
			.filter(lead_statuses::id.eq(id))
			.set((
				lead_statuses::stage.eq(stage),
				lead_statuses::updated_at.eq(diesel::dsl::now),
			))
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn set_rejected(&self, id: &Id) -> db::Result<LeadStatus> {
		let conn = &self.db.get()?;
		diesel::update(lead_statuses::table)
			.filter(lead_statuses::id.eq(id))
			.set((
				lead_statuses::is_rejected.eq(true),
				lead_statuses::is_in_process.eq(false),
				lead_statuses::updated_at.eq(diesel::dsl::now),
			))
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn set_approved(&self, id: &Id) -> db::Result<LeadStatus> {
		let conn = &self.db.get()?;
		diesel::update(lead_statuses::table)
			.filter(lead_statuses::id.eq(id))
			.set((
				lead_statuses::is_approved.eq(true),
				lead_statuses::updated_at.eq(diesel::dsl::now),
			))
			.get_result(conn)
			.map_err(Into::into)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn stage_strings() {
		assert_eq!(Stage::Disbursal.to_string(), "disbursal");
		assert_eq!("application".parse::<Stage>().unwrap(), Stage::Application);
		assert!("underwriting".parse::<Stage>().is_err());
	}
}
