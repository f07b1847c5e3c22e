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
use crate::schema::employees;
use crate::types::{Id, Time};

/// Back-office employee operating on loan records
#[derive(Queryable, Identifiable, PartialEq, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
	pub id: Id,
	pub f_name: String,
	pub m_name: Option<String>,
	pub l_name: String,
	pub email: String,
	pub role: Role,
	pub created_at: Time,
}

impl Employee {
	pub fn full_name(&self) -> String {
		match &self.m_name {
			Some(m) => format!("{} {} {}", self.f_name, m, self.l_name),
			None => format!("{} {}", self.f_name, self.l_name),
		}
	}
}

/// The role an employee acts under for a given request
///
/// Stage transitions are writable only by the matching role
#[derive(Debug, Clone, Copy, Eq, PartialEq, AsExpression, FromSqlRow, EnumString, Display, Serialize)]
#[sql_type = "Varchar"]
#[strum(serialize_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum Role {
	Admin,
	Screener,
	CreditManager,
	SanctionHead,
	DisbursalManager,
	DisbursalHead,
	AccountExecutive,
	CollectionExecutive,
}

impl ToSql<Varchar, Pg> for Role {
	fn to_sql<W: std::io::Write>(&self, out: &mut Output<W, Pg>) -> serialize::Result {
		ToSql::<Varchar, Pg>::to_sql(&self.to_string(), out)
	}
}

impl FromSql<Varchar, Pg> for Role {
	fn from_sql(bytes: Option<&[u8]>) -> deserialize::Result<Self> {
		let bytes = bytes.ok_or_else(|| "error deserializing from varchar")?;
		let s = std::str::from_utf8(bytes)?;

		Role::from_str(s).map_err(|_| "invalid employee role".into())
	}
}

/// The request-scoped actor context populated by authentication upstream
#[derive(Debug, Clone)]
pub struct Actor {
	pub employee: Employee,
	pub active_role: Role,
}

impl Actor {
	pub fn new(employee: Employee, active_role: Role) -> Self {
		Actor { employee, active_role }
	}

	pub fn is(&self, role: Role) -> bool {
		self.active_role == role
	}

	pub fn is_any(&self, roles: &[Role]) -> bool {
		roles.contains(&self.active_role)
	}
}

#[derive(Insertable)]
#[table_name = "employees"]
pub struct NewEmployee<'a> {
	pub f_name: &'a str,
	pub m_name: Option<&'a str>,
	pub l_name: &'a str,
	pub email: &'a str,
	pub role: Role,
}

pub struct Repo {
	db: db::PgPool,
}

impl Repo {
	pub fn new(db: db::PgPool) -> Self {
		Repo { db }
	}

	pub fn create(&self, new_employee: NewEmployee) -> db::Result<Employee> {
		let conn = &self.db.get()?;
		diesel::insert_into(employees::table)
			.values(&new_employee)
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn find_by_id(&self, id: &Id) -> db::Result<Employee> {
		let conn = &self.db.get()?;
		employees::table
			.find(id)
			.first(conn)
			.map_err(Into::into)
	}

	pub fn find_by_email(&self, email: &str) -> db::Result<Employee> {
		let conn = &self.db.get()?;
		employees::table
			.filter(employees::email.eq(email))
			.first(conn)
			.map_err(Into::into)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn role_strings_match_request_context_values() {
		assert_eq!(Role::CreditManager.to_string(), "creditManager");
		assert_eq!(Role::SanctionHead.to_string(), "sanctionHead");
		assert_eq!("disbursalHead".parse::<Role>().unwrap(), Role::DisbursalHead);
		assert!("underwriter".parse::<Role>().is_err());
	}

	#[test]
	fn actor_role_checks() {
		let employee = Employee {
			id: uuid::Uuid::new_v4(),
			f_name: "Asha".into(),
			m_name: None,
			l_name: "Rao".into(),
			email: "asha@example.com".into(),
			role: Role::Screener,
			created_at: chrono::Utc::now(),
		};
		let actor = Actor::new(employee, Role::Screener);
		assert!(actor.is(Role::Screener));
		assert!(actor.is_any(&[Role::Admin, Role::Screener]));
		assert!(!actor.is(Role::SanctionHead));
	}
}
