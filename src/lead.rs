use std::str::FromStr;

use bigdecimal::BigDecimal;
use diesel::{
	deserialize::{self, FromSql},
	pg::Pg,
	prelude::*,
	serialize,
	serialize::{Output, ToSql},
	sql_types::Varchar,
};
use serde::{Deserialize, Serialize};
use strum;
use strum_macros::{Display, EnumString};

use crate::db;
use crate::schema::leads;
use crate::types::{Date, Id, Page, Paged, Time};

/// Applicant-submitted intake record, the first stage of the loan journey
#[derive(Queryable, Identifiable, PartialEq, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
	pub id: Id,
	pub lead_no: String,
	pub f_name: String,
	pub m_name: Option<String>,
	pub l_name: Option<String>,
	pub gender: Gender,
	pub dob: Date,
	pub aadhaar: String,
	pub pan: String,
	pub mobile: String,
	pub alternate_mobile: Option<String>,
	pub personal_email: String,
	pub office_email: String,
	pub loan_amount: BigDecimal,
	pub salary: BigDecimal,
	pub pin_code: String,
	pub city: String,
	pub state: String,
	pub source: Source,
	pub cibil_score: Option<i16>,
	pub screener_id: Option<Id>,
	pub on_hold: bool,
	pub held_by: Option<Id>,
	pub is_mobile_verified: bool,
	pub is_email_verified: bool,
	pub is_aadhaar_verified: bool,
	pub is_pan_verified: bool,
	pub is_recommended: bool,
	pub recommended_by: Option<Id>,
	pub is_rejected: bool,
	pub rejected_by: Option<Id>,
	pub document_id: Id,
	pub status_id: Id,
	pub created_at: Time,
	pub updated_at: Time,
}

impl Lead {
	pub fn full_name(&self) -> String {
		let mut name = self.f_name.clone();
		if let Some(m) = &self.m_name {
			if !m.is_empty() {
				name.push(' ');
				name.push_str(m);
			}
		}
		if let Some(l) = &self.l_name {
			if !l.is_empty() {
				name.push(' ');
				name.push_str(l);
			}
		}
		name
	}

	/// Everything still blocking a screener from recommending this lead
	pub fn recommend_blockers(&self) -> Vec<&'static str> {
		let mut blockers = Vec::new();
		if self.is_rejected {
			blockers.push("lead is rejected");
		}
		if self.on_hold {
			blockers.push("lead is on hold");
		}
		if self.is_recommended {
			blockers.push("lead is already recommended");
		}
		if !self.is_mobile_verified {
			blockers.push("mobile is not verified");
		}
		if !self.is_email_verified {
			blockers.push("email is not verified");
		}
		if self.cibil_score.is_none() {
			blockers.push("credit score has not been fetched");
		}
		blockers
	}
}

/// Splits a combined first-name field the way intake forms submit it
///
/// A two-word first name with no explicit middle name becomes
/// first + middle.
pub fn split_name(f_name: &str, m_name: Option<&str>, l_name: Option<&str>) -> (String, Option<String>, Option<String>) {
	let parts: Vec<&str> = f_name.split_whitespace().collect();
	let first = parts.get(0).map(|s| s.to_string()).unwrap_or_default();
	let middle = match m_name {
		Some(m) if !m.is_empty() => Some(m.to_string()),
		_ => {
			if parts.len() == 2 {
				Some(parts[1].to_string())
			} else {
				None
			}
		}
	};
	let last = l_name.filter(|l| !l.is_empty()).map(|l| l.to_string());
	(first, middle, last)
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, AsExpression, FromSqlRow, Serialize)]
#[sql_type = "Varchar"]
pub enum Gender {
	#[serde(rename = "M")]
	Male,
	#[serde(rename = "F")]
	Female,
	#[serde(rename = "O")]
	Other,
}

impl Gender {
	pub fn as_str(&self) -> &str {
		match self {
			Gender::Male => "M",
			Gender::Female => "F",
			Gender::Other => "O",
		}
	}

	/// Normalizes the intake form's spelled-out values
	pub fn parse(value: &str) -> Gender {
		match value {
			"M" | "MALE" | "male" => Gender::Male,
			"F" | "FEMALE" | "female" => Gender::Female,
			_ => Gender::Other,
		}
	}
}

impl ToSql<Varchar, Pg> for Gender {
	fn to_sql<W: std::io::Write>(&self, out: &mut Output<W, Pg>) -> serialize::Result {
		ToSql::<Varchar, Pg>::to_sql(self.as_str(), out)
	}
}

impl FromSql<Varchar, Pg> for Gender {
	fn from_sql(bytes: Option<&[u8]>) -> deserialize::Result<Self> {
		let bytes = bytes.ok_or_else(|| "error deserializing from varchar")?;
		match std::str::from_utf8(bytes)? {
			"M" => Ok(Gender::Male),
			"F" => Ok(Gender::Female),
			"O" => Ok(Gender::Other),
			_ => Err("invalid gender".into()),
		}
	}
}

/// Where the lead came in from
#[derive(Debug, Clone, Copy, Eq, PartialEq, AsExpression, FromSqlRow, EnumString, Display, Serialize, Deserialize)]
#[sql_type = "Varchar"]
#[strum(serialize_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum Source {
	Website,
	Bulk,
	LandingPage,
	Whatsapp,
	App,
}

impl Default for Source {
	fn default() -> Self { Source::Website }
}

impl ToSql<Varchar, Pg> for Source {
	fn to_sql<W: std::io::Write>(&self, out: &mut Output<W, Pg>) -> serialize::Result {
		ToSql::<Varchar, Pg>::to_sql(&self.to_string(), out)
	}
}

impl FromSql<Varchar, Pg> for Source {
	fn from_sql(bytes: Option<&[u8]>) -> deserialize::Result<Self> {
		let bytes = bytes.ok_or_else(|| "error deserializing from varchar")?;
		let s = std::str::from_utf8(bytes)?;

		Source::from_str(s).map_err(|_| "invalid lead source".into())
	}
}

#[derive(Insertable)]
#[table_name = "leads"]
pub struct NewLead {
	pub lead_no: String,
	pub f_name: String,
	pub m_name: Option<String>,
	pub l_name: Option<String>,
	pub gender: Gender,
	pub dob: Date,
	pub aadhaar: String,
	pub pan: String,
	pub mobile: String,
	pub alternate_mobile: Option<String>,
	pub personal_email: String,
	pub office_email: String,
	pub loan_amount: BigDecimal,
	pub salary: BigDecimal,
	pub pin_code: String,
	pub city: String,
	pub state: String,
	pub source: Source,
	pub document_id: Id,
	pub status_id: Id,
}

/// Screener-editable fields
#[derive(AsChangeset, Default, Deserialize)]
#[table_name = "leads"]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateLead {
	pub f_name: Option<String>,
	pub m_name: Option<String>,
	pub l_name: Option<String>,
	pub mobile: Option<String>,
	pub alternate_mobile: Option<String>,
	pub personal_email: Option<String>,
	pub office_email: Option<String>,
	pub loan_amount: Option<BigDecimal>,
	pub salary: Option<BigDecimal>,
	pub pin_code: Option<String>,
	pub city: Option<String>,
	pub state: Option<String>,
}

pub struct Repo {
	db: db::PgPool,
}

impl Repo {
	pub fn new(db: db::PgPool) -> Self {
		Repo { db }
	}

	pub fn create(&self, new_lead: NewLead) -> db::Result<Lead> {
		let conn = &self.db.get()?;
		diesel::insert_into(leads::table)
			.values(&new_lead)
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn find_by_id(&self, id: &Id) -> db::Result<Lead> {
		let conn = &self.db.get()?;
		leads::table
			.find(id)
			.first(conn)
			.map_err(Into::into)
	}

	pub fn find_by_lead_no(&self, lead_no: &str) -> db::Result<Lead> {
		let conn = &self.db.get()?;
		leads::table
			.filter(leads::lead_no.eq(lead_no))
			.first(conn)
			.map_err(Into::into)
	}

	/// Fresh leads no screener has picked up yet
	pub fn list_unallocated(&self, page: Page) -> db::Result<Paged<Lead>> {
		let conn = &self.db.get()?;
		let query = leads::table
			.filter(leads::screener_id.is_null())
			.filter(leads::is_recommended.eq(false));

		let total = query.count().get_result(conn)?;
		let items = query
			.order(leads::updated_at.desc())
			.offset(page.offset())
			.limit(page.limit)
			.load(conn)?;
		Ok(Paged::new(total, page, items))
	}

	/// Leads a screener has taken ownership of and is still working
	///
	/// `screener_id` of None lists across all screeners (admin view).
	pub fn list_allocated(&self, screener_id: Option<&Id>, page: Page) -> db::Result<Paged<Lead>> {
		let conn = &self.db.get()?;

		let filtered = |screener_id: Option<&Id>| {
			let mut query = leads::table
				.filter(leads::screener_id.is_not_null())
				.filter(leads::on_hold.eq(false))
				.filter(leads::is_rejected.eq(false))
				.filter(leads::is_recommended.eq(false))
				.into_boxed();
			if let Some(id) = screener_id {
				query = query.filter(leads::screener_id.eq(*id));
			}
			query
		};

		let total = filtered(screener_id).count().get_result(conn)?;
		let items = filtered(screener_id)
			.order(leads::updated_at.desc())
			.offset(page.offset())
			.limit(page.limit)
			.load(conn)?;
		Ok(Paged::new(total, page, items))
	}

	pub fn list_rejected(&self, page: Page) -> db::Result<Paged<Lead>> {
		let conn = &self.db.get()?;
		let query = leads::table.filter(leads::is_rejected.eq(true));

		let total = query.count().get_result(conn)?;
		let items = query
			.order(leads::updated_at.desc())
			.offset(page.offset())
			.limit(page.limit)
			.load(conn)?;
		Ok(Paged::new(total, page, items))
	}

	pub fn allocate(&self, id: &Id, screener_id: &Id) -> db::Result<Lead> {
		let conn = &self.db.get()?;
		diesel::update(leads::table)
			.filter(leads::id.eq(id))
			.set((
				leads::screener_id.eq(screener_id),
				leads::updated_at.eq(diesel::dsl::now),
			))
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn update(&self, id: &Id, changes: UpdateLead) -> db::Result<Lead> {
		let conn = &self.db.get()?;
		diesel::update(leads::table)
			.filter(leads::id.eq(id))
			.set((changes, leads::updated_at.eq(diesel::dsl::now)))
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn set_cibil_score(&self, id: &Id, score: i16) -> db::Result<Lead> {
		let conn = &self.db.get()?;
		diesel::update(leads::table)
			.filter(leads::id.eq(id))
			.set((
				leads::cibil_score.eq(score),
				leads::updated_at.eq(diesel::dsl::now),
			))
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn set_pan_verified(&self, id: &Id) -> db::Result<Lead> {
		let conn = &self.db.get()?;
		diesel::update(leads::table)
			.filter(leads::id.eq(id))
			.set((
				leads::is_pan_verified.eq(true),
				leads::updated_at.eq(diesel::dsl::now),
			))
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn set_aadhaar_verified(&self, id: &Id) -> db::Result<Lead> {
		let conn = &self.db.get()?;
		diesel::update(leads::table)
			.filter(leads::id.eq(id))
			.set((
				leads::is_aadhaar_verified.eq(true),
				leads::updated_at.eq(diesel::dsl::now),
			))
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn set_mobile_verified(&self, id: &Id) -> db::Result<Lead> {
		let conn = &self.db.get()?;
		diesel::update(leads::table)
			.filter(leads::id.eq(id))
			.set((
				leads::is_mobile_verified.eq(true),
				leads::updated_at.eq(diesel::dsl::now),
			))
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn set_email_verified(&self, id: &Id) -> db::Result<Lead> {
		let conn = &self.db.get()?;
		diesel::update(leads::table)
			.filter(leads::id.eq(id))
			.set((
				leads::is_email_verified.eq(true),
				leads::updated_at.eq(diesel::dsl::now),
			))
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn set_hold(&self, id: &Id, held_by: &Id, on_hold: bool) -> db::Result<Lead> {
		let conn = &self.db.get()?;
		let held_by = if on_hold { Some(*held_by) } else { None };
		diesel::update(leads::table)
			.filter(leads::id.eq(id))
			.set((
				leads::on_hold.eq(on_hold),
				leads::held_by.eq(held_by),
				leads::updated_at.eq(diesel::dsl::now),
			))
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn set_recommended(&self, id: &Id, recommended_by: &Id) -> db::Result<Lead> {
		let conn = &self.db.get()?;
		diesel::update(leads::table)
			.filter(leads::id.eq(id))
			.set((
				leads::is_recommended.eq(true),
				leads::recommended_by.eq(recommended_by),
				leads::updated_at.eq(diesel::dsl::now),
			))
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn set_rejected(&self, id: &Id, rejected_by: &Id) -> db::Result<Lead> {
		let conn = &self.db.get()?;
		diesel::update(leads::table)
			.filter(leads::id.eq(id))
			.set((
				leads::on_hold.eq(false),
				leads::is_rejected.eq(true),
				leads::rejected_by.eq(rejected_by),
				leads::updated_at.eq(diesel::dsl::now),
			))
			.get_result(conn)
			.map_err(Into::into)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn splits_two_word_first_name() {
		let (f, m, l) = split_name("Rohan Kumar", None, Some("Shah"));
		assert_eq!(f, "Rohan");
		assert_eq!(m.as_deref(), Some("Kumar"));
		assert_eq!(l.as_deref(), Some("Shah"));
	}

	#[test]
	fn explicit_middle_name_wins() {
		let (f, m, l) = split_name("Rohan Kumar", Some("Dev"), None);
		assert_eq!(f, "Rohan");
		assert_eq!(m.as_deref(), Some("Dev"));
		assert_eq!(l, None);
	}

	#[test]
	fn gender_normalization() {
		assert_eq!(Gender::parse("MALE"), Gender::Male);
		assert_eq!(Gender::parse("F"), Gender::Female);
		assert_eq!(Gender::parse("nonbinary"), Gender::Other);
		assert_eq!(Gender::Female.as_str(), "F");
	}

	#[test]
	fn source_strings() {
		assert_eq!(Source::LandingPage.to_string(), "landingPage");
		assert_eq!("whatsapp".parse::<Source>().unwrap(), Source::Whatsapp);
	}

	#[test]
	fn fresh_lead_reports_its_blockers() {
		let lead = Lead {
			id: uuid::Uuid::new_v4(),
			lead_no: "LD0000000001".into(),
			f_name: "Asha".into(),
			m_name: None,
			l_name: Some("Rao".into()),
			gender: Gender::Female,
			dob: chrono::NaiveDate::from_ymd(1994, 7, 12),
			aadhaar: "123412341234".into(),
			pan: "ABCPD1234E".into(),
			mobile: "9876543210".into(),
			alternate_mobile: None,
			personal_email: "asha@example.com".into(),
			office_email: "asha@office.example.com".into(),
			loan_amount: BigDecimal::from(50000),
			salary: BigDecimal::from(42000),
			pin_code: "560001".into(),
			city: "Bengaluru".into(),
			state: "Karnataka".into(),
			source: Source::Website,
			cibil_score: None,
			screener_id: None,
			on_hold: false,
			held_by: None,
			is_mobile_verified: false,
			is_email_verified: false,
			is_aadhaar_verified: false,
			is_pan_verified: false,
			is_recommended: false,
			recommended_by: None,
			is_rejected: false,
			rejected_by: None,
			document_id: uuid::Uuid::new_v4(),
			status_id: uuid::Uuid::new_v4(),
			created_at: chrono::Utc::now(),
			updated_at: chrono::Utc::now(),
		};

		let blockers = lead.recommend_blockers();
		assert_eq!(blockers.len(), 3);
		assert_eq!(lead.full_name(), "Asha Rao");

		let mut ready = lead.clone();
		ready.is_mobile_verified = true;
		ready.is_email_verified = true;
		ready.cibil_score = Some(741);
		assert!(ready.recommend_blockers().is_empty());
	}

	#[test]
	#[ignore = "needs a database"]
	fn allocation_scopes_the_screener_queue() {
		use crate::testutil::*;

		let fixture = Fixture::new();
		fixture.teardown();
		let suite = Suite::with_pool(fixture.pool());

		let screener = fixture.employee_factory.screener();
		let lead = fixture.insert_lead("ABCPD1234E", "9876543210");

		let unallocated = suite.lead_repo.list_unallocated(crate::types::Page::default()).unwrap();
		assert_eq!(unallocated.total, 1);

		suite.lead_repo.allocate(&lead.id, &screener.id).unwrap();

		let unallocated = suite.lead_repo.list_unallocated(crate::types::Page::default()).unwrap();
		assert_eq!(unallocated.total, 0);

		let mine = suite.lead_repo.list_allocated(Some(&screener.id), crate::types::Page::default()).unwrap();
		assert_eq!(mine.total, 1);
		assert_eq!(mine.items[0].id, lead.id);
	}
}
