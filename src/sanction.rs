use bigdecimal::BigDecimal;
use diesel::prelude::*;
use serde::Serialize;

use crate::db;
use crate::lead::Source;
use crate::schema::{cam_details, employees, leads, sanctions};
use crate::types::{Date, Id, Page, Paged, Time};

/// Sanction stage record, one per recommended application
///
/// Carries the loan number once a sanction head approves it.
#[derive(Queryable, Identifiable, PartialEq, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sanction {
	pub id: Id,
	pub application_id: Id,
	pub lead_no: String,
	pub pan: String,
	pub loan_no: Option<String>,
	pub sanction_date: Option<Date>,
	pub recommended_by: Id,
	pub is_approved: bool,
	pub approved_by: Option<Id>,
	pub e_sign_pending: bool,
	pub e_signed: bool,
	pub on_hold: bool,
	pub is_rejected: bool,
	pub rejected_by: Option<Id>,
	pub created_at: Time,
	pub updated_at: Time,
}

#[derive(Insertable)]
#[table_name = "sanctions"]
pub struct NewSanction<'a> {
	pub application_id: &'a Id,
	pub lead_no: &'a str,
	pub pan: &'a str,
	pub recommended_by: &'a Id,
}

/// Row of the sanctioned-loans read model: sanction joined with the lead,
/// the appraisal numbers and the recommending employee
#[derive(Queryable, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SanctionedRow {
	pub lead_no: String,
	pub loan_no: Option<String>,
	pub f_name: String,
	pub m_name: Option<String>,
	pub l_name: Option<String>,
	pub pan: String,
	pub mobile: String,
	pub aadhaar: String,
	pub city: String,
	pub state: String,
	pub source: Source,
	pub recommended_by_f_name: String,
	pub recommended_by_l_name: String,
	pub loan_recommended: Option<BigDecimal>,
	pub actual_net_salary: Option<BigDecimal>,
}

pub struct Repo {
	db: db::PgPool,
}

impl Repo {
	pub fn new(db: db::PgPool) -> Self {
		Repo { db }
	}

	pub fn create(&self, new_sanction: NewSanction) -> db::Result<Sanction> {
		let conn = &self.db.get()?;
		diesel::insert_into(sanctions::table)
			.values(&new_sanction)
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn find_by_id(&self, id: &Id) -> db::Result<Sanction> {
		let conn = &self.db.get()?;
		sanctions::table
			.find(id)
			.first(conn)
			.map_err(Into::into)
	}

	/// Sanctions awaiting the sanction head's decision
	pub fn list_pending(&self, page: Page) -> db::Result<Paged<Sanction>> {
		let conn = &self.db.get()?;
		let query = sanctions::table
			.filter(sanctions::is_rejected.eq(false))
			.filter(sanctions::e_sign_pending.eq(false))
			.filter(sanctions::e_signed.eq(false));

		let total = query.count().get_result(conn)?;
		let items = query
			.order(sanctions::updated_at.desc())
			.offset(page.offset())
			.limit(page.limit)
			.load(conn)?;
		Ok(Paged::new(total, page, items))
	}

	/// Approved sanctions whose letter is out for signature
	pub fn list_esign_pending(&self, page: Page) -> db::Result<Paged<Sanction>> {
		let conn = &self.db.get()?;
		let query = sanctions::table
			.filter(sanctions::is_rejected.eq(false))
			.filter(sanctions::is_approved.eq(true))
			.filter(sanctions::e_signed.eq(false));

		let total = query.count().get_result(conn)?;
		let items = query
			.order(sanctions::updated_at.desc())
			.offset(page.offset())
			.limit(page.limit)
			.load(conn)?;
		Ok(Paged::new(total, page, items))
	}

	/// What a credit manager has recommended and is still in flight
	pub fn list_recommended_by(&self, employee_id: &Id, page: Page) -> db::Result<Paged<Sanction>> {
		let conn = &self.db.get()?;
		let query = sanctions::table
			.filter(sanctions::recommended_by.eq(employee_id))
			.filter(sanctions::is_rejected.eq(false))
			.filter(sanctions::on_hold.eq(false))
			.filter(sanctions::e_signed.eq(false));

		let total = query.count().get_result(conn)?;
		let items = query
			.order(sanctions::updated_at.desc())
			.offset(page.offset())
			.limit(page.limit)
			.load(conn)?;
		Ok(Paged::new(total, page, items))
	}

	pub fn list_rejected(&self, page: Page) -> db::Result<Paged<Sanction>> {
		let conn = &self.db.get()?;
		let query = sanctions::table.filter(sanctions::is_rejected.eq(true));

		let total = query.count().get_result(conn)?;
		let items = query
			.order(sanctions::updated_at.desc())
			.offset(page.offset())
			.limit(page.limit)
			.load(conn)?;
		Ok(Paged::new(total, page, items))
	}

	/// The sanctioned-loans report: one row per approved sanction with
	/// lead, appraisal and recommender data joined in
	pub fn list_sanctioned(&self) -> db::Result<Vec<SanctionedRow>> {
		let conn = &self.db.get()?;
		sanctions::table
			.inner_join(leads::table.on(leads::lead_no.eq(sanctions::lead_no)))
			.inner_join(cam_details::table.on(cam_details::lead_id.eq(leads::id)))
			.inner_join(employees::table.on(employees::id.eq(sanctions::recommended_by)))
			.filter(sanctions::is_approved.eq(true))
			.order(sanctions::updated_at.desc())
			.select((
				sanctions::lead_no,
				sanctions::loan_no,
				leads::f_name,
				leads::m_name,
				leads::l_name,
				leads::pan,
				leads::mobile,
				leads::aadhaar,
				leads::city,
				leads::state,
				leads::source,
				employees::f_name,
				employees::l_name,
				cam_details::loan_recommended,
				cam_details::actual_net_salary,
			))
			.load(conn)
			.map_err(Into::into)
	}

	pub fn approve(&self, id: &Id, loan_no: &str, sanction_date: Date, approved_by: &Id) -> db::Result<Sanction> {
		let conn = &self.db.get()?;
		diesel::update(sanctions::table)
			.filter(sanctions::id.eq(id))
			.set((
				sanctions::loan_no.eq(loan_no),
				sanctions::sanction_date.eq(sanction_date),
				sanctions::is_approved.eq(true),
				sanctions::approved_by.eq(approved_by),
				sanctions::updated_at.eq(diesel::dsl::now),
			))
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn set_esign_pending(&self, id: &Id) -> db::Result<Sanction> {
		let conn = &self.db.get()?;
		diesel::update(sanctions::table)
			.filter(sanctions::id.eq(id))
			.set((
				sanctions::e_sign_pending.eq(true),
				sanctions::updated_at.eq(diesel::dsl::now),
			))
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn set_esigned(&self, id: &Id) -> db::Result<Sanction> {
		let conn = &self.db.get()?;
		diesel::update(sanctions::table)
			.filter(sanctions::id.eq(id))
			.set((
				sanctions::e_signed.eq(true),
				sanctions::e_sign_pending.eq(false),
				sanctions::updated_at.eq(diesel::dsl::now),
			))
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn set_rejected(&self, id: &Id, rejected_by: &Id) -> db::Result<Sanction> {
		let conn = &self.db.get()?;
		diesel::update(sanctions::table)
			.filter(sanctions::id.eq(id))
			.set((
				sanctions::is_rejected.eq(true),
				sanctions::rejected_by.eq(rejected_by),
				sanctions::updated_at.eq(diesel::dsl::now),
			))
			.get_result(conn)
			.map_err(Into::into)
	}
}
