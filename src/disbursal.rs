use bigdecimal::BigDecimal;
use diesel::prelude::*;
use serde::Serialize;

use crate::db;
use crate::schema::{cam_details, disbursals, employees, leads};
use crate::types::{Date, Id, Page, Paged, Time};

/// Payout stage record, created once the sanction letter is e-signed
#[derive(Queryable, Identifiable, PartialEq, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Disbursal {
	pub id: Id,
	pub sanction_id: Id,
	pub lead_no: String,
	pub pan: String,
	pub loan_no: String,
	pub disbursal_manager_id: Option<Id>,
	pub is_recommended: bool,
	pub recommended_by: Option<Id>,
	pub payable_account: Option<String>,
	pub payment_mode: Option<String>,
	pub amount: Option<BigDecimal>,
	pub channel: Option<String>,
	pub utr: Option<String>,
	pub disbursed_at: Option<Date>,
	pub is_disbursed: bool,
	pub disbursed_by: Option<Id>,
	pub on_hold: bool,
	pub is_rejected: bool,
	pub rejected_by: Option<Id>,
	pub created_at: Time,
	pub updated_at: Time,
}

#[derive(Insertable)]
#[table_name = "disbursals"]
pub struct NewDisbursal<'a> {
	pub sanction_id: &'a Id,
	pub lead_no: &'a str,
	pub pan: &'a str,
	pub loan_no: &'a str,
}

/// Payment details the disbursal head records once the money has moved
#[derive(Debug)]
pub struct Payment<'a> {
	pub payable_account: &'a str,
	pub payment_mode: &'a str,
	pub amount: &'a BigDecimal,
	pub channel: &'a str,
	pub utr: &'a str,
	pub disbursed_at: Date,
}

/// Row of the disbursed-loans read model
#[derive(Queryable, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisbursedRow {
	pub lead_no: String,
	pub loan_no: String,
	pub f_name: String,
	pub m_name: Option<String>,
	pub l_name: Option<String>,
	pub pan: String,
	pub mobile: String,
	pub aadhaar: String,
	pub city: String,
	pub state: String,
	pub disbursed_by_f_name: String,
	pub disbursed_by_l_name: String,
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

	pub fn create(&self, new_disbursal: NewDisbursal) -> db::Result<Disbursal> {
		let conn = &self.db.get()?;
		diesel::insert_into(disbursals::table)
			.values(&new_disbursal)
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn find_by_id(&self, id: &Id) -> db::Result<Disbursal> {
		let conn = &self.db.get()?;
		disbursals::table
			.find(id)
			.first(conn)
			.map_err(Into::into)
	}

	/// E-signed disbursals no manager has picked up yet
	pub fn list_new(&self, page: Page) -> db::Result<Paged<Disbursal>> {
		let conn = &self.db.get()?;
		let query = disbursals::table
			.filter(disbursals::disbursal_manager_id.is_null())
			.filter(disbursals::is_recommended.eq(false))
			.filter(disbursals::is_disbursed.eq(false));

		let total = query.count().get_result(conn)?;
		let items = query
			.order(disbursals::updated_at.desc())
			.offset(page.offset())
			.limit(page.limit)
			.load(conn)?;
		Ok(Paged::new(total, page, items))
	}

	/// `disbursal_manager_id` of None lists across all managers (head view)
	pub fn list_allocated(&self, disbursal_manager_id: Option<&Id>, page: Page) -> db::Result<Paged<Disbursal>> {
		let conn = &self.db.get()?;

		let filtered = |disbursal_manager_id: Option<&Id>| {
			let mut query = disbursals::table
				.filter(disbursals::disbursal_manager_id.is_not_null())
				.filter(disbursals::is_recommended.eq(false))
				.filter(disbursals::is_rejected.eq(false))
				.filter(disbursals::on_hold.eq(false))
				.into_boxed();
			if let Some(id) = disbursal_manager_id {
				query = query.filter(disbursals::disbursal_manager_id.eq(*id));
			}
			query
		};

		let total = filtered(disbursal_manager_id).count().get_result(conn)?;
		let items = filtered(disbursal_manager_id)
			.order(disbursals::updated_at.desc())
			.offset(page.offset())
			.limit(page.limit)
			.load(conn)?;
		Ok(Paged::new(total, page, items))
	}

	/// Recommended by a manager, waiting on the disbursal head's payment
	pub fn list_pending(&self, page: Page) -> db::Result<Paged<Disbursal>> {
		let conn = &self.db.get()?;
		let query = disbursals::table
			.filter(disbursals::disbursal_manager_id.is_not_null())
			.filter(disbursals::is_recommended.eq(true))
			.filter(disbursals::on_hold.eq(false))
			.filter(disbursals::is_rejected.eq(false))
			.filter(disbursals::is_disbursed.eq(false));

		let total = query.count().get_result(conn)?;
		let items = query
			.order(disbursals::updated_at.desc())
			.offset(page.offset())
			.limit(page.limit)
			.load(conn)?;
		Ok(Paged::new(total, page, items))
	}

	pub fn list_rejected(&self, page: Page) -> db::Result<Paged<Disbursal>> {
		let conn = &self.db.get()?;
		let query = disbursals::table.filter(disbursals::is_rejected.eq(true));

		let total = query.count().get_result(conn)?;
		let items = query
			.order(disbursals::updated_at.desc())
			.offset(page.offset())
			.limit(page.limit)
			.load(conn)?;
		Ok(Paged::new(total, page, items))
	}

	/// The disbursed-loans report: lead, appraisal and the employee who
	/// pushed the payment out
	pub fn list_disbursed(&self) -> db::Result<Vec<DisbursedRow>> {
		let conn = &self.db.get()?;
		disbursals::table
			.inner_join(leads::table.on(leads::lead_no.eq(disbursals::lead_no)))
			.inner_join(cam_details::table.on(cam_details::lead_id.eq(leads::id)))
			.inner_join(employees::table.on(employees::id.nullable().eq(disbursals::disbursed_by)))
			.filter(disbursals::is_disbursed.eq(true))
			.order(disbursals::updated_at.desc())
			.select((
				disbursals::lead_no,
				disbursals::loan_no,
				leads::f_name,
				leads::m_name,
				leads::l_name,
				leads::pan,
				leads::mobile,
				leads::aadhaar,
				leads::city,
				leads::state,
				employees::f_name,
				employees::l_name,
				cam_details::loan_recommended,
				cam_details::actual_net_salary,
			))
			.load(conn)
			.map_err(Into::into)
	}

	pub fn allocate(&self, id: &Id, disbursal_manager_id: &Id) -> db::Result<Disbursal> {
		let conn = &self.db.get()?;
		diesel::update(disbursals::table)
			.filter(disbursals::id.eq(id))
			.set((
				disbursals::disbursal_manager_id.eq(disbursal_manager_id),
				disbursals::updated_at.eq(diesel::dsl::now),
			))
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn set_recommended(&self, id: &Id, recommended_by: &Id) -> db::Result<Disbursal> {
		let conn = &self.db.get()?;
		diesel::update(disbursals::table)
			.filter(disbursals::id.eq(id))
			.set((
				disbursals::is_recommended.eq(true),
				disbursals::recommended_by.eq(recommended_by),
				disbursals::updated_at.eq(diesel::dsl::now),
			))
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn record_payment(&self, id: &Id, payment: Payment, disbursed_by: &Id) -> db::Result<Disbursal> {
		let conn = &self.db.get()?;
		diesel::update(disbursals::table)
			.filter(disbursals::id.eq(id))
			.set((
				disbursals::payable_account.eq(payment.payable_account),
				disbursals::payment_mode.eq(payment.payment_mode),
				disbursals::amount.eq(payment.amount),
				disbursals::channel.eq(payment.channel),
				disbursals::utr.eq(payment.utr),
				disbursals::disbursed_at.eq(payment.disbursed_at),
				disbursals::is_disbursed.eq(true),
				disbursals::disbursed_by.eq(disbursed_by),
				disbursals::updated_at.eq(diesel::dsl::now),
			))
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn set_rejected(&self, id: &Id, rejected_by: &Id) -> db::Result<Disbursal> {
		let conn = &self.db.get()?;
		diesel::update(disbursals::table)
			.filter(disbursals::id.eq(id))
			.set((
				disbursals::is_rejected.eq(true),
				disbursals::rejected_by.eq(rejected_by),
				disbursals::updated_at.eq(diesel::dsl::now),
			))
			.get_result(conn)
			.map_err(Into::into)
	}
}
