use std::str::FromStr;

use bigdecimal::BigDecimal;
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel::{
	deserialize::{self, FromSql},
	pg::Pg,
	serialize,
	serialize::{Output, ToSql},
	sql_types::Varchar,
};
use serde::{Deserialize, Serialize};
use strum;
use strum_macros::{Display, EnumString};

use crate::db;
use crate::lead::Source;
use crate::schema::{cam_details, disbursals, employees, leads, loan_ledger, partial_payments};
use crate::types::{Date, Id, Time};

/// Per-PAN ledger of loans used by collections after disbursal
///
/// One row per (pan, loan_no). At most one row per PAN may be active at a
/// time; the sanction-approval flow checks this before creating a new one.
#[derive(Queryable, Identifiable, PartialEq, Debug, Clone, Serialize)]
#[table_name = "loan_ledger"]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
	pub id: Id,
	pub pan: String,
	pub lead_no: String,
	pub loan_no: String,
	pub disbursal_id: Option<Id>,
	pub is_active: bool,
	pub is_disbursed: bool,
	pub is_verified: bool,
	pub is_closed: bool,
	pub is_settled: bool,
	pub is_write_off: bool,
	pub defaulted: bool,
	pub requested_status: Option<RequestedStatus>,
	pub closing_date: Option<Date>,
	pub closing_amount: Option<BigDecimal>,
	pub utr: Option<String>,
	pub dpd: Option<i16>,
	pub updated_at: Time,
}

/// Resolution a collection executive asks the account executive to verify
#[derive(Debug, Clone, Copy, Eq, PartialEq, AsExpression, FromSqlRow, EnumString, Display, Serialize, Deserialize)]
#[sql_type = "Varchar"]
#[strum(serialize_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum RequestedStatus {
	Settled,
	Closed,
	WriteOff,
}

impl RequestedStatus {
	/// The ledger flags a verified resolution flips
	///
	/// Every outcome verifies the row and takes it out of the active set.
	pub fn flag_update(&self) -> FlagUpdate {
		match self {
			RequestedStatus::Settled => FlagUpdate {
				is_settled: true,
				is_closed: false,
				is_write_off: false,
				defaulted: false,
			},
			RequestedStatus::Closed => FlagUpdate {
				is_settled: false,
				is_closed: true,
				is_write_off: false,
				defaulted: false,
			},
			RequestedStatus::WriteOff => FlagUpdate {
				is_settled: false,
				is_closed: false,
				is_write_off: true,
				defaulted: true,
			},
		}
	}
}

#[derive(Debug, PartialEq)]
pub struct FlagUpdate {
	pub is_settled: bool,
	pub is_closed: bool,
	pub is_write_off: bool,
	pub defaulted: bool,
}

impl ToSql<Varchar, Pg> for RequestedStatus {
	fn to_sql<W: std::io::Write>(&self, out: &mut Output<W, Pg>) -> serialize::Result {
		ToSql::<Varchar, Pg>::to_sql(&self.to_string(), out)
	}
}

impl FromSql<Varchar, Pg> for RequestedStatus {
	fn from_sql(bytes: Option<&[u8]>) -> deserialize::Result<Self> {
		let bytes = bytes.ok_or_else(|| "error deserializing from varchar")?;
		let s = std::str::from_utf8(bytes)?;

		RequestedStatus::from_str(s).map_err(|_| "invalid requested status".into())
	}
}

#[derive(Insertable)]
#[table_name = "loan_ledger"]
pub struct NewLedgerEntry<'a> {
	pub pan: &'a str,
	pub lead_no: &'a str,
	pub loan_no: &'a str,
	pub is_active: bool,
}

/// Part-payment reported against an active loan
#[derive(Queryable, Identifiable, PartialEq, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialPayment {
	pub id: Id,
	pub ledger_id: Id,
	pub paid_on: Date,
	pub amount: BigDecimal,
	pub utr: String,
	pub requested_status: Option<RequestedStatus>,
	pub is_partly_paid: bool,
	pub created_at: Time,
}

#[derive(Insertable)]
#[table_name = "partial_payments"]
pub struct NewPartialPayment<'a> {
	pub ledger_id: &'a Id,
	pub paid_on: Date,
	pub amount: &'a BigDecimal,
	pub utr: &'a str,
	pub requested_status: Option<RequestedStatus>,
}

/// What verifying a payment should do to the ledger
#[derive(Debug, PartialEq)]
pub enum VerifyAction {
	/// Confirm the part-payment carrying this UTR
	MarkPartialPaid(String),
	/// Apply the requested resolution to the whole loan
	ApplyResolution(RequestedStatus),
}

/// Decides what an account executive's verification applies to
///
/// Pending part-payments are settled one UTR at a time before the loan
/// itself can be resolved; the executive's status must always match what
/// the collection executive requested.
pub fn decide_verification(
	entry: &LedgerEntry,
	partials: &[PartialPayment],
	utr: Option<&str>,
	status: RequestedStatus,
) -> std::result::Result<VerifyAction, String> {
	let pending: Vec<&PartialPayment> = partials.iter().filter(|p| !p.is_partly_paid).collect();

	if !pending.is_empty() {
		let utr = match utr {
			Some(utr) => utr,
			None => return Err("a utr is required to verify a part-payment".into()),
		};
		let payment = match pending.iter().find(|p| p.utr == utr) {
			Some(payment) => payment,
			None => return Err("no pending part-payment carries this utr".into()),
		};
		return if payment.requested_status == Some(status) {
			Ok(VerifyAction::MarkPartialPaid(utr.to_string()))
		} else {
			Err("the collection executive requested a different status for this payment".into())
		};
	}

	if entry.requested_status == Some(status) {
		return Ok(VerifyAction::ApplyResolution(status));
	}
	Err("the collection executive requested a different resolution for this loan".into())
}

/// Payment evidence a collection executive records for verification
#[derive(Debug, Default)]
pub struct Evidence {
	pub closing_date: Option<Date>,
	pub closing_amount: Option<BigDecimal>,
	pub utr: Option<String>,
	pub dpd: Option<i16>,
}

/// Row of the collection work queue: an unverified active loan joined with
/// its lead, appraisal numbers and the employee who paid it out
#[derive(Queryable, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRow {
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
	pub source: Source,
	pub loan_recommended: Option<BigDecimal>,
	pub actual_net_salary: Option<BigDecimal>,
	pub disbursed_by_f_name: String,
	pub disbursed_by_l_name: String,
}

pub struct Repo {
	db: db::PgPool,
}

impl Repo {
	pub fn new(db: db::PgPool) -> Self {
		Repo { db }
	}

	pub fn create_active(&self, pan: &str, lead_no: &str, loan_no: &str) -> db::Result<LedgerEntry> {
		let conn = &self.db.get()?;
		diesel::insert_into(loan_ledger::table)
			.values(&NewLedgerEntry {
				pan,
				lead_no,
				loan_no,
				is_active: true,
			})
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn find_by_loan_no(&self, loan_no: &str) -> db::Result<LedgerEntry> {
		let conn = &self.db.get()?;
		loan_ledger::table
			.filter(loan_ledger::loan_no.eq(loan_no))
			.first(conn)
			.map_err(Into::into)
	}

	/// The active-loan uniqueness guard used at sanction approval
	pub fn find_active_by_pan(&self, pan: &str) -> db::Result<Option<LedgerEntry>> {
		let conn = &self.db.get()?;
		loan_ledger::table
			.filter(loan_ledger::pan.eq(pan))
			.filter(loan_ledger::is_active.eq(true))
			.first(conn)
			.optional()
			.map_err(Into::into)
	}

	pub fn link_disbursal(&self, loan_no: &str, disbursal_id: &Id) -> db::Result<LedgerEntry> {
		let conn = &self.db.get()?;
		diesel::update(loan_ledger::table)
			.filter(loan_ledger::loan_no.eq(loan_no))
			.set((
				loan_ledger::disbursal_id.eq(disbursal_id),
				loan_ledger::updated_at.eq(diesel::dsl::now),
			))
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn set_disbursed(&self, loan_no: &str) -> db::Result<LedgerEntry> {
		let conn = &self.db.get()?;
		diesel::update(loan_ledger::table)
			.filter(loan_ledger::loan_no.eq(loan_no))
			.set((
				loan_ledger::is_disbursed.eq(true),
				loan_ledger::updated_at.eq(diesel::dsl::now),
			))
			.get_result(conn)
			.map_err(Into::into)
	}

	/// Records the resolution a collection executive is asking for,
	/// along with whatever payment evidence they have
	pub fn record_request(&self, loan_no: &str, status: RequestedStatus, evidence: Evidence) -> db::Result<LedgerEntry> {
		let conn = &self.db.get()?;
		diesel::update(loan_ledger::table)
			.filter(loan_ledger::loan_no.eq(loan_no))
			.set((
				loan_ledger::requested_status.eq(status),
				loan_ledger::closing_date.eq(evidence.closing_date),
				loan_ledger::closing_amount.eq(evidence.closing_amount),
				loan_ledger::utr.eq(evidence.utr),
				loan_ledger::dpd.eq(evidence.dpd),
				loan_ledger::updated_at.eq(diesel::dsl::now),
			))
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn clear_requested_status(&self, loan_no: &str) -> db::Result<LedgerEntry> {
		let conn = &self.db.get()?;
		diesel::update(loan_ledger::table)
			.filter(loan_ledger::loan_no.eq(loan_no))
			.set((
				loan_ledger::requested_status.eq(None::<RequestedStatus>),
				loan_ledger::updated_at.eq(diesel::dsl::now),
			))
			.get_result(conn)
			.map_err(Into::into)
	}

	/// Applies a verified resolution to the row
	pub fn apply_verification(&self, loan_no: &str, status: RequestedStatus) -> db::Result<LedgerEntry> {
		let flags = status.flag_update();
		let conn = &self.db.get()?;
		diesel::update(loan_ledger::table)
			.filter(loan_ledger::loan_no.eq(loan_no))
			.set((
				loan_ledger::is_settled.eq(flags.is_settled),
				loan_ledger::is_closed.eq(flags.is_closed),
				loan_ledger::is_write_off.eq(flags.is_write_off),
				loan_ledger::defaulted.eq(flags.defaulted),
				loan_ledger::is_verified.eq(true),
				loan_ledger::is_active.eq(false),
				loan_ledger::requested_status.eq(None::<RequestedStatus>),
				loan_ledger::updated_at.eq(diesel::dsl::now),
			))
			.get_result(conn)
			.map_err(Into::into)
	}

	/// Takes the row out of the active set when a disbursal is rejected
	pub fn deactivate(&self, loan_no: &str) -> db::Result<LedgerEntry> {
		let conn = &self.db.get()?;
		diesel::update(loan_ledger::table)
			.filter(loan_ledger::loan_no.eq(loan_no))
			.set((
				loan_ledger::is_active.eq(false),
				loan_ledger::is_closed.eq(true),
				loan_ledger::updated_at.eq(diesel::dsl::now),
			))
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn add_partial_payment(&self, new_payment: NewPartialPayment) -> db::Result<PartialPayment> {
		let conn = &self.db.get()?;
		diesel::insert_into(partial_payments::table)
			.values(&new_payment)
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn partial_payments(&self, ledger_id: &Id) -> db::Result<Vec<PartialPayment>> {
		let conn = &self.db.get()?;
		partial_payments::table
			.filter(partial_payments::ledger_id.eq(ledger_id))
			.order(partial_payments::paid_on.asc())
			.load(conn)
			.map_err(Into::into)
	}

	pub fn mark_partial_paid(&self, ledger_id: &Id, utr: &str) -> db::Result<PartialPayment> {
		let conn = &self.db.get()?;
		diesel::update(partial_payments::table)
			.filter(partial_payments::ledger_id.eq(ledger_id))
			.filter(partial_payments::utr.eq(utr))
			.set(partial_payments::is_partly_paid.eq(true))
			.get_result(conn)
			.map_err(Into::into)
	}

	/// The collection work queue: active, disbursed, unverified rows with
	/// any payment evidence on them
	pub fn list_to_verify(&self) -> db::Result<Vec<VerifyRow>> {
		let conn = &self.db.get()?;
		loan_ledger::table
			.inner_join(leads::table.on(leads::lead_no.eq(loan_ledger::lead_no)))
			.inner_join(cam_details::table.on(cam_details::lead_no.eq(loan_ledger::lead_no)))
			.inner_join(disbursals::table.on(disbursals::id.nullable().eq(loan_ledger::disbursal_id)))
			.inner_join(employees::table.on(employees::id.nullable().eq(disbursals::disbursed_by)))
			.filter(loan_ledger::is_active.eq(true))
			.filter(loan_ledger::is_disbursed.eq(true))
			.filter(loan_ledger::is_verified.eq(false))
			.filter(loan_ledger::is_closed.eq(false))
			.filter(
				loan_ledger::closing_date.is_not_null()
					.or(loan_ledger::closing_amount.is_not_null())
					.or(loan_ledger::utr.is_not_null())
					.or(loan_ledger::requested_status.is_not_null())
					.or(loan_ledger::dpd.is_not_null())
					.or(exists(
						partial_payments::table
							.filter(partial_payments::ledger_id.eq(loan_ledger::id))
							.filter(partial_payments::is_partly_paid.eq(false)),
					)),
			)
			.order(loan_ledger::updated_at.desc())
			.select((
				loan_ledger::lead_no,
				loan_ledger::loan_no,
				leads::f_name,
				leads::m_name,
				leads::l_name,
				leads::pan,
				leads::mobile,
				leads::aadhaar,
				leads::city,
				leads::state,
				leads::source,
				cam_details::loan_recommended,
				cam_details::actual_net_salary,
				employees::f_name,
				employees::l_name,
			))
			.load(conn)
			.map_err(Into::into)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn settled_resolution_flags() {
		let flags = RequestedStatus::Settled.flag_update();
		assert!(flags.is_settled);
		assert!(!flags.is_closed);
		assert!(!flags.defaulted);
	}

	#[test]
	fn write_off_marks_the_loan_defaulted() {
		let flags = RequestedStatus::WriteOff.flag_update();
		assert!(flags.is_write_off);
		assert!(flags.defaulted);
		assert!(!flags.is_settled);
	}

	#[test]
	fn status_strings_match_request_values() {
		assert_eq!(RequestedStatus::WriteOff.to_string(), "writeOff");
		assert_eq!("settled".parse::<RequestedStatus>().unwrap(), RequestedStatus::Settled);
		assert!("waived".parse::<RequestedStatus>().is_err());
	}

	fn entry(requested: Option<RequestedStatus>) -> LedgerEntry {
		LedgerEntry {
			id: uuid::Uuid::new_v4(),
			pan: "ABCPD1234E".into(),
			lead_no: "LD0000000001".into(),
			loan_no: "LN00000000001".into(),
			disbursal_id: None,
			is_active: true,
			is_disbursed: true,
			is_verified: false,
			is_closed: false,
			is_settled: false,
			is_write_off: false,
			defaulted: false,
			requested_status: requested,
			closing_date: None,
			closing_amount: None,
			utr: None,
			dpd: None,
			updated_at: chrono::Utc::now(),
		}
	}

	fn partial(utr: &str, requested: Option<RequestedStatus>, paid: bool) -> PartialPayment {
		PartialPayment {
			id: uuid::Uuid::new_v4(),
			ledger_id: uuid::Uuid::new_v4(),
			paid_on: chrono::NaiveDate::from_ymd(2024, 5, 2),
			amount: BigDecimal::from(5000),
			utr: utr.into(),
			requested_status: requested,
			is_partly_paid: paid,
			created_at: chrono::Utc::now(),
		}
	}

	#[test]
	fn matching_resolution_is_applied_to_the_loan() {
		let action = decide_verification(&entry(Some(RequestedStatus::Closed)), &[], None, RequestedStatus::Closed);
		assert_eq!(action, Ok(VerifyAction::ApplyResolution(RequestedStatus::Closed)));
	}

	#[test]
	fn mismatched_resolution_is_a_conflict() {
		let action = decide_verification(&entry(Some(RequestedStatus::Settled)), &[], None, RequestedStatus::Closed);
		assert!(action.is_err());
	}

	#[test]
	fn pending_part_payment_is_verified_by_utr() {
		let partials = vec![
			partial("UTR1", Some(RequestedStatus::Settled), true),
			partial("UTR2", Some(RequestedStatus::Settled), false),
		];
		let action = decide_verification(&entry(None), &partials, Some("UTR2"), RequestedStatus::Settled);
		assert_eq!(action, Ok(VerifyAction::MarkPartialPaid("UTR2".into())));
	}

	#[test]
	fn pending_part_payment_blocks_whole_loan_resolution() {
		let partials = vec![partial("UTR1", Some(RequestedStatus::Settled), false)];
		let action = decide_verification(&entry(Some(RequestedStatus::Closed)), &partials, None, RequestedStatus::Closed);
		assert!(action.is_err());
	}

	#[test]
	fn fully_verified_part_payments_fall_through_to_the_loan() {
		let partials = vec![partial("UTR1", Some(RequestedStatus::Settled), true)];
		let action = decide_verification(&entry(Some(RequestedStatus::WriteOff)), &partials, None, RequestedStatus::WriteOff);
		assert_eq!(action, Ok(VerifyAction::ApplyResolution(RequestedStatus::WriteOff)));
	}
}
