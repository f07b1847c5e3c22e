use std::ops::{Div, Mul};

use bigdecimal::BigDecimal;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db;
use crate::schema::cam_details;
use crate::types::{Date, Id, Time};

/// Credit Appraisal Memo: the numbers a credit manager works out for a lead
#[derive(Queryable, Identifiable, PartialEq, Debug, Clone, Serialize)]
#[table_name = "cam_details"]
#[serde(rename_all = "camelCase")]
pub struct Cam {
	pub id: Id,
	pub lead_id: Id,
	pub lead_no: String,
	pub cibil_score: Option<i16>,
	pub loan_applied: BigDecimal,
	pub actual_net_salary: Option<BigDecimal>,
	pub loan_recommended: Option<BigDecimal>,
	pub roi: Option<BigDecimal>,
	pub tenure_days: Option<i16>,
	pub disbursal_date: Option<Date>,
	pub repayment_date: Option<Date>,
	pub repayment_amount: Option<BigDecimal>,
	pub net_disbursal_amount: Option<BigDecimal>,
	pub updated_at: Time,
}

/// Replacement schedule when the money goes out on a different day
/// than the memo planned for
#[derive(Debug, PartialEq)]
pub struct Reschedule {
	pub disbursal_date: Date,
	pub tenure_days: i16,
	pub repayment_amount: BigDecimal,
}

impl Cam {
	/// Recomputes tenure and the simple-interest repayment amount when the
	/// actual disbursal date differs from the planned one
	///
	/// Interest accrues per day on the recommended principal:
	/// repayment = principal + principal * tenure * roi / 100
	pub fn reschedule(&self, actual_disbursal: Date) -> Option<Reschedule> {
		let planned = self.disbursal_date?;
		if planned == actual_disbursal {
			return None;
		}
		let repayment_date = self.repayment_date?;
		let principal = self.loan_recommended.as_ref()?;
		let roi = self.roi.as_ref()?;

		let tenure_days = (repayment_date - actual_disbursal).num_days();
		if tenure_days <= 0 {
			return None;
		}

		let interest = principal
			.mul(&BigDecimal::from(tenure_days))
			.mul(roi)
			.div(&BigDecimal::from(100));

		Some(Reschedule {
			disbursal_date: actual_disbursal,
			tenure_days: tenure_days as i16,
			repayment_amount: principal + interest,
		})
	}
}

#[derive(Insertable)]
#[table_name = "cam_details"]
pub struct NewCam<'a> {
	pub lead_id: &'a Id,
	pub lead_no: &'a str,
	pub cibil_score: Option<i16>,
	pub loan_applied: &'a BigDecimal,
}

/// Appraisal fields a credit manager fills in before recommendation
#[derive(AsChangeset, Default, Deserialize)]
#[table_name = "cam_details"]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateCam {
	pub actual_net_salary: Option<BigDecimal>,
	pub loan_recommended: Option<BigDecimal>,
	pub roi: Option<BigDecimal>,
	pub tenure_days: Option<i16>,
	pub disbursal_date: Option<Date>,
	pub repayment_date: Option<Date>,
	pub repayment_amount: Option<BigDecimal>,
	pub net_disbursal_amount: Option<BigDecimal>,
}

pub struct Repo {
	db: db::PgPool,
}

impl Repo {
	pub fn new(db: db::PgPool) -> Self {
		Repo { db }
	}

	/// Seeds the memo from the lead when a screener recommends it;
	/// a memo that already exists is left untouched
	pub fn seed(&self, new_cam: NewCam) -> db::Result<Cam> {
		match self.find_by_lead(new_cam.lead_id) {
			Ok(cam) => Ok(cam),
			Err(db::Error::RecordNotFound) => {
				let conn = &self.db.get()?;
				diesel::insert_into(cam_details::table)
					.values(&new_cam)
					.get_result(conn)
					.map_err(Into::into)
			}
			Err(e) => Err(e),
		}
	}

	pub fn find_by_lead(&self, lead_id: &Id) -> db::Result<Cam> {
		let conn = &self.db.get()?;
		cam_details::table
			.filter(cam_details::lead_id.eq(lead_id))
			.first(conn)
			.map_err(Into::into)
	}

	pub fn update(&self, id: &Id, changes: UpdateCam) -> db::Result<Cam> {
		let conn = &self.db.get()?;
		diesel::update(cam_details::table)
			.filter(cam_details::id.eq(id))
			.set((changes, cam_details::updated_at.eq(diesel::dsl::now)))
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn apply_reschedule(&self, id: &Id, reschedule: &Reschedule) -> db::Result<Cam> {
		let conn = &self.db.get()?;
		diesel::update(cam_details::table)
			.filter(cam_details::id.eq(id))
			.set((
				cam_details::disbursal_date.eq(reschedule.disbursal_date),
				cam_details::tenure_days.eq(reschedule.tenure_days),
				cam_details::repayment_amount.eq(&reschedule.repayment_amount),
				cam_details::updated_at.eq(diesel::dsl::now),
			))
			.get_result(conn)
			.map_err(Into::into)
	}
}

#[cfg(test)]
mod tests {
	use chrono::NaiveDate;

	use super::*;

	fn cam_with_schedule() -> Cam {
		Cam {
			id: uuid::Uuid::new_v4(),
			lead_id: uuid::Uuid::new_v4(),
			lead_no: "LD0000000001".into(),
			cibil_score: Some(740),
			loan_applied: BigDecimal::from(50000),
			actual_net_salary: Some(BigDecimal::from(42000)),
			loan_recommended: Some(BigDecimal::from(40000)),
			roi: Some(BigDecimal::from(1)),
			tenure_days: Some(30),
			disbursal_date: Some(NaiveDate::from_ymd(2024, 3, 1)),
			repayment_date: Some(NaiveDate::from_ymd(2024, 3, 31)),
			repayment_amount: Some(BigDecimal::from(52000)),
			net_disbursal_amount: Some(BigDecimal::from(38000)),
			updated_at: chrono::Utc::now(),
		}
	}

	#[test]
	fn reschedule_recomputes_tenure_and_dues() {
		let cam = cam_with_schedule();
		let moved = cam.reschedule(NaiveDate::from_ymd(2024, 3, 11)).unwrap();

		assert_eq!(moved.tenure_days, 20);
		// 40000 + 40000 * 20 * 1 / 100
		assert_eq!(moved.repayment_amount, BigDecimal::from(48000));
	}

	#[test]
	fn unchanged_date_needs_no_reschedule() {
		let cam = cam_with_schedule();
		assert_eq!(cam.reschedule(NaiveDate::from_ymd(2024, 3, 1)), None);
	}

	#[test]
	fn reschedule_past_repayment_date_is_rejected() {
		let cam = cam_with_schedule();
		assert_eq!(cam.reschedule(NaiveDate::from_ymd(2024, 4, 15)), None);
	}

	#[test]
	fn reschedule_requires_an_appraised_memo() {
		let mut cam = cam_with_schedule();
		cam.loan_recommended = None;
		assert_eq!(cam.reschedule(NaiveDate::from_ymd(2024, 3, 11)), None);
	}
}
