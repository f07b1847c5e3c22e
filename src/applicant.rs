use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db;
use crate::lead::Gender;
use crate::schema::{applicant_references, applicants};
use crate::types::{Date, Id, Time};

/// Applicant profile carried from the lead once a screener recommends it
///
/// Keyed by (pan, aadhaar) so a returning borrower reuses one profile.
#[derive(Queryable, Identifiable, PartialEq, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Applicant {
	pub id: Id,
	pub pan: String,
	pub aadhaar: String,
	pub f_name: String,
	pub m_name: Option<String>,
	pub l_name: Option<String>,
	pub gender: Gender,
	pub dob: Date,
	pub mobile: String,
	pub alternate_mobile: Option<String>,
	pub personal_email: String,
	pub office_email: String,
	pub screened_by: String,
	pub residence_address: Option<String>,
	pub residence_city: Option<String>,
	pub residence_state: Option<String>,
	pub employer_name: Option<String>,
	pub designation: Option<String>,
	pub office_address: Option<String>,
	pub created_at: Time,
	pub updated_at: Time,
}

#[derive(Insertable)]
#[table_name = "applicants"]
pub struct NewApplicant {
	pub pan: String,
	pub aadhaar: String,
	pub f_name: String,
	pub m_name: Option<String>,
	pub l_name: Option<String>,
	pub gender: Gender,
	pub dob: Date,
	pub mobile: String,
	pub alternate_mobile: Option<String>,
	pub personal_email: String,
	pub office_email: String,
	pub screened_by: String,
}

/// Residence/employment details a credit manager fills in later
#[derive(AsChangeset, Default, Deserialize)]
#[table_name = "applicants"]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateApplicant {
	pub residence_address: Option<String>,
	pub residence_city: Option<String>,
	pub residence_state: Option<String>,
	pub employer_name: Option<String>,
	pub designation: Option<String>,
	pub office_address: Option<String>,
}

/// Personal reference given by the applicant
#[derive(Queryable, Identifiable, PartialEq, Debug, Serialize)]
#[table_name = "applicant_references"]
#[serde(rename_all = "camelCase")]
pub struct Reference {
	pub id: Id,
	pub applicant_id: Id,
	pub name: String,
	pub mobile: String,
	pub relation: String,
}

#[derive(Insertable)]
#[table_name = "applicant_references"]
pub struct NewReference<'a> {
	pub applicant_id: &'a Id,
	pub name: &'a str,
	pub mobile: &'a str,
	pub relation: &'a str,
}

pub struct Repo {
	db: db::PgPool,
}

impl Repo {
	pub fn new(db: db::PgPool) -> Self {
		Repo { db }
	}

	pub fn find_by_id(&self, id: &Id) -> db::Result<Applicant> {
		let conn = &self.db.get()?;
		applicants::table
			.find(id)
			.first(conn)
			.map_err(Into::into)
	}

	/// Creates the profile, or refreshes the personal details of an
	/// existing one matched on (pan, aadhaar)
	pub fn upsert(&self, new_applicant: NewApplicant) -> db::Result<Applicant> {
		let conn = &self.db.get()?;
		let existing: Option<Applicant> = applicants::table
			.filter(applicants::pan.eq(&new_applicant.pan))
			.filter(applicants::aadhaar.eq(&new_applicant.aadhaar))
			.first(conn)
			.optional()?;

		match existing {
			Some(applicant) => diesel::update(applicants::table)
				.filter(applicants::id.eq(applicant.id))
				.set((
					applicants::f_name.eq(&new_applicant.f_name),
					applicants::m_name.eq(&new_applicant.m_name),
					applicants::l_name.eq(&new_applicant.l_name),
					applicants::mobile.eq(&new_applicant.mobile),
					applicants::alternate_mobile.eq(&new_applicant.alternate_mobile),
					applicants::personal_email.eq(&new_applicant.personal_email),
					applicants::office_email.eq(&new_applicant.office_email),
					applicants::screened_by.eq(&new_applicant.screened_by),
					applicants::updated_at.eq(diesel::dsl::now),
				))
				.get_result(conn)
				.map_err(Into::into),
			None => diesel::insert_into(applicants::table)
				.values(&new_applicant)
				.get_result(conn)
				.map_err(Into::into),
		}
	}

	pub fn update(&self, id: &Id, changes: UpdateApplicant) -> db::Result<Applicant> {
		let conn = &self.db.get()?;
		diesel::update(applicants::table)
			.filter(applicants::id.eq(id))
			.set((changes, applicants::updated_at.eq(diesel::dsl::now)))
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn replace_references(&self, applicant_id: &Id, references: &[(String, String, String)]) -> db::Result<Vec<Reference>> {
		let conn = &self.db.get()?;
		diesel::delete(applicant_references::table)
			.filter(applicant_references::applicant_id.eq(applicant_id))
			.execute(conn)?;

		let rows: Vec<NewReference> = references
			.iter()
			.map(|(name, mobile, relation)| NewReference {
				applicant_id,
				name,
				mobile,
				relation,
			})
			.collect();

		diesel::insert_into(applicant_references::table)
			.values(&rows)
			.get_results(conn)
			.map_err(Into::into)
	}

	pub fn references(&self, applicant_id: &Id) -> db::Result<Vec<Reference>> {
		let conn = &self.db.get()?;
		applicant_references::table
			.filter(applicant_references::applicant_id.eq(applicant_id))
			.load(conn)
			.map_err(Into::into)
	}
}
