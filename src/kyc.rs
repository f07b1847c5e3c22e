use diesel::prelude::*;
use serde::Serialize;

use crate::db;
use crate::schema::{aadhaar_records, pan_records};
use crate::types::{Date, Time};

/// Snapshot of a PAN verification payload, keyed by the PAN itself
#[derive(Queryable, PartialEq, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanRecord {
	pub pan: String,
	pub full_name: String,
	pub gender: String,
	pub dob: Date,
	pub verified_at: Time,
}

#[derive(Insertable)]
#[table_name = "pan_records"]
pub struct NewPanRecord<'a> {
	pub pan: &'a str,
	pub full_name: &'a str,
	pub gender: &'a str,
	pub dob: Date,
}

/// Snapshot of a verified Aadhaar, stored masked
#[derive(Queryable, PartialEq, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AadhaarRecord {
	pub unique_id: String,
	pub name: String,
	pub last_digits: String,
	pub verified_at: Time,
}

#[derive(Insertable)]
#[table_name = "aadhaar_records"]
pub struct NewAadhaarRecord<'a> {
	pub unique_id: &'a str,
	pub name: &'a str,
	pub last_digits: &'a str,
}

/// PAN format: five letters, four digits, one letter
pub fn valid_pan(pan: &str) -> bool {
	let bytes = pan.as_bytes();
	if bytes.len() != 10 {
		return false;
	}
	bytes[..5].iter().all(|b| b.is_ascii_uppercase())
		&& bytes[5..9].iter().all(|b| b.is_ascii_digit())
		&& bytes[9].is_ascii_uppercase()
}

/// Aadhaar numbers are exactly twelve digits
pub fn valid_aadhaar(aadhaar: &str) -> bool {
	aadhaar.len() == 12 && aadhaar.bytes().all(|b| b.is_ascii_digit())
}

/// Storage key for a verified Aadhaar: first name + last four digits
pub fn aadhaar_unique_id(name: &str, aadhaar: &str) -> String {
	let first = name.split_whitespace().next().unwrap_or_default().to_lowercase();
	let last4 = &aadhaar[aadhaar.len().saturating_sub(4)..];
	format!("{}{}", first, last4)
}

/// Case- and spacing-insensitive comparison of provider and intake names
pub fn names_match(left: &str, right: &str) -> bool {
	let squash = |s: &str| {
		s.split_whitespace()
			.map(|w| w.to_lowercase())
			.collect::<Vec<_>>()
			.join(" ")
	};
	squash(left) == squash(right)
}

pub struct Repo {
	db: db::PgPool,
}

impl Repo {
	pub fn new(db: db::PgPool) -> Self {
		Repo { db }
	}

	pub fn upsert_pan(&self, record: NewPanRecord) -> db::Result<PanRecord> {
		let conn = &self.db.get()?;
		diesel::insert_into(pan_records::table)
			.values(&record)
			.on_conflict(pan_records::pan)
			.do_update()
			.set((
				pan_records::full_name.eq(record.full_name),
				pan_records::gender.eq(record.gender),
				pan_records::dob.eq(record.dob),
				pan_records::verified_at.eq(diesel::dsl::now),
			))
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn find_pan(&self, pan: &str) -> db::Result<PanRecord> {
		let conn = &self.db.get()?;
		pan_records::table
			.find(pan)
			.first(conn)
			.map_err(Into::into)
	}

	pub fn upsert_aadhaar(&self, record: NewAadhaarRecord) -> db::Result<AadhaarRecord> {
		let conn = &self.db.get()?;
		diesel::insert_into(aadhaar_records::table)
			.values(&record)
			.on_conflict(aadhaar_records::unique_id)
			.do_update()
			.set((
				aadhaar_records::name.eq(record.name),
				aadhaar_records::last_digits.eq(record.last_digits),
				aadhaar_records::verified_at.eq(diesel::dsl::now),
			))
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn find_aadhaar(&self, unique_id: &str) -> db::Result<AadhaarRecord> {
		let conn = &self.db.get()?;
		aadhaar_records::table
			.find(unique_id)
			.first(conn)
			.map_err(Into::into)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn pan_format() {
		assert!(valid_pan("ABCPD1234E"));
		assert!(!valid_pan("ABCPD1234"));
		assert!(!valid_pan("abcpd1234e"));
		assert!(!valid_pan("ABCPD12345"));
		assert!(!valid_pan("1BCPD1234E"));
	}

	#[test]
	fn aadhaar_format() {
		assert!(valid_aadhaar("123412341234"));
		assert!(!valid_aadhaar("12341234123"));
		assert!(!valid_aadhaar("12341234123a"));
	}

	#[test]
	fn aadhaar_key_is_first_name_plus_last_digits() {
		assert_eq!(aadhaar_unique_id("Asha Rao", "123412341234"), "asha1234");
		assert_eq!(aadhaar_unique_id("ASHA", "999988887777"), "asha7777");
	}

	#[test]
	fn name_matching_ignores_case_and_spacing() {
		assert!(names_match("Asha  Rao", "asha rao"));
		assert!(names_match("ASHA RAO", "Asha Rao"));
		assert!(!names_match("Asha Rao", "Asha R"));
	}
}
