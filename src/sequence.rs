use diesel::prelude::*;

use crate::db;
use crate::schema::sequences;

pub const LEAD_PREFIX: &str = "LD";
pub const LEAD_WIDTH: usize = 10;
pub const LOAN_PREFIX: &str = "LN";
pub const LOAN_WIDTH: usize = 11;

/// Formats a counter value as a human-readable record number
pub fn format_number(prefix: &str, width: usize, value: i64) -> String {
	format!("{}{:0width$}", prefix, value, width = width)
}

/// Atomic counter behind `lead_no`/`loan_no` generation
///
/// A single UPDATE .. RETURNING per call, so concurrent callers always
/// observe distinct, strictly increasing values.
pub struct Repo {
	db: db::PgPool,
}

impl Repo {
	pub fn new(db: db::PgPool) -> Self {
		Repo { db }
	}

	pub fn next(&self, name: &str, prefix: &str, width: usize) -> db::Result<String> {
		let value = self.increment(name)?;
		Ok(format_number(prefix, width, value))
	}

	pub fn next_lead_no(&self) -> db::Result<String> {
		self.next("leadNo", LEAD_PREFIX, LEAD_WIDTH)
	}

	pub fn next_loan_no(&self) -> db::Result<String> {
		self.next("loanNo", LOAN_PREFIX, LOAN_WIDTH)
	}

	fn increment(&self, sequence_name: &str) -> db::Result<i64> {
		let conn = &self.db.get()?;
		diesel::insert_into(sequences::table)
			.values((sequences::name.eq(sequence_name), sequences::value.eq(1i64)))
			.on_conflict(sequences::name)
			.do_update()
			.set(sequences::value.eq(sequences::value + 1))
			.returning(sequences::value)
			.get_result(conn)
			.map_err(Into::into)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn formats_zero_padded_numbers() {
		assert_eq!(format_number(LEAD_PREFIX, LEAD_WIDTH, 1), "LD0000000001");
		assert_eq!(format_number(LOAN_PREFIX, LOAN_WIDTH, 420), "LN00000000420");
	}

	#[test]
	fn wide_values_are_not_truncated() {
		assert_eq!(format_number("LD", 3, 123456), "LD123456");
	}

	#[test]
	#[ignore = "needs a database"]
	fn values_strictly_increase() {
		use crate::testutil::*;

		let fixture = Fixture::new();
		fixture.teardown();
		let repo = Repo::new(fixture.pool());

		let first = repo.next("leadNo", LEAD_PREFIX, LEAD_WIDTH).unwrap();
		let second = repo.next("leadNo", LEAD_PREFIX, LEAD_WIDTH).unwrap();
		assert!(second > first);
		assert_eq!(first, format_number(LEAD_PREFIX, LEAD_WIDTH, 1));
	}
}
