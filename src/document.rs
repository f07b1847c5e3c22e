use diesel::prelude::*;

use crate::db;
use crate::schema::documents;
use crate::types::{Id, Time};

/// Anchor record for the document set collected against a PAN
///
/// A returning applicant keeps the same document set across leads.
#[derive(Queryable, Identifiable, PartialEq, Debug)]
pub struct Document {
	pub id: Id,
	pub pan: String,
	pub created_at: Time,
}

#[derive(Insertable)]
#[table_name = "documents"]
pub struct NewDocument<'a> {
	pub pan: &'a str,
}

pub struct Repo {
	db: db::PgPool,
}

impl Repo {
	pub fn new(db: db::PgPool) -> Self {
		Repo { db }
	}

	pub fn find_by_id(&self, id: &Id) -> db::Result<Document> {
		let conn = &self.db.get()?;
		documents::table
			.find(id)
			.first(conn)
			.map_err(Into::into)
	}

	pub fn find_by_pan(&self, pan: &str) -> db::Result<Document> {
		let conn = &self.db.get()?;
		documents::table
			.filter(documents::pan.eq(pan))
			.first(conn)
			.map_err(Into::into)
	}

	pub fn find_or_create(&self, pan: &str) -> db::Result<Document> {
		match self.find_by_pan(pan) {
			Ok(doc) => Ok(doc),
			Err(db::Error::RecordNotFound) => {
				let conn = &self.db.get()?;
				diesel::insert_into(documents::table)
					.values(&NewDocument { pan })
					.get_result(conn)
					.map_err(Into::into)
			}
			Err(e) => Err(e),
		}
	}
}

#[cfg(test)]
mod tests {
	use crate::testutil::*;

	use super::*;

	#[test]
	#[ignore = "needs a database"]
	fn returning_pan_reuses_its_document_set() {
		let fixture = Fixture::new();
		fixture.teardown();
		let repo = Repo::new(fixture.pool());

		let first = repo.find_or_create("ABCPD1234E").unwrap();
		let second = repo.find_or_create("ABCPD1234E").unwrap();
		assert_eq!(first.id, second.id);

		let other = repo.find_or_create("XYZPD9999A").unwrap();
		assert_ne!(first.id, other.id);
	}
}
