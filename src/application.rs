use diesel::prelude::*;
use serde::Serialize;

use crate::db;
use crate::schema::applications;
use crate::types::{Id, Page, Paged, Time};

/// Credit-appraisal stage record, one per recommended lead
#[derive(Queryable, Identifiable, PartialEq, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
	pub id: Id,
	pub lead_no: String,
	pub pan: String,
	pub lead_id: Id,
	pub applicant_id: Id,
	pub credit_manager_id: Option<Id>,
	pub on_hold: bool,
	pub is_recommended: bool,
	pub recommended_by: Option<Id>,
	pub is_rejected: bool,
	pub rejected_by: Option<Id>,
	pub created_at: Time,
	pub updated_at: Time,
}

impl Application {
	/// Everything still blocking a credit manager from forwarding this
	/// application to sanction
	pub fn recommend_blockers(&self, has_appraisal: bool, has_bank: bool) -> Vec<&'static str> {
		let mut blockers = Vec::new();
		if self.is_rejected {
			blockers.push("application is rejected");
		}
		if self.on_hold {
			blockers.push("application is on hold");
		}
		if self.is_recommended {
			blockers.push("application is already recommended");
		}
		if !has_appraisal {
			blockers.push("appraisal memo has no recommended amount");
		}
		if !has_bank {
			blockers.push("no verified bank account on file");
		}
		blockers
	}
}

#[derive(Insertable)]
#[table_name = "applications"]
pub struct NewApplication<'a> {
	pub lead_no: &'a str,
	pub pan: &'a str,
	pub lead_id: &'a Id,
	pub applicant_id: &'a Id,
}

pub struct Repo {
	db: db::PgPool,
}

impl Repo {
	pub fn new(db: db::PgPool) -> Self {
		Repo { db }
	}

	pub fn create(&self, new_application: NewApplication) -> db::Result<Application> {
		let conn = &self.db.get()?;
		diesel::insert_into(applications::table)
			.values(&new_application)
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn find_by_id(&self, id: &Id) -> db::Result<Application> {
		let conn = &self.db.get()?;
		applications::table
			.find(id)
			.first(conn)
			.map_err(Into::into)
	}

	pub fn find_by_lead(&self, lead_id: &Id) -> db::Result<Application> {
		let conn = &self.db.get()?;
		applications::table
			.filter(applications::lead_id.eq(lead_id))
			.first(conn)
			.map_err(Into::into)
	}

	/// Applications no credit manager has picked up yet
	pub fn list_unallocated(&self, page: Page) -> db::Result<Paged<Application>> {
		let conn = &self.db.get()?;
		let query = applications::table
			.filter(applications::credit_manager_id.is_null())
			.filter(applications::is_recommended.eq(false));

		let total = query.count().get_result(conn)?;
		let items = query
			.order(applications::updated_at.desc())
			.offset(page.offset())
			.limit(page.limit)
			.load(conn)?;
		Ok(Paged::new(total, page, items))
	}

	/// `credit_manager_id` of None lists across all managers (admin view)
	pub fn list_allocated(&self, credit_manager_id: Option<&Id>, page: Page) -> db::Result<Paged<Application>> {
		let conn = &self.db.get()?;

		let filtered = |credit_manager_id: Option<&Id>| {
			let mut query = applications::table
				.filter(applications::credit_manager_id.is_not_null())
				.filter(applications::on_hold.eq(false))
				.filter(applications::is_rejected.eq(false))
				.filter(applications::is_recommended.eq(false))
				.into_boxed();
			if let Some(id) = credit_manager_id {
				query = query.filter(applications::credit_manager_id.eq(*id));
			}
			query
		};

		let total = filtered(credit_manager_id).count().get_result(conn)?;
		let items = filtered(credit_manager_id)
			.order(applications::updated_at.desc())
			.offset(page.offset())
			.limit(page.limit)
			.load(conn)?;
		Ok(Paged::new(total, page, items))
	}

	pub fn list_rejected(&self, page: Page) -> db::Result<Paged<Application>> {
		let conn = &self.db.get()?;
		let query = applications::table.filter(applications::is_rejected.eq(true));

		let total = query.count().get_result(conn)?;
		let items = query
			.order(applications::updated_at.desc())
			.offset(page.offset())
			.limit(page.limit)
			.load(conn)?;
		Ok(Paged::new(total, page, items))
	}

	pub fn allocate(&self, id: &Id, credit_manager_id: &Id) -> db::Result<Application> {
		let conn = &self.db.get()?;
		diesel::update(applications::table)
			.filter(applications::id.eq(id))
			.set((
				applications::credit_manager_id.eq(credit_manager_id),
				applications::updated_at.eq(diesel::dsl::now),
			))
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn set_recommended(&self, id: &Id, recommended_by: &Id) -> db::Result<Application> {
		let conn = &self.db.get()?;
		diesel::update(applications::table)
			.filter(applications::id.eq(id))
			.set((
				applications::is_recommended.eq(true),
				applications::recommended_by.eq(recommended_by),
				applications::updated_at.eq(diesel::dsl::now),
			))
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn set_rejected(&self, id: &Id, rejected_by: &Id) -> db::Result<Application> {
		let conn = &self.db.get()?;
		diesel::update(applications::table)
			.filter(applications::id.eq(id))
			.set((
				applications::is_rejected.eq(true),
				applications::rejected_by.eq(rejected_by),
				applications::updated_at.eq(diesel::dsl::now),
			))
			.get_result(conn)
			.map_err(Into::into)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn application() -> Application {
		Application {
			id: uuid::Uuid::new_v4(),
			lead_no: "LD0000000001".into(),
			pan: "ABCPD1234E".into(),
			lead_id: uuid::Uuid::new_v4(),
			applicant_id: uuid::Uuid::new_v4(),
			credit_manager_id: Some(uuid::Uuid::new_v4()),
			on_hold: false,
			is_recommended: false,
			recommended_by: None,
			is_rejected: false,
			rejected_by: None,
			created_at: chrono::Utc::now(),
			updated_at: chrono::Utc::now(),
		}
	}

	#[test]
	fn appraised_application_has_no_blockers() {
		assert!(application().recommend_blockers(true, true).is_empty());
	}

	#[test]
	fn missing_appraisal_and_bank_block_recommendation() {
		let blockers = application().recommend_blockers(false, false);
		assert_eq!(blockers.len(), 2);
	}

	#[test]
	fn rejected_application_cannot_be_recommended() {
		let mut app = application();
		app.is_rejected = true;
		assert!(app.recommend_blockers(true, true).contains(&"application is rejected"));
	}
}
