use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

pub type Id = uuid::Uuid;
pub type Time = DateTime<Utc>;
pub type Date = NaiveDate;

/// Page request taken from the `page`/`limit` query parameters
#[derive(Debug, Clone, Copy)]
pub struct Page {
	pub page: i64,
	pub limit: i64,
}

impl Page {
	pub fn new(page: i64, limit: i64) -> Self {
		let page = if page < 1 { 1 } else { page };
		let limit = if limit < 1 { 10 } else { limit };
		Page { page, limit }
	}

	pub fn offset(&self) -> i64 {
		(self.page - 1) * self.limit
	}
}

impl Default for Page {
	fn default() -> Self {
		Page { page: 1, limit: 10 }
	}
}

/// Paged listing envelope: total count, page count and the rows themselves
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paged<T> {
	pub total: i64,
	pub total_pages: i64,
	pub current_page: i64,
	pub items: Vec<T>,
}

impl<T> Paged<T> {
	pub fn new(total: i64, page: Page, items: Vec<T>) -> Self {
		let total_pages = (total + page.limit - 1) / page.limit;
		Paged {
			total,
			total_pages,
			current_page: page.page,
			items,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn page_clamps_bad_input() {
		let page = Page::new(0, -5);
		assert_eq!(page.page, 1);
		assert_eq!(page.limit, 10);
		assert_eq!(page.offset(), 0);
	}

	#[test]
	fn paged_rounds_page_count_up() {
		let paged: Paged<u8> = Paged::new(21, Page::new(2, 10), vec![]);
		assert_eq!(paged.total_pages, 3);
		assert_eq!(paged.current_page, 2);
	}
}
