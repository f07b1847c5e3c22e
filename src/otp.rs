use diesel::prelude::*;

use crate::db;
use crate::schema::mobile_otps;
use crate::types::Time;

/// One-time password issued against a mobile number, upserted per number
#[derive(Queryable, PartialEq, Debug)]
pub struct MobileOtp {
	pub mobile: String,
	pub f_name: String,
	pub l_name: String,
	pub otp: String,
	pub created_at: Time,
}

#[derive(Insertable)]
#[table_name = "mobile_otps"]
pub struct NewMobileOtp<'a> {
	pub mobile: &'a str,
	pub f_name: &'a str,
	pub l_name: &'a str,
	pub otp: &'a str,
}

pub struct Repo {
	db: db::PgPool,
}

impl Repo {
	pub fn new(db: db::PgPool) -> Self {
		Repo { db }
	}

	/// Replaces any previous OTP issued for the number
	pub fn upsert(&self, new_otp: NewMobileOtp) -> db::Result<MobileOtp> {
		let conn = &self.db.get()?;
		diesel::insert_into(mobile_otps::table)
			.values(&new_otp)
			.on_conflict(mobile_otps::mobile)
			.do_update()
			.set((
				mobile_otps::f_name.eq(new_otp.f_name),
				mobile_otps::l_name.eq(new_otp.l_name),
				mobile_otps::otp.eq(new_otp.otp),
				mobile_otps::created_at.eq(diesel::dsl::now),
			))
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn find_by_mobile(&self, mobile: &str) -> db::Result<MobileOtp> {
		let conn = &self.db.get()?;
		mobile_otps::table
			.find(mobile)
			.first(conn)
			.map_err(Into::into)
	}
}
