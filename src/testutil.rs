use bigdecimal::BigDecimal;
use diesel::prelude::*;

use crate::{applicant, application, bank_account, cam, db, disbursal, document, employee, kyc, lead, lead_log, lead_status, ledger, otp, sanction, sequence};
use crate::employee::{Employee, NewEmployee, Role};
use crate::lead::{Gender, Lead, NewLead, Source};
use crate::lead_status::{NewLeadStatus, Stage};
use crate::types::Date;

pub struct Fixture {
	pub pool: db::PgPool,
	pub employee_factory: EmployeeFactory,
}

impl Fixture {
	pub fn new() -> Self {
		let pool = db::pg_connection();
		let employee_factory = EmployeeFactory::new(pool.clone());
		Fixture { pool, employee_factory }
	}

	pub fn pool(&self) -> db::PgPool {
		self.pool.clone()
	}

	/// Inserts a lead with its document and status rows, the way the
	/// intake flow would
	pub fn insert_lead(&self, pan: &str, mobile: &str) -> Lead {
		let suite = Suite::with_pool(self.pool.clone());
		let document = suite.document_repo.find_or_create(pan).unwrap();
		let lead_no = suite.sequence_repo.next_lead_no().unwrap();
		let status = suite
			.status_repo
			.create(NewLeadStatus {
				lead_no: &lead_no,
				pan,
				stage: Stage::Lead,
				is_in_process: true,
			})
			.unwrap();

		suite
			.lead_repo
			.create(NewLead {
				lead_no,
				f_name: "Asha".into(),
				m_name: None,
				l_name: Some("Rao".into()),
				gender: Gender::Female,
				dob: Date::from_ymd(1994, 7, 12),
				aadhaar: "123412341234".into(),
				pan: pan.into(),
				mobile: mobile.into(),
				alternate_mobile: None,
				personal_email: "asha@example.com".into(),
				office_email: "asha@office.example.com".into(),
				loan_amount: BigDecimal::from(50000),
				salary: BigDecimal::from(42000),
				pin_code: "560001".into(),
				city: "Bengaluru".into(),
				state: "Karnataka".into(),
				source: Source::Website,
				document_id: document.id,
				status_id: status.id,
			})
			.unwrap()
	}

	pub fn teardown(&self) {
		let conn = self.pool.get().unwrap();
		let tables = vec![
			"partial_payments",
			"loan_ledger",
			"disbursals",
			"sanctions",
			"applicant_banks",
			"applicant_references",
			"applications",
			"cam_details",
			"lead_logs",
			"leads",
			"lead_statuses",
			"applicants",
			"documents",
			"mobile_otps",
			"pan_records",
			"aadhaar_records",
			"sequences",
			"employees",
		];
		for table in tables {
			diesel::sql_query(format!("DELETE FROM {}", table))
				.execute(&conn)
				.expect("deleting db table");
		}
	}
}

pub struct Suite {
	pub employee_repo: employee::Repo,
	pub sequence_repo: sequence::Repo,
	pub document_repo: document::Repo,
	pub lead_repo: lead::Repo,
	pub status_repo: lead_status::Repo,
	pub log_repo: lead_log::Repo,
	pub otp_repo: otp::Repo,
	pub applicant_repo: applicant::Repo,
	pub bank_repo: bank_account::Repo,
	pub cam_repo: cam::Repo,
	pub application_repo: application::Repo,
	pub sanction_repo: sanction::Repo,
	pub disbursal_repo: disbursal::Repo,
	pub ledger_repo: ledger::Repo,
	pub kyc_repo: kyc::Repo,
}

impl Suite {
	pub fn setup() -> Self {
		let fixture = Fixture::new();
		fixture.teardown();
		Suite::with_pool(fixture.pool.clone())
	}

	pub fn with_pool(pool: db::PgPool) -> Self {
		Suite {
			employee_repo: employee::Repo::new(pool.clone()),
			sequence_repo: sequence::Repo::new(pool.clone()),
			document_repo: document::Repo::new(pool.clone()),
			lead_repo: lead::Repo::new(pool.clone()),
			status_repo: lead_status::Repo::new(pool.clone()),
			log_repo: lead_log::Repo::new(pool.clone()),
			otp_repo: otp::Repo::new(pool.clone()),
			applicant_repo: applicant::Repo::new(pool.clone()),
			bank_repo: bank_account::Repo::new(pool.clone()),
			cam_repo: cam::Repo::new(pool.clone()),
			application_repo: application::Repo::new(pool.clone()),
			sanction_repo: sanction::Repo::new(pool.clone()),
			disbursal_repo: disbursal::Repo::new(pool.clone()),
			ledger_repo: ledger::Repo::new(pool.clone()),
			kyc_repo: kyc::Repo::new(pool),
		}
	}
}

pub struct EmployeeFactory {
	pool: db::PgPool,
}

impl EmployeeFactory {
	fn new(pool: db::PgPool) -> Self {
		EmployeeFactory { pool }
	}

	pub fn with_role(&self, role: Role, email: &str) -> Employee {
		let repo = employee::Repo::new(self.pool.clone());
		repo.create(NewEmployee {
			f_name: "Default",
			m_name: None,
			l_name: "Employee",
			email,
			role,
		})
		.unwrap()
	}

	pub fn screener(&self) -> Employee {
		self.with_role(Role::Screener, "screener@example.com")
	}

	pub fn credit_manager(&self) -> Employee {
		self.with_role(Role::CreditManager, "credit@example.com")
	}

	pub fn sanction_head(&self) -> Employee {
		self.with_role(Role::SanctionHead, "sanction@example.com")
	}

	pub fn disbursal_head(&self) -> Employee {
		self.with_role(Role::DisbursalHead, "disbursal@example.com")
	}
}
