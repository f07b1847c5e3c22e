use bigdecimal::BigDecimal;
use diesel::prelude::*;

use origination_api::*;
use origination_api::{applicant, application, bank_account, cam, db, disbursal, document, employee, kyc, lead, lead_log, lead_status, ledger, otp, sanction, sequence};
use origination_api::employee::NewEmployee;
use origination_api::origination::{BankDetails, LeadIntake, NewService, Service};
use origination_api::providers::{BankVerifier, Calendar, CreditBureau, EsignProvider, MailGateway, OtpGateway, ProviderResult, SanctionLetter, ScoreInquiry};

pub struct Fixture {
	pub pool: PgPool,
	pub employee_factory: EmployeeFactory,
}

impl Fixture {
	pub fn new() -> Self {
		let pool = db::pg_connection();
		let employee_factory = EmployeeFactory::new(pool.clone());
		Fixture { pool, employee_factory }
	}

	pub fn pool(&self) -> PgPool {
		self.pool.clone()
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
	pub fn setup(fixture: &Fixture) -> Self {
		fixture.teardown();
		let pool = fixture.pool();
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

	pub fn service<'a>(&'a self, fixture: &Fixture, providers: &'a TestProviders) -> Service<'a> {
		Service::new(NewService {
			db: fixture.pool(),
			employee_repo: &self.employee_repo,
			sequence_repo: &self.sequence_repo,
			document_repo: &self.document_repo,
			lead_repo: &self.lead_repo,
			status_repo: &self.status_repo,
			log_repo: &self.log_repo,
			otp_repo: &self.otp_repo,
			applicant_repo: &self.applicant_repo,
			bank_repo: &self.bank_repo,
			cam_repo: &self.cam_repo,
			application_repo: &self.application_repo,
			sanction_repo: &self.sanction_repo,
			disbursal_repo: &self.disbursal_repo,
			ledger_repo: &self.ledger_repo,
			kyc_repo: &self.kyc_repo,
			calendar: &providers.calendar,
			bureau: &providers.bureau,
			bank_verifier: &providers.bank_verifier,
			esign: &providers.esign,
			mail: &providers.mail,
			otp_gateway: &providers.otp_gateway,
		})
	}
}

pub struct EmployeeFactory {
	pool: PgPool,
}

impl EmployeeFactory {
	fn new(pool: PgPool) -> Self {
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

	pub fn second_screener(&self) -> Employee {
		self.with_role(Role::Screener, "screener2@example.com")
	}

	pub fn credit_manager(&self) -> Employee {
		self.with_role(Role::CreditManager, "credit@example.com")
	}

	pub fn sanction_head(&self) -> Employee {
		self.with_role(Role::SanctionHead, "sanction@example.com")
	}

	pub fn disbursal_manager(&self) -> Employee {
		self.with_role(Role::DisbursalManager, "disbursal-manager@example.com")
	}

	pub fn disbursal_head(&self) -> Employee {
		self.with_role(Role::DisbursalHead, "disbursal-head@example.com")
	}

	pub fn account_executive(&self) -> Employee {
		self.with_role(Role::AccountExecutive, "accounts@example.com")
	}

	pub fn collection_executive(&self) -> Employee {
		self.with_role(Role::CollectionExecutive, "collections@example.com")
	}
}

// ---- provider test doubles ----

pub struct FixedCalendar(pub Date);

impl Calendar for FixedCalendar {
	fn current_date(&self) -> Date {
		self.0
	}
}

pub struct StubBureau(pub i16);

impl CreditBureau for StubBureau {
	fn fetch_score(&self, _inquiry: &ScoreInquiry) -> ProviderResult<i16> {
		Ok(self.0)
	}
}

pub struct AcceptingBank;

impl BankVerifier for AcceptingBank {
	fn verify_account(&self, _account_no: &str, _ifsc_code: &str) -> ProviderResult<()> {
		Ok(())
	}
}

pub struct StubEsign;

impl EsignProvider for StubEsign {
	fn send_for_signature(&self, _letter: &SanctionLetter, _aadhaar: &str) -> ProviderResult<String> {
		Ok("https://esign.test/request/1".into())
	}
}

pub struct NullMail;

impl MailGateway for NullMail {
	fn send(&self, _to: &str, _subject: &str, _body: &str) -> ProviderResult<()> {
		Ok(())
	}
}

pub struct NullOtpGateway;

impl OtpGateway for NullOtpGateway {
	fn send_otp(&self, _mobile: &str, _name: &str, _otp: &str) -> ProviderResult<()> {
		Ok(())
	}
}

pub struct TestProviders {
	pub calendar: FixedCalendar,
	pub bureau: StubBureau,
	pub bank_verifier: AcceptingBank,
	pub esign: StubEsign,
	pub mail: NullMail,
	pub otp_gateway: NullOtpGateway,
}

impl TestProviders {
	pub fn new() -> Self {
		TestProviders {
			calendar: FixedCalendar(Date::from_ymd(2024, 3, 1)),
			bureau: StubBureau(741),
			bank_verifier: AcceptingBank,
			esign: StubEsign,
			mail: NullMail,
			otp_gateway: NullOtpGateway,
		}
	}
}

pub fn intake(pan: &str, mobile: &str) -> LeadIntake {
	LeadIntake {
		f_name: "Asha".into(),
		m_name: None,
		l_name: Some("Rao".into()),
		gender: "FEMALE".into(),
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
		source: lead::Source::Website,
	}
}

pub fn bank_details(account_no: &str) -> BankDetails {
	BankDetails {
		beneficiary_name: "Asha Rao".into(),
		bank_acc_no: account_no.into(),
		account_type: "savings".into(),
		ifsc_code: "HDFC0000123".into(),
		bank_name: "HDFC Bank".into(),
		branch_name: "MG Road".into(),
	}
}

/// Walks a fresh lead all the way to an approved sanction
pub fn originate_to_sanction(
	svc: &Service,
	suite: &Suite,
	pan: &str,
	mobile: &str,
	account_no: &str,
	screener: &Employee,
	credit_manager: &Employee,
	sanction_head: &Employee,
) -> sanction::Sanction {
	use origination_api::cam::UpdateCam;

	let screener_actor = Actor::new(screener.clone(), Role::Screener);
	let cm_actor = Actor::new(credit_manager.clone(), Role::CreditManager);
	let sh_actor = Actor::new(sanction_head.clone(), Role::SanctionHead);

	let lead = svc.create_lead(intake(pan, mobile)).unwrap();
	svc.allocate_lead(&screener_actor, &lead.id).unwrap();
	svc.verify_email(&screener_actor, &lead.id).unwrap();

	svc.send_mobile_otp(mobile, "Asha", "Rao").unwrap();
	let otp = suite.otp_repo.find_by_mobile(mobile).unwrap().otp;
	svc.verify_lead_mobile(&screener_actor, &lead.id, &otp).unwrap();

	svc.fetch_cibil(&screener_actor, &lead.id).unwrap();

	let application = svc.recommend_lead(&screener_actor, &lead.id).unwrap();
	svc.allocate_application(&cm_actor, &application.id, None).unwrap();

	svc.update_cam(&cm_actor, &application.id, UpdateCam {
		actual_net_salary: Some(BigDecimal::from(42000)),
		loan_recommended: Some(BigDecimal::from(40000)),
		roi: Some(BigDecimal::from(1)),
		tenure_days: Some(30),
		disbursal_date: Some(Date::from_ymd(2024, 3, 1)),
		repayment_date: Some(Date::from_ymd(2024, 3, 31)),
		repayment_amount: Some(BigDecimal::from(52000)),
		net_disbursal_amount: Some(BigDecimal::from(38000)),
	}).unwrap();
	svc.add_bank_account(&cm_actor, &application.id, bank_details(account_no)).unwrap();

	let sanction = svc.recommend_application(&cm_actor, &application.id).unwrap();
	svc.approve_sanction(&sh_actor, &sanction.id).unwrap();

	suite.sanction_repo.find_by_id(&sanction.id).unwrap()
}

/// Continues an approved sanction through e-sign into a paid-out disbursal
pub fn disburse(
	svc: &Service,
	suite: &Suite,
	sanction: &sanction::Sanction,
	sanction_head: &Employee,
	disbursal_manager: &Employee,
	disbursal_head: &Employee,
) -> disbursal::Disbursal {
	let sh_actor = Actor::new(sanction_head.clone(), Role::SanctionHead);
	let dm_actor = Actor::new(disbursal_manager.clone(), Role::DisbursalManager);
	let dh_actor = Actor::new(disbursal_head.clone(), Role::DisbursalHead);

	let disbursal = svc.send_esign(&sh_actor, &sanction.id).unwrap();
	svc.complete_esign(&sanction.id).unwrap();

	svc.allocate_disbursal(&dm_actor, &disbursal.id).unwrap();
	svc.recommend_disbursal(&dm_actor, &disbursal.id, "documents in order").unwrap();

	let amount = BigDecimal::from(38000);
	svc.approve_disbursal(&dh_actor, &disbursal.id, disbursal::Payment {
		payable_account: "50100123456789",
		payment_mode: "NEFT",
		amount: &amount,
		channel: "bank",
		utr: "UTR0001",
		disbursed_at: Date::from_ymd(2024, 3, 1),
	}).unwrap();

	suite.disbursal_repo.find_by_id(&disbursal.id).unwrap()
}
