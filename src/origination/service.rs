use bigdecimal::BigDecimal;
use diesel::Connection;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{applicant, application, bank_account, cam, disbursal, document, employee, kyc, lead, lead_log, lead_status, ledger, otp, sanction, sequence};
use crate::applicant::{Applicant, NewApplicant, Reference, UpdateApplicant};
use crate::application::{Application, NewApplication};
use crate::bank_account::{BankAccount, NewBankAccount};
use crate::cam::{Cam, NewCam, UpdateCam};
use crate::db;
use crate::disbursal::{Disbursal, NewDisbursal, Payment};
use crate::employee::{Actor, Role};
use crate::kyc::{NewAadhaarRecord, NewPanRecord, PanRecord};
use crate::lead::{Gender, Lead, NewLead, Source, UpdateLead};
use crate::lead_status::{LeadStatus, NewLeadStatus, Stage};
use crate::ledger::{decide_verification, Evidence, LedgerEntry, NewPartialPayment, RequestedStatus, VerifyAction, VerifyRow};
use crate::otp::NewMobileOtp;
use crate::providers::{BankVerifier, Calendar, CreditBureau, EsignProvider, MailGateway, OtpGateway, SanctionLetter, ScoreInquiry};
use crate::sanction::{NewSanction, Sanction, SanctionedRow};
use crate::types::{Date, Id, Page, Paged};

use super::error::{Error, ErrorKind};

pub type Result<T> = std::result::Result<T, Error>;

/// The workflow service moving loan records between stages
///
/// Every transition is gated on the actor's active role and, where a record
/// has been allocated, on ownership. Cross-record flags (lead status shadow,
/// loan ledger) are written alongside each transition.
pub struct Service<'a> {
	db: db::PgPool,
	employee_repo: &'a employee::Repo,
	sequence_repo: &'a sequence::Repo,
	document_repo: &'a document::Repo,
	lead_repo: &'a lead::Repo,
	status_repo: &'a lead_status::Repo,
	log_repo: &'a lead_log::Repo,
	otp_repo: &'a otp::Repo,
	applicant_repo: &'a applicant::Repo,
	bank_repo: &'a bank_account::Repo,
	cam_repo: &'a cam::Repo,
	application_repo: &'a application::Repo,
	sanction_repo: &'a sanction::Repo,
	disbursal_repo: &'a disbursal::Repo,
	ledger_repo: &'a ledger::Repo,
	kyc_repo: &'a kyc::Repo,
	calendar: &'a dyn Calendar,
	bureau: &'a dyn CreditBureau,
	bank_verifier: &'a dyn BankVerifier,
	esign: &'a dyn EsignProvider,
	mail: &'a dyn MailGateway,
	otp_gateway: &'a dyn OtpGateway,
}

/// Parameter object for creating a new Service
pub struct NewService<'a> {
	pub db: db::PgPool,
	pub employee_repo: &'a employee::Repo,
	pub sequence_repo: &'a sequence::Repo,
	pub document_repo: &'a document::Repo,
	pub lead_repo: &'a lead::Repo,
	pub status_repo: &'a lead_status::Repo,
	pub log_repo: &'a lead_log::Repo,
	pub otp_repo: &'a otp::Repo,
	pub applicant_repo: &'a applicant::Repo,
	pub bank_repo: &'a bank_account::Repo,
	pub cam_repo: &'a cam::Repo,
	pub application_repo: &'a application::Repo,
	pub sanction_repo: &'a sanction::Repo,
	pub disbursal_repo: &'a disbursal::Repo,
	pub ledger_repo: &'a ledger::Repo,
	pub kyc_repo: &'a kyc::Repo,
	pub calendar: &'a dyn Calendar,
	pub bureau: &'a dyn CreditBureau,
	pub bank_verifier: &'a dyn BankVerifier,
	pub esign: &'a dyn EsignProvider,
	pub mail: &'a dyn MailGateway,
	pub otp_gateway: &'a dyn OtpGateway,
}

/// Raw intake form submitted by the applicant
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadIntake {
	pub f_name: String,
	pub m_name: Option<String>,
	pub l_name: Option<String>,
	pub gender: String,
	pub dob: Date,
	pub aadhaar: String,
	pub pan: String,
	pub mobile: String,
	pub alternate_mobile: Option<String>,
	pub personal_email: String,
	pub office_email: String,
	pub loan_amount: BigDecimal,
	pub salary: BigDecimal,
	pub pin_code: String,
	pub city: String,
	pub state: String,
	pub source: Source,
}

/// Bank account details submitted for verification
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankDetails {
	pub beneficiary_name: String,
	pub bank_acc_no: String,
	pub account_type: String,
	pub ifsc_code: String,
	pub bank_name: String,
	pub branch_name: String,
}

/// The four rejection queues, one per stage
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedRecords {
	pub leads: Paged<Lead>,
	pub applications: Paged<Application>,
	pub sanctions: Paged<Sanction>,
	pub disbursals: Paged<Disbursal>,
}

impl<'a> Service<'a> {
	pub fn new(n: NewService<'a>) -> Self {
		Service {
			db: n.db,
			employee_repo: n.employee_repo,
			sequence_repo: n.sequence_repo,
			document_repo: n.document_repo,
			lead_repo: n.lead_repo,
			status_repo: n.status_repo,
			log_repo: n.log_repo,
			otp_repo: n.otp_repo,
			applicant_repo: n.applicant_repo,
			bank_repo: n.bank_repo,
			cam_repo: n.cam_repo,
			application_repo: n.application_repo,
			sanction_repo: n.sanction_repo,
			disbursal_repo: n.disbursal_repo,
			ledger_repo: n.ledger_repo,
			kyc_repo: n.kyc_repo,
			calendar: n.calendar,
			bureau: n.bureau,
			bank_verifier: n.bank_verifier,
			esign: n.esign,
			mail: n.mail,
			otp_gateway: n.otp_gateway,
		}
	}

	// ---- lead stage ----

	/// Registers a new lead from the intake form
	///
	/// Reuses the document set of a returning PAN, allocates the lead
	/// number and opens the status shadow record.
	pub fn create_lead(&self, intake: LeadIntake) -> Result<Lead> {
		let document = self.document_repo.find_or_create(&intake.pan)?;
		let lead_no = self.sequence_repo.next_lead_no()?;

		let status = self.status_repo.create(NewLeadStatus {
			lead_no: &lead_no,
			pan: &intake.pan,
			stage: Stage::Lead,
			is_in_process: true,
		})?;

		let (f_name, m_name, l_name) = lead::split_name(
			&intake.f_name,
			intake.m_name.as_deref(),
			intake.l_name.as_deref(),
		);

		let lead = self.lead_repo.create(NewLead {
			lead_no,
			f_name,
			m_name,
			l_name,
			gender: Gender::parse(&intake.gender),
			dob: intake.dob,
			aadhaar: intake.aadhaar,
			pan: intake.pan,
			mobile: intake.mobile,
			alternate_mobile: intake.alternate_mobile,
			personal_email: intake.personal_email,
			office_email: intake.office_email,
			loan_amount: intake.loan_amount,
			salary: intake.salary,
			pin_code: intake.pin_code,
			city: intake.city,
			state: intake.state,
			source: intake.source,
			document_id: document.id,
			status_id: status.id,
		})?;

		self.log_repo.post(&lead.id, "NEW LEAD", &lead.full_name(), "New lead created")?;
		Ok(lead)
	}

	pub fn get_lead(&self, id: &Id) -> Result<Lead> {
		self.lead_repo.find_by_id(id).map_err(Into::into)
	}

	pub fn lead_logs(&self, lead_id: &Id) -> Result<Vec<crate::lead_log::LeadLog>> {
		self.lead_repo.find_by_id(lead_id)?;
		self.log_repo.find_by_lead(lead_id).map_err(Into::into)
	}

	pub fn list_unallocated_leads(&self, page: Page) -> Result<Paged<Lead>> {
		self.lead_repo.list_unallocated(page).map_err(Into::into)
	}

	pub fn list_allocated_leads(&self, actor: &Actor, page: Page) -> Result<Paged<Lead>> {
		if actor.is_any(&[Role::Admin, Role::SanctionHead]) {
			self.lead_repo.list_allocated(None, page).map_err(Into::into)
		} else if actor.is(Role::Screener) {
			self.lead_repo.list_allocated(Some(&actor.employee.id), page).map_err(Into::into)
		} else {
			Err(Error::not_authorized("only screeners and admins can list allocated leads"))
		}
	}

	/// A screener takes ownership of a fresh lead
	pub fn allocate_lead(&self, actor: &Actor, lead_id: &Id) -> Result<Lead> {
		if !actor.is(Role::Screener) {
			return Err(Error::not_authorized("only a screener can pick up a lead"));
		}
		let lead = self.lead_repo.allocate(lead_id, &actor.employee.id)?;
		self.log_repo.post(
			&lead.id,
			"LEAD IN PROCESS",
			&lead.full_name(),
			&format!("Lead allocated to {}", actor.employee.full_name()),
		)?;
		Ok(lead)
	}

	pub fn update_lead(&self, actor: &Actor, lead_id: &Id, changes: UpdateLead) -> Result<Lead> {
		let lead = self.lead_repo.find_by_id(lead_id)?;
		self.require_lead_owner(actor, &lead)?;

		let updated = self.lead_repo.update(lead_id, changes)?;
		self.log_repo.post(
			&updated.id,
			"LEAD UPDATED",
			&updated.full_name(),
			&format!("Lead details updated by {}", actor.employee.full_name()),
		)?;
		Ok(updated)
	}

	pub fn hold_lead(&self, actor: &Actor, lead_id: &Id, on_hold: bool) -> Result<Lead> {
		let lead = self.lead_repo.find_by_id(lead_id)?;
		self.require_lead_owner(actor, &lead)?;
		self.lead_repo.set_hold(lead_id, &actor.employee.id, on_hold).map_err(Into::into)
	}

	/// Marks the lead's email address verified
	pub fn verify_email(&self, actor: &Actor, lead_id: &Id) -> Result<Lead> {
		let lead = self.lead_repo.find_by_id(lead_id)?;
		self.require_lead_owner(actor, &lead)?;
		if lead.is_email_verified {
			return Err(Error::conflict("email is already verified"));
		}
		self.lead_repo.set_email_verified(lead_id).map_err(Into::into)
	}

	/// Issues a one-time password to a mobile number before lead creation
	pub fn send_mobile_otp(&self, mobile: &str, f_name: &str, l_name: &str) -> Result<()> {
		let otp = generate_otp();
		self.otp_gateway.send_otp(mobile, f_name, &otp)?;
		self.otp_repo.upsert(NewMobileOtp {
			mobile,
			f_name,
			l_name,
			otp: &otp,
		})?;
		Ok(())
	}

	pub fn verify_mobile_otp(&self, mobile: &str, otp: &str) -> Result<()> {
		let record = match self.otp_repo.find_by_mobile(mobile) {
			Ok(r) => r,
			Err(db::Error::RecordNotFound) => {
				return Err(Error::not_found("no OTP was requested for this mobile number"));
			}
			Err(e) => return Err(e.into()),
		};
		if record.otp != otp {
			return Err(Error::not_authorized("invalid OTP"));
		}
		Ok(())
	}

	/// Verifies the OTP against the lead's mobile and flags the lead
	pub fn verify_lead_mobile(&self, actor: &Actor, lead_id: &Id, otp: &str) -> Result<Lead> {
		let lead = self.lead_repo.find_by_id(lead_id)?;
		self.require_lead_owner(actor, &lead)?;
		self.verify_mobile_otp(&lead.mobile, otp)?;
		self.lead_repo.set_mobile_verified(lead_id).map_err(Into::into)
	}

	/// Returns the lead's credit score, pulling it from the bureau on the
	/// first call and caching it on the lead
	pub fn fetch_cibil(&self, actor: &Actor, lead_id: &Id) -> Result<i16> {
		let lead = self.lead_repo.find_by_id(lead_id)?;
		self.require_lead_owner(actor, &lead)?;

		if let Some(score) = lead.cibil_score {
			return Ok(score);
		}

		let score = self.bureau.fetch_score(&ScoreInquiry {
			f_name: lead.f_name.clone(),
			m_name: lead.m_name.clone(),
			l_name: lead.l_name.clone(),
			dob: lead.dob,
			mobile: lead.mobile.clone(),
			pan: lead.pan.clone(),
			city: lead.city.clone(),
			state: lead.state.clone(),
			pin_code: lead.pin_code.clone(),
		})?;
		self.lead_repo.set_cibil_score(lead_id, score)?;
		Ok(score)
	}

	/// Stores a PAN verification payload reported by the provider edge
	pub fn save_pan_record(&self, pan: &str, full_name: &str, gender: &str, dob: Date) -> Result<PanRecord> {
		if !kyc::valid_pan(pan) {
			return Err(Error::conflict("invalid PAN"));
		}
		self.kyc_repo
			.upsert_pan(NewPanRecord { pan, full_name, gender, dob })
			.map_err(Into::into)
	}

	/// Checks the lead against its PAN verification snapshot
	pub fn verify_pan(&self, actor: &Actor, lead_id: &Id) -> Result<Lead> {
		let lead = self.lead_repo.find_by_id(lead_id)?;
		self.require_lead_owner(actor, &lead)?;
		if !kyc::valid_pan(&lead.pan) {
			return Err(Error::conflict("invalid PAN"));
		}

		let record = match self.kyc_repo.find_pan(&lead.pan) {
			Ok(record) => record,
			Err(db::Error::RecordNotFound) => {
				return Err(Error::not_found("this PAN has not been verified with the provider"));
			}
			Err(e) => return Err(e.into()),
		};
		if !kyc::names_match(&record.full_name, &lead.full_name()) {
			return Err(Error::conflict("the name does not match the PAN record"));
		}
		self.lead_repo.set_pan_verified(lead_id).map_err(Into::into)
	}

	/// Records the lead's Aadhaar as verified, storing only a masked snapshot
	pub fn verify_aadhaar(&self, actor: &Actor, lead_id: &Id) -> Result<Lead> {
		let lead = self.lead_repo.find_by_id(lead_id)?;
		self.require_lead_owner(actor, &lead)?;
		if !kyc::valid_aadhaar(&lead.aadhaar) {
			return Err(Error::conflict("invalid Aadhaar number"));
		}

		let name = lead.full_name();
		let unique_id = kyc::aadhaar_unique_id(&name, &lead.aadhaar);
		let last_digits = &lead.aadhaar[lead.aadhaar.len() - 4..];
		self.kyc_repo.upsert_aadhaar(NewAadhaarRecord {
			unique_id: &unique_id,
			name: &name,
			last_digits,
		})?;
		self.lead_repo.set_aadhaar_verified(lead_id).map_err(Into::into)
	}

	/// Promotes a screened lead into the application stage
	pub fn recommend_lead(&self, actor: &Actor, lead_id: &Id) -> Result<Application> {
		if !actor.is(Role::Screener) {
			return Err(Error::not_authorized("only a screener can recommend a lead"));
		}
		let lead = self.lead_repo.find_by_id(lead_id)?;
		self.require_lead_owner(actor, &lead)?;

		let blockers = lead.recommend_blockers();
		if !blockers.is_empty() {
			return Err(Error::not_ready(blockers.join(", ")));
		}

		let status = self.status_repo.find_by_id(&lead.status_id)?;

		let applicant = self.applicant_repo.upsert(NewApplicant {
			pan: lead.pan.clone(),
			aadhaar: lead.aadhaar.clone(),
			f_name: lead.f_name.clone(),
			m_name: lead.m_name.clone(),
			l_name: lead.l_name.clone(),
			gender: lead.gender,
			dob: lead.dob,
			mobile: lead.mobile.clone(),
			alternate_mobile: lead.alternate_mobile.clone(),
			personal_email: lead.personal_email.clone(),
			office_email: lead.office_email.clone(),
			screened_by: actor.employee.full_name(),
		})?;

		self.cam_repo.seed(NewCam {
			lead_id: &lead.id,
			lead_no: &lead.lead_no,
			cibil_score: lead.cibil_score,
			loan_applied: &lead.loan_amount,
		})?;

		let application = self.application_repo.create(NewApplication {
			lead_no: &lead.lead_no,
			pan: &lead.pan,
			lead_id: &lead.id,
			applicant_id: &applicant.id,
		})?;

		self.lead_repo.set_recommended(lead_id, &actor.employee.id)?;
		self.status_repo.set_stage(&status.id, Stage::Application)?;

		self.log_repo.post(
			&lead.id,
			"LEAD APPROVED. TRANSFERRED TO CREDIT MANAGER",
			&lead.full_name(),
			&format!("Lead approved by {}", actor.employee.full_name()),
		)?;
		Ok(application)
	}

	// ---- application stage ----

	pub fn get_application(&self, id: &Id) -> Result<Application> {
		self.application_repo.find_by_id(id).map_err(Into::into)
	}

	pub fn get_applicant(&self, application_id: &Id) -> Result<(Applicant, Vec<Reference>)> {
		let application = self.application_repo.find_by_id(application_id)?;
		let applicant = self.applicant_repo.find_by_id(&application.applicant_id)?;
		let references = self.applicant_repo.references(&applicant.id)?;
		Ok((applicant, references))
	}

	pub fn list_unallocated_applications(&self, actor: &Actor, page: Page) -> Result<Paged<Application>> {
		if actor.is(Role::Screener) {
			return Err(Error::not_authorized("screeners cannot view applications"));
		}
		self.application_repo.list_unallocated(page).map_err(Into::into)
	}

	pub fn list_allocated_applications(&self, actor: &Actor, page: Page) -> Result<Paged<Application>> {
		if actor.is_any(&[Role::Admin, Role::SanctionHead]) {
			self.application_repo.list_allocated(None, page).map_err(Into::into)
		} else if actor.is(Role::CreditManager) {
			self.application_repo.list_allocated(Some(&actor.employee.id), page).map_err(Into::into)
		} else {
			Err(Error::not_authorized("only credit managers and admins can list allocated applications"))
		}
	}

	/// A credit manager takes ownership; an admin may hand it to one
	pub fn allocate_application(&self, actor: &Actor, application_id: &Id, assignee: Option<Id>) -> Result<Application> {
		let credit_manager_id = match (actor.active_role, assignee) {
			(Role::Admin, Some(id)) => id,
			(Role::CreditManager, _) => actor.employee.id,
			_ => return Err(Error::not_authorized("only a credit manager can pick up an application")),
		};
		let application = self.application_repo.allocate(application_id, &credit_manager_id)?;

		let lead = self.lead_repo.find_by_id(&application.lead_id)?;
		let manager = self.employee_repo.find_by_id(&credit_manager_id)?;
		self.log_repo.post(
			&lead.id,
			"APPLICATION IN PROCESS",
			&lead.full_name(),
			&format!("Application allocated to {}", manager.full_name()),
		)?;
		Ok(application)
	}

	pub fn update_applicant(&self, actor: &Actor, application_id: &Id, changes: UpdateApplicant, references: Option<Vec<(String, String, String)>>) -> Result<Applicant> {
		let application = self.application_repo.find_by_id(application_id)?;
		self.require_application_owner(actor, &application)?;

		let applicant = self.applicant_repo.update(&application.applicant_id, changes)?;
		if let Some(references) = references {
			if !references.is_empty() {
				self.applicant_repo.replace_references(&applicant.id, &references)?;
			}
		}

		let lead = self.lead_repo.find_by_id(&application.lead_id)?;
		self.log_repo.post(
			&lead.id,
			"APPLICANT PERSONAL DETAILS UPDATED",
			&lead.full_name(),
			&format!("Applicant personal details updated by {}", actor.employee.full_name()),
		)?;
		Ok(applicant)
	}

	/// Verifies the account with the bank and stores it against the applicant
	pub fn add_bank_account(&self, actor: &Actor, application_id: &Id, details: BankDetails) -> Result<BankAccount> {
		let application = self.application_repo.find_by_id(application_id)?;
		self.require_application_owner(actor, &application)?;

		match self.bank_repo.find_by_account_no(&details.bank_acc_no) {
			Ok(_) => return Err(Error::conflict("this account number is already registered")),
			Err(db::Error::RecordNotFound) => {}
			Err(e) => return Err(e.into()),
		}

		self.bank_verifier.verify_account(&details.bank_acc_no, &details.ifsc_code)?;

		self.bank_repo
			.create(NewBankAccount {
				applicant_id: &application.applicant_id,
				beneficiary_name: &details.beneficiary_name,
				bank_acc_no: &details.bank_acc_no,
				account_type: &details.account_type,
				ifsc_code: &details.ifsc_code,
				bank_name: &details.bank_name,
				branch_name: &details.branch_name,
			})
			.map_err(Into::into)
	}

	/// Re-verifies and updates the bank account already on file
	pub fn update_bank_account(&self, actor: &Actor, application_id: &Id, details: BankDetails) -> Result<BankAccount> {
		let application = self.application_repo.find_by_id(application_id)?;
		self.require_application_owner(actor, &application)?;

		let existing = match self.bank_repo.find_by_applicant(&application.applicant_id) {
			Ok(account) => account,
			Err(db::Error::RecordNotFound) => {
				return Err(Error::not_found("no bank account on file for this applicant"));
			}
			Err(e) => return Err(e.into()),
		};

		self.bank_verifier.verify_account(&details.bank_acc_no, &details.ifsc_code)?;

		self.bank_repo
			.update(&existing.id, crate::bank_account::UpdateBankAccount {
				beneficiary_name: Some(details.beneficiary_name),
				bank_acc_no: Some(details.bank_acc_no),
				account_type: Some(details.account_type),
				ifsc_code: Some(details.ifsc_code),
				bank_name: Some(details.bank_name),
				branch_name: Some(details.branch_name),
			})
			.map_err(Into::into)
	}

	pub fn get_bank_account(&self, application_id: &Id) -> Result<BankAccount> {
		let application = self.application_repo.find_by_id(application_id)?;
		self.bank_repo.find_by_applicant(&application.applicant_id).map_err(Into::into)
	}

	pub fn get_cam(&self, application_id: &Id) -> Result<Cam> {
		let application = self.application_repo.find_by_id(application_id)?;
		self.cam_repo.find_by_lead(&application.lead_id).map_err(Into::into)
	}

	pub fn update_cam(&self, actor: &Actor, application_id: &Id, changes: UpdateCam) -> Result<Cam> {
		let application = self.application_repo.find_by_id(application_id)?;
		self.require_application_owner(actor, &application)?;

		let cam = self.cam_repo.find_by_lead(&application.lead_id)?;
		let updated = self.cam_repo.update(&cam.id, changes)?;

		let lead = self.lead_repo.find_by_id(&application.lead_id)?;
		self.log_repo.post(
			&lead.id,
			"APPLICATION IN PROCESS",
			&lead.full_name(),
			&format!("CAM details added by {}", actor.employee.full_name()),
		)?;
		Ok(updated)
	}

	/// Forwards an appraised application to the sanction head
	pub fn recommend_application(&self, actor: &Actor, application_id: &Id) -> Result<Sanction> {
		if !actor.is(Role::CreditManager) {
			return Err(Error::not_authorized("only a credit manager can recommend an application"));
		}
		let application = self.application_repo.find_by_id(application_id)?;
		self.require_application_owner(actor, &application)?;

		let has_appraisal = self
			.cam_repo
			.find_by_lead(&application.lead_id)
			.map(|cam| cam.loan_recommended.is_some())
			.unwrap_or(false);
		let has_bank = match self.bank_repo.find_by_applicant(&application.applicant_id) {
			Ok(_) => true,
			Err(db::Error::RecordNotFound) => false,
			Err(e) => return Err(e.into()),
		};
		let blockers = application.recommend_blockers(has_appraisal, has_bank);
		if !blockers.is_empty() {
			return Err(Error::not_ready(blockers.join(", ")));
		}

		let sanction = self.sanction_repo.create(NewSanction {
			application_id: &application.id,
			lead_no: &application.lead_no,
			pan: &application.pan,
			recommended_by: &actor.employee.id,
		})?;

		self.application_repo.set_recommended(application_id, &actor.employee.id)?;

		let lead = self.lead_repo.find_by_id(&application.lead_id)?;
		let status = self.status_repo.find_by_id(&lead.status_id)?;
		self.status_repo.set_stage(&status.id, Stage::Sanction)?;

		self.log_repo.post(
			&lead.id,
			"APPLICATION FORWARDED. TRANSFERRED TO SANCTION HEAD",
			&lead.full_name(),
			&format!("Application forwarded by {}", actor.employee.full_name()),
		)?;
		Ok(sanction)
	}

	// ---- sanction stage ----

	pub fn get_sanction(&self, id: &Id) -> Result<Sanction> {
		self.sanction_repo.find_by_id(id).map_err(Into::into)
	}

	pub fn list_pending_sanctions(&self, actor: &Actor, page: Page) -> Result<Paged<Sanction>> {
		if !actor.is(Role::SanctionHead) {
			return Err(Error::not_authorized("only the sanction head can list pending sanctions"));
		}
		self.sanction_repo.list_pending(page).map_err(Into::into)
	}

	pub fn list_esign_pending(&self, actor: &Actor, page: Page) -> Result<Paged<Sanction>> {
		if !actor.is(Role::SanctionHead) {
			return Err(Error::not_authorized("only the sanction head can list pending e-signs"));
		}
		self.sanction_repo.list_esign_pending(page).map_err(Into::into)
	}

	pub fn list_recommended_sanctions(&self, actor: &Actor, page: Page) -> Result<Paged<Sanction>> {
		if !actor.is(Role::CreditManager) {
			return Err(Error::not_authorized("only a credit manager can list their recommendations"));
		}
		self.sanction_repo.list_recommended_by(&actor.employee.id, page).map_err(Into::into)
	}

	pub fn list_sanctioned(&self, actor: &Actor) -> Result<Vec<SanctionedRow>> {
		if !actor.is_any(&[Role::CreditManager, Role::SanctionHead, Role::Admin]) {
			return Err(Error::not_authorized("not authorized to view sanctioned loans"));
		}
		self.sanction_repo.list_sanctioned().map_err(Into::into)
	}

	/// Assembles the data the sanction letter is rendered from
	pub fn sanction_letter(&self, actor: &Actor, sanction_id: &Id) -> Result<SanctionLetter> {
		if !actor.is(Role::SanctionHead) {
			return Err(Error::not_authorized("only the sanction head can preview the letter"));
		}
		let sanction = self.sanction_repo.find_by_id(sanction_id)?;
		self.letter_data(&sanction)
	}

	/// Approves a sanction and allots the loan number
	///
	/// Runs inside one database transaction: the active-loan guard, the
	/// loan-number allotment and the ledger row must land together.
	pub fn approve_sanction(&self, actor: &Actor, sanction_id: &Id) -> Result<Sanction> {
		if !actor.is(Role::SanctionHead) {
			return Err(Error::not_authorized("only the sanction head can approve a sanction"));
		}
		let sanction = self.sanction_repo.find_by_id(sanction_id)?;
		if sanction.is_rejected {
			return Err(Error::conflict("this sanction has been rejected"));
		}
		if sanction.is_approved {
			return Err(Error::conflict("this sanction is already approved"));
		}

		let lead = self.lead_repo.find_by_lead_no(&sanction.lead_no)?;
		let status = self.status_repo.find_by_id(&lead.status_id)?;

		let conn = &self.db.get()?;
		let approved = conn.transaction::<Sanction, Error, _>(|| {
			if self.ledger_repo.find_active_by_pan(&sanction.pan)?.is_some() {
				return Err(Error::conflict("this PAN already has an active loan"));
			}

			let loan_no = self.sequence_repo.next_loan_no()?;
			let approved = self.sanction_repo.approve(
				sanction_id,
				&loan_no,
				self.calendar.current_date(),
				&actor.employee.id,
			)?;
			self.ledger_repo.create_active(&sanction.pan, &sanction.lead_no, &loan_no)?;

			Ok(approved)
		})?;

		self.status_repo.set_approved(&status.id)?;
		self.log_repo.post(
			&lead.id,
			"SANCTION APPROVED AND LOAN NUMBER ALLOTTED",
			&lead.full_name(),
			&format!("Sanction approved by {}", actor.employee.full_name()),
		)?;
		Ok(approved)
	}

	/// Sends the sanction letter out for e-signature and opens the
	/// disbursal record
	pub fn send_esign(&self, actor: &Actor, sanction_id: &Id) -> Result<Disbursal> {
		if !actor.is(Role::SanctionHead) {
			return Err(Error::not_authorized("only the sanction head can send the letter for e-sign"));
		}
		let sanction = self.sanction_repo.find_by_id(sanction_id)?;
		if !sanction.is_approved {
			return Err(Error::not_ready("the sanction has not been approved"));
		}
		if sanction.e_signed || sanction.e_sign_pending {
			return Err(Error::conflict("the letter is already out for signature"));
		}
		let loan_no = sanction
			.loan_no
			.clone()
			.ok_or_else(|| Error::not_ready("the sanction has no loan number"))?;

		let lead = self.lead_repo.find_by_lead_no(&sanction.lead_no)?;
		let letter = self.letter_data(&sanction)?;

		let sign_url = self.esign.send_for_signature(&letter, &lead.aadhaar)?;
		self.mail.send(
			&letter.email,
			&format!("SANCTION LETTER - {}", letter.full_name),
			&format!("Please verify and e-sign the sanction letter to acknowledge. {}", sign_url),
		)?;

		self.sanction_repo.set_esign_pending(sanction_id)?;

		let disbursal = self.disbursal_repo.create(NewDisbursal {
			sanction_id: &sanction.id,
			lead_no: &sanction.lead_no,
			pan: &sanction.pan,
			loan_no: &loan_no,
		})?;
		self.ledger_repo.link_disbursal(&loan_no, &disbursal.id)?;

		let status = self.status_repo.find_by_id(&lead.status_id)?;
		self.status_repo.set_stage(&status.id, Stage::Disbursal)?;

		self.log_repo.post(
			&lead.id,
			"SANCTION LETTER SENT TO CLIENT FOR E-SIGN",
			&lead.full_name(),
			&format!("Sanction letter sent by {}", actor.employee.full_name()),
		)?;
		Ok(disbursal)
	}

	/// Provider callback once the applicant has signed
	pub fn complete_esign(&self, sanction_id: &Id) -> Result<Sanction> {
		let sanction = self.sanction_repo.find_by_id(sanction_id)?;
		if !sanction.e_sign_pending {
			return Err(Error::conflict("no signature was requested for this sanction"));
		}
		self.sanction_repo.set_esigned(sanction_id).map_err(Into::into)
	}

	// ---- disbursal stage ----

	pub fn get_disbursal(&self, id: &Id) -> Result<(Disbursal, Option<Cam>)> {
		let disbursal = self.disbursal_repo.find_by_id(id)?;
		let cam = match self.lead_repo.find_by_lead_no(&disbursal.lead_no) {
			Ok(lead) => match self.cam_repo.find_by_lead(&lead.id) {
				Ok(cam) => Some(cam),
				Err(db::Error::RecordNotFound) => None,
				Err(e) => return Err(e.into()),
			},
			Err(db::Error::RecordNotFound) => None,
			Err(e) => return Err(e.into()),
		};
		Ok((disbursal, cam))
	}

	pub fn list_new_disbursals(&self, actor: &Actor, page: Page) -> Result<Paged<Disbursal>> {
		if !actor.is_any(&[Role::DisbursalManager, Role::DisbursalHead]) {
			return Err(Error::not_authorized("not authorized to view new disbursals"));
		}
		self.disbursal_repo.list_new(page).map_err(Into::into)
	}

	pub fn list_allocated_disbursals(&self, actor: &Actor, page: Page) -> Result<Paged<Disbursal>> {
		if actor.is_any(&[Role::Admin, Role::DisbursalHead]) {
			self.disbursal_repo.list_allocated(None, page).map_err(Into::into)
		} else if actor.is(Role::DisbursalManager) {
			self.disbursal_repo.list_allocated(Some(&actor.employee.id), page).map_err(Into::into)
		} else {
			Err(Error::not_authorized("not authorized to view allocated disbursals"))
		}
	}

	pub fn list_pending_disbursals(&self, actor: &Actor, page: Page) -> Result<Paged<Disbursal>> {
		if !actor.is_any(&[Role::DisbursalManager, Role::DisbursalHead, Role::Admin]) {
			return Err(Error::not_authorized("not authorized to view pending disbursals"));
		}
		self.disbursal_repo.list_pending(page).map_err(Into::into)
	}

	pub fn list_disbursed(&self, actor: &Actor) -> Result<Vec<crate::disbursal::DisbursedRow>> {
		if !actor.is_any(&[Role::DisbursalHead, Role::Admin]) {
			return Err(Error::not_authorized("not authorized to view disbursed loans"));
		}
		self.disbursal_repo.list_disbursed().map_err(Into::into)
	}

	pub fn allocate_disbursal(&self, actor: &Actor, disbursal_id: &Id) -> Result<Disbursal> {
		if !actor.is(Role::DisbursalManager) {
			return Err(Error::not_authorized("only a disbursal manager can pick up a disbursal"));
		}
		let disbursal = self.disbursal_repo.allocate(disbursal_id, &actor.employee.id)?;

		let lead = self.lead_repo.find_by_lead_no(&disbursal.lead_no)?;
		self.log_repo.post(
			&lead.id,
			"DISBURSAL IN PROCESS",
			&lead.full_name(),
			&format!("Disbursal allocated to {}", actor.employee.full_name()),
		)?;
		Ok(disbursal)
	}

	pub fn recommend_disbursal(&self, actor: &Actor, disbursal_id: &Id, remarks: &str) -> Result<Disbursal> {
		if !actor.is(Role::DisbursalManager) {
			return Err(Error::not_authorized("only a disbursal manager can recommend a disbursal"));
		}
		let disbursal = self.disbursal_repo.set_recommended(disbursal_id, &actor.employee.id)?;

		let lead = self.lead_repo.find_by_lead_no(&disbursal.lead_no)?;
		self.log_repo.post(
			&lead.id,
			"DISBURSAL APPLICATION RECOMMENDED. SENDING TO DISBURSAL HEAD",
			&lead.full_name(),
			remarks,
		)?;
		Ok(disbursal)
	}

	/// Records the payment once the disbursal head has pushed the money out
	///
	/// Moving the payout to a different day than the memo planned for
	/// reworks the memo's tenure and repayment amount first.
	pub fn approve_disbursal(&self, actor: &Actor, disbursal_id: &Id, payment: Payment) -> Result<Disbursal> {
		if !actor.is(Role::DisbursalHead) {
			return Err(Error::not_authorized("only the disbursal head can approve a disbursal"));
		}
		let disbursal = self.disbursal_repo.find_by_id(disbursal_id)?;
		if disbursal.is_disbursed {
			return Err(Error::conflict("this disbursal is already paid out"));
		}

		let lead = self.lead_repo.find_by_lead_no(&disbursal.lead_no)?;
		let cam = self.cam_repo.find_by_lead(&lead.id)?;
		if let Some(reschedule) = cam.reschedule(payment.disbursed_at) {
			self.cam_repo.apply_reschedule(&cam.id, &reschedule)?;
		}

		let remark = format!("Payment approved by {}", actor.employee.full_name());
		let updated = self.disbursal_repo.record_payment(disbursal_id, payment, &actor.employee.id)?;
		self.ledger_repo.set_disbursed(&updated.loan_no)?;

		self.log_repo.post(&lead.id, "DISBURSAL APPLICATION APPROVED", &lead.full_name(), &remark)?;
		Ok(updated)
	}

	// ---- rejection ----

	/// Rejects the record the actor's role is responsible for
	///
	/// Every path also flips the lead's status shadow; rejecting a
	/// disbursal additionally closes its ledger row.
	pub fn reject(&self, actor: &Actor, record_id: &Id, reason: &str) -> Result<()> {
		match actor.active_role {
			Role::Screener => {
				let lead = self.lead_repo.set_rejected(record_id, &actor.employee.id)?;
				let status = self.status_repo.find_by_id(&lead.status_id)?;
				self.status_repo.set_rejected(&status.id)?;
				self.log_repo.post(
					&lead.id,
					"LEAD REJECTED",
					&lead.full_name(),
					&format!("Lead rejected by {}: {}", actor.employee.full_name(), reason),
				)?;
			}
			Role::CreditManager => {
				let application = self.application_repo.set_rejected(record_id, &actor.employee.id)?;
				let lead = self.lead_repo.find_by_id(&application.lead_id)?;
				let status = self.status_repo.find_by_id(&lead.status_id)?;
				self.status_repo.set_rejected(&status.id)?;
				self.log_repo.post(
					&lead.id,
					"APPLICATION REJECTED",
					&lead.full_name(),
					&format!("Application rejected by {}: {}", actor.employee.full_name(), reason),
				)?;
			}
			Role::SanctionHead => {
				let sanction = self.sanction_repo.set_rejected(record_id, &actor.employee.id)?;
				let lead = self.lead_repo.find_by_lead_no(&sanction.lead_no)?;
				let status = self.status_repo.find_by_id(&lead.status_id)?;
				self.status_repo.set_rejected(&status.id)?;
				self.log_repo.post(
					&lead.id,
					"SANCTION REJECTED",
					&lead.full_name(),
					&format!("Sanction rejected by {}: {}", actor.employee.full_name(), reason),
				)?;
			}
			Role::DisbursalManager | Role::DisbursalHead => {
				let disbursal = self.disbursal_repo.set_rejected(record_id, &actor.employee.id)?;
				let lead = self.lead_repo.find_by_lead_no(&disbursal.lead_no)?;
				let status = self.status_repo.find_by_id(&lead.status_id)?;
				self.status_repo.set_rejected(&status.id)?;
				match self.ledger_repo.deactivate(&disbursal.loan_no) {
					Ok(_) | Err(db::Error::RecordNotFound) => {}
					Err(e) => return Err(e.into()),
				}
				self.log_repo.post(
					&lead.id,
					"DISBURSAL REJECTED",
					&lead.full_name(),
					&format!("Disbursal rejected by {}: {}", actor.employee.full_name(), reason),
				)?;
			}
			_ => return Err(Error::not_authorized("this role cannot reject records")),
		}
		Ok(())
	}

	pub fn list_rejected(&self, actor: &Actor, page: Page) -> Result<RejectedRecords> {
		// any authenticated employee may see the rejection queues
		let _ = actor;
		Ok(RejectedRecords {
			leads: self.lead_repo.list_rejected(page)?,
			applications: self.application_repo.list_rejected(page)?,
			sanctions: self.sanction_repo.list_rejected(page)?,
			disbursals: self.disbursal_repo.list_rejected(page)?,
		})
	}

	// ---- collection / verification ----

	pub fn list_leads_to_verify(&self, actor: &Actor) -> Result<Vec<VerifyRow>> {
		if !actor.is_any(&[Role::AccountExecutive, Role::CollectionExecutive]) {
			return Err(Error::not_authorized("not authorized to view the verification queue"));
		}
		self.ledger_repo.list_to_verify().map_err(Into::into)
	}

	/// A collection executive asks for a loan to be resolved, with evidence
	pub fn request_status(&self, actor: &Actor, loan_no: &str, status: RequestedStatus, evidence: Evidence) -> Result<LedgerEntry> {
		if !actor.is(Role::CollectionExecutive) {
			return Err(Error::not_authorized("only a collection executive can request a resolution"));
		}
		let entry = self.find_ledger_entry(loan_no)?;
		if !entry.is_active || !entry.is_disbursed {
			return Err(Error::conflict("this loan is not active"));
		}
		self.ledger_repo.record_request(loan_no, status, evidence).map_err(Into::into)
	}

	/// A collection executive reports a part-payment against an active loan
	pub fn report_partial_payment(&self, actor: &Actor, loan_no: &str, paid_on: Date, amount: &BigDecimal, utr: &str, requested_status: Option<RequestedStatus>) -> Result<()> {
		if !actor.is(Role::CollectionExecutive) {
			return Err(Error::not_authorized("only a collection executive can report a payment"));
		}
		let entry = self.find_ledger_entry(loan_no)?;
		if !entry.is_active || !entry.is_disbursed {
			return Err(Error::conflict("this loan is not active"));
		}
		self.ledger_repo.add_partial_payment(NewPartialPayment {
			ledger_id: &entry.id,
			paid_on,
			amount,
			utr,
			requested_status,
		})?;
		Ok(())
	}

	/// An account executive confirms the payment landed and verifies the
	/// resolution the collection executive asked for
	pub fn verify_active_loan(&self, actor: &Actor, loan_no: &str, utr: Option<&str>, status: RequestedStatus) -> Result<()> {
		if !actor.is(Role::AccountExecutive) {
			return Err(Error::not_authorized("only an account executive can verify a payment"));
		}
		let entry = self.find_ledger_entry(loan_no)?;
		let partials = self.ledger_repo.partial_payments(&entry.id)?;

		match decide_verification(&entry, &partials, utr, status) {
			Ok(VerifyAction::MarkPartialPaid(utr)) => {
				self.ledger_repo.mark_partial_paid(&entry.id, &utr)?;
			}
			Ok(VerifyAction::ApplyResolution(status)) => {
				self.ledger_repo.apply_verification(loan_no, status)?;
				let shadow = self.status_repo.find_by_lead_no(&entry.lead_no)?;
				self.status_repo.set_stage(&shadow.id, Stage::Closed)?;
			}
			Err(msg) => return Err(Error::conflict(msg)),
		}
		Ok(())
	}

	/// Clears a requested resolution when the payment never arrived
	pub fn reject_payment_verification(&self, actor: &Actor, loan_no: &str) -> Result<LedgerEntry> {
		if !actor.is(Role::AccountExecutive) {
			return Err(Error::not_authorized("only an account executive can reject a verification"));
		}
		self.find_ledger_entry(loan_no)?;
		self.ledger_repo.clear_requested_status(loan_no).map_err(Into::into)
	}

	// ---- helpers ----

	fn find_ledger_entry(&self, loan_no: &str) -> Result<LedgerEntry> {
		match self.ledger_repo.find_by_loan_no(loan_no) {
			Ok(entry) => Ok(entry),
			Err(db::Error::RecordNotFound) => Err(Error::not_found("loan number not found")),
			Err(e) => Err(e.into()),
		}
	}

	fn letter_data(&self, sanction: &Sanction) -> Result<SanctionLetter> {
		let application = self.application_repo.find_by_id(&sanction.application_id)?;
		let applicant = self.applicant_repo.find_by_id(&application.applicant_id)?;
		let lead = self.lead_repo.find_by_lead_no(&sanction.lead_no)?;
		let cam = self.cam_repo.find_by_lead(&application.lead_id)?;

		let title = match applicant.gender {
			Gender::Male => "Mr.",
			Gender::Female => "Ms.",
			Gender::Other => "Mx.",
		};
		let state = applicant.residence_state.clone().unwrap_or_else(|| lead.state.clone());

		Ok(SanctionLetter {
			loan_no: sanction.loan_no.clone().unwrap_or_default(),
			title: title.to_string(),
			full_name: lead.full_name(),
			pan: sanction.pan.clone(),
			mobile: applicant.mobile.clone(),
			email: applicant.personal_email.clone(),
			sanction_date: sanction.sanction_date.unwrap_or_else(|| self.calendar.current_date()),
			residence_address: applicant.residence_address.clone(),
			state_country: Some(format!("{}, India", state)),
			loan_recommended: cam.loan_recommended.clone(),
			roi: cam.roi.clone(),
			tenure_days: cam.tenure_days,
			repayment_date: cam.repayment_date,
			repayment_amount: cam.repayment_amount.clone(),
		})
	}

	fn require_lead_owner(&self, actor: &Actor, lead: &Lead) -> Result<()> {
		match lead.screener_id {
			Some(id) if id == actor.employee.id => Ok(()),
			_ => Err(Error::not_authorized("this lead is not allocated to you")),
		}
	}

	fn require_application_owner(&self, actor: &Actor, application: &Application) -> Result<()> {
		match application.credit_manager_id {
			Some(id) if id == actor.employee.id => Ok(()),
			_ => Err(Error::not_authorized("this application is not allocated to you")),
		}
	}
}

fn generate_otp() -> String {
	let mut rng = rand::thread_rng();
	rng.gen_range(100_000, 1_000_000).to_string()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn otp_is_six_digits() {
		for _ in 0..32 {
			let otp = generate_otp();
			assert_eq!(otp.len(), 6);
			assert!(otp.parse::<u32>().is_ok());
		}
	}
}
