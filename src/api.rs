use std::convert::Infallible;

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use warp::{Filter, Rejection, Reply};
use warp::http::StatusCode;

use crate::{applicant, application, bank_account, cam, disbursal, document, employee, kyc, lead, lead_log, lead_status, ledger, otp, sanction, sequence};
use crate::applicant::UpdateApplicant;
use crate::cam::UpdateCam;
use crate::db::{self, PgPool};
use crate::employee::{Actor, Role};
use crate::lead::UpdateLead;
use crate::ledger::{Evidence, RequestedStatus};
use crate::origination::{BankDetails, Error, ErrorKind, LeadIntake, NewService, Service};
use crate::providers::{BankVerifier, CreditBureau, EsignProvider, MailGateway, OtpGateway, ProviderError, ProviderResult, SanctionLetter, ScoreInquiry, SystemCalendar};
use crate::types::{Date, Id, Page};

/// JSON surface per lifecycle stage
///
/// Authentication lives upstream; handlers consume the request-scoped
/// actor from the `x-employee-id` / `x-active-role` headers it sets.
pub fn routes(pool: PgPool) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
	let leads = lead_routes(pool.clone());
	let verify = verify_routes(pool.clone());
	let applications = application_routes(pool.clone());
	let sanctions = sanction_routes(pool.clone());
	let disbursals = disbursal_routes(pool.clone());
	let accounts = account_routes(pool.clone());
	let rejection = rejection_routes(pool);

	leads
		.or(verify)
		.or(applications)
		.or(sanctions)
		.or(disbursals)
		.or(accounts)
		.or(rejection)
		.recover(handle_rejection)
}

/// Repositories and collaborators a request handler works with
struct Context {
	pool: PgPool,
	employee_repo: employee::Repo,
	sequence_repo: sequence::Repo,
	document_repo: document::Repo,
	lead_repo: lead::Repo,
	status_repo: lead_status::Repo,
	log_repo: lead_log::Repo,
	otp_repo: otp::Repo,
	applicant_repo: applicant::Repo,
	bank_repo: bank_account::Repo,
	cam_repo: cam::Repo,
	application_repo: application::Repo,
	sanction_repo: sanction::Repo,
	disbursal_repo: disbursal::Repo,
	ledger_repo: ledger::Repo,
	kyc_repo: kyc::Repo,
}

impl Context {
	fn new(pool: PgPool) -> Self {
		Context {
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
			kyc_repo: kyc::Repo::new(pool.clone()),
			pool,
		}
	}

	fn service<'a>(&'a self, providers: &'a Providers) -> Service<'a> {
		Service::new(NewService {
			db: self.pool.clone(),
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

	fn actor(&self, employee_id: &Id, active_role: Role) -> Result<Actor, Rejection> {
		match self.employee_repo.find_by_id(employee_id) {
			Ok(employee) => Ok(Actor::new(employee, active_role)),
			Err(db::Error::RecordNotFound) => Err(reject(Error::not_authorized("unknown employee"))),
			Err(e) => Err(reject(Error::from(e))),
		}
	}
}

struct Providers {
	calendar: SystemCalendar,
	bureau: Unconfigured,
	bank_verifier: Unconfigured,
	esign: Unconfigured,
	mail: Unconfigured,
	otp_gateway: Unconfigured,
}

impl Providers {
	fn new() -> Self {
		Providers {
			calendar: SystemCalendar,
			bureau: Unconfigured,
			bank_verifier: Unconfigured,
			esign: Unconfigured,
			mail: Unconfigured,
			otp_gateway: Unconfigured,
		}
	}
}

/// Stands in for a gateway whose credentials are not configured in this
/// deployment; every call reports the provider as unavailable
struct Unconfigured;

impl Unconfigured {
	fn unavailable<T>(&self, name: &str) -> ProviderResult<T> {
		Err(ProviderError(format!("{} gateway is not configured", name)))
	}
}

impl CreditBureau for Unconfigured {
	fn fetch_score(&self, _inquiry: &ScoreInquiry) -> ProviderResult<i16> {
		self.unavailable("credit bureau")
	}
}

impl BankVerifier for Unconfigured {
	fn verify_account(&self, _account_no: &str, _ifsc_code: &str) -> ProviderResult<()> {
		self.unavailable("bank verification")
	}
}

impl EsignProvider for Unconfigured {
	fn send_for_signature(&self, _letter: &SanctionLetter, _aadhaar: &str) -> ProviderResult<String> {
		self.unavailable("e-sign")
	}
}

impl MailGateway for Unconfigured {
	fn send(&self, _to: &str, _subject: &str, _body: &str) -> ProviderResult<()> {
		self.unavailable("mail")
	}
}

impl OtpGateway for Unconfigured {
	fn send_otp(&self, _mobile: &str, _name: &str, _otp: &str) -> ProviderResult<()> {
		self.unavailable("sms")
	}
}

// ---- request/response types ----

#[derive(Deserialize)]
struct PageQuery {
	page: Option<i64>,
	limit: Option<i64>,
}

impl PageQuery {
	fn page(&self) -> Page {
		Page::new(self.page.unwrap_or(1), self.limit.unwrap_or(10))
	}
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AllocateRequest {
	assignee: Option<Id>,
}

#[derive(Deserialize)]
struct RejectRequest {
	reason: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HoldRequest {
	on_hold: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OtpRequest {
	mobile: String,
	f_name: String,
	l_name: String,
}

#[derive(Deserialize)]
struct OtpVerifyRequest {
	mobile: String,
	otp: String,
}

#[derive(Deserialize)]
struct LeadOtpRequest {
	otp: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PanRecordRequest {
	pan: String,
	full_name: String,
	gender: String,
	dob: Date,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApplicantUpdateRequest {
	#[serde(flatten)]
	details: UpdateApplicant,
	#[serde(default)]
	reference: Option<Vec<ReferenceRequest>>,
}

#[derive(Deserialize)]
struct ReferenceRequest {
	name: String,
	mobile: String,
	relation: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CamUpdateRequest {
	details: UpdateCam,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecommendDisbursalRequest {
	remarks: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentRequest {
	payable_account: String,
	payment_mode: String,
	amount: BigDecimal,
	channel: String,
	utr: String,
	disbursal_date: Date,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusRequest {
	status: RequestedStatus,
	closing_date: Option<Date>,
	closing_amount: Option<BigDecimal>,
	utr: Option<String>,
	dpd: Option<i16>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartialPaymentRequest {
	paid_on: Date,
	amount: BigDecimal,
	utr: String,
	requested_status: Option<RequestedStatus>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyLoanRequest {
	status: RequestedStatus,
	utr: Option<String>,
}

#[derive(Serialize)]
struct Message {
	success: bool,
	message: String,
}

// ---- filters ----

fn with_pool(pool: PgPool) -> impl Filter<Extract = (PgPool,), Error = Infallible> + Clone {
	warp::any().map(move || pool.clone())
}

fn with_actor() -> impl Filter<Extract = (Id, Role), Error = Rejection> + Clone {
	warp::header::<Id>("x-employee-id").and(warp::header::<Role>("x-active-role"))
}

fn lead_routes(pool: PgPool) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
	let create = warp::path!("api" / "leads")
		.and(warp::post())
		.and(with_pool(pool.clone()))
		.and(warp::body::json())
		.and_then(create_lead);

	let list = warp::path!("api" / "leads")
		.and(warp::get())
		.and(with_pool(pool.clone()))
		.and(warp::query::<PageQuery>())
		.and_then(list_leads);

	let allocated = warp::path!("api" / "leads" / "allocated")
		.and(warp::get())
		.and(with_pool(pool.clone()))
		.and(with_actor())
		.and(warp::query::<PageQuery>())
		.and_then(list_allocated_leads);

	let get = warp::path!("api" / "leads" / Id)
		.and(warp::get())
		.and(with_pool(pool.clone()))
		.and_then(get_lead);

	let logs = warp::path!("api" / "leads" / Id / "logs")
		.and(warp::get())
		.and(with_pool(pool.clone()))
		.and_then(lead_logs);

	let allocate = warp::path!("api" / "leads" / Id / "allocate")
		.and(warp::patch())
		.and(with_pool(pool.clone()))
		.and(with_actor())
		.and_then(allocate_lead);

	let update = warp::path!("api" / "leads" / Id)
		.and(warp::patch())
		.and(with_pool(pool.clone()))
		.and(with_actor())
		.and(warp::body::json())
		.and_then(update_lead);

	let hold = warp::path!("api" / "leads" / Id / "hold")
		.and(warp::patch())
		.and(with_pool(pool.clone()))
		.and(with_actor())
		.and(warp::body::json())
		.and_then(hold_lead);

	let recommend = warp::path!("api" / "leads" / Id / "recommend")
		.and(warp::patch())
		.and(with_pool(pool))
		.and(with_actor())
		.and_then(recommend_lead);

	create.or(list).or(allocated).or(get).or(logs).or(allocate).or(update).or(hold).or(recommend)
}

fn verify_routes(pool: PgPool) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
	let email = warp::path!("api" / "verify" / "email" / Id)
		.and(warp::patch())
		.and(with_pool(pool.clone()))
		.and(with_actor())
		.and_then(verify_email);

	let cibil = warp::path!("api" / "verify" / "cibil" / Id)
		.and(warp::get())
		.and(with_pool(pool.clone()))
		.and(with_actor())
		.and_then(fetch_cibil);

	let send_otp = warp::path!("api" / "verify" / "mobile" / "get-otp")
		.and(warp::post())
		.and(with_pool(pool.clone()))
		.and(warp::body::json())
		.and_then(send_mobile_otp);

	let verify_otp = warp::path!("api" / "verify" / "mobile" / "verify-otp")
		.and(warp::post())
		.and(with_pool(pool.clone()))
		.and(warp::body::json())
		.and_then(verify_mobile_otp);

	let lead_mobile = warp::path!("api" / "verify" / "mobile" / Id)
		.and(warp::patch())
		.and(with_pool(pool.clone()))
		.and(with_actor())
		.and(warp::body::json())
		.and_then(verify_lead_mobile);

	let save_pan = warp::path!("api" / "verify" / "pan")
		.and(warp::post())
		.and(with_pool(pool.clone()))
		.and(warp::body::json())
		.and_then(save_pan_record);

	let pan = warp::path!("api" / "verify" / "pan" / Id)
		.and(warp::patch())
		.and(with_pool(pool.clone()))
		.and(with_actor())
		.and_then(verify_pan);

	let aadhaar = warp::path!("api" / "verify" / "aadhaar" / Id)
		.and(warp::patch())
		.and(with_pool(pool))
		.and(with_actor())
		.and_then(verify_aadhaar);

	email.or(cibil).or(send_otp).or(verify_otp).or(save_pan).or(pan).or(aadhaar).or(lead_mobile)
}

fn application_routes(pool: PgPool) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
	let list = warp::path!("api" / "applications")
		.and(warp::get())
		.and(with_pool(pool.clone()))
		.and(with_actor())
		.and(warp::query::<PageQuery>())
		.and_then(list_applications);

	let allocated = warp::path!("api" / "applications" / "allocated")
		.and(warp::get())
		.and(with_pool(pool.clone()))
		.and(with_actor())
		.and(warp::query::<PageQuery>())
		.and_then(list_allocated_applications);

	let get = warp::path!("api" / "applications" / Id)
		.and(warp::get())
		.and(with_pool(pool.clone()))
		.and_then(get_application);

	let allocate = warp::path!("api" / "applications" / Id / "allocate")
		.and(warp::patch())
		.and(with_pool(pool.clone()))
		.and(with_actor())
		.and(warp::body::json())
		.and_then(allocate_application);

	let applicant = warp::path!("api" / "applications" / Id / "applicant")
		.and(warp::patch())
		.and(with_pool(pool.clone()))
		.and(with_actor())
		.and(warp::body::json())
		.and_then(update_applicant);

	let get_applicant = warp::path!("api" / "applications" / Id / "applicant")
		.and(warp::get())
		.and(with_pool(pool.clone()))
		.and_then(get_applicant);

	let bank = warp::path!("api" / "applications" / Id / "bank")
		.and(warp::post())
		.and(with_pool(pool.clone()))
		.and(with_actor())
		.and(warp::body::json())
		.and_then(add_bank_account);

	let update_bank = warp::path!("api" / "applications" / Id / "bank")
		.and(warp::patch())
		.and(with_pool(pool.clone()))
		.and(with_actor())
		.and(warp::body::json())
		.and_then(update_bank_account);

	let get_bank = warp::path!("api" / "applications" / Id / "bank")
		.and(warp::get())
		.and(with_pool(pool.clone()))
		.and_then(get_bank_account);

	let get_cam = warp::path!("api" / "applications" / Id / "cam")
		.and(warp::get())
		.and(with_pool(pool.clone()))
		.and_then(get_cam);

	let update_cam = warp::path!("api" / "applications" / Id / "cam")
		.and(warp::patch())
		.and(with_pool(pool.clone()))
		.and(with_actor())
		.and(warp::body::json())
		.and_then(update_cam_details);

	let recommend = warp::path!("api" / "applications" / Id / "recommend")
		.and(warp::patch())
		.and(with_pool(pool))
		.and(with_actor())
		.and_then(recommend_application);

	list.or(allocated).or(get).or(allocate).or(applicant).or(get_applicant).or(bank).or(update_bank).or(get_bank).or(get_cam).or(update_cam).or(recommend)
}

fn sanction_routes(pool: PgPool) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
	let pending = warp::path!("api" / "sanctions" / "pending")
		.and(warp::get())
		.and(with_pool(pool.clone()))
		.and(with_actor())
		.and(warp::query::<PageQuery>())
		.and_then(list_pending_sanctions);

	let esign_pending = warp::path!("api" / "sanctions" / "esign-pending")
		.and(warp::get())
		.and(with_pool(pool.clone()))
		.and(with_actor())
		.and(warp::query::<PageQuery>())
		.and_then(list_esign_pending);

	let recommended = warp::path!("api" / "sanctions" / "recommended")
		.and(warp::get())
		.and(with_pool(pool.clone()))
		.and(with_actor())
		.and(warp::query::<PageQuery>())
		.and_then(list_recommended_sanctions);

	let approved = warp::path!("api" / "sanctions" / "approved")
		.and(warp::get())
		.and(with_pool(pool.clone()))
		.and(with_actor())
		.and_then(list_sanctioned);

	let preview = warp::path!("api" / "sanctions" / Id / "preview")
		.and(warp::get())
		.and(with_pool(pool.clone()))
		.and(with_actor())
		.and_then(sanction_preview);

	let get = warp::path!("api" / "sanctions" / Id)
		.and(warp::get())
		.and(with_pool(pool.clone()))
		.and_then(get_sanction);

	let approve = warp::path!("api" / "sanctions" / Id / "approve")
		.and(warp::patch())
		.and(with_pool(pool.clone()))
		.and(with_actor())
		.and_then(approve_sanction);

	let esign = warp::path!("api" / "sanctions" / Id / "esign")
		.and(warp::patch())
		.and(with_pool(pool.clone()))
		.and(with_actor())
		.and_then(send_esign);

	let esign_complete = warp::path!("api" / "sanctions" / Id / "esign" / "complete")
		.and(warp::patch())
		.and(with_pool(pool))
		.and_then(complete_esign);

	pending.or(esign_pending).or(recommended).or(approved).or(preview).or(get).or(approve).or(esign).or(esign_complete)
}

fn disbursal_routes(pool: PgPool) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
	let new = warp::path!("api" / "disbursals" / "new")
		.and(warp::get())
		.and(with_pool(pool.clone()))
		.and(with_actor())
		.and(warp::query::<PageQuery>())
		.and_then(list_new_disbursals);

	let allocated = warp::path!("api" / "disbursals" / "allocated")
		.and(warp::get())
		.and(with_pool(pool.clone()))
		.and(with_actor())
		.and(warp::query::<PageQuery>())
		.and_then(list_allocated_disbursals);

	let pending = warp::path!("api" / "disbursals" / "pending")
		.and(warp::get())
		.and(with_pool(pool.clone()))
		.and(with_actor())
		.and(warp::query::<PageQuery>())
		.and_then(list_pending_disbursals);

	let disbursed = warp::path!("api" / "disbursals" / "disbursed")
		.and(warp::get())
		.and(with_pool(pool.clone()))
		.and(with_actor())
		.and_then(list_disbursed);

	let get = warp::path!("api" / "disbursals" / Id)
		.and(warp::get())
		.and(with_pool(pool.clone()))
		.and_then(get_disbursal);

	let allocate = warp::path!("api" / "disbursals" / Id / "allocate")
		.and(warp::patch())
		.and(with_pool(pool.clone()))
		.and(with_actor())
		.and_then(allocate_disbursal);

	let recommend = warp::path!("api" / "disbursals" / Id / "recommend")
		.and(warp::patch())
		.and(with_pool(pool.clone()))
		.and(with_actor())
		.and(warp::body::json())
		.and_then(recommend_disbursal);

	let approve = warp::path!("api" / "disbursals" / Id / "approve")
		.and(warp::patch())
		.and(with_pool(pool))
		.and(with_actor())
		.and(warp::body::json())
		.and_then(approve_disbursal);

	new.or(allocated).or(pending).or(disbursed).or(get).or(allocate).or(recommend).or(approve)
}

fn account_routes(pool: PgPool) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
	let to_verify = warp::path!("api" / "accounts" / "verify")
		.and(warp::get())
		.and(with_pool(pool.clone()))
		.and(with_actor())
		.and_then(list_leads_to_verify);

	let request = warp::path!("api" / "accounts" / "request" / String)
		.and(warp::patch())
		.and(with_pool(pool.clone()))
		.and(with_actor())
		.and(warp::body::json())
		.and_then(request_status);

	let partial = warp::path!("api" / "accounts" / "partial" / String)
		.and(warp::post())
		.and(with_pool(pool.clone()))
		.and(with_actor())
		.and(warp::body::json())
		.and_then(report_partial_payment);

	let verify = warp::path!("api" / "accounts" / "verify" / String)
		.and(warp::patch())
		.and(with_pool(pool.clone()))
		.and(with_actor())
		.and(warp::body::json())
		.and_then(verify_active_loan);

	let reject_verification = warp::path!("api" / "accounts" / "verify" / "reject" / String)
		.and(warp::patch())
		.and(with_pool(pool))
		.and(with_actor())
		.and_then(reject_payment_verification);

	to_verify.or(request).or(partial).or(reject_verification).or(verify)
}

fn rejection_routes(pool: PgPool) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
	let reject = warp::path!("api" / "reject" / Id)
		.and(warp::patch())
		.and(with_pool(pool.clone()))
		.and(with_actor())
		.and(warp::body::json())
		.and_then(reject_record);

	let list = warp::path!("api" / "rejected")
		.and(warp::get())
		.and(with_pool(pool))
		.and(with_actor())
		.and(warp::query::<PageQuery>())
		.and_then(list_rejected);

	reject.or(list)
}

// ---- handlers ----

async fn create_lead(pool: PgPool, intake: LeadIntake) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let lead = ctx.service(&providers).create_lead(intake).map_err(reject)?;
	Ok(warp::reply::json(&lead))
}

async fn list_leads(pool: PgPool, page: PageQuery) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let leads = ctx.service(&providers).list_unallocated_leads(page.page()).map_err(reject)?;
	Ok(warp::reply::json(&leads))
}

async fn list_allocated_leads(pool: PgPool, employee_id: Id, role: Role, page: PageQuery) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let actor = ctx.actor(&employee_id, role)?;
	let leads = ctx.service(&providers).list_allocated_leads(&actor, page.page()).map_err(reject)?;
	Ok(warp::reply::json(&leads))
}

async fn get_lead(id: Id, pool: PgPool) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let lead = ctx.service(&providers).get_lead(&id).map_err(reject)?;
	Ok(warp::reply::json(&lead))
}

async fn lead_logs(id: Id, pool: PgPool) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let logs = ctx.service(&providers).lead_logs(&id).map_err(reject)?;
	Ok(warp::reply::json(&logs))
}

async fn allocate_lead(id: Id, pool: PgPool, employee_id: Id, role: Role) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let actor = ctx.actor(&employee_id, role)?;
	let lead = ctx.service(&providers).allocate_lead(&actor, &id).map_err(reject)?;
	Ok(warp::reply::json(&lead))
}

async fn update_lead(id: Id, pool: PgPool, employee_id: Id, role: Role, changes: UpdateLead) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let actor = ctx.actor(&employee_id, role)?;
	let lead = ctx.service(&providers).update_lead(&actor, &id, changes).map_err(reject)?;
	Ok(warp::reply::json(&lead))
}

async fn hold_lead(id: Id, pool: PgPool, employee_id: Id, role: Role, body: HoldRequest) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let actor = ctx.actor(&employee_id, role)?;
	let lead = ctx.service(&providers).hold_lead(&actor, &id, body.on_hold).map_err(reject)?;
	Ok(warp::reply::json(&lead))
}

async fn recommend_lead(id: Id, pool: PgPool, employee_id: Id, role: Role) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let actor = ctx.actor(&employee_id, role)?;
	let application = ctx.service(&providers).recommend_lead(&actor, &id).map_err(reject)?;
	Ok(warp::reply::json(&application))
}

async fn verify_email(id: Id, pool: PgPool, employee_id: Id, role: Role) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let actor = ctx.actor(&employee_id, role)?;
	ctx.service(&providers).verify_email(&actor, &id).map_err(reject)?;
	Ok(warp::reply::json(&Message {
		success: true,
		message: "Email is now verified.".into(),
	}))
}

async fn fetch_cibil(id: Id, pool: PgPool, employee_id: Id, role: Role) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let actor = ctx.actor(&employee_id, role)?;
	let score = ctx.service(&providers).fetch_cibil(&actor, &id).map_err(reject)?;
	Ok(warp::reply::json(&json!({ "success": true, "value": score })))
}

async fn send_mobile_otp(pool: PgPool, body: OtpRequest) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	ctx.service(&providers)
		.send_mobile_otp(&body.mobile, &body.f_name, &body.l_name)
		.map_err(reject)?;
	Ok(warp::reply::json(&Message {
		success: true,
		message: "OTP sent successfully".into(),
	}))
}

async fn verify_mobile_otp(pool: PgPool, body: OtpVerifyRequest) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	ctx.service(&providers).verify_mobile_otp(&body.mobile, &body.otp).map_err(reject)?;
	Ok(warp::reply::json(&Message {
		success: true,
		message: "OTP verified successfully".into(),
	}))
}

async fn verify_lead_mobile(id: Id, pool: PgPool, employee_id: Id, role: Role, body: LeadOtpRequest) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let actor = ctx.actor(&employee_id, role)?;
	let lead = ctx.service(&providers).verify_lead_mobile(&actor, &id, &body.otp).map_err(reject)?;
	Ok(warp::reply::json(&lead))
}

async fn save_pan_record(pool: PgPool, body: PanRecordRequest) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let record = ctx
		.service(&providers)
		.save_pan_record(&body.pan, &body.full_name, &body.gender, body.dob)
		.map_err(reject)?;
	Ok(warp::reply::json(&record))
}

async fn verify_pan(id: Id, pool: PgPool, employee_id: Id, role: Role) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let actor = ctx.actor(&employee_id, role)?;
	let lead = ctx.service(&providers).verify_pan(&actor, &id).map_err(reject)?;
	Ok(warp::reply::json(&lead))
}

async fn verify_aadhaar(id: Id, pool: PgPool, employee_id: Id, role: Role) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let actor = ctx.actor(&employee_id, role)?;
	let lead = ctx.service(&providers).verify_aadhaar(&actor, &id).map_err(reject)?;
	Ok(warp::reply::json(&lead))
}

async fn list_applications(pool: PgPool, employee_id: Id, role: Role, page: PageQuery) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let actor = ctx.actor(&employee_id, role)?;
	let applications = ctx.service(&providers).list_unallocated_applications(&actor, page.page()).map_err(reject)?;
	Ok(warp::reply::json(&applications))
}

async fn list_allocated_applications(pool: PgPool, employee_id: Id, role: Role, page: PageQuery) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let actor = ctx.actor(&employee_id, role)?;
	let applications = ctx.service(&providers).list_allocated_applications(&actor, page.page()).map_err(reject)?;
	Ok(warp::reply::json(&applications))
}

async fn get_application(id: Id, pool: PgPool) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let application = ctx.service(&providers).get_application(&id).map_err(reject)?;
	Ok(warp::reply::json(&application))
}

async fn get_applicant(id: Id, pool: PgPool) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let (applicant, references) = ctx.service(&providers).get_applicant(&id).map_err(reject)?;
	Ok(warp::reply::json(&json!({ "applicant": applicant, "reference": references })))
}

async fn allocate_application(id: Id, pool: PgPool, employee_id: Id, role: Role, body: AllocateRequest) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let actor = ctx.actor(&employee_id, role)?;
	let application = ctx.service(&providers).allocate_application(&actor, &id, body.assignee).map_err(reject)?;
	Ok(warp::reply::json(&application))
}

async fn update_applicant(id: Id, pool: PgPool, employee_id: Id, role: Role, body: ApplicantUpdateRequest) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let actor = ctx.actor(&employee_id, role)?;
	let references = body
		.reference
		.map(|refs| refs.into_iter().map(|r| (r.name, r.mobile, r.relation)).collect());
	let applicant = ctx
		.service(&providers)
		.update_applicant(&actor, &id, body.details, references)
		.map_err(reject)?;
	Ok(warp::reply::json(&applicant))
}

async fn add_bank_account(id: Id, pool: PgPool, employee_id: Id, role: Role, details: BankDetails) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let actor = ctx.actor(&employee_id, role)?;
	let bank = ctx.service(&providers).add_bank_account(&actor, &id, details).map_err(reject)?;
	Ok(warp::reply::json(&bank))
}

async fn update_bank_account(id: Id, pool: PgPool, employee_id: Id, role: Role, details: BankDetails) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let actor = ctx.actor(&employee_id, role)?;
	let bank = ctx.service(&providers).update_bank_account(&actor, &id, details).map_err(reject)?;
	Ok(warp::reply::json(&bank))
}

async fn get_bank_account(id: Id, pool: PgPool) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let bank = ctx.service(&providers).get_bank_account(&id).map_err(reject)?;
	Ok(warp::reply::json(&bank))
}

async fn get_cam(id: Id, pool: PgPool) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let cam = ctx.service(&providers).get_cam(&id).map_err(reject)?;
	Ok(warp::reply::json(&json!({ "details": cam })))
}

async fn update_cam_details(id: Id, pool: PgPool, employee_id: Id, role: Role, body: CamUpdateRequest) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let actor = ctx.actor(&employee_id, role)?;
	let cam = ctx.service(&providers).update_cam(&actor, &id, body.details).map_err(reject)?;
	Ok(warp::reply::json(&json!({ "success": true, "details": cam })))
}

async fn recommend_application(id: Id, pool: PgPool, employee_id: Id, role: Role) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let actor = ctx.actor(&employee_id, role)?;
	let sanction = ctx.service(&providers).recommend_application(&actor, &id).map_err(reject)?;
	Ok(warp::reply::json(&sanction))
}

async fn list_pending_sanctions(pool: PgPool, employee_id: Id, role: Role, page: PageQuery) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let actor = ctx.actor(&employee_id, role)?;
	let sanctions = ctx.service(&providers).list_pending_sanctions(&actor, page.page()).map_err(reject)?;
	Ok(warp::reply::json(&sanctions))
}

async fn list_esign_pending(pool: PgPool, employee_id: Id, role: Role, page: PageQuery) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let actor = ctx.actor(&employee_id, role)?;
	let sanctions = ctx.service(&providers).list_esign_pending(&actor, page.page()).map_err(reject)?;
	Ok(warp::reply::json(&sanctions))
}

async fn list_recommended_sanctions(pool: PgPool, employee_id: Id, role: Role, page: PageQuery) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let actor = ctx.actor(&employee_id, role)?;
	let sanctions = ctx.service(&providers).list_recommended_sanctions(&actor, page.page()).map_err(reject)?;
	Ok(warp::reply::json(&sanctions))
}

async fn list_sanctioned(pool: PgPool, employee_id: Id, role: Role) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let actor = ctx.actor(&employee_id, role)?;
	let rows = ctx.service(&providers).list_sanctioned(&actor).map_err(reject)?;
	Ok(warp::reply::json(&rows))
}

async fn sanction_preview(id: Id, pool: PgPool, employee_id: Id, role: Role) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let actor = ctx.actor(&employee_id, role)?;
	let letter = ctx.service(&providers).sanction_letter(&actor, &id).map_err(reject)?;
	Ok(warp::reply::json(&letter))
}

async fn get_sanction(id: Id, pool: PgPool) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let sanction = ctx.service(&providers).get_sanction(&id).map_err(reject)?;
	Ok(warp::reply::json(&sanction))
}

async fn approve_sanction(id: Id, pool: PgPool, employee_id: Id, role: Role) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let actor = ctx.actor(&employee_id, role)?;
	let sanction = ctx.service(&providers).approve_sanction(&actor, &id).map_err(reject)?;
	Ok(warp::reply::json(&sanction))
}

async fn send_esign(id: Id, pool: PgPool, employee_id: Id, role: Role) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let actor = ctx.actor(&employee_id, role)?;
	let disbursal = ctx.service(&providers).send_esign(&actor, &id).map_err(reject)?;
	Ok(warp::reply::json(&disbursal))
}

async fn complete_esign(id: Id, pool: PgPool) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let sanction = ctx.service(&providers).complete_esign(&id).map_err(reject)?;
	Ok(warp::reply::json(&sanction))
}

async fn list_new_disbursals(pool: PgPool, employee_id: Id, role: Role, page: PageQuery) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let actor = ctx.actor(&employee_id, role)?;
	let disbursals = ctx.service(&providers).list_new_disbursals(&actor, page.page()).map_err(reject)?;
	Ok(warp::reply::json(&disbursals))
}

async fn list_allocated_disbursals(pool: PgPool, employee_id: Id, role: Role, page: PageQuery) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let actor = ctx.actor(&employee_id, role)?;
	let disbursals = ctx.service(&providers).list_allocated_disbursals(&actor, page.page()).map_err(reject)?;
	Ok(warp::reply::json(&disbursals))
}

async fn list_pending_disbursals(pool: PgPool, employee_id: Id, role: Role, page: PageQuery) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let actor = ctx.actor(&employee_id, role)?;
	let disbursals = ctx.service(&providers).list_pending_disbursals(&actor, page.page()).map_err(reject)?;
	Ok(warp::reply::json(&disbursals))
}

async fn list_disbursed(pool: PgPool, employee_id: Id, role: Role) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let actor = ctx.actor(&employee_id, role)?;
	let rows = ctx.service(&providers).list_disbursed(&actor).map_err(reject)?;
	Ok(warp::reply::json(&rows))
}

async fn get_disbursal(id: Id, pool: PgPool) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let (disbursal, cam) = ctx.service(&providers).get_disbursal(&id).map_err(reject)?;
	Ok(warp::reply::json(&json!({ "disbursal": disbursal, "cam": cam })))
}

async fn allocate_disbursal(id: Id, pool: PgPool, employee_id: Id, role: Role) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let actor = ctx.actor(&employee_id, role)?;
	let disbursal = ctx.service(&providers).allocate_disbursal(&actor, &id).map_err(reject)?;
	Ok(warp::reply::json(&disbursal))
}

async fn recommend_disbursal(id: Id, pool: PgPool, employee_id: Id, role: Role, body: RecommendDisbursalRequest) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let actor = ctx.actor(&employee_id, role)?;
	let disbursal = ctx.service(&providers).recommend_disbursal(&actor, &id, &body.remarks).map_err(reject)?;
	Ok(warp::reply::json(&disbursal))
}

async fn approve_disbursal(id: Id, pool: PgPool, employee_id: Id, role: Role, body: PaymentRequest) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let actor = ctx.actor(&employee_id, role)?;
	let payment = disbursal::Payment {
		payable_account: &body.payable_account,
		payment_mode: &body.payment_mode,
		amount: &body.amount,
		channel: &body.channel,
		utr: &body.utr,
		disbursed_at: body.disbursal_date,
	};
	let disbursal = ctx.service(&providers).approve_disbursal(&actor, &id, payment).map_err(reject)?;
	Ok(warp::reply::json(&disbursal))
}

async fn list_leads_to_verify(pool: PgPool, employee_id: Id, role: Role) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let actor = ctx.actor(&employee_id, role)?;
	let rows = ctx.service(&providers).list_leads_to_verify(&actor).map_err(reject)?;
	Ok(warp::reply::json(&rows))
}

async fn request_status(loan_no: String, pool: PgPool, employee_id: Id, role: Role, body: StatusRequest) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let actor = ctx.actor(&employee_id, role)?;
	let evidence = Evidence {
		closing_date: body.closing_date,
		closing_amount: body.closing_amount,
		utr: body.utr,
		dpd: body.dpd,
	};
	let entry = ctx
		.service(&providers)
		.request_status(&actor, &loan_no, body.status, evidence)
		.map_err(reject)?;
	Ok(warp::reply::json(&entry))
}

async fn report_partial_payment(loan_no: String, pool: PgPool, employee_id: Id, role: Role, body: PartialPaymentRequest) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let actor = ctx.actor(&employee_id, role)?;
	ctx.service(&providers)
		.report_partial_payment(&actor, &loan_no, body.paid_on, &body.amount, &body.utr, body.requested_status)
		.map_err(reject)?;
	Ok(warp::reply::json(&Message {
		success: true,
		message: "Payment recorded".into(),
	}))
}

async fn verify_active_loan(loan_no: String, pool: PgPool, employee_id: Id, role: Role, body: VerifyLoanRequest) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let actor = ctx.actor(&employee_id, role)?;
	ctx.service(&providers)
		.verify_active_loan(&actor, &loan_no, body.utr.as_deref(), body.status)
		.map_err(reject)?;
	Ok(warp::reply::json(&Message {
		success: true,
		message: format!("Record updated successfully. Status {} is now verified.", body.status),
	}))
}

async fn reject_payment_verification(loan_no: String, pool: PgPool, employee_id: Id, role: Role) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let actor = ctx.actor(&employee_id, role)?;
	ctx.service(&providers).reject_payment_verification(&actor, &loan_no).map_err(reject)?;
	Ok(warp::reply::json(&Message {
		success: true,
		message: "Requested status has been removed.".into(),
	}))
}

async fn reject_record(id: Id, pool: PgPool, employee_id: Id, role: Role, body: RejectRequest) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let actor = ctx.actor(&employee_id, role)?;
	ctx.service(&providers).reject(&actor, &id, &body.reason).map_err(reject)?;
	Ok(warp::reply::json(&Message {
		success: true,
		message: "Record rejected".into(),
	}))
}

async fn list_rejected(pool: PgPool, employee_id: Id, role: Role, page: PageQuery) -> Result<impl Reply, Rejection> {
	let ctx = Context::new(pool);
	let providers = Providers::new();
	let actor = ctx.actor(&employee_id, role)?;
	let records = ctx.service(&providers).list_rejected(&actor, page.page()).map_err(reject)?;
	Ok(warp::reply::json(&records))
}

// ---- error mapping ----

#[derive(Debug)]
struct ApiError(Error);

impl warp::reject::Reject for ApiError {}

fn reject(e: Error) -> Rejection {
	warp::reject::custom(ApiError(e))
}

fn status_for(e: &Error) -> StatusCode {
	match e.kind() {
		ErrorKind::Database(db::Error::RecordNotFound) => StatusCode::NOT_FOUND,
		ErrorKind::Database(db::Error::RecordAlreadyExists) => StatusCode::BAD_REQUEST,
		ErrorKind::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
		ErrorKind::NotFound(_) => StatusCode::NOT_FOUND,
		ErrorKind::NotAuthorized(_) => StatusCode::UNAUTHORIZED,
		ErrorKind::Conflict(_) => StatusCode::BAD_REQUEST,
		ErrorKind::NotReady(_) => StatusCode::BAD_REQUEST,
		ErrorKind::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
	}
}

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
	let (status, message) = if err.is_not_found() {
		(StatusCode::NOT_FOUND, "route not found".to_string())
	} else if let Some(ApiError(e)) = err.find::<ApiError>() {
		(status_for(e), e.to_string())
	} else if err.find::<warp::filters::body::BodyDeserializeError>().is_some() {
		(StatusCode::BAD_REQUEST, "invalid request body".to_string())
	} else if err.find::<warp::reject::InvalidHeader>().is_some()
		|| err.find::<warp::reject::MissingHeader>().is_some()
	{
		(StatusCode::UNAUTHORIZED, "missing or invalid actor headers".to_string())
	} else {
		(StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
	};

	let body = warp::reply::json(&Message {
		success: false,
		message,
	});
	Ok(warp::reply::with_status(body, status))
}
