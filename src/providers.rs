use std::fmt;

use serde::Serialize;

use crate::types::Date;

/// Failure reported by a third-party service, passed through to the caller
#[derive(Debug, PartialEq)]
pub struct ProviderError(pub String);

impl fmt::Display for ProviderError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

pub trait Calendar {
	/// Gets the current date
	fn current_date(&self) -> Date {
		chrono::Utc::today().naive_utc()
	}
}

/// Wall-clock calendar used outside of tests
pub struct SystemCalendar;

impl Calendar for SystemCalendar {}

/// Identity details the credit bureau wants with a score inquiry
#[derive(Debug, Clone)]
pub struct ScoreInquiry {
	pub f_name: String,
	pub m_name: Option<String>,
	pub l_name: Option<String>,
	pub dob: Date,
	pub mobile: String,
	pub pan: String,
	pub city: String,
	pub state: String,
	pub pin_code: String,
}

/// Credit bureau (CIBIL/Equifax) consumed as an opaque service
pub trait CreditBureau {
	fn fetch_score(&self, inquiry: &ScoreInquiry) -> ProviderResult<i16>;
}

/// Penny-drop style bank account verification
pub trait BankVerifier {
	fn verify_account(&self, account_no: &str, ifsc_code: &str) -> ProviderResult<()>;
}

/// Everything the sanction letter carries to the applicant
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SanctionLetter {
	pub loan_no: String,
	pub title: String,
	pub full_name: String,
	pub pan: String,
	pub mobile: String,
	pub email: String,
	pub sanction_date: Date,
	pub residence_address: Option<String>,
	pub state_country: Option<String>,
	pub loan_recommended: Option<bigdecimal::BigDecimal>,
	pub roi: Option<bigdecimal::BigDecimal>,
	pub tenure_days: Option<i16>,
	pub repayment_date: Option<Date>,
	pub repayment_amount: Option<bigdecimal::BigDecimal>,
}

/// E-signature provider; returns its reference for the signature request
pub trait EsignProvider {
	fn send_for_signature(&self, letter: &SanctionLetter, aadhaar: &str) -> ProviderResult<String>;
}

/// Transactional mail gateway
pub trait MailGateway {
	fn send(&self, to: &str, subject: &str, body: &str) -> ProviderResult<()>;
}

/// SMS gateway delivering one-time passwords
pub trait OtpGateway {
	fn send_otp(&self, mobile: &str, name: &str, otp: &str) -> ProviderResult<()>;
}
