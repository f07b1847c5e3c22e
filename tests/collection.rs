mod common;

use bigdecimal::BigDecimal;

use origination_api::*;
use origination_api::ledger::{Evidence, RequestedStatus};
use origination_api::origination::ErrorKind;

use crate::common::*;

struct Disbursed {
	loan_no: String,
}

/// Sets up one fully disbursed loan and returns its loan number
fn disbursed_loan(svc: &origination_api::origination::Service, suite: &Suite, fixture: &Fixture) -> Disbursed {
	let screener = fixture.employee_factory.screener();
	let credit_manager = fixture.employee_factory.credit_manager();
	let sanction_head = fixture.employee_factory.sanction_head();
	let disbursal_manager = fixture.employee_factory.disbursal_manager();
	let disbursal_head = fixture.employee_factory.disbursal_head();

	let sanction = originate_to_sanction(
		svc,
		suite,
		"ABCPD1234E",
		"9876543210",
		"50100123456789",
		&screener,
		&credit_manager,
		&sanction_head,
	);
	let disbursal = disburse(svc, suite, &sanction, &sanction_head, &disbursal_manager, &disbursal_head);

	Disbursed { loan_no: disbursal.loan_no }
}

#[test]
#[ignore = "needs a database"]
fn a_requested_closure_is_verified_and_applied() {
	let fixture = Fixture::new();
	let suite = Suite::setup(&fixture);
	let providers = TestProviders::new();
	let svc = suite.service(&fixture, &providers);

	let loan = disbursed_loan(&svc, &suite, &fixture);
	let collector = Actor::new(fixture.employee_factory.collection_executive(), Role::CollectionExecutive);
	let accountant = Actor::new(fixture.employee_factory.account_executive(), Role::AccountExecutive);

	svc.request_status(&collector, &loan.loan_no, RequestedStatus::Closed, Evidence {
		closing_date: Some(Date::from_ymd(2024, 3, 31)),
		closing_amount: Some(BigDecimal::from(48000)),
		utr: Some("UTRCLOSE1".into()),
		dpd: None,
	}).unwrap();

	// the work queue now surfaces the loan
	let queue = svc.list_leads_to_verify(&accountant).unwrap();
	assert_eq!(queue.len(), 1);
	assert_eq!(queue[0].loan_no, loan.loan_no);

	svc.verify_active_loan(&accountant, &loan.loan_no, None, RequestedStatus::Closed).unwrap();

	let entry = suite.ledger_repo.find_by_loan_no(&loan.loan_no).unwrap();
	assert!(entry.is_closed);
	assert!(entry.is_verified);
	assert!(!entry.is_active);
	assert!(entry.requested_status.is_none());

	let status = suite.status_repo.find_by_lead_no(&entry.lead_no).unwrap();
	assert_eq!(status.stage, origination_api::Stage::Closed);
}

#[test]
#[ignore = "needs a database"]
fn a_write_off_marks_the_loan_defaulted() {
	let fixture = Fixture::new();
	let suite = Suite::setup(&fixture);
	let providers = TestProviders::new();
	let svc = suite.service(&fixture, &providers);

	let loan = disbursed_loan(&svc, &suite, &fixture);
	let collector = Actor::new(fixture.employee_factory.collection_executive(), Role::CollectionExecutive);
	let accountant = Actor::new(fixture.employee_factory.account_executive(), Role::AccountExecutive);

	svc.request_status(&collector, &loan.loan_no, RequestedStatus::WriteOff, Evidence {
		dpd: Some(120),
		..Default::default()
	}).unwrap();
	svc.verify_active_loan(&accountant, &loan.loan_no, None, RequestedStatus::WriteOff).unwrap();

	let entry = suite.ledger_repo.find_by_loan_no(&loan.loan_no).unwrap();
	assert!(entry.is_write_off);
	assert!(entry.defaulted);
	assert!(!entry.is_active);
}

#[test]
#[ignore = "needs a database"]
fn mismatched_statuses_do_not_verify() {
	let fixture = Fixture::new();
	let suite = Suite::setup(&fixture);
	let providers = TestProviders::new();
	let svc = suite.service(&fixture, &providers);

	let loan = disbursed_loan(&svc, &suite, &fixture);
	let collector = Actor::new(fixture.employee_factory.collection_executive(), Role::CollectionExecutive);
	let accountant = Actor::new(fixture.employee_factory.account_executive(), Role::AccountExecutive);

	svc.request_status(&collector, &loan.loan_no, RequestedStatus::Settled, Evidence::default()).unwrap();

	let err = svc
		.verify_active_loan(&accountant, &loan.loan_no, None, RequestedStatus::Closed)
		.unwrap_err();
	assert!(matches!(err.kind(), ErrorKind::Conflict(_)));

	// nothing moved
	let entry = suite.ledger_repo.find_by_loan_no(&loan.loan_no).unwrap();
	assert!(entry.is_active);
	assert!(!entry.is_verified);
	assert_eq!(entry.requested_status, Some(RequestedStatus::Settled));
}

#[test]
#[ignore = "needs a database"]
fn part_payments_are_verified_one_utr_at_a_time() {
	let fixture = Fixture::new();
	let suite = Suite::setup(&fixture);
	let providers = TestProviders::new();
	let svc = suite.service(&fixture, &providers);

	let loan = disbursed_loan(&svc, &suite, &fixture);
	let collector = Actor::new(fixture.employee_factory.collection_executive(), Role::CollectionExecutive);
	let accountant = Actor::new(fixture.employee_factory.account_executive(), Role::AccountExecutive);

	let amount = BigDecimal::from(10000);
	svc.report_partial_payment(&collector, &loan.loan_no, Date::from_ymd(2024, 3, 15), &amount, "UTRPART1", Some(RequestedStatus::Settled)).unwrap();

	// resolving the whole loan is blocked while a part-payment is pending
	let err = svc
		.verify_active_loan(&accountant, &loan.loan_no, None, RequestedStatus::Settled)
		.unwrap_err();
	assert!(matches!(err.kind(), ErrorKind::Conflict(_)));

	svc.verify_active_loan(&accountant, &loan.loan_no, Some("UTRPART1"), RequestedStatus::Settled).unwrap();

	let entry = suite.ledger_repo.find_by_loan_no(&loan.loan_no).unwrap();
	let payments = suite.ledger_repo.partial_payments(&entry.id).unwrap();
	assert_eq!(payments.len(), 1);
	assert!(payments[0].is_partly_paid);
	// the loan itself stays active until its own resolution is verified
	assert!(entry.is_active);
}

#[test]
#[ignore = "needs a database"]
fn an_unreceived_payment_clears_the_request() {
	let fixture = Fixture::new();
	let suite = Suite::setup(&fixture);
	let providers = TestProviders::new();
	let svc = suite.service(&fixture, &providers);

	let loan = disbursed_loan(&svc, &suite, &fixture);
	let collector = Actor::new(fixture.employee_factory.collection_executive(), Role::CollectionExecutive);
	let accountant = Actor::new(fixture.employee_factory.account_executive(), Role::AccountExecutive);

	svc.request_status(&collector, &loan.loan_no, RequestedStatus::Closed, Evidence::default()).unwrap();
	svc.reject_payment_verification(&accountant, &loan.loan_no).unwrap();

	let entry = suite.ledger_repo.find_by_loan_no(&loan.loan_no).unwrap();
	assert!(entry.requested_status.is_none());
	assert!(entry.is_active);
}

#[test]
#[ignore = "needs a database"]
fn collection_roles_are_enforced() {
	let fixture = Fixture::new();
	let suite = Suite::setup(&fixture);
	let providers = TestProviders::new();
	let svc = suite.service(&fixture, &providers);

	let loan = disbursed_loan(&svc, &suite, &fixture);
	let collector = Actor::new(fixture.employee_factory.collection_executive(), Role::CollectionExecutive);
	let accountant = Actor::new(fixture.employee_factory.account_executive(), Role::AccountExecutive);

	// the collection executive cannot verify their own request
	svc.request_status(&collector, &loan.loan_no, RequestedStatus::Closed, Evidence::default()).unwrap();
	let err = svc
		.verify_active_loan(&collector, &loan.loan_no, None, RequestedStatus::Closed)
		.unwrap_err();
	assert!(matches!(err.kind(), ErrorKind::NotAuthorized(_)));

	// and the account executive cannot file requests
	let err = svc
		.request_status(&accountant, &loan.loan_no, RequestedStatus::Closed, Evidence::default())
		.unwrap_err();
	assert!(matches!(err.kind(), ErrorKind::NotAuthorized(_)));
}
