mod common;

use origination_api::*;
use origination_api::lead_status::Stage;
use origination_api::origination::ErrorKind;

use crate::common::*;

#[test]
#[ignore = "needs a database"]
fn lead_travels_the_full_pipeline() {
	let fixture = Fixture::new();
	let suite = Suite::setup(&fixture);
	let providers = TestProviders::new();
	let svc = suite.service(&fixture, &providers);

	let screener = fixture.employee_factory.screener();
	let credit_manager = fixture.employee_factory.credit_manager();
	let sanction_head = fixture.employee_factory.sanction_head();
	let disbursal_manager = fixture.employee_factory.disbursal_manager();
	let disbursal_head = fixture.employee_factory.disbursal_head();

	let sanction = originate_to_sanction(
		&svc,
		&suite,
		"ABCPD1234E",
		"9876543210",
		"50100123456789",
		&screener,
		&credit_manager,
		&sanction_head,
	);

	assert!(sanction.is_approved);
	let loan_no = sanction.loan_no.clone().expect("loan number allotted at approval");
	assert!(loan_no.starts_with("LN"));

	// the ledger gained exactly one active row for this PAN
	let active = suite.ledger_repo.find_active_by_pan("ABCPD1234E").unwrap().unwrap();
	assert_eq!(active.loan_no, loan_no);
	assert!(!active.is_disbursed);

	let disbursal = disburse(&svc, &suite, &sanction, &sanction_head, &disbursal_manager, &disbursal_head);
	assert!(disbursal.is_disbursed);
	assert_eq!(disbursal.utr.as_deref(), Some("UTR0001"));

	let entry = suite.ledger_repo.find_by_loan_no(&loan_no).unwrap();
	assert!(entry.is_disbursed);
	assert!(entry.is_active);
	assert_eq!(entry.disbursal_id, Some(disbursal.id));

	let lead = suite.lead_repo.find_by_lead_no(&sanction.lead_no).unwrap();
	assert!(lead.is_recommended);
	let status = suite.status_repo.find_by_id(&lead.status_id).unwrap();
	assert_eq!(status.stage, Stage::Disbursal);
	assert!(status.is_approved);

	let sanction = suite.sanction_repo.find_by_id(&sanction.id).unwrap();
	assert!(sanction.e_signed);
}

#[test]
#[ignore = "needs a database"]
fn a_pan_with_an_active_loan_cannot_be_sanctioned_again() {
	let fixture = Fixture::new();
	let suite = Suite::setup(&fixture);
	let providers = TestProviders::new();
	let svc = suite.service(&fixture, &providers);

	let screener = fixture.employee_factory.screener();
	let credit_manager = fixture.employee_factory.credit_manager();
	let sanction_head = fixture.employee_factory.sanction_head();

	originate_to_sanction(
		&svc,
		&suite,
		"ABCPD1234E",
		"9876543210",
		"50100123456789",
		&screener,
		&credit_manager,
		&sanction_head,
	);

	// same PAN, fresh journey up to the sanction head's desk
	let screener_actor = Actor::new(screener.clone(), Role::Screener);
	let cm_actor = Actor::new(credit_manager.clone(), Role::CreditManager);
	let sh_actor = Actor::new(sanction_head.clone(), Role::SanctionHead);

	let lead = svc.create_lead(intake("ABCPD1234E", "9876500000")).unwrap();
	svc.allocate_lead(&screener_actor, &lead.id).unwrap();
	svc.verify_email(&screener_actor, &lead.id).unwrap();
	svc.send_mobile_otp("9876500000", "Asha", "Rao").unwrap();
	let otp = suite.otp_repo.find_by_mobile("9876500000").unwrap().otp;
	svc.verify_lead_mobile(&screener_actor, &lead.id, &otp).unwrap();
	svc.fetch_cibil(&screener_actor, &lead.id).unwrap();
	let application = svc.recommend_lead(&screener_actor, &lead.id).unwrap();
	svc.allocate_application(&cm_actor, &application.id, None).unwrap();
	svc.update_cam(&cm_actor, &application.id, origination_api::cam::UpdateCam {
		loan_recommended: Some(bigdecimal::BigDecimal::from(30000)),
		roi: Some(bigdecimal::BigDecimal::from(1)),
		disbursal_date: Some(Date::from_ymd(2024, 3, 1)),
		repayment_date: Some(Date::from_ymd(2024, 3, 31)),
		..Default::default()
	}).unwrap();
	svc.add_bank_account(&cm_actor, &application.id, bank_details("50100987654321")).unwrap();
	let sanction = svc.recommend_application(&cm_actor, &application.id).unwrap();

	let err = svc.approve_sanction(&sh_actor, &sanction.id).unwrap_err();
	match err.kind() {
		ErrorKind::Conflict(msg) => assert!(msg.contains("active loan")),
		other => panic!("expected a conflict, got {:?}", other),
	}

	// the failed approval allotted nothing
	let sanction = suite.sanction_repo.find_by_id(&sanction.id).unwrap();
	assert!(!sanction.is_approved);
	assert!(sanction.loan_no.is_none());
}

#[test]
#[ignore = "needs a database"]
fn only_the_sanction_head_can_approve() {
	let fixture = Fixture::new();
	let suite = Suite::setup(&fixture);
	let providers = TestProviders::new();
	let svc = suite.service(&fixture, &providers);

	let screener = fixture.employee_factory.screener();
	let credit_manager = fixture.employee_factory.credit_manager();
	let sanction_head = fixture.employee_factory.sanction_head();

	let screener_actor = Actor::new(screener.clone(), Role::Screener);
	let cm_actor = Actor::new(credit_manager.clone(), Role::CreditManager);

	let lead = svc.create_lead(intake("ABCPD1234E", "9876543210")).unwrap();
	svc.allocate_lead(&screener_actor, &lead.id).unwrap();
	svc.verify_email(&screener_actor, &lead.id).unwrap();
	svc.send_mobile_otp("9876543210", "Asha", "Rao").unwrap();
	let otp = suite.otp_repo.find_by_mobile("9876543210").unwrap().otp;
	svc.verify_lead_mobile(&screener_actor, &lead.id, &otp).unwrap();
	svc.fetch_cibil(&screener_actor, &lead.id).unwrap();
	let application = svc.recommend_lead(&screener_actor, &lead.id).unwrap();
	svc.allocate_application(&cm_actor, &application.id, None).unwrap();
	svc.update_cam(&cm_actor, &application.id, origination_api::cam::UpdateCam {
		loan_recommended: Some(bigdecimal::BigDecimal::from(30000)),
		..Default::default()
	}).unwrap();
	svc.add_bank_account(&cm_actor, &application.id, bank_details("50100123456789")).unwrap();
	let sanction = svc.recommend_application(&cm_actor, &application.id).unwrap();

	// the credit manager who recommended it cannot approve it
	let err = svc.approve_sanction(&cm_actor, &sanction.id).unwrap_err();
	assert!(matches!(err.kind(), ErrorKind::NotAuthorized(_)));

	// the sanction head acting under a different role cannot either
	let masquerading = Actor::new(sanction_head.clone(), Role::CreditManager);
	let err = svc.approve_sanction(&masquerading, &sanction.id).unwrap_err();
	assert!(matches!(err.kind(), ErrorKind::NotAuthorized(_)));
}

#[test]
#[ignore = "needs a database"]
fn screeners_only_touch_their_own_leads() {
	let fixture = Fixture::new();
	let suite = Suite::setup(&fixture);
	let providers = TestProviders::new();
	let svc = suite.service(&fixture, &providers);

	let screener = fixture.employee_factory.screener();
	let other = fixture.employee_factory.second_screener();

	let screener_actor = Actor::new(screener.clone(), Role::Screener);
	let other_actor = Actor::new(other.clone(), Role::Screener);

	let lead = svc.create_lead(intake("ABCPD1234E", "9876543210")).unwrap();
	svc.allocate_lead(&screener_actor, &lead.id).unwrap();

	let err = svc
		.update_lead(&other_actor, &lead.id, origination_api::lead::UpdateLead {
			city: Some("Pune".into()),
			..Default::default()
		})
		.unwrap_err();
	assert!(matches!(err.kind(), ErrorKind::NotAuthorized(_)));

	let err = svc.fetch_cibil(&other_actor, &lead.id).unwrap_err();
	assert!(matches!(err.kind(), ErrorKind::NotAuthorized(_)));
}

#[test]
#[ignore = "needs a database"]
fn unverified_leads_cannot_be_recommended() {
	let fixture = Fixture::new();
	let suite = Suite::setup(&fixture);
	let providers = TestProviders::new();
	let svc = suite.service(&fixture, &providers);

	let screener = fixture.employee_factory.screener();
	let screener_actor = Actor::new(screener.clone(), Role::Screener);

	let lead = svc.create_lead(intake("ABCPD1234E", "9876543210")).unwrap();
	svc.allocate_lead(&screener_actor, &lead.id).unwrap();

	let err = svc.recommend_lead(&screener_actor, &lead.id).unwrap_err();
	match err.kind() {
		ErrorKind::NotReady(msg) => {
			assert!(msg.contains("mobile is not verified"));
			assert!(msg.contains("email is not verified"));
			assert!(msg.contains("credit score"));
		}
		other => panic!("expected not-ready, got {:?}", other),
	}
}

#[test]
#[ignore = "needs a database"]
fn rejection_flips_the_status_shadow_at_every_stage() {
	let fixture = Fixture::new();
	let suite = Suite::setup(&fixture);
	let providers = TestProviders::new();
	let svc = suite.service(&fixture, &providers);

	let screener = fixture.employee_factory.screener();
	let screener_actor = Actor::new(screener.clone(), Role::Screener);

	// reject at the lead stage
	let lead = svc.create_lead(intake("ABCPD1234E", "9876543210")).unwrap();
	svc.allocate_lead(&screener_actor, &lead.id).unwrap();
	svc.reject(&screener_actor, &lead.id, "salary below policy floor").unwrap();

	let lead = suite.lead_repo.find_by_id(&lead.id).unwrap();
	assert!(lead.is_rejected);
	assert_eq!(lead.rejected_by, Some(screener.id));
	let status = suite.status_repo.find_by_id(&lead.status_id).unwrap();
	assert!(status.is_rejected);
	assert!(!status.is_in_process);

	// rejected leads land in the rejection queue
	let rejected = svc.list_rejected(&screener_actor, Page::default()).unwrap();
	assert_eq!(rejected.leads.total, 1);
	assert_eq!(rejected.applications.total, 0);
}

#[test]
#[ignore = "needs a database"]
fn rejecting_a_disbursal_closes_its_ledger_row() {
	let fixture = Fixture::new();
	let suite = Suite::setup(&fixture);
	let providers = TestProviders::new();
	let svc = suite.service(&fixture, &providers);

	let screener = fixture.employee_factory.screener();
	let credit_manager = fixture.employee_factory.credit_manager();
	let sanction_head = fixture.employee_factory.sanction_head();
	let disbursal_head = fixture.employee_factory.disbursal_head();

	let sanction = originate_to_sanction(
		&svc,
		&suite,
		"ABCPD1234E",
		"9876543210",
		"50100123456789",
		&screener,
		&credit_manager,
		&sanction_head,
	);

	let sh_actor = Actor::new(sanction_head.clone(), Role::SanctionHead);
	let dh_actor = Actor::new(disbursal_head.clone(), Role::DisbursalHead);
	let disbursal = svc.send_esign(&sh_actor, &sanction.id).unwrap();

	svc.reject(&dh_actor, &disbursal.id, "account name mismatch").unwrap();

	let entry = suite.ledger_repo.find_by_loan_no(&disbursal.loan_no).unwrap();
	assert!(!entry.is_active);
	assert!(entry.is_closed);

	// the PAN is free to borrow again
	assert!(suite.ledger_repo.find_active_by_pan("ABCPD1234E").unwrap().is_none());
}

#[test]
#[ignore = "needs a database"]
fn moving_the_payout_date_reworks_the_memo() {
	let fixture = Fixture::new();
	let suite = Suite::setup(&fixture);
	let providers = TestProviders::new();
	let svc = suite.service(&fixture, &providers);

	let screener = fixture.employee_factory.screener();
	let credit_manager = fixture.employee_factory.credit_manager();
	let sanction_head = fixture.employee_factory.sanction_head();
	let disbursal_manager = fixture.employee_factory.disbursal_manager();
	let disbursal_head = fixture.employee_factory.disbursal_head();

	let sanction = originate_to_sanction(
		&svc,
		&suite,
		"ABCPD1234E",
		"9876543210",
		"50100123456789",
		&screener,
		&credit_manager,
		&sanction_head,
	);

	let sh_actor = Actor::new(sanction_head.clone(), Role::SanctionHead);
	let dm_actor = Actor::new(disbursal_manager.clone(), Role::DisbursalManager);
	let dh_actor = Actor::new(disbursal_head.clone(), Role::DisbursalHead);

	let disbursal = svc.send_esign(&sh_actor, &sanction.id).unwrap();
	svc.complete_esign(&sanction.id).unwrap();
	svc.allocate_disbursal(&dm_actor, &disbursal.id).unwrap();
	svc.recommend_disbursal(&dm_actor, &disbursal.id, "ok").unwrap();

	// memo planned for March 1st; money went out on the 11th
	let amount = bigdecimal::BigDecimal::from(38000);
	svc.approve_disbursal(&dh_actor, &disbursal.id, origination_api::disbursal::Payment {
		payable_account: "50100123456789",
		payment_mode: "NEFT",
		amount: &amount,
		channel: "bank",
		utr: "UTR0002",
		disbursed_at: Date::from_ymd(2024, 3, 11),
	}).unwrap();

	let lead = suite.lead_repo.find_by_lead_no(&sanction.lead_no).unwrap();
	let cam = suite.cam_repo.find_by_lead(&lead.id).unwrap();
	assert_eq!(cam.disbursal_date, Some(Date::from_ymd(2024, 3, 11)));
	assert_eq!(cam.tenure_days, Some(20));
	// 40000 + 40000 * 20 * 1 / 100
	assert_eq!(cam.repayment_amount, Some(bigdecimal::BigDecimal::from(48000)));
}
