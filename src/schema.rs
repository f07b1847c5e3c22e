table! {
    aadhaar_records (unique_id) {
        unique_id -> Varchar,
        name -> Varchar,
        last_digits -> Varchar,
        verified_at -> Timestamptz,
    }
}

table! {
    applicant_banks (id) {
        id -> Uuid,
        applicant_id -> Uuid,
        beneficiary_name -> Varchar,
        bank_acc_no -> Varchar,
        account_type -> Varchar,
        ifsc_code -> Varchar,
        bank_name -> Varchar,
        branch_name -> Varchar,
        created_at -> Timestamptz,
    }
}

table! {
    applicant_references (id) {
        id -> Uuid,
        applicant_id -> Uuid,
        name -> Varchar,
        mobile -> Varchar,
        relation -> Varchar,
    }
}

table! {
    applicants (id) {
        id -> Uuid,
        pan -> Varchar,
        aadhaar -> Varchar,
        f_name -> Varchar,
        m_name -> Nullable<Varchar>,
        l_name -> Nullable<Varchar>,
        gender -> Varchar,
        dob -> Date,
        mobile -> Varchar,
        alternate_mobile -> Nullable<Varchar>,
        personal_email -> Varchar,
        office_email -> Varchar,
        screened_by -> Varchar,
        residence_address -> Nullable<Varchar>,
        residence_city -> Nullable<Varchar>,
        residence_state -> Nullable<Varchar>,
        employer_name -> Nullable<Varchar>,
        designation -> Nullable<Varchar>,
        office_address -> Nullable<Varchar>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

table! {
    applications (id) {
        id -> Uuid,
        lead_no -> Varchar,
        pan -> Varchar,
        lead_id -> Uuid,
        applicant_id -> Uuid,
        credit_manager_id -> Nullable<Uuid>,
        on_hold -> Bool,
        is_recommended -> Bool,
        recommended_by -> Nullable<Uuid>,
        is_rejected -> Bool,
        rejected_by -> Nullable<Uuid>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

table! {
    cam_details (id) {
        id -> Uuid,
        lead_id -> Uuid,
        lead_no -> Varchar,
        cibil_score -> Nullable<Int2>,
        loan_applied -> Numeric,
        actual_net_salary -> Nullable<Numeric>,
        loan_recommended -> Nullable<Numeric>,
        roi -> Nullable<Numeric>,
        tenure_days -> Nullable<Int2>,
        disbursal_date -> Nullable<Date>,
        repayment_date -> Nullable<Date>,
        repayment_amount -> Nullable<Numeric>,
        net_disbursal_amount -> Nullable<Numeric>,
        updated_at -> Timestamptz,
    }
}

table! {
    disbursals (id) {
        id -> Uuid,
        sanction_id -> Uuid,
        lead_no -> Varchar,
        pan -> Varchar,
        loan_no -> Varchar,
        disbursal_manager_id -> Nullable<Uuid>,
        is_recommended -> Bool,
        recommended_by -> Nullable<Uuid>,
        payable_account -> Nullable<Varchar>,
        payment_mode -> Nullable<Varchar>,
        amount -> Nullable<Numeric>,
        channel -> Nullable<Varchar>,
        utr -> Nullable<Varchar>,
        disbursed_at -> Nullable<Date>,
        is_disbursed -> Bool,
        disbursed_by -> Nullable<Uuid>,
        on_hold -> Bool,
        is_rejected -> Bool,
        rejected_by -> Nullable<Uuid>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

table! {
    documents (id) {
        id -> Uuid,
        pan -> Varchar,
        created_at -> Timestamptz,
    }
}

table! {
    employees (id) {
        id -> Uuid,
        f_name -> Varchar,
        m_name -> Nullable<Varchar>,
        l_name -> Varchar,
        email -> Varchar,
        role -> Varchar,
        created_at -> Timestamptz,
    }
}

table! {
    lead_logs (id) {
        id -> Uuid,
        lead_id -> Uuid,
        status -> Varchar,
        borrower -> Varchar,
        remark -> Text,
        created_at -> Timestamptz,
    }
}

table! {
    lead_statuses (id) {
        id -> Uuid,
        lead_no -> Varchar,
        pan -> Varchar,
        stage -> Varchar,
        is_in_process -> Bool,
        is_rejected -> Bool,
        is_approved -> Bool,
        updated_at -> Timestamptz,
    }
}

table! {
    leads (id) {
        id -> Uuid,
        lead_no -> Varchar,
        f_name -> Varchar,
        m_name -> Nullable<Varchar>,
        l_name -> Nullable<Varchar>,
        gender -> Varchar,
        dob -> Date,
        aadhaar -> Varchar,
        pan -> Varchar,
        mobile -> Varchar,
        alternate_mobile -> Nullable<Varchar>,
        personal_email -> Varchar,
        office_email -> Varchar,
        loan_amount -> Numeric,
        salary -> Numeric,
        pin_code -> Varchar,
        city -> Varchar,
        state -> Varchar,
        source -> Varchar,
        cibil_score -> Nullable<Int2>,
        screener_id -> Nullable<Uuid>,
        on_hold -> Bool,
        held_by -> Nullable<Uuid>,
        is_mobile_verified -> Bool,
        is_email_verified -> Bool,
        is_aadhaar_verified -> Bool,
        is_pan_verified -> Bool,
        is_recommended -> Bool,
        recommended_by -> Nullable<Uuid>,
        is_rejected -> Bool,
        rejected_by -> Nullable<Uuid>,
        document_id -> Uuid,
        status_id -> Uuid,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

table! {
    loan_ledger (id) {
        id -> Uuid,
        pan -> Varchar,
        lead_no -> Varchar,
        loan_no -> Varchar,
        disbursal_id -> Nullable<Uuid>,
        is_active -> Bool,
        is_disbursed -> Bool,
        is_verified -> Bool,
        is_closed -> Bool,
        is_settled -> Bool,
        is_write_off -> Bool,
        defaulted -> Bool,
        requested_status -> Nullable<Varchar>,
        closing_date -> Nullable<Date>,
        closing_amount -> Nullable<Numeric>,
        utr -> Nullable<Varchar>,
        dpd -> Nullable<Int2>,
        updated_at -> Timestamptz,
    }
}

table! {
    mobile_otps (mobile) {
        mobile -> Varchar,
        f_name -> Varchar,
        l_name -> Varchar,
        otp -> Varchar,
        created_at -> Timestamptz,
    }
}

table! {
    pan_records (pan) {
        pan -> Varchar,
        full_name -> Varchar,
        gender -> Varchar,
        dob -> Date,
        verified_at -> Timestamptz,
    }
}

table! {
    partial_payments (id) {
        id -> Uuid,
        ledger_id -> Uuid,
        paid_on -> Date,
        amount -> Numeric,
        utr -> Varchar,
        requested_status -> Nullable<Varchar>,
        is_partly_paid -> Bool,
        created_at -> Timestamptz,
    }
}

table! {
    sanctions (id) {
        id -> Uuid,
        application_id -> Uuid,
        lead_no -> Varchar,
        pan -> Varchar,
        loan_no -> Nullable<Varchar>,
        sanction_date -> Nullable<Date>,
        recommended_by -> Uuid,
        is_approved -> Bool,
        approved_by -> Nullable<Uuid>,
        e_sign_pending -> Bool,
        e_signed -> Bool,
        on_hold -> Bool,
        is_rejected -> Bool,
        rejected_by -> Nullable<Uuid>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

table! {
    sequences (name) {
        name -> Varchar,
        value -> Int8,
    }
}

joinable!(applicant_banks -> applicants (applicant_id));
joinable!(applicant_references -> applicants (applicant_id));
joinable!(applications -> applicants (applicant_id));
joinable!(applications -> leads (lead_id));
joinable!(cam_details -> leads (lead_id));
joinable!(disbursals -> sanctions (sanction_id));
joinable!(lead_logs -> leads (lead_id));
joinable!(leads -> documents (document_id));
joinable!(leads -> lead_statuses (status_id));
joinable!(loan_ledger -> disbursals (disbursal_id));
joinable!(partial_payments -> loan_ledger (ledger_id));
joinable!(sanctions -> applications (application_id));

allow_tables_to_appear_in_same_query!(
    aadhaar_records,
    applicant_banks,
    applicant_references,
    applicants,
    applications,
    cam_details,
    disbursals,
    documents,
    employees,
    lead_logs,
    lead_statuses,
    leads,
    loan_ledger,
    mobile_otps,
    pan_records,
    partial_payments,
    sanctions,
    sequences,
);
