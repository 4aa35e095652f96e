mod common;

use diesel::{Connection, PgConnection};
use reelpay::error::ApiError;
use reelpay::models::dtos::{PaymentRequest, RefundRequest};
use reelpay::models::entities::{NewPaymentIntent, PaymentIntent};
use reelpay::models::enums::{IntentState, PaymentMethod, PaymentPurpose};
use reelpay::repositories::entitlement_repository::EntitlementRepository;
use reelpay::repositories::intent_repository::IntentRepository;
use reelpay::repositories::ledger_repository::LedgerRepository;
use reelpay::repositories::reconciliation_repository::{stages, ReconciliationRepository};
use reelpay::repositories::wallet_repository::WalletRepository;
use reelpay::services::entitlement_service::{EntitlementService, GrantOutcome};
use reelpay::services::intent_service::{PROVIDER_PAYSTACK, PROVIDER_WALLET};
use reelpay::services::reconciliation_service::ReconciliationService;
use reelpay::services::refund_service::{PendingRefund, RefundService, REFUND_METADATA_KEY};
use reelpay::services::settlement_service::SettlementService;
use reelpay::services::wallet_service::WalletService;
use serde_json::json;
use uuid::Uuid;

fn seed_intent(
    conn: &mut PgConnection,
    user_id: Uuid,
    purpose: PaymentPurpose,
    method: PaymentMethod,
    amount_kobo: i64,
    state: IntentState,
    provider: &str,
    metadata: serde_json::Value,
) -> PaymentIntent {
    let key = format!("key-{}", Uuid::new_v4());
    let (intent, created) = IntentRepository::create_idempotent(
        conn,
        NewPaymentIntent {
            user_id,
            amount_kobo,
            currency: "NGN",
            purpose,
            method,
            metadata,
            idempotency_key: &key,
            provider: Some(provider),
            state,
        },
    )
    .expect("Failed to seed intent");
    assert!(created);
    intent
}

#[test]
fn balance_equals_signed_ledger_sum() {
    let Some(mut conn) = common::try_db_conn() else {
        return;
    };
    conn.begin_test_transaction().unwrap();
    let user_id = Uuid::new_v4();

    WalletService::credit(&mut conn, user_id, 5000, "Top-up", None).unwrap();
    WalletService::debit(&mut conn, user_id, 1200, "Rental", None).unwrap();
    WalletService::credit(&mut conn, user_id, 300, "Promo credit", None).unwrap();

    let wallet = WalletRepository::find_by_user(&mut conn, user_id)
        .unwrap()
        .unwrap();
    assert_eq!(wallet.balance_kobo, 4100);

    let history = LedgerRepository::history(&mut conn, wallet.id, 50).unwrap();
    let sum: i64 = history.iter().map(|e| e.amount_kobo).sum();
    assert_eq!(sum, wallet.balance_kobo);
    assert_eq!(history.first().unwrap().balance_after_kobo, 4100);
}

#[test]
fn rejected_debit_writes_no_entry() {
    let Some(mut conn) = common::try_db_conn() else {
        return;
    };
    conn.begin_test_transaction().unwrap();
    let user_id = Uuid::new_v4();

    WalletService::credit(&mut conn, user_id, 1000, "Top-up", None).unwrap();

    let err = WalletService::debit(&mut conn, user_id, 5000, "Rental", None).unwrap_err();
    assert!(matches!(
        err,
        ApiError::InsufficientFunds {
            available_kobo: 1000,
            required_kobo: 5000
        }
    ));

    let wallet = WalletRepository::find_by_user(&mut conn, user_id)
        .unwrap()
        .unwrap();
    assert_eq!(wallet.balance_kobo, 1000);
    assert_eq!(LedgerRepository::history(&mut conn, wallet.id, 50).unwrap().len(), 1);
}

#[test]
fn replayed_confirmation_credits_once() {
    let Some(mut conn) = common::try_db_conn() else {
        return;
    };
    conn.begin_test_transaction().unwrap();
    let user_id = Uuid::new_v4();

    let intent = seed_intent(
        &mut conn,
        user_id,
        PaymentPurpose::WalletTopup,
        PaymentMethod::Card,
        5000,
        IntentState::Initiated,
        PROVIDER_PAYSTACK,
        json!({}),
    );
    assert!(IntentRepository::mark_pending(
        &mut conn,
        intent.id,
        PROVIDER_PAYSTACK,
        &intent.id.to_string(),
        &intent.metadata,
    )
    .unwrap());

    // First delivery wins the guarded flip and grants.
    assert!(IntentRepository::transition(&mut conn, intent.id, IntentState::Pending, IntentState::Success).unwrap());
    let fresh = IntentRepository::find_by_id(&mut conn, intent.id).unwrap();
    EntitlementService::grant(&mut conn, &fresh, 48).unwrap();
    assert_eq!(WalletService::balance(&mut conn, user_id).unwrap(), 5000);

    // A redelivered confirmation loses the flip and must not grant again.
    assert!(!IntentRepository::transition(&mut conn, intent.id, IntentState::Pending, IntentState::Success).unwrap());
    assert_eq!(WalletService::balance(&mut conn, user_id).unwrap(), 5000);
    assert_eq!(
        LedgerRepository::entries_for_intent(&mut conn, intent.id).unwrap().len(),
        1
    );
}

#[test]
fn rental_exclusivity_rejects_second_grant() {
    let Some(mut conn) = common::try_db_conn() else {
        return;
    };
    conn.begin_test_transaction().unwrap();
    let user_id = Uuid::new_v4();
    let content_id = format!("movie-{}", Uuid::new_v4());
    let metadata = json!({
        "content_id": content_id,
        "content_type": "movie",
        "rental_duration_hours": 48,
    });

    let first = seed_intent(
        &mut conn,
        user_id,
        PaymentPurpose::Rental,
        PaymentMethod::Card,
        50000,
        IntentState::Success,
        PROVIDER_PAYSTACK,
        metadata.clone(),
    );
    let outcome = EntitlementService::grant(&mut conn, &first, 48).unwrap();
    assert!(matches!(outcome, GrantOutcome::RentalGranted(_)));

    let second = seed_intent(
        &mut conn,
        user_id,
        PaymentPurpose::Rental,
        PaymentMethod::Card,
        50000,
        IntentState::Success,
        PROVIDER_PAYSTACK,
        metadata,
    );
    let err = EntitlementService::grant(&mut conn, &second, 48).unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(_)));
}

#[test]
fn purchase_grant_replay_is_noop() {
    let Some(mut conn) = common::try_db_conn() else {
        return;
    };
    conn.begin_test_transaction().unwrap();
    let user_id = Uuid::new_v4();
    let content_id = format!("series-{}", Uuid::new_v4());

    let intent = seed_intent(
        &mut conn,
        user_id,
        PaymentPurpose::Purchase,
        PaymentMethod::Card,
        100_000,
        IntentState::Success,
        PROVIDER_PAYSTACK,
        json!({ "content_id": content_id, "content_type": "series" }),
    );

    let outcome = EntitlementService::grant(&mut conn, &intent, 48).unwrap();
    assert!(matches!(outcome, GrantOutcome::PurchaseGranted { created: true }));

    let outcome = EntitlementService::grant(&mut conn, &intent, 48).unwrap();
    assert!(matches!(outcome, GrantOutcome::PurchaseGranted { created: false }));

    assert!(
        EntitlementRepository::unrevoked_purchase(&mut conn, user_id, &content_id)
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn wallet_payment_replay_debits_once() {
    let Some(state) = common::try_db_state() else {
        return;
    };
    let user_id = Uuid::new_v4();
    {
        let mut conn = state.db.get().unwrap();
        WalletService::credit(&mut conn, user_id, 10_000, "Top-up", None).unwrap();
    }

    let content_id = format!("movie-{}", Uuid::new_v4());
    let req: PaymentRequest = serde_json::from_value(json!({
        "amount_kobo": 4000,
        "purpose": "rental",
        "method": "wallet",
        "idempotency_key": format!("key-{}", Uuid::new_v4()),
        "content_id": content_id,
        "content_type": "movie",
        "rental_duration_hours": 24,
    }))
    .unwrap();

    let first = SettlementService::request_payment(&state, user_id, "user@example.com", &req)
        .await
        .unwrap();
    assert_eq!(first.state, IntentState::Success);

    // Same idempotency key: the stored intent comes back, no second debit.
    let replay = SettlementService::request_payment(&state, user_id, "user@example.com", &req)
        .await
        .unwrap();
    assert_eq!(replay.payment_id, first.payment_id);
    assert_eq!(replay.state, IntentState::Success);

    let mut conn = state.db.get().unwrap();
    assert_eq!(WalletService::balance(&mut conn, user_id).unwrap(), 6000);
    assert_eq!(
        LedgerRepository::entries_for_intent(&mut conn, first.payment_id)
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn full_refund_reverses_wallet_payment_and_revokes() {
    let Some(state) = common::try_db_state() else {
        return;
    };
    let user_id = Uuid::new_v4();
    let admin_id = Uuid::new_v4();
    {
        let mut conn = state.db.get().unwrap();
        WalletService::credit(&mut conn, user_id, 10_000, "Top-up", None).unwrap();
    }

    let content_id = format!("movie-{}", Uuid::new_v4());
    let req: PaymentRequest = serde_json::from_value(json!({
        "amount_kobo": 4000,
        "purpose": "rental",
        "method": "wallet",
        "idempotency_key": format!("key-{}", Uuid::new_v4()),
        "content_id": content_id,
        "content_type": "movie",
        "rental_duration_hours": 24,
    }))
    .unwrap();
    let payment = SettlementService::request_payment(&state, user_id, "user@example.com", &req)
        .await
        .unwrap();
    assert_eq!(payment.state, IntentState::Success);

    let refund_req: RefundRequest =
        serde_json::from_value(json!({ "reason": "customer complaint" })).unwrap();
    let refund = RefundService::refund(&state, admin_id, payment.payment_id, &refund_req)
        .await
        .unwrap();
    assert_eq!(refund.refunded_kobo, 4000);
    assert_eq!(refund.state, IntentState::Refunded);

    let mut conn = state.db.get().unwrap();
    assert_eq!(WalletService::balance(&mut conn, user_id).unwrap(), 10_000);

    let entries = LedgerRepository::entries_for_intent(&mut conn, payment.payment_id).unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().any(|e| e.amount_kobo == 4000));
    assert!(entries.iter().any(|e| e.amount_kobo == -4000));

    assert!(
        EntitlementRepository::active_rental(&mut conn, user_id, &content_id)
            .unwrap()
            .is_none()
    );

    // The refunded flip was already claimed; a second refund never reaches
    // a provider and reports the intent as settled.
    drop(conn);
    let err = RefundService::refund(&state, admin_id, payment.payment_id, &refund_req)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::AlreadySettled(_)));
}

#[tokio::test]
async fn interrupted_refund_reversal_is_redriven_by_sweeper() {
    let Some(state) = common::try_db_state() else {
        return;
    };
    let user_id = Uuid::new_v4();
    let admin_id = Uuid::new_v4();
    let intent_id;
    {
        let mut conn = state.db.get().unwrap();

        // A settled 5000-kobo top-up whose credit landed.
        let intent = seed_intent(
            &mut conn,
            user_id,
            PaymentPurpose::WalletTopup,
            PaymentMethod::Card,
            5000,
            IntentState::Success,
            PROVIDER_PAYSTACK,
            json!({}),
        );
        intent_id = intent.id;
        EntitlementService::grant(&mut conn, &intent, 48).unwrap();
        assert_eq!(WalletService::balance(&mut conn, user_id).unwrap(), 5000);

        // A refund that was claimed and accepted by the provider, but whose
        // local reversal never committed.
        let pending = PendingRefund {
            amount_kobo: 5000,
            full: true,
            admin_id,
            reason: "chargeback".to_string(),
        };
        IntentRepository::merge_metadata(
            &mut conn,
            intent.id,
            REFUND_METADATA_KEY,
            serde_json::to_value(&pending).unwrap(),
        )
        .unwrap();
        assert!(IntentRepository::transition(
            &mut conn,
            intent.id,
            IntentState::Success,
            IntentState::Refunded
        )
        .unwrap());
        ReconciliationRepository::enqueue(
            &mut conn,
            intent.id,
            stages::REFUND_REVERSAL,
            "connection reset",
        )
        .unwrap();
    }

    let resolved = ReconciliationService::sweep_once(&state).await.unwrap();
    assert!(resolved >= 1);

    let mut conn = state.db.get().unwrap();
    assert_eq!(WalletService::balance(&mut conn, user_id).unwrap(), 0);

    let entries = LedgerRepository::entries_for_intent(&mut conn, intent_id).unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().any(|e| e.amount_kobo == -5000));

    let intent = IntentRepository::find_by_id(&mut conn, intent_id).unwrap();
    assert_eq!(intent.state, IntentState::Refunded);

    let open =
        ReconciliationRepository::unresolved_in_stages(&mut conn, &[stages::REFUND_REVERSAL], 10, 50)
            .unwrap();
    assert!(open.iter().all(|t| t.intent_id != intent_id));
}

#[tokio::test]
async fn subscription_provisioning_tasks_are_not_swept() {
    let Some(state) = common::try_db_state() else {
        return;
    };
    let user_id = Uuid::new_v4();
    let intent_id;
    {
        let mut conn = state.db.get().unwrap();
        let intent = seed_intent(
            &mut conn,
            user_id,
            PaymentPurpose::Subscription,
            PaymentMethod::Wallet,
            2500,
            IntentState::Success,
            PROVIDER_WALLET,
            json!({}),
        );
        intent_id = intent.id;
        ReconciliationRepository::enqueue(
            &mut conn,
            intent.id,
            stages::SUBSCRIPTION_PROVISION,
            "awaiting plan provisioning",
        )
        .unwrap();
    }

    ReconciliationService::sweep_once(&state).await.unwrap();

    // The plan subsystem owns these; the sweeper must not resolve or bump them.
    let mut conn = state.db.get().unwrap();
    let open = ReconciliationRepository::unresolved_in_stages(
        &mut conn,
        &[stages::SUBSCRIPTION_PROVISION],
        10,
        50,
    )
    .unwrap();
    let task = open.iter().find(|t| t.intent_id == intent_id).unwrap();
    assert_eq!(task.attempts, 0);
}
