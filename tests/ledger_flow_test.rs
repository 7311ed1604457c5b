mod common;

use chrono::NaiveDate;
use common::TestApp;
use hisab_ledger::{
    db::DateRange,
    errors::ServiceError,
    services::{
        counterparties::CounterpartyInput,
        payments::{RecordFactoryPayment, RecordPartyPayment},
        transactions::{RecordTransaction, RecordedTransaction},
    },
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

fn txn(value: serde_json::Value) -> RecordTransaction {
    serde_json::from_value(value).unwrap()
}

async fn seed_pair(app: &TestApp) -> (i32, i32) {
    let party = app
        .state
        .services
        .parties
        .create(CounterpartyInput {
            name: Some("Ravi Scrap".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    let factory = app
        .state
        .services
        .factories
        .create(CounterpartyInput {
            name: Some("Shakti Paper Mill".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    (party.id, factory.id)
}

#[tokio::test]
async fn party_transaction_computes_amount_and_snapshots_names() {
    let app = TestApp::new().await;
    let (party_id, factory_id) = seed_pair(&app).await;

    let recorded = app
        .state
        .services
        .transactions
        .record(txn(json!({
            "transactionType": "party",
            "party_id": party_id,
            "factory_id": factory_id,
            "date": "2024-01-05",
            "vehicle_no": " KA01AB1234 ",
            "weight": 100,
            "rate": 10,
            "moisture": 2,
            "rejection": 1
        })))
        .await
        .unwrap();

    let RecordedTransaction::Party(record) = recorded else {
        panic!("expected a party record");
    };
    assert_eq!(record.transaction.total_amount, dec!(997));
    assert_eq!(record.transaction.party_name.as_deref(), Some("Ravi Scrap"));
    assert_eq!(
        record.transaction.factory_name.as_deref(),
        Some("Shakti Paper Mill")
    );
    assert_eq!(record.transaction.vehicle_no.as_deref(), Some("KA01AB1234"));
    assert!(record.mirrored_factory_transaction.is_none());
}

#[tokio::test]
async fn stored_figures_are_rounded_to_column_scale() {
    let app = TestApp::new().await;
    let (party_id, factory_id) = seed_pair(&app).await;

    app.state
        .services
        .transactions
        .record(txn(json!({
            "transactionType": "party",
            "party_id": party_id,
            "factory_id": factory_id,
            "date": "2024-01-05",
            "weight": "100.0004",
            "rate": "10.255",
            "moisture": "0.004",
            "copyToParty": true
        })))
        .await
        .unwrap();

    let rows = app
        .state
        .services
        .transactions
        .party_transactions(party_id, DateRange::unbounded())
        .await
        .unwrap();
    let row = &rows[0];
    assert_eq!(row.weight, dec!(100));
    assert_eq!(row.rate, dec!(10.26));
    assert_eq!(row.moisture, Decimal::ZERO);
    // Amount agrees with what was stored, not with the raw input
    assert_eq!(row.total_amount, dec!(1026.00));

    let mirrored = app
        .state
        .services
        .transactions
        .factory_transactions(factory_id, DateRange::unbounded())
        .await
        .unwrap();
    assert_eq!(mirrored[0].rate, dec!(10.26));
    assert_eq!(mirrored[0].total_amount, row.total_amount);
}

#[tokio::test]
async fn copy_to_party_posts_a_verbatim_factory_row() {
    let app = TestApp::new().await;
    let (party_id, factory_id) = seed_pair(&app).await;

    let recorded = app
        .state
        .services
        .transactions
        .record(txn(json!({
            "transactionType": "party",
            "party_id": party_id,
            "factory_id": factory_id,
            "date": "2024-01-05",
            "vehicle_no": "XY1",
            "weight": 50,
            "rate": 20.5,
            "duplex": 25,
            "remarks": "first load",
            "copyToParty": true
        })))
        .await
        .unwrap();

    let RecordedTransaction::Party(record) = recorded else {
        panic!("expected a party record");
    };
    let mirror = record
        .mirrored_factory_transaction
        .expect("mirror should be created");
    let source = record.transaction;

    assert_eq!(mirror.factory_id, factory_id);
    assert_eq!(mirror.party_id, Some(party_id));
    assert_eq!(mirror.rate, source.rate);
    assert_eq!(mirror.total_amount, dec!(1000));
    assert_eq!(mirror.total_amount, source.total_amount);
    assert_eq!(mirror.duplex, dec!(25));
    assert_eq!(mirror.remarks.as_deref(), Some("first load"));
    assert_eq!(mirror.party_name, source.party_name);
    assert_eq!(mirror.factory_name, source.factory_name);

    let factory_rows = app
        .state
        .services
        .transactions
        .factory_transactions(factory_id, DateRange::unbounded())
        .await
        .unwrap();
    assert_eq!(factory_rows.len(), 1);
}

#[tokio::test]
async fn copy_without_factory_creates_only_the_party_row() {
    let app = TestApp::new().await;
    let (party_id, factory_id) = seed_pair(&app).await;

    app.state
        .services
        .transactions
        .record(txn(json!({
            "transactionType": "party",
            "party_id": party_id,
            "date": "2024-01-05",
            "weight": 1,
            "rate": 1,
            "copyToParty": true
        })))
        .await
        .unwrap();

    let factory_rows = app
        .state
        .services
        .transactions
        .factory_transactions(factory_id, DateRange::unbounded())
        .await
        .unwrap();
    assert!(factory_rows.is_empty());
}

#[tokio::test]
async fn unresolvable_reference_writes_nothing() {
    let app = TestApp::new().await;
    let (party_id, _) = seed_pair(&app).await;

    let err = app
        .state
        .services
        .transactions
        .record(txn(json!({
            "transactionType": "party",
            "party_id": party_id,
            "factory_id": 9999,
            "date": "2024-01-05",
            "weight": 1,
            "rate": 1,
            "copyToParty": true
        })))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidReference(_)));

    let rows = app
        .state
        .services
        .transactions
        .party_transactions(party_id, DateRange::unbounded())
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn factory_transaction_requires_factory_id() {
    let app = TestApp::new().await;
    let (party_id, _) = seed_pair(&app).await;

    let err = app
        .state
        .services
        .transactions
        .record(txn(json!({
            "transactionType": "factory",
            "party_id": party_id,
            "date": "2024-01-05"
        })))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn payment_snapshot_tracks_running_balance() {
    let app = TestApp::new().await;
    let (party_id, _) = seed_pair(&app).await;
    let transactions = &app.state.services.transactions;
    let payments = &app.state.services.payments;

    for (date, weight) in [("2024-01-01", 100), ("2024-01-02", 50)] {
        transactions
            .record(txn(json!({
                "transactionType": "party",
                "party_id": party_id,
                "date": date,
                "weight": weight,
                "rate": 10
            })))
            .await
            .unwrap();
    }

    let first = payments
        .record_party_payment(RecordPartyPayment {
            party_id: Some(party_id),
            date: Some(day(3)),
            amount_paid: Some(dec!(400)),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(first.total_amount, dec!(1500));
    assert_eq!(first.remaining_amount, dec!(1100));
    assert_eq!(first.party_name, "Ravi Scrap");

    let second = payments
        .record_party_payment(RecordPartyPayment {
            party_id: Some(party_id),
            party_name: Some("Ravi (cash)".into()),
            date: Some(day(4)),
            amount_paid: Some(dec!(1100)),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(second.remaining_amount, Decimal::ZERO);
    assert_eq!(second.party_name, "Ravi (cash)");

    // A later transaction does not rewrite earlier snapshots
    transactions
        .record(txn(json!({
            "transactionType": "party",
            "party_id": party_id,
            "date": "2024-01-05",
            "weight": 10,
            "rate": 10
        })))
        .await
        .unwrap();
    let stored = payments
        .party_payments(party_id, DateRange::unbounded())
        .await
        .unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[1].remaining_amount, dec!(1100));

    let summary = app
        .state
        .services
        .summaries
        .party_summary(party_id, DateRange::unbounded())
        .await
        .unwrap();
    assert_eq!(summary.total_amount, dec!(1600));
    assert_eq!(summary.total_paid, dec!(1500));
    assert_eq!(summary.remaining, dec!(100));
}

#[tokio::test]
async fn payment_validation_and_lookup_errors() {
    let app = TestApp::new().await;
    let payments = &app.state.services.payments;

    let missing_id = payments
        .record_factory_payment(RecordFactoryPayment {
            amount_received: Some(dec!(10)),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(missing_id, ServiceError::ValidationError(_)));

    let non_positive = payments
        .record_factory_payment(RecordFactoryPayment {
            factory_id: Some(1),
            amount_received: Some(dec!(0)),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(non_positive, ServiceError::ValidationError(_)));

    let unknown = payments
        .record_factory_payment(RecordFactoryPayment {
            factory_id: Some(42),
            amount_received: Some(dec!(10)),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(unknown, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn summary_respects_inclusive_date_window() {
    let app = TestApp::new().await;
    let (_, factory_id) = seed_pair(&app).await;

    for (date, weight) in [("2024-01-01", 10), ("2024-01-15", 20), ("2024-01-31", 40)] {
        app.state
            .services
            .transactions
            .record(txn(json!({
                "transactionType": "factory",
                "factory_id": factory_id,
                "date": date,
                "weight": weight,
                "rate": 1
            })))
            .await
            .unwrap();
    }
    app.state
        .services
        .payments
        .record_factory_payment(RecordFactoryPayment {
            factory_id: Some(factory_id),
            date: Some(day(20)),
            amount_received: Some(dec!(5)),
            ..Default::default()
        })
        .await
        .unwrap();

    let window = DateRange::new(Some(day(15)), Some(day(31))).unwrap();
    let summary = app
        .state
        .services
        .summaries
        .factory_summary(factory_id, window)
        .await
        .unwrap();
    assert_eq!(summary.total_amount, dec!(60));
    assert_eq!(summary.total_received, dec!(5));
    assert_eq!(summary.remaining, dec!(55));
    assert_eq!(summary.transactions[0].date, day(31));
    assert_eq!(summary.transactions[1].date, day(15));

    let early = DateRange::new(None, Some(day(14))).unwrap();
    let summary = app
        .state
        .services
        .summaries
        .factory_summary(factory_id, early)
        .await
        .unwrap();
    assert_eq!(summary.total_amount, dec!(10));
    assert!(summary.payments.is_empty());
}

#[tokio::test]
async fn renaming_does_not_touch_historical_rows() {
    let app = TestApp::new().await;
    let (party_id, _) = seed_pair(&app).await;

    app.state
        .services
        .transactions
        .record(txn(json!({
            "transactionType": "party",
            "party_id": party_id,
            "date": "2024-01-01",
            "weight": 1,
            "rate": 1
        })))
        .await
        .unwrap();

    let renamed = app
        .state
        .services
        .parties
        .update(
            party_id,
            CounterpartyInput {
                name: Some("Ravi Metals".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Ravi Metals");

    let rows = app
        .state
        .services
        .transactions
        .party_transactions(party_id, DateRange::unbounded())
        .await
        .unwrap();
    assert_eq!(rows[0].party_name.as_deref(), Some("Ravi Scrap"));
}

#[tokio::test]
async fn counterparty_with_ledger_rows_cannot_be_deleted() {
    let app = TestApp::new().await;
    let (party_id, factory_id) = seed_pair(&app).await;

    app.state
        .services
        .transactions
        .record(txn(json!({
            "transactionType": "party",
            "party_id": party_id,
            "date": "2024-01-01",
            "weight": 1,
            "rate": 1
        })))
        .await
        .unwrap();

    let err = app.state.services.parties.delete(party_id).await.unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    app.state.services.factories.delete(factory_id).await.unwrap();
    let gone = app.state.services.factories.get(factory_id).await.unwrap_err();
    assert!(matches!(gone, ServiceError::NotFound(_)));
}
