use crate::{
    db::query_builder::{owner_ledger, DateRange},
    entities::{
        factory_payment, factory_transaction, party_payment, party_transaction, Factory,
        FactoryPayment, FactoryTransaction, Party, PartyPayment, PartyTransaction,
    },
    errors::ServiceError,
    services::amount::{checked_sum, money, strict_optional_decimal},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct RecordPartyPayment {
    pub party_id: Option<i32>,
    #[validate(length(max = 255))]
    pub party_name: Option<String>,
    /// Defaults to today
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "strict_optional_decimal")]
    pub amount_paid: Option<Decimal>,
    #[validate(length(max = 1000))]
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct RecordFactoryPayment {
    pub factory_id: Option<i32>,
    #[validate(length(max = 255))]
    pub factory_name: Option<String>,
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "strict_optional_decimal")]
    pub amount_received: Option<Decimal>,
    #[validate(length(max = 1000))]
    pub remarks: Option<String>,
}

fn positive_amount(amount: Option<Decimal>, field: &str) -> Result<Decimal, ServiceError> {
    match amount {
        None => Err(ServiceError::missing_field(field)),
        Some(value) if value <= Decimal::ZERO => Err(ServiceError::ValidationError(format!(
            "{} must be a positive number",
            field
        ))),
        Some(value) => money(value, field),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Balance snapshot stored on a payment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceSnapshot {
    pub total_amount: Decimal,
    pub remaining_amount: Decimal,
}

impl BalanceSnapshot {
    /// `remaining = transactions - prior payments - this payment`
    pub fn compute(
        transaction_totals: impl IntoIterator<Item = Decimal>,
        prior_payments: impl IntoIterator<Item = Decimal>,
        amount: Decimal,
    ) -> Result<Self, ServiceError> {
        let total_amount = checked_sum(transaction_totals, "total_amount")?;
        let paid = checked_sum(prior_payments, "paid_amount")?;
        let remaining = checked_sum([total_amount, -paid, -amount], "remaining_amount")?;
        Ok(Self {
            total_amount: money(total_amount, "total_amount")?,
            remaining_amount: money(remaining, "remaining_amount")?,
        })
    }
}

/// Records payments and snapshots the owner's outstanding balance
#[derive(Clone)]
pub struct PaymentRecorder {
    db: Arc<DatabaseConnection>,
}

impl PaymentRecorder {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Aggregation and insert share one store transaction so the snapshot
    /// reflects exactly the rows visible at insert time.
    #[instrument(skip(self, input), fields(party_id = ?input.party_id))]
    pub async fn record_party_payment(
        &self,
        input: RecordPartyPayment,
    ) -> Result<party_payment::Model, ServiceError> {
        input.validate()?;
        let party_id = input
            .party_id
            .ok_or_else(|| ServiceError::missing_field("party_id"))?;
        let amount = positive_amount(input.amount_paid, "amount_paid")?;

        let txn = self.db.begin().await?;

        let party = Party::find_by_id(party_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Party {} not found", party_id)))?;

        let transactions = PartyTransaction::find()
            .filter(party_transaction::Column::PartyId.eq(party_id))
            .all(&txn)
            .await?;
        let prior = PartyPayment::find()
            .filter(party_payment::Column::PartyId.eq(party_id))
            .all(&txn)
            .await?;

        let snapshot = BalanceSnapshot::compute(
            transactions.iter().map(|t| t.total_amount),
            prior.iter().map(|p| p.amount_paid),
            amount,
        )?;

        let payment = party_payment::ActiveModel {
            party_id: Set(party_id),
            party_name: Set(non_blank(input.party_name).unwrap_or(party.name)),
            date: Set(input.date.unwrap_or_else(|| Utc::now().date_naive())),
            amount_paid: Set(amount),
            total_amount: Set(snapshot.total_amount),
            remaining_amount: Set(snapshot.remaining_amount),
            remarks: Set(non_blank(input.remarks)),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        info!(
            payment_id = payment.id,
            party_id,
            remaining = %snapshot.remaining_amount,
            "Party payment recorded"
        );
        Ok(payment)
    }

    #[instrument(skip(self, input), fields(factory_id = ?input.factory_id))]
    pub async fn record_factory_payment(
        &self,
        input: RecordFactoryPayment,
    ) -> Result<factory_payment::Model, ServiceError> {
        input.validate()?;
        let factory_id = input
            .factory_id
            .ok_or_else(|| ServiceError::missing_field("factory_id"))?;
        let amount = positive_amount(input.amount_received, "amount_received")?;

        let txn = self.db.begin().await?;

        let factory = Factory::find_by_id(factory_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Factory {} not found", factory_id)))?;

        let transactions = FactoryTransaction::find()
            .filter(factory_transaction::Column::FactoryId.eq(factory_id))
            .all(&txn)
            .await?;
        let prior = FactoryPayment::find()
            .filter(factory_payment::Column::FactoryId.eq(factory_id))
            .all(&txn)
            .await?;

        let snapshot = BalanceSnapshot::compute(
            transactions.iter().map(|t| t.total_amount),
            prior.iter().map(|p| p.amount_received),
            amount,
        )?;

        let payment = factory_payment::ActiveModel {
            factory_id: Set(factory_id),
            factory_name: Set(non_blank(input.factory_name).unwrap_or(factory.name)),
            date: Set(input.date.unwrap_or_else(|| Utc::now().date_naive())),
            amount_received: Set(amount),
            total_amount: Set(snapshot.total_amount),
            remaining_amount: Set(snapshot.remaining_amount),
            remarks: Set(non_blank(input.remarks)),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        info!(
            payment_id = payment.id,
            factory_id,
            remaining = %snapshot.remaining_amount,
            "Factory payment recorded"
        );
        Ok(payment)
    }

    #[instrument(skip(self))]
    pub async fn party_payments(
        &self,
        party_id: i32,
        range: DateRange,
    ) -> Result<Vec<party_payment::Model>, ServiceError> {
        let db = &*self.db;
        if Party::find_by_id(party_id).one(db).await?.is_none() {
            return Err(ServiceError::NotFound(format!("Party {} not found", party_id)));
        }
        Ok(owner_ledger::<party_payment::Entity, _>(
            party_payment::Column::PartyId,
            party_id,
            &range,
        )
        .all(db)
        .await?)
    }

    #[instrument(skip(self))]
    pub async fn factory_payments(
        &self,
        factory_id: i32,
        range: DateRange,
    ) -> Result<Vec<factory_payment::Model>, ServiceError> {
        let db = &*self.db;
        if Factory::find_by_id(factory_id).one(db).await?.is_none() {
            return Err(ServiceError::NotFound(format!(
                "Factory {} not found",
                factory_id
            )));
        }
        Ok(owner_ledger::<factory_payment::Entity, _>(
            factory_payment::Column::FactoryId,
            factory_id,
            &range,
        )
        .all(db)
        .await?)
    }
}
