use crate::{
    db::query_builder::{owner_ledger, DateRange},
    entities::{
        factory_payment, factory_transaction, party_payment, party_transaction, Factory, Party,
    },
    errors::ServiceError,
    services::amount::ledger_total,
};
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Live balance of a party over a date window
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartySummary {
    pub total_amount: Decimal,
    pub total_paid: Decimal,
    /// Signed; positive means the party is still owed money
    pub remaining: Decimal,
    pub transactions: Vec<party_transaction::Model>,
    pub payments: Vec<party_payment::Model>,
}

/// Live balance of a factory over a date window
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FactorySummary {
    pub total_amount: Decimal,
    pub total_received: Decimal,
    /// Signed; positive means the factory still owes money
    pub remaining: Decimal,
    pub transactions: Vec<factory_transaction::Model>,
    pub payments: Vec<factory_payment::Model>,
}

/// `(total, settled, total - settled)` over the given amounts
pub fn balance(
    amounts: impl IntoIterator<Item = Decimal>,
    settled: impl IntoIterator<Item = Decimal>,
) -> Result<(Decimal, Decimal, Decimal), ServiceError> {
    let total = ledger_total(amounts)?;
    let settled = ledger_total(settled)?;
    let remaining = ledger_total([total, -settled])?;
    Ok((total, settled, remaining))
}

/// Recomputes balances from the ledgers on every call; payment snapshots are ignored.
#[derive(Clone)]
pub struct SummaryService {
    db: Arc<DatabaseConnection>,
}

impl SummaryService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn party_summary(
        &self,
        party_id: i32,
        range: DateRange,
    ) -> Result<PartySummary, ServiceError> {
        let db = &*self.db;
        Party::find_by_id(party_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Party {} not found", party_id)))?;

        let transactions = owner_ledger::<party_transaction::Entity, _>(
            party_transaction::Column::PartyId,
            party_id,
            &range,
        )
        .all(db)
        .await?;
        let payments = owner_ledger::<party_payment::Entity, _>(
            party_payment::Column::PartyId,
            party_id,
            &range,
        )
        .all(db)
        .await?;

        let (total_amount, total_paid, remaining) = balance(
            transactions.iter().map(|t| t.total_amount),
            payments.iter().map(|p| p.amount_paid),
        )?;
        debug!(
            transactions = transactions.len(),
            payments = payments.len(),
            %remaining,
            "Party summary computed"
        );

        Ok(PartySummary {
            total_amount,
            total_paid,
            remaining,
            transactions,
            payments,
        })
    }

    #[instrument(skip(self))]
    pub async fn factory_summary(
        &self,
        factory_id: i32,
        range: DateRange,
    ) -> Result<FactorySummary, ServiceError> {
        let db = &*self.db;
        Factory::find_by_id(factory_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Factory {} not found", factory_id)))?;

        let transactions = owner_ledger::<factory_transaction::Entity, _>(
            factory_transaction::Column::FactoryId,
            factory_id,
            &range,
        )
        .all(db)
        .await?;
        let payments = owner_ledger::<factory_payment::Entity, _>(
            factory_payment::Column::FactoryId,
            factory_id,
            &range,
        )
        .all(db)
        .await?;

        let (total_amount, total_received, remaining) = balance(
            transactions.iter().map(|t| t.total_amount),
            payments.iter().map(|p| p.amount_received),
        )?;
        debug!(
            transactions = transactions.len(),
            payments = payments.len(),
            %remaining,
            "Factory summary computed"
        );

        Ok(FactorySummary {
            total_amount,
            total_received,
            remaining,
            transactions,
            payments,
        })
    }
}
