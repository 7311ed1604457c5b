use crate::{
    db::query_builder::{owner_ledger, DateRange},
    entities::{factory_transaction, party_transaction},
    errors::ServiceError,
    services::{
        amount::{self, compute_amount, lenient_decimal, lenient_optional_decimal, Deductions},
        counterparties::{factory_name, party_name},
    },
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DatabaseConnection, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::{str::FromStr, sync::Arc};
use tracing::{info, instrument};
use validator::Validate;

/// Which ledger a new transaction is posted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum TransactionKind {
    Party,
    Factory,
}

/// Payload for recording a weighed transaction.
///
/// Numeric fields are lenient: absent or non-numeric values read as zero.
/// `total_amount` is computed from weight, rate and deductions unless supplied.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct RecordTransaction {
    #[serde(rename = "transactionType", alias = "transaction_type")]
    pub transaction_type: Option<String>,
    pub party_id: Option<i32>,
    pub factory_id: Option<i32>,
    pub date: Option<NaiveDate>,
    #[validate(length(max = 50, message = "vehicle_no is too long"))]
    pub vehicle_no: Option<String>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub weight: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub rate: Decimal,
    #[serde(flatten)]
    pub deductions: Deductions,
    #[serde(default, deserialize_with = "lenient_optional_decimal")]
    pub total_amount: Option<Decimal>,
    #[validate(length(max = 1000))]
    pub remarks: Option<String>,
    #[serde(default, rename = "copyToParty", alias = "copy_to_party")]
    pub copy_to_party: bool,
}

impl RecordTransaction {
    fn kind(&self) -> Result<TransactionKind, ServiceError> {
        let raw = self
            .transaction_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ServiceError::missing_field("transactionType"))?;

        TransactionKind::from_str(raw).map_err(|_| {
            ServiceError::InvalidTransactionType(format!(
                "{} (expected \"party\" or \"factory\")",
                raw
            ))
        })
    }

    /// Inputs at their stored scale plus the amount derived from them
    fn figures(&self) -> Result<Figures, ServiceError> {
        let weight = amount::weight(self.weight)?;
        let rate = amount::money(self.rate, "rate")?;
        let deductions = self.deductions.normalized()?;
        let total_amount = match self.total_amount {
            Some(supplied) => amount::money(supplied, "total_amount")?,
            None => compute_amount(weight, rate, &deductions)?,
        };
        Ok(Figures {
            weight,
            rate,
            deductions,
            total_amount,
        })
    }
}

struct Figures {
    weight: Decimal,
    rate: Decimal,
    deductions: Deductions,
    total_amount: Decimal,
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// A party transaction plus the factory copy posted with it, if any
#[derive(Debug, Clone, Serialize)]
pub struct PartyRecord {
    #[serde(flatten)]
    pub transaction: party_transaction::Model,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mirrored_factory_transaction: Option<factory_transaction::Model>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RecordedTransaction {
    Party(PartyRecord),
    Factory(factory_transaction::Model),
}

impl RecordedTransaction {
    pub fn id(&self) -> i32 {
        match self {
            Self::Party(record) => record.transaction.id,
            Self::Factory(model) => model.id,
        }
    }
}

async fn resolve_party<C: ConnectionTrait>(db: &C, id: i32) -> Result<String, ServiceError> {
    party_name(db, id)
        .await?
        .ok_or_else(|| ServiceError::InvalidReference(format!("party_id {} does not exist", id)))
}

async fn resolve_factory<C: ConnectionTrait>(db: &C, id: i32) -> Result<String, ServiceError> {
    factory_name(db, id).await?.ok_or_else(|| {
        ServiceError::InvalidReference(format!("factory_id {} does not exist", id))
    })
}

/// Posts transactions to the party and factory ledgers
#[derive(Clone)]
pub struct TransactionRecorder {
    db: Arc<DatabaseConnection>,
}

impl TransactionRecorder {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Records one transaction, or a party transaction and its verbatim factory
    /// copy when `copyToParty` is set and a factory is referenced. Both rows are
    /// written in one store transaction.
    #[instrument(skip(self, input), fields(transaction_type = ?input.transaction_type))]
    pub async fn record(
        &self,
        input: RecordTransaction,
    ) -> Result<RecordedTransaction, ServiceError> {
        input.validate()?;
        let kind = input.kind()?;
        let date = input.date.ok_or_else(|| ServiceError::missing_field("date"))?;
        let owner_field = match kind {
            TransactionKind::Party => "party_id",
            TransactionKind::Factory => "factory_id",
        };
        let owner_id = match kind {
            TransactionKind::Party => input.party_id,
            TransactionKind::Factory => input.factory_id,
        }
        .ok_or_else(|| ServiceError::missing_field(owner_field))?;

        let Figures {
            weight,
            rate,
            deductions: d,
            total_amount,
        } = input.figures()?;
        let vehicle_no = trimmed(&input.vehicle_no);
        let remarks = trimmed(&input.remarks);

        let txn = self.db.begin().await?;

        let recorded = match kind {
            TransactionKind::Factory => {
                let factory_name = resolve_factory(&txn, owner_id).await?;
                let party_name = match input.party_id {
                    Some(id) => Some(resolve_party(&txn, id).await?),
                    None => None,
                };

                let model = factory_transaction::ActiveModel {
                    factory_id: Set(owner_id),
                    party_id: Set(input.party_id),
                    date: Set(date),
                    vehicle_no: Set(vehicle_no),
                    weight: Set(weight),
                    rate: Set(rate),
                    moisture: Set(d.moisture),
                    rejection: Set(d.rejection),
                    duplex: Set(d.duplex),
                    first: Set(d.first),
                    second: Set(d.second),
                    third: Set(d.third),
                    total_amount: Set(total_amount),
                    remarks: Set(remarks),
                    factory_name: Set(Some(factory_name)),
                    party_name: Set(party_name),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;

                RecordedTransaction::Factory(model)
            }
            TransactionKind::Party => {
                let party_name = resolve_party(&txn, owner_id).await?;
                let factory_name = match input.factory_id {
                    Some(id) => Some(resolve_factory(&txn, id).await?),
                    None => None,
                };

                let transaction = party_transaction::ActiveModel {
                    party_id: Set(owner_id),
                    factory_id: Set(input.factory_id),
                    date: Set(date),
                    vehicle_no: Set(vehicle_no),
                    weight: Set(weight),
                    rate: Set(rate),
                    moisture: Set(d.moisture),
                    rejection: Set(d.rejection),
                    duplex: Set(d.duplex),
                    first: Set(d.first),
                    second: Set(d.second),
                    third: Set(d.third),
                    total_amount: Set(total_amount),
                    remarks: Set(remarks),
                    party_name: Set(Some(party_name)),
                    factory_name: Set(factory_name),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;

                let mirrored = match (input.copy_to_party, transaction.factory_id) {
                    (true, Some(factory_id)) => Some(
                        mirror_to_factory(&transaction, factory_id)
                            .insert(&txn)
                            .await?,
                    ),
                    _ => None,
                };

                RecordedTransaction::Party(PartyRecord {
                    transaction,
                    mirrored_factory_transaction: mirrored,
                })
            }
        };

        txn.commit().await?;

        info!(
            transaction_id = recorded.id(),
            kind = %kind,
            total_amount = %total_amount,
            "Transaction recorded"
        );
        Ok(recorded)
    }

    /// A party's transactions in `range`, newest first
    #[instrument(skip(self))]
    pub async fn party_transactions(
        &self,
        party_id: i32,
        range: DateRange,
    ) -> Result<Vec<party_transaction::Model>, ServiceError> {
        let db = &*self.db;
        if party_name(db, party_id).await?.is_none() {
            return Err(ServiceError::NotFound(format!("Party {} not found", party_id)));
        }
        Ok(owner_ledger::<party_transaction::Entity, _>(
            party_transaction::Column::PartyId,
            party_id,
            &range,
        )
        .all(db)
        .await?)
    }

    /// A factory's transactions in `range`, newest first
    #[instrument(skip(self))]
    pub async fn factory_transactions(
        &self,
        factory_id: i32,
        range: DateRange,
    ) -> Result<Vec<factory_transaction::Model>, ServiceError> {
        let db = &*self.db;
        if factory_name(db, factory_id).await?.is_none() {
            return Err(ServiceError::NotFound(format!(
                "Factory {} not found",
                factory_id
            )));
        }
        Ok(owner_ledger::<factory_transaction::Entity, _>(
            factory_transaction::Column::FactoryId,
            factory_id,
            &range,
        )
        .all(db)
        .await?)
    }
}

/// Field-for-field copy of a party transaction onto the factory ledger
fn mirror_to_factory(
    source: &party_transaction::Model,
    factory_id: i32,
) -> factory_transaction::ActiveModel {
    factory_transaction::ActiveModel {
        factory_id: Set(factory_id),
        party_id: Set(Some(source.party_id)),
        date: Set(source.date),
        vehicle_no: Set(source.vehicle_no.clone()),
        weight: Set(source.weight),
        rate: Set(source.rate),
        moisture: Set(source.moisture),
        rejection: Set(source.rejection),
        duplex: Set(source.duplex),
        first: Set(source.first),
        second: Set(source.second),
        third: Set(source.third),
        total_amount: Set(source.total_amount),
        remarks: Set(source.remarks.clone()),
        factory_name: Set(source.factory_name.clone()),
        party_name: Set(source.party_name.clone()),
        ..Default::default()
    }
}
