//! Hisab tally: reconciliation of the party and factory ledgers.
//!
//! The selection mode is decided by which ids are supplied:
//!
//! * neither: every list is empty (not an error)
//! * party only: the party's transactions and payments, factory lists empty
//! * factory only: the mirror image
//! * both: transactions whose *snapshot* names match the selected pair, and each
//!   side's payments provided that side has traded with the other at least once
//!
//! Every list is ordered `date DESC, id DESC` and numbered from 1 afterwards.

use crate::{
    db::query_builder::{owner_ledger, DateRange, LedgerQuery},
    entities::{
        factory_payment, factory_transaction, party_payment, party_transaction,
        FactoryTransaction, PartyTransaction,
    },
    errors::ServiceError,
    services::{
        amount::ledger_total,
        counterparties::{factory_name, party_name},
    },
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HisabQuery {
    pub party_id: Option<i32>,
    pub factory_id: Option<i32>,
    #[serde(default)]
    pub range: DateRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    Empty,
    PartyOnly(i32),
    FactoryOnly(i32),
    Both { party_id: i32, factory_id: i32 },
}

impl HisabQuery {
    pub fn mode(&self) -> SelectionMode {
        match (self.party_id, self.factory_id) {
            (None, None) => SelectionMode::Empty,
            (Some(party_id), None) => SelectionMode::PartyOnly(party_id),
            (None, Some(factory_id)) => SelectionMode::FactoryOnly(factory_id),
            (Some(party_id), Some(factory_id)) => SelectionMode::Both {
                party_id,
                factory_id,
            },
        }
    }
}

/// A record with its 1-based position in the returned list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Serial<T> {
    pub serial: usize,
    #[serde(flatten)]
    pub record: T,
}

pub fn with_serials<T>(rows: Vec<T>) -> Vec<Serial<T>> {
    rows.into_iter()
        .enumerate()
        .map(|(index, record)| Serial {
            serial: index + 1,
            record,
        })
        .collect()
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct HisabReport {
    pub party_transactions: Vec<Serial<party_transaction::Model>>,
    pub party_payments: Vec<Serial<party_payment::Model>>,
    pub factory_transactions: Vec<Serial<factory_transaction::Model>>,
    pub factory_payments: Vec<Serial<factory_payment::Model>>,
}

/// One truckload found on both ledgers; amounts are the party side's
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntersectionRow {
    pub date: NaiveDate,
    pub vehicle_no: Option<String>,
    pub party_name: Option<String>,
    pub factory_name: Option<String>,
    pub weight: Decimal,
    pub rate: Decimal,
    pub total_amount: Decimal,
    pub party_transaction_id: i32,
    pub factory_transaction_id: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Intersection {
    pub rows: Vec<IntersectionRow>,
    pub matched_count: usize,
    pub total_amount: Decimal,
}

type MatchKey<'a> = (Option<&'a str>, Option<&'a str>, Option<&'a str>, NaiveDate);

/// Pairs party and factory transactions sharing
/// `(party_name, factory_name, vehicle_no, date)`.
///
/// Party rows are walked in order; each factory row is consumed by at most one match.
pub fn intersect(
    party_txns: &[party_transaction::Model],
    factory_txns: &[factory_transaction::Model],
) -> Result<Intersection, ServiceError> {
    let mut pool: HashMap<MatchKey<'_>, VecDeque<&factory_transaction::Model>> = HashMap::new();
    for ft in factory_txns {
        let key = (
            ft.party_name.as_deref(),
            ft.factory_name.as_deref(),
            ft.vehicle_no.as_deref(),
            ft.date,
        );
        pool.entry(key).or_default().push_back(ft);
    }

    let rows: Vec<IntersectionRow> = party_txns
        .iter()
        .filter_map(|pt| {
            let key = (
                pt.party_name.as_deref(),
                pt.factory_name.as_deref(),
                pt.vehicle_no.as_deref(),
                pt.date,
            );
            let ft = pool.get_mut(&key)?.pop_front()?;
            Some(IntersectionRow {
                date: pt.date,
                vehicle_no: pt.vehicle_no.clone(),
                party_name: pt.party_name.clone(),
                factory_name: pt.factory_name.clone(),
                weight: pt.weight,
                rate: pt.rate,
                total_amount: pt.total_amount,
                party_transaction_id: pt.id,
                factory_transaction_id: ft.id,
            })
        })
        .collect();

    Ok(Intersection {
        matched_count: rows.len(),
        total_amount: ledger_total(rows.iter().map(|r| r.total_amount))?,
        rows,
    })
}

#[derive(Clone)]
pub struct HisabService {
    db: Arc<DatabaseConnection>,
}

impl HisabService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn get(&self, query: HisabQuery) -> Result<HisabReport, ServiceError> {
        let report = match query.mode() {
            SelectionMode::Empty => HisabReport::default(),
            SelectionMode::PartyOnly(party_id) => {
                self.require_party(party_id).await?;
                self.party_only(party_id, &query.range).await?
            }
            SelectionMode::FactoryOnly(factory_id) => {
                self.require_factory(factory_id).await?;
                self.factory_only(factory_id, &query.range).await?
            }
            SelectionMode::Both {
                party_id,
                factory_id,
            } => {
                let pname = self.require_party(party_id).await?;
                let fname = self.require_factory(factory_id).await?;
                self.both(party_id, &pname, factory_id, &fname, &query.range)
                    .await?
            }
        };

        debug!(
            party_transactions = report.party_transactions.len(),
            party_payments = report.party_payments.len(),
            factory_transactions = report.factory_transactions.len(),
            factory_payments = report.factory_payments.len(),
            "Hisab assembled"
        );
        Ok(report)
    }

    /// Truckloads recorded on both ledgers for the selected pair. Empty unless
    /// both ids are supplied.
    #[instrument(skip(self))]
    pub async fn intersection(&self, query: HisabQuery) -> Result<Intersection, ServiceError> {
        if !matches!(query.mode(), SelectionMode::Both { .. }) {
            return Ok(Intersection::default());
        }

        let report = self.get(query).await?;
        let party: Vec<_> = report
            .party_transactions
            .into_iter()
            .map(|s| s.record)
            .collect();
        let factory: Vec<_> = report
            .factory_transactions
            .into_iter()
            .map(|s| s.record)
            .collect();
        intersect(&party, &factory)
    }

    async fn require_party(&self, party_id: i32) -> Result<String, ServiceError> {
        party_name(&*self.db, party_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Party {} not found", party_id)))
    }

    async fn require_factory(&self, factory_id: i32) -> Result<String, ServiceError> {
        factory_name(&*self.db, factory_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Factory {} not found", factory_id)))
    }

    async fn party_only(
        &self,
        party_id: i32,
        range: &DateRange,
    ) -> Result<HisabReport, ServiceError> {
        let db = &*self.db;
        let transactions = owner_ledger::<party_transaction::Entity, _>(
            party_transaction::Column::PartyId,
            party_id,
            range,
        )
        .all(db)
        .await?;
        let payments =
            owner_ledger::<party_payment::Entity, _>(party_payment::Column::PartyId, party_id, range)
                .all(db)
                .await?;

        Ok(HisabReport {
            party_transactions: with_serials(transactions),
            party_payments: with_serials(payments),
            ..Default::default()
        })
    }

    async fn factory_only(
        &self,
        factory_id: i32,
        range: &DateRange,
    ) -> Result<HisabReport, ServiceError> {
        let db = &*self.db;
        let transactions = owner_ledger::<factory_transaction::Entity, _>(
            factory_transaction::Column::FactoryId,
            factory_id,
            range,
        )
        .all(db)
        .await?;
        let payments = owner_ledger::<factory_payment::Entity, _>(
            factory_payment::Column::FactoryId,
            factory_id,
            range,
        )
        .all(db)
        .await?;

        Ok(HisabReport {
            factory_transactions: with_serials(transactions),
            factory_payments: with_serials(payments),
            ..Default::default()
        })
    }

    /// Transactions match on snapshot names, so rows recorded before a rename
    /// are not picked up under the new name.
    async fn both(
        &self,
        party_id: i32,
        pname: &str,
        factory_id: i32,
        fname: &str,
        range: &DateRange,
    ) -> Result<HisabReport, ServiceError> {
        let db = &*self.db;

        let party_transactions = LedgerQuery::<party_transaction::Entity>::new()
            .filter(
                Condition::all()
                    .add(party_transaction::Column::PartyName.eq(pname))
                    .add(party_transaction::Column::FactoryName.eq(fname)),
            )
            .within(range)
            .all(db)
            .await?;

        let factory_transactions = LedgerQuery::<factory_transaction::Entity>::new()
            .filter(
                Condition::all()
                    .add(factory_transaction::Column::PartyName.eq(pname))
                    .add(factory_transaction::Column::FactoryName.eq(fname)),
            )
            .within(range)
            .all(db)
            .await?;

        // Payments are not tagged with a counterparty; a side's payments are
        // shown once it has traded with the other side at all, in any period.
        let party_traded = PartyTransaction::find()
            .filter(party_transaction::Column::PartyId.eq(party_id))
            .filter(party_transaction::Column::FactoryName.eq(fname))
            .count(db)
            .await?
            > 0;
        let party_payments = if party_traded {
            owner_ledger::<party_payment::Entity, _>(party_payment::Column::PartyId, party_id, range)
                .filter(Condition::all().add(party_payment::Column::PartyName.eq(pname)))
                .all(db)
                .await?
        } else {
            Vec::new()
        };

        let factory_traded = FactoryTransaction::find()
            .filter(factory_transaction::Column::FactoryId.eq(factory_id))
            .filter(factory_transaction::Column::PartyName.eq(pname))
            .count(db)
            .await?
            > 0;
        let factory_payments = if factory_traded {
            owner_ledger::<factory_payment::Entity, _>(
                factory_payment::Column::FactoryId,
                factory_id,
                range,
            )
            .filter(Condition::all().add(factory_payment::Column::FactoryName.eq(fname)))
            .all(db)
            .await?
        } else {
            Vec::new()
        };

        Ok(HisabReport {
            party_transactions: with_serials(party_transactions),
            party_payments: with_serials(party_payments),
            factory_transactions: with_serials(factory_transactions),
            factory_payments: with_serials(factory_payments),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn party_txn(id: i32, vehicle: &str, day: u32, amount: Decimal) -> party_transaction::Model {
        party_transaction::Model {
            id,
            party_id: 1,
            factory_id: Some(1),
            date: date(day),
            vehicle_no: Some(vehicle.to_string()),
            weight: dec!(10),
            rate: dec!(5),
            moisture: Decimal::ZERO,
            rejection: Decimal::ZERO,
            duplex: Decimal::ZERO,
            first: Decimal::ZERO,
            second: Decimal::ZERO,
            third: Decimal::ZERO,
            total_amount: amount,
            remarks: None,
            party_name: Some("A".to_string()),
            factory_name: Some("B".to_string()),
            created_at: Utc::now(),
        }
    }

    fn factory_txn(id: i32, vehicle: &str, day: u32) -> factory_transaction::Model {
        factory_transaction::Model {
            id,
            factory_id: 1,
            party_id: Some(1),
            date: date(day),
            vehicle_no: Some(vehicle.to_string()),
            weight: dec!(10),
            rate: dec!(6),
            moisture: Decimal::ZERO,
            rejection: Decimal::ZERO,
            duplex: Decimal::ZERO,
            first: Decimal::ZERO,
            second: Decimal::ZERO,
            third: Decimal::ZERO,
            total_amount: dec!(60),
            remarks: None,
            factory_name: Some("B".to_string()),
            party_name: Some("A".to_string()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn mode_follows_supplied_ids() {
        let mut query = HisabQuery::default();
        assert_eq!(query.mode(), SelectionMode::Empty);
        query.party_id = Some(5);
        assert_eq!(query.mode(), SelectionMode::PartyOnly(5));
        query.factory_id = Some(2);
        assert_eq!(
            query.mode(),
            SelectionMode::Both {
                party_id: 5,
                factory_id: 2
            }
        );
        query.party_id = None;
        assert_eq!(query.mode(), SelectionMode::FactoryOnly(2));
    }

    #[test]
    fn serials_run_from_one() {
        let numbered = with_serials(vec!["c", "b", "a"]);
        let serials: Vec<usize> = numbered.iter().map(|s| s.serial).collect();
        assert_eq!(serials, vec![1, 2, 3]);
        assert_eq!(numbered[0].record, "c");
        assert!(with_serials(Vec::<u8>::new()).is_empty());
    }

    #[test]
    fn identical_keys_match_with_party_amount() {
        let result =
            intersect(&[party_txn(1, "XY1", 1, dec!(50))], &[factory_txn(9, "XY1", 1)]).unwrap();
        assert_eq!(result.matched_count, 1);
        assert_eq!(result.rows[0].total_amount, dec!(50));
        assert_eq!(result.rows[0].party_transaction_id, 1);
        assert_eq!(result.rows[0].factory_transaction_id, 9);
        assert_eq!(result.total_amount, dec!(50));
    }

    #[test]
    fn any_differing_key_field_breaks_the_match() {
        let party = [party_txn(1, "XY1", 1, dec!(50))];

        let other_vehicle = factory_txn(9, "XY2", 1);
        let other_date = factory_txn(9, "XY1", 2);
        let mut other_party = factory_txn(9, "XY1", 1);
        other_party.party_name = Some("A2".to_string());
        let mut other_factory = factory_txn(9, "XY1", 1);
        other_factory.factory_name = None;

        for ft in [other_vehicle, other_date, other_party, other_factory] {
            assert_eq!(intersect(&party, &[ft]).unwrap().matched_count, 0);
        }
    }

    #[test]
    fn each_factory_row_is_used_once() {
        let party = [
            party_txn(1, "XY1", 1, dec!(50)),
            party_txn(2, "XY1", 1, dec!(40)),
        ];
        let result = intersect(&party, &[factory_txn(9, "XY1", 1)]).unwrap();
        assert_eq!(result.matched_count, 1);
        assert_eq!(result.rows[0].party_transaction_id, 1);

        let both =
            intersect(&party, &[factory_txn(9, "XY1", 1), factory_txn(8, "XY1", 1)]).unwrap();
        assert_eq!(both.matched_count, 2);
        assert_eq!(both.total_amount, dec!(90));
    }

    #[test]
    fn no_rows_no_matches() {
        assert_eq!(intersect(&[], &[]).unwrap(), Intersection::default());
    }

    #[test]
    fn overflowing_intersection_total_is_an_error() {
        let party = [
            party_txn(1, "XY1", 1, Decimal::MAX),
            party_txn(2, "XY1", 1, Decimal::MAX),
        ];
        let factory = [factory_txn(9, "XY1", 1), factory_txn(8, "XY1", 1)];
        assert!(matches!(
            intersect(&party, &factory),
            Err(ServiceError::InternalError(_))
        ));
    }
}
