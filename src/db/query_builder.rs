use chrono::NaiveDate;
use sea_orm::{
    sea_query::{Expr, Func, LikeExpr},
    ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, Select,
};
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

/// Inclusive `[from, to]` date window; a missing bound is open on that side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Self, ServiceError> {
        if let (Some(f), Some(t)) = (from, to) {
            if f > t {
                return Err(ServiceError::ValidationError(format!(
                    "from ({}) must not be after to ({})",
                    f, t
                )));
            }
        }
        Ok(Self { from, to })
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |f| date >= f) && self.to.map_or(true, |t| date <= t)
    }

    /// SQL condition equivalent of [`DateRange::contains`] on `column`.
    pub fn condition<C: ColumnTrait>(&self, column: C) -> Condition {
        let mut cond = Condition::all();
        if let Some(from) = self.from {
            cond = cond.add(column.gte(from));
        }
        if let Some(to) = self.to {
            cond = cond.add(column.lte(to));
        }
        cond
    }
}

/// Ledger tables carry a business date and an auto-increment id used for ordering.
pub trait DatedLedger: EntityTrait {
    fn date_column() -> Self::Column;
    fn id_column() -> Self::Column;
}

/// Builder for ledger reads: filters, date window, newest first.
pub struct LedgerQuery<E: DatedLedger> {
    query: Select<E>,
}

impl<E: DatedLedger> Default for LedgerQuery<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: DatedLedger> LedgerQuery<E> {
    pub fn new() -> Self {
        Self { query: E::find() }
    }

    /// Restrict to rows owned by `owner_id` through `column`
    pub fn owned_by<C: ColumnTrait>(mut self, column: C, owner_id: i32) -> Self {
        self.query = self.query.filter(column.eq(owner_id));
        self
    }

    /// Add an arbitrary filter condition
    pub fn filter(mut self, condition: Condition) -> Self {
        self.query = self.query.filter(condition);
        self
    }

    pub fn within(mut self, range: &DateRange) -> Self {
        self.query = self.query.filter(range.condition(E::date_column()));
        self
    }

    /// Final query ordered `date DESC, id DESC`
    pub fn into_select(self) -> Select<E> {
        self.query
            .order_by_desc(E::date_column())
            .order_by_desc(E::id_column())
    }

    pub async fn all<C>(self, db: &C) -> Result<Vec<E::Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        self.into_select().all(db).await
    }
}

/// The dominant read: one owner's rows in a date window, newest first.
pub fn owner_ledger<E, C>(column: C, owner_id: i32, range: &DateRange) -> LedgerQuery<E>
where
    E: DatedLedger,
    C: ColumnTrait,
{
    LedgerQuery::new().owned_by(column, owner_id).within(range)
}

/// Case-insensitive substring match on a text column.
/// `%`, `_` and `\` in the needle match themselves.
pub fn name_contains<C: ColumnTrait>(column: C, needle: &str) -> Condition {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.trim().to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    let pattern = LikeExpr::new(format!("%{}%", escaped)).escape('\\');
    Condition::all().add(Expr::expr(Func::lower(Expr::col(column))).like(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn unbounded_range_contains_everything() {
        let range = DateRange::unbounded();
        assert!(range.contains(d(1999, 1, 1)));
        assert!(range.contains(d(2099, 12, 31)));
    }

    #[test]
    fn bounds_are_inclusive() {
        let range = DateRange::new(Some(d(2024, 1, 1)), Some(d(2024, 1, 31))).unwrap();
        assert!(range.contains(d(2024, 1, 1)));
        assert!(range.contains(d(2024, 1, 31)));
        assert!(!range.contains(d(2023, 12, 31)));
        assert!(!range.contains(d(2024, 2, 1)));
    }

    #[test]
    fn half_open_ranges() {
        let from_only = DateRange::new(Some(d(2024, 3, 1)), None).unwrap();
        assert!(from_only.contains(d(2030, 1, 1)));
        assert!(!from_only.contains(d(2024, 2, 29)));

        let to_only = DateRange::new(None, Some(d(2024, 3, 1))).unwrap();
        assert!(to_only.contains(d(2000, 1, 1)));
        assert!(!to_only.contains(d(2024, 3, 2)));
    }

    #[test]
    fn name_filter_escapes_wildcards() {
        use crate::entities::party;
        use sea_orm::{DbBackend, QueryTrait, Value};

        let statement = party::Entity::find()
            .filter(name_contains(party::Column::Name, " 50%_Off\\ "))
            .build(DbBackend::Sqlite);
        assert!(statement.sql.contains("ESCAPE"), "{}", statement.sql);
        let values = statement.values.map(|v| v.0).unwrap_or_default();
        assert!(values.contains(&Value::from(r"%50\%\_off\\%")), "{values:?}");
    }

    #[test]
    fn inverted_range_is_rejected() {
        let err = DateRange::new(Some(d(2024, 2, 1)), Some(d(2024, 1, 1))).unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }
}
