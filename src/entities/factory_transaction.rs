use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{entity::prelude::*, ActiveValue::Set};
use serde::{Deserialize, Serialize};

use crate::db::query_builder::DatedLedger;

/// A truckload sold to a factory.
///
/// Deduction columns are zero unless the row was mirrored from a party transaction.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "factory_transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub factory_id: i32,
    pub party_id: Option<i32>,
    pub date: NaiveDate,
    pub vehicle_no: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((14, 3)))")]
    pub weight: Decimal,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub rate: Decimal,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub moisture: Decimal,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub rejection: Decimal,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub duplex: Decimal,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub first: Decimal,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub second: Decimal,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub third: Decimal,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub total_amount: Decimal,
    pub remarks: Option<String>,
    pub factory_name: Option<String>,
    pub party_name: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::factory::Entity",
        from = "Column::FactoryId",
        to = "super::factory::Column::Id"
    )]
    Factory,
}

impl Related<super::factory::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Factory.def()
    }
}

impl DatedLedger for Entity {
    fn date_column() -> Column {
        Column::Date
    }

    fn id_column() -> Column {
        Column::Id
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        if insert {
            active_model.created_at = Set(Utc::now());
        }
        Ok(active_model)
    }
}
