pub mod factory;
pub mod factory_payment;
pub mod factory_transaction;
pub mod party;
pub mod party_payment;
pub mod party_transaction;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub use factory::Entity as Factory;
pub use factory_payment::Entity as FactoryPayment;
pub use factory_transaction::Entity as FactoryTransaction;
pub use party::Entity as Party;
pub use party_payment::Entity as PartyPayment;
pub use party_transaction::Entity as PartyTransaction;

/// GST registration status of a counterparty
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BusinessType {
    #[sea_orm(string_value = "registered")]
    Registered,
    #[default]
    #[sea_orm(string_value = "unregistered")]
    Unregistered,
}
