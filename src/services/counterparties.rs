use crate::{
    db::query_builder::name_contains,
    entities::{
        factory, factory_payment, factory_transaction, party, party_payment, party_transaction,
        BusinessType, Factory, FactoryPayment, FactoryTransaction, Party, PartyPayment,
        PartyTransaction,
    },
    errors::ServiceError,
    services::gstin::is_valid_format,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::Deserialize;
use std::{str::FromStr, sync::Arc};
use tracing::{info, instrument};
use validator::Validate;

/// Create/update payload shared by parties and factories
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CounterpartyInput {
    #[validate(length(max = 255, message = "name is too long"))]
    pub name: Option<String>,
    #[validate(length(max = 100))]
    pub contact: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    pub gstin: Option<String>,
    pub business_type: Option<String>,
}

/// Validated and normalized form of [`CounterpartyInput`]
#[derive(Debug, Clone, PartialEq)]
struct CleanInput {
    name: Option<String>,
    contact: Option<Option<String>>,
    address: Option<Option<String>>,
    gstin: Option<Option<String>>,
    business_type: Option<BusinessType>,
}

fn blank_to_none(value: Option<String>) -> Option<Option<String>> {
    value.map(|v| {
        let trimmed = v.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

impl CounterpartyInput {
    /// `require_name` is set for creates; updates leave absent fields untouched.
    fn clean(self, require_name: bool) -> Result<CleanInput, ServiceError> {
        self.validate()?;

        let name = match self.name.as_deref().map(str::trim) {
            Some("") | None if require_name => return Err(ServiceError::missing_field("name")),
            Some("") => return Err(ServiceError::ValidationError("name must not be blank".into())),
            other => other.map(str::to_string),
        };

        let gstin = blank_to_none(self.gstin);
        if let Some(Some(ref g)) = gstin {
            if !is_valid_format(g) {
                return Err(ServiceError::InvalidGstin(format!(
                    "{} is not a valid 15-character GSTIN",
                    g
                )));
            }
        }

        let business_type = match blank_to_none(self.business_type).flatten() {
            Some(raw) => Some(BusinessType::from_str(&raw.to_lowercase()).map_err(|_| {
                ServiceError::ValidationError(format!(
                    "business_type must be registered or unregistered, got {}",
                    raw
                ))
            })?),
            None => None,
        };

        Ok(CleanInput {
            name,
            contact: blank_to_none(self.contact),
            address: blank_to_none(self.address),
            gstin,
            business_type,
        })
    }
}

pub(crate) async fn party_name<C: ConnectionTrait>(
    db: &C,
    party_id: i32,
) -> Result<Option<String>, DbErr> {
    Party::find_by_id(party_id)
        .select_only()
        .column(party::Column::Name)
        .into_tuple::<String>()
        .one(db)
        .await
}

pub(crate) async fn factory_name<C: ConnectionTrait>(
    db: &C,
    factory_id: i32,
) -> Result<Option<String>, DbErr> {
    Factory::find_by_id(factory_id)
        .select_only()
        .column(factory::Column::Name)
        .into_tuple::<String>()
        .one(db)
        .await
}

/// Service for managing parties (sellers)
#[derive(Clone)]
pub struct PartyService {
    db: Arc<DatabaseConnection>,
}

impl PartyService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input))]
    pub async fn create(&self, input: CounterpartyInput) -> Result<party::Model, ServiceError> {
        let clean = input.clean(true)?;

        let model = party::ActiveModel {
            name: Set(clean.name.unwrap_or_default()),
            contact: Set(clean.contact.flatten()),
            address: Set(clean.address.flatten()),
            gstin: Set(clean.gstin.flatten()),
            business_type: Set(clean.business_type.unwrap_or_default()),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        info!(party_id = model.id, "Party created");
        Ok(model)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<party::Model, ServiceError> {
        Party::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Party {} not found", id)))
    }

    /// All parties ordered by name, optionally filtered by a name fragment
    #[instrument(skip(self))]
    pub async fn list(&self, name: Option<&str>) -> Result<Vec<party::Model>, ServiceError> {
        let mut query = Party::find();
        if let Some(fragment) = name.filter(|n| !n.trim().is_empty()) {
            query = query.filter(name_contains(party::Column::Name, fragment));
        }
        Ok(query
            .order_by_asc(party::Column::Name)
            .order_by_asc(party::Column::Id)
            .all(&*self.db)
            .await?)
    }

    /// Renaming does not touch names already copied onto ledger rows.
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: i32,
        input: CounterpartyInput,
    ) -> Result<party::Model, ServiceError> {
        let clean = input.clean(false)?;
        let mut model: party::ActiveModel = self.get(id).await?.into();

        if let Some(name) = clean.name {
            model.name = Set(name);
        }
        if let Some(contact) = clean.contact {
            model.contact = Set(contact);
        }
        if let Some(address) = clean.address {
            model.address = Set(address);
        }
        if let Some(gstin) = clean.gstin {
            model.gstin = Set(gstin);
        }
        if let Some(business_type) = clean.business_type {
            model.business_type = Set(business_type);
        }

        let updated = model.update(&*self.db).await?;
        info!(party_id = id, "Party updated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        self.get(id).await?;

        let db = &*self.db;
        let transactions = PartyTransaction::find()
            .filter(party_transaction::Column::PartyId.eq(id))
            .count(db)
            .await?;
        let payments = PartyPayment::find()
            .filter(party_payment::Column::PartyId.eq(id))
            .count(db)
            .await?;
        if transactions + payments > 0 {
            return Err(ServiceError::Conflict(format!(
                "Party {} has {} transaction(s) and {} payment(s)",
                id, transactions, payments
            )));
        }

        Party::delete_by_id(id).exec(db).await?;
        info!(party_id = id, "Party deleted");
        Ok(())
    }
}

/// Service for managing factories (buyers)
#[derive(Clone)]
pub struct FactoryService {
    db: Arc<DatabaseConnection>,
}

impl FactoryService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input))]
    pub async fn create(&self, input: CounterpartyInput) -> Result<factory::Model, ServiceError> {
        let clean = input.clean(true)?;

        let model = factory::ActiveModel {
            name: Set(clean.name.unwrap_or_default()),
            contact: Set(clean.contact.flatten()),
            address: Set(clean.address.flatten()),
            gstin: Set(clean.gstin.flatten()),
            business_type: Set(clean.business_type.unwrap_or_default()),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        info!(factory_id = model.id, "Factory created");
        Ok(model)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<factory::Model, ServiceError> {
        Factory::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Factory {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn list(&self, name: Option<&str>) -> Result<Vec<factory::Model>, ServiceError> {
        let mut query = Factory::find();
        if let Some(fragment) = name.filter(|n| !n.trim().is_empty()) {
            query = query.filter(name_contains(factory::Column::Name, fragment));
        }
        Ok(query
            .order_by_asc(factory::Column::Name)
            .order_by_asc(factory::Column::Id)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: i32,
        input: CounterpartyInput,
    ) -> Result<factory::Model, ServiceError> {
        let clean = input.clean(false)?;
        let mut model: factory::ActiveModel = self.get(id).await?.into();

        if let Some(name) = clean.name {
            model.name = Set(name);
        }
        if let Some(contact) = clean.contact {
            model.contact = Set(contact);
        }
        if let Some(address) = clean.address {
            model.address = Set(address);
        }
        if let Some(gstin) = clean.gstin {
            model.gstin = Set(gstin);
        }
        if let Some(business_type) = clean.business_type {
            model.business_type = Set(business_type);
        }

        let updated = model.update(&*self.db).await?;
        info!(factory_id = id, "Factory updated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        self.get(id).await?;

        let db = &*self.db;
        let transactions = FactoryTransaction::find()
            .filter(factory_transaction::Column::FactoryId.eq(id))
            .count(db)
            .await?;
        let payments = FactoryPayment::find()
            .filter(factory_payment::Column::FactoryId.eq(id))
            .count(db)
            .await?;
        if transactions + payments > 0 {
            return Err(ServiceError::Conflict(format!(
                "Factory {} has {} transaction(s) and {} payment(s)",
                id, transactions, payments
            )));
        }

        Factory::delete_by_id(id).exec(db).await?;
        info!(factory_id = id, "Factory deleted");
        Ok(())
    }
}
