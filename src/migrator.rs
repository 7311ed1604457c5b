use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_counterparty_tables::Migration),
            Box::new(m20240101_000002_create_transaction_tables::Migration),
            Box::new(m20240101_000003_create_payment_tables::Migration),
        ]
    }
}

// Money columns are DECIMAL(14,2); weight keeps three places for kilogram fractions.
fn money(col: impl IntoIden) -> ColumnDef {
    ColumnDef::new(col)
        .decimal_len(14, 2)
        .not_null()
        .default(0)
        .to_owned()
}

mod m20240101_000001_create_counterparty_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_counterparty_tables"
        }
    }

    /// Parties and factories share one shape.
    fn counterparty_table(table: impl IntoIden + Copy + 'static) -> TableCreateStatement {
        Table::create()
            .table(table)
            .if_not_exists()
            .col(
                ColumnDef::new(Counterparty::Id)
                    .integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(ColumnDef::new(Counterparty::Name).string().not_null())
            .col(ColumnDef::new(Counterparty::Contact).string().null())
            .col(ColumnDef::new(Counterparty::Address).string().null())
            .col(ColumnDef::new(Counterparty::Gstin).string_len(15).null())
            .col(
                ColumnDef::new(Counterparty::BusinessType)
                    .string()
                    .not_null()
                    .default("unregistered"),
            )
            .col(
                ColumnDef::new(Counterparty::CreatedAt)
                    .timestamp_with_time_zone()
                    .not_null(),
            )
            .to_owned()
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(counterparty_table(Parties::Table))
                .await?;
            manager
                .create_table(counterparty_table(Factories::Table))
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_parties_name")
                        .table(Parties::Table)
                        .col(Counterparty::Name)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_factories_name")
                        .table(Factories::Table)
                        .col(Counterparty::Name)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Factories::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Parties::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden, Clone, Copy)]
    pub(super) enum Parties {
        Table,
    }

    #[derive(DeriveIden, Clone, Copy)]
    pub(super) enum Factories {
        Table,
    }

    #[derive(DeriveIden)]
    enum Counterparty {
        Id,
        Name,
        Contact,
        Address,
        Gstin,
        BusinessType,
        CreatedAt,
    }
}

mod m20240101_000002_create_transaction_tables {

    use super::m20240101_000001_create_counterparty_tables::{Factories, Parties};
    use super::money;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_transaction_tables"
        }
    }

    /// Both ledgers carry identical columns; only the owning key differs.
    fn ledger_table(
        table: impl IntoIden + Copy + 'static,
        owner: Txn,
        owner_table: impl IntoIden + 'static,
        counter: Txn,
        fk_name: &str,
    ) -> TableCreateStatement {
        Table::create()
            .table(table)
            .if_not_exists()
            .col(
                ColumnDef::new(Txn::Id)
                    .integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(ColumnDef::new(owner).integer().not_null())
            .col(ColumnDef::new(counter).integer().null())
            .col(ColumnDef::new(Txn::Date).date().not_null())
            .col(ColumnDef::new(Txn::VehicleNo).string().null())
            .col(
                ColumnDef::new(Txn::Weight)
                    .decimal_len(14, 3)
                    .not_null()
                    .default(0),
            )
            .col(money(Txn::Rate))
            .col(money(Txn::Moisture))
            .col(money(Txn::Rejection))
            .col(money(Txn::Duplex))
            .col(money(Txn::First))
            .col(money(Txn::Second))
            .col(money(Txn::Third))
            .col(money(Txn::TotalAmount))
            .col(ColumnDef::new(Txn::Remarks).string().null())
            .col(ColumnDef::new(Txn::PartyName).string().null())
            .col(ColumnDef::new(Txn::FactoryName).string().null())
            .col(
                ColumnDef::new(Txn::CreatedAt)
                    .timestamp_with_time_zone()
                    .not_null(),
            )
            .foreign_key(
                ForeignKey::create()
                    .name(fk_name)
                    .from(table, owner)
                    .to(owner_table, Txn::Id),
            )
            .to_owned()
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(ledger_table(
                    PartyTransactions::Table,
                    Txn::PartyId,
                    Parties::Table,
                    Txn::FactoryId,
                    "fk_party_transactions_party",
                ))
                .await?;

            manager
                .create_table(ledger_table(
                    FactoryTransactions::Table,
                    Txn::FactoryId,
                    Factories::Table,
                    Txn::PartyId,
                    "fk_factory_transactions_factory",
                ))
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_party_transactions_party_date")
                        .table(PartyTransactions::Table)
                        .col(Txn::PartyId)
                        .col(Txn::Date)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_factory_transactions_factory_date")
                        .table(FactoryTransactions::Table)
                        .col(Txn::FactoryId)
                        .col(Txn::Date)
                        .to_owned(),
                )
                .await?;

            // Hisab both-mode matches on snapshot names
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_party_transactions_names")
                        .table(PartyTransactions::Table)
                        .col(Txn::PartyName)
                        .col(Txn::FactoryName)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_factory_transactions_names")
                        .table(FactoryTransactions::Table)
                        .col(Txn::FactoryName)
                        .col(Txn::PartyName)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(FactoryTransactions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PartyTransactions::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden, Clone, Copy)]
    enum PartyTransactions {
        Table,
    }

    #[derive(DeriveIden, Clone, Copy)]
    enum FactoryTransactions {
        Table,
    }

    #[derive(DeriveIden, Clone, Copy)]
    enum Txn {
        Id,
        PartyId,
        FactoryId,
        Date,
        VehicleNo,
        Weight,
        Rate,
        Moisture,
        Rejection,
        Duplex,
        First,
        Second,
        Third,
        TotalAmount,
        Remarks,
        PartyName,
        FactoryName,
        CreatedAt,
    }
}

mod m20240101_000003_create_payment_tables {

    use super::m20240101_000001_create_counterparty_tables::{Factories, Parties};
    use super::money;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_payment_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PartyPayments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PartyPayments::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(PartyPayments::PartyId).integer().not_null())
                        .col(ColumnDef::new(PartyPayments::PartyName).string().not_null())
                        .col(ColumnDef::new(PartyPayments::Date).date().not_null())
                        .col(money(PartyPayments::AmountPaid))
                        .col(money(PartyPayments::TotalAmount))
                        .col(money(PartyPayments::RemainingAmount))
                        .col(ColumnDef::new(PartyPayments::Remarks).string().null())
                        .col(
                            ColumnDef::new(PartyPayments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_party_payments_party")
                                .from(PartyPayments::Table, PartyPayments::PartyId)
                                .to(Parties::Table, PartyPayments::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(FactoryPayments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(FactoryPayments::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(FactoryPayments::FactoryId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(FactoryPayments::FactoryName)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(FactoryPayments::Date).date().not_null())
                        .col(money(FactoryPayments::AmountReceived))
                        .col(money(FactoryPayments::TotalAmount))
                        .col(money(FactoryPayments::RemainingAmount))
                        .col(ColumnDef::new(FactoryPayments::Remarks).string().null())
                        .col(
                            ColumnDef::new(FactoryPayments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_factory_payments_factory")
                                .from(FactoryPayments::Table, FactoryPayments::FactoryId)
                                .to(Factories::Table, FactoryPayments::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_party_payments_party_date")
                        .table(PartyPayments::Table)
                        .col(PartyPayments::PartyId)
                        .col(PartyPayments::Date)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_factory_payments_factory_date")
                        .table(FactoryPayments::Table)
                        .col(FactoryPayments::FactoryId)
                        .col(FactoryPayments::Date)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(FactoryPayments::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PartyPayments::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum PartyPayments {
        Table,
        Id,
        PartyId,
        PartyName,
        Date,
        AmountPaid,
        TotalAmount,
        RemainingAmount,
        Remarks,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum FactoryPayments {
        Table,
        Id,
        FactoryId,
        FactoryName,
        Date,
        AmountReceived,
        TotalAmount,
        RemainingAmount,
        Remarks,
        CreatedAt,
    }
}
