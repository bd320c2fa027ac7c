//! Initial migration: repositories, accounts and daily counters.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        self.create_repositories(manager).await?;
        self.create_accounts(manager).await?;
        self.create_daily_counters(manager).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DailyCounters::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Repositories::Table).to_owned())
            .await?;
        Ok(())
    }
}

impl Migration {
    async fn create_repositories(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Repositories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Repositories::Id)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    // Identity
                    .col(ColumnDef::new(Repositories::NodeId).string().not_null())
                    .col(ColumnDef::new(Repositories::Name).string().not_null())
                    .col(ColumnDef::new(Repositories::Url).text().not_null())
                    // Content
                    .col(
                        ColumnDef::new(Repositories::Languages)
                            .json()
                            .not_null()
                            .default(Expr::cust("'[]'")),
                    )
                    .col(ColumnDef::new(Repositories::Description).text().null())
                    // Statistics
                    .col(
                        ColumnDef::new(Repositories::Stars)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Repositories::Stars1d).big_integer().null())
                    .col(ColumnDef::new(Repositories::Stars7d).big_integer().null())
                    .col(ColumnDef::new(Repositories::Stars30d).big_integer().null())
                    // Timestamps
                    .col(
                        ColumnDef::new(Repositories::CreatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Repositories::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Ranking queries sort by these
        for (name, column) in [
            ("idx_repositories_stars", Repositories::Stars),
            ("idx_repositories_stars_1d", Repositories::Stars1d),
            ("idx_repositories_stars_7d", Repositories::Stars7d),
            ("idx_repositories_stars_30d", Repositories::Stars30d),
        ] {
            manager
                .create_index(
                    Index::create()
                        .name(name)
                        .table(Repositories::Table)
                        .col(column)
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn create_accounts(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Accounts::Id)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Accounts::NodeId).string().not_null())
                    .col(ColumnDef::new(Accounts::Login).string().not_null())
                    .col(ColumnDef::new(Accounts::Name).string().null())
                    .col(ColumnDef::new(Accounts::AvatarUrl).text().not_null())
                    .col(ColumnDef::new(Accounts::Url).text().not_null())
                    .col(
                        ColumnDef::new(Accounts::Followers)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Accounts::TopRepoStars)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Accounts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_accounts_followers")
                    .table(Accounts::Table)
                    .col(Accounts::Followers)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_daily_counters(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DailyCounters::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DailyCounters::Date)
                            .date()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DailyCounters::TotalRepositories)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(DailyCounters::TotalAccounts)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(DailyCounters::FetchedRepositories)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(DailyCounters::FetchedAccounts)
                            .big_integer()
                            .null(),
                    )
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum Repositories {
    Table,
    Id,
    NodeId,
    Name,
    Url,
    Languages,
    Description,
    Stars,
    #[sea_orm(iden = "stars_1d")]
    Stars1d,
    #[sea_orm(iden = "stars_7d")]
    Stars7d,
    #[sea_orm(iden = "stars_30d")]
    Stars30d,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Accounts {
    Table,
    Id,
    NodeId,
    Login,
    Name,
    AvatarUrl,
    Url,
    Followers,
    TopRepoStars,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum DailyCounters {
    Table,
    Date,
    TotalRepositories,
    TotalAccounts,
    FetchedRepositories,
    FetchedAccounts,
}
