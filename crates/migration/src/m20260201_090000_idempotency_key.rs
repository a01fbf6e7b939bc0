use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Expenses {
    Table,
    GroupId,
    CreatedBy,
    IdempotencyKey,
}

#[derive(Iden)]
enum Settlements {
    Table,
    GroupId,
    CreatedBy,
    IdempotencyKey,
}

const EXPENSES_INDEX: &str = "uidx-expenses-group_id-created_by-idempotency_key";
const SETTLEMENTS_INDEX: &str = "uidx-settlements-group_id-created_by-idempotency_key";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(Expenses::Table)
                    .add_column(ColumnDef::new(Expenses::IdempotencyKey).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name(EXPENSES_INDEX)
                    .table(Expenses::Table)
                    .col(Expenses::GroupId)
                    .col(Expenses::CreatedBy)
                    .col(Expenses::IdempotencyKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .alter_table(
                Table::alter()
                    .table(Settlements::Table)
                    .add_column(ColumnDef::new(Settlements::IdempotencyKey).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name(SETTLEMENTS_INDEX)
                    .table(Settlements::Table)
                    .col(Settlements::GroupId)
                    .col(Settlements::CreatedBy)
                    .col(Settlements::IdempotencyKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name(SETTLEMENTS_INDEX)
                    .table(Settlements::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .alter_table(
                Table::alter()
                    .table(Settlements::Table)
                    .drop_column(Settlements::IdempotencyKey)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name(EXPENSES_INDEX)
                    .table(Expenses::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .alter_table(
                Table::alter()
                    .table(Expenses::Table)
                    .drop_column(Expenses::IdempotencyKey)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}
