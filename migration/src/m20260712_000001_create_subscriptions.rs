use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Subscriptions::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Subscriptions::Id)
              .big_integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(
            ColumnDef::new(Subscriptions::Status)
              .text()
              .not_null()
              .default("inactive"),
          )
          .col(
            ColumnDef::new(Subscriptions::Duration)
              .text()
              .not_null()
              .default("month"),
          )
          .col(
            ColumnDef::new(Subscriptions::StartDate).date_time().not_null(),
          )
          .col(ColumnDef::new(Subscriptions::EndDate).date_time().not_null())
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(Subscriptions::Table).to_owned())
      .await
  }
}

#[derive(DeriveIden)]
pub enum Subscriptions {
  Table,
  Id,
  Status,
  Duration,
  StartDate,
  EndDate,
}
