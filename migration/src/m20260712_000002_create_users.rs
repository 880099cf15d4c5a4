use sea_orm_migration::prelude::*;

use super::m20260712_000001_create_subscriptions::Subscriptions;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Users::Table)
          .if_not_exists()
          .col(ColumnDef::new(Users::Username).text().not_null().primary_key())
          .col(ColumnDef::new(Users::SubscriptionId).big_integer().not_null())
          .col(ColumnDef::new(Users::Traffic).double().not_null().default(0.0))
          .col(ColumnDef::new(Users::ChatId).big_integer().not_null().default(0))
          .foreign_key(
            ForeignKey::create()
              .name("fk_users_subscription")
              .from(Users::Table, Users::SubscriptionId)
              .to(Subscriptions::Table, Subscriptions::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_users_subscription")
          .table(Users::Table)
          .col(Users::SubscriptionId)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Users::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Users {
  Table,
  Username,
  SubscriptionId,
  Traffic,
  ChatId,
}
