use sea_orm::sea_query::{Expr, Query};
use tokio::sync::Mutex;

use crate::{
  entity::{Status, subscription, user},
  model::{self, NewUser, Subscription, SubscriptionUpdate, User},
  prelude::*,
};

/// User/subscription store. Mutations are serialized by the store-wide
/// write lock; reads go straight to the connection and may observe a
/// mutation mid-flight.
pub struct Users<'a> {
  db: &'a DatabaseConnection,
  write: &'a Mutex<()>,
}

impl<'a> Users<'a> {
  pub fn new(db: &'a DatabaseConnection, write: &'a Mutex<()>) -> Self {
    Self { db, write }
  }

  /// Creates the user together with its subscription row. Embedded
  /// subscription values are used when present, defaults otherwise.
  pub async fn create(&self, new: &NewUser) -> Result<User> {
    let _guard = self.write.lock().await;

    if new.username.trim().is_empty() {
      return Err(Error::InvalidUsername);
    }
    if self.exists(&new.username).await? {
      return Err(Error::UserExists);
    }

    let txn = self.db.begin().await?;

    let sub = match &new.subscription {
      Some(fields) => subscription::ActiveModel {
        status: Set(fields.status.clone()),
        duration: Set(fields.duration.clone()),
        start_date: Set(fields.start_date),
        end_date: Set(fields.end_date),
        ..Default::default()
      },
      None => subscription::ActiveModel {
        status: Set(Status::Inactive),
        duration: Set("month".into()),
        start_date: Set(Utc::now().naive_utc()),
        end_date: Set(model::epoch()),
        ..Default::default()
      },
    };
    let sub = sub.insert(&txn).await?;

    let stored = user::ActiveModel {
      username: Set(new.username.clone()),
      subscription_id: Set(sub.id),
      traffic: Set(0.0),
      chat_id: Set(new.chat_id),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    info!("User {} created successfully", stored.username);

    Ok(User {
      username: stored.username,
      chat_id: stored.chat_id,
      traffic: stored.traffic,
      subscription: Subscription::from(sub),
    })
  }

  /// Joined read; an absent account is `None`, never an error.
  pub async fn user(&self, username: &str) -> Result<Option<User>> {
    let Some((stored, sub)) = user::Entity::find_by_id(username)
      .find_also_related(subscription::Entity)
      .one(self.db)
      .await?
    else {
      return Ok(None);
    };

    let Some(sub) = sub else {
      // a concurrent delete can leave the join half-visible
      warn!("User {username} has no subscription row");
      return Ok(None);
    };

    Ok(Some(User {
      username: stored.username,
      chat_id: stored.chat_id,
      traffic: stored.traffic,
      subscription: Subscription::from(sub),
    }))
  }

  /// Replaces all four mutable subscription fields.
  pub async fn update_subscription(
    &self,
    username: &str,
    fields: &SubscriptionUpdate,
  ) -> Result<()> {
    let _guard = self.write.lock().await;

    let Some(stored) =
      user::Entity::find_by_id(username).one(self.db).await?
    else {
      return Err(Error::UserNotFound);
    };

    let Some(sub) = subscription::Entity::find_by_id(stored.subscription_id)
      .one(self.db)
      .await?
    else {
      return Err(Error::UserNotFound);
    };

    let mut sub: subscription::ActiveModel = sub.into();
    sub.status = Set(fields.status.clone());
    sub.duration = Set(fields.duration.clone());
    sub.start_date = Set(fields.start_date);
    sub.end_date = Set(fields.end_date);
    sub.update(self.db).await?;

    Ok(())
  }

  /// Removes the user and, in the same transaction, its subscription row
  /// unless another user still references it. Missing users are a no-op.
  pub async fn delete(&self, username: &str) -> Result<()> {
    let _guard = self.write.lock().await;

    let Some(stored) =
      user::Entity::find_by_id(username).one(self.db).await?
    else {
      return Ok(());
    };

    let txn = self.db.begin().await?;

    user::Entity::delete_by_id(username).exec(&txn).await?;

    let referencing = user::Entity::find()
      .filter(user::Column::SubscriptionId.eq(stored.subscription_id))
      .count(&txn)
      .await?;
    if referencing == 0 {
      subscription::Entity::delete_by_id(stored.subscription_id)
        .exec(&txn)
        .await?;
    }

    txn.commit().await?;

    info!("User {username} and their subscription deleted");
    Ok(())
  }

  pub async fn exists(&self, username: &str) -> Result<bool> {
    Ok(user::Entity::find_by_id(username).count(self.db).await? > 0)
  }

  pub async fn subscription_status(&self, username: &str) -> Result<Status> {
    let Some((_, Some(sub))) = user::Entity::find_by_id(username)
      .find_also_related(subscription::Entity)
      .one(self.db)
      .await?
    else {
      return Err(Error::UserNotFound);
    };

    Ok(sub.status)
  }

  /// Sets traffic to exactly `traffic`. Affects zero rows when the user
  /// is absent; kept as a silent no-op.
  pub async fn update_traffic(
    &self,
    username: &str,
    traffic: f64,
  ) -> Result<()> {
    let _guard = self.write.lock().await;

    user::Entity::update_many()
      .col_expr(user::Column::Traffic, Expr::value(traffic))
      .filter(user::Column::Username.eq(username))
      .exec(self.db)
      .await?;

    Ok(())
  }

  pub async fn reset_traffic(&self, username: &str) -> Result<()> {
    self.update_traffic(username, 0.0).await
  }

  pub async fn all_usernames(&self) -> Result<Vec<String>> {
    let usernames = user::Entity::find()
      .select_only()
      .column(user::Column::Username)
      .into_tuple::<String>()
      .all(self.db)
      .await?;
    Ok(usernames)
  }

  /// Deletes every subscription row no user references. Run at startup to
  /// repair state left behind by a crash mid-delete.
  pub async fn cleanup_orphaned_subscriptions(&self) -> Result<u64> {
    let _guard = self.write.lock().await;

    let referenced = Query::select()
      .column(user::Column::SubscriptionId)
      .from(user::Entity)
      .to_owned();

    let result = subscription::Entity::delete_many()
      .filter(subscription::Column::Id.not_in_subquery(referenced))
      .exec(self.db)
      .await?;

    if result.rows_affected > 0 {
      info!("Removed {} orphaned subscriptions", result.rows_affected);
    }
    Ok(result.rows_affected)
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use sea_orm::{ConnectionTrait, Database, DbBackend, Schema};

  use super::*;

  async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();

    let schema = Schema::new(DbBackend::Sqlite);

    let stmt = schema.create_table_from_entity(subscription::Entity);
    db.execute(db.get_database_backend().build(&stmt)).await.unwrap();

    let stmt = schema.create_table_from_entity(user::Entity);
    db.execute(db.get_database_backend().build(&stmt)).await.unwrap();

    db
  }

  fn new_user(username: &str) -> NewUser {
    NewUser { username: username.into(), chat_id: 12345, subscription: None }
  }

  fn window(status: Status) -> SubscriptionUpdate {
    let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap().naive_utc();
    let end = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap().naive_utc();
    SubscriptionUpdate {
      status,
      duration: "month".into(),
      start_date: start,
      end_date: end,
    }
  }

  #[tokio::test]
  async fn test_create_then_get_round_trips() {
    let db = setup_test_db().await;
    let write = Mutex::new(());
    let users = Users::new(&db, &write);

    let created = users.create(&new_user("alice")).await.unwrap();
    let fetched = users.user("alice").await.unwrap().unwrap();

    assert_eq!(fetched, created);
    assert_eq!(fetched.chat_id, 12345);
    assert_eq!(fetched.traffic, 0.0);
    assert_eq!(fetched.subscription.status, Status::Inactive);
    assert_eq!(fetched.subscription.duration, "month");
    assert_eq!(fetched.subscription.end_date, model::epoch());
  }

  #[tokio::test]
  async fn test_create_with_embedded_subscription() {
    let db = setup_test_db().await;
    let write = Mutex::new(());
    let users = Users::new(&db, &write);

    let fields = window(Status::Active);
    let new = NewUser {
      username: "alice".into(),
      chat_id: 1,
      subscription: Some(fields.clone()),
    };

    let created = users.create(&new).await.unwrap();

    assert_eq!(created.subscription.status, fields.status);
    assert_eq!(created.subscription.duration, fields.duration);
    assert_eq!(created.subscription.start_date, fields.start_date);
    assert_eq!(created.subscription.end_date, fields.end_date);
  }

  #[tokio::test]
  async fn test_create_rejects_blank_username() {
    let db = setup_test_db().await;
    let write = Mutex::new(());
    let users = Users::new(&db, &write);

    for username in ["", "   "] {
      let result = users.create(&new_user(username)).await;
      assert!(matches!(result, Err(Error::InvalidUsername)));
    }
  }

  #[tokio::test]
  async fn test_create_duplicate_conflicts() {
    let db = setup_test_db().await;
    let write = Mutex::new(());
    let users = Users::new(&db, &write);

    users.create(&new_user("alice")).await.unwrap();

    let result = users.create(&new_user("alice")).await;
    assert!(matches!(result, Err(Error::UserExists)));
  }

  #[tokio::test]
  async fn test_concurrent_create_has_single_winner() {
    let db = setup_test_db().await;
    let write = Mutex::new(());
    let users = Users::new(&db, &write);

    let new = new_user("alice");
    let (first, second) = tokio::join!(users.create(&new), users.create(&new));

    let mut results = [first, second];
    results.sort_by_key(|result| result.is_err());

    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(Error::UserExists)));
  }

  #[tokio::test]
  async fn test_update_subscription() {
    let db = setup_test_db().await;
    let write = Mutex::new(());
    let users = Users::new(&db, &write);

    users.create(&new_user("alice")).await.unwrap();
    let fields = window(Status::Active);
    users.update_subscription("alice", &fields).await.unwrap();

    let fetched = users.user("alice").await.unwrap().unwrap();
    assert_eq!(fetched.subscription.status, Status::Active);
    assert_eq!(fetched.subscription.start_date, fields.start_date);
    assert_eq!(fetched.subscription.end_date, fields.end_date);
  }

  #[tokio::test]
  async fn test_update_subscription_missing_user() {
    let db = setup_test_db().await;
    let write = Mutex::new(());
    let users = Users::new(&db, &write);

    let result = users.update_subscription("ghost", &window(Status::Active)).await;
    assert!(matches!(result, Err(Error::UserNotFound)));
  }

  #[tokio::test]
  async fn test_delete_removes_owned_subscription() {
    let db = setup_test_db().await;
    let write = Mutex::new(());
    let users = Users::new(&db, &write);

    users.create(&new_user("alice")).await.unwrap();
    users.delete("alice").await.unwrap();

    assert!(!users.exists("alice").await.unwrap());
    assert_eq!(subscription::Entity::find().count(&db).await.unwrap(), 0);

    // nothing left for the repair pass either
    assert_eq!(users.cleanup_orphaned_subscriptions().await.unwrap(), 0);
  }

  #[tokio::test]
  async fn test_cleanup_removes_only_orphans() {
    let db = setup_test_db().await;
    let write = Mutex::new(());
    let users = Users::new(&db, &write);

    users.create(&new_user("alice")).await.unwrap();

    subscription::ActiveModel {
      status: Set(Status::Inactive),
      duration: Set("month".into()),
      start_date: Set(model::epoch()),
      end_date: Set(model::epoch()),
      ..Default::default()
    }
    .insert(&db)
    .await
    .unwrap();

    assert_eq!(users.cleanup_orphaned_subscriptions().await.unwrap(), 1);
    assert!(users.user("alice").await.unwrap().is_some());
    assert_eq!(subscription::Entity::find().count(&db).await.unwrap(), 1);
  }

  #[tokio::test]
  async fn test_update_and_reset_traffic() {
    let db = setup_test_db().await;
    let write = Mutex::new(());
    let users = Users::new(&db, &write);

    users.create(&new_user("alice")).await.unwrap();

    users.update_traffic("alice", 123.5).await.unwrap();
    let fetched = users.user("alice").await.unwrap().unwrap();
    assert_eq!(fetched.traffic, 123.5);

    users.reset_traffic("alice").await.unwrap();
    let fetched = users.user("alice").await.unwrap().unwrap();
    assert_eq!(fetched.traffic, 0.0);
  }

  #[tokio::test]
  async fn test_update_traffic_missing_user_is_noop() {
    let db = setup_test_db().await;
    let write = Mutex::new(());
    let users = Users::new(&db, &write);

    users.update_traffic("ghost", 50.0).await.unwrap();
    assert!(!users.exists("ghost").await.unwrap());
  }

  #[tokio::test]
  async fn test_subscription_status() {
    let db = setup_test_db().await;
    let write = Mutex::new(());
    let users = Users::new(&db, &write);

    users.create(&new_user("alice")).await.unwrap();

    let status = users.subscription_status("alice").await.unwrap();
    assert_eq!(status, Status::Inactive);

    let result = users.subscription_status("ghost").await;
    assert!(matches!(result, Err(Error::UserNotFound)));
  }

  #[tokio::test]
  async fn test_all_usernames() {
    let db = setup_test_db().await;
    let write = Mutex::new(());
    let users = Users::new(&db, &write);

    users.create(&new_user("alice")).await.unwrap();
    users.create(&new_user("bob")).await.unwrap();

    let mut usernames = users.all_usernames().await.unwrap();
    usernames.sort();
    assert_eq!(usernames, ["alice", "bob"]);
  }
}
