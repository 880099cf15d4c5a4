//! SeaORM entities for the users/subscriptions schema

pub mod subscription;
pub mod user;

pub use subscription::Status;
