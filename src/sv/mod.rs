//! Store services over the entities

pub mod users;

pub use users::Users;
