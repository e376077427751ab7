//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables. Each entity has a Model struct
//! for data and an Entity struct for operations.

pub mod settings;
pub mod transaction;

// Re-export specific types to avoid conflicts
pub use settings::{Column as SettingsColumn, Entity as Settings, Model as SettingsModel};
pub use transaction::{
    Column as TransactionColumn, Entity as Transaction, Model as TransactionModel,
    TransactionType,
};
