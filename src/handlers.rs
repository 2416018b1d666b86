pub mod auth;
pub mod billing;
pub mod documents;
pub mod inventory;
pub mod reports;
pub mod settings;
