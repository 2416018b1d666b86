pub mod auth;
pub mod bill;
pub mod medicine;
pub mod reports;
pub mod settings;
