pub mod auth;
pub mod billing_service;
pub mod document_service;
pub mod inventory_service;
pub mod report_service;
pub mod settings_service;
