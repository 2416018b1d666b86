pub mod user_repo;
pub use user_repo::UserRepository;
pub mod medicine_repo;
pub use medicine_repo::MedicineRepository;
pub mod bill_repo;
pub use bill_repo::BillRepository;
pub mod settings_repo;
pub use settings_repo::SettingsRepository;
