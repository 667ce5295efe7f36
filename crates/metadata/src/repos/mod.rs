//! Repository traits for metadata operations.

pub mod audit;
pub mod blobs;
pub mod files;
pub mod settings;
pub mod shares;
pub mod uploads;
pub mod users;

pub use audit::AuditRepo;
pub use blobs::BlobRepo;
pub use files::FileRepo;
pub use settings::SettingsRepo;
pub use shares::ShareRepo;
pub use uploads::UploadRepo;
pub use users::UserRepo;
