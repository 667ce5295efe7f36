//! Business services over the metadata and blob stores.

pub mod files;
pub mod shares;
pub mod users;

pub use files::{DownloadedFile, FileService};
pub use shares::{CreateShareRequest, SaveOutcome, ShareService};
pub use users::{AuthOutcome, Claims, UserService};
