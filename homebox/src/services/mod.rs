//! Services module
//!
//! Business logic services that coordinate between the repository and the blob store.

pub mod attachments;
pub mod documents;
pub mod scheduler;
pub mod tokens;

pub use attachments::{AttachmentsService, DownloadGrant};
pub use documents::DocumentsService;
pub use scheduler::MaintenanceScheduler;
pub use tokens::TokenCache;
