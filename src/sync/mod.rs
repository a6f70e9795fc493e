mod cancel;
mod normalize;
mod orchestrator;
mod scheduler;

pub use cancel::CancelToken;
pub use normalize::{listing_items, normalize_listing};
pub use orchestrator::{SyncOrchestrator, SyncReport, UnitFailure};
pub use scheduler::spawn_scheduler;
