pub mod sessions;
pub mod token;

pub use sessions::{create_session, resolve_caller, revoke_session, Caller};
