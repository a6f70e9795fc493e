pub mod connection;
pub mod credentials;
pub mod listings;

pub use connection::{init_db, Database};
