pub mod identities;
pub mod manager;
pub mod models;
pub mod service;
pub mod tables;

pub use identities::{IdentityStore, NewIdentity, PgIdentityStore};
pub use manager::{DatabaseError, DatabaseManager};
pub use service::DataService;
pub use tables::EntityTable;
