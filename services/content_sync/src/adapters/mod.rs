pub mod consent;
pub mod file_kv;
pub mod identity;
pub mod postgres;

pub use consent::TerminalConsentFlow;
pub use file_kv::FileKeyValueStore;
pub use identity::{IdentitySettings, PgIdentityBackend};
pub use postgres::PgContentStore;
