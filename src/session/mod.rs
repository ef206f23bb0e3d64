// Session layer
// Owns the session record, its persistence and the login/refresh lifecycle

pub mod manager;
pub mod refresh;
pub mod storage;
pub mod store;
pub mod types;

pub use manager::{LoginOutcome, SessionManager};
pub use storage::{MemoryStorage, SessionStorage, SqliteStorage};
pub use store::CredentialStore;
pub use types::{Role, SessionRecord, TokenPair, UserInfo};
