pub mod file_storage;
pub mod firebase_auth;
pub mod firebase_db;
pub mod memory;
pub mod session;

pub use file_storage::FileStorage;
pub use firebase_auth::FirebaseAuthAdapter;
pub use firebase_db::{FirebaseCatalogAdapter, TutorRecord};
pub use memory::{InMemoryCatalog, InMemoryIdentityProvider, InMemoryStorage};
pub use session::SessionChannel;
