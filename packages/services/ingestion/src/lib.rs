pub mod cache;
pub mod clients;
pub mod config;
pub mod logging;
pub mod mapping;
pub mod models;
pub mod storage;
pub mod sync;

// Convenient re-exports for tests and external callers
pub use cache::*;
pub use clients::*;
pub use config::*;
pub use mapping::*;
pub use models::*;
pub use storage::*;
pub use sync::*;
