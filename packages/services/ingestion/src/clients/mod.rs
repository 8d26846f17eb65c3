pub mod cupid;
pub mod rate_limit;
pub mod redis;
pub mod retry;

pub use cupid::*;
pub use rate_limit::*;
pub use self::redis::*;
pub use retry::*;
