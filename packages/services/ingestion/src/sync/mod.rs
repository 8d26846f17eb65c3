pub mod driver;
pub mod engine;

pub use driver::*;
pub use engine::*;
