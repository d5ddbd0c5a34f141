// HTTP routes
pub mod health;
pub mod sync;

pub use health::*;
pub use sync::*;
