pub mod types;
pub mod role;
pub mod queries;

pub use types::*;
pub use role::*;
pub use queries::*;
