pub mod evaluations;
pub mod reports;
pub mod system;

pub use evaluations::*;
pub use reports::*;
pub use system::*;
