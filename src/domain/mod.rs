pub mod decision;
pub mod evaluation;
pub mod fixture;

pub use decision::*;
pub use evaluation::*;
pub use fixture::*;
