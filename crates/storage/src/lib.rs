pub mod chapter;
mod error;
pub mod fs;
mod runtime;

pub use error::*;
pub use runtime::*;
