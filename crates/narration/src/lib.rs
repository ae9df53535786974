mod action;
mod config;
mod error;
mod events;
mod history;
mod import;
mod index;
mod narration;
mod runtime;
mod verse;

pub use action::*;
pub use config::*;
pub use error::*;
pub use events::*;
pub use history::*;
pub use import::*;
pub use index::*;
pub use narration::*;
pub use runtime::*;
pub use verse::*;
