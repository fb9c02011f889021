//! Response types for HTTP handlers.

mod discord;
mod errors;
mod graders;
mod monitors;

pub use discord::*;
pub use errors::*;
pub use graders::*;
pub use monitors::*;
