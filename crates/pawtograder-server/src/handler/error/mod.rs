//! [`Error`], [`ErrorKind`] and [`Result`].

mod discord_error;
mod github_error;
mod http_error;

pub use http_error::{Error, ErrorKind, Result};
