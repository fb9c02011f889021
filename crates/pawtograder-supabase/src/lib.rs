#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod client;
mod config;
mod error;
mod rpc;

pub use client::SupabaseClient;
pub use config::SupabaseConfig;
pub use error::{Error, Result};

/// Tracing target for Supabase operations.
pub const TRACING_TARGET: &str = "pawtograder_supabase";
