//! Advisor core library
//!
//! Client-side plumbing for the academic profile backend: streaming AI
//! responses (chat replies and generated recommendations), bearer token
//! handling, and client configuration.

pub mod auth;
pub mod config;
pub mod error;
pub mod stream;

pub use error::StreamError;
