//! Image commentary service
//!
//! Accepts an uploaded image over HTTP, forwards it with a fixed educational
//! prompt to a hosted multimodal model, and returns the generated text. A
//! list of candidate models is tried in order until one succeeds.

pub mod ai;
pub mod api;
pub mod app;
pub mod dispatch;
pub mod error;
pub mod image;
pub mod models;
pub mod prompts;
pub mod usage;

pub use error::{Error, Result};
