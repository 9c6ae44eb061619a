//! Upload validation
//!
//! Confirms that uploaded bytes decode as a raster image. The decoded pixels
//! are discarded; the original bytes are what get forwarded upstream.

pub mod validator;

pub use validator::{validate_image, ImageSummary};
