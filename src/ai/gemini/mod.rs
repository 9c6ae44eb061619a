pub mod client;
pub mod types;
pub mod vision;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::GeminiHttpClient;
pub use vision::GeminiClient;
