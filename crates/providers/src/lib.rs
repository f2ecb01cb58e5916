//! Completion engine implementations for pawline.
//!
//! All providers implement the `pawline_core::Provider` trait.

pub mod factory;
pub mod openai_compat;

pub use factory::{build_from_config, model_for};
pub use openai_compat::OpenAiCompatProvider;
