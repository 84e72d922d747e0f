//! # Gateway Core
//!
//! Core types, traits, and error handling for the LLM inference router.
//!
//! This crate provides the foundational pieces every other crate builds on:
//! - Normalized request and response types
//! - The provider abstraction implemented by every backend adapter
//! - Ordered filter chains for pre- and post-processing
//! - The invocation orchestrator tying filters and providers together
//! - Error types and HTTP status mapping

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod filter;
pub mod invoker;
pub mod provider;
pub mod request;
pub mod response;

// Re-export commonly used types
pub use error::{GatewayError, GatewayResult};
pub use filter::{Filter, FilterError, FilterStage, InputFilter, ResponseFilter};
pub use invoker::{invoke_model, InvocationError, InvocationStage};
pub use provider::{LLMProvider, ProviderKey, ProviderType};
pub use request::ModelInput;
pub use response::ModelResponse;
