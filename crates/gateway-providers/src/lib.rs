//! # Gateway Providers
//!
//! Backend adapters for the inference router:
//! - IBM job API (`/api/v1/jobs`)
//! - OpenAI chat completions (`/v1/chat/completions`)
//! - HuggingFace inference API (`/models/{model}`)
//!
//! Adapters are registered in a [`ProviderRegistry`] keyed by `provider/modelId`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod http;

pub mod huggingface;
pub mod ibm;
pub mod openai;
pub mod registry;

// Re-export main types
pub use huggingface::{HuggingFaceConfig, HuggingFaceProvider};
pub use ibm::{IbmConfig, IbmProvider};
pub use openai::{OpenAIConfig, OpenAIProvider};
pub use registry::{create_provider, ProviderRegistry};
