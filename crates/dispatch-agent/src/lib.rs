pub mod azure;

pub use azure::{is_reasoning_model, AzureOpenAiBackend};
