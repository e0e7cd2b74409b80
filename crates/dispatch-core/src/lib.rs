pub mod activities;
pub mod audit;
pub mod completion;
pub mod config;
pub mod constants;
pub mod inputs;
pub mod json;
pub mod mutation;
pub mod notes;
pub mod notify;
pub mod pipeline;
pub mod policy;
pub mod prompts;
pub mod retry;
pub mod schema;
pub mod ticketing;
pub mod types;

pub use types::*;
