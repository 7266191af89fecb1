pub mod message;
pub mod openai;
pub mod provider;
pub mod registry;
