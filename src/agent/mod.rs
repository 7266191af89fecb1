pub mod extract;
pub mod market;
pub mod persist;
pub mod pipeline;
pub mod prompts;
pub mod ranking;
pub mod validate;
