//! The LLM collaborator: a black-box text-completion service used for
//! extraction and report drafting. The core store never depends on it being
//! reachable or correct.

pub mod client;
pub mod extract;
pub mod generate;
pub mod prompts;
