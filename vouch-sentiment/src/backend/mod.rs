//! Chat model backends: OpenAI-compatible HTTP and a scripted mock.

pub mod mock;
pub mod openai;
pub mod traits;

pub use mock::MockBackend;
pub use openai::OpenAiBackend;
pub use traits::{CompletionRequest, LlmBackend, LlmError};
