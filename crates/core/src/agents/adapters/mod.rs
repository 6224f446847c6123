//! Agent adapter implementations.

mod chat_client;
pub mod mock_agent;

pub use chat_client::ChatCompletionsAdapter;
pub use mock_agent::MockAgent;
