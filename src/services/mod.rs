//! External service clients

pub mod ai_client;
pub mod generator;
pub mod mock_client;

pub use ai_client::AiClient;
pub use generator::{GeneratorError, TextGenerator};
pub use mock_client::MockClient;
