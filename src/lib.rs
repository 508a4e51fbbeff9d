//! SUSTAIN - token-optimizing wrapper around a hosted chat-completion model
//!
//! Prompts are shortened with a fixed contraction table and a configurable
//! stopword list before they are sent upstream. Arithmetic and a canned
//! self-description are answered locally without a remote call, and every
//! completed request adds to a running tokens-saved total reported as
//! energy and CO2 figures.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sustain::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::from_file("config.toml")?;
//!     let stopwords = StopwordList::load(&config.optimizer.stopwords_path).into_list();
//!
//!     let client = CompletionClient::new(config.completion.clone())?;
//!     let pipeline = OptimizationPipeline::from_config(&config, &stopwords, Arc::new(client))?;
//!
//!     let response = pipeline.process(Some("what is 6 times 7"), None).await?;
//!     assert_eq!(response.response_text, "Math detected! Result: 42");
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod completion;
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;
pub mod optimizer;
pub mod pipeline;
pub mod server;
pub mod shutdown;

pub use config::Config;
pub use error::{Result, SustainError};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::api::{build_router, AppState};
    pub use crate::completion::{Completion, CompletionClient, CompletionProvider, ResponseCache};
    pub use crate::config::Config;
    pub use crate::error::{ArithmeticError, CompletionError, Result, SustainError};
    pub use crate::middleware::InputValidator;
    pub use crate::observability::MetricsCollector;
    pub use crate::optimizer::{
        ArithmeticShortcut, SavingsAccountant, StopwordList, TextNormalizer,
    };
    pub use crate::pipeline::{OptimizationPipeline, SustainResponse};
}
