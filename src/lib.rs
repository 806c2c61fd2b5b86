//! ragbert - a minimal retrieval-augmented generation assistant for local
//! documents.
//!
//! ragbert indexes a directory of `.txt` and `.pdf` files into a persistent
//! vector collection (backed by [redb](https://github.com/cberner/redb)),
//! retrieves the single most relevant chunk for a question by cosine
//! similarity, and asks a hosted language model to answer using only that
//! chunk as context.
//!
//! # Quick start
//!
//! ```no_run
//! use ragbert::{Assistant, Config};
//!
//! let config = Config::from_env(None, None).unwrap();
//! let assistant = Assistant::new(config).unwrap();
//!
//! println!("{}", assistant.reindex());
//! println!("{}", assistant.answer("What color is the sky?"));
//! ```

pub mod assistant;
pub mod chunker;
pub mod cli;
pub mod config;
pub mod embedder;
pub mod error;
pub mod llm;
pub mod loader;
pub mod prompt;
pub mod store;

pub use assistant::{Assistant, IndexOutcome};
pub use chunker::Chunk;
pub use config::Config;
pub use embedder::EmbeddingClient;
pub use error::{Error, Result};
pub use llm::ChatClient;
pub use loader::Document;
pub use store::ChunkStore;
