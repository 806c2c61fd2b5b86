//! The orchestrator tying loading, chunking, embedding, storage, and
//! generation together.
//!
//! [`Assistant`] owns every component explicitly; there is no global
//! state. Internal operations return typed results, and only the
//! user-facing entry points (`answer`, `reindex`) flatten errors into
//! display strings.

use kdam::{BarExt, tqdm};
use tracing::{info, warn};

use crate::{
    chunker::{self, Chunk},
    config::Config,
    embedder::EmbeddingClient,
    error::Result,
    llm::{ChatClient, ChatMessage},
    loader,
    prompt::{self, FALLBACK_ANSWER},
    store::{ChunkStore, RetrievedChunk},
};

/// The answer flow always retrieves exactly one chunk, regardless of
/// the configured search depth.
pub const ANSWER_TOP_K: usize = 1;

/// Chunks embedded per request during indexing.
const EMBED_BATCH: usize = 32;

/// Result of an indexing pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexOutcome {
    /// Chunks were embedded and stored; `total` is the collection size
    /// after the pass.
    Indexed { chunks: usize, total: u64 },
    /// The documents directory held no readable documents.
    NoDocuments,
    /// Documents were found but produced no chunks.
    NoChunks,
}

/// A document question-answering assistant over a persistent vector
/// collection.
pub struct Assistant {
    config: Config,
    store: ChunkStore,
    embedder: EmbeddingClient,
    llm: Option<ChatClient>,
}

impl Assistant {
    /// Construct the assistant and bootstrap the collection.
    ///
    /// A failing embedding client is fatal. A failing generation client
    /// (missing API key) degrades the assistant: retrieval keeps
    /// working and `answer` reports that generation is unavailable.
    ///
    /// If the collection is empty, an initial indexing pass runs
    /// best-effort; bootstrap failures are logged, not fatal, so the
    /// CLI can still start and report status.
    pub fn new(config: Config) -> Result<Self> {
        let embedder = EmbeddingClient::new(&config)?;
        let store = ChunkStore::open(&config.collection_db())?;

        let llm = match ChatClient::new(&config) {
            Ok(client) => Some(client),
            Err(e) => {
                warn!("text generation disabled: {e}");
                None
            }
        };

        let assistant = Self {
            config,
            store,
            embedder,
            llm,
        };

        if assistant.store.was_created() || assistant.store.count()? == 0 {
            match assistant.index_documents() {
                Ok(outcome) => info!("initial indexing: {outcome:?}"),
                Err(e) => warn!("initial indexing failed: {e}"),
            }
        }

        Ok(assistant)
    }

    /// Load, chunk, embed, and store every document in the documents
    /// directory.
    pub fn index_documents(&self) -> Result<IndexOutcome> {
        let documents = loader::load_documents(&self.config.docs_dir)?;
        if documents.is_empty() {
            return Ok(IndexOutcome::NoDocuments);
        }

        let chunks = chunker::chunk_documents(
            &documents,
            self.config.chunk_size,
            self.config.chunk_overlap,
        );
        if chunks.is_empty() {
            return Ok(IndexOutcome::NoChunks);
        }

        self.embed_and_store(&chunks)?;

        Ok(IndexOutcome::Indexed {
            chunks: chunks.len(),
            total: self.store.count()?,
        })
    }

    fn embed_and_store(&self, chunks: &[Chunk]) -> Result<()> {
        let mut pb = tqdm!(total = chunks.len(), desc = "Embedding chunks");

        for batch in chunks.chunks(EMBED_BATCH) {
            let texts: Vec<&str> =
                batch.iter().map(|c| c.text.as_str()).collect();
            let vectors = self.embedder.embed_batch(&texts)?;
            self.store.add_chunks(batch, &vectors)?;
            let _ = pb.update(batch.len());
        }

        Ok(())
    }

    /// Clear the collection and rebuild it from the documents
    /// directory, reporting the result as a status message.
    pub fn reindex(&self) -> String {
        if let Err(e) = self.store.reset() {
            return format!("Error resetting collection: {e}");
        }

        match self.index_documents() {
            Ok(IndexOutcome::Indexed { total, .. }) => {
                format!("Re-indexed successfully. Total chunks: {total}")
            }
            Ok(IndexOutcome::NoDocuments) => format!(
                "No documents found in {}. Add .txt or .pdf files and \
                 re-index.",
                self.config.docs_dir.display()
            ),
            Ok(IndexOutcome::NoChunks) => {
                "Documents were found but produced no chunks.".to_string()
            }
            Err(e) => format!("Error re-indexing: {e}"),
        }
    }

    /// Answer a question using the single most relevant indexed chunk.
    ///
    /// Never panics and never returns an error: every failure mode maps
    /// to a user-facing message.
    pub fn answer(&self, query: &str) -> String {
        let query = query.trim();
        if query.is_empty() {
            return "Please enter a question.".to_string();
        }

        match self.store.count() {
            Ok(0) => {
                return "No documents indexed. Run `ragbert reindex` first."
                    .to_string();
            }
            Ok(_) => {}
            Err(e) => return format!("Error reading collection: {e}"),
        }

        let query_vector = match self.embedder.embed_text(query) {
            Ok(v) => v,
            Err(e) => return format!("Error embedding question: {e}"),
        };

        let retrieved = match self.store.search(&query_vector, ANSWER_TOP_K) {
            Ok(r) => r,
            Err(e) => return format!("Error searching collection: {e}"),
        };

        let Some(best) = retrieved.into_iter().next() else {
            return "No relevant context found.".to_string();
        };
        info!(
            source = %best.source,
            chunk_id = best.chunk_id,
            score = best.score,
            "retrieved context"
        );

        self.generate_answer(query, &best)
    }

    /// Produce the answer text for a retrieved chunk. Generation
    /// failures (and generation being disabled) become the answer
    /// text; the source annotation is appended on every path.
    fn generate_answer(&self, query: &str, context: &RetrievedChunk) -> String {
        let text = match &self.llm {
            None => format!(
                "{FALLBACK_ANSWER} (Text generation is unavailable: \
                 HF_API_KEY is not set.)"
            ),
            Some(llm) => {
                let messages = [
                    ChatMessage::system(prompt::SYSTEM_PROMPT),
                    ChatMessage::user(prompt::build_prompt(
                        query,
                        &context.text,
                    )),
                ];
                match llm.complete(&messages) {
                    Ok(answer) => answer,
                    Err(e) => format!("Error generating answer: {e}"),
                }
            }
        };

        format!("{text}\n\nSource: {}", context.source)
    }

    /// Number of chunks currently stored.
    pub fn chunk_count(&self) -> Result<u64> {
        self.store.count()
    }

    /// Runtime configuration this assistant was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }
}
