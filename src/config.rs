use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

use crate::error::{Error, Result};

pub const DEFAULT_EMBEDDING_MODEL: &str =
    "sentence-transformers/all-MiniLM-L6-v2";
pub const DEFAULT_LLM_MODEL: &str = "meta-llama/Llama-3.2-1B-Instruct";
pub const DEFAULT_CHUNK_SIZE: usize = 512;
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;
pub const DEFAULT_TOP_K: usize = 3;
pub const DEFAULT_DOCS_DIR: &str = "./data";
pub const DEFAULT_COLLECTION: &str = "document_collection";

/// Runtime configuration, sourced from the environment with defaults.
///
/// Every knob is optional; see `from_env` for the recognized variables.
/// Constructed once at startup and passed by reference to the components
/// that need it.
#[derive(Debug, Clone)]
pub struct Config {
    /// API credential for the embedding and generation services.
    pub api_key: Option<String>,
    /// Embedding model identifier.
    pub embedding_model: String,
    /// Generation model identifier.
    pub llm_model: String,
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Backward overlap between consecutive chunks in characters.
    pub chunk_overlap: usize,
    /// Default search depth. The answer flow deliberately hardcodes
    /// top-1 retrieval and does not consult this value.
    pub top_k: usize,
    /// Directory scanned for `.txt` and `.pdf` documents.
    pub docs_dir: PathBuf,
    /// Directory holding the persistent vector collection.
    pub index_dir: PathBuf,
    /// Collection name; used as the database file stem.
    pub collection: String,
}

impl Config {
    /// Build a configuration from the environment.
    ///
    /// Recognized variables (all optional): `HF_API_KEY`,
    /// `EMBEDDING_MODEL`, `LLM_MODEL`, `CHUNK_SIZE`, `CHUNK_OVERLAP`,
    /// `TOP_K_CHUNKS`, `DATA_DIR`, `COLLECTION_NAME`,
    /// `RAGBERT_INDEX_DIR`.
    ///
    /// The index directory is resolved from, in order of priority:
    /// 1. An explicit path (from `--index-dir`)
    /// 2. The `RAGBERT_INDEX_DIR` environment variable
    /// 3. The XDG data directory (`~/.local/share/ragbert/`)
    ///
    /// The documents directory resolves the same way through
    /// `--docs-dir` and `DATA_DIR`, defaulting to `./data`.
    pub fn from_env(
        index_dir: Option<&Path>,
        docs_dir: Option<&Path>,
    ) -> Result<Self> {
        let index_dir = resolve_index_dir(index_dir)?;
        let docs_dir = docs_dir.map_or_else(
            || {
                PathBuf::from(
                    std::env::var("DATA_DIR")
                        .unwrap_or_else(|_| DEFAULT_DOCS_DIR.to_string()),
                )
            },
            Path::to_path_buf,
        );

        let config = Self {
            api_key: std::env::var("HF_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            embedding_model: env_or("EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL),
            llm_model: env_or("LLM_MODEL", DEFAULT_LLM_MODEL),
            chunk_size: env_parse("CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?,
            chunk_overlap: env_parse("CHUNK_OVERLAP", DEFAULT_CHUNK_OVERLAP)?,
            top_k: env_parse("TOP_K_CHUNKS", DEFAULT_TOP_K)?,
            docs_dir,
            index_dir,
            collection: env_or("COLLECTION_NAME", DEFAULT_COLLECTION),
        };

        config.validate()?;
        Ok(config)
    }

    /// Path of the redb file backing the named collection.
    pub fn collection_db(&self) -> PathBuf {
        self.index_dir.join(format!("{}.redb", self.collection))
    }

    fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Config("CHUNK_SIZE must be positive".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::Config(format!(
                "CHUNK_OVERLAP ({}) must be smaller than CHUNK_SIZE ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| {
            Error::Config(format!("{name} is not a valid number: {raw}"))
        }),
        Err(_) => Ok(default),
    }
}

fn resolve_index_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    let root = if let Some(path) = explicit {
        path.to_path_buf()
    } else if let Ok(val) = std::env::var("RAGBERT_INDEX_DIR") {
        PathBuf::from(val)
    } else {
        xdg::BaseDirectories::with_prefix("ragbert")
            .get_data_home()
            .ok_or_else(|| {
                Error::Config(
                    "could not determine XDG data home directory".into(),
                )
            })?
    };

    std::fs::create_dir_all(&root).map_err(|_| Error::IndexDir(root.clone()))?;
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config(index_dir: PathBuf) -> Config {
        Config {
            api_key: None,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            top_k: DEFAULT_TOP_K,
            docs_dir: PathBuf::from(DEFAULT_DOCS_DIR),
            index_dir,
            collection: DEFAULT_COLLECTION.to_string(),
        }
    }

    #[test]
    fn explicit_dirs_take_priority() {
        let tmp = tempfile::tempdir().unwrap();
        let docs = tmp.path().join("docs");
        let config =
            Config::from_env(Some(tmp.path()), Some(&docs)).unwrap();

        assert_eq!(config.index_dir, tmp.path());
        assert_eq!(config.docs_dir, docs);
    }

    #[test]
    fn collection_db_path_uses_collection_name() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = base_config(tmp.path().to_path_buf());
        config.collection = "notes".to_string();

        assert_eq!(config.collection_db(), tmp.path().join("notes.redb"));
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk_size() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = base_config(tmp.path().to_path_buf());
        config.chunk_size = 50;
        config.chunk_overlap = 50;

        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn zero_chunk_size_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = base_config(tmp.path().to_path_buf());
        config.chunk_size = 0;
        config.chunk_overlap = 0;

        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn index_dir_is_created() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        let config = Config::from_env(Some(&nested), None).unwrap();

        assert!(config.index_dir.exists());
    }
}
