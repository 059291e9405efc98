//! Cache de jetons d'accès
//!
//! Un seul écrivain par fichier. Un cache absent ou illisible se comporte
//! comme un cache vide.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::FetchError;

/// Jeton et instant d'expiration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Token {
    /// Le jeton reste-t-il valide au moins `margin` après `now`
    pub fn is_fresh(&self, now: DateTime<Utc>, margin: chrono::Duration) -> bool {
        now + margin < self.expires_at
    }
}

/// Stockage des jetons par clé (identifiant client)
pub trait TokenCache {
    fn get(&self, key: &str) -> Option<Token>;

    fn put(&mut self, key: &str, token: &Token) -> Result<(), FetchError>;
}

/// Cache en mémoire
#[derive(Debug, Default)]
pub struct MemoryTokenCache {
    tokens: BTreeMap<String, Token>,
}

impl MemoryTokenCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenCache for MemoryTokenCache {
    fn get(&self, key: &str) -> Option<Token> {
        self.tokens.get(key).cloned()
    }

    fn put(&mut self, key: &str, token: &Token) -> Result<(), FetchError> {
        self.tokens.insert(key.to_string(), token.clone());
        Ok(())
    }
}

/// Cache JSON dans le répertoire de données
#[derive(Debug, Clone)]
pub struct FileTokenCache {
    path: PathBuf,
}

impl FileTokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `data_dir/token.json`
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join("token.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> BTreeMap<String, Token> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Token cache unreadable");
                return BTreeMap::new();
            }
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "Token cache corrupt, ignoring");
            BTreeMap::new()
        })
    }
}

impl TokenCache for FileTokenCache {
    fn get(&self, key: &str) -> Option<Token> {
        self.read_all().remove(key)
    }

    fn put(&mut self, key: &str, token: &Token) -> Result<(), FetchError> {
        let mut tokens = self.read_all();
        tokens.insert(key.to_string(), token.clone());
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(&tokens)?)?;
        Ok(())
    }
}
