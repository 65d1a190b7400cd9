//! Curse word registry with a lookup cache.
//!
//! Lookups run once per message, so results (hits and misses) are cached
//! for a short TTL and invalidated by local writes.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::{CacheConfig, CacheError, CacheRegistry, TypedCache};
use crate::database::backend::StoreBackend;
use crate::database::error::{StoreError, StoreResult};
use crate::database::models::{normalize_word, CurseWordEntry, Severity, DEFAULT_CURSE_WORDS};

/// Repository for the global curse word list.
pub struct CurseWordRepository {
    backend: Arc<dyn StoreBackend>,
    /// Normalized word -> entry, `None` caching a miss
    lookups: TypedCache<String, Option<CurseWordEntry>>,
    legacy_file: Option<PathBuf>,
    seeded: AtomicBool,
    seed_lock: Mutex<()>,
}

impl CurseWordRepository {
    pub fn new(
        backend: Arc<dyn StoreBackend>,
        registry: &CacheRegistry,
        legacy_file: Option<PathBuf>,
    ) -> Result<Self, CacheError> {
        let lookups = registry.get_or_create("curse_words", CacheConfig::hot_data())?;

        Ok(Self {
            backend,
            lookups,
            legacy_file,
            seeded: AtomicBool::new(false),
            seed_lock: Mutex::new(()),
        })
    }

    /// Seed an empty registry with the default list and the legacy word
    /// file. Runs at most once per process; returns the number of words
    /// inserted.
    pub async fn ensure_seeded(&self) -> StoreResult<usize> {
        if self.seeded.load(Ordering::Acquire) {
            return Ok(0);
        }

        let _guard = self.seed_lock.lock().await;
        if self.seeded.load(Ordering::Acquire) {
            return Ok(0);
        }

        if self.backend.count_curse_words().await? > 0 {
            self.seeded.store(true, Ordering::Release);
            return Ok(0);
        }

        let mut entries: Vec<CurseWordEntry> = DEFAULT_CURSE_WORDS
            .iter()
            .map(|(word, severity)| CurseWordEntry::new(word, *severity))
            .collect();
        let legacy = self.legacy_words().await;
        let legacy_count = legacy.len();
        entries.extend(legacy);

        // Single insert: a failure leaves the registry empty for the retry.
        self.backend.insert_curse_words(&entries).await?;

        self.seeded.store(true, Ordering::Release);
        self.lookups.invalidate_all();

        info!(
            "Seeded curse words: {} defaults, {} from legacy file",
            entries.len() - legacy_count,
            legacy_count
        );
        Ok(entries.len())
    }

    /// Whether `word` is registered, ignoring case and surrounding whitespace.
    pub async fn is_curse_word(&self, word: &str) -> StoreResult<bool> {
        Ok(self.details(word).await?.is_some())
    }

    pub async fn details(&self, word: &str) -> StoreResult<Option<CurseWordEntry>> {
        let word = normalize_word(word);
        if word.is_empty() {
            return Ok(None);
        }

        self.ensure_seeded().await?;

        if let Some(cached) = self.lookups.get(&word) {
            return Ok(cached);
        }

        let entry = self.backend.find_curse_word(&word).await?;
        self.lookups.insert(word, entry.clone());
        Ok(entry)
    }

    /// Register a word. Returns `false` if it was already registered.
    pub async fn add(&self, word: &str, severity: Severity) -> StoreResult<bool> {
        let word = normalize_word(word);
        if word.is_empty() {
            return Err(StoreError::validation("word", "must not be empty"));
        }

        self.ensure_seeded().await?;

        if self.backend.find_curse_word(&word).await?.is_some() {
            debug!("Curse word '{}' already registered", word);
            return Ok(false);
        }

        self.backend
            .insert_curse_words(&[CurseWordEntry::new(&word, severity)])
            .await?;
        self.lookups.invalidate(&word);

        info!("Added curse word '{}' ({})", word, severity.as_str());
        Ok(true)
    }

    /// Remove a word. Returns whether it was registered.
    pub async fn remove(&self, word: &str) -> StoreResult<bool> {
        let word = normalize_word(word);
        if word.is_empty() {
            return Ok(false);
        }

        let removed = self.backend.delete_curse_word(&word).await?;
        self.lookups.invalidate(&word);

        if removed {
            info!("Removed curse word '{}'", word);
        }
        Ok(removed)
    }

    /// Every registered word.
    pub async fn words(&self) -> StoreResult<Vec<String>> {
        self.ensure_seeded().await?;

        let entries = self.backend.list_curse_words().await?;
        Ok(entries.into_iter().map(|entry| entry.word).collect())
    }

    /// Words from the legacy newline-separated file that are not defaults.
    async fn legacy_words(&self) -> Vec<CurseWordEntry> {
        let Some(path) = &self.legacy_file else {
            return Vec::new();
        };

        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No legacy curse word file at {}", path.display());
                return Vec::new();
            }
            Err(e) => {
                warn!("Failed to read legacy curse word file {}: {}", path.display(), e);
                return Vec::new();
            }
        };

        let mut seen: HashSet<String> = DEFAULT_CURSE_WORDS
            .iter()
            .map(|(word, _)| word.to_string())
            .collect();

        contents
            .lines()
            .map(normalize_word)
            .filter(|word| !word.is_empty())
            .filter(|word| seen.insert(word.clone()))
            .map(|word| CurseWordEntry::new(&word, Severity::Medium))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryBackend;
    use crate::database::testing::FlakyBackend;
    use std::io::Write;

    fn repo(legacy_file: Option<PathBuf>) -> (Arc<MemoryBackend>, CurseWordRepository) {
        let backend = Arc::new(MemoryBackend::new());
        let repo = CurseWordRepository::new(backend.clone(), &CacheRegistry::new(), legacy_file).unwrap();
        (backend, repo)
    }

    #[tokio::test]
    async fn test_seeds_defaults_once() {
        let (backend, words) = repo(None);

        assert_eq!(words.ensure_seeded().await.unwrap(), DEFAULT_CURSE_WORDS.len());
        assert_eq!(words.ensure_seeded().await.unwrap(), 0);
        assert_eq!(
            backend.count_curse_words().await.unwrap(),
            DEFAULT_CURSE_WORDS.len() as u64
        );

        let entry = words.details("bastard").await.unwrap().unwrap();
        assert_eq!(entry.severity, Severity::Low);
    }

    #[tokio::test]
    async fn test_non_empty_registry_is_not_seeded() {
        let (backend, words) = repo(None);
        backend
            .insert_curse_words(&[CurseWordEntry::new("heck", Severity::Low)])
            .await
            .unwrap();

        assert_eq!(words.ensure_seeded().await.unwrap(), 0);
        assert_eq!(words.words().await.unwrap(), vec!["heck".to_string()]);
    }

    #[tokio::test]
    async fn test_legacy_file_is_imported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  Darn\nfuck\n\ndarn\nGOSH").unwrap();

        let (_, words) = repo(Some(file.path().to_path_buf()));
        assert_eq!(
            words.ensure_seeded().await.unwrap(),
            DEFAULT_CURSE_WORDS.len() + 2
        );

        let darn = words.details("darn").await.unwrap().unwrap();
        assert_eq!(darn.severity, Severity::Medium);
        assert!(words.is_curse_word("gosh").await.unwrap());
        // Defaults keep their own severity.
        let fuck = words.details("fuck").await.unwrap().unwrap();
        assert_eq!(fuck.severity, Severity::High);
    }

    #[tokio::test]
    async fn test_failed_seed_is_retried_with_legacy_words() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "darn").unwrap();

        let backend = Arc::new(FlakyBackend::new().fail_curse_inserts(1));
        let words = CurseWordRepository::new(
            backend.clone(),
            &CacheRegistry::new(),
            Some(file.path().to_path_buf()),
        )
        .unwrap();

        assert!(matches!(
            words.ensure_seeded().await,
            Err(StoreError::Unavailable(_))
        ));
        assert_eq!(backend.count_curse_words().await.unwrap(), 0);

        assert_eq!(
            words.ensure_seeded().await.unwrap(),
            DEFAULT_CURSE_WORDS.len() + 1
        );
        assert!(words.is_curse_word("darn").await.unwrap());
        assert!(words.is_curse_word("bastard").await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_legacy_file_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let (_, words) = repo(Some(dir.path().join("missing.txt")));
        assert_eq!(words.ensure_seeded().await.unwrap(), DEFAULT_CURSE_WORDS.len());
    }

    #[tokio::test]
    async fn test_lookup_is_normalized() {
        let (_, words) = repo(None);

        assert!(words.add("  FOO ", Severity::High).await.unwrap());
        assert!(words.is_curse_word("foo").await.unwrap());
        assert!(words.is_curse_word(" Foo").await.unwrap());
        assert!(!words.add("foo", Severity::Low).await.unwrap());
        assert!(!words.is_curse_word("").await.unwrap());
    }

    #[tokio::test]
    async fn test_cached_miss_is_invalidated_on_add_and_remove() {
        let (_, words) = repo(None);

        assert!(!words.is_curse_word("zonk").await.unwrap());
        words.add("zonk", Severity::Medium).await.unwrap();
        assert!(words.is_curse_word("zonk").await.unwrap());

        assert!(words.remove("ZONK").await.unwrap());
        assert!(!words.is_curse_word("zonk").await.unwrap());
        assert!(!words.remove("zonk").await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_word_is_rejected() {
        let (_, words) = repo(None);
        assert!(matches!(
            words.add("   ", Severity::Low).await,
            Err(StoreError::Validation { field: "word", .. })
        ));
    }
}
