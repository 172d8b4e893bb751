mod builtin;

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::WordLibraryError;
use crate::random::{RandomSource, sample_indices};

/// Proficiency levels, lowest first.
pub const LEVELS: &[&str] = &["A1", "A2", "B1", "B2", "C1", "C2"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordEntry {
    pub word: String,
    pub category: String,
    pub level: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A named collection of words.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordDataset {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub words: Vec<WordEntry>,
}

#[derive(Debug, Deserialize)]
struct LibraryFile {
    #[serde(default, rename = "library")]
    libraries: Vec<WordDataset>,
}

/// Level and tag restrictions for a lookup. Empty means unrestricted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WordFilter {
    pub levels: Vec<String>,
    /// Every listed tag must be present on a word.
    pub tags: Vec<String>,
}

impl WordFilter {
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty() && self.tags.is_empty()
    }

    fn accepts(&self, entry: &WordEntry) -> bool {
        let level_ok = self.levels.is_empty()
            || self.levels.iter().any(|l| l.eq_ignore_ascii_case(&entry.level));
        let tags_ok = self
            .tags
            .iter()
            .all(|t| entry.tags.iter().any(|e| e.eq_ignore_ascii_case(t)));
        level_ok && tags_ok
    }

    fn describe(&self) -> String {
        let mut parts = Vec::new();
        if !self.levels.is_empty() {
            parts.push(format!("level {}", self.levels.join("/")));
        }
        if !self.tags.is_empty() {
            parts.push(format!("tags [{}]", self.tags.join(", ")));
        }
        if parts.is_empty() {
            String::new()
        } else {
            format!(" with {}", parts.join(" and "))
        }
    }
}

/// In-memory word datasets with a synonym table.
#[derive(Debug, Clone, Default)]
pub struct WordLibrary {
    datasets: BTreeMap<String, WordDataset>,
    aliases: HashMap<String, String>,
}

impl WordLibrary {
    pub fn empty() -> Self {
        WordLibrary::default()
    }

    /// The built-in datasets: animals, colors, fruits, verbs, jobs.
    pub fn builtin() -> Self {
        let mut library = WordLibrary::empty();
        for (name, rows) in builtin::DATASETS {
            let words = rows
                .iter()
                .map(|(word, category, level, tags)| WordEntry {
                    word: word.to_string(),
                    category: category.to_string(),
                    level: level.to_string(),
                    tags: tags.iter().map(|t| t.to_string()).collect(),
                })
                .collect();
            library.add_dataset(WordDataset {
                name: name.to_string(),
                aliases: Vec::new(),
                words,
            });
        }
        for (alias, target) in builtin::ALIASES {
            library.aliases.insert(alias.to_string(), target.to_string());
        }
        library
    }

    /// Add a dataset, merging words into an existing one of the same name.
    pub fn add_dataset(&mut self, dataset: WordDataset) {
        let name = dataset.name.trim().to_lowercase();
        for alias in &dataset.aliases {
            self.aliases.insert(alias.trim().to_lowercase(), name.clone());
        }
        match self.datasets.get_mut(&name) {
            Some(existing) => existing.words.extend(dataset.words),
            None => {
                self.datasets.insert(
                    name.clone(),
                    WordDataset {
                        name,
                        aliases: dataset.aliases,
                        words: dataset.words,
                    },
                );
            }
        }
    }

    /// Merge datasets from a TOML document. Returns how many were read.
    pub fn load_toml(&mut self, text: &str) -> Result<usize, WordLibraryError> {
        let file: LibraryFile = toml::from_str(text).map_err(|e| WordLibraryError::Load(e.to_string()))?;
        let count = file.libraries.len();
        for dataset in file.libraries {
            if dataset.name.trim().is_empty() {
                return Err(WordLibraryError::Load("library without a name".to_string()));
            }
            tracing::debug!(name = %dataset.name, words = dataset.words.len(), "loaded word library");
            self.add_dataset(dataset);
        }
        Ok(count)
    }

    pub fn load_toml_file(&mut self, path: &Path) -> Result<usize, WordLibraryError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| WordLibraryError::Load(format!("{}: {}", path.display(), e)))?;
        self.load_toml(&text)
    }

    pub fn datasets(&self) -> impl Iterator<Item = &WordDataset> {
        self.datasets.values()
    }

    pub fn dataset(&self, name: &str) -> Option<&WordDataset> {
        self.datasets.get(&self.canonical(name))
    }

    /// Resolve synonyms to a dataset or category name.
    pub fn canonical(&self, query: &str) -> String {
        let key = query.trim().to_lowercase();
        self.aliases.get(&key).cloned().unwrap_or(key)
    }

    /// Words matching a dataset name, or failing that a category across all
    /// datasets, after filtering.
    pub fn pool(&self, query: &str, filter: &WordFilter) -> Vec<&WordEntry> {
        let name = self.canonical(query);
        let candidates: Vec<&WordEntry> = match self.datasets.get(&name) {
            Some(dataset) => dataset.words.iter().collect(),
            None => self
                .datasets
                .values()
                .flat_map(|d| d.words.iter())
                .filter(|w| w.category.eq_ignore_ascii_case(&name))
                .collect(),
        };
        candidates.into_iter().filter(|w| filter.accepts(w)).collect()
    }

    /// Sample up to `amount` distinct words. Fails when nothing matches.
    pub fn sample(
        &self,
        query: &str,
        filter: &WordFilter,
        amount: usize,
        rng: &mut dyn RandomSource,
    ) -> Result<Vec<String>, WordLibraryError> {
        let pool = self.pool(query, filter);
        if pool.is_empty() {
            return Err(WordLibraryError::NotFound {
                query: query.trim().to_string(),
                filters: filter.describe(),
            });
        }
        if amount > pool.len() {
            tracing::debug!(query, requested = amount, available = pool.len(), "capping fill amount");
        }
        Ok(sample_indices(pool.len(), amount, rng)
            .into_iter()
            .map(|i| pool[i].word.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::OsRandom;

    #[test]
    fn dataset_and_alias_lookup() {
        let lib = WordLibrary::builtin();
        let animals = lib.pool("animals", &WordFilter::default()).len();
        assert!(animals > 10);
        assert_eq!(lib.pool("Animal", &WordFilter::default()).len(), animals);
        assert_eq!(lib.pool("colours", &WordFilter::default()).len(), lib.pool("colors", &WordFilter::default()).len());
    }

    #[test]
    fn category_lookup_spans_datasets() {
        let lib = WordLibrary::builtin();
        let birds = lib.pool("bird", &WordFilter::default());
        assert!(!birds.is_empty());
        assert!(birds.iter().all(|w| w.category == "birds"));
    }

    #[test]
    fn filters_apply() {
        let lib = WordLibrary::builtin();
        let filter = WordFilter {
            levels: vec!["a1".into()],
            tags: vec!["farm".into()],
        };
        let pool = lib.pool("animals", &filter);
        assert!(!pool.is_empty());
        assert!(pool.iter().all(|w| w.level == "A1" && w.tags.contains(&"farm".to_string())));
    }

    #[test]
    fn sample_caps_and_fails_on_empty() {
        let lib = WordLibrary::builtin();
        let mut rng = OsRandom::new();
        let size = lib.pool("animals", &WordFilter::default()).len();
        let words = lib.sample("animals", &WordFilter::default(), 100, &mut rng).unwrap();
        assert_eq!(words.len(), size);

        let err = lib
            .sample("nonexistent_category", &WordFilter::default(), 3, &mut rng)
            .unwrap_err();
        assert!(matches!(err, WordLibraryError::NotFound { .. }));
    }

    #[test]
    fn toml_libraries_merge() {
        let mut lib = WordLibrary::builtin();
        let n = lib
            .load_toml(
                r#"
[[library]]
name = "kitchen"
aliases = ["cooking"]

[[library.words]]
word = "pan"
category = "utensils"
level = "A2"

[[library.words]]
word = "whisk"
category = "utensils"
level = "B1"
tags = ["baking"]
"#,
            )
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(lib.pool("cooking", &WordFilter::default()).len(), 2);
        assert_eq!(lib.pool("utensils", &WordFilter::default()).len(), 2);
        assert!(lib.load_toml("library = 3").is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("words.toml");
        std::fs::write(&path, "[[library]]\nname = \"Tools\"\n[[library.words]]\nword = \"saw\"\ncategory = \"tools\"\nlevel = \"B1\"\n").unwrap();
        let mut lib = WordLibrary::empty();
        assert_eq!(lib.load_toml_file(&path).unwrap(), 1);
        assert!(lib.dataset("tools").is_some());
    }
}
