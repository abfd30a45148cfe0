//! File-backed persistence for favorite prompts.
//!
//! Favorites survive process restarts as a single JSON file: the whole list
//! is read once at construction and rewritten on every mutation with an
//! atomic temp-file + rename, so a crash mid-write never corrupts the store.

use crate::SavedPromptItem;
use std::path::PathBuf;

/// Persistent store of [`SavedPromptItem`]s, newest first.
pub struct FavoritesStore {
    path: PathBuf,
    items: Vec<SavedPromptItem>,
}

impl FavoritesStore {
    /// Open a store at `path`, reading any existing favorites. A missing
    /// file yields an empty store; a malformed file is an error.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, String> {
        let path = path.into();
        let items = if path.exists() {
            let json = std::fs::read_to_string(&path)
                .map_err(|e| format!("Failed to read favorites: {e}"))?;
            serde_json::from_str(&json).map_err(|e| format!("Failed to parse favorites: {e}"))?
        } else {
            Vec::new()
        };
        Ok(Self { path, items })
    }

    /// All saved prompts, newest first.
    pub fn items(&self) -> &[SavedPromptItem] {
        &self.items
    }

    /// Whether a favorite with this exact raw prompt already exists.
    pub fn contains_raw(&self, raw_prompt: &str) -> bool {
        self.items.iter().any(|p| p.raw_prompt == raw_prompt)
    }

    /// Prepend a favorite and persist the list.
    pub fn add(&mut self, item: SavedPromptItem) -> Result<(), String> {
        self.items.insert(0, item);
        self.persist()
    }

    /// Remove a favorite by id and persist. Returns whether anything was
    /// removed; removing an unknown id is not an error.
    pub fn remove(&mut self, id: &str) -> Result<bool, String> {
        let before = self.items.len();
        self.items.retain(|p| p.id != id);
        if self.items.len() == before {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    /// Atomic write: serialize to a temp file, then rename into place.
    fn persist(&self) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| format!("Failed to create favorites dir: {e}"))?;
            }
        }

        let tmp_path = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(&self.items)
            .map_err(|e| format!("Failed to serialize favorites: {e}"))?;
        std::fs::write(&tmp_path, json)
            .map_err(|e| format!("Failed to write temp favorites: {e}"))?;
        std::fs::rename(&tmp_path, &self.path)
            .map_err(|e| format!("Failed to rename favorites: {e}"))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StructuredPrompt;

    fn make_item(name: &str, raw: &str) -> SavedPromptItem {
        SavedPromptItem::new(name, raw, StructuredPrompt::blank())
    }

    #[test]
    fn missing_file_yields_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = FavoritesStore::new(dir.path().join("favorites.json")).unwrap();
        assert!(store.items().is_empty());
    }

    #[test]
    fn add_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("favorites.json");

        let mut store = FavoritesStore::new(&path).unwrap();
        store.add(make_item("cat", "a cat on a mat")).unwrap();
        store.add(make_item("dog", "a dog in fog")).unwrap();

        let reopened = FavoritesStore::new(&path).unwrap();
        assert_eq!(reopened.items().len(), 2);
        // Newest first.
        assert_eq!(reopened.items()[0].name, "dog");
        assert_eq!(reopened.items()[1].name, "cat");
    }

    #[test]
    fn contains_raw_matches_exact_text() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FavoritesStore::new(dir.path().join("favorites.json")).unwrap();
        store.add(make_item("cat", "a cat on a mat")).unwrap();

        assert!(store.contains_raw("a cat on a mat"));
        assert!(!store.contains_raw("a cat on a mat "));
    }

    #[test]
    fn remove_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("favorites.json");
        let mut store = FavoritesStore::new(&path).unwrap();

        let item = make_item("cat", "a cat on a mat");
        let id = item.id.clone();
        store.add(item).unwrap();

        assert!(store.remove(&id).unwrap());
        assert!(store.items().is_empty());
        assert!(!store.remove(&id).unwrap(), "second removal is a no-op");

        let reopened = FavoritesStore::new(&path).unwrap();
        assert!(reopened.items().is_empty());
    }

    #[test]
    fn creates_parent_directories_on_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deep").join("favorites.json");
        let mut store = FavoritesStore::new(&path).unwrap();
        store.add(make_item("cat", "a cat")).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn atomic_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("favorites.json");
        let mut store = FavoritesStore::new(&path).unwrap();
        store.add(make_item("cat", "a cat")).unwrap();
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("favorites.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(FavoritesStore::new(&path).is_err());
    }
}
