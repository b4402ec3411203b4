//! Theme preference persistence under `<namespace>:theme`.

use crate::model::preferences::Theme;
use crate::repo::kv_store::{KeyValueStore, StorageKeys};
use crate::repo::page_repo::RepoResult;
use log::warn;

#[derive(Debug, Clone)]
pub struct PreferenceRepository<S> {
    store: S,
    keys: StorageKeys,
}

impl<S: KeyValueStore> PreferenceRepository<S> {
    pub fn new(store: S, keys: StorageKeys) -> Self {
        Self { store, keys }
    }

    /// Stored theme; an unrecognized value is logged and treated as unset.
    pub fn load_theme(&self) -> RepoResult<Option<Theme>> {
        let Some(raw) = self.store.get(&self.keys.theme())? else {
            return Ok(None);
        };
        // Older writers stored the value JSON-encoded.
        match raw.trim().trim_matches('"').parse::<Theme>() {
            Ok(theme) => Ok(Some(theme)),
            Err(err) => {
                warn!(
                    "event=theme_load module=repo status=degraded error_code=theme_invalid error={}",
                    err
                );
                Ok(None)
            }
        }
    }

    pub fn save_theme(&self, theme: Theme) -> RepoResult<()> {
        self.store.set(&self.keys.theme(), theme.as_str())?;
        Ok(())
    }
}
