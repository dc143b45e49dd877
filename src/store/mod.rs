//! Settings persistence behind an async key-value store
//!
//! In the extension the store is the browser's synced storage area; the CLI
//! uses a JSON file. Calls are async without a `Send` bound so the same
//! trait can be implemented over JS promises.

pub mod file;

use crate::error::{IndicatorError, Result};
use crate::models::{SettingsChange, StoredSettings, StoredSettingsPatch};
use std::cell::{Cell, RefCell};

pub use file::JsonFileSettingsStore;

#[allow(async_fn_in_trait)]
pub trait SettingsStore {
    /// The top-level keys exactly as stored
    async fn load_keys(&self) -> Result<StoredSettingsPatch>;

    async fn load(&self) -> Result<StoredSettings> {
        Ok(self.load_keys().await?.into_settings())
    }

    async fn save(&self, settings: &StoredSettings) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

type ChangeListener = Box<dyn Fn(SettingsChange)>;

/// In-memory store with change notification
#[derive(Default)]
pub struct MemorySettingsStore {
    settings: RefCell<StoredSettingsPatch>,
    listeners: RefCell<Vec<ChangeListener>>,
    failing: Cell<bool>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: StoredSettings) -> Self {
        Self::with_keys(settings.into())
    }

    /// Start from a store where only some keys were ever written
    pub fn with_keys(keys: StoredSettingsPatch) -> Self {
        Self {
            settings: RefCell::new(keys),
            ..Self::default()
        }
    }

    /// Make every following call fail until switched back
    pub fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }

    pub fn snapshot(&self) -> StoredSettings {
        self.settings.borrow().clone().into_settings()
    }

    pub fn keys(&self) -> StoredSettingsPatch {
        self.settings.borrow().clone()
    }

    /// Called with the changed keys after every write that changed something
    pub fn subscribe(&self, listener: impl Fn(SettingsChange) + 'static) {
        self.listeners.borrow_mut().push(Box::new(listener));
    }

    fn check(&self) -> Result<()> {
        if self.failing.get() {
            return Err(IndicatorError::StoreAccess("store unavailable".into()));
        }
        Ok(())
    }

    fn replace(&self, keys: StoredSettingsPatch) {
        let change = self.snapshot().diff(&keys.clone().into_settings());
        *self.settings.borrow_mut() = keys;
        if change.is_empty() {
            return;
        }
        for listener in self.listeners.borrow().iter() {
            listener(change);
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    async fn load_keys(&self) -> Result<StoredSettingsPatch> {
        self.check()?;
        Ok(self.keys())
    }

    async fn save(&self, settings: &StoredSettings) -> Result<()> {
        self.check()?;
        self.replace(settings.clone().into());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.check()?;
        self.replace(StoredSettingsPatch::default());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DisplayConfig;
    use futures::executor::block_on;
    use std::rc::Rc;

    #[test]
    fn test_listeners_receive_changed_keys() {
        let store = MemorySettingsStore::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        store.subscribe(move |change| sink.borrow_mut().push(change));

        let mut settings = StoredSettings::default();
        settings
            .role_settings
            .insert("111111111111:Dev".into(), DisplayConfig::new("Dev", "#00ff00"));
        block_on(store.save(&settings)).unwrap();
        // Same content again: nothing to report
        block_on(store.save(&settings)).unwrap();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].roles && !seen[0].accounts && !seen[0].global);
    }

    #[test]
    fn test_failing_store() {
        let store = MemorySettingsStore::new();
        store.set_failing(true);
        assert!(matches!(
            block_on(store.load()),
            Err(IndicatorError::StoreAccess(_))
        ));
        store.set_failing(false);
        assert!(block_on(store.load()).is_ok());
    }
}
