//! Settings persistence through eframe storage.
//!
//! Values are stored as JSON strings under fixed keys.

use crate::app::Preferences;
use serde::{Deserialize, Serialize};

const PREFERENCES_KEY: &str = "docview_preferences";

pub struct SettingsCoordinator;

impl SettingsCoordinator {
    /// Loads the saved preferences, or defaults when nothing valid is stored.
    pub fn load_preferences(storage: Option<&dyn eframe::Storage>) -> Preferences {
        Self::load_setting_or(storage, PREFERENCES_KEY, Preferences::default())
    }

    /// Saves preferences under a single key.
    ///
    /// # Arguments
    /// * `storage` - The eframe storage interface (mutable)
    /// * `preferences` - The preferences to serialize and save
    pub fn save_preferences(storage: &mut dyn eframe::Storage, preferences: &Preferences) {
        Self::save_setting(storage, PREFERENCES_KEY, preferences);
    }

    /// Saves a setting to persistent storage.
    ///
    /// # Type Parameters
    /// * `T` - The type to serialize, must implement Serialize
    ///
    /// # Arguments
    /// * `storage` - The eframe storage interface (mutable)
    /// * `key` - The storage key for this setting
    /// * `value` - The value to serialize and save
    ///
    /// # Examples
    /// ```ignore
    /// SettingsCoordinator::save_setting(storage, "column_widths", &[320.0, 150.0, 90.0, 120.0]);
    /// ```
    pub fn save_setting<T>(storage: &mut dyn eframe::Storage, key: &str, value: &T)
    where
        T: Serialize,
    {
        match serde_json::to_string(value) {
            Ok(json) => {
                storage.set_string(key, json);
                storage.flush();
            }
            Err(e) => tracing::warn!(key, "failed to serialize setting: {}", e),
        }
    }

    /// Loads a setting from persistent storage with a custom default.
    ///
    /// # Type Parameters
    /// * `T` - The type to deserialize, must implement Deserialize
    ///
    /// # Arguments
    /// * `storage` - The eframe storage interface
    /// * `key` - The storage key for this setting
    /// * `default` - Returned when the key is missing or invalid
    ///
    /// # Returns
    /// The deserialized value if found and valid, otherwise `default`
    pub fn load_setting_or<T>(storage: Option<&dyn eframe::Storage>, key: &str, default: T) -> T
    where
        T: for<'de> Deserialize<'de>,
    {
        Self::try_load_setting(storage, key).unwrap_or(default)
    }

    /// `None` when the key is missing or holds something that does not decode.
    pub fn try_load_setting<T>(storage: Option<&dyn eframe::Storage>, key: &str) -> Option<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let json = storage?.get_string(key)?;
        match serde_json::from_str(&json) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, "ignoring stored setting: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::StrategyChoice;
    use docview::{Strategy, ViewMode};
    use std::collections::HashMap;

    #[derive(Default)]
    struct MockStorage {
        data: HashMap<String, String>,
    }

    impl eframe::Storage for MockStorage {
        fn get_string(&self, key: &str) -> Option<String> {
            self.data.get(key).cloned()
        }

        fn set_string(&mut self, key: &str, value: String) {
            self.data.insert(key.to_string(), value);
        }

        fn flush(&mut self) {}
    }

    #[test]
    fn test_preferences_round_trip() {
        let mut storage = MockStorage::default();
        let prefs = Preferences {
            strategy: StrategyChoice::Fixed(Strategy::LazyLoading),
            view_mode: ViewMode::Grid,
            page_size: 25,
            ..Preferences::default()
        };

        SettingsCoordinator::save_preferences(&mut storage, &prefs);

        assert_eq!(SettingsCoordinator::load_preferences(Some(&storage)), prefs);
    }

    #[test]
    fn test_missing_storage_gives_defaults() {
        assert_eq!(SettingsCoordinator::load_preferences(None), Preferences::default());
    }

    #[test]
    fn test_corrupt_setting_is_ignored() {
        let mut storage = MockStorage::default();
        eframe::Storage::set_string(&mut storage, PREFERENCES_KEY, "{not json".to_string());

        let loaded: Option<Preferences> =
            SettingsCoordinator::try_load_setting(Some(&storage), PREFERENCES_KEY);
        assert_eq!(loaded, None);
        assert_eq!(SettingsCoordinator::load_preferences(Some(&storage)), Preferences::default());
    }
}
