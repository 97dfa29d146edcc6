use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::state::WindowKind;
use crate::types::MonitorError;

use super::geometry::{Point, ScreenFrame, Size};

const DAEMON_PREFERENCE_KEY: &str = "lastUserLaunchState";
const DOCK_ICON_KEY: &str = "showDockIcon";
const MENU_BAR_ICON_KEY: &str = "showMenuBarIcon";

fn window_origin_key(window: WindowKind) -> String {
    format!("windowOrigin.{}", window.key())
}

/// Key-value settings backed by a JSON file.
///
/// The file is read once on open; every save rewrites it. A missing,
/// unreadable or malformed file behaves like an empty one.
pub struct SettingsStore {
    path: PathBuf,
    values: Mutex<Map<String, Value>>,
}

impl SettingsStore {
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match fs::read_to_string(&path).await {
            Ok(contents) => match serde_json::from_str::<Map<String, Value>>(&contents) {
                Ok(values) => {
                    debug!(path = %path.display(), keys = values.len(), "Loaded settings");
                    values
                }
                Err(err) => {
                    warn!(path = %path.display(), error = ?err, "Settings file is malformed, starting empty");
                    Map::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No settings file yet");
                Map::new()
            }
            Err(err) => {
                warn!(path = %path.display(), error = ?err, "Failed to read settings file, starting empty");
                Map::new()
            }
        };
        Self {
            path,
            values: Mutex::new(values),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The user's last explicit launch choice; `None` when never set.
    pub async fn load_daemon_preference(&self) -> Option<bool> {
        self.get(DAEMON_PREFERENCE_KEY).await
    }

    pub async fn save_daemon_preference(&self, enabled: bool) -> Result<(), MonitorError> {
        self.set(DAEMON_PREFERENCE_KEY, &enabled).await
    }

    pub async fn save_origin(&self, window: WindowKind, origin: Point) -> Result<(), MonitorError> {
        if !origin.is_finite() {
            return Err(MonitorError::PersistenceDecode {
                key: window_origin_key(window),
                reason: "origin is not finite".to_string(),
            });
        }
        self.set(&window_origin_key(window), &origin).await
    }

    /// Saved origin of `window`, or the origin centring it on `screen` when
    /// nothing usable is stored or the stored origin is off-screen.
    pub async fn load_origin(&self, window: WindowKind, screen: ScreenFrame, size: Size) -> Point {
        match self.get::<Point>(&window_origin_key(window)).await {
            Some(origin) if screen.shows(origin, size) => origin,
            Some(origin) => {
                debug!(window = window.key(), x = origin.x, y = origin.y, "Saved window origin is off-screen");
                screen.centered(size)
            }
            None => screen.centered(size),
        }
    }

    pub async fn load_dock_visibility(&self) -> bool {
        self.get(DOCK_ICON_KEY).await.unwrap_or(true)
    }

    pub async fn save_dock_visibility(&self, visible: bool) -> Result<(), MonitorError> {
        self.set(DOCK_ICON_KEY, &visible).await
    }

    pub async fn load_menu_bar_visibility(&self) -> bool {
        self.get(MENU_BAR_ICON_KEY).await.unwrap_or(true)
    }

    pub async fn save_menu_bar_visibility(&self, visible: bool) -> Result<(), MonitorError> {
        self.set(MENU_BAR_ICON_KEY, &visible).await
    }

    async fn get<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let value = self.values.lock().await.get(key).cloned()?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                let err = MonitorError::PersistenceDecode {
                    key: key.to_string(),
                    reason: err.to_string(),
                };
                warn!(error = ?err, "Ignoring stored setting");
                None
            }
        }
    }

    async fn set<T>(&self, key: &str, value: &T) -> Result<(), MonitorError>
    where
        T: Serialize + ?Sized,
    {
        let value = serde_json::to_value(value)?;
        let mut values = self.values.lock().await;
        values.insert(key.to_string(), value);
        self.write(&values).await?;
        debug!(key = %key, "Saved setting");
        Ok(())
    }

    async fn write(&self, values: &Map<String, Value>) -> Result<(), MonitorError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let contents = serde_json::to_vec_pretty(values)?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, contents).await?;
        fs::rename(&staging, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn screen() -> ScreenFrame {
        ScreenFrame::new(0.0, 0.0, 1440.0, 900.0)
    }

    #[tokio::test]
    async fn daemon_preference_round_trips_through_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let store = SettingsStore::open(&path).await;
        assert_eq!(store.load_daemon_preference().await, None);
        store.save_daemon_preference(false).await.unwrap();

        let reopened = SettingsStore::open(&path).await;
        assert_eq!(reopened.load_daemon_preference().await, Some(false));
    }

    #[tokio::test]
    async fn malformed_file_is_treated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "[1, 2").unwrap();

        let store = SettingsStore::open(&path).await;
        assert_eq!(store.load_daemon_preference().await, None);
        assert!(store.load_dock_visibility().await);
    }

    #[tokio::test]
    async fn undecodable_origin_falls_back_to_centre() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"windowOrigin.status": "{12, 40}"}"#).unwrap();

        let store = SettingsStore::open(&path).await;
        let size = Size::new(280.0, 300.0);
        let origin = store.load_origin(WindowKind::Status, screen(), size).await;
        assert_eq!(origin, screen().centered(size));
    }

    #[tokio::test]
    async fn origins_are_stored_per_window() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::open(dir.path().join("settings.json")).await;
        let size = Size::new(280.0, 300.0);

        store
            .save_origin(WindowKind::Console, Point::new(40.0, 60.0))
            .await
            .unwrap();
        assert_eq!(
            store.load_origin(WindowKind::Console, screen(), size).await,
            Point::new(40.0, 60.0)
        );
        assert_eq!(
            store.load_origin(WindowKind::Status, screen(), size).await,
            screen().centered(size)
        );
    }

    #[tokio::test]
    async fn off_screen_origin_is_recentred() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::open(dir.path().join("settings.json")).await;
        let size = Size::new(280.0, 300.0);

        store
            .save_origin(WindowKind::Status, Point::new(5000.0, 5000.0))
            .await
            .unwrap();
        assert_eq!(
            store.load_origin(WindowKind::Status, screen(), size).await,
            screen().centered(size)
        );
    }

    #[tokio::test]
    async fn non_finite_origin_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::open(dir.path().join("settings.json")).await;
        let err = store
            .save_origin(WindowKind::Status, Point::new(f64::INFINITY, 0.0))
            .await
            .unwrap_err();
        assert!(matches!(err, MonitorError::PersistenceDecode { .. }));
    }

    #[tokio::test]
    async fn icon_visibility_defaults_to_shown() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::open(dir.path().join("settings.json")).await;
        assert!(store.load_menu_bar_visibility().await);

        store.save_menu_bar_visibility(false).await.unwrap();
        store.save_dock_visibility(false).await.unwrap();
        assert!(!store.load_menu_bar_visibility().await);
        assert!(!store.load_dock_visibility().await);
    }
}
