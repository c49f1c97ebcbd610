//! Global settings, kept in the user's preference directory.

use layerpaint_core::config::QueueConfig;

const DOCUMENTATION: &str = r#"# Layerpaint settings. You may edit this file, but be aware that formatting and comments will not
# be preserved, and all keys are case sensitive.

# [queue]
# Most undo steps kept per document. Set to 0 to keep every step.
# max_history = 100
# How many change notifications the renderer may fall behind before it skips some.
# notify_capacity = 64

"#;

#[must_use]
pub fn preferences_dir() -> Option<std::path::PathBuf> {
    let mut base_dir = dirs::preference_dir()?;
    base_dir.push(env!("CARGO_PKG_NAME"));
    Some(base_dir)
}

#[derive(Default, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(skip)]
    failed_to_load: bool,
    /// A settings file exists but could not be read or parsed.
    #[serde(skip)]
    unreadable_file: bool,
    pub queue: QueueConfig,
}
impl Settings {
    const FILENAME: &'static str = "settings.toml";
    /// Shared global settings, saved and loaded from user preferences.
    /// (Or defaulted, if unavailable for some reason)
    #[must_use]
    pub fn get() -> &'static Self {
        static GLOBAL_SETTINGS: std::sync::OnceLock<Settings> = std::sync::OnceLock::new();

        GLOBAL_SETTINGS.get_or_init(|| {
            let mut dir = preferences_dir();
            match dir.as_mut() {
                None => Self::no_path(),
                Some(dir) => {
                    dir.push(Self::FILENAME);
                    Self::load_or_default(dir)
                }
            }
        })
    }
    #[must_use]
    pub fn no_path() -> Self {
        log::warn!("Settings weren't available, defaulting.");
        Self {
            failed_to_load: true,
            ..Default::default()
        }
    }
    #[must_use]
    fn load_or_default(path: &std::path::Path) -> Self {
        let settings: anyhow::Result<Self> = try_block::try_block! {
            let string = std::fs::read_to_string(path)?;
            let settings: Self = toml::from_str(&string)?;
            Ok(settings)
        };

        match settings {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Failed to load {}: {e:#}", path.display());
                let missing = e
                    .downcast_ref::<std::io::Error>()
                    .is_some_and(|e| e.kind() == std::io::ErrorKind::NotFound);
                Self {
                    unreadable_file: !missing,
                    ..Self::no_path()
                }
            }
        }
    }
    /// Return true if loading user's settings failed.
    #[must_use]
    pub fn did_fail_to_load(&self) -> bool {
        self.failed_to_load
    }
    /// False if saving would overwrite a file the user wrote but we couldn't read.
    #[must_use]
    pub fn should_save(&self) -> bool {
        !self.unreadable_file
    }
    pub fn save(&self) -> anyhow::Result<()> {
        let mut preferences =
            preferences_dir().ok_or_else(|| anyhow::anyhow!("No preferences dir found"))?;
        // Explicity do *not* create recursively. If not found, the user probably has a good reason.
        // Ignore errors (could already exist). Any real errors will be emitted by file access below.
        let _ = std::fs::DirBuilder::new().create(&preferences);

        preferences.push(Self::FILENAME);
        self.save_to(&preferences)
    }
    fn save_to(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let mut string = toml::ser::to_string_pretty(self)?;
        // Prefix some documentation.
        string = DOCUMENTATION.to_owned() + &string;
        std::fs::write(path, string)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::Settings;

    #[test]
    fn missing_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_or_default(&dir.path().join("settings.toml"));
        assert!(settings.did_fail_to_load());
        assert!(settings.should_save());
        assert_eq!(settings.queue, Default::default());
    }
    #[test]
    fn partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[queue]\nmax_history = 5\n").unwrap();
        let settings = Settings::load_or_default(&path);
        assert!(!settings.did_fail_to_load());
        assert_eq!(settings.queue.max_history.map(std::num::NonZeroUsize::get), Some(5));
        assert_eq!(
            settings.queue.notify_capacity,
            layerpaint_core::config::QueueConfig::DEFAULT_NOTIFY_CAPACITY
        );
    }
    #[test]
    fn saved_settings_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let mut settings = Settings::default();
        settings.queue.notify_capacity = 3;
        settings.save_to(&path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# Layerpaint settings."));

        let reloaded = Settings::load_or_default(&path);
        assert!(!reloaded.did_fail_to_load());
        assert_eq!(reloaded.queue, settings.queue);
    }
    #[test]
    fn unbounded_history_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let mut settings = Settings::default();
        settings.queue.max_history = None;
        settings.save_to(&path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("max_history = 0"));

        let reloaded = Settings::load_or_default(&path);
        assert!(!reloaded.did_fail_to_load());
        assert_eq!(reloaded.queue.max_history, None);
    }
    #[test]
    fn broken_file_is_not_saved_over() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[queue]
max_histroy = = 5
").unwrap();
        let settings = Settings::load_or_default(&path);
        assert!(settings.did_fail_to_load());
        assert!(!settings.should_save());
        assert_eq!(settings.queue, Default::default());
    }
}
