use std::{env, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};

pub const DEFAULT_DB_PATH: &str = "./data/toolshelf.db";
pub const DEFAULT_MEDIA_DIR: &str = "./data/media";
pub const DEFAULT_MEDIA_BASE_URL: &str = "/media";
pub const DEFAULT_PAGE_SIZE: usize = 12;
pub const MAX_PAGE_SIZE: usize = 100;

/// What a read does when the document store fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadFailurePolicy {
    /// Surface the error to the caller.
    Propagate,
    /// Log it and return an empty result.
    #[default]
    Degrade,
}

impl FromStr for ReadFailurePolicy {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "propagate" | "strict" => Ok(Self::Propagate),
            "degrade" | "lenient" => Ok(Self::Degrade),
            other => Err(format!("unknown read failure policy `{other}`")),
        }
    }
}

/// Search strategy for the tool catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Trigram index kept in process, verified by substring match.
    #[default]
    Indexed,
    /// Load the collection and substring-match every document.
    Scan,
    /// Case-sensitive prefix range queries on name/description plus exact
    /// tag membership.
    Prefix,
}

impl FromStr for SearchMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "indexed" | "index" => Ok(Self::Indexed),
            "scan" => Ok(Self::Scan),
            "prefix" => Ok(Self::Prefix),
            other => Err(format!("unknown search mode `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryConfig {
    pub db_path: PathBuf,
    pub media_dir: PathBuf,
    pub media_base_url: String,
    pub read_failure_policy: ReadFailurePolicy,
    pub search_mode: SearchMode,
    pub default_page_size: usize,
    pub log_dir: Option<PathBuf>,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            media_dir: PathBuf::from(DEFAULT_MEDIA_DIR),
            media_base_url: DEFAULT_MEDIA_BASE_URL.to_string(),
            read_failure_policy: ReadFailurePolicy::default(),
            search_mode: SearchMode::default(),
            default_page_size: DEFAULT_PAGE_SIZE,
            log_dir: None,
        }
    }
}

impl DirectoryConfig {
    /// Reads `TOOLSHELF_*` variables. Unparseable values fall back to the
    /// default with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// `TOOLSHELF_LOG_DIR` alone, for installing the subscriber before the
    /// rest of the configuration is parsed and can warn.
    pub fn log_dir_from_env() -> Option<PathBuf> {
        Self::log_dir_from_lookup(|key| env::var(key).ok())
    }

    pub fn log_dir_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
        lookup("TOOLSHELF_LOG_DIR")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let db_path = non_empty("TOOLSHELF_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);
        let media_dir = non_empty("TOOLSHELF_MEDIA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.media_dir);
        let media_base_url = non_empty("TOOLSHELF_MEDIA_BASE_URL")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or(defaults.media_base_url);
        let read_failure_policy = parse_or_default(
            "TOOLSHELF_READ_FAILURE_POLICY",
            non_empty("TOOLSHELF_READ_FAILURE_POLICY"),
            defaults.read_failure_policy,
        );
        let search_mode = parse_or_default(
            "TOOLSHELF_SEARCH_MODE",
            non_empty("TOOLSHELF_SEARCH_MODE"),
            defaults.search_mode,
        );
        let default_page_size = parse_or_default(
            "TOOLSHELF_DEFAULT_PAGE_SIZE",
            non_empty("TOOLSHELF_DEFAULT_PAGE_SIZE"),
            defaults.default_page_size,
        )
        .clamp(1, MAX_PAGE_SIZE);
        let log_dir = Self::log_dir_from_lookup(&lookup);

        Self {
            db_path,
            media_dir,
            media_base_url,
            read_failure_policy,
            search_mode,
            default_page_size,
            log_dir,
        }
    }
}

fn parse_or_default<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => match raw.parse::<T>() {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("ignoring {key}={raw}: {err}");
                default
            },
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        io,
        sync::{Arc, Mutex},
    };

    use super::*;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn config_from(pairs: &[(&str, &str)]) -> DirectoryConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DirectoryConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_yields_defaults() {
        assert_eq!(config_from(&[]), DirectoryConfig::default());
    }

    #[test]
    fn reads_overrides_and_clamps_page_size() {
        let config = config_from(&[
            ("TOOLSHELF_DB_PATH", "/tmp/t.db"),
            ("TOOLSHELF_MEDIA_BASE_URL", "https://cdn.example.com/media/"),
            ("TOOLSHELF_READ_FAILURE_POLICY", "Propagate"),
            ("TOOLSHELF_SEARCH_MODE", "prefix"),
            ("TOOLSHELF_DEFAULT_PAGE_SIZE", "500"),
        ]);
        assert_eq!(config.db_path, PathBuf::from("/tmp/t.db"));
        assert_eq!(config.media_base_url, "https://cdn.example.com/media");
        assert_eq!(config.read_failure_policy, ReadFailurePolicy::Propagate);
        assert_eq!(config.search_mode, SearchMode::Prefix);
        assert_eq!(config.default_page_size, MAX_PAGE_SIZE);
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = config_from(&[
            ("TOOLSHELF_SEARCH_MODE", "fuzzy"),
            ("TOOLSHELF_DEFAULT_PAGE_SIZE", "twelve"),
        ]);
        assert_eq!(config.search_mode, SearchMode::Indexed);
        assert_eq!(config.default_page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn log_dir_is_readable_before_the_rest() {
        let vars: HashMap<&str, &str> = [
            ("TOOLSHELF_LOG_DIR", " /var/log/toolshelf "),
            ("TOOLSHELF_SEARCH_MODE", "fuzzy"),
        ]
        .into_iter()
        .collect();
        let lookup = |key: &str| vars.get(key).map(|v| v.to_string());
        let log_dir = DirectoryConfig::log_dir_from_lookup(lookup);
        assert_eq!(log_dir, Some(PathBuf::from("/var/log/toolshelf")));
        assert_eq!(DirectoryConfig::from_lookup(lookup).log_dir, log_dir);
        assert_eq!(DirectoryConfig::log_dir_from_lookup(|_| Some("  ".to_string())), None);
    }

    #[test]
    fn fallback_warnings_reach_the_installed_subscriber() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            config_from(&[("TOOLSHELF_SEARCH_MODE", "fuzzy")]);
        });
        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("ignoring TOOLSHELF_SEARCH_MODE=fuzzy"), "{output}");
    }
}
