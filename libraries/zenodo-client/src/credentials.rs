//! Named-section token store backed by a `~/.zenodorc` style file.
//!
//! The file format is the usual INI shape:
//!
//! ```text
//! [ZENODO]
//! token = abc123
//!
//! [SANDBOX]
//! token = def456
//! ```
//!
//! Section names are case-insensitive and kept upper-case; keys are kept
//! lower-case. Section and key order is preserved across load/persist.

use crate::error::{ConfigError, Result};
use crate::report::{Notice, Reporter, TracingReporter};
use ini::{EscapePolicy, Ini, ParseOption, Properties, WriteOption};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Section holding production tokens.
pub const PRODUCTION_SECTION: &str = "ZENODO";
/// Section holding sandbox tokens.
pub const SANDBOX_SECTION: &str = "SANDBOX";
/// Value written into a freshly created config file.
pub const PLACEHOLDER_TOKEN: &str = "<FIXME>";

const DEFAULT_FILE_NAME: &str = ".zenodorc";

/// Default credential file location (`~/.zenodorc`).
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_FILE_NAME)
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

/// Section name for the selected instance.
pub fn section_for(sandbox: bool) -> &'static str {
    if sandbox {
        SANDBOX_SECTION
    } else {
        PRODUCTION_SECTION
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Section {
    name: String,
    entries: Vec<(String, String)>,
}

impl Section {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_uppercase(),
            entries: Vec::new(),
        }
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// In-memory view of a credential file.
pub struct CredentialStore {
    path: PathBuf,
    sections: Vec<Section>,
    reporter: Arc<dyn Reporter>,
}

impl fmt::Debug for CredentialStore {
    // Tokens are secrets; only names are shown.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("path", &self.path)
            .field("sections", &self.list_sections())
            .finish_non_exhaustive()
    }
}

impl CredentialStore {
    /// Load an existing credential file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = expand_home(path.as_ref());
        if !path.exists() {
            return Err(ConfigError::NotFound(path).into());
        }

        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let sections = parse(&path, &text)?;
        debug!(path = %path.display(), sections = sections.len(), "Loaded credential file");

        Ok(Self {
            path,
            sections,
            reporter: Arc::new(TracingReporter),
        })
    }

    /// Write a new file with empty `ZENODO` and `SANDBOX` sections and a
    /// placeholder token in the section selected by `sandbox`.
    pub fn create_default(path: impl AsRef<Path>, sandbox: bool) -> Result<Self> {
        let path = expand_home(path.as_ref());
        if path.exists() {
            return Err(ConfigError::AlreadyExists(path).into());
        }

        let mut production = Section::new(PRODUCTION_SECTION);
        let mut sandbox_section = Section::new(SANDBOX_SECTION);
        let target = if sandbox {
            &mut sandbox_section
        } else {
            &mut production
        };
        target
            .entries
            .push(("token".to_string(), PLACEHOLDER_TOKEN.to_string()));

        let store = Self {
            path,
            sections: vec![production, sandbox_section],
            reporter: Arc::new(TracingReporter),
        };
        store.write_file()?;
        info!(path = %store.path.display(), "Created credential file");

        Ok(store)
    }

    /// Route overwrite warnings through `reporter`.
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// File this store was loaded from and persists to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn list_sections(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.name.as_str()).collect()
    }

    /// All `(key, token)` pairs of a section, in file order.
    pub fn list_tokens(&self, section: &str) -> Result<Vec<(&str, &str)>> {
        let section = self.section(section)?;
        Ok(section
            .entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect())
    }

    pub fn read_token(&self, section: &str, key: &str) -> Result<&str> {
        let found = self.section(section)?;
        let key = key.to_lowercase();
        found.get(&key).ok_or_else(|| {
            ConfigError::UnknownKey {
                section: found.name.clone(),
                key,
            }
            .into()
        })
    }

    /// First token of a section, the one the client authenticates with.
    pub fn first_token(&self, section: &str) -> Result<&str> {
        let found = self.section(section)?;
        found
            .entries
            .first()
            .map(|(_, v)| v.as_str())
            .ok_or_else(|| {
                ConfigError::EmptySection {
                    section: found.name.clone(),
                }
                .into()
            })
    }

    /// Set a token. An existing key is only replaced when `force_rewrite`
    /// is set, and the replacement is reported.
    pub fn write_token(
        &mut self,
        section: &str,
        key: &str,
        token: &str,
        force_rewrite: bool,
    ) -> Result<()> {
        let key = key.trim().to_lowercase();
        if key.is_empty() {
            return Err(ConfigError::MissingKey.into());
        }

        let path = self.path.clone();
        let reporter = Arc::clone(&self.reporter);
        let found = self.section_mut(section)?;

        match found.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) if force_rewrite => {
                reporter.notice(Notice::TokenOverwritten {
                    section: found.name.clone(),
                    key: key.clone(),
                });
                entry.1 = token.to_string();
            }
            Some(_) => {
                return Err(ConfigError::DuplicateKey {
                    section: found.name.clone(),
                    key,
                }
                .into());
            }
            None => found.entries.push((key, token.to_string())),
        }

        debug!(path = %path.display(), section = %section.to_uppercase(), "Token written");
        Ok(())
    }

    /// Write the in-memory state back to the original file, which must
    /// still exist.
    pub fn persist(&self) -> Result<()> {
        if !self.path.exists() {
            return Err(ConfigError::NotFound(self.path.clone()).into());
        }
        self.write_file()
    }

    fn section(&self, name: &str) -> Result<&Section> {
        let wanted = name.trim().to_uppercase();
        self.sections
            .iter()
            .find(|s| s.name == wanted)
            .ok_or_else(|| {
                ConfigError::UnknownSection {
                    section: wanted,
                    path: self.path.clone(),
                }
                .into()
            })
    }

    fn section_mut(&mut self, name: &str) -> Result<&mut Section> {
        let wanted = name.trim().to_uppercase();
        let path = self.path.clone();
        self.sections
            .iter_mut()
            .find(|s| s.name == wanted)
            .ok_or_else(|| {
                ConfigError::UnknownSection {
                    section: wanted,
                    path,
                }
                .into()
            })
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        for section in &self.sections {
            let properties = ini
                .entry(Some(section.name.clone()))
                .or_insert(Properties::new());
            for (key, value) in &section.entries {
                properties.insert(key.as_str(), value.as_str());
            }
        }
        ini
    }

    fn write_file(&self) -> Result<()> {
        let io_err = |source| ConfigError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&self.path).map_err(io_err)?;
        let format = WriteOption {
            escape_policy: EscapePolicy::Nothing,
            kv_separator: " = ",
            ..WriteOption::default()
        };
        self.to_ini().write_to_opt(&mut file, format).map_err(io_err)?;
        file.flush().map_err(io_err)?;
        Ok(())
    }
}

fn parse(path: &Path, text: &str) -> std::result::Result<Vec<Section>, ConfigError> {
    let malformed = |reason: String| ConfigError::Malformed {
        path: path.to_path_buf(),
        reason,
    };

    let options = ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        ..ParseOption::default()
    };
    let ini = Ini::load_from_str_opt(text, options).map_err(|e| malformed(e.to_string()))?;

    let mut sections: Vec<Section> = Vec::new();
    for (name, properties) in ini.iter() {
        let Some(name) = name else {
            if properties.iter().next().is_none() {
                continue;
            }
            return Err(malformed("key outside of any section".into()));
        };

        let name = name.trim().to_uppercase();
        if name.is_empty() {
            return Err(malformed("empty section name".into()));
        }
        if sections.iter().any(|s| s.name == name) {
            return Err(malformed(format!("duplicate section [{name}]")));
        }

        let mut section = Section::new(&name);
        for (key, value) in properties.iter() {
            let key = key.trim().to_lowercase();
            if key.is_empty() {
                return Err(malformed(format!("empty key in section [{name}]")));
            }
            if section.get(&key).is_some() {
                return Err(malformed(format!(
                    "duplicate key '{key}' in section [{name}]"
                )));
            }
            section.entries.push((key, value.trim().to_string()));
        }
        sections.push(section);
    }

    Ok(sections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ZenodoError;
    use crate::report::MemoryReporter;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn store_with(text: &str) -> (TempDir, CredentialStore) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("zenodorc");
        fs::write(&path, text).unwrap();
        let store = CredentialStore::load(&path).unwrap();
        (dir, store)
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = CredentialStore::load(dir.path().join("nope")).unwrap_err();
        assert!(matches!(
            err,
            ZenodoError::Configuration(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn test_parse_sections_and_comments() {
        let (_dir, store) = store_with(
            "# tokens\n[zenodo]\ntoken = abc\nSecond: def\n\n; sandbox\n[Sandbox]\ntoken=xyz\n",
        );

        assert_eq!(store.list_sections(), vec!["ZENODO", "SANDBOX"]);
        assert_eq!(
            store.list_tokens("zenodo").unwrap(),
            vec![("token", "abc"), ("second", "def")]
        );
        assert_eq!(store.read_token("SANDBOX", "token").unwrap(), "xyz");
        assert_eq!(store.first_token("Zenodo").unwrap(), "abc");
    }

    #[test]
    fn test_key_outside_section_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rc");
        fs::write(&path, "token = abc\n[ZENODO]\n").unwrap();

        match CredentialStore::load(&path).unwrap_err() {
            ZenodoError::Configuration(ConfigError::Malformed { reason, .. }) => {
                assert!(reason.contains("outside of any section"))
            }
            e => panic!("Expected Malformed, got: {:?}", e),
        }
    }

    #[test]
    fn test_duplicate_key_in_file_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rc");
        fs::write(&path, "[ZENODO]\ntoken = a\nTOKEN = b\n").unwrap();
        assert!(matches!(
            CredentialStore::load(&path).unwrap_err(),
            ZenodoError::Configuration(ConfigError::Malformed { .. })
        ));

        fs::write(&path, "[ZENODO]\ntoken = a\n[zenodo]\nother = b\n").unwrap();
        assert!(CredentialStore::load(&path).is_err());
    }

    #[test]
    fn test_create_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rc");

        let store = CredentialStore::create_default(&path, true).unwrap();
        assert_eq!(store.list_sections(), vec!["ZENODO", "SANDBOX"]);
        assert!(store.list_tokens("ZENODO").unwrap().is_empty());
        assert_eq!(store.read_token("SANDBOX", "token").unwrap(), PLACEHOLDER_TOKEN);

        let reloaded = CredentialStore::load(&path).unwrap();
        assert_eq!(reloaded.read_token("SANDBOX", "token").unwrap(), PLACEHOLDER_TOKEN);

        let err = CredentialStore::create_default(&path, false).unwrap_err();
        assert!(matches!(
            err,
            ZenodoError::Configuration(ConfigError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_write_then_read_case_insensitive() {
        let (_dir, mut store) = store_with("[ZENODO]\n[SANDBOX]\n");

        store.write_token("ZENODO", "default", "abc", false).unwrap();
        assert_eq!(store.read_token("zenodo", "default").unwrap(), "abc");
    }

    #[test]
    fn test_write_duplicate_requires_force() {
        let (_dir, store) = store_with("[ZENODO]\n");
        let reporter = Arc::new(MemoryReporter::new());
        let mut store = store.with_reporter(reporter.clone());

        store.write_token("ZENODO", "default", "abc", false).unwrap();

        let err = store
            .write_token("ZENODO", "default", "new", false)
            .unwrap_err();
        assert!(matches!(
            err,
            ZenodoError::Configuration(ConfigError::DuplicateKey { .. })
        ));
        assert_eq!(store.read_token("ZENODO", "default").unwrap(), "abc");
        assert!(reporter.notices().is_empty());

        store.write_token("ZENODO", "default", "new", true).unwrap();
        assert_eq!(store.read_token("ZENODO", "default").unwrap(), "new");
        assert_eq!(store.list_tokens("ZENODO").unwrap().len(), 1);
        assert_eq!(
            reporter.notices(),
            vec![Notice::TokenOverwritten {
                section: "ZENODO".into(),
                key: "default".into()
            }]
        );
    }

    #[test]
    fn test_unknown_section_named_in_error() {
        let (_dir, store) = store_with("[ZENODO]\n");
        let err = store.list_tokens("UNKNOWN").unwrap_err();
        match &err {
            ZenodoError::Configuration(ConfigError::UnknownSection { section, .. }) => {
                assert_eq!(section, "UNKNOWN")
            }
            e => panic!("Expected UnknownSection, got: {:?}", e),
        }
        assert!(err.to_string().contains("[UNKNOWN]"));
    }

    #[test]
    fn test_unknown_key_and_empty_section() {
        let (_dir, mut store) = store_with("[ZENODO]\n");
        assert!(matches!(
            store.read_token("ZENODO", "missing").unwrap_err(),
            ZenodoError::Configuration(ConfigError::UnknownKey { .. })
        ));
        assert!(matches!(
            store.first_token("ZENODO").unwrap_err(),
            ZenodoError::Configuration(ConfigError::EmptySection { .. })
        ));
        assert!(matches!(
            store.write_token("NOPE", "token", "x", false).unwrap_err(),
            ZenodoError::Configuration(ConfigError::UnknownSection { .. })
        ));
        assert!(matches!(
            store.write_token("ZENODO", " ", "x", false).unwrap_err(),
            ZenodoError::Configuration(ConfigError::MissingKey)
        ));
    }

    #[test]
    fn test_persist_round_trip() {
        let (dir, mut store) = store_with("[ZENODO]\ntoken = a\n[SANDBOX]\n");
        store.write_token("sandbox", "token", "b", false).unwrap();
        store.persist().unwrap();

        let text = fs::read_to_string(dir.path().join("zenodorc")).unwrap();
        assert!(text.contains("[ZENODO]"));
        assert!(text.contains("token = b"));

        let reloaded = CredentialStore::load(dir.path().join("zenodorc")).unwrap();
        assert_eq!(reloaded.list_sections(), vec!["ZENODO", "SANDBOX"]);
        assert_eq!(reloaded.read_token("ZENODO", "token").unwrap(), "a");
        assert_eq!(reloaded.read_token("SANDBOX", "token").unwrap(), "b");
    }

    #[test]
    fn test_persist_keeps_token_characters() {
        let (dir, mut store) = store_with("[ZENODO]\n");
        store
            .write_token("ZENODO", "token", r"a\b/c=d", false)
            .unwrap();
        store.persist().unwrap();

        let reloaded = CredentialStore::load(dir.path().join("zenodorc")).unwrap();
        assert_eq!(reloaded.read_token("ZENODO", "token").unwrap(), r"a\b/c=d");
    }

    #[test]
    fn test_persist_fails_when_file_removed() {
        let (dir, store) = store_with("[ZENODO]\n");
        fs::remove_file(dir.path().join("zenodorc")).unwrap();
        assert!(matches!(
            store.persist().unwrap_err(),
            ZenodoError::Configuration(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn test_debug_hides_tokens() {
        let (_dir, store) = store_with("[ZENODO]\ntoken = secret-value\n");
        let debug = format!("{:?}", store);
        assert!(debug.contains("ZENODO"));
        assert!(!debug.contains("secret-value"));
    }

    #[test]
    fn test_expand_home() {
        let plain = Path::new("/etc/zenodorc");
        assert_eq!(expand_home(plain), plain);
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/.zenodorc")), home.join(".zenodorc"));
        }
    }

    proptest! {
        #[test]
        fn prop_section_lookup_ignores_case(
            section in "[A-Za-z]{1,12}",
            key in "[a-z]{1,8}",
            token in "[A-Za-z0-9]{1,32}",
        ) {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("rc");
            fs::write(&path, format!("[{}]\n", section.to_uppercase())).unwrap();
            let mut store = CredentialStore::load(&path).unwrap();

            store.write_token(&section.to_lowercase(), &key, &token, false).unwrap();
            prop_assert_eq!(store.read_token(&section, &key).unwrap(), token.as_str());
            prop_assert_eq!(store.read_token(&section.to_uppercase(), &key).unwrap(), token.as_str());
        }
    }
}
