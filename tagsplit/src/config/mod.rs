// Tag profile config loader and validator
//
// Loads tagsplit.yaml, validates structure, and computes a deterministic
// contract hash. A profile maps a model family name to the literal tag pair
// that family uses to demarcate reasoning content; resolution falls back to
// an optional default profile, and resolves to nothing (passthrough) when
// neither matches.

use std::collections::HashMap;
use std::path::PathBuf;

use sha2::{Digest, Sha256};

use crate::extract::TagConfig;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// All errors that can occur during config loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config source: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// ConfigSource trait
// ---------------------------------------------------------------------------

/// Abstraction over where config YAML comes from.
///
/// `FileSource` reads from disk; `StringSource` provides content directly
/// (used in tests to avoid file I/O).
pub trait ConfigSource {
    fn load(&self) -> Result<String, ConfigError>;
}

/// Loads config from a file on disk.
pub struct FileSource {
    pub path: PathBuf,
}

impl ConfigSource for FileSource {
    fn load(&self) -> Result<String, ConfigError> {
        Ok(std::fs::read_to_string(&self.path)?)
    }
}

/// Provides config content directly as a string. Used for testing.
pub struct StringSource {
    pub content: String,
}

impl ConfigSource for StringSource {
    fn load(&self) -> Result<String, ConfigError> {
        Ok(self.content.clone())
    }
}

// ---------------------------------------------------------------------------
// Typed config
// ---------------------------------------------------------------------------

/// Top-level parsed and validated tagsplit config.
#[derive(Debug)]
pub struct Config {
    /// Contract version. Always "v1".
    pub version: String,
    /// Tag pairs keyed by profile name (typically a model family).
    pub profiles: HashMap<String, TagConfig>,
    /// Profile used when the requested name is absent. Must name an
    /// existing profile when set.
    pub default_profile: Option<String>,
    /// Environment label (e.g. "internal", "production").
    pub environment: String,
    /// SHA256 hash of the raw YAML bytes: "sha256:{hex}".
    pub contract_hash: String,
}

impl Config {
    /// Resolve the tag pair for a session.
    ///
    /// An exact profile match wins; otherwise the default profile applies;
    /// otherwise extraction is disabled for the session (`None`).
    pub fn tag_config_for(&self, profile: Option<&str>) -> Option<TagConfig> {
        if let Some(tags) = profile.and_then(|name| self.profiles.get(name)) {
            return Some(tags.clone());
        }
        self.default_profile
            .as_deref()
            .and_then(|name| self.profiles.get(name))
            .cloned()
    }
}

// ---------------------------------------------------------------------------
// Raw YAML deserialization types (internal)
// ---------------------------------------------------------------------------
// Separate from the public Config structs: serde_yaml needs Deserialize,
// and validation (version, non-empty tags, default resolution) happens
// between raw and public.

mod raw {
    use serde::Deserialize;
    use std::collections::HashMap;

    #[derive(Debug, Deserialize)]
    pub struct RawConfig {
        pub tagsplit: String,
        pub profiles: HashMap<String, RawProfile>,
        pub default_profile: Option<String>,
        pub environment: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct RawProfile {
        pub open_tag: String,
        pub close_tag: String,
    }
}

// ---------------------------------------------------------------------------
// Config loading and validation
// ---------------------------------------------------------------------------

/// Load and validate a tagsplit config from the given source.
///
/// Steps:
/// 1. Read raw YAML bytes from source
/// 2. Compute SHA256 contract hash
/// 3. Parse YAML into raw deserialization types
/// 4. Validate version, profiles, and the default profile reference
/// 5. Build the typed Config struct
pub fn load_config(source: &dyn ConfigSource) -> Result<Config, ConfigError> {
    let raw_yaml = source.load()?;
    let contract_hash = compute_hash(&raw_yaml);

    let raw: raw::RawConfig = serde_yaml::from_str(&raw_yaml)?;

    // Validate version
    if raw.tagsplit != "v1" {
        return Err(ConfigError::Validation(format!(
            "unsupported contract version \"{}\", expected \"v1\"",
            raw.tagsplit
        )));
    }

    // Validate profiles: must have at least one entry
    if raw.profiles.is_empty() {
        return Err(ConfigError::Validation(
            "\"profiles\" must contain at least one tag profile".to_string(),
        ));
    }

    // Build profiles, rejecting empty tag literals
    let mut profiles = HashMap::with_capacity(raw.profiles.len());
    for (name, raw_profile) in raw.profiles {
        if raw_profile.open_tag.is_empty() {
            return Err(ConfigError::Validation(format!(
                "profile \"{name}\": open_tag must be non-empty"
            )));
        }
        if raw_profile.close_tag.is_empty() {
            return Err(ConfigError::Validation(format!(
                "profile \"{name}\": close_tag must be non-empty"
            )));
        }
        profiles.insert(
            name,
            TagConfig::new(raw_profile.open_tag, raw_profile.close_tag),
        );
    }

    // The default profile must exist when named
    if let Some(ref default) = raw.default_profile {
        if !profiles.contains_key(default) {
            return Err(ConfigError::Validation(format!(
                "default_profile \"{default}\" does not name a defined profile"
            )));
        }
    }

    Ok(Config {
        version: raw.tagsplit,
        profiles,
        default_profile: raw.default_profile,
        environment: raw.environment.unwrap_or_default(),
        contract_hash,
    })
}

fn compute_hash(raw_yaml: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_yaml.as_bytes());
    let hash = hasher.finalize();
    format!("sha256:{:x}", hash)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
