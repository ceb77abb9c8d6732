//! Policy configuration: which protections are active.

use crate::{Error, Result};
use host::Direction;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::Path;

/// File name the flag file is looked up under.
pub const DEFAULT_POLICY_FILE: &str = "InvLocker.toml";

/// Older `KEY=value` flag file, read when no TOML file exists beside it.
pub const LEGACY_POLICY_FILE: &str = "InvLocker.ini";

/// Contents written when no flag file exists yet.
pub const DEFAULT_POLICY: &str = r#"# InvLocker protections. Missing keys keep the values shown here.

# Log every intercepted call and its decision.
debugging = false

# Keep equipped items in the player inventory.
lock_equipped = true

# Keep favorited items in the player inventory.
lock_favorites = true

# Refuse to scrap equipped and/or favorited items.
lock_scrap = true

# Also protect items moving out of containers (looting, buying).
lock_bidirectional = true

# Apply the protections to "take all".
lock_take_all = true
"#;

/// Policy configuration loaded from TOML.
///
/// Built once before any hook is installed and only read afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    /// Emit per-call diagnostics.
    #[serde(alias = "DEBUGGING")]
    pub debugging: bool,

    /// Block transfers of equipped stacks.
    #[serde(alias = "LOCK_EQUIPPED")]
    pub lock_equipped: bool,

    /// Block transfers of favorited stacks.
    #[serde(alias = "LOCK_FAVORITES")]
    pub lock_favorites: bool,

    /// Apply the item locks to scrapping.
    #[serde(alias = "LOCK_SCRAP")]
    pub lock_scrap: bool,

    /// Apply the item locks to from-container transfers too.
    #[serde(alias = "LOCK_BIDIRECTIONAL")]
    pub lock_bidirectional: bool,

    /// Apply the item locks to "take all".
    #[serde(alias = "LOCK_TAKEALL", alias = "LOCK_TAKE_ALL")]
    pub lock_take_all: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            debugging: false,
            lock_equipped: true,
            lock_favorites: true,
            lock_scrap: true,
            lock_bidirectional: true,
            lock_take_all: true,
        }
    }
}

/// Where a loaded policy came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicySource {
    /// Read from an existing file.
    Loaded,
    /// The file was missing and has just been written with defaults.
    Created,
    /// The file was missing and [`LEGACY_POLICY_FILE`] beside it was read.
    Legacy,
}

impl Policy {
    /// Load policy from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse policy from TOML, falling back to the legacy `KEY=value`
    /// layout when the text is not valid TOML.
    pub fn parse(toml: &str) -> Result<Self> {
        toml::from_str(toml).or_else(|e| {
            Self::parse_legacy(toml).ok_or_else(|| Error::Parse(e.to_string()))
        })
    }

    /// Parse the `KEY=value` layout of [`LEGACY_POLICY_FILE`].
    ///
    /// Keys are case-insensitive, `;` and `#` start comment lines, section
    /// headers and unknown keys are ignored, and a later line overrides an
    /// earlier one. A value of `false` or `0` turns a flag off; any other
    /// bare word turns it on. Returns `None` if a line is not of this form.
    pub fn parse_legacy(ini: &str) -> Option<Self> {
        let mut policy = Self::default();
        for line in ini.lines().map(str::trim) {
            if line.is_empty() || line.starts_with([';', '#']) {
                continue;
            }
            if line.starts_with('[') && line.ends_with(']') {
                continue;
            }
            let (key, value) = line.split_once('=')?;
            let value = value.trim();
            if value.is_empty() || !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return None;
            }
            let enabled = !(value.eq_ignore_ascii_case("false") || value == "0");

            let key = key.trim().to_ascii_lowercase();
            let flag = match key.as_str() {
                "debugging" => &mut policy.debugging,
                "lock_equipped" => &mut policy.lock_equipped,
                "lock_favorites" => &mut policy.lock_favorites,
                "lock_scrap" => &mut policy.lock_scrap,
                "lock_bidirectional" => &mut policy.lock_bidirectional,
                "lock_takeall" | "lock_take_all" => &mut policy.lock_take_all,
                _ => {
                    tracing::debug!(key = %key, "ignoring unknown flag");
                    continue;
                }
            };
            *flag = enabled;
        }
        Some(policy)
    }

    /// Load the flag file. If it does not exist, read [`LEGACY_POLICY_FILE`]
    /// from the same directory, or else write the commented defaults first.
    pub fn load_or_create(path: impl AsRef<Path>) -> Result<(Self, PolicySource)> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => Ok((Self::parse(&content)?, PolicySource::Loaded)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let legacy = path.with_file_name(LEGACY_POLICY_FILE);
                if legacy != path && legacy.is_file() {
                    return Ok((Self::load(&legacy)?, PolicySource::Legacy));
                }
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(path, DEFAULT_POLICY)?;
                Ok((Self::load(path)?, PolicySource::Created))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| Error::Serialize(e.to_string()))
    }

    /// At least one of the item locks is on.
    pub fn item_locks_enabled(&self) -> bool {
        self.lock_equipped || self.lock_favorites
    }

    /// Whether a transfer in `direction` is subject to the item locks.
    ///
    /// Outgoing-from-player transfers are always covered; from-container
    /// transfers only with `lock_bidirectional`.
    pub fn gates_transfer(&self, direction: Direction) -> bool {
        self.item_locks_enabled() && (!direction.is_from_container() || self.lock_bidirectional)
    }

    pub fn gates_scrap(&self) -> bool {
        self.lock_scrap && self.item_locks_enabled()
    }

    pub fn gates_take_all(&self) -> bool {
        self.lock_take_all && self.gates_transfer(Direction::FromContainer)
    }
}

impl std::fmt::Display for Policy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "debugging          = {}", self.debugging)?;
        writeln!(f, "lock_equipped      = {}", self.lock_equipped)?;
        writeln!(f, "lock_favorites     = {}", self.lock_favorites)?;
        writeln!(f, "lock_scrap         = {}", self.lock_scrap)?;
        writeln!(f, "lock_bidirectional = {}", self.lock_bidirectional)?;
        write!(f, "lock_take_all      = {}", self.lock_take_all)
    }
}
