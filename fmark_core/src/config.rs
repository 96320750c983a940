use std::collections::hash_map::DefaultHasher;
use std::fmt::Display;
use std::hash::Hash;
use std::hash::Hasher;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::FmarkError;
use crate::FmarkResult;
use crate::SyntaxStyle;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] = ["fmark.toml", ".fmark.toml", ".config/fmark.toml"];

/// Configuration loaded from an `fmark.toml` file.
///
/// ```toml
/// syntax = "brace"
/// case_insensitive = true
/// builtin_keys = true
///
/// [style]
/// bold = true
/// underline = true
/// underline_color = "#7c3aed"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FmarkConfig {
	/// Marker syntax recognized in document bodies.
	#[serde(default)]
	pub syntax: SyntaxStyle,
	/// Fall back to case-folded key matching when an exact key is missing.
	#[serde(default)]
	pub case_insensitive: bool,
	/// Resolve built-in document attributes (`filename`, `mtime`, ...) when
	/// the metadata mapping has no matching key.
	#[serde(default)]
	pub builtin_keys: bool,
	/// Visual treatment of substituted values, forwarded to the renderer.
	#[serde(default)]
	pub style: StyleSettings,
}

/// Visual style flags. The engine never interprets these; it only forwards
/// their [`StyleFingerprint`] with every decoration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct StyleSettings {
	#[serde(default)]
	pub bold: bool,
	#[serde(default)]
	pub italic: bool,
	#[serde(default)]
	pub underline: bool,
	#[serde(default)]
	pub underline_color: Option<String>,
	#[serde(default)]
	pub highlight: bool,
	#[serde(default)]
	pub highlight_color: Option<String>,
	#[serde(default)]
	pub hover_emphasis: bool,
}

/// Opaque digest of [`StyleSettings`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StyleFingerprint(pub u64);

impl Display for StyleFingerprint {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{:016x}", self.0)
	}
}

impl StyleSettings {
	pub fn fingerprint(&self) -> StyleFingerprint {
		let mut hasher = DefaultHasher::new();
		self.hash(&mut hasher);
		StyleFingerprint(hasher.finish())
	}
}

impl FmarkConfig {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if no config file exists.
	pub fn load(root: &Path) -> FmarkResult<Option<FmarkConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		let config = Self::parse(&content)?;

		Ok(Some(config))
	}

	pub fn parse(content: &str) -> FmarkResult<FmarkConfig> {
		toml::from_str(content).map_err(|e| FmarkError::ConfigParse(e.to_string()))
	}

	/// Whether switching from `self` to `other` changes how markers are found
	/// or displayed, which requires a full rescan.
	pub fn requires_rescan(&self, other: &FmarkConfig) -> bool {
		self.syntax != other.syntax
			|| self.case_insensitive != other.case_insensitive
			|| self.builtin_keys != other.builtin_keys
			|| self.style.fingerprint() != other.style.fingerprint()
	}
}
