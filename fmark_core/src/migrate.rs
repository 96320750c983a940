use std::collections::BTreeSet;
use std::path::Path;
use std::path::PathBuf;

use globset::Glob;
use ignore::WalkBuilder;
use tracing::warn;

use crate::FmarkError;
use crate::FmarkResult;
use crate::SyntaxStyle;
use crate::frontmatter::metadata_block_lines;
use crate::scanner::FenceState;
use crate::scanner::inline_code_ranges;
use crate::scanner::scan_line;

/// Files picked up when a directory is passed to [`collect_markdown_files`]
/// without an explicit pattern.
pub const DEFAULT_MARKDOWN_GLOB: &str = "*.md";

/// Result of rewriting one text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
	pub text: String,
	/// Markers rewritten to the target syntax.
	pub replaced: usize,
	/// Markers whose key cannot be written in the target syntax.
	pub skipped: usize,
}

/// Rewrite every eligible marker from one syntax to the other. Markers in
/// the metadata block, in fenced code and in inline code are left alone.
pub fn migrate_text(text: &str, from: SyntaxStyle, to: SyntaxStyle) -> Migration {
	let lines: Vec<&str> = text.split('\n').collect();
	let metadata = metadata_block_lines(|line| lines.get(line).copied());
	let mut fence = FenceState::default();
	let mut migrated = String::with_capacity(text.len());
	let mut replaced = 0;
	let mut skipped = 0;

	for (index, line) in lines.iter().enumerate() {
		if index > 0 {
			migrated.push('\n');
		}

		let in_metadata = metadata.as_ref().is_some_and(|block| block.contains(&index));
		if from == to || in_metadata || fence.advance(line).is_excluded() {
			migrated.push_str(line);
			continue;
		}

		let markers = scan_line(from, line);
		if markers.is_empty() {
			migrated.push_str(line);
			continue;
		}

		let code = inline_code_ranges(line);
		let mut last = 0;
		for marker in &markers {
			if code.iter().any(|range| marker.overlaps(range)) {
				continue;
			}
			if !to.allows_key(&marker.key) {
				skipped += 1;
				continue;
			}
			migrated.push_str(&line[last..marker.start]);
			migrated.push_str(&to.marker(&marker.key));
			last = marker.end;
			replaced += 1;
		}
		migrated.push_str(&line[last..]);
	}

	Migration {
		text: migrated,
		replaced,
		skipped,
	}
}

/// A file with at least one rewritten marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMigration {
	pub path: PathBuf,
	pub original: String,
	pub migrated: String,
	pub replaced: usize,
	pub skipped: usize,
}

/// A file left as it was because none of its markers fit the target syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
	pub path: PathBuf,
	pub skipped: usize,
}

#[derive(Debug, Default)]
pub struct MigrationSummary {
	pub changed: Vec<FileMigration>,
	/// Files with markers, none of which could be rewritten.
	pub skipped_files: Vec<SkippedFile>,
	pub unchanged: usize,
	/// Files that could not be read or written. Other files are still
	/// processed.
	pub failed: Vec<FmarkError>,
	pub written: bool,
}

impl MigrationSummary {
	pub fn replaced(&self) -> usize {
		self.changed.iter().map(|file| file.replaced).sum()
	}

	/// Markers left alone across every file, rewritten or not.
	pub fn skipped(&self) -> usize {
		self.changed.iter().map(|file| file.skipped).sum::<usize>()
			+ self.skipped_files.iter().map(|file| file.skipped).sum::<usize>()
	}

	pub fn is_ok(&self) -> bool {
		self.failed.is_empty()
	}
}

/// Migrate a set of files. Nothing is written unless `write` is set.
pub fn migrate_files(
	paths: &[PathBuf],
	from: SyntaxStyle,
	to: SyntaxStyle,
	write: bool,
) -> FmarkResult<MigrationSummary> {
	if from == to {
		return Err(FmarkError::SameSyntax(from.to_string()));
	}

	let mut summary = MigrationSummary {
		written: write,
		..MigrationSummary::default()
	};

	for path in paths {
		let original = match std::fs::read_to_string(path) {
			Ok(content) => content,
			Err(error) => {
				warn!(path = %path.display(), %error, "failed to read file for migration");
				summary.failed.push(migration_error(path, &error));
				continue;
			}
		};

		let migration = migrate_text(&original, from, to);
		if migration.replaced == 0 {
			if migration.skipped > 0 {
				summary.skipped_files.push(SkippedFile {
					path: path.clone(),
					skipped: migration.skipped,
				});
			} else {
				summary.unchanged += 1;
			}
			continue;
		}

		if write {
			if let Err(error) = std::fs::write(path, &migration.text) {
				warn!(path = %path.display(), %error, "failed to write migrated file");
				summary.failed.push(migration_error(path, &error));
				continue;
			}
		}

		summary.changed.push(FileMigration {
			path: path.clone(),
			original,
			migrated: migration.text,
			replaced: migration.replaced,
			skipped: migration.skipped,
		});
	}

	Ok(summary)
}

fn migration_error(path: &Path, error: &std::io::Error) -> FmarkError {
	FmarkError::Migration {
		path: path.display().to_string(),
		reason: error.to_string(),
	}
}

/// Expand directories into the files below them matching `pattern`.
/// Explicit file paths are kept as given. Ignore files are honored.
pub fn collect_markdown_files(paths: &[PathBuf], pattern: &str) -> FmarkResult<Vec<PathBuf>> {
	let matcher = Glob::new(pattern)
		.map_err(|e| {
			FmarkError::InvalidGlob {
				pattern: pattern.to_string(),
				reason: e.to_string(),
			}
		})?
		.compile_matcher();

	let mut files = BTreeSet::new();
	for path in paths {
		if !path.is_dir() {
			files.insert(path.clone());
			continue;
		}

		for entry in WalkBuilder::new(path).build() {
			let entry = match entry {
				Ok(entry) => entry,
				Err(error) => {
					warn!(%error, "skipping unreadable entry");
					continue;
				}
			};
			let is_file = entry.file_type().is_some_and(|kind| kind.is_file());
			if is_file && matcher.is_match(entry.path()) {
				files.insert(entry.into_path());
			}
		}
	}

	Ok(files.into_iter().collect())
}
