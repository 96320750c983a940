use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use fmark_core::SyntaxStyle;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Show frontmatter values in place of markers in markdown documents.",
	long_about = "fmark displays the values of a document's YAML frontmatter wherever the body \
	              contains a marker such as `[%title]` or `{{title}}`. The stored document is \
	              never changed by rendering.\n\nQuick start:\n  fmark render note.md    Print \
	              the document with values substituted\n  fmark keys note.md      List the \
	              keys a marker can reference\n  fmark migrate docs --to brace --yes  Rewrite \
	              markers to another syntax"
)]
#[allow(clippy::struct_excessive_bools)]
pub struct FmarkCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Directory searched for `fmark.toml`. Defaults to the current directory.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Marker syntax, overriding the config file.
	#[arg(long, value_enum, global = true)]
	pub syntax: Option<SyntaxArg>,

	/// Fall back to case-insensitive key matching.
	#[arg(long, global = true, default_value_t = false)]
	pub case_insensitive: bool,

	/// Resolve built-in keys such as `filename`, `folder` and `mtime`.
	#[arg(long, global = true, default_value_t = false)]
	pub builtins: bool,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Print a document with every resolvable marker replaced by its value.
	///
	/// Markers inside the frontmatter block, fenced code and inline code are
	/// printed as written, as are markers whose key has no value.
	Render {
		/// The markdown document to render.
		file: PathBuf,

		/// Render the document to HTML and substitute values into its text
		/// content instead of printing the source.
		#[arg(long, default_value_t = false)]
		reading: bool,

		/// Byte offset of a caret. A marker containing the caret is printed
		/// raw, the way an editor shows the marker being edited.
		#[arg(long)]
		caret: Option<usize>,
	},
	/// List the key paths a marker in a document can reference.
	///
	/// Prints every key path of the frontmatter mapping with its display
	/// value, followed by the built-in keys when `--builtins` is set.
	Keys {
		/// The markdown document to inspect.
		file: PathBuf,

		/// Only list keys that complete this partial key.
		#[arg(long)]
		prefix: Option<String>,

		/// Output format for the key listing.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
	/// Rewrite markers from the configured syntax to another one.
	///
	/// Directories are searched for files matching `--glob`. Without `--yes`
	/// the changes are shown as a diff and nothing is written.
	Migrate {
		/// Files or directories to migrate.
		#[arg(required = true)]
		paths: Vec<PathBuf>,

		/// The syntax to rewrite markers to.
		#[arg(long, value_enum)]
		to: SyntaxArg,

		/// Pattern selecting files inside directories.
		#[arg(long, default_value = fmark_core::DEFAULT_MARKDOWN_GLOB)]
		glob: String,

		/// Write the migrated files.
		#[arg(long, short, default_value_t = false)]
		yes: bool,
	},
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SyntaxArg {
	/// `[%key]`
	Bracket,
	/// `{{key}}`
	Brace,
}

impl From<SyntaxArg> for SyntaxStyle {
	fn from(value: SyntaxArg) -> Self {
		match value {
			SyntaxArg::Bracket => SyntaxStyle::Bracket,
			SyntaxArg::Brace => SyntaxStyle::Brace,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text output.
	Text,
	/// JSON output for programmatic consumption.
	Json,
}
