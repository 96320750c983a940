use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum FmarkError {
	#[error(transparent)]
	#[diagnostic(code(fmark::io_error))]
	Io(#[from] std::io::Error),

	#[error("failed to render markdown: {0}")]
	#[diagnostic(code(fmark::markdown))]
	Markdown(String),

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(fmark::config_parse),
		help("check that fmark.toml is valid TOML and that `syntax` is either \"bracket\" or \"brace\"")
	)]
	ConfigParse(String),

	#[error("invalid frontmatter in `{path}`: {reason}")]
	#[diagnostic(
		code(fmark::frontmatter),
		help("frontmatter must be a YAML mapping between two `---` lines at the top of the file")
	)]
	Frontmatter { path: String, reason: String },

	#[error("frontmatter block in `{0}` is never closed")]
	#[diagnostic(
		code(fmark::unterminated_frontmatter),
		help("add a closing `---` line after the last metadata entry")
	)]
	UnterminatedFrontmatter(String),

	#[error("unknown marker syntax: `{0}`")]
	#[diagnostic(
		code(fmark::unknown_syntax),
		help("supported syntax styles: bracket (`[%key]`), brace (`{{{{key}}}}`)")
	)]
	UnknownSyntax(String),

	#[error("invalid file pattern `{pattern}`: {reason}")]
	#[diagnostic(code(fmark::invalid_glob))]
	InvalidGlob { pattern: String, reason: String },

	#[error("failed to migrate `{path}`: {reason}")]
	#[diagnostic(code(fmark::migration))]
	Migration { path: String, reason: String },

	#[error("source and target syntax are both `{0}`")]
	#[diagnostic(
		code(fmark::same_syntax),
		help("pass a different `--to` style; nothing would change")
	)]
	SameSyntax(String),
}

pub type FmarkResult<T> = Result<T, FmarkError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
