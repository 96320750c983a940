use std::path::Path;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use fmark_cli::Commands;
use fmark_cli::FmarkCli;
use fmark_cli::OutputFormat;
use fmark_cli::SyntaxArg;
use fmark_core::AnyEmptyResult;
use fmark_core::FmarkConfig;
use fmark_core::FmarkResult;
use fmark_core::MarkerView;
use fmark_core::MemoryHost;
use fmark_core::MemoryMetadataStore;
use fmark_core::ReadingView;
use fmark_core::Resolver;
use fmark_core::ScanScope;
use fmark_core::SyntaxStyle;
use fmark_core::collect_markdown_files;
use fmark_core::load_document;
use fmark_core::migrate_files;
use fmark_core::suggestions;
use owo_colors::OwoColorize;
use serde_json::Value;
use similar::ChangeTag;
use similar::TextDiff;
use tracing::debug;
use tracing_subscriber::EnvFilter;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

/// Environment variable holding a tracing filter directive.
const LOG_ENV: &str = "FMARK_LOG";

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

fn main() {
	let args = FmarkCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	init_tracing(args.verbose, use_color);

	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	let result = match &args.command {
		Some(Commands::Render {
			file,
			reading,
			caret,
		}) => run_render(&args, file, *reading, *caret),
		Some(Commands::Keys {
			file,
			prefix,
			format,
		}) => run_keys(&args, file, prefix.as_deref(), *format),
		Some(Commands::Migrate {
			paths,
			to,
			glob,
			yes,
		}) => run_migrate(&args, paths, *to, glob, *yes),
		None => {
			eprintln!("No subcommand specified. Run `fmark --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		match e.downcast::<fmark_core::FmarkError>() {
			Ok(fmark_err) => {
				let report: miette::Report = (*fmark_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

/// Log to stderr. `FMARK_LOG` takes precedence over `--verbose`.
fn init_tracing(verbose: bool, use_color: bool) {
	let default_level = if verbose { "debug" } else { "warn" };
	let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.without_time()
		.try_init()
		.ok();
}

fn resolve_root(args: &FmarkCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// Load `fmark.toml` from the root and apply command line overrides.
fn resolve_config(args: &FmarkCli) -> FmarkResult<FmarkConfig> {
	let root = resolve_root(args);
	let mut config = FmarkConfig::load(&root)?.unwrap_or_default();

	if let Some(syntax) = args.syntax {
		config.syntax = syntax.into();
	}
	if args.case_insensitive {
		config.case_insensitive = true;
	}
	if args.builtins {
		config.builtin_keys = true;
	}

	debug!(root = %root.display(), syntax = %config.syntax, "resolved configuration");
	Ok(config)
}

fn run_render(
	args: &FmarkCli,
	file: &Path,
	reading: bool,
	caret: Option<usize>,
) -> AnyEmptyResult {
	let config = resolve_config(args)?;
	let document = load_document(file)?;

	if reading {
		let info = config.builtin_keys.then_some(&document.info);
		let mut resolver = Resolver::new(
			document.mapping.as_ref(),
			config.case_insensitive,
			info,
			config.builtin_keys,
		);
		let view = ReadingView::render(&document.text, config.syntax, &mut resolver)?;
		println!("{}", view.to_html());
		return Ok(());
	}

	let mut store = MemoryMetadataStore::new();
	document.register(&mut store);

	let mut host = MemoryHost::new(Some(document.id.clone()), document.text.clone());
	if let Some(caret) = caret {
		host.set_caret(caret);
	}

	let mut view = MarkerView::new(config);
	let decorations = view.evaluate(&host, &store, ScanScope::Full);
	debug!(decorations = decorations.len(), "evaluated document");
	print!("{}", decorations.apply(&document.text));

	Ok(())
}

fn run_keys(
	args: &FmarkCli,
	file: &Path,
	prefix: Option<&str>,
	format: OutputFormat,
) -> AnyEmptyResult {
	let config = resolve_config(args)?;
	let document = load_document(file)?;
	let info = config.builtin_keys.then_some(&document.info);
	let mut resolver = Resolver::new(
		document.mapping.as_ref(),
		config.case_insensitive,
		info,
		config.builtin_keys,
	);

	let keys = suggestions(
		document.mapping.as_ref(),
		prefix.unwrap_or_default(),
		config.case_insensitive,
		config.builtin_keys,
	);
	let entries: Vec<(String, Option<String>)> = keys
		.into_iter()
		.map(|key| {
			let value = resolver.resolve(&key);
			(key, value)
		})
		.collect();

	match format {
		OutputFormat::Json => {
			let map: serde_json::Map<String, Value> = entries
				.into_iter()
				.map(|(key, value)| (key, value.map_or(Value::Null, Value::String)))
				.collect();
			println!("{}", serde_json::to_string_pretty(&Value::Object(map))?);
		}
		OutputFormat::Text => {
			if entries.is_empty() {
				println!("No keys found.");
				return Ok(());
			}
			for (key, value) in &entries {
				let marker = config.syntax.marker(key);
				match value {
					Some(value) => println!("{marker:<28} {value}"),
					None => println!("{marker:<28} {}", colored!("(no value)", yellow)),
				}
			}
		}
	}

	Ok(())
}

fn run_migrate(
	args: &FmarkCli,
	paths: &[PathBuf],
	to: SyntaxArg,
	glob: &str,
	yes: bool,
) -> AnyEmptyResult {
	let config = resolve_config(args)?;
	let from = config.syntax;
	let to = SyntaxStyle::from(to);

	let files = collect_markdown_files(paths, glob)?;
	debug!(files = files.len(), %from, %to, "migrating");
	let summary = migrate_files(&files, from, to, yes)?;
	let verb = if yes { "migrated" } else { "would migrate" };

	for file in &summary.changed {
		println!(
			"{} {} ({} marker(s))",
			colored!(verb, green),
			file.path.display(),
			file.replaced
		);
		if !yes {
			print_diff(&file.original, &file.migrated);
		}
		if file.skipped > 0 {
			println!(
				"  {} {} marker(s) with keys the {to} syntax cannot hold",
				colored!("skipped", yellow),
				file.skipped
			);
		}
	}

	for file in &summary.skipped_files {
		println!(
			"{} {} ({} marker(s) with keys the {to} syntax cannot hold)",
			colored!("skipped", yellow),
			file.path.display(),
			file.skipped
		);
	}

	for error in &summary.failed {
		eprintln!("{} {error}", colored!("error:", red));
	}

	println!();
	if summary.changed.is_empty() {
		println!("Nothing to migrate.");
	} else if yes {
		println!(
			"Migrated {} marker(s) in {} file(s).",
			summary.replaced(),
			summary.changed.len()
		);
	} else {
		println!(
			"Would migrate {} marker(s) in {} file(s). Run with --yes to write the changes.",
			summary.replaced(),
			summary.changed.len()
		);
	}

	if !summary.is_ok() {
		process::exit(1);
	}

	Ok(())
}

fn print_diff(original: &str, migrated: &str) {
	let diff = TextDiff::from_lines(original, migrated);
	for change in diff.iter_all_changes() {
		match change.tag() {
			ChangeTag::Delete => print!("  {}", colored!(format!("-{change}"), red)),
			ChangeTag::Insert => print!("  {}", colored!(format!("+{change}"), green)),
			ChangeTag::Equal => {}
		}
	}
}
