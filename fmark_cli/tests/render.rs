mod common;

use clap::Parser;
use fmark_cli::Commands;
use fmark_cli::FmarkCli;
use fmark_cli::SyntaxArg;
use fmark_core::AnyEmptyResult;
use predicates::prelude::PredicateBooleanExt;

#[test]
fn parse_render_arguments() -> AnyEmptyResult {
	let cli = FmarkCli::try_parse_from(["fmark", "render", "note.md", "--caret", "4", "--syntax", "brace"])?;

	assert_eq!(cli.syntax, Some(SyntaxArg::Brace));
	let Some(Commands::Render { file, reading, caret }) = cli.command else {
		panic!("expected the render command");
	};
	assert_eq!(file.to_string_lossy(), "note.md");
	assert!(!reading);
	assert_eq!(caret, Some(4));

	Ok(())
}

#[test]
fn render_substitutes_frontmatter_values() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let file = tmp.path().join("book.md");
	std::fs::write(&file, common::BOOK_DOCUMENT)?;

	common::fmark_cmd()
		.arg("render")
		.arg(&file)
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains(
			"Book: Stay out of the sun!, tags: Alexander, Cynic, missing: [%nope]",
		))
		.stdout(predicates::str::contains("title: \"Stay out of the sun!\""));

	Ok(())
}

#[test]
fn render_leaves_marker_under_caret_raw() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let file = tmp.path().join("book.md");
	std::fs::write(&file, common::BOOK_DOCUMENT)?;
	let caret = common::BOOK_DOCUMENT.find("[%title]").unwrap_or_default() + 3;

	common::fmark_cmd()
		.arg("render")
		.arg(&file)
		.arg("--caret")
		.arg(caret.to_string())
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("Book: [%title], tags: Alexander, Cynic"));

	Ok(())
}

#[test]
fn render_uses_syntax_from_config_file() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let file = tmp.path().join("note.md");
	std::fs::write(&file, "---\ntitle: Hello\n---\n[%title] {{title}}\n")?;
	std::fs::write(tmp.path().join("fmark.toml"), "syntax = \"brace\"\n")?;

	common::fmark_cmd()
		.arg("render")
		.arg(&file)
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("[%title] Hello"));

	common::fmark_cmd()
		.arg("render")
		.arg(&file)
		.arg("--path")
		.arg(tmp.path())
		.arg("--syntax")
		.arg("bracket")
		.assert()
		.success()
		.stdout(predicates::str::contains("Hello {{title}}"));

	Ok(())
}

#[test]
fn render_builtins_and_case_insensitive_flags() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let file = tmp.path().join("journal.md");
	std::fs::write(&file, "---\nTitle: Hello\n---\n[%title] in [%basename]\n")?;

	common::fmark_cmd()
		.arg("render")
		.arg(&file)
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("[%title] in [%basename]"));

	common::fmark_cmd()
		.arg("render")
		.arg(&file)
		.arg("--path")
		.arg(tmp.path())
		.arg("--case-insensitive")
		.arg("--builtins")
		.assert()
		.success()
		.stdout(predicates::str::contains("Hello in journal"));

	Ok(())
}

#[test]
fn render_reading_view_outputs_html() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let file = tmp.path().join("book.md");
	std::fs::write(&file, common::BOOK_DOCUMENT)?;

	common::fmark_cmd()
		.arg("render")
		.arg(&file)
		.arg("--reading")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains(
			"<span class=\"fmark-value\" data-fmark-key=\"title\">Stay out of the sun!</span>",
		))
		.stdout(predicates::str::contains("[%nope]"))
		.stdout(predicates::str::contains("Diogenes").not());

	Ok(())
}

#[test]
fn render_reports_unterminated_frontmatter() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let file = tmp.path().join("broken.md");
	std::fs::write(&file, "---\ntitle: Hello\n[%title]\n")?;

	common::fmark_cmd()
		.arg("render")
		.arg(&file)
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("fmark::unterminated_frontmatter"));

	Ok(())
}

#[test]
fn render_reports_invalid_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let file = tmp.path().join("note.md");
	std::fs::write(&file, "[%title]\n")?;
	std::fs::write(tmp.path().join("fmark.toml"), "syntax = \"angle\"\n")?;

	common::fmark_cmd()
		.arg("render")
		.arg(&file)
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("fmark::config_parse"));

	Ok(())
}

#[test]
fn missing_subcommand_fails() {
	common::fmark_cmd()
		.assert()
		.code(1)
		.stderr(predicates::str::contains("No subcommand specified"));
}
