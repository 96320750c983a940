mod common;

use fmark_core::AnyEmptyResult;

const NOTE: &str = "---\ntitle: Hello\n---\n[%title] and `[%title]`\n";

#[test]
fn migrate_previews_without_writing() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let file = tmp.path().join("note.md");
	std::fs::write(&file, NOTE)?;

	common::fmark_cmd()
		.arg("migrate")
		.arg(tmp.path())
		.arg("--to")
		.arg("brace")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("would migrate"))
		.stdout(predicates::str::contains("-[%title] and `[%title]`"))
		.stdout(predicates::str::contains("+{{title}} and `[%title]`"))
		.stdout(predicates::str::contains("Run with --yes"));

	assert_eq!(std::fs::read_to_string(&file)?, NOTE);

	Ok(())
}

#[test]
fn migrate_writes_with_yes() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let file = tmp.path().join("note.md");
	let other = tmp.path().join("notes.txt");
	std::fs::write(&file, NOTE)?;
	std::fs::write(&other, "[%title]\n")?;

	common::fmark_cmd()
		.arg("migrate")
		.arg(tmp.path())
		.arg("--to")
		.arg("brace")
		.arg("--yes")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("Migrated 1 marker(s) in 1 file(s)."));

	assert_eq!(
		std::fs::read_to_string(&file)?,
		"---\ntitle: Hello\n---\n{{title}} and `[%title]`\n"
	);
	assert_eq!(std::fs::read_to_string(&other)?, "[%title]\n");

	Ok(())
}

#[test]
fn migrate_back_from_brace_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let file = tmp.path().join("note.md");
	std::fs::write(&file, "{{title}} {{50%}}\n")?;
	std::fs::write(tmp.path().join("fmark.toml"), "syntax = \"brace\"\n")?;

	common::fmark_cmd()
		.arg("migrate")
		.arg(&file)
		.arg("--to")
		.arg("bracket")
		.arg("--yes")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("skipped 1 marker(s)"));

	assert_eq!(std::fs::read_to_string(&file)?, "[%title] {{50%}}\n");

	Ok(())
}

#[test]
fn migrate_rejects_same_syntax() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("note.md"), NOTE)?;

	common::fmark_cmd()
		.arg("migrate")
		.arg(tmp.path())
		.arg("--to")
		.arg("bracket")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("fmark::same_syntax"));

	Ok(())
}

#[test]
fn migrate_reports_missing_files() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::fmark_cmd()
		.arg("migrate")
		.arg(tmp.path().join("missing.md"))
		.arg("--to")
		.arg("brace")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(1)
		.stderr(predicates::str::contains("failed to migrate"));

	Ok(())
}

#[test]
fn migrate_reports_files_with_only_skipped_markers() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let file = tmp.path().join("percent.md");
	std::fs::write(&file, "{{50%}}\n")?;
	std::fs::write(tmp.path().join("fmark.toml"), "syntax = \"brace\"\n")?;

	common::fmark_cmd()
		.arg("migrate")
		.arg(&file)
		.arg("--to")
		.arg("bracket")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("percent.md (1 marker(s) with keys the bracket syntax cannot hold)"))
		.stdout(predicates::str::contains("Nothing to migrate."));

	assert_eq!(std::fs::read_to_string(&file)?, "{{50%}}\n");

	Ok(())
}
