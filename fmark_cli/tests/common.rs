use assert_cmd::Command;
use insta_cmd::get_cargo_bin;

pub const BOOK_DOCUMENT: &str = "---
title: \"Stay out of the sun!\"
tags: [Alexander, Cynic]
author:
  name: Diogenes
---
Book: [%title], tags: [%tags], missing: [%nope]
";

pub fn fmark_cmd() -> Command {
	let mut cmd = Command::new(get_cargo_bin("fmark"));
	cmd.env("NO_COLOR", "1");
	cmd.env_remove("FMARK_LOG");
	cmd
}
