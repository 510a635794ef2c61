// ABOUTME: Integration tests for the clipmeta CLI binary.
// ABOUTME: Covers the support listing and the JSON error envelope; none of these touch the network.

use assert_cmd::assert::OutputAssertExt;
use assert_cmd::cargo::CommandCargoExt;
use predicates::prelude::*;
use std::process::Command;

fn clipmeta_cmd() -> Command {
    Command::cargo_bin("clipmeta").unwrap()
}

#[test]
fn support_lists_every_platform() {
    clipmeta_cmd()
        .arg("support")
        .arg("--compact")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""success":true"#))
        .stdout(predicate::str::contains(r#""platform":"tiktok""#))
        .stdout(predicate::str::contains(r#""ranking":"watermark-first""#));
}

#[test]
fn support_narrowed_to_url() {
    clipmeta_cmd()
        .args(["support", "https://www.instagram.com/p/Cabc123/", "--compact"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""platform":"instagram""#))
        .stdout(predicate::str::contains("youtube").not());
}

#[test]
fn unsupported_url_is_400_envelope() {
    clipmeta_cmd()
        .args(["extract", "https://vimeo.com/12345", "--compact"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains(r#""success":false"#))
        .stdout(predicate::str::contains(r#""code":400"#))
        .stdout(predicate::str::contains("supported platforms: youtube, tiktok, instagram, facebook"));
}

#[test]
fn malformed_url_is_validation_envelope() {
    clipmeta_cmd()
        .args(["formats", "not a url", "--compact"])
        .assert()
        .failure()
        .stdout(predicate::str::contains(r#""code":400"#))
        .stdout(predicate::str::contains("malformed URL"));
}

#[test]
fn unknown_media_type_is_rejected_by_argument_parsing() {
    clipmeta_cmd()
        .args(["extract", "https://youtu.be/dQw4w9WgXcQ", "--type", "image"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("image"));
}
