use std::fs;
use std::process::Command;

use anyhow::Result;
use assert_cmd::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

macro_rules! cargo_run {
    ($($args:expr),*) => {
        {
            let mut cmd = Command::cargo_bin("colorindex")?;
            cmd.env_remove("COLORINDEX_STORE");
            cmd.args(["--store", "memory://"]);
            $(cmd.arg($args);)*
            cmd.assert()
        }
    };
}

#[test]
fn stats_on_empty_store() -> Result<()> {
    cargo_run!("stats")
        .success()
        .stdout(predicate::str::contains("color: 0"))
        .stdout(predicate::str::contains("total: 0"));
    Ok(())
}

#[test]
fn lookup_rejects_invalid_color() -> Result<()> {
    cargo_run!("lookup", "zzz").failure();
    cargo_run!("lookup", "#ff0000").success().stdout(predicate::str::is_empty());
    Ok(())
}

#[test]
fn build_rejects_bad_threads() -> Result<()> {
    cargo_run!("build", "--threads", "0").failure();
    cargo_run!("build", "--threads", "257").failure();
    Ok(())
}

#[test]
fn build_without_colored_media() -> Result<()> {
    let conf_dir = TempDir::new()?;
    fs::write(conf_dir.path().join("library.json"), r#"[{"media":[{"uri":"plain.webp"}]}]"#)?;
    cargo_run!("-c", conf_dir.path(), "build", "--threads", "2").failure();
    Ok(())
}

#[test]
fn ingest_writes_colors_back() -> Result<()> {
    let conf_dir = TempDir::new()?;
    image::RgbaImage::from_pixel(4, 4, image::Rgba([255, 0, 0, 255])).save(conf_dir.path().join("red.png"))?;
    fs::write(
        conf_dir.path().join("library.json"),
        r#"[{"media":[{"uri":"red.png","title":"sunset"}]},{"media":[{"uri":"clip.mp4"}]}]"#,
    )?;

    cargo_run!("-c", conf_dir.path(), "ingest").success();

    let library = fs::read_to_string(conf_dir.path().join("library.json"))?;
    assert!(library.contains(r##""average_color":"#ff0000""##));
    assert!(library.contains(r#""title":"sunset""#));
    assert!(!library.contains("clip.mp4"));
    Ok(())
}

#[test]
fn clear_and_slice() -> Result<()> {
    cargo_run!("clear", "--type", "color").success();
    cargo_run!("clear", "--type", "everything").failure();
    cargo_run!("slice", "--type", "media", "--count", "5").success().stdout(predicate::str::is_empty());
    Ok(())
}
