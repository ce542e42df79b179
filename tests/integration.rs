use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn thumbdex_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_thumbdex"))
}

fn write_gif(path: &Path, width: u32, height: u32) {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 40, 40, 255]));
    img.save(path).unwrap();
}

fn setup_test_env() -> (TempDir, PathBuf, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let media_dir = root.join("gifs");
    fs::create_dir_all(&media_dir).unwrap();
    write_gif(&media_dir.join("cat-fun.gif"), 64, 48);
    write_gif(&media_dir.join("cat_nap.gif"), 32, 32);
    write_gif(&media_dir.join("dog_play.gif"), 48, 64);

    let config_content = format!(
        r#"[db]
path = "{}/data/catalog.sqlite"

[server]
bind = "127.0.0.1:7341"

[thumbnails]
max_concurrent = 2
size = 32

[catalog]
workspace_dir = ".catalog"
"#,
        root.display()
    );

    let config_path = config_dir.join("thumbdex.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path, media_dir)
}

fn run_thumbdex(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = thumbdex_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run thumbdex binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn ingest(config_path: &Path, media_dir: &Path) -> String {
    let (stdout, stderr, success) = run_thumbdex(
        config_path,
        &["ingest", media_dir.to_str().unwrap(), "--progress", "off"],
    );
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);
    stdout
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path, _) = setup_test_env();

    let (stdout, stderr, success) = run_thumbdex(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/catalog.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path, _) = setup_test_env();

    let (_, _, success1) = run_thumbdex(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_thumbdex(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_ingest_builds_catalog_and_thumbnails() {
    let (_tmp, config_path, media_dir) = setup_test_env();

    run_thumbdex(&config_path, &["init"]);
    let stdout = ingest(&config_path, &media_dir);
    assert!(stdout.contains("inserted: 3"), "stdout={}", stdout);
    assert!(stdout.contains("unscheduled: 0"));
    assert!(stdout.contains("thumbnails ok: 3"));
    assert!(stdout.contains("thumbnails failed: 0"));
    assert!(stdout.contains("ok"));

    let thumbs = media_dir.join(".catalog/thumbs");
    for name in ["cat-fun.gif", "cat_nap.gif", "dog_play.gif"] {
        let thumb = thumbs.join(format!("{}.jpg", name));
        assert!(thumb.exists(), "missing thumbnail {}", thumb.display());
        let (w, h) = image::image_dimensions(&thumb).unwrap();
        assert!(w <= 32 && h <= 32, "{} is {}x{}", name, w, h);
    }
    assert!(media_dir.join(".catalog/tags/README.txt").exists());
}

#[test]
fn test_ingest_is_a_full_rebuild() {
    let (_tmp, config_path, media_dir) = setup_test_env();

    ingest(&config_path, &media_dir);
    let stdout = ingest(&config_path, &media_dir);
    assert!(stdout.contains("inserted: 3"), "stdout={}", stdout);

    let (stdout, _, _) = run_thumbdex(&config_path, &["search", ""]);
    assert!(stdout.contains("3 files in the catalog"), "stdout={}", stdout);

    // Removed files disappear on the next rebuild.
    fs::remove_file(media_dir.join("dog_play.gif")).unwrap();
    let stdout = ingest(&config_path, &media_dir);
    assert!(stdout.contains("inserted: 2"), "stdout={}", stdout);

    let (stdout, _, _) = run_thumbdex(&config_path, &["search", "dog"]);
    assert!(stdout.contains("No results"), "stdout={}", stdout);
}

#[test]
fn test_ingest_missing_source_fails() {
    let (tmp, config_path, media_dir) = setup_test_env();

    ingest(&config_path, &media_dir);

    let missing = tmp.path().join("nope");
    let (_, stderr, success) = run_thumbdex(
        &config_path,
        &["ingest", missing.to_str().unwrap(), "--progress", "off"],
    );
    assert!(!success, "ingest of a missing dir should fail");
    assert!(stderr.contains("not found") || stderr.contains("nope"), "stderr={}", stderr);

    // The previous catalog is left alone.
    let (stdout, _, _) = run_thumbdex(&config_path, &["search", ""]);
    assert!(stdout.contains("3 files in the catalog"), "stdout={}", stdout);
}

#[test]
fn test_ingest_corrupt_file_keeps_record() {
    let (_tmp, config_path, media_dir) = setup_test_env();
    fs::write(media_dir.join("broken.gif"), b"definitely not a gif").unwrap();

    let stdout = ingest(&config_path, &media_dir);
    assert!(stdout.contains("inserted: 4"), "stdout={}", stdout);
    assert!(stdout.contains("thumbnails ok: 3"));
    assert!(stdout.contains("thumbnails failed: 1"));

    assert!(!media_dir.join(".catalog/thumbs/broken.gif.jpg").exists());

    let (stdout, _, success) = run_thumbdex(&config_path, &["get", "broken.gif"]);
    assert!(success);
    assert!(stdout.contains("(missing)"), "stdout={}", stdout);
}

#[test]
fn test_search_prefix() {
    let (_tmp, config_path, media_dir) = setup_test_env();
    ingest(&config_path, &media_dir);

    let (stdout, stderr, success) = run_thumbdex(&config_path, &["search", "cat"]);
    assert!(success, "search failed: stderr={}", stderr);
    assert!(stdout.contains("2 results"), "stdout={}", stdout);
    assert!(stdout.contains("cat-fun.gif"));
    assert!(stdout.contains("cat_nap.gif"));
    assert!(!stdout.contains("dog_play.gif"));

    let (stdout, _, _) = run_thumbdex(&config_path, &["search", "PL"]);
    assert!(stdout.contains("1 results"), "stdout={}", stdout);
    assert!(stdout.contains("dog_play.gif"));
}

#[test]
fn test_search_multiple_terms() {
    let (_tmp, config_path, media_dir) = setup_test_env();
    ingest(&config_path, &media_dir);

    let (stdout, _, success) = run_thumbdex(&config_path, &["search", "nap, dog"]);
    assert!(success);
    assert!(stdout.contains("2 results"), "stdout={}", stdout);

    // Catalog order, not term order.
    let nap = stdout.find("cat_nap.gif").unwrap();
    let dog = stdout.find("dog_play.gif").unwrap();
    assert!(nap < dog);
}

#[test]
fn test_search_empty_query() {
    let (_tmp, config_path, media_dir) = setup_test_env();
    ingest(&config_path, &media_dir);

    for query in ["", "  ", " , ,"] {
        let (stdout, _, success) = run_thumbdex(&config_path, &["search", query]);
        assert!(success);
        assert!(stdout.contains("No query"), "query={:?} stdout={}", query, stdout);
    }
}

#[test]
fn test_search_json() {
    let (_tmp, config_path, media_dir) = setup_test_env();
    ingest(&config_path, &media_dir);

    let (stdout, _, success) = run_thumbdex(&config_path, &["search", "cat", "--json"]);
    assert!(success);
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(value["status"], "ok");
    assert_eq!(value["count"], 2);
    assert_eq!(value["results"][0]["filename"], "cat-fun.gif");
}

#[test]
fn test_get_record() {
    let (_tmp, config_path, media_dir) = setup_test_env();
    ingest(&config_path, &media_dir);

    let (stdout, _, success) = run_thumbdex(&config_path, &["get", "dog_play.gif"]);
    assert!(success);
    assert!(stdout.contains("filename:   dog_play.gif"));
    assert!(stdout.contains("tokens:     dog, play"));
    assert!(!stdout.contains("(missing)"));
}

#[test]
fn test_get_missing_or_invalid() {
    let (_tmp, config_path, media_dir) = setup_test_env();
    ingest(&config_path, &media_dir);

    let (_, stderr, success) = run_thumbdex(&config_path, &["get", "bird.gif"]);
    assert!(!success);
    assert!(stderr.contains("Error"), "stderr={}", stderr);

    let (_, _, success) = run_thumbdex(&config_path, &["get", "../secret.gif"]);
    assert!(!success);
}

#[test]
fn test_stats() {
    let (_tmp, config_path, media_dir) = setup_test_env();
    ingest(&config_path, &media_dir);

    let (stdout, _, success) = run_thumbdex(&config_path, &["stats"]);
    assert!(success);
    assert!(stdout.contains("Files:       3"), "stdout={}", stdout);
    assert!(stdout.contains("3 present, 0 missing"));
}

#[test]
fn test_invalid_config_rejected() {
    let (tmp, _, _) = setup_test_env();
    let bad = tmp.path().join("config/bad.toml");
    fs::write(&bad, "[thumbnails]\nmax_concurrent = 0\n").unwrap();

    let (_, stderr, success) = run_thumbdex(&bad, &["init"]);
    assert!(!success);
    assert!(stderr.contains("max_concurrent"), "stderr={}", stderr);
}
