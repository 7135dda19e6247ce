use plp_bookstore::config::{AppConfig, CliOverrides, load_config};
use plp_bookstore::logger;

#[test]
fn explicit_file_with_cli_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bookstore.toml");
    std::fs::write(
        &path,
        r#"
uri = "memory://"
database = "shop"

[log]
level = "warn"
retention = 2

[queries]
genre = "Fantasy"
page_size = 2
page = 2
"#,
    )
    .unwrap();

    let cfg = load_config(
        Some(&path),
        CliOverrides { database: Some("plp".into()), log_level: Some("debug".into()), ..CliOverrides::default() },
    )
    .unwrap();
    assert_eq!(cfg.uri, "memory://");
    assert_eq!(cfg.database, "plp");
    assert_eq!(cfg.collection, "books");
    assert_eq!(cfg.log.level, "debug");
    assert_eq!(cfg.log.retention, 2);
    assert_eq!(cfg.queries.genre, "Fantasy");
    assert_eq!(cfg.queries.skip(), 2);
    assert_eq!(cfg.queries.author, "George Orwell");
}

#[test]
fn invalid_settings_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "[queries]\npage = 0\n").unwrap();
    assert!(load_config(Some(&path), CliOverrides::default()).is_err());

    let empty = AppConfig { collection: " ".into(), ..AppConfig::default() };
    assert!(empty.validate().is_err());
}

#[test]
fn logging_writes_under_configured_dir() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = AppConfig::default();
    let log = plp_bookstore::config::LogConfig { dir: dir.path().join("logs"), console: false, ..cfg.log };
    logger::configure_logging(&log, false).unwrap();
    log::info!(target: "plp_bookstore::queries", "probe");
    assert!(log.dir.join("app.log").exists());
    assert!(log.dir.join("queries.log").exists());
    assert!(!log.dir.join("dev.log").exists());
}
