use iga_provider::config::ConfigLoader;
use std::{
    env, fs,
    path::PathBuf,
    sync::{Mutex, MutexGuard, OnceLock},
};
use tempfile::TempDir;

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

fn env_guard() -> MutexGuard<'static, ()> {
    env_lock()
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
}

fn clear_env() {
    unsafe {
        env::remove_var("IGA_PROFILE");
        env::remove_var("IGA_SERVER_URL");
        env::remove_var("IGA_USERNAME");
        env::remove_var("IGA_PASSWORD");
        env::remove_var("IGA_LOG_LEVEL");
        env::remove_var("IGA_LOG_FORMAT");
        env::remove_var("IGA_MAX_UNAUTHORIZED_RETRIES");
    }
}

fn write_env_file(dir: &TempDir, name: &str, contents: &str) {
    let path = dir.path().join(name);
    fs::write(path, contents).unwrap();
}

#[test]
fn loads_defaults_when_no_env_present() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let cfg = loader.load().expect("config loads with defaults");

    assert_eq!(cfg.profile, "local");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.log_format, "json");
    assert_eq!(cfg.max_unauthorized_retries, 2);
    assert!(cfg.server_url.is_none());
    // Credentials are only required once the provider block is merged.
    assert!(cfg.credentials().is_err());
    clear_env();
}

#[test]
fn layered_env_files_apply_in_order() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", "IGA_SERVER_URL=https://base.example.com\n");
    write_env_file(
        &temp_dir,
        ".env.test",
        "IGA_SERVER_URL=https://profile.example.com\n",
    );
    write_env_file(
        &temp_dir,
        ".env.test.local",
        "IGA_SERVER_URL=https://profile-local.example.com\nIGA_USERNAME=admin\n",
    );

    // Select profile via .env.local before profile-specific files load.
    write_env_file(
        &temp_dir,
        ".env.local",
        "IGA_PROFILE=test\nIGA_SERVER_URL=https://local.example.com\nIGA_PASSWORD=hunter2\n",
    );

    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let cfg = loader.load().expect("config loads with layered env files");

    assert_eq!(cfg.profile, "test");
    assert_eq!(
        cfg.server_url.as_deref(),
        Some("https://profile-local.example.com")
    );
    let credentials = cfg.credentials().expect("all settings present");
    assert_eq!(credentials.username, "admin");
    assert_eq!(
        credentials.server_url.as_str(),
        "https://profile-local.example.com/"
    );
    clear_env();
}

#[test]
fn os_environment_has_highest_precedence() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(
        &temp_dir,
        ".env",
        "IGA_SERVER_URL=https://file.example.com\nIGA_LOG_LEVEL=debug\n",
    );

    unsafe {
        env::set_var("IGA_SERVER_URL", "https://env.example.com");
    }

    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let cfg = loader.load().expect("config loads with env override");
    assert_eq!(cfg.server_url.as_deref(), Some("https://env.example.com"));
    assert_eq!(cfg.log_level, "debug");

    clear_env();
}

#[test]
fn redacted_json_hides_password() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", "IGA_USERNAME=admin\nIGA_PASSWORD=hunter2\n");

    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let cfg = loader.load().unwrap();
    let rendered = cfg.redacted_json().unwrap();
    assert!(rendered.contains("[REDACTED]"));
    assert!(!rendered.contains("hunter2"));

    clear_env();
}

#[test]
fn invalid_settings_return_errors() {
    let _guard = env_guard();
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));

    unsafe {
        env::set_var("IGA_SERVER_URL", "ftp://iga.example.com");
    }
    let err = loader.load().expect_err("ftp scheme should fail");
    assert!(format!("{}", err).contains("must use http or https"));
    clear_env();

    unsafe {
        env::set_var("IGA_LOG_FORMAT", "xml");
    }
    let err = loader.load().expect_err("unknown log format should fail");
    assert!(format!("{}", err).contains("log format"));
    clear_env();

    unsafe {
        env::set_var("IGA_MAX_UNAUTHORIZED_RETRIES", "9");
    }
    let err = loader.load().expect_err("retry bound should fail");
    assert!(format!("{}", err).contains("between 0 and 5"));
    clear_env();

    unsafe {
        env::set_var("IGA_MAX_UNAUTHORIZED_RETRIES", "many");
    }
    let err = loader.load().expect_err("non-numeric retry bound should fail");
    assert!(format!("{}", err).contains("IGA_MAX_UNAUTHORIZED_RETRIES"));
    clear_env();
}
