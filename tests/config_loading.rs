// tests/config_loading.rs
use econ_calendar_bot::config::{load_default, load_from};
use std::{env, fs};

fn clear_env() {
    for k in ["BOT_CONFIG_PATH", "BOT_TOKEN", "DISCORD_BOT_TOKEN", "FEED_URL", "CACHE_FILE"] {
        env::remove_var(k);
    }
}

#[test]
fn explicit_path_parses_toml() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("bot.toml");
    fs::write(
        &p,
        r#"
feed_url = "https://feed.example/week.json"
schedule_hour = 7
schedule_minute = 0
timezone = "Europe/Berlin"
cache_max_age_secs = 0
"#,
    )
    .unwrap();
    let cfg = load_from(&p).unwrap();
    assert_eq!(cfg.feed_url, "https://feed.example/week.json");
    assert_eq!((cfg.schedule_hour, cfg.schedule_minute), (7, 0));
    assert_eq!(cfg.tz().unwrap(), chrono_tz::Europe::Berlin);
    assert_eq!(cfg.cache_max_age_secs, 0);
}

#[serial_test::serial]
#[test]
fn default_uses_env_then_fallbacks() {
    // Isolate CWD so the repo's own config/ is not read
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    clear_env();

    // 1) nothing on disk → defaults
    let cfg = load_default().unwrap();
    assert_eq!(cfg.schedule_hour, 6);
    assert!(cfg.bot_token.is_none());

    // 2) ./config/bot.toml fallback
    fs::create_dir_all(tmp.path().join("config")).unwrap();
    fs::write(tmp.path().join("config/bot.toml"), "schedule_hour = 8\n").unwrap();
    assert_eq!(load_default().unwrap().schedule_hour, 8);

    // 3) BOT_CONFIG_PATH wins
    let p_env = tmp.path().join("other.toml");
    fs::write(&p_env, "schedule_hour = 9\n").unwrap();
    env::set_var("BOT_CONFIG_PATH", p_env.display().to_string());
    assert_eq!(load_default().unwrap().schedule_hour, 9);

    // 4) dangling BOT_CONFIG_PATH is an error
    env::set_var("BOT_CONFIG_PATH", tmp.path().join("missing.toml").display().to_string());
    assert!(load_default().is_err());

    clear_env();
    env::set_current_dir(&old).unwrap();
}

#[serial_test::serial]
#[test]
fn env_overrides_secrets_and_paths() {
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    clear_env();

    env::set_var("DISCORD_BOT_TOKEN", "  tok  ");
    env::set_var("FEED_URL", "http://localhost:1234/feed.json");
    env::set_var("CACHE_FILE", "/tmp/events.json");
    let cfg = load_default().unwrap();
    assert_eq!(cfg.bot_token.as_deref(), Some("tok"));
    assert_eq!(cfg.feed_url, "http://localhost:1234/feed.json");
    assert_eq!(cfg.cache_path, std::path::PathBuf::from("/tmp/events.json"));

    // BOT_TOKEN takes precedence over DISCORD_BOT_TOKEN
    env::set_var("BOT_TOKEN", "primary");
    assert_eq!(load_default().unwrap().bot_token.as_deref(), Some("primary"));

    clear_env();
    env::set_current_dir(&old).unwrap();
}
