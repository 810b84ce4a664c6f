use once_cell::sync::Lazy;
pub use std::env::*;
use std::path::PathBuf;

pub static HOME_DIR: Lazy<PathBuf> = Lazy::new(|| {
    dirs::home_dir().unwrap_or_else(|| {
        eprintln!("Warning: Could not determine home directory");
        PathBuf::from("/tmp")
    })
});

pub static SHAPERCTL_CONFIG_DIR: Lazy<PathBuf> = Lazy::new(|| {
    var_path("SHAPERCTL_CONFIG_DIR").unwrap_or(HOME_DIR.join(".config").join("shaperctl"))
});
pub static SHAPERCTL_SERVERS_FILE: Lazy<PathBuf> =
    Lazy::new(|| SHAPERCTL_CONFIG_DIR.join("servers.json"));

// One allow-list text file per server index lives here
pub static SHAPERCTL_LISTS_DIR: Lazy<PathBuf> =
    Lazy::new(|| var_path("SHAPERCTL_LISTS_DIR").unwrap_or(SHAPERCTL_CONFIG_DIR.join("lists")));

pub static SHAPERCTL_LOG: Lazy<log::LevelFilter> =
    Lazy::new(|| var_log_level("SHAPERCTL_LOG").unwrap_or(log::LevelFilter::Info));

pub static SHAPERCTL_WEB_PORT: Lazy<u16> =
    Lazy::new(|| var_parse("SHAPERCTL_WEB_PORT").unwrap_or(8920));

// Convergence polling knobs. Lower values useful for testing.
pub static SHAPERCTL_POLL_ATTEMPTS: Lazy<u32> =
    Lazy::new(|| var_parse("SHAPERCTL_POLL_ATTEMPTS").unwrap_or(5));
pub static SHAPERCTL_POLL_INTERVAL_MS: Lazy<u64> =
    Lazy::new(|| var_parse("SHAPERCTL_POLL_INTERVAL_MS").unwrap_or(1000));

fn var_path(name: &str) -> Option<PathBuf> {
    var(name).map(PathBuf::from).ok()
}

fn var_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    var(name).ok().and_then(|val| val.parse().ok())
}

fn var_log_level(name: &str) -> Option<log::LevelFilter> {
    var(name).ok().and_then(|level| level.parse().ok())
}
