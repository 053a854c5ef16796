use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Cohorta";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when RUST_LOG is not set.
pub fn default_log_filter() -> &'static str {
    "info,cohorta=debug"
}

/// Get the application data directory
/// ~/Cohorta/ on all platforms (user-visible, per design requirement)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Cohorta")
}

/// Get the default database path
pub fn database_path() -> PathBuf {
    app_data_dir().join("cohorta.db")
}
