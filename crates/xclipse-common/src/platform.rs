use std::path::PathBuf;

/// File name of the layer configuration.
pub const CONFIG_FILE_NAME: &str = "xclipse_layer.toml";

/// Environment variable that points at an explicit configuration file.
pub const CONFIG_ENV: &str = "XCLIPSE_LAYER_CONFIG";

/// Platform-conventional locations searched for the layer configuration,
/// most specific first.
pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    #[cfg(target_os = "android")]
    {
        paths.push(PathBuf::from("/data/local/tmp").join(CONFIG_FILE_NAME));
        paths.push(PathBuf::from("/vendor/etc").join(CONFIG_FILE_NAME));
    }
    #[cfg(all(unix, not(target_os = "android")))]
    {
        if let Ok(dir) = std::env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(dir).join("xclipse").join(CONFIG_FILE_NAME));
        }
        paths.push(PathBuf::from("/etc/xclipse").join(CONFIG_FILE_NAME));
    }
    #[cfg(windows)]
    {
        let programdata = std::env::var("PROGRAMDATA")
            .unwrap_or_else(|_| r"C:\ProgramData".to_string());
        paths.push(PathBuf::from(programdata).join("Xclipse").join(CONFIG_FILE_NAME));
    }
    paths
}

/// Returns the platform name string.
pub fn platform_name() -> &'static str {
    #[cfg(target_os = "android")]
    { "android" }
    #[cfg(target_os = "windows")]
    { "windows" }
    #[cfg(target_os = "linux")]
    { "linux" }
    #[cfg(target_os = "macos")]
    { "macos" }
    #[cfg(not(any(
        target_os = "android",
        target_os = "windows",
        target_os = "linux",
        target_os = "macos"
    )))]
    { "unknown" }
}
