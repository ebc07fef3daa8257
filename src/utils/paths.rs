use std::path::PathBuf;

/// `~/.lotadmin`, home of the global config, session and activity log.
pub fn lotadmin_home_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".lotadmin"))
}

/// Expand a leading `~` to the home directory. Other paths pass through.
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(path));
    }
    if let Some(rest) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\"))
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}
