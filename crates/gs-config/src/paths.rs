use std::path::{Path, PathBuf};

/// Holds a configurable base directory for all genstudio file paths.
///
/// Use `ConfigPaths::new()` for production (resolves `~/.genstudio`),
/// or `ConfigPaths::with_base()` for testing with an isolated directory.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    base: PathBuf,
}

impl ConfigPaths {
    /// Create paths rooted at `~/.genstudio`. Returns an error if the home
    /// directory cannot be determined.
    pub fn new() -> anyhow::Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
        Ok(Self {
            base: home.join(".genstudio"),
        })
    }

    pub fn with_base(base: PathBuf) -> Self {
        Self { base }
    }

    pub fn config_dir(&self) -> &Path {
        &self.base
    }

    pub fn config_path(&self) -> PathBuf {
        self.base.join("config.toml")
    }

    /// Default directory the CLI exports generated media into.
    pub fn output_dir(&self) -> PathBuf {
        self.base.join("output")
    }

    pub fn ensure_dir(path: &Path) -> anyhow::Result<PathBuf> {
        if !path.exists() {
            std::fs::create_dir_all(path)?;
        }
        Ok(path.to_path_buf())
    }

    pub fn ensure_config_dir(&self) -> anyhow::Result<PathBuf> {
        Self::ensure_dir(&self.base)
    }
}
