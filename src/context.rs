// File: ./src/context.rs
//! Where invahelp keeps its files: `config.toml`, the fallback store and the
//! log. Everything filesystem-related takes a `&dyn AppContext`.
use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

pub trait AppContext: Send + Sync + std::fmt::Debug {
    fn get_data_dir(&self) -> Result<PathBuf>;
    fn get_config_dir(&self) -> Result<PathBuf>;

    fn get_config_file_path(&self) -> Result<PathBuf> {
        Ok(self.get_config_dir()?.join("config.toml"))
    }

    /// One file per fallback key.
    fn get_store_dir(&self) -> Result<PathBuf> {
        Ok(self.get_data_dir()?.join("store"))
    }

    fn get_log_path(&self) -> Option<PathBuf> {
        self.get_data_dir().ok().map(|p| p.join("invahelp.log"))
    }
}

pub type SharedContext = std::sync::Arc<dyn AppContext>;

fn created(path: PathBuf) -> Result<PathBuf> {
    fs::create_dir_all(&path).with_context(|| format!("Cannot create {:?}", path))?;
    Ok(path)
}

/// `data/` and `config/` under a single root.
fn under_root(root: &Path, leaf: &str) -> Result<PathBuf> {
    created(root.join(leaf))
}

/// Platform directories, or a `--root` override.
#[derive(Clone, Debug)]
pub struct StandardContext {
    root: Option<PathBuf>,
}

impl StandardContext {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    fn project() -> Result<ProjectDirs> {
        ProjectDirs::from("org", "invahelp", "invahelp")
            .ok_or_else(|| anyhow!("Cannot locate a home directory"))
    }
}

impl AppContext for StandardContext {
    fn get_data_dir(&self) -> Result<PathBuf> {
        match &self.root {
            Some(root) => under_root(root, "data"),
            None => created(Self::project()?.data_dir().to_path_buf()),
        }
    }

    fn get_config_dir(&self) -> Result<PathBuf> {
        match &self.root {
            Some(root) => under_root(root, "config"),
            None => created(Self::project()?.config_dir().to_path_buf()),
        }
    }
}

/// Throwaway root in the temp dir, removed on drop.
#[derive(Debug)]
pub struct TestContext {
    pub root: PathBuf,
}

impl TestContext {
    pub fn new() -> Self {
        let root = std::env::temp_dir().join(format!("invahelp_test_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&root).expect("temp dir for TestContext");
        Self { root }
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl AppContext for TestContext {
    fn get_data_dir(&self) -> Result<PathBuf> {
        under_root(&self.root, "data")
    }

    fn get_config_dir(&self) -> Result<PathBuf> {
        under_root(&self.root, "config")
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}
