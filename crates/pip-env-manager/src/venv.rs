//! Virtual environment layout and creation commands.
//!
//! One fresh environment is created at run start and discarded at run end.
//! This type only knows the layout; creation itself runs as a pipeline step.

use std::path::{Path, PathBuf};

/// A per-run Python virtual environment.
#[derive(Debug, Clone)]
pub struct VirtualEnv {
    root: PathBuf,
}

impl VirtualEnv {
    /// Describe an environment rooted at `root` (not created yet).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Environment root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the environment has been materialised on disk.
    pub fn exists(&self) -> bool {
        self.python().is_file()
    }

    /// Path of the environment's `python` binary.
    pub fn python(&self) -> PathBuf {
        self.bin_dir().join(exe("python"))
    }

    /// Path of the environment's `pip` binary.
    pub fn pip(&self) -> PathBuf {
        self.bin_dir().join(exe("pip"))
    }

    /// Argv that creates this environment with the given interpreter.
    pub fn create_command(&self, interpreter: &Path) -> Vec<String> {
        vec![
            interpreter.display().to_string(),
            "-m".to_string(),
            "venv".to_string(),
            self.root.display().to_string(),
        ]
    }

    fn bin_dir(&self) -> PathBuf {
        if cfg!(windows) {
            self.root.join("Scripts")
        } else {
            self.root.join("bin")
        }
    }
}

fn exe(name: &str) -> String {
    if cfg!(windows) {
        format!("{name}.exe")
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(windows))]
    fn test_unix_layout() {
        let env = VirtualEnv::new("/tmp/run/venv");
        assert_eq!(env.python(), PathBuf::from("/tmp/run/venv/bin/python"));
        assert_eq!(env.pip(), PathBuf::from("/tmp/run/venv/bin/pip"));
    }

    #[test]
    fn test_create_command_shape() {
        let env = VirtualEnv::new("/tmp/run/venv");
        let cmd = env.create_command(Path::new("python3.10"));
        assert_eq!(cmd[0], "python3.10");
        assert_eq!(cmd[1], "-m");
        assert_eq!(cmd[2], "venv");
        assert!(cmd[3].ends_with("venv"));
    }

    #[test]
    fn test_missing_env_does_not_exist() {
        let env = VirtualEnv::new("/definitely/not/a/real/venv");
        assert!(!env.exists());
    }
}
