use std::path::{Path, PathBuf};

/// Polls a single file path for existence. Presence triggers an immediate
/// graceful stop of the orchestrator loop between ticks (spec.md §5).
#[derive(Debug, Clone)]
pub struct KillSwitch {
    path: PathBuf,
}

impl KillSwitch {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        KillSwitch { path: path.into() }
    }

    pub fn is_tripped(&self) -> bool {
        self.path.exists()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn reports_untripped_when_file_absent() {
        let path = env::temp_dir().join(format!("meridian_arb_killswitch_test_{}_absent", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let switch = KillSwitch::new(path);
        assert!(!switch.is_tripped());
    }

    #[test]
    fn reports_tripped_once_file_exists() {
        let path = env::temp_dir().join(format!("meridian_arb_killswitch_test_{}_present", std::process::id()));
        std::fs::write(&path, b"stop").unwrap();
        let switch = KillSwitch::new(&path);
        assert!(switch.is_tripped());
        let _ = std::fs::remove_file(&path);
    }
}
