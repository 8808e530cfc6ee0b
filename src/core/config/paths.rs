use std::env;
use std::fs;
use std::path::PathBuf;

/// Filesystem layout for everything the service persists: the vector-index
/// snapshot, the chunk metadata list, and log files.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub index_path: PathBuf,
    pub meta_path: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let data_dir = env::var("PAGESENSE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));
        Self::with_data_dir(data_dir)
    }

    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        let log_dir = data_dir.join("logs");
        let index_path = data_dir.join("vector_index.bin");
        let meta_path = data_dir.join("docs_meta.json");

        for dir in [&data_dir, &log_dir] {
            let _ = fs::create_dir_all(dir);
        }

        AppPaths {
            data_dir,
            log_dir,
            index_path,
            meta_path,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifacts_are_co_located_under_data_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = AppPaths::with_data_dir(tmp.path().join("state"));

        assert!(paths.data_dir.is_dir());
        assert!(paths.log_dir.is_dir());
        assert_eq!(paths.index_path.parent(), paths.meta_path.parent());
    }
}
