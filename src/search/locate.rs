use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::search::ids::IdMap;
use crate::search::index::FlatIndex;

/// A similarity index paired with the ids of the records its vectors represent.
#[derive(Debug)]
pub struct LoadedIndex {
    pub index: FlatIndex,
    pub ids: IdMap,
    /// Directory the files were read from; `None` for indexes built in memory.
    pub source_dir: Option<PathBuf>,
}

impl LoadedIndex {
    pub fn new(index: FlatIndex, ids: IdMap) -> Self {
        Self {
            index,
            ids,
            source_dir: None,
        }
    }
}

/// Return the first directory in `dirs` holding both `index_file` and `ids_file`.
pub fn locate(dirs: &[PathBuf], index_file: &str, ids_file: &str) -> Option<PathBuf> {
    for dir in dirs {
        let index_path = dir.join(index_file);
        let ids_path = dir.join(ids_file);

        if !dir.is_dir() {
            tracing::info!("Index candidate {} does not exist", dir.display());
            continue;
        }
        if tracing::enabled!(tracing::Level::DEBUG) {
            let listing: Vec<String> = std::fs::read_dir(dir)
                .map(|entries| {
                    entries
                        .filter_map(|e| e.ok())
                        .map(|e| e.file_name().to_string_lossy().into_owned())
                        .collect()
                })
                .unwrap_or_default();
            tracing::debug!("Files in {}: {:?}", dir.display(), listing);
        }

        if index_path.is_file() && ids_path.is_file() {
            tracing::info!("Found index files in {}", dir.display());
            return Some(dir.clone());
        }
        tracing::info!(
            "Index files not found in {} (index: {}, ids: {})",
            dir.display(),
            index_path.is_file(),
            ids_path.is_file()
        );
    }
    None
}

/// Load the index and id files from `dir`.
pub fn load_from(dir: &Path, index_file: &str, ids_file: &str) -> Result<LoadedIndex> {
    let index_path = dir.join(index_file);
    let ids_path = dir.join(ids_file);

    for path in [&index_path, &ids_path] {
        if let Ok(meta) = std::fs::metadata(path) {
            tracing::info!("{}: {} bytes", path.display(), meta.len());
        }
    }

    let index = FlatIndex::open(&index_path)
        .with_context(|| format!("Failed to read index {}", index_path.display()))?;
    let ids = IdMap::open(&ids_path)
        .with_context(|| format!("Failed to read ids {}", ids_path.display()))?;

    if ids.len() != index.len() {
        // Positions without an id are dropped at query time
        tracing::warn!(
            "Index holds {} vectors but id array holds {} ids",
            index.len(),
            ids.len()
        );
    }

    tracing::info!(
        "Loaded index: {} vectors, dimension {}, {:?} metric",
        index.len(),
        index.dimension(),
        index.metric()
    );

    Ok(LoadedIndex {
        index,
        ids,
        source_dir: Some(dir.to_path_buf()),
    })
}

/// Locate and load the index described by `config`. Any failure is logged
/// and leaves the index unavailable for the life of the process.
pub fn load_index(config: &Config) -> Option<LoadedIndex> {
    tracing::info!("Searching for index files in: {:?}", config.index_dirs);

    let Some(dir) = locate(&config.index_dirs, &config.index_file, &config.ids_file) else {
        tracing::error!("Could not find index files in any of the expected locations");
        return None;
    };

    match load_from(&dir, &config.index_file, &config.ids_file) {
        Ok(loaded) => {
            if loaded.index.dimension() != config.embedding.dimension {
                tracing::warn!(
                    "Index dimension {} differs from configured embedding dimension {}",
                    loaded.index.dimension(),
                    config.embedding.dimension
                );
            }
            Some(loaded)
        }
        Err(e) => {
            tracing::error!("Failed to load index from {}: {e:#}", dir.display());
            None
        }
    }
}
