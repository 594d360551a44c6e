use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::DocumentsConfig;
use crate::models::{DocumentFormat, DocumentSource, SourceHandle};
use crate::traits::DocumentCorpus;

/// Documents under a directory, filtered by include/exclude globs.
pub struct FilesystemCorpus {
    root: PathBuf,
    include_set: GlobSet,
    exclude_set: GlobSet,
    follow_symlinks: bool,
}

impl FilesystemCorpus {
    pub fn new(config: &DocumentsConfig) -> Result<Self> {
        let include_set = build_globset(&config.include_globs)?;

        let mut default_excludes = vec!["**/.git/**".to_string(), "**/.*".to_string()];
        default_excludes.extend(config.exclude_globs.clone());
        let exclude_set = build_globset(&default_excludes)?;

        Ok(Self {
            root: config.root.clone(),
            include_set,
            exclude_set,
            follow_symlinks: config.follow_symlinks,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl DocumentCorpus for FilesystemCorpus {
    fn label(&self) -> &str {
        "filesystem"
    }

    fn list(&self) -> Result<Vec<DocumentSource>> {
        // A missing directory is an empty corpus, not an error.
        if !self.root.exists() {
            tracing::warn!(root = %self.root.display(), "document root does not exist");
            return Ok(Vec::new());
        }
        if !self.root.is_dir() {
            bail!("document root is not a directory: {}", self.root.display());
        }

        let mut sources = Vec::new();

        let walker = WalkDir::new(&self.root).follow_links(self.follow_symlinks);
        for entry in walker {
            // One unreadable entry must not hide the rest of the corpus.
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => return Err(e.into()),
                Err(e) => {
                    tracing::warn!(root = %self.root.display(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(&self.root).unwrap_or(path);
            let rel_str = relative.to_string_lossy().replace('\\', "/");

            if self.exclude_set.is_match(&rel_str) {
                continue;
            }
            if !self.include_set.is_match(&rel_str) {
                continue;
            }

            match file_to_source(path, rel_str) {
                Ok(source) => sources.push(source),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable file");
                }
            }
        }

        // Sort for deterministic ordering
        sources.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(sources)
    }
}

fn file_to_source(path: &Path, relative_path: String) -> Result<DocumentSource> {
    let metadata = std::fs::metadata(path)?;
    let modified = metadata
        .modified()
        .unwrap_or(std::time::SystemTime::UNIX_EPOCH)
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .unwrap_or_default();

    Ok(DocumentSource {
        format: DocumentFormat::from_name(&relative_path),
        name: relative_path,
        handle: SourceHandle::File(path.to_path_buf()),
        revision: format!("{}:{}", metadata.len(), modified.as_nanos()),
        size: metadata.len(),
    })
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
