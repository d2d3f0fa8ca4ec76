//! Filesystem document loader.
//!
//! Walks `documents.dir`, keeps files matching the include globs and not
//! matching the exclude globs, and reads each as UTF-8 text. `.git`,
//! `target` and `node_modules` are always excluded.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use docchat_core::models::Document;

use crate::config::DocumentsConfig;

/// Load every matching document under the configured directory.
///
/// Documents are sorted by `source_id` (the path relative to the root, with
/// `/` separators). Files that cannot be read as UTF-8 are skipped with a
/// warning.
pub fn load_documents(config: &DocumentsConfig) -> Result<Vec<Document>> {
    let root = &config.dir;
    if !root.exists() {
        bail!("Documents directory does not exist: {}", root.display());
    }

    let include_set = build_globset(&config.include_globs)?;

    let mut default_excludes = vec![
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
    ];
    default_excludes.extend(config.exclude_globs.iter().cloned());
    let exclude_set = build_globset(&default_excludes)?;

    let mut documents = Vec::new();

    let walker = WalkDir::new(root).follow_links(config.follow_symlinks);
    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let source_id = relative.to_string_lossy().replace('\\', "/");

        if exclude_set.is_match(&source_id) || !include_set.is_match(&source_id) {
            continue;
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable file");
                continue;
            }
        };

        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| source_id.clone());

        documents.push(Document::new(content, source_id, display_name));
    }

    documents.sort_by(|a, b| a.metadata.source_id.cmp(&b.metadata.source_id));
    tracing::debug!(count = documents.len(), root = %root.display(), "loaded documents");

    Ok(documents)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("Invalid glob: {}", pattern))?);
    }
    Ok(builder.build()?)
}
