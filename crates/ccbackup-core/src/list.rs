//! 备份内容预览（只读）
use std::path::Path;

use tracing::debug;

use crate::catalog;
use crate::error::{BackupError, Result};
use crate::types::{EntryKind, EntryPreview};
use crate::walker::{child_dirs, expand_entry};

const INSTALLED_PLUGINS: &str = "plugins/installed_plugins.json";

/// 列出将被备份的条目及其在磁盘上的状态，不写任何文件
pub fn list_entries(source_root: &Path, include_history: bool) -> Result<Vec<EntryPreview>> {
    if !source_root.is_dir() {
        return Err(BackupError::SourceNotFound(source_root.to_path_buf()));
    }

    let previews = catalog::resolve(include_history)
        .into_iter()
        .map(|entry| {
            // 空目录也算存在
            let files = expand_entry(source_root, &entry);
            let present = files.is_some();
            let children = if present && entry.kind == EntryKind::Directory {
                child_dirs(&source_root.join(entry.relative_path))
            } else {
                Vec::new()
            };
            let plugin_count = if present && entry.relative_path == INSTALLED_PLUGINS {
                count_installed_plugins(&source_root.join(INSTALLED_PLUGINS))
            } else {
                None
            };
            let files = files.unwrap_or_default();
            EntryPreview {
                entry,
                present,
                size_bytes: files.iter().map(|f| f.size).sum(),
                file_count: files.len(),
                children,
                plugin_count,
            }
        })
        .collect();
    Ok(previews)
}

/// installed_plugins.json 形如 `{"plugins": {"name@marketplace": [...]}}`
fn count_installed_plugins(path: &Path) -> Option<usize> {
    let bytes = std::fs::read(path).ok()?;
    match serde_json::from_slice::<serde_json::Value>(&bytes) {
        Ok(v) => v.get("plugins").and_then(|p| p.as_object()).map(|m| m.len()),
        Err(err) => {
            debug!(path = %path.display(), error = %err, "plugin list is not valid JSON");
            None
        }
    }
}
