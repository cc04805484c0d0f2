//! 清单条目展开：单文件条目直接定位，目录条目递归收集其下所有文件
use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

use crate::types::{EntryKind, ManifestEntry};

/// 源目录中的一个待处理文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SourceFile {
    pub(crate) path: PathBuf,
    /// 归档内路径（相对源目录，`/` 分隔）
    pub(crate) archive_name: String,
    pub(crate) size: u64,
}

/// 展开结果：条目不存在时为 None
pub(crate) fn expand_entry(root: &Path, entry: &ManifestEntry) -> Option<Vec<SourceFile>> {
    let base = root.join(entry.relative_path);
    match entry.kind {
        EntryKind::File => {
            // 跟随符号链接，指向目录的链接不算文件
            let md = std::fs::metadata(&base).ok().filter(|m| m.is_file())?;
            Some(vec![SourceFile {
                path: base,
                archive_name: entry.relative_path.to_string(),
                size: md.len(),
            }])
        }
        EntryKind::Directory => {
            if !base.is_dir() {
                return None;
            }
            Some(walk_files(root, &base))
        }
    }
}

/// 递归收集目录下的普通文件（按文件名排序，保证归档顺序可复现）
/// - 不跟随符号链接进入目录；指向文件的链接按目标文件收录
/// - 断开的链接与无法读取的目录项跳过并记录
fn walk_files(root: &Path, dir: &Path) -> Vec<SourceFile> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                warn!(error = %err, "skipping unreadable path");
                continue;
            }
        };
        let md = if entry.path_is_symlink() {
            match std::fs::metadata(entry.path()) {
                Ok(md) if md.is_file() => md,
                _ => continue,
            }
        } else if entry.file_type().is_file() {
            match entry.metadata() {
                Ok(md) => md,
                Err(err) => {
                    warn!(path = %entry.path().display(), error = %err, "skipping file without metadata");
                    continue;
                }
            }
        } else {
            continue;
        };

        let Some(archive_name) = archive_name(root, entry.path()) else {
            continue;
        };
        files.push(SourceFile { path: entry.into_path(), archive_name, size: md.len() });
    }
    files
}

/// 相对路径转为 zip 内名称；非 UTF-8 路径返回 None
fn archive_name(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Option<Vec<&str>> = rel.components().map(|c| c.as_os_str().to_str()).collect();
    Some(parts?.join("/"))
}

/// 目录条目的直接子目录名（排序）
pub(crate) fn child_dirs(dir: &Path) -> Vec<String> {
    let mut out: Vec<String> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .collect();
    out.sort();
    out
}
