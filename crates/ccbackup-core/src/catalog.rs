//! 备份清单目录（允许列表）
//!
//! 只有这里列出的路径会进入归档；源目录中的其他内容（调试日志、文件历史、
//! 插件缓存、shell 快照、遥测数据以及任何未知文件）一律不备份。

use crate::types::{Category, EntryKind, Group, ManifestEntry};

const CORE_ENTRIES: [ManifestEntry; 5] = [
    ManifestEntry {
        relative_path: "CLAUDE.md",
        category: Category::Core,
        kind: EntryKind::File,
        group: Group::Core,
        description: "Global prompts and instructions",
    },
    ManifestEntry {
        relative_path: "settings.json",
        category: Category::Core,
        kind: EntryKind::File,
        group: Group::Core,
        description: "User settings (model, plugins, env)",
    },
    ManifestEntry {
        relative_path: "skills",
        category: Category::Core,
        kind: EntryKind::Directory,
        group: Group::Core,
        description: "Custom skills",
    },
    ManifestEntry {
        relative_path: "plugins/installed_plugins.json",
        category: Category::Core,
        kind: EntryKind::File,
        group: Group::Plugins,
        description: "Installed plugin list",
    },
    ManifestEntry {
        relative_path: "plugins/known_marketplaces.json",
        category: Category::Core,
        kind: EntryKind::File,
        group: Group::Plugins,
        description: "Marketplace config",
    },
];

const HISTORY_ENTRIES: [ManifestEntry; 2] = [
    ManifestEntry {
        relative_path: "history.jsonl",
        category: Category::Optional,
        kind: EntryKind::File,
        group: Group::History,
        description: "Command history",
    },
    ManifestEntry {
        relative_path: "projects",
        category: Category::Optional,
        kind: EntryKind::Directory,
        group: Group::History,
        description: "Session history",
    },
];

/// 明确不备份的路径，仅用于展示
pub const EXCLUDED: [&str; 6] = [
    "debug",
    "file-history",
    "plugins/cache",
    "shell-snapshots",
    "statsig",
    "telemetry",
];

/// 按固定顺序返回本次要备份的条目
pub fn resolve(include_history: bool) -> Vec<ManifestEntry> {
    let mut out = CORE_ENTRIES.to_vec();
    if include_history {
        out.extend_from_slice(&HISTORY_ENTRIES);
    }
    out
}
