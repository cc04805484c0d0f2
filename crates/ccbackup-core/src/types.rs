//! 公共类型（对外暴露）
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// 清单条目的层级：核心条目总是备份，可选条目需显式开启
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Core,
    Optional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// manifest.json 中 `contents` 的分组键
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Group {
    Core,
    Plugins,
    History,
}

impl Group {
    pub fn as_str(self) -> &'static str {
        match self {
            Group::Core => "core",
            Group::Plugins => "plugins",
            Group::History => "history",
        }
    }
}

/// 静态清单条目（进程启动即确定，不可变）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
    /// 相对于源目录的路径，始终使用 `/` 分隔
    pub relative_path: &'static str,
    pub category: Category,
    pub kind: EntryKind,
    pub group: Group,
    pub description: &'static str,
}

impl ManifestEntry {
    /// manifest.json 中的展示名：目录带尾部 `/`
    pub fn display_path(&self) -> String {
        match self.kind {
            EntryKind::File => self.relative_path.to_string(),
            EntryKind::Directory => format!("{}/", self.relative_path),
        }
    }
}

/// 单次扫描命中
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanFinding {
    pub file_path: String,
    /// 从 1 开始
    pub line_number: usize,
    /// 值在行内的起始列，从 1 开始，按字节计
    pub column: usize,
    pub matched_key: String,
    pub raw_value: String,
}

impl ScanFinding {
    /// 打印用的遮挡值：长值保留前 8 个字符，短值整体隐藏
    pub fn masked_value(&self) -> String {
        if self.raw_value.chars().count() > 12 {
            let head: String = self.raw_value.chars().take(8).collect();
            format!("{head}...")
        } else {
            "***".to_string()
        }
    }
}

/// 备份元数据，序列化为归档根目录下的 manifest.json
#[derive(Debug, Clone, Serialize)]
pub struct BackupManifest {
    pub version: String,
    pub created_at: String,
    pub hostname: String,
    pub username: String,
    pub platform: String,
    pub sanitized: bool,
    pub include_history: bool,
    pub source_dir: String,
    pub contents: BTreeMap<String, Vec<String>>,
    /// 仅供调用方展示，不写入 manifest.json
    #[serde(skip)]
    pub stats: BackupStats,
}

/// 缺失或无法读取而被跳过的条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Omission {
    pub relative_path: String,
    pub category: Category,
    pub reason: String,
}

/// 备份统计信息（便于 CLI 打印）
#[derive(Debug, Default, Clone)]
pub struct BackupStats {
    pub archive_path: PathBuf,
    pub files_written: usize,
    pub files_sanitized: usize,
    pub bytes_read: u64,
    pub omitted: Vec<Omission>,
}

/// `list` 的单条预览
#[derive(Debug, Clone)]
pub struct EntryPreview {
    pub entry: ManifestEntry,
    pub present: bool,
    pub size_bytes: u64,
    pub file_count: usize,
    /// 目录条目的直接子目录名（技能名、项目名等），已排序
    pub children: Vec<String>,
    /// 仅 installed_plugins.json：`plugins` 表中的插件数；文件缺失或格式不对时为 None
    pub plugin_count: Option<usize>,
}
