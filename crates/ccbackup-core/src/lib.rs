//! Claude Code 配置备份核心库
//!
//! 设计要点：
//! - 备份范围由静态清单（允许列表）决定，源目录中未登记的文件永远不会进入归档。
//! - 敏感信息识别基于规则文件中登记的键名与令牌格式，只是“已知模式”的检测，不保证穷尽。
//! - 脱敏只作用于内存副本，写入归档；源文件从不修改。
//! - 主机名、用户名、平台、时间由调用方以 RunContext 显式传入，核心逻辑不读取进程环境。
//!
//! 对外只暴露三个操作：`scan_source`、`list_entries`、`build`，展示层自行渲染结果。

mod archive;
mod catalog;
mod content;
mod detectors;
mod error;
mod findings;
mod host;
mod list;
mod options;
mod prefilter;
mod rules;
mod sanitize;
mod scan;
mod types;
mod walker;

pub use archive::{build, MANIFEST_NAME, MANIFEST_VERSION};
pub use catalog::{resolve, EXCLUDED};
pub use detectors::DetectorSet;
pub use error::{BackupError, Result};
pub use host::{HostInfo, RunContext};
pub use list::list_entries;
pub use options::BackupOptions;
pub use rules::{load_rule_specs, parse_rule_specs, RuleKind, RuleSpec, DEFAULT_RULES_TOML};
pub use sanitize::{sanitize, PLACEHOLDER};
pub use scan::{scan_source, scan_text};
pub use types::{
    BackupManifest, BackupStats, Category, EntryKind, EntryPreview, Group, ManifestEntry, Omission, ScanFinding,
};
