//! 备份选项
#[derive(Debug, Clone, Copy, Default)]
pub struct BackupOptions {
    /// 将文本文件中的敏感值替换为占位符后再写入归档
    pub sanitize: bool,
    /// 额外备份 history.jsonl 与 projects/
    pub include_history: bool,
}
