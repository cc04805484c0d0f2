//! 规则文件加载（TOML）
use serde::Deserialize;
use std::path::Path;

use crate::error::{BackupError, Result};

/// 内置默认规则（编译期嵌入）
pub const DEFAULT_RULES_TOML: &str = include_str!("../rules/default.toml");

/// 单条规则的配置（key 为键值对规则；pattern 或 regex 为裸令牌规则）
#[derive(Debug, Clone, Deserialize)]
struct RuleEntry {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub regex: Option<String>,
}

/// 顶层规则文件结构
#[derive(Debug, Clone, Deserialize)]
struct RuleFile {
    #[serde(default)]
    pub rules: Vec<RuleEntry>,
}

/// 规则类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleKind {
    /// 键值对：保留键，仅替换值
    KeyValue { key: String },
    /// 裸令牌：整段命中即为值
    Token { pattern: String },
}

/// 归一化后的规则规格
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSpec {
    pub id: String,
    pub name: Option<String>,
    pub kind: RuleKind,
}

impl RuleSpec {
    /// 报告中使用的键名：键值对规则取键本身，令牌规则取 id
    pub fn label(&self) -> &str {
        match &self.kind {
            RuleKind::KeyValue { key } => key,
            RuleKind::Token { .. } => &self.id,
        }
    }
}

/// 从 TOML 规则文件加载并归一化为 RuleSpec 列表
pub fn load_rule_specs(path: &Path) -> Result<Vec<RuleSpec>> {
    let txt = std::fs::read_to_string(path).map_err(|source| BackupError::RuleFile {
        path: path.to_path_buf(),
        source,
    })?;
    parse_rule_specs(&txt)
}

/// 内置默认规则
pub fn default_rule_specs() -> Result<Vec<RuleSpec>> {
    parse_rule_specs(DEFAULT_RULES_TOML)
}

pub fn parse_rule_specs(txt: &str) -> Result<Vec<RuleSpec>> {
    let parsed: RuleFile = toml::from_str(txt)?;
    let mut out = Vec::with_capacity(parsed.rules.len());

    for e in parsed.rules {
        // key 优先；否则兼容 pattern / regex 两种字段名
        let kind = match (e.key, e.pattern, e.regex) {
            (Some(key), _, _) => {
                if key.is_empty() {
                    return Err(BackupError::InvalidRule { id: e.id, reason: "empty key".into() });
                }
                RuleKind::KeyValue { key }
            }
            (None, Some(p), _) | (None, None, Some(p)) => RuleKind::Token { pattern: p },
            (None, None, None) => {
                return Err(BackupError::InvalidRule {
                    id: e.id,
                    reason: "rule needs one of `key`, `pattern` or `regex`".into(),
                })
            }
        };
        out.push(RuleSpec { id: e.id, name: e.name, kind });
    }

    Ok(out)
}
