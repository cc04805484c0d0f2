//! 检测器集合：规则编译与单行匹配
use regex::Regex;
use std::path::Path;

use crate::error::{BackupError, Result};
use crate::prefilter::PrefilterPlan;
use crate::rules::{default_rule_specs, load_rule_specs, RuleKind, RuleSpec};

/// 单行内的一次命中（只记录值所在区间，键本身不动）
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LineMatch {
    pub(crate) rule: usize,
    pub(crate) start: usize,
    pub(crate) end: usize,
}

struct Detector {
    label: String,
    kind_priority: u8,
    re: Regex,
}

/// 编译后的检测器集合，扫描器与脱敏器共用
pub struct DetectorSet {
    detectors: Vec<Detector>,
    plan: PrefilterPlan,
}

impl DetectorSet {
    /// 从规则条目构建检测器集合；正则无法编译视为配置错误
    pub fn from_specs(specs: &[RuleSpec]) -> Result<Self> {
        let mut detectors = Vec::with_capacity(specs.len());
        for r in specs {
            let (pat, kind_priority) = match &r.kind {
                RuleKind::KeyValue { key } => (key_value_pattern(key), 0),
                RuleKind::Token { pattern } => (pattern.clone(), 1),
            };
            let re = Regex::new(&pat).map_err(|e| BackupError::InvalidRule {
                id: r.id.clone(),
                reason: e.to_string(),
            })?;
            detectors.push(Detector { label: r.label().to_string(), kind_priority, re });
        }
        let plan = PrefilterPlan::build(specs)?;
        Ok(Self { detectors, plan })
    }

    /// 内置默认规则
    pub fn builtin() -> Result<Self> {
        Self::from_specs(&default_rule_specs()?)
    }

    /// 指定了规则文件则加载该文件，否则使用内置默认规则
    pub fn load(rules_path: Option<&Path>) -> Result<Self> {
        match rules_path {
            Some(path) => Self::from_specs(&load_rule_specs(path)?),
            None => Self::builtin(),
        }
    }

    pub(crate) fn label(&self, rule: usize) -> &str {
        &self.detectors[rule].label
    }

    /// 对单行执行匹配，返回按起始偏移升序、互不重叠、且非占位符的命中。
    ///
    /// 重叠处理：键值对规则优先于令牌规则，其次更早的起点、更长的区间优先。
    pub(crate) fn match_line(&self, line: &str) -> Vec<LineMatch> {
        let mut raw: Vec<LineMatch> = Vec::new();
        for ri in self.plan.candidates(line) {
            let re = &self.detectors[ri].re;
            // 优先使用第一个参与匹配的捕获组作为“值”；无捕获组则退回整个匹配
            for caps in re.captures_iter(line) {
                let m = match caps.iter().skip(1).flatten().next() {
                    Some(m) => m,
                    None => match caps.get(0) {
                        Some(m) => m,
                        None => continue,
                    },
                };
                // 占位符要在重叠处理之前剔除，否则会遮住其内部的真实令牌
                if m.end() <= m.start() || is_placeholder(m.as_str()) {
                    continue;
                }
                raw.push(LineMatch { rule: ri, start: m.start(), end: m.end() });
            }
        }

        raw.sort_by(|a, b| {
            let pa = self.detectors[a.rule].kind_priority;
            let pb = self.detectors[b.rule].kind_priority;
            pa.cmp(&pb)
                .then(a.start.cmp(&b.start))
                .then((b.end - b.start).cmp(&(a.end - a.start)))
                .then(a.rule.cmp(&b.rule))
        });

        let mut accepted: Vec<LineMatch> = Vec::with_capacity(raw.len());
        for m in raw {
            if accepted.iter().any(|a| m.start < a.end && a.start < m.end) {
                continue;
            }
            accepted.push(m);
        }

        accepted.sort_by_key(|m| m.start);
        accepted
    }
}

/// 键值对规则的正则：
/// - JSON 形式 `"KEY": "value"`（值允许反斜杠转义）
/// - shell 形式 `KEY=value` / `KEY="value"` / `KEY='value'`，KEY 前不能紧跟标识符字符
fn key_value_pattern(key: &str) -> String {
    let k = regex::escape(key);
    format!(
        r#""{k}"\s*:\s*"((?:[^"\\]|\\.)+)"|(?:^|[^A-Za-z0-9_]){k}\s*=\s*(?:"((?:[^"\\]|\\.)+)"|'([^']+)'|([^\s"'#;]+))"#
    )
}

/// 看起来已经是占位符的值（`<...`、`...>`）不算敏感值
pub(crate) fn is_placeholder(value: &str) -> bool {
    value.starts_with('<') || value.ends_with('>')
}
