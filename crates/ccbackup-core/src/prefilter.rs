//! 行级预筛（Aho-Corasick）
//!
//! 从每条规则中抽取“锚点”字面量（键名或令牌前缀），构建一个全局 AC 自动机。
//! 扫描时先在整行上跑 AC，只对命中锚点的规则执行精准正则；
//! 抽取不到可靠锚点的规则每行都要执行。

use std::collections::{BTreeSet, HashMap};
use std::iter::Peekable;
use std::str::Chars;

use aho_corasick::AhoCorasick;

use crate::error::{BackupError, Result};
use crate::rules::{RuleKind, RuleSpec};

/// 锚点最短长度，过短的字面量几乎每行都会命中
const MIN_ANCHOR_LEN: usize = 3;

pub(crate) struct PrefilterPlan {
    /// 全局锚点自动机；没有任何锚点时为 None
    ac: Option<AhoCorasick>,
    /// 锚点索引 -> 规则索引列表
    anchor_to_rules: Vec<Vec<usize>>,
    /// 无锚点规则，每行都需执行
    unanchored: Vec<usize>,
}

impl PrefilterPlan {
    pub(crate) fn build(specs: &[RuleSpec]) -> Result<Self> {
        let mut anchors: Vec<String> = Vec::new();
        let mut anchor_index: HashMap<String, usize> = HashMap::new();
        let mut anchor_to_rules: Vec<Vec<usize>> = Vec::new();
        let mut unanchored = Vec::new();

        for (idx, spec) in specs.iter().enumerate() {
            let anchor = match &spec.kind {
                RuleKind::KeyValue { key } => Some(key.clone()),
                RuleKind::Token { pattern } => extract_anchor_from_pattern(pattern),
            };
            let Some(anchor) = anchor else {
                unanchored.push(idx);
                continue;
            };
            let id = *anchor_index.entry(anchor.clone()).or_insert_with(|| {
                anchors.push(anchor);
                anchor_to_rules.push(Vec::new());
                anchors.len() - 1
            });
            anchor_to_rules[id].push(idx);
        }

        let ac = if anchors.is_empty() {
            None
        } else {
            // Standard 匹配语义才支持 overlapping 查找（键名可能互为子串，如 token / ANTHROPIC_AUTH_TOKEN）
            let ac = AhoCorasick::new(&anchors).map_err(|e| BackupError::InvalidRule {
                id: "<prefilter>".into(),
                reason: e.to_string(),
            })?;
            Some(ac)
        };

        Ok(Self { ac, anchor_to_rules, unanchored })
    }

    /// 返回该行需要执行的规则索引（升序，即规则文件中的顺序）
    pub(crate) fn candidates(&self, line: &str) -> Vec<usize> {
        let mut set: BTreeSet<usize> = self.unanchored.iter().copied().collect();
        if let Some(ac) = &self.ac {
            for m in ac.find_overlapping_iter(line) {
                if let Some(rules) = self.anchor_to_rules.get(m.pattern().as_usize()) {
                    set.extend(rules.iter().copied());
                }
            }
        }
        set.into_iter().collect()
    }
}

/// 从令牌正则中抽取一个必然出现的字面量（启发式，宁缺毋滥）：
/// - 含交替 `|` 或内联标志 `(?` 的模式不抽取；
/// - 只收集分组外、字符类外的连续字面量；
/// - 量词 `?` `*` `{n,m}` 修饰的最后一个字符不算必然出现，`{...}` 内的数字不是字面量；
/// - `\x41`、`\u{..}`、`\p{..}` 之类的转义整体视为断点；
/// - 取最长的一段，长度不足 MIN_ANCHOR_LEN 则放弃。
fn extract_anchor_from_pattern(pat: &str) -> Option<String> {
    if pat.contains('|') || pat.contains("(?") {
        return None;
    }

    let mut best = String::new();
    let mut cur = String::new();
    let mut depth = 0usize;
    let mut in_class = false;
    let mut chars = pat.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_class {
            match ch {
                '\\' => {
                    if let Some(esc) = chars.next() {
                        skip_escape_payload(esc, &mut chars);
                    }
                }
                ']' => in_class = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '[' => {
                flush(&mut cur, &mut best);
                in_class = true;
            }
            '(' => {
                flush(&mut cur, &mut best);
                depth += 1;
            }
            ')' => {
                depth = depth.saturating_sub(1);
            }
            '?' | '*' => {
                // 前一个字符可选
                cur.pop();
                flush(&mut cur, &mut best);
            }
            '{' => {
                // 重复次数可能为 0；跳过整个 {n,m}
                cur.pop();
                flush(&mut cur, &mut best);
                skip_braced(&mut chars);
            }
            '\\' => match chars.next() {
                Some(esc) if esc.is_ascii_punctuation() && depth == 0 => cur.push(esc),
                Some(esc) => {
                    skip_escape_payload(esc, &mut chars);
                    flush(&mut cur, &mut best);
                }
                None => flush(&mut cur, &mut best),
            },
            c if depth == 0 && (c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/')) => {
                cur.push(c)
            }
            _ => flush(&mut cur, &mut best),
        }
    }
    flush(&mut cur, &mut best);

    (best.len() >= MIN_ANCHOR_LEN).then_some(best)
}

/// 跳过转义字母之后的附带部分：`\x41` / `\u00e9` / `\U0001F600` 的十六进制位，
/// `\pL` 的单字母类名，以及任意 `{...}` 块
fn skip_escape_payload(esc: char, chars: &mut Peekable<Chars<'_>>) {
    if chars.peek() == Some(&'{') {
        chars.next();
        skip_braced(chars);
        return;
    }
    let width = match esc {
        'x' => 2,
        'u' => 4,
        'U' => 8,
        'p' | 'P' => 1,
        _ => 0,
    };
    for _ in 0..width {
        match chars.peek() {
            Some(c) if esc.eq_ignore_ascii_case(&'p') || c.is_ascii_hexdigit() => {
                chars.next();
            }
            _ => break,
        }
    }
}

/// 已读过 `{`，跳到对应的 `}`（含）
fn skip_braced(chars: &mut Peekable<Chars<'_>>) {
    for c in chars.by_ref() {
        if c == '}' {
            break;
        }
    }
}

fn flush(cur: &mut String, best: &mut String) {
    if cur.len() > best.len() {
        *best = cur.clone();
    }
    cur.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(id: &str, pattern: &str) -> RuleSpec {
        RuleSpec { id: id.into(), name: None, kind: RuleKind::Token { pattern: pattern.into() } }
    }

    fn key(k: &str) -> RuleSpec {
        RuleSpec { id: k.into(), name: None, kind: RuleKind::KeyValue { key: k.into() } }
    }

    #[test]
    fn anchor_from_token_prefix() {
        assert_eq!(extract_anchor_from_pattern(r"sk-ant-[A-Za-z0-9_\-]+").as_deref(), Some("sk-ant-"));
        assert_eq!(extract_anchor_from_pattern(r"ghp_[A-Za-z0-9]{36}").as_deref(), Some("ghp_"));
    }

    #[test]
    fn optional_chars_are_not_anchors() {
        // c 可选，最长必然字面量只有 "ab"，不足长度
        assert_eq!(extract_anchor_from_pattern(r"abc?d"), None);
        assert_eq!(extract_anchor_from_pattern(r"x(prefix)?[0-9]+"), None);
        assert_eq!(extract_anchor_from_pattern(r"(?i)secret"), None);
        assert_eq!(extract_anchor_from_pattern(r"foo_[0-9]+|bar_[0-9]+"), None);
    }

    #[test]
    fn escape_payloads_are_not_literals() {
        assert_eq!(extract_anchor_from_pattern(r"\x41BCDEF-[0-9]+").as_deref(), Some("BCDEF-"));
        assert_eq!(extract_anchor_from_pattern(r"\x{41}BCDEF-[0-9]+").as_deref(), Some("BCDEF-"));
        assert_eq!(extract_anchor_from_pattern(r"\u00e9tok_\d+").as_deref(), Some("tok_"));
        assert_eq!(extract_anchor_from_pattern(r"\p{Greek}key_[a-z]+").as_deref(), Some("key_"));
        assert_eq!(extract_anchor_from_pattern(r"\pLkey_[a-z]+").as_deref(), Some("key_"));
    }

    #[test]
    fn repetition_counts_are_not_literals() {
        assert_eq!(extract_anchor_from_pattern(r"ab[0-9]{1000}"), None);
        assert_eq!(extract_anchor_from_pattern(r"[a-z]{2,40}xoxb-[0-9]+").as_deref(), Some("xoxb-"));
        // x 可以出现 0 次
        assert_eq!(extract_anchor_from_pattern(r"abcx{0,3}"), Some("abc".into()));
    }

    #[test]
    fn escaped_anchor_still_selects_its_rule() {
        let specs = vec![token("letters", r"\x41BCDEF-[0-9]+")];
        let plan = PrefilterPlan::build(&specs).unwrap();
        assert_eq!(plan.candidates("leak ABCDEF-123"), vec![0]);
        assert!(plan.candidates("nothing here").is_empty());
    }

    #[test]
    fn candidates_follow_anchors() {
        let specs = vec![key("token"), key("ANTHROPIC_AUTH_TOKEN"), token("t", r"sk-ant-[a-z]+"), token("u", r"\d{8}")];
        let plan = PrefilterPlan::build(&specs).unwrap();

        // 无锚点规则（索引 3）总是候选
        assert_eq!(plan.candidates("nothing here"), vec![3]);
        assert_eq!(plan.candidates(r#""token": "x""#), vec![0, 3]);
        assert_eq!(plan.candidates("sk-ant-abc"), vec![2, 3]);
    }
}
