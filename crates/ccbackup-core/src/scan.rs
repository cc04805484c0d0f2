//! 敏感信息扫描
//!
//! 扫描只读取、不修改任何内容；规则是一份允许列表，只能识别已登记的键名和令牌格式，
//! 不能保证发现全部敏感信息。
use std::path::Path;

use tracing::{debug, warn};

use crate::catalog;
use crate::content::as_text;
use crate::detectors::DetectorSet;
use crate::error::{BackupError, Result};
use crate::findings::sort_findings_stable;
use crate::types::ScanFinding;
use crate::walker::expand_entry;

/// 扫描一段文本，返回按行号排序的命中；格式不合法的行直接跳过
pub fn scan_text(detectors: &DetectorSet, file_path: &str, text: &str) -> Vec<ScanFinding> {
    let mut findings = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        for m in detectors.match_line(line) {
            findings.push(ScanFinding {
                file_path: file_path.to_string(),
                line_number: idx + 1,
                column: m.start + 1,
                matched_key: detectors.label(m.rule).to_string(),
                raw_value: line[m.start..m.end].to_string(),
            });
        }
    }
    sort_findings_stable(&mut findings);
    findings
}

/// 扫描源目录中所有核心条目下的文本文件
/// 顺序：清单顺序 → 目录内路径顺序 → 行号
pub fn scan_source(source_root: &Path, detectors: &DetectorSet) -> Result<Vec<ScanFinding>> {
    if !source_root.is_dir() {
        return Err(BackupError::SourceNotFound(source_root.to_path_buf()));
    }

    let mut out = Vec::new();
    for entry in catalog::resolve(false) {
        let Some(files) = expand_entry(source_root, &entry) else {
            debug!(entry = entry.relative_path, "not present, nothing to scan");
            continue;
        };
        for file in files {
            let bytes = match std::fs::read(&file.path) {
                Ok(b) => b,
                Err(err) => {
                    warn!(path = %file.archive_name, error = %err, "cannot read file, skipping");
                    continue;
                }
            };
            if let Some(text) = as_text(&file.path, &bytes) {
                out.extend(scan_text(detectors, &file.archive_name, text));
            }
        }
    }
    Ok(out)
}
