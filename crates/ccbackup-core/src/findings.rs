//! 命中项排序（内部使用）
use crate::types::ScanFinding;

/// 对单文件命中进行稳定排序：行号升序 → 行内位置升序 → 键名字典序
pub(crate) fn sort_findings_stable(findings: &mut [ScanFinding]) {
    findings.sort_by(|a, b| {
        a.line_number
            .cmp(&b.line_number)
            .then_with(|| a.column.cmp(&b.column))
            .then_with(|| a.matched_key.cmp(&b.matched_key))
    });
}
