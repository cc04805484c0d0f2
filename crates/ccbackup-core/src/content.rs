//! 文件内容分类：可脱敏的文本 / 原样复制的二进制
use std::path::Path;

/// 可识别的文本配置扩展名，只有这些文件会被扫描和脱敏
const TEXT_EXTENSIONS: [&str; 9] = ["json", "jsonl", "md", "txt", "toml", "yaml", "yml", "env", "sh"];

pub(crate) fn has_text_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| TEXT_EXTENSIONS.iter().any(|t| t.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// 若文件扩展名可识别、内容不像二进制且是合法 UTF-8，则返回文本；否则返回 None，调用方按原字节处理
pub(crate) fn as_text<'a>(path: &Path, bytes: &'a [u8]) -> Option<&'a str> {
    if !has_text_extension(path) || is_probably_binary(bytes) {
        return None;
    }
    std::str::from_utf8(bytes).ok()
}

/// 判定缓冲区是否“明显是二进制”
/// 策略（保守，尽量不误杀文本）：
/// - 只要包含任何 NUL 字节（0x00）即认为二进制；
/// - 否则计算可打印字节比例（包含 tab/CR/LF 与 UTF-8 多字节），低于 25% 则认为二进制。
fn is_probably_binary(buf: &[u8]) -> bool {
    if buf.is_empty() {
        return false;
    }
    if buf.contains(&0) {
        return true;
    }
    let printable = buf
        .iter()
        .filter(|&&b| matches!(b, 0x09 | 0x0A | 0x0D) || (0x20..=0x7E).contains(&b) || b >= 0x80)
        .count();
    let ratio = printable as f32 / (buf.len() as f32);
    ratio < 0.25
}
