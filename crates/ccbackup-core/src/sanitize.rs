//! 脱敏：保留键与标点，仅把值替换为固定占位符
use crate::detectors::DetectorSet;

/// 固定占位符；本身不会被任何规则当作敏感值，保证脱敏幂等
pub const PLACEHOLDER: &str = "<YOUR_KEY>";

/// 对文本逐行脱敏，未命中的行与换行符原样保留。
/// 只处理内存中的副本，从不写回源文件。
pub fn sanitize(detectors: &DetectorSet, text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let matches = detectors.match_line(line);
        if matches.is_empty() {
            out.push_str(line);
            continue;
        }
        let mut last = 0;
        for m in matches {
            out.push_str(&line[last..m.start]);
            out.push_str(PLACEHOLDER);
            last = m.end;
        }
        out.push_str(&line[last..]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ds() -> DetectorSet {
        DetectorSet::builtin().unwrap()
    }

    #[test]
    fn replaces_value_and_keeps_key() {
        let input = "{\n  \"env\": {\n    \"ANTHROPIC_AUTH_TOKEN\": \"sk-abc123\",\n    \"MODEL\": \"opus\"\n  }\n}\n";
        let expected = "{\n  \"env\": {\n    \"ANTHROPIC_AUTH_TOKEN\": \"<YOUR_KEY>\",\n    \"MODEL\": \"opus\"\n  }\n}\n";
        assert_eq!(sanitize(&ds(), input), expected);
    }

    #[test]
    fn multiple_values_on_one_line() {
        let input = r#"{"api_key": "k1", "secret": "s2", "name": "x"}"#;
        assert_eq!(
            sanitize(&ds(), input),
            r#"{"api_key": "<YOUR_KEY>", "secret": "<YOUR_KEY>", "name": "x"}"#
        );
    }

    #[test]
    fn bare_token_and_shell_forms() {
        let input = "export ANTHROPIC_API_KEY='abc'\r\nnote: sk-ant-XYZ_1 leaked\r\nbark_key=zzz # push\r\n";
        let expected = "export ANTHROPIC_API_KEY='<YOUR_KEY>'\r\nnote: <YOUR_KEY> leaked\r\nbark_key=<YOUR_KEY> # push\r\n";
        assert_eq!(sanitize(&ds(), input), expected);
    }

    #[test]
    fn token_behind_angle_bracket_is_still_redacted() {
        let ds = ds();
        let input = r#""token": "<sk-ant-api03-REALSECRET""#;
        let once = sanitize(&ds, input);
        assert_eq!(once, r#""token": "<<YOUR_KEY>""#);
        assert!(!once.contains("REALSECRET"));
        assert_eq!(sanitize(&ds, &once), once);
    }

    #[test]
    fn idempotent() {
        let ds = ds();
        let inputs = [
            r#"{"token": "abc", "apiKey": "sk-ant-123"}"#,
            "secret=\"x\\\"y\"\nplain line\n",
            "no secrets at all",
            "",
            "token=<already> sk-ant-a",
        ];
        for input in inputs {
            let once = sanitize(&ds, input);
            assert_eq!(sanitize(&ds, &once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn text_without_matches_is_unchanged() {
        let input = "# CLAUDE.md\n\nAlways write tests.\n";
        assert_eq!(sanitize(&ds(), input), input);
    }
}
