//! 运行上下文：主机名、用户名、平台与本次运行的起始时间。
//!
//! 这些值只在入口处采集一次，再显式传入归档构建，核心逻辑不读取进程环境。
use chrono::{DateTime, Local};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    pub hostname: String,
    pub username: String,
    pub platform: String,
}

impl HostInfo {
    /// 构造并规范化（用于文件名）
    pub fn new(hostname: &str, username: &str, platform: &str) -> Self {
        let short = hostname.split('.').next().unwrap_or_default();
        Self {
            hostname: filename_safe(short),
            username: filename_safe(username),
            platform: platform.to_string(),
        }
    }

    /// 采集当前机器信息；任何一项获取失败都以 "unknown" 代替
    pub fn detect() -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_default();
        let username = whoami::username();
        Self::new(&hostname, &username, platform_name(std::env::consts::OS))
    }
}

#[derive(Debug, Clone)]
pub struct RunContext {
    pub host: HostInfo,
    pub started_at: DateTime<Local>,
}

impl RunContext {
    pub fn new(host: HostInfo, started_at: DateTime<Local>) -> Self {
        Self { host, started_at }
    }

    pub fn detect() -> Self {
        Self::new(HostInfo::detect(), Local::now())
    }

    /// `ccbackup_<hostname>_<username>_<YYYYMMDD_HHMMSS>.zip`
    pub fn archive_file_name(&self) -> String {
        format!(
            "ccbackup_{}_{}_{}.zip",
            self.host.hostname,
            self.host.username,
            self.started_at.format("%Y%m%d_%H%M%S")
        )
    }
}

/// 与常见 `uname -s` 风格一致的平台名
fn platform_name(os: &str) -> &str {
    match os {
        "linux" => "Linux",
        "macos" => "Darwin",
        "windows" => "Windows",
        other => other,
    }
}

/// 仅保留 `[A-Za-z0-9_-]`，其余字符替换为 `_`；空值记为 unknown
fn filename_safe(s: &str) -> String {
    if s.is_empty() {
        return "unknown".to_string();
    }
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}
