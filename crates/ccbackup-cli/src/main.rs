use anyhow::{Context, Result};
use ccbackup_core::{
    build, list_entries, scan_source, BackupManifest, BackupOptions, Category, DetectorSet, EntryKind, EntryPreview,
    Group, RunContext, ScanFinding, EXCLUDED,
};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// 默认输出目录（相对当前工作目录）
const BACKUP_DIR: &str = "backups";

/// 命令行入口（基于 clap）
#[derive(Parser, Debug)]
#[command(name = "ccbackup", version, about = "Claude Code 配置备份工具")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// 源目录，默认 ~/.claude
    #[arg(long, env = "CCBACKUP_SOURCE_DIR")]
    source: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 扫描核心配置中的敏感信息（不创建备份）
    Scan {
        #[command(flatten)]
        source: SourceArgs,

        /// 规则文件路径（TOML），默认使用内置规则
        #[arg(long)]
        rules: Option<PathBuf>,
    },

    /// 预览将被备份的内容
    List {
        #[command(flatten)]
        source: SourceArgs,

        /// 同时列出 history.jsonl 与 projects/
        #[arg(long)]
        include_history: bool,
    },

    /// 创建 ZIP 备份
    Backup {
        #[command(flatten)]
        source: SourceArgs,

        /// 输出文件，默认 backups/ccbackup_<hostname>_<user>_<timestamp>.zip
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 用占位符替换敏感值
        #[arg(long)]
        sanitize: bool,

        /// 包含 history.jsonl 与 projects/
        #[arg(long)]
        include_history: bool,

        /// 规则文件路径（TOML），默认使用内置规则
        #[arg(long)]
        rules: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // 初始化日志（支持通过 RUST_LOG 控制等级，例如 info、debug）
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { source, rules } => {
            let source = resolve_source(source)?;
            let detectors = DetectorSet::load(rules.as_deref()).context("load rules")?;
            info!(?source, "starting scan");

            let findings = scan_source(&source, &detectors).context("scan failed")?;
            print_findings(&findings);
        }
        Commands::List { source, include_history } => {
            let source = resolve_source(source)?;
            let previews = list_entries(&source, include_history).context("list failed")?;
            print_previews(&source, &previews);
        }
        Commands::Backup { source, output, sanitize, include_history, rules } => {
            let source = resolve_source(source)?;
            let detectors = DetectorSet::load(rules.as_deref()).context("load rules")?;
            // 主机信息与时间只在这里采集一次
            let ctx = RunContext::detect();
            let output = output.unwrap_or_else(|| Path::new(BACKUP_DIR).join(ctx.archive_file_name()));

            println!("Source:  {}", source.display());
            println!("Host:    {} | User: {}", ctx.host.hostname, ctx.host.username);
            println!("Output:  {}", output.display());
            println!("Include history: {include_history}");
            println!("Sanitize secrets: {sanitize}");

            if !sanitize {
                let findings = scan_source(&source, &detectors).context("scan failed")?;
                if !findings.is_empty() {
                    warn!(count = findings.len(), "sensitive values detected; use --sanitize to mask them");
                }
            }

            let opts = BackupOptions { sanitize, include_history };
            let manifest = build(&source, &output, opts, &ctx, &detectors)
                .with_context(|| format!("backup to {} failed", output.display()))?;
            print_summary(&manifest);
        }
    }

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// 源目录：参数 / 环境变量优先，否则 ~/.claude
fn resolve_source(args: SourceArgs) -> Result<PathBuf> {
    match args.source {
        Some(p) => Ok(p),
        None => {
            let home = dirs::home_dir().context("cannot determine home directory")?;
            Ok(home.join(".claude"))
        }
    }
}

fn print_findings(findings: &[ScanFinding]) {
    if findings.is_empty() {
        println!("No sensitive information detected");
        return;
    }
    println!("Sensitive information found:");
    let mut current: Option<&str> = None;
    for f in findings {
        if current != Some(f.file_path.as_str()) {
            println!("\n  {}:", f.file_path);
            current = Some(f.file_path.as_str());
        }
        println!("      • line {}: {} = {}", f.line_number, f.matched_key, f.masked_value());
    }
    println!("\nTip: use `ccbackup backup --sanitize` to replace these with placeholders");
}

fn print_previews(source: &Path, previews: &[EntryPreview]) {
    println!("Source: {}", source.display());
    let mut current: Option<Group> = None;
    for p in previews {
        if current != Some(p.entry.group) {
            let title = match p.entry.group {
                Group::Core => "Core Configuration",
                Group::Plugins => "Plugin Configuration",
                Group::History => "History Data (optional)",
            };
            println!("\n{title}:");
            current = Some(p.entry.group);
        }
        let mark = if p.present { "✓" } else { "✗" };
        let size = match (p.present, p.entry.kind) {
            (false, _) => String::new(),
            (true, EntryKind::File) => match p.plugin_count {
                Some(n) => format!(" ({:.1} KB, {n} plugins)", p.size_bytes as f64 / 1024.0),
                None => format!(" ({:.1} KB)", p.size_bytes as f64 / 1024.0),
            },
            (true, EntryKind::Directory) => {
                format!(" ({} files, {:.2} MB)", p.file_count, p.size_bytes as f64 / (1024.0 * 1024.0))
            }
        };
        println!("  {mark} {} - {}{size}", p.entry.display_path(), p.entry.description);
        for child in &p.children {
            println!("      └─ {child}/");
        }
    }
    println!("\nNever backed up: {}", EXCLUDED.join(", "));
}

fn print_summary(manifest: &BackupManifest) {
    let stats = &manifest.stats;
    for o in &stats.omitted {
        let tier = match o.category {
            Category::Core => "core",
            Category::Optional => "optional",
        };
        println!("  skipped ({tier}): {} - {}", o.relative_path, o.reason);
    }
    for (group, paths) in &manifest.contents {
        println!("  {group}: {}", if paths.is_empty() { "-".to_string() } else { paths.join(", ") });
    }
    println!(
        "Backup saved to: {} ({} files, {} sanitized)",
        stats.archive_path.display(),
        stats.files_written,
        stats.files_sanitized
    );
    if !manifest.sanitized {
        println!("This backup may contain sensitive information. Store it securely!");
    }
}
