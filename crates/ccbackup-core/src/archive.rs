//! 归档构建：按清单收集文件、可选脱敏、写入 ZIP，最后写入 manifest.json
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, ErrorKind, Seek, Write};
use std::path::Path;

use chrono::{Datelike, Timelike};
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::catalog;
use crate::content::as_text;
use crate::detectors::DetectorSet;
use crate::error::{BackupError, Result};
use crate::host::RunContext;
use crate::options::BackupOptions;
use crate::sanitize::sanitize;
use crate::types::{BackupManifest, BackupStats, Category, EntryKind, Omission};
use crate::walker::expand_entry;

/// manifest.json 的格式版本
pub const MANIFEST_VERSION: &str = "1.0.0";
/// 归档根目录下的元数据文件名
pub const MANIFEST_NAME: &str = "manifest.json";

/// 构建一次备份并返回写入归档的元数据。
///
/// 前置条件（源目录存在、输出目录可创建、归档可独占创建）不满足时直接报错，不留下任何文件；
/// 清单条目缺失只记录日志并跳过。归档创建后若写入失败，会删除半成品再返回错误。
pub fn build(
    source_root: &Path,
    output_path: &Path,
    opts: BackupOptions,
    ctx: &RunContext,
    detectors: &DetectorSet,
) -> Result<BackupManifest> {
    build_with(source_root, output_path, opts, ctx, detectors, BufWriter::new)
}

/// `wrap` 决定归档文件外层的写入器
fn build_with<W, F>(
    source_root: &Path,
    output_path: &Path,
    opts: BackupOptions,
    ctx: &RunContext,
    detectors: &DetectorSet,
    wrap: F,
) -> Result<BackupManifest>
where
    W: Write + Seek,
    F: FnOnce(File) -> W,
{
    if !source_root.is_dir() {
        return Err(BackupError::SourceNotFound(source_root.to_path_buf()));
    }

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| BackupError::OutputDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let file = open_archive(output_path)?;

    info!(source = %source_root.display(), output = %output_path.display(), sanitize = opts.sanitize, include_history = opts.include_history, "starting backup");

    match write_archive(wrap(file), source_root, opts, ctx, detectors) {
        Ok(mut manifest) => {
            manifest.stats.archive_path = output_path.to_path_buf();
            info!(files_written = manifest.stats.files_written, files_sanitized = manifest.stats.files_sanitized, omitted = manifest.stats.omitted.len(), "backup finished");
            Ok(manifest)
        }
        Err(err) => {
            if let Err(rm) = std::fs::remove_file(output_path) {
                warn!(output = %output_path.display(), error = %rm, "cannot remove incomplete archive");
            }
            Err(err)
        }
    }
}

/// 独占创建归档文件：同名文件已存在时拒绝覆盖，目标是目录时直接报错
fn open_archive(output_path: &Path) -> Result<File> {
    if output_path.is_dir() {
        return Err(BackupError::ArchiveCreate {
            path: output_path.to_path_buf(),
            source: io::Error::other("output path is a directory"),
        });
    }
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(output_path)
        .map_err(|source| match source.kind() {
            ErrorKind::AlreadyExists => BackupError::ArchiveExists(output_path.to_path_buf()),
            _ => BackupError::ArchiveCreate { path: output_path.to_path_buf(), source },
        })
}

fn write_archive<W: Write + Seek>(
    writer: W,
    source_root: &Path,
    opts: BackupOptions,
    ctx: &RunContext,
    detectors: &DetectorSet,
) -> Result<BackupManifest> {
    let mut zip = ZipWriter::new(writer);
    let file_opts = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip_timestamp(ctx))
        .unix_permissions(0o644);

    let entries = catalog::resolve(opts.include_history);
    let mut contents: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for e in &entries {
        contents.entry(e.group.as_str().to_string()).or_default();
    }
    let mut stats = BackupStats::default();

    for entry in &entries {
        let Some(files) = expand_entry(source_root, entry) else {
            record_omission(&mut stats, entry.relative_path, entry.category, "not found");
            continue;
        };
        if files.is_empty() {
            record_omission(&mut stats, entry.relative_path, entry.category, "empty directory");
            continue;
        }

        let mut written = 0usize;
        for f in files {
            let bytes = match std::fs::read(&f.path) {
                Ok(b) => b,
                Err(err) => {
                    record_omission(&mut stats, &f.archive_name, entry.category, &format!("unreadable: {err}"));
                    continue;
                }
            };
            stats.bytes_read += bytes.len() as u64;

            // 只有可识别的文本才脱敏，其余原样写入
            let redacted = match (opts.sanitize, as_text(&f.path, &bytes)) {
                (true, Some(text)) => {
                    let clean = sanitize(detectors, text);
                    (clean != text).then_some(clean)
                }
                _ => None,
            };

            zip.start_file(f.archive_name.as_str(), file_opts)?;
            match &redacted {
                Some(clean) => {
                    zip.write_all(clean.as_bytes())?;
                    stats.files_sanitized += 1;
                    debug!(file = %f.archive_name, "added (sanitized)");
                }
                None => {
                    zip.write_all(&bytes)?;
                    debug!(file = %f.archive_name, size = f.size, "added");
                }
            }
            written += 1;
        }

        if written > 0 {
            stats.files_written += written;
            contents.entry(entry.group.as_str().to_string()).or_default().push(entry.display_path());
            match entry.kind {
                EntryKind::File => info!(entry = entry.relative_path, "backed up"),
                EntryKind::Directory => info!(entry = entry.relative_path, files = written, "backed up"),
            }
        }
    }

    let manifest = BackupManifest {
        version: MANIFEST_VERSION.to_string(),
        created_at: ctx.started_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, false),
        hostname: ctx.host.hostname.clone(),
        username: ctx.host.username.clone(),
        platform: ctx.host.platform.clone(),
        sanitized: opts.sanitize,
        include_history: opts.include_history,
        source_dir: source_root.display().to_string(),
        contents,
        stats,
    };

    // manifest.json 最后写入，反映实际写入的内容
    zip.start_file(MANIFEST_NAME, file_opts)?;
    zip.write_all(&serde_json::to_vec_pretty(&manifest)?)?;
    let mut out = zip.finish()?;
    out.flush()?;

    Ok(manifest)
}

fn record_omission(stats: &mut BackupStats, path: &str, category: Category, reason: &str) {
    match category {
        Category::Core => warn!(entry = path, reason, "core entry skipped"),
        Category::Optional => info!(entry = path, reason, "optional entry skipped"),
    }
    stats.omitted.push(Omission { relative_path: path.to_string(), category, reason: reason.to_string() });
}

/// ZIP 条目时间统一取本次运行起始时间，使相同输入得到相同归档；超出 DOS 时间范围时退回 1980-01-01
fn zip_timestamp(ctx: &RunContext) -> zip::DateTime {
    let t = &ctx.started_at;
    zip::DateTime::from_date_and_time(
        u16::try_from(t.year()).unwrap_or(1980),
        t.month() as u8,
        t.day() as u8,
        t.hour() as u8,
        t.minute() as u8,
        t.second() as u8,
    )
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostInfo;
    use chrono::{Local, TimeZone};
    use std::fs;
    use std::io::{Cursor, Read, SeekFrom};
    use tempfile::TempDir;

    /// 写满 `budget` 字节后开始报错的写入器，模拟磁盘写满
    struct FullDisk<W> {
        inner: W,
        budget: usize,
    }

    impl<W: Write> Write for FullDisk<W> {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.budget == 0 {
                return Err(io::Error::other("no space left on device"));
            }
            let n = buf.len().min(self.budget);
            let n = self.inner.write(&buf[..n])?;
            self.budget -= n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            self.inner.flush()
        }
    }

    impl<W: Seek> Seek for FullDisk<W> {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    fn ctx() -> RunContext {
        RunContext::new(
            HostInfo::new("host", "user", "Linux"),
            Local.with_ymd_and_hms(2026, 10, 15, 9, 30, 0).unwrap(),
        )
    }

    fn read_entry(path: &Path, name: &str) -> String {
        let mut zip = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        let mut s = String::new();
        zip.by_name(name).unwrap().read_to_string(&mut s).unwrap();
        s
    }

    #[test]
    fn existing_archive_is_not_overwritten() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let path = out.path().join("taken.zip");
        fs::write(&path, b"previous").unwrap();

        let ds = DetectorSet::builtin().unwrap();
        let err = build(src.path(), &path, BackupOptions::default(), &ctx(), &ds).unwrap_err();
        assert!(matches!(err, BackupError::ArchiveExists(_)));
        assert_eq!(fs::read(&path).unwrap(), b"previous");
    }

    #[test]
    fn missing_source_creates_nothing() {
        let out = TempDir::new().unwrap();
        let path = out.path().join("nested/out.zip");
        let ds = DetectorSet::builtin().unwrap();
        let err = build(Path::new("/no/such/source"), &path, BackupOptions::default(), &ctx(), &ds).unwrap_err();
        assert!(matches!(err, BackupError::SourceNotFound(_)));
        assert!(!path.exists());
        assert!(!out.path().join("nested").exists());
    }

    #[test]
    fn unwritable_output_directory_is_fatal() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        // 父路径是普通文件，无法创建目录
        fs::write(out.path().join("blocker"), b"").unwrap();
        let path = out.path().join("blocker/sub/out.zip");
        let ds = DetectorSet::builtin().unwrap();
        let err = build(src.path(), &path, BackupOptions::default(), &ctx(), &ds).unwrap_err();
        assert!(matches!(err, BackupError::OutputDir { .. }));
    }

    #[test]
    fn output_path_that_is_a_directory_is_rejected() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let target = out.path().join("backups");
        fs::create_dir(&target).unwrap();
        let ds = DetectorSet::builtin().unwrap();

        let err = build(src.path(), &target, BackupOptions::default(), &ctx(), &ds).unwrap_err();
        assert!(matches!(err, BackupError::ArchiveCreate { .. }));
        assert!(err.to_string().contains("is a directory"));
        assert!(target.is_dir());
        assert_eq!(fs::read_dir(&target).unwrap().count(), 0);
    }

    #[test]
    fn write_failure_is_reported() {
        let src = TempDir::new().unwrap();
        fs::write(src.path().join("CLAUDE.md"), "# rules\n".repeat(64)).unwrap();
        let ds = DetectorSet::builtin().unwrap();

        let sink = FullDisk { inner: Cursor::new(Vec::new()), budget: 32 };
        let result = write_archive(sink, src.path(), BackupOptions::default(), &ctx(), &ds);
        assert!(result.is_err());
    }

    #[test]
    fn failed_write_removes_partial_archive() {
        let src = TempDir::new().unwrap();
        fs::write(src.path().join("CLAUDE.md"), "# rules\n".repeat(64)).unwrap();
        fs::write(src.path().join("settings.json"), "{\"token\": \"abc\"}\n").unwrap();
        let out = TempDir::new().unwrap();
        let path = out.path().join("partial.zip");
        let ds = DetectorSet::builtin().unwrap();

        let err = build_with(src.path(), &path, BackupOptions::default(), &ctx(), &ds, |file| FullDisk {
            inner: file,
            budget: 64,
        })
        .unwrap_err();
        assert!(matches!(err, BackupError::Io(_) | BackupError::Archive(_)));
        assert!(!path.exists());
    }

    #[test]
    fn empty_source_still_produces_manifest() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let path = out.path().join("empty.zip");
        let ds = DetectorSet::builtin().unwrap();

        let manifest = build(src.path(), &path, BackupOptions::default(), &ctx(), &ds).unwrap();
        assert_eq!(manifest.stats.files_written, 0);
        assert_eq!(manifest.stats.omitted.len(), 5);
        assert_eq!(manifest.contents["core"], Vec::<String>::new());

        let json: serde_json::Value = serde_json::from_str(&read_entry(&path, MANIFEST_NAME)).unwrap();
        assert_eq!(json["hostname"], "host");
        assert_eq!(json["platform"], "Linux");
        assert_eq!(json["version"], MANIFEST_VERSION);
        assert!(json["created_at"].as_str().unwrap().starts_with("2026-10-15T09:30:00"));
    }

    #[test]
    fn binary_files_are_copied_verbatim_when_sanitizing() {
        let src = TempDir::new().unwrap();
        fs::create_dir_all(src.path().join("skills/s")).unwrap();
        let blob = b"token=abc\0\x01\x02";
        fs::write(src.path().join("skills/s/data.json"), blob).unwrap();
        let out = TempDir::new().unwrap();
        let path = out.path().join("b.zip");
        let ds = DetectorSet::builtin().unwrap();

        let opts = BackupOptions { sanitize: true, include_history: false };
        let manifest = build(src.path(), &path, opts, &ctx(), &ds).unwrap();
        assert_eq!(manifest.stats.files_sanitized, 0);

        let mut zip = zip::ZipArchive::new(File::open(&path).unwrap()).unwrap();
        let mut raw = Vec::new();
        zip.by_name("skills/s/data.json").unwrap().read_to_end(&mut raw).unwrap();
        assert_eq!(raw, blob);
    }
}
