//! 版本号升级：在清单列出的每个文件中改写第一处 `KEY: "x.y.z"` / `KEY = 'x.y.z'`

use std::{
    fs,
    path::{Path, PathBuf},
};

use regex::{Captures, Regex};
use semver::{BuildMetadata, Prerelease, Version};
use tracing::info;

use crate::{config::Project, error::ForgeError};

/// 升级幅度，缺省为 patch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Severity {
    #[default]
    Patch,
    Minor,
    Major,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BumpResult {
    pub(crate) path: PathBuf,
    pub(crate) from: Version,
    pub(crate) to: Version,
}

/// 预发布版本先“转正”：1.2.3-beta 的 patch 升级结果是 1.2.3
pub(crate) fn bump_version(v: &Version, severity: Severity) -> Version {
    let mut next = v.clone();
    let pre = !v.pre.is_empty();
    match severity {
        Severity::Patch => {
            if !pre {
                next.patch += 1;
            }
        }
        Severity::Minor => {
            if !(pre && v.patch == 0) {
                next.minor += 1;
            }
            next.patch = 0;
        }
        Severity::Major => {
            if !(pre && v.minor == 0 && v.patch == 0) {
                next.major += 1;
            }
            next.minor = 0;
            next.patch = 0;
        }
    }
    next.pre = Prerelease::EMPTY;
    next.build = BuildMetadata::EMPTY;
    next
}

fn version_pattern(key: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r#"(?m)(^|[^\w-])(['"]?{}['"]?\s*[:=]\s*['"]?)(\d+\.\d+\.\d+(?:-[0-9A-Za-z.-]+)?(?:\+[0-9A-Za-z.-]+)?)"#,
        regex::escape(key)
    ))
}

/// 改写文本中的第一处版本号，返回（新文本, 旧版本, 新版本）
pub(crate) fn bump_text(
    text: &str,
    key: &str,
    severity: Severity,
    path: &Path,
) -> Result<(String, Version, Version), ForgeError> {
    let re = version_pattern(key).map_err(|e| ForgeError::ConfigParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let caps = re
        .captures(text)
        .ok_or_else(|| ForgeError::VersionNotFound { path: path.to_path_buf() })?;
    let raw = &caps[3];
    let from = Version::parse(raw).map_err(|_| ForgeError::InvalidVersion {
        path: path.to_path_buf(),
        version: raw.to_string(),
    })?;
    let to = bump_version(&from, severity);
    let replaced = re
        .replacen(text, 1, |c: &Captures| format!("{}{}{}", &c[1], &c[2], to))
        .into_owned();
    Ok((replaced, from, to))
}

// 读取并计算新内容，不写盘
fn plan_file(path: &Path, key: &str, severity: Severity) -> Result<(String, BumpResult), ForgeError> {
    let text = fs::read_to_string(path).map_err(|e| ForgeError::io(path, e))?;
    let (replaced, from, to) = bump_text(&text, key, severity, path)?;
    Ok((replaced, BumpResult { path: path.to_path_buf(), from, to }))
}

fn commit(replaced: &str, result: &BumpResult) -> Result<(), ForgeError> {
    fs::write(&result.path, replaced).map_err(|e| ForgeError::io(&result.path, e))?;
    info!(task = "bump", file = %result.path.display(), from = %result.from, to = %result.to, "版本已更新");
    Ok(())
}

/// 升级清单中的所有版本文件；全部文件都能升级时才写盘
pub(crate) fn bump_project(project: &Project, severity: Severity) -> Result<Vec<BumpResult>, ForgeError> {
    let planned = project
        .manifest
        .version_files
        .iter()
        .map(|vf| plan_file(&project.root.join(&vf.path), &vf.key, severity))
        .collect::<Result<Vec<_>, _>>()?;
    let mut results = Vec::with_capacity(planned.len());
    for (replaced, result) in planned {
        commit(&replaced, &result)?;
        results.push(result);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Manifest, VersionFile};

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn default_severity_bumps_patch_only() {
        assert_eq!(Severity::default(), Severity::Patch);
        assert_eq!(bump_version(&v("3.4.9"), Severity::default()), v("3.4.10"));
    }

    #[test]
    fn minor_and_major_reset_lower_components() {
        assert_eq!(bump_version(&v("3.4.9"), Severity::Minor), v("3.5.0"));
        assert_eq!(bump_version(&v("3.4.9"), Severity::Major), v("4.0.0"));
    }

    #[test]
    fn prerelease_is_promoted_first() {
        assert_eq!(bump_version(&v("1.2.3-beta.1"), Severity::Patch), v("1.2.3"));
        assert_eq!(bump_version(&v("1.3.0-rc.1"), Severity::Minor), v("1.3.0"));
        assert_eq!(bump_version(&v("2.0.0-alpha"), Severity::Major), v("2.0.0"));
        assert_eq!(bump_version(&v("1.2.3-beta"), Severity::Minor), v("1.3.0"));
    }

    #[test]
    fn rewrites_package_json_version_only() {
        let text = "{\n  \"name\": \"boxy\",\n  \"version\": \"3.4.0\",\n  \"engines\": {\"node-version\": \"8.0.0\"}\n}\n";
        let (out, from, to) = bump_text(text, "version", Severity::Patch, Path::new("package.json")).unwrap();
        assert_eq!(from, v("3.4.0"));
        assert_eq!(to, v("3.4.1"));
        assert!(out.contains("\"version\": \"3.4.1\""));
        assert!(out.contains("\"node-version\": \"8.0.0\""));
    }

    #[test]
    fn does_not_match_key_suffix() {
        let text = "{\"node-version\": \"8.0.0\"}";
        let err = bump_text(text, "version", Severity::Patch, Path::new("package.json")).unwrap_err();
        assert!(matches!(err, ForgeError::VersionNotFound { .. }));
    }

    #[test]
    fn rewrites_python_dunder_version() {
        let text = "import sublime\n\n__version__ = '3.4.0'\n__pc_name__ = 'Boxy Theme'\n";
        let (out, _, to) = bump_text(text, "__version__", Severity::Minor, Path::new("env.py")).unwrap();
        assert_eq!(to, v("3.5.0"));
        assert!(out.contains("__version__ = '3.5.0'"));
        assert!(out.contains("__pc_name__ = 'Boxy Theme'"));
    }

    #[test]
    fn bumps_every_configured_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("package.json"), "{\"version\": \"1.0.9\"}").unwrap();
        fs::write(dir.path().join("env.py"), "__version__ = \"1.0.9\"\n").unwrap();
        let mut manifest = Manifest::default();
        manifest.version_files = vec![
            VersionFile { path: "package.json".into(), key: "version".into() },
            VersionFile { path: "env.py".into(), key: "__version__".into() },
        ];
        let project = Project::new(dir.path(), manifest);
        let results = bump_project(&project, Severity::Patch).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.to == v("1.0.10")));
        assert_eq!(fs::read_to_string(dir.path().join("package.json")).unwrap(), "{\"version\": \"1.0.10\"}");
        assert_eq!(fs::read_to_string(dir.path().join("env.py")).unwrap(), "__version__ = \"1.0.10\"\n");
    }

    #[test]
    fn nothing_is_written_when_a_later_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("package.json"), "{\"version\": \"1.0.9\"}").unwrap();
        fs::write(dir.path().join("env.py"), "__pc_name__ = 'Boxy Theme'\n").unwrap();
        let mut manifest = Manifest::default();
        manifest.version_files = vec![
            VersionFile { path: "package.json".into(), key: "version".into() },
            VersionFile { path: "env.py".into(), key: "__version__".into() },
        ];
        let project = Project::new(dir.path(), manifest);
        let err = bump_project(&project, Severity::Patch).unwrap_err();
        assert!(matches!(err, ForgeError::VersionNotFound { .. }));
        assert_eq!(fs::read_to_string(dir.path().join("package.json")).unwrap(), "{\"version\": \"1.0.9\"}");
    }

    #[test]
    fn missing_version_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = plan_file(&dir.path().join("nope.json"), "version", Severity::Patch).unwrap_err();
        assert!(matches!(err, ForgeError::Io { .. }));
    }
}
