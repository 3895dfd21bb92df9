//! 监视源文件并按需重建
//! - 变更路径映射到受影响的分类（模板目录 -> 对应分类，其余如 settings/partials -> 全部分类）
//! - 监视回调只记录脏分类，主循环定时取出并逐个重建，单个分类失败不影响后续监视

use std::{
    collections::BTreeSet,
    path::Path,
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};

use anyhow::{bail, Result};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{info, warn};

use crate::{
    build::{run_category, BuildOptions, Category},
    config::Project,
    convert::SchemeConverter,
};

const SETTLE: Duration = Duration::from_millis(400);

/// 计算某个变更路径影响的分类；不在源目录内的路径不触发重建
pub(crate) fn categories_for_change(project: &Project, path: &Path) -> BTreeSet<Category> {
    let source_dir = project.source_dir();
    let mut hit = BTreeSet::new();
    if !path.starts_with(&source_dir) {
        return hit;
    }
    for category in Category::ALL {
        let layout = project.layout(category);
        for template in &layout.templates {
            let dir = match source_dir.join(template).parent() {
                Some(d) => d.to_path_buf(),
                None => continue,
            };
            if dir != source_dir && path.starts_with(&dir) {
                hit.insert(category);
            }
        }
    }
    if hit.is_empty() {
        hit.extend(Category::ALL);
    }
    hit
}

/// 监视源目录并在变更后重建受影响的分类；正常情况下不会返回
pub(crate) fn watch_and_rebuild(
    project: &Project,
    opts: BuildOptions,
    converter: &dyn SchemeConverter,
) -> Result<()> {
    let source_dir = project.source_dir();
    if !source_dir.is_dir() {
        bail!("源目录不存在: {}", source_dir.display());
    }

    let dirty: Arc<Mutex<BTreeSet<Category>>> = Arc::new(Mutex::new(BTreeSet::new()));
    let mut watcher: RecommendedWatcher = {
        let dirty = dirty.clone();
        // 监视事件给出的是规范化路径
        let mut project = project.clone();
        if let Ok(root) = project.root.canonicalize() {
            project.root = root;
        }
        notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
            Ok(event) => {
                if matches!(event.kind, EventKind::Access(_)) {
                    return;
                }
                if let Ok(mut set) = dirty.lock() {
                    for p in &event.paths {
                        set.extend(categories_for_change(&project, p));
                    }
                }
            }
            Err(e) => warn!(task = "watch", "监视出错: {}", e),
        })?
    };
    watcher.watch(&source_dir, RecursiveMode::Recursive)?;
    info!(task = "watch", dir = %source_dir.display(), "👀 正在监视源文件，Ctrl+C 退出");

    loop {
        thread::sleep(SETTLE);
        let batch = dirty
            .lock()
            .map(|mut set| std::mem::take(&mut *set))
            .unwrap_or_default();
        for category in batch {
            let report = run_category(project, category, opts, converter);
            if report.succeeded() {
                info!(task = "watch", %category, "🔁 已重建");
            } else {
                warn!(task = "watch", %category, "重建失败，等待下一次修改");
            }
        }
    }
}
