//! 输出文件命名：`前缀 + Start Case(源文件名) + 扩展名`

use std::path::Path;

/// 由源文件基名推导输出文件名，例如 `dark-blue` -> `Boxy Dark Blue.sublime-theme`
pub(crate) fn derive_name(source_base: &str, prefix: &str, extension: &str) -> String {
    format!("{}{}{}", prefix, start_case(source_base), extension)
}

/// 拆词后每个词首字母大写，以单个空格连接；其余字母保持原样
pub(crate) fn start_case(s: &str) -> String {
    words(s)
        .iter()
        .map(|w| upper_first(w))
        .collect::<Vec<_>>()
        .join(" ")
}

/// 模板文件扩展名（含前导点），无扩展名时为空串
pub(crate) fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default()
}

fn upper_first(w: &str) -> String {
    let mut chars = w.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// 分词：非字母数字为分隔符；另在 小写->大写、缩写词末尾（XMLHttp）、字母<->数字 处断开
fn words(s: &str) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    let mut out: Vec<String> = Vec::new();
    let mut cur = String::new();
    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !cur.is_empty() {
                out.push(std::mem::take(&mut cur));
            }
            continue;
        }
        if let Some(prev) = cur.chars().last() {
            let next = chars.get(i + 1).copied();
            let boundary = (prev.is_lowercase() && c.is_uppercase())
                || (prev.is_uppercase()
                    && c.is_uppercase()
                    && next.map(|n| n.is_lowercase()).unwrap_or(false))
                || (prev.is_alphabetic() && c.is_numeric())
                || (prev.is_numeric() && c.is_alphabetic());
            if boundary {
                out.push(std::mem::take(&mut cur));
            }
        }
        cur.push(c);
    }
    if !cur.is_empty() {
        out.push(cur);
    }
    out
}
