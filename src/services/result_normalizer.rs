use serde_json::{Map, Value as JsonValue, json};
use tracing::{debug, warn};

use crate::{
    error::AppResult,
    models::{NormalizedCollection, OneOrMany},
};

/// 设备结果集合中的单个条目
pub type Entry = Map<String, JsonValue>;

/// 把"单个对象或对象数组"的字段归一化为有序集合并统计状态
///
/// 对象包装为只含一个元素的序列，数组按原顺序使用。
pub fn normalize(raw: &JsonValue) -> AppResult<NormalizedCollection<Entry>> {
    let entries: OneOrMany<Entry> = serde_json::from_value(raw.clone())?;
    Ok(NormalizedCollection::from_items(entries.into_vec(), entry_status))
}

fn entry_status(entry: &Entry) -> Option<String> {
    match entry.get("status")? {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Null => None,
        other => Some(other.to_string()),
    }
}

/// 导入结果中的集合型段落：(输出标签, 容器字段, 子元素字段)
const COLLECTION_SECTIONS: &[(&str, &str, &str)] = &[
    ("exec-script-results", "exec-script-results", "cfg-result"),
    ("file-copy-log", "file-copy-log", "file-result"),
    ("imported-files", "imported-files", "file"),
    ("imported-objects", "imported-objects", "object"),
];

/// 把 `import-results` 展开为有序的段落列表
///
/// 顺序固定：export-details、exec-script-results、file-copy-log、
/// imported-debug、imported-files、imported-objects；设备未返回的段落跳过。
pub fn import_sections(import_results: &JsonValue) -> Vec<JsonValue> {
    let mut sections = Vec::new();

    if let Some(details) = import_results.get("export-details") {
        sections.push(json!({ "export-details": details }));
    }

    for (label, container, child) in COLLECTION_SECTIONS {
        if *label == "imported-files" {
            if let Some(debug_info) = import_results.get("imported-debug") {
                sections.push(json!({ "imported-debug": debug_info }));
            }
        }

        let Some(container_value) = import_results.get(*container) else {
            continue;
        };
        sections.push(collection_section(label, container_value, child));
    }

    debug!(count = sections.len(), "导入结果段落已归一化");
    sections
}

fn collection_section(label: &str, container: &JsonValue, child: &str) -> JsonValue {
    let mut section = Map::new();
    let value = match container.get(child) {
        Some(raw) => match normalize(raw) {
            Ok(collection) => serde_json::to_value(&collection).unwrap_or_else(|_| raw.clone()),
            Err(e) => {
                warn!(section = label, error = %e, "结果段落无法归一化，保留原始内容");
                raw.clone()
            }
        },
        // 设备在没有条目时可能返回空字符串或空对象
        None => container.clone(),
    };
    section.insert(label.to_string(), value);
    JsonValue::Object(section)
}
