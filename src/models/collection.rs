use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 设备接口由XML转换而来：只有一个子元素时返回对象，多个时返回数组。
/// 解码后统一为有序列表，不把歧义形态暴露到边界之外。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }

    pub fn len(&self) -> usize {
        match self {
            OneOrMany::Many(items) => items.len(),
            OneOrMany::One(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> From<OneOrMany<T>> for Vec<T> {
    fn from(value: OneOrMany<T>) -> Self {
        value.into_vec()
    }
}

impl<T> IntoIterator for OneOrMany<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.into_vec().into_iter()
    }
}

/// 集合摘要
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSummary {
    pub total: usize,
    /// 状态 → 出现次数
    #[serde(rename = "status")]
    pub status_counts: BTreeMap<String, usize>,
}

/// 归一化后的结果集合，序列化为 `{"summary": {...}, "detail": [...]}`
///
/// 只能通过 [`NormalizedCollection::from_items`] 构造，保证
/// `total == items.len()` 且各状态计数之和等于 `total`。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedCollection<T> {
    summary: CollectionSummary,
    #[serde(rename = "detail")]
    items: Vec<T>,
}

/// 条目缺少 status 字段时使用的标签
pub const UNKNOWN_STATUS: &str = "unknown";

impl<T> NormalizedCollection<T> {
    pub fn from_items<F>(items: Vec<T>, status_of: F) -> Self
    where
        F: Fn(&T) -> Option<String>,
    {
        let mut status_counts: BTreeMap<String, usize> = BTreeMap::new();
        for item in &items {
            let status = status_of(item).unwrap_or_else(|| UNKNOWN_STATUS.to_string());
            *status_counts.entry(status).or_insert(0) += 1;
        }

        Self {
            summary: CollectionSummary {
                total: items.len(),
                status_counts,
            },
            items,
        }
    }

    pub fn total(&self) -> usize {
        self.summary.total
    }

    pub fn status_counts(&self) -> &BTreeMap<String, usize> {
        &self.summary.status_counts
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }
}
