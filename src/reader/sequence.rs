//! 章节数据上的两个纯派生：页面 URL 序列、前后章节。

use crate::api::models::{ChapterGroup, ChapterPayload, ChapterRef};

/// 按页码升序拷贝一份页面列表并拼成绝对地址：`{domain_cdn}/{chapter_path}/{image_file}`。
///
/// 原始 payload 来自共享缓存，不能原地排序。页码相同的保持接口顺序。
pub fn image_sequence(payload: &ChapterPayload) -> Vec<String> {
    let mut images: Vec<_> = payload.item.chapter_image.iter().collect();
    images.sort_by_key(|img| img.image_page);
    images
        .into_iter()
        .map(|img| {
            format!(
                "{}/{}/{}",
                payload.domain_cdn, payload.item.chapter_path, img.image_file
            )
        })
        .collect()
}

/// 当前章节在按时间顺序排列的章节表中的位置及其邻居。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChapterNav {
    pub prev: Option<ChapterRef>,
    pub next: Option<ChapterRef>,
    /// 旧 → 新
    pub chronological: Vec<ChapterRef>,
    pub current: Option<usize>,
}

impl ChapterNav {
    pub fn len(&self) -> usize {
        self.chronological.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chronological.is_empty()
    }
}

/// 章节组按接口存储为新 → 旧，先反转再按定位符查找当前章。
/// 找不到当前章时前后都为空。
pub fn chapter_neighbours(group: &ChapterGroup, locator: &str) -> ChapterNav {
    let chronological: Vec<ChapterRef> = group.server_data.iter().rev().cloned().collect();
    let current = chronological
        .iter()
        .position(|c| c.chapter_api_data == locator);

    let (prev, next) = match current {
        Some(k) => (
            k.checked_sub(1).and_then(|i| chronological.get(i)).cloned(),
            chronological.get(k + 1).cloned(),
        ),
        None => (None, None),
    };

    ChapterNav {
        prev,
        next,
        chronological,
        current,
    }
}

/// 从显示名里尽量取出章节序号（"12"、"Chapter 12.5"、"12 - abc"）。取不到时返回 `None`。
pub fn chapter_number(name: &str) -> Option<f64> {
    name.split(|c: char| c.is_whitespace() || c == '-' || c == ':')
        .find_map(|part| part.trim().parse::<f64>().ok())
        .filter(|n| n.is_finite())
}
