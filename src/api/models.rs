//! 漫画内容 API 的响应结构。
//!
//! 所有响应都包在 `{status, message, data}` 信封里。接口字段经常缺失或为 `null`，
//! 因此结构体统一 `#[serde(default)]`，可空字段走 [`null_default`]。

use serde::{Deserialize, Deserializer, Serialize};

pub(crate) fn null_default<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Envelope<T: Default> {
    #[serde(deserialize_with = "null_default")]
    pub status: String,
    #[serde(deserialize_with = "null_default")]
    pub message: String,
    pub data: T,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComicStatus {
    Ongoing,
    Completed,
    ComingSoon,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ComicStatus {
    pub fn label(self) -> &'static str {
        match self {
            ComicStatus::Ongoing => "Đang ra",
            ComicStatus::Completed => "Hoàn thành",
            ComicStatus::ComingSoon => "Sắp ra mắt",
            ComicStatus::Unknown => "Không rõ",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Category {
    #[serde(alias = "_id", deserialize_with = "null_default")]
    pub id: String,
    #[serde(deserialize_with = "null_default")]
    pub name: String,
    #[serde(deserialize_with = "null_default")]
    pub slug: String,
}

/// 章节引用。`chapter_api_data` 既是拉取章节的地址，也是跨章节导航时的身份标识。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChapterRef {
    #[serde(deserialize_with = "null_default")]
    pub filename: String,
    #[serde(deserialize_with = "null_default")]
    pub chapter_name: String,
    #[serde(deserialize_with = "null_default")]
    pub chapter_title: String,
    #[serde(deserialize_with = "null_default")]
    pub chapter_api_data: String,
}

impl ChapterRef {
    pub fn display_name(&self) -> String {
        let title = self.chapter_title.trim();
        if title.is_empty() {
            format!("Chương {}", self.chapter_name)
        } else {
            format!("Chương {} - {}", self.chapter_name, title)
        }
    }
}

/// 一个“服务器”：同一套章节的另一个来源。`server_data` 按接口原样保存（新 → 旧）。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChapterGroup {
    #[serde(deserialize_with = "null_default")]
    pub server_name: String,
    #[serde(deserialize_with = "null_default")]
    pub server_data: Vec<ChapterRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Comic {
    #[serde(rename = "_id", deserialize_with = "null_default")]
    pub id: String,
    #[serde(deserialize_with = "null_default")]
    pub name: String,
    #[serde(deserialize_with = "null_default")]
    pub slug: String,
    #[serde(deserialize_with = "null_default")]
    pub origin_name: Vec<String>,
    #[serde(deserialize_with = "null_default")]
    pub status: ComicStatus,
    #[serde(deserialize_with = "null_default")]
    pub thumb_url: String,
    #[serde(deserialize_with = "null_default")]
    pub sub_docquyen: bool,
    #[serde(deserialize_with = "null_default")]
    pub category: Vec<Category>,
    #[serde(rename = "updatedAt", deserialize_with = "null_default")]
    pub updated_at: String,
    #[serde(rename = "chaptersLatest", deserialize_with = "null_default")]
    pub chapters_latest: Vec<ChapterRef>,
    #[serde(deserialize_with = "null_default")]
    pub content: String,
    #[serde(deserialize_with = "null_default")]
    pub author: Vec<String>,
    #[serde(deserialize_with = "null_default")]
    pub chapters: Vec<ChapterGroup>,
}

impl Comic {
    /// 稳定的内容标识：优先 `_id`，缺失时用 slug 代替。
    pub fn key(&self) -> &str {
        if self.id.trim().is_empty() {
            &self.slug
        } else {
            &self.id
        }
    }

    pub fn thumb_url(&self, cdn: &str) -> String {
        format!(
            "{}/uploads/comics/{}",
            cdn.trim_end_matches('/'),
            self.thumb_url
        )
    }

    pub fn latest_chapter_name(&self) -> Option<&str> {
        self.chapters_latest
            .first()
            .map(|c| c.chapter_name.as_str())
            .filter(|s| !s.is_empty())
    }

    pub fn authors(&self) -> Vec<&str> {
        self.author
            .iter()
            .map(|a| a.trim())
            .filter(|a| !a.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Pagination {
    #[serde(deserialize_with = "null_default")]
    pub total_items: u32,
    pub total_items_per_page: Option<u32>,
    #[serde(deserialize_with = "null_default")]
    pub current_page: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ListParams {
    #[serde(deserialize_with = "null_default")]
    pub keyword: String,
    pub pagination: Pagination,
}

/// 首页 / 分类 / 列表 / 搜索共用的分页数据。
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ListPage {
    #[serde(deserialize_with = "null_default")]
    pub items: Vec<Comic>,
    pub params: ListParams,
    #[serde(rename = "titlePage", deserialize_with = "null_default")]
    pub title_page: String,
    #[serde(rename = "APP_DOMAIN_CDN_IMAGE", deserialize_with = "null_default")]
    pub cdn_image: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ComicDetail {
    pub item: Comic,
    #[serde(rename = "APP_DOMAIN_CDN_IMAGE", deserialize_with = "null_default")]
    pub cdn_image: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CategoryList {
    #[serde(deserialize_with = "null_default")]
    pub items: Vec<Category>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChapterImage {
    #[serde(deserialize_with = "null_default")]
    pub image_page: i64,
    #[serde(deserialize_with = "null_default")]
    pub image_file: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChapterItem {
    #[serde(rename = "_id", deserialize_with = "null_default")]
    pub id: String,
    #[serde(deserialize_with = "null_default")]
    pub comic_name: String,
    #[serde(deserialize_with = "null_default")]
    pub chapter_name: String,
    #[serde(deserialize_with = "null_default")]
    pub chapter_title: String,
    #[serde(deserialize_with = "null_default")]
    pub chapter_path: String,
    #[serde(deserialize_with = "null_default")]
    pub chapter_image: Vec<ChapterImage>,
}

/// 单章数据：CDN 域名 + 章节路径 + 无序的页面列表。
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChapterPayload {
    #[serde(deserialize_with = "null_default")]
    pub domain_cdn: String,
    pub item: ChapterItem,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comic_detail_envelope_decodes_with_nulls() {
        let raw = r#"{
            "status": "success",
            "message": "",
            "data": {
                "item": {
                    "_id": "abc",
                    "name": "One Piece",
                    "slug": "one-piece",
                    "origin_name": null,
                    "status": "ongoing",
                    "thumb_url": "one-piece.jpg",
                    "category": [{"id": "1", "name": "Action", "slug": "action"}],
                    "author": [""],
                    "content": null,
                    "chapters": [{
                        "server_name": "Server #1",
                        "server_data": [
                            {"filename": "", "chapter_name": "2", "chapter_title": "", "chapter_api_data": "https://x/2"},
                            {"filename": "", "chapter_name": "1", "chapter_title": "Romance Dawn", "chapter_api_data": "https://x/1"}
                        ]
                    }]
                },
                "APP_DOMAIN_CDN_IMAGE": "https://img.otruyenapi.com"
            }
        }"#;
        let env: Envelope<ComicDetail> = serde_json::from_str(raw).unwrap();
        let comic = env.data.item;
        assert_eq!(comic.status, ComicStatus::Ongoing);
        assert!(comic.origin_name.is_empty());
        assert!(comic.content.is_empty());
        assert!(comic.authors().is_empty());
        assert_eq!(comic.chapters[0].server_data.len(), 2);
        assert_eq!(
            comic.thumb_url(&env.data.cdn_image),
            "https://img.otruyenapi.com/uploads/comics/one-piece.jpg"
        );
    }

    #[test]
    fn unknown_status_does_not_fail() {
        let c: Comic = serde_json::from_str(r#"{"slug":"x","status":"paused"}"#).unwrap();
        assert_eq!(c.status, ComicStatus::Unknown);
        let c: Comic = serde_json::from_str(r#"{"slug":"x","status":"coming_soon"}"#).unwrap();
        assert_eq!(c.status, ComicStatus::ComingSoon);
    }

    #[test]
    fn key_falls_back_to_slug() {
        let c: Comic = serde_json::from_str(r#"{"slug":"naruto"}"#).unwrap();
        assert_eq!(c.key(), "naruto");
        let c: Comic = serde_json::from_str(r#"{"_id":"id1","slug":"naruto"}"#).unwrap();
        assert_eq!(c.key(), "id1");
    }

    #[test]
    fn pagination_without_page_size() {
        let raw = r#"{"items": [], "params": {"pagination": {"totalItems": 50, "currentPage": 1}}}"#;
        let page: ListPage = serde_json::from_str(raw).unwrap();
        assert_eq!(page.params.pagination.total_items, 50);
        assert_eq!(page.params.pagination.total_items_per_page, None);
    }

    #[test]
    fn category_index_uses_underscore_id() {
        let raw = r#"{"items": [{"_id": "c1", "name": "Action", "slug": "action"}]}"#;
        let list: CategoryList = serde_json::from_str(raw).unwrap();
        assert_eq!(list.items[0].id, "c1");
    }

    #[test]
    fn chapter_display_name() {
        let mut ch = ChapterRef {
            chapter_name: "12".to_string(),
            ..Default::default()
        };
        assert_eq!(ch.display_name(), "Chương 12");
        ch.chapter_title = "Finale".to_string();
        assert_eq!(ch.display_name(), "Chương 12 - Finale");
    }
}
