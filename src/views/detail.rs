//! 漫画详情页的派生数据：章节组选择、首章/最新章、继续阅读、简介文本。

use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::api::account::{ContentType, CreateRelation, CreateWatchHistory, WatchHistory};
use crate::api::models::{ChapterGroup, ChapterRef, Comic, ComicDetail};
use crate::reader::sequence::chapter_number;
use crate::route::Route;

static RE_TAG: OnceLock<Option<Regex>> = OnceLock::new();
static RE_SPACE: OnceLock<Option<Regex>> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct DetailModel {
    detail: Arc<ComicDetail>,
    selected_group: usize,
    resume: Option<WatchHistory>,
}

impl DetailModel {
    pub fn new(detail: Arc<ComicDetail>) -> Self {
        Self {
            detail,
            selected_group: 0,
            resume: None,
        }
    }

    pub fn comic(&self) -> &Comic {
        &self.detail.item
    }

    pub fn cdn(&self) -> &str {
        &self.detail.cdn_image
    }

    pub fn groups(&self) -> &[ChapterGroup] {
        &self.detail.item.chapters
    }

    pub fn selected_group(&self) -> usize {
        self.selected_group
    }

    /// 纯本地切换，不重新请求。越界下标被拒绝。
    pub fn select_group(&mut self, index: usize) -> bool {
        if index >= self.groups().len() {
            return false;
        }
        self.selected_group = index;
        true
    }

    /// 当前组的章节，接口顺序（新 → 旧）。
    pub fn active_chapters(&self) -> &[ChapterRef] {
        self.groups()
            .get(self.selected_group)
            .map(|g| g.server_data.as_slice())
            .unwrap_or(&[])
    }

    /// 按时间最早的一章（存储顺序的最后一项）。
    pub fn first_chapter(&self) -> Option<&ChapterRef> {
        self.active_chapters().last()
    }

    pub fn latest_chapter(&self) -> Option<&ChapterRef> {
        self.active_chapters().first()
    }

    pub fn latest_number(&self) -> Option<f64> {
        self.latest_chapter()
            .and_then(|c| chapter_number(&c.chapter_name))
    }

    pub fn set_resume(&mut self, entry: Option<WatchHistory>) {
        self.resume = entry.filter(|e| e.chapter_id.as_deref().is_some_and(|c| !c.is_empty()));
    }

    pub fn resume(&self) -> Option<&WatchHistory> {
        self.resume.as_ref()
    }

    pub fn chapter_route(&self, chapter: &ChapterRef) -> Route {
        Route::chapter(&chapter.chapter_api_data, Some(&self.comic().slug))
    }

    pub fn resume_route(&self) -> Option<Route> {
        let locator = self.resume.as_ref()?.chapter_id.as_deref()?;
        Some(Route::chapter(locator, Some(&self.comic().slug)))
    }

    /// 点章节入口时写入的阅读记录。
    pub fn history_entry(&self, chapter: &ChapterRef, cdn_fallback: &str) -> CreateWatchHistory {
        let comic = self.comic();
        let cdn = if self.cdn().is_empty() {
            cdn_fallback
        } else {
            self.cdn()
        };
        CreateWatchHistory {
            content_type: ContentType::Comic,
            content_id: comic.key().to_string(),
            content_title: comic.name.clone(),
            content_thumb: (!comic.thumb_url.is_empty()).then(|| comic.thumb_url(cdn)),
            chapter_id: Some(chapter.chapter_api_data.clone()),
            chapter_name: Some(chapter.chapter_name.clone()),
        }
    }

    /// 收藏 / 稍后看时提交的内容快照。
    pub fn relation_body(&self, cdn_fallback: &str) -> CreateRelation {
        let comic = self.comic();
        let cdn = if self.cdn().is_empty() {
            cdn_fallback
        } else {
            self.cdn()
        };
        let status = serde_json::to_value(comic.status)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string));
        CreateRelation {
            content_type: ContentType::Comic,
            content_id: comic.key().to_string(),
            content_title: comic.name.clone(),
            content_thumb: (!comic.thumb_url.is_empty()).then(|| comic.thumb_url(cdn)),
            content_slug: Some(comic.slug.clone()).filter(|s| !s.is_empty()),
            content_status: status,
            content_total_chapters: self.groups().first().map(|g| g.server_data.len()),
        }
    }

    pub fn description(&self, width: usize) -> Vec<String> {
        let text = strip_html(&self.comic().content);
        if text.is_empty() {
            return vec!["Chưa có mô tả".to_string()];
        }
        textwrap::wrap(&text, width.max(10))
            .into_iter()
            .map(|l| l.into_owned())
            .collect()
    }
}

/// 去掉 HTML 标签、还原常见实体并压缩空白。
pub fn strip_html(html: &str) -> String {
    let tag = RE_TAG.get_or_init(|| Regex::new(r"(?s)<[^>]*>").ok());
    let space = RE_SPACE.get_or_init(|| Regex::new(r"\s+").ok());

    let text = match tag {
        Some(re) => re.replace_all(html, " ").into_owned(),
        None => html.to_string(),
    };
    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    match space {
        Some(re) => re.replace_all(text.trim(), " ").into_owned(),
        None => text.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapter(name: &str) -> ChapterRef {
        ChapterRef {
            chapter_name: name.to_string(),
            chapter_api_data: format!("https://api/{name}"),
            ..Default::default()
        }
    }

    fn model() -> DetailModel {
        DetailModel::new(Arc::new(ComicDetail {
            item: Comic {
                id: "id-9".to_string(),
                slug: "dao-hai-tac".to_string(),
                name: "Đảo Hải Tặc".to_string(),
                thumb_url: "dht.jpg".to_string(),
                content: "<p>Hành trình&nbsp;của <b>Luffy</b></p>\n<p>và đồng đội &amp; bạn bè</p>"
                    .to_string(),
                chapters: vec![
                    ChapterGroup {
                        server_name: "Server #1".to_string(),
                        server_data: vec![chapter("1100"), chapter("1099"), chapter("1")],
                    },
                    ChapterGroup {
                        server_name: "Server #2".to_string(),
                        server_data: vec![chapter("5")],
                    },
                ],
                ..Default::default()
            },
            cdn_image: "https://img".to_string(),
        }))
    }

    #[test]
    fn first_and_latest_from_active_group() {
        let mut m = model();
        assert_eq!(m.first_chapter().unwrap().chapter_name, "1");
        assert_eq!(m.latest_chapter().unwrap().chapter_name, "1100");
        assert_eq!(m.latest_number(), Some(1100.0));

        assert!(m.select_group(1));
        assert_eq!(m.active_chapters().len(), 1);
        assert_eq!(m.first_chapter(), m.latest_chapter());

        assert!(!m.select_group(2));
        assert_eq!(m.selected_group(), 1);
    }

    #[test]
    fn comic_without_chapters() {
        let m = DetailModel::new(Arc::new(ComicDetail::default()));
        assert!(m.active_chapters().is_empty());
        assert!(m.first_chapter().is_none());
        assert!(m.latest_number().is_none());
    }

    #[test]
    fn resume_requires_chapter_id() {
        let mut m = model();
        m.set_resume(Some(WatchHistory::default()));
        assert!(m.resume().is_none());
        assert!(m.resume_route().is_none());

        m.set_resume(Some(WatchHistory {
            chapter_id: Some("https://api/1099".to_string()),
            ..Default::default()
        }));
        assert_eq!(
            m.resume_route(),
            Some(Route::chapter("https://api/1099", Some("dao-hai-tac")))
        );
    }

    #[test]
    fn history_entry_snapshot() {
        let m = model();
        let entry = m.history_entry(&chapter("1099"), "https://fallback");
        assert_eq!(entry.content_id, "id-9");
        assert_eq!(entry.content_title, "Đảo Hải Tặc");
        assert_eq!(
            entry.content_thumb.as_deref(),
            Some("https://img/uploads/comics/dht.jpg")
        );
        assert_eq!(entry.chapter_name.as_deref(), Some("1099"));
    }

    #[test]
    fn relation_body_snapshot() {
        let body = model().relation_body("https://fallback");
        assert_eq!(body.content_id, "id-9");
        assert_eq!(body.content_slug.as_deref(), Some("dao-hai-tac"));
        assert_eq!(body.content_status.as_deref(), Some("unknown"));
        assert_eq!(body.content_total_chapters, Some(3));
    }

    #[test]
    fn html_is_stripped() {
        assert_eq!(
            strip_html("<p>Hành trình&nbsp;của <b>Luffy</b></p>\n<p>x &amp; y</p>"),
            "Hành trình của Luffy x & y"
        );
        assert_eq!(strip_html("   "), "");
    }

    #[test]
    fn description_wraps() {
        let lines = model().description(20);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.chars().count() <= 20));
        let empty = DetailModel::new(Arc::new(ComicDetail::default()));
        assert_eq!(empty.description(20), vec!["Chưa có mô tả"]);
    }
}
