//! 阅读器状态机。
//!
//! 只描述状态与转移，不做任何 I/O：请求由 TUI 层根据 [`ReaderState::locator`]
//! 和 [`ReaderState::load_seq`] 发起，结果再通过 `chapter_loaded` / `chapter_failed`
//! / `comic_loaded` 喂回来。

use std::sync::Arc;

use crate::api::ApiError;
use crate::api::account::{ContentType, CreateWatchHistory};
use crate::api::models::{ChapterPayload, ComicDetail};

use super::sequence::{ChapterNav, chapter_neighbours, image_sequence};

pub const CHAPTER_NOT_FOUND: &str = "Không tìm thấy chapter";
pub const CHAPTER_LOAD_FAILED: &str = "Không thể tải chapter";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReadingMode {
    #[default]
    Single,
    Scroll,
}

impl ReadingMode {
    pub fn toggled(self) -> Self {
        match self {
            ReadingMode::Single => ReadingMode::Scroll,
            ReadingMode::Scroll => ReadingMode::Single,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ReadingMode::Single => "Từng trang",
            ReadingMode::Scroll => "Cuộn dọc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Ready,
    Error(String),
    /// 章节加载成功但没有任何页面
    Empty,
    /// 没有章节定位符，只能返回
    NotFound,
}

#[derive(Debug, Clone)]
pub struct ReaderState {
    locator: Option<String>,
    comic_slug: Option<String>,
    load_seq: u64,
    phase: Phase,
    pages: Vec<String>,
    chapter_name: String,
    current_page: usize,
    mode: ReadingMode,
    ui_visible: bool,
    full_scale: bool,
    scroll_offset: usize,
    auto_hide: bool,
    comic: Option<Arc<ComicDetail>>,
    chapter_nav: Option<ChapterNav>,
}

impl ReaderState {
    pub fn new(
        locator: Option<String>,
        comic_slug: Option<String>,
        mode: ReadingMode,
        auto_hide: bool,
    ) -> Self {
        let locator = locator
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());
        let comic_slug = comic_slug
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let phase = if locator.is_some() {
            Phase::Loading
        } else {
            Phase::NotFound
        };
        Self {
            locator,
            comic_slug,
            load_seq: 0,
            phase,
            pages: Vec::new(),
            chapter_name: String::new(),
            current_page: 0,
            mode,
            ui_visible: true,
            full_scale: false,
            scroll_offset: 0,
            auto_hide,
            comic: None,
            chapter_nav: None,
        }
    }

    // ---- 读取 ----

    pub fn locator(&self) -> Option<&str> {
        self.locator.as_deref()
    }

    pub fn comic_slug(&self) -> Option<&str> {
        self.comic_slug.as_deref()
    }

    /// 每次开始加载新章节时递增，用于识别过期结果。
    pub fn load_seq(&self) -> u64 {
        self.load_seq
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn pages(&self) -> &[String] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn current_url(&self) -> Option<&str> {
        self.pages.get(self.current_page).map(String::as_str)
    }

    pub fn chapter_name(&self) -> &str {
        &self.chapter_name
    }

    pub fn mode(&self) -> ReadingMode {
        self.mode
    }

    pub fn ui_visible(&self) -> bool {
        self.ui_visible
    }

    pub fn full_scale(&self) -> bool {
        self.full_scale
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub fn comic(&self) -> Option<&ComicDetail> {
        self.comic.as_deref()
    }

    /// 漫画数据未到或路由没带 `comic` 时为 `None`，相关控件隐藏。
    pub fn chapter_nav(&self) -> Option<&ChapterNav> {
        self.chapter_nav.as_ref()
    }

    pub fn can_go_prev(&self) -> bool {
        self.paging_enabled() && self.current_page > 0
    }

    pub fn can_go_next(&self) -> bool {
        self.paging_enabled() && self.current_page + 1 < self.pages.len()
    }

    // ---- 数据到达 ----

    /// 结果不属于当前章节时忽略并返回 `false`。
    pub fn chapter_loaded(&mut self, locator: &str, payload: &ChapterPayload) -> bool {
        if self.locator.as_deref() != Some(locator) {
            return false;
        }
        self.pages = image_sequence(payload);
        self.chapter_name = payload.item.chapter_name.clone();
        self.current_page = 0;
        self.scroll_offset = 0;
        self.phase = if self.pages.is_empty() {
            Phase::Empty
        } else {
            Phase::Ready
        };
        true
    }

    pub fn chapter_failed(&mut self, locator: &str, err: &ApiError) -> bool {
        if self.locator.as_deref() != Some(locator) {
            return false;
        }
        self.pages.clear();
        self.phase = Phase::Error(err.user_message(CHAPTER_LOAD_FAILED));
        true
    }

    /// 漫画数据只用于章节导航；与路由里的 slug（或历史记录里的 id）不符时忽略。
    pub fn comic_loaded(&mut self, detail: Arc<ComicDetail>) -> bool {
        let Some(wanted) = self.comic_slug.as_deref() else {
            return false;
        };
        if wanted != detail.item.slug && wanted != detail.item.id {
            return false;
        }
        self.comic = Some(detail);
        self.refresh_nav();
        true
    }

    // ---- 单页模式翻页 ----

    pub fn go_prev(&mut self) -> bool {
        if !self.can_go_prev() {
            return false;
        }
        self.current_page -= 1;
        self.after_page_change();
        true
    }

    pub fn go_next(&mut self) -> bool {
        if !self.can_go_next() {
            return false;
        }
        self.current_page += 1;
        self.after_page_change();
        true
    }

    pub fn tap(&mut self) {
        self.ui_visible = !self.ui_visible;
    }

    /// 只在单页模式下有效；切换后强制显示控制栏。
    pub fn toggle_scale(&mut self) -> bool {
        if self.mode != ReadingMode::Single {
            return false;
        }
        self.full_scale = !self.full_scale;
        self.scroll_offset = 0;
        self.ui_visible = true;
        true
    }

    /// 切换模式不保留阅读位置：页码与滚动都回到开头。
    pub fn set_mode(&mut self, mode: ReadingMode) -> bool {
        if self.mode == mode {
            return false;
        }
        self.mode = mode;
        self.current_page = 0;
        self.scroll_offset = 0;
        self.ui_visible = true;
        true
    }

    pub fn toggle_mode(&mut self) {
        self.set_mode(self.mode.toggled());
    }

    /// `limit` 为可滚动的总行数（由界面根据渲染高度给出）。
    pub fn scroll_by(&mut self, delta: isize, limit: usize) {
        let max = limit.saturating_sub(1);
        self.scroll_offset = self.scroll_offset.saturating_add_signed(delta).min(max);
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll_offset = 0;
    }

    // ---- 跨章节 ----

    /// 换到另一章：重置页码与滚动，进入加载状态。同一章或空定位符返回 `false`。
    pub fn switch_chapter(&mut self, locator: &str) -> bool {
        let locator = locator.trim();
        if locator.is_empty() || self.locator.as_deref() == Some(locator) {
            return false;
        }
        self.locator = Some(locator.to_string());
        self.load_seq += 1;
        self.phase = Phase::Loading;
        self.pages.clear();
        self.chapter_name.clear();
        self.current_page = 0;
        self.scroll_offset = 0;
        self.refresh_nav();
        true
    }

    pub fn prev_chapter(&mut self) -> bool {
        let target = self
            .chapter_nav
            .as_ref()
            .and_then(|n| n.prev.as_ref())
            .map(|c| c.chapter_api_data.clone());
        target.is_some_and(|l| self.switch_chapter(&l))
    }

    pub fn next_chapter(&mut self) -> bool {
        let target = self
            .chapter_nav
            .as_ref()
            .and_then(|n| n.next.as_ref())
            .map(|c| c.chapter_api_data.clone());
        target.is_some_and(|l| self.switch_chapter(&l))
    }

    /// 章节与漫画都已就绪时生成阅读记录。
    pub fn progress_entry(&self, cdn_fallback: &str) -> Option<CreateWatchHistory> {
        if !matches!(self.phase, Phase::Ready | Phase::Empty) {
            return None;
        }
        let detail = self.comic.as_ref()?;
        let locator = self.locator.clone()?;
        let comic = &detail.item;
        let cdn = if detail.cdn_image.is_empty() {
            cdn_fallback
        } else {
            detail.cdn_image.as_str()
        };
        let thumb = (!comic.thumb_url.is_empty()).then(|| comic.thumb_url(cdn));
        let chapter_name = Some(self.chapter_name.clone()).filter(|n| !n.is_empty());

        Some(CreateWatchHistory {
            content_type: ContentType::Comic,
            content_id: comic.key().to_string(),
            content_title: comic.name.clone(),
            content_thumb: thumb,
            chapter_id: Some(locator),
            chapter_name,
        })
    }

    fn paging_enabled(&self) -> bool {
        self.mode == ReadingMode::Single && self.phase == Phase::Ready
    }

    fn after_page_change(&mut self) {
        self.scroll_offset = 0;
        if self.auto_hide {
            self.ui_visible = false;
        }
    }

    fn refresh_nav(&mut self) {
        self.chapter_nav = match (&self.comic, &self.locator) {
            (Some(detail), Some(locator)) => detail
                .item
                .chapters
                .first()
                .map(|group| chapter_neighbours(group, locator)),
            _ => None,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{
        ChapterGroup, ChapterImage, ChapterItem, ChapterRef, Comic, ComicDetail,
    };
    use reqwest::StatusCode;

    fn payload(n: usize) -> ChapterPayload {
        ChapterPayload {
            domain_cdn: "https://cdn.x".to_string(),
            item: ChapterItem {
                chapter_name: "2".to_string(),
                chapter_path: "c".to_string(),
                chapter_image: (0..n)
                    .map(|i| ChapterImage {
                        image_page: i as i64 + 1,
                        image_file: format!("{i}.jpg"),
                    })
                    .collect(),
                ..Default::default()
            },
        }
    }

    fn detail(slug: &str) -> Arc<ComicDetail> {
        let chapters = ["c3", "c2", "c1"]
            .iter()
            .map(|l| ChapterRef {
                chapter_name: l.trim_start_matches('c').to_string(),
                chapter_api_data: l.to_string(),
                ..Default::default()
            })
            .collect();
        Arc::new(ComicDetail {
            item: Comic {
                id: "id-1".to_string(),
                name: "One Piece".to_string(),
                slug: slug.to_string(),
                thumb_url: "op.jpg".to_string(),
                chapters: vec![ChapterGroup {
                    server_name: "Server #1".to_string(),
                    server_data: chapters,
                }],
                ..Default::default()
            },
            cdn_image: String::new(),
        })
    }

    fn ready(n: usize) -> ReaderState {
        let mut s = ReaderState::new(
            Some("c2".to_string()),
            Some("one-piece".to_string()),
            ReadingMode::Single,
            true,
        );
        assert!(s.chapter_loaded("c2", &payload(n)));
        s
    }

    #[test]
    fn missing_locator_is_not_found() {
        let s = ReaderState::new(None, Some("x".to_string()), ReadingMode::Single, true);
        assert_eq!(s.phase(), &Phase::NotFound);
        let s = ReaderState::new(Some("  ".to_string()), None, ReadingMode::Single, true);
        assert_eq!(s.phase(), &Phase::NotFound);
    }

    #[test]
    fn empty_chapter_is_distinct_from_error() {
        let s = ready(0);
        assert_eq!(s.phase(), &Phase::Empty);
        assert!(!s.can_go_next());
    }

    #[test]
    fn failure_uses_server_message_or_generic() {
        let mut s = ReaderState::new(Some("c2".to_string()), None, ReadingMode::Single, true);
        let err = ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "");
        assert!(s.chapter_failed("c2", &err));
        assert_eq!(s.phase(), &Phase::Error(CHAPTER_LOAD_FAILED.to_string()));

        let err = ApiError::from_status(StatusCode::NOT_FOUND, r#"{"message":"Hết hạn"}"#);
        s.chapter_failed("c2", &err);
        assert_eq!(s.phase(), &Phase::Error("Hết hạn".to_string()));
    }

    #[test]
    fn stale_results_are_ignored() {
        let mut s = ready(3);
        assert!(s.switch_chapter("c3"));
        assert!(!s.chapter_loaded("c2", &payload(9)));
        assert_eq!(s.phase(), &Phase::Loading);
        assert!(!s.comic_loaded(detail("other-comic")));
        assert!(s.comic().is_none());
    }

    #[test]
    fn index_stays_in_bounds() {
        let mut s = ready(3);
        assert!(!s.go_prev());
        assert_eq!(s.current_page(), 0);
        assert!(s.go_next());
        assert!(s.go_next());
        assert!(!s.go_next());
        assert_eq!(s.current_page(), 2);
        assert!(s.go_prev());
        assert_eq!(s.current_page(), 1);
        assert_eq!(s.current_url(), Some("https://cdn.x/c/1.jpg"));
    }

    #[test]
    fn page_change_auto_hides_and_tap_toggles() {
        let mut s = ready(3);
        assert!(s.ui_visible());
        s.go_next();
        assert!(!s.ui_visible());
        s.tap();
        assert!(s.ui_visible());
        s.go_next();
        assert!(!s.ui_visible());
        s.toggle_scale();
        assert!(s.ui_visible());
        assert!(s.full_scale());
    }

    #[test]
    fn auto_hide_can_be_disabled() {
        let mut s = ReaderState::new(Some("c".to_string()), None, ReadingMode::Single, false);
        s.chapter_loaded("c", &payload(2));
        s.go_next();
        assert!(s.ui_visible());
    }

    #[test]
    fn mode_round_trip_resets_position() {
        let mut s = ready(5);
        s.go_next();
        s.go_next();
        s.scroll_by(7, 100);
        s.tap();
        assert!(s.set_mode(ReadingMode::Scroll));
        assert_eq!(s.current_page(), 0);
        assert_eq!(s.scroll_offset(), 0);
        assert!(s.ui_visible());
        assert!(!s.go_next());
        assert!(!s.toggle_scale());

        s.scroll_by(40, 100);
        s.toggle_mode();
        assert_eq!(s.mode(), ReadingMode::Single);
        assert_eq!(s.current_page(), 0);
        assert_eq!(s.scroll_offset(), 0);
        assert!(!s.set_mode(ReadingMode::Single));
    }

    #[test]
    fn scroll_is_clamped() {
        let mut s = ready(1);
        s.scroll_by(-5, 10);
        assert_eq!(s.scroll_offset(), 0);
        s.scroll_by(50, 10);
        assert_eq!(s.scroll_offset(), 9);
        s.scroll_to_top();
        assert_eq!(s.scroll_offset(), 0);
    }

    #[test]
    fn nav_waits_for_comic_then_switches() {
        let mut s = ready(3);
        assert!(s.chapter_nav().is_none());
        assert!(!s.next_chapter());

        assert!(s.comic_loaded(detail("one-piece")));
        let nav = s.chapter_nav().unwrap();
        assert_eq!(nav.prev.as_ref().unwrap().chapter_api_data, "c1");
        assert_eq!(nav.next.as_ref().unwrap().chapter_api_data, "c3");

        s.go_next();
        let seq = s.load_seq();
        assert!(s.next_chapter());
        assert_eq!(s.locator(), Some("c3"));
        assert_eq!(s.load_seq(), seq + 1);
        assert_eq!(s.phase(), &Phase::Loading);
        assert_eq!(s.current_page(), 0);
        assert!(s.chapter_nav().unwrap().next.is_none());
        assert!(!s.next_chapter());
    }

    #[test]
    fn switching_to_same_chapter_is_noop() {
        let mut s = ready(2);
        assert!(!s.switch_chapter("c2"));
        assert!(!s.switch_chapter(" "));
        assert_eq!(s.phase(), &Phase::Ready);
    }

    #[test]
    fn progress_needs_chapter_and_comic() {
        let mut s = ReaderState::new(
            Some("c2".to_string()),
            Some("one-piece".to_string()),
            ReadingMode::Single,
            true,
        );
        s.comic_loaded(detail("one-piece"));
        assert!(s.progress_entry("https://img").is_none());

        s.chapter_loaded("c2", &payload(1));
        let entry = s.progress_entry("https://img").unwrap();
        assert_eq!(entry.content_id, "id-1");
        assert_eq!(entry.chapter_id.as_deref(), Some("c2"));
        assert_eq!(entry.chapter_name.as_deref(), Some("2"));
        assert_eq!(
            entry.content_thumb.as_deref(),
            Some("https://img/uploads/comics/op.jpg")
        );
    }
}
