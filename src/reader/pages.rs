//! 已解码页面的 LRU 缓存与 ASCII 渲染。
//!
//! 长章节不会把所有页面常驻内存：只保留最近使用的 `capacity` 页，
//! 单页模式下额外预取下一页。

use std::collections::{HashMap, HashSet, VecDeque};

use image::{DynamicImage, GenericImageView, imageops::FilterType};

use super::state::{ReaderState, ReadingMode};

const PALETTE: &[u8] = b" .:-=+*#%@";

struct CachedPage {
    image: DynamicImage,
    rendered: Option<((u16, u16), Vec<String>)>,
}

pub struct PageCache {
    capacity: usize,
    order: VecDeque<String>,
    pages: HashMap<String, CachedPage>,
    in_flight: HashSet<String>,
    failed: HashMap<String, String>,
}

impl PageCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: VecDeque::new(),
            pages: HashMap::new(),
            in_flight: HashSet::new(),
            failed: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.pages.contains_key(url)
    }

    /// 需要发起下载时返回 `true`（未缓存、未在途、未失败），并标记为在途。
    pub fn begin_fetch(&mut self, url: &str) -> bool {
        if self.pages.contains_key(url) || self.failed.contains_key(url) {
            return false;
        }
        self.in_flight.insert(url.to_string())
    }

    pub fn insert(&mut self, url: &str, image: DynamicImage) {
        self.in_flight.remove(url);
        self.failed.remove(url);
        self.pages.insert(
            url.to_string(),
            CachedPage {
                image,
                rendered: None,
            },
        );
        self.touch(url);
        while self.order.len() > self.capacity {
            if let Some(old) = self.order.pop_front() {
                self.pages.remove(&old);
            }
        }
    }

    pub fn fail(&mut self, url: &str, message: String) {
        self.in_flight.remove(url);
        self.failed.insert(url.to_string(), message);
    }

    pub fn failure(&self, url: &str) -> Option<&str> {
        self.failed.get(url).map(String::as_str)
    }

    pub fn is_loading(&self, url: &str) -> bool {
        self.in_flight.contains(url)
    }

    /// 换章时清空失败记录，允许重新下载。
    pub fn clear_failures(&mut self) {
        self.failed.clear();
    }

    /// 取出按视口尺寸渲染的 ASCII 行；尺寸不变时复用上次结果。
    pub fn render(&mut self, url: &str, width: u16, height: u16) -> Option<&[String]> {
        if !self.pages.contains_key(url) {
            return None;
        }
        self.touch(url);
        let page = self.pages.get_mut(url)?;
        let stale = page
            .rendered
            .as_ref()
            .is_none_or(|(size, _)| *size != (width, height));
        if stale {
            page.rendered = Some(((width, height), image_to_ascii(&page.image, width, height)));
        }
        page.rendered.as_ref().map(|(_, lines)| lines.as_slice())
    }

    fn touch(&mut self, url: &str) {
        self.order.retain(|u| u != url);
        self.order.push_back(url.to_string());
    }
}

/// 当前应当持有的页面下标：单页模式为当前页 + 下一页，滚动模式为可见页及其后一页。
pub fn wanted_pages(state: &ReaderState, page_height: usize) -> Vec<usize> {
    let count = state.page_count();
    if count == 0 {
        return Vec::new();
    }
    let first = match state.mode() {
        ReadingMode::Single => state.current_page(),
        ReadingMode::Scroll => state.scroll_offset() / page_height.max(1),
    };
    let first = first.min(count - 1);
    let mut wanted = vec![first];
    if first + 1 < count {
        wanted.push(first + 1);
    }
    wanted
}

pub fn decode(bytes: &[u8]) -> Result<DynamicImage, image::ImageError> {
    image::load_from_memory(bytes)
}

/// 等比缩放到 `max_w` × `max_h` 个字符内（字符高宽比按 2:1 计）后转灰度字符画。
pub fn image_to_ascii(img: &DynamicImage, max_w: u16, max_h: u16) -> Vec<String> {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 || max_w == 0 || max_h == 0 {
        return Vec::new();
    }

    let max_w = u64::from(max_w);
    let max_h = u64::from(max_h);
    let (w64, h64) = (u64::from(w), u64::from(h));

    // 先按宽度铺满，过高再按高度收缩
    let mut target_w = max_w.min(w64 * 2).max(1);
    let mut target_h = (h64 * target_w / w64 / 2).max(1);
    if target_h > max_h {
        target_h = max_h;
        target_w = (w64 * target_h * 2 / h64).clamp(1, max_w);
    }

    let gray = img
        .resize_exact(target_w as u32, target_h as u32, FilterType::Triangle)
        .to_luma8();
    let mut lines = Vec::with_capacity(gray.height() as usize);
    for y in 0..gray.height() {
        let mut line = String::with_capacity(gray.width() as usize);
        for x in 0..gray.width() {
            let v = gray.get_pixel(x, y)[0] as f32 / 255.0;
            let idx = (v * (PALETTE.len() as f32 - 1.0)).round() as usize;
            line.push(*PALETTE.get(idx).unwrap_or(&b' ') as char);
        }
        lines.push(line);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{ChapterImage, ChapterItem, ChapterPayload};

    fn img(w: u32, h: u32) -> DynamicImage {
        DynamicImage::new_luma8(w, h)
    }

    #[test]
    fn lru_keeps_capacity_and_evicts_oldest() {
        let mut cache = PageCache::new(2);
        assert!(cache.begin_fetch("a"));
        assert!(!cache.begin_fetch("a"));
        cache.insert("a", img(4, 4));
        cache.insert("b", img(4, 4));
        // 访问 a 使其变新
        assert!(cache.render("a", 10, 10).is_some());
        cache.insert("c", img(4, 4));
        assert_eq!(cache.len(), 2);
        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
        assert!(cache.contains("c"));
    }

    #[test]
    fn zero_capacity_still_holds_one_page() {
        let mut cache = PageCache::new(0);
        cache.insert("a", img(2, 2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn failures_block_refetch_until_cleared() {
        let mut cache = PageCache::new(4);
        assert!(cache.begin_fetch("x"));
        cache.fail("x", "404".to_string());
        assert!(!cache.is_loading("x"));
        assert_eq!(cache.failure("x"), Some("404"));
        assert!(!cache.begin_fetch("x"));
        cache.clear_failures();
        assert!(cache.begin_fetch("x"));
    }

    #[test]
    fn ascii_fits_viewport() {
        let lines = image_to_ascii(&img(800, 1200), 40, 20);
        assert!(!lines.is_empty());
        assert!(lines.len() <= 20);
        assert!(lines.iter().all(|l| l.chars().count() <= 40));
        // 全黑图像对应调色板第一个字符
        assert!(lines[0].chars().all(|c| c == ' '));
    }

    #[test]
    fn wide_image_is_limited_by_width() {
        let lines = image_to_ascii(&img(1000, 100), 50, 40);
        assert_eq!(lines[0].chars().count(), 50);
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn degenerate_sizes_render_nothing() {
        assert!(image_to_ascii(&img(10, 10), 0, 10).is_empty());
    }

    #[test]
    fn lookahead_follows_mode() {
        let payload = ChapterPayload {
            domain_cdn: "https://cdn".to_string(),
            item: ChapterItem {
                chapter_path: "p".to_string(),
                chapter_image: (1..=4)
                    .map(|i| ChapterImage {
                        image_page: i,
                        image_file: format!("{i}.jpg"),
                    })
                    .collect(),
                ..Default::default()
            },
        };
        let mut state = ReaderState::new(Some("c".to_string()), None, ReadingMode::Single, true);
        state.chapter_loaded("c", &payload);
        assert_eq!(wanted_pages(&state, 30), vec![0, 1]);
        state.go_next();
        state.go_next();
        state.go_next();
        assert_eq!(wanted_pages(&state, 30), vec![3]);

        state.set_mode(ReadingMode::Scroll);
        state.scroll_by(65, 120);
        assert_eq!(wanted_pages(&state, 30), vec![2, 3]);
    }
}
