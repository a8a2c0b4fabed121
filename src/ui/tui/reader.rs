//! 阅读器界面：把 `ReaderState` 接到终端输入与 ASCII 渲染上。

use super::*;

use crate::api::account::WatchHistoryWriter;
use crate::reader::gesture::{DragTracker, Gesture};
use crate::reader::pages::{self, PageCache, wanted_pages};
use crate::reader::progress::ProgressReporter;
use crate::reader::state::CHAPTER_NOT_FOUND;
use crate::reader::{Phase, ReaderState, ReadingMode};

/// 非全屏单页时的渲染高度上限（按宽度等比缩放）。
const NATURAL_MAX_HEIGHT: u16 = 400;

pub(super) struct ReaderScreen {
    state: ReaderState,
    progress: ProgressReporter,
    pages: PageCache,
    drag: DragTracker,
    jump: Option<ListState>,
    viewport: Rect,
    /// 上一帧单页非全屏时渲染出的行数，用于限制滚动
    rendered_lines: usize,
}

impl ReaderScreen {
    fn page_height(&self) -> usize {
        (self.viewport.height as usize).max(1)
    }

    /// 当前模式下可滚动的总行数。
    fn scroll_limit(&self) -> usize {
        match self.state.mode() {
            ReadingMode::Scroll => {
                let total = self.state.page_count() * self.page_height();
                total.saturating_sub(self.page_height()) + 1
            }
            ReadingMode::Single => self.rendered_lines.saturating_sub(self.page_height()) + 1,
        }
    }

    fn scroll(&mut self, delta: isize) {
        let limit = self.scroll_limit();
        self.state.scroll_by(delta, limit);
    }
}

pub(super) fn open(app: &mut App, url: Option<String>, comic: Option<String>) -> ReaderScreen {
    let state = ReaderState::new(
        url,
        comic,
        app.config.reading_mode(),
        app.config.auto_hide_ui,
    );
    if let Some(locator) = state.locator() {
        start_spinner(app, "Đang tải chapter");
        fetch_chapter(&app.worker, locator.to_string());
    }
    if let Some(slug) = state.comic_slug() {
        let slug = slug.to_string();
        app.worker
            .spawn(move |s| Payload::ReaderComic(s.comic.comic(&slug)));
    }
    ReaderScreen {
        state,
        progress: ProgressReporter::new(),
        pages: PageCache::new(app.config.page_cache_size),
        drag: DragTracker::default(),
        jump: None,
        viewport: Rect::default(),
        rendered_lines: 0,
    }
}

fn fetch_chapter(worker: &Worker, locator: String) {
    worker.spawn(move |s| {
        let result = s.comic.chapter(&locator);
        Payload::Chapter { locator, result }
    });
}

fn fetch_page(worker: &Worker, url: String) {
    worker.spawn(move |s| {
        let result = s
            .media
            .fetch_bytes(&url)
            .map_err(|e| e.to_string())
            .and_then(|bytes| pages::decode(&bytes).map_err(|e| e.to_string()));
        Payload::Page { url, result }
    });
}

pub(super) fn on_chapter(app: &mut App, locator: String, result: ApiResult<Arc<ChapterPayload>>) {
    let Screen::Reader(screen) = &mut app.screen else {
        return;
    };
    let applied = match &result {
        Ok(payload) => screen.state.chapter_loaded(&locator, payload),
        Err(e) => {
            warn_chapter(&locator, e);
            screen.state.chapter_failed(&locator, e)
        }
    };
    if applied {
        info!(
            target: "reader",
            chapter = %screen.state.chapter_name(),
            pages = screen.state.page_count(),
            "chapter ready"
        );
    } else {
        debug!(target: "reader", %locator, "ignore result for previous chapter");
    }
}

fn warn_chapter(locator: &str, err: &crate::api::ApiError) {
    tracing::warn!(target: "reader", %locator, "chapter load failed: {err}");
}

pub(super) fn on_comic(app: &mut App, result: ApiResult<Arc<ComicDetail>>) {
    let Screen::Reader(screen) = &mut app.screen else {
        return;
    };
    match result {
        Ok(detail) => {
            if !screen.state.comic_loaded(detail) {
                debug!(target: "reader", "comic does not match chapter route");
            }
        }
        Err(e) => debug!(target: "reader", "chapter list unavailable: {e}"),
    }
}

pub(super) fn on_page(app: &mut App, url: String, result: std::result::Result<DynamicImage, String>) {
    let Screen::Reader(screen) = &mut app.screen else {
        return;
    };
    match result {
        Ok(image) => screen.pages.insert(&url, image),
        Err(msg) => {
            debug!(target: "reader", %url, "page failed: {msg}");
            screen.pages.fail(&url, msg);
        }
    }
}

/// 每帧调用：上报阅读进度并预取需要的页面。
pub(super) fn sync(app: &mut App) {
    let Screen::Reader(screen) = &mut app.screen else {
        return;
    };

    let writer: Arc<dyn WatchHistoryWriter> = app.worker.services.account.clone();
    if screen
        .progress
        .report(&screen.state, &app.config.image_cdn_base, &writer)
        .is_some()
    {
        debug!(target: "reader", "progress report queued");
    }

    if *screen.state.phase() != Phase::Ready {
        return;
    }
    for idx in wanted_pages(&screen.state, screen.page_height()) {
        let Some(url) = screen.state.pages().get(idx) else {
            continue;
        };
        if screen.pages.begin_fetch(url) {
            fetch_page(&app.worker, url.clone());
        }
    }
}

fn switch_chapter(app: &mut App, moved: bool) {
    if !moved {
        return;
    }
    let Screen::Reader(screen) = &mut app.screen else {
        return;
    };
    screen.jump = None;
    screen.rendered_lines = 0;
    let Some(locator) = screen.state.locator().map(str::to_string) else {
        return;
    };
    let route = Route::chapter(&locator, screen.state.comic_slug());
    start_spinner(app, "Đang tải chapter");
    fetch_chapter(&app.worker, locator);
    replace_route(app, route);
}

fn handle_jump(app: &mut App, evt: &Event) {
    let Screen::Reader(screen) = &mut app.screen else {
        return;
    };
    let Some(jump) = screen.jump.as_mut() else {
        return;
    };
    let len = screen.state.chapter_nav().map(|n| n.len()).unwrap_or(0);
    if handle_list_nav(jump, len, evt) {
        return;
    }
    let Event::Key(key) = evt else {
        return;
    };
    match key.code {
        KeyCode::Esc | KeyCode::Char('g') => screen.jump = None,
        KeyCode::Enter => {
            let target = jump.selected().and_then(|i| {
                screen
                    .state
                    .chapter_nav()
                    .and_then(|n| n.chronological.get(i))
                    .map(|c| c.chapter_api_data.clone())
            });
            screen.jump = None;
            if let Some(locator) = target {
                let moved = screen.state.switch_chapter(&locator);
                switch_chapter(app, moved);
            }
        }
        _ => {}
    }
}

pub(super) fn handle_event(app: &mut App, evt: Event) {
    if matches!(&app.screen, Screen::Reader(s) if s.jump.is_some()) {
        handle_jump(app, &evt);
        return;
    }
    let Screen::Reader(screen) = &mut app.screen else {
        return;
    };
    let single = screen.state.mode() == ReadingMode::Single;
    let page = screen.page_height() as isize;

    match evt {
        Event::Mouse(me) => match me.kind {
            MouseEventKind::Down(MouseButton::Left) if pos_in(screen.viewport, me.column, me.row) => {
                screen.drag.press(me.column);
            }
            MouseEventKind::Up(MouseButton::Left) => match screen.drag.release(me.column) {
                Some(Gesture::Tap) => screen.state.tap(),
                Some(Gesture::SwipeLeft) if single => {
                    screen.state.go_next();
                }
                Some(Gesture::SwipeRight) if single => {
                    screen.state.go_prev();
                }
                _ => {}
            },
            MouseEventKind::ScrollDown => screen.scroll(3),
            MouseEventKind::ScrollUp => screen.scroll(-3),
            _ => {}
        },
        Event::Key(key) => match key.code {
            KeyCode::Esc => go_back(app),
            KeyCode::Left if single => {
                screen.state.go_prev();
            }
            KeyCode::Right if single => {
                screen.state.go_next();
            }
            KeyCode::Left => screen.scroll(-page),
            KeyCode::Right => screen.scroll(page),
            KeyCode::Down | KeyCode::Char('j') => screen.scroll(1),
            KeyCode::Up | KeyCode::Char('k') => screen.scroll(-1),
            KeyCode::PageDown => screen.scroll(page),
            KeyCode::PageUp => screen.scroll(-page),
            KeyCode::Home => screen.state.scroll_to_top(),
            KeyCode::Char('[') => {
                let moved = screen.state.prev_chapter();
                switch_chapter(app, moved);
            }
            KeyCode::Char(']') => {
                let moved = screen.state.next_chapter();
                switch_chapter(app, moved);
            }
            KeyCode::Char('m') => {
                screen.state.toggle_mode();
                screen.rendered_lines = 0;
                app.status = format!("Chế độ: {}", screen.state.mode().label());
            }
            KeyCode::Char('z') => {
                if screen.state.toggle_scale() {
                    screen.rendered_lines = 0;
                }
            }
            KeyCode::Char(' ') | KeyCode::Char('t') => screen.state.tap(),
            KeyCode::Char('g') => {
                if let Some(nav) = screen.state.chapter_nav().filter(|n| !n.is_empty()) {
                    let mut list = ListState::default();
                    list.select(Some(nav.current.unwrap_or(0)));
                    screen.jump = Some(list);
                } else {
                    app.status = "Chưa có danh sách chương".to_string();
                }
            }
            KeyCode::Char('r') => {
                screen.pages.clear_failures();
            }
            _ => {}
        },
        _ => {}
    }
}

// ---- 绘制 ----

pub(super) fn draw(frame: &mut ratatui::Frame, app: &mut App) {
    let pal = app.palette();
    let status = app.status.clone();
    let Screen::Reader(screen) = &mut app.screen else {
        return;
    };

    let area = frame.size();
    let show_ui = screen.state.ui_visible();
    let (top, body, bottom) = if show_ui {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(3),
                Constraint::Length(1),
            ])
            .split(area);
        (Some(rows[0]), rows[1], Some(rows[2]))
    } else {
        (None, area, None)
    };
    screen.viewport = body;

    match screen.state.phase().clone() {
        Phase::Loading => message_box(frame, body, "Đọc truyện", "Đang tải...", pal),
        Phase::NotFound => message_box(
            frame,
            body,
            "Đọc truyện",
            &format!("{CHAPTER_NOT_FOUND}\n\nEsc: Quay lại"),
            pal,
        ),
        Phase::Error(msg) => message_box(
            frame,
            body,
            "Đọc truyện",
            &format!("{msg}\n\nEsc: Quay lại"),
            pal,
        ),
        Phase::Empty => message_box(frame, body, "Đọc truyện", "Chapter này không có ảnh", pal),
        Phase::Ready => match screen.state.mode() {
            ReadingMode::Single => draw_single(frame, body, screen, pal),
            ReadingMode::Scroll => draw_scroll(frame, body, screen, pal),
        },
    }

    if let Some(top) = top {
        draw_top_bar(frame, top, screen, &status, pal);
    }
    if let Some(bottom) = bottom {
        draw_bottom_bar(frame, bottom, screen, pal);
    }
    if let Some(jump) = screen.jump.as_mut() {
        let items: Vec<ListItem> = screen
            .state
            .chapter_nav()
            .map(|n| {
                n.chronological
                    .iter()
                    .map(|c| ListItem::new(c.display_name()))
                    .collect()
            })
            .unwrap_or_default();
        let rect = centered(area, 50, area.height.saturating_sub(4));
        frame.render_widget(Clear, rect);
        render_list(
            frame,
            rect,
            "Chọn chương".to_string(),
            items,
            jump,
            pal,
            true,
        );
    }
}

fn placeholder(screen: &ReaderScreen, url: &str, idx: usize) -> String {
    match screen.pages.failure(url) {
        Some(msg) => format!("Không tải được trang {}: {msg} (r: thử lại)", idx + 1),
        None => format!("Đang tải trang {}...", idx + 1),
    }
}

fn draw_single(frame: &mut ratatui::Frame, area: Rect, screen: &mut ReaderScreen, pal: Palette) {
    let idx = screen.state.current_page();
    let Some(url) = screen.state.current_url().map(str::to_string) else {
        return;
    };
    let full = screen.state.full_scale();
    let max_h = if full { area.height } else { NATURAL_MAX_HEIGHT };

    let lines = match screen.pages.render(&url, area.width, max_h) {
        Some(lines) => lines.to_vec(),
        None => {
            let text = placeholder(screen, &url, idx);
            message_box(frame, area, "Đọc truyện", &text, pal);
            return;
        }
    };
    screen.rendered_lines = if full { 0 } else { lines.len() };
    let offset = if full { 0 } else { screen.state.scroll_offset() };
    let text: Vec<Line> = lines.into_iter().map(Line::from).collect();
    frame.render_widget(
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .style(pal.base())
            .scroll((offset.min(u16::MAX as usize) as u16, 0)),
        area,
    );
}

/// 竖向连续：每页占一个视口高度，最多同时可见两页。
fn draw_scroll(frame: &mut ratatui::Frame, area: Rect, screen: &mut ReaderScreen, pal: Palette) {
    let height = screen.page_height();
    let offset = screen.state.scroll_offset();
    let first = offset / height;
    let shift = offset % height;

    let mut lines: Vec<Line> = Vec::with_capacity(height);
    let urls: Vec<String> = screen
        .state
        .pages()
        .iter()
        .skip(first)
        .take(2)
        .cloned()
        .collect();
    for (n, url) in urls.iter().enumerate() {
        let idx = first + n;
        let mut page: Vec<String> = match screen.pages.render(url, area.width, area.height) {
            Some(rendered) => rendered.to_vec(),
            None => vec![placeholder(screen, url, idx)],
        };
        page.resize(height, String::new());
        let skip = if n == 0 { shift } else { 0 };
        lines.extend(page.into_iter().skip(skip).map(Line::from));
        if lines.len() >= height {
            break;
        }
    }
    lines.truncate(height);
    frame.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .style(pal.base()),
        area,
    );
}

fn draw_top_bar(
    frame: &mut ratatui::Frame,
    area: Rect,
    screen: &ReaderScreen,
    status: &str,
    pal: Palette,
) {
    let comic = screen
        .state
        .comic()
        .map(|d| d.item.name.clone())
        .unwrap_or_default();
    let chapter = screen.state.chapter_name();
    let position = match screen.state.mode() {
        ReadingMode::Single if screen.state.page_count() > 0 => format!(
            "{}/{}",
            screen.state.current_page() + 1,
            screen.state.page_count()
        ),
        _ => format!("{} trang", screen.state.page_count()),
    };
    let mut spans = vec![
        Span::styled(format!(" {comic} "), pal.title()),
        Span::raw(if chapter.is_empty() {
            String::new()
        } else {
            format!("Chương {chapter} · ")
        }),
        Span::raw(position),
        Span::styled(
            format!(" · {}", screen.state.mode().label()),
            Style::default().fg(pal.muted),
        ),
    ];
    if screen.state.full_scale() {
        spans.push(Span::styled(" · toàn màn hình", Style::default().fg(pal.muted)));
    }
    if !status.is_empty() {
        spans.push(Span::styled(
            format!(" · {status}"),
            Style::default().fg(Color::Yellow),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_bottom_bar(frame: &mut ratatui::Frame, area: Rect, screen: &ReaderScreen, pal: Palette) {
    let mut parts: Vec<&str> = Vec::new();
    if screen.state.mode() == ReadingMode::Single {
        if screen.state.can_go_prev() {
            parts.push("← trang trước");
        }
        if screen.state.can_go_next() {
            parts.push("→ trang sau");
        }
        parts.push("z phóng to");
    } else {
        parts.push("↑/↓ cuộn");
    }
    if let Some(nav) = screen.state.chapter_nav() {
        if nav.prev.is_some() {
            parts.push("[ chương trước");
        }
        if nav.next.is_some() {
            parts.push("] chương sau");
        }
        parts.push("g chọn chương");
    }
    parts.extend(["m đổi chế độ", "Space ẩn/hiện", "Esc quay lại"]);
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            parts.join(" · "),
            Style::default().fg(pal.muted),
        ))),
        area,
    );
}
