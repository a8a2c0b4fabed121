//! 漫画详情页：信息、简介、章节列表、收藏 / 稍后看、评分与评论。

use super::*;

use crate::api::models::ChapterRef;
use crate::api::account::WatchHistoryWriter;
use crate::reader::progress::spawn_upsert;
use crate::views::account::RelationToggle;
use crate::views::detail::DetailModel;

const COMMENT_LIMIT: u32 = 10;

pub(super) struct DetailScreen {
    slug: String,
    model: Option<DetailModel>,
    error: Option<String>,
    chapters: ListState,
    chapter_area: Rect,
    desc_scroll: u16,
    favorite: RelationToggle,
    watch_later: RelationToggle,
    rating: Option<RatingSummary>,
    comments: Vec<Comment>,
    composing: Option<String>,
}

impl DetailScreen {
    pub(super) fn is_composing(&self) -> bool {
        self.composing.is_some()
    }

    fn toggle_mut(&mut self, kind: RelationKind) -> &mut RelationToggle {
        match kind {
            RelationKind::Favorite => &mut self.favorite,
            RelationKind::WatchLater => &mut self.watch_later,
        }
    }

    fn selected_chapter(&self) -> Option<ChapterRef> {
        let idx = self.chapters.selected()?;
        self.model.as_ref()?.active_chapters().get(idx).cloned()
    }

    fn content_id(&self) -> Option<String> {
        self.model.as_ref().map(|m| m.comic().key().to_string())
    }
}

pub(super) fn open(app: &mut App, slug: String) -> DetailScreen {
    start_spinner(app, "Đang tải truyện");
    let key = slug.clone();
    app.worker.spawn(move |s| Payload::Comic(s.comic.comic(&key)));
    DetailScreen {
        slug,
        model: None,
        error: None,
        chapters: ListState::default(),
        chapter_area: Rect::default(),
        desc_scroll: 0,
        favorite: RelationToggle::new(RelationKind::Favorite),
        watch_later: RelationToggle::new(RelationKind::WatchLater),
        rating: None,
        comments: Vec::new(),
        composing: None,
    }
}

pub(super) fn on_comic(app: &mut App, result: ApiResult<Arc<ComicDetail>>) {
    let authenticated = app.worker.authenticated();
    let Screen::Detail(screen) = &mut app.screen else {
        return;
    };
    let detail = match result {
        Ok(detail) => detail,
        Err(e) => {
            screen.error = Some(e.user_message("Không thể tải truyện"));
            return;
        }
    };
    let model = DetailModel::new(detail);
    info!(
        target: "ui",
        slug = %screen.slug,
        groups = model.groups().len(),
        "comic loaded"
    );
    screen
        .chapters
        .select((!model.active_chapters().is_empty()).then_some(0));
    let key = model.comic().key().to_string();
    screen.model = Some(model);

    if !authenticated {
        return;
    }
    let id = key.clone();
    app.worker
        .spawn(move |s| Payload::Resume(s.account.history_get(&id)));
    for kind in [RelationKind::Favorite, RelationKind::WatchLater] {
        let id = key.clone();
        app.worker.spawn(move |s| Payload::RelationChecked {
            kind,
            result: s.account.relation_check(kind, &id),
        });
    }
    fetch_rating(&app.worker, key.clone());
    fetch_comments(&app.worker, key);
}

fn fetch_rating(worker: &Worker, content_id: String) {
    worker.spawn(move |s| Payload::Rating(s.account.rating_summary(&content_id)));
}

fn fetch_comments(worker: &Worker, content_id: String) {
    worker.spawn(move |s| Payload::Comments(s.account.comments(&content_id, 1, COMMENT_LIMIT)));
}

pub(super) fn on_resume(app: &mut App, result: ApiResult<Option<WatchHistory>>) {
    let Screen::Detail(screen) = &mut app.screen else {
        return;
    };
    let Some(model) = screen.model.as_mut() else {
        return;
    };
    match result {
        Ok(entry) => model.set_resume(entry),
        Err(e) => debug!(target: "account", "resume lookup failed: {e}"),
    }
}

pub(super) fn on_checked(app: &mut App, kind: RelationKind, result: ApiResult<bool>) {
    let Screen::Detail(screen) = &mut app.screen else {
        return;
    };
    if let Err(e) = &result {
        debug!(target: "account", kind = kind.label(), "relation check failed: {e}");
    }
    screen.toggle_mut(kind).checked(result);
}

pub(super) fn on_toggled(
    app: &mut App,
    kind: RelationKind,
    action: ToggleAction,
    result: ApiResult<()>,
) {
    let Screen::Detail(screen) = &mut app.screen else {
        return;
    };
    if let Some(msg) = screen.toggle_mut(kind).finish(&action, result) {
        app.alert(msg);
    }
}

pub(super) fn on_rating(app: &mut App, result: ApiResult<RatingSummary>) {
    let Screen::Detail(screen) = &mut app.screen else {
        return;
    };
    match result {
        Ok(summary) => screen.rating = Some(summary),
        Err(e) => debug!(target: "account", "rating summary failed: {e}"),
    }
}

pub(super) fn on_rated(app: &mut App, result: ApiResult<()>) {
    let Screen::Detail(screen) = &mut app.screen else {
        return;
    };
    match result {
        Ok(()) => {
            app.status = "Đã gửi đánh giá".to_string();
            if let Some(id) = screen.content_id() {
                fetch_rating(&app.worker, id);
            }
        }
        Err(e) => app.alert(e.user_message("Có lỗi xảy ra")),
    }
}

pub(super) fn on_comments(app: &mut App, result: ApiResult<Paged<Comment>>) {
    let Screen::Detail(screen) = &mut app.screen else {
        return;
    };
    match result {
        Ok(page) => screen.comments = page.items,
        Err(e) => debug!(target: "account", "comments failed: {e}"),
    }
}

pub(super) fn on_comment_posted(app: &mut App, result: ApiResult<()>) {
    let Screen::Detail(screen) = &mut app.screen else {
        return;
    };
    match result {
        Ok(()) => {
            app.status = "Đã gửi bình luận".to_string();
            if let Some(id) = screen.content_id() {
                fetch_comments(&app.worker, id);
            }
        }
        Err(e) => app.alert(e.user_message("Có lỗi xảy ra")),
    }
}

/// 章节入口：登录时先在后台写一条阅读记录，然后立即跳转。
fn open_chapter(app: &mut App, chapter: ChapterRef) {
    let Screen::Detail(screen) = &app.screen else {
        return;
    };
    let Some(model) = screen.model.as_ref() else {
        return;
    };
    let route = model.chapter_route(&chapter);
    if app.worker.authenticated() {
        let entry = model.history_entry(&chapter, app.cdn());
        let writer: Arc<dyn WatchHistoryWriter> = app.worker.services.account.clone();
        spawn_upsert(writer, entry);
    }
    navigate(app, route);
}

fn resume_chapter(model: &DetailModel) -> Option<ChapterRef> {
    let entry = model.resume()?;
    let locator = entry.chapter_id.clone()?;
    let name = entry.chapter_name.clone().unwrap_or_default();
    Some(
        model
            .active_chapters()
            .iter()
            .find(|c| c.chapter_api_data == locator)
            .cloned()
            .unwrap_or(ChapterRef {
                chapter_name: name,
                chapter_api_data: locator,
                ..Default::default()
            }),
    )
}

fn toggle_relation(app: &mut App, kind: RelationKind) {
    let authenticated = app.worker.authenticated();
    let Screen::Detail(screen) = &mut app.screen else {
        return;
    };
    let Some(model) = screen.model.as_ref() else {
        return;
    };
    let body = model.relation_body(&app.config.image_cdn_base);
    let action = screen.toggle_mut(kind).begin_toggle(authenticated);
    match action {
        ToggleAction::PromptLogin(msg) => app.alert(msg),
        ToggleAction::Ignore => {}
        ToggleAction::Add => app.worker.spawn(move |s| Payload::RelationToggled {
            kind,
            result: s.account.relation_add(kind, &body),
            action: ToggleAction::Add,
        }),
        ToggleAction::Remove => app.worker.spawn(move |s| Payload::RelationToggled {
            kind,
            result: s.account.relation_remove(kind, &body.content_id),
            action: ToggleAction::Remove,
        }),
    }
}

fn rate(app: &mut App, rating: u8) {
    if !app.worker.authenticated() {
        app.alert("Vui lòng đăng nhập để đánh giá");
        return;
    }
    let Screen::Detail(screen) = &app.screen else {
        return;
    };
    let Some(id) = screen.content_id() else {
        return;
    };
    app.worker
        .spawn(move |s| Payload::Rated(s.account.rate(&id, rating)));
}

fn handle_compose(app: &mut App, key: KeyEvent) {
    let Screen::Detail(screen) = &mut app.screen else {
        return;
    };
    let Some(text) = screen.composing.as_mut() else {
        return;
    };
    match key.code {
        KeyCode::Esc => screen.composing = None,
        KeyCode::Backspace => {
            text.pop();
        }
        KeyCode::Char('v') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            match clipboard::paste_line() {
                Ok(Some(pasted)) => text.push_str(&pasted),
                Ok(None) => {}
                Err(e) => debug!(target: "ui", "clipboard: {e:#}"),
            }
        }
        KeyCode::Char(c) => text.push(c),
        KeyCode::Enter => {
            let content = text.trim().to_string();
            screen.composing = None;
            if content.is_empty() {
                return;
            }
            let Some(id) = screen.content_id() else {
                return;
            };
            app.worker
                .spawn(move |s| Payload::CommentPosted(s.account.post_comment(&id, &content)));
        }
        _ => {}
    }
}

pub(super) fn handle_event(app: &mut App, evt: Event) {
    if let Event::Key(key) = &evt
        && captures_text(app)
    {
        handle_compose(app, *key);
        return;
    }

    let Screen::Detail(screen) = &mut app.screen else {
        return;
    };
    let len = screen
        .model
        .as_ref()
        .map(|m| m.active_chapters().len())
        .unwrap_or(0);
    if handle_list_nav(&mut screen.chapters, len, &evt) {
        return;
    }
    if let Some(me) = is_left_click(&evt) {
        if let Some(idx) = click_index(screen.chapter_area, &screen.chapters, me, len) {
            let again = screen.chapters.selected() == Some(idx);
            screen.chapters.select(Some(idx));
            if again && let Some(chapter) = screen.selected_chapter() {
                open_chapter(app, chapter);
            }
        }
        return;
    }

    let Event::Key(key) = evt else {
        return;
    };
    match key.code {
        KeyCode::Esc => go_back(app),
        KeyCode::Enter => {
            if let Some(chapter) = screen.selected_chapter() {
                open_chapter(app, chapter);
            }
        }
        KeyCode::Char('s') => {
            let chapter = screen.model.as_ref().and_then(|m| m.first_chapter().cloned());
            match chapter {
                Some(chapter) => open_chapter(app, chapter),
                None => app.status = "Truyện chưa có chương nào".to_string(),
            }
        }
        KeyCode::Char('l') => {
            let chapter = screen.model.as_ref().and_then(|m| m.latest_chapter().cloned());
            match chapter {
                Some(chapter) => open_chapter(app, chapter),
                None => app.status = "Truyện chưa có chương nào".to_string(),
            }
        }
        KeyCode::Char('c') => {
            if let Some(chapter) = screen.model.as_ref().and_then(resume_chapter) {
                open_chapter(app, chapter);
            }
        }
        KeyCode::Char('g') => {
            if let Some(model) = screen.model.as_mut() {
                let count = model.groups().len().max(1);
                if model.select_group((model.selected_group() + 1) % count) {
                    let has = !model.active_chapters().is_empty();
                    screen.chapters.select(has.then_some(0));
                    *screen.chapters.offset_mut() = 0;
                }
            }
        }
        KeyCode::Char('f') => toggle_relation(app, RelationKind::Favorite),
        KeyCode::Char('w') => toggle_relation(app, RelationKind::WatchLater),
        KeyCode::Char(c @ '1'..='5') => rate(app, c as u8 - b'0'),
        KeyCode::Char('n') => {
            if app.worker.authenticated() {
                screen.composing = Some(String::new());
            } else {
                app.alert("Vui lòng đăng nhập để bình luận");
            }
        }
        KeyCode::PageDown => screen.desc_scroll = screen.desc_scroll.saturating_add(3),
        KeyCode::PageUp => screen.desc_scroll = screen.desc_scroll.saturating_sub(3),
        _ => {}
    }
}

pub(super) fn draw(frame: &mut ratatui::Frame, area: Rect, app: &mut App) {
    let pal = app.palette();
    let authenticated = app.worker.authenticated();
    let cdn_fallback = app.config.image_cdn_base.clone();
    let Screen::Detail(screen) = &mut app.screen else {
        return;
    };

    if let Some(err) = screen.error.as_deref() {
        message_box(
            frame,
            area,
            &format!("Truyện: {}", screen.slug),
            &format!("{err}\n\nEsc: Quay lại"),
            pal,
        );
        return;
    }
    let Some(model) = screen.model.as_ref() else {
        message_box(frame, area, "Truyện", "Đang tải...", pal);
        return;
    };

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(9),
            Constraint::Min(3),
            Constraint::Length(7),
        ])
        .split(cols[0]);

    // 基本信息
    let comic = model.comic();
    let cdn = if model.cdn().is_empty() {
        cdn_fallback.as_str()
    } else {
        model.cdn()
    };
    let authors = comic.authors();
    let categories: Vec<&str> = comic.category.iter().map(|c| c.name.as_str()).collect();
    let mut info = vec![
        Line::from(Span::styled(comic.name.clone(), pal.title())),
        Line::from(format!(
            "Tình trạng: {} · Tác giả: {}",
            comic.status.label(),
            if authors.is_empty() {
                "Đang cập nhật".to_string()
            } else {
                authors.join(", ")
            }
        )),
        Line::from(format!("Thể loại: {}", categories.join(", "))),
        Line::from(format!(
            "Mới nhất: {}",
            model
                .latest_number()
                .map(|n| format!("Chương {n}"))
                .or_else(|| model.latest_chapter().map(|c| c.display_name()))
                .unwrap_or_else(|| "-".to_string())
        )),
        Line::from(Span::styled(
            comic.thumb_url(cdn),
            Style::default().fg(pal.muted),
        )),
    ];
    let rating = match screen.rating {
        Some(r) => {
            let mine = r
                .user_rating
                .map(|u| format!(" · của bạn: {u}"))
                .unwrap_or_default();
            format!("Đánh giá: {:.1}/5 ({} lượt){mine}", r.average, r.count)
        }
        None if authenticated => "Đánh giá: ...".to_string(),
        None => "Đánh giá: đăng nhập để xem".to_string(),
    };
    info.push(Line::from(rating));
    info.push(Line::from(format!(
        "{}   {}",
        screen.favorite.label(),
        screen.watch_later.label()
    )));
    if let Some(entry) = model.resume() {
        info.push(Line::from(Span::styled(
            format!(
                "Đọc tiếp: Chương {} ({})",
                entry.chapter_name.clone().unwrap_or_default(),
                entry.last_watched_label()
            ),
            Style::default().fg(Color::Green),
        )));
    }
    frame.render_widget(
        Paragraph::new(info)
            .style(pal.base())
            .block(Block::default().borders(Borders::ALL).title("Thông tin")),
        left[0],
    );

    // 简介
    let width = left[1].width.saturating_sub(2) as usize;
    let desc: Vec<Line> = model
        .description(width)
        .into_iter()
        .map(Line::from)
        .collect();
    let max_scroll = (desc.len() as u16).saturating_sub(left[1].height.saturating_sub(2));
    screen.desc_scroll = screen.desc_scroll.min(max_scroll);
    frame.render_widget(
        Paragraph::new(desc)
            .style(pal.base())
            .scroll((screen.desc_scroll, 0))
            .block(Block::default().borders(Borders::ALL).title("Nội dung")),
        left[1],
    );

    // 评论
    let mut lines: Vec<Line> = Vec::new();
    if let Some(text) = screen.composing.as_deref() {
        lines.push(Line::from(vec![
            Span::styled("> ", pal.title()),
            Span::raw(text.to_string()),
            Span::styled("_", Style::default().fg(pal.accent)),
        ]));
    }
    if screen.comments.is_empty() {
        lines.push(Line::from(Span::styled(
            "Chưa có bình luận",
            Style::default().fg(pal.muted),
        )));
    }
    for c in &screen.comments {
        lines.push(Line::from(vec![
            Span::styled(format!("{}: ", c.user.username), pal.title()),
            Span::raw(c.content.clone()),
        ]));
    }
    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .style(pal.base())
            .block(Block::default().borders(Borders::ALL).title("Bình luận")),
        left[2],
    );

    // 章节
    let group_name = model
        .groups()
        .get(model.selected_group())
        .map(|g| g.server_name.clone())
        .unwrap_or_default();
    let items: Vec<ListItem> = model
        .active_chapters()
        .iter()
        .map(|c| ListItem::new(c.display_name()))
        .collect();
    let title = format!(
        "Chương · {} ({}/{})",
        group_name,
        model.selected_group() + 1,
        model.groups().len().max(1)
    );
    screen.chapter_area = cols[1];
    if items.is_empty() {
        message_box(frame, cols[1], &title, "Truyện chưa có chương nào", pal);
        return;
    }
    render_list(frame, cols[1], title, items, &mut screen.chapters, pal, true);
}
