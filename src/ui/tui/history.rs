//! 账号列表页：观看历史、收藏、稍后看。

use super::*;

use crate::api::account::ContentType;
use crate::views::account::{HistoryList, ListEntry};

pub(super) struct HistoryScreen {
    list: HistoryList<WatchHistory>,
    state: ListState,
    area: Rect,
}

pub(super) struct RelationScreen {
    kind: RelationKind,
    list: HistoryList<RelationItem>,
    state: ListState,
    area: Rect,
}

/// 未登录时返回应重定向到的路由。
pub(super) fn open_history(app: &mut App) -> std::result::Result<HistoryScreen, Route> {
    let mut list = HistoryList::new();
    list.open(app.worker.authenticated())?;
    start_spinner(app, "Đang tải lịch sử");
    let limit = app.config.history_page_limit;
    app.worker.spawn(move |s| {
        Payload::History(s.account.history_list(ContentType::Comic, 1, limit))
    });
    Ok(HistoryScreen {
        list,
        state: ListState::default(),
        area: Rect::default(),
    })
}

pub(super) fn open_relations(
    app: &mut App,
    kind: RelationKind,
) -> std::result::Result<RelationScreen, Route> {
    let mut list = HistoryList::new();
    list.open(app.worker.authenticated())?;
    start_spinner(app, format!("Đang tải {}", kind.label()));
    let limit = app.config.history_page_limit;
    app.worker.spawn(move |s| {
        Payload::Relations(s.account.relation_list(kind, ContentType::Comic, 1, limit))
    });
    Ok(RelationScreen {
        kind,
        list,
        state: ListState::default(),
        area: Rect::default(),
    })
}

pub(super) fn on_history(app: &mut App, result: ApiResult<Paged<WatchHistory>>) {
    let Screen::History(screen) = &mut app.screen else {
        return;
    };
    screen.list.loaded(result);
    let has = !screen.list.items().is_empty();
    screen.state.select(has.then_some(0));
}

pub(super) fn on_relations(app: &mut App, result: ApiResult<Paged<RelationItem>>) {
    let Screen::Relations(screen) = &mut app.screen else {
        return;
    };
    screen.list.loaded(result);
    let has = !screen.list.items().is_empty();
    screen.state.select(has.then_some(0));
}

// ---- 删除确认 ----

fn ask(app: &mut App, prompt: Option<String>) {
    if let Some(prompt) = prompt {
        app.modal = Some(Modal::Confirm(prompt));
    }
}

/// 确认框点了“是”：只有这里会发出删除请求。
pub(super) fn confirmed(app: &mut App) {
    match &mut app.screen {
        Screen::History(screen) => {
            let Some(command) = screen.list.confirm() else {
                return;
            };
            let cmd = command.clone();
            app.worker.spawn(move |s| {
                let result = match &cmd {
                    ListCommand::Delete(id) => s.account.history_delete(id),
                    ListCommand::Clear => s.account.history_clear(ContentType::Comic),
                };
                Payload::ListCommandDone {
                    command: cmd,
                    result,
                }
            });
            info!(target: "account", ?command, "watch history change requested");
        }
        Screen::Relations(screen) => {
            let Some(command) = screen.list.confirm() else {
                return;
            };
            let kind = screen.kind;
            app.worker.spawn(move |s| {
                let result = match &command {
                    ListCommand::Delete(id) => s.account.relation_remove(kind, id),
                    ListCommand::Clear => Ok(()),
                };
                Payload::ListCommandDone { command, result }
            });
        }
        _ => {}
    }
}

pub(super) fn cancelled(app: &mut App) {
    match &mut app.screen {
        Screen::History(screen) => screen.list.cancel(),
        Screen::Relations(screen) => screen.list.cancel(),
        _ => {}
    }
}

pub(super) fn on_command_done(app: &mut App, command: ListCommand, result: ApiResult<()>) {
    let alert = match &mut app.screen {
        Screen::History(screen) => {
            let alert = screen.list.command_done(&command, result);
            clamp_selection(&mut screen.state, screen.list.items().len());
            alert
        }
        Screen::Relations(screen) => {
            let alert = screen.list.command_done(&command, result);
            clamp_selection(&mut screen.state, screen.list.items().len());
            alert
        }
        _ => None,
    };
    if let Some(msg) = alert {
        app.alert(msg);
    }
}

fn clamp_selection(state: &mut ListState, len: usize) {
    match state.selected() {
        _ if len == 0 => state.select(None),
        Some(i) if i >= len => state.select(Some(len - 1)),
        _ => {}
    }
}

// ---- 事件 ----

fn selected<'a, T>(list: &'a HistoryList<T>, state: &ListState) -> Option<&'a T>
where
    T: ListEntry,
{
    list.items().get(state.selected()?)
}

pub(super) fn handle_event_history(app: &mut App, evt: Event) {
    let Screen::History(screen) = &mut app.screen else {
        return;
    };
    let len = screen.list.items().len();
    if handle_list_nav(&mut screen.state, len, &evt) {
        return;
    }
    if let Some(me) = is_left_click(&evt) {
        if let Some(idx) = click_index(screen.area, &screen.state, me, len) {
            screen.state.select(Some(idx));
        }
        return;
    }
    let Event::Key(key) = evt else {
        return;
    };
    match key.code {
        KeyCode::Esc => go_back(app),
        KeyCode::Enter => {
            if let Some(item) = selected(&screen.list, &screen.state) {
                let slug = item.content_id.clone();
                navigate(app, Route::Comic { slug });
            }
        }
        KeyCode::Char('r') => {
            let route = selected(&screen.list, &screen.state).and_then(|item| {
                let locator = item.chapter_id.as_deref().filter(|c| !c.is_empty())?;
                Some(Route::chapter(locator, Some(&item.content_id)))
            });
            if let Some(route) = route {
                navigate(app, route);
            }
        }
        KeyCode::Char('d') => {
            if let Some(id) = selected(&screen.list, &screen.state).map(|i| i.content_id.clone()) {
                screen.list.request_delete(&id);
                let prompt = screen.list.confirmation_prompt().map(str::to_string);
                ask(app, prompt);
            }
        }
        KeyCode::Char('D') => {
            screen.list.request_clear();
            let prompt = screen.list.confirmation_prompt().map(str::to_string);
            ask(app, prompt);
        }
        _ => {}
    }
}

pub(super) fn handle_event_relations(app: &mut App, evt: Event) {
    let Screen::Relations(screen) = &mut app.screen else {
        return;
    };
    let len = screen.list.items().len();
    if handle_list_nav(&mut screen.state, len, &evt) {
        return;
    }
    if let Some(me) = is_left_click(&evt) {
        if let Some(idx) = click_index(screen.area, &screen.state, me, len) {
            screen.state.select(Some(idx));
        }
        return;
    }
    let Event::Key(key) = evt else {
        return;
    };
    match key.code {
        KeyCode::Esc => go_back(app),
        KeyCode::Enter => {
            if let Some(item) = selected(&screen.list, &screen.state) {
                let slug = item.slug().to_string();
                navigate(app, Route::Comic { slug });
            }
        }
        KeyCode::Char('d') => {
            if let Some(id) = selected(&screen.list, &screen.state).map(|i| i.content_id.clone()) {
                screen.list.request_delete(&id);
                let prompt = format!("Xóa mục này khỏi danh sách {}?", screen.kind.label());
                ask(app, Some(prompt));
            }
        }
        _ => {}
    }
}

// ---- 绘制 ----

fn history_line(item: &WatchHistory) -> String {
    let chapter = item
        .chapter_name
        .as_deref()
        .or(item.episode_name.as_deref())
        .map(|c| format!(" · Chương {c}"))
        .unwrap_or_default();
    format!(
        "{}{chapter} · {}",
        item.content_title,
        item.last_watched_label()
    )
}

fn relation_line(item: &RelationItem) -> String {
    match item.content_status.as_deref().filter(|s| !s.is_empty()) {
        Some(status) => format!("{} · {status}", item.content_title),
        None => item.content_title.clone(),
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_list<T: ListEntry>(
    frame: &mut ratatui::Frame,
    area: Rect,
    title: &str,
    empty: &str,
    list: &HistoryList<T>,
    lines: Vec<String>,
    state: &mut ListState,
    pal: Palette,
) {
    if list.is_loading() {
        message_box(frame, area, title, "Đang tải...", pal);
        return;
    }
    if let Some(err) = list.load_error() {
        message_box(frame, area, title, err, pal);
        return;
    }
    if lines.is_empty() {
        message_box(frame, area, title, empty, pal);
        return;
    }
    let items: Vec<ListItem> = lines.into_iter().map(ListItem::new).collect();
    let title = format!("{title} · {}", list.items().len());
    render_list(frame, area, title, items, state, pal, true);
}

pub(super) fn draw_history(frame: &mut ratatui::Frame, area: Rect, app: &mut App) {
    let pal = app.palette();
    let Screen::History(screen) = &mut app.screen else {
        return;
    };
    screen.area = area;
    let lines = screen.list.items().iter().map(history_line).collect();
    draw_list(
        frame,
        area,
        "Lịch sử xem",
        "Chưa có lịch sử xem",
        &screen.list,
        lines,
        &mut screen.state,
        pal,
    );
}

pub(super) fn draw_relations(frame: &mut ratatui::Frame, area: Rect, app: &mut App) {
    let pal = app.palette();
    let Screen::Relations(screen) = &mut app.screen else {
        return;
    };
    screen.area = area;
    let lines = screen.list.items().iter().map(relation_line).collect();
    let empty = format!("Danh sách {} trống", screen.kind.label());
    draw_list(
        frame,
        area,
        screen.kind.label(),
        &empty,
        &screen.list,
        lines,
        &mut screen.state,
        pal,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_line_shows_chapter_and_date() {
        let item = WatchHistory {
            content_title: "Đảo Hải Tặc".to_string(),
            chapter_name: Some("1099".to_string()),
            last_watched_at: "2024-03-05T10:00:00Z".to_string(),
            ..Default::default()
        };
        assert_eq!(history_line(&item), "Đảo Hải Tặc · Chương 1099 · 05/03/2024");
    }

    #[test]
    fn selection_clamps_after_delete() {
        let mut state = ListState::default();
        state.select(Some(3));
        clamp_selection(&mut state, 2);
        assert_eq!(state.selected(), Some(1));
        clamp_selection(&mut state, 0);
        assert_eq!(state.selected(), None);
    }
}
