//! 浮层：导航菜单与搜索框。

use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuAction {
    Home,
    NewComics,
    Categories,
    History,
    Favorites,
    WatchLater,
    ToggleTheme,
    Quit,
}

impl MenuAction {
    fn route(self) -> Option<Route> {
        Some(match self {
            MenuAction::Home => Route::Home,
            MenuAction::NewComics => Route::List {
                kind: "truyen-moi".to_string(),
                page: 1,
            },
            MenuAction::Categories => Route::Categories,
            MenuAction::History => Route::WatchHistory,
            MenuAction::Favorites => Route::Favorites,
            MenuAction::WatchLater => Route::WatchLater,
            MenuAction::ToggleTheme | MenuAction::Quit => return None,
        })
    }
}

const MENU: &[(&str, MenuAction)] = &[
    ("Trang chủ", MenuAction::Home),
    ("Truyện mới", MenuAction::NewComics),
    ("Thể loại", MenuAction::Categories),
    ("Lịch sử xem", MenuAction::History),
    ("Yêu thích", MenuAction::Favorites),
    ("Xem sau", MenuAction::WatchLater),
    ("Đổi giao diện", MenuAction::ToggleTheme),
    ("Thoát", MenuAction::Quit),
];

fn run_menu_action(app: &mut App, action: MenuAction) {
    app.ui.close_menu();
    if let Some(route) = action.route() {
        navigate(app, route);
        return;
    }
    match action {
        MenuAction::ToggleTheme => {
            app.ui.toggle_theme();
            info!(target: "ui", theme = ?app.ui.theme, "theme changed");
        }
        MenuAction::Quit => app.should_quit = true,
        _ => {}
    }
}

pub(super) fn handle_event_menu(app: &mut App, evt: Event) {
    if handle_list_nav(&mut app.menu_state, MENU.len(), &evt) {
        return;
    }
    if let Some(me) = is_left_click(&evt) {
        let area = menu_area(app.last_frame);
        match click_index(area, &app.menu_state, me, MENU.len()) {
            Some(idx) => run_menu_action(app, MENU[idx].1),
            None if !pos_in(area, me.column, me.row) => app.ui.close_menu(),
            None => {}
        }
        return;
    }
    let Event::Key(key) = evt else {
        return;
    };
    match key.code {
        KeyCode::Esc | KeyCode::F(2) | KeyCode::Char('m') => app.ui.close_menu(),
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Enter => {
            if let Some(idx) = app.menu_state.selected().filter(|i| *i < MENU.len()) {
                run_menu_action(app, MENU[idx].1);
            }
        }
        _ => {}
    }
}

fn menu_area(frame: Rect) -> Rect {
    let rect = centered(frame, 30, MENU.len() as u16 + 2);
    Rect { y: frame.y + 1, ..rect }
}

pub(super) fn draw_menu(frame: &mut ratatui::Frame, app: &mut App) {
    let pal = app.palette();
    let area = menu_area(frame.size());
    let items: Vec<ListItem> = MENU
        .iter()
        .map(|(label, action)| {
            let text = match action {
                MenuAction::ToggleTheme => {
                    let current = match app.ui.theme {
                        Theme::Dark => "tối",
                        Theme::Light => "sáng",
                    };
                    format!("{label} ({current})")
                }
                _ => label.to_string(),
            };
            ListItem::new(text)
        })
        .collect();
    frame.render_widget(Clear, area);
    render_list(
        frame,
        area,
        "Menu".to_string(),
        items,
        &mut app.menu_state,
        pal,
        true,
    );
}

// ---- 搜索 ----

pub(super) fn handle_event_search(app: &mut App, evt: Event) {
    let Event::Key(key) = evt else {
        return;
    };
    match key.code {
        KeyCode::Esc => app.ui.close_search(),
        KeyCode::Enter => {
            let keyword = app.search_input.trim().to_string();
            if keyword.is_empty() {
                app.status = listing::MISSING_KEYWORD.to_string();
                return;
            }
            app.ui.close_search();
            app.search_input.clear();
            navigate(app, Route::Search { keyword, page: 1 });
        }
        KeyCode::Backspace => {
            app.search_input.pop();
        }
        KeyCode::Char('v') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            match clipboard::paste_line() {
                Ok(Some(text)) => app.search_input.push_str(&text),
                Ok(None) => {}
                Err(e) => debug!(target: "ui", "clipboard: {e:#}"),
            }
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.search_input.push(c)
        }
        _ => {}
    }
}

pub(super) fn draw_search(frame: &mut ratatui::Frame, app: &App) {
    let pal = app.palette();
    let area = frame.size();
    let rect = Rect {
        y: area.y + 1,
        ..centered(area, 60, 3)
    };
    frame.render_widget(Clear, rect);
    let line = Line::from(vec![
        Span::raw(app.search_input.clone()),
        Span::styled("_", Style::default().fg(pal.accent)),
    ]);
    frame.render_widget(
        Paragraph::new(line).style(pal.base()).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Tìm truyện (Enter tìm · Esc đóng · Ctrl+V dán)")
                .border_style(Style::default().fg(pal.accent)),
        ),
        rect,
    );
}
