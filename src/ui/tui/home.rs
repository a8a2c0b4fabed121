//! 首页：焦点推荐、最新更新、全部，以及两个可翻页的列表轮播。

use super::*;

use crate::api::cache::Tag;
use crate::api::comic::ListKind;
use crate::views::listing::{HomeSections, Pager};

const SECTION_COUNT: usize = 4;
const CAROUSEL_NEW: usize = 0;
const CAROUSEL_DONE: usize = 1;

struct Carousel {
    kind: ListKind,
    pager: Pager,
    page: Option<Arc<ListPage>>,
    error: Option<String>,
}

impl Carousel {
    fn new(kind: ListKind) -> Self {
        Self {
            kind,
            pager: Pager::default(),
            page: None,
            error: None,
        }
    }

    fn items(&self) -> &[Comic] {
        self.page.as_deref().map(|p| p.items.as_slice()).unwrap_or(&[])
    }

    /// 只接受当前页码的结果；连按翻页时先发出的旧请求可能后到。
    fn apply(&mut self, requested: u32, result: ApiResult<Arc<ListPage>>, fallback: u32) -> bool {
        if requested != self.pager.page() {
            debug!(target: "ui", requested, current = self.pager.page(), "stale carousel page dropped");
            return false;
        }
        match result {
            Ok(page) => {
                self.pager.update(&page, fallback);
                self.error = None;
                self.page = Some(page);
            }
            Err(e) => self.error = Some(e.user_message("Không có dữ liệu")),
        }
        true
    }
}

pub(super) struct HomeScreen {
    home: Option<Arc<ListPage>>,
    error: Option<String>,
    focus: usize,
    states: [ListState; SECTION_COUNT],
    areas: [Rect; SECTION_COUNT],
    carousels: [Carousel; 2],
}

impl Default for HomeScreen {
    fn default() -> Self {
        Self {
            home: None,
            error: None,
            focus: 0,
            states: Default::default(),
            areas: [Rect::default(); SECTION_COUNT],
            carousels: [
                Carousel::new(ListKind::New),
                Carousel::new(ListKind::Completed),
            ],
        }
    }
}

impl HomeScreen {
    /// 区块顺序：最新更新、全部、两个轮播。
    fn section_items(&self, section: usize) -> &[Comic] {
        match section {
            0 | 1 => {
                let Some(home) = self.home.as_deref() else {
                    return &[];
                };
                let sections = HomeSections::new(home);
                if section == 0 {
                    sections.newest
                } else {
                    sections.all
                }
            }
            2 => self.carousels[CAROUSEL_NEW].items(),
            _ => self.carousels[CAROUSEL_DONE].items(),
        }
    }

    fn selected_slug(&self) -> Option<String> {
        let idx = self.states[self.focus].selected()?;
        self.section_items(self.focus)
            .get(idx)
            .map(|c| c.slug.clone())
    }
}

pub(super) fn open(app: &mut App) -> HomeScreen {
    let screen = HomeScreen::default();
    start_spinner(app, "Đang tải trang chủ");
    app.worker.spawn(|s| Payload::Home(s.comic.home()));
    for (slot, carousel) in screen.carousels.iter().enumerate() {
        fetch_carousel(&app.worker, slot, carousel.kind.clone(), 1);
    }
    screen
}

fn fetch_carousel(worker: &Worker, slot: usize, kind: ListKind, page: u32) {
    worker.spawn(move |s| Payload::Carousel {
        slot,
        page,
        result: s.comic.list(&kind, page),
    });
}

pub(super) fn on_home(app: &mut App, result: ApiResult<Arc<ListPage>>) {
    let Screen::Home(home) = &mut app.screen else {
        return;
    };
    match result {
        Ok(page) => {
            info!(target: "ui", items = page.items.len(), "home loaded");
            home.states[0].select((!page.items.is_empty()).then_some(0));
            home.states[1].select((!page.items.is_empty()).then_some(0));
            home.home = Some(page);
            home.error = None;
        }
        Err(e) => home.error = Some(e.user_message("Không thể tải trang chủ")),
    }
}

pub(super) fn on_carousel(
    app: &mut App,
    slot: usize,
    page: u32,
    result: ApiResult<Arc<ListPage>>,
) {
    let Screen::Home(home) = &mut app.screen else {
        return;
    };
    let fallback = app.config.fallback_page_size;
    let Some(carousel) = home.carousels.get_mut(slot) else {
        return;
    };
    if carousel.apply(page, result, fallback) {
        let has = !carousel.items().is_empty();
        home.states[slot + 2].select(has.then_some(0));
    }
}

pub(super) fn handle_event(app: &mut App, evt: Event) {
    let Screen::Home(home) = &mut app.screen else {
        return;
    };

    let focus = home.focus;
    let len = home.section_items(focus).len();
    if handle_list_nav(&mut home.states[focus], len, &evt) {
        return;
    }

    if let Some(me) = is_left_click(&evt) {
        let hit = (0..SECTION_COUNT).find(|i| pos_in(home.areas[*i], me.column, me.row));
        if let Some(section) = hit {
            let len = home.section_items(section).len();
            if let Some(idx) = click_index(home.areas[section], &home.states[section], me, len) {
                let again = home.focus == section && home.states[section].selected() == Some(idx);
                home.focus = section;
                home.states[section].select(Some(idx));
                if again && let Some(slug) = home.selected_slug() {
                    navigate(app, Route::Comic { slug });
                }
            } else {
                home.focus = section;
            }
        }
        return;
    }

    let Event::Key(key) = evt else {
        return;
    };
    match key.code {
        KeyCode::Tab => home.focus = (home.focus + 1) % SECTION_COUNT,
        KeyCode::BackTab => home.focus = (home.focus + SECTION_COUNT - 1) % SECTION_COUNT,
        KeyCode::Left | KeyCode::Right if focus >= 2 => {
            let slot = focus - 2;
            let carousel = &mut home.carousels[slot];
            let changed = if key.code == KeyCode::Left {
                carousel.pager.prev()
            } else {
                carousel.pager.next()
            };
            if changed {
                let (kind, page) = (carousel.kind.clone(), carousel.pager.page());
                home.states[focus].select(None);
                *home.states[focus].offset_mut() = 0;
                fetch_carousel(&app.worker, slot, kind, page);
            }
        }
        KeyCode::Enter => {
            if let Some(slug) = home.selected_slug() {
                navigate(app, Route::Comic { slug });
            }
        }
        KeyCode::Char('r') => {
            let dropped = app.worker.services.comic.invalidate(&Tag::home());
            debug!(target: "ui", dropped, "refresh home");
            open_route(app, Route::Home);
        }
        KeyCode::Esc => go_back(app),
        _ => {}
    }
}

pub(super) fn draw(frame: &mut ratatui::Frame, area: Rect, app: &mut App) {
    let pal = app.palette();
    let recent: Vec<String> = app
        .ui
        .reading_history()
        .take(5)
        .map(str::to_string)
        .collect();
    let Screen::Home(home) = &mut app.screen else {
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(4)])
        .split(area);
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(cols[0]);
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(cols[1]);
    home.areas = [left[0], left[1], right[0], right[1]];

    // 焦点推荐
    let mut hero: Vec<Line> = Vec::new();
    if let Some(err) = home.error.as_deref() {
        hero.push(Line::from(Span::styled(
            err.to_string(),
            Style::default().fg(Color::Red),
        )));
    } else if let Some(page) = home.home.as_deref() {
        for comic in HomeSections::new(page).hero {
            hero.push(Line::from(vec![
                Span::styled("★ ", Style::default().fg(Color::Yellow)),
                Span::styled(comic.name.clone(), pal.title()),
                Span::styled(
                    format!("  {}", comic.status.label()),
                    Style::default().fg(pal.muted),
                ),
            ]));
        }
    } else {
        hero.push(Line::from("Đang tải..."));
    }
    if !recent.is_empty() {
        hero.push(Line::from(Span::styled(
            format!("Gần đây: {}", recent.join(", ")),
            Style::default().fg(pal.muted),
        )));
    }
    let title = home
        .home
        .as_deref()
        .map(|p| p.title_page.clone())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Nổi bật".to_string());
    frame.render_widget(
        Paragraph::new(hero)
            .style(pal.base())
            .block(Block::default().borders(Borders::ALL).title(title)),
        rows[0],
    );

    for section in 0..SECTION_COUNT {
        let title = match section {
            0 => "Mới cập nhật".to_string(),
            1 => "Tất cả".to_string(),
            _ => {
                let c = &home.carousels[section - 2];
                format!("{} · {}", c.kind.title(), c.pager.label())
            }
        };
        let carousel_error = section
            .checked_sub(2)
            .and_then(|slot| home.carousels[slot].error.clone());
        if let Some(err) = carousel_error {
            message_box(frame, home.areas[section], &title, &err, pal);
            continue;
        }
        let items = comic_items(home.section_items(section));
        let focused = home.focus == section;
        render_list(
            frame,
            home.areas[section],
            title,
            items,
            &mut home.states[section],
            pal,
            focused,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{ListParams, Pagination};

    fn list_page(slug: &str) -> Arc<ListPage> {
        Arc::new(ListPage {
            items: vec![Comic {
                slug: slug.to_string(),
                ..Default::default()
            }],
            params: ListParams {
                pagination: Pagination {
                    total_items: 100,
                    total_items_per_page: Some(24),
                    current_page: 1,
                },
                ..Default::default()
            },
            ..Default::default()
        })
    }

    #[test]
    fn late_result_for_an_earlier_page_is_ignored() {
        let mut carousel = Carousel::new(ListKind::New);
        assert!(carousel.apply(1, Ok(list_page("p1")), 24));
        assert!(carousel.pager.next());
        assert!(carousel.pager.next());
        assert_eq!(carousel.pager.page(), 3);

        assert!(carousel.apply(3, Ok(list_page("p3")), 24));
        assert!(!carousel.apply(2, Ok(list_page("p2")), 24));
        assert_eq!(carousel.items()[0].slug, "p3");
        assert_eq!(carousel.pager.page(), 3);
    }
}
