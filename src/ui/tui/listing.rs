//! 分类 / 列表 / 搜索结果页，以及分类索引。

use super::*;

use crate::api::comic::ListKind;
use crate::views::listing::Pager;

pub(super) const MISSING_KEYWORD: &str = "Vui lòng nhập từ khóa tìm kiếm";

pub(super) struct ListingScreen {
    route: Route,
    pager: Pager,
    page: Option<Arc<ListPage>>,
    error: Option<String>,
    missing_keyword: bool,
    loading: bool,
    state: ListState,
    area: Rect,
}

impl ListingScreen {
    fn items(&self) -> &[Comic] {
        self.page.as_deref().map(|p| p.items.as_slice()).unwrap_or(&[])
    }
}

pub(super) fn open(app: &mut App, route: &Route) -> ListingScreen {
    let page = route_page(route).unwrap_or(1);
    let missing_keyword = matches!(route, Route::Search { keyword, .. } if keyword.trim().is_empty());
    let mut screen = ListingScreen {
        route: route.clone(),
        pager: Pager::new(page),
        page: None,
        error: None,
        missing_keyword,
        loading: false,
        state: ListState::default(),
        area: Rect::default(),
    };
    if !missing_keyword {
        screen.loading = true;
        start_spinner(app, "Đang tải danh sách");
        fetch(&app.worker, route.clone());
    }
    screen
}

fn fetch(worker: &Worker, route: Route) {
    worker.spawn(move |s| {
        let result = match &route {
            Route::Category { slug, page } => s.comic.category(slug, *page),
            Route::List { kind, page } => s.comic.list(&ListKind::from_slug(kind), *page),
            Route::Search { keyword, page } => s.comic.search(keyword.trim(), *page),
            _ => Ok(Arc::new(ListPage::default())),
        };
        Payload::Listing(result)
    });
}

fn route_page(route: &Route) -> Option<u32> {
    match route {
        Route::Category { page, .. } | Route::List { page, .. } | Route::Search { page, .. } => {
            Some(*page)
        }
        _ => None,
    }
}

/// 同一查询换页后的路由。
fn with_page(route: &Route, new_page: u32) -> Route {
    let mut route = route.clone();
    match &mut route {
        Route::Category { page, .. } | Route::List { page, .. } | Route::Search { page, .. } => {
            *page = new_page
        }
        _ => {}
    }
    route
}

fn empty_text(route: &Route) -> &'static str {
    match route {
        Route::Search { .. } => "Không tìm thấy truyện nào",
        Route::Category { .. } => "Chưa có truyện nào trong thể loại này",
        _ => "Không có dữ liệu",
    }
}

pub(super) fn on_listing(app: &mut App, result: ApiResult<Arc<ListPage>>) {
    let Screen::Listing(screen) = &mut app.screen else {
        return;
    };
    screen.loading = false;
    match result {
        Ok(page) => {
            let clamped = screen
                .pager
                .update(&page, app.config.fallback_page_size);
            screen.error = None;
            screen
                .state
                .select((!page.items.is_empty()).then_some(0));
            screen.page = Some(page);
            if clamped {
                // 路由里的页码超出总页数：改取最后一页。
                reload_page(app);
            }
        }
        Err(e) => {
            screen.error = Some(e.user_message("Không thể tải danh sách"));
            screen.page = None;
        }
    }
}

/// 按 pager 当前页重新请求，并同步路由。
fn reload_page(app: &mut App) {
    let Screen::Listing(screen) = &mut app.screen else {
        return;
    };
    let route = with_page(&screen.route, screen.pager.page());
    screen.route = route.clone();
    screen.loading = true;
    screen.state.select(None);
    *screen.state.offset_mut() = 0;
    app.worker.generation += 1;
    replace_route(app, route.clone());
    start_spinner(app, "Đang tải danh sách");
    fetch(&app.worker, route);
}

pub(super) fn handle_event(app: &mut App, evt: Event) {
    let Screen::Listing(screen) = &mut app.screen else {
        return;
    };
    let len = screen.items().len();
    if handle_list_nav(&mut screen.state, len, &evt) {
        return;
    }

    if let Some(me) = is_left_click(&evt) {
        if let Some(idx) = click_index(screen.area, &screen.state, me, len) {
            let again = screen.state.selected() == Some(idx);
            screen.state.select(Some(idx));
            if again && let Some(slug) = screen.items().get(idx).map(|c| c.slug.clone()) {
                navigate(app, Route::Comic { slug });
            }
        }
        return;
    }

    let Event::Key(key) = evt else {
        return;
    };
    let changed = match key.code {
        KeyCode::Left | KeyCode::PageUp => screen.pager.prev(),
        KeyCode::Right | KeyCode::PageDown => screen.pager.next(),
        KeyCode::Enter => {
            let slug = screen
                .state
                .selected()
                .and_then(|i| screen.items().get(i))
                .map(|c| c.slug.clone());
            if let Some(slug) = slug {
                navigate(app, Route::Comic { slug });
            }
            return;
        }
        KeyCode::Esc => {
            go_back(app);
            return;
        }
        _ => return,
    };

    if changed {
        reload_page(app);
    }
}

pub(super) fn draw(frame: &mut ratatui::Frame, area: Rect, app: &mut App) {
    let pal = app.palette();
    let Screen::Listing(screen) = &mut app.screen else {
        return;
    };
    screen.area = area;

    let heading = match &screen.route {
        Route::Search { keyword, .. } => format!("Tìm kiếm: {}", keyword.trim()),
        Route::Category { slug, .. } => screen
            .page
            .as_deref()
            .map(|p| p.title_page.clone())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| format!("Thể loại: {slug}")),
        Route::List { kind, .. } => ListKind::from_slug(kind).title().to_string(),
        other => other.title(),
    };

    if screen.missing_keyword {
        message_box(frame, area, &heading, MISSING_KEYWORD, pal);
        return;
    }
    if let Some(err) = screen.error.as_deref() {
        message_box(frame, area, &heading, &format!("{err}\n\nEsc: Quay lại"), pal);
        return;
    }
    if screen.loading && screen.page.is_none() {
        message_box(frame, area, &heading, "Đang tải...", pal);
        return;
    }

    let total_items = screen
        .page
        .as_deref()
        .map(|p| p.params.pagination.total_items)
        .unwrap_or(0);
    let title = format!("{heading} · {total_items} truyện · {}", screen.pager.label());
    if screen.items().is_empty() {
        message_box(frame, area, &title, empty_text(&screen.route), pal);
        return;
    }
    let items = comic_items(screen.items());
    render_list(frame, area, title, items, &mut screen.state, pal, true);
}

// ---- 分类索引 ----

pub(super) struct CategoriesScreen {
    list: Option<Arc<CategoryList>>,
    error: Option<String>,
    state: ListState,
    area: Rect,
}

impl CategoriesScreen {
    fn selected_slug(&self) -> Option<String> {
        let idx = self.state.selected()?;
        self.list
            .as_deref()?
            .items
            .get(idx)
            .map(|c| c.slug.clone())
    }

    fn len(&self) -> usize {
        self.list.as_deref().map(|l| l.items.len()).unwrap_or(0)
    }
}

pub(super) fn open_categories(app: &mut App) -> CategoriesScreen {
    start_spinner(app, "Đang tải thể loại");
    app.worker
        .spawn(|s| Payload::Categories(s.comic.categories()));
    CategoriesScreen {
        list: None,
        error: None,
        state: ListState::default(),
        area: Rect::default(),
    }
}

pub(super) fn on_categories(app: &mut App, result: ApiResult<Arc<CategoryList>>) {
    let Screen::Categories(screen) = &mut app.screen else {
        return;
    };
    match result {
        Ok(list) => {
            screen
                .state
                .select((!list.items.is_empty()).then_some(0));
            screen.list = Some(list);
        }
        Err(e) => screen.error = Some(e.user_message("Không thể tải thể loại")),
    }
}

pub(super) fn handle_event_categories(app: &mut App, evt: Event) {
    let Screen::Categories(screen) = &mut app.screen else {
        return;
    };
    let len = screen.len();
    if handle_list_nav(&mut screen.state, len, &evt) {
        return;
    }
    if let Some(me) = is_left_click(&evt) {
        if let Some(idx) = click_index(screen.area, &screen.state, me, len) {
            let again = screen.state.selected() == Some(idx);
            screen.state.select(Some(idx));
            if again && let Some(slug) = screen.selected_slug() {
                navigate(app, Route::Category { slug, page: 1 });
            }
        }
        return;
    }
    let Event::Key(key) = evt else {
        return;
    };
    match key.code {
        KeyCode::Enter => {
            if let Some(slug) = screen.selected_slug() {
                navigate(app, Route::Category { slug, page: 1 });
            }
        }
        KeyCode::Esc => go_back(app),
        _ => {}
    }
}

pub(super) fn draw_categories(frame: &mut ratatui::Frame, area: Rect, app: &mut App) {
    let pal = app.palette();
    let Screen::Categories(screen) = &mut app.screen else {
        return;
    };
    screen.area = area;
    if let Some(err) = screen.error.as_deref() {
        message_box(frame, area, "Thể loại", err, pal);
        return;
    }
    let Some(list) = screen.list.clone() else {
        message_box(frame, area, "Thể loại", "Đang tải...", pal);
        return;
    };
    let items: Vec<ListItem> = list
        .items
        .iter()
        .map(|c| ListItem::new(c.name.clone()))
        .collect();
    let title = format!("Thể loại · {}", list.items.len());
    render_list(frame, area, title, items, &mut screen.state, pal, true);
}
