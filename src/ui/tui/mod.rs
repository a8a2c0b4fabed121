use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use image::DynamicImage;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout};
use ratatui::prelude::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use tracing::{debug, info};

mod clipboard;
mod detail;
mod history;
mod home;
mod listing;
mod menu;
mod reader;

use crate::api::ApiResult;
use crate::api::account::{
    AccountClient, Comment, Paged, RatingSummary, RelationItem, RelationKind, WatchHistory,
};
use crate::api::comic::ComicApi;
use crate::api::media::MediaClient;
use crate::api::models::{CategoryList, ChapterPayload, Comic, ComicDetail, ListPage};
use crate::app_state::{Theme, UiState};
use crate::base_system::context::Config;
use crate::base_system::logging::take_broadcast_rx;
use crate::route::Route;
use crate::views::account::{ListCommand, ToggleAction};
use crate::views::listing::summary_line;

const SPINNER_FRAMES: &[char] = &['|', '/', '-', '\\'];

const LOG_HEIGHT: u16 = 6;

/// 远程服务句柄，克隆后交给后台线程。
#[derive(Clone)]
pub(super) struct Services {
    comic: Arc<ComicApi>,
    media: MediaClient,
    account: Arc<AccountClient>,
}

impl Services {
    pub(crate) fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            comic: Arc::new(ComicApi::new(config).context("init comic api client")?),
            media: MediaClient::new(config).context("init media client")?,
            account: Arc::new(AccountClient::new(config).context("init account client")?),
        })
    }
}

/// 后台任务结果。
enum Payload {
    Home(ApiResult<Arc<ListPage>>),
    Carousel {
        slot: usize,
        page: u32,
        result: ApiResult<Arc<ListPage>>,
    },
    Listing(ApiResult<Arc<ListPage>>),
    Categories(ApiResult<Arc<CategoryList>>),
    Comic(ApiResult<Arc<ComicDetail>>),
    Resume(ApiResult<Option<WatchHistory>>),
    RelationChecked {
        kind: RelationKind,
        result: ApiResult<bool>,
    },
    RelationToggled {
        kind: RelationKind,
        action: ToggleAction,
        result: ApiResult<()>,
    },
    Rating(ApiResult<RatingSummary>),
    Rated(ApiResult<()>),
    Comments(ApiResult<Paged<Comment>>),
    CommentPosted(ApiResult<()>),
    Chapter {
        locator: String,
        result: ApiResult<Arc<ChapterPayload>>,
    },
    ReaderComic(ApiResult<Arc<ComicDetail>>),
    Page {
        url: String,
        result: std::result::Result<DynamicImage, String>,
    },
    History(ApiResult<Paged<WatchHistory>>),
    Relations(ApiResult<Paged<RelationItem>>),
    ListCommandDone {
        command: ListCommand,
        result: ApiResult<()>,
    },
}

/// 每个消息带着发起时的界面代数；界面切换后旧结果直接丢弃。
struct WorkerMsg {
    generation: u64,
    payload: Payload,
}

pub(super) struct Worker {
    tx: Sender<WorkerMsg>,
    services: Services,
    generation: u64,
}

impl Worker {
    fn spawn<F>(&self, job: F)
    where
        F: FnOnce(&Services) -> Payload + Send + 'static,
    {
        let tx = self.tx.clone();
        let services = self.services.clone();
        let generation = self.generation;
        thread::spawn(move || {
            let payload = job(&services);
            let _ = tx.send(WorkerMsg {
                generation,
                payload,
            });
        });
    }

    fn authenticated(&self) -> bool {
        self.services.account.authenticated()
    }
}

enum Screen {
    Home(home::HomeScreen),
    Categories(listing::CategoriesScreen),
    Listing(listing::ListingScreen),
    Detail(Box<detail::DetailScreen>),
    Reader(Box<reader::ReaderScreen>),
    History(history::HistoryScreen),
    Relations(history::RelationScreen),
}

enum Modal {
    Alert(String),
    Confirm(String),
}

#[derive(Clone, Copy)]
struct Palette {
    text: Color,
    accent: Color,
    muted: Color,
    bg: Color,
}

impl Palette {
    fn of(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self {
                text: Color::White,
                accent: Color::Cyan,
                muted: Color::DarkGray,
                bg: Color::Reset,
            },
            Theme::Light => Self {
                text: Color::Black,
                accent: Color::Blue,
                muted: Color::Gray,
                bg: Color::White,
            },
        }
    }

    fn base(&self) -> Style {
        Style::default().fg(self.text).bg(self.bg)
    }

    fn highlight(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD | Modifier::REVERSED)
    }

    fn title(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD)
    }
}

pub(super) struct App {
    config: Config,
    ui: UiState,
    route: Route,
    history: Vec<Route>,
    screen: Screen,
    modal: Option<Modal>,
    search_input: String,
    menu_state: ListState,
    status: String,
    logs: Vec<String>,
    should_quit: bool,
    last_frame: Rect,

    // worker
    worker: Worker,
    worker_rx: Receiver<WorkerMsg>,

    // spinner
    spinner_active: bool,
    spinner_text: String,
    spinner_idx: usize,
    spinner_last: Instant,

    // log
    log_rx: Option<crossbeam_channel::Receiver<String>>,
}

impl App {
    fn new(config: Config, services: Services) -> Self {
        let (tx, worker_rx) = mpsc::channel();
        let mut menu_state = ListState::default();
        menu_state.select(Some(0));

        Self {
            ui: UiState::new(config.theme()),
            config,
            route: Route::Home,
            history: Vec::new(),
            screen: Screen::Home(home::HomeScreen::default()),
            modal: None,
            search_input: String::new(),
            menu_state,
            status: "/ tìm kiếm · m menu · Esc quay lại · q thoát".to_string(),
            logs: Vec::new(),
            should_quit: false,
            last_frame: Rect::default(),
            worker: Worker {
                tx,
                services,
                generation: 0,
            },
            worker_rx,
            spinner_active: false,
            spinner_text: String::new(),
            spinner_idx: 0,
            spinner_last: Instant::now(),
            log_rx: take_broadcast_rx(),
        }
    }

    fn push_log(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        let trimmed = msg.trim_end_matches(['\r', '\n']);
        self.logs.push(trimmed.to_string());
        if self.logs.len() > 200 {
            let overflow = self.logs.len() - 200;
            self.logs.drain(0..overflow);
        }
    }

    fn palette(&self) -> Palette {
        Palette::of(self.ui.theme)
    }

    fn alert(&mut self, msg: impl Into<String>) {
        self.modal = Some(Modal::Alert(msg.into()));
    }

    fn cdn(&self) -> &str {
        &self.config.image_cdn_base
    }
}

pub fn run(config: Config, start: Route) -> Result<()> {
    let services = Services::new(&config)?;

    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("init terminal")?;

    let result = run_loop(&mut terminal, config, services, start);

    disable_raw_mode().ok();
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )
    .ok();
    terminal.show_cursor().ok();

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    config: Config,
    services: Services,
    start: Route,
) -> Result<()> {
    let mut app = App::new(config, services);
    info!(target: "ui", route = %start, "open");
    open_route(&mut app, start);

    loop {
        tick_spinner(&mut app);
        poll_worker(&mut app);
        drain_log_channel(&mut app);
        reader::sync(&mut app);

        terminal.draw(|f| draw_ui(f, &mut app))?;

        if !handle_event(&mut app)? {
            break;
        }
    }

    Ok(())
}

// ---- 路由 ----

pub(super) fn navigate(app: &mut App, route: Route) {
    let prev = std::mem::replace(&mut app.route, route.clone());
    app.history.push(prev);
    open_route(app, route);
}

/// 不入历史栈的跳转（翻页、重定向）。
pub(super) fn replace_route(app: &mut App, route: Route) {
    app.route = route;
}

pub(super) fn go_back(app: &mut App) {
    match app.history.pop() {
        Some(prev) => open_route(app, prev),
        None => app.status = "Đang ở trang đầu · q để thoát".to_string(),
    }
}

fn open_route(app: &mut App, route: Route) {
    app.worker.generation += 1;
    app.route = route.clone();
    app.modal = None;
    app.ui.close_menu();
    app.ui.close_search();
    stop_spinner(app);
    debug!(target: "ui", route = %route, generation = app.worker.generation, "route");

    let screen = match route {
        Route::Home => Screen::Home(home::open(app)),
        Route::Categories => Screen::Categories(listing::open_categories(app)),
        Route::Category { .. } | Route::List { .. } | Route::Search { .. } => {
            Screen::Listing(listing::open(app, &route))
        }
        Route::Comic { slug } => {
            app.ui.set_selected_comic(Some(slug.clone()));
            app.ui.add_to_history(&slug);
            Screen::Detail(Box::new(detail::open(app, slug)))
        }
        Route::Chapter { url, comic } => Screen::Reader(Box::new(reader::open(app, url, comic))),
        Route::WatchHistory => match history::open_history(app) {
            Ok(screen) => Screen::History(screen),
            Err(redirect) => {
                open_route(app, redirect);
                app.alert("Vui lòng đăng nhập để xem lịch sử");
                return;
            }
        },
        Route::Favorites | Route::WatchLater => {
            let kind = if route == Route::Favorites {
                RelationKind::Favorite
            } else {
                RelationKind::WatchLater
            };
            match history::open_relations(app, kind) {
                Ok(screen) => Screen::Relations(screen),
                Err(redirect) => {
                    open_route(app, redirect);
                    app.alert(format!("Vui lòng đăng nhập để xem {}", kind.label()));
                    return;
                }
            }
        }
    };
    app.screen = screen;
}

// ---- 事件 ----

fn draw_ui(frame: &mut ratatui::Frame, app: &mut App) {
    let pal = app.palette();
    app.last_frame = frame.size();
    frame.render_widget(Block::default().style(pal.base()), frame.size());

    if let Screen::Reader(_) = app.screen {
        reader::draw(frame, app);
    } else {
        let (header, main, log_area, footer) = chrome_layout(frame.size());
        draw_header(frame, header, app);
        match app.screen {
            Screen::Home(_) => home::draw(frame, main, app),
            Screen::Categories(_) => listing::draw_categories(frame, main, app),
            Screen::Listing(_) => listing::draw(frame, main, app),
            Screen::Detail(_) => detail::draw(frame, main, app),
            Screen::History(_) => history::draw_history(frame, main, app),
            Screen::Relations(_) => history::draw_relations(frame, main, app),
            Screen::Reader(_) => {}
        }
        render_log_box(frame, log_area, app);
        draw_footer(frame, footer, app);
    }

    if app.ui.menu_open {
        menu::draw_menu(frame, app);
    }
    if app.ui.search_open {
        menu::draw_search(frame, app);
    }
    if let Some(modal) = app.modal.as_ref() {
        draw_modal(frame, modal, pal);
    }
}

fn handle_event(app: &mut App) -> Result<bool> {
    if !event::poll(Duration::from_millis(200)).context("poll event")? {
        return Ok(true);
    }

    let evt = event::read().context("read event")?;
    if let Event::Key(key) = &evt {
        if key.kind != KeyEventKind::Press {
            return Ok(true);
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            app.should_quit = true;
            return Ok(false);
        }
    }

    if app.modal.is_some() {
        handle_event_modal(app, evt);
    } else if app.ui.search_open {
        menu::handle_event_search(app, evt);
    } else if app.ui.menu_open {
        menu::handle_event_menu(app, evt);
    } else if !handle_global_key(app, &evt) {
        match app.screen {
            Screen::Home(_) => home::handle_event(app, evt),
            Screen::Categories(_) => listing::handle_event_categories(app, evt),
            Screen::Listing(_) => listing::handle_event(app, evt),
            Screen::Detail(_) => detail::handle_event(app, evt),
            Screen::Reader(_) => reader::handle_event(app, evt),
            Screen::History(_) => history::handle_event_history(app, evt),
            Screen::Relations(_) => history::handle_event_relations(app, evt),
        }
    }

    Ok(!app.should_quit)
}

/// 返回 `true` 表示按键已被全局处理。
fn handle_global_key(app: &mut App, evt: &Event) -> bool {
    let Event::Key(key) = evt else {
        return false;
    };
    if captures_text(app) {
        return false;
    }
    let in_reader = matches!(app.screen, Screen::Reader(_));
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('/') => {
            app.ui.toggle_search();
            app.search_input.clear();
        }
        KeyCode::F(2) => app.ui.toggle_menu(),
        KeyCode::Char('m') if !in_reader => app.ui.toggle_menu(),
        _ => return false,
    }
    true
}

/// 详情页正在输入评论时，字符键不作为快捷键。
fn captures_text(app: &App) -> bool {
    matches!(&app.screen, Screen::Detail(d) if d.is_composing())
}

fn handle_event_modal(app: &mut App, evt: Event) {
    let Event::Key(key) = evt else {
        return;
    };
    let Some(modal) = app.modal.as_ref() else {
        return;
    };
    match modal {
        Modal::Alert(_) => {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
                app.modal = None;
            }
        }
        Modal::Confirm(_) => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                app.modal = None;
                history::confirmed(app);
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.modal = None;
                history::cancelled(app);
            }
            _ => {}
        },
    }
}

// ---- 后台结果 ----

fn poll_worker(app: &mut App) {
    while let Ok(msg) = app.worker_rx.try_recv() {
        if msg.generation != app.worker.generation {
            debug!(target: "ui", generation = msg.generation, "drop stale result");
            continue;
        }
        stop_spinner(app);
        match msg.payload {
            Payload::Home(result) => home::on_home(app, result),
            Payload::Carousel { slot, page, result } => {
                home::on_carousel(app, slot, page, result)
            }
            Payload::Listing(result) => listing::on_listing(app, result),
            Payload::Categories(result) => listing::on_categories(app, result),
            Payload::Comic(result) => detail::on_comic(app, result),
            Payload::Resume(result) => detail::on_resume(app, result),
            Payload::RelationChecked { kind, result } => detail::on_checked(app, kind, result),
            Payload::RelationToggled {
                kind,
                action,
                result,
            } => detail::on_toggled(app, kind, action, result),
            Payload::Rating(result) => detail::on_rating(app, result),
            Payload::Rated(result) => detail::on_rated(app, result),
            Payload::Comments(result) => detail::on_comments(app, result),
            Payload::CommentPosted(result) => detail::on_comment_posted(app, result),
            Payload::Chapter { locator, result } => reader::on_chapter(app, locator, result),
            Payload::ReaderComic(result) => reader::on_comic(app, result),
            Payload::Page { url, result } => reader::on_page(app, url, result),
            Payload::History(result) => history::on_history(app, result),
            Payload::Relations(result) => history::on_relations(app, result),
            Payload::ListCommandDone { command, result } => {
                history::on_command_done(app, command, result)
            }
        }
    }
}

// ---- spinner / 日志 ----

pub(super) fn start_spinner(app: &mut App, text: impl Into<String>) {
    app.spinner_active = true;
    app.spinner_text = text.into();
    app.spinner_idx = 0;
    app.spinner_last = Instant::now();
    app.status = format!("{} {}", app.spinner_text, SPINNER_FRAMES[app.spinner_idx]);
}

pub(super) fn stop_spinner(app: &mut App) {
    if app.spinner_active {
        app.spinner_active = false;
        app.spinner_text.clear();
        app.status.clear();
    }
}

fn tick_spinner(app: &mut App) {
    if !app.spinner_active {
        return;
    }
    if app.spinner_last.elapsed() < Duration::from_millis(140) {
        return;
    }
    app.spinner_idx = (app.spinner_idx + 1) % SPINNER_FRAMES.len();
    app.spinner_last = Instant::now();
    app.status = format!("{} {}", app.spinner_text, SPINNER_FRAMES[app.spinner_idx]);
}

fn drain_log_channel(app: &mut App) {
    if let Some(rx) = app.log_rx.as_ref() {
        let rx = rx.clone();
        for line in rx.try_iter() {
            app.push_log(line);
        }
    }
}

// ---- 布局与公共绘制 ----

/// 标题栏 / 主区 / 日志 / 提示栏。
fn chrome_layout(area: Rect) -> (Rect, Rect, Rect, Rect) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(6),
            Constraint::Length(LOG_HEIGHT),
            Constraint::Length(1),
        ])
        .split(area);
    (layout[0], layout[1], layout[2], layout[3])
}

fn draw_header(frame: &mut ratatui::Frame, area: Rect, app: &App) {
    let pal = app.palette();
    let mut spans = vec![
        Span::styled(" OTruyện ", pal.title()),
        Span::styled(app.route.title(), Style::default().fg(pal.text)),
    ];
    if !app.status.is_empty() {
        spans.push(Span::styled(
            format!("  · {}", app.status),
            Style::default().fg(Color::Yellow),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_footer(frame: &mut ratatui::Frame, area: Rect, app: &App) {
    let hint = match app.screen {
        Screen::Home(_) => "Tab đổi khu vực · ←/→ trang · Enter mở",
        Screen::Categories(_) => "↑/↓ chọn · Enter mở thể loại",
        Screen::Listing(_) => "↑/↓ chọn · ←/→ trang · Enter mở",
        Screen::Detail(_) => {
            "s đầu · l mới nhất · c đọc tiếp · g server · f yêu thích · w xem sau · 1-5 đánh giá · n bình luận"
        }
        Screen::History(_) => "Enter mở · r đọc tiếp · d xóa · D xóa tất cả",
        Screen::Relations(_) => "Enter mở · d xóa",
        Screen::Reader(_) => "",
    };
    let pal = app.palette();
    let line = Line::from(vec![
        Span::styled(hint, Style::default().fg(pal.muted)),
        Span::styled(
            "  ·  / tìm · m menu · Esc quay lại · q thoát",
            Style::default().fg(pal.muted),
        ),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn render_log_box(frame: &mut ratatui::Frame, area: Rect, app: &App) {
    let mut lines = Vec::new();
    if app.logs.is_empty() {
        lines.push(Line::from("Nhật ký: trống"));
    } else {
        let visible = area.height.saturating_sub(2).max(1) as usize;
        lines.extend(
            app.logs
                .iter()
                .rev()
                .take(visible)
                .rev()
                .map(|m| style_log_line(m)),
        );
    }

    let log = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Nhật ký"));
    frame.render_widget(log, area);
}

fn style_log_line(line: &str) -> Line<'static> {
    let mut parts = line.split_whitespace();
    let level = parts.next().unwrap_or("").to_ascii_uppercase();
    let rest: Vec<&str> = parts.collect();

    let color = match level.as_str() {
        "ERROR" => Color::Red,
        "WARN" => Color::Yellow,
        "INFO" => Color::Cyan,
        _ => Color::Gray,
    };
    let mut spans = vec![Span::styled(
        level,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )];
    if let Some(target) = rest.first() {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            (*target).to_string(),
            Style::default().fg(Color::LightBlue),
        ));
    }
    let message = rest.iter().skip(1).copied().collect::<Vec<_>>().join(" ");
    if !message.is_empty() {
        spans.push(Span::raw(" "));
        spans.push(Span::raw(message));
    }
    Line::from(spans)
}

fn draw_modal(frame: &mut ratatui::Frame, modal: &Modal, pal: Palette) {
    let (title, text, hint) = match modal {
        Modal::Alert(msg) => ("Thông báo", msg.as_str(), "Enter: đóng"),
        Modal::Confirm(msg) => ("Xác nhận", msg.as_str(), "y: đồng ý · n: hủy"),
    };
    let area = centered(frame.size(), 60, 7);
    frame.render_widget(Clear, area);
    let lines = vec![
        Line::from(text.to_string()),
        Line::from(""),
        Line::from(Span::styled(hint, Style::default().fg(pal.muted))),
    ];
    frame.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .style(pal.base())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(title)
                    .border_style(Style::default().fg(pal.accent)),
            ),
        area,
    );
}

/// 居中矩形，尺寸不超过 `area`。
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect {
        x: area.x + (area.width - w) / 2,
        y: area.y + (area.height - h) / 2,
        width: w,
        height: h,
    }
}

fn message_box(frame: &mut ratatui::Frame, area: Rect, title: &str, text: &str, pal: Palette) {
    frame.render_widget(
        Paragraph::new(text.to_string())
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .style(pal.base())
            .block(Block::default().borders(Borders::ALL).title(title.to_string())),
        area,
    );
}

fn comic_items(items: &[Comic]) -> Vec<ListItem<'static>> {
    items
        .iter()
        .map(|c| ListItem::new(summary_line(c)))
        .collect()
}

fn render_list(
    frame: &mut ratatui::Frame,
    area: Rect,
    title: String,
    items: Vec<ListItem<'static>>,
    state: &mut ListState,
    pal: Palette,
    focused: bool,
) {
    let border = if focused {
        Style::default().fg(pal.accent)
    } else {
        Style::default().fg(pal.muted)
    };
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(border),
        )
        .style(pal.base())
        .highlight_style(pal.highlight())
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, state);
}

pub(super) fn select_next(state: &mut ListState, len: usize) {
    if len == 0 {
        state.select(None);
        return;
    }
    let next = match state.selected() {
        Some(idx) if idx + 1 < len => idx + 1,
        _ => 0,
    };
    state.select(Some(next));
}

pub(super) fn select_prev(state: &mut ListState, len: usize) {
    if len == 0 {
        state.select(None);
        return;
    }
    let prev = match state.selected() {
        Some(0) | None => len.saturating_sub(1),
        Some(idx) => idx - 1,
    };
    state.select(Some(prev));
}

/// 列表在 `area`（含边框）里被点击时对应的下标。
fn click_index(area: Rect, state: &ListState, me: &MouseEvent, len: usize) -> Option<usize> {
    if !pos_in(area, me.column, me.row) {
        return None;
    }
    let row = me.row.checked_sub(area.y + 1)?;
    if row >= area.height.saturating_sub(2) {
        return None;
    }
    let idx = state.offset() + row as usize;
    (idx < len).then_some(idx)
}

fn pos_in(area: Rect, col: u16, row: u16) -> bool {
    col >= area.x
        && col < area.x.saturating_add(area.width)
        && row >= area.y
        && row < area.y.saturating_add(area.height)
}

/// 方向键 / 滚轮选择的通用处理。返回 `true` 表示已处理。
fn handle_list_nav(state: &mut ListState, len: usize, evt: &Event) -> bool {
    match evt {
        Event::Key(KeyEvent { code, .. }) => match code {
            KeyCode::Down | KeyCode::Char('j') => select_next(state, len),
            KeyCode::Up | KeyCode::Char('k') => select_prev(state, len),
            KeyCode::Home => state.select((len > 0).then_some(0)),
            KeyCode::End => state.select(len.checked_sub(1)),
            _ => return false,
        },
        Event::Mouse(me) => match me.kind {
            MouseEventKind::ScrollDown => select_next(state, len),
            MouseEventKind::ScrollUp => select_prev(state, len),
            _ => return false,
        },
        _ => return false,
    }
    true
}

fn is_left_click(evt: &Event) -> Option<&MouseEvent> {
    match evt {
        Event::Mouse(me) if me.kind == MouseEventKind::Down(MouseButton::Left) => Some(me),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_selection_wraps() {
        let mut state = ListState::default();
        select_next(&mut state, 3);
        assert_eq!(state.selected(), Some(0));
        select_prev(&mut state, 3);
        assert_eq!(state.selected(), Some(2));
        select_next(&mut state, 3);
        assert_eq!(state.selected(), Some(0));
        select_next(&mut state, 0);
        assert_eq!(state.selected(), None);
    }

    #[test]
    fn centered_rect_is_clamped() {
        let area = Rect::new(0, 0, 40, 10);
        let r = centered(area, 60, 7);
        assert_eq!(r.width, 40);
        assert_eq!(r.y, 1);
    }

    #[test]
    fn hit_testing() {
        let area = Rect::new(2, 2, 10, 5);
        assert!(pos_in(area, 2, 2));
        assert!(!pos_in(area, 12, 2));
        assert!(!pos_in(area, 5, 7));
    }
}
