//! OTruyện 终端漫画阅读器。
//!
//! 代码结构（读代码入口）：
//! - `base_system`：配置 / 日志等基础设施
//! - `api`：漫画内容 API、图片 CDN、账号服务三个客户端，以及请求缓存
//! - `route`：界面路由及其类 URL 文本形式
//! - `reader`：阅读器状态机、页面缓存、进度上报
//! - `views`：各界面与终端无关的派生状态
//! - `ui`：ratatui 终端界面

use anyhow::{Result, anyhow};
use clap::Parser;
use std::path::Path;

mod api;
mod app_state;
mod base_system;
mod reader;
mod route;
mod ui;
mod views;

use base_system::config::load_or_create;
use base_system::context::Config;
use base_system::logging::{LogOptions, LogSystem};
use route::Route;
use tracing::info;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(name = "otruyen-reader")]
#[command(about = "OTruyen comic reader (Rust TUI)")]
struct Cli {
    /// 启用调试日志输出
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// 数据目录路径（存放 config.yml 与 logs）
    #[arg(long)]
    data_dir: Option<String>,

    /// 账号服务 token，优先于配置文件与 OTRUYEN_TOKEN 环境变量
    #[arg(long)]
    token: Option<String>,

    /// 启动后直接打开的路由，如 `/truyen-tranh/one-piece`
    #[arg(long)]
    open: Option<String>,

    /// 显示版本信息后退出
    #[arg(long, default_value_t = false)]
    version: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("OTruyen Reader v{}", VERSION);
        return Ok(());
    }

    // 路由写错时在进入全屏界面之前报错。
    let start = match cli.open.as_deref() {
        Some(text) => Route::parse(text)?,
        None => Route::Home,
    };

    let data_dir = cli.data_dir.as_deref().map(Path::new);
    let _log = init_logging(cli.debug, data_dir)?;

    let mut config =
        load_or_create::<Config>(data_dir).map_err(|e| anyhow!(e.to_string()))?;
    config.apply_token_override(cli.token);

    info!(
        target: "startup",
        version = VERSION,
        authenticated = config.token().is_some(),
        route = %start,
        "starting"
    );

    ui::tui::run(config, start)
}

fn init_logging(debug: bool, base_dir: Option<&Path>) -> Result<LogSystem> {
    let opts = LogOptions {
        debug,
        use_color: true,
        archive_on_exit: true,
        console: false,
        broadcast_to_ui: true,
    };
    LogSystem::init_with_base(opts, base_dir).map_err(|e| anyhow!(e))
}
