//! 交互层入口：ratatui 终端界面。

pub mod tui;
