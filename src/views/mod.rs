//! 各界面的纯视图模型（不依赖终端）。

pub mod account;
pub mod detail;
pub mod listing;
