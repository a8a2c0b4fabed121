//! 章节阅读器：页面序列、导航状态机、手势、进度上报、页面缓存。

pub mod gesture;
pub mod pages;
pub mod progress;
pub mod sequence;
pub mod state;

pub use state::{Phase, ReaderState, ReadingMode};
