//! 远程接口层：漫画内容 API、图片 CDN、账号服务。

pub mod account;
pub mod cache;
pub mod comic;
pub mod error;
pub mod media;
pub mod models;

pub use error::{ApiError, ApiResult};
