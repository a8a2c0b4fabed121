//! 全局配置结构（Config）与默认值。
//!
//! 该模块同时提供生成 `config.yml` 的字段元信息。

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::config::{ConfigError, ConfigSpec, FieldMeta};
use crate::app_state::Theme;
use crate::reader::ReadingMode;

pub const TOKEN_ENV: &str = "OTRUYEN_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // 接口配置
    #[serde(default = "default_comic_api_base")]
    pub comic_api_base: String,
    #[serde(default = "default_image_cdn_base")]
    pub image_cdn_base: String,
    #[serde(default = "default_account_api_base")]
    pub account_api_base: String,
    #[serde(default)]
    pub auth_token: String,

    // 网络配置
    #[serde(default)]
    pub request_timeout: u64,
    #[serde(default)]
    pub connect_timeout: u64,

    // 列表配置
    #[serde(default = "default_fallback_page_size")]
    pub fallback_page_size: u32,
    #[serde(default = "default_history_page_limit")]
    pub history_page_limit: u32,

    // 界面配置
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_page_cache_size")]
    pub page_cache_size: usize,
    #[serde(default = "default_reader_mode")]
    pub reader_default_mode: String,
    #[serde(default = "default_true")]
    pub auto_hide_ui: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            comic_api_base: default_comic_api_base(),
            image_cdn_base: default_image_cdn_base(),
            account_api_base: default_account_api_base(),
            auth_token: String::new(),
            request_timeout: 0,
            connect_timeout: 0,
            fallback_page_size: default_fallback_page_size(),
            history_page_limit: default_history_page_limit(),
            theme: default_theme(),
            page_cache_size: default_page_cache_size(),
            reader_default_mode: default_reader_mode(),
            auto_hide_ui: default_true(),
        }
    }
}

impl ConfigSpec for Config {
    const FILE_NAME: &'static str = "config.yml";

    fn fields() -> &'static [FieldMeta] {
        static FIELDS: [FieldMeta; 12] = [
            FieldMeta {
                name: "comic_api_base",
                description: "漫画内容 API 根地址",
            },
            FieldMeta {
                name: "image_cdn_base",
                description: "封面 CDN 地址（响应未携带 APP_DOMAIN_CDN_IMAGE 时使用）",
            },
            FieldMeta {
                name: "account_api_base",
                description: "账号服务 API 根地址（收藏/历史/评分/评论）",
            },
            FieldMeta {
                name: "auth_token",
                description: "账号服务 Bearer Token，留空表示未登录\n环境变量 OTRUYEN_TOKEN 会覆盖此项",
            },
            FieldMeta {
                name: "request_timeout",
                description: "请求超时时间（秒），0 表示使用默认值",
            },
            FieldMeta {
                name: "connect_timeout",
                description: "连接超时时间（秒），0 表示使用默认值",
            },
            FieldMeta {
                name: "fallback_page_size",
                description: "服务端未返回每页数量时使用的分页大小",
            },
            FieldMeta {
                name: "history_page_limit",
                description: "阅读历史每页条数",
            },
            FieldMeta {
                name: "theme",
                description: "界面主题（dark/light）",
            },
            FieldMeta {
                name: "page_cache_size",
                description: "阅读器内存中保留的已解码页数",
            },
            FieldMeta {
                name: "reader_default_mode",
                description: "阅读器默认模式（single/scroll）",
            },
            FieldMeta {
                name: "auto_hide_ui",
                description: "单页模式翻页后自动隐藏控制栏",
            },
        ];
        &FIELDS
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, url) in [
            ("comic_api_base", &self.comic_api_base),
            ("image_cdn_base", &self.image_cdn_base),
            ("account_api_base", &self.account_api_base),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Validation(format!(
                    "{name} must start with http:// or https://, got '{url}'"
                )));
            }
        }
        if self.fallback_page_size == 0 {
            return Err(ConfigError::Validation(
                "fallback_page_size must be at least 1".to_string(),
            ));
        }
        if self.history_page_limit == 0 {
            return Err(ConfigError::Validation(
                "history_page_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Config {
    /// 命令行 > 环境变量 > 配置文件。
    pub fn apply_token_override(&mut self, cli_token: Option<String>) {
        let env_token = std::env::var(TOKEN_ENV).ok();
        if let Some(token) = cli_token.or(env_token) {
            self.auth_token = token.trim().to_string();
        }
    }

    pub fn token(&self) -> Option<&str> {
        let t = self.auth_token.trim();
        (!t.is_empty()).then_some(t)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout > 0).then(|| Duration::from_secs(self.request_timeout))
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        (self.connect_timeout > 0).then(|| Duration::from_secs(self.connect_timeout))
    }

    pub fn theme(&self) -> Theme {
        if self.theme.eq_ignore_ascii_case("light") {
            Theme::Light
        } else {
            Theme::Dark
        }
    }

    pub fn reading_mode(&self) -> ReadingMode {
        if self.reader_default_mode.eq_ignore_ascii_case("scroll") {
            ReadingMode::Scroll
        } else {
            ReadingMode::Single
        }
    }
}

fn default_comic_api_base() -> String {
    "https://otruyenapi.com/v1/api".to_string()
}

fn default_image_cdn_base() -> String {
    "https://img.otruyenapi.com".to_string()
}

fn default_account_api_base() -> String {
    "http://localhost:5000/api".to_string()
}

fn default_fallback_page_size() -> u32 {
    24
}

fn default_history_page_limit() -> u32 {
    20
}

fn default_theme() -> String {
    "dark".to_string()
}

fn default_page_cache_size() -> usize {
    8
}

fn default_reader_mode() -> String {
    "single".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_token_means_unauthenticated() {
        let mut cfg = Config::default();
        assert!(cfg.token().is_none());
        cfg.auth_token = "   ".to_string();
        assert!(cfg.token().is_none());
        cfg.auth_token = "abc".to_string();
        assert_eq!(cfg.token(), Some("abc"));
    }

    #[test]
    fn cli_token_wins() {
        let mut cfg = Config::default();
        cfg.apply_token_override(Some(" from-cli ".to_string()));
        assert_eq!(cfg.token(), Some("from-cli"));
    }

    #[test]
    fn zero_timeouts_fall_back_to_transport_defaults() {
        let mut cfg = Config::default();
        assert!(cfg.request_timeout().is_none());
        cfg.request_timeout = 15;
        assert_eq!(cfg.request_timeout(), Some(Duration::from_secs(15)));
    }

    #[test]
    fn enum_views_of_string_fields() {
        let mut cfg = Config::default();
        assert_eq!(cfg.theme(), Theme::Dark);
        assert_eq!(cfg.reading_mode(), ReadingMode::Single);
        cfg.theme = "Light".to_string();
        cfg.reader_default_mode = "scroll".to_string();
        assert_eq!(cfg.theme(), Theme::Light);
        assert_eq!(cfg.reading_mode(), ReadingMode::Scroll);
    }
}
