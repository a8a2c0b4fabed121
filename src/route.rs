//! 应用内路由：每个界面对应一个 [`Route`]，并有类似 URL 的文本形式，
//! 既用于 `--open` 参数，也用于状态栏显示。

use std::fmt;

use reqwest::Url;
use thiserror::Error;
use urlencoding::encode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Categories,
    Category { slug: String, page: u32 },
    List { kind: String, page: u32 },
    Search { keyword: String, page: u32 },
    Comic { slug: String },
    /// `url` 缺失时仍可解析，阅读器据此进入“未找到”状态。
    Chapter {
        url: Option<String>,
        comic: Option<String>,
    },
    WatchHistory,
    Favorites,
    WatchLater,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("invalid route '{0}'")]
    Malformed(String),
    #[error("unknown route '{0}'")]
    Unknown(String),
    #[error("route '{0}' requires a slug")]
    MissingSlug(String),
}

impl Route {
    pub fn parse(text: &str) -> Result<Self, RouteError> {
        let text = text.trim();
        let rel = if text.starts_with('/') {
            text.to_string()
        } else {
            format!("/{text}")
        };
        let url = Url::parse("http://localhost/")
            .and_then(|base| base.join(&rel))
            .map_err(|_| RouteError::Malformed(text.to_string()))?;

        let query = |key: &str| -> Option<String> {
            url.query_pairs()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.into_owned())
                .filter(|v| !v.trim().is_empty())
        };
        let page = query("page")
            .and_then(|p| p.trim().parse::<u32>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1);

        let segments: Vec<String> = url
            .path_segments()
            .map(|s| s.filter(|p| !p.is_empty()).map(decode_segment).collect())
            .unwrap_or_default();
        let segs: Vec<&str> = segments.iter().map(String::as_str).collect();

        let route = match segs.as_slice() {
            [] => Route::Home,
            ["the-loai"] => Route::Categories,
            ["the-loai", slug] => Route::Category {
                slug: slug.to_string(),
                page,
            },
            ["danh-sach"] => return Err(RouteError::MissingSlug(text.to_string())),
            ["danh-sach", kind] => Route::List {
                kind: kind.to_string(),
                page,
            },
            ["tim-kiem"] => Route::Search {
                keyword: query("keyword").unwrap_or_default(),
                page,
            },
            ["truyen-tranh"] => return Err(RouteError::MissingSlug(text.to_string())),
            ["truyen-tranh", slug] => Route::Comic {
                slug: slug.to_string(),
            },
            ["chapter"] => Route::Chapter {
                url: query("url"),
                comic: query("comic"),
            },
            ["lich-su"] => Route::WatchHistory,
            ["yeu-thich"] => Route::Favorites,
            ["xem-sau"] => Route::WatchLater,
            _ => return Err(RouteError::Unknown(text.to_string())),
        };
        Ok(route)
    }

    pub fn chapter(locator: &str, comic: Option<&str>) -> Self {
        Route::Chapter {
            url: Some(locator.to_string()),
            comic: comic.map(str::to_string),
        }
    }

    /// 状态栏上显示的页面名。
    pub fn title(&self) -> String {
        match self {
            Route::Home => "Trang chủ".to_string(),
            Route::Categories => "Thể loại".to_string(),
            Route::Category { slug, page } => format!("Thể loại: {slug} (trang {page})"),
            Route::List { kind, page } => format!("Danh sách: {kind} (trang {page})"),
            Route::Search { keyword, page } => format!("Tìm kiếm: {keyword} (trang {page})"),
            Route::Comic { slug } => format!("Truyện: {slug}"),
            Route::Chapter { .. } => "Đọc truyện".to_string(),
            Route::WatchHistory => "Lịch sử xem".to_string(),
            Route::Favorites => "Yêu thích".to_string(),
            Route::WatchLater => "Xem sau".to_string(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Home => f.write_str("/"),
            Route::Categories => f.write_str("/the-loai"),
            Route::Category { slug, page } => {
                write!(f, "/the-loai/{}?page={page}", encode(slug))
            }
            Route::List { kind, page } => write!(f, "/danh-sach/{}?page={page}", encode(kind)),
            Route::Search { keyword, page } => {
                write!(f, "/tim-kiem?keyword={}&page={page}", encode(keyword))
            }
            Route::Comic { slug } => write!(f, "/truyen-tranh/{}", encode(slug)),
            Route::Chapter { url, comic } => {
                f.write_str("/chapter")?;
                let mut sep = '?';
                if let Some(url) = url {
                    write!(f, "{sep}url={}", encode(url))?;
                    sep = '&';
                }
                if let Some(comic) = comic {
                    write!(f, "{sep}comic={}", encode(comic))?;
                }
                Ok(())
            }
            Route::WatchHistory => f.write_str("/lich-su"),
            Route::Favorites => f.write_str("/yeu-thich"),
            Route::WatchLater => f.write_str("/xem-sau"),
        }
    }
}

fn decode_segment(seg: &str) -> String {
    String::from_utf8_lossy(&urlencoding::decode_binary(seg.as_bytes())).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_route() {
        assert_eq!(Route::parse("/").unwrap(), Route::Home);
        assert_eq!(Route::parse("").unwrap(), Route::Home);
        assert_eq!(Route::parse("/the-loai").unwrap(), Route::Categories);
        assert_eq!(
            Route::parse("/the-loai/action?page=3").unwrap(),
            Route::Category {
                slug: "action".to_string(),
                page: 3
            }
        );
        assert_eq!(
            Route::parse("/danh-sach/hoan-thanh").unwrap(),
            Route::List {
                kind: "hoan-thanh".to_string(),
                page: 1
            }
        );
        assert_eq!(
            Route::parse("/tim-kiem?keyword=one%20piece&page=2").unwrap(),
            Route::Search {
                keyword: "one piece".to_string(),
                page: 2
            }
        );
        assert_eq!(
            Route::parse("truyen-tranh/one-piece").unwrap(),
            Route::Comic {
                slug: "one-piece".to_string()
            }
        );
        assert_eq!(Route::parse("/lich-su").unwrap(), Route::WatchHistory);
        assert_eq!(Route::parse("/yeu-thich").unwrap(), Route::Favorites);
        assert_eq!(Route::parse("/xem-sau").unwrap(), Route::WatchLater);
    }

    #[test]
    fn chapter_route_keeps_opaque_locator() {
        let r = Route::parse(
            "/chapter?url=https%3A%2F%2Fsv1.otruyencdn.com%2Fv1%2Fapi%2Fchapter%2Fabc&comic=one-piece",
        )
        .unwrap();
        assert_eq!(
            r,
            Route::chapter(
                "https://sv1.otruyencdn.com/v1/api/chapter/abc",
                Some("one-piece")
            )
        );
        assert_eq!(Route::parse(&r.to_string()).unwrap(), r);
    }

    #[test]
    fn chapter_without_url_still_parses() {
        assert_eq!(
            Route::parse("/chapter").unwrap(),
            Route::Chapter {
                url: None,
                comic: None
            }
        );
        assert_eq!(
            Route::parse("/chapter?url=&comic=x").unwrap(),
            Route::Chapter {
                url: None,
                comic: Some("x".to_string())
            }
        );
    }

    #[test]
    fn bad_page_defaults_to_one() {
        for text in ["/the-loai/a?page=0", "/the-loai/a?page=abc", "/the-loai/a"] {
            assert_eq!(
                Route::parse(text).unwrap(),
                Route::Category {
                    slug: "a".to_string(),
                    page: 1
                }
            );
        }
    }

    #[test]
    fn unknown_and_incomplete_paths_fail() {
        assert!(matches!(
            Route::parse("/khong-ton-tai"),
            Err(RouteError::Unknown(_))
        ));
        assert!(matches!(
            Route::parse("/truyen-tranh"),
            Err(RouteError::MissingSlug(_))
        ));
        assert!(matches!(
            Route::parse("/the-loai/a/b"),
            Err(RouteError::Unknown(_))
        ));
    }

    #[test]
    fn search_keyword_is_encoded_when_formatted() {
        let r = Route::Search {
            keyword: "đảo hải tặc & co".to_string(),
            page: 1,
        };
        let text = r.to_string();
        assert!(!text.contains(' '));
        assert_eq!(Route::parse(&text).unwrap(), r);
    }

    #[test]
    fn path_segments_are_percent_decoded() {
        assert_eq!(
            Route::parse("/the-loai/%C4%91am-my").unwrap(),
            Route::Category {
                slug: "đam-my".to_string(),
                page: 1
            }
        );
        let comic = Route::Comic {
            slug: "a b/c".to_string(),
        };
        assert_eq!(comic.to_string(), "/truyen-tranh/a%20b%2Fc");
        assert_eq!(Route::parse(&comic.to_string()).unwrap(), comic);
    }
}
