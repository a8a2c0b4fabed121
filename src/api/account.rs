//! 账号服务客户端：阅读历史、收藏 / 稍后看、评分、评论。
//!
//! 未配置 token 时所有调用直接返回 [`ApiError::Unauthenticated`]，不会发出请求。

use reqwest::Method;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use tracing::{debug, warn};

use super::error::{ApiError, ApiResult};
use super::models::null_default;
use crate::base_system::context::Config;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Comic,
    Movie,
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Comic => "comic",
            ContentType::Movie => "movie",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWatchHistory {
    pub content_type: ContentType,
    pub content_id: String,
    pub content_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_thumb: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter_name: Option<String>,
}

/// 每个 (用户, 内容) 一条记录，服务端按 contentId upsert。
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WatchHistory {
    #[serde(rename = "_id", deserialize_with = "null_default")]
    pub id: String,
    pub content_type: ContentType,
    #[serde(deserialize_with = "null_default")]
    pub content_id: String,
    #[serde(deserialize_with = "null_default")]
    pub content_title: String,
    #[serde(deserialize_with = "null_default")]
    pub content_thumb: String,
    pub chapter_id: Option<String>,
    pub chapter_name: Option<String>,
    pub episode_name: Option<String>,
    #[serde(deserialize_with = "null_default")]
    pub last_watched_at: String,
}

impl WatchHistory {
    /// `dd/mm/yyyy`；无法解析时原样返回。
    pub fn last_watched_label(&self) -> String {
        OffsetDateTime::parse(&self.last_watched_at, &Rfc3339)
            .ok()
            .and_then(|t| {
                t.format(format_description!("[day]/[month]/[year]"))
                    .ok()
            })
            .unwrap_or_else(|| self.last_watched_at.clone())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase", bound(deserialize = "T: Default + Deserialize<'de>"))]
pub struct Paged<T: Default> {
    #[serde(deserialize_with = "null_default")]
    pub items: Vec<T>,
    #[serde(deserialize_with = "null_default")]
    pub total_items: u32,
    #[serde(deserialize_with = "null_default")]
    pub total_pages: u32,
    #[serde(deserialize_with = "null_default")]
    pub current_page: u32,
}

/// 用户与内容之间的布尔关系。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    Favorite,
    WatchLater,
}

impl RelationKind {
    fn base(self) -> &'static str {
        match self {
            RelationKind::Favorite => "/favorites",
            RelationKind::WatchLater => "/watch-later",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RelationKind::Favorite => "Yêu thích",
            RelationKind::WatchLater => "Xem sau",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRelation {
    pub content_type: ContentType,
    pub content_id: String,
    pub content_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_thumb: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_total_chapters: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RelationItem {
    #[serde(rename = "_id", deserialize_with = "null_default")]
    pub id: String,
    #[serde(deserialize_with = "null_default")]
    pub content_id: String,
    #[serde(deserialize_with = "null_default")]
    pub content_title: String,
    #[serde(deserialize_with = "null_default")]
    pub content_thumb: String,
    pub content_slug: Option<String>,
    pub content_status: Option<String>,
}

impl RelationItem {
    /// 列表跳转用的 slug；老数据没有 slug 时退回 contentId。
    pub fn slug(&self) -> &str {
        self.content_slug
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.content_id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RatingSummary {
    #[serde(alias = "averageRating", deserialize_with = "null_default")]
    pub average: f64,
    #[serde(alias = "totalRatings", deserialize_with = "null_default")]
    pub count: u32,
    pub user_rating: Option<u8>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRating<'a> {
    content_type: ContentType,
    content_id: &'a str,
    rating: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CommentUser {
    #[serde(deserialize_with = "null_default")]
    pub username: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id", deserialize_with = "null_default")]
    pub id: String,
    #[serde(alias = "userId", deserialize_with = "null_default")]
    pub user: CommentUser,
    #[serde(deserialize_with = "null_default")]
    pub content: String,
    #[serde(deserialize_with = "null_default")]
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateComment<'a> {
    content_type: ContentType,
    content_id: &'a str,
    content: &'a str,
}

/// 阅读进度写入口。阅读器只依赖这个 trait，便于替换。
pub trait WatchHistoryWriter: Send + Sync {
    fn is_authenticated(&self) -> bool;
    fn upsert(&self, entry: &CreateWatchHistory) -> ApiResult<WatchHistory>;
}

pub struct AccountClient {
    client: Client,
    base: String,
    token: Option<String>,
}

impl AccountClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = Client::builder().default_headers(headers);
        if let Some(t) = config.request_timeout() {
            builder = builder.timeout(t);
        }
        if let Some(t) = config.connect_timeout() {
            builder = builder.connect_timeout(t);
        }

        Ok(Self {
            client: builder.build()?,
            base: config.account_api_base.trim_end_matches('/').to_string(),
            token: config.token().map(str::to_string),
        })
    }

    pub fn authenticated(&self) -> bool {
        self.token.is_some()
    }

    // ---- watch history ----

    pub fn history_list(
        &self,
        content_type: ContentType,
        page: u32,
        limit: u32,
    ) -> ApiResult<Paged<WatchHistory>> {
        let req = self.request(Method::GET, "/watch-history")?.query(&[
            ("contentType", content_type.as_str().to_string()),
            ("page", page.max(1).to_string()),
            ("limit", limit.max(1).to_string()),
        ]);
        self.send_json(req)
    }

    /// 没有记录（404）时返回 `None`。
    pub fn history_get(&self, content_id: &str) -> ApiResult<Option<WatchHistory>> {
        let req = self.request(Method::GET, &format!("/watch-history/{content_id}"))?;
        match self.send_json(req) {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn history_delete(&self, content_id: &str) -> ApiResult<()> {
        let req = self.request(Method::DELETE, &format!("/watch-history/{content_id}"))?;
        self.send_empty(req)
    }

    pub fn history_clear(&self, content_type: ContentType) -> ApiResult<()> {
        let req = self
            .request(Method::DELETE, "/watch-history")?
            .query(&[("contentType", content_type.as_str())]);
        self.send_empty(req)
    }

    // ---- favorites / watch later ----

    pub fn relation_check(&self, kind: RelationKind, content_id: &str) -> ApiResult<bool> {
        let req = self.request(Method::GET, &format!("{}/check/{content_id}", kind.base()))?;
        let v: Value = self.send_json(req)?;
        Ok(pick_flag(&v))
    }

    pub fn relation_add(&self, kind: RelationKind, body: &CreateRelation) -> ApiResult<()> {
        let req = self.request(Method::POST, kind.base())?.json(body);
        self.send_empty(req)
    }

    pub fn relation_remove(&self, kind: RelationKind, content_id: &str) -> ApiResult<()> {
        let req = self.request(Method::DELETE, &format!("{}/{content_id}", kind.base()))?;
        self.send_empty(req)
    }

    pub fn relation_list(
        &self,
        kind: RelationKind,
        content_type: ContentType,
        page: u32,
        limit: u32,
    ) -> ApiResult<Paged<RelationItem>> {
        let req = self.request(Method::GET, kind.base())?.query(&[
            ("contentType", content_type.as_str().to_string()),
            ("page", page.max(1).to_string()),
            ("limit", limit.max(1).to_string()),
        ]);
        self.send_json(req)
    }

    // ---- ratings / comments ----

    pub fn rating_summary(&self, content_id: &str) -> ApiResult<RatingSummary> {
        let req = self.request(Method::GET, &format!("/ratings/{content_id}"))?;
        self.send_json(req)
    }

    pub fn rate(&self, content_id: &str, rating: u8) -> ApiResult<()> {
        if !(1..=5).contains(&rating) {
            return Err(ApiError::MissingInput("rating between 1 and 5"));
        }
        let req = self.request(Method::POST, "/ratings")?.json(&CreateRating {
            content_type: ContentType::Comic,
            content_id,
            rating,
        });
        self.send_empty(req)
    }

    pub fn comments(&self, content_id: &str, page: u32, limit: u32) -> ApiResult<Paged<Comment>> {
        let req = self
            .request(Method::GET, &format!("/comments/{content_id}"))?
            .query(&[
                ("page", page.max(1).to_string()),
                ("limit", limit.max(1).to_string()),
            ]);
        self.send_json(req)
    }

    pub fn post_comment(&self, content_id: &str, content: &str) -> ApiResult<()> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ApiError::MissingInput("comment text"));
        }
        let req = self.request(Method::POST, "/comments")?.json(&CreateComment {
            content_type: ContentType::Comic,
            content_id,
            content,
        });
        self.send_empty(req)
    }

    // ---- plumbing ----

    fn request(&self, method: Method, path: &str) -> ApiResult<RequestBuilder> {
        let token = self.token.as_deref().ok_or(ApiError::Unauthenticated)?;
        let url = format!("{}{}", self.base, path);
        debug!(target: "account", method = %method, url = %url, "request");
        Ok(self
            .client
            .request(method, url)
            .header(AUTHORIZATION, format!("Bearer {token}")))
    }

    fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> ApiResult<T> {
        let resp = req.send()?;
        let status = resp.status();
        let body = resp.text()?;
        if !status.is_success() {
            if status.as_u16() != 404 {
                warn!(target: "account", status = status.as_u16(), "request rejected");
            }
            return Err(ApiError::from_status(status, &body));
        }
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn send_empty(&self, req: RequestBuilder) -> ApiResult<()> {
        let resp = req.send()?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            warn!(target: "account", status = status.as_u16(), "request rejected");
            return Err(ApiError::from_status(status, &body));
        }
        Ok(())
    }
}

impl WatchHistoryWriter for AccountClient {
    fn is_authenticated(&self) -> bool {
        self.authenticated()
    }

    fn upsert(&self, entry: &CreateWatchHistory) -> ApiResult<WatchHistory> {
        let req = self.request(Method::POST, "/watch-history")?.json(entry);
        self.send_json(req)
    }
}

/// 兼容 `{isFavorite}` / `{exists}` / `{data: {...}}` 几种返回。
fn pick_flag(v: &Value) -> bool {
    const KEYS: &[&str] = &["isFavorite", "isWatchLater", "exists", "exist", "result"];
    match v {
        Value::Bool(b) => *b,
        Value::Object(map) => KEYS
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_bool))
            .or_else(|| map.get("data").map(pick_flag))
            .unwrap_or(false),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anonymous() -> AccountClient {
        AccountClient::new(&Config::default()).unwrap()
    }

    #[test]
    fn anonymous_calls_short_circuit() {
        let c = anonymous();
        assert!(!c.authenticated());
        assert!(matches!(
            c.history_list(ContentType::Comic, 1, 20),
            Err(ApiError::Unauthenticated)
        ));
        assert!(matches!(
            c.relation_check(RelationKind::Favorite, "x"),
            Err(ApiError::Unauthenticated)
        ));
        assert!(matches!(
            c.upsert(&CreateWatchHistory::default()),
            Err(ApiError::Unauthenticated)
        ));
    }

    #[test]
    fn rating_out_of_range_is_rejected() {
        let mut cfg = Config::default();
        cfg.auth_token = "t".to_string();
        let c = AccountClient::new(&cfg).unwrap();
        assert!(matches!(c.rate("x", 0), Err(ApiError::MissingInput(_))));
        assert!(matches!(c.rate("x", 6), Err(ApiError::MissingInput(_))));
    }

    #[test]
    fn watch_history_body_is_camel_case_and_sparse() {
        let body = CreateWatchHistory {
            content_type: ContentType::Comic,
            content_id: "abc".to_string(),
            content_title: "One Piece".to_string(),
            content_thumb: None,
            chapter_id: Some("https://x/1".to_string()),
            chapter_name: Some("1".to_string()),
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["contentType"], "comic");
        assert_eq!(v["contentId"], "abc");
        assert_eq!(v["chapterId"], "https://x/1");
        assert!(v.get("contentThumb").is_none());
    }

    #[test]
    fn history_page_decodes() {
        let raw = r#"{
            "items": [{
                "_id": "h1", "contentType": "comic", "contentId": "abc",
                "contentTitle": "One Piece", "contentThumb": null,
                "chapterId": "https://x/1", "chapterName": "1",
                "lastWatchedAt": "2024-03-05T10:00:00.000Z"
            }],
            "totalItems": 1, "totalPages": 1, "currentPage": 1
        }"#;
        let page: Paged<WatchHistory> = serde_json::from_str(raw).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].content_thumb, "");
        assert_eq!(page.items[0].last_watched_label(), "05/03/2024");
    }

    #[test]
    fn unparseable_timestamp_is_shown_raw() {
        let h = WatchHistory {
            last_watched_at: "yesterday".to_string(),
            ..Default::default()
        };
        assert_eq!(h.last_watched_label(), "yesterday");
    }

    #[test]
    fn flag_shapes() {
        assert!(pick_flag(&serde_json::json!({"isFavorite": true})));
        assert!(pick_flag(&serde_json::json!({"data": {"exists": true}})));
        assert!(!pick_flag(&serde_json::json!({"isFavorite": false})));
        assert!(!pick_flag(&serde_json::json!("nope")));
    }

    #[test]
    fn relation_slug_falls_back_to_content_id() {
        let mut item = RelationItem {
            content_id: "abc".to_string(),
            ..Default::default()
        };
        assert_eq!(item.slug(), "abc");
        item.content_slug = Some("one-piece".to_string());
        assert_eq!(item.slug(), "one-piece");
    }

    #[test]
    fn rating_summary_aliases() {
        let r: RatingSummary =
            serde_json::from_str(r#"{"averageRating": 4.5, "totalRatings": 10, "userRating": 5}"#)
                .unwrap();
        assert_eq!(r.count, 10);
        assert_eq!(r.user_rating, Some(5));
    }
}
