//! 漫画内容 API 客户端（只读）。
//!
//! 所有查询走 [`QueryCache`]：同一请求在失效或过期前只会真正发出一次；
//! 同键并发调用会等待在途请求完成而不是重复请求。失败不缓存，也不自动重试。

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::cache::{QueryCache, Tag, TagKind};
use super::error::{ApiError, ApiResult};
use super::models::{CategoryList, ChapterPayload, ComicDetail, Envelope, ListPage};
use crate::base_system::context::Config;

const UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120 Safari/537.36";

/// 常用的 `/danh-sach/{type}` 列表。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListKind {
    New,
    ComingSoon,
    Ongoing,
    Completed,
    Other(String),
}

impl ListKind {
    pub fn slug(&self) -> &str {
        match self {
            ListKind::New => "truyen-moi",
            ListKind::ComingSoon => "sap-ra-mat",
            ListKind::Ongoing => "dang-phat-hanh",
            ListKind::Completed => "hoan-thanh",
            ListKind::Other(s) => s,
        }
    }

    pub fn from_slug(slug: &str) -> Self {
        match slug {
            "truyen-moi" => ListKind::New,
            "sap-ra-mat" => ListKind::ComingSoon,
            "dang-phat-hanh" => ListKind::Ongoing,
            "hoan-thanh" => ListKind::Completed,
            other => ListKind::Other(other.to_string()),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            ListKind::New => "Truyện Mới",
            ListKind::ComingSoon => "Sắp Ra Mắt",
            ListKind::Ongoing => "Đang Phát Hành",
            ListKind::Completed => "Hoàn Thành",
            ListKind::Other(s) => s,
        }
    }
}

pub struct ComicApi {
    client: Client,
    base: String,
    cache: Mutex<QueryCache>,
    ready: Condvar,
}

impl ComicApi {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(UA));

        let mut builder = Client::builder().default_headers(headers);
        if let Some(t) = config.request_timeout() {
            builder = builder.timeout(t);
        }
        if let Some(t) = config.connect_timeout() {
            builder = builder.connect_timeout(t);
        }

        Ok(Self {
            client: builder.build()?,
            base: config.comic_api_base.trim_end_matches('/').to_string(),
            cache: Mutex::new(QueryCache::new()),
            ready: Condvar::new(),
        })
    }

    pub fn home(&self) -> ApiResult<Arc<ListPage>> {
        let url = self.endpoint(&["home"])?;
        self.query(url.to_string(), vec![Tag::home()])
    }

    pub fn comic(&self, slug: &str) -> ApiResult<Arc<ComicDetail>> {
        let slug = required(slug, "comic slug")?;
        let url = self.endpoint(&["truyen-tranh", slug])?;
        self.query(url.to_string(), vec![Tag::comic(slug)])
    }

    pub fn category(&self, slug: &str, page: u32) -> ApiResult<Arc<ListPage>> {
        let slug = required(slug, "category slug")?;
        let url = self.endpoint(&["the-loai", slug])?;
        self.query(paged(url, page), vec![Tag::category(slug)])
    }

    pub fn list(&self, kind: &ListKind, page: u32) -> ApiResult<Arc<ListPage>> {
        let url = self.endpoint(&["danh-sach", kind.slug()])?;
        self.query(paged(url, page), vec![Tag::home()])
    }

    pub fn categories(&self) -> ApiResult<Arc<CategoryList>> {
        let url = self.endpoint(&["the-loai"])?;
        self.query(url.to_string(), vec![Tag::all(TagKind::Category)])
    }

    pub fn search(&self, keyword: &str, page: u32) -> ApiResult<Arc<ListPage>> {
        let keyword = required(keyword, "search keyword")?;
        let mut url = self.endpoint(&["tim-kiem"])?;
        url.query_pairs_mut().append_pair("keyword", keyword);
        // 搜索结果不提供标签，只靠缓存的过期与容量上限回收
        self.query(paged(url, page), Vec::new())
    }

    /// 章节定位符原样请求；相对路径按 API 根地址补全。
    pub fn chapter(&self, locator: &str) -> ApiResult<Arc<ChapterPayload>> {
        let locator = required(locator, "chapter locator")?;
        let url = if locator.starts_with("http://") || locator.starts_with("https://") {
            locator.to_string()
        } else {
            self.url(&format!("/{}", locator.trim_start_matches('/')))
        };
        self.query(url, Vec::new())
    }

    pub fn invalidate(&self, tag: &Tag) -> usize {
        self.lock().invalidate(tag)
    }

    fn query<T>(&self, url: String, tags: Vec<Tag>) -> ApiResult<Arc<T>>
    where
        T: DeserializeOwned + Default + Send + Sync + 'static,
    {
        {
            let mut cache = self.lock();
            loop {
                if let Some(hit) = cache.get::<T>(&url) {
                    debug!(target: "cache", url = %url, "hit");
                    return Ok(hit);
                }
                if cache.begin(&url) {
                    break;
                }
                cache = self
                    .ready
                    .wait(cache)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        }

        let result = self.fetch::<T>(&url).map(Arc::new);

        {
            let mut cache = self.lock();
            cache.finish(&url);
            if let Ok(value) = &result {
                cache.insert(url.clone(), Arc::clone(value), tags);
            }
        }
        self.ready.notify_all();
        result
    }

    fn fetch<T>(&self, url: &str) -> ApiResult<T>
    where
        T: DeserializeOwned + Default,
    {
        let started = Instant::now();
        debug!(target: "api", url = %url, "GET");

        let resp = self.client.get(url).send().inspect_err(|e| {
            warn!(target: "api", url = %url, "request failed: {e}");
        })?;
        let status = resp.status();
        let body = resp.text()?;

        if !status.is_success() {
            warn!(target: "api", url = %url, status = status.as_u16(), "non-success response");
            return Err(ApiError::from_status(status, &body));
        }

        let data = decode_envelope::<T>(&body)?;
        info!(
            target: "api",
            url = %url,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "ok"
        );
        Ok(data)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// 根地址后逐段追加路径；slug 中的保留字符按路径段规则转义。
    fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = Url::parse(&self.base)
            .map_err(|e| ApiError::Decode(format!("bad url '{}': {e}", self.base)))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Decode(format!("base url '{}' cannot carry a path", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn lock(&self) -> MutexGuard<'_, QueryCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn paged(mut url: Url, page: u32) -> String {
    url.query_pairs_mut()
        .append_pair("page", &page.max(1).to_string());
    url.to_string()
}

fn required<'a>(value: &'a str, what: &'static str) -> ApiResult<&'a str> {
    let v = value.trim();
    if v.is_empty() {
        Err(ApiError::MissingInput(what))
    } else {
        Ok(v)
    }
}

/// 解析 `{status, message, data}` 信封。`status` 存在且不是 `success` 视为失败。
pub(crate) fn decode_envelope<T>(body: &str) -> ApiResult<T>
where
    T: DeserializeOwned + Default,
{
    let env: Envelope<T> =
        serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))?;
    if !env.status.is_empty() && !env.status.eq_ignore_ascii_case("success") {
        let message = Some(env.message.trim().to_string()).filter(|m| !m.is_empty());
        return Err(ApiError::Envelope {
            status: env.status,
            message,
        });
    }
    Ok(env.data)
}
