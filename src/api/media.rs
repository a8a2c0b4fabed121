use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, ACCEPT_ENCODING, CONNECTION, HeaderMap, HeaderValue, REFERER};

use super::error::{ApiError, ApiResult};
use crate::base_system::context::Config;

/// CDN 图片下载（封面与章节页面）。
#[derive(Clone)]
pub struct MediaClient {
    client: Client,
}

impl MediaClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        // reqwest 未启用 gzip 解码，请求 identity 以便直接拿到图片字节
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("image/*,*/*;q=0.8"));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        if let Ok(referer) = HeaderValue::from_str(&config.comic_api_base) {
            headers.insert(REFERER, referer);
        }

        let mut builder = Client::builder().default_headers(headers);
        if let Some(t) = config.request_timeout() {
            builder = builder.timeout(t);
        }
        if let Some(t) = config.connect_timeout() {
            builder = builder.connect_timeout(t);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    pub fn fetch_bytes(&self, url: &str) -> ApiResult<Vec<u8>> {
        if url.trim().is_empty() {
            return Err(ApiError::MissingInput("image url"));
        }
        let resp = self.client.get(url).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status,
                message: None,
            });
        }
        Ok(resp.bytes()?.to_vec())
    }
}
