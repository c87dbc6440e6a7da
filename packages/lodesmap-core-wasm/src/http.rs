//! Byte-range reads over `fetch`.

use std::ops::Range;

use bytes::Bytes;
use futures::future::{FutureExt, LocalBoxFuture};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, RequestMode, Response};

use crate::console_log;
use crate::error::{LodesError, Result};
use crate::range_source::RangeSource;

/// `RangeSource` backed by the browser's fetch API.
#[derive(Clone, Copy, Debug, Default)]
pub struct FetchRangeSource;

impl FetchRangeSource {
    pub fn new() -> Self {
        FetchRangeSource
    }
}

fn fetch_error(url: &str, message: impl Into<String>) -> LodesError {
    LodesError::Fetch {
        url: url.to_string(),
        message: message.into(),
    }
}

async fn send(url: &str, method: &str, range: Option<&str>) -> Result<Response> {
    let init = RequestInit::new();
    init.set_method(method);
    init.set_mode(RequestMode::Cors);
    let request = Request::new_with_str_and_init(url, &init)?;
    if let Some(range) = range {
        request.headers().set("Range", range)?;
    }

    let window = web_sys::window().ok_or_else(|| fetch_error(url, "no window"))?;
    let response: Response = JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(|e| fetch_error(url, LodesError::from(e).to_string()))?
        .dyn_into()?;
    if !response.ok() {
        return Err(fetch_error(
            url,
            format!("{} {}", response.status(), response.status_text()),
        ));
    }
    Ok(response)
}

async fn body(response: &Response) -> Result<Bytes> {
    let buffer = JsFuture::from(response.array_buffer()?).await?;
    Ok(Bytes::from(js_sys::Uint8Array::new(&buffer).to_vec()))
}

/// Total size from `Content-Range: bytes 0-0/12345`.
fn content_range_total(header: &str) -> Option<u64> {
    header.rsplit('/').next()?.trim().parse().ok()
}

async fn byte_length(url: &str) -> Result<u64> {
    let head = send(url, "HEAD", None).await?;
    if let Some(len) = head
        .headers()
        .get("Content-Length")?
        .and_then(|v| v.parse::<u64>().ok())
    {
        return Ok(len);
    }

    // Some hosts omit Content-Length on HEAD; ask for one byte instead
    let probe = send(url, "GET", Some("bytes=0-0")).await?;
    probe
        .headers()
        .get("Content-Range")?
        .as_deref()
        .and_then(content_range_total)
        .ok_or_else(|| fetch_error(url, "server reports no content length"))
}

async fn fetch_range(url: &str, range: Range<u64>) -> Result<Bytes> {
    if range.start >= range.end {
        return Ok(Bytes::new());
    }
    let header = format!("bytes={}-{}", range.start, range.end - 1);
    let response = send(url, "GET", Some(&header)).await?;
    let data = body(&response).await?;
    let wanted = (range.end - range.start) as usize;

    // 200 means the server ignored the Range header and sent the whole file
    if response.status() == 200 && data.len() as u64 >= range.end {
        console_log!("{} ignored Range, slicing {} bytes locally", url, wanted);
        return Ok(data.slice(range.start as usize..range.end as usize));
    }
    if data.len() != wanted {
        return Err(fetch_error(
            url,
            format!("asked for {} bytes, received {}", wanted, data.len()),
        ));
    }
    Ok(data)
}

impl RangeSource for FetchRangeSource {
    fn byte_length<'a>(&'a self, url: &'a str) -> LocalBoxFuture<'a, Result<u64>> {
        byte_length(url).boxed_local()
    }

    fn fetch_range<'a>(&'a self, url: &'a str, range: Range<u64>) -> LocalBoxFuture<'a, Result<Bytes>> {
        fetch_range(url, range).boxed_local()
    }
}
