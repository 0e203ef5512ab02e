//! Bilibili web API resolver (view + DASH playurl).

use std::collections::HashMap;

use serde::Deserialize;

use super::{
    page_title, MediaInfo, MediaRequest, PageInfo, ResolveError, ResolvedMedia, StreamResolver,
};
use crate::descriptor::{StreamDescriptor, StreamKind};
use crate::http::{self, HttpOptions};

pub const DEFAULT_API_BASE: &str = "https://api.bilibili.com";

/// Requests DASH (separate audio and video) streams.
const FNVAL_DASH: u32 = 4048;

const SESSION_COOKIE: &str = "SESSDATA";

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

impl<T> ApiResponse<T> {
    fn into_data(self) -> Result<T, ResolveError> {
        if self.code != 0 {
            return Err(ResolveError::Api {
                code: self.code,
                message: self.message,
            });
        }
        self.data.ok_or(ResolveError::Api {
            code: self.code,
            message: "response carried no data".to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ViewData {
    title: String,
    #[serde(default)]
    pages: Vec<ViewPage>,
}

#[derive(Debug, Deserialize)]
struct ViewPage {
    cid: u64,
    page: u32,
    #[serde(default)]
    part: String,
}

#[derive(Debug, Deserialize)]
struct PlayUrlData {
    dash: Option<Dash>,
}

#[derive(Debug, Deserialize)]
struct Dash {
    #[serde(default)]
    video: Vec<DashStream>,
    #[serde(default)]
    audio: Option<Vec<DashStream>>,
}

#[derive(Debug, Deserialize)]
struct DashStream {
    id: u32,
    #[serde(rename = "baseUrl", alias = "base_url")]
    base_url: String,
}

fn parse_view(body: &[u8]) -> Result<ViewData, ResolveError> {
    serde_json::from_slice::<ApiResponse<ViewData>>(body)?.into_data()
}

fn parse_dash(body: &[u8]) -> Result<Dash, ResolveError> {
    serde_json::from_slice::<ApiResponse<PlayUrlData>>(body)?
        .into_data()?
        .dash
        .ok_or(ResolveError::NoStreams)
}

/// Distinct video quality ids, highest first.
fn qualities(dash: &Dash) -> Vec<u32> {
    let mut ids: Vec<u32> = dash.video.iter().map(|v| v.id).collect();
    ids.sort_unstable_by(|a, b| b.cmp(a));
    ids.dedup();
    ids
}

/// Video URL for `quality` and the first audio URL.
fn select_streams(dash: &Dash, quality: u32) -> Result<(String, String), ResolveError> {
    let video = dash
        .video
        .iter()
        .find(|v| v.id == quality)
        .ok_or_else(|| ResolveError::QualityUnavailable {
            quality,
            available: qualities(dash),
        })?;
    let audio = dash
        .audio
        .as_ref()
        .and_then(|a| a.first())
        .ok_or(ResolveError::NoStreams)?;
    Ok((video.base_url.clone(), audio.base_url.clone()))
}

fn page_of(view: &ViewData, page: u32) -> Result<&ViewPage, ResolveError> {
    view.pages
        .iter()
        .find(|p| p.page == page)
        .or_else(|| page.checked_sub(1).and_then(|i| view.pages.get(i as usize)))
        .ok_or(ResolveError::PageOutOfRange {
            page,
            pages: view.pages.len(),
        })
}

pub struct BiliResolver {
    api_base: String,
    headers: HashMap<String, String>,
    http: HttpOptions,
}

impl BiliResolver {
    pub fn new(headers: HashMap<String, String>, http: HttpOptions) -> Self {
        Self::with_api_base(DEFAULT_API_BASE, headers, http)
    }

    /// Resolver against another API host (mirrors, local test servers).
    pub fn with_api_base(
        api_base: impl Into<String>,
        headers: HashMap<String, String>,
        http: HttpOptions,
    ) -> Self {
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            headers,
            http,
        }
    }

    fn get(&self, url: &str, credential: Option<&str>) -> Result<Vec<u8>, ResolveError> {
        let cookie = credential.map(|c| format!("{}={}", SESSION_COOKIE, c));
        let mut easy = http::easy_for(url, &self.headers, cookie.as_deref(), &self.http)?;
        easy.timeout(self.http.request_timeout)?;
        let mut body = Vec::new();
        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }
        let code = easy.response_code()?;
        if code != 200 {
            return Err(ResolveError::Status(code));
        }
        Ok(body)
    }

    fn view(&self, request: &MediaRequest) -> Result<ViewData, ResolveError> {
        let url = format!("{}/x/web-interface/view?bvid={}", self.api_base, request.id);
        parse_view(&self.get(&url, None)?)
    }

    fn dash(&self, request: &MediaRequest, cid: u64) -> Result<Dash, ResolveError> {
        let url = format!(
            "{}/x/player/wbi/playurl?bvid={}&cid={}&fnval={}",
            self.api_base, request.id, cid, FNVAL_DASH
        );
        parse_dash(&self.get(&url, request.credential.as_deref())?)
    }

    fn descriptor(&self, url: String, kind: StreamKind, credential: Option<&str>) -> StreamDescriptor {
        let d = StreamDescriptor::new(url, kind).with_headers(&self.headers);
        match credential {
            Some(c) => d.with_cookie(SESSION_COOKIE, c),
            None => d,
        }
    }
}

impl StreamResolver for BiliResolver {
    fn inspect(&self, request: &MediaRequest) -> Result<MediaInfo, ResolveError> {
        let view = self.view(request)?;
        let cid = page_of(&view, request.page)?.cid;
        let dash = self.dash(request, cid)?;
        Ok(MediaInfo {
            title: view.title.clone(),
            pages: view
                .pages
                .iter()
                .map(|p| PageInfo {
                    page: p.page,
                    cid: p.cid,
                    part: p.part.clone(),
                })
                .collect(),
            qualities: qualities(&dash),
        })
    }

    fn resolve(&self, request: &MediaRequest) -> Result<ResolvedMedia, ResolveError> {
        let view = self.view(request)?;
        let page = page_of(&view, request.page)?;
        let dash = self.dash(request, page.cid)?;
        let (video_url, audio_url) = select_streams(&dash, request.quality)?;
        tracing::debug!(id = %request.id, page = request.page, quality = request.quality, "resolved streams");

        let credential = request.credential.as_deref();
        Ok(ResolvedMedia {
            title: page_title(&view.title, &page.part, request.page),
            qualities: qualities(&dash),
            video: self.descriptor(video_url, StreamKind::Video, credential),
            audio: self.descriptor(audio_url, StreamKind::Audio, credential),
        })
    }
}
