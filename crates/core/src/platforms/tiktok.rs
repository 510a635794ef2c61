// ABOUTME: TikTok scraper: JSON-LD, rehydration data, SIGI_STATE, meta tags and a public data API as last resort.
// ABOUTME: Labels mark watermark-free variants so the watermark-first ranking can prefer them.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ExtractError;
use crate::extractors::chain::{clean_text, Candidate, Chain};
use crate::extractors::embedded::{assigned_json, parse_json};
use crate::extractors::generic::{ld_json_candidate, meta_candidate};
use crate::extractors::json::{array_at, first_str, str_at, u64_at, url_like};
use crate::extractors::page::Page;
use crate::formats::{normalize, FormatDescriptor};
use crate::platform::{canonical_url, tiktok_creator_url, video_id, Platform};
use crate::platforms::{Context, Extraction, LazyPage, PlatformExtractor, ACCEPT_LANGUAGE};

const UNIVERSAL_DATA: &str = "__UNIVERSAL_DATA_FOR_REHYDRATION__";
const SIGI_STATE: &str = "SIGI_STATE";
const ITEM_STRUCT: &str = "/__DEFAULT_SCOPE__/webapp.video-detail/itemInfo/itemStruct";
const HEADERS: &[(&str, &str)] = &[ACCEPT_LANGUAGE, ("Referer", "https://www.tiktok.com/")];

pub const NO_WATERMARK: &str = "original (no watermark)";
pub const WATERMARK: &str = "original (watermark)";

#[derive(Debug, Clone, Copy, Default)]
pub struct TikTok;

/// Blob carried in a script with `id`, or assigned to a global of the same name.
fn state_blob(page: &Page, id: &str) -> Result<Value, ExtractError> {
    match page.script_by_id(id) {
        Some(text) => parse_json(text, &page.url, id),
        None => assigned_json(&page.html, id, &page.url),
    }
}

/// Map an `itemStruct` (web app item shape) to a candidate.
pub fn item_candidate(item: &Value, base: &str) -> Candidate {
    let mut descriptors = Vec::new();

    if let Some(url) = item.pointer("/video/playAddr").and_then(url_like) {
        descriptors.push(FormatDescriptor::direct(NO_WATERMARK, "video/mp4", url));
    }
    for variant in array_at(item, "/video/bitrateInfo") {
        let Some(url) = variant.pointer("/PlayAddr/UrlList").and_then(url_like) else {
            continue;
        };
        let label = match u64_at(variant, "/PlayAddr/Height") {
            Some(h) if h > 0 => format!("{}p (no watermark)", h),
            _ => NO_WATERMARK.to_string(),
        };
        descriptors.push(
            FormatDescriptor::direct(label, "video/mp4", url)
                .with_size(u64_at(variant, "/PlayAddr/DataSize")),
        );
    }
    if let Some(url) = item.pointer("/video/downloadAddr").and_then(url_like) {
        descriptors.push(FormatDescriptor::direct(WATERMARK, "video/mp4", url));
    }
    if let Some(url) = item.pointer("/music/playUrl").and_then(url_like) {
        descriptors.push(FormatDescriptor::direct("audio", "audio/mpeg", url));
    }

    let desc = clean_text(str_at(item, "/desc"));
    Candidate {
        title: desc.clone(),
        description: desc,
        duration: u64_at(item, "/video/duration"),
        thumbnail: first_str(item, &["/video/cover", "/video/originCover", "/video/dynamicCover"])
            .map(str::to_string),
        formats: normalize(&descriptors, Some(base)),
    }
}

/// Map a public data API response (`{code, data: {...}}`) to a candidate.
///
/// A nonzero `code` means the API refused the URL and is reported as a parse failure.
pub fn api_candidate(response: &Value, base: &str) -> Result<Candidate, ExtractError> {
    let code = response.get("code").and_then(Value::as_i64).unwrap_or(-1);
    if code != 0 {
        let msg = str_at(response, "/msg").unwrap_or("no data");
        return Err(ExtractError::parse(
            base,
            "api",
            Some(anyhow::anyhow!("API returned code {}: {}", code, msg)),
        ));
    }

    let data = response.get("data").unwrap_or(&Value::Null);
    let variants = [
        ("/hdplay", Some("/hd_size"), "hd (no watermark)", "video/mp4"),
        ("/play", Some("/size"), NO_WATERMARK, "video/mp4"),
        ("/wmplay", Some("/wm_size"), WATERMARK, "video/mp4"),
        ("/music", None, "audio", "audio/mpeg"),
    ];
    let descriptors: Vec<FormatDescriptor> = variants
        .iter()
        .filter_map(|(url_ptr, size_ptr, label, mime)| {
            let url = str_at(data, url_ptr)?;
            let size = size_ptr.and_then(|p| u64_at(data, p));
            Some(FormatDescriptor::direct(*label, *mime, url).with_size(size))
        })
        .collect();

    Ok(Candidate {
        title: clean_text(str_at(data, "/title")),
        description: None,
        duration: u64_at(data, "/duration"),
        thumbnail: first_str(data, &["/cover", "/origin_cover"]).map(|t| {
            url::Url::parse(base)
                .and_then(|b| b.join(t))
                .map(|u| u.to_string())
                .unwrap_or_else(|_| t.to_string())
        }),
        formats: normalize(&descriptors, Some(base)),
    })
}

fn sigi_item<'v>(state: &'v Value, id: Option<&str>) -> Option<&'v Value> {
    let items = state.get("ItemModule")?;
    match id {
        Some(id) => items.get(id),
        None => items.as_object()?.values().next(),
    }
}

async fn public_api(ctx: &Context, page_url: &str) -> Result<Candidate, ExtractError> {
    let api_url = format!(
        "{}?url={}&hd=1",
        ctx.tiktok_api,
        urlencoding::encode(page_url)
    );
    let response = ctx.fetch_json(&api_url, HEADERS).await?;
    api_candidate(&response, &ctx.tiktok_api)
}

#[async_trait]
impl PlatformExtractor for TikTok {
    async fn extract(&self, ctx: &Context, url: &str) -> Result<Extraction, ExtractError> {
        let resolved = ctx.resolve_short_link(url, HEADERS).await;
        let id = video_id(Platform::TikTok, &resolved);
        let page_url = tiktok_creator_url(&resolved)
            .or_else(|| id.as_deref().and_then(|id| canonical_url(Platform::TikTok, id)))
            .unwrap_or_else(|| resolved.clone());
        let page = LazyPage::new(ctx, resolved.clone(), HEADERS);

        let candidate = Chain::new(Platform::TikTok, resolved.clone())
            .step("ld+json", async { ld_json_candidate(page.get().await?) })
            .step(UNIVERSAL_DATA, async {
                let page = page.get().await?;
                let state = state_blob(page, UNIVERSAL_DATA)?;
                Ok(state
                    .pointer(ITEM_STRUCT)
                    .map(|item| item_candidate(item, &page.url))
                    .unwrap_or_default())
            })
            .step(SIGI_STATE, async {
                let page = page.get().await?;
                let state = state_blob(page, SIGI_STATE)?;
                Ok(sigi_item(&state, id.as_deref())
                    .map(|item| item_candidate(item, &page.url))
                    .unwrap_or_default())
            })
            .step("meta", async { Ok(meta_candidate(page.get().await?)) })
            .step("api", public_api(ctx, &resolved))
            .run(ctx.sink.as_ref(), ctx.timeout)
            .await?;

        Ok(Extraction {
            id,
            page_url,
            candidate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Outcome;
    use crate::formats::MediaType;
    use crate::platforms::testing::{context, StubFetcher};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const VIDEO_URL: &str = "https://www.tiktok.com/@creator/video/7234567890123456789";

    fn item() -> Value {
        json!({
            "id": "7234567890123456789",
            "desc": "dance  clip",
            "video": {
                "duration": 15,
                "cover": "https://p16.tiktokcdn.com/cover.jpeg",
                "playAddr": "https://v16.tiktokcdn.com/play.mp4",
                "downloadAddr": "https://v16.tiktokcdn.com/download.mp4",
                "bitrateInfo": [
                    {"PlayAddr": {"Height": 1080, "DataSize": "4000000",
                                  "UrlList": ["https://v19.tiktokcdn.com/1080.mp4"]}}
                ]
            },
            "music": {"playUrl": "https://sf16.tiktokcdn.com/music.mp3"}
        })
    }

    #[test]
    fn item_struct_mapping() {
        let candidate = item_candidate(&item(), VIDEO_URL);
        assert_eq!(candidate.title.as_deref(), Some("dance clip"));
        assert_eq!(candidate.duration, Some(15));
        let labels: Vec<&str> = candidate.formats.iter().map(|f| f.quality.as_str()).collect();
        assert_eq!(
            labels,
            vec![NO_WATERMARK, "1080p (no watermark)", WATERMARK, "audio"]
        );
        assert_eq!(candidate.formats[1].size_bytes, 4_000_000);
        assert_eq!(candidate.formats[3].media_type, MediaType::Audio);
    }

    #[test]
    fn api_response_mapping() {
        let response = json!({
            "code": 0,
            "data": {
                "title": "api title",
                "cover": "/cover/1.jpg",
                "duration": 15,
                "play": "https://v.tikwm.test/play.mp4", "size": 500000,
                "wmplay": "/video/wm.mp4", "wm_size": 900000,
                "music": "https://v.tikwm.test/music.mp3"
            }
        });
        let candidate = api_candidate(&response, "https://api.test/tiktok/").unwrap();
        assert_eq!(candidate.thumbnail.as_deref(), Some("https://api.test/cover/1.jpg"));
        assert_eq!(candidate.formats.len(), 3);
        assert_eq!(candidate.formats[0].quality, NO_WATERMARK);
        assert_eq!(candidate.formats[0].size_bytes, 500_000);
        assert_eq!(candidate.formats[1].url, "https://api.test/video/wm.mp4");
        assert_eq!(candidate.formats[2].size_bytes, 0);
    }

    #[test]
    fn api_error_code_is_parse_failure() {
        let err = api_candidate(&json!({"code": -1, "msg": "Url parsing is failed!"}), "u").unwrap_err();
        assert!(err.is_parse());
        assert!(err.to_string().contains("Url parsing is failed!"));
    }

    #[tokio::test]
    async fn rehydration_blob() {
        let blob = json!({"__DEFAULT_SCOPE__": {"webapp.video-detail": {"itemInfo": {"itemStruct": item()}}}});
        let html = format!(
            "<script id=\"{}\" type=\"application/json\">{}</script>",
            UNIVERSAL_DATA, blob
        );
        let (ctx, fetcher, sink) = context(StubFetcher::new().route(VIDEO_URL, &html));
        let extraction = TikTok.extract(&ctx, VIDEO_URL).await.unwrap();

        assert_eq!(extraction.id.as_deref(), Some("7234567890123456789"));
        assert_eq!(extraction.page_url, VIDEO_URL);
        assert_eq!(extraction.candidate.formats.len(), 4);
        assert_eq!(sink.outcomes_for("api"), vec![Outcome::Skipped]);

        let requests = fetcher.requests.lock().unwrap();
        assert_eq!(
            requests[0].1.get("Referer").map(String::as_str),
            Some("https://www.tiktok.com/")
        );
    }

    #[tokio::test]
    async fn bare_id_link_falls_back_to_placeholder_handle() {
        let url = "https://www.tiktok.com/v/7234567890123456789";
        let blob = json!({"__DEFAULT_SCOPE__": {"webapp.video-detail": {"itemInfo": {"itemStruct": item()}}}});
        let html = format!(
            "<script id=\"{}\" type=\"application/json\">{}</script>",
            UNIVERSAL_DATA, blob
        );
        let (ctx, _, _) = context(StubFetcher::new().route(url, &html));
        let extraction = TikTok.extract(&ctx, url).await.unwrap();
        assert_eq!(extraction.page_url, "https://www.tiktok.com/@i/video/7234567890123456789");
    }

    #[tokio::test]
    async fn sigi_state_assignment() {
        let state = json!({"ItemModule": {"7234567890123456789": item()}});
        let html = format!("<script>window['SIGI_STATE'] = {};</script>", state);
        let (ctx, _, sink) = context(StubFetcher::new().route(VIDEO_URL, &html));
        let extraction = TikTok.extract(&ctx, VIDEO_URL).await.unwrap();

        assert_eq!(extraction.candidate.formats.len(), 4);
        assert!(matches!(
            sink.outcomes_for(UNIVERSAL_DATA).as_slice(),
            [Outcome::Failed { .. }]
        ));
        assert_eq!(sink.outcomes_for(SIGI_STATE), vec![Outcome::Yielded { formats: 4 }]);
    }

    #[tokio::test]
    async fn short_link_then_public_api() {
        let api = json!({"code": 0, "data": {"play": "https://v.tikwm.test/play.mp4"}});
        let mut stub = StubFetcher::new()
            .route("https://api.test/tiktok/", &api.to_string())
            .fail("https://www.tiktok.com/", 403);
        stub.redirect = Some(VIDEO_URL.to_string());
        let (ctx, fetcher, _) = context(stub);

        let extraction = TikTok.extract(&ctx, "https://vm.tiktok.com/ZMabc123/").await.unwrap();
        assert_eq!(extraction.id.as_deref(), Some("7234567890123456789"));
        assert_eq!(extraction.page_url, VIDEO_URL);
        assert_eq!(extraction.candidate.formats.len(), 1);

        let requested = fetcher.requested();
        assert_eq!(requested[0], VIDEO_URL);
        assert_eq!(
            requested[1],
            format!("https://api.test/tiktok/?url={}&hd=1", urlencoding::encode(VIDEO_URL))
        );
    }
}
