// ABOUTME: YouTube scraper: watch page JSON-LD, ytInitialPlayerResponse, meta tags, embed page and get_video_info.
// ABOUTME: Player-response formats carry either a direct url or a signature cipher.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ExtractError;
use crate::extractors::chain::{clean_text, Candidate, Chain};
use crate::extractors::embedded::{assigned_json, parse_json};
use crate::extractors::generic::{ld_json_candidate, meta_candidate, thumbnail_from};
use crate::extractors::json::{array_at, first_str, str_at, u64_at};
use crate::formats::{normalize, FormatDescriptor};
use crate::platform::{canonical_url, video_id, Platform};
use crate::platforms::{Context, Extraction, LazyPage, PlatformExtractor, ACCEPT_LANGUAGE};

const PLAYER_RESPONSE: &str = "ytInitialPlayerResponse";
const HEADERS: &[(&str, &str)] = &[ACCEPT_LANGUAGE];

#[derive(Debug, Clone, Copy, Default)]
pub struct YouTube;

fn descriptor(format: &Value) -> FormatDescriptor {
    FormatDescriptor {
        quality: first_str(format, &["/qualityLabel", "/quality"])
            .unwrap_or("unknown")
            .to_string(),
        mime_type: str_at(format, "/mimeType").unwrap_or("").to_string(),
        url: str_at(format, "/url").map(str::to_string),
        cipher: first_str(format, &["/signatureCipher", "/cipher"]).map(str::to_string),
        content_length: u64_at(format, "/contentLength"),
    }
}

/// Map a player response (`videoDetails` + `streamingData`) to a candidate.
pub fn player_candidate(player: &Value, base: &str) -> Candidate {
    let descriptors: Vec<FormatDescriptor> = array_at(player, "/streamingData/formats")
        .iter()
        .chain(array_at(player, "/streamingData/adaptiveFormats"))
        .map(descriptor)
        .collect();

    // thumbnail lists are ordered smallest first
    let thumbnail = array_at(player, "/videoDetails/thumbnail/thumbnails")
        .last()
        .and_then(|t| str_at(t, "/url"))
        .map(str::to_string)
        .or_else(|| {
            thumbnail_from(
                player,
                &["/microformat/playerMicroformatRenderer/thumbnail/thumbnails/0"],
            )
        });

    Candidate {
        title: clean_text(first_str(
            player,
            &["/videoDetails/title", "/microformat/playerMicroformatRenderer/title/simpleText"],
        )),
        description: clean_text(str_at(player, "/videoDetails/shortDescription")),
        duration: u64_at(player, "/videoDetails/lengthSeconds"),
        thumbnail,
        formats: normalize(&descriptors, Some(base)),
    }
}

/// The `player_response` field of a get_video_info body (itself a query string).
fn video_info_player(body: &str, url: &str) -> Result<Value, ExtractError> {
    let raw = url::form_urlencoded::parse(body.trim().as_bytes())
        .find(|(k, _)| k == "player_response")
        .map(|(_, v)| v.into_owned())
        .ok_or_else(|| {
            ExtractError::parse(url, "get_video_info", Some(anyhow::anyhow!("player_response missing")))
        })?;
    parse_json(&raw, url, "get_video_info")
}

async fn embedded_player(ctx: &Context, embed_url: &str) -> Result<Candidate, ExtractError> {
    let page = ctx.fetch_page(embed_url, HEADERS).await?;
    let player = assigned_json(&page.html, PLAYER_RESPONSE, embed_url)?;
    let mut candidate = player_candidate(&player, &page.url);
    candidate.merge(meta_candidate(&page));
    Ok(candidate)
}

async fn video_info(ctx: &Context, info_url: &str) -> Result<Candidate, ExtractError> {
    let result = ctx.fetcher.fetch(info_url, &ctx.headers_with(HEADERS)).await?;
    let player = video_info_player(&result.text(), info_url)?;
    Ok(player_candidate(&player, info_url))
}

#[async_trait]
impl PlatformExtractor for YouTube {
    async fn extract(&self, ctx: &Context, url: &str) -> Result<Extraction, ExtractError> {
        let id = video_id(Platform::YouTube, url).ok_or_else(|| {
            ExtractError::validation(url, "Extract", Some(anyhow::anyhow!("no YouTube video id in URL")))
        })?;
        let page_url = canonical_url(Platform::YouTube, &id).unwrap_or_else(|| url.to_string());
        let embed_url = format!("https://www.youtube.com/embed/{}", id);
        let info_url = format!(
            "https://www.youtube.com/get_video_info?video_id={}&html5=1",
            id
        );
        let page = LazyPage::new(ctx, page_url.clone(), HEADERS);

        let mut candidate = Chain::new(Platform::YouTube, page_url.clone())
            .step("ld+json", async { ld_json_candidate(page.get().await?) })
            .step(PLAYER_RESPONSE, async {
                let page = page.get().await?;
                let player = assigned_json(&page.html, PLAYER_RESPONSE, page.url.as_str())?;
                Ok(player_candidate(&player, &page.url))
            })
            .step("meta", async { Ok(meta_candidate(page.get().await?)) })
            .step("embed", embedded_player(ctx, &embed_url))
            .step("get_video_info", video_info(ctx, &info_url))
            .run(ctx.sink.as_ref(), ctx.timeout)
            .await?;

        if candidate.thumbnail.is_none() {
            candidate.thumbnail = Some(format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", id));
        }

        Ok(Extraction {
            id: Some(id),
            page_url,
            candidate,
        })
    }
}
