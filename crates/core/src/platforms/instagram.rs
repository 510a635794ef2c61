// ABOUTME: Instagram scraper: JSON-LD, shared/additional page data blobs, meta tags and the captioned embed page.
// ABOUTME: Media objects come in the GraphQL shortcode_media shape or the items API shape.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ExtractError;
use crate::extractors::chain::{clean_text, Candidate, Chain};
use crate::extractors::duration::parse_duration_seconds;
use crate::extractors::embedded::{assigned_json, balanced_object, parse_json, string_fields};
use crate::extractors::generic::{height_label, ld_json_candidate, meta_candidate};
use crate::extractors::json::{array_at, first_str, str_at, u64_at};
use crate::extractors::page::Page;
use crate::formats::{normalize, FormatDescriptor};
use crate::platform::{canonical_url, video_id, Platform};
use crate::platforms::{Context, Extraction, LazyPage, PlatformExtractor, ACCEPT_LANGUAGE};

const SHARED_DATA: &str = "window._sharedData";
const ADDITIONAL_DATA: &str = "window.__additionalDataLoaded";
const HEADERS: &[(&str, &str)] = &[ACCEPT_LANGUAGE];

#[derive(Debug, Clone, Copy, Default)]
pub struct Instagram;

/// Map a media object (`shortcode_media` or an `items[]` entry) to a candidate.
pub fn media_candidate(media: &Value, base: &str) -> Candidate {
    let mut descriptors = Vec::new();
    if let Some(url) = str_at(media, "/video_url") {
        let height = u64_at(media, "/dimensions/height");
        descriptors.push(FormatDescriptor::direct(height_label(height), "video/mp4", url));
    }
    for version in array_at(media, "/video_versions") {
        if let Some(url) = str_at(version, "/url") {
            let height = u64_at(version, "/height");
            descriptors.push(FormatDescriptor::direct(height_label(height), "video/mp4", url));
        }
    }

    let caption = clean_text(first_str(
        media,
        &["/edge_media_to_caption/edges/0/node/text", "/caption/text"],
    ));
    Candidate {
        title: clean_text(str_at(media, "/title")).or_else(|| caption.clone()),
        description: caption,
        duration: u64_at(media, "/video_duration"),
        thumbnail: first_str(
            media,
            &["/display_url", "/thumbnail_src", "/image_versions2/candidates/0/url"],
        )
        .map(str::to_string),
        formats: normalize(&descriptors, Some(base)),
    }
}

/// The media object inside `_sharedData` or an `__additionalDataLoaded(...)` call.
fn page_media(page: &Page) -> Result<Value, ExtractError> {
    let shared = assigned_json(&page.html, SHARED_DATA, &page.url);
    if let Ok(data) = &shared {
        if let Some(media) = data.pointer("/entry_data/PostPage/0/graphql/shortcode_media") {
            return Ok(media.clone());
        }
    }

    // __additionalDataLoaded('/p/CODE/', {...}) passes the blob as the second argument
    if let Some(pos) = page.html.find(ADDITIONAL_DATA) {
        let call = &page.html[pos + ADDITIONAL_DATA.len()..];
        if let Some(blob) = balanced_object(call) {
            let data = parse_json(blob, &page.url, ADDITIONAL_DATA)?;
            if let Some(media) = data
                .pointer("/graphql/shortcode_media")
                .or_else(|| data.pointer("/items/0"))
            {
                return Ok(media.clone());
            }
        }
    }

    match shared {
        Ok(_) => Ok(Value::Null),
        Err(err) => Err(err),
    }
}

async fn captioned_embed(ctx: &Context, embed_url: &str) -> Result<Candidate, ExtractError> {
    let page = ctx.fetch_page(embed_url, HEADERS).await?;
    let descriptors: Vec<FormatDescriptor> = string_fields(&page.html, "video_url")
        .into_iter()
        .chain(page.media_sources().iter().filter_map(|s| page.resolve(s)))
        .map(|url| FormatDescriptor::direct("original", "video/mp4", url))
        .collect();

    let mut candidate = Candidate {
        thumbnail: string_fields(&page.html, "display_url").into_iter().next(),
        duration: string_fields(&page.html, "video_duration")
            .first()
            .and_then(|d| parse_duration_seconds(d)),
        formats: normalize(&descriptors, Some(&page.url)),
        ..Default::default()
    };
    candidate.merge(meta_candidate(&page));
    Ok(candidate)
}

#[async_trait]
impl PlatformExtractor for Instagram {
    async fn extract(&self, ctx: &Context, url: &str) -> Result<Extraction, ExtractError> {
        let code = video_id(Platform::Instagram, url).ok_or_else(|| {
            ExtractError::validation(url, "Extract", Some(anyhow::anyhow!("no Instagram shortcode in URL")))
        })?;
        let page_url = canonical_url(Platform::Instagram, &code).unwrap_or_else(|| url.to_string());
        let embed_url = format!("https://www.instagram.com/p/{}/embed/captioned/", code);
        let page = LazyPage::new(ctx, url.trim(), HEADERS);

        let candidate = Chain::new(Platform::Instagram, page_url.clone())
            .step("ld+json", async { ld_json_candidate(page.get().await?) })
            .step("shared-data", async {
                let page = page.get().await?;
                Ok(media_candidate(&page_media(page)?, &page.url))
            })
            .step("meta", async { Ok(meta_candidate(page.get().await?)) })
            .step("embed", captioned_embed(ctx, &embed_url))
            .run(ctx.sink.as_ref(), ctx.timeout)
            .await?;

        Ok(Extraction {
            id: Some(code),
            page_url,
            candidate,
        })
    }
}
