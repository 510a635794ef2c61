// ABOUTME: Facebook scraper: JSON-LD, inline playable_url/hd_src fields, meta tags and the mobile site.
// ABOUTME: Streams are labelled hd or sd; short share links are resolved before fetching.

use async_trait::async_trait;
use url::Url;

use crate::error::ExtractError;
use crate::extractors::chain::{Candidate, Chain};
use crate::extractors::embedded::string_fields;
use crate::extractors::generic::{ld_json_candidate, meta_candidate};
use crate::extractors::page::Page;
use crate::formats::{guess_mime, normalize, FormatDescriptor};
use crate::platform::{canonical_url, video_id, Platform};
use crate::platforms::{Context, Extraction, LazyPage, PlatformExtractor, ACCEPT_LANGUAGE};

const HEADERS: &[(&str, &str)] = &[ACCEPT_LANGUAGE];

/// Inline keys per quality label, most preferred first.
const HD_KEYS: &[&str] = &["playable_url_quality_hd", "browser_native_hd_url", "hd_src"];
const SD_KEYS: &[&str] = &["playable_url", "browser_native_sd_url", "sd_src"];

#[derive(Debug, Clone, Copy, Default)]
pub struct Facebook;

/// Stream URLs assigned to well-known keys in inline script state.
pub fn inline_candidate(page: &Page) -> Candidate {
    let mut descriptors = Vec::new();
    for (label, keys) in [("hd", HD_KEYS), ("sd", SD_KEYS)] {
        for key in keys {
            for url in string_fields(&page.html, key) {
                let mime = guess_mime(&url);
                descriptors.push(FormatDescriptor::direct(label, mime, url));
            }
        }
    }

    Candidate {
        formats: normalize(&descriptors, Some(&page.url)),
        ..Default::default()
    }
}

/// The same path on the mobile host.
pub fn mobile_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) if parsed.host_str().is_some_and(|h| h.ends_with("facebook.com")) => {
            if parsed.set_host(Some("m.facebook.com")).is_ok() {
                return parsed.to_string();
            }
            url.to_string()
        }
        _ => url.to_string(),
    }
}

async fn mobile_page(ctx: &Context, url: &str) -> Result<Candidate, ExtractError> {
    let page = ctx.fetch_page(url, HEADERS).await?;
    let mut candidate = inline_candidate(&page);
    candidate.merge(meta_candidate(&page));
    Ok(candidate)
}

#[async_trait]
impl PlatformExtractor for Facebook {
    async fn extract(&self, ctx: &Context, url: &str) -> Result<Extraction, ExtractError> {
        let resolved = ctx.resolve_short_link(url.trim(), HEADERS).await;
        let id = video_id(Platform::Facebook, &resolved);
        let page_url = id
            .as_deref()
            .and_then(|id| canonical_url(Platform::Facebook, id))
            .unwrap_or_else(|| resolved.clone());
        let mobile = mobile_url(&resolved);
        let page = LazyPage::new(ctx, resolved.clone(), HEADERS);

        let candidate = Chain::new(Platform::Facebook, resolved.clone())
            .step("ld+json", async { ld_json_candidate(page.get().await?) })
            .step("inline", async { Ok(inline_candidate(page.get().await?)) })
            .step("meta", async { Ok(meta_candidate(page.get().await?)) })
            .step("mobile", mobile_page(ctx, &mobile))
            .run(ctx.sink.as_ref(), ctx.timeout)
            .await?;

        Ok(Extraction {
            id,
            page_url,
            candidate,
        })
    }
}
