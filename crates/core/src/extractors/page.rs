// ABOUTME: Page facts: a one-pass, thread-safe summary of fetched markup (meta tags, scripts, media sources).
// ABOUTME: Strategies read these facts instead of holding a parsed DOM across await points.

use scraper::{Html, Selector};
use url::Url;

use crate::extractors::fields::{collect_attr, extract_field_text_single};

/// An inline `<script>` element.
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub id: Option<String>,
    pub kind: Option<String>,
    pub text: String,
}

/// Facts gathered from one fetched page.
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// Final URL after redirects.
    pub url: String,
    /// Raw markup, for patterns that live outside well-formed scripts.
    pub html: String,
    meta: Vec<(String, String)>,
    scripts: Vec<Script>,
    media_sources: Vec<String>,
    title: Option<String>,
}

impl Page {
    /// Parse markup once and keep only owned facts.
    pub fn parse(url: impl Into<String>, html: impl Into<String>) -> Self {
        let url = url.into();
        let html = html.into();
        let doc = Html::parse_document(&html);

        let mut meta = Vec::new();
        if let Ok(sel) = Selector::parse("meta[content]") {
            for el in doc.select(&sel) {
                let value = el.value();
                let Some(content) = value.attr("content").map(str::trim) else {
                    continue;
                };
                if content.is_empty() {
                    continue;
                }
                for key_attr in ["property", "name", "itemprop"] {
                    if let Some(key) = value.attr(key_attr) {
                        meta.push((key.trim().to_lowercase(), content.to_string()));
                    }
                }
            }
        }

        let mut scripts = Vec::new();
        if let Ok(sel) = Selector::parse("script") {
            for el in doc.select(&sel) {
                let text = el.text().collect::<String>();
                if text.trim().is_empty() {
                    continue;
                }
                scripts.push(Script {
                    id: el.value().attr("id").map(str::to_string),
                    kind: el.value().attr("type").map(|t| t.trim().to_lowercase()),
                    text,
                });
            }
        }

        let mut media_sources = collect_attr(&doc, "video[src]", "src");
        media_sources.extend(collect_attr(&doc, "video source[src]", "src"));

        let title = extract_field_text_single(&doc, &["title"]);

        Self {
            url,
            html,
            meta,
            scripts,
            media_sources,
            title,
        }
    }

    /// First content value of a meta tag keyed by property, name or itemprop.
    pub fn meta(&self, key: &str) -> Option<&str> {
        let key = key.to_lowercase();
        self.meta
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First present value among several meta keys.
    pub fn first_meta(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|k| self.meta(k))
    }

    pub fn scripts(&self) -> &[Script] {
        &self.scripts
    }

    /// Bodies of every `application/ld+json` script, in document order.
    pub fn ld_json(&self) -> impl Iterator<Item = &str> {
        self.scripts
            .iter()
            .filter(|s| s.kind.as_deref() == Some("application/ld+json"))
            .map(|s| s.text.as_str())
    }

    /// Body of the script with the given id.
    pub fn script_by_id(&self, id: &str) -> Option<&str> {
        self.scripts
            .iter()
            .find(|s| s.id.as_deref() == Some(id))
            .map(|s| s.text.as_str())
    }

    /// `src` values of `<video>` and `<video><source>` elements.
    pub fn media_sources(&self) -> &[String] {
        &self.media_sources
    }

    /// Text of the `<title>` element.
    pub fn document_title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Resolve a possibly relative reference against the page URL.
    pub fn resolve(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() {
            return None;
        }
        if let Ok(abs) = Url::parse(href) {
            return Some(abs.to_string());
        }
        Url::parse(&self.url)
            .ok()?
            .join(href)
            .ok()
            .map(|u| u.to_string())
    }
}
