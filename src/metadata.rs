use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

/// Fixed identifying user-agent sent with every metadata request.
const USER_AGENT: &str = "Quickjot/0.1 (link preview)";

// ── Link metadata ──────────────────────────────────────────────────────────

/// Open-Graph style metadata for a pasted URL. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkMetadata {
    pub url: String,
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub domain: String,
}

/// The degraded preview used when a fetch fails for any reason: the URL
/// stands in for the title, the domain is still parsed when possible.
pub fn fallback(url: &str) -> LinkMetadata {
    LinkMetadata {
        url: url.to_string(),
        title: url.to_string(),
        description: String::new(),
        image: None,
        domain: domain_of(url),
    }
}

/// Hostname of a URL, or empty when the URL does not parse.
pub fn domain_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
        .unwrap_or_default()
}

// ── Fetcher ────────────────────────────────────────────────────────────────

/// Fetches link metadata from the privileged process so the editor surface
/// never runs into cross-origin restrictions. One request per call, no
/// retry, no dedup; timeouts are left to the HTTP client defaults.
pub struct MetadataFetcher {
    client: reqwest::Client,
}

impl Default for MetadataFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataFetcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .expect("failed to build http client");
        Self { client }
    }

    /// Fetch metadata for `url`. Never fails: every error path collapses
    /// into the fallback shape and is logged for diagnostics only.
    pub async fn fetch(&self, url: &str) -> LinkMetadata {
        match self.try_fetch(url).await {
            Ok(metadata) => metadata,
            Err(e) => {
                log::warn!("link metadata fetch failed for {}: {}", url, e);
                fallback(url)
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> anyhow::Result<LinkMetadata> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("unexpected status {}", response.status());
        }
        let body = response.text().await?;
        Ok(extract_metadata(&body, url))
    }
}

// ── HTML extraction ────────────────────────────────────────────────────────

/// Extract metadata fields from an HTML document, with per-field priority:
/// og:title → `<title>` → the URL; og:description → meta description → "";
/// og:image → twitter:image → none.
pub fn extract_metadata(html: &str, url: &str) -> LinkMetadata {
    let document = Html::parse_document(html);

    let title = meta_content(&document, r#"meta[property="og:title"]"#)
        .or_else(|| element_text(&document, "title"))
        .unwrap_or_else(|| url.to_string());

    let description = meta_content(&document, r#"meta[property="og:description"]"#)
        .or_else(|| meta_content(&document, r#"meta[name="description"]"#))
        .unwrap_or_default();

    let image = meta_content(&document, r#"meta[property="og:image"]"#)
        .or_else(|| meta_content(&document, r#"meta[property="twitter:image"]"#));

    LinkMetadata {
        url: url.to_string(),
        title,
        description,
        image,
        domain: domain_of(url),
    }
}

/// First non-empty `content` attribute matching the selector.
fn meta_content(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .filter_map(|element| element.value().attr("content"))
        .map(|content| content.trim().to_string())
        .find(|content| !content.is_empty())
}

/// Trimmed text of the first element matching the selector, if non-empty.
fn element_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .map(|element| element.text().collect::<String>().trim().to_string())
        .find(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://example.com/page";

    #[test]
    fn test_title_prefers_og_title() {
        let html = r#"<html><head>
            <meta property="og:title" content="OG Title">
            <title>Page Title</title>
        </head></html>"#;
        let meta = extract_metadata(html, URL);
        assert_eq!(meta.title, "OG Title");
    }

    #[test]
    fn test_title_falls_back_to_title_tag() {
        let html = "<html><head><title>Page Title</title></head></html>";
        let meta = extract_metadata(html, URL);
        assert_eq!(meta.title, "Page Title");
    }

    #[test]
    fn test_title_falls_back_to_url() {
        let html = "<html><head></head><body>no metadata here</body></html>";
        let meta = extract_metadata(html, URL);
        assert_eq!(meta.title, URL);
    }

    #[test]
    fn test_description_tiers() {
        let og = r#"<head>
            <meta property="og:description" content="og desc">
            <meta name="description" content="meta desc">
        </head>"#;
        assert_eq!(extract_metadata(og, URL).description, "og desc");

        let plain = r#"<head><meta name="description" content="meta desc"></head>"#;
        assert_eq!(extract_metadata(plain, URL).description, "meta desc");

        assert_eq!(extract_metadata("<head></head>", URL).description, "");
    }

    #[test]
    fn test_image_tiers() {
        let og = r#"<head>
            <meta property="og:image" content="https://example.com/og.png">
            <meta property="twitter:image" content="https://example.com/tw.png">
        </head>"#;
        assert_eq!(
            extract_metadata(og, URL).image.as_deref(),
            Some("https://example.com/og.png")
        );

        let twitter = r#"<head><meta property="twitter:image" content="https://example.com/tw.png"></head>"#;
        assert_eq!(
            extract_metadata(twitter, URL).image.as_deref(),
            Some("https://example.com/tw.png")
        );

        assert_eq!(extract_metadata("<head></head>", URL).image, None);
    }

    #[test]
    fn test_empty_meta_content_is_skipped() {
        let html = r#"<head>
            <meta property="og:title" content="  ">
            <title>Real Title</title>
        </head>"#;
        assert_eq!(extract_metadata(html, URL).title, "Real Title");
    }

    #[test]
    fn test_domain_parsing() {
        assert_eq!(domain_of("https://news.ycombinator.com/item?id=1"), "news.ycombinator.com");
        assert_eq!(domain_of("not a url"), "");
    }

    #[test]
    fn test_fallback_shape() {
        let meta = fallback("https://example.com/broken");
        assert_eq!(meta.title, "https://example.com/broken");
        assert_eq!(meta.description, "");
        assert_eq!(meta.image, None);
        assert_eq!(meta.domain, "example.com");
    }

    #[tokio::test]
    async fn test_fetch_network_failure_returns_fallback() {
        // Port 1 is never listening; the connection is refused immediately.
        let fetcher = MetadataFetcher::new();
        let meta = fetcher.fetch("http://127.0.0.1:1/page").await;
        assert_eq!(meta.title, "http://127.0.0.1:1/page");
        assert_eq!(meta.description, "");
        assert_eq!(meta.image, None);
        assert_eq!(meta.domain, "127.0.0.1");
    }

    #[tokio::test]
    async fn test_fetch_malformed_url_returns_fallback() {
        let fetcher = MetadataFetcher::new();
        let meta = fetcher.fetch("::not-a-url::").await;
        assert_eq!(meta.title, "::not-a-url::");
        assert_eq!(meta.domain, "");
    }
}
