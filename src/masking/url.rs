//! Programmatic URL interception.
//!
//! Every place that builds a URL pointing at a masked location runs it through
//! [`UrlInterceptor`], so URLs that never pass through a buffered body (late
//! script/style tags, image source records, redirect headers) are masked too.
//! The interceptor borrows the same table the body rewriter uses.

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use crate::masking::table::ReplacementTable;

/// Call sites that produce URLs into masked locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlHook {
    ContentUrl,
    IncludesUrl,
    SiteUrl,
    HomeUrl,
    PluginsUrl,
    StyleLoaderSrc,
    ScriptLoaderSrc,
    TemplateDirectoryUri,
    StylesheetDirectoryUri,
    AttachmentImageSrc,
    ImageSrcset,
    ResponseHeader,
}

/// An attachment image record: url plus its rendered size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentSource {
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub is_intermediate: bool,
}

/// One candidate of a responsive image source set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SrcsetSource {
    pub url: String,
    /// `w` or `x`.
    pub descriptor: String,
    pub value: u32,
}

/// Response headers that carry URLs back to the client.
pub const URL_HEADERS: [HeaderName; 4] = [
    header::LOCATION,
    header::CONTENT_LOCATION,
    header::LINK,
    header::REFRESH,
];

/// Masks individual URL values with a shared replacement table.
#[derive(Debug, Clone, Copy)]
pub struct UrlInterceptor<'t> {
    table: &'t ReplacementTable,
}

impl<'t> UrlInterceptor<'t> {
    pub fn new(table: &'t ReplacementTable) -> Self {
        Self { table }
    }

    pub fn filter_url<'u>(&self, url: &'u str) -> Cow<'u, str> {
        self.table.apply(url)
    }

    /// Same as [`filter_url`](Self::filter_url), tagged with the call site for tracing.
    pub fn filter<'u>(&self, hook: UrlHook, url: &'u str) -> Cow<'u, str> {
        let out = self.filter_url(url);
        if let Cow::Owned(masked) = &out {
            tracing::trace!(hook = ?hook, from = %url, to = %masked, "URL masked");
        }
        out
    }

    pub fn filter_attachment(&self, mut source: AttachmentSource) -> AttachmentSource {
        if source.url.is_empty() {
            return source;
        }
        if let Cow::Owned(url) = self.filter(UrlHook::AttachmentImageSrc, &source.url) {
            source.url = url;
        }
        source
    }

    pub fn filter_srcset(&self, sources: &mut [SrcsetSource]) {
        for source in sources.iter_mut().filter(|s| !s.url.is_empty()) {
            if let Cow::Owned(url) = self.filter(UrlHook::ImageSrcset, &source.url) {
                source.url = url;
            }
        }
    }

    /// Mask URL-bearing response headers in place. Returns how many changed.
    ///
    /// Values that are not valid header text are left alone.
    pub fn filter_headers(&self, headers: &mut HeaderMap) -> usize {
        let mut changed = 0;
        for name in URL_HEADERS.iter() {
            let values: Vec<HeaderValue> = headers.get_all(name).iter().cloned().collect();
            if values.is_empty() {
                continue;
            }

            let mut rewritten = Vec::with_capacity(values.len());
            let mut touched = false;
            for value in values {
                let masked = value
                    .to_str()
                    .ok()
                    .and_then(|text| match self.filter(UrlHook::ResponseHeader, text) {
                        Cow::Owned(m) => HeaderValue::from_str(&m).ok(),
                        Cow::Borrowed(_) => None,
                    });
                match masked {
                    Some(m) => {
                        touched = true;
                        changed += 1;
                        rewritten.push(m);
                    }
                    None => rewritten.push(value),
                }
            }

            if touched {
                headers.remove(name);
                for value in rewritten {
                    headers.append(name.clone(), value);
                }
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::masking::paths::{InternalLayout, PathConfig, RawPaths, SanitizePolicy};

    fn table() -> ReplacementTable {
        let paths = PathConfig::sanitize(
            &RawPaths {
                content: Some("assets".into()),
                includes: Some("core".into()),
                uploads: Some("media".into()),
                comments: Some("submit".into()),
            },
            SanitizePolicy::default(),
        );
        ReplacementTable::build(&paths, &InternalLayout::default(), &["https://example.com".to_string()])
    }

    #[test]
    fn filters_plain_urls() {
        let t = table();
        let urls = UrlInterceptor::new(&t);
        assert_eq!(
            urls.filter(UrlHook::ScriptLoaderSrc, "https://example.com/wp-includes/js/a.js?ver=6"),
            "https://example.com/core/js/a.js?ver=6"
        );
        assert_eq!(urls.filter_url("https://other.org/page"), "https://other.org/page");
    }

    #[test]
    fn filters_attachment_record() {
        let t = table();
        let urls = UrlInterceptor::new(&t);
        let src = urls.filter_attachment(AttachmentSource {
            url: "https://example.com/wp-content/uploads/2024/a-300x200.jpg".into(),
            width: 300,
            height: 200,
            is_intermediate: true,
        });
        assert_eq!(src.url, "https://example.com/media/2024/a-300x200.jpg");
        assert_eq!((src.width, src.height), (300, 200));
    }

    #[test]
    fn filters_every_srcset_candidate() {
        let t = table();
        let urls = UrlInterceptor::new(&t);
        let mut sources = vec![
            SrcsetSource { url: "/wp-content/uploads/a-300.jpg".into(), descriptor: "w".into(), value: 300 },
            SrcsetSource { url: String::new(), descriptor: "w".into(), value: 600 },
            SrcsetSource { url: "/wp-content/uploads/a-1024.jpg".into(), descriptor: "w".into(), value: 1024 },
        ];
        urls.filter_srcset(&mut sources);
        assert_eq!(sources[0].url, "/media/a-300.jpg");
        assert_eq!(sources[1].url, "");
        assert_eq!(sources[2].url, "/media/a-1024.jpg");
    }

    #[test]
    fn filters_url_headers() {
        let t = table();
        let urls = UrlInterceptor::new(&t);
        let mut headers = HeaderMap::new();
        headers.insert(header::LOCATION, HeaderValue::from_static("https://example.com/wp-comments-post.php#c1"));
        headers.append(header::LINK, HeaderValue::from_static("</wp-content/themes/t/style.css>; rel=preload"));
        headers.append(header::LINK, HeaderValue::from_static("<https://cdn.example.net/x.js>; rel=preload"));
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=60"));

        assert_eq!(urls.filter_headers(&mut headers), 2);
        assert_eq!(headers[header::LOCATION], "https://example.com/submit#c1");
        let links: Vec<_> = headers.get_all(header::LINK).iter().map(|v| v.to_str().unwrap()).collect();
        assert_eq!(links, vec!["</assets/themes/t/style.css>; rel=preload", "<https://cdn.example.net/x.js>; rel=preload"]);
        assert_eq!(headers[header::CACHE_CONTROL], "max-age=60");
    }
}
