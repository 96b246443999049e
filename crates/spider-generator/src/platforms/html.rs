//! HTML traversal helpers shared by the store finder platforms.

use scraper::{Html, Selector};
use url::Url;

/// First value of `attr` on any element matching `selector`.
pub fn attr_value(document: &Html, selector: &str, attr: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    document
        .select(&sel)
        .filter_map(|el| el.value().attr(attr))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

/// Whether any element matches `selector`.
pub fn has_element(document: &Html, selector: &str) -> bool {
    Selector::parse(selector)
        .map(|sel| document.select(&sel).next().is_some())
        .unwrap_or(false)
}

/// `src` of every `<script>` element, resolved against `base_url`.
pub fn script_sources(document: &Html, base_url: &str) -> Vec<String> {
    sources(document, "script[src]", base_url)
}

/// `src` of every `<iframe>` element, resolved against `base_url`.
pub fn iframe_sources(document: &Html, base_url: &str) -> Vec<String> {
    sources(document, "iframe[src]", base_url)
}

/// Text of every inline `<script>` element.
pub fn inline_scripts(document: &Html) -> Vec<String> {
    let Ok(sel) = Selector::parse("script:not([src])") else {
        return Vec::new();
    };
    document
        .select(&sel)
        .map(|el| el.text().collect::<String>())
        .filter(|t| !t.trim().is_empty())
        .collect()
}

fn sources(document: &Html, selector: &str, base_url: &str) -> Vec<String> {
    let Ok(sel) = Selector::parse(selector) else {
        return Vec::new();
    };
    document
        .select(&sel)
        .filter_map(|el| el.value().attr("src"))
        .filter_map(|src| resolve_url(src, base_url))
        .collect()
}

/// Resolve a possibly relative or protocol-relative URL.
pub fn resolve_url(href: &str, base_url: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let base = Url::parse(base_url).ok()?;
    base.join(href).ok().map(|u| u.to_string())
}

/// `scheme://host[:port]` of a URL.
pub fn origin_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let origin = parsed.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}

/// Whether two URLs share scheme, host and port.
pub fn same_origin(a: &str, b: &str) -> bool {
    match (origin_of(a), origin_of(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><head>
          <script src="/assets/app.js"></script>
          <script src="//cdn.storerocket.io/widget.js"></script>
          <script>window.config = {a: 1};</script>
        </head><body>
          <div id="widget" data-key="  "></div>
          <div class="widget" data-key="u42"></div>
          <iframe src="https://hosted.where2getit.com/acme/index.html"></iframe>
        </body></html>
    "#;

    #[test]
    fn test_script_sources_resolve() {
        let doc = Html::parse_document(PAGE);
        assert_eq!(
            script_sources(&doc, "https://acme.example/stores"),
            [
                "https://acme.example/assets/app.js",
                "https://cdn.storerocket.io/widget.js"
            ]
        );
    }

    #[test]
    fn test_attr_value_skips_blank() {
        let doc = Html::parse_document(PAGE);
        assert_eq!(attr_value(&doc, "[data-key]", "data-key").as_deref(), Some("u42"));
        assert_eq!(attr_value(&doc, "[data-missing]", "data-missing"), None);
        assert!(has_element(&doc, "div.widget"));
        assert!(!has_element(&doc, "#nothing"));
    }

    #[test]
    fn test_iframes_and_inline_scripts() {
        let doc = Html::parse_document(PAGE);
        assert_eq!(
            iframe_sources(&doc, "https://acme.example/"),
            ["https://hosted.where2getit.com/acme/index.html"]
        );
        let inline = inline_scripts(&doc);
        assert_eq!(inline.len(), 1);
        assert!(inline[0].contains("window.config"));
    }

    #[test]
    fn test_origins() {
        assert_eq!(
            origin_of("https://acme.example/stores?x=1").as_deref(),
            Some("https://acme.example")
        );
        assert!(same_origin("https://acme.example/a.js", "https://acme.example/"));
        assert!(!same_origin("https://cdn.example/a.js", "https://acme.example/"));
        assert!(!same_origin("not a url", "https://acme.example/"));
    }
}
