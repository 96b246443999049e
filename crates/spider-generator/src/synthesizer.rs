//! Renders a spider definition as ready-to-run crawler source.
//!
//! The output grammar is fixed and deterministic: one import line per base
//! type, a class header, then the attributes. Reserved attributes come first
//! in [`RESERVED_ORDER`], every other attribute follows in lexicographic key
//! order. Identical definitions always render to identical bytes.

use crate::definition::SpiderDefinition;
use crate::error::GeneratorResult;
use crate::record::{is_private, AttributeRecord, ALLOWED_DOMAINS, ITEM_ATTRIBUTES, NAME, START_URLS};
use serde_json::Value;
use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Attributes rendered first, in this order.
pub const RESERVED_ORDER: [&str; 4] = [NAME, ITEM_ATTRIBUTES, ALLOWED_DOMAINS, START_URLS];

/// Render the complete source of a spider.
pub fn render(definition: &SpiderDefinition) -> String {
    let mut imports = String::new();
    for base in definition.bases() {
        let _ = writeln!(imports, "from {} import {}", base.module, base.name);
    }

    let superclasses = definition
        .bases()
        .iter()
        .map(|b| b.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "{imports}\n\nclass {}({superclasses}):{}",
        definition.class_name(),
        render_attributes(definition.attributes())
    )
}

/// Render only the attribute block of a spider class.
pub fn render_attributes(attributes: &AttributeRecord) -> String {
    let mut code = String::new();
    for key in ordered_keys(attributes) {
        if let Some(value) = attributes.get(key) {
            render_attribute(&mut code, key, value);
        }
    }
    code
}

/// Reserved keys that are present, then every other public key sorted.
fn ordered_keys(attributes: &AttributeRecord) -> Vec<&str> {
    let mut keys: Vec<&str> = RESERVED_ORDER
        .iter()
        .copied()
        .filter(|k| attributes.contains_key(k))
        .collect();

    let mut rest: Vec<&str> = attributes
        .keys()
        .map(String::as_str)
        .filter(|k| !RESERVED_ORDER.contains(k) && !is_private(k))
        .collect();
    rest.sort_unstable();

    keys.extend(rest);
    keys
}

fn render_attribute(code: &mut String, key: &str, value: &Value) {
    match value {
        Value::String(s) if !s.is_empty() => {
            let _ = write!(code, "\n\t{key} = \"{}\"", escape(s));
        }
        Value::Object(entries) => {
            let strings: Vec<(&String, &str)> = entries
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k, s)))
                .collect();
            if strings.is_empty() {
                return;
            }
            let _ = write!(code, "\n\t{key} = {{");
            for (sub_key, sub_value) in strings {
                let _ = write!(code, "\n\t\t{sub_key} = \"{}\",", escape(sub_value));
            }
            code.push_str("\n\t}");
        }
        Value::Array(elements) => {
            let strings: Vec<&str> = elements.iter().filter_map(Value::as_str).collect();
            if strings.is_empty() {
                return;
            }
            let _ = write!(code, "\n\t{key} = [");
            for element in strings {
                let _ = write!(code, "\n\t\t\"{}\",", escape(element));
            }
            code.push_str("\n\t]");
        }
        Value::String(_) | Value::Null => {}
        other => debug!("skipping attribute {key}: unsupported value {other}"),
    }
}

/// Escape characters that would terminate or corrupt a double-quoted literal.
/// Control characters without a short escape are written as `\xNN`.
fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c if c.is_ascii_control() => {
                let _ = write!(escaped, "\\x{:02x}", c as u32);
            }
            c => escaped.push(c),
        }
    }
    escaped
}

/// Reduce `raw` to a valid identifier. Characters outside `[A-Za-z0-9_]`
/// become `_`, runs of `_` collapse and outer ones are trimmed. A leading
/// digit gets a `_` prefix; nothing usable at all yields `spider`.
pub fn identifier(raw: &str) -> String {
    let mut cleaned = String::with_capacity(raw.len());
    for c in raw.chars() {
        let c = if c.is_ascii_alphanumeric() { c } else { '_' };
        if c == '_' && cleaned.ends_with('_') {
            continue;
        }
        cleaned.push(c);
    }

    let cleaned = cleaned.trim_matches('_');
    match cleaned.chars().next() {
        None => "spider".to_string(),
        Some(first) if first.is_ascii_digit() => format!("_{cleaned}"),
        Some(_) => cleaned.to_string(),
    }
}

/// Write the rendered spider to `<dir>/<name>.py` and return the path. The
/// file stem is always an identifier, so it never leaves `dir`.
pub fn write_spider(definition: &SpiderDefinition, dir: &Path) -> GeneratorResult<PathBuf> {
    fs::create_dir_all(dir)?;

    let stem = match definition.name() {
        Some(name) => identifier(name),
        None => identifier(&definition.class_name().to_ascii_lowercase()),
    };
    let path = dir.join(format!("{stem}.py"));

    let mut source = render(definition);
    source.push('\n');
    fs::write(&path, &source)?;

    info!("wrote {} ({} B)", path.display(), source.len());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::BaseType;
    use serde_json::json;
    use tempfile::TempDir;

    fn acme_definition() -> SpiderDefinition {
        SpiderDefinition::builder("acme_example")
            .base(BaseType::new("scraping_lib", "Spider"))
            .attribute("name", "acme_example")
            .attribute(
                "item_attributes",
                json!({"brand": "Acme", "brand_wikidata": "Q1"}),
            )
            .attribute("allowed_domains", json!(["acme.example"]))
            .attribute("start_urls", json!(["https://acme.example/stores"]))
            .build()
    }

    #[test]
    fn test_render_acme_example() {
        let expected = "from scraping_lib import Spider\n\
                        \n\
                        \n\
                        class acme_example(Spider):\n\
                        \tname = \"acme_example\"\n\
                        \titem_attributes = {\n\
                        \t\tbrand = \"Acme\",\n\
                        \t\tbrand_wikidata = \"Q1\",\n\
                        \t}\n\
                        \tallowed_domains = [\n\
                        \t\t\"acme.example\",\n\
                        \t]\n\
                        \tstart_urls = [\n\
                        \t\t\"https://acme.example/stores\",\n\
                        \t]";
        assert_eq!(render(&acme_definition()), expected);
    }

    #[test]
    fn test_render_is_deterministic() {
        let definition = acme_definition();
        assert_eq!(render(&definition), render(&definition));
        assert_eq!(render(&definition), render(&acme_definition()));
    }

    #[test]
    fn test_reserved_keys_first_then_sorted() {
        let attributes = AttributeRecord::from([
            ("zeta", json!("z")),
            ("start_urls", json!(["https://a.example/"])),
            ("api_key", json!("k")),
            ("name", json!("a")),
            ("allowed_domains", json!(["a.example"])),
            ("key", json!("u1")),
        ]);
        let code = render_attributes(&attributes);

        let position = |needle: &str| code.find(needle).unwrap();
        assert!(position("\tname =") < position("\tallowed_domains ="));
        assert!(position("\tallowed_domains =") < position("\tstart_urls ="));
        assert!(position("\tstart_urls =") < position("\tapi_key ="));
        assert!(position("\tapi_key =") < position("\tkey ="));
        assert!(position("\tkey =") < position("\tzeta ="));
    }

    #[test]
    fn test_empty_null_and_private_values_omitted() {
        let attributes = AttributeRecord::from([
            ("name", json!("acme")),
            ("blank", json!("")),
            ("empty_list", json!([])),
            ("empty_map", json!({})),
            ("_pending_scripts", json!(["https://acme.example/app.js"])),
            ("count", json!(3)),
            ("enabled", json!(true)),
        ]);
        assert_eq!(render_attributes(&attributes), "\n\tname = \"acme\"");
    }

    #[test]
    fn test_non_string_elements_skipped() {
        let attributes = AttributeRecord::from([
            ("item_attributes", json!({"brand": "Acme", "extras": {"a": 1}})),
            ("start_urls", json!(["https://a.example/", 5, null])),
        ]);
        assert_eq!(
            render_attributes(&attributes),
            "\n\titem_attributes = {\n\t\tbrand = \"Acme\",\n\t}\
             \n\tstart_urls = [\n\t\t\"https://a.example/\",\n\t]"
        );
    }

    #[test]
    fn test_embedded_quotes_are_escaped() {
        let attributes = AttributeRecord::from([("name", json!(r#"say "hi" \ bye"#))]);
        assert_eq!(
            render_attributes(&attributes),
            "\n\tname = \"say \\\"hi\\\" \\\\ bye\""
        );
    }

    #[test]
    fn test_carriage_return_and_tab_are_escaped() {
        let attributes = AttributeRecord::from([
            ("name", json!("a\rb")),
            ("opening_hours", json!(["Mo\tSa"])),
        ]);
        let code = render_attributes(&attributes);
        assert_eq!(
            code,
            "\n\tname = \"a\\rb\"\n\topening_hours = [\n\t\t\"Mo\\tSa\",\n\t]"
        );
        assert!(!code.contains('\r'));
    }

    #[test]
    fn test_other_control_characters_are_hex_escaped() {
        let attributes = AttributeRecord::from([("name", json!("a\u{0}b\u{1b}c\u{7f}"))]);
        let code = render_attributes(&attributes);
        assert_eq!(code, "\n\tname = \"a\\x00b\\x1bc\\x7f\"");
        assert!(!code.chars().any(|c| c.is_ascii_control() && c != '\n' && c != '\t'));
    }

    #[test]
    fn test_identifier() {
        assert_eq!(identifier("acme_example"), "acme_example");
        assert_eq!(identifier("7-eleven.com"), "_7_eleven_com");
        assert_eq!(identifier("Acme Stores (UK)"), "Acme_Stores_UK");
        assert_eq!(identifier("../x"), "x");
        assert_eq!(identifier("--"), "spider");
    }

    #[test]
    fn test_write_spider_stays_in_output_dir() {
        let dir = TempDir::new().unwrap();
        let definition = SpiderDefinition::builder("AcmeSpider")
            .attribute("name", "../../escaped")
            .build();
        let path = write_spider(&definition, dir.path()).unwrap();
        assert_eq!(path, dir.path().join("escaped.py"));
        assert!(path.exists());
    }

    #[test]
    fn test_multiple_bases() {
        let definition = SpiderDefinition::builder("AcmeSpider")
            .base(BaseType::new("locations.storefinders.stockist", "StockistSpider"))
            .base(BaseType::new("locations.structured_data_spider", "StructuredDataSpider"))
            .build();
        assert_eq!(
            render(&definition),
            "from locations.storefinders.stockist import StockistSpider\n\
             from locations.structured_data_spider import StructuredDataSpider\n\
             \n\nclass AcmeSpider(StockistSpider, StructuredDataSpider):"
        );
    }

    #[test]
    fn test_write_spider() {
        let dir = TempDir::new().unwrap();
        let path = write_spider(&acme_definition(), dir.path()).unwrap();

        assert_eq!(path, dir.path().join("acme_example.py"));
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("from scraping_lib import Spider\n"));
        assert!(content.ends_with("\t]\n"));
    }
}
