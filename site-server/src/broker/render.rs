//! HTML rendering of broker pages.

use std::fmt::Write;

use serde_json::Value;

use super::seo::{breadcrumbs, PageMetadata};
use super::types::{Broker, BrokerSummary, ProsConsKind};

/// Escape text for HTML element content and attribute values.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Serialize JSON-LD so it cannot terminate its `<script>` element.
fn json_ld(schemas: &[Value]) -> String {
    serde_json::to_string(schemas)
        .unwrap_or_else(|_| "[]".to_string())
        .replace("</", "<\\/")
}

fn head(meta: &PageMetadata, schemas: &[Value]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "<meta charset=\"utf-8\">");
    let _ = writeln!(out, "<title>{}</title>", escape_html(&meta.title));
    let _ = writeln!(
        out,
        "<meta name=\"description\" content=\"{}\">",
        escape_html(&meta.description)
    );
    if let Some(keywords) = &meta.keywords {
        let _ = writeln!(out, "<meta name=\"keywords\" content=\"{}\">", escape_html(keywords));
    }
    let _ = writeln!(out, "<meta name=\"robots\" content=\"{}\">", meta.robots);
    if let Some(canonical) = &meta.canonical {
        let _ = writeln!(out, "<link rel=\"canonical\" href=\"{}\">", escape_html(canonical));
    }
    if let Some(og) = &meta.open_graph {
        for (property, value) in [
            ("og:title", og.title.as_str()),
            ("og:description", og.description.as_str()),
            ("og:url", og.url.as_str()),
            ("og:site_name", og.site_name),
            ("og:locale", og.locale),
            ("og:type", og.kind),
        ] {
            let _ = writeln!(
                out,
                "<meta property=\"{}\" content=\"{}\">",
                property,
                escape_html(value)
            );
        }
        if let Some(image) = &og.image {
            let _ = writeln!(out, "<meta property=\"og:image\" content=\"{}\">", escape_html(&image.url));
            let _ = writeln!(out, "<meta property=\"og:image:width\" content=\"{}\">", image.width);
            let _ = writeln!(out, "<meta property=\"og:image:height\" content=\"{}\">", image.height);
            let _ = writeln!(out, "<meta name=\"twitter:image\" content=\"{}\">", escape_html(&image.url));
        }
    }
    if let Some(card) = meta.twitter_card {
        let _ = writeln!(out, "<meta name=\"twitter:card\" content=\"{}\">", card);
        let _ = writeln!(out, "<meta name=\"twitter:title\" content=\"{}\">", escape_html(&meta.title));
    }
    if !schemas.is_empty() {
        let _ = writeln!(
            out,
            "<script type=\"application/ld+json\">{}</script>",
            json_ld(schemas)
        );
    }
    out
}

fn document(head: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"zh-CN\">\n<head>\n{}</head>\n<body>\n{}</body>\n</html>\n",
        head, body
    )
}

fn rating_cell(label: &str, value: Option<f64>) -> String {
    match value {
        Some(v) => format!("<li>{}: <strong>{:.1}</strong>/10</li>\n", label, v),
        None => String::new(),
    }
}

fn opt(value: &Option<String>) -> String {
    value.as_deref().map(escape_html).unwrap_or_else(|| "-".to_string())
}

/// HTML for a content block's free-form `content`.
///
/// Strings become paragraphs (split on blank lines), arrays become lists and
/// objects contribute their `text` or `items`. Anything else renders nothing.
fn block_content(content: &Value) -> String {
    match content {
        Value::String(text) => text
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| format!("<p>{}</p>\n", escape_html(p)))
            .collect(),
        Value::Array(items) => {
            let mut html = String::from("<ul>\n");
            for item in items {
                let text = match item {
                    Value::String(s) => s.clone(),
                    Value::Null => continue,
                    other => other.to_string(),
                };
                let _ = writeln!(html, "<li>{}</li>", escape_html(&text));
            }
            html.push_str("</ul>\n");
            html
        }
        Value::Object(fields) => ["text", "items"]
            .iter()
            .filter_map(|key| fields.get(*key))
            .map(block_content)
            .collect(),
        _ => String::new(),
    }
}

/// Full review page for a broker.
pub fn render_broker_page(broker: &Broker, meta: &PageMetadata, schemas: &[Value]) -> String {
    let mut body = String::new();

    body.push_str("<nav class=\"breadcrumb\">");
    let crumbs: Vec<String> = breadcrumbs(broker)
        .iter()
        .map(|c| format!("<a href=\"{}\">{}</a>", escape_html(&c.url), escape_html(&c.name)))
        .collect();
    body.push_str(&crumbs.join(" / "));
    body.push_str("</nav>\n");

    let _ = writeln!(body, "<header id=\"overview\">\n<h1>{}</h1>", escape_html(&broker.name));
    if let Some(full_name) = &broker.full_name {
        let _ = writeln!(body, "<p class=\"full-name\">{}</p>", escape_html(full_name));
    }
    let _ = writeln!(body, "<p>{}</p>\n</header>", escape_html(&meta.description));

    body.push_str("<section id=\"ratings\">\n<h2>Ratings</h2>\n<ul>\n");
    body.push_str(&rating_cell("Overall", broker.overall_rating));
    body.push_str(&rating_cell("Safety", broker.safety_rating));
    body.push_str(&rating_cell("Cost", broker.cost_rating));
    body.push_str(&rating_cell("Platform", broker.platform_rating));
    body.push_str(&rating_cell("Service", broker.service_rating));
    body.push_str(&rating_cell("Withdrawal speed", broker.withdrawal_speed_rating));
    body.push_str("</ul>\n</section>\n");

    if !broker.regulations.is_empty() {
        body.push_str("<section id=\"regulation\">\n<h2>Regulation</h2>\n<table>\n");
        body.push_str("<tr><th>Regulator</th><th>License</th><th>Tier</th><th>Protection</th></tr>\n");
        for r in &broker.regulations {
            let _ = writeln!(
                body,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape_html(&r.regulator_name),
                opt(&r.license_number),
                opt(&r.tier),
                opt(&r.protection_amount)
            );
        }
        body.push_str("</table>\n</section>\n");
    }

    if !broker.accounts.is_empty() {
        body.push_str("<section id=\"accounts\">\n<h2>Account Types</h2>\n<table>\n");
        body.push_str("<tr><th>Account</th><th>Min deposit</th><th>Leverage</th><th>Spread</th><th>Commission</th></tr>\n");
        for a in &broker.accounts {
            let deposit = a
                .min_deposit
                .map(|d| format!("${}", d))
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                body,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape_html(&a.account_type),
                deposit,
                opt(&a.max_leverage),
                opt(&a.spread_value),
                opt(&a.commission)
            );
        }
        body.push_str("</table>\n</section>\n");
    }

    if !broker.products.is_empty() {
        body.push_str("<section id=\"products\">\n<h2>Products</h2>\n<ul>\n");
        for p in &broker.products {
            let count = p
                .product_count
                .map(|c| format!(" ({})", c))
                .unwrap_or_default();
            let _ = writeln!(body, "<li>{}{}</li>", escape_html(&p.category), count);
        }
        body.push_str("</ul>\n</section>\n");
    }

    if !broker.payment_methods.is_empty() {
        body.push_str("<section id=\"payments\">\n<h2>Deposits &amp; Withdrawals</h2>\n<table>\n");
        body.push_str("<tr><th>Method</th><th>Deposit time</th><th>Withdrawal time</th><th>Fee</th></tr>\n");
        for m in &broker.payment_methods {
            let _ = writeln!(
                body,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape_html(&m.method_name),
                opt(&m.deposit_time),
                opt(&m.withdrawal_time),
                opt(&m.withdrawal_fee)
            );
        }
        body.push_str("</table>\n</section>\n");
    }

    if !broker.pros_cons.is_empty() {
        body.push_str("<section id=\"pros-cons\">\n<h2>Pros &amp; Cons</h2>\n");
        for (kind, heading) in [(ProsConsKind::Pro, "Pros"), (ProsConsKind::Con, "Cons")] {
            let _ = writeln!(body, "<h3>{}</h3>\n<ul>", heading);
            for item in broker.pros_cons.iter().filter(|p| p.kind == kind) {
                let _ = writeln!(body, "<li>{}</li>", escape_html(&item.content));
            }
            body.push_str("</ul>\n");
        }
        body.push_str("</section>\n");
    }

    for block in &broker.content_blocks {
        let content = block_content(&block.content);
        if content.is_empty() && block.title.is_none() {
            continue;
        }
        let _ = writeln!(
            body,
            "<section id=\"{}\" class=\"block block-{}\">",
            escape_html(&block.section_id),
            escape_html(&block.block_type)
        );
        if let Some(title) = &block.title {
            let _ = writeln!(body, "<h2>{}</h2>", escape_html(title));
        }
        body.push_str(&content);
        body.push_str("</section>\n");
    }

    if !broker.faqs.is_empty() {
        body.push_str("<section id=\"faq\">\n<h2>FAQ</h2>\n");
        for faq in &broker.faqs {
            let _ = writeln!(
                body,
                "<details>\n<summary>{}</summary>\n<p>{}</p>\n</details>",
                escape_html(&faq.question),
                escape_html(&faq.answer)
            );
        }
        body.push_str("</section>\n");
    }

    document(&head(meta, schemas), &body)
}

/// Listing of published brokers.
pub fn render_listing(brokers: &[BrokerSummary], site_url: &str) -> String {
    let meta = PageMetadata {
        title: "Broker Reviews".to_string(),
        description: "Independent reviews of forex brokers".to_string(),
        keywords: None,
        canonical: Some(format!("{}/brokers", site_url)),
        open_graph: None,
        twitter_card: None,
        robots: "index, follow",
    };

    let mut body = String::from("<h1>Broker Reviews</h1>\n<ul class=\"brokers\">\n");
    for b in brokers {
        let rating = b
            .overall_rating
            .map(|r| format!(" <span class=\"rating\">{:.1}</span>", r))
            .unwrap_or_default();
        let _ = writeln!(
            body,
            "<li><a href=\"/brokers/{}\">{}</a>{}</li>",
            escape_html(&b.slug),
            escape_html(&b.name),
            rating
        );
    }
    body.push_str("</ul>\n");

    document(&head(&meta, &[]), &body)
}

/// Page served for unknown or unpublished brokers.
pub fn render_not_found(meta: &PageMetadata) -> String {
    let body = format!(
        "<h1>{}</h1>\n<p>{}</p>\n<a href=\"/brokers\">Back to broker reviews</a>\n",
        escape_html(&meta.title),
        escape_html(&meta.description)
    );
    document(&head(meta, &[]), &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::seo::{not_found_metadata, page_metadata, structured_data};
    use serde_json::json;

    fn broker() -> Broker {
        serde_json::from_value(json!({
            "id": "b1",
            "slug": "acme",
            "name": "Acme <FX>",
            "meta_title": "Acme Review",
            "meta_description": "Review of Acme",
            "overall_rating": 8.25,
            "status": "published",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-02-01T00:00:00Z",
            "faqs": [{"id": "f1", "broker_id": "b1", "question": "Safe?", "answer": "</script>yes", "display_order": 0}],
            "pros_cons": [
                {"id": "p1", "broker_id": "b1", "type": "pro", "content": "Low spreads", "display_order": 0},
                {"id": "p2", "broker_id": "b1", "type": "con", "content": "No crypto", "display_order": 1}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a<b>&\"'"), "a&lt;b&gt;&amp;&quot;&#39;");
    }

    #[test]
    fn test_render_broker_page() {
        let b = broker();
        let meta = page_metadata(&b, "https://x.example");
        let schemas = structured_data(&b, "https://x.example");
        let html = render_broker_page(&b, &meta, &schemas);

        assert!(html.contains("<title>Acme Review</title>"));
        assert!(html.contains("<h1>Acme &lt;FX&gt;</h1>"));
        assert!(html.contains("<script type=\"application/ld+json\">"));
        assert!(html.contains("\"FAQPage\""));
        assert!(html.contains("<\\/script>yes"));
        assert!(html.contains("<strong>8.2</strong>") || html.contains("<strong>8.3</strong>"));
        assert!(html.contains("<li>Low spreads</li>"));
        assert!(!html.contains("id=\"regulation\""));
    }

    #[test]
    fn test_render_content_blocks_in_display_order() {
        let mut b: Broker = serde_json::from_value(json!({
            "id": "b1",
            "slug": "acme",
            "name": "Acme",
            "meta_title": "Acme Review",
            "meta_description": "Review of Acme",
            "status": "published",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-02-01T00:00:00Z",
            "content_blocks": [
                {"id": "c2", "broker_id": "b1", "section_id": "verdict", "block_type": "list",
                 "title": "Verdict", "content": ["Tight spreads", "Slow <support>"], "display_order": 2},
                {"id": "c1", "broker_id": "b1", "section_id": "intro", "block_type": "text",
                 "content": "First paragraph.\n\nSecond & last.", "display_order": 1},
                {"id": "c3", "broker_id": "b1", "section_id": "empty", "block_type": "text",
                 "content": null, "display_order": 3}
            ]
        }))
        .unwrap();
        crate::broker::types::sort_by_display_order(&mut b.content_blocks);

        let meta = page_metadata(&b, "https://x.example");
        let html = render_broker_page(&b, &meta, &[]);

        assert!(html.contains("<section id=\"intro\" class=\"block block-text\">"));
        assert!(html.contains("<p>First paragraph.</p>\n<p>Second &amp; last.</p>"));
        assert!(html.contains("<h2>Verdict</h2>\n<ul>\n<li>Tight spreads</li>\n<li>Slow &lt;support&gt;</li>"));
        assert!(html.find("id=\"intro\"").unwrap() < html.find("id=\"verdict\"").unwrap());
        assert!(!html.contains("id=\"empty\""));
    }

    #[test]
    fn test_block_content_object_uses_text_and_items() {
        let html = block_content(&json!({"text": "Summary", "items": ["a"], "style": "bold"}));
        assert_eq!(html, "<p>Summary</p>\n<ul>\n<li>a</li>\n</ul>\n");
        assert_eq!(block_content(&json!(42)), "");
    }

    #[test]
    fn test_render_listing() {
        let html = render_listing(
            &[BrokerSummary {
                slug: "acme".into(),
                name: "Acme".into(),
                overall_rating: Some(9.0),
                updated_at: "2024-01-01".into(),
            }],
            "https://x.example",
        );
        assert!(html.contains("<a href=\"/brokers/acme\">Acme</a>"));
        assert!(html.contains("9.0"));
    }

    #[test]
    fn test_render_not_found() {
        let html = render_not_found(&not_found_metadata());
        assert!(html.contains("noindex"));
        assert!(html.contains("Page not found"));
    }
}
