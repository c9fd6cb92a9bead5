//! SEO metadata, JSON-LD structured data, sitemap and robots.txt.

use serde::Serialize;
use serde_json::{json, Map, Value};

use super::types::{Broker, BrokerSummary};

pub const SITE_NAME: &str = "Forex Broker Reviews";
const REVIEW_AUTHOR: &str = "Broker Review Team";

/// Page `<head>` metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageMetadata {
    pub title: String,
    pub description: String,
    pub keywords: Option<String>,
    pub canonical: Option<String>,
    pub open_graph: Option<OpenGraph>,
    pub twitter_card: Option<&'static str>,
    pub robots: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenGraph {
    pub title: String,
    pub description: String,
    pub url: String,
    pub site_name: &'static str,
    pub image: Option<OpenGraphImage>,
    pub locale: &'static str,
    pub kind: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenGraphImage {
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub alt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breadcrumb {
    pub name: String,
    pub url: String,
}

fn canonical_url(broker: &Broker, site_url: &str) -> String {
    broker
        .canonical_url
        .clone()
        .unwrap_or_else(|| format!("{}/brokers/{}", site_url, broker.slug))
}

/// Longest description search engines display in full.
pub const META_DESCRIPTION_MAX: usize = 160;

/// Metadata for a broker review page.
pub fn page_metadata(broker: &Broker, site_url: &str) -> PageMetadata {
    let canonical = canonical_url(broker, site_url);
    let description = format_meta_description(&broker.meta_description, META_DESCRIPTION_MAX);

    PageMetadata {
        title: broker.meta_title.clone(),
        description: description.clone(),
        keywords: broker
            .meta_keywords
            .as_ref()
            .filter(|k| !k.is_empty())
            .map(|k| k.join(", ")),
        canonical: Some(canonical.clone()),
        open_graph: Some(OpenGraph {
            title: broker.meta_title.clone(),
            description,
            url: canonical,
            site_name: SITE_NAME,
            image: broker.og_image.as_ref().map(|url| OpenGraphImage {
                url: url.clone(),
                width: 1200,
                height: 630,
                alt: broker.name.clone(),
            }),
            locale: "zh_CN",
            kind: "article",
        }),
        twitter_card: Some("summary_large_image"),
        robots: "index, follow, max-image-preview:large, max-snippet:-1, max-video-preview:-1",
    }
}

/// Metadata for a missing or unpublished broker.
pub fn not_found_metadata() -> PageMetadata {
    PageMetadata {
        title: "Page not found".to_string(),
        description: "The page you requested does not exist or has been removed".to_string(),
        keywords: None,
        canonical: None,
        open_graph: None,
        twitter_card: None,
        robots: "noindex",
    }
}

/// Insert `value` only when present; JSON-LD omits unknown properties.
fn put(object: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        object.insert(key.to_string(), value);
    }
}

fn rating(value: f64) -> Value {
    json!({
        "@type": "Rating",
        "ratingValue": value,
        "bestRating": "10",
        "worstRating": "1"
    })
}

/// JSON-LD objects embedded in a broker page.
pub fn structured_data(broker: &Broker, site_url: &str) -> Vec<Value> {
    let mut schemas = Vec::new();

    // Review
    let mut item_reviewed = Map::new();
    item_reviewed.insert("@type".into(), json!("FinancialProduct"));
    item_reviewed.insert("name".into(), json!(broker.name));
    item_reviewed.insert("description".into(), json!(broker.meta_description));
    item_reviewed.insert("brand".into(), json!({"@type": "Brand", "name": broker.name}));
    put(
        &mut item_reviewed,
        "aggregateRating",
        broker.overall_rating.map(|r| {
            let mut aggregate = rating(r);
            aggregate["@type"] = json!("AggregateRating");
            aggregate
        }),
    );

    let mut review = Map::new();
    review.insert("@context".into(), json!("https://schema.org"));
    review.insert("@type".into(), json!("Review"));
    review.insert("itemReviewed".into(), Value::Object(item_reviewed));
    put(&mut review, "reviewRating", broker.overall_rating.map(rating));
    review.insert("author".into(), json!({"@type": "Person", "name": REVIEW_AUTHOR}));
    review.insert("datePublished".into(), json!(broker.created_at));
    review.insert("dateModified".into(), json!(broker.updated_at));
    review.insert("reviewBody".into(), json!(broker.meta_description));
    schemas.push(Value::Object(review));

    // Organization
    let mut organization = Map::new();
    organization.insert("@context".into(), json!("https://schema.org"));
    organization.insert("@type".into(), json!("Organization"));
    organization.insert("name".into(), json!(broker.name));
    put(&mut organization, "alternateName", broker.full_name.as_ref().map(|v| json!(v)));
    put(&mut organization, "url", broker.website_url.as_ref().map(|v| json!(v)));
    put(&mut organization, "logo", broker.logo_url.as_ref().map(|v| json!(v)));
    put(
        &mut organization,
        "foundingDate",
        broker.founded_year.map(|y| json!(y.to_string())),
    );
    put(
        &mut organization,
        "address",
        broker
            .headquarters
            .as_ref()
            .map(|hq| json!({"@type": "PostalAddress", "addressLocality": hq})),
    );
    schemas.push(Value::Object(organization));

    // BreadcrumbList
    let items: Vec<Value> = breadcrumbs(broker)
        .into_iter()
        .enumerate()
        .map(|(i, crumb)| {
            let url = if crumb.url == "/" {
                site_url.to_string()
            } else {
                format!("{}{}", site_url, crumb.url)
            };
            json!({
                "@type": "ListItem",
                "position": i + 1,
                "name": crumb.name,
                "item": url
            })
        })
        .collect();
    schemas.push(json!({
        "@context": "https://schema.org",
        "@type": "BreadcrumbList",
        "itemListElement": items
    }));

    if !broker.faqs.is_empty() {
        let questions: Vec<Value> = broker
            .faqs
            .iter()
            .map(|faq| {
                json!({
                    "@type": "Question",
                    "name": faq.question,
                    "acceptedAnswer": {"@type": "Answer", "text": faq.answer}
                })
            })
            .collect();
        schemas.push(json!({
            "@context": "https://schema.org",
            "@type": "FAQPage",
            "mainEntity": questions
        }));
    }

    schemas.extend(
        broker
            .schema_data
            .iter()
            .filter(|s| s.enabled)
            .map(|s| s.schema_data.clone()),
    );

    schemas
}

/// Breadcrumb trail of a broker page.
pub fn breadcrumbs(broker: &Broker) -> Vec<Breadcrumb> {
    vec![
        Breadcrumb {
            name: "Home".to_string(),
            url: "/".to_string(),
        },
        Breadcrumb {
            name: "Broker Reviews".to_string(),
            url: "/brokers".to_string(),
        },
        Breadcrumb {
            name: format!("{} Review", broker.name),
            url: format!("/brokers/{}", broker.slug),
        },
    ]
}

/// Collapse whitespace and cut to `max_len` characters with an ellipsis.
pub fn format_meta_description(text: &str, max_len: usize) -> String {
    let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");

    if cleaned.chars().count() > max_len {
        let cut: String = cleaned.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        cleaned
    }
}

/// Sitemap of the home page, the listing and every published broker.
pub fn sitemap_xml(site_url: &str, brokers: &[BrokerSummary], now: &str) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );

    let mut push = |loc: String, lastmod: &str, changefreq: &str, priority: &str| {
        xml.push_str(&format!(
            "  <url>\n    <loc>{}</loc>\n    <lastmod>{}</lastmod>\n    <changefreq>{}</changefreq>\n    <priority>{}</priority>\n  </url>\n",
            xml_escape(&loc),
            xml_escape(lastmod),
            changefreq,
            priority
        ));
    };

    push(site_url.to_string(), now, "daily", "1.0");
    push(format!("{}/brokers", site_url), now, "daily", "0.9");
    for broker in brokers {
        push(
            format!("{}/brokers/{}", site_url, broker.slug),
            &broker.updated_at,
            "weekly",
            "0.8",
        );
    }

    xml.push_str("</urlset>\n");
    xml
}

pub fn robots_txt(site_url: &str) -> String {
    let mut out = format!(
        "# Robots.txt for {site}\n\
         User-agent: *\n\
         Allow: /\n\
         Disallow: /api/\n\
         Disallow: /admin/\n\
         \n\
         # Sitemap\n\
         Sitemap: {site}/sitemap.xml\n\
         \n\
         User-agent: Googlebot\n\
         Crawl-delay: 0\n",
        site = site_url
    );

    for bot in ["Bingbot", "Slurp", "DuckDuckBot", "Baiduspider"] {
        out.push_str(&format!("\nUser-agent: {}\nCrawl-delay: 1\n", bot));
    }

    out
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::types::{BrokerFaq, BrokerSchemaData};

    const SITE: &str = "https://reviews.example.com";

    fn broker() -> Broker {
        serde_json::from_value(json!({
            "id": "b1",
            "slug": "acme",
            "name": "Acme",
            "full_name": "Acme Markets Ltd",
            "founded_year": 2009,
            "meta_title": "Acme Review 2024",
            "meta_description": "Is Acme safe? Full review.",
            "meta_keywords": ["acme", "forex"],
            "og_image": "https://cdn.example.com/acme.png",
            "overall_rating": 8.5,
            "status": "published",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-02-01T00:00:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn test_page_metadata_defaults_canonical() {
        let meta = page_metadata(&broker(), SITE);
        assert_eq!(meta.title, "Acme Review 2024");
        assert_eq!(meta.keywords.as_deref(), Some("acme, forex"));
        assert_eq!(meta.canonical.as_deref(), Some("https://reviews.example.com/brokers/acme"));
        let og = meta.open_graph.unwrap();
        assert_eq!(og.image.unwrap().width, 1200);
    }

    #[test]
    fn test_page_metadata_formats_description() {
        let mut b = broker();
        b.meta_description = format!("  Is Acme\n safe?  {}", "word ".repeat(60));
        let meta = page_metadata(&b, SITE);

        assert!(meta.description.starts_with("Is Acme safe? word"));
        assert!(meta.description.ends_with("..."));
        assert_eq!(meta.description.chars().count(), META_DESCRIPTION_MAX);
        assert_eq!(meta.open_graph.unwrap().description, meta.description);
    }

    #[test]
    fn test_page_metadata_prefers_stored_canonical() {
        let mut b = broker();
        b.canonical_url = Some("https://other.example.com/acme".to_string());
        let meta = page_metadata(&b, SITE);
        assert_eq!(meta.canonical.as_deref(), Some("https://other.example.com/acme"));
    }

    #[test]
    fn test_structured_data_without_faqs() {
        let schemas = structured_data(&broker(), SITE);
        let types: Vec<&str> = schemas.iter().map(|s| s["@type"].as_str().unwrap()).collect();
        assert_eq!(types, vec!["Review", "Organization", "BreadcrumbList"]);

        assert_eq!(schemas[0]["reviewRating"]["ratingValue"], json!(8.5));
        assert_eq!(schemas[0]["itemReviewed"]["aggregateRating"]["@type"], json!("AggregateRating"));
        assert_eq!(schemas[1]["foundingDate"], json!("2009"));
        assert!(schemas[1].get("address").is_none());
        assert_eq!(
            schemas[2]["itemListElement"][2]["item"],
            json!("https://reviews.example.com/brokers/acme")
        );
        assert_eq!(schemas[2]["itemListElement"][0]["item"], json!(SITE));
    }

    #[test]
    fn test_structured_data_omits_unrated() {
        let mut b = broker();
        b.overall_rating = None;
        let schemas = structured_data(&b, SITE);
        assert!(schemas[0].get("reviewRating").is_none());
        assert!(schemas[0]["itemReviewed"].get("aggregateRating").is_none());
    }

    #[test]
    fn test_structured_data_with_faqs_and_custom_schema() {
        let mut b = broker();
        b.faqs.push(BrokerFaq {
            id: "f1".into(),
            broker_id: "b1".into(),
            question: "Is Acme regulated?".into(),
            answer: "Yes, by the FCA.".into(),
            display_order: 0,
        });
        b.schema_data.push(BrokerSchemaData {
            id: "s1".into(),
            broker_id: "b1".into(),
            schema_type: "HowTo".into(),
            schema_data: json!({"@type": "HowTo"}),
            enabled: true,
        });
        b.schema_data.push(BrokerSchemaData {
            id: "s2".into(),
            broker_id: "b1".into(),
            schema_type: "Event".into(),
            schema_data: json!({"@type": "Event"}),
            enabled: false,
        });

        let schemas = structured_data(&b, SITE);
        assert_eq!(schemas.len(), 5);
        assert_eq!(schemas[3]["@type"], json!("FAQPage"));
        assert_eq!(schemas[3]["mainEntity"][0]["acceptedAnswer"]["text"], json!("Yes, by the FCA."));
        assert_eq!(schemas[4]["@type"], json!("HowTo"));
    }

    #[test]
    fn test_format_meta_description() {
        assert_eq!(format_meta_description("  a \n b\t c ", 160), "a b c");

        let long = "x".repeat(200);
        let formatted = format_meta_description(&long, 160);
        assert_eq!(formatted.chars().count(), 160);
        assert!(formatted.ends_with("..."));

        let exact = "y".repeat(160);
        assert_eq!(format_meta_description(&exact, 160), exact);
    }

    #[test]
    fn test_sitemap_lists_brokers() {
        let brokers = vec![BrokerSummary {
            slug: "acme".into(),
            name: "Acme".into(),
            overall_rating: None,
            updated_at: "2024-02-01T00:00:00Z".into(),
        }];
        let xml = sitemap_xml(SITE, &brokers, "2024-03-01T00:00:00.000Z");

        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<loc>https://reviews.example.com/brokers</loc>"));
        assert!(xml.contains("<loc>https://reviews.example.com/brokers/acme</loc>"));
        assert!(xml.contains("<lastmod>2024-02-01T00:00:00Z</lastmod>"));
        assert_eq!(xml.matches("<url>").count(), 3);
    }

    #[test]
    fn test_robots_txt() {
        let robots = robots_txt(SITE);
        assert!(robots.contains("Sitemap: https://reviews.example.com/sitemap.xml"));
        assert!(robots.contains("Disallow: /api/"));
        assert!(robots.contains("User-agent: Baiduspider"));
    }
}
