//! Heuristic seller-field extraction from Alibaba product page markup.
//!
//! Product page markup is unstable and undocumented, so every lookup here is
//! a disposable guess keyed on class-name patterns rather than a parsed
//! grammar. Each heuristic returns `Option` and a miss leaves the field at
//! its default; no single heuristic can fail the extraction as a whole.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::warn;

use crate::fetch::PageFetcher;
use crate::models::{SellerRecord, Verification};

/// Origin used to absolutize site-relative profile links
const SITE_ORIGIN: &str = "https://www.alibaba.com";

static NAME_CLASS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"company.*name").unwrap());
static VERIFIED_CLASS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"verified").unwrap());
static CONTACT_CLASS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"contact").unwrap());
static COUNTRY_CLASS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"country").unwrap());
static YEARS_TEXT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s*YRS").unwrap());
// Known-incomplete alternation, kept narrow on purpose; widening it changes
// which text node wins the first-match race on unrelated pages.
static COUNTRY_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"China|India|USA|Turkey|Pakistan").unwrap());
static WHATSAPP_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"WhatsApp[:|\s]+[+\d\s\-()]+").unwrap());
static WECHAT_TEXT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"WeChat[:|\s]+[\w\d]+").unwrap());

/// Fetch a product page and extract seller fields from it.
///
/// A fetch failure is folded into the returned record's `error` field;
/// this function never fails.
pub async fn scrape_seller(fetcher: &PageFetcher, url: &str) -> SellerRecord {
    match fetcher.fetch(url).await {
        Ok(html) => extract(&html, url),
        Err(e) => {
            warn!("Fetch failed for {}: {}", e.url, e);
            SellerRecord::fetch_failed(&e.url, e.to_string())
        }
    }
}

/// Apply all heuristics to already-fetched markup. Always returns a record.
pub fn extract(html: &str, url: &str) -> SellerRecord {
    let doc = Html::parse_document(html);
    let mut record = SellerRecord::unknown(url);

    if let Some(name) = seller_name(&doc) {
        record.name = name;
    }
    record.verification = verification(&doc);
    record.years = years_as_supplier(&doc);
    record.country = country(&doc);
    record.profile_url = profile_url(&doc);

    if let Some(href) = contact_link(&doc) {
        record.contact.insert("contact_url".to_string(), href);
    }
    if let Some(whatsapp) = first_text_match(&doc, &WHATSAPP_TEXT) {
        record.contact.insert("whatsapp".to_string(), whatsapp);
    }
    if let Some(wechat) = first_text_match(&doc, &WECHAT_TEXT) {
        record.contact.insert("wechat".to_string(), wechat);
    }

    record
}

/// First anchor, then first div, carrying a class token like `company-name`.
fn seller_name(doc: &Html) -> Option<String> {
    let elem = first_by_class_pattern(doc, &["a", "div"], &NAME_CLASS)?;
    Some(elem.text().collect::<String>().trim().to_string())
}

/// A `verified` class anywhere on the page counts; once this heuristic runs
/// the status is never left `Unknown`.
fn verification(doc: &Html) -> Verification {
    if first_by_class_pattern(doc, &["span"], &VERIFIED_CLASS).is_some() {
        Verification::Verified
    } else {
        Verification::Unverified
    }
}

/// Supplier tenure, shown on pages as e.g. "11 YRS".
fn years_as_supplier(doc: &Html) -> Option<u32> {
    for text in doc.root_element().text() {
        if let Some(caps) = YEARS_TEXT.captures(text) {
            return caps[1].parse().ok();
        }
    }
    None
}

fn country(doc: &Html) -> Option<String> {
    if let Some(elem) = first_by_class_pattern(doc, &["span"], &COUNTRY_CLASS) {
        return Some(elem.text().collect::<String>().trim().to_string());
    }
    first_text_match(doc, &COUNTRY_TEXT)
}

fn profile_url(doc: &Html) -> Option<String> {
    let anchors = Selector::parse("a").ok()?;
    let href = doc
        .select(&anchors)
        .filter_map(|a| a.value().attr("href"))
        .find(|href| href.contains("/company/"))?;
    Some(absolutize(href))
}

fn contact_link(doc: &Html) -> Option<String> {
    let elem = first_by_class_pattern(doc, &["a"], &CONTACT_CLASS)?;
    Some(elem.value().attr("href").unwrap_or_default().to_string())
}

/// Protocol-relative and site-relative hrefs become absolute; anything else
/// passes through verbatim.
fn absolutize(href: &str) -> String {
    if let Some(rest) = href.strip_prefix("//") {
        format!("https://{rest}")
    } else if href.starts_with('/') {
        format!("{SITE_ORIGIN}{href}")
    } else {
        href.to_string()
    }
}

/// First element, in document order per tag (tags tried in the given order),
/// whose class attribute has a token matching `pattern`.
fn first_by_class_pattern<'a>(
    doc: &'a Html,
    tags: &[&str],
    pattern: &Regex,
) -> Option<ElementRef<'a>> {
    for tag in tags {
        let selector = Selector::parse(tag).ok()?;
        let found = doc
            .select(&selector)
            .find(|el| el.value().classes().any(|class| pattern.is_match(class)));
        if found.is_some() {
            return found;
        }
    }
    None
}

/// First text node, in document order, matching `pattern`; the whole node is
/// returned trimmed, mirroring how the page shows e.g. "WhatsApp: +86 ...".
fn first_text_match(doc: &Html, pattern: &Regex) -> Option<String> {
    doc.root_element()
        .text()
        .find(|text| pattern.is_match(text))
        .map(|text| text.trim().to_string())
}

/// Static walkthrough for contacting sellers; messaging cannot be automated
/// past Alibaba's login wall.
pub fn contact_instructions() -> &'static str {
    r"
    How to Contact Alibaba Sellers:

    1. LOGIN REQUIRED
       - Create/login to Alibaba account at alibaba.com
       - Verified accounts get better response rates

    2. CONTACT METHODS
       - 'Contact Supplier' button on product page
       - Trade Messenger (Alibaba's chat system)
       - Email inquiry form
       - Phone (if listed on company profile)

    3. BEST PRACTICES
       - Be specific about quantity and requirements
       - Ask for detailed quotations
       - Request product samples
       - Verify supplier credentials
       - Use Alibaba Trade Assurance for payment protection

    4. RESPONSE TIME
       - Most suppliers respond within 24-48 hours
       - Gold/Verified suppliers typically faster
       - Check 'Response Rate' on supplier profile

    Note: Automated chat via this tool is not possible due to
    Alibaba's authentication and anti-bot measures.
    "
}
