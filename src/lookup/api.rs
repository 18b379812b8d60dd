//! API clients for Google Books, Open Library, xISBN, LibraryThing and eBay

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::lookup::BookSource;

const USER_AGENT: &str = "schoolshelf/0.1.0";

/// A book as described by one bibliographic source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookCandidate {
    pub source: String,
    pub title: String,
    pub description: Option<String>,
    pub isbn10: Option<String>,
    pub isbn13: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub thumbnail_url: Option<String>,
    pub preview_url: Option<String>,
}

// ============================================================================
// Google Books API Response Structs
// ============================================================================

/// `volumes?q=` list response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleVolumesResponse {
    #[serde(default)]
    total_items: i64,
    items: Option<Vec<GoogleVolume>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleVolume {
    volume_info: Option<GoogleVolumeInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleVolumeInfo {
    title: Option<String>,
    description: Option<String>,
    #[serde(default)]
    industry_identifiers: Vec<GoogleIdentifier>,
    #[serde(default)]
    authors: Vec<String>,
    #[serde(default)]
    categories: Vec<String>,
    image_links: Option<GoogleImageLinks>,
    preview_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleIdentifier {
    #[serde(rename = "type")]
    kind: Option<String>,
    identifier: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleImageLinks {
    small_thumbnail: Option<String>,
    thumbnail: Option<String>,
}

// ============================================================================
// Open Library API Response Structs
// ============================================================================

#[derive(Debug, Deserialize)]
struct OpenLibrarySearchResponse {
    #[serde(default)]
    docs: Vec<OpenLibraryDoc>,
}

#[derive(Debug, Deserialize)]
struct OpenLibraryDoc {
    key: Option<String>,
    title: Option<String>,
    #[serde(default)]
    author_name: Vec<String>,
    #[serde(default)]
    subject: Vec<String>,
    cover_i: Option<i64>,
}

// ============================================================================
// xISBN Response Structs
// ============================================================================

#[derive(Debug, Deserialize)]
struct XisbnResponse {
    stat: Option<String>,
    #[serde(default)]
    list: Vec<XisbnEdition>,
}

#[derive(Debug, Deserialize)]
struct XisbnEdition {
    #[serde(default)]
    isbn: Vec<String>,
}

// ============================================================================
// Response parsers
// ============================================================================

/// Build the `q=` value for a Google Books volume search.
///
/// Returns None when there is nothing to search for.
pub fn google_query(isbn: Option<&str>, title: Option<&str>) -> Option<String> {
    let mut terms = Vec::new();

    if let Some(title) = title.map(str::trim).filter(|t| !t.is_empty()) {
        terms.push(format!("intitle:{}", urlencoding::encode(title)));
    }
    if let Some(isbn) = isbn.map(str::trim).filter(|i| !i.is_empty()) {
        terms.push(format!("isbn:{}", urlencoding::encode(isbn)));
    }

    if terms.is_empty() {
        None
    } else {
        Some(terms.join("+"))
    }
}

/// Parse a Google Books `volumes` list body into candidates
pub fn parse_google_volumes(body: &str) -> Result<Vec<BookCandidate>> {
    let response: GoogleVolumesResponse =
        serde_json::from_str(body).context("Failed to parse Google Books response")?;

    if response.total_items <= 0 {
        return Ok(Vec::new());
    }

    let books = response
        .items
        .unwrap_or_default()
        .into_iter()
        .filter_map(|item| item.volume_info)
        .filter_map(google_volume_to_candidate)
        .collect();

    Ok(books)
}

fn google_volume_to_candidate(info: GoogleVolumeInfo) -> Option<BookCandidate> {
    let title = info.title.filter(|t| !t.trim().is_empty())?;

    let mut isbn10 = None;
    let mut isbn13 = None;
    for ident in info.industry_identifiers {
        match ident.kind.as_deref().map(str::to_uppercase).as_deref() {
            Some("ISBN_13") => isbn13 = ident.identifier,
            Some("ISBN_10") => isbn10 = ident.identifier,
            _ => {}
        }
    }

    let thumbnail_url = info
        .image_links
        .and_then(|links| links.small_thumbnail.or(links.thumbnail));

    Some(BookCandidate {
        source: "google".to_string(),
        title,
        description: info.description,
        isbn10,
        isbn13,
        authors: info.authors,
        categories: info.categories,
        thumbnail_url,
        preview_url: info.preview_link,
    })
}

/// Parse an Open Library search body, keeping the first document only
pub fn parse_openlibrary(body: &str) -> Result<Vec<BookCandidate>> {
    let response: OpenLibrarySearchResponse =
        serde_json::from_str(body).context("Failed to parse Open Library response")?;

    let Some(doc) = response.docs.into_iter().next() else {
        return Ok(Vec::new());
    };
    let Some(title) = doc.title.filter(|t| !t.trim().is_empty()) else {
        return Ok(Vec::new());
    };

    Ok(vec![BookCandidate {
        source: "openlibrary".to_string(),
        title,
        description: None, // search results carry no description
        isbn10: None,
        isbn13: None,
        authors: doc.author_name,
        categories: doc.subject.into_iter().take(1).collect(),
        thumbnail_url: doc
            .cover_i
            .map(|id| format!("https://covers.openlibrary.org/b/id/{}-M.jpg", id)),
        preview_url: doc.key.map(|k| format!("https://openlibrary.org{}", k)),
    }])
}

/// Parse an xISBN `getEditions` body into the first ISBN of every edition
pub fn parse_xisbn(body: &str) -> Result<Vec<String>> {
    let response: XisbnResponse =
        serde_json::from_str(body).context("Failed to parse xISBN response")?;

    if !response
        .stat
        .as_deref()
        .is_some_and(|s| s.eq_ignore_ascii_case("ok"))
    {
        return Ok(Vec::new());
    }

    Ok(response
        .list
        .into_iter()
        .filter_map(|edition| edition.isbn.into_iter().next())
        .collect())
}

/// Parse a LibraryThing `thingISBN` XML body
pub fn parse_thing_isbn(body: &str) -> Result<Vec<String>> {
    let doc = roxmltree::Document::parse(body).context("Failed to parse thingISBN XML")?;

    Ok(doc
        .descendants()
        .filter(|n| n.has_tag_name("isbn"))
        .filter_map(|n| n.text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect())
}

/// Pull the first listing title out of an eBay `findItemsAdvanced` body,
/// with the ISBN itself removed
pub fn parse_ebay_title(body: &str, isbn: &str) -> Result<Option<String>> {
    let value: serde_json::Value =
        serde_json::from_str(body).context("Failed to parse eBay response")?;

    let response = &value["findItemsAdvancedResponse"][0];

    let ack = response["ack"][0].as_str().unwrap_or("");
    if !ack.eq_ignore_ascii_case("success") {
        return Ok(None);
    }

    let count: i64 = response["searchResult"][0]["@count"]
        .as_str()
        .and_then(|c| c.parse().ok())
        .unwrap_or(0);
    if count <= 0 {
        return Ok(None);
    }

    let title = response["searchResult"][0]["item"][0]["title"][0]
        .as_str()
        .map(|t| t.replace(isbn, "").trim().to_string())
        .filter(|t| !t.is_empty());

    Ok(title)
}

// ============================================================================
// HTTP client
// ============================================================================

/// Live bibliographic services reached over HTTP
pub struct HttpBookSource {
    client: reqwest::Client,
    google_api_key: Option<String>,
    ebay_appname: Option<String>,
}

impl HttpBookSource {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            google_api_key: config.google_api_key.clone(),
            ebay_appname: config.ebay_appname.clone(),
        })
    }

    /// GET a URL and return the body, or None for a non-success status
    async fn get_text(&self, url: &str, service: &str) -> Result<Option<String>> {
        debug!("GET {} ({})", url, service);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", service))?;

        if !response.status().is_success() {
            warn!("{} returned status {}", service, response.status());
            return Ok(None);
        }

        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read {} response", service))?;
        Ok(Some(body))
    }

    async fn xisbn_editions(&self, isbn: &str) -> Result<Vec<String>> {
        let url = format!(
            "http://xisbn.worldcat.org/webservices/xid/isbn/{}?method=getEditions&format=json",
            urlencoding::encode(isbn)
        );
        match self.get_text(&url, "xISBN").await? {
            Some(body) => parse_xisbn(&body),
            None => Ok(Vec::new()),
        }
    }

    async fn thing_isbns(&self, isbn: &str) -> Result<Vec<String>> {
        let url = format!(
            "http://www.librarything.com/api/thingISBN/{}",
            urlencoding::encode(isbn)
        );
        match self.get_text(&url, "LibraryThing").await? {
            Some(body) => parse_thing_isbn(&body),
            None => Ok(Vec::new()),
        }
    }
}

impl BookSource for HttpBookSource {
    async fn search_volumes(
        &self,
        isbn: Option<&str>,
        title: Option<&str>,
    ) -> Result<Vec<BookCandidate>> {
        let Some(query) = google_query(isbn, title) else {
            return Ok(Vec::new());
        };

        let mut url = format!(
            "https://www.googleapis.com/books/v1/volumes?q={}&printType=books",
            query
        );
        if let Some(ref key) = self.google_api_key {
            url.push_str("&key=");
            url.push_str(&urlencoding::encode(key));
        }

        match self.get_text(&url, "Google Books").await? {
            Some(body) => parse_google_volumes(&body),
            None => Ok(Vec::new()),
        }
    }

    async fn search_secondary(&self, isbn: &str) -> Result<Vec<BookCandidate>> {
        let url = format!(
            "https://openlibrary.org/search.json?isbn={}",
            urlencoding::encode(isbn)
        );
        match self.get_text(&url, "Open Library").await? {
            Some(body) => parse_openlibrary(&body),
            None => Ok(Vec::new()),
        }
    }

    async fn related_isbns(&self, isbn: &str) -> Result<Vec<String>> {
        let (xisbn, thing) = tokio::join!(self.xisbn_editions(isbn), self.thing_isbns(isbn));

        let mut related = Vec::new();
        match xisbn {
            Ok(list) => related.extend(list),
            Err(e) => warn!("xISBN lookup for {} failed: {:#}", isbn, e),
        }
        match thing {
            Ok(list) => related.extend(list),
            Err(e) => warn!("LibraryThing lookup for {} failed: {:#}", isbn, e),
        }
        Ok(related)
    }

    async fn title_for_isbn(&self, isbn: &str) -> Result<Option<String>> {
        let Some(ref appname) = self.ebay_appname else {
            debug!("No eBay app name configured, skipping title lookup");
            return Ok(None);
        };

        let url = format!(
            "https://svcs.ebay.com/services/search/FindingService/v1\
             ?OPERATION-NAME=findItemsAdvanced&RESPONSE-DATA-FORMAT=JSON\
             &SECURITY-APPNAME={}&GLOBAL-ID=EBAY-GB&categoryId=267&keywords={}",
            urlencoding::encode(appname),
            urlencoding::encode(isbn)
        );
        match self.get_text(&url, "eBay").await? {
            Some(body) => parse_ebay_title(&body, isbn),
            None => Ok(None),
        }
    }
}
