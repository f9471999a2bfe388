// scraper.rs
use crate::geos::Coordinate;
use crate::scraper::models::{RawListing, SearchQuery};
use crate::scraper::ScraperError;
use rand::Rng;
use reqwest::blocking::Client;
use scraper::{ElementRef, Html, Selector};
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0 Safari/537.36";

const MAX_ATTEMPTS: u32 = 3;
const MAX_BACKOFF: Duration = Duration::from_secs(10);
/// Consecutive pages without a single readable row before giving up.
const MAX_UNREADABLE_PAGES: u32 = 3;

/// Anything that can produce raw listings for a search.
///
/// The sequence is lazy, finite and forward-only. `Err` items are single
/// listings that could not be read; callers skip them and keep going.
pub trait ListingSource: Send + Sync {
    fn listings<'a>(
        &'a self,
        query: &SearchQuery,
    ) -> Box<dyn Iterator<Item = Result<RawListing, ScraperError>> + 'a>;
}

pub struct CraigslistSource {
    client: Client,
    base_url: Option<String>,
    retry_delay: Duration,
}

impl CraigslistSource {
    pub fn new(timeout: Duration) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ScraperError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: None,
            retry_delay: Duration::from_secs(2),
        })
    }

    /// Serve every site from `base_url` instead of `https://{site}.craigslist.org`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    fn site_url(&self, site: &str) -> Result<Url, ScraperError> {
        let raw = match &self.base_url {
            Some(base) => base.clone(),
            None => format!("https://{site}.craigslist.org"),
        };
        Url::parse(&raw).map_err(|e| ScraperError::Network(format!("bad site url {raw}: {e}")))
    }

    fn search_url(&self, query: &SearchQuery, offset: usize) -> Result<Url, ScraperError> {
        let mut url = self
            .site_url(&query.site)?
            .join(&format!("search/{}/{}", query.area, query.section))
            .map_err(|e| ScraperError::Network(e.to_string()))?;

        url.query_pairs_mut()
            .append_pair("min_price", &query.min_price.to_string())
            .append_pair("max_price", &query.max_price.to_string())
            .append_pair("sort", "date")
            .append_pair("s", &offset.to_string());

        Ok(url)
    }

    /// One page of search results. Row-level problems stay inside the vector.
    pub fn fetch_page(
        &self,
        query: &SearchQuery,
        offset: usize,
    ) -> Result<Vec<Result<RawListing, ScraperError>>, ScraperError> {
        let url = self.search_url(query, offset)?;
        debug!(%url, "fetching search page");

        let html = self.fetch_html(url.as_str())?;
        parse_search_page(&html, &url)
    }

    /// Fetch with capped backoff and jitter between attempts.
    pub fn fetch_html(&self, url: &str) -> Result<String, ScraperError> {
        let mut last_err = None;

        for attempt in 1..=MAX_ATTEMPTS {
            match self.try_fetch_html(url) {
                Ok(html) => return Ok(html),
                Err(e) => {
                    warn!(attempt, %url, error = %e, "page fetch failed");
                    last_err = Some(e);

                    if attempt < MAX_ATTEMPTS {
                        let base = std::cmp::min(self.retry_delay * attempt, MAX_BACKOFF);
                        let jitter_ms = self.retry_delay.as_millis() as u64;
                        let jitter = rand::thread_rng().gen_range(0..=jitter_ms);
                        std::thread::sleep(base + Duration::from_millis(jitter));
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| ScraperError::Network("retry loop failed".into())))
    }

    pub fn try_fetch_html(&self, url: &str) -> Result<String, ScraperError> {
        let resp = self.client.get(url).send()?;

        let status = resp.status();
        let text = resp.text()?;

        if !status.is_success() {
            return Err(ScraperError::Network(format!("HTTP {status} for {url}")));
        }

        Ok(text)
    }

    /// Coordinates from the posting page, if the poster attached a map.
    pub fn fetch_geotag(&self, url: &str) -> Result<Option<Coordinate>, ScraperError> {
        let html = self.try_fetch_html(url)?;
        parse_geotag(&html)
    }
}

impl ListingSource for CraigslistSource {
    fn listings<'a>(
        &'a self,
        query: &SearchQuery,
    ) -> Box<dyn Iterator<Item = Result<RawListing, ScraperError>> + 'a> {
        Box::new(Listings {
            source: self,
            query: query.clone(),
            offset: 0,
            pending: VecDeque::new(),
            seen: HashSet::new(),
            yielded: 0,
            unreadable_pages: 0,
            exhausted: false,
        })
    }
}

/// Lazily pages through search results, fetching each geotag as the row is consumed.
pub struct Listings<'a> {
    source: &'a CraigslistSource,
    query: SearchQuery,
    offset: usize,
    pending: VecDeque<Result<RawListing, ScraperError>>,
    seen: HashSet<i64>,
    yielded: usize,
    unreadable_pages: u32,
    exhausted: bool,
}

impl Iterator for Listings<'_> {
    type Item = Result<RawListing, ScraperError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.yielded >= self.query.limit {
                return None;
            }

            if let Some(row) = self.pending.pop_front() {
                let mut raw = match row {
                    Ok(raw) => raw,
                    Err(e) => return Some(Err(e)),
                };

                return match self.source.fetch_geotag(&raw.url) {
                    Ok(geotag) => {
                        raw.geotag = geotag;
                        self.yielded += 1;
                        Some(Ok(raw))
                    }
                    Err(e) => Some(Err(e)),
                };
            }

            if self.exhausted {
                return None;
            }

            match self.source.fetch_page(&self.query, self.offset) {
                Ok(rows) => {
                    if rows.is_empty() {
                        self.exhausted = true;
                        continue;
                    }
                    self.offset += rows.len();

                    let readable = rows.iter().filter(|r| r.is_ok()).count();
                    let seen = &mut self.seen;
                    let fresh: Vec<_> = rows
                        .into_iter()
                        .filter(|row| match row {
                            Ok(raw) => seen.insert(raw.id),
                            Err(_) => true,
                        })
                        .collect();

                    // the site repeats its last page instead of returning nothing
                    if readable > 0 && !fresh.iter().any(|r| r.is_ok()) {
                        self.exhausted = true;
                        continue;
                    }

                    if readable == 0 {
                        self.unreadable_pages += 1;
                        if self.unreadable_pages >= MAX_UNREADABLE_PAGES {
                            warn!(offset = self.offset, "giving up after unreadable pages");
                            self.exhausted = true;
                        }
                    } else {
                        self.unreadable_pages = 0;
                    }

                    self.pending.extend(fresh);
                }
                Err(e) => {
                    self.exhausted = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

fn selector(css: &'static str) -> Result<Selector, ScraperError> {
    Selector::parse(css).map_err(|e| ScraperError::HtmlParse(e.to_string()))
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Parse the result rows of a search page. Relative links are resolved against `page_url`.
pub fn parse_search_page(
    html: &str,
    page_url: &Url,
) -> Result<Vec<Result<RawListing, ScraperError>>, ScraperError> {
    let document = Html::parse_document(html);
    let row_sel = selector("li.result-row")?;
    let title_sel = selector("a.result-title")?;
    let price_sel = selector("span.result-price")?;
    let hood_sel = selector("span.result-hood")?;
    let date_sel = selector("time.result-date")?;
    let image_sel = selector("a.result-image")?;

    let rows = document
        .select(&row_sel)
        .map(|row| {
            let pid = row
                .value()
                .attr("data-pid")
                .ok_or(ScraperError::MissingField("data-pid"))?;
            let id = pid.trim().parse::<i64>().map_err(|_| ScraperError::Deserialize {
                field: "data-pid",
                value: pid.to_string(),
            })?;

            let title = row
                .select(&title_sel)
                .next()
                .ok_or(ScraperError::MissingField("result-title"))?;
            let href = title
                .value()
                .attr("href")
                .ok_or(ScraperError::MissingField("href"))?;
            let url = page_url
                .join(href)
                .map_err(|_| ScraperError::Deserialize {
                    field: "href",
                    value: href.to_string(),
                })?
                .to_string();

            let datetime = row
                .select(&date_sel)
                .next()
                .and_then(|t| t.value().attr("datetime"))
                .ok_or(ScraperError::MissingField("datetime"))?
                .to_string();

            let price = row.select(&price_sel).next().map(text_of);

            let location = row.select(&hood_sel).next().map(|h| {
                text_of(h)
                    .trim_start_matches('(')
                    .trim_end_matches(')')
                    .trim()
                    .to_string()
            });

            let has_image = row
                .select(&image_sel)
                .next()
                .and_then(|a| a.value().attr("data-ids"))
                .is_some_and(|ids| !ids.trim().is_empty());

            Ok(RawListing {
                id,
                url,
                name: text_of(title),
                price,
                location,
                geotag: None,
                datetime,
                has_image,
            })
        })
        .collect();

    Ok(rows)
}

/// `Ok(None)` when the posting has no map or the map lacks coordinates.
pub fn parse_geotag(html: &str) -> Result<Option<Coordinate>, ScraperError> {
    let document = Html::parse_document(html);
    let map_sel = selector("div#map")?;

    let Some(map) = document.select(&map_sel).next() else {
        return Ok(None);
    };

    let lat = map.value().attr("data-latitude").and_then(|v| v.trim().parse::<f64>().ok());
    let lon = map.value().attr("data-longitude").and_then(|v| v.trim().parse::<f64>().ok());

    Ok(match (lat, lon) {
        (Some(lat), Some(lon)) => Some(Coordinate::new(lat, lon)),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const SEARCH_PAGE: &str = r#"
        <html><body><ul class="rows">
          <li class="result-row" data-pid="7001">
            <a href="/sfc/apa/d/sunny-flat/7001.html" class="result-image gallery" data-ids="3:00a0a_x"></a>
            <div class="result-info">
              <time class="result-date" datetime="2024-03-01 10:15">Mar 1</time>
              <h3><a href="/sfc/apa/d/sunny-flat/7001.html" class="result-title hdrlnk">Sunny flat</a></h3>
              <span class="result-meta">
                <span class="result-price">$2,450</span>
                <span class="result-hood"> (pacific heights)</span>
              </span>
            </div>
          </li>
          <li class="result-row" data-pid="not-a-number">
            <div class="result-info">
              <time class="result-date" datetime="2024-03-01 09:00">Mar 1</time>
              <h3><a href="/sfc/apa/d/broken/1.html" class="result-title">Broken</a></h3>
            </div>
          </li>
          <li class="result-row" data-pid="7003">
            <a href="/sfc/apa/d/no-pics/7003.html" class="result-image gallery empty"></a>
            <div class="result-info">
              <time class="result-date" datetime="2024-03-01 08:00">Mar 1</time>
              <h3><a href="/sfc/apa/d/no-pics/7003.html" class="result-title">No pics</a></h3>
            </div>
          </li>
        </ul></body></html>
    "#;

    const POSTING_WITH_MAP: &str = r#"
        <html><body>
          <div id="map" data-latitude="37.7925" data-longitude="-122.4050" data-accuracy="10"></div>
        </body></html>
    "#;

    #[test]
    fn parses_rows_and_isolates_bad_ones() {
        let base = Url::parse("https://sfbay.craigslist.org/search/sfc/apa").unwrap();
        let rows = parse_search_page(SEARCH_PAGE, &base).unwrap();

        assert_eq!(rows.len(), 3);

        let first = rows[0].as_ref().unwrap();
        assert_eq!(first.id, 7001);
        assert_eq!(first.url, "https://sfbay.craigslist.org/sfc/apa/d/sunny-flat/7001.html");
        assert_eq!(first.name, "Sunny flat");
        assert_eq!(first.price.as_deref(), Some("$2,450"));
        assert_eq!(first.location.as_deref(), Some("pacific heights"));
        assert_eq!(first.datetime, "2024-03-01 10:15");
        assert!(first.has_image);

        assert!(matches!(rows[1], Err(ScraperError::Deserialize { field: "data-pid", .. })));

        let third = rows[2].as_ref().unwrap();
        assert_eq!(third.price, None);
        assert_eq!(third.location, None);
        assert!(!third.has_image);
    }

    #[test]
    fn geotag_is_optional() {
        assert_eq!(
            parse_geotag(POSTING_WITH_MAP).unwrap(),
            Some(Coordinate::new(37.7925, -122.4050))
        );
        assert_eq!(parse_geotag("<html><body>no map</body></html>").unwrap(), None);
        assert_eq!(
            parse_geotag(r#"<div id="map" data-latitude="" data-longitude="-122.4"></div>"#).unwrap(),
            None
        );
    }

    #[test]
    fn iterates_pages_lazily_and_yields_errors_in_place() {
        let mut server = mockito::Server::new();
        let first_page = server
            .mock("GET", "/search/sfc/apa")
            .match_query(Matcher::UrlEncoded("s".into(), "0".into()))
            .with_body(SEARCH_PAGE)
            .create();
        let last_page = server
            .mock("GET", "/search/sfc/apa")
            .match_query(Matcher::UrlEncoded("s".into(), "3".into()))
            .with_body("<html><body><ul class=\"rows\"></ul></body></html>")
            .create();
        server
            .mock("GET", "/sfc/apa/d/sunny-flat/7001.html")
            .with_body(POSTING_WITH_MAP)
            .create();
        server
            .mock("GET", "/sfc/apa/d/no-pics/7003.html")
            .with_body("<html><body></body></html>")
            .create();

        let source = CraigslistSource::new(Duration::from_secs(5))
            .unwrap()
            .with_base_url(server.url())
            .with_retry_delay(Duration::ZERO);
        let query = SearchQuery {
            site: "sfbay".into(),
            area: "sfc".into(),
            section: "apa".into(),
            min_price: 1000,
            max_price: 5000,
            limit: 20,
        };

        let items: Vec<_> = source.listings(&query).collect();

        first_page.assert();
        last_page.assert();
        assert_eq!(items.len(), 3);
        assert_eq!(
            items[0].as_ref().unwrap().geotag,
            Some(Coordinate::new(37.7925, -122.4050))
        );
        assert!(items[1].is_err());
        assert_eq!(items[2].as_ref().unwrap().geotag, None);
    }

    #[test]
    fn stops_at_limit() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/search/sfc/apa")
            .match_query(Matcher::Any)
            .with_body(SEARCH_PAGE)
            .create();
        server
            .mock("GET", Matcher::Regex("^/sfc/apa/d/".into()))
            .with_body(POSTING_WITH_MAP)
            .create();

        let source = CraigslistSource::new(Duration::from_secs(5))
            .unwrap()
            .with_base_url(server.url())
            .with_retry_delay(Duration::ZERO);
        let query = SearchQuery {
            site: "sfbay".into(),
            area: "sfc".into(),
            section: "apa".into(),
            min_price: 0,
            max_price: 9999,
            limit: 1,
        };

        let ok: Vec<_> = source.listings(&query).filter_map(Result::ok).collect();
        assert_eq!(ok.len(), 1);
        assert_eq!(ok[0].id, 7001);
    }

    #[test]
    fn repeated_page_ends_iteration() {
        let mut server = mockito::Server::new();
        // every offset returns the same rows
        server
            .mock("GET", "/search/sfc/apa")
            .match_query(Matcher::Any)
            .with_body(SEARCH_PAGE)
            .create();
        server
            .mock("GET", Matcher::Regex("^/sfc/apa/d/".into()))
            .with_body(POSTING_WITH_MAP)
            .create();

        let source = CraigslistSource::new(Duration::from_secs(5))
            .unwrap()
            .with_base_url(server.url())
            .with_retry_delay(Duration::ZERO);
        let query = SearchQuery {
            site: "sfbay".into(),
            area: "sfc".into(),
            section: "apa".into(),
            min_price: 0,
            max_price: 9999,
            limit: 100,
        };

        let ok: Vec<_> = source.listings(&query).filter_map(Result::ok).collect();
        let ids: Vec<_> = ok.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![7001, 7003]);
    }

    fn query(limit: usize) -> SearchQuery {
        SearchQuery {
            site: "sfbay".into(),
            area: "sfc".into(),
            section: "apa".into(),
            min_price: 0,
            max_price: 9999,
            limit,
        }
    }

    #[test]
    fn failing_page_is_retried_then_reported() {
        let mut server = mockito::Server::new();
        let page = server
            .mock("GET", "/search/sfc/apa")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("busy")
            .expect(3)
            .create();

        let source = CraigslistSource::new(Duration::from_secs(5))
            .unwrap()
            .with_base_url(server.url())
            .with_retry_delay(Duration::ZERO);

        let mut items = source.listings(&query(20));
        assert!(matches!(items.next(), Some(Err(ScraperError::Network(_)))));
        assert!(items.next().is_none());
        page.assert();
    }

    #[test]
    fn unreadable_page_does_not_end_pagination() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/search/sfc/apa")
            .match_query(Matcher::UrlEncoded("s".into(), "0".into()))
            .with_body(r#"<ul><li class="result-row" data-pid="oops"></li></ul>"#)
            .create();
        server
            .mock("GET", "/search/sfc/apa")
            .match_query(Matcher::UrlEncoded("s".into(), "1".into()))
            .with_body(SEARCH_PAGE)
            .create();
        let last_page = server
            .mock("GET", "/search/sfc/apa")
            .match_query(Matcher::UrlEncoded("s".into(), "4".into()))
            .with_body("<html><body><ul class=\"rows\"></ul></body></html>")
            .create();
        server
            .mock("GET", Matcher::Regex("^/sfc/apa/d/".into()))
            .with_body(POSTING_WITH_MAP)
            .create();

        let source = CraigslistSource::new(Duration::from_secs(5))
            .unwrap()
            .with_base_url(server.url())
            .with_retry_delay(Duration::ZERO);

        let items: Vec<_> = source.listings(&query(20)).collect();

        last_page.assert();
        assert_eq!(items.len(), 4);
        assert!(items[0].is_err());
        let ids: Vec<_> = items.iter().filter_map(|r| r.as_ref().ok()).map(|r| r.id).collect();
        assert_eq!(ids, vec![7001, 7003]);
    }
}
