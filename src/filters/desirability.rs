use reqwest::blocking::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use thiserror::Error;

/// "Could not check" is kept apart from "checked and rejected".
#[derive(Debug, Error)]
pub enum DesirabilityError {
    #[error("fetching posting failed: {0}")]
    Network(String),

    #[error("fetching posting timed out")]
    Timeout,

    #[error("posting returned HTTP {0}")]
    Status(u16),

    #[error("could not read posting text: {0}")]
    Parse(String),
}

impl DesirabilityError {
    pub fn is_retryable(&self) -> bool {
        match self {
            DesirabilityError::Network(_) | DesirabilityError::Timeout => true,
            DesirabilityError::Status(code) => *code >= 500 || *code == 429,
            DesirabilityError::Parse(_) => false,
        }
    }
}

impl From<reqwest::Error> for DesirabilityError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            DesirabilityError::Timeout
        } else {
            DesirabilityError::Network(e.to_string())
        }
    }
}

/// Content gate applied after enrichment.
pub trait DesirabilityCheck: Send + Sync {
    fn is_desirable(&self, url: &str) -> Result<bool, DesirabilityError>;
}

/// Fetches the posting and rejects it if the title or body mentions a disallowed phrase.
pub struct PostingFilter {
    client: Client,
    phrases: Vec<String>,
}

impl PostingFilter {
    pub fn new<I, S>(phrases: I, timeout: Duration) -> Result<Self, DesirabilityError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DesirabilityError::Network(e.to_string()))?;

        Ok(Self {
            client,
            phrases: normalize_phrases(phrases),
        })
    }
}

impl DesirabilityCheck for PostingFilter {
    fn is_desirable(&self, url: &str) -> Result<bool, DesirabilityError> {
        let resp = self.client.get(url).send()?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DesirabilityError::Status(status.as_u16()));
        }

        let html = resp.text()?;
        let text = posting_text(&html)?;

        Ok(find_disallowed(&text, &self.phrases).is_none())
    }
}

fn normalize_phrases<I, S>(phrases: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    phrases
        .into_iter()
        .map(|p| p.as_ref().trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Title and body of a posting page, joined by a newline.
pub fn posting_text(html: &str) -> Result<String, DesirabilityError> {
    let document = Html::parse_document(html);
    let sel = |css: &'static str| {
        Selector::parse(css).map_err(|e| DesirabilityError::Parse(e.to_string()))
    };

    let title = document
        .select(&sel("#titletextonly")?)
        .next()
        .or_else(|| document.select(&sel("title").ok()?).next())
        .map(|el| el.text().collect::<String>());

    let body = document
        .select(&sel("#postingbody")?)
        .next()
        .map(|el| el.text().collect::<String>());

    match (title, body) {
        (None, None) => Err(DesirabilityError::Parse("no title or body found".into())),
        (title, body) => Ok(format!(
            "{}\n{}",
            title.unwrap_or_default().trim(),
            body.unwrap_or_default().trim()
        )),
    }
}

/// First phrase (already lowercased) that occurs in `text`, ignoring case.
pub fn find_disallowed<'a>(text: &str, phrases: &'a [String]) -> Option<&'a str> {
    let haystack = text.to_lowercase();
    phrases
        .iter()
        .find(|p| haystack.contains(p.as_str()))
        .map(String::as_str)
}
