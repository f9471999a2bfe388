use crate::db::{init_db, Database};
use crate::domain::Listing;
use crate::filters::desirability::{DesirabilityCheck, DesirabilityError};
use crate::geos::Coordinate;
use crate::notify::slack::{Notifier, NotifyError};
use crate::scraper::{ListingSource, RawListing, ScraperError, SearchQuery};
use std::ops::Deref;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Temporary database file, removed on drop.
pub struct TestDb {
    db: Database,
    path: PathBuf,
}

impl Deref for TestDb {
    type Target = Database;

    fn deref(&self) -> &Database {
        &self.db
    }
}

impl Drop for TestDb {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Returns a fresh test database using the production schema
pub fn make_db(name: &str) -> TestDb {
    let path = std::env::temp_dir().join(format!(
        "{name}_{}.sqlite",
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    let db = Database::new(path.to_string_lossy().into_owned());
    init_db(&db).expect("Failed to initialize DB");
    TestDb { db, path }
}

pub fn raw(id: i64, location: &str, geotag: Option<(f64, f64)>) -> RawListing {
    RawListing {
        id,
        url: format!("https://sfbay.craigslist.org/sfc/apa/d/listing/{id}.html"),
        name: format!("listing {id}"),
        price: Some("$2,450".into()),
        location: Some(location.into()),
        geotag: geotag.map(Coordinate::from),
        datetime: "2024-03-01 10:15".into(),
        has_image: true,
    }
}

pub fn listing(id: i64) -> Listing {
    Listing::from_raw(&raw(id, "nob hill", Some((37.79, -122.41)))).unwrap()
}

/// Yields the same rows for every query; `None` rows come out as source errors.
pub struct FakeSource {
    pub rows: Vec<Option<RawListing>>,
}

impl ListingSource for FakeSource {
    fn listings<'a>(
        &'a self,
        _query: &SearchQuery,
    ) -> Box<dyn Iterator<Item = Result<RawListing, ScraperError>> + 'a> {
        Box::new(self.rows.iter().map(|row| match row {
            Some(raw) => Ok(raw.clone()),
            None => Err(ScraperError::MissingField("data-pid")),
        }))
    }
}

/// Rejects URLs containing `bad`. URLs containing `flaky` time out and
/// URLs containing `gone` answer 404.
#[derive(Default)]
pub struct FakeDesirability {
    pub checked: Mutex<Vec<String>>,
}

impl DesirabilityCheck for FakeDesirability {
    fn is_desirable(&self, url: &str) -> Result<bool, DesirabilityError> {
        self.checked.lock().unwrap().push(url.to_string());
        if url.contains("flaky") {
            return Err(DesirabilityError::Timeout);
        }
        if url.contains("gone") {
            return Err(DesirabilityError::Status(404));
        }
        Ok(!url.contains("bad"))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
    pub fail: bool,
}

impl Notifier for RecordingNotifier {
    fn send(&self, channel: &str, text: &str) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::RequestFailed("connection refused".into()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((channel.to_string(), text.to_string()));
        Ok(())
    }
}
