use crate::geos::Coordinate;

// li.result-row[data-pid]
//  ├── a.result-image[data-ids]        -> has_image
//  └── div.result-info
//       ├── time.result-date[datetime] -> datetime
//       ├── a.result-title[href]       -> name, url
//       └── span.result-meta
//            ├── span.result-price     -> price
//            └── span.result-hood      -> location ("where")
//
// geotag comes from the posting page: div#map[data-latitude][data-longitude]

/// One search result as the site presents it, before any normalisation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawListing {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub price: Option<String>,
    pub location: Option<String>,
    pub geotag: Option<Coordinate>,
    pub datetime: String,
    pub has_image: bool,
}

/// Search parameters for one (site, area, section, price range) pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub site: String,
    pub area: String,
    pub section: String,
    pub min_price: u32,
    pub max_price: u32,
    pub limit: usize,
}
