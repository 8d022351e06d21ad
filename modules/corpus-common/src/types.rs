use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static SEASON_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4})/(spring|summer|fall|winter)").expect("valid regex")
});

static ITEM_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/anime/(\d+)").expect("valid regex"));

static IMAGE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(\d+)\.jpg").expect("valid regex"));

// --- Season ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

/// Archive ordering within one year. The site lists winter first, then walks
/// backwards through the calendar.
const SEASON_PRIORITY: [(Season, u8); 4] = [
    (Season::Winter, 1),
    (Season::Fall, 2),
    (Season::Summer, 3),
    (Season::Spring, 4),
];

impl Season {
    pub const ALL: [Season; 4] = [Season::Winter, Season::Spring, Season::Summer, Season::Fall];

    pub fn as_str(self) -> &'static str {
        match self {
            Season::Winter => "winter",
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Fall => "fall",
        }
    }

    pub fn priority(self) -> u8 {
        SEASON_PRIORITY
            .iter()
            .find(|(s, _)| *s == self)
            .map(|(_, p)| *p)
            .unwrap_or(u8::MAX)
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Season {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "winter" => Ok(Season::Winter),
            "spring" => Ok(Season::Spring),
            "summer" => Ok(Season::Summer),
            "fall" => Ok(Season::Fall),
            other => Err(format!("unknown season: {other}")),
        }
    }
}

// --- SeasonRef ---

/// One seasonal directory page, e.g. `{root}/2024/fall`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeasonRef {
    pub year: u32,
    pub season: Season,
    pub url: String,
}

impl SeasonRef {
    /// Pull `{year}/{season}` out of anywhere in the url.
    pub fn parse(url: &str) -> Option<Self> {
        let caps = SEASON_PATH_RE.captures(url)?;
        let year = caps[1].parse().ok()?;
        let season = caps[2].parse().ok()?;
        Some(Self {
            year,
            season,
            url: url.to_string(),
        })
    }

    pub fn format(root: &str, year: u32, season: Season) -> String {
        format!("{}/{}/{}", root.trim_end_matches('/'), year, season)
    }

    /// Newest year first, then archive priority within the year.
    pub fn sort_key(&self) -> (Reverse<u32>, u8) {
        (Reverse(self.year), self.season.priority())
    }
}

// --- ItemListing ---

/// One entry of a season page. Identity is the whole `(url, title)` pair, so a
/// retitled item is a new listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemListing {
    pub url: String,
    pub title: String,
}

impl ItemListing {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
        }
    }

    /// Numeric id embedded in the url, `0` when there is none.
    pub fn id(&self) -> u64 {
        item_id(&self.url)
            .and_then(|id| id.parse().ok())
            .unwrap_or(0)
    }

    pub fn key(&self) -> (&str, &str) {
        (&self.url, &self.title)
    }
}

// --- GalleryResult ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryResult {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub pics: Vec<String>,
}

// --- DownloadTask ---

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DownloadTask {
    pub image_url: String,
    pub filename: String,
}

impl DownloadTask {
    /// `None` when either url lacks its numeric identity.
    pub fn from_urls(item_url: &str, image_url: &str) -> Option<Self> {
        let item = item_id(item_url)?;
        let image = image_id(image_url)?;
        Some(Self {
            image_url: image_url.to_string(),
            filename: format!("{item}_{image}.jpg"),
        })
    }
}

/// Digits following `/anime/` in an item url.
pub fn item_id(url: &str) -> Option<&str> {
    ITEM_ID_RE.captures(url).and_then(|c| c.get(1)).map(|m| m.as_str())
}

/// Digits of the `/{digits}.jpg` path segment in an image url.
pub fn image_id(url: &str) -> Option<&str> {
    IMAGE_ID_RE.captures(url).and_then(|c| c.get(1)).map(|m| m.as_str())
}
