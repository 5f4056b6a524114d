use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{error, info};

pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";

const GENRES_PATH: &str = "/genre/movie/list";
const POPULAR_PATH: &str = "/movie/popular";

// ── Wire shapes ──

#[derive(Debug, Clone, Deserialize)]
pub struct RawGenre {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct GenreList {
    genres: Vec<RawGenre>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMovie {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    pub vote_average: f64,
    /// Absence is a contract violation reported by the transform, not a decode failure.
    #[serde(default)]
    pub genre_ids: Option<Vec<i64>>,
}

#[derive(Debug, Deserialize)]
struct PopularPage {
    results: Vec<RawMovie>,
}

/// Source of catalog data. `TmdbClient` talks HTTP; tests plug in their own.
pub trait Catalog {
    async fn genre_list(&self) -> Result<Vec<RawGenre>>;
    async fn popular_page(&self, page: u32) -> Result<Vec<RawMovie>>;
}

pub struct TmdbClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl TmdbClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("movie_seeder/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, page: Option<u32>) -> Result<T> {
        let mut req = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .query(&[("api_key", self.api_key.as_str())]);
        if let Some(p) = page {
            req = req.query(&[("page", p)]);
        }

        // The request URL carries the api key, so strip it from every error.
        let body = req
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| e.without_url())
            .with_context(|| format!("GET {} failed", path))?
            .text()
            .await
            .map_err(|e| e.without_url())
            .with_context(|| format!("Failed to read body of {}", path))?;

        serde_json::from_str(&body).with_context(|| format!("Unexpected response shape from {}", path))
    }
}

impl Catalog for TmdbClient {
    async fn genre_list(&self) -> Result<Vec<RawGenre>> {
        let list: GenreList = self.get_json(GENRES_PATH, None).await?;
        Ok(list.genres)
    }

    async fn popular_page(&self, page: u32) -> Result<Vec<RawMovie>> {
        let page: PopularPage = self.get_json(POPULAR_PATH, Some(page)).await?;
        Ok(page.results)
    }
}

// ── Stage fetchers ──
//
// Both return None on failure: the caller skips the stage instead of aborting the run.

pub async fn fetch_genres<C: Catalog>(catalog: &C) -> Option<Vec<RawGenre>> {
    info!("Fetching genres...");
    match catalog.genre_list().await {
        Ok(genres) => {
            info!("Fetched {} genres", genres.len());
            Some(genres)
        }
        Err(e) => {
            error!("Error fetching genres: {:#}", e);
            None
        }
    }
}

/// Fetch pages `1..=pages` in order and concatenate their results.
/// Any failed page discards everything fetched so far.
pub async fn fetch_popular_movies<C: Catalog>(catalog: &C, pages: u32) -> Option<Vec<RawMovie>> {
    info!("Fetching {} pages of popular movies...", pages);
    let pb = page_bar(pages);
    let mut movies = Vec::new();

    for page in 1..=pages {
        match catalog.popular_page(page).await {
            Ok(results) => {
                info!("Fetched page {}/{} ({} movies)", page, pages, results.len());
                movies.extend(results);
                pb.inc(1);
            }
            Err(e) => {
                pb.abandon();
                error!("Error fetching popular movies (page {}/{}): {:#}", page, pages, e);
                return None;
            }
        }
    }

    pb.finish_and_clear();
    info!("Fetched {} movies across {} pages", movies.len(), pages);
    Some(movies)
}

fn page_bar(pages: u32) -> ProgressBar {
    let pb = ProgressBar::new(pages as u64);
    let style = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40} page {pos}/{len}")
        .map(|s| s.progress_chars("=> "))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}
