use std::fmt;

use anyhow::Result;
use rusqlite::Connection;
use tracing::{error, info, warn};

use crate::db;
use crate::tmdb::{self, Catalog};
use crate::transform;

/// What happened to one table during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Upstream fetch failed; nothing was attempted.
    Skipped,
    Upserted(usize),
    Failed(String),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Skipped => write!(f, "skipped (fetch failed)"),
            Outcome::Upserted(n) => write!(f, "{} rows", n),
            Outcome::Failed(e) => write!(f, "failed: {}", e),
        }
    }
}

pub struct SeedReport {
    pub genres: Outcome,
    pub movies: Outcome,
    pub movie_genres: Outcome,
}

impl SeedReport {
    pub fn print(&self) {
        println!("genres:       {}", self.genres);
        println!("movies:       {}", self.movies);
        println!("movie_genres: {}", self.movie_genres);
    }
}

/// Run both stages in order. Fetch and upsert failures are logged and recorded
/// in the report; only transform contract errors abort the run.
pub async fn run<C: Catalog>(catalog: &C, conn: &Connection, pages: u32) -> Result<SeedReport> {
    info!("Starting seed ({} pages)", pages);

    let genres = match tmdb::fetch_genres(catalog).await {
        Some(raw) => {
            let rows = transform::project_genres(raw);
            record("genres", db::upsert_genres(conn, &rows))
        }
        None => Outcome::Skipped,
    };

    let (movies, movie_genres) = match tmdb::fetch_popular_movies(catalog, pages).await {
        Some(raw) => {
            let fetched = raw.len();
            let batch = transform::prepare_movies(raw)?;
            info!(
                "Prepared {} unique movies ({} fetched), {} genre links",
                batch.movies.len(),
                fetched,
                batch.movie_genres.len()
            );
            let movies = record("movies", db::upsert_movies(conn, &batch.movies));
            let links = record("movie_genres", db::upsert_movie_genres(conn, &batch.movie_genres));
            (movies, links)
        }
        None => {
            warn!("Skipping movies and movie_genres");
            (Outcome::Skipped, Outcome::Skipped)
        }
    };

    info!("Seed finished");
    Ok(SeedReport {
        genres,
        movies,
        movie_genres,
    })
}

fn record(table: &str, result: Result<usize>) -> Outcome {
    match result {
        Ok(n) => {
            info!("Seeded {} ({} rows written)", table, n);
            Outcome::Upserted(n)
        }
        Err(e) => {
            error!("Error seeding {}: {:#}", table, e);
            Outcome::Failed(format!("{:#}", e))
        }
    }
}
