use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

pub const DEFAULT_DB_PATH: &str = "data/movies.sqlite";

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {:?}", dir))?;
    }
    let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS genres (
            id    INTEGER PRIMARY KEY,
            name  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS movies (
            id            INTEGER PRIMARY KEY,
            title         TEXT NOT NULL,
            overview      TEXT,
            poster_path   TEXT,
            backdrop_path TEXT,
            release_date  TEXT,
            vote_average  REAL NOT NULL
        );

        CREATE TABLE IF NOT EXISTS movie_genres (
            movie_id  INTEGER NOT NULL,
            genre_id  INTEGER NOT NULL,
            PRIMARY KEY (movie_id, genre_id)
        );
        CREATE INDEX IF NOT EXISTS idx_movie_genres_genre ON movie_genres(genre_id);
        ",
    )?;
    Ok(())
}

// ── Rows ──

#[derive(Debug, Clone, PartialEq)]
pub struct GenreRow {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MovieRow {
    pub id: i64,
    pub title: String,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub release_date: Option<String>,
    pub vote_average: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MovieGenreRow {
    pub movie_id: i64,
    pub genre_id: i64,
}

// ── Upserts ──
//
// One transaction per table: a batch either lands whole or not at all.

pub fn upsert_genres(conn: &Connection, rows: &[GenreRow]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO genres (id, name) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name",
        )?;
        for g in rows {
            count += stmt.execute(rusqlite::params![g.id, g.name])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

pub fn upsert_movies(conn: &Connection, rows: &[MovieRow]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO movies
             (id, title, overview, poster_path, backdrop_path, release_date, vote_average)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                title         = excluded.title,
                overview      = excluded.overview,
                poster_path   = excluded.poster_path,
                backdrop_path = excluded.backdrop_path,
                release_date  = excluded.release_date,
                vote_average  = excluded.vote_average",
        )?;
        for m in rows {
            count += stmt.execute(rusqlite::params![
                m.id, m.title, m.overview, m.poster_path, m.backdrop_path, m.release_date,
                m.vote_average,
            ])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

/// Returns the number of pairs not already present.
pub fn upsert_movie_genres(conn: &Connection, rows: &[MovieGenreRow]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO movie_genres (movie_id, genre_id) VALUES (?1, ?2)
             ON CONFLICT(movie_id, genre_id) DO NOTHING",
        )?;
        for r in rows {
            count += stmt.execute(rusqlite::params![r.movie_id, r.genre_id])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

// ── Reads ──

#[cfg(test)]
pub fn fetch_movies(conn: &Connection) -> Result<Vec<MovieRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, overview, poster_path, backdrop_path, release_date, vote_average
         FROM movies ORDER BY id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(MovieRow {
                id: row.get(0)?,
                title: row.get(1)?,
                overview: row.get(2)?,
                poster_path: row.get(3)?,
                backdrop_path: row.get(4)?,
                release_date: row.get(5)?,
                vote_average: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
pub fn fetch_movie_genres(conn: &Connection) -> Result<Vec<MovieGenreRow>> {
    let mut stmt =
        conn.prepare("SELECT movie_id, genre_id FROM movie_genres ORDER BY movie_id, genre_id")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(MovieGenreRow {
                movie_id: row.get(0)?,
                genre_id: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Stats ──

pub struct Stats {
    pub genres: usize,
    pub movies: usize,
    pub movie_genres: usize,
    pub undated: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let genres: usize = conn.query_row("SELECT COUNT(*) FROM genres", [], |r| r.get(0))?;
    let movies: usize = conn.query_row("SELECT COUNT(*) FROM movies", [], |r| r.get(0))?;
    let movie_genres: usize =
        conn.query_row("SELECT COUNT(*) FROM movie_genres", [], |r| r.get(0))?;
    let undated: usize = conn.query_row(
        "SELECT COUNT(*) FROM movies WHERE release_date IS NULL",
        [],
        |r| r.get(0),
    )?;
    Ok(Stats {
        genres,
        movies,
        movie_genres,
        undated,
    })
}

#[cfg(test)]
pub fn connect_in_memory() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    init_schema(&conn).unwrap();
    conn
}
