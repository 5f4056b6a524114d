use indexmap::{IndexMap, IndexSet};
use thiserror::Error;

use crate::db::{GenreRow, MovieGenreRow, MovieRow};
use crate::tmdb::{RawGenre, RawMovie};

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("movie {id} has no genre_ids")]
    MissingGenreIds { id: i64 },
}

/// Everything the movie stage writes, already de-duplicated.
pub struct MovieBatch {
    pub movies: Vec<MovieRow>,
    pub movie_genres: Vec<MovieGenreRow>,
}

pub fn project_genres(raw: Vec<RawGenre>) -> Vec<GenreRow> {
    raw.into_iter()
        .map(|g| GenreRow { id: g.id, name: g.name })
        .collect()
}

/// One entry per id: position of the first occurrence, value of the last.
pub fn dedupe_movies(raw: Vec<RawMovie>) -> Vec<RawMovie> {
    let mut unique: IndexMap<i64, RawMovie> = IndexMap::with_capacity(raw.len());
    for m in raw {
        // IndexMap::insert keeps the existing slot and swaps the value.
        unique.insert(m.id, m);
    }
    unique.into_values().collect()
}

/// Distinct (movie, genre) pairs in first-seen order.
pub fn movie_genre_pairs(movies: &[RawMovie]) -> Result<Vec<MovieGenreRow>, TransformError> {
    let mut pairs: IndexSet<(i64, i64)> = IndexSet::new();
    for m in movies {
        let genre_ids = m
            .genre_ids
            .as_ref()
            .ok_or(TransformError::MissingGenreIds { id: m.id })?;
        for &genre_id in genre_ids {
            pairs.insert((m.id, genre_id));
        }
    }
    Ok(pairs
        .into_iter()
        .map(|(movie_id, genre_id)| MovieGenreRow { movie_id, genre_id })
        .collect())
}

/// Shape mapping only: an empty release date becomes NULL, everything else is copied as-is.
pub fn project_movie(m: RawMovie) -> MovieRow {
    MovieRow {
        id: m.id,
        title: m.title,
        overview: m.overview,
        poster_path: m.poster_path,
        backdrop_path: m.backdrop_path,
        release_date: m.release_date.filter(|d| !d.is_empty()),
        vote_average: m.vote_average,
    }
}

/// Flat fetched list → unique movies + unique relations.
pub fn prepare_movies(raw: Vec<RawMovie>) -> Result<MovieBatch, TransformError> {
    let unique = dedupe_movies(raw);
    let movie_genres = movie_genre_pairs(&unique)?;
    let movies = unique.into_iter().map(project_movie).collect();
    Ok(MovieBatch {
        movies,
        movie_genres,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tmdb::fake::movie;

    fn pair(movie_id: i64, genre_id: i64) -> MovieGenreRow {
        MovieGenreRow { movie_id, genre_id }
    }

    #[test]
    fn duplicate_ids_take_last_value_first_position() {
        let batch = prepare_movies(vec![
            movie(1, "v1", &[1, 2]),
            movie(2, "two", &[2]),
            movie(1, "v2", &[1, 2]),
        ])
        .unwrap();

        let got: Vec<(i64, &str)> = batch.movies.iter().map(|m| (m.id, m.title.as_str())).collect();
        assert_eq!(got, vec![(1, "v2"), (2, "two")]);
        assert_eq!(batch.movie_genres, vec![pair(1, 1), pair(1, 2), pair(2, 2)]);
    }

    #[test]
    fn relations_come_from_last_occurrence() {
        // The first copy's genre 99 is gone once the later copy replaces it.
        let batch = prepare_movies(vec![movie(5, "old", &[99, 18]), movie(5, "new", &[18, 28])])
            .unwrap();
        assert_eq!(batch.movies.len(), 1);
        assert_eq!(batch.movie_genres, vec![pair(5, 18), pair(5, 28)]);
    }

    #[test]
    fn repeated_genre_within_movie_collapses() {
        let pairs = movie_genre_pairs(&[movie(1, "a", &[3, 3, 4]), movie(2, "b", &[])]).unwrap();
        assert_eq!(pairs, vec![pair(1, 3), pair(1, 4)]);
    }

    #[test]
    fn relation_count_matches_distinct_pairs() {
        let raw: Vec<RawMovie> = (0..40)
            .map(|i| movie(i % 7, "m", &[i % 3, (i + 1) % 3]))
            .collect();
        let unique = dedupe_movies(raw);
        assert_eq!(unique.len(), 7);

        let pairs = movie_genre_pairs(&unique).unwrap();
        let expected: std::collections::HashSet<(i64, i64)> = unique
            .iter()
            .flat_map(|m| {
                m.genre_ids
                    .iter()
                    .flatten()
                    .map(move |&g| (m.id, g))
            })
            .collect();
        assert_eq!(pairs.len(), expected.len());
        assert!(pairs.iter().all(|p| expected.contains(&(p.movie_id, p.genre_id))));
    }

    #[test]
    fn missing_genre_ids_is_an_error() {
        let mut broken = movie(8, "no genres", &[]);
        broken.genre_ids = None;
        let err = prepare_movies(vec![movie(1, "ok", &[1]), broken]).err().unwrap();
        assert!(matches!(err, TransformError::MissingGenreIds { id: 8 }));
    }

    #[test]
    fn empty_or_missing_release_date_is_null() {
        let mut blank = movie(1, "blank", &[]);
        blank.release_date = Some(String::new());
        let mut missing = movie(2, "missing", &[]);
        missing.release_date = None;

        assert_eq!(project_movie(blank).release_date, None);
        assert_eq!(project_movie(missing).release_date, None);
        assert_eq!(
            project_movie(movie(3, "dated", &[])).release_date.as_deref(),
            Some("2023-07-21")
        );
    }

    #[test]
    fn odd_release_date_copied_verbatim() {
        let mut m = movie(4, "odd", &[1]);
        m.release_date = Some("2024-1-5x".into());
        let batch = prepare_movies(vec![m]).unwrap();
        assert_eq!(batch.movies[0].release_date.as_deref(), Some("2024-1-5x"));
    }

    #[test]
    fn other_fields_copied_verbatim() {
        let mut m = movie(9, "Heat", &[80]);
        m.overview = Some("A group of professional bank robbers".into());
        m.poster_path = Some("/heat.jpg".into());
        m.vote_average = 7.9;

        let row = project_movie(m);
        assert_eq!(row.overview.as_deref(), Some("A group of professional bank robbers"));
        assert_eq!(row.poster_path.as_deref(), Some("/heat.jpg"));
        assert_eq!(row.backdrop_path, None);
        assert_eq!(row.vote_average, 7.9);
    }

    #[test]
    fn null_overview_stays_null() {
        let mut m = movie(10, "quiet", &[]);
        m.overview = None;
        assert_eq!(project_movie(m).overview, None);
    }

    #[test]
    fn genres_project_id_and_name() {
        let rows = project_genres(vec![crate::tmdb::fake::genre(18, "Drama")]);
        assert_eq!(rows, vec![GenreRow { id: 18, name: "Drama".into() }]);
    }
}
