mod db;
mod seed;
mod tmdb;
mod transform;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "movie_seeder", about = "Seed genres and popular movies from TMDB into SQLite")]
struct Cli {
    /// SQLite database file
    #[arg(long, env = "MOVIE_DB_PATH", default_value = db::DEFAULT_DB_PATH, global = true)]
    db: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch genres and popular movies, then upsert genres, movies and movie_genres
    Seed {
        /// Number of popular-movie pages to fetch
        #[arg(short = 'n', long, default_value_t = 5, value_parser = clap::value_parser!(u32).range(1..))]
        pages: u32,
        /// TMDB API key
        #[arg(long, env = "TMDB_API_KEY", hide_env_values = true)]
        api_key: String,
        /// TMDB API base URL
        #[arg(long, env = "TMDB_BASE_URL", default_value = tmdb::DEFAULT_BASE_URL)]
        base_url: String,
    },
    /// Show row counts for the seeded tables
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Seed {
            pages,
            api_key,
            base_url,
        } => {
            let client = tmdb::TmdbClient::new(&base_url, &api_key)?;
            let conn = db::connect(&cli.db)?;
            db::init_schema(&conn)?;
            println!("Seeding {:?} from {} ({} pages)...", cli.db, base_url, pages);
            let report = seed::run(&client, &conn, pages).await?;
            report.print();
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect(&cli.db)?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Genres:       {}", s.genres);
            println!("Movies:       {}", s.movies);
            println!("  undated:    {}", s.undated);
            println!("Movie genres: {}", s.movie_genres);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn cli_rejects_zero_pages() {
        let parsed = Cli::try_parse_from(["movie_seeder", "seed", "--api-key", "k", "-n", "0"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn cli_seed_defaults() {
        let cli = Cli::try_parse_from(["movie_seeder", "seed", "--api-key", "k"]).unwrap();
        match cli.command {
            Commands::Seed { pages, api_key, .. } => {
                assert_eq!(pages, 5);
                assert_eq!(api_key, "k");
            }
            Commands::Stats => panic!("expected seed"),
        }
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(Duration::from_millis(2500)), "2.5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 2m 5s");
    }
}
