use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use specdex_core::extract::extract_service;
use specdex_core::search::{DEFAULT_LIMIT, DEFAULT_THRESHOLD};
use specdex_core::{Engine, ScoredDocument};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "specdex")]
#[command(about = "Index local OpenAPI/Swagger documents and query them", long_about = None)]
struct Cli {
    /// Directory of specification files (*.json, one service per file)
    #[arg(long, global = true, default_value = "./specs")]
    dir: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank documents against a natural-language query
    Search {
        #[arg(long)]
        query: String,
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,
        #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
        threshold: f64,
    },
    /// Rank documents against an indexed document
    Similar {
        #[arg(long)]
        id: String,
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// Complete the tokens of a partial query
    Suggest {
        #[arg(long)]
        query: String,
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,
    },
    /// Print index statistics
    Stats,
}

#[derive(Serialize)]
struct Hit<'a> {
    id: &'a str,
    score: f64,
    #[serde(flatten)]
    metadata: &'a specdex_core::DocMeta,
    content: &'a str,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(std::io::stderr).init();
    let cli = Cli::parse();
    let engine = build_engine(Path::new(&cli.dir))?;

    let out = match cli.command {
        Commands::Search { query, limit, threshold } => hits_json(&engine.search(&query, limit, threshold))?,
        Commands::Similar { id, limit } => hits_json(&engine.find_similar(&id, limit))?,
        Commands::Suggest { query, limit } => serde_json::to_string_pretty(&engine.suggest(&query, limit))?,
        Commands::Stats => serde_json::to_string_pretty(&engine.stats())?,
    };
    println!("{out}");
    Ok(())
}

fn hits_json(hits: &[ScoredDocument]) -> Result<String> {
    let view: Vec<Hit> = hits
        .iter()
        .map(|h| Hit { id: &h.document.id, score: h.score, metadata: &h.document.metadata, content: &h.document.content })
        .collect();
    Ok(serde_json::to_string_pretty(&view)?)
}

/// Index every `.json` file under `dir`, one batch per file (including its
/// description document), service id = file stem.
fn build_engine(dir: &Path) -> Result<Engine> {
    let mut engine = Engine::new();
    for file in spec_files(dir) {
        let Some(service) = file.file_stem().and_then(|s| s.to_str()).map(str::to_string) else { continue };
        match load_spec(&file) {
            Ok(spec) => {
                engine.index_documents(&service, extract_service(&spec, &service));
            }
            Err(err) => tracing::warn!(file = %file.display(), error = %format!("{err:#}"), "skipping file"),
        }
    }
    tracing::info!(documents = engine.len(), dir = %dir.display(), "index ready");
    Ok(engine)
}

fn spec_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && p.extension().and_then(|s| s.to_str()) == Some("json"))
        .collect();
    files.sort();
    files
}

fn load_spec(file: &Path) -> Result<serde_json::Value> {
    let f = File::open(file).with_context(|| format!("opening {}", file.display()))?;
    let spec = serde_json::from_reader(BufReader::new(f)).with_context(|| format!("parsing {}", file.display()))?;
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn indexes_each_file_as_a_service() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("pets.json"),
            r#"{"info": {"title": "Pets"}, "paths": {"/pets": {"get": {"summary": "List pets"}}}}"#,
        )
        .unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/orders.json"), r#"{"definitions": {"Order": {}}}"#).unwrap();
        fs::write(dir.path().join("broken.json"), "{").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let engine = build_engine(dir.path()).unwrap();
        let stats = engine.stats();
        assert_eq!(stats.total_documents, 3);
        assert_eq!(stats.description_count, 1);
        assert_eq!(stats.services.into_iter().collect::<Vec<_>>(), vec!["orders", "pets"]);
        assert!(engine.get("pets-get-/pets").is_some());
    }

    #[test]
    fn hits_render_metadata_inline() {
        let mut engine = Engine::new();
        engine.index_batch(&serde_json::json!({"paths": {"/pets": {"get": {"summary": "List pets"}}}}), "pets");
        let json: serde_json::Value = serde_json::from_str(&hits_json(&engine.search("pets", 5, 0.0)).unwrap()).unwrap();
        assert_eq!(json[0]["id"], "pets-get-/pets");
        assert_eq!(json[0]["type"], "endpoint");
        assert_eq!(json[0]["service"], "pets");
    }
}
