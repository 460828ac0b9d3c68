use crate::analysis::classify::Composition;
use crate::analysis::{analyze_image, AnalysisResult};
use crate::app::store::{AnalysisStore, BatchReport, Outcome};
use crate::data::cache::{CacheStore, JsonFileStore, MemoryStore};
use crate::data::catalog::{Catalog, Creator};
use crate::data::config::Config;
use crate::worker::source::{AssetSource, ImageSource};
use crate::worker::ThreadWorkerFactory;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "palette-tagger", version, about = "Derive palettes and style tags from portfolio images")]
pub struct Cli {
    /// Config file to use instead of the one in the OS config directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Overrides `asset_root` from the config.
    #[arg(long, global = true)]
    pub assets: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Analyse every still image of a catalog, skipping cached ones.
    Analyze {
        catalog: PathBuf,
        #[arg(long)]
        json: bool,
        /// Keep results in memory only; the cache file is neither read nor written.
        #[arg(long)]
        no_cache: bool,
        /// Print each item as soon as it settles.
        #[arg(long)]
        progress: bool,
    },
    /// Print cached results.
    Show {
        id: Option<u64>,
        #[arg(long)]
        json: bool,
    },
    /// Delete the analysis cache.
    ClearCache,
    /// Analyse a single file, URL or data URL without touching the cache.
    Image {
        src: String,
        #[arg(long)]
        composition: Option<Composition>,
        #[arg(long)]
        json: bool,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match cli.config.as_deref() {
        Some(path) => Config::load_from(path)?,
        None => Config::load_or_default()?,
    };
    if let Some(root) = cli.assets {
        config.asset_root = root;
    }

    match cli.command {
        Command::Analyze {
            catalog,
            json,
            no_cache,
            progress,
        } => analyze(&config, catalog, json, no_cache, progress),
        Command::Show { id, json } => show(&config, id, json),
        Command::ClearCache => {
            let mut store = open_store(&config, Vec::new(), false);
            store.clear_cache();
            println!("cleared {}", config.cache_path().display());
            Ok(())
        }
        Command::Image { src, composition, json } => {
            let source = AssetSource::new(&config.asset_root, config.http_timeout());
            let bytes = source.fetch(&src)?;
            let result = analyze_image(&bytes, &src, composition, &config.analysis())
                .with_context(|| format!("analyse {src}"))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_result(None, &result);
            }
            Ok(())
        }
    }
}

fn open_store(config: &Config, creators: Vec<Creator>, in_memory: bool) -> AnalysisStore {
    let source = Arc::new(AssetSource::new(&config.asset_root, config.http_timeout()));
    let factory = ThreadWorkerFactory {
        source,
        settings: config.analysis(),
    };
    let storage: Box<dyn CacheStore> = if in_memory {
        Box::new(MemoryStore::default())
    } else {
        let file = JsonFileStore::new(config.cache_path());
        log::debug!("analysis cache at {}", file.path().display());
        Box::new(file)
    };
    AnalysisStore::new(
        storage,
        Box::new(factory),
        creators,
        config.job_timeout(),
    )
}

fn analyze(config: &Config, catalog_path: PathBuf, json: bool, no_cache: bool, progress: bool) -> Result<()> {
    let catalog = Catalog::load(&catalog_path)?;
    log::info!(
        "catalog {}: {} creators, {} projects",
        catalog_path.display(),
        catalog.creators.len(),
        catalog.projects.len()
    );

    let mut store = open_store(config, catalog.creators.clone(), no_cache);
    let report = if progress {
        analyze_with_progress(&mut store, &catalog)
    } else {
        store.analyze_all(&catalog.projects)
    };
    store.shutdown();

    if let Some(err) = store.error() {
        anyhow::bail!("analysis unavailable: {err}");
    }

    if json {
        let ids: Vec<u64> = catalog.projects.iter().map(|p| p.id).collect();
        let subset: std::collections::BTreeMap<u64, &AnalysisResult> = ids
            .iter()
            .filter_map(|id| store.get(*id).map(|r| (*id, r)))
            .collect();
        println!("{}", serde_json::to_string_pretty(&subset)?);
        return Ok(());
    }

    for item in &catalog.projects {
        if let Some(res) = store.get(item.id) {
            print_result(Some(item.id), res);
        }
    }
    println!(
        "{} eligible, {} cached, {} analysed, {} failed, {} timed out",
        report.eligible, report.skipped, report.succeeded, report.failed, report.timed_out
    );
    Ok(())
}

/// Dispatches the whole catalog, then pumps until nothing is in flight,
/// reporting each settlement on stderr.
fn analyze_with_progress(store: &mut AnalysisStore, catalog: &Catalog) -> BatchReport {
    let dispatched = store.dispatch(&catalog.projects);
    let mut report = BatchReport {
        eligible: catalog.projects.iter().filter(|p| p.is_analyzable()).count(),
        dispatched,
        ..BatchReport::default()
    };
    report.skipped = report.eligible - dispatched;

    while store.is_loading() {
        for s in store.pump(Some(Duration::from_millis(100))) {
            let what = match &s.outcome {
                Outcome::Succeeded => {
                    report.succeeded += 1;
                    "ok".to_string()
                }
                Outcome::Failed(e) => {
                    report.failed += 1;
                    format!("failed: {e}")
                }
                Outcome::TimedOut => {
                    report.timed_out += 1;
                    "timed out".to_string()
                }
            };
            eprintln!("[{} left] #{} {what}", store.in_flight().len(), s.id);
        }
    }
    report
}

fn show(config: &Config, id: Option<u64>, json: bool) -> Result<()> {
    let store = open_store(config, Vec::new(), false);
    let entries: Vec<(u64, &AnalysisResult)> = match id {
        Some(id) => {
            let res = store
                .get(id)
                .with_context(|| format!("no cached analysis for {id}"))?;
            vec![(id, res)]
        }
        None => store.data().iter().map(|(k, v)| (*k, v)).collect(),
    };

    if json {
        let map: std::collections::BTreeMap<u64, &AnalysisResult> = entries.into_iter().collect();
        println!("{}", serde_json::to_string_pretty(&map)?);
    } else {
        for (id, res) in entries {
            print_result(Some(id), res);
        }
    }
    Ok(())
}

fn print_result(id: Option<u64>, res: &AnalysisResult) {
    let palette: Vec<String> = res.palette.iter().map(|c| c.hex()).collect();
    let style: Vec<&str> = res.style.iter().map(|s| s.as_str()).collect();
    match id {
        Some(id) => println!("#{id}"),
        None => println!("image"),
    }
    println!("  palette     {}", palette.join(" "));
    println!("  brightness  {}  vibrance {}", res.brightness, res.vibrance);
    println!("  style       {}", style.join(", "));
    println!("  composition {}  focus {:?}", res.composition, res.focus);
    println!("  tags        {}", res.tags.join(" | "));
}
