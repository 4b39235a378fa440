//! The `captool embed` command for building embedding tables.

use std::path::{Path, PathBuf};

use captool_core::embedding::ProgressSink;
use captool_core::{Config, EmbeddingLoader, LoadedEmbeddings, TableSource, WordMap};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};

/// Arguments for the `embed` command.
#[derive(Args, Debug)]
pub struct EmbedArgs {
    /// Pretrained word vectors in GloVe text format
    #[arg(required = true)]
    pub emb_file: PathBuf,

    /// Word map JSON file ({"word": index, ...})
    #[arg(short, long)]
    pub word_map: PathBuf,

    /// Name fragment for the cache file (e.g. the dataset name)
    #[arg(short, long)]
    pub name: String,

    /// Directory for the cache file (overrides config)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Seed for the random initialization of unmatched words
    #[arg(long)]
    pub seed: Option<u64>,

    /// Reuse an existing cache even if it was built for another word map
    #[arg(long)]
    pub no_validate: bool,
}

/// Renders parse progress as a terminal progress bar.
struct BarProgress(ProgressBar);

impl ProgressSink for BarProgress {
    fn start(&self, total: u64) {
        self.0.set_length(total);
        self.0.set_message("loading embeddings");
    }

    fn advance(&self, lines: u64) {
        self.0.inc(lines);
    }

    fn finish(&self) {
        self.0.finish_and_clear();
    }
}

/// Execute the embed command.
pub fn execute(args: EmbedArgs, config: Config) -> anyhow::Result<()> {
    let mut embedding_config = config.embedding.clone();
    if args.seed.is_some() {
        embedding_config.seed = args.seed;
    }
    if args.no_validate {
        embedding_config.validate_cache = false;
    }

    let output_dir = match &args.output_dir {
        Some(dir) => super::expand(dir),
        None => config.embedding_output_dir(),
    };
    let emb_file = super::expand(&args.emb_file);
    let word_map = WordMap::from_json_file(&super::expand(&args.word_map))?;

    let loader = EmbeddingLoader::new(&embedding_config);
    let loaded = load_with_bar(
        loader,
        create_progress_bar()?,
        &emb_file,
        &word_map,
        &output_dir,
        &args.name,
    )?;

    let origin = match loaded.source {
        TableSource::Cache => "cache",
        TableSource::Text => "text file",
    };
    println!(
        "{} ({} x {}, from {})",
        loaded.cache_path.display(),
        loaded.table.nrows(),
        loaded.dim,
        origin
    );
    Ok(())
}

/// Run `loader` with `bar` attached, clearing the bar on every outcome.
fn load_with_bar(
    loader: EmbeddingLoader,
    bar: ProgressBar,
    emb_file: &Path,
    word_map: &WordMap,
    output_dir: &Path,
    name: &str,
) -> anyhow::Result<LoadedEmbeddings> {
    let loader = loader.with_progress(Box::new(BarProgress(bar.clone())));
    let result = loader.load(emb_file, word_map, output_dir, name);
    bar.finish_and_clear();
    Ok(result?)
}

fn create_progress_bar() -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} lines ({percent}%) {msg}",
            )?
            .progress_chars("##-"),
    );
    Ok(pb)
}
