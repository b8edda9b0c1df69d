use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use newsgroup_topics::config::PipelineConfig;
use newsgroup_topics::corpus::{Corpus, CorpusFilter};
use newsgroup_topics::models::DisplayNameTable;
use newsgroup_topics::pipeline::{label_prepared, LabelPolicy, PreparedCorpus};
use newsgroup_topics::provider::{ExportProvider, ExportedModel, FitParams, TopicModelProvider};
use newsgroup_topics::reconcile::reconcile_against;
use newsgroup_topics::report::{print_topic_summaries, topic_summaries, CategoryCrosstab};
use newsgroup_topics::visualization::TopicOrdering;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[clap(short, long, help = "JSON pipeline config; CLI flags override it")]
    config: Option<PathBuf>,
    #[clap(short, long, help = "Worker threads for preprocessing and labeling")]
    workers: Option<usize>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clean and vectorize the corpus and write it for the external trainer.
    Prepare {
        #[command(flatten)]
        corpus: CorpusArgs,
        #[clap(short, long)]
        output: PathBuf,
    },
    /// Show each topic's top terms in display order, for naming.
    Topics {
        #[command(flatten)]
        corpus: CorpusArgs,
        #[command(flatten)]
        model: ModelArgs,
        #[clap(long, help = "Display-space name table to show next to each topic")]
        names: Option<PathBuf>,
        #[clap(long, help = "Write the derived topic ordering as coordinate rows")]
        write_ordering: Option<PathBuf>,
    },
    /// Reconcile topic names and label every document.
    Label {
        #[command(flatten)]
        corpus: CorpusArgs,
        #[command(flatten)]
        model: ModelArgs,
        #[clap(long, help = "Display-space name table (JSON object, position -> name)")]
        names: PathBuf,
        #[clap(short, long, help = "JSON lines output; stdout summary only when omitted")]
        output: Option<PathBuf>,
        #[clap(long, help = "Skip documents that cannot be labeled instead of aborting")]
        skip_failed: bool,
    },
}

#[derive(Args, Debug)]
struct CorpusArgs {
    #[clap(long)]
    corpus: PathBuf,
    #[clap(long, help = "Read the corpus as an mbox file instead of a <category>/<file> tree")]
    mbox: bool,
    #[clap(long = "category", help = "Only keep these categories (repeatable)")]
    categories: Vec<String>,
    #[clap(long, default_value_t = 1, help = "Keep every n-th message")]
    sample_every: usize,
    #[clap(long)]
    limit: Option<usize>,
}

#[derive(Args, Debug)]
struct ModelArgs {
    #[clap(long, help = "Fitted model exported by the trainer")]
    model: PathBuf,
    #[clap(long, help = "Visualization topic ordering; derived from prevalence when omitted")]
    ordering: Option<PathBuf>,
    #[clap(long)]
    num_topics: Option<usize>,
    #[clap(long)]
    minimum_probability: Option<f64>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }

    match cli.command {
        Command::Prepare { corpus, output } => {
            config.validate()?;
            let prepared = PreparedCorpus::prepare(load_corpus(&corpus)?, &config);
            prepared.write_export(&output)?;
            println!(
                "Prepared {} documents over {} terms -> {}",
                prepared.bows.len(),
                prepared.vocabulary.len(),
                output.display()
            );
        }
        Command::Topics {
            corpus,
            model,
            names,
            write_ordering,
        } => {
            apply_model_overrides(&mut config, &model);
            config.validate()?;
            let (prepared, fitted) = load_fitted(&corpus, &model, &config)?;
            let ordering = load_ordering(&model, &fitted, &prepared)?;
            let display_names = names.as_deref().map(read_names).transpose()?;

            let summaries = topic_summaries(&fitted, &ordering, display_names.as_ref(), config.top_terms);
            print_topic_summaries(&summaries);

            if let Some(path) = write_ordering {
                ordering.write_export(&path, &fitted, &prepared.bows)?;
                println!("Topic ordering written to {}", path.display());
            }
        }
        Command::Label {
            corpus,
            model,
            names,
            output,
            skip_failed,
        } => {
            apply_model_overrides(&mut config, &model);
            config.validate()?;
            let (prepared, fitted) = load_fitted(&corpus, &model, &config)?;
            let ordering = load_ordering(&model, &fitted, &prepared)?;
            let display_names = read_names(&names)?;
            let model_names = reconcile_against(&fitted, &ordering, &display_names)
                .with_context(|| format!("reconciling names from {}", names.display()))?;

            let policy = if skip_failed { LabelPolicy::Skip } else { LabelPolicy::Abort };
            let outcome = label_prepared(&fitted, &prepared, &model_names, config.workers, policy)?;

            if let Some(path) = output {
                write_labels(&path, &outcome.labels)?;
                println!("Labels written to {}", path.display());
            }
            CategoryCrosstab::build(&outcome.labels, outcome.skipped).print();
        }
    }

    Ok(())
}

fn apply_model_overrides(config: &mut PipelineConfig, model: &ModelArgs) {
    if let Some(num_topics) = model.num_topics {
        config.num_topics = num_topics;
    }
    if let Some(minimum_probability) = model.minimum_probability {
        config.minimum_probability = minimum_probability;
    }
}

fn load_corpus(args: &CorpusArgs) -> anyhow::Result<Corpus> {
    let filter = CorpusFilter {
        categories: (!args.categories.is_empty()).then(|| args.categories.clone()),
        sample_every: args.sample_every,
        limit: args.limit,
    };
    let corpus = if args.mbox {
        Corpus::from_mbox(&args.corpus, &filter)?
    } else {
        Corpus::from_newsgroup_dir(&args.corpus, &filter)?
    };
    if corpus.is_empty() {
        bail!("no documents loaded from {}", args.corpus.display());
    }
    Ok(corpus)
}

fn load_fitted(
    corpus: &CorpusArgs,
    model: &ModelArgs,
    config: &PipelineConfig,
) -> anyhow::Result<(PreparedCorpus, ExportedModel)> {
    let provider = ExportProvider::new(&model.model);
    let vocabulary = provider
        .trained_vocabulary()
        .with_context(|| format!("reading vocabulary of {}", model.model.display()))?;
    // Vectorize against the trained vocabulary so a differently sampled corpus still fits.
    let prepared = PreparedCorpus::with_vocabulary(load_corpus(corpus)?, vocabulary, config);
    let params = FitParams {
        minimum_probability: config.minimum_probability,
        ..FitParams::default()
    };
    let fitted = provider
        .fit(&prepared.bows, &prepared.vocabulary, config.num_topics, &params)
        .with_context(|| format!("loading fitted model {}", model.model.display()))?;
    Ok((prepared, fitted))
}

fn load_ordering(model: &ModelArgs, fitted: &ExportedModel, prepared: &PreparedCorpus) -> anyhow::Result<TopicOrdering> {
    match &model.ordering {
        Some(path) => TopicOrdering::from_export(path)
            .with_context(|| format!("loading topic ordering {}", path.display())),
        None => {
            info!("No ordering export given, ordering topics by prevalence");
            Ok(TopicOrdering::by_prevalence(fitted, &prepared.bows))
        }
    }
}

fn read_names(path: &Path) -> anyhow::Result<DisplayNameTable> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let names: DisplayNameTable = serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    Ok(names)
}

fn write_labels(path: &Path, labels: &[newsgroup_topics::models::DocumentLabel]) -> anyhow::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for label in labels {
        serde_json::to_writer(&mut writer, label)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}
