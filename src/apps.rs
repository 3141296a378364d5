use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, error::ErrorKind};
use indexmap::IndexMap;

use crate::config::{PartitionConfig, PrepareConfig};
use crate::constants::apps::{DEFAULT_DATA_ROOT, DEFAULT_OUTPUT_ROOT};
use crate::constants::folds::{FOLD_COUNT, NEG_PER_POS_CAP, SHUFFLE_SEED};
use crate::partition::{PrepareSummary, prepare_all};
use crate::source::datasets::{DatasetSpec, benchmark_datasets, find_dataset};

#[derive(Debug, Parser)]
#[command(
    name = "prepare_folds",
    disable_help_subcommand = true,
    about = "Partition entity-matching pair tables into rotating train/dev/test files",
    long_about = "Assign stratified folds to each benchmark pair table, then write train.tsv, dev.tsv, and test.tsv for every negative/positive ratio and rotation.",
    after_help = "Without --dataset, every registered benchmark dataset is prepared in registry order."
)]
struct PrepareCli {
    #[arg(
        long = "data-root",
        value_name = "DIR",
        default_value = DEFAULT_DATA_ROOT,
        help = "Root holding one directory per dataset"
    )]
    data_root: PathBuf,
    #[arg(
        long = "output-root",
        value_name = "DIR",
        default_value = DEFAULT_OUTPUT_ROOT,
        help = "Root receiving {dataset}-{ratio}-{rotation} directories"
    )]
    output_root: PathBuf,
    #[arg(
        long = "dataset",
        value_name = "NAME",
        help = "Dataset key or output key to prepare (repeatable)"
    )]
    datasets: Vec<String>,
    #[arg(
        long = "fold-count",
        default_value_t = FOLD_COUNT,
        value_parser = parse_at_least_two,
        help = "Number of folds per class"
    )]
    fold_count: usize,
    #[arg(
        long = "neg-per-pos-cap",
        default_value_t = NEG_PER_POS_CAP,
        value_parser = parse_positive_usize,
        help = "Upper bound on the negative-per-positive ratio"
    )]
    neg_per_pos_cap: usize,
    #[arg(
        long,
        default_value_t = SHUFFLE_SEED,
        help = "Seed for the per-class shuffles"
    )]
    seed: u64,
    #[arg(
        long = "cache-root",
        value_name = "DIR",
        help = "Cache fold assignments under this directory"
    )]
    cache_root: Option<PathBuf>,
    #[arg(long = "list-datasets", help = "Print registered datasets and exit")]
    list_datasets: bool,
}

/// Run the fold preparation CLI over `args_iter` (program name excluded).
pub fn run_prepare<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let Some(cli) =
        parse_cli::<PrepareCli, _>(std::iter::once("prepare_folds".to_string()).chain(args_iter))?
    else {
        return Ok(());
    };

    if cli.list_datasets {
        print_registry(&benchmark_datasets());
        return Ok(());
    }

    let specs = select_datasets(&cli.datasets)?;
    let partition = PartitionConfig::default()
        .with_fold_count(cli.fold_count)
        .with_neg_per_pos_cap(cli.neg_per_pos_cap)
        .with_seed(cli.seed);
    let mut config = PrepareConfig::new(cli.data_root, cli.output_root).with_partition(partition);
    if let Some(root) = cli.cache_root {
        config = config.with_cache_root(root);
    }

    println!("=== fold preparation ===");
    println!("data root: {}", config.data_root.display());
    println!("output root: {}", config.output_root.display());
    println!(
        "folds: {}, neg/pos cap: {}, seed: {}",
        partition.fold_count, partition.neg_per_pos_cap, partition.seed
    );
    println!();

    let summaries = prepare_all(&specs, &config)?;
    for summary in &summaries {
        print_summary(summary);
    }
    Ok(())
}

/// Resolve requested names against the registry, keeping first-seen order.
fn select_datasets(names: &[String]) -> Result<Vec<DatasetSpec>, Box<dyn Error>> {
    if names.is_empty() {
        return Ok(benchmark_datasets());
    }
    let mut selected: IndexMap<&'static str, DatasetSpec> = IndexMap::new();
    for name in names {
        let spec = find_dataset(name).ok_or_else(|| {
            let known: Vec<&str> = benchmark_datasets().iter().map(|spec| spec.key).collect();
            format!("unknown dataset '{name}' (known: {})", known.join(", "))
        })?;
        selected.entry(spec.key).or_insert(spec);
    }
    Ok(selected.into_values().collect())
}

fn print_registry(specs: &[DatasetSpec]) {
    println!("[DATASETS]");
    for spec in specs {
        let layout = if spec.is_symmetric() {
            "single catalog"
        } else {
            "two catalogs"
        };
        println!("  {} => {} ({layout})", spec.key, spec.output_key);
    }
}

fn print_summary(summary: &PrepareSummary) {
    println!("[{}]", summary.dataset);
    println!(
        "  positives: {}, negatives kept: {}, negatives dropped: {}",
        summary.positives, summary.negatives_retained, summary.negatives_dropped
    );
    println!("  ratio cap: {}", summary.ratio_cap);
    println!(
        "  windows: {} ({} files)",
        summary.emitted.windows.len(),
        summary.emitted.files_written()
    );
    if let Some(last) = summary.emitted.windows.last() {
        println!("  last window: {}", last.dir.display());
    }
    println!();
}

fn parse_positive_usize(raw: &str) -> Result<usize, String> {
    let parsed = raw
        .parse::<usize>()
        .map_err(|_| format!("could not parse '{raw}' as a positive integer"))?;
    if parsed == 0 {
        return Err("value must be greater than zero".to_string());
    }
    Ok(parsed)
}

fn parse_at_least_two(raw: &str) -> Result<usize, String> {
    let parsed = parse_positive_usize(raw)?;
    if parsed < 2 {
        return Err("at least two folds are needed to hold out validation and test".to_string());
    }
    Ok(parsed)
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}
