use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use thicket_data::Dataset;
use thicket_io::{DelimitedReader, ExperimentName, ResultWriter};
use thicket_rf::{
    CascadeConfig, CascadedForest, CrossValidation, OobMode, RandomForest, RandomForestConfig,
    RfError, SetPrediction,
};
use thicket_smote::{DistanceMetric, OversampleResult, SmoteConfig};

#[derive(Parser)]
#[command(name = "thicket")]
#[command(about = "Random forests, cascaded forests and SMOTE oversampling for tabular classification")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,

    /// Field delimiter of input files and written records
    #[arg(long, default_value_t = ',', global = true)]
    delimiter: char,
}

/// Input dataset location.
#[derive(Args, Debug, Clone)]
struct InputArgs {
    /// Path to the delimited input file (header row required)
    #[arg(long)]
    data: PathBuf,

    /// Name of the class column (defaults to the last column)
    #[arg(long)]
    class_column: Option<String>,
}

/// Output file naming.
#[derive(Args, Debug, Clone)]
struct OutputArgs {
    /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
    #[arg(long)]
    experiment: String,

    /// Output directory for result files
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

/// Random forest parameters. Invalid values fall back to defaults.
#[derive(Args, Debug, Clone)]
struct ForestArgs {
    /// Number of trees in the forest
    #[arg(long, default_value_t = 100)]
    n_trees: usize,

    /// Bootstrap size as a percentage of the training rows
    #[arg(long, default_value_t = 100.0)]
    percent_boot: f64,

    /// Attributes considered per split (defaults to round(sqrt(features)))
    #[arg(long)]
    n_random_features: Option<usize>,

    /// Regrowth attempts for a tree whose growth fails
    #[arg(long, default_value_t = 10)]
    max_retries: usize,

    /// Class label treated as positive in binary statistics
    #[arg(long, default_value = "1")]
    positive_label: String,
}

/// Oversampling parameters. Invalid values fall back to defaults.
#[derive(Args, Debug, Clone)]
struct SmoteArgs {
    /// Number of nearest neighbours
    #[arg(long, default_value_t = 5)]
    k: usize,

    /// Oversampling amount in percent (whole hundreds)
    #[arg(long, default_value_t = 100)]
    percent_over: usize,

    /// Class to oversample (defaults to the least frequent class)
    #[arg(long)]
    minority_label: Option<String>,

    /// Distance metric: "manhattan" or "euclidean"
    #[arg(long, default_value = "manhattan")]
    metric: String,

    /// Also write the input dataset with the synthetic rows appended
    #[arg(long, default_value_t = false)]
    append: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Train a random forest, save it, and write training and OOB statistics
    Forest {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        output: OutputArgs,

        #[command(flatten)]
        forest: ForestArgs,

        /// Record out-of-bag statistics per tree and for the forest
        #[arg(long, default_value_t = false)]
        oob: bool,
    },

    /// Train a cascaded forest and write per-stage statistics
    Cascade {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        output: OutputArgs,

        #[command(flatten)]
        forest: ForestArgs,

        /// Number of cascade stages
        #[arg(long, default_value_t = 3)]
        n_stages: usize,

        /// TP rate a stage must exceed before it stops growing
        #[arg(long, default_value_t = 0.9)]
        tp_rate: f64,

        /// TN rate a stage must exceed before it stops growing
        #[arg(long, default_value_t = 0.9)]
        tn_rate: f64,
    },

    /// Generate synthetic minority rows with SMOTE
    Smote {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        output: OutputArgs,

        #[command(flatten)]
        smote: SmoteArgs,
    },

    /// Generate synthetic minority rows with LN-SMOTE and report outliers
    Lnsmote {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        output: OutputArgs,

        #[command(flatten)]
        smote: SmoteArgs,
    },

    /// Stratified k-fold cross-validation of a random forest
    Cv {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        output: OutputArgs,

        #[command(flatten)]
        forest: ForestArgs,

        /// Number of cross-validation folds
        #[arg(long, default_value_t = 5)]
        folds: usize,
    },

    /// Classify a labelled dataset with a saved forest or cascade
    Predict {
        /// Path to the saved model file
        #[arg(long)]
        model: PathBuf,

        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        output: OutputArgs,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct ForestOutput {
    experiment: String,
    n_samples: usize,
    n_trees: usize,
    n_classes: usize,
    training_accuracy: f64,
    oob_accuracy: Option<f64>,
    retries: usize,
}

#[derive(Serialize)]
struct CascadeOutput {
    experiment: String,
    n_samples: usize,
    n_stages: usize,
    n_trees: usize,
    stage_weights: Vec<f64>,
    training_accuracy: f64,
}

#[derive(Serialize)]
struct OversampleOutput {
    experiment: String,
    method: &'static str,
    minority_label: String,
    n_minority: usize,
    n_synthetic: usize,
    n_outliers: usize,
    n_skipped: usize,
}

#[derive(Serialize)]
struct CvOutput {
    experiment: String,
    n_samples: usize,
    n_folds: usize,
    mean_accuracy: f64,
    std_accuracy: f64,
}

#[derive(Serialize)]
struct PredictOutput {
    experiment: String,
    model: &'static str,
    n_samples: usize,
    accuracy: f64,
}

fn parse_delimiter(c: char) -> Result<u8> {
    u8::try_from(c)
        .ok()
        .filter(u8::is_ascii)
        .with_context(|| format!("delimiter {c:?} is not a single ASCII character"))
}

fn parse_metric(s: &str) -> Result<DistanceMetric> {
    match s {
        "manhattan" => Ok(DistanceMetric::Manhattan),
        "euclidean" => Ok(DistanceMetric::Euclidean),
        other => anyhow::bail!("unknown distance metric: {other} (expected manhattan or euclidean)"),
    }
}

fn read_dataset(input: &InputArgs, delimiter: u8) -> Result<Dataset> {
    let mut reader = DelimitedReader::new(&input.data).with_delimiter(delimiter);
    if let Some(name) = &input.class_column {
        reader = reader.with_class_column(name.clone());
    }
    reader
        .read()
        .with_context(|| format!("failed to read {}", input.data.display()))
}

fn result_writer(output: &OutputArgs, delimiter: u8) -> Result<ResultWriter> {
    let experiment = ExperimentName::new(output.experiment.clone())?;
    Ok(ResultWriter::new(&output.output_dir, experiment)?.with_delimiter(delimiter))
}

fn forest_config(args: &ForestArgs, seed: u64) -> RandomForestConfig {
    RandomForestConfig::new()
        .with_n_trees(args.n_trees)
        .with_percent_boot(args.percent_boot)
        .with_n_random_features(args.n_random_features)
        .with_max_retries(args.max_retries)
        .with_positive_label(args.positive_label.clone())
        .with_seed(seed)
}

fn smote_config(args: &SmoteArgs, seed: u64) -> Result<SmoteConfig> {
    let mut config = SmoteConfig::new()
        .with_k(args.k)
        .with_percent_over(args.percent_over)
        .with_metric(parse_metric(&args.metric)?)
        .with_seed(seed);
    if let Some(label) = &args.minority_label {
        config = config.with_minority_label(label.clone());
    }
    Ok(config)
}

fn write_prediction(writer: &ResultWriter, label: &str, prediction: &SetPrediction) -> Result<()> {
    writer.write_records("stats.txt", |w| {
        w.write_stats([(label, prediction.stat.as_ref())])
    })?;
    writer.write_records("predictions.txt", |w| w.write_predictions(prediction))?;
    Ok(())
}

fn write_oversampled(
    writer: &ResultWriter,
    dataset: Dataset,
    result: &OversampleResult,
    append: bool,
) -> Result<()> {
    writer.write_records("synthetic.txt", |w| {
        w.write_samples(dataset.schema(), result.synthetic())
    })?;
    if !result.outliers().is_empty() {
        writer.write_records("outliers.txt", |w| {
            w.write_samples(dataset.schema(), result.outliers())
        })?;
    }
    if append {
        let mut dataset = dataset;
        result
            .append_to(&mut dataset)
            .context("failed to append synthetic rows")?;
        writer.write_records("oversampled.txt", |w| {
            w.write_samples(dataset.schema(), dataset.rows())
        })?;
    }
    Ok(())
}

#[derive(Clone, Copy)]
enum Method {
    Smote,
    LnSmote,
}

fn oversample(
    method: Method,
    input: &InputArgs,
    output: OutputArgs,
    args: &SmoteArgs,
    seed: u64,
    delimiter: u8,
) -> Result<()> {
    let dataset = read_dataset(input, delimiter)?;
    let writer = result_writer(&output, delimiter)?;

    let config = smote_config(args, seed)?;
    let (name, result) = match method {
        Method::Smote => ("smote", config.smote(&dataset).context("SMOTE failed")?),
        Method::LnSmote => ("lnsmote", config.lnsmote(&dataset).context("LN-SMOTE failed")?),
    };
    write_oversampled(&writer, dataset, &result, args.append)?;

    let output = OversampleOutput {
        experiment: output.experiment,
        method: name,
        minority_label: result.minority_label().to_string(),
        n_minority: result.n_minority(),
        n_synthetic: result.synthetic().len(),
        n_outliers: result.outliers().len(),
        n_skipped: result.skipped(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    let delimiter = parse_delimiter(cli.delimiter)?;

    match cli.command {
        Command::Forest {
            input,
            output,
            forest,
            oob,
        } => {
            let dataset = read_dataset(&input, delimiter)?;
            let writer = result_writer(&output, delimiter)?;

            let oob_mode = if oob { OobMode::Enabled } else { OobMode::Disabled };
            let result = forest_config(&forest, cli.seed)
                .with_oob_mode(oob_mode)
                .fit(&dataset)
                .context("forest training failed")?;
            let model = result.forest();

            model
                .save(writer.model_path())
                .context("failed to save model")?;
            info!(path = %writer.model_path().display(), "model saved");

            let training = model
                .classify_set(&dataset, None)
                .context("classification failed")?;
            let oob_summary = result.oob();
            writer.write_records("stats.txt", |w| {
                w.write_stats([
                    ("train", training.stat.as_ref()),
                    ("oob", oob_summary.and_then(|s| s.forest.stat.as_ref())),
                ])
            })?;
            if let Some(summary) = oob_summary {
                writer.write_records("oob.txt", |w| w.write_oob(summary))?;
            }
            writer.write_training_summary(
                "random-forest",
                result.metadata(),
                &training,
                oob_summary.map(|s| s.accuracy()),
            )?;

            let output = ForestOutput {
                experiment: output.experiment,
                n_samples: dataset.row_count(),
                n_trees: model.n_trees(),
                n_classes: model.classes().len(),
                training_accuracy: training.accuracy(),
                oob_accuracy: oob_summary.map(|s| s.accuracy()),
                retries: result.metadata().retries,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Cascade {
            input,
            output,
            forest,
            n_stages,
            tp_rate,
            tn_rate,
        } => {
            let dataset = read_dataset(&input, delimiter)?;
            let writer = result_writer(&output, delimiter)?;

            let result = CascadeConfig::new()
                .with_forest(forest_config(&forest, cli.seed))
                .with_n_stages(n_stages)
                .with_tp_rate(tp_rate)
                .with_tn_rate(tn_rate)
                .fit(&dataset)
                .context("cascade training failed")?;
            let model = result.forest();

            model
                .save(writer.model_path())
                .context("failed to save model")?;
            info!(path = %writer.model_path().display(), "model saved");

            writer.write_records("stages.txt", |w| w.write_stages(result.reports()))?;
            let training = model
                .classify_set(&dataset)
                .context("classification failed")?;
            write_prediction(&writer, "train", &training)?;

            let output = CascadeOutput {
                experiment: output.experiment,
                n_samples: dataset.row_count(),
                n_stages: model.stages().len(),
                n_trees: model.n_trees(),
                stage_weights: model.stages().iter().map(|s| s.weight()).collect(),
                training_accuracy: training.accuracy(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Smote {
            input,
            output,
            smote,
        } => oversample(Method::Smote, &input, output, &smote, cli.seed, delimiter)?,

        Command::Lnsmote {
            input,
            output,
            smote,
        } => oversample(Method::LnSmote, &input, output, &smote, cli.seed, delimiter)?,

        Command::Cv {
            input,
            output,
            forest,
            folds,
        } => {
            let dataset = read_dataset(&input, delimiter)?;
            let writer = result_writer(&output, delimiter)?;

            let cv = CrossValidation::new(folds)?.with_seed(cli.seed);
            let cv_result = cv
                .evaluate(&forest_config(&forest, cli.seed), &dataset)
                .context("cross-validation failed")?;
            info!(
                mean_accuracy = cv_result.mean_accuracy,
                std_accuracy = cv_result.std_accuracy,
                "cross-validation complete"
            );

            let labels: Vec<String> = (0..cv_result.n_folds).map(|f| format!("fold-{f}")).collect();
            writer.write_records("stats.txt", |w| {
                w.write_stats(
                    labels
                        .iter()
                        .map(String::as_str)
                        .zip(cv_result.fold_stats.iter().map(Option::as_ref)),
                )
            })?;
            writer.write_cross_validation(&cv_result)?;

            let output = CvOutput {
                experiment: output.experiment,
                n_samples: cv_result.n_samples,
                n_folds: cv_result.n_folds,
                mean_accuracy: cv_result.mean_accuracy,
                std_accuracy: cv_result.std_accuracy,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Predict {
            model,
            input,
            output,
        } => {
            let dataset = read_dataset(&input, delimiter)?;
            let writer = result_writer(&output, delimiter)?;

            // Forest files are tried first; a kind mismatch falls through to cascades.
            let (kind, prediction) = match RandomForest::load(&model) {
                Ok(forest) => {
                    info!(n_trees = forest.n_trees(), "forest loaded");
                    ("random-forest", forest.classify_set(&dataset, None))
                }
                Err(RfError::IncompatibleModel { .. }) => {
                    let cascade = CascadedForest::load(&model).context("failed to load model")?;
                    info!(n_stages = cascade.stages().len(), "cascade loaded");
                    ("cascaded-forest", cascade.classify_set(&dataset))
                }
                Err(e) => return Err(e).context("failed to load model"),
            };
            let prediction = prediction.context("classification failed")?;
            write_prediction(&writer, "predict", &prediction)?;

            let output = PredictOutput {
                experiment: output.experiment,
                model: kind,
                n_samples: dataset.row_count(),
                accuracy: prediction.accuracy(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
