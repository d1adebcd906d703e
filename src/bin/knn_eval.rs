//! Evaluates batch k-NN on a training and a test CSV file.
//!
//! Both files are shuffled with a seeded RNG, truncated to the requested
//! sizes, and every test sample is classified for each `k`. Misclassification
//! counts are printed per `k`.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use knn_batch::dataset::{load_csv, shuffle_rows, take_rows};
use knn_batch::ml::classic::{evaluate_all, knn, labels, DistanceMetric, KnnConfig, DEFAULT_K_VALUES};
use log::{error, info};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

#[derive(Parser, Debug)]
#[command(name = "knn-eval")]
#[command(about = "Classify test samples by k-nearest-neighbors and report misclassifications")]
#[command(version)]
struct Cli {
    /// Training samples, one CSV row per sample with the label first
    train: PathBuf,

    /// Test samples in the same layout
    test: PathBuf,

    /// Number of training samples used after shuffling
    #[arg(long, default_value_t = 26998)]
    n_train: usize,

    /// Number of test samples classified after shuffling
    #[arg(long, default_value_t = 15001)]
    n_test: usize,

    /// Neighbor counts to evaluate
    #[arg(short = 'k', long = "k-values", num_args = 1.., default_values_t = DEFAULT_K_VALUES.to_vec())]
    k_values: Vec<usize>,

    /// Distance metric: squared-euclidean or manhattan
    #[arg(short, long, default_value_t = DistanceMetric::SquaredEuclidean)]
    metric: DistanceMetric,

    /// Shuffle seed; drawn at random when omitted
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> knn_batch::Result<()> {
    let seed = cli.seed.unwrap_or_else(|| rand::thread_rng().gen());
    info!("shuffle seed {}", seed);
    let mut rng = ChaCha20Rng::seed_from_u64(seed);

    let model = shuffle_rows(load_csv::<f64>(&cli.train)?.view(), &mut rng);
    let test = shuffle_rows(load_csv::<f64>(&cli.test)?.view(), &mut rng);
    let model = take_rows(model.view(), cli.n_train);
    let test = take_rows(test.view(), cli.n_test);
    info!(
        "classifying {} test samples against {} training samples ({})",
        test.nrows(),
        model.nrows(),
        cli.metric
    );

    let config = KnnConfig::new()
        .with_k_values(cli.k_values.iter().copied())
        .with_metric(cli.metric);

    let start = Instant::now();
    let predictions = knn(model, test, &config)?;
    let elapsed = start.elapsed();

    println!(
        "{} training samples, tested {} values, time {}s",
        model.nrows(),
        test.nrows(),
        elapsed.as_secs_f64()
    );

    let truth = labels(test)?;
    for (k, errors) in evaluate_all(&predictions, &truth)? {
        println!("k={}:\tmisclassified {}/{}", k, errors, truth.len());
    }

    Ok(())
}
