use std::path::PathBuf;

use burn::backend::{ndarray::NdArrayDevice, NdArray};
use clap::{ArgAction, Parser};
use crop_yield::{error::PredictError, output::Envelope, run_prediction};
use tracing::{debug, error};
use tracing_subscriber::{fmt, EnvFilter};

type MyBackend = NdArray<f32>;

/// Predict per-crop yields for one farm record.
///
/// Prints exactly one JSON object on stdout; logs go to stderr. Help and
/// version requests are answered with the usage failure like any other bad
/// command line.
#[derive(Parser, Debug)]
#[command(name = "crop_yield", version)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Farm record as a JSON object
    #[arg(allow_hyphen_values = true)]
    input_json: String,

    /// Directory holding the model artifacts
    #[arg(allow_hyphen_values = true)]
    model_path: PathBuf,
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();
}

fn finish(envelope: Envelope) -> ! {
    println!("{}", envelope.to_json());
    std::process::exit(envelope.exit_code());
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // help and version included: stdout only ever carries the envelope
        Err(err) => {
            init_logging(0);
            debug!(kind = ?err.kind(), %err, "rejected command line");
            finish(Envelope::failure(PredictError::Usage));
        }
    };
    init_logging(cli.verbose);

    let device = NdArrayDevice::Cpu;
    let mut rng = rand::thread_rng();
    let envelope =
        match run_prediction::<MyBackend, _>(&cli.input_json, &cli.model_path, device, &mut rng) {
            Ok(envelope) => envelope,
            Err(err) => {
                error!(error = %err, "prediction failed");
                Envelope::failure(err)
            }
        };

    finish(envelope)
}
