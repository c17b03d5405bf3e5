use clap::{Parser, Subcommand, ValueEnum};
use jurusan_api::{predict_once, PredictOptions, PredictionFailure, PredictionService, RestApi};
use jurusan_core::evaluate::DEFAULT_K_CANDIDATES;
use jurusan_core::{fit_and_evaluate, select_k, Error, FeatureSchema, PredictorConfig, TrainingReport};
use jurusan_storage::{load_examples, ArtifactMetadata, ModelStore, DEFAULT_LABEL_FIELD};
use serde::Serialize;
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

const DEFAULT_MODEL_PATH: &str = "./data/model.bin";

/// University major recommendation with k-nearest neighbors
#[derive(Parser, Debug)]
#[command(name = "jurusan", version)]
#[command(about = "Recommend a university major from a student profile", long_about = None)]
struct Args {
    /// Log level (logs go to stderr)
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

/// Predictor defaults used when no `--config` file is given
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Preset {
    Survey,
    Academic,
}

impl Preset {
    fn config(self) -> PredictorConfig {
        match self {
            Preset::Survey => PredictorConfig::default(),
            Preset::Academic => PredictorConfig::academic(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fit a model on labeled examples and save it
    Train {
        /// JSON array or JSON Lines file of labeled student records
        #[arg(short, long)]
        data: PathBuf,

        /// Field holding the chosen major
        #[arg(long, default_value = DEFAULT_LABEL_FIELD)]
        label_field: String,

        /// `survey`, `academic` or a path to a schema JSON file
        #[arg(long, default_value = "survey")]
        schema: String,

        /// Predictor configuration JSON file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Defaults when no config file is given; follows `--schema` if omitted
        #[arg(long, value_enum)]
        preset: Option<Preset>,

        /// Number of voting neighbors (overrides the config file)
        #[arg(short, long)]
        k: Option<usize>,

        /// Pick k from 3, 5 and 7 by holdout accuracy
        #[arg(long)]
        select_k: bool,

        /// Where to write the model artifact
        #[arg(short, long, default_value = DEFAULT_MODEL_PATH)]
        model: PathBuf,
    },

    /// Predict a major for one student, given as JSON (or `-` for stdin)
    Predict {
        input: String,

        #[arg(short, long, default_value = DEFAULT_MODEL_PATH)]
        model: PathBuf,

        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = Preset::Survey)]
        preset: Preset,

        /// Length of the ranked alternatives list
        #[arg(long)]
        top_n: Option<usize>,
    },

    /// Describe a saved model
    Info {
        #[arg(short, long, default_value = DEFAULT_MODEL_PATH)]
        model: PathBuf,
    },

    /// Serve predictions over HTTP
    Serve {
        #[arg(short, long, default_value = DEFAULT_MODEL_PATH)]
        model: PathBuf,

        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = Preset::Survey)]
        preset: Preset,

        #[arg(long)]
        top_n: Option<usize>,

        /// HTTP API port
        #[arg(long, default_value_t = 8000)]
        port: u16,
    },
}

#[derive(Serialize)]
struct TrainOutput {
    success: bool,
    model_path: String,
    classes: Vec<String>,
    report: TrainingReport,
    metadata: ArtifactMetadata,
}

#[derive(Serialize)]
struct InfoOutput {
    success: bool,
    #[serde(flatten)]
    info: jurusan_api::ModelInfo,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::from(args.log_level))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Serve {
            model,
            config,
            preset,
            top_n,
            port,
        } => {
            let config = load_config(config.as_deref(), preset, None, top_n)?;
            serve(model, config, port).await
        }
        command => {
            println!("{}", run_once(command, std::io::stdin().lock())?);
            Ok(())
        }
    }
}

/// Run a one-shot command and render its single JSON document.
///
/// Handled failures become a failure document, never an `Err`.
fn run_once(command: Command, stdin: impl Read) -> anyhow::Result<String> {
    match command {
        Command::Train {
            data,
            label_field,
            schema,
            config,
            preset,
            k,
            select_k,
            model,
        } => {
            let preset = preset.unwrap_or(if schema == "academic" {
                Preset::Academic
            } else {
                Preset::Survey
            });
            render(
                load_config(config.as_deref(), preset, k, None)
                    .and_then(|config| train(&data, &label_field, &schema, &config, select_k, &model)),
            )
        }
        Command::Predict {
            input,
            model,
            config,
            preset,
            top_n,
        } => {
            let response = load_config(config.as_deref(), preset, None, top_n).and_then(|config| {
                let body = read_input(&input, stdin)?;
                Ok(predict_once(&ModelStore::new(&model), body, PredictOptions::from(&config)))
            });
            match response {
                Ok(response) => Ok(response.to_json_string()),
                Err(e) => render::<Value>(Err(e)),
            }
        }
        Command::Info { model } => render(info(&model)),
        Command::Serve { .. } => anyhow::bail!("serve does not produce a single document"),
    }
}

fn render<T: Serialize>(result: jurusan_core::Result<T>) -> anyhow::Result<String> {
    Ok(match result {
        Ok(body) => serde_json::to_string(&body)?,
        Err(e) => {
            warn!("{}", e);
            serde_json::to_string(&PredictionFailure::from(&e))?
        }
    })
}

/// The config file (or preset), with command-line flags taking precedence.
fn load_config(
    path: Option<&Path>,
    preset: Preset,
    k: Option<usize>,
    top_n: Option<usize>,
) -> jurusan_core::Result<PredictorConfig> {
    let mut config = match path {
        Some(path) => PredictorConfig::from_json_file(path)?,
        None => preset.config(),
    };
    if let Some(k) = k {
        config = config.with_k(k);
    }
    if let Some(top_n) = top_n {
        config = config.with_top_n(top_n);
    }
    config.validate()?;
    Ok(config)
}

fn load_schema(name: &str) -> jurusan_core::Result<FeatureSchema> {
    match name {
        "survey" => Ok(FeatureSchema::student_survey()),
        "academic" => Ok(FeatureSchema::academic_record()),
        path => FeatureSchema::from_json_file(path),
    }
}

fn read_input(input: &str, mut stdin: impl Read) -> jurusan_core::Result<Value> {
    let text = if input == "-" {
        let mut buf = String::new();
        stdin.read_to_string(&mut buf)?;
        buf
    } else {
        input.to_string()
    };
    serde_json::from_str(&text).map_err(|e| Error::InvalidInput(format!("input is not valid JSON: {}", e)))
}

fn train(
    data: &Path,
    label_field: &str,
    schema: &str,
    config: &PredictorConfig,
    choose_k: bool,
    model_path: &Path,
) -> jurusan_core::Result<TrainOutput> {
    let schema = load_schema(schema)?;
    let examples = load_examples(data, label_field)?;
    info!("Loaded {} examples from {:?}", examples.len(), data);

    let (model, report) = if choose_k {
        select_k(&schema, config, &examples, &DEFAULT_K_CANDIDATES)?
    } else {
        fit_and_evaluate(&schema, config, &examples)?
    };

    let store = ModelStore::new(model_path);
    let metadata = store.save(&model)?;
    info!("Trained with k = {}, accuracy {:?}", report.k, report.accuracy);

    Ok(TrainOutput {
        success: true,
        model_path: model_path.display().to_string(),
        classes: model.labels().classes().to_vec(),
        report,
        metadata,
    })
}

fn info(model_path: &Path) -> jurusan_core::Result<InfoOutput> {
    let store = ModelStore::new(model_path);
    let (model, metadata) = store.load_with_metadata()?;
    Ok(InfoOutput {
        success: true,
        info: jurusan_api::ModelInfo {
            path: model_path.display().to_string(),
            summary: model.summary(),
            metadata: Some(metadata),
        },
    })
}

async fn serve(model: PathBuf, config: PredictorConfig, port: u16) -> anyhow::Result<()> {
    info!("Starting jurusan v{}", env!("CARGO_PKG_VERSION"));
    info!("Model path: {:?}", model);

    let service = Arc::new(PredictionService::open(ModelStore::new(&model), PredictOptions::from(&config)));

    let service_http = service.clone();
    let http_handle = std::thread::spawn(move || {
        info!("Starting HTTP server on port {}", port);
        let sys = actix_web::rt::System::new();
        sys.block_on(async {
            if let Err(e) = RestApi::start(service_http, port).await {
                tracing::error!("HTTP server error: {}", e);
            }
        })
    });

    info!("HTTP API: http://localhost:{}/", port);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        _ = tokio::task::spawn_blocking(move || {
            http_handle.join().ok();
        }) => {
            info!("HTTP server stopped");
        }
    }

    info!("Shutting down...");
    Ok(())
}
