use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use lyricmood::corpus::{self, SongEmbedding};
use lyricmood::{
    DeviceChoice, EncoderRegistry, Error, LabelSet, LyricsConfig, LyricsModel, MoodPredictor,
    Result,
};

#[derive(Parser)]
#[command(name = "lyricmood", version, about = "Classify the mood of song lyrics")]
struct Cli {
    /// Model configuration (TOML). Defaults apply when omitted.
    #[arg(long, env = "LYRICMOOD_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Compute device
    #[arg(long, value_enum, default_value_t = DeviceChoice::Auto, global = true)]
    device: DeviceChoice,

    /// Class names in index order, comma-separated (default: the seven moods)
    #[arg(long, value_delimiter = ',', global = true)]
    labels: Option<Vec<String>>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build a model from pretrained encoder weights and save it
    Init {
        /// Output model directory
        #[arg(long)]
        out: PathBuf,
    },
    /// Predict the mood of one text
    Predict(PredictArgs),
    /// Embed every song in a CSV corpus as JSON lines
    Embed {
        /// Saved model directory
        #[arg(long)]
        model_dir: PathBuf,
        /// Directory of CSV song tables
        #[arg(long)]
        csv_dir: PathBuf,
        /// Output file (default: stdout)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Score a model against a labelled CSV corpus
    Evaluate {
        /// Saved model directory
        #[arg(long)]
        model_dir: PathBuf,
        /// Directory of CSV song tables with a Classname column
        #[arg(long)]
        csv_dir: PathBuf,
    },
}

#[derive(Args)]
struct PredictArgs {
    /// Saved model directory
    #[arg(long)]
    model_dir: PathBuf,
    /// Lyrics text
    #[arg(long, required_unless_present = "file", conflicts_with = "file")]
    text: Option<String>,
    /// File holding the lyrics
    #[arg(long)]
    file: Option<PathBuf>,
}

struct Context {
    config: LyricsConfig,
    registry: EncoderRegistry,
    device: candle_core::Device,
    labels: LabelSet,
}

impl Context {
    fn new(cli: &Cli) -> Result<Self> {
        let config = match &cli.config {
            Some(path) => LyricsConfig::load(path)?,
            None => LyricsConfig::default(),
        };
        let labels = match &cli.labels {
            Some(names) => LabelSet::new(names.iter().map(|n| n.trim().to_string()))?,
            None => LabelSet::moods(),
        };
        Ok(Self {
            config,
            registry: EncoderRegistry::builtin(),
            device: cli.device.open()?,
            labels,
        })
    }

    fn predictor(&self, model_dir: &Path) -> Result<MoodPredictor> {
        let model =
            LyricsModel::restore(model_dir, self.config.clone(), &self.registry, &self.device)?;
        MoodPredictor::new(model, self.labels.clone())
    }
}

fn stdout_error(source: std::io::Error) -> Error {
    Error::Io {
        path: PathBuf::from("<stdout>"),
        source,
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    let mut out = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out).map_err(stdout_error)
}

fn write_jsonl(songs: &[SongEmbedding], out: Option<&Path>) -> Result<()> {
    let (sink, path): (Box<dyn Write>, PathBuf) = match out {
        Some(path) => {
            let file = std::fs::File::create(path).map_err(|source| Error::Io {
                path: path.to_path_buf(),
                source,
            })?;
            (Box::new(file), path.to_path_buf())
        }
        None => (Box::new(std::io::stdout().lock()), PathBuf::from("<stdout>")),
    };
    let mut sink = BufWriter::new(sink);
    for song in songs {
        serde_json::to_writer(&mut sink, song)?;
        writeln!(sink).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?;
    }
    sink.flush().map_err(|source| Error::Io { path, source })
}

fn run(cli: Cli) -> Result<()> {
    let ctx = Context::new(&cli)?;

    match cli.command {
        Command::Init { out } => {
            let model = LyricsModel::pretrained(ctx.config.clone(), &ctx.registry, &ctx.device)?;
            model.save(&out)
        }
        Command::Predict(args) => {
            let text = match (args.text, args.file) {
                (Some(text), _) => text,
                (None, Some(file)) => std::fs::read_to_string(&file)
                    .map_err(|source| Error::Io { path: file, source })?,
                (None, None) => return Err(Error::EmptyInput),
            };
            let prediction = ctx.predictor(&args.model_dir)?.predict(&text)?;
            print_json(&prediction)
        }
        Command::Embed {
            model_dir,
            csv_dir,
            out,
        } => {
            let records = corpus::load_csv_dir(&csv_dir)?;
            let predictor = ctx.predictor(&model_dir)?;
            let report = corpus::embed_corpus(&predictor, &records)?;
            write_jsonl(&report.songs, out.as_deref())
        }
        Command::Evaluate { model_dir, csv_dir } => {
            let records = corpus::load_csv_dir(&csv_dir)?;
            let predictor = ctx.predictor(&model_dir)?;
            let evaluation = corpus::evaluate(&predictor, &records)?;
            print_json(&serde_json::json!({
                "accuracy": evaluation.accuracy(),
                "evaluated": evaluation.evaluated,
                "skipped": evaluation.skipped,
                "labels": evaluation.labels,
                "confusion": evaluation.confusion,
            }))
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("lyricmood: {e}");
            ExitCode::FAILURE
        }
    }
}
