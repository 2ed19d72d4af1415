//! # Space Image Converter - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Validazione degli input dell'utente prima di toccare qualsiasi file
//! - Creazione della configurazione e avvio del converter
//!
//! ## Flusso di esecuzione:
//! 1. Senza argomenti stampa l'help ed esce con 0
//! 2. Configura il logging (INFO o DEBUG a seconda del flag verbose) su stderr
//! 3. Valida formati, dimensioni e qualità (errore = exit 1, nessun file toccato)
//! 4. Valida la sorgente e crea la directory di output se serve
//! 5. Cerca `cjxl` una sola volta (solo warning se manca)
//! 6. Istanzia il Converter e avvia la conversione
//!
//! ## Esempio di utilizzo:
//! ```bash
//! convert ./photos --formats webp jpegxl --out ./converted --width 1920 --no-enlargement
//! ```

use anyhow::Result;
use clap::{CommandFactory, Parser};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use space_image_converter::{
    config::parse_dimension,
    converter::TerminalPrompt,
    external_encoder::{CjxlEncoder, ToolPathResolver},
    json_output::JsonMessage,
    progress::ProgressManager,
    transform::TransformSpec,
    Config, Converter, FormatId,
};

#[derive(Parser)]
#[command(name = "convert")]
#[command(about = "Convert images between jpg, png, webp, avif and jpegxl")]
struct Args {
    /// Image file or directory of images to convert
    source: PathBuf,

    /// Target formats: jpg, png, webp, avif, jpegxl, or all
    #[arg(short, long, num_args = 1.., required = true)]
    formats: Vec<String>,

    /// Output directory (default: next to each source file)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Resize width in pixels
    #[arg(long, allow_negative_numbers = true)]
    width: Option<i64>,

    /// Resize height in pixels
    #[arg(long, allow_negative_numbers = true)]
    height: Option<i64>,

    /// Never upscale beyond the source dimensions
    #[arg(long)]
    no_enlargement: bool,

    /// Rotate clockwise by this many degrees. Must be a multiple of 90 (e.g. -90, 180, 270);
    /// other angles are rejected. Disables EXIF auto-orientation
    #[arg(long, allow_negative_numbers = true)]
    rotate: Option<i32>,

    /// Convert to grayscale
    #[arg(long)]
    grayscale: bool,

    /// Normalize to 8-bit sRGB
    #[arg(long)]
    to_srgb: bool,

    /// JPEG/AVIF quality (1-100)
    #[arg(short, long, default_value = "80")]
    quality: u8,

    /// Output JSON lines on stdout for programmatic use
    #[arg(long)]
    json: bool,

    /// Verbose logging, including external encoder output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    if std::env::args_os().len() <= 1 {
        Args::command().print_help()?;
        println!();
        return Ok(());
    }

    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let json = args.json;
    let result = run(args).await;

    if json {
        if let Err(ref e) = result {
            JsonMessage::error(e.to_string(), e.chain().nth(1).map(|s| s.to_string())).emit();
        }
    }

    result
}

async fn run(args: Args) -> Result<()> {
    // Validate arguments before touching any file
    let formats = FormatId::parse_targets(&args.formats)?;
    let transform = TransformSpec {
        width: parse_dimension("width", args.width)?,
        height: parse_dimension("height", args.height)?,
        allow_enlargement: !args.no_enlargement,
        rotate_degrees: args.rotate,
        grayscale: args.grayscale,
        to_srgb: args.to_srgb,
    };

    let config = Config {
        formats,
        output_dir: args.out,
        transform,
        quality: args.quality,
        verbose: args.verbose,
        json_output: args.json,
    };
    config.validate()?;

    if !args.source.exists() {
        return Err(anyhow::anyhow!("Source does not exist: {}", args.source.display()));
    }
    if !args.source.is_file() && !args.source.is_dir() {
        return Err(anyhow::anyhow!(
            "Source is neither a file nor a directory: {}",
            args.source.display()
        ));
    }

    // Create output directory if specified
    if let Some(ref output_dir) = config.output_dir {
        if !output_dir.exists() {
            std::fs::create_dir_all(output_dir)?;
            info!("Created output directory: {}", output_dir.display());
        }
    }

    let encoder = CjxlEncoder::resolve(&ToolPathResolver::new());

    let progress = if args.source.is_dir() && !config.verbose && !config.json_output {
        ProgressManager::new(0)
    } else {
        ProgressManager::hidden()
    };
    let prompt = TerminalPrompt::new().with_progress(progress.bar());

    let mut converter = Converter::new(config, encoder, Box::new(prompt)).with_progress(progress);
    converter.run(&args.source).await?;

    Ok(())
}
