use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "psdcomp", version)]
struct Cli {
    /// JSON file with ingest options (limits, threading, thumbnails).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log decode progress and warnings to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print document metadata and the layer tree as JSON.
    Info(InfoArgs),
    /// Composite all visible layers into a PNG.
    Flatten(FlattenArgs),
    /// Write every layer raster as its own PNG.
    Layers(LayersArgs),
}

#[derive(Parser, Debug)]
struct InfoArgs {
    /// Input PSD or PSB file.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct FlattenArgs {
    /// Input PSD or PSB file.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Also write a thumbnail of the composite to this path.
    #[arg(long)]
    thumb: Option<PathBuf>,

    /// Longest thumbnail side; overrides the config file.
    #[arg(long)]
    max_dim: Option<u32>,
}

#[derive(Parser, Debug)]
struct LayersArgs {
    /// Input PSD or PSB file.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Directory for the layer PNGs.
    #[arg(long)]
    out_dir: PathBuf,

    /// Write thumbnails instead of full-size layers.
    #[arg(long)]
    thumbs: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let opts = read_options(cli.config.as_deref())?;
    match cli.cmd {
        Command::Info(args) => cmd_info(args, opts),
        Command::Flatten(args) => cmd_flatten(args, opts),
        Command::Layers(args) => cmd_layers(args, opts),
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn read_options(path: Option<&Path>) -> anyhow::Result<psdcomp::IngestOptions> {
    let Some(path) = path else {
        return Ok(psdcomp::IngestOptions::default());
    };
    let f = File::open(path).with_context(|| format!("open config '{}'", path.display()))?;
    let opts: psdcomp::IngestOptions = serde_json::from_reader(BufReader::new(f))
        .with_context(|| format!("parse config '{}'", path.display()))?;
    opts.validate()?;
    Ok(opts)
}

fn read_input(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("read '{}'", path.display()))
}

fn cmd_info(args: InfoArgs, opts: psdcomp::IngestOptions) -> anyhow::Result<()> {
    let bytes = read_input(&args.in_path)?;
    let decode = psdcomp::DecodeOptions {
        extract_images: false,
        decode_merged_image: false,
        ..opts.decode
    };
    let doc = psdcomp::decode_document(&bytes, &decode)?;
    let json = serde_json::to_string_pretty(&doc).context("serialize document")?;
    println!("{json}");
    Ok(())
}

fn cmd_flatten(args: FlattenArgs, mut opts: psdcomp::IngestOptions) -> anyhow::Result<()> {
    let bytes = read_input(&args.in_path)?;
    if let Some(max_dim) = args.max_dim {
        opts.thumbnail_max_dim = max_dim;
    }
    opts.generate_thumbnails = args.thumb.is_some();

    let out = psdcomp::ingest(&bytes, &opts)?;
    report_warnings(&out.document);

    write_png(&args.out, &out.composite)?;
    if let (Some(path), Some(thumbs)) = (&args.thumb, &out.thumbnails) {
        write_png(path, &thumbs.composite)?;
    }
    Ok(())
}

fn cmd_layers(args: LayersArgs, mut opts: psdcomp::IngestOptions) -> anyhow::Result<()> {
    let bytes = read_input(&args.in_path)?;
    opts.generate_thumbnails = args.thumbs;
    let out = psdcomp::ingest(&bytes, &opts)?;
    report_warnings(&out.document);

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("create output dir '{}'", args.out_dir.display()))?;

    match &out.thumbnails {
        Some(thumbs) => {
            for thumb in &thumbs.layers {
                let name = out
                    .document
                    .layer(thumb.id)
                    .map_or("layer", |l| l.name.as_str());
                write_png(&args.out_dir.join(layer_file_name(thumb.id, name)), &thumb.raster)?;
            }
        }
        None => {
            for layer in out.document.iter_layers() {
                let Some(raster) = layer.raster().filter(|r| !r.is_empty()) else {
                    continue;
                };
                write_png(&args.out_dir.join(layer_file_name(layer.id, &layer.name)), raster)?;
            }
        }
    }
    Ok(())
}

fn report_warnings(doc: &psdcomp::Document) {
    if !doc.warnings.is_empty() {
        eprintln!("{} decode warning(s)", doc.warnings.len());
    }
}

fn layer_file_name(id: psdcomp::LayerId, name: &str) -> String {
    let safe: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{:04}_{safe}.png", id.0)
}

fn write_png(path: &Path, raster: &psdcomp::Raster) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    image::save_buffer_with_format(
        path,
        raster.data(),
        raster.width(),
        raster.height(),
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", path.display()))?;

    eprintln!("wrote {}", path.display());
    Ok(())
}
