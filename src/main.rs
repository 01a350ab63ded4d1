use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use depth_planes::color::render_plane_map;
use depth_planes::{OutputMode, PipelineConfig, RgbdDataset, Sample};

#[derive(Parser, Debug)]
#[command(
    name = "depth-planes",
    version,
    about = "Decompose RGB-D depth maps into virtual depth-plane masks"
)]
struct Cli {
    /// JSON pipeline configuration (channel, planes, normalizer, resize).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the color/depth pairs of a directory.
    List { dir: PathBuf },
    /// Per-plane occupancy of every sample.
    Stats {
        dir: PathBuf,
        /// Also write the table as CSV.
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Write a colourised plane map of one sample.
    Preview {
        dir: PathBuf,
        #[arg(short, long, default_value_t = 0)]
        index: usize,
        #[arg(short, long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    match cli.command {
        Command::List { dir } => list(&dir, &config),
        Command::Stats { dir, csv } => stats(&dir, &config, csv.as_deref()),
        Command::Preview { dir, index, out } => preview(&dir, &config, index, &out),
    }
}

fn open(dir: &Path, config: &PipelineConfig, output_type: OutputMode) -> Result<RgbdDataset> {
    let config = PipelineConfig {
        output_type,
        ..config.clone()
    };
    RgbdDataset::from_config(dir, &config).with_context(|| format!("opening {}", dir.display()))
}

fn list(dir: &Path, config: &PipelineConfig) -> Result<()> {
    let dataset = open(dir, config, config.output_type)?;
    for index in 0..dataset.len() {
        let (color, depth) = dataset.pair(index)?;
        println!("{index}\t{}\t{}", color.display(), depth.display());
    }
    Ok(())
}

fn stats(dir: &Path, config: &PipelineConfig, csv_path: Option<&Path>) -> Result<()> {
    let dataset = open(dir, config, OutputMode::MaskTriplet)?;
    let num_planes = dataset.decomposer().planes().len();

    let mut writer = match csv_path {
        Some(path) => Some(
            csv::Writer::from_path(path)
                .with_context(|| format!("creating CSV {}", path.display()))?,
        ),
        None => None,
    };
    if let Some(w) = writer.as_mut() {
        let mut header = vec!["id".to_string()];
        header.extend((0..num_planes).map(|k| format!("plane_{k}")));
        w.write_record(&header).context("writing CSV header")?;
    }

    for (index, sample) in dataset.iter().enumerate() {
        let Sample::Masked { masks, id, .. } =
            sample.with_context(|| format!("sample {index}"))?
        else {
            bail!("sample {index} did not produce masks");
        };
        let occupancy = masks.plane_occupancy();

        let row: Vec<String> = occupancy.iter().map(|f| format!("{f:.4}")).collect();
        println!("{id}\t{}", row.join("\t"));

        if let Some(w) = writer.as_mut() {
            let mut record = vec![id];
            record.extend(row);
            w.write_record(&record)
                .with_context(|| format!("writing CSV row {index}"))?;
        }
    }

    if let Some(mut w) = writer {
        w.flush().context("flushing CSV")?;
    }
    Ok(())
}

fn preview(dir: &Path, config: &PipelineConfig, index: usize, out: &Path) -> Result<()> {
    let dataset = open(dir, config, OutputMode::MaskTriplet)?;
    let Sample::Masked { masks, id, .. } = dataset
        .get(index)
        .with_context(|| format!("sample {index}"))?
    else {
        bail!("sample {index} did not produce masks");
    };

    render_plane_map(&masks)
        .save(out)
        .with_context(|| format!("writing {}", out.display()))?;
    log::info!("wrote plane map of {id} to {}", out.display());
    Ok(())
}
