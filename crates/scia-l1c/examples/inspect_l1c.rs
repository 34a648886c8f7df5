//! Inspect a SCIAMACHY Level-1C product.
//!
//! Prints the header summary and the state table, then streams a few
//! readouts of the chosen category and window.
//!
//! ```text
//! cargo run --example inspect_l1c -- SCI_NLC_1P...N1 --category limb --window 320:335
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use scia_l1c::{
    ExtractionConfig, MeasurementCategory, Product, ReadoutIterator, WavelengthWindow, WindowSpec,
};

#[derive(Parser, Debug)]
#[command(name = "inspect_l1c")]
#[command(about = "Inspect a SCIAMACHY Level-1C product")]
struct Args {
    /// Product file
    product: PathBuf,

    /// Extraction configuration (YAML); command-line options override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Measurement category
    #[arg(long, env = "L1C_CATEGORY")]
    category: Option<MeasurementCategory>,

    /// Wavelength windows as `min:max[@channel]`, in increasing order
    #[arg(short, long)]
    window: Vec<String>,

    /// Minimum integration time of output readouts in seconds
    #[arg(long)]
    min_integration_time: Option<f64>,

    /// Attach PMD samples
    #[arg(long)]
    pmd: bool,

    /// Number of readouts to print
    #[arg(short = 'n', long, default_value_t = 5)]
    count: usize,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn parse_window(text: &str) -> Result<WavelengthWindow> {
    let (range, channel) = match text.split_once('@') {
        Some((r, c)) => (r, Some(c.parse::<u8>().context("channel")?)),
        None => (text, None),
    };
    let (lo, hi) = range
        .split_once(':')
        .with_context(|| format!("window {:?} is not min:max", text))?;
    let mut window = WavelengthWindow::new(lo.parse()?, hi.parse()?);
    window.channel = channel;
    Ok(window)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = match &args.config {
        Some(path) => ExtractionConfig::from_file(path)?,
        None => ExtractionConfig::from_env(),
    };
    if let Some(category) = args.category {
        config.category = category;
    }
    if !args.window.is_empty() {
        let windows = args.window.iter().map(|w| parse_window(w)).collect::<Result<_>>()?;
        config.window = WindowSpec::Wavelengths(windows);
    }
    if args.min_integration_time.is_some() {
        config.min_integration_time = args.min_integration_time;
    }
    config.include_pmd |= args.pmd;

    let product = Product::open(&args.product)?;
    let mph = product.mph();
    println!("Product:      {}", mph.product);
    println!("Software:     {}", mph.software_ver);
    println!("Orbit:        {} (relative {})", mph.abs_orbit, mph.rel_orbit);
    if let (Some(start), Some(stop)) = (mph.sensing_start, mph.sensing_stop) {
        println!("Sensing:      {} .. {}", start.to_header_time(), stop.to_header_time());
    }
    println!("L1b source:   {}", product.calibration_options().l1b_product_name);
    println!("\nDatasets:");
    for d in product.descriptors().iter().filter(|d| d.is_present()) {
        println!("  {:<22} {:>10} bytes {:>6} records", d.name, d.size, d.num_dsr);
    }
    println!("\nStates:");
    for category in MeasurementCategory::ALL {
        let states: Vec<_> = product.states_for(category).collect();
        if states.is_empty() {
            continue;
        }
        let ids: std::collections::BTreeSet<u16> = states.iter().map(|s| s.state_id).collect();
        println!("  {:<12} {:>4} states, ids {:?}", category, states.len(), ids);
    }
    drop(product);

    info!(category = %config.category, "Streaming readouts");
    let mut readouts = ReadoutIterator::from_config(&args.product, config)?;
    let mut shown = 0;
    while shown < args.count {
        let Some(readout) = readouts.advance()? else {
            break;
        };
        let (lo, hi) = readout
            .wavelength
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &w| (lo.min(w), hi.max(w)));
        let sub = readout.geolocation.sub_satellite();
        println!(
            "\n#{} state {} (id {}) at {}",
            shown,
            readout.state_index,
            readout.state_id,
            readout.time.to_header_time()
        );
        println!(
            "  {} pixels, {:.2}..{:.2} nm, {:.4} s, sub-satellite {:.3}N {:.3}E",
            readout.len(),
            lo,
            hi,
            readout.integration_time,
            sub.lat_deg(),
            sub.lon_deg()
        );
        if let Some(pmd) = &readout.pmd {
            println!("  {} PMD samples", pmd.len() / 7);
        }
        shown += 1;
    }
    for warning in readouts.warnings() {
        println!("warning: {}", warning);
    }
    Ok(())
}
