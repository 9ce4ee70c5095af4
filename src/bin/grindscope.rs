use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use grindscope::calibration::lenses;
use grindscope::constants::optics::{FALLBACK_FOCAL_LENGTH_MM, FALLBACK_SENSOR_DIAGONAL_MM};
use grindscope::storage::DeletionPolicy;
use grindscope::{
    logging, measurements_csv, AnalysisConfig, GrindError, LensSelection, OpticalEstimator,
    Point2D, RecordStore, TwoPointCalibration,
};

/// Coffee grind particle-size measurement.
#[derive(Debug, Parser)]
#[command(author, version, about = "Coffee grind particle-size distribution from photos")]
struct Cli {
    /// Path to a JSON AnalysisConfig. Defaults are used if omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Record directory, overriding `storageDir` from the configuration.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Save a two-point ruler calibration.
    Calibrate {
        /// Calibration name.
        #[arg(long)]
        name: String,
        /// First ruler mark in pixels, as `x,y`.
        #[arg(long, value_parser = parse_point)]
        p0: Point2D,
        /// Second ruler mark in pixels, as `x,y`.
        #[arg(long, value_parser = parse_point)]
        p1: Point2D,
        /// Real distance between the marks in millimeters.
        #[arg(long)]
        mm: f64,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Estimate the scale of a photo from EXIF and phone lens data.
    AutoCalibrate {
        image: PathBuf,
        /// Phone brand used when EXIF is incomplete.
        #[arg(long, requires = "model")]
        brand: Option<String>,
        /// Phone model family, as listed by `phones`.
        #[arg(long, requires = "brand")]
        model: Option<String>,
        /// Lens name; the 1x lens is used if omitted.
        #[arg(long, requires = "model")]
        lens: Option<String>,
        /// Camera-to-grounds distance in centimeters.
        #[arg(long)]
        distance_cm: Option<f64>,
        /// Save the estimate as a calibration with this name.
        #[arg(long)]
        save: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List saved calibrations.
    Calibrations,
    /// Delete a calibration.
    DeleteCalibration {
        id: String,
        /// Also delete the measurements that use it.
        #[arg(long)]
        cascade: bool,
    },
    /// List the phone lens table.
    Phones {
        /// Only show this brand.
        #[arg(long)]
        brand: Option<String>,
    },
    /// Segment a photo of grounds and report the size distribution.
    #[cfg(feature = "opencv")]
    Analyze {
        image: PathBuf,
        /// Id of the calibration to use.
        #[arg(long)]
        calibration: String,
        #[arg(long)]
        grinder: Option<String>,
        #[arg(long)]
        setting: Option<String>,
        #[arg(long)]
        coffee: Option<String>,
        /// Save the result to the history.
        #[arg(long)]
        save: bool,
    },
    /// List saved measurements, most recent first.
    History {
        /// Only show measurements whose calibration was deleted.
        #[arg(long)]
        orphans: bool,
    },
    /// Export the measurement history as CSV.
    Export {
        /// Output file; stdout if omitted.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Write the default configuration to a file.
    InitConfig { path: PathBuf },
}

fn parse_point(s: &str) -> std::result::Result<Point2D, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected `x,y`, got `{s}`"))?;
    let x: f64 = x.trim().parse().map_err(|e| format!("invalid x `{x}`: {e}"))?;
    let y: f64 = y.trim().parse().map_err(|e| format!("invalid y `{y}`: {e}"))?;
    Ok(Point2D::new(x, y))
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    match path {
        Some(path) => AnalysisConfig::from_json_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display())),
        None => Ok(AnalysisConfig::default()),
    }
}

fn lens_selection<'a>(
    brand: Option<&str>,
    model: Option<&str>,
    lens: Option<&str>,
) -> Result<Option<LensSelection<'a>>> {
    let (brand, model) = match (brand, model) {
        (Some(brand), Some(model)) => (brand, model),
        _ => return Ok(None),
    };

    let Some(phone) = lenses::find_model(brand, model) else {
        bail!("unknown phone `{brand} {model}`; run `grindscope phones` for the list");
    };
    let lens = match lens {
        Some(name) => phone
            .lens(name)
            .with_context(|| format!("{} has no lens named `{name}`", phone.display_name()))?,
        None => phone
            .main_lens()
            .with_context(|| format!("{} has no lenses", phone.display_name()))?,
    };

    Ok(Some(LensSelection { phone, lens }))
}

/// Terminal text for a failed command, with a hint when the library raised it
fn describe(err: &anyhow::Error) -> String {
    match err.downcast_ref::<GrindError>() {
        Some(grind) => format!("{err:#}\nhint: {}", grind.user_message()),
        None => format!("{err:#}"),
    }
}

fn main() {
    logging::init();
    if let Err(err) = try_main() {
        eprintln!("error: {}", describe(&err));
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let data_dir = cli.data_dir.clone().unwrap_or_else(|| config.storage_dir.clone());

    match cli.command {
        Command::Calibrate {
            name,
            p0,
            p1,
            mm,
            notes,
        } => {
            let calibration = TwoPointCalibration::new(p0, p1, mm)?.into_calibration(name, notes);
            let store = RecordStore::open(&data_dir)?;
            println!(
                "{}  {:.3} µm/px  ({:.1} px = {} mm)",
                calibration.id,
                calibration.microns_per_pixel,
                calibration.pixel_distance,
                calibration.real_distance_mm
            );
            store.add_calibration(calibration)?;
        }
        Command::AutoCalibrate {
            image,
            brand,
            model,
            lens,
            distance_cm,
            save,
            notes,
        } => {
            let selection = lens_selection(brand.as_deref(), model.as_deref(), lens.as_deref())?;
            let estimator = OpticalEstimator::with_params(
                FALLBACK_FOCAL_LENGTH_MM,
                FALLBACK_SENSOR_DIAGONAL_MM,
                config.default_subject_distance_cm * 10.0,
            );
            let result = estimator
                .estimate_for_image(&image, distance_cm, selection)
                .with_context(|| format!("Failed to estimate scale of {}", image.display()))?;

            println!("{}", serde_json::to_string_pretty(&result)?);
            if result.is_degraded() {
                eprintln!("note: this is an estimate; a ruler calibration is more accurate");
            }

            if let Some(name) = save {
                let calibration = result.to_calibration(name, notes);
                println!("saved as {}", calibration.id);
                RecordStore::open(&data_dir)?.add_calibration(calibration)?;
            }
        }
        Command::Calibrations => {
            let store = RecordStore::open(&data_dir)?;
            for calibration in store.load_calibrations() {
                println!(
                    "{}  {:<24} {:>9.3} µm/px  {:?}  {}",
                    calibration.id,
                    calibration.name,
                    calibration.microns_per_pixel,
                    calibration.method,
                    calibration.date_created.format("%Y-%m-%d %H:%M")
                );
            }
        }
        Command::DeleteCalibration { id, cascade } => {
            let policy = if cascade {
                DeletionPolicy::Cascade
            } else {
                DeletionPolicy::Restrict
            };
            let report = RecordStore::open(&data_dir)?.delete_calibration(&id, policy)?;
            println!(
                "deleted '{}' and {} measurement(s)",
                report.calibration.name, report.removed_measurements
            );
        }
        Command::Phones { brand } => {
            let phones = match &brand {
                Some(brand) => lenses::models_for_brand(brand),
                None => lenses::PHONE_SPECS.iter().collect(),
            };
            for phone in phones {
                println!("{}", phone.display_name());
                for lens in phone.lenses {
                    println!(
                        "    {:<22} {:>5.2} mm  ({} mm eq., {})",
                        lens.name,
                        lens.focal_length_mm,
                        lens.equivalent_35mm_focal_length_mm,
                        lens.aspect_ratio
                    );
                }
            }
        }
        #[cfg(feature = "opencv")]
        Command::Analyze {
            image,
            calibration,
            grinder,
            setting,
            coffee,
            save,
        } => {
            use grindscope::measurement::record;
            use grindscope::{AnalysisOutcome, MeasurementOrchestrator, OpenCvSegmenter, SampleLabels};

            let store = RecordStore::open(&data_dir)?;
            let calibration = store.find_calibration(&calibration)?;
            let orchestrator = MeasurementOrchestrator::new(OpenCvSegmenter::new());
            let outcome = orchestrator
                .analyze_path(&image, &calibration, &config.params, &config.thresholds)
                .with_context(|| format!("Failed to analyze {}", image.display()))?;

            match outcome {
                AnalysisOutcome::NoParticles { detected } => {
                    println!(
                        "no particles detected ({detected} region(s) outside the area band); \
                         adjust the kernels or area limits"
                    );
                }
                AnalysisOutcome::Particles(analysis) => {
                    let s = &analysis.stats;
                    println!("n = {}", s.count);
                    println!("mean = {:.0} µm, σ = {:.0} µm, mode ≈ {:.0} µm", s.mean, s.std_dev, s.mode_bin_center);
                    println!("D10 = {:.0} µm, D50 = {:.0} µm, D90 = {:.0} µm", s.p10, s.p50, s.p90);
                    println!("span = {:.2}, CoV = {:.1}%", s.span, s.coefficient_of_variation * 100.0);
                    println!(
                        "fines = {:.1}%, coarse = {:.1}%",
                        analysis.classification.fine_pct, analysis.classification.coarse_pct
                    );
                    if save {
                        let labels = SampleLabels::new(grinder, setting, coffee);
                        let measurement = record(&store, &analysis, labels)?;
                        println!("saved as {}", measurement.id);
                    }
                }
            }
        }
        Command::History { orphans } => {
            let store = RecordStore::open(&data_dir)?;
            let measurements = if orphans {
                store.orphaned_measurements()
            } else {
                store.load_measurements()
            };
            for m in measurements {
                println!(
                    "{}  {:<16} {:<8} n={:<5} D50={:>5.0} µm  fines={:.1}%  coarse={:.1}%",
                    m.date_created.format("%Y-%m-%d %H:%M"),
                    m.grinder.as_deref().unwrap_or("-"),
                    m.setting.as_deref().unwrap_or("-"),
                    m.sample_size,
                    m.stats.p50,
                    m.fine_pct,
                    m.coarse_pct
                );
            }
        }
        Command::Export { output } => {
            let store = RecordStore::open(&data_dir)?;
            let csv = measurements_csv(&store.load_measurements(), &store.load_calibrations());
            match output {
                Some(path) => {
                    fs::write(&path, csv)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!("Exported history to {}", path.display());
                }
                None => print!("{csv}"),
            }
        }
        Command::InitConfig { path } => {
            config.to_json_file(&path)?;
            println!("wrote {}", path.display());
        }
    }

    Ok(())
}
