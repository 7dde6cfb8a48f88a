use bubble_sheet::config::ScanConfig;
use bubble_sheet::detector::{FillClassifier, MarkDetector};
use bubble_sheet::layout::QuestionRowImage;
use bubble_sheet::models::{Section, SheetResult};
use bubble_sheet::normalize::{NormalizePath, has_dark_border, normalize_sheet};
use bubble_sheet::overlay::draw_row_overlay;
use bubble_sheet::tools::{grayscale_stats, ink_ratio, load_gray, load_rgb, save_image};
use bubble_sheet::utils::grayscale::rgb_to_gray;
use bubble_sheet::{Result, SheetScanner};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "sheettool", version, about = "Answer sheet scanning tools")]
struct Cli {
    /// JSON configuration file (defaults plus OMR_* overrides when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a full sheet photo and print the answers
    Scan {
        #[arg(long)]
        image: PathBuf,
        /// Write the result as JSON
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Detect and classify marks in a single row image
    Row {
        #[arg(long)]
        image: PathBuf,
        /// Write a diagnostic overlay image
        #[arg(long)]
        overlay: Option<PathBuf>,
        /// Expected position, highlighted in the overlay
        #[arg(long)]
        key: Option<usize>,
    },
    /// Write the rectified canvas of a photo
    Normalize {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let outcome = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Command::Scan { image, output } => scan_cmd(config, &image, output.as_deref()),
        Command::Row { image, overlay, key } => row_cmd(config, &image, overlay.as_deref(), key),
        Command::Normalize { image, output } => normalize_cmd(config, &image, &output),
    });

    if let Err(err) = outcome {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<ScanConfig> {
    let config = match path {
        Some(path) => ScanConfig::from_json_file(path)?,
        None => ScanConfig::default(),
    };
    let config = config.with_env_overrides();
    config.validate()?;
    Ok(config)
}

fn format_positions(positions: &[usize]) -> String {
    if positions.is_empty() {
        return "-".to_string();
    }
    positions
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn print_result(result: &SheetResult, scanner: &SheetScanner) {
    let total = scanner.question_count();
    let expected = scanner.config().marks.marks_per_row;

    for q in 1..=total {
        match result.get(q) {
            Some(d) => {
                let flag = if !d.is_reliable(expected) {
                    "  (unreliable)"
                } else if d.is_ambiguous() {
                    "  (multiple)"
                } else {
                    ""
                };
                println!(
                    "Q{q:>2}: {:<8} candidates={} fill={:?}{flag}",
                    format_positions(&d.marked_positions),
                    d.candidate_count,
                    d.fill_ratios
                        .iter()
                        .map(|r| (r * 100.0).round() / 100.0)
                        .collect::<Vec<_>>()
                );
            }
            None => println!("Q{q:>2}: missing"),
        }
    }

    println!();
    for section in Section::ALL {
        let summary = result.section_summary(section, &scanner.config().layout);
        println!(
            "{:<6} Q{}-Q{}: {} of {} answered",
            section.name(),
            summary.first_question,
            summary.last_question,
            summary.answered,
            summary.answers.len()
        );
    }
    if !result.is_trustworthy(total, expected) {
        warn!(
            "sheet needs review: missing {:?}, unreliable {:?}",
            result.missing_questions(total),
            result.unreliable_questions(expected)
        );
    }
}

fn scan_cmd(config: ScanConfig, image: &Path, output: Option<&Path>) -> Result<()> {
    let scanner = SheetScanner::new(config)?;
    let raw = load_rgb(image)?;
    println!("Image: {} ({}x{})", image.display(), raw.width(), raw.height());

    let start = Instant::now();
    let (result, report) = scanner.scan_with_report(&raw)?;
    info!(
        "scanned in {:.1} ms via {:?}",
        start.elapsed().as_secs_f64() * 1000.0,
        report.normalize.path
    );

    print_result(&result, &scanner);

    if let Some(output) = output {
        std::fs::write(output, serde_json::to_string_pretty(&result)?)?;
        println!("Result written to {}", output.display());
    }
    Ok(())
}

fn row_cmd(
    config: ScanConfig,
    image: &Path,
    overlay: Option<&Path>,
    key: Option<usize>,
) -> Result<()> {
    let gray = load_gray(image)?;
    let stats = grayscale_stats(&gray);
    println!(
        "Row: {} ({}x{}), grayscale range {}-{}, average {}",
        image.display(),
        gray.width(),
        gray.height(),
        stats.min,
        stats.max,
        stats.avg
    );

    let row = QuestionRowImage::standalone(Section::Right, 1, gray);
    let detection = MarkDetector::detect_row(&row, &config.marks);
    let fill = FillClassifier::classify(&detection.candidates, &detection.enhanced, &config.fill);
    println!("Ink ratio: {:.2}%", ink_ratio(&detection.binary) * 100.0);

    println!(
        "{} candidates ({} accepted before truncation)",
        detection.candidates.len(),
        detection.accepted_count
    );
    for (candidate, m) in detection.candidates.iter().zip(&fill.measurements) {
        println!(
            "  position {}: centre=({:.1}, {:.1}) diameter={:.1} \
             circularity={:.2} fill={:.2} mean={:.0}",
            m.position,
            candidate.centroid.x,
            candidate.centroid.y,
            candidate.diameter,
            candidate.circularity,
            m.fill_ratio,
            m.mean_intensity
        );
    }
    println!("{} rejected contours", detection.rejected.len());
    for r in detection.rejected.iter().filter(|r| r.area > 1.0) {
        println!(
            "  area={:.0} circularity={:.2} aspect={:.2}: {}",
            r.area,
            r.circularity,
            r.aspect_ratio,
            r.reason_text()
        );
    }
    println!("Marked: {}", format_positions(&fill.marked_positions));

    if let Some(path) = overlay {
        save_image(draw_row_overlay(&detection, &fill, key), path)?;
        println!("Overlay written to {}", path.display());
    }
    Ok(())
}

fn normalize_cmd(config: ScanConfig, image: &Path, output: &Path) -> Result<()> {
    let raw = load_rgb(image)?;
    let (canvas, report) = normalize_sheet(&raw, &config.canvas);
    println!(
        "Normalized {}x{} via {:?} (rectified {}x{}, rotated to portrait: {})",
        report.source_size.0,
        report.source_size.1,
        report.path,
        report.rectified_size.0,
        report.rectified_size.1,
        report.rotated_to_portrait
    );
    if let Some(corners) = report.corners {
        println!("Corners: {corners:?}");
    }

    // A photo already cropped to its frame shows dark strips on every edge.
    let border = has_dark_border(&rgb_to_gray(&raw), 1, 10);
    println!("Photo edges (frame already cropped: {}):", border.has_border);
    for edge in &border.edges {
        println!("  {:?}: {:.1}% dark", edge.edge, edge.dark_percentage);
    }
    if report.path == NormalizePath::NoContour {
        warn!("no frame found in {}; the canvas is the uncropped photo", image.display());
    }

    save_image(canvas.into_inner(), output)?;
    println!("Canvas written to {}", output.display());
    Ok(())
}
