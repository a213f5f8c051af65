use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use rollcall_core::FacePipeline;
use rollcall_hw::Camera;
use rollcall_store::{AttendanceLog, Roster};

mod config;
mod engine;
mod enroll;
mod gallery;
mod scan;

use config::Config;
use engine::ScanEngine;
use scan::FrameReport;

#[derive(Parser)]
#[command(name = "rollcall", about = "Face-recognition attendance for the classroom")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enroll a student: capture a photo from the camera and save the record
    Enroll {
        /// Full name, e.g. "Alice Smith"
        #[arg(short, long)]
        name: String,
        /// Class label, e.g. "10-A"
        #[arg(short, long)]
        class: String,
    },
    /// List enrolled students
    List {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Remove an enrolled student by id
    Remove { id: i64 },
    /// Run the live attendance scanner until Ctrl-C
    Scan {
        /// Save an annotated snapshot here each time attendance is logged
        #[arg(long)]
        snapshot_dir: Option<PathBuf>,
    },
    /// List available camera devices
    Devices,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Commands::Enroll { name, class } => cmd_enroll(&config, &name, &class),
        Commands::List { json } => cmd_list(&config, json),
        Commands::Remove { id } => cmd_remove(&config, id),
        Commands::Scan { snapshot_dir } => cmd_scan(&config, snapshot_dir.as_deref()).await,
        Commands::Devices => cmd_devices(),
    }
}

fn cmd_enroll(config: &Config, name: &str, class: &str) -> Result<()> {
    let roster = Roster::open(&config.db_path).context("opening roster database")?;
    let mut pipeline =
        FacePipeline::load(&config.detector_model_path(), &config.encoder_model_path())
            .context("loading face models")?;

    let camera = Camera::open(&config.camera_device).context("opening camera")?;
    let frame = {
        let mut session = camera.start()?;
        session.discard_warmup(config.warmup_frames);
        println!("Look at the camera...");
        enroll::capture_enrollment_photo(&mut session, &mut pipeline, config.frames_per_enroll)?
    };

    let record = enroll::save_student(&roster, &config.photo_dir, name, class, &frame)?;
    println!(
        "Enrolled {} ({}) as student #{}",
        record.name, record.class_label, record.id
    );
    Ok(())
}

fn cmd_list(config: &Config, json: bool) -> Result<()> {
    let roster = Roster::open(&config.db_path).context("opening roster database")?;
    let students = roster.list()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&students)?);
        return Ok(());
    }

    if students.is_empty() {
        println!("No students enrolled");
        return Ok(());
    }
    for s in &students {
        println!("#{:<4} {:<30} {}", s.id, s.name, s.class_label);
    }
    Ok(())
}

fn cmd_remove(config: &Config, id: i64) -> Result<()> {
    let roster = Roster::open(&config.db_path).context("opening roster database")?;
    if roster.remove(id)? {
        println!("Removed student #{id}");
    } else {
        println!("No student with id #{id}");
    }
    Ok(())
}

async fn cmd_scan(config: &Config, snapshot_dir: Option<&Path>) -> Result<()> {
    let roster = Roster::open(&config.db_path).context("opening roster database")?;
    let students = roster.list()?;
    if students.is_empty() {
        bail!("no students enrolled; run `rollcall enroll` first");
    }

    let mut pipeline =
        FacePipeline::load(&config.detector_model_path(), &config.encoder_model_path())
            .context("loading face models")?;
    let gallery = gallery::build_gallery(&students, &mut pipeline)?;

    let sink = AttendanceLog::new(&config.attendance_log);
    let (engine, mut reports) = ScanEngine::spawn(config, pipeline, gallery, sink)?;
    println!(
        "Scanning on {} (log: {}). Press Ctrl-C to stop.",
        config.camera_device,
        config.attendance_log.display()
    );

    loop {
        tokio::select! {
            maybe = reports.recv() => match maybe {
                Some(report) => {
                    for id in &report.logged {
                        println!("logged {} ({})", id.name, id.class_label);
                    }
                    if let Some(dir) = snapshot_dir {
                        if !report.logged.is_empty() {
                            if let Err(e) = save_snapshot(dir, &report) {
                                tracing::warn!(error = %e, "snapshot save failed");
                            }
                        }
                    }
                }
                // Scan thread finished (stop requested or camera gone).
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                println!("\nStopping...");
                engine.stop();
            }
        }
    }

    let summary = engine.join()?;
    println!(
        "Processed {} frames, {} recognitions, {} attendance rows written",
        summary.frames, summary.recognitions, summary.rows_logged
    );
    Ok(())
}

fn save_snapshot(dir: &Path, report: &FrameReport) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!(
        "scan_{}.png",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    ));
    image::save_buffer(
        &path,
        &report.annotated.data,
        report.annotated.width,
        report.annotated.height,
        image::ExtendedColorType::Rgb8,
    )?;
    tracing::info!(path = %path.display(), "annotated snapshot saved");
    Ok(())
}

fn cmd_devices() -> Result<()> {
    let devices = Camera::list_devices();
    if devices.is_empty() {
        println!("No capture devices found");
        return Ok(());
    }
    for d in &devices {
        println!("{:<14} {} ({})", d.path, d.name, d.driver);
    }
    Ok(())
}
