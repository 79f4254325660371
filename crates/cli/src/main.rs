use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

use clap::Parser;
use serde::Serialize;

use facegate_core::detection::domain::face_detector::FaceDetector;
use facegate_core::detection::infrastructure::detector_pool::DetectorPool;
use facegate_core::detection::infrastructure::onnx_yunet_detector::{
    DetectorConfig, OnnxYunetDetector, DEFAULT_CONFIDENCE, DEFAULT_NMS_THRESHOLD, DEFAULT_TOP_K,
};
use facegate_core::gating::domain::face_gate::FaceGate;
use facegate_core::gating::domain::gate_config::{
    GateConfig, DEFAULT_AMBIGUITY_RATIO, DEFAULT_MARGIN_RATIO, DEFAULT_MAX_PADDING_RATIO,
    DEFAULT_MIN_FACE_RATIO,
};
use facegate_core::gating::domain::pipeline_outcome::{GateEvaluation, PipelineOutcome};
use facegate_core::imaging::domain::image_writer::ImageWriter;
use facegate_core::imaging::infrastructure::image_file_writer::ImageFileWriter;
use facegate_core::imaging::infrastructure::image_frame_decoder::ImageFrameDecoder;
use facegate_core::pipeline::assess_quality_use_case::QualityReport;
use facegate_core::pipeline::evaluate_frame_use_case::EvaluateFrameUseCase;
use facegate_core::pipeline::gate_logger::{GateLogger, StdoutGateLogger};
use facegate_core::scoring::domain::quality_scorer::QualityScorer;
use facegate_core::scoring::infrastructure::onnx_quality_scorer::OnnxQualityScorer;
use facegate_core::shared::constants::{IMAGE_EXTENSIONS, YUNET_MODEL_NAME, YUNET_MODEL_URL};
use facegate_core::shared::model_resolver;

/// Gate face images before quality scoring.
#[derive(Parser)]
#[command(name = "facegate")]
struct Cli {
    /// Image files or directories of images.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// YuNet model file (downloaded to the cache when omitted).
    #[arg(long)]
    model: Option<PathBuf>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE)]
    confidence: f32,

    /// IoU above which overlapping detections are suppressed (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_NMS_THRESHOLD)]
    nms: f32,

    /// Maximum detections kept before suppression.
    #[arg(long, default_value_t = DEFAULT_TOP_K)]
    top_k: usize,

    /// Second face larger than this fraction of the first is ambiguous.
    #[arg(long, default_value_t = DEFAULT_AMBIGUITY_RATIO)]
    ambiguity_ratio: f64,

    /// Minimum face width as a fraction of frame width.
    #[arg(long, default_value_t = DEFAULT_MIN_FACE_RATIO)]
    min_face_ratio: f64,

    /// Crop margin around the face, as a fraction of its larger side.
    #[arg(long, default_value_t = DEFAULT_MARGIN_RATIO)]
    margin_ratio: f64,

    /// Largest tolerated fraction of the crop filled by padding.
    #[arg(long, default_value_t = DEFAULT_MAX_PADDING_RATIO)]
    max_padding_ratio: f64,

    /// Worker threads (and detector instances). Defaults to available cores.
    #[arg(long)]
    workers: Option<usize>,

    /// Score accepted faces with this quality model.
    #[arg(long)]
    scorer_model: Option<PathBuf>,

    /// Save accepted face crops to this directory.
    #[arg(long)]
    save_crops: Option<PathBuf>,
}

/// One JSON line per input.
#[derive(Serialize)]
struct InputResult {
    input: String,
    #[serde(flatten)]
    result: FrameResult,
}

#[derive(Serialize)]
#[serde(untagged)]
enum FrameResult {
    Gated(PipelineOutcome),
    Scored(QualityReport),
}

struct Job {
    index: usize,
    path: PathBuf,
}

struct Done {
    index: usize,
    path: PathBuf,
    started: Instant,
    evaluation: GateEvaluation,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let inputs = collect_inputs(&cli.inputs)?;
    let workers = cli
        .workers
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
        .min(inputs.len())
        .max(1);

    let gate = FaceGate::new(GateConfig {
        ambiguity_ratio: cli.ambiguity_ratio,
        min_face_ratio: cli.min_face_ratio,
        margin_ratio: cli.margin_ratio,
        max_padding_ratio: cli.max_padding_ratio,
    })?;
    let detectors = build_detectors(&cli, workers)?;
    let use_case = EvaluateFrameUseCase::new(gate, Box::new(ImageFrameDecoder::new()), detectors);

    let mut scorer: Option<Box<dyn QualityScorer>> = match &cli.scorer_model {
        Some(path) => {
            let scorer: Box<dyn QualityScorer> = Box::new(OnnxQualityScorer::new(path)?);
            Some(scorer)
        }
        None => None,
    };
    let crop_writer = cli
        .save_crops
        .as_ref()
        .map(|dir| (dir.as_path(), ImageFileWriter::new()));

    let mut logger = StdoutGateLogger::default();
    logger.info(&format!(
        "Evaluating {} image(s) with {workers} worker(s)",
        inputs.len()
    ));

    let total = inputs.len();
    let (job_tx, job_rx) = crossbeam_channel::unbounded::<Job>();
    let (done_tx, done_rx) = crossbeam_channel::bounded::<Done>(workers * 2);
    for (index, path) in inputs.into_iter().enumerate() {
        job_tx.send(Job { index, path })?;
    }
    drop(job_tx);

    std::thread::scope(|s| -> Result<(), Box<dyn std::error::Error>> {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let done_tx = done_tx.clone();
            let use_case = &use_case;
            s.spawn(move || {
                for job in job_rx {
                    let started = Instant::now();
                    let evaluation = match std::fs::read(&job.path) {
                        Ok(bytes) => use_case.evaluate_encoded_detailed(&bytes),
                        Err(e) => GateEvaluation::new(PipelineOutcome::error(format!(
                            "Failed to read {}: {e}",
                            job.path.display()
                        ))),
                    };
                    let done = Done {
                        index: job.index,
                        path: job.path,
                        started,
                        evaluation,
                    };
                    if done_tx.send(done).is_err() {
                        break;
                    }
                }
            });
        }
        drop(done_tx);

        let done_rx = done_rx;
        for (received, done) in done_rx.iter().enumerate() {
            logger.progress(received + 1, total);
            logger.evaluation(&done.evaluation);
            log::debug!("Input #{} finished: {}", done.index, done.path.display());

            if let (Some((dir, writer)), Some(crop)) = (&crop_writer, &done.evaluation.crop) {
                if done.evaluation.outcome.is_ok() {
                    let target = crop_path(dir, done.index, &done.path);
                    if let Err(e) = writer.write(&target, &crop.crop, None) {
                        log::warn!("Could not save crop {}: {e}", target.display());
                    }
                }
            }

            let result = match scorer.as_mut() {
                Some(scorer) => {
                    let t0 = Instant::now();
                    let report = QualityReport::from_outcome(
                        done.evaluation.outcome,
                        &mut **scorer,
                        done.started,
                    );
                    if report.quality_score.is_some() {
                        logger.timing("score", t0.elapsed().as_secs_f64() * 1000.0);
                    }
                    FrameResult::Scored(report)
                }
                None => FrameResult::Gated(done.evaluation.outcome),
            };

            let line = InputResult {
                input: done.path.display().to_string(),
                result,
            };
            println!("{}", serde_json::to_string(&line)?);
        }
        Ok(())
    })?;

    logger.summary();
    Ok(())
}

fn build_detectors(cli: &Cli, workers: usize) -> Result<DetectorPool, Box<dyn std::error::Error>> {
    let model_path = match &cli.model {
        Some(path) => path.clone(),
        None => {
            log::info!("Resolving model: {YUNET_MODEL_NAME}");
            let path = model_resolver::resolve(
                YUNET_MODEL_NAME,
                YUNET_MODEL_URL,
                None,
                Some(Box::new(download_progress)),
            )?;
            eprintln!();
            path
        }
    };

    let config = DetectorConfig {
        confidence: cli.confidence,
        nms_threshold: cli.nms,
        top_k: cli.top_k,
    };
    DetectorPool::build(workers, || {
        let detector: Box<dyn FaceDetector> = Box::new(OnnxYunetDetector::new(&model_path, config)?);
        Ok(detector)
    })
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    for input in &cli.inputs {
        if !input.exists() {
            return Err(format!("Input not found: {}", input.display()).into());
        }
    }
    if let Some(model) = &cli.model {
        if !model.is_file() {
            return Err(format!("Model file not found: {}", model.display()).into());
        }
    }
    if let Some(model) = &cli.scorer_model {
        if !model.is_file() {
            return Err(format!("Scorer model file not found: {}", model.display()).into());
        }
    }
    if !(0.0..=1.0).contains(&cli.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            cli.confidence
        )
        .into());
    }
    if !(0.0..=1.0).contains(&cli.nms) {
        return Err(format!("NMS threshold must be between 0.0 and 1.0, got {}", cli.nms).into());
    }
    if cli.top_k == 0 {
        return Err("Top-k must be at least 1".into());
    }
    if cli.workers == Some(0) {
        return Err("Workers must be at least 1".into());
    }
    Ok(())
}

/// Expand directories into their image files, sorted by name.
fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut entries: Vec<PathBuf> = std::fs::read_dir(input)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| path.is_file() && is_image(path))
                .collect();
            entries.sort();
            files.extend(entries);
        } else {
            files.push(input.clone());
        }
    }
    if files.is_empty() {
        return Err("No image files found in the given inputs".into());
    }
    Ok(files)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// `<index>_<stem>_face.png`; the index keeps inputs with equal stems apart.
fn crop_path(dir: &Path, index: usize, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("frame");
    dir.join(format!("{index:04}_{stem}_face.png"))
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
}
