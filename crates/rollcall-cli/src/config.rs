use std::path::PathBuf;

/// Runtime configuration, loaded from `ROLLCALL_*` environment variables.
pub struct Config {
    /// V4L2 device path (default: /dev/video0).
    pub camera_device: String,
    /// Directory containing the ONNX model files.
    pub model_dir: PathBuf,
    /// SQLite roster database path.
    pub db_path: PathBuf,
    /// Directory for enrollment photos.
    pub photo_dir: PathBuf,
    /// CSV attendance log path.
    pub attendance_log: PathBuf,
    /// Maximum embedding distance for a positive match (lower = stricter).
    pub tolerance: f32,
    /// Minimum seconds between two logged sightings of the same name.
    pub dedup_window_secs: f64,
    /// Per-dimension downscale factor applied before detection.
    pub downscale: f32,
    /// Frames to discard after stream start (camera AGC/AE stabilization).
    pub warmup_frames: usize,
    /// Frames to capture per enrollment attempt; the best face wins.
    pub frames_per_enroll: usize,
}

impl Config {
    pub fn from_env() -> Self {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("rollcall");

        let model_dir = std::env::var("ROLLCALL_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| rollcall_core::default_model_dir());

        Self {
            camera_device: std::env::var("ROLLCALL_CAMERA_DEVICE")
                .unwrap_or_else(|_| "/dev/video0".to_string()),
            model_dir,
            db_path: env_path("ROLLCALL_DB_PATH", data_dir.join("school.db")),
            photo_dir: env_path("ROLLCALL_PHOTO_DIR", data_dir.join("student_photos")),
            attendance_log: env_path("ROLLCALL_LOG_PATH", data_dir.join("attendance_log.csv")),
            tolerance: env_f32("ROLLCALL_TOLERANCE", 0.5),
            dedup_window_secs: env_f64("ROLLCALL_DEDUP_WINDOW_SECS", 30.0),
            downscale: env_f32("ROLLCALL_DOWNSCALE", 0.25),
            warmup_frames: env_usize("ROLLCALL_WARMUP_FRAMES", 4),
            frames_per_enroll: env_usize("ROLLCALL_FRAMES_PER_ENROLL", 5),
        }
    }

    /// Path to the face detection model.
    pub fn detector_model_path(&self) -> String {
        self.model_dir
            .join("det_10g.onnx")
            .to_string_lossy()
            .into_owned()
    }

    /// Path to the face embedding model.
    pub fn encoder_model_path(&self) -> String {
        self.model_dir
            .join("w600k_r50.onnx")
            .to_string_lossy()
            .into_owned()
    }
}

fn env_path(key: &str, default: PathBuf) -> PathBuf {
    std::env::var(key).map(PathBuf::from).unwrap_or(default)
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
