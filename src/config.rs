use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://ai.hackclub.com/chat/completions";
pub const DEFAULT_EMOTION_MODEL: &str = "emotion-ferplus-8.onnx";
pub const DEFAULT_WRAP_WIDTH: usize = 30;

/// Settings loaded once at startup and only read afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    /// Index of the capture device.
    pub camera_index: i32,
    /// Mirror frames horizontally before display and classification.
    pub mirror: bool,
    /// Chat completions endpoint used for recommendations.
    pub endpoint: String,
    /// Sent as a bearer token when present. The hosted default endpoint
    /// takes no auth, so by default no Authorization header goes out.
    pub api_key: Option<String>,
    /// Model name put in the request body when present.
    pub model: Option<String>,
    /// No timeout when unset.
    pub request_timeout: Option<Duration>,
    /// FER+ ONNX emotion model.
    pub emotion_model: PathBuf,
    /// Haar cascade, OpenCV's bundled frontal face cascade when unset.
    pub cascade: Option<PathBuf>,
    /// Approximate character width of overlay lines.
    pub wrap_width: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            camera_index: 0,
            mirror: true,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            model: None,
            request_timeout: None,
            emotion_model: PathBuf::from(DEFAULT_EMOTION_MODEL),
            cascade: None,
            wrap_width: DEFAULT_WRAP_WIDTH,
        }
    }
}

/// Loads `.env` from the working directory or one of its parents.
///
/// Variables already set in the environment are left alone.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded env file"),
        Err(error) if error.not_found() => {}
        Err(error) => tracing::warn!(%error, "failed to load .env"),
    }
}

/// Loads a specific env file. Returns whether anything was loaded.
pub fn load_env_file(path: &Path) -> bool {
    match dotenvy::from_path(path) {
        Ok(()) => true,
        Err(error) if error.not_found() => false,
        Err(error) => {
            tracing::warn!(%error, path = %path.display(), "failed to load env file");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn env_file_values_reach_the_environment() {
        let path = std::env::temp_dir().join(format!("spotimood-{}.env", std::process::id()));
        fs::write(
            &path,
            "SPOTIMOOD_TEST_ENDPOINT=http://localhost:9/chat\nSPOTIMOOD_TEST_PRESET=from-file\n",
        )
        .unwrap();
        std::env::set_var("SPOTIMOOD_TEST_PRESET", "from-env");

        assert!(load_env_file(&path));
        assert_eq!(
            std::env::var("SPOTIMOOD_TEST_ENDPOINT").unwrap(),
            "http://localhost:9/chat"
        );
        assert_eq!(std::env::var("SPOTIMOOD_TEST_PRESET").unwrap(), "from-env");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_env_file_is_skipped() {
        let path = std::env::temp_dir().join("spotimood-does-not-exist.env");
        assert!(!load_env_file(&path));
    }
}
