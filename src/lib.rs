pub mod browser;
pub mod config;
pub mod mood;
pub mod overlay;
pub mod recommend;
pub mod session;
pub mod vision;

pub use browser::{spotify_search_url, BrowserLauncher, SystemBrowser};
pub use config::Config;
pub use mood::{EmotionScores, FaceClassifier, Mood, MoodClassifier};
pub use overlay::{wrap_text, Overlay};
pub use recommend::{
    ChatCompletionsClient, RawReply, RecommendError, RecommendationClient, TextGenerator,
    PARSE_ERROR_PLACEHOLDER, SERVICE_ERROR_PLACEHOLDER,
};
pub use session::{
    Camera, Command, Confirm, FrameSource, Session, SessionError, SessionState, StdinConfirm,
    Surface, Window,
};
pub use vision::{read_image, OpenCvFaceClassifier};
