use clap::Parser;
use opencv::core::Mat;
use opencv::highgui;
use spotimood::config::{DEFAULT_EMOTION_MODEL, DEFAULT_ENDPOINT, DEFAULT_WRAP_WIDTH};
use spotimood::session::WINDOW_TITLE;
use spotimood::{
    Camera, ChatCompletionsClient, Config, MoodClassifier, OpenCvFaceClassifier,
    RecommendationClient, Session, StdinConfirm, SystemBrowser, Window,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Scan your mood with the webcam and get a song for it")]
struct Args {
    /// Index of the capture device.
    #[clap(short, long, env = "SPOTIMOOD_CAMERA", default_value_t = 0)]
    camera: i32,

    /// Show the camera image unmirrored.
    #[clap(long)]
    no_mirror: bool,

    /// Chat completions endpoint asked for recommendations.
    #[clap(long, env = "SPOTIMOOD_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Bearer token for the endpoint.
    #[clap(long, env = "SPOTIMOOD_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model name sent with each request.
    #[clap(long, env = "SPOTIMOOD_MODEL")]
    model: Option<String>,

    /// Give up on the recommendation service after this many seconds.
    #[clap(long, env = "SPOTIMOOD_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// FER+ ONNX emotion model.
    #[clap(long, env = "SPOTIMOOD_EMOTION_MODEL", default_value = DEFAULT_EMOTION_MODEL)]
    emotion_model: PathBuf,

    /// Haar cascade for face detection.
    #[clap(long, env = "SPOTIMOOD_CASCADE")]
    cascade: Option<PathBuf>,

    /// Approximate overlay line width in characters.
    #[clap(long, default_value_t = DEFAULT_WRAP_WIDTH)]
    wrap_width: usize,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Config {
            camera_index: args.camera,
            mirror: !args.no_mirror,
            endpoint: args.endpoint,
            api_key: args.api_key,
            model: args.model,
            request_timeout: args.timeout_secs.map(Duration::from_secs),
            emotion_model: args.emotion_model,
            cascade: args.cascade,
            wrap_width: args.wrap_width,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    spotimood::config::load_dotenv();
    let config: Config = Args::parse().into();
    tracing::debug!(endpoint = %config.endpoint, camera = config.camera_index, "configuration loaded");

    let faces = OpenCvFaceClassifier::new(&config.emotion_model, config.cascade.as_deref())?;
    let generator = ChatCompletionsClient::from_config(&config)?;
    let camera = Camera::open(&config)?;
    let window = Window::new(WINDOW_TITLE)?;

    println!("Welcome to SpotiMood.");
    println!("Press 's' to scan your mood and get a song recommendation");
    println!("Press 'q' to quit");

    let mut session: Session<Mat> = Session::new(
        Box::new(camera),
        Box::new(window),
        MoodClassifier::new(Box::new(faces)),
        RecommendationClient::new(Arc::new(generator)),
        Box::new(StdinConfirm),
        Box::new(SystemBrowser),
        config.wrap_width,
    );
    let result = session.run().await;
    drop(session);
    highgui::destroy_all_windows()?;

    if let Err(error) = &result {
        tracing::error!(%error, "session ended");
    }
    Ok(result?)
}
