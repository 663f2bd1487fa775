use clap::Parser;
use opencv::{highgui, imgproc};
use spotimood::config::DEFAULT_EMOTION_MODEL;
use spotimood::mood::mood_from_faces;
use spotimood::{read_image, FaceClassifier, OpenCvFaceClassifier};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Classify the faces in a still image.
#[derive(Parser, Debug)]
#[command()]
struct Args {
    /// Image to classify.
    image: PathBuf,

    /// FER+ ONNX emotion model.
    #[clap(long, env = "SPOTIMOOD_EMOTION_MODEL", default_value = DEFAULT_EMOTION_MODEL)]
    emotion_model: PathBuf,

    /// Haar cascade for face detection.
    #[clap(long, env = "SPOTIMOOD_CASCADE")]
    cascade: Option<PathBuf>,

    /// Show the image with detected faces boxed.
    #[clap(long)]
    show: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    spotimood::config::load_dotenv();
    let args: Args = Args::parse();

    let mut classifier = OpenCvFaceClassifier::new(&args.emotion_model, args.cascade.as_deref())?;
    let mut image = read_image(&args.image)?;

    let faces = classifier.classify_faces(&image)?;
    println!("faces: {}", faces.len());
    for (index, scores) in faces.iter().enumerate() {
        let summary: Vec<String> = scores
            .iter()
            .map(|(emotion, score)| format!("{emotion}={score:.2}"))
            .collect();
        println!("face {index}: {}", summary.join(" "));
    }
    println!("mood: {}", mood_from_faces(&faces));

    if args.show {
        let window = "scan image";
        highgui::named_window_def(window)?;
        for face in classifier.detect_faces(&image)? {
            imgproc::rectangle_def(&mut image, face, (0, 255, 0).into())?;
        }
        highgui::imshow(window, &image)?;
        highgui::wait_key(0)?;
    }

    Ok(())
}
