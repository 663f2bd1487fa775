use crate::mood::{EmotionScores, FaceClassifier};
use opencv::core::{Mat, Rect, Scalar, Size};
use opencv::prelude::*;
use opencv::types::VectorOfRect;
use opencv::{core, dnn, imgcodecs, imgproc, objdetect, types};
use std::path::Path;

const DEFAULT_CASCADE: &str = "haarcascades/haarcascade_frontalface_alt.xml";

/// Side length of the square face crop the emotion net expects.
const EMOTION_INPUT_SIZE: i32 = 64;

/// Output order of the FER+ emotion network.
pub const EMOTION_LABELS: [&str; 8] = [
    "neutral", "happy", "surprise", "sad", "angry", "disgust", "fear", "contempt",
];

pub struct FaceDetector {
    classifier: objdetect::CascadeClassifier,
}

impl FaceDetector {
    /// Loads the cascade at `cascade`, or the frontal face cascade bundled
    /// with OpenCV when no path is given.
    pub fn new(cascade: Option<&Path>) -> anyhow::Result<Self> {
        let xml = match cascade {
            Some(path) => path.to_string_lossy().into_owned(),
            None => core::find_file_def(DEFAULT_CASCADE)?,
        };
        let classifier = objdetect::CascadeClassifier::new(&xml)?;
        tracing::debug!(%xml, "loaded face cascade");
        Ok(Self { classifier })
    }

    pub fn detect(&mut self, image: &Mat) -> anyhow::Result<VectorOfRect> {
        let mut faces = types::VectorOfRect::new();

        self.classifier.detect_multi_scale(
            &image,
            &mut faces,
            1.1,
            2,
            objdetect::CASCADE_SCALE_IMAGE,
            core::Size {
                width: 30,
                height: 30,
            },
            core::Size {
                width: 0,
                height: 0,
            },
        )?;
        Ok(faces)
    }
}

/// FER+ emotion network run through OpenCV's dnn module.
pub struct EmotionNet {
    net: dnn::Net,
}

impl EmotionNet {
    pub fn new(model: &Path) -> anyhow::Result<Self> {
        let net = dnn::read_net_from_onnx(&model.to_string_lossy())?;
        tracing::debug!(model = %model.display(), "loaded emotion model");
        Ok(Self { net })
    }

    /// Scores a grayscale face crop of any size.
    pub fn score(&mut self, face: &Mat) -> anyhow::Result<EmotionScores> {
        let blob = dnn::blob_from_image(
            face,
            1.0,
            Size::new(EMOTION_INPUT_SIZE, EMOTION_INPUT_SIZE),
            Scalar::default(),
            false,
            false,
            core::CV_32F,
        )?;
        self.net.set_input_def(&blob)?;
        let output = self.net.forward_single_def()?;
        let logits = output.data_typed::<f32>()?;
        if logits.len() != EMOTION_LABELS.len() {
            anyhow::bail!(
                "emotion model returned {} values, expected {}",
                logits.len(),
                EMOTION_LABELS.len()
            );
        }
        Ok(EMOTION_LABELS
            .iter()
            .copied()
            .zip(softmax(logits))
            .collect())
    }
}

/// Emotion detection over camera frames: cascade faces, then one net pass per face.
pub struct OpenCvFaceClassifier {
    face_detector: FaceDetector,
    emotion_net: EmotionNet,
}

impl OpenCvFaceClassifier {
    pub fn new(emotion_model: &Path, cascade: Option<&Path>) -> anyhow::Result<Self> {
        Ok(Self {
            face_detector: FaceDetector::new(cascade)?,
            emotion_net: EmotionNet::new(emotion_model)?,
        })
    }

    /// Face rectangles in the frame, in detector order.
    pub fn detect_faces(&mut self, frame: &Mat) -> anyhow::Result<Vec<Rect>> {
        let gray = convert_to_grayscale(frame)?;
        Ok(self.face_detector.detect(&gray)?.to_vec())
    }
}

impl FaceClassifier<Mat> for OpenCvFaceClassifier {
    fn classify_faces(&mut self, frame: &Mat) -> anyhow::Result<Vec<EmotionScores>> {
        let gray = convert_to_grayscale(frame)?;
        let faces = self.face_detector.detect(&gray)?;
        tracing::debug!(faces = faces.len(), "detected faces");

        let mut scores = Vec::with_capacity(faces.len());
        for face in &faces {
            let crop = Mat::roi(&gray, face)?.try_clone()?;
            scores.push(self.emotion_net.score(&crop)?);
        }
        Ok(scores)
    }
}

pub fn convert_to_grayscale(image: &Mat) -> anyhow::Result<Mat> {
    if image.channels() == 1 {
        return Ok(image.try_clone()?);
    }
    let mut gray: Mat = Mat::default();
    imgproc::cvt_color_def(&image, &mut gray, imgproc::COLOR_BGR2GRAY)?;
    Ok(gray)
}

pub fn read_image(path: &Path) -> anyhow::Result<Mat> {
    let image = imgcodecs::imread(&path.to_string_lossy(), imgcodecs::IMREAD_COLOR)?;
    if image.empty() {
        anyhow::bail!("could not read image {}", path.display());
    }
    Ok(image)
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|v| v / sum).collect()
}
