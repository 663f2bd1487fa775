use std::fmt;

/// Coarse mood bucket a scan resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mood {
    Happy,
    Sad,
    Neutral,
}

impl Mood {
    /// Groups a raw emotion name into one of the three buckets.
    ///
    /// Anything outside the happy and sad groups, including unknown names,
    /// lands in [`Mood::Neutral`].
    pub fn from_emotion(emotion: &str) -> Self {
        match emotion.to_ascii_lowercase().as_str() {
            "happy" | "surprise" => Mood::Happy,
            "sad" | "fear" | "angry" | "disgust" => Mood::Sad,
            _ => Mood::Neutral,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Sad => "sad",
            Mood::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-face emotion confidences, kept in the order the detector reported them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmotionScores {
    entries: Vec<(String, f32)>,
}

impl EmotionScores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, emotion: impl Into<String>, score: f32) {
        self.entries.push((emotion.into(), score));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.entries.iter().map(|(name, score)| (name.as_str(), *score))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highest scoring emotion. Ties go to the entry seen first.
    pub fn dominant(&self) -> Option<(&str, f32)> {
        let mut best: Option<(&str, f32)> = None;
        for (name, score) in self.iter() {
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((name, score)),
            }
        }
        best
    }
}

impl<S: Into<String>> FromIterator<(S, f32)> for EmotionScores {
    fn from_iter<I: IntoIterator<Item = (S, f32)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(name, score)| (name.into(), score))
                .collect(),
        }
    }
}

/// Opaque emotion detection capability.
///
/// Returns one [`EmotionScores`] per detected face, in detection order.
pub trait FaceClassifier<F> {
    fn classify_faces(&mut self, frame: &F) -> anyhow::Result<Vec<EmotionScores>>;
}

/// Turns a frame into a [`Mood`] using whatever [`FaceClassifier`] it wraps.
pub struct MoodClassifier<F> {
    faces: Box<dyn FaceClassifier<F>>,
}

impl<F> MoodClassifier<F> {
    pub fn new(faces: Box<dyn FaceClassifier<F>>) -> Self {
        Self { faces }
    }

    /// Never fails. A detection error is treated the same as an empty frame.
    pub fn classify(&mut self, frame: &F) -> Mood {
        let faces = match self.faces.classify_faces(frame) {
            Ok(faces) => faces,
            Err(error) => {
                tracing::warn!(?error, "emotion detection failed");
                return Mood::Neutral;
            }
        };
        mood_from_faces(&faces)
    }
}

/// Mood of the first face. No faces means neutral.
pub fn mood_from_faces(faces: &[EmotionScores]) -> Mood {
    let Some(first) = faces.first() else {
        tracing::debug!("no face detected");
        return Mood::Neutral;
    };
    match first.dominant() {
        Some((emotion, score)) => {
            tracing::debug!(%emotion, %score, faces = faces.len(), "dominant emotion");
            Mood::from_emotion(emotion)
        }
        None => Mood::Neutral,
    }
}
