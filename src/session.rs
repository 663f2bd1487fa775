use crate::browser::{spotify_search_url, BrowserLauncher};
use crate::config::Config;
use crate::mood::{Mood, MoodClassifier};
use crate::overlay::{draw_overlay, Overlay};
use crate::recommend::RecommendationClient;
use opencv::core::Mat;
use opencv::prelude::*;
use opencv::{core, highgui, videoio};
use std::io::{self, BufRead, Write};
use thiserror::Error;

pub const WINDOW_TITLE: &str = "SpotiMood";
pub const OPEN_PROMPT: &str = "Open in Spotify? (y/n): ";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Camera error {0}")]
    Device(String),
    #[error("OpenCV error {0:?}")]
    OpenCv(#[from] opencv::Error),
    #[error("IO error {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Scan,
    Quit,
}

impl Command {
    pub fn from_key(key: i32) -> Option<Self> {
        let key = u8::try_from(key).ok()?;
        match key.to_ascii_lowercase() {
            b's' => Some(Command::Scan),
            b'q' => Some(Command::Quit),
            _ => None,
        }
    }
}

/// Last scan result. Empty until the first scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub mood: Option<Mood>,
    pub recommendation: Option<String>,
}

impl SessionState {
    pub fn is_scanned(&self) -> bool {
        self.mood.is_some()
    }
}

pub trait FrameSource<F> {
    /// A failed read ends the session.
    fn read_frame(&mut self) -> Result<F, SessionError>;
}

/// Where frames are shown and commands come from.
pub trait Surface<F> {
    fn render(&mut self, frame: &F, overlay: &Overlay) -> Result<(), SessionError>;
    fn poll_command(&mut self) -> Result<Option<Command>, SessionError>;
}

/// Yes/no question. Anything but yes is no.
pub trait Confirm {
    fn confirm(&mut self, question: &str) -> bool;
}

pub struct Session<F> {
    frames: Box<dyn FrameSource<F>>,
    surface: Box<dyn Surface<F>>,
    classifier: MoodClassifier<F>,
    recommender: RecommendationClient,
    confirm: Box<dyn Confirm>,
    browser: Box<dyn BrowserLauncher>,
    wrap_width: usize,
    state: SessionState,
}

impl<F> Session<F> {
    pub fn new(
        frames: Box<dyn FrameSource<F>>,
        surface: Box<dyn Surface<F>>,
        classifier: MoodClassifier<F>,
        recommender: RecommendationClient,
        confirm: Box<dyn Confirm>,
        browser: Box<dyn BrowserLauncher>,
        wrap_width: usize,
    ) -> Self {
        Self {
            frames,
            surface,
            classifier,
            recommender,
            confirm,
            browser,
            wrap_width,
            state: SessionState::default(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Runs until quit or until the frame source fails.
    pub async fn run(&mut self) -> Result<(), SessionError> {
        loop {
            let frame = self.frames.read_frame()?;

            let overlay = Overlay::from_state(&self.state, self.wrap_width);
            self.surface.render(&frame, &overlay)?;

            match self.surface.poll_command()? {
                Some(Command::Scan) => self.scan(&frame).await,
                Some(Command::Quit) => {
                    tracing::info!("quit requested");
                    return Ok(());
                }
                None => {}
            }
        }
    }

    /// Classify, recommend, then offer to search for the song.
    pub async fn scan(&mut self, frame: &F) {
        let mood = self.classifier.classify(frame);
        self.state.mood = Some(mood);
        println!("Detected mood: {mood}");

        println!("Getting song recommendation...");
        let recommendation = self.recommender.recommend(mood).await;
        println!("Recommendation: {recommendation}");
        self.state.recommendation = Some(recommendation.clone());

        if self.confirm.confirm(OPEN_PROMPT) {
            let url = spotify_search_url(&recommendation);
            tracing::info!(%url, "opening search");
            if let Err(error) = self.browser.open(&url) {
                tracing::warn!(?error, "failed to open browser");
            }
        }
    }
}

/// Default camera through OpenCV's videoio.
pub struct Camera {
    capture: videoio::VideoCapture,
    mirror: bool,
}

impl Camera {
    pub fn open(config: &Config) -> Result<Self, SessionError> {
        let capture = videoio::VideoCapture::new(config.camera_index, videoio::CAP_ANY)?;
        let opened = videoio::VideoCapture::is_opened(&capture)?;
        if !opened {
            return Err(SessionError::Device(format!(
                "could not open camera {}",
                config.camera_index
            )));
        }
        Ok(Self {
            capture,
            mirror: config.mirror,
        })
    }
}

impl FrameSource<Mat> for Camera {
    fn read_frame(&mut self) -> Result<Mat, SessionError> {
        let mut frame = Mat::default();
        let grabbed = self.capture.read(&mut frame)?;
        if !grabbed || frame.size()?.width == 0 {
            return Err(SessionError::Device("failed to capture image".to_string()));
        }
        if !self.mirror {
            return Ok(frame);
        }
        let mut mirrored = Mat::default();
        core::flip(&frame, &mut mirrored, 1)?;
        Ok(mirrored)
    }
}

/// HighGUI window with the overlay drawn on each frame.
pub struct Window {
    name: String,
}

impl Window {
    pub fn new(name: &str) -> Result<Self, SessionError> {
        highgui::named_window_def(name)?;
        Ok(Self {
            name: name.to_string(),
        })
    }
}

impl Surface<Mat> for Window {
    fn render(&mut self, frame: &Mat, overlay: &Overlay) -> Result<(), SessionError> {
        if overlay.is_empty() {
            highgui::imshow(&self.name, frame)?;
            return Ok(());
        }
        let mut annotated = frame.try_clone()?;
        draw_overlay(&mut annotated, overlay)?;
        highgui::imshow(&self.name, &annotated)?;
        Ok(())
    }

    fn poll_command(&mut self) -> Result<Option<Command>, SessionError> {
        let key = highgui::wait_key(1)?;
        Ok(Command::from_key(key))
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        if let Err(error) = highgui::destroy_window(&self.name) {
            tracing::debug!(?error, "failed to destroy window");
        }
    }
}

/// Asks on stdout and reads the answer from stdin.
#[derive(Debug, Default)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, question: &str) -> bool {
        print!("{question}");
        if let Err(error) = io::stdout().flush() {
            tracing::debug!(?error, "stdout flush failed");
        }
        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => is_yes(&answer),
            Err(error) => {
                tracing::warn!(?error, "could not read answer");
                false
            }
        }
    }
}

pub fn is_yes(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("y")
}
