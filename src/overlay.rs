use crate::session::SessionState;
use opencv::core::{Mat, Point, Scalar};
use opencv::imgproc;

const TEXT_LEFT: i32 = 10;
const MOOD_BASELINE: i32 = 30;
const RECOMMENDATION_BASELINE: i32 = 70;
const LINE_STEP: i32 = 30;

/// Text drawn on top of the live feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overlay {
    pub mood_line: Option<String>,
    pub recommendation_lines: Vec<String>,
}

impl Overlay {
    pub fn from_state(state: &SessionState, width: usize) -> Self {
        Self {
            mood_line: state.mood.map(|mood| format!("Mood: {mood}")),
            recommendation_lines: state
                .recommendation
                .as_deref()
                .map(|text| wrap_text(text, width))
                .unwrap_or_default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.mood_line.is_none() && self.recommendation_lines.is_empty()
    }
}

/// Greedy word wrap.
///
/// Words are added to the current line until it would grow past `width`
/// characters. A word longer than `width` gets a line to itself.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        if current.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        } else {
            current.push(' ');
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

pub fn draw_overlay(frame: &mut Mat, overlay: &Overlay) -> opencv::Result<()> {
    let green = Scalar::new(0.0, 255.0, 0.0, 0.0);
    if let Some(mood_line) = &overlay.mood_line {
        imgproc::put_text(
            frame,
            mood_line,
            Point::new(TEXT_LEFT, MOOD_BASELINE),
            imgproc::FONT_HERSHEY_SIMPLEX,
            1.0,
            green,
            2,
            imgproc::LINE_8,
            false,
        )?;
    }
    let mut y = RECOMMENDATION_BASELINE;
    for line in &overlay.recommendation_lines {
        imgproc::put_text(
            frame,
            line,
            Point::new(TEXT_LEFT, y),
            imgproc::FONT_HERSHEY_SIMPLEX,
            0.7,
            green,
            2,
            imgproc::LINE_8,
            false,
        )?;
        y += LINE_STEP;
    }
    Ok(())
}
