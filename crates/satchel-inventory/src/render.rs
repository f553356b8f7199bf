//! The seam to the rendering shell.
//!
//! Selectors describe each row as a [`LineSpec`]; a [`RenderSurface`] draws
//! it and answers whether the row is focused, hovered or clicked. A
//! [`UiDriver`] owns the frame loop and the blocking input wait.
//!
//! [`ScriptedDriver`] runs sessions headlessly from a list of steps.

use std::collections::VecDeque;

use satchel_common::Color;
use tracing::{debug, trace};

use crate::input::{Action, InventoryInput};

/// A run of text in one color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    /// Text
    pub text: String,
    /// Color
    pub color: Color,
}

impl TextSpan {
    /// Creates a span.
    #[must_use]
    pub fn new(text: impl Into<String>, color: Color) -> Self {
        Self {
            text: text.into(),
            color,
        }
    }
}

/// Horizontal placement of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    /// Flush left
    #[default]
    Left,
    /// Flush right
    Right,
    /// Centered
    Center,
}

/// A right-aligned cell with a fixed width.
#[derive(Debug, Clone, PartialEq)]
pub struct RightCell {
    /// Text
    pub text: String,
    /// Color
    pub color: Color,
    /// Reserved width in pixels
    pub width: f32,
}

/// One line to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct LineSpec {
    /// Stable identity used for focus tracking
    pub key: u64,
    /// Left indent in characters
    pub indent: usize,
    /// Main text, left to right
    pub spans: Vec<TextSpan>,
    /// Extra cells drawn right-aligned, rightmost last
    pub right_cells: Vec<RightCell>,
    /// Alignment of the main text
    pub align: Align,
    /// Width limit in pixels; zero means unlimited
    pub max_width: f32,
    /// Can take focus and clicks
    pub interactive: bool,
    /// Asks the surface to move keyboard focus here
    pub request_focus: bool,
}

impl LineSpec {
    /// A non-interactive line of plain text.
    #[must_use]
    pub fn text(text: impl Into<String>, color: Color) -> Self {
        Self {
            key: 0,
            indent: 0,
            spans: vec![TextSpan::new(text, color)],
            right_cells: Vec::new(),
            align: Align::Left,
            max_width: 0.0,
            interactive: false,
            request_focus: false,
        }
    }

    /// Concatenated text of every span.
    #[must_use]
    pub fn plain_text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

/// What the surface observed for a drawn line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineResponse {
    /// Holds keyboard focus
    pub focused: bool,
    /// Under the mouse pointer
    pub hovered: bool,
    /// Clicked this frame
    pub clicked: bool,
}

/// Viewport rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
}

impl Bounds {
    /// Creates bounds at the origin.
    #[must_use]
    pub const fn sized(width: f32, height: f32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width,
            height,
        }
    }
}

/// Something rows can be drawn on.
pub trait RenderSurface {
    /// Draws one line and reports its interaction state.
    fn draw_line(&mut self, line: &LineSpec) -> LineResponse;

    /// Current viewport.
    fn viewport(&self) -> Bounds;

    /// Starts a column of the given width.
    fn begin_column(&mut self, _index: usize, _width: f32) {}

    /// Ends the current column.
    fn end_column(&mut self) {}

    /// Draws a horizontal separator.
    fn separator(&mut self) {}
}

/// Frame loop and modal dialogs of the rendering shell.
pub trait UiDriver {
    /// Runs one frame, calling `draw` with the surface.
    fn frame(&mut self, draw: &mut dyn FnMut(&mut dyn RenderSurface));

    /// Blocks until the next input event.
    fn next_input(&mut self) -> InventoryInput;

    /// Shows a transient message the user must acknowledge.
    fn notify(&mut self, message: &str);

    /// Asks a yes/no question.
    fn confirm(&mut self, question: &str) -> bool;

    /// Asks for a line of text; `None` when cancelled.
    fn query_text(&mut self, prompt: &str, initial: &str) -> Option<String>;
}

/// One step of a [`ScriptedDriver`] script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    /// Deliver an action
    Input(Action),
    /// Deliver a raw key press
    Key(char),
    /// Move keyboard focus to the first interactive line containing the text
    Focus(String),
    /// Move the pointer over the first interactive line containing the text
    Hover(String),
    /// Move the pointer off every line
    Unhover,
}

/// Headless driver replaying a script.
///
/// Focus and hover targets persist across frames until replaced. An
/// exhausted script delivers `QUIT`.
#[derive(Debug)]
pub struct ScriptedDriver {
    steps: VecDeque<ScriptStep>,
    confirms: VecDeque<bool>,
    texts: VecDeque<Option<String>>,
    default_confirm: bool,
    viewport: Bounds,
    focus_target: Option<String>,
    hover_target: Option<String>,
    focused_key: Option<u64>,
    notifications: Vec<String>,
    questions: Vec<String>,
    last_frame: Vec<String>,
    frames: u64,
}

impl Default for ScriptedDriver {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ScriptedDriver {
    /// Creates a driver with a 1200x800 viewport.
    #[must_use]
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self {
            steps: steps.into(),
            confirms: VecDeque::new(),
            texts: VecDeque::new(),
            default_confirm: false,
            viewport: Bounds::sized(1200.0, 800.0),
            focus_target: None,
            hover_target: None,
            focused_key: None,
            notifications: Vec::new(),
            questions: Vec::new(),
            last_frame: Vec::new(),
            frames: 0,
        }
    }

    /// Sets the viewport size.
    #[must_use]
    pub fn with_viewport(mut self, viewport: Bounds) -> Self {
        self.viewport = viewport;
        self
    }

    /// Queues answers for [`UiDriver::confirm`].
    #[must_use]
    pub fn with_confirms(mut self, answers: impl IntoIterator<Item = bool>) -> Self {
        self.confirms.extend(answers);
        self
    }

    /// Answer given once the confirm queue runs dry.
    #[must_use]
    pub fn with_default_confirm(mut self, answer: bool) -> Self {
        self.default_confirm = answer;
        self
    }

    /// Queues replies for [`UiDriver::query_text`].
    #[must_use]
    pub fn with_texts(mut self, replies: impl IntoIterator<Item = Option<String>>) -> Self {
        self.texts.extend(replies);
        self
    }

    /// Appends steps.
    pub fn push(&mut self, step: ScriptStep) {
        self.steps.push_back(step);
    }

    /// Messages shown so far.
    #[must_use]
    pub fn notifications(&self) -> &[String] {
        &self.notifications
    }

    /// Questions asked so far.
    #[must_use]
    pub fn questions(&self) -> &[String] {
        &self.questions
    }

    /// Text of every line drawn in the last frame.
    #[must_use]
    pub fn last_frame(&self) -> &[String] {
        &self.last_frame
    }

    /// Frames drawn so far.
    #[must_use]
    pub const fn frames(&self) -> u64 {
        self.frames
    }

    fn apply_pointer_steps(&mut self) {
        while let Some(step) = self.steps.front() {
            match step {
                ScriptStep::Focus(text) => {
                    self.focus_target = Some(text.clone());
                    self.focused_key = None;
                }
                ScriptStep::Hover(text) => self.hover_target = Some(text.clone()),
                ScriptStep::Unhover => self.hover_target = None,
                ScriptStep::Input(_) | ScriptStep::Key(_) => break,
            }
            self.steps.pop_front();
        }
    }
}

struct ScriptedSurface<'a> {
    driver: &'a mut ScriptedDriver,
    focus_matched: bool,
    hover_matched: bool,
}

impl RenderSurface for ScriptedSurface<'_> {
    fn draw_line(&mut self, line: &LineSpec) -> LineResponse {
        let text = line.plain_text();
        self.driver.last_frame.push(text.clone());
        if !line.interactive {
            return LineResponse::default();
        }
        let matches = |target: &Option<String>| target.as_ref().is_some_and(|t| text.contains(t.as_str()));

        if !self.focus_matched && matches(&self.driver.focus_target) {
            self.focus_matched = true;
            self.driver.focused_key = Some(line.key);
        } else if line.request_focus && self.driver.focus_target.is_none() {
            self.driver.focused_key = Some(line.key);
        }
        let hovered = !self.hover_matched && matches(&self.driver.hover_target);
        self.hover_matched |= hovered;

        LineResponse {
            focused: self.driver.focused_key == Some(line.key),
            hovered,
            clicked: false,
        }
    }

    fn viewport(&self) -> Bounds {
        self.driver.viewport
    }
}

impl UiDriver for ScriptedDriver {
    fn frame(&mut self, draw: &mut dyn FnMut(&mut dyn RenderSurface)) {
        self.apply_pointer_steps();
        self.last_frame.clear();
        self.frames += 1;
        let mut surface = ScriptedSurface {
            driver: self,
            focus_matched: false,
            hover_matched: false,
        };
        draw(&mut surface);
        trace!("Scripted frame {} drew {} lines", self.frames, self.last_frame.len());
    }

    fn next_input(&mut self) -> InventoryInput {
        self.apply_pointer_steps();
        match self.steps.pop_front() {
            Some(ScriptStep::Input(action)) => InventoryInput::action(action),
            Some(ScriptStep::Key(ch)) => InventoryInput::key(ch),
            _ => InventoryInput::action(Action::Quit),
        }
    }

    fn notify(&mut self, message: &str) {
        debug!("Notification: {message}");
        self.notifications.push(message.to_string());
    }

    fn confirm(&mut self, question: &str) -> bool {
        self.questions.push(question.to_string());
        self.confirms.pop_front().unwrap_or(self.default_confirm)
    }

    fn query_text(&mut self, prompt: &str, initial: &str) -> Option<String> {
        self.questions.push(prompt.to_string());
        match self.texts.pop_front() {
            Some(Some(reply)) => Some(format!("{initial}{reply}")),
            Some(None) => None,
            None => Some(initial.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(key: u64, text: &str) -> LineSpec {
        LineSpec {
            key,
            interactive: true,
            ..LineSpec::text(text, Color::LightGray)
        }
    }

    #[test]
    fn test_focus_persists_across_frames() {
        let mut driver = ScriptedDriver::new(vec![
            ScriptStep::Focus("knife".into()),
            ScriptStep::Input(Action::Confirm),
        ]);
        let mut seen = Vec::new();
        for _ in 0..2 {
            driver.frame(&mut |s| {
                for (key, text) in [(1, "apple"), (2, "knife")] {
                    if s.draw_line(&row(key, text)).focused {
                        seen.push(key);
                    }
                }
            });
        }
        assert_eq!(seen, vec![2, 2]);
        assert_eq!(driver.next_input().action, Action::Confirm);
        assert_eq!(driver.next_input().action, Action::Quit);
    }

    #[test]
    fn test_request_focus_without_target() {
        let mut driver = ScriptedDriver::default();
        let mut focused = None;
        driver.frame(&mut |s| {
            s.draw_line(&row(1, "apple"));
            let mut line = row(2, "rock");
            line.request_focus = true;
            if s.draw_line(&line).focused {
                focused = Some(2);
            }
        });
        assert_eq!(focused, Some(2));
        assert_eq!(driver.last_frame(), ["apple", "rock"]);
    }

    #[test]
    fn test_dialog_answers() {
        let mut driver = ScriptedDriver::default()
            .with_confirms([true])
            .with_texts([Some("2".to_string()), None]);
        assert!(driver.confirm("Really?"));
        assert!(!driver.confirm("Again?"));
        assert_eq!(driver.query_text("Count", "1").as_deref(), Some("12"));
        assert_eq!(driver.query_text("Count", ""), None);
        driver.notify("Nothing selected");
        assert_eq!(driver.notifications(), ["Nothing selected"]);
        assert_eq!(driver.questions().len(), 4);
    }
}
