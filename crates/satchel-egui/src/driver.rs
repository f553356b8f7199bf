//! Headless `UiDriver` over an `egui::Context`.
//!
//! Frames are run against a fixed screen rect without a window. Input comes
//! from a queue of raw egui events that the host (or a test) fills:
//! - key events bound in the [`Keymap`] become actions
//! - text events become quick-select key presses
//! - pointer moves and navigation keys are forwarded to the next frame and
//!   reported as `MOUSE_MOVE` so the selector redraws
//! - a primary button press becomes `SELECT`
//!
//! Modal dialogs are drawn as centered windows and answered from the same
//! queue. An exhausted queue quits the session and declines every dialog.

use std::collections::VecDeque;

use egui::{
    pos2, vec2, Align2, CentralPanel, Context, Event, Key, Modifiers, PointerButton, Pos2, RawInput, Rect, Vec2,
    Window,
};
use satchel_inventory::{Action, Bounds, InventoryInput, RenderSurface, UiDriver};
use tracing::{debug, info, trace};

use crate::keymap::{KeyChord, Keymap, KeymapResult};
use crate::surface::{DrawnLine, EguiSurface};

/// Keys egui uses to move keyboard focus.
pub const NAVIGATION_KEYS: [Key; 6] = [
    Key::ArrowUp,
    Key::ArrowDown,
    Key::PageUp,
    Key::PageDown,
    Key::Home,
    Key::End,
];

const FRAME_SECONDS: f64 = 1.0 / 60.0;

#[derive(Debug, Clone, PartialEq, Eq)]
enum DialogKey {
    Accept,
    Cancel,
    Backspace,
    Char(char),
}

/// Runs selector sessions on a headless egui context.
pub struct EguiDriver {
    ctx: Context,
    keymap: Keymap,
    viewport: Bounds,
    font_size: f32,
    pending: VecDeque<Event>,
    carry: Vec<Event>,
    suppress_text: bool,
    time: f64,
    frames: u64,
    last_frame: Vec<DrawnLine>,
    notifications: Vec<String>,
    questions: Vec<String>,
}

impl std::fmt::Debug for EguiDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EguiDriver")
            .field("context", &"<egui::Context>")
            .field("viewport", &self.viewport)
            .field("pending", &self.pending.len())
            .field("frames", &self.frames)
            .finish_non_exhaustive()
    }
}

impl EguiDriver {
    /// Creates a driver with a 1200x800 screen.
    #[must_use]
    pub fn new(keymap: Keymap) -> Self {
        Self {
            ctx: Context::default(),
            keymap,
            viewport: Bounds::sized(1200.0, 800.0),
            font_size: 14.0,
            pending: VecDeque::new(),
            carry: Vec::new(),
            suppress_text: false,
            time: 0.0,
            frames: 0,
            last_frame: Vec::new(),
            notifications: Vec::new(),
            questions: Vec::new(),
        }
    }

    /// Sets the screen size.
    #[must_use]
    pub fn with_viewport(mut self, width: f32, height: f32) -> Self {
        self.viewport = Bounds::sized(width, height);
        self
    }

    /// Sets the monospace font size in points.
    #[must_use]
    pub fn with_font_size(mut self, font_size: f32) -> Self {
        self.font_size = font_size;
        self
    }

    /// The egui context.
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// The active keymap.
    #[must_use]
    pub fn keymap(&self) -> &Keymap {
        &self.keymap
    }

    /// Queues a raw egui event.
    pub fn push_event(&mut self, event: Event) {
        self.pending.push_back(event);
    }

    /// Queues a key press and release, plus the text it types.
    pub fn press(&mut self, chord: &str) -> KeymapResult<()> {
        let chord = KeyChord::parse(chord)?;
        let modifiers = Modifiers {
            alt: chord.alt,
            ctrl: chord.ctrl,
            shift: chord.shift,
            mac_cmd: false,
            command: chord.ctrl,
        };
        for pressed in [true, false] {
            self.push_event(Event::Key {
                key: chord.key,
                physical_key: None,
                pressed,
                repeat: false,
                modifiers,
            });
            if let Some(text) = chord.text().filter(|_| pressed) {
                self.push_event(Event::Text(text));
            }
        }
        Ok(())
    }

    /// Queues typed text.
    pub fn type_text(&mut self, text: &str) {
        self.push_event(Event::Text(text.to_string()));
    }

    /// Queues a pointer move.
    pub fn move_pointer(&mut self, pos: Pos2) {
        self.push_event(Event::PointerMoved(pos));
    }

    /// Queues a move followed by a primary click.
    pub fn click(&mut self, pos: Pos2) {
        self.move_pointer(pos);
        for pressed in [true, false] {
            self.push_event(Event::PointerButton {
                pos,
                button: PointerButton::Primary,
                pressed,
                modifiers: Modifiers::NONE,
            });
        }
    }

    /// Queues a click on the first line of the last frame containing `text`.
    /// Returns false when no such line was drawn.
    pub fn click_line(&mut self, text: &str) -> bool {
        let Some(center) = self
            .last_frame
            .iter()
            .find(|l| l.text.contains(text))
            .map(|l| l.rect.center())
        else {
            return false;
        };
        self.click(center);
        true
    }

    /// Lines drawn in the last selector frame.
    #[must_use]
    pub fn last_frame(&self) -> &[DrawnLine] {
        &self.last_frame
    }

    /// Frames run so far, dialogs included.
    #[must_use]
    pub const fn frames(&self) -> u64 {
        self.frames
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

    /// Events not consumed yet.
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.pending.len()
    }

    fn run(&mut self, run_ui: impl FnMut(&Context)) {
        let input = RawInput {
            screen_rect: Some(Rect::from_min_size(
                pos2(self.viewport.x, self.viewport.y),
                vec2(self.viewport.width, self.viewport.height),
            )),
            time: Some(self.time),
            predicted_dt: FRAME_SECONDS as f32,
            events: std::mem::take(&mut self.carry),
            ..RawInput::default()
        };
        let _output = self.ctx.run(input, run_ui);
        self.time += FRAME_SECONDS;
        self.frames += 1;
    }

    fn show_dialog(&mut self, title: &str, body: &str) {
        self.run(|ctx| {
            Window::new(title)
                .id(egui::Id::new("satchel_dialog"))
                .collapsible(false)
                .resizable(false)
                .anchor(Align2::CENTER_CENTER, Vec2::ZERO)
                .show(ctx, |ui| {
                    ui.label(body);
                });
        });
    }

    fn pop_event(&mut self) -> Option<Event> {
        while let Some(event) = self.pending.pop_front() {
            if self.suppress_text {
                match event {
                    Event::Text(_) => {
                        self.suppress_text = false;
                        continue;
                    }
                    Event::Key { pressed: false, .. } => {}
                    _ => self.suppress_text = false,
                }
            }
            return Some(event);
        }
        None
    }

    fn next_dialog_key(&mut self) -> Option<DialogKey> {
        while let Some(event) = self.pop_event() {
            match event {
                Event::Key {
                    key, pressed: true, ..
                } => match key {
                    Key::Enter => return Some(DialogKey::Accept),
                    Key::Escape => return Some(DialogKey::Cancel),
                    Key::Backspace => return Some(DialogKey::Backspace),
                    _ => {}
                },
                Event::Text(text) => {
                    let mut chars = text.chars();
                    if let Some(ch) = chars.next() {
                        let rest: String = chars.collect();
                        if !rest.is_empty() {
                            self.pending.push_front(Event::Text(rest));
                        }
                        return Some(DialogKey::Char(ch));
                    }
                }
                _ => {}
            }
        }
        None
    }
}

impl UiDriver for EguiDriver {
    fn frame(&mut self, draw: &mut dyn FnMut(&mut dyn RenderSurface)) {
        let font_size = self.font_size;
        let mut lines = Vec::new();
        self.run(|ctx| {
            CentralPanel::default().show(ctx, |ui| {
                let mut surface = EguiSurface::new(ui, font_size);
                draw(&mut surface);
                lines = surface.into_lines();
            });
        });
        trace!("egui frame {} drew {} lines", self.frames, lines.len());
        self.last_frame = lines;
    }

    fn next_input(&mut self) -> InventoryInput {
        while let Some(event) = self.pop_event() {
            match event {
                Event::Key {
                    key,
                    pressed: true,
                    modifiers,
                    ..
                } => {
                    if let Some((chord, action)) = self.keymap.chord_for(key, modifiers) {
                        self.suppress_text = chord.produces_text();
                        return InventoryInput::action(action);
                    }
                    if NAVIGATION_KEYS.contains(&key) {
                        self.carry.push(Event::Key {
                            key,
                            physical_key: None,
                            pressed: true,
                            repeat: false,
                            modifiers,
                        });
                        return InventoryInput::action(Action::MouseMove);
                    }
                }
                Event::Text(text) => {
                    let mut chars = text.chars();
                    if let Some(ch) = chars.next() {
                        let rest: String = chars.collect();
                        if !rest.is_empty() {
                            self.pending.push_front(Event::Text(rest));
                        }
                        return InventoryInput::key(ch);
                    }
                }
                Event::PointerMoved(pos) => {
                    self.carry.push(Event::PointerMoved(pos));
                    return InventoryInput::action(Action::MouseMove);
                }
                Event::PointerButton {
                    pos,
                    button: PointerButton::Primary,
                    pressed: true,
                    modifiers,
                } => {
                    self.carry.push(Event::PointerButton {
                        pos,
                        button: PointerButton::Primary,
                        pressed: true,
                        modifiers,
                    });
                    return InventoryInput::action(Action::Select);
                }
                other => self.carry.push(other),
            }
        }
        debug!("Event queue exhausted after {} frames", self.frames);
        InventoryInput::action(Action::Quit)
    }

    fn notify(&mut self, message: &str) {
        info!("Notification: {message}");
        self.notifications.push(message.to_string());
        self.show_dialog("Notice", message);
        let _ack = self.next_dialog_key();
    }

    fn confirm(&mut self, question: &str) -> bool {
        self.questions.push(question.to_string());
        self.show_dialog("Confirm", &format!("{question}\n\n(Y)es / (N)o"));
        loop {
            match self.next_dialog_key() {
                Some(DialogKey::Accept | DialogKey::Char('y' | 'Y')) => return true,
                Some(DialogKey::Cancel | DialogKey::Char('n' | 'N')) | None => return false,
                Some(_) => {}
            }
        }
    }

    fn query_text(&mut self, prompt: &str, initial: &str) -> Option<String> {
        self.questions.push(prompt.to_string());
        let mut text = initial.to_string();
        loop {
            self.show_dialog("Input", &format!("{prompt}\n> {text}"));
            match self.next_dialog_key() {
                Some(DialogKey::Accept) => return Some(text),
                Some(DialogKey::Cancel) | None => return None,
                Some(DialogKey::Backspace) => {
                    text.pop();
                }
                Some(DialogKey::Char(ch)) => text.push(ch),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use satchel_common::{CharacterId, Color, Tripoint};
    use satchel_inventory::{
        Character, DefaultPreset, FocusBroker, InventoryPickSelector, Item, ItemWorld, LayoutSettings, LineSpec,
        Location, UiMode,
    };
    use std::sync::Arc;

    fn driver() -> EguiDriver {
        EguiDriver::new(Keymap::default())
    }

    fn row(key: u64, text: &str) -> LineSpec {
        LineSpec {
            key,
            interactive: true,
            ..LineSpec::text(text, Color::LightGray)
        }
    }

    #[test]
    fn test_text_becomes_key_presses() {
        let mut d = driver();
        d.type_text("ab");
        assert_eq!(d.next_input(), InventoryInput::key('a'));
        assert_eq!(d.next_input(), InventoryInput::key('b'));
        assert_eq!(d.next_input().action, Action::Quit);
    }

    #[test]
    fn test_bound_key_swallows_its_text() {
        let mut d = driver();
        d.press("Space").expect("space");
        d.press("Ctrl+W").expect("ctrl w");
        d.type_text("x");
        assert_eq!(d.next_input().action, Action::ToggleEntry);
        assert_eq!(d.next_input().action, Action::Wield);
        assert_eq!(d.next_input(), InventoryInput::key('x'));
    }

    #[test]
    fn test_confirm_answers() {
        let mut d = driver();
        d.type_text("y");
        d.press("Escape").expect("escape");
        assert!(d.confirm("Really?"));
        assert!(!d.confirm("Sure?"));
        assert!(!d.confirm("Unanswered?"));
        assert_eq!(d.questions().len(), 3);
    }

    #[test]
    fn test_query_text_edits() {
        let mut d = driver();
        d.type_text("c:foox");
        d.press("Backspace").expect("backspace");
        d.type_text("d");
        d.press("Enter").expect("enter");
        assert_eq!(d.query_text("Filter:", ""), Some("c:food".to_string()));

        d.press("Escape").expect("escape");
        assert_eq!(d.query_text("Filter:", "old"), None);
    }

    #[test]
    fn test_slash_text_does_not_leak_into_filter() {
        let mut d = driver();
        d.press("Slash").expect("slash");
        d.type_text("gun");
        d.press("Enter").expect("enter");
        assert_eq!(d.next_input().action, Action::InventoryFilter);
        assert_eq!(d.query_text("Filter:", ""), Some("gun".to_string()));
    }

    #[test]
    fn test_pointer_hover_and_click() {
        let mut d = driver();
        let draw = |s: &mut dyn RenderSurface| -> Vec<LineSpec> {
            let rows = vec![row(1, "apple"), row(2, "knife")];
            rows.into_iter().filter(|r| s.draw_line(r).hovered).collect()
        };
        let mut hovered = Vec::new();
        d.frame(&mut |s| hovered = draw(s));
        assert!(hovered.is_empty());

        assert!(d.click_line("knife"));
        assert_eq!(d.next_input().action, Action::MouseMove);
        d.frame(&mut |s| hovered = draw(s));
        assert_eq!(hovered.iter().map(|r| r.key).collect::<Vec<_>>(), vec![2]);
        assert_eq!(d.next_input().action, Action::Select);
    }

    #[test]
    fn test_drives_pick_selector() {
        let you = CharacterId::PLAYER;
        let mut world = ItemWorld::new();
        world.add_character(Character::new(you, "You", Tripoint::default()));
        world
            .spawn(Item::new("sword", "sword", "weapons"), Location::Wielded(you))
            .expect("sword");
        let hat = world
            .spawn(Item::new("hat", "hat", "clothing").with_invlet('h'), Location::Worn(you))
            .expect("hat");
        let mut pick = InventoryPickSelector::new(
            &world,
            you,
            Arc::new(DefaultPreset::default()),
            LayoutSettings::default(),
            UiMode::Categories,
            FocusBroker::shared(),
        );
        pick.selector_mut().add_character_items(&world, you);

        let mut d = driver();
        d.type_text("h");
        assert_eq!(pick.execute(&mut world, &mut d), Some(hat));
        assert!(d.frames() >= 1);
        assert!(d.last_frame().iter().any(|l| l.text.contains("sword")));
    }
}
