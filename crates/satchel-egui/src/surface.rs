//! `RenderSurface` over an `egui::Ui`.
//!
//! Every line becomes a monospace label keyed by its `LineSpec::key`, so
//! widget ids and therefore keyboard focus survive re-layouts. Columns are
//! child uis placed side by side below the header.

use egui::text::LayoutJob;
use egui::{pos2, vec2, Align, Color32, FontId, Label, Layout, Rect, RichText, Sense, TextFormat, Ui, UiBuilder};
use satchel_common::Color;
use satchel_inventory::{Align as LineAlign, Bounds, LineResponse, LineSpec, RenderSurface};

/// Narrowest column drawn.
pub const MIN_COLUMN_WIDTH: f32 = 160.0;

/// Space between columns.
pub const COLUMN_GAP: f32 = 16.0;

/// Converts a palette color.
#[must_use]
pub fn color32(color: Color) -> Color32 {
    let [r, g, b, a] = color.rgba();
    Color32::from_rgba_unmultiplied(r, g, b, a)
}

/// What was drawn for one line.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawnLine {
    /// Line key
    pub key: u64,
    /// Plain text
    pub text: String,
    /// Screen rectangle of the main label
    pub rect: Rect,
}

/// Draws selector lines into an egui ui.
pub struct EguiSurface<'a> {
    ui: &'a mut Ui,
    column: Option<Ui>,
    column_width: f32,
    columns_top: Option<f32>,
    columns_bottom: f32,
    next_x: f32,
    font: FontId,
    lines: Vec<DrawnLine>,
}

impl<'a> EguiSurface<'a> {
    /// Wraps `ui`, drawing text at `font_size` points.
    pub fn new(ui: &'a mut Ui, font_size: f32) -> Self {
        Self {
            ui,
            column: None,
            column_width: 0.0,
            columns_top: None,
            columns_bottom: 0.0,
            next_x: 0.0,
            font: FontId::monospace(font_size),
            lines: Vec::new(),
        }
    }

    /// Lines drawn so far, in order.
    #[must_use]
    pub fn lines(&self) -> &[DrawnLine] {
        &self.lines
    }

    /// Consumes the surface, returning what was drawn.
    #[must_use]
    pub fn into_lines(self) -> Vec<DrawnLine> {
        self.lines
    }

    fn target(&mut self) -> &mut Ui {
        if self.column.is_none() && self.columns_top.take().is_some() {
            let gap = self.columns_bottom - self.ui.cursor().min.y;
            if gap > 0.0 {
                self.ui.add_space(gap);
            }
            self.next_x = 0.0;
        }
        match self.column.as_mut() {
            Some(column) => column,
            None => &mut *self.ui,
        }
    }

    fn layout_job(&self, line: &LineSpec) -> LayoutJob {
        let mut job = LayoutJob::default();
        if line.indent > 0 {
            job.append(
                &" ".repeat(line.indent),
                0.0,
                TextFormat::simple(self.font.clone(), Color32::TRANSPARENT),
            );
        }
        for span in &line.spans {
            job.append(&span.text, 0.0, TextFormat::simple(self.font.clone(), color32(span.color)));
        }
        if line.max_width > 0.0 {
            job.wrap.max_width = line.max_width;
            job.wrap.max_rows = 1;
            job.wrap.break_anywhere = true;
        }
        job
    }
}

impl RenderSurface for EguiSurface<'_> {
    fn draw_line(&mut self, line: &LineSpec) -> LineResponse {
        let job = self.layout_job(line);
        let font = self.font.clone();
        let sense = if line.interactive { Sense::click() } else { Sense::hover() };
        let ui = self.target();
        let response = ui
            .push_id(line.key, |ui| {
                ui.horizontal(|ui| {
                    let label = Label::new(job).sense(sense).selectable(false);
                    let main = match line.align {
                        LineAlign::Left => ui.add(label),
                        LineAlign::Center => {
                            ui.with_layout(Layout::centered_and_justified(egui::Direction::LeftToRight), |ui| {
                                ui.add(label)
                            })
                            .inner
                        }
                        LineAlign::Right => {
                            ui.with_layout(Layout::right_to_left(Align::Center), |ui| ui.add(label))
                                .inner
                        }
                    };
                    if !line.right_cells.is_empty() {
                        ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                            for cell in line.right_cells.iter().rev() {
                                let text = RichText::new(&cell.text).font(font.clone()).color(color32(cell.color));
                                ui.add_sized([cell.width, ui.available_height()], Label::new(text));
                            }
                        });
                    }
                    main
                })
                .inner
            })
            .inner;

        if line.request_focus {
            response.request_focus();
        }
        self.lines.push(DrawnLine {
            key: line.key,
            text: line.plain_text(),
            rect: response.rect,
        });
        LineResponse {
            focused: line.interactive && response.has_focus(),
            hovered: line.interactive && response.hovered(),
            clicked: response.clicked(),
        }
    }

    fn viewport(&self) -> Bounds {
        let rect = self.ui.ctx().screen_rect();
        Bounds {
            x: rect.min.x,
            y: rect.min.y,
            width: rect.width(),
            height: rect.height(),
        }
    }

    fn begin_column(&mut self, _index: usize, width: f32) {
        self.end_column();
        let top = *self.columns_top.get_or_insert(self.ui.cursor().min.y);
        let bounds = self.ui.max_rect();
        let width = width.max(MIN_COLUMN_WIDTH);
        let rect = Rect::from_min_size(
            pos2(bounds.min.x + self.next_x, top),
            vec2(width, (bounds.max.y - top).max(0.0)),
        );
        self.column = Some(
            self.ui
                .new_child(UiBuilder::new().max_rect(rect).layout(Layout::top_down(Align::Min))),
        );
        self.column_width = width;
    }

    fn end_column(&mut self) {
        if let Some(column) = self.column.take() {
            self.columns_bottom = self.columns_bottom.max(column.min_rect().max.y);
            self.next_x += self.column_width + COLUMN_GAP;
        }
    }

    fn separator(&mut self) {
        self.target().separator();
    }
}
