//! Weight, volume and holster lines of the selector header.

use satchel_common::Color;

use crate::render::TextSpan;
use crate::world::{CarryStats, ContainerStats};

/// One header stat: caption, current value, separator, maximum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatRow {
    /// Leading caption
    pub caption: String,
    /// Current value
    pub value: String,
    /// Color of the current value
    pub value_color: Color,
    /// Maximum value
    pub max: String,
}

impl StatRow {
    fn cells(&self) -> [(&str, Color); 3] {
        [
            (self.value.as_str(), self.value_color),
            ("/", Color::LightGray),
            (self.max.as_str(), Color::LightGray),
        ]
    }
}

/// The three header stats.
pub type StatsBlock = [StatRow; 3];

/// Builds a stat row; the value turns red when it exceeds the maximum.
#[must_use]
pub fn display_stat(caption: impl Into<String>, cur: u32, max: u32, fmt: impl Fn(u32) -> String) -> StatRow {
    StatRow {
        caption: caption.into(),
        value: fmt(cur),
        value_color: if cur > max { Color::Red } else { Color::LightGray },
        max: fmt(max),
    }
}

fn kilograms(grams: u32) -> String {
    format!("{:.1}", (f64::from(grams) / 100.0).ceil() / 10.0)
}

fn liters(ml: u32) -> String {
    format!("{:.2}", f64::from(ml) / 1000.0)
}

/// Weight and length, volume and free volume, holster volume and count.
#[must_use]
pub fn weight_volume_holster_stats(stats: &CarryStats) -> StatsBlock {
    [
        display_stat(
            format!("Longest Length (mm): {} Weight (kg):", stats.longest_length_mm),
            stats.weight_g,
            stats.max_weight_g,
            kilograms,
        ),
        display_stat(
            format!("Free Volume (L): {} Volume (L):", liters(stats.largest_free_volume_ml)),
            stats.volume_ml,
            stats.max_volume_ml,
            liters,
        ),
        display_stat(
            format!("Free Holster Volume (L): {} Used Holsters:", liters(stats.free_holster_volume_ml)),
            stats.used_holsters,
            stats.total_holsters,
            |v| v.to_string(),
        ),
    ]
}

impl From<ContainerStats> for CarryStats {
    fn from(c: ContainerStats) -> Self {
        Self {
            weight_g: c.contained_weight_g,
            max_weight_g: c.weight_capacity_g,
            volume_ml: c.contained_volume_ml,
            max_volume_ml: c.volume_capacity_ml,
            largest_free_volume_ml: c.max_containable_volume_ml,
            longest_length_mm: c.max_containable_length_mm,
            free_holster_volume_ml: c.holster_volume_ml.saturating_sub(c.used_holster_volume_ml),
            used_holsters: c.used_holsters,
            total_holsters: c.total_holsters,
        }
    }
}

/// Lays the rows out with every value column right-aligned.
#[must_use]
pub fn layout_stats(block: &StatsBlock) -> Vec<Vec<TextSpan>> {
    let mut lines: Vec<Vec<TextSpan>> = block
        .iter()
        .map(|row| vec![TextSpan::new(format!("{} ", row.caption), Color::LightGray)])
        .collect();
    for cell in 0..3 {
        let width = block
            .iter()
            .map(|row| row.cells()[cell].0.chars().count())
            .max()
            .unwrap_or(0);
        for (line, row) in lines.iter_mut().zip(block) {
            let (text, color) = row.cells()[cell];
            let pad = width - text.chars().count();
            if pad > 0 {
                line.push(TextSpan::new(" ".repeat(pad), Color::LightGray));
            }
            line.push(TextSpan::new(text, color));
        }
    }
    lines
}
