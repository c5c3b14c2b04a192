//! Dashboard overlay: status bar, system panel, detection list and help bar
//!
//! Layout is computed first into plain data ([`Dashboard`]) and then drawn,
//! so the textual content of every frame can be checked without pixels.

use crate::font::text_size;
use crate::image_utils::{draw_dot, draw_hline, draw_rect, draw_text, fill_rect};
use crate::palette::{
    ppe_color, COLOR_ACCENT, COLOR_BG_DARK, COLOR_SAFE, COLOR_TEXT, COLOR_TEXT_DIM, COLOR_UNSAFE,
};
use crate::types::Detection;
use image::{Rgb, RgbImage};
use std::collections::BTreeMap;

pub const STATUS_BAR_HEIGHT: i32 = 60;
pub const PANEL_WIDTH: i32 = 320;
pub const BOTTOM_BAR_HEIGHT: i32 = 50;
pub const HELP_TEXT: &str = "Q-Quit  S-Save  +/-Conf  SPACE-Pause";
pub const MODEL_TAG: &str = "LOCAL MODEL";

const PANEL_MARGIN: i32 = 20;
const PANEL_LINE_HEIGHT: i32 = 35;
const CATEGORY_LINE_HEIGHT: i32 = 30;

/// Top bar content, driven only by this frame's detection count
#[derive(Debug, Clone, PartialEq)]
pub struct StatusBar {
    pub text: String,
    pub color: Rgb<u8>,
}

impl StatusBar {
    pub fn for_count(count: usize) -> Self {
        if count > 0 {
            Self {
                text: format!("ACTIVE: {} items", count),
                color: COLOR_SAFE,
            }
        } else {
            Self {
                text: "MONITORING".to_string(),
                color: COLOR_UNSAFE,
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.color == COLOR_SAFE
    }
}

/// Values shown in the "SYSTEM STATUS" panel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelStats {
    pub fps: f64,
    pub frame_count: u64,
    pub elapsed_secs: f64,
    pub confidence_threshold: f32,
}

impl PanelStats {
    /// Label/value rows in display order
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("FPS", format!("{:.0}", self.fps)),
            ("Frames", format!("{}", self.frame_count)),
            ("Time", format!("{:.0}s", self.elapsed_secs)),
            ("Conf", format!("{:.0}%", self.confidence_threshold * 100.0)),
        ]
    }
}

/// One row of the per-category breakdown
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRow {
    /// Label exactly as reported by the model (grouping key)
    pub label: String,
    /// Title-cased label used for display
    pub display_label: String,
    pub count: usize,
    pub color: Rgb<u8>,
}

/// Group detections by exact label, sorted ascending by label
pub fn category_rows(detections: &[Detection]) -> Vec<CategoryRow> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for det in detections {
        *counts.entry(det.label.as_str()).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .map(|(label, count)| CategoryRow {
            label: label.to_string(),
            display_label: title_case(label),
            count,
            color: ppe_color(label),
        })
        .collect()
}

/// Uppercase the first letter of every alphabetic run, lowercase the rest
///
/// `"NO-Safety vest"` becomes `"No-Safety Vest"`.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;

    for ch in text.chars() {
        if ch.is_alphabetic() {
            if in_word {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(ch);
            in_word = false;
        }
    }

    out
}

/// Everything drawn on top of a frame besides the detection boxes
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub status: StatusBar,
    pub panel: PanelStats,
    pub categories: Vec<CategoryRow>,
}

impl Dashboard {
    pub fn build(detections: &[Detection], panel: PanelStats) -> Self {
        Self {
            status: StatusBar::for_count(detections.len()),
            panel,
            categories: category_rows(detections),
        }
    }

    /// Draw in fixed z-order: status bar, panel, detection list, bottom bar
    pub fn draw(&self, frame: &mut RgbImage) {
        let w = frame.width() as i32;
        let h = frame.height() as i32;

        self.draw_status_bar(frame, w);
        let y = self.draw_panel(frame, w, h);
        if !self.categories.is_empty() {
            self.draw_categories(frame, w, y);
        }
        draw_bottom_bar(frame, w, h);
    }

    fn draw_status_bar(&self, frame: &mut RgbImage, w: i32) {
        fill_rect(frame, 0, 0, w, STATUS_BAR_HEIGHT, self.status.color);
        text_at_baseline(frame, &self.status.text, 20, 40, 3, COLOR_TEXT);
    }

    /// Returns the baseline where the detection list starts
    fn draw_panel(&self, frame: &mut RgbImage, w: i32, h: i32) -> i32 {
        let panel_x = w - PANEL_WIDTH;
        let panel_y = STATUS_BAR_HEIGHT + PANEL_MARGIN;
        let panel_right = w - PANEL_MARGIN;
        let panel_bottom = h - 80;

        fill_rect(frame, panel_x, panel_y, panel_right, panel_bottom, COLOR_BG_DARK);
        draw_rect(frame, panel_x, panel_y, panel_right, panel_bottom, COLOR_ACCENT, 2);

        let mut y = panel_y + 40;
        text_at_baseline(frame, "SYSTEM STATUS", panel_x + 20, y, 2, COLOR_ACCENT);

        y += PANEL_LINE_HEIGHT + 10;
        draw_hline(frame, panel_x + 20, w - 40, y - 5, COLOR_ACCENT, 1);

        for (label, value) in self.panel.rows() {
            text_at_baseline(frame, label, panel_x + 20, y, 2, COLOR_TEXT_DIM);
            text_at_baseline(frame, &value, panel_x + 180, y, 2, COLOR_TEXT);
            y += PANEL_LINE_HEIGHT;
        }

        y
    }

    fn draw_categories(&self, frame: &mut RgbImage, w: i32, mut y: i32) {
        let panel_x = w - PANEL_WIDTH;

        y += 20;
        draw_hline(frame, panel_x + 20, w - 40, y - 10, COLOR_ACCENT, 1);
        text_at_baseline(frame, "DETECTIONS", panel_x + 20, y + 10, 2, COLOR_ACCENT);
        y += 50;

        for row in &self.categories {
            draw_dot(frame, panel_x + 30, y - 5, 6, row.color, COLOR_TEXT);
            text_at_baseline(frame, &row.display_label, panel_x + 50, y, 2, COLOR_TEXT);
            text_at_baseline(
                frame,
                &format!("x{}", row.count),
                panel_x + 240,
                y,
                2,
                COLOR_ACCENT,
            );
            y += CATEGORY_LINE_HEIGHT;
        }
    }
}

fn draw_bottom_bar(frame: &mut RgbImage, w: i32, h: i32) {
    fill_rect(frame, 0, h - BOTTOM_BAR_HEIGHT, w, h, COLOR_BG_DARK);
    draw_hline(frame, 0, w, h - BOTTOM_BAR_HEIGHT, COLOR_ACCENT, 2);
    text_at_baseline(frame, HELP_TEXT, 20, h - 15, 2, COLOR_TEXT_DIM);
    text_at_baseline(frame, MODEL_TAG, w - 180, h - 15, 2, COLOR_ACCENT);
}

/// Centered "PAUSED" placard
pub fn draw_pause_overlay(frame: &mut RgbImage) {
    let cx = frame.width() as i32 / 2;
    let cy = frame.height() as i32 / 2;

    fill_rect(frame, cx - 100, cy - 40, cx + 100, cy + 40, COLOR_BG_DARK);
    draw_rect(frame, cx - 100, cy - 40, cx + 100, cy + 40, COLOR_ACCENT, 3);

    let (tw, th) = text_size("PAUSED", 4);
    draw_text(
        frame,
        "PAUSED",
        cx - tw as i32 / 2,
        cy - th as i32 / 2,
        4,
        COLOR_TEXT,
        None,
    );
}

/// Draw text whose bottom edge sits on `baseline`
pub fn text_at_baseline(
    frame: &mut RgbImage,
    text: &str,
    x: i32,
    baseline: i32,
    scale: u32,
    color: Rgb<u8>,
) {
    let (_, th) = text_size(text, scale);
    draw_text(frame, text, x, baseline - th as i32, scale, color, None);
}
