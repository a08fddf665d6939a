//! Figure builders: each returns a complete SVG document.
//!
//! Grid figures split the canvas into a 2x2 layout under a bold title.
//! Panels past the number of columns are left blank.

use super::canvas::Canvas;
use super::style::{self, Anchor, Color, LineStyle, Style, TextStyle};
use crate::analysis::statistics::{Bin, pearson};

/// Figure size in points (10in x 6.67in).
pub const FIGURE_WIDTH: f64 = 720.0;
pub const FIGURE_HEIGHT: f64 = 480.0;

const TITLE_BAND: f64 = 36.0;
const GRID_COLUMNS: usize = 2;
const GRID_ROWS: usize = 2;

/// Longest category label drawn under a bar before truncation.
const MAX_LABEL_CHARS: usize = 14;

/// Rectangle in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotArea {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl PlotArea {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Shrink by the given margins.
    fn inset(&self, left: f64, top: f64, right: f64, bottom: f64) -> PlotArea {
        PlotArea {
            left: self.left + left,
            top: self.top + top,
            width: (self.width - left - right).max(1.0),
            height: (self.height - top - bottom).max(1.0),
        }
    }
}

/// Cells of the 2x2 grid below the figure title, row-major.
pub fn grid_cells() -> Vec<PlotArea> {
    let cell_w = FIGURE_WIDTH / GRID_COLUMNS as f64;
    let cell_h = (FIGURE_HEIGHT - TITLE_BAND) / GRID_ROWS as f64;

    (0..GRID_ROWS * GRID_COLUMNS)
        .map(|i| PlotArea {
            left: (i % GRID_COLUMNS) as f64 * cell_w,
            top: TITLE_BAND + (i / GRID_COLUMNS) as f64 * cell_h,
            width: cell_w,
            height: cell_h,
        })
        .collect()
}

/// Data for one histogram panel.
pub struct HistogramPanel<'a> {
    pub column: &'a str,
    pub bins: Vec<Bin>,
}

/// Data for one bar panel; `None` leaves the panel empty.
pub struct BarPanel<'a> {
    pub column: &'a str,
    pub counts: Option<Vec<(String, usize)>>,
}

/// "Numerical Data Distributions": one histogram per column.
pub fn numeric_distributions(panels: &[HistogramPanel<'_>]) -> String {
    let mut canvas = Canvas::new(FIGURE_WIDTH, FIGURE_HEIGHT);
    draw_figure_title(&mut canvas, "Numerical Data Distributions");

    for (panel, cell) in panels.iter().zip(grid_cells()) {
        draw_histogram(&mut canvas, cell, panel);
    }

    canvas.finish_svg()
}

/// "Categorical Data Analysis": one bar chart per column.
pub fn categorical_analysis(panels: &[BarPanel<'_>]) -> String {
    let mut canvas = Canvas::new(FIGURE_WIDTH, FIGURE_HEIGHT);
    draw_figure_title(&mut canvas, "Categorical Data Analysis");

    for (panel, cell) in panels.iter().zip(grid_cells()) {
        if let Some(counts) = &panel.counts {
            draw_bars(&mut canvas, cell, panel.column, counts);
        }
    }

    canvas.finish_svg()
}

/// Pairwise-complete Pearson matrix. `None` where the coefficient is undefined.
pub fn correlation_matrix(columns: &[Vec<Option<f64>>]) -> Vec<Vec<Option<f64>>> {
    let n = columns.len();
    (0..n)
        .map(|i| {
            (0..n)
                .map(|j| {
                    if i == j {
                        Some(1.0)
                    } else {
                        pearson(&columns[i], &columns[j])
                    }
                })
                .collect()
        })
        .collect()
}

/// Lower-triangular correlation heatmap with two-decimal annotations.
pub fn correlation_heatmap(names: &[String], matrix: &[Vec<Option<f64>>]) -> String {
    let mut canvas = Canvas::new(FIGURE_WIDTH, FIGURE_HEIGHT);
    draw_figure_title(&mut canvas, "Correlation Matrix of Numerical Variables");

    let n = names.len();
    if n < 2 {
        return canvas.finish_svg();
    }

    // The diagonal and upper triangle are masked, so row 0 and the last
    // column never hold a cell.
    let shown = n - 1;
    let label_margin = 110.0;
    let colorbar_w = 16.0;
    let side = (FIGURE_HEIGHT - TITLE_BAND - label_margin - 10.0)
        .min(FIGURE_WIDTH - 2.0 * label_margin - colorbar_w - 60.0);
    let cell = side / shown as f64;
    let area = PlotArea {
        left: (FIGURE_WIDTH - side - colorbar_w - 60.0) / 2.0 + 40.0,
        top: TITLE_BAND + 10.0,
        width: side,
        height: side,
    };

    let font = (cell * 0.28).clamp(5.0, 11.0);
    for row in 1..n {
        for col in 0..row {
            let x = area.left + col as f64 * cell;
            let y = area.top + (row - 1) as f64 * cell;
            let value = matrix.get(row).and_then(|r| r.get(col)).copied().flatten();

            let (fill, label) = match value {
                Some(v) => (style::coolwarm(v), format!("{v:.2}")),
                None => (Color::rgb(240, 240, 240), "n/a".to_string()),
            };
            canvas.rect(x, y, cell, cell, &Style::outlined(fill, Color::WHITE, 1.0));

            let text_color = match value {
                Some(v) if v.abs() > 0.6 => Color::WHITE,
                _ => Color::BLACK,
            };
            canvas.text(
                x + cell / 2.0,
                y + cell / 2.0 + font * 0.35,
                &label,
                &TextStyle::sized(font)
                    .anchored(Anchor::Middle)
                    .colored(text_color),
            );
        }
    }

    let label_style = TextStyle::sized(8.0).anchored(Anchor::End);
    for (i, name) in names.iter().enumerate().skip(1) {
        let y = area.top + (i as f64 - 0.5) * cell + 3.0;
        canvas.text(area.left - 4.0, y, &truncate_label(name), &label_style);
    }
    for (i, name) in names.iter().enumerate().take(shown) {
        let x = area.left + (i as f64 + 0.5) * cell;
        canvas.text_rotated(
            x,
            area.bottom() + 8.0,
            &truncate_label(name),
            &label_style,
            -45.0,
        );
    }

    // Colorbar, +1 at the top
    let cb_x = area.right() + 20.0;
    let steps = 50;
    let step_h = side / steps as f64;
    for i in 0..steps {
        let val = 1.0 - 2.0 * i as f64 / (steps - 1) as f64;
        let y = area.top + i as f64 * step_h;
        canvas.rect(
            cb_x,
            y,
            colorbar_w,
            step_h + 0.5,
            &Style::filled(style::coolwarm(val)),
        );
    }
    let tick_style = TextStyle::sized(8.0);
    canvas.text(cb_x + colorbar_w + 3.0, area.top + 3.0, "1.0", &tick_style);
    canvas.text(
        cb_x + colorbar_w + 3.0,
        area.top + side / 2.0 + 3.0,
        "0.0",
        &tick_style,
    );
    canvas.text(cb_x + colorbar_w + 3.0, area.bottom() + 3.0, "-1.0", &tick_style);
    canvas.text_rotated(
        cb_x + colorbar_w + 28.0,
        area.top + side / 2.0,
        "Correlation Coefficient",
        &TextStyle::sized(9.0).anchored(Anchor::Middle),
        90.0,
    );

    canvas.finish_svg()
}

fn draw_figure_title(canvas: &mut Canvas, title: &str) {
    canvas.text(
        FIGURE_WIDTH / 2.0,
        24.0,
        title,
        &TextStyle::sized(16.0)
            .bold()
            .anchored(Anchor::Middle)
            .colored(style::TITLE_COLOR),
    );
}

fn draw_histogram(canvas: &mut Canvas, cell: PlotArea, panel: &HistogramPanel<'_>) {
    let area = cell.inset(52.0, 26.0, 16.0, 38.0);
    draw_panel_title(canvas, cell, &format!("{} Distribution", panel.column));

    let (Some(first), Some(last)) = (panel.bins.first(), panel.bins.last()) else {
        return;
    };
    let (x_min, x_max) = (first.lower, last.upper);
    let max_count = panel.bins.iter().map(|b| b.count).max().unwrap_or(0);
    let y_ticks = nice_ticks(0.0, max_count.max(1) as f64, 5);
    let y_max = y_ticks.last().copied().unwrap_or(1.0).max(1.0);

    draw_y_axis(canvas, area, &y_ticks, y_max, "Frequency");

    let to_x = |v: f64| area.left + (v - x_min) / (x_max - x_min) * area.width;
    let bar_style = Style::outlined(style::SKY_BLUE.with_alpha(0.7), Color::BLACK, 0.5);
    for bin in &panel.bins {
        if bin.count == 0 {
            continue;
        }
        let h = bin.count as f64 / y_max * area.height;
        let x0 = to_x(bin.lower);
        canvas.rect(x0, area.bottom() - h, to_x(bin.upper) - x0, h, &bar_style);
    }

    let tick_style = TextStyle::sized(7.5).anchored(Anchor::Middle);
    let axis = LineStyle::solid(Color::BLACK, 0.8);
    for tick in nice_ticks(x_min, x_max, 5) {
        if tick < x_min || tick > x_max {
            continue;
        }
        let x = to_x(tick);
        canvas.line(x, area.bottom(), x, area.bottom() + 3.0, &axis);
        canvas.text(x, area.bottom() + 12.0, &format_tick(tick), &tick_style);
    }
    canvas.line(area.left, area.bottom(), area.right(), area.bottom(), &axis);

    canvas.text(
        area.left + area.width / 2.0,
        area.bottom() + 26.0,
        &truncate_label(panel.column),
        &TextStyle::sized(8.5).anchored(Anchor::Middle),
    );
}

fn draw_bars(canvas: &mut Canvas, cell: PlotArea, column: &str, counts: &[(String, usize)]) {
    let area = cell.inset(52.0, 26.0, 16.0, 58.0);
    draw_panel_title(canvas, cell, &format!("{column} Distribution"));

    if counts.is_empty() {
        return;
    }

    let max_count = counts.iter().map(|(_, c)| *c).max().unwrap_or(0);
    let y_ticks = nice_ticks(0.0, max_count.max(1) as f64, 5);
    let y_max = y_ticks.last().copied().unwrap_or(1.0).max(1.0);
    draw_y_axis(canvas, area, &y_ticks, y_max, "Count");

    let slot = area.width / counts.len() as f64;
    let label_style = TextStyle::sized(7.0).anchored(Anchor::End);
    for (i, (label, count)) in counts.iter().enumerate() {
        let t = if counts.len() > 1 {
            0.3 + 0.6 * i as f64 / (counts.len() - 1) as f64
        } else {
            0.6
        };
        let h = *count as f64 / y_max * area.height;
        let x = area.left + slot * (i as f64 + 0.1);
        canvas.rect(
            x,
            area.bottom() - h,
            slot * 0.8,
            h,
            &Style::outlined(style::blues(t).with_alpha(0.85), Color::BLACK, 0.5),
        );

        let cx = area.left + slot * (i as f64 + 0.5);
        canvas.text_rotated(
            cx,
            area.bottom() + 9.0,
            &truncate_label(label),
            &label_style,
            -45.0,
        );
    }

    canvas.line(
        area.left,
        area.bottom(),
        area.right(),
        area.bottom(),
        &LineStyle::solid(Color::BLACK, 0.8),
    );
}

fn draw_panel_title(canvas: &mut Canvas, cell: PlotArea, title: &str) {
    canvas.text(
        cell.left + cell.width / 2.0,
        cell.top + 16.0,
        title,
        &TextStyle::sized(10.0).bold().anchored(Anchor::Middle),
    );
}

/// Left axis with light horizontal grid lines at each tick.
fn draw_y_axis(canvas: &mut Canvas, area: PlotArea, ticks: &[f64], y_max: f64, label: &str) {
    let grid = LineStyle::solid(style::GRID_GRAY.with_alpha(0.3), 0.5);
    let axis = LineStyle::solid(Color::BLACK, 0.8);
    let tick_style = TextStyle::sized(7.5).anchored(Anchor::End);

    for &tick in ticks {
        let y = area.bottom() - tick / y_max * area.height;
        canvas.line(area.left, y, area.right(), y, &grid);
        canvas.line(area.left - 3.0, y, area.left, y, &axis);
        canvas.text(area.left - 5.0, y + 2.5, &format_tick(tick), &tick_style);
    }
    canvas.line(area.left, area.top, area.left, area.bottom(), &axis);

    canvas.text_rotated(
        area.left - 36.0,
        area.top + area.height / 2.0,
        label,
        &TextStyle::sized(8.5).anchored(Anchor::Middle),
        -90.0,
    );
}

/// Round tick positions covering `[min, max]` with steps of 1, 2 or 5 x 10^k.
pub fn nice_ticks(min: f64, max: f64, target: usize) -> Vec<f64> {
    if !min.is_finite() || !max.is_finite() || max <= min || target == 0 {
        return vec![min];
    }

    let raw = (max - min) / target as f64;
    let magnitude = 10f64.powf(raw.log10().floor());
    let step = [1.0, 2.0, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|s| *s >= raw)
        .unwrap_or(10.0 * magnitude);

    let start = (min / step).floor() * step;
    let mut ticks = Vec::new();
    for i in 0..=target * 3 {
        let tick = start + i as f64 * step;
        if tick >= max + step * 0.999 {
            break;
        }
        ticks.push(if tick.abs() < step * 1e-9 { 0.0 } else { tick });
    }
    ticks
}

/// Compact tick label.
pub fn format_tick(v: f64) -> String {
    let abs = v.abs();
    if abs != 0.0 && !(1e-2..1e6).contains(&abs) {
        return format!("{v:.1e}");
    }
    let text = format!("{v:.2}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

fn truncate_label(label: &str) -> String {
    if label.chars().count() <= MAX_LABEL_CHARS {
        label.to_string()
    } else {
        let head: String = label.chars().take(MAX_LABEL_CHARS - 1).collect();
        format!("{head}…")
    }
}
