//! Horizontal bar charts written as an HTML page (inline SVG) and a PNG raster
//! of the same chart. PNG text uses the 8x8 bitmap glyphs from `font8x8`.

use crate::error::{ReportError, Result};
use crate::utils::{ensure_directory, save_text};
use font8x8::{UnicodeFonts, BASIC_FONTS, LATIN_FONTS};
use image::{Rgb, RgbImage};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::path::Path;

/// Plotly's qualitative Set3 palette.
const PALETTE: [[u8; 3]; 12] = [
    [0x8D, 0xD3, 0xC7],
    [0xFF, 0xFF, 0xB3],
    [0xBE, 0xBA, 0xDA],
    [0xFB, 0x80, 0x72],
    [0x80, 0xB1, 0xD3],
    [0xFD, 0xB4, 0x62],
    [0xB3, 0xDE, 0x69],
    [0xFC, 0xCD, 0xE5],
    [0xD9, 0xD9, 0xD9],
    [0xBC, 0x80, 0xBD],
    [0xCC, 0xEB, 0xC5],
    [0xFF, 0xED, 0x6F],
];

const OUTLINE: [u8; 3] = [50, 50, 50];
const GRID: [u8; 3] = [211, 211, 211];
const WHITE: [u8; 3] = [255, 255, 255];
const INK: [u8; 3] = [30, 30, 30];

const GLYPH: u32 = 8;

const MARGIN_LEFT: u32 = 150;
const MARGIN_TOP: u32 = 80;
const MARGIN_BOTTOM: u32 = 60;
const TICKS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
enum ValueLabels {
    /// `12.34%` just past the end of the bar.
    Outside,
    /// `12.3%` centred in each non-empty segment.
    Inside,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Anchor {
    Start,
    Middle,
    End,
}

#[derive(Debug, Clone)]
struct Row {
    label: String,
    /// `(palette index, value)` drawn left to right.
    segments: Vec<(usize, f64)>,
}

impl Row {
    fn total(&self) -> f64 {
        self.segments.iter().map(|(_, v)| v.max(0.0)).sum()
    }
}

/// Rows are stored bottom to top: `rows[0]` is drawn lowest.
#[derive(Debug, Clone)]
struct Chart {
    title: String,
    x_label: String,
    rows: Vec<Row>,
    legend: Vec<String>,
    labels: ValueLabels,
    width: u32,
    height: u32,
    margin_right: u32,
}

/// Bars sorted lowest to highest, the highest drawn at the top.
pub fn horizontal_bar_chart(
    data: &BTreeMap<String, f64>,
    title: &str,
    x_label: &str,
    file_stem: &str,
    output_dir: &Path,
) -> Result<()> {
    if data.is_empty() {
        return Err(ReportError::EmptyChart(title.to_string()).into());
    }

    let mut sorted: Vec<(&String, &f64)> = data.iter().collect();
    sorted.sort_by(|a, b| a.1.total_cmp(b.1));

    let rows = sorted
        .into_iter()
        .enumerate()
        .map(|(i, (label, value))| Row {
            label: label.clone(),
            segments: vec![(i, *value)],
        })
        .collect::<Vec<_>>();

    let chart = Chart {
        title: title.to_string(),
        x_label: x_label.to_string(),
        height: (rows.len() as u32 * 50 + 100).max(400),
        rows,
        legend: Vec::new(),
        labels: ValueLabels::Outside,
        width: 1200,
        margin_right: 80,
    };
    chart.write(output_dir, file_stem)
}

/// One bar per model, one stacked segment per source. Models are ordered by
/// ascending total.
pub fn stacked_bar_chart(
    data: &BTreeMap<String, BTreeMap<String, f64>>,
    title: &str,
    x_label: &str,
    file_stem: &str,
    output_dir: &Path,
) -> Result<()> {
    let sources: Vec<String> = data
        .values()
        .flat_map(|sources| sources.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if sources.is_empty() {
        return Err(ReportError::EmptyChart(title.to_string()).into());
    }

    let mut rows: Vec<Row> = data
        .iter()
        .map(|(model, by_source)| Row {
            label: model.clone(),
            segments: sources
                .iter()
                .enumerate()
                .map(|(i, source)| (i, by_source.get(source).copied().unwrap_or(0.0)))
                .collect(),
        })
        .collect();
    rows.sort_by(|a, b| a.total().total_cmp(&b.total()));

    let chart = Chart {
        title: title.to_string(),
        x_label: x_label.to_string(),
        height: (rows.len() as u32 * 60 + 150).max(400),
        rows,
        legend: sources,
        labels: ValueLabels::Inside,
        width: 1400,
        margin_right: 260,
    };
    chart.write(output_dir, file_stem)
}

impl Chart {
    fn write(&self, output_dir: &Path, file_stem: &str) -> Result<()> {
        ensure_directory(output_dir)?;
        save_text(
            &self.render_html(),
            output_dir.join(format!("{}.html", file_stem)),
        )?;
        self.render_png()
            .save(output_dir.join(format!("{}.png", file_stem)))?;
        Ok(())
    }

    fn plot_width(&self) -> f64 {
        (self.width - MARGIN_LEFT - self.margin_right) as f64
    }

    fn plot_height(&self) -> f64 {
        (self.height - MARGIN_TOP - MARGIN_BOTTOM) as f64
    }

    fn axis_max(&self) -> f64 {
        let max = self.rows.iter().map(Row::total).fold(0.0, f64::max);
        nice_ceiling(max * 1.1)
    }

    fn band(&self) -> f64 {
        self.plot_height() / self.rows.len().max(1) as f64
    }

    /// Top edge and height of the bar for `rows[index]`.
    fn bar_y(&self, index: usize) -> (f64, f64) {
        let band = self.band();
        let slot_from_top = self.rows.len() - 1 - index;
        (
            MARGIN_TOP as f64 + slot_from_top as f64 * band + band * 0.15,
            band * 0.7,
        )
    }

    fn x_for(&self, value: f64) -> f64 {
        MARGIN_LEFT as f64 + value.max(0.0) / self.axis_max() * self.plot_width()
    }

    /// `(x0, x1, palette index, value)` for each segment of `row`.
    fn segments(&self, row: &Row) -> Vec<(f64, f64, usize, f64)> {
        let mut offset = 0.0;
        row.segments
            .iter()
            .map(|&(color, value)| {
                let x0 = self.x_for(offset);
                offset += value.max(0.0);
                (x0, self.x_for(offset), color, value)
            })
            .collect()
    }

    fn render_svg(&self) -> String {
        let mut svg = String::new();
        let axis_max = self.axis_max();
        let plot_bottom = MARGIN_TOP as f64 + self.plot_height();

        let _ = write!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="Arial, sans-serif">"#,
            w = self.width,
            h = self.height
        );
        let _ = write!(
            svg,
            r#"<rect width="100%" height="100%" fill="white"/><text x="{}" y="40" font-size="18" text-anchor="middle">{}</text>"#,
            self.width / 2,
            escape_xml(&self.title)
        );

        for tick in 0..=TICKS {
            let value = axis_max * tick as f64 / TICKS as f64;
            let x = self.x_for(value);
            let _ = write!(
                svg,
                r#"<line x1="{x:.1}" y1="{top}" x2="{x:.1}" y2="{bottom:.1}" stroke="lightgray"/><text x="{x:.1}" y="{label_y:.1}" font-size="12" text-anchor="middle">{value}</text>"#,
                top = MARGIN_TOP,
                bottom = plot_bottom,
                label_y = plot_bottom + 16.0,
                value = format_tick(value)
            );
        }
        let _ = write!(
            svg,
            r#"<text x="{:.1}" y="{}" font-size="14" text-anchor="middle">{}</text>"#,
            MARGIN_LEFT as f64 + self.plot_width() / 2.0,
            self.height - 15,
            escape_xml(&self.x_label)
        );

        for (index, row) in self.rows.iter().enumerate() {
            let (y, height) = self.bar_y(index);
            let mid = y + height / 2.0;
            let _ = write!(
                svg,
                r#"<text x="{}" y="{:.1}" font-size="12" text-anchor="end" dominant-baseline="middle">{}</text>"#,
                MARGIN_LEFT - 8,
                mid,
                escape_xml(&row.label)
            );

            for (x0, x1, color, value) in self.segments(row) {
                let fill = hex(PALETTE[color % PALETTE.len()]);
                let _ = write!(
                    svg,
                    r#"<rect x="{x0:.1}" y="{y:.1}" width="{:.1}" height="{height:.1}" fill="{fill}" stroke="rgba(50, 50, 50, 0.8)" stroke-width="1"/>"#,
                    (x1 - x0).max(0.0)
                );
                if self.labels == ValueLabels::Inside && value > 0.0 && x1 - x0 > 36.0 {
                    let _ = write!(
                        svg,
                        r#"<text x="{:.1}" y="{mid:.1}" font-size="11" text-anchor="middle" dominant-baseline="middle">{value:.1}%</text>"#,
                        (x0 + x1) / 2.0
                    );
                }
            }

            if self.labels == ValueLabels::Outside {
                let end = self.x_for(row.total());
                let _ = write!(
                    svg,
                    r#"<text x="{:.1}" y="{mid:.1}" font-size="12" dominant-baseline="middle">{:.2}%</text>"#,
                    end + 4.0,
                    row.segments.first().map(|(_, v)| *v).unwrap_or(0.0)
                );
            }
        }

        let legend_x = self.width - self.margin_right + 20;
        for (i, name) in self.legend.iter().enumerate() {
            let y = MARGIN_TOP + i as u32 * 22;
            let _ = write!(
                svg,
                r#"<rect x="{legend_x}" y="{y}" width="14" height="14" fill="{}"/><text x="{}" y="{}" font-size="12">{}</text>"#,
                hex(PALETTE[i % PALETTE.len()]),
                legend_x + 20,
                y + 12,
                escape_xml(name)
            );
        }

        svg.push_str("</svg>");
        svg
    }

    fn render_html(&self) -> String {
        format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body style=\"margin:0;background:white\">\n{}\n</body>\n</html>\n",
            escape_xml(&self.title),
            self.render_svg()
        )
    }

    fn render_png(&self) -> RgbImage {
        let mut img = RgbImage::from_pixel(self.width, self.height, Rgb(WHITE));
        let axis_max = self.axis_max();
        let plot_bottom = MARGIN_TOP as f64 + self.plot_height();

        draw_text(&mut img, &self.title, self.width as f64 / 2.0, 36.0, 2, Anchor::Middle);

        for tick in 0..=TICKS {
            let value = axis_max * tick as f64 / TICKS as f64;
            let x = self.x_for(value);
            fill_rect(&mut img, x, MARGIN_TOP as f64, x + 1.0, plot_bottom, GRID);
            draw_text(&mut img, &format_tick(value), x, plot_bottom + 14.0, 1, Anchor::Middle);
        }
        draw_text(
            &mut img,
            &self.x_label,
            MARGIN_LEFT as f64 + self.plot_width() / 2.0,
            (self.height - 18) as f64,
            1,
            Anchor::Middle,
        );

        for (index, row) in self.rows.iter().enumerate() {
            let (y, height) = self.bar_y(index);
            let mid = y + height / 2.0;
            draw_text(&mut img, &row.label, (MARGIN_LEFT - 8) as f64, mid, 1, Anchor::End);

            for (x0, x1, color, value) in self.segments(row) {
                fill_rect(&mut img, x0, y, x1, y + height, OUTLINE);
                fill_rect(
                    &mut img,
                    x0 + 1.0,
                    y + 1.0,
                    x1 - 1.0,
                    y + height - 1.0,
                    PALETTE[color % PALETTE.len()],
                );
                let label = format!("{:.1}%", value);
                if self.labels == ValueLabels::Inside
                    && value > 0.0
                    && x1 - x0 > text_width(&label, 1) + 4.0
                {
                    draw_text(&mut img, &label, (x0 + x1) / 2.0, mid, 1, Anchor::Middle);
                }
            }

            if self.labels == ValueLabels::Outside {
                let value = row.segments.first().map(|(_, v)| *v).unwrap_or(0.0);
                draw_text(
                    &mut img,
                    &format!("{:.2}%", value),
                    self.x_for(row.total()) + 4.0,
                    mid,
                    1,
                    Anchor::Start,
                );
            }
        }

        let legend_x = (self.width - self.margin_right + 20) as f64;
        for (i, name) in self.legend.iter().enumerate() {
            let y = (MARGIN_TOP + i as u32 * 22) as f64;
            fill_rect(
                &mut img,
                legend_x,
                y,
                legend_x + 14.0,
                y + 14.0,
                PALETTE[i % PALETTE.len()],
            );
            draw_text(&mut img, name, legend_x + 20.0, y + 7.0, 1, Anchor::Start);
        }

        img
    }
}

fn glyph(c: char) -> [u8; 8] {
    BASIC_FONTS
        .get(c)
        .or_else(|| LATIN_FONTS.get(c))
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

fn text_width(text: &str, scale: u32) -> f64 {
    (text.chars().count() as u32 * GLYPH * scale) as f64
}

/// Draws `text` vertically centred on `mid_y`. Pixels outside the image are
/// clipped.
fn draw_text(img: &mut RgbImage, text: &str, x: f64, mid_y: f64, scale: u32, anchor: Anchor) {
    let width = text_width(text, scale);
    let left = match anchor {
        Anchor::Start => x,
        Anchor::Middle => x - width / 2.0,
        Anchor::End => x - width,
    }
    .round() as i64;
    let top = (mid_y - (GLYPH * scale) as f64 / 2.0).round() as i64;
    let scale = scale as i64;

    for (n, c) in text.chars().enumerate() {
        let origin = left + n as i64 * GLYPH as i64 * scale;
        for (row, bits) in glyph(c).iter().enumerate() {
            for col in 0..GLYPH as i64 {
                if bits & (1 << col) == 0 {
                    continue;
                }
                for dy in 0..scale {
                    for dx in 0..scale {
                        let px = origin + col * scale + dx;
                        let py = top + row as i64 * scale + dy;
                        if px >= 0
                            && py >= 0
                            && px < img.width() as i64
                            && py < img.height() as i64
                        {
                            img.put_pixel(px as u32, py as u32, Rgb(INK));
                        }
                    }
                }
            }
        }
    }
}

fn fill_rect(img: &mut RgbImage, x0: f64, y0: f64, x1: f64, y1: f64, color: [u8; 3]) {
    let clamp_x = |v: f64| v.round().clamp(0.0, img.width() as f64) as u32;
    let clamp_y = |v: f64| v.round().clamp(0.0, img.height() as f64) as u32;
    let (x0, x1, y0, y1) = (clamp_x(x0), clamp_x(x1), clamp_y(y0), clamp_y(y1));
    for y in y0..y1 {
        for x in x0..x1 {
            img.put_pixel(x, y, Rgb(color));
        }
    }
}

/// Smallest of 1, 2, 5 × 10^k that is at least `value`.
fn nice_ceiling(value: f64) -> f64 {
    if !value.is_finite() || value <= 0.0 {
        return 1.0;
    }
    let magnitude = 10f64.powf(value.log10().floor());
    [1.0, 2.0, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|candidate| *candidate >= value)
        .unwrap_or(10.0 * magnitude)
}

fn format_tick(value: f64) -> String {
    if value.fract().abs() < 1e-9 {
        format!("{:.0}", value)
    } else {
        format!("{:.1}", value)
    }
}

fn hex(color: [u8; 3]) -> String {
    format!("#{:02X}{:02X}{:02X}", color[0], color[1], color[2])
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
