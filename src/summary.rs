//! Renders the PNG summary of the current country set.
//!
//! - Fixed 800×600 layout on a dark background
//! - Total count, top five by estimated GDP, and the latest refresh time
//! - Written to `<cache_dir>/summary.png`, overwriting the previous file

use crate::core::country::Country;
use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use num_format::{Locale, ToFormattedString};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{FontFamily, FontStyle};
use plotters_bitmap::BitMapBackend;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

pub const SUMMARY_WIDTH: u32 = 800;
pub const SUMMARY_HEIGHT: u32 = 600;
pub const SUMMARY_FILE: &str = "summary.png";
pub const TOP_COUNT: usize = 5;

const BACKGROUND: RGBColor = RGBColor(0x1a, 0x1a, 0x1a);
const ACCENT: RGBColor = RGBColor(0x00, 0xff, 0xcc);
const MUTED: RGBColor = RGBColor(0xaa, 0xaa, 0xaa);

/// Everything the renderer draws, computed from the country rows.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryData {
    pub total: usize,
    /// `(name, estimated_gdp)` in descending GDP order.
    pub top: Vec<(String, f64)>,
    pub last_refreshed_at: DateTime<Utc>,
}

impl SummaryData {
    pub fn from_countries(countries: &[Country]) -> Self {
        SummaryData {
            total: countries.len(),
            top: top_by_gdp(countries, TOP_COUNT)
                .into_iter()
                .filter_map(|c| c.estimated_gdp.map(|gdp| (c.name.clone(), gdp)))
                .collect(),
            last_refreshed_at: latest_refresh(countries),
        }
    }

    /// The text lines in drawing order.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            "Global Country Summary".to_string(),
            format!("Total Countries: {}", self.total),
            "Top 5 by Estimated GDP:".to_string(),
        ];
        lines.extend(
            self.top
                .iter()
                .enumerate()
                .map(|(i, (name, gdp))| format!("{}. {} - {}", i + 1, name, format_usd(*gdp))),
        );
        lines.push(format!(
            "Last Refresh: {}",
            self.last_refreshed_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        lines
    }
}

/// Countries with a GDP estimate, highest first, at most `n`.
pub fn top_by_gdp(countries: &[Country], n: usize) -> Vec<&Country> {
    let mut ranked: Vec<&Country> = countries
        .iter()
        .filter(|c| c.estimated_gdp.is_some())
        .collect();
    ranked.sort_by(|a, b| {
        b.estimated_gdp
            .unwrap_or_default()
            .total_cmp(&a.estimated_gdp.unwrap_or_default())
    });
    ranked.truncate(n);
    ranked
}

/// Latest refresh time; the epoch when there are no rows.
pub fn latest_refresh(countries: &[Country]) -> DateTime<Utc> {
    countries
        .iter()
        .map(|c| c.last_refreshed_at)
        .max()
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Whole dollars with thousands separators, e.g. `$1,234,568`.
pub fn format_usd(value: f64) -> String {
    let rounded = value.round();
    if !rounded.is_finite() || rounded < 0.0 {
        return format!("${rounded}");
    }
    format!("${}", (rounded as u64).to_formatted_string(&Locale::en))
}

/// Path of the font currently registered as `sans-serif`. Held for the whole render,
/// since the plotters font table is process-wide.
static REGISTERED_FONT: std::sync::Mutex<Option<PathBuf>> = std::sync::Mutex::new(None);

/// `ab_glyph` does not discover OS fonts, so the configured file is registered as
/// `sans-serif`, again whenever a render asks for a different file.
fn ensure_font_registered(registered: &mut Option<PathBuf>, font_path: &Path) -> Result<()> {
    if registered.as_deref() == Some(font_path) {
        return Ok(());
    }
    let bytes = std::fs::read(font_path)
        .with_context(|| format!("Failed to read font file: {}", font_path.display()))?;
    let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
    plotters::style::register_font("sans-serif", FontStyle::Normal, bytes)
        .map_err(|_| anyhow!("Invalid font file: {}", font_path.display()))?;
    *registered = Some(font_path.to_path_buf());
    debug!("Registered font {}", font_path.display());
    Ok(())
}

fn text_style(size: u32, color: &'static RGBColor) -> TextStyle<'static> {
    TextStyle::from((FontFamily::SansSerif, size))
        .color(color)
        .pos(Pos::new(HPos::Left, VPos::Bottom))
}

/// Draws the summary and writes it as PNG to `out_path`.
pub fn render_png(summary: &SummaryData, out_path: &Path, font_path: &Path) -> Result<()> {
    let mut registered = REGISTERED_FONT
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    ensure_font_registered(&mut registered, font_path)?;

    let root =
        BitMapBackend::new(out_path, (SUMMARY_WIDTH, SUMMARY_HEIGHT)).into_drawing_area();
    root.fill(&BACKGROUND).map_err(|e| anyhow!("{:?}", e))?;

    let lines = summary.lines();
    let (title, rest) = lines
        .split_first()
        .ok_or_else(|| anyhow!("empty summary"))?;
    let (last_refresh, body) = rest
        .split_last()
        .ok_or_else(|| anyhow!("empty summary"))?;

    let draw = |text: &str, at: (i32, i32), style: TextStyle<'static>| {
        root.draw(&Text::new(text, at, style))
            .map_err(|e| anyhow!("{:?}", e))
    };

    draw(title, (220, 60), text_style(28, &ACCENT))?;
    // body = [total, heading, ranked...]
    draw(&body[0], (60, 120), text_style(20, &WHITE))?;
    draw(&body[1], (60, 170), text_style(20, &WHITE))?;
    for (i, line) in body[2..].iter().enumerate() {
        draw(line, (80, 210 + 40 * i as i32), text_style(18, &WHITE))?;
    }
    draw(last_refresh, (60, 480), text_style(16, &MUTED))?;

    root.present().map_err(|e| anyhow!("{:?}", e))?;
    Ok(())
}

/// Owns the fixed output path and serializes renders into it.
pub struct SummaryImage {
    path: PathBuf,
    font_path: PathBuf,
    render_lock: Mutex<()>,
}

impl SummaryImage {
    pub fn new(cache_dir: impl Into<PathBuf>, font_path: impl Into<PathBuf>) -> Self {
        SummaryImage {
            path: cache_dir.into().join(SUMMARY_FILE),
            font_path: font_path.into(),
            render_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Renders `countries` to the summary file. Returns `None` when there is nothing to draw.
    pub async fn generate(&self, countries: &[Country]) -> Result<Option<PathBuf>> {
        let _guard = self.render_lock.lock().await;
        self.render_unlocked(countries).await
    }

    /// Like [`Self::generate`], but also reads the file back before another render can replace it.
    pub async fn generate_png(&self, countries: &[Country]) -> Result<Option<Vec<u8>>> {
        let _guard = self.render_lock.lock().await;
        match self.render_unlocked(countries).await? {
            Some(path) => {
                let bytes = tokio::fs::read(&path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                Ok(Some(bytes))
            }
            None => Ok(None),
        }
    }

    async fn render_unlocked(&self, countries: &[Country]) -> Result<Option<PathBuf>> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        if countries.is_empty() {
            return Ok(None);
        }

        let summary = SummaryData::from_countries(countries);
        let out_path = self.path.clone();
        let font_path = self.font_path.clone();
        tokio::task::spawn_blocking(move || render_png(&summary, &out_path, &font_path))
            .await
            .context("Summary render task failed")??;

        debug!("Wrote summary image to {}", self.path.display());
        Ok(Some(self.path.clone()))
    }
}
