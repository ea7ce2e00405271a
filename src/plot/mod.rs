//! Funnel plots (SVG output)
//!
//! One panel per condition: global models below the distance cutoff as
//! circles colored by the color column, local models as black crosses.

use log::info;
use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::PipelineConfig;
use crate::pipeline::ConditionReport;
use crate::table::{ScoreTable, TableError};

/// Errors that can occur while drawing plots
#[derive(Error, Debug)]
pub enum PlotError {
    #[error("Drawing error: {0}")]
    Drawing(String),

    #[error("Table error: {0}")]
    Table(#[from] TableError),
}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for PlotError {
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        PlotError::Drawing(err.to_string())
    }
}

const PANEL_WIDTH: u32 = 900;
const PANEL_HEIGHT: u32 = 640;

/// Right-hand space reserved for the color key, in pixels
const KEY_MARGIN: i32 = 90;

/// Number of bands in the color key
const KEY_STEPS: usize = 40;

/// Tick spacing on the distance axis, in Angstroms
const DISTANCE_TICK: f64 = 2.5;

// Color ramp endpoints for the color column (low to high)
const RAMP_LOW: (f64, f64, f64) = (214.0, 236.0, 209.0);
const RAMP_HIGH: (f64, f64, f64) = (38.0, 76.0, 119.0);

/// One plotted point: distance, score, color value
type FunnelPoint = (f64, f64, f64);

/// Map a value in [0, 1] onto the color ramp
fn ramp_color(t: f64) -> RGBColor {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let lerp = |a: f64, b: f64| (a + (b - a) * t).round() as u8;
    RGBColor(
        lerp(RAMP_LOW.0, RAMP_HIGH.0),
        lerp(RAMP_LOW.1, RAMP_HIGH.1),
        lerp(RAMP_LOW.2, RAMP_HIGH.2),
    )
}

/// Models of a table below the distance cutoff
///
/// Points with a non-finite distance or score are dropped. The color value is
/// 0 for tables without the color column, and for non-finite color cells.
fn funnel_points(
    table: &ScoreTable,
    config: &PipelineConfig,
) -> Result<Vec<FunnelPoint>, PlotError> {
    let x = table.column_index(&config.distance_column)?;
    let y = table.column_index(&config.score_column)?;
    let c = table.column_index(&config.color_column).ok();

    Ok(table
        .rows_below(&config.distance_column, config.rmsd_cutoff)?
        .into_iter()
        .map(|r| (r.values[x], r.values[y], c.map_or(0.0, |c| r.values[c])))
        .filter(|p| p.0.is_finite() && p.1.is_finite())
        .map(|(x, y, c)| (x, y, if c.is_finite() { c } else { 0.0 }))
        .collect())
}

/// Vertical color key for the color column along the right edge of a panel
fn draw_color_key(
    area: &DrawingArea<SVGBackend, Shift>,
    label: &str,
    c_min: f64,
    c_max: f64,
) -> Result<(), PlotError> {
    let (w, h) = area.dim_in_pixel();
    let (w, h) = (w as i32, h as i32);
    let (x0, x1) = (w - KEY_MARGIN + 15, w - KEY_MARGIN + 35);
    let (top, bottom) = (90, h - 90);

    let steps = KEY_STEPS as i32;
    let step = (bottom - top) as f64 / steps as f64;
    for i in 0..steps {
        // Top of the key is the high end of the ramp
        let t = 1.0 - (i as f64 + 0.5) / steps as f64;
        let y0 = top + (i as f64 * step) as i32;
        let y1 = top + ((i + 1) as f64 * step).ceil() as i32;
        area.draw(&Rectangle::new(
            [(x0, y0), (x1, y1)],
            ramp_color(t).filled(),
        ))?;
    }
    area.draw(&Rectangle::new([(x0, top), (x1, bottom)], BLACK))?;

    let style = ("sans-serif", 14).into_font().color(&BLACK);
    area.draw(&Text::new(label.to_string(), (x0 - 5, top - 25), style.clone()))?;
    area.draw(&Text::new(format!("{:.2}", c_max), (x1 + 5, top), style.clone()))?;
    area.draw(&Text::new(format!("{:.2}", c_min), (x1 + 5, bottom - 14), style))?;

    Ok(())
}

/// Draw one condition into its panel
fn draw_panel(
    area: &DrawingArea<SVGBackend, Shift>,
    report: &ConditionReport,
    config: &PipelineConfig,
) -> Result<(), PlotError> {
    let global = funnel_points(&report.global, config)?;
    let local = funnel_points(&report.local, config)?;

    if global.is_empty() && local.is_empty() {
        let (w, h) = area.dim_in_pixel();
        area.draw(&Text::new(
            format!("{}: no models below {} A", report.condition.name, config.rmsd_cutoff),
            (w as i32 / 4, h as i32 / 2),
            ("sans-serif", 20).into_font().color(&BLACK),
        ))?;
        return Ok(());
    }

    let (y_min, y_max) = global
        .iter()
        .chain(local.iter())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), p| {
            (min.min(p.1), max.max(p.1))
        });
    let pad = ((y_max - y_min) * 0.05).max(0.5);

    let (c_min, c_max) = global
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), p| {
            (min.min(p.2), max.max(p.2))
        });
    let c_span = if c_max > c_min { c_max - c_min } else { 1.0 };

    let mut chart = ChartBuilder::on(area)
        .caption(&report.condition.name, ("sans-serif", 24))
        .margin(20)
        .margin_right(KEY_MARGIN)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d(0.0..config.rmsd_cutoff, (y_min - pad)..(y_max + pad))?;

    let x_ticks = (config.rmsd_cutoff / DISTANCE_TICK).floor() as usize + 1;
    chart
        .configure_mesh()
        .x_labels(x_ticks)
        .x_desc("RMSD")
        .y_desc("Interface Score")
        .draw()?;

    chart.draw_series(global.iter().map(|&(x, y, c)| {
        let color = ramp_color((c - c_min) / c_span);
        Circle::new((x, y), 4, color.mix(0.8).filled())
    }))?;

    chart.draw_series(
        local
            .iter()
            .map(|&(x, y, _)| Cross::new((x, y), 5, BLACK.mix(0.4))),
    )?;

    if !global.is_empty() && report.global.has_column(&config.color_column) {
        draw_color_key(area, &config.color_column, c_min, c_max)?;
    }

    let (w, h) = area.dim_in_pixel();
    area.draw(&Text::new(
        format!("PNear: {:.4}", report.pnear.pnear),
        ((w as f64 * 0.62) as i32, (h as f64 * 0.86) as i32),
        ("sans-serif", 18).into_font().color(&BLACK),
    ))?;

    Ok(())
}

/// Draw `sdplot_{label}.svg` into the output directory
pub fn draw_funnels(
    out_dir: &Path,
    config: &PipelineConfig,
    reports: &[ConditionReport],
) -> Result<PathBuf, PlotError> {
    let path = out_dir.join(format!("sdplot_{}.svg", config.run_label));
    let panels = reports.len().max(1);

    {
        let root = SVGBackend::new(&path, (PANEL_WIDTH * panels as u32, PANEL_HEIGHT))
            .into_drawing_area();
        root.fill(&WHITE)?;
        let root = root.titled(
            &format!("{} SymDock Plots", config.run_label),
            ("sans-serif", 28),
        )?;

        for (area, report) in root.split_evenly((1, panels)).iter().zip(reports) {
            draw_panel(area, report, config)?;
        }

        root.present()?;
    }

    info!("Funnel plot written to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Condition;
    use crate::pnear::PnearResult;
    use tempfile::tempdir;

    fn report(global: &str, local: &str) -> ConditionReport {
        let global = ScoreTable::parse(global);
        let minima = global.minima().unwrap();
        ConditionReport {
            condition: Condition::for_oligomer(Path::new("."), 2),
            global,
            local: ScoreTable::parse(local),
            pnear: PnearResult {
                pnear: 0.4321,
                log_pnear: 0.4321f64.ln(),
                population: 3,
            },
            minima,
        }
    }

    const GLOBAL: &str = "\
SCORE: total_score rms I_sc symmetric_rms Fnat description
SCORE: -100.0 2.0 -10.0 1.5 0.9 g1
SCORE: -90.0 8.0 -6.0 7.5 0.3 g2
SCORE: -80.0 30.0 -2.0 28.0 0.0 g3
";

    const LOCAL: &str = "\
SCORE: total_score rms I_sc symmetric_rms Fnat description
SCORE: -105.0 1.0 -11.0 0.8 0.95 l1
";

    #[test]
    fn test_funnel_points_respect_cutoff() {
        let config = PipelineConfig::new("run", ".");
        let table = ScoreTable::parse(GLOBAL);
        let points = funnel_points(&table, &config).unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0], (1.5, -10.0, 0.9));
    }

    #[test]
    fn test_funnel_points_without_color_column() {
        let mut config = PipelineConfig::new("run", ".");
        config.color_column = "CAPRI_rank".to_string();
        let points = funnel_points(&ScoreTable::parse(GLOBAL), &config).unwrap();
        assert!(points.iter().all(|p| p.2 == 0.0));
    }

    #[test]
    fn test_funnel_points_drop_infinite_values() {
        let config = PipelineConfig::new("run", ".");
        let table = ScoreTable::parse(
            "SCORE: total_score rms I_sc symmetric_rms Fnat description\n\
             SCORE: -1 1 inf 1 0.5 a\n\
             SCORE: -1 1 -3.0 -inf 0.5 b\n\
             SCORE: -2 1 -4.0 2.0 inf c\n",
        );
        let points = funnel_points(&table, &config).unwrap();

        assert_eq!(points, vec![(2.0, -4.0, 0.0)]);
    }

    #[test]
    fn test_draw_funnels_with_infinite_score() {
        let dir = tempdir().unwrap();
        let config = PipelineConfig::new("infrun", dir.path());
        let global = "SCORE: total_score rms I_sc symmetric_rms Fnat description\n\
                      SCORE: -1 1 inf 1 0.5 a\n";
        let reports = vec![report(global, LOCAL)];

        let path = draw_funnels(dir.path(), &config, &reports).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_ramp_color_endpoints() {
        assert_eq!(ramp_color(0.0), RGBColor(214, 236, 209));
        assert_eq!(ramp_color(1.0), RGBColor(38, 76, 119));
        assert_eq!(ramp_color(f64::NAN), ramp_color(0.0));
    }

    #[test]
    fn test_draw_funnels_writes_svg() {
        let dir = tempdir().unwrap();
        let config = PipelineConfig::new("myrun", dir.path());
        let header_only = "SCORE: total_score rms I_sc symmetric_rms Fnat description\n";
        let reports = vec![report(GLOBAL, LOCAL), report(GLOBAL, header_only)];

        let path = draw_funnels(dir.path(), &config, &reports).unwrap();
        assert_eq!(path, dir.path().join("sdplot_myrun.svg"));

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("PNear: 0.4321"));
        assert!(svg.contains("myrun SymDock Plots"));
        // Color key for the Fnat ramp over g1 (0.9) and g2 (0.3)
        assert!(svg.contains("Fnat"));
        assert!(svg.contains("0.90"));
        assert!(svg.contains("0.30"));
    }
}
