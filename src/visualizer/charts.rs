//! Drawing routines for the individual chart kinds.
//!
//! Inputs are validated by the caller; these functions only lay out and draw.

use crate::categories::categorize_f64;
use crate::error::Result;
use crate::models::{AqiCategory, CityAqiReading, PredictionSeries, AQI_MAX};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::f64::consts::PI;

pub(super) const FONT: &str = "sans-serif";
const MISSING_CELL: RGBColor = RGBColor(0xd9, 0xd9, 0xd9);

/// Yellow-orange-red ramp used by the heatmap, low to high.
const HEAT_STOPS: [(u8, u8, u8); 5] = [
    (255, 255, 204),
    (254, 217, 118),
    (253, 141, 60),
    (227, 26, 28),
    (128, 0, 38),
];

fn category_color(category: AqiCategory) -> RGBColor {
    let (r, g, b) = category.rgb();
    RGBColor(r, g, b)
}

/// Interpolates the heat ramp at `t` in `[0, 1]`.
fn heat_color(t: f64) -> RGBColor {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = t * (HEAT_STOPS.len() - 1) as f64;
    let idx = (scaled.floor() as usize).min(HEAT_STOPS.len() - 2);
    let frac = scaled - idx as f64;
    let (a, b) = (HEAT_STOPS[idx], HEAT_STOPS[idx + 1]);
    let lerp = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * frac).round() as u8;
    RGBColor(lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
}

/// Dark backgrounds get white annotations.
fn text_color_on(background: RGBColor) -> RGBColor {
    let RGBColor(r, g, b) = background;
    let luminance = 0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64;
    if luminance < 140.0 {
        WHITE
    } else {
        BLACK
    }
}

fn centered(size: f64, color: RGBColor) -> TextStyle<'static> {
    (FONT, size)
        .into_font()
        .color(&color)
        .pos(Pos::new(HPos::Center, VPos::Center))
}

/// Gauge angle for an AQI value: 0 sits on the left, 500 on the right.
fn gauge_angle(aqi: f64) -> f64 {
    PI * (1.0 - aqi.clamp(0.0, AQI_MAX as f64) / AQI_MAX as f64)
}

fn wedge(start_aqi: f64, end_aqi: f64, inner: f64, outer: f64) -> Vec<(f64, f64)> {
    const STEPS: usize = 24;
    let (a0, a1) = (gauge_angle(start_aqi), gauge_angle(end_aqi));
    let arc = |radius: f64| {
        (0..=STEPS).map(move |i| {
            let angle = a0 + (a1 - a0) * i as f64 / STEPS as f64;
            (radius * angle.cos(), radius * angle.sin())
        })
    };
    let mut points: Vec<(f64, f64)> = arc(outer).collect();
    points.extend(arc(inner).collect::<Vec<_>>().into_iter().rev());
    points
}

pub(super) fn draw_meter<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    reading: &CityAqiReading,
) -> Result<()> {
    root.fill(&WHITE)?;
    let title = format!("Current AQI Level in {}", reading.city);
    let area = root.titled(&title, (FONT, 26))?;

    let mut chart = ChartBuilder::on(&area)
        .margin(10)
        .build_cartesian_2d(-1.2f64..1.2f64, -0.3f64..1.15f64)?;

    for category in AqiCategory::ALL {
        let (low, high) = category.bounds();
        // Wedges share edges so the dial has no gaps between integer ranges.
        let start = if low == 0 { 0 } else { low - 1 };
        chart.draw_series(std::iter::once(Polygon::new(
            wedge(start as f64, high as f64, 0.55, 1.0),
            category_color(category).filled(),
        )))?;

        let mid = gauge_angle((start + high) as f64 / 2.0);
        chart.draw_series(std::iter::once(Text::new(
            category.short_label().to_string(),
            (1.1 * mid.cos(), 1.08 * mid.sin()),
            centered(12.0, BLACK),
        )))?;
    }

    let angle = gauge_angle(reading.aqi as f64);
    chart.draw_series(std::iter::once(PathElement::new(
        vec![(0.0, 0.0), (0.9 * angle.cos(), 0.9 * angle.sin())],
        BLACK.stroke_width(4),
    )))?;
    chart.draw_series(std::iter::once(Circle::new((0.0, 0.0), 8, BLACK.filled())))?;
    chart.draw_series(std::iter::once(Text::new(
        format!("AQI: {}", reading.aqi),
        (0.0, -0.15),
        centered(24.0, BLACK),
    )))?;

    Ok(())
}

pub(super) fn draw_trend<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    reading: &CityAqiReading,
    series: &PredictionSeries,
) -> Result<()> {
    root.fill(&WHITE)?;

    let mut values = vec![reading.aqi as f64];
    values.extend(series.values());
    let x_max = (values.len() - 1).max(1) as f64;
    let peak = values.iter().copied().fold(0.0, f64::max);
    let y_max = (peak * 1.15).max(60.0).min(AQI_MAX as f64 + 20.0);

    let mut chart = ChartBuilder::on(root)
        .caption(format!("AQI Trend Forecast for {}", reading.city), (FONT, 24))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(55)
        .build_cartesian_2d(0f64..x_max, 0f64..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Days")
        .y_desc("AQI Value")
        .x_labels(values.len())
        .x_label_formatter(&|x: &f64| format!("{:.0}", x))
        .light_line_style(BLACK.mix(0.05))
        .draw()?;

    // Category boundaries that fall inside the visible range.
    for category in AqiCategory::ALL {
        let (low, _) = category.bounds();
        let low = low as f64;
        if low > 0.0 && low < y_max {
            chart.draw_series(LineSeries::new(
                vec![(0.0, low), (x_max, low)],
                category_color(category).mix(0.5).stroke_width(1),
            ))?;
        }
    }

    chart.draw_series(LineSeries::new(
        values.iter().enumerate().map(|(i, v)| (i as f64, *v)),
        BLUE.stroke_width(2),
    ))?;
    chart.draw_series(values.iter().enumerate().map(|(i, v)| {
        Circle::new(
            (i as f64, *v),
            6,
            category_color(categorize_f64(*v)).filled(),
        )
    }))?;

    Ok(())
}

pub(super) fn draw_histogram<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    reading: &CityAqiReading,
    series: &PredictionSeries,
) -> Result<()> {
    root.fill(&WHITE)?;

    let mut counts = [0u32; AqiCategory::ALL.len()];
    let values = std::iter::once(reading.aqi as f64).chain(series.values());
    for value in values {
        let category = categorize_f64(value);
        if let Some(idx) = AqiCategory::ALL.iter().position(|c| *c == category) {
            counts[idx] += 1;
        }
    }
    let bins = counts.len() as u32;
    let y_max = counts.iter().copied().max().unwrap_or(0) + 1;

    let mut chart = ChartBuilder::on(root)
        .caption(format!("AQI Distribution Forecast for {}", reading.city), (FONT, 24))
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(45)
        .build_cartesian_2d((0u32..bins).into_segmented(), 0u32..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("AQI Category")
        .y_desc("Frequency")
        .x_labels(bins as usize)
        .x_label_formatter(&|v: &SegmentValue<u32>| match v {
            SegmentValue::CenterOf(i) => AqiCategory::ALL
                .get(*i as usize)
                .map(|c| c.short_label().to_string())
                .unwrap_or_default(),
            _ => String::new(),
        })
        .light_line_style(BLACK.mix(0.1))
        .draw()?;

    chart.draw_series(AqiCategory::ALL.iter().zip(counts).enumerate().map(
        |(i, (category, count))| {
            let i = i as u32;
            let mut bar = Rectangle::new(
                [(SegmentValue::Exact(i), 0), (SegmentValue::Exact(i + 1), count)],
                category_color(*category).filled(),
            );
            bar.set_margin(0, 0, 4, 4);
            bar
        },
    ))?;

    Ok(())
}

pub(super) fn draw_comparison<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    readings: &[CityAqiReading],
) -> Result<()> {
    root.fill(&WHITE)?;

    let n = readings.len() as u32;
    let peak = readings.iter().map(|r| r.aqi.max(0) as u32).max().unwrap_or(0);
    let y_max = ((peak as f64 * 1.2) as u32).max(60);

    let mut chart = ChartBuilder::on(root)
        .caption("Current AQI Comparison Across Cities", (FONT, 24))
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(50)
        .build_cartesian_2d((0u32..n).into_segmented(), 0u32..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Cities")
        .y_desc("AQI Value")
        .x_labels(readings.len())
        .x_label_formatter(&|v: &SegmentValue<u32>| match v {
            SegmentValue::CenterOf(i) => readings
                .get(*i as usize)
                .map(|r| r.city.clone())
                .unwrap_or_default(),
            _ => String::new(),
        })
        .light_line_style(BLACK.mix(0.1))
        .draw()?;

    chart.draw_series(readings.iter().enumerate().map(|(i, reading)| {
        let i = i as u32;
        let mut bar = Rectangle::new(
            [
                (SegmentValue::Exact(i), 0),
                (SegmentValue::Exact(i + 1), reading.aqi.max(0) as u32),
            ],
            category_color(reading.category).filled(),
        );
        bar.set_margin(0, 0, 10, 10);
        bar
    }))?;

    // Value labels just above each bar.
    let label_offset = (y_max / 40).max(1);
    chart.draw_series(readings.iter().enumerate().map(|(i, reading)| {
        Text::new(
            reading.aqi.to_string(),
            (
                SegmentValue::CenterOf(i as u32),
                reading.aqi.max(0) as u32 + label_offset,
            ),
            (FONT, 16.0)
                .into_font()
                .color(&BLACK)
                .pos(Pos::new(HPos::Center, VPos::Bottom)),
        )
    }))?;

    Ok(())
}

/// Grid drawn directly in pixel space: one row per city, one column per day.
pub(super) fn draw_heatmap<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    grid: &[(String, Option<Vec<f64>>)],
    days: usize,
) -> Result<()> {
    root.fill(&WHITE)?;
    let area = root.titled("AQI Prediction Heatmap", (FONT, 28))?;

    let (width, height) = area.dim_in_pixel();
    let (width, height) = (width as i32, height as i32);
    let label_width = 150;
    let header_height = 40;
    let margin = 20;
    let cols = days as i32 + 1;
    let rows = grid.len() as i32;
    let cell_w = ((width - label_width - margin) / cols).max(1);
    let cell_h = ((height - header_height - margin) / rows).max(1);

    let known = grid.iter().filter_map(|(_, v)| v.as_ref()).flatten().copied();
    let (low, high) = known.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    let span = if high > low { high - low } else { 1.0 };

    for col in 0..cols {
        let label = if col == 0 {
            "Today".to_string()
        } else {
            format!("Day {}", col)
        };
        let x = label_width + col * cell_w + cell_w / 2;
        area.draw(&Text::new(label, (x, header_height / 2), centered(14.0, BLACK)))?;
    }

    for (row, (city, values)) in grid.iter().enumerate() {
        let y0 = header_height + row as i32 * cell_h;
        area.draw(&Text::new(
            city.clone(),
            (label_width / 2, y0 + cell_h / 2),
            centered(14.0, BLACK),
        ))?;

        for col in 0..cols {
            let x0 = label_width + col * cell_w;
            let value = values.as_ref().and_then(|v| v.get(col as usize)).copied();
            let (fill, text) = match value {
                Some(v) => (heat_color((v - low) / span), format!("{:.1}", v)),
                None => (MISSING_CELL, "n/a".to_string()),
            };
            area.draw(&Rectangle::new(
                [(x0, y0), (x0 + cell_w, y0 + cell_h)],
                fill.filled(),
            ))?;
            area.draw(&Rectangle::new(
                [(x0, y0), (x0 + cell_w, y0 + cell_h)],
                WHITE.stroke_width(1),
            ))?;
            area.draw(&Text::new(
                text,
                (x0 + cell_w / 2, y0 + cell_h / 2),
                centered(13.0, text_color_on(fill)),
            ))?;
        }
    }

    Ok(())
}
