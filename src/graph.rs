//! ### Graph
//! Renders the per-case and cross-case charts as PNG files.

use anyhow::{anyhow, bail, ensure};
use plotters::backend::BitMapBackend;
use plotters::chart::{ChartBuilder, SeriesLabelPosition};
use plotters::coord::Shift;
use plotters::drawing::{DrawingArea, IntoDrawingArea};
use plotters::element::{PathElement, Polygon, Rectangle, Text};
use plotters::prelude::{IntoSegmentedCoord, SegmentValue};
use plotters::series::{DashedLineSeries, Histogram, LineSeries};
use plotters::style::full_palette::{BLUE_600, BROWN, GREY, ORANGE, PINK, PURPLE};
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{
    Color, FontTransform, IntoFont, RGBColor, TextStyle, BLACK, BLUE, CYAN, GREEN, MAGENTA, RED, WHITE, YELLOW,
};
use std::path::Path;

use crate::compute::{symbols, Generator, HourWindow, StackedSeries};
use crate::config::DurationCurveConfig;

pub struct Graphing<'a> {
    path: &'a Path,
}

/// One bar of a bar chart.
pub struct Bar {
    pub label: String,
    pub value: f64,
    pub colour: RGBColor,
}

enum AxisFormat {
    Dollars,
    Plain,
}

impl AxisFormat {
    fn format(&self, value: f64) -> String {
        match self {
            AxisFormat::Dollars => dollars(value),
            AxisFormat::Plain => format!("{value:.0}"),
        }
    }
}

struct BarAxes<'b> {
    x_desc: &'b str,
    y_desc: &'b str,
    format: AxisFormat,
    y_range: Option<(f64, f64)>,
    /// Horizontal lines at these levels, dashed when `true`.
    reference_lines: &'b [(f64, bool)],
    rotate_labels: bool,
}

impl<'a> Graphing<'a> {
    const CHART_COLOR: RGBColor = WHITE;
    const CASE_BAR_COLOR: RGBColor = BLUE_600;
    const FONT: &'static str = "sans-serif";

    pub fn new(path: &'a Path) -> Self {
        Graphing { path }
    }

    pub fn operating_profit(&self, generators: &[Generator]) -> anyhow::Result<()> {
        let bars = generator_bars(generators, |gen| gen.value(symbols::OPERATING_PROFIT))?;
        self.bar_chart(
            &bars,
            &BarAxes {
                x_desc: "",
                y_desc: "Operating Profit (per MW)",
                format: AxisFormat::Dollars,
                y_range: None,
                reference_lines: &[(0., false)],
                rotate_labels: true,
            },
        )
    }

    pub fn irr(&self, generators: &[Generator]) -> anyhow::Result<()> {
        let bars = generator_bars(generators, |gen| Ok(gen.irr))?;
        self.bar_chart(
            &bars,
            &BarAxes {
                x_desc: "",
                y_desc: "Internal Rate of Return",
                format: AxisFormat::Plain,
                y_range: Some((-20., 20.)),
                reference_lines: &[(0., false), (10., true)],
                rotate_labels: true,
            },
        )
    }

    pub fn capacity_factor(&self, generators: &[Generator]) -> anyhow::Result<()> {
        let bars = generator_bars(generators, |gen| gen.value(symbols::CAPACITY_FACTOR))?;
        self.bar_chart(
            &bars,
            &BarAxes {
                x_desc: "",
                y_desc: "Capacity Factor (%)",
                format: AxisFormat::Plain,
                y_range: None,
                reference_lines: &[],
                rotate_labels: true,
            },
        )
    }

    pub fn energy_percentage(&self, generators: &[Generator]) -> anyhow::Result<()> {
        let bars = generator_bars(generators, |gen| gen.value(symbols::ENERGY_PERCENTAGE))?;
        self.bar_chart(
            &bars,
            &BarAxes {
                x_desc: "",
                y_desc: "Energy (%)",
                format: AxisFormat::Plain,
                y_range: None,
                reference_lines: &[],
                rotate_labels: true,
            },
        )
    }

    /// Volume weighted average price of each case in a scenario.
    pub fn average_price(&self, cases: &[(String, f64)]) -> anyhow::Result<()> {
        self.bar_chart(
            &case_bars(cases),
            &BarAxes {
                x_desc: "Case",
                y_desc: "Volume Weighted Average Price ($/MWh)",
                format: AxisFormat::Dollars,
                y_range: None,
                reference_lines: &[],
                rotate_labels: false,
            },
        )
    }

    /// Hours with lack of reserve of each case in a scenario.
    pub fn unserved_hours(&self, cases: &[(String, f64)]) -> anyhow::Result<()> {
        self.bar_chart(
            &case_bars(cases),
            &BarAxes {
                x_desc: "Case",
                y_desc: "Hours of LOR",
                format: AxisFormat::Plain,
                y_range: None,
                reference_lines: &[],
                rotate_labels: false,
            },
        )
    }

    fn bar_chart(&self, bars: &[Bar], axes: &BarAxes) -> anyhow::Result<()> {
        if bars.is_empty() {
            bail!("No bars to draw for {}", self.path.display());
        }

        let root = BitMapBackend::new(self.path, (1080, 720)).into_drawing_area();
        root.fill(&Self::CHART_COLOR)?;

        let (y_min, y_max) = axes
            .y_range
            .unwrap_or_else(|| padded_range(bars.iter().map(|bar| bar.value)));

        let mut chart = ChartBuilder::on(&root)
            .x_label_area_size(if axes.rotate_labels { 180 } else { 72 })
            .y_label_area_size(96)
            .margin(20)
            .build_cartesian_2d((0..(bars.len() - 1)).into_segmented(), y_min..y_max)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .bold_line_style(BLACK.mix(0.1))
            .light_line_style(WHITE)
            .x_desc(axes.x_desc)
            .y_desc(axes.y_desc)
            .axis_desc_style((Self::FONT, 24))
            .x_label_formatter(&|seg| match seg {
                // rotated labels are drawn below the axis after the bars
                SegmentValue::CenterOf(idx) if !axes.rotate_labels => {
                    bars.get(*idx).map(|bar| bar.label.clone()).unwrap_or_default()
                }
                _ => String::new(),
            })
            .y_label_formatter(&|value| axes.format.format(*value))
            .x_labels(bars.len())
            .y_labels(10)
            .x_label_style((Self::FONT, 16))
            .y_label_style((Self::FONT, 16))
            .draw()?;

        let colours: Vec<RGBColor> = bars.iter().map(|bar| bar.colour).collect();
        chart.draw_series(
            Histogram::vertical(&chart)
                .style_func(|seg, _| {
                    let colour = match seg {
                        SegmentValue::Exact(idx) | SegmentValue::CenterOf(idx) => colours.get(*idx),
                        SegmentValue::Last => None,
                    };
                    colour.copied().unwrap_or(Self::CASE_BAR_COLOR).filled()
                })
                .margin(4)
                .data(
                    bars.iter()
                        .enumerate()
                        .filter(|(_, bar)| bar.value.is_finite())
                        .map(|(idx, bar)| (idx, bar.value.clamp(y_min, y_max))),
                ),
        )?;

        for &(level, dashed) in axes.reference_lines {
            let ends = [(SegmentValue::Exact(0), level), (SegmentValue::Last, level)];
            if dashed {
                chart.draw_series(DashedLineSeries::new(ends, 10, 6, BLACK.stroke_width(2)))?;
            } else {
                chart.draw_series(LineSeries::new(ends, BLACK.stroke_width(2)))?;
            }
        }

        if axes.rotate_labels {
            let style = rotated_label_style();
            for (idx, bar) in bars.iter().enumerate() {
                let (x, y) = chart.backend_coord(&(SegmentValue::CenterOf(idx), y_min));
                root.draw(&Text::new(bar.label.as_str(), (x, y + ROTATED_LABEL_GAP), style.clone()))?;
            }
        }

        root.present()?;
        Ok(())
    }

    /// Stacked dispatch-like series with the energy price on a second axis.
    pub fn stacked_with_price(
        &self,
        stack: &StackedSeries,
        price: &[(i64, f64)],
        window: HourWindow,
        y_desc: &str,
    ) -> anyhow::Result<()> {
        ensure!(
            !stack.hours.is_empty(),
            "No hours inside {}..={} to draw for {}",
            window.start,
            window.end,
            self.path.display()
        );

        let colours = stack
            .columns
            .iter()
            .map(|col| parse_colour(&col.colour))
            .collect::<anyhow::Result<Vec<_>>>()?;
        let tops = stack.cumulative();

        let root = BitMapBackend::new(self.path, (1500, 500)).into_drawing_area();
        root.fill(&Self::CHART_COLOR)?;

        let x_range = window.start as f64..(window.end.max(window.start + 1)) as f64;
        let (y_min, y_max) = padded_range(tops.iter().flatten().copied());
        let (p_min, p_max) = padded_range(price.iter().map(|(_, p)| *p));

        let mut chart = ChartBuilder::on(&root)
            .x_label_area_size(60)
            .y_label_area_size(90)
            .right_y_label_area_size(90)
            .margin(20)
            .build_cartesian_2d(x_range.clone(), y_min..y_max)?
            .set_secondary_coord(x_range, p_min..p_max);

        chart
            .configure_mesh()
            .disable_x_mesh()
            .disable_y_mesh()
            .x_desc("Hours")
            .y_desc(y_desc)
            .axis_desc_style((Self::FONT, 20))
            .x_label_formatter(&|hour| format!("{hour:.0}"))
            .y_label_formatter(&|value| format!("{value:.0}"))
            .draw()?;

        chart
            .configure_secondary_axes()
            .y_desc("Energy Price ($/MWh)")
            .y_label_formatter(&|value| dollars(*value))
            .draw()?;

        let hours: Vec<f64> = stack.hours.iter().map(|&hour| hour as f64).collect();
        let mut lower = vec![0.; hours.len()];
        for ((col, upper), colour) in stack.columns.iter().zip(&tops).zip(colours) {
            let outline: Vec<(f64, f64)> = hours
                .iter()
                .copied()
                .zip(upper.iter().copied())
                .chain(hours.iter().copied().zip(lower.iter().copied()).rev())
                .collect();
            chart
                .draw_series(std::iter::once(Polygon::new(outline, colour.filled())))?
                .label(col.name.clone())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], colour.filled()));
            lower.clone_from(upper);
        }

        chart
            .draw_secondary_series(LineSeries::new(
                price.iter().map(|&(hour, p)| (hour as f64, p)),
                BLACK.stroke_width(2),
            ))?
            .label("Energy Price")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 12, y)], BLACK.stroke_width(2)));

        chart
            .configure_series_labels()
            .border_style(BLACK)
            .background_style(WHITE.mix(0.8))
            .position(SeriesLabelPosition::UpperRight)
            .label_font((Self::FONT, 14))
            .draw()?;

        root.present()?;
        Ok(())
    }

    /// Sorted prices on two stacked panels: scarcity prices on top, the
    /// normal range below.
    pub fn price_duration_curve(&self, curve: &[f64], axes: &DurationCurveConfig) -> anyhow::Result<()> {
        let root = BitMapBackend::new(self.path, (1080, 720)).into_drawing_area();
        root.fill(&Self::CHART_COLOR)?;

        let (upper, lower) = root.split_vertically(340);
        Self::duration_panel(&upper, curve, axes.hours, axes.upper, true)?;
        Self::duration_panel(&lower, curve, axes.hours, axes.lower, false)?;

        root.present()?;
        Ok(())
    }

    fn duration_panel(
        area: &DrawingArea<BitMapBackend, Shift>,
        curve: &[f64],
        hours: usize,
        [y_min, y_max]: [f64; 2],
        top: bool,
    ) -> anyhow::Result<()> {
        let mut chart = ChartBuilder::on(area)
            .margin_left(20)
            .margin_right(20)
            .margin_top(if top { 20 } else { 4 })
            .margin_bottom(if top { 0 } else { 20 })
            .x_label_area_size(if top { 0 } else { 60 })
            .y_label_area_size(100)
            .build_cartesian_2d(0f64..hours as f64, y_min..y_max)?;

        let price_label = |value: &f64| dollars(*value);
        let hour_label = |hour: &f64| format!("{hour:.0}");
        let mut mesh = chart.configure_mesh();
        mesh.disable_x_mesh()
            .bold_line_style(BLACK.mix(0.1))
            .light_line_style(WHITE)
            .axis_desc_style((Self::FONT, 20))
            .y_label_formatter(&price_label)
            .y_labels(5);
        if top {
            mesh.x_labels(0).y_desc("Energy Price ($/MWh)");
        } else {
            mesh.x_desc("Hours").x_label_formatter(&hour_label);
        }
        mesh.draw()?;

        // Descending, so the points inside the panel are one contiguous run.
        chart.draw_series(LineSeries::new(
            curve
                .iter()
                .enumerate()
                .filter(|(_, price)| (y_min..=y_max).contains(*price))
                .map(|(idx, &price)| (idx as f64, price)),
            BLUE_600.stroke_width(2),
        ))?;
        Ok(())
    }
}

/// Pixels between the x axis and the start of a rotated label.
const ROTATED_LABEL_GAP: i32 = 8;

/// Reads top to bottom, starting at its anchor below the axis.
fn rotated_label_style() -> TextStyle<'static> {
    TextStyle::from((Graphing::FONT, 16).into_font().transform(FontTransform::Rotate90))
        .pos(Pos::new(HPos::Left, VPos::Center))
}

fn generator_bars(
    generators: &[Generator],
    value: impl Fn(&Generator) -> anyhow::Result<f64>,
) -> anyhow::Result<Vec<Bar>> {
    generators
        .iter()
        .map(|gen| {
            let presentation = gen.presentation()?;
            Ok(Bar {
                label: presentation.name.clone(),
                value: value(gen)?,
                colour: parse_colour(&presentation.colour2)?,
            })
        })
        .collect()
}

fn case_bars(cases: &[(String, f64)]) -> Vec<Bar> {
    cases
        .iter()
        .map(|(case, value)| Bar {
            label: case.clone(),
            value: *value,
            colour: Graphing::CASE_BAR_COLOR,
        })
        .collect()
}

/// Axis range covering zero and every finite value, with some headroom.
fn padded_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((0f64, 0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let span = hi - lo;
    if span == 0. {
        return (lo - 1., hi + 1.);
    }
    let pad = span * 0.05;
    (if lo < 0. { lo - pad } else { lo }, hi + pad)
}

/// Whole dollars with thousands separators, e.g. `$1,234` or `$-275`.
pub fn dollars(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if rounded < 0. { "-" } else { "" };
    format!("${sign}{grouped}")
}

/// Parses `#rrggbb`, `#rgb`, basic colour names, and the `tab:` palette.
pub fn parse_colour(text: &str) -> anyhow::Result<RGBColor> {
    let text = text.trim();
    if let Some(hex) = text.strip_prefix('#') {
        ensure!(hex.is_ascii(), "Colour `{text}` is not valid hex");
        let channel = |s: &str| u8::from_str_radix(s, 16);
        let parsed = match hex.len() {
            6 => (channel(&hex[0..2]), channel(&hex[2..4]), channel(&hex[4..6])),
            3 => (
                channel(&hex[0..1].repeat(2)),
                channel(&hex[1..2].repeat(2)),
                channel(&hex[2..3].repeat(2)),
            ),
            _ => bail!("Colour `{text}` is not #rrggbb or #rgb"),
        };
        return match parsed {
            (Ok(r), Ok(g), Ok(b)) => Ok(RGBColor(r, g, b)),
            _ => Err(anyhow!("Colour `{text}` is not valid hex")),
        };
    }

    let colour = match text.to_ascii_lowercase().as_str() {
        "black" | "k" => BLACK,
        "white" | "w" => WHITE,
        "red" | "r" => RED,
        "green" | "g" => GREEN,
        "blue" | "b" => BLUE,
        "yellow" | "y" => YELLOW,
        "cyan" | "c" => CYAN,
        "magenta" | "m" => MAGENTA,
        "orange" => ORANGE,
        "purple" => PURPLE,
        "brown" => BROWN,
        "pink" => PINK,
        "grey" | "gray" => GREY,
        "tab:blue" => RGBColor(0x1f, 0x77, 0xb4),
        "tab:orange" => RGBColor(0xff, 0x7f, 0x0e),
        "tab:green" => RGBColor(0x2c, 0xa0, 0x2c),
        "tab:red" => RGBColor(0xd6, 0x27, 0x28),
        "tab:purple" => RGBColor(0x94, 0x67, 0xbd),
        "tab:brown" => RGBColor(0x8c, 0x56, 0x4b),
        "tab:pink" => RGBColor(0xe3, 0x77, 0xc2),
        "tab:gray" | "tab:grey" => RGBColor(0x7f, 0x7f, 0x7f),
        "tab:olive" => RGBColor(0xbc, 0xbd, 0x22),
        "tab:cyan" => RGBColor(0x17, 0xbe, 0xcf),
        _ => bail!("Unknown colour `{text}`"),
    };
    Ok(colour)
}
