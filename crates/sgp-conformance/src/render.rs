//! Text, JSON and SVG renderings of a [`Summary`].

use crate::HarnessError;
use crate::aggregate::Summary;
use sgp_runtime::FidelityStatus;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: &'static str,
    pub text: &'static str,
    pub header: &'static str,
    pub grid: &'static str,
    pub excellent: &'static str,
    pub good: &'static str,
    pub review: &'static str,
}

impl Palette {
    #[must_use]
    pub const fn status(&self, status: FidelityStatus) -> &'static str {
        match status {
            FidelityStatus::Excellent => self.excellent,
            FidelityStatus::Good => self.good,
            FidelityStatus::Review => self.review,
        }
    }
}

impl Theme {
    pub fn parse(raw: &str) -> Result<Self, HarnessError> {
        match raw {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(HarnessError::Usage(format!(
                "theme must be light|dark, got '{other}'"
            ))),
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    #[must_use]
    pub const fn palette(self) -> Palette {
        match self {
            Self::Light => Palette {
                background: "#ffffff",
                text: "#24292f",
                header: "#f6f8fa",
                grid: "#d0d7de",
                excellent: "#1a7f37",
                good: "#9a6700",
                review: "#cf222e",
            },
            Self::Dark => Palette {
                background: "#0d1117",
                text: "#c9d1d9",
                header: "#161b22",
                grid: "#30363d",
                excellent: "#238636",
                good: "#d29922",
                review: "#f85149",
            },
        }
    }
}

/// Reporter settings, passed explicitly to [`write_reports`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportConfig {
    pub themes: Vec<Theme>,
    pub worst_offenders: usize,
    pub title: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            themes: vec![Theme::Light, Theme::Dark],
            worst_offenders: 10,
            title: "sigparity Validation Details".to_string(),
        }
    }
}

const TABLE_HEADERS: [&str; 4] = ["Module", "Feature", "RMSE (Approx)", "Status"];

fn pad_table(rows: &[[String; 4]]) -> String {
    let mut widths = TABLE_HEADERS.map(str::len);
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }
    let mut out = String::new();
    let line = |cells: [&str; 4], out: &mut String| {
        let padded: Vec<String> = cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect();
        out.push_str(padded.join(" | ").trim_end());
        out.push('\n');
    };
    line(TABLE_HEADERS, &mut out);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&rule.join("-+-"));
    out.push('\n');
    for row in rows {
        line(
            [row[0].as_str(), row[1].as_str(), row[2].as_str(), row[3].as_str()],
            &mut out,
        );
    }
    out
}

#[must_use]
pub fn render_text(summary: &Summary) -> String {
    let mut out = String::new();
    let tally = summary.tally;
    let _ = writeln!(out, "{}", summary.title);
    let _ = writeln!(out, "{}", "=".repeat(summary.title.chars().count()));
    let _ = writeln!(
        out,
        "succeeded: {}  failed: {}  skipped: {}",
        tally.succeeded, tally.failed, tally.skipped
    );
    let _ = writeln!(
        out,
        "features: {} excellent, {} good, {} review",
        summary.count(FidelityStatus::Excellent),
        summary.count(FidelityStatus::Good),
        summary.count(FidelityStatus::Review)
    );
    out.push('\n');

    let rows: Vec<[String; 4]> = summary
        .rows
        .iter()
        .map(|row| {
            [
                row.module.clone(),
                row.feature.clone(),
                row.display.clone(),
                row.status.as_str().to_string(),
            ]
        })
        .collect();
    out.push_str(&pad_table(&rows));

    if !summary.worst_offenders.is_empty() {
        out.push('\n');
        let _ = writeln!(out, "Worst offenders");
        for (rank, offender) in summary.worst_offenders.iter().enumerate() {
            let label = if offender.output == "output" {
                offender.test.clone()
            } else {
                format!("{}:{}", offender.test, offender.output)
            };
            let _ = write!(
                out,
                "{:>3}. {} / {} / {}  {:e} ({}, {})",
                rank + 1,
                offender.module,
                offender.feature,
                label,
                offender.value,
                offender.display,
                offender.status.as_str()
            );
            if let Some(tag) = offender.tag {
                let _ = write!(out, " [{tag}]");
            }
            out.push('\n');
        }
    }
    out
}

pub fn render_json(summary: &Summary) -> Result<String, HarnessError> {
    let mut payload = serde_json::to_string_pretty(summary)?;
    payload.push('\n');
    Ok(payload)
}

fn xml_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

const COLUMN_WIDTHS: [u32; 4] = [120, 220, 150, 110];
const ROW_HEIGHT: u32 = 30;
const TITLE_HEIGHT: u32 = 44;
const MARGIN: u32 = 16;

/// The fidelity table as a standalone SVG document.
#[must_use]
pub fn render_svg(summary: &Summary, theme: Theme) -> String {
    let palette = theme.palette();
    let table_width: u32 = COLUMN_WIDTHS.iter().sum();
    let row_count = u32::try_from(summary.rows.len()).unwrap_or(u32::MAX - 1);
    let width = table_width + 2 * MARGIN;
    let height = TITLE_HEIGHT + ROW_HEIGHT * (row_count + 1) + 2 * MARGIN;
    let font = "font-family=\"-apple-system, Segoe UI, Helvetica, Arial, sans-serif\"";

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">"
    );
    let _ = writeln!(
        svg,
        "  <rect width=\"{width}\" height=\"{height}\" fill=\"{}\"/>",
        palette.background
    );
    let _ = writeln!(
        svg,
        "  <text x=\"{MARGIN}\" y=\"{}\" {font} font-size=\"18\" font-weight=\"600\" fill=\"{}\">{}</text>",
        MARGIN + 20,
        palette.text,
        xml_escape(&summary.title)
    );

    let top = MARGIN + TITLE_HEIGHT;
    let _ = writeln!(
        svg,
        "  <rect x=\"{MARGIN}\" y=\"{top}\" width=\"{table_width}\" height=\"{ROW_HEIGHT}\" fill=\"{}\"/>",
        palette.header
    );
    let mut x = MARGIN;
    for (header, col_width) in TABLE_HEADERS.iter().zip(COLUMN_WIDTHS) {
        let _ = writeln!(
            svg,
            "  <text x=\"{}\" y=\"{}\" {font} font-size=\"13\" font-weight=\"600\" fill=\"{}\">{}</text>",
            x + 10,
            top + 20,
            palette.text,
            xml_escape(header)
        );
        x += col_width;
    }

    for (idx, row) in summary.rows.iter().enumerate() {
        let y = top + ROW_HEIGHT * (u32::try_from(idx).unwrap_or(0) + 1);
        let _ = writeln!(
            svg,
            "  <line x1=\"{MARGIN}\" y1=\"{y}\" x2=\"{}\" y2=\"{y}\" stroke=\"{}\"/>",
            MARGIN + table_width,
            palette.grid
        );
        let status_color = palette.status(row.status);
        let cells = [
            (row.module.as_str(), palette.text, ""),
            (row.feature.as_str(), palette.text, ""),
            (row.display.as_str(), palette.text, " font-family=\"monospace\""),
            (row.status.as_str(), status_color, " font-weight=\"600\""),
        ];
        let mut x = MARGIN;
        for ((text, color, extra), col_width) in cells.into_iter().zip(COLUMN_WIDTHS) {
            let family = if extra.contains("monospace") { "" } else { font };
            let _ = writeln!(
                svg,
                "  <text x=\"{}\" y=\"{}\" {family}{extra} font-size=\"13\" fill=\"{color}\">{}</text>",
                x + 10,
                y + 20,
                xml_escape(text)
            );
            x += col_width;
        }
    }
    let bottom = top + ROW_HEIGHT * (row_count + 1);
    let _ = writeln!(
        svg,
        "  <rect x=\"{MARGIN}\" y=\"{top}\" width=\"{table_width}\" height=\"{}\" fill=\"none\" stroke=\"{}\"/>",
        bottom - top,
        palette.grid
    );
    svg.push_str("</svg>\n");
    svg
}

fn write_report(path: PathBuf, contents: &str) -> Result<PathBuf, HarnessError> {
    fs::write(&path, contents).map_err(|err| HarnessError::artifact_io(&path, err))?;
    Ok(path)
}

/// Writes `summary.txt`, `summary.json` and one
/// `fidelity_summary_{theme}.svg` per configured theme.
pub fn write_reports(
    report_root: &Path,
    summary: &Summary,
    config: &ReportConfig,
) -> Result<Vec<PathBuf>, HarnessError> {
    fs::create_dir_all(report_root).map_err(|err| HarnessError::artifact_io(report_root, err))?;
    let mut written = vec![
        write_report(report_root.join("summary.txt"), &render_text(summary))?,
        write_report(report_root.join("summary.json"), &render_json(summary)?)?,
    ];
    for theme in &config.themes {
        written.push(write_report(
            report_root.join(format!("fidelity_summary_{}.svg", theme.name())),
            &render_svg(summary, *theme),
        )?);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::{ReportConfig, Theme, render_svg, render_text, write_reports};
    use crate::aggregate::Summary;
    use crate::comparator::{ComparisonResult, Measurement, MetricKind};
    use sgp_runtime::BatchTally;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn summary() -> Summary {
        let results = vec![ComparisonResult {
            module: "2D Ops".to_string(),
            feature: "Convolve2d <&>".to_string(),
            test: "conv".to_string(),
            output: "output".to_string(),
            measurement: Measurement {
                metric: MetricKind::Rmse,
                value: 3.2e-9,
                max_abs_diff: 4.0e-9,
                reference_scale: 2.0,
                peak_counts: None,
                tag: None,
            },
        }];
        let tally = BatchTally {
            succeeded: 1,
            skipped: 2,
            failed: 0,
        };
        Summary::build(&results, tally, &ReportConfig::default())
    }

    #[test]
    fn text_summary_lists_counts_and_table() {
        let text = render_text(&summary());
        assert!(text.starts_with("sigparity Validation Details\n"));
        assert!(text.contains("succeeded: 1  failed: 0  skipped: 2"));
        assert!(text.contains("RMSE (Approx)"));
        assert!(text.contains("< 5e-9"));
        assert!(text.contains("Good"));
    }

    #[test]
    fn svg_escapes_text_and_uses_theme_colors() {
        let dark = render_svg(&summary(), Theme::Dark);
        assert!(dark.contains("Convolve2d &lt;&amp;&gt;"));
        assert!(dark.contains("#0d1117"));
        assert!(dark.contains("#d29922"));
        let light = render_svg(&summary(), Theme::Light);
        assert!(light.contains("#9a6700"));
        assert!(!light.contains("#0d1117"));
        assert!(Theme::parse("sepia").is_err());
    }

    #[test]
    fn reports_land_under_the_report_root() {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock after epoch")
            .as_nanos();
        let root = std::env::temp_dir().join(format!("sgp_reports_{ts}"));
        let files = write_reports(&root, &summary(), &ReportConfig::default()).expect("writes");
        let names: Vec<String> = files
            .iter()
            .map(|path| path.file_name().expect("file").to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "summary.txt",
                "summary.json",
                "fidelity_summary_light.svg",
                "fidelity_summary_dark.svg"
            ]
        );
        let json = std::fs::read_to_string(root.join("summary.json")).expect("json");
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(parsed["tally"]["skipped"], 2);
        assert_eq!(parsed["rows"][0]["status"], "Good");
        std::fs::remove_dir_all(&root).ok();
    }
}
