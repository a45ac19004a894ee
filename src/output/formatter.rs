//! Run report formatters: console, JSON, markdown and HTML

use crate::config::OutputFormat;
use crate::error::{Result, ResumeTailorError};
use crate::output::report::{BlockSummary, RunReport};
use crate::processing::feedback::FeedbackOutcome;
use askama::Template;
use colored::{Color, Colorize};
use std::path::Path;

pub trait OutputFormatter {
    fn format_report(&self, report: &RunReport) -> Result<String>;
    fn supports_format(&self) -> OutputFormat;
}

/// Colored terminal summary
pub struct ConsoleFormatter {
    use_colors: bool,
}

pub struct JsonFormatter {
    pretty: bool,
}

pub struct MarkdownFormatter;

pub struct HtmlFormatter;

/// Picks the formatter for an output format
pub struct ReportGenerator {
    console_formatter: ConsoleFormatter,
    json_formatter: JsonFormatter,
    markdown_formatter: MarkdownFormatter,
    html_formatter: HtmlFormatter,
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Tailored Resume Report</title>
    <style>
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 0; background: #f5f6fa; color: #2d3436; }
        .container { max-width: 960px; margin: 0 auto; padding: 24px; }
        .header { background: linear-gradient(135deg, #0984e3, #6c5ce7); color: white; padding: 24px; border-radius: 10px; }
        .cards { display: grid; grid-template-columns: repeat(auto-fit, minmax(180px, 1fr)); gap: 16px; margin: 20px 0; }
        .card { background: white; border-radius: 10px; padding: 16px; box-shadow: 0 2px 6px rgba(0,0,0,0.08); }
        .card .value { font-size: 1.8em; font-weight: bold; }
        .ok { color: #00b894; } .warn { color: #e17055; }
        section { background: white; border-radius: 10px; padding: 16px 20px; margin-bottom: 16px; box-shadow: 0 2px 6px rgba(0,0,0,0.08); }
        table { width: 100%; border-collapse: collapse; }
        th, td { text-align: left; padding: 6px 8px; border-bottom: 1px solid #dfe6e9; }
        .pinned { font-size: 0.8em; background: #dfe6e9; border-radius: 4px; padding: 1px 6px; }
        .tag { display: inline-block; margin: 2px; padding: 2px 8px; border-radius: 12px; font-size: 0.9em; }
        .tag.matched { background: #55efc4; } .tag.missing { background: #fab1a0; }
        .meta { color: #636e72; font-size: 0.9em; }
    </style>
</head>
<body>
<div class="container">
    <div class="header">
        <h1>Tailored Resume Report</h1>
        <p>{{ resume_file }} for {{ job_file }} &middot; template <strong>{{ template }}</strong></p>
    </div>

    <div class="cards">
        <div class="card"><div>Pages</div><div class="value {{ page_class }}">{{ page_count }}</div></div>
        <div class="card"><div>Blocks selected</div><div class="value">{{ selected_count }} / {{ total_blocks }}</div></div>
        <div class="card"><div>Skill coverage</div><div class="value">{{ coverage_percent }}%</div></div>
        <div class="card"><div>Layout review</div><div class="value" style="font-size: 1.1em">{{ outcome }}</div></div>
    </div>

    <section>
        <h2>Selected content</h2>
        <table>
            <tr><th>Block</th><th>Category</th><th>Title</th></tr>
            {% for block in selected %}
            <tr><td>{{ block.id }}{% if block.pinned %} <span class="pinned">pinned</span>{% endif %}</td><td>{{ block.category }}</td><td>{{ block.title }}</td></tr>
            {% endfor %}
        </table>
        {% if !excluded.is_empty() %}
        <h3>Left out</h3>
        <table>
            {% for block in excluded %}
            <tr><td>{{ block.id }}</td><td>{{ block.category }}</td><td>{{ block.title }}</td></tr>
            {% endfor %}
        </table>
        {% endif %}
    </section>

    <section>
        <h2>Skill requirements</h2>
        {% for skill in matched %}<span class="tag matched">{{ skill }}</span>{% endfor %}
        {% for skill in missing %}<span class="tag missing">{{ skill }}</span>{% endfor %}
    </section>

    {% if !passes.is_empty() %}
    <section>
        <h2>Layout feedback</h2>
        <table>
            <tr><th>Pass</th><th>Pages</th><th>Critique</th><th>Changes</th></tr>
            {% for pass in passes %}
            <tr><td>{{ pass.iteration }}</td><td>{{ pass.page_count }}</td><td>{{ pass.summary }}</td><td>{{ pass.changes }}</td></tr>
            {% endfor %}
        </table>
    </section>
    {% endif %}

    <p class="meta">Generated {{ generated_at }} in {{ elapsed_ms }} ms by resume-tailor v{{ version }}<br>
    LaTeX: {{ tex_path }}<br>PDF: {{ pdf_path }}</p>
</div>
</body>
</html>"#,
    ext = "html"
)]
struct HtmlTemplate<'a> {
    resume_file: &'a str,
    job_file: &'a str,
    template: &'a str,
    page_count: usize,
    page_class: &'static str,
    selected_count: usize,
    total_blocks: usize,
    coverage_percent: String,
    outcome: String,
    selected: &'a [BlockSummary],
    excluded: &'a [BlockSummary],
    matched: &'a [String],
    missing: &'a [String],
    passes: Vec<HtmlPass<'a>>,
    generated_at: &'a str,
    elapsed_ms: u64,
    version: &'a str,
    tex_path: &'a str,
    pdf_path: &'a str,
}

struct HtmlPass<'a> {
    iteration: u32,
    page_count: usize,
    summary: &'a str,
    changes: String,
}

impl ConsoleFormatter {
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    fn colorize(&self, text: &str, color: Color) -> String {
        if self.use_colors {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn format_header(&self, title: &str) -> String {
        if self.use_colors {
            format!("\n{}\n", title.color(Color::Blue).bold())
        } else {
            format!("\n{}\n", title)
        }
    }

    fn outcome_color(outcome: FeedbackOutcome) -> Color {
        match outcome {
            FeedbackOutcome::Accepted => Color::Green,
            FeedbackOutcome::Disabled => Color::White,
            FeedbackOutcome::IterationCapReached | FeedbackOutcome::NoFurtherChange => Color::Yellow,
        }
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format_report(&self, report: &RunReport) -> Result<String> {
        let mut output = String::new();

        output.push_str(&self.format_header("📄 TAILORED RESUME"));
        output.push_str(&format!(
            "Resume: {} | Job: {} | Template: {}\n",
            report.resume_file, report.job_file, report.template
        ));
        output.push_str(&format!(
            "Generated: {} | Time: {}ms\n",
            report.generated_at, report.elapsed_ms
        ));

        output.push_str(&self.format_header("Selected content"));
        for block in &report.selected {
            let marker = if block.pinned { "📌" } else { "✅" };
            output.push_str(&format!(
                "  {} {} [{}] {}\n",
                marker,
                block.id,
                block.category,
                self.colorize(&block.title, Color::Cyan)
            ));
        }
        if !report.excluded.is_empty() {
            output.push_str("  Left out:\n");
            for block in &report.excluded {
                output.push_str(&format!("  ➖ {} [{}] {}\n", block.id, block.category, block.title));
            }
        }

        output.push_str(&self.format_header("Requirements"));
        for requirement in &report.requirements {
            output.push_str(&format!("  • {}: {}\n", requirement.category, requirement.count));
        }
        if !report.coverage.matched.is_empty() || !report.coverage.missing.is_empty() {
            output.push_str(&format!(
                "  Skill coverage: {:.0}%\n",
                report.coverage.ratio() * 100.0
            ));
            if !report.coverage.matched.is_empty() {
                output.push_str(&format!(
                    "  Covered: {}\n",
                    self.colorize(&report.coverage.matched.join(", "), Color::Green)
                ));
            }
            if !report.coverage.missing.is_empty() {
                output.push_str(&format!(
                    "  Not mentioned: {}\n",
                    self.colorize(&report.coverage.missing.join(", "), Color::Red)
                ));
            }
        }

        output.push_str(&self.format_header("Layout"));
        output.push_str(&format!(
            "  Pages: {} | Font {:.1}pt | Margins {:.2}in | Item spacing {:.1}pt\n",
            report.page_count,
            report.layout.font_size_pt,
            report.layout.margin_in,
            report.layout.item_sep_pt
        ));
        output.push_str(&format!(
            "  Review: {}\n",
            self.colorize(
                &report.feedback_outcome.to_string(),
                Self::outcome_color(report.feedback_outcome)
            )
        ));
        for pass in &report.feedback {
            output.push_str(&format!(
                "  Pass {} ({} page(s)): {}\n",
                pass.iteration, pass.page_count, pass.summary
            ));
            for change in &pass.changes {
                output.push_str(&format!("    - {}\n", change));
            }
        }

        output.push_str(&self.format_header("Output"));
        output.push_str(&format!("  📝 {}\n", report.tex_path));
        output.push_str(&format!("  📕 {}\n", self.colorize(&report.pdf_path, Color::Green)));

        Ok(output)
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Console
    }
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_report(&self, report: &RunReport) -> Result<String> {
        if self.pretty {
            Ok(serde_json::to_string_pretty(report)?)
        } else {
            Ok(serde_json::to_string(report)?)
        }
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Json
    }
}

impl OutputFormatter for MarkdownFormatter {
    fn format_report(&self, report: &RunReport) -> Result<String> {
        let mut output = String::new();

        output.push_str("# Tailored Resume Report\n\n");
        output.push_str(&format!(
            "**Resume:** `{}` | **Job:** `{}` | **Template:** `{}`\n\n",
            report.resume_file, report.job_file, report.template
        ));
        output.push_str(&format!(
            "**Generated:** {} | **Time:** {}ms\n\n",
            report.generated_at, report.elapsed_ms
        ));

        output.push_str("## Selected content\n\n");
        output.push_str("| Block | Category | Title |\n");
        output.push_str("|-------|----------|-------|\n");
        for block in &report.selected {
            let pinned = if block.pinned { " (pinned)" } else { "" };
            output.push_str(&format!(
                "| {}{} | {} | {} |\n",
                block.id,
                pinned,
                block.category,
                escape_table_cell(&block.title)
            ));
        }
        if !report.excluded.is_empty() {
            output.push_str("\n**Left out:** ");
            let excluded: Vec<String> = report
                .excluded
                .iter()
                .map(|b| format!("{} ({})", b.id, b.category))
                .collect();
            output.push_str(&excluded.join(", "));
            output.push('\n');
        }

        output.push_str("\n## Skill coverage\n\n");
        output.push_str(&format!(
            "{:.0}% of skill requirements appear in the selected content.\n\n",
            report.coverage.ratio() * 100.0
        ));
        for skill in &report.coverage.matched {
            output.push_str(&format!("- [x] {}\n", skill));
        }
        for skill in &report.coverage.missing {
            output.push_str(&format!("- [ ] {}\n", skill));
        }

        output.push_str("\n## Layout\n\n");
        output.push_str(&format!(
            "- Pages: {}\n- Font size: {:.1}pt\n- Margins: {:.2}in\n- Item spacing: {:.1}pt\n- Review: {}\n",
            report.page_count,
            report.layout.font_size_pt,
            report.layout.margin_in,
            report.layout.item_sep_pt,
            report.feedback_outcome
        ));
        for pass in &report.feedback {
            output.push_str(&format!(
                "\n### Pass {} ({} page(s))\n\n{}\n",
                pass.iteration, pass.page_count, pass.summary
            ));
            for change in &pass.changes {
                output.push_str(&format!("- {}\n", change));
            }
        }

        output.push_str("\n## Files\n\n");
        for artifact in &report.artifacts {
            output.push_str(&format!("- `{}`\n", artifact));
        }

        Ok(output)
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Markdown
    }
}

fn escape_table_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

impl OutputFormatter for HtmlFormatter {
    fn format_report(&self, report: &RunReport) -> Result<String> {
        let template = HtmlTemplate {
            resume_file: &report.resume_file,
            job_file: &report.job_file,
            template: &report.template,
            page_count: report.page_count,
            page_class: if report.feedback_outcome == FeedbackOutcome::Accepted { "ok" } else { "warn" },
            selected_count: report.selected.len(),
            total_blocks: report.total_blocks,
            coverage_percent: format!("{:.0}", report.coverage.ratio() * 100.0),
            outcome: report.feedback_outcome.to_string(),
            selected: &report.selected,
            excluded: &report.excluded,
            matched: &report.coverage.matched,
            missing: &report.coverage.missing,
            passes: report
                .feedback
                .iter()
                .map(|pass| HtmlPass {
                    iteration: pass.iteration,
                    page_count: pass.page_count,
                    summary: &pass.summary,
                    changes: pass.changes.join("; "),
                })
                .collect(),
            generated_at: &report.generated_at,
            elapsed_ms: report.elapsed_ms,
            version: &report.version,
            tex_path: &report.tex_path,
            pdf_path: &report.pdf_path,
        };
        template
            .render()
            .map_err(|e| ResumeTailorError::OutputFormatting(e.to_string()))
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Html
    }
}

impl ReportGenerator {
    pub fn new(use_colors: bool) -> Self {
        Self {
            console_formatter: ConsoleFormatter::new(use_colors),
            json_formatter: JsonFormatter::new(true),
            markdown_formatter: MarkdownFormatter,
            html_formatter: HtmlFormatter,
        }
    }

    pub fn generate_report(&self, report: &RunReport, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Console => self.console_formatter.format_report(report),
            OutputFormat::Json => self.json_formatter.format_report(report),
            OutputFormat::Markdown => self.markdown_formatter.format_report(report),
            OutputFormat::Html => self.html_formatter.format_report(report),
        }
    }
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self::new(true)
    }
}

pub fn save_report_to_file(content: &str, file_path: &Path) -> Result<()> {
    if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(file_path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::report::{PassSummary, RequirementCount};
    use crate::processing::coverage::CoverageReport;
    use crate::typeset::LayoutSettings;

    fn report() -> RunReport {
        RunReport {
            generated_at: "2026-01-05 09:30:00".to_string(),
            elapsed_ms: 1234,
            resume_file: "master.tex".to_string(),
            job_file: "job.txt".to_string(),
            template: "classic".to_string(),
            total_blocks: 3,
            selected: vec![
                BlockSummary {
                    id: "block_1".to_string(),
                    category: "contact information".to_string(),
                    title: "Jane Doe".to_string(),
                    pinned: true,
                },
                BlockSummary {
                    id: "block_2".to_string(),
                    category: "work experience".to_string(),
                    title: "Engineer | Acme <R&D>".to_string(),
                    pinned: false,
                },
            ],
            excluded: vec![BlockSummary {
                id: "block_3".to_string(),
                category: "project".to_string(),
                title: "Side project".to_string(),
                pinned: false,
            }],
            requirements: vec![RequirementCount {
                category: "skills".to_string(),
                count: 2,
            }],
            coverage: CoverageReport {
                matched: vec!["Rust".to_string()],
                missing: vec!["Go".to_string()],
            },
            page_count: 1,
            layout: LayoutSettings {
                font_size_pt: 11.0,
                margin_in: 0.6,
                item_sep_pt: 1.0,
            },
            feedback_outcome: FeedbackOutcome::Accepted,
            feedback: vec![PassSummary {
                iteration: 1,
                page_count: 1,
                acceptable: true,
                summary: "Clean layout".to_string(),
                changes: vec![],
            }],
            tex_path: "out/tailored.tex".to_string(),
            pdf_path: "out/tailored.pdf".to_string(),
            artifacts: vec!["out/1_parsed_resume.json".to_string()],
            version: "0.1.0".to_string(),
        }
    }

    #[test]
    fn test_console_without_colors() {
        let output = ConsoleFormatter::new(false).format_report(&report()).unwrap();
        assert!(output.contains("📌 block_1 [contact information] Jane Doe"));
        assert!(output.contains("Skill coverage: 50%"));
        assert!(output.contains("Review: layout accepted"));
        assert!(!output.contains("\u{1b}["));
    }

    #[test]
    fn test_json_round_trips_fields() {
        let output = JsonFormatter::new(false).format_report(&report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["feedback_outcome"], "accepted");
        assert_eq!(value["selected"][1]["id"], "block_2");
        assert_eq!(value["coverage"]["missing"][0], "Go");
    }

    #[test]
    fn test_markdown_escapes_table_cells() {
        let output = MarkdownFormatter.format_report(&report()).unwrap();
        assert!(output.contains("| block_2 | work experience | Engineer \\| Acme <R&D> |"));
        assert!(output.contains("- [ ] Go"));
    }

    #[test]
    fn test_html_escapes_content() {
        let output = HtmlFormatter.format_report(&report()).unwrap();
        assert!(output.contains("<title>Tailored Resume Report</title>"));
        assert!(output.contains("Engineer | Acme"));
        assert!(!output.contains("<R&D>"));
        assert!(output.contains("<span class=\"tag missing\">Go</span>"));
    }

    #[test]
    fn test_save_report_creates_parent_dirs() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested/report.md");
        save_report_to_file("# hi", &path).unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "# hi");
    }
}
