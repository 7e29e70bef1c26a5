use std::io;
use std::io::Write;

use console::style;
use serde_json::Value;
use url::Url;

use crate::asserter::CategoryMark;
use crate::asserter::RunSummary;
use crate::asserter::TestResult;
use crate::runner::CapturedResponse;
use crate::runner::StepOutcome;
use crate::runner::StepResult;
use crate::suite::Category;
use crate::suite::Target;

const RULE: &str = "════════════════════════════════════════════════════════";

/// Renders steps and the final summary. Purely presentational.
pub struct OutPutter<W: Write> {
    out: W,
    total: usize,
    base_path: String,
}

impl<W: Write> OutPutter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            total: 0,
            base_path: String::new(),
        }
    }

    /// Step count and collection path used by the `[n/total] METHOD path` lines.
    pub fn start_run(&mut self, total: usize, base_url: &Url) {
        self.total = total;
        self.base_path = base_url.path().to_string();
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn banner(&mut self, title: &str) -> io::Result<()> {
        let frame = style(format!("╔{RULE}╗")).blue().bold();
        writeln!(self.out)?;
        writeln!(self.out, "{frame}")?;
        writeln!(self.out, "{} {title}", style("║").blue().bold())?;
        writeln!(self.out, "{}", style(format!("╚{RULE}╝")).blue().bold())?;
        writeln!(self.out)
    }

    pub fn server_ready(&mut self, url: &Url) -> io::Result<()> {
        writeln!(
            self.out,
            "{}\n",
            style(format!("✅ Server ready at {url}")).green().bold()
        )
    }

    pub fn server_unavailable(&mut self) -> io::Result<()> {
        writeln!(
            self.out,
            "{}\n",
            style("❌ Server did not respond!").red().bold()
        )
    }

    pub fn step(&mut self, step: &StepResult) -> io::Result<()> {
        // Only captured-id steps can be skipped, so they are the only ones without a URL.
        let path = match (&step.url, step.case.target) {
            (Some(url), _) => url.path().to_string(),
            (None, Target::Captured(idx)) => format!("{}/<id #{idx}>", self.base_path),
            (None, Target::Collection) => self.base_path.clone(),
        };

        writeln!(
            self.out,
            "{} {} {} {}",
            style(format!("[{}/{}]", step.index + 1, self.total)).cyan(),
            style(format!("{:<6}", step.case.method.as_str())).bold(),
            style(path).cyan(),
            style(format!("- {}", step.case.name)).yellow(),
        )?;

        if let Some(body) = &step.case.body
            && !matches!(step.outcome, StepOutcome::Skipped { .. })
        {
            writeln!(
                self.out,
                "{}",
                style(format!("Request ({}):", step.case.method)).yellow()
            )?;
            writeln!(self.out, "{}", pretty(body))?;
        }

        match &step.outcome {
            StepOutcome::Skipped { reason } => {
                writeln!(
                    self.out,
                    "{} {} {}",
                    style("⚠").yellow(),
                    style("SKIPPED").yellow().bold(),
                    reason
                )?;
            }
            StepOutcome::Completed { response, result } => {
                self.response(response)?;

                match result {
                    TestResult::Pass => {
                        let note = if step.case.count_items {
                            item_count(response)
                                .map(|n| format!(" {n} book(s) in the catalog"))
                                .unwrap_or_default()
                        } else {
                            String::new()
                        };
                        writeln!(
                            self.out,
                            "{} {}{}",
                            style("✔").green().bold(),
                            style("PASS!").green().bold(),
                            note
                        )?;
                    }
                    TestResult::Fail => {
                        writeln!(
                            self.out,
                            "{} {} {} {}",
                            style("✘").red().bold(),
                            style("FAIL!").red().bold(),
                            style(format!("Expected {}", step.case.expect)).green(),
                            style(format!("got {}", response.status)).red(),
                        )?;
                    }
                }
            }
        }

        writeln!(self.out)
    }

    fn response(&mut self, response: &CapturedResponse) -> io::Result<()> {
        writeln!(
            self.out,
            "{}",
            style(format!("Response (HTTP {}):", response.status.as_u16())).yellow()
        )?;

        match &response.body_json {
            Some(json) => writeln!(self.out, "{}", pretty(json)),
            None if response.body_text.is_empty() => {
                writeln!(self.out, "{}", style("(no content)").dim())
            }
            None => writeln!(self.out, "{}", response.body_text),
        }
    }

    pub fn summary(&mut self, summary: &RunSummary) -> io::Result<()> {
        self.banner("📊 Summary")?;

        writeln!(
            self.out,
            "Steps: {} run, {} passed, {} failed, {} skipped",
            summary.total(),
            style(summary.passed).green().bold(),
            style(summary.failed).red().bold(),
            style(summary.skipped).yellow().bold(),
        )?;
        writeln!(self.out)?;

        writeln!(self.out, "{}", style("Endpoints:").cyan())?;
        for category in Category::ENDPOINTS {
            self.checklist_line(summary, category)?;
        }
        writeln!(self.out)?;

        writeln!(self.out, "{}", style("Validations:").yellow())?;
        for category in Category::VALIDATIONS {
            self.checklist_line(summary, category)?;
        }
        writeln!(self.out)?;

        if summary.all_passed() {
            writeln!(
                self.out,
                "{}",
                style("All steps passed! 🎉").green().bold()
            )?;
        } else if summary.failed > 0 {
            writeln!(
                self.out,
                "{}",
                style(format!("{} step(s) failed", summary.failed))
                    .red()
                    .bold()
            )?;
        } else {
            writeln!(
                self.out,
                "{}",
                style(format!("{} step(s) skipped", summary.skipped))
                    .yellow()
                    .bold()
            )?;
        }

        writeln!(self.out)
    }

    fn checklist_line(&mut self, summary: &RunSummary, category: Category) -> io::Result<()> {
        let mark = match summary.mark(category) {
            CategoryMark::Passed => style("✔").green(),
            CategoryMark::Failed => style("✘").red(),
            CategoryMark::NotExercised => style("–").dim(),
        };

        writeln!(self.out, "  {mark} {}", category.label())
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn item_count(response: &CapturedResponse) -> Option<usize> {
    response.body_json.as_ref()?.as_array().map(Vec::len)
}
