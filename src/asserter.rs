use std::collections::BTreeMap;

use reqwest::StatusCode;

use crate::runner::CapturedResponse;
use crate::runner::StepOutcome;
use crate::runner::StepResult;
use crate::suite::Category;
use crate::suite::Expectation;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TestResult {
    Pass,
    Fail,
}

pub trait Assert {
    fn assert(&self, expect: &Expectation) -> TestResult;
}

impl Assert for CapturedResponse {
    fn assert(&self, expect: &Expectation) -> TestResult {
        assert_status(expect, self.status)
    }
}

fn assert_status(expect: &Expectation, status: StatusCode) -> TestResult {
    let matched = match expect {
        Expectation::Status(expected) => *expected == status,
        Expectation::ClientError => status.is_client_error(),
    };

    if matched {
        TestResult::Pass
    } else {
        TestResult::Fail
    }
}

/// How a summary category fared across the steps that exercise it.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum CategoryMark {
    Passed,
    Failed,
    NotExercised,
}

/// Tallies for the end-of-run report.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    categories: BTreeMap<Category, CategoryMark>,
}

impl RunSummary {
    pub fn record(&mut self, step: &StepResult) {
        let category = step.case.category;

        match &step.outcome {
            StepOutcome::Completed {
                result: TestResult::Pass,
                ..
            } => {
                self.passed += 1;
                self.categories
                    .entry(category)
                    .or_insert(CategoryMark::Passed);
            }
            StepOutcome::Completed {
                result: TestResult::Fail,
                ..
            } => {
                self.failed += 1;
                self.categories.insert(category, CategoryMark::Failed);
            }
            StepOutcome::Skipped { .. } => self.skipped += 1,
        }
    }

    pub fn mark(&self, category: Category) -> CategoryMark {
        self.categories
            .get(&category)
            .copied()
            .unwrap_or(CategoryMark::NotExercised)
    }

    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }
}
