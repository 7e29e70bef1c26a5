use std::fmt;
use std::io::Write;

use reqwest::Client;
use reqwest::Response;
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use tracing::warn;
use url::Url;

use crate::asserter::Assert;
use crate::asserter::RunSummary;
use crate::asserter::TestResult;
use crate::outputter::OutPutter;
use crate::suite::Target;
use crate::suite::TestCase;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("could not reach the server while running `{step}`: {source}")]
    Connection {
        step: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("`{step}` answered {status} with a body that is not valid JSON: {body}")]
    MalformedBody {
        step: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("could not build a resource URL for `{step}` under {base_url}")]
    InvalidUrl { step: &'static str, base_url: String },

    #[error("failed to write the report")]
    Output(#[from] std::io::Error),
}

/// Server-assigned id, kept exactly as the server returned it.
#[derive(Debug, Clone, PartialEq)]
pub struct BookId(Value);

impl BookId {
    /// Takes the `id` field of a created record, if it is a number or string.
    pub fn from_body(body: &Value) -> Option<Self> {
        match body.get("id")? {
            id @ (Value::Number(_) | Value::String(_)) => Some(Self(id.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Value::String(s) => write!(f, "{s}"),
            other => write!(f, "{other}"),
        }
    }
}

/// State threaded through the steps of a run.
#[derive(Debug, Default)]
pub struct RunContext {
    captured_ids: Vec<BookId>,
}

impl RunContext {
    pub fn captured(&self) -> &[BookId] {
        &self.captured_ids
    }

    fn capture(&mut self, id: BookId) {
        debug!(index = self.captured_ids.len(), %id, "captured id");
        self.captured_ids.push(id);
    }

    fn id(&self, idx: usize) -> Option<&BookId> {
        self.captured_ids.get(idx)
    }
}

/// Appends `id` as one escaped path segment. `None` for a cannot-be-a-base URL.
fn resource_url(base_url: &Url, id: &BookId) -> Option<Url> {
    let mut url = base_url.clone();
    url.path_segments_mut().ok()?.push(&id.to_string());
    Some(url)
}

#[derive(Debug)]
pub struct CapturedResponse {
    pub status: StatusCode,
    pub body_text: String,
    pub body_json: Option<Value>,
}

impl CapturedResponse {
    pub async fn from_response(resp: Response) -> Self {
        let status = resp.status();

        // Consume the body exactly once
        let body_text = match resp.text().await {
            Ok(t) => t,
            Err(err) => format!("Failed to read body: {}", err),
        };

        let body_json = serde_json::from_str::<Value>(&body_text).ok();

        Self {
            status,
            body_text,
            body_json,
        }
    }
}

#[derive(Debug)]
pub enum StepOutcome {
    Completed {
        response: CapturedResponse,
        result: TestResult,
    },
    Skipped {
        reason: String,
    },
}

#[derive(Debug)]
pub struct StepResult {
    pub index: usize,
    pub case: TestCase,
    pub url: Option<Url>,
    pub outcome: StepOutcome,
}

/// Runs `cases` in order, reporting each step as soon as it completes.
///
/// Status mismatches are reported and the run goes on. A transport error or a
/// matching response whose JSON body cannot be parsed ends the run.
pub async fn run_suite<W: Write>(
    client: &Client,
    base_url: &Url,
    cases: Vec<TestCase>,
    ctx: &mut RunContext,
    out: &mut OutPutter<W>,
) -> Result<RunSummary, RunnerError> {
    let mut summary = RunSummary::default();
    out.start_run(cases.len(), base_url);

    for (index, case) in cases.into_iter().enumerate() {
        let step = run_step(client, base_url, index, case, ctx).await?;

        out.step(&step)?;
        summary.record(&step);

        if let StepOutcome::Completed {
            response,
            result: TestResult::Pass,
        } = &step.outcome
            && step.case.expects_json()
            && response.body_json.is_none()
        {
            return Err(RunnerError::MalformedBody {
                step: step.case.name,
                status: response.status,
                body: response.body_text.clone(),
            });
        }
    }

    Ok(summary)
}

async fn run_step(
    client: &Client,
    base_url: &Url,
    index: usize,
    case: TestCase,
    ctx: &mut RunContext,
) -> Result<StepResult, RunnerError> {
    let url = match case.target {
        Target::Collection => base_url.clone(),
        Target::Captured(idx) => match ctx.id(idx) {
            Some(id) => {
                resource_url(base_url, id).ok_or_else(|| RunnerError::InvalidUrl {
                    step: case.name,
                    base_url: base_url.to_string(),
                })?
            }
            None => {
                warn!(step = case.name, idx, "skipping step, id was never captured");

                return Ok(StepResult {
                    index,
                    case,
                    url: None,
                    outcome: StepOutcome::Skipped {
                        reason: format!("captured id #{idx} is missing"),
                    },
                });
            }
        },
    };

    debug!(step = case.name, method = %case.method, %url, "sending request");

    let request = client.request(case.method.clone(), url.clone());
    let request = match &case.body {
        Some(body) => request.json(body),
        None => request,
    };

    let resp = request
        .send()
        .await
        .map_err(|source| RunnerError::Connection {
            step: case.name,
            source,
        })?;

    let response = CapturedResponse::from_response(resp).await;
    let result = response.assert(&case.expect);

    if case.capture_id && result == TestResult::Pass {
        match response.body_json.as_ref().and_then(BookId::from_body) {
            Some(id) => ctx.capture(id),
            None => warn!(step = case.name, "create response has no id"),
        }
    }

    Ok(StepResult {
        index,
        case,
        url: Some(url),
        outcome: StepOutcome::Completed { response, result },
    })
}

#[cfg(test)]
mod test {
    use reqwest::Client;
    use reqwest::StatusCode;
    use serde_json::Value;
    use serde_json::json;
    use url::Url;

    use super::BookId;
    use super::RunContext;
    use super::RunnerError;
    use super::resource_url;
    use super::run_suite;
    use crate::asserter::CategoryMark;
    use crate::outputter::OutPutter;
    use crate::suite::Category;
    use crate::suite::SuiteKind;
    use crate::testing::closed_port_url;
    use crate::testing::serve_raw;
    use crate::testing::stub_base_url;

    async fn get_json(client: &Client, url: String) -> (StatusCode, Value) {
        let resp = client.get(url).send().await.unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap())
    }

    #[test]
    fn book_id_from_body() {
        assert_eq!(
            BookId::from_body(&json!({ "id": 7 })).unwrap().to_string(),
            "7"
        );
        assert_eq!(
            BookId::from_body(&json!({ "id": "abc-1" }))
                .unwrap()
                .to_string(),
            "abc-1"
        );
        assert!(BookId::from_body(&json!({ "id": null })).is_none());
        assert!(BookId::from_body(&json!({ "mensagem": "erro" })).is_none());
        assert!(BookId::from_body(&json!([1, 2])).is_none());
    }

    #[tokio::test]
    async fn full_suite_passes_against_catalog() {
        let client = Client::new();
        let base_url = stub_base_url().await;
        let mut ctx = RunContext::default();
        let mut out = OutPutter::new(Vec::new());

        let summary = run_suite(
            &client,
            &base_url,
            SuiteKind::Full.cases(),
            &mut ctx,
            &mut out,
        )
        .await
        .unwrap();

        assert_eq!(summary.passed, 12);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.skipped, 0);
        assert!(summary.all_passed());
        for category in Category::ENDPOINTS.iter().chain(Category::VALIDATIONS.iter()) {
            assert_eq!(summary.mark(*category), CategoryMark::Passed);
        }

        let ids: Vec<String> = ctx.captured().iter().map(ToString::to_string).collect();
        assert_eq!(ids.len(), 3);
        assert_ne!(ids[0], ids[1]);
        assert_ne!(ids[1], ids[2]);
        assert_ne!(ids[0], ids[2]);

        // Three created, one deleted.
        let (_, listing) = get_json(&client, base_url.to_string()).await;
        let listed: Vec<String> = listing
            .as_array()
            .unwrap()
            .iter()
            .map(|b| b["id"].to_string())
            .collect();
        assert_eq!(listed, vec![ids[1].clone(), ids[2].clone()]);

        // Partial updates leave the other fields alone.
        let (_, second) = get_json(&client, format!("{base_url}/{}", ids[1])).await;
        assert_eq!(second["disponivel"], json!(false));
        assert_eq!(second["titulo"], json!("Memórias de um Sargento de Milícias"));
        assert_eq!(second["anoPublicacao"], json!(1852));

        let (_, third) = get_json(&client, format!("{base_url}/{}", ids[2])).await;
        assert_eq!(third["titulo"], json!("O Cortiço - Edição Especial"));
        assert_eq!(third["disponivel"], json!(true));
        assert_eq!(third["isbn"], json!("9788508078142"));

        let (status, _) = get_json(&client, format!("{base_url}/{}", ids[0])).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let report = String::from_utf8(out.into_inner()).unwrap();
        assert!(report.contains("[12/12]"));
    }

    #[tokio::test]
    async fn quick_suite_passes_against_catalog() {
        let client = Client::new();
        let base_url = stub_base_url().await;
        let mut ctx = RunContext::default();
        let mut out = OutPutter::new(Vec::new());

        let summary = run_suite(
            &client,
            &base_url,
            SuiteKind::Quick.cases(),
            &mut ctx,
            &mut out,
        )
        .await
        .unwrap();

        assert_eq!(summary.passed, 6);
        assert_eq!(summary.mark(Category::UniqueIsbn), CategoryMark::NotExercised);

        let (_, listing) = get_json(&client, base_url.to_string()).await;
        assert_eq!(listing, json!([]));
    }

    #[tokio::test]
    async fn second_run_reports_failures_without_aborting() {
        let client = Client::new();
        let base_url = stub_base_url().await;

        let mut first = RunContext::default();
        run_suite(
            &client,
            &base_url,
            SuiteKind::Full.cases(),
            &mut first,
            &mut OutPutter::new(Vec::new()),
        )
        .await
        .unwrap();

        // The first book was deleted but the other two isbns are still taken.
        let mut second = RunContext::default();
        let summary = run_suite(
            &client,
            &base_url,
            SuiteKind::Full.cases(),
            &mut second,
            &mut OutPutter::new(Vec::new()),
        )
        .await
        .unwrap();

        assert_eq!(second.captured().len(), 1);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.total(), 12);
        assert_eq!(summary.mark(Category::Create), CategoryMark::Failed);
        assert_eq!(summary.mark(Category::Update), CategoryMark::NotExercised);
        assert_eq!(summary.mark(Category::GetById), CategoryMark::Passed);
    }

    #[tokio::test]
    async fn missing_capture_skips_dependent_steps() {
        let base_url = stub_base_url().await;
        let mut cases = SuiteKind::Quick.cases();
        cases.retain(|c| !c.capture_id);
        let mut ctx = RunContext::default();
        let mut out = OutPutter::new(Vec::new());

        let summary = run_suite(&Client::new(), &base_url, cases, &mut ctx, &mut out)
            .await
            .unwrap();

        assert_eq!(summary.skipped, 3);
        assert_eq!(summary.passed, 2);

        let report = String::from_utf8(out.into_inner()).unwrap();
        assert!(report.contains("captured id #0 is missing"));
    }

    #[tokio::test]
    async fn unreachable_server_aborts_run() {
        let url = closed_port_url().await;

        let err = run_suite(
            &Client::new(),
            &url,
            SuiteKind::Full.cases(),
            &mut RunContext::default(),
            &mut OutPutter::new(Vec::new()),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            RunnerError::Connection {
                step: "List all books",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn non_json_success_aborts_run() {
        let url = serve_raw(
            "HTTP/1.1 200 OK\r\ncontent-type: text/html\r\ncontent-length: 5\r\nconnection: close\r\n\r\nhello",
        )
        .await;
        let mut out = OutPutter::new(Vec::new());

        let err = run_suite(
            &Client::new(),
            &url,
            SuiteKind::Full.cases(),
            &mut RunContext::default(),
            &mut out,
        )
        .await
        .unwrap_err();

        match err {
            RunnerError::MalformedBody { step, status, body } => {
                assert_eq!(step, "List all books");
                assert_eq!(status, StatusCode::OK);
                assert_eq!(body, "hello");
            }
            other => panic!("expected a malformed body error, got {other:?}"),
        }

        // The offending step is still printed before the run stops.
        let report = String::from_utf8(out.into_inner()).unwrap();
        assert!(report.contains("hello"));
        assert!(!report.contains("[2/"));
    }

    #[test]
    fn resource_url_appends_id() {
        let base_url = Url::parse("http://localhost:3000/api/livros").unwrap();
        let id = BookId::from_body(&json!({ "id": 42 })).unwrap();

        let url = resource_url(&base_url, &id).unwrap();

        assert_eq!(url.as_str(), "http://localhost:3000/api/livros/42");
    }

    #[test]
    fn resource_url_escapes_string_ids() {
        let base_url = Url::parse("http://localhost:3000/api/livros").unwrap();
        let id = BookId::from_body(&json!({ "id": "a/../../x" })).unwrap();

        let url = resource_url(&base_url, &id).unwrap();

        assert_eq!(url.path(), "/api/livros/a%2F..%2F..%2Fx");
        assert_eq!(url.path_segments().unwrap().count(), 3);
    }

    #[tokio::test]
    async fn create_without_id_skips_dependent_steps() {
        let url = serve_raw(
            "HTTP/1.1 201 Created\r\ncontent-type: application/json\r\ncontent-length: 14\r\nconnection: close\r\n\r\n{\"titulo\":\"x\"}",
        )
        .await;
        // Create, get, update, delete, required fields.
        let cases = SuiteKind::Quick.cases().split_off(1);
        let mut ctx = RunContext::default();
        let mut out = OutPutter::new(Vec::new());

        let summary = run_suite(&Client::new(), &url, cases, &mut ctx, &mut out)
            .await
            .unwrap();

        assert!(ctx.captured().is_empty());
        assert_eq!(summary.mark(Category::Create), CategoryMark::Passed);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.skipped, 3);
        // The required fields check expects a 4xx and gets 201.
        assert_eq!(summary.failed, 1);

        let report = String::from_utf8(out.into_inner()).unwrap();
        assert!(report.contains("captured id #0 is missing"));
    }
}
