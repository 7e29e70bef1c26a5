use std::fmt;

use reqwest::Method;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;

use crate::probe::ProbePolicy;

const ISBN_VIDAS_SECAS: &str = "9788508097679";

/// Built-in test sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SuiteKind {
    /// Three creates, reads, partial updates, both validations and a delete
    #[default]
    Full,
    /// One book through its whole lifecycle plus the required fields check
    Quick,
}

impl SuiteKind {
    pub fn cases(self) -> Vec<TestCase> {
        match self {
            SuiteKind::Full => full(),
            SuiteKind::Quick => quick(),
        }
    }

    pub fn probe_policy(self) -> ProbePolicy {
        match self {
            SuiteKind::Full => ProbePolicy::PATIENT,
            SuiteKind::Quick => ProbePolicy::SINGLE_SHOT,
        }
    }
}

/// Which resource a step addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Collection,
    /// The resource created by the n-th capturing step.
    Captured(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    Status(StatusCode),
    /// Any 4xx status.
    ClientError,
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expectation::Status(status) => write!(f, "HTTP {}", status.as_u16()),
            Expectation::ClientError => write!(f, "HTTP 4xx"),
        }
    }
}

/// What a step exercises, used to build the summary checklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    List,
    Create,
    GetById,
    Update,
    Delete,
    RequiredFields,
    UniqueIsbn,
}

impl Category {
    pub const ENDPOINTS: [Category; 5] = [
        Category::List,
        Category::Create,
        Category::GetById,
        Category::Update,
        Category::Delete,
    ];

    pub const VALIDATIONS: [Category; 2] = [Category::RequiredFields, Category::UniqueIsbn];

    pub fn label(self) -> &'static str {
        match self {
            Category::List => "GET    /api/livros       - list all",
            Category::Create => "POST   /api/livros       - create",
            Category::GetById => "GET    /api/livros/:id   - get by id",
            Category::Update => "PUT    /api/livros/:id   - update",
            Category::Delete => "DELETE /api/livros/:id   - delete",
            Category::RequiredFields => "required fields",
            Category::UniqueIsbn => "unique isbn",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TestCase {
    pub name: &'static str,
    pub method: Method,
    pub target: Target,
    pub body: Option<Value>,
    pub expect: Expectation,
    pub capture_id: bool,
    pub count_items: bool,
    pub category: Category,
}

impl TestCase {
    fn new(method: Method, target: Target, name: &'static str, category: Category) -> Self {
        let expect = match method {
            Method::POST => Expectation::Status(StatusCode::CREATED),
            Method::DELETE => Expectation::Status(StatusCode::NO_CONTENT),
            _ => Expectation::Status(StatusCode::OK),
        };

        Self {
            name,
            method,
            target,
            body: None,
            expect,
            capture_id: false,
            count_items: false,
            category,
        }
    }

    fn list(name: &'static str) -> Self {
        Self::new(Method::GET, Target::Collection, name, Category::List).counted()
    }

    fn create(name: &'static str, body: Value) -> Self {
        Self::new(Method::POST, Target::Collection, name, Category::Create)
            .with_body(body)
            .capturing()
    }

    fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    fn capturing(mut self) -> Self {
        self.capture_id = true;
        self
    }

    fn counted(mut self) -> Self {
        self.count_items = true;
        self
    }

    fn expecting(mut self, expect: Expectation) -> Self {
        self.expect = expect;
        self
    }

    /// Every documented response except `204` carries a JSON body.
    pub fn expects_json(&self) -> bool {
        self.expect != Expectation::Status(StatusCode::NO_CONTENT)
    }
}

fn vidas_secas() -> Value {
    json!({
        "titulo": "Vidas Secas",
        "autor": "Graciliano Ramos",
        "isbn": ISBN_VIDAS_SECAS,
        "anoPublicacao": 1938
    })
}

fn memorias() -> Value {
    json!({
        "titulo": "Memórias de um Sargento de Milícias",
        "autor": "Manuel Antônio de Almeida",
        "isbn": "9788535914565",
        "anoPublicacao": 1852
    })
}

fn o_cortico() -> Value {
    json!({
        "titulo": "O Cortiço",
        "autor": "Aluísio Azevedo",
        "isbn": "9788508078142",
        "anoPublicacao": 1890
    })
}

fn missing_fields(name: &'static str) -> TestCase {
    TestCase::new(
        Method::POST,
        Target::Collection,
        name,
        Category::RequiredFields,
    )
    .with_body(json!({ "titulo": "Livro Incompleto" }))
    .expecting(Expectation::ClientError)
}

fn full() -> Vec<TestCase> {
    vec![
        TestCase::list("List all books"),
        TestCase::create("Create first book", vidas_secas()),
        TestCase::create("Create second book", memorias()),
        TestCase::create("Create third book", o_cortico()),
        TestCase::list("List all books after creating"),
        TestCase::new(
            Method::GET,
            Target::Captured(0),
            "Get book by id",
            Category::GetById,
        ),
        TestCase::new(
            Method::PUT,
            Target::Captured(1),
            "Mark book as unavailable",
            Category::Update,
        )
        .with_body(json!({ "disponivel": false })),
        TestCase::new(
            Method::PUT,
            Target::Captured(2),
            "Update title",
            Category::Update,
        )
        .with_body(json!({ "titulo": "O Cortiço - Edição Especial" })),
        missing_fields("Reject book without required fields"),
        TestCase::new(
            Method::POST,
            Target::Collection,
            "Reject duplicated isbn",
            Category::UniqueIsbn,
        )
        .with_body(json!({
            "titulo": "Novo Livro",
            "autor": "Autor",
            "isbn": ISBN_VIDAS_SECAS,
            "anoPublicacao": 2000
        }))
        .expecting(Expectation::ClientError),
        TestCase::new(
            Method::DELETE,
            Target::Captured(0),
            "Delete book",
            Category::Delete,
        ),
        TestCase::list("Final state of the catalog"),
    ]
}

fn quick() -> Vec<TestCase> {
    vec![
        TestCase::list("List all books"),
        TestCase::create("Create book", memorias()),
        TestCase::new(
            Method::GET,
            Target::Captured(0),
            "Get book by id",
            Category::GetById,
        ),
        TestCase::new(
            Method::PUT,
            Target::Captured(0),
            "Mark book as unavailable",
            Category::Update,
        )
        .with_body(json!({ "disponivel": false })),
        TestCase::new(
            Method::DELETE,
            Target::Captured(0),
            "Delete book",
            Category::Delete,
        ),
        missing_fields("Reject book without required fields"),
    ]
}
