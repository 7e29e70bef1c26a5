//! In-memory stand-in for the book catalog API.
//!
//! Serves `/api/livros` with the same contract as the real server: sequential
//! integer ids, `400` when a required field is missing, `409` on a duplicate
//! isbn, `404` for unknown ids and `204` on delete.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use serde::Deserialize;
use serde::Serialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Livro {
    pub id: i64,
    pub titulo: String,
    pub autor: String,
    pub isbn: String,
    pub ano_publicacao: i32,
    pub disponivel: bool,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct NovoLivro {
    titulo: Option<String>,
    autor: Option<String>,
    isbn: Option<String>,
    ano_publicacao: Option<i32>,
    disponivel: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct LivroUpdate {
    titulo: Option<String>,
    autor: Option<String>,
    isbn: Option<String>,
    ano_publicacao: Option<i32>,
    disponivel: Option<bool>,
}

#[derive(Default)]
struct Catalog {
    next_id: i64,
    livros: BTreeMap<i64, Livro>,
}

impl Catalog {
    fn isbn_taken(&self, isbn: &str, except: Option<i64>) -> bool {
        self.livros
            .values()
            .any(|l| l.isbn == isbn && Some(l.id) != except)
    }
}

type SharedCatalog = Arc<Mutex<Catalog>>;

pub fn router() -> Router {
    let catalog = SharedCatalog::default();

    Router::new()
        .route("/api/livros", get(list_livros).post(create_livro))
        .route(
            "/api/livros/{id}",
            get(get_livro).put(update_livro).delete(delete_livro),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(catalog)
}

/// Binds the catalog on an ephemeral localhost port and serves it in the
/// background. Returns the bound address.
pub async fn spawn() -> std::io::Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        let _ = axum::serve(listener, router()).await;
    });

    Ok(addr)
}

fn mensagem(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "mensagem": text }))).into_response()
}

fn parse_id(raw: &str) -> Result<i64, Response> {
    raw.parse::<i64>().map_err(|_| {
        mensagem(
            StatusCode::BAD_REQUEST,
            "O ID deve ser um número válido.",
        )
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

async fn list_livros(State(catalog): State<SharedCatalog>) -> Json<Vec<Livro>> {
    let catalog = catalog.lock().await;
    Json(catalog.livros.values().cloned().collect())
}

async fn create_livro(
    State(catalog): State<SharedCatalog>,
    Json(payload): Json<NovoLivro>,
) -> Response {
    let (Some(titulo), Some(autor), Some(isbn), Some(ano_publicacao)) = (
        non_empty(payload.titulo),
        non_empty(payload.autor),
        non_empty(payload.isbn),
        payload.ano_publicacao.filter(|ano| *ano != 0),
    ) else {
        return mensagem(
            StatusCode::BAD_REQUEST,
            "Todos os campos obrigatórios (titulo, autor, isbn, anoPublicacao) devem ser fornecidos.",
        );
    };

    let mut catalog = catalog.lock().await;
    if catalog.isbn_taken(&isbn, None) {
        return mensagem(StatusCode::CONFLICT, "ISBN já cadastrado.");
    }

    catalog.next_id += 1;
    let livro = Livro {
        id: catalog.next_id,
        titulo,
        autor,
        isbn,
        ano_publicacao,
        disponivel: payload.disponivel.unwrap_or(true),
    };
    catalog.livros.insert(livro.id, livro.clone());

    (StatusCode::CREATED, Json(livro)).into_response()
}

async fn get_livro(State(catalog): State<SharedCatalog>, Path(id): Path<String>) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match catalog.lock().await.livros.get(&id) {
        Some(livro) => Json(livro.clone()).into_response(),
        None => mensagem(StatusCode::NOT_FOUND, "Livro não encontrado."),
    }
}

async fn update_livro(
    State(catalog): State<SharedCatalog>,
    Path(id): Path<String>,
    Json(update): Json<LivroUpdate>,
) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let mut catalog = catalog.lock().await;
    if let Some(isbn) = &update.isbn
        && catalog.isbn_taken(isbn, Some(id))
    {
        return mensagem(StatusCode::CONFLICT, "ISBN já cadastrado.");
    }

    let Some(livro) = catalog.livros.get_mut(&id) else {
        return mensagem(
            StatusCode::NOT_FOUND,
            "Livro não encontrado para atualização.",
        );
    };

    if let Some(titulo) = update.titulo {
        livro.titulo = titulo;
    }
    if let Some(autor) = update.autor {
        livro.autor = autor;
    }
    if let Some(isbn) = update.isbn {
        livro.isbn = isbn;
    }
    if let Some(ano) = update.ano_publicacao {
        livro.ano_publicacao = ano;
    }
    if let Some(disponivel) = update.disponivel {
        livro.disponivel = disponivel;
    }

    Json(livro.clone()).into_response()
}

async fn delete_livro(State(catalog): State<SharedCatalog>, Path(id): Path<String>) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match catalog.lock().await.livros.remove(&id) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => mensagem(
            StatusCode::NOT_FOUND,
            "Livro não encontrado para exclusão.",
        ),
    }
}
