//! The `tarefas` (task) resource.
//!
//! # Routes
//! - `GET    /tarefas`       list, in creation order
//! - `POST   /tarefas`       create (`{"titulo": ..., "concluida"?: ...}`)
//! - `GET    /tarefas/{id}`  fetch one
//! - `PUT    /tarefas/{id}`  partial update
//! - `DELETE /tarefas/{id}`  remove
//!
//! Persistence sits behind `TarefaRepository`. `InMemoryTarefas` lives for
//! the process, so each warm serverless container keeps its own copy.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{header, HeaderValue, Method, StatusCode};
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::handlers::{handler_fn, HandlerError, HandlerResult};
use crate::http::{NormalizedRequest, NormalizedResponse, ParsedBody};
use crate::routing::{Route, RouterBuilder};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tarefa {
    pub id: Uuid,
    pub titulo: String,
    pub concluida: bool,
    #[serde(skip)]
    ordem: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NovaTarefa {
    pub titulo: String,
    #[serde(default)]
    pub concluida: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AtualizarTarefa {
    pub titulo: Option<String>,
    pub concluida: Option<bool>,
}

/// Storage for tarefas.
#[async_trait]
pub trait TarefaRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Tarefa>, HandlerError>;
    async fn create(&self, nova: NovaTarefa) -> Result<Tarefa, HandlerError>;
    async fn get(&self, id: Uuid) -> Result<Option<Tarefa>, HandlerError>;
    async fn update(&self, id: Uuid, changes: AtualizarTarefa)
        -> Result<Option<Tarefa>, HandlerError>;
    /// Returns false when nothing was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, HandlerError>;
}

/// Process-local repository.
#[derive(Debug, Default)]
pub struct InMemoryTarefas {
    tarefas: DashMap<Uuid, Tarefa>,
    sequence: AtomicU64,
}

impl InMemoryTarefas {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TarefaRepository for InMemoryTarefas {
    async fn list(&self) -> Result<Vec<Tarefa>, HandlerError> {
        let mut all: Vec<Tarefa> = self.tarefas.iter().map(|e| e.value().clone()).collect();
        all.sort_by_key(|t| t.ordem);
        Ok(all)
    }

    async fn create(&self, nova: NovaTarefa) -> Result<Tarefa, HandlerError> {
        let tarefa = Tarefa {
            id: Uuid::new_v4(),
            titulo: nova.titulo,
            concluida: nova.concluida,
            ordem: self.sequence.fetch_add(1, Ordering::Relaxed),
        };
        self.tarefas.insert(tarefa.id, tarefa.clone());
        Ok(tarefa)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Tarefa>, HandlerError> {
        Ok(self.tarefas.get(&id).map(|t| t.value().clone()))
    }

    async fn update(
        &self,
        id: Uuid,
        changes: AtualizarTarefa,
    ) -> Result<Option<Tarefa>, HandlerError> {
        let Some(mut tarefa) = self.tarefas.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(titulo) = changes.titulo {
            tarefa.titulo = titulo;
        }
        if let Some(concluida) = changes.concluida {
            tarefa.concluida = concluida;
        }
        Ok(Some(tarefa.value().clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, HandlerError> {
        Ok(self.tarefas.remove(&id).is_some())
    }
}

/// Add the tarefas routes to a route table.
pub fn register(builder: RouterBuilder, repo: Arc<dyn TarefaRepository>) -> RouterBuilder {
    builder
        .route(bind(Method::GET, "/tarefas", &repo, listar))
        .route(bind(Method::POST, "/tarefas", &repo, criar))
        .route(bind(Method::GET, "/tarefas/{id}", &repo, obter))
        .route(bind(Method::PUT, "/tarefas/{id}", &repo, atualizar))
        .route(bind(Method::DELETE, "/tarefas/{id}", &repo, remover))
}

fn bind<F, Fut>(method: Method, pattern: &str, repo: &Arc<dyn TarefaRepository>, f: F) -> Route
where
    F: Fn(Arc<dyn TarefaRepository>, NormalizedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    let repo = repo.clone();
    Route::new(method, pattern, handler_fn(move |req| f(repo.clone(), req)))
}

async fn listar(repo: Arc<dyn TarefaRepository>, _req: NormalizedRequest) -> HandlerResult {
    let tarefas = repo.list().await?;
    ok_json(StatusCode::OK, &tarefas)
}

async fn criar(repo: Arc<dyn TarefaRepository>, req: NormalizedRequest) -> HandlerResult {
    let nova: NovaTarefa = match read_body(req.body()) {
        Ok(nova) => nova,
        Err(reason) => return Ok(NormalizedResponse::error(StatusCode::BAD_REQUEST, &reason)),
    };
    if nova.titulo.trim().is_empty() {
        return Ok(titulo_obrigatorio());
    }

    let tarefa = repo.create(nova).await?;
    tracing::debug!(id = %tarefa.id, "Tarefa created");

    let location = HeaderValue::from_str(&format!("/tarefas/{}", tarefa.id))
        .map_err(HandlerError::new)?;
    Ok(ok_json(StatusCode::CREATED, &tarefa)?.with_header(header::LOCATION, location))
}

async fn obter(repo: Arc<dyn TarefaRepository>, req: NormalizedRequest) -> HandlerResult {
    let Some(id) = tarefa_id(&req) else {
        return Ok(nao_encontrada());
    };
    match repo.get(id).await? {
        Some(tarefa) => ok_json(StatusCode::OK, &tarefa),
        None => Ok(nao_encontrada()),
    }
}

async fn atualizar(repo: Arc<dyn TarefaRepository>, req: NormalizedRequest) -> HandlerResult {
    let Some(id) = tarefa_id(&req) else {
        return Ok(nao_encontrada());
    };
    let changes: AtualizarTarefa = match read_body(req.body()) {
        Ok(changes) => changes,
        Err(reason) => return Ok(NormalizedResponse::error(StatusCode::BAD_REQUEST, &reason)),
    };
    if changes.titulo.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Ok(titulo_obrigatorio());
    }

    match repo.update(id, changes).await? {
        Some(tarefa) => ok_json(StatusCode::OK, &tarefa),
        None => Ok(nao_encontrada()),
    }
}

async fn remover(repo: Arc<dyn TarefaRepository>, req: NormalizedRequest) -> HandlerResult {
    let Some(id) = tarefa_id(&req) else {
        return Ok(nao_encontrada());
    };
    if repo.delete(id).await? {
        Ok(NormalizedResponse::empty(StatusCode::NO_CONTENT))
    } else {
        Ok(nao_encontrada())
    }
}

fn tarefa_id(req: &NormalizedRequest) -> Option<Uuid> {
    req.path_param("id").and_then(|id| Uuid::parse_str(id).ok())
}

fn nao_encontrada() -> NormalizedResponse {
    NormalizedResponse::error(StatusCode::NOT_FOUND, "tarefa not found")
}

fn titulo_obrigatorio() -> NormalizedResponse {
    NormalizedResponse::error(StatusCode::BAD_REQUEST, "titulo must not be empty")
}

fn ok_json<T: Serialize>(status: StatusCode, value: &T) -> HandlerResult {
    let value = serde_json::to_value(value).map_err(HandlerError::new)?;
    Ok(NormalizedResponse::json(status, value))
}

/// Deserialize a JSON or form body. The error string is safe to show clients.
fn read_body<T: DeserializeOwned>(body: &ParsedBody) -> Result<T, String> {
    let value = match body {
        ParsedBody::Json(value) => value.clone(),
        ParsedBody::Form(fields) => {
            let object: Map<String, Value> = fields
                .iter()
                .map(|(k, v)| (k.clone(), form_value(v)))
                .collect();
            Value::Object(object)
        }
        ParsedBody::Empty => return Err("request body is required".to_string()),
        ParsedBody::Raw(_) => return Err("unsupported content type".to_string()),
        ParsedBody::Invalid { .. } => return Err("malformed request body".to_string()),
    };
    serde_json::from_value(value).map_err(|e| format!("invalid tarefa: {e}"))
}

fn form_value(raw: &str) -> Value {
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        other => Value::String(other.to_string()),
    }
}
