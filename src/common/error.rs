// src/common/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::models::orders::OrderStatus;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
// A taxonomia distingue "nada mudou" (validação, não-encontrado, transição
// inválida) de falha interna; operações em lote tratam falhas por item
// localmente e nunca propagam a falha de um único item para cá.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Requisição inválida: {0}")]
    InvalidPayload(String),

    #[error("Recurso não encontrado: {0}")]
    ResourceNotFound(String),

    #[error("Transição de status inválida: {0:?} -> {1:?}")]
    InvalidTransition(OrderStatus, OrderStatus),

    #[error("Substituição já resolvida")]
    AlreadyResolved,

    #[error("Token inválido")]
    InvalidToken,

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::InvalidPayload(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::ResourceNotFound(what) => (
                StatusCode::NOT_FOUND,
                format!("Recurso não encontrado: {}", what),
            ),
            AppError::InvalidTransition(from, to) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Transição de status inválida: {:?} -> {:?}", from, to),
            ),
            AppError::AlreadyResolved => (
                StatusCode::CONFLICT,
                "Esta substituição já foi resolvida.".to_string(),
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "Token de autenticação inválido ou ausente.".to_string(),
            ),

            // Todos os outros erros (DatabaseError, InternalServerError) viram 500.
            // O `tracing` loga a mensagem detalhada que `thiserror` nos deu.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Ocorreu um erro inesperado.".to_string(),
                )
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
