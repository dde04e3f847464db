use std::{any::Any, fmt};

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Вид сущности реестра, к которой относится ошибка.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Publisher,
    Subscriber,
}

/// Ошибки ядра Pub/Sub.
///
/// Все ошибки возвращаются синхронно вызывающему; внутренних повторов нет.
/// Сбои доставки во время `publish` сюда не попадают, они только
/// логируются.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PubSubError {
    /// Пустой или некорректный идентификатор
    #[error("{field} is required")]
    InvalidArgument { field: &'static str },

    /// Идентификатор не найден в реестре
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// Идентификатор уже занят в реестре
    #[error("{kind} already registered: {id}")]
    AlreadyExists { kind: EntityKind, id: String },

    /// Почтовый ящик закрыт и пуст
    #[error("subscriber closed")]
    SubscriberClosed,

    /// Попытка положить сообщение в закрытый почтовый ящик
    #[error("mailbox is closed")]
    MailboxClosed,

    /// Внешний сигнал отмены сработал раньше, чем пришло сообщение
    #[error("operation cancelled")]
    Cancelled,

    /// Истёк срок ожидания сообщения
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// Рассылка вызвана вне Tokio runtime
    #[error("no async runtime available for message dispatch")]
    NoRuntime,
}

impl PubSubError {
    pub fn not_found(
        kind: EntityKind,
        id: impl fmt::Display,
    ) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn already_exists(
        kind: EntityKind,
        id: impl fmt::Display,
    ) -> Self {
        Self::AlreadyExists {
            kind,
            id: id.to_string(),
        }
    }

    /// Является ли ошибка результатом внешнего сигнала (отмена или таймаут).
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::Publisher => write!(f, "publisher"),
            Self::Subscriber => write!(f, "subscriber"),
        }
    }
}

impl ErrorExt for PubSubError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidArgument { .. } => StatusCode::InvalidArgs,
            Self::NotFound { .. } => StatusCode::NotFound,
            Self::AlreadyExists { .. } => StatusCode::AlreadyExists,
            Self::SubscriberClosed | Self::MailboxClosed => StatusCode::ConnectionClosed,
            Self::Cancelled => StatusCode::Cancelled,
            Self::DeadlineExceeded => StatusCode::Timeout,
            Self::NoRuntime => StatusCode::Internal,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        let mut tags = vec![
            ("error_type", "pubsub".to_string()),
            ("status_code", self.status_code().to_string()),
        ];

        match self {
            Self::NotFound { kind, .. } | Self::AlreadyExists { kind, .. } => {
                tags.push(("entity", kind.to_string()));
            }
            Self::InvalidArgument { field } => {
                tags.push(("field", field.to_string()));
            }
            _ => {}
        }

        tags
    }
}
