use std::borrow::Cow;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{IdKind, PubSubId};

/// Сообщение, созданное при публикации.
///
/// Неизменяемо после создания. Каждый получатель получает собственную
/// копию структуры; полезная нагрузка (`Bytes`) разделяется по счётчику
/// ссылок и никогда не мутируется.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Идентификатор сообщения (`msg-...`)
    pub id: PubSubId,
    /// Полезная нагрузка
    pub data: Bytes,
    /// Темы в том порядке, в каком их передали в `publish`
    pub topics: Vec<String>,
    /// Издатель, отправивший сообщение
    pub publisher: PubSubId,
    /// Время создания (UTC)
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub(crate) fn new(
        publisher: PubSubId,
        topics: Vec<String>,
        data: Bytes,
    ) -> Self {
        Self {
            id: PubSubId::generate(IdKind::Message),
            data,
            topics,
            publisher,
            created_at: Utc::now(),
        }
    }

    /// Полезная нагрузка как строка (некорректный UTF-8 заменяется).
    pub fn payload_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }

    /// Был ли `topic` среди тем, под которыми опубликовано сообщение.
    pub fn has_topic(
        &self,
        topic: &str,
    ) -> bool {
        self.topics.iter().any(|t| t == topic)
    }
}
