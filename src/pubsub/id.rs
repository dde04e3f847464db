use std::{borrow::Borrow, fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Роль, под которую выдаётся идентификатор.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    Publisher,
    Subscriber,
    Message,
}

impl IdKind {
    /// Префикс, которым помечаются идентификаторы этой роли.
    pub const fn prefix(self) -> &'static str {
        match self {
            IdKind::Publisher => "pub-",
            IdKind::Subscriber => "sub-",
            IdKind::Message => "msg-",
        }
    }
}

/// Идентификатор издателя, подписчика или сообщения.
///
/// Непрозрачная строка с префиксом роли (`pub-`, `sub-`, `msg-`).
/// Клонирование дешёвое, внутри `Arc<str>`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PubSubId(Arc<str>);

impl PubSubId {
    /// Генерирует новый идентификатор: префикс роли + UUID v4.
    pub fn generate(kind: IdKind) -> Self {
        Self(Arc::from(format!("{}{}", kind.prefix(), Uuid::new_v4())))
    }

    /// Роль, восстановленная по префиксу. `None` для чужих строк.
    pub fn kind(&self) -> Option<IdKind> {
        [IdKind::Publisher, IdKind::Subscriber, IdKind::Message]
            .into_iter()
            .find(|k| self.0.starts_with(k.prefix()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for PubSubId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl fmt::Display for PubSubId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for PubSubId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for PubSubId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PubSubId {
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for PubSubId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    /// Тест проверяет, что идентификатор несёт префикс своей роли.
    #[test]
    fn test_generate_has_role_prefix() {
        let p = PubSubId::generate(IdKind::Publisher);
        let s = PubSubId::generate(IdKind::Subscriber);
        let m = PubSubId::generate(IdKind::Message);

        assert!(p.as_str().starts_with("pub-"));
        assert!(s.as_str().starts_with("sub-"));
        assert!(m.as_str().starts_with("msg-"));

        assert_eq!(p.kind(), Some(IdKind::Publisher));
        assert_eq!(s.kind(), Some(IdKind::Subscriber));
        assert_eq!(m.kind(), Some(IdKind::Message));
    }

    /// Тест проверяет, что последовательные вызовы не повторяются.
    #[test]
    fn test_generate_unique() {
        let ids: HashSet<_> = (0..1000)
            .map(|_| PubSubId::generate(IdKind::Subscriber))
            .collect();
        assert_eq!(ids.len(), 1000);
    }

    /// Тест проверяет равенство по значению и поиск по `&str`.
    #[test]
    fn test_equality_by_value_and_borrow() {
        let a = PubSubId::from("sub-abc");
        let b = PubSubId::from(String::from("sub-abc"));
        assert_eq!(a, b);

        let set: HashSet<PubSubId> = [a].into_iter().collect();
        assert!(set.contains("sub-abc"));
    }

    #[test]
    fn test_foreign_and_empty_ids() {
        let foreign = PubSubId::from("client-42");
        assert_eq!(foreign.kind(), None);
        assert!(!foreign.is_empty());
        assert!(PubSubId::from("").is_empty());
        assert_eq!(foreign.to_string(), "client-42");
    }
}
