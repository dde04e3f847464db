//! Подсистема Publish–Subscribe (pub/sub).
//!
//! Внутрипроцессное вещание байтовых сообщений по темам:
//!
//! - `id`: генерация идентификаторов с префиксом роли.
//! - `message`: неизменяемое сообщение, создаваемое при публикации.
//! - `mailbox`: ограниченная очередь подписчика с явным закрытием.
//! - `registry`: реестр живых издателей и подписчиков.
//! - `publisher`: темы → подписчики, рассылка по задаче на получателя.
//! - `subscriber`: подписки, почтовый ящик, блокирующее и неблокирующее
//!   получение.
//!
//! Связи издатель ↔ подписчик хранятся только как идентификаторы и
//! разрешаются через [`Registry`] в момент использования.

pub mod id;
pub mod mailbox;
pub mod message;
pub mod publisher;
pub mod registry;
pub mod subscriber;

pub use id::*;
pub use mailbox::*;
pub use message::*;
pub use publisher::*;
pub use registry::*;
pub use subscriber::*;

/// Тема-шаблон: подписка на неё получает все сообщения издателя.
pub const WILDCARD_TOPIC: &str = "";

/// Ёмкость почтового ящика по умолчанию.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 10;
