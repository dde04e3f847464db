//! Интерфейс (порт) брокера для внешних адаптеров (RPC, HTTP, CLI).
//!
//! Все операции принимают идентификаторы строками в том виде, в каком
//! они пришли по сети:
//! - пустой идентификатор: [`PubSubError::InvalidArgument`];
//! - неизвестный реестру: [`PubSubError::NotFound`].
//!
//! [`PubSubError::InvalidArgument`]: crate::PubSubError::InvalidArgument
//! [`PubSubError::NotFound`]: crate::PubSubError::NotFound

use std::{future::Future, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use tokio_stream::wrappers::ReceiverStream;

use crate::{
    error::PubSubResult,
    pubsub::{Message, PubSubId},
};

#[async_trait]
pub trait PubSubPort: Send + Sync {
    /// Создать издателя и вернуть его идентификатор.
    fn new_publisher(
        &self,
        auto_register: bool,
    ) -> PubSubResult<PubSubId>;

    /// Создать подписчика. `buffer_size <= 0`: ёмкость по умолчанию.
    fn new_subscriber(
        &self,
        buffer_size: i64,
        auto_register: bool,
    ) -> PubSubResult<PubSubId>;

    /// Подписать `sub_id` на тему `topic` издателя `pub_id`
    /// (пустая тема: все темы).
    fn subscribe(
        &self,
        sub_id: &str,
        pub_id: &str,
        topic: &str,
    ) -> PubSubResult<()>;

    /// Отписать от всех тем издателя.
    fn unsubscribe_publisher(
        &self,
        sub_id: &str,
        pub_id: &str,
    ) -> PubSubResult<()>;

    /// Отписать от перечисленных тем издателя.
    fn unsubscribe_topic(
        &self,
        sub_id: &str,
        pub_id: &str,
        topics: &[String],
    ) -> PubSubResult<()>;

    /// Опубликовать сообщение. Возвращает число запущенных доставок.
    fn publish(
        &self,
        pub_id: &str,
        topics: &[String],
        data: Bytes,
    ) -> PubSubResult<usize>;

    /// Забрать сообщение без ожидания.
    fn try_consume(
        &self,
        sub_id: &str,
    ) -> PubSubResult<Option<Message>>;

    /// Ждать сообщение, пока не сработает `cancel`.
    async fn consume_blocking<F>(
        &self,
        sub_id: &str,
        cancel: F,
    ) -> PubSubResult<Message>
    where
        F: Future + Send + 'static,
        F::Output: Send;

    /// Получать сообщения потоком, пока не сработает `cancel`.
    ///
    /// Отмена или истёкший срок завершают поток без ошибки; закрытый
    /// подписчик даёт последним элементом `SubscriberClosed`.
    fn keep_consume<F>(
        &self,
        sub_id: &str,
        cancel: F,
    ) -> PubSubResult<ReceiverStream<PubSubResult<Message>>>
    where
        F: Future + Send + 'static,
        F::Output: Send;

    /// Ждать сообщение не дольше `deadline`.
    async fn consume_timeout(
        &self,
        sub_id: &str,
        deadline: Duration,
    ) -> PubSubResult<Message>;

    fn unregister_publisher(
        &self,
        pub_id: &str,
    ) -> PubSubResult<()>;

    async fn unregister_subscriber(
        &self,
        sub_id: &str,
    ) -> PubSubResult<()>;
}
