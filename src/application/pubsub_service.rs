use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, instrument};

use super::PubSubPort;
use crate::{
    config::PubSubConfig,
    error::{EntityKind, PubSubError, PubSubResult},
    pubsub::{Message, PubSubId, Publisher, Registry, Subscriber},
};

/// Фасад брокера: проверяет идентификаторы, разрешает их через реестр
/// и передаёт вызов издателю или подписчику.
#[derive(Debug)]
pub struct PubSubService {
    registry: Arc<Registry>,
    config: PubSubConfig,
}

impl PubSubService {
    /// Сервис с собственным пустым реестром.
    pub fn new(config: PubSubConfig) -> Self {
        Self::with_registry(Arc::new(Registry::new()), config)
    }

    /// Сервис поверх уже существующего реестра.
    pub fn with_registry(
        registry: Arc<Registry>,
        config: PubSubConfig,
    ) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn config(&self) -> &PubSubConfig {
        &self.config
    }

    fn publisher(
        &self,
        pub_id: &str,
    ) -> PubSubResult<Arc<Publisher>> {
        require("pub_id", pub_id)?;
        self.registry
            .publisher(pub_id)
            .ok_or_else(|| PubSubError::not_found(EntityKind::Publisher, pub_id))
    }

    fn subscriber(
        &self,
        sub_id: &str,
    ) -> PubSubResult<Arc<Subscriber>> {
        require("sub_id", sub_id)?;
        self.registry
            .subscriber(sub_id)
            .ok_or_else(|| PubSubError::not_found(EntityKind::Subscriber, sub_id))
    }

    /// Остановка: закрывает все ящики и очищает реестр.
    pub async fn shutdown(&self) {
        info!(
            publishers = self.registry.publisher_count(),
            subscribers = self.registry.subscriber_count(),
            "pubsub service shutting down"
        );
        self.registry.clear().await;
    }
}

impl Default for PubSubService {
    fn default() -> Self {
        Self::new(PubSubConfig::default())
    }
}

fn require(
    field: &'static str,
    value: &str,
) -> PubSubResult<()> {
    if value.is_empty() {
        return Err(PubSubError::InvalidArgument { field });
    }
    Ok(())
}

#[async_trait]
impl PubSubPort for PubSubService {
    fn new_publisher(
        &self,
        auto_register: bool,
    ) -> PubSubResult<PubSubId> {
        let publisher = Publisher::new(&self.registry, auto_register)?;
        Ok(publisher.id().clone())
    }

    fn new_subscriber(
        &self,
        buffer_size: i64,
        auto_register: bool,
    ) -> PubSubResult<PubSubId> {
        let capacity = usize::try_from(buffer_size)
            .ok()
            .filter(|n| *n > 0)
            .unwrap_or(self.config.default_mailbox_capacity);
        let subscriber = Subscriber::new(&self.registry, capacity, auto_register)?;
        Ok(subscriber.id().clone())
    }

    #[instrument(level = "trace", skip(self))]
    fn subscribe(
        &self,
        sub_id: &str,
        pub_id: &str,
        topic: &str,
    ) -> PubSubResult<()> {
        let subscriber = self.subscriber(sub_id)?;
        let publisher = self.publisher(pub_id)?;
        subscriber.subscribe(publisher.id(), topic);
        Ok(())
    }

    /// Издатель проверяется только на непустоту: подписку на уже
    /// удалённого издателя тоже можно снять.
    fn unsubscribe_publisher(
        &self,
        sub_id: &str,
        pub_id: &str,
    ) -> PubSubResult<()> {
        let subscriber = self.subscriber(sub_id)?;
        require("pub_id", pub_id)?;
        subscriber.unsubscribe_publisher(&PubSubId::from(pub_id));
        Ok(())
    }

    fn unsubscribe_topic(
        &self,
        sub_id: &str,
        pub_id: &str,
        topics: &[String],
    ) -> PubSubResult<()> {
        let subscriber = self.subscriber(sub_id)?;
        require("pub_id", pub_id)?;
        subscriber.unsubscribe_topic(&PubSubId::from(pub_id), topics);
        Ok(())
    }

    fn publish(
        &self,
        pub_id: &str,
        topics: &[String],
        data: Bytes,
    ) -> PubSubResult<usize> {
        self.publisher(pub_id)?.publish(topics, data)
    }

    fn try_consume(
        &self,
        sub_id: &str,
    ) -> PubSubResult<Option<Message>> {
        self.subscriber(sub_id)?.try_consume()
    }

    async fn consume_blocking<F>(
        &self,
        sub_id: &str,
        cancel: F,
    ) -> PubSubResult<Message>
    where
        F: Future + Send + 'static,
        F::Output: Send,
    {
        let subscriber = self.subscriber(sub_id)?;
        subscriber.consume_with_cancellation(cancel).await
    }

    fn keep_consume<F>(
        &self,
        sub_id: &str,
        cancel: F,
    ) -> PubSubResult<ReceiverStream<PubSubResult<Message>>>
    where
        F: Future + Send + 'static,
        F::Output: Send,
    {
        self.subscriber(sub_id)?.keep_consume(cancel)
    }

    async fn consume_timeout(
        &self,
        sub_id: &str,
        deadline: Duration,
    ) -> PubSubResult<Message> {
        let subscriber = self.subscriber(sub_id)?;
        subscriber.consume_timeout(deadline).await
    }

    fn unregister_publisher(
        &self,
        pub_id: &str,
    ) -> PubSubResult<()> {
        let publisher = self.publisher(pub_id)?;
        if !publisher.unregister() {
            // удалён конкурентным вызовом
            return Err(PubSubError::not_found(EntityKind::Publisher, pub_id));
        }
        Ok(())
    }

    async fn unregister_subscriber(
        &self,
        sub_id: &str,
    ) -> PubSubResult<()> {
        let subscriber = self.subscriber(sub_id)?;
        if !subscriber.unregister().await {
            return Err(PubSubError::not_found(EntityKind::Subscriber, sub_id));
        }
        debug!(subscriber = sub_id, "subscriber removed via service");
        Ok(())
    }
}
