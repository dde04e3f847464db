use std::sync::Arc;

use dashmap::{mapref::entry::Entry, DashMap};
use postbox_error::{EntityKind, PubSubError, PubSubResult};
use tracing::{debug, trace};

use super::{PubSubId, Publisher, Subscriber};

/// Реестр живых издателей и подписчиков.
///
/// Явный объект с ограниченным временем жизни: создаётся при старте
/// приложения и передаётся по ссылке (`Arc<Registry>`) всем, кто создаёт
/// издателей и подписчиков. Издатели и подписчики держат на него только
/// `Weak`, поэтому циклов владения нет.
///
/// Обе карты на `DashMap` (шардированные RW-блокировки): поиск идёт
/// параллельно, регистрация и удаление исключают друг друга в пределах
/// шарда.
#[derive(Debug, Default)]
pub struct Registry {
    publishers: DashMap<PubSubId, Arc<Publisher>>,
    subscribers: DashMap<PubSubId, Arc<Subscriber>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Регистрирует издателя. Занятый идентификатор даёт ошибку
    /// [`PubSubError::AlreadyExists`], существующая запись не трогается.
    pub fn register_publisher(
        &self,
        publisher: Arc<Publisher>,
    ) -> PubSubResult<()> {
        match self.publishers.entry(publisher.id().clone()) {
            Entry::Occupied(e) => Err(PubSubError::already_exists(
                EntityKind::Publisher,
                e.key(),
            )),
            Entry::Vacant(e) => {
                trace!(publisher = %publisher.id(), "publisher registered");
                e.insert(publisher);
                Ok(())
            }
        }
    }

    /// Регистрирует подписчика. Занятый идентификатор даёт ошибку
    /// [`PubSubError::AlreadyExists`].
    pub fn register_subscriber(
        &self,
        subscriber: Arc<Subscriber>,
    ) -> PubSubResult<()> {
        match self.subscribers.entry(subscriber.id().clone()) {
            Entry::Occupied(e) => Err(PubSubError::already_exists(
                EntityKind::Subscriber,
                e.key(),
            )),
            Entry::Vacant(e) => {
                trace!(subscriber = %subscriber.id(), "subscriber registered");
                e.insert(subscriber);
                Ok(())
            }
        }
    }

    /// Удаляет именно этот экземпляр издателя. Возвращает `true`, если
    /// запись была удалена.
    pub fn unregister_publisher(
        &self,
        publisher: &Publisher,
    ) -> bool {
        self.publishers
            .remove_if(publisher.id(), |_, p| std::ptr::eq(Arc::as_ptr(p), publisher))
            .is_some()
    }

    /// Удаляет именно этот экземпляр подписчика. Возвращает `true`, если
    /// запись была удалена.
    pub fn unregister_subscriber(
        &self,
        subscriber: &Subscriber,
    ) -> bool {
        self.subscribers
            .remove_if(subscriber.id(), |_, s| {
                std::ptr::eq(Arc::as_ptr(s), subscriber)
            })
            .is_some()
    }

    pub fn publisher(
        &self,
        id: &str,
    ) -> Option<Arc<Publisher>> {
        self.publishers.get(id).map(|e| e.value().clone())
    }

    pub fn subscriber(
        &self,
        id: &str,
    ) -> Option<Arc<Subscriber>> {
        self.subscribers.get(id).map(|e| e.value().clone())
    }

    pub fn publisher_count(&self) -> usize {
        self.publishers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn publisher_ids(&self) -> Vec<PubSubId> {
        self.publishers.iter().map(|e| e.key().clone()).collect()
    }

    pub fn subscriber_ids(&self) -> Vec<PubSubId> {
        self.subscribers.iter().map(|e| e.key().clone()).collect()
    }

    /// Очищает реестр при остановке приложения: все почтовые ящики
    /// закрываются, записи удаляются.
    pub async fn clear(&self) {
        let subscribers: Vec<Arc<Subscriber>> =
            self.subscribers.iter().map(|e| e.value().clone()).collect();
        self.subscribers.clear();
        self.publishers.clear();

        for subscriber in &subscribers {
            subscriber.close_mailbox().await;
        }
        debug!(closed_mailboxes = subscribers.len(), "registry cleared");
    }
}
