use std::{
    collections::{HashMap, HashSet},
    iter,
    sync::{Arc, Weak},
};

use bytes::Bytes;
use parking_lot::RwLock;
use postbox_error::{PubSubError, PubSubResult};
use tokio::runtime::Handle;
use tracing::{debug, trace};

use super::{IdKind, Message, PubSubId, Registry, WILDCARD_TOPIC};

/// Издатель: хранит для каждой темы множество идентификаторов
/// подписчиков и рассылает им сообщения.
///
/// Подписчиками издатель не владеет, только их идентификаторами, которые
/// разрешаются через [`Registry`] в момент рассылки.
#[derive(Debug)]
pub struct Publisher {
    id: PubSubId,
    /// тема → подписчики; пустая строка: подписка на все темы
    subscribers: RwLock<HashMap<String, HashSet<PubSubId>>>,
    registry: Weak<Registry>,
}

impl Publisher {
    /// Создаёт издателя со свежим идентификатором.
    ///
    /// При `auto_register` издатель сразу регистрируется в `registry`.
    pub fn new(
        registry: &Arc<Registry>,
        auto_register: bool,
    ) -> PubSubResult<Arc<Self>> {
        let publisher = Arc::new(Self {
            id: PubSubId::generate(IdKind::Publisher),
            subscribers: RwLock::new(HashMap::new()),
            registry: Arc::downgrade(registry),
        });
        if auto_register {
            registry.register_publisher(publisher.clone())?;
        }
        debug!(publisher = %publisher.id, auto_register, "publisher created");
        Ok(publisher)
    }

    pub fn id(&self) -> &PubSubId {
        &self.id
    }

    /// Добавляет подписчика к теме. Повторный вызов ничего не меняет.
    ///
    /// Вызывается из [`Subscriber::subscribe`](super::Subscriber::subscribe).
    pub fn add_subscriber(
        &self,
        subscriber: &PubSubId,
        topic: &str,
    ) {
        self.subscribers
            .write()
            .entry(topic.to_owned())
            .or_default()
            .insert(subscriber.clone());
    }

    /// Убирает подписчика из перечисленных тем. Темы, на которые он не был
    /// подписан, пропускаются; опустевшие темы удаляются.
    pub fn remove_subscriber<S: AsRef<str>>(
        &self,
        subscriber: &PubSubId,
        topics: &[S],
    ) {
        let mut map = self.subscribers.write();
        for topic in topics {
            let topic = topic.as_ref();
            if let Some(set) = map.get_mut(topic) {
                set.remove(subscriber);
                if set.is_empty() {
                    map.remove(topic);
                }
            }
        }
    }

    /// Публикует `data` под темами `topics`.
    ///
    /// Получатели: объединение подписчиков всех `topics` и подписчиков
    /// темы-шаблона [`WILDCARD_TOPIC`]. Если получателей нет, сообщение не
    /// создаётся и возвращается `0`.
    ///
    /// Каждому получателю доставка идёт в отдельной задаче Tokio: полный
    /// ящик одного подписчика не задерживает остальных, а сам вызов не
    /// блокируется. Возвращает число запущенных доставок.
    pub fn publish<S: AsRef<str>>(
        &self,
        topics: &[S],
        data: impl Into<Bytes>,
    ) -> PubSubResult<usize> {
        let targets: HashSet<PubSubId> = {
            let map = self.subscribers.read();
            topics
                .iter()
                .map(AsRef::as_ref)
                .chain(iter::once(WILDCARD_TOPIC))
                .filter_map(|topic| map.get(topic))
                .flatten()
                .cloned()
                .collect()
        };

        if targets.is_empty() {
            trace!(publisher = %self.id, "no subscribers, publish skipped");
            return Ok(0);
        }

        let runtime = Handle::try_current().map_err(|_| PubSubError::NoRuntime)?;
        let msg = Message::new(
            self.id.clone(),
            topics.iter().map(|t| t.as_ref().to_owned()).collect(),
            data.into(),
        );
        let fanout = targets.len();
        trace!(publisher = %self.id, message = %msg.id, fanout, "dispatching");

        for subscriber in targets {
            runtime.spawn(deliver(self.registry.clone(), subscriber, msg.clone()));
        }
        Ok(fanout)
    }

    /// Идентификаторы подписчиков, подписанных ровно на `topic`.
    pub fn subscriber_ids(
        &self,
        topic: &str,
    ) -> Vec<PubSubId> {
        self.subscribers
            .read()
            .get(topic)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Темы, на которые есть хотя бы один подписчик.
    pub fn topics(&self) -> Vec<String> {
        self.subscribers.read().keys().cloned().collect()
    }

    /// Количество различных подписчиков по всем темам.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .values()
            .flatten()
            .collect::<HashSet<_>>()
            .len()
    }

    /// Удаляет издателя из реестра. Подписчики не уведомляются.
    /// Повторный вызов ничего не делает.
    pub fn unregister(&self) -> bool {
        let removed = self
            .registry
            .upgrade()
            .is_some_and(|registry| registry.unregister_publisher(self));
        if removed {
            debug!(publisher = %self.id, "publisher unregistered");
        }
        removed
    }
}

/// Одна доставка: разрешить подписчика через реестр и положить сообщение
/// в его ящик. Исчезнувший подписчик или закрытый ящик: не ошибка.
async fn deliver(
    registry: Weak<Registry>,
    subscriber: PubSubId,
    msg: Message,
) {
    let Some(target) = registry
        .upgrade()
        .and_then(|registry| registry.subscriber(subscriber.as_str()))
    else {
        debug!(%subscriber, message = %msg.id, "subscriber gone, delivery dropped");
        return;
    };

    if let Err(err) = target.receive(msg).await {
        debug!(%subscriber, %err, "delivery dropped");
    }
}
