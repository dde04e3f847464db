use std::{
    collections::{HashMap, HashSet},
    future::Future,
    sync::{Arc, Weak},
    time::Duration,
};

use parking_lot::RwLock;
use postbox_error::{PubSubError, PubSubResult};
use tokio::{runtime::Handle, sync::mpsc};
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use super::{IdKind, Mailbox, Message, PubSubId, Publisher, Registry, DEFAULT_MAILBOX_CAPACITY};

/// Подписчик: хранит подписки (издатель → темы) и собственный
/// ограниченный почтовый ящик.
///
/// Жизненный цикл: активен → закрыт. Переход выполняет только
/// [`Subscriber::unregister`], и только один раз. В закрытом состоянии
/// уже буферизованные сообщения ещё можно вычитать, новые не принимаются.
///
/// Порядок блокировок: сначала своя карта подписок, затем карта издателя.
/// Ни одна блокировка не удерживается через `.await`.
#[derive(Debug)]
pub struct Subscriber {
    id: PubSubId,
    subscriptions: RwLock<HashMap<PubSubId, HashSet<String>>>,
    mailbox: Mailbox,
    registry: Weak<Registry>,
}

impl Subscriber {
    /// Создаёт подписчика с ящиком на `buffer_size` сообщений
    /// (`0` означает [`DEFAULT_MAILBOX_CAPACITY`]).
    pub fn new(
        registry: &Arc<Registry>,
        buffer_size: usize,
        auto_register: bool,
    ) -> PubSubResult<Arc<Self>> {
        let capacity = if buffer_size == 0 {
            DEFAULT_MAILBOX_CAPACITY
        } else {
            buffer_size
        };
        let subscriber = Arc::new(Self {
            id: PubSubId::generate(IdKind::Subscriber),
            subscriptions: RwLock::new(HashMap::new()),
            mailbox: Mailbox::new(capacity),
            registry: Arc::downgrade(registry),
        });
        if auto_register {
            registry.register_subscriber(subscriber.clone())?;
        }
        debug!(subscriber = %subscriber.id, capacity, auto_register, "subscriber created");
        Ok(subscriber)
    }

    pub fn id(&self) -> &PubSubId {
        &self.id
    }

    fn resolve_publisher(
        &self,
        publisher: &PubSubId,
    ) -> Option<Arc<Publisher>> {
        self.registry
            .upgrade()
            .and_then(|registry| registry.publisher(publisher.as_str()))
    }

    /// Подписывается на тему `topic` издателя `publisher`
    /// ([`WILDCARD_TOPIC`](super::WILDCARD_TOPIC): на все темы).
    ///
    /// Подписка записывается локально всегда; издатель связывается, только
    /// если он сейчас есть в реестре. Повторной привязки при его
    /// последующей регистрации нет.
    pub fn subscribe(
        &self,
        publisher: &PubSubId,
        topic: &str,
    ) {
        let mut subscriptions = self.subscriptions.write();
        subscriptions
            .entry(publisher.clone())
            .or_default()
            .insert(topic.to_owned());

        match self.resolve_publisher(publisher) {
            Some(p) => p.add_subscriber(&self.id, topic),
            None => debug!(
                subscriber = %self.id,
                %publisher,
                topic,
                "publisher not registered, subscription recorded locally"
            ),
        }
    }

    /// Отписывается от всех тем издателя одним шагом.
    pub fn unsubscribe_publisher(
        &self,
        publisher: &PubSubId,
    ) {
        let mut subscriptions = self.subscriptions.write();
        let Some(topics) = subscriptions.remove(publisher) else {
            return;
        };

        if let Some(p) = self.resolve_publisher(publisher) {
            let topics: Vec<String> = topics.into_iter().collect();
            p.remove_subscriber(&self.id, &topics);
        }
    }

    /// Отписывается от перечисленных тем издателя. Если тем у издателя не
    /// осталось, запись о нём удаляется.
    pub fn unsubscribe_topic<S: AsRef<str>>(
        &self,
        publisher: &PubSubId,
        topics: &[S],
    ) {
        let mut subscriptions = self.subscriptions.write();
        let Some(subscribed) = subscriptions.get_mut(publisher) else {
            return;
        };
        for topic in topics {
            subscribed.remove(topic.as_ref());
        }
        if subscribed.is_empty() {
            subscriptions.remove(publisher);
        }

        if let Some(p) = self.resolve_publisher(publisher) {
            p.remove_subscriber(&self.id, topics);
        }
    }

    /// Кладёт сообщение в ящик; точка входа для рассылки издателя.
    ///
    /// При полном ящике ждёт места. На закрытом ящике сразу возвращает
    /// [`PubSubError::MailboxClosed`].
    pub async fn receive(
        &self,
        msg: Message,
    ) -> PubSubResult<()> {
        self.mailbox.push(msg).await
    }

    /// Ждёт сообщение без ограничения по времени.
    pub async fn consume(&self) -> PubSubResult<Message> {
        self.mailbox.pop().await
    }

    /// Ждёт сообщение, пока не сработает внешний сигнал `cancel`.
    ///
    /// Сработавший сигнал даёт [`PubSubError::Cancelled`], закрытый и
    /// пустой ящик даёт [`PubSubError::SubscriberClosed`].
    pub async fn consume_with_cancellation<F>(
        &self,
        cancel: F,
    ) -> PubSubResult<Message>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            msg = self.mailbox.pop() => msg,
            _ = cancel => Err(PubSubError::Cancelled),
        }
    }

    /// Ждёт сообщение не дольше `deadline`, иначе
    /// [`PubSubError::DeadlineExceeded`].
    pub async fn consume_timeout(
        &self,
        deadline: Duration,
    ) -> PubSubResult<Message> {
        tokio::time::timeout(deadline, self.mailbox.pop())
            .await
            .map_err(|_| PubSubError::DeadlineExceeded)?
    }

    /// Непрерывное получение: сообщения идут в поток, пока не сработает
    /// `cancel` или не закроется ящик.
    ///
    /// Сигнал `cancel` (отмена или истёкший срок) завершает поток без
    /// ошибки. Закрытый и пустой ящик даёт последним элементом
    /// [`PubSubError::SubscriberClosed`]. Если поток бросили, фоновая
    /// задача завершается, а невычитанные сообщения остаются в ящике.
    ///
    /// Требует Tokio runtime, иначе [`PubSubError::NoRuntime`].
    pub fn keep_consume<F>(
        self: &Arc<Self>,
        cancel: F,
    ) -> PubSubResult<ReceiverStream<PubSubResult<Message>>>
    where
        F: Future + Send + 'static,
        F::Output: Send,
    {
        let runtime = Handle::try_current().map_err(|_| PubSubError::NoRuntime)?;
        let (tx, rx) = mpsc::channel(1);
        let subscriber = Arc::clone(self);

        runtime.spawn(async move {
            tokio::pin!(cancel);
            loop {
                let next = tokio::select! {
                    biased;
                    _ = tx.closed() => break,
                    next = subscriber.consume_with_cancellation(&mut cancel) => next,
                };
                match next {
                    Ok(msg) => {
                        if tx.send(Ok(msg)).await.is_err() {
                            break;
                        }
                    }
                    Err(err) if err.is_interrupted() => break,
                    Err(err) => {
                        let _ = tx.send(Err(err)).await;
                        break;
                    }
                }
            }
            debug!(subscriber = %subscriber.id, "keep_consume finished");
        });

        Ok(ReceiverStream::new(rx))
    }

    /// Неблокирующее получение: `Ok(None)`, если сообщений нет.
    pub fn try_consume(&self) -> PubSubResult<Option<Message>> {
        self.mailbox.try_pop()
    }

    /// Закрывает ящик и удаляет подписчика из реестра.
    ///
    /// Связи с издателями не снимаются: оставшиеся у них записи становятся
    /// безвредными: рассылка по ним отбрасывается. Возвращает `true`, если
    /// закрытие выполнил этот вызов.
    pub async fn unregister(&self) -> bool {
        let closed = self.close_mailbox().await;
        if let Some(registry) = self.registry.upgrade() {
            registry.unregister_subscriber(self);
        }
        if closed {
            debug!(subscriber = %self.id, pending = self.mailbox.len(), "subscriber unregistered");
        }
        closed
    }

    pub(crate) async fn close_mailbox(&self) -> bool {
        self.mailbox.close().await
    }

    pub fn is_closed(&self) -> bool {
        self.mailbox.is_closed()
    }

    /// Сообщения, ожидающие в ящике.
    pub fn pending(&self) -> usize {
        self.mailbox.len()
    }

    pub fn capacity(&self) -> usize {
        self.mailbox.capacity()
    }

    /// Снимок подписок: издатель → темы.
    pub fn subscriptions(&self) -> HashMap<PubSubId, HashSet<String>> {
        self.subscriptions.read().clone()
    }

    pub fn topics_for(
        &self,
        publisher: &PubSubId,
    ) -> HashSet<String> {
        self.subscriptions
            .read()
            .get(publisher)
            .cloned()
            .unwrap_or_default()
    }

    pub fn is_subscribed(
        &self,
        publisher: &PubSubId,
        topic: &str,
    ) -> bool {
        self.subscriptions
            .read()
            .get(publisher)
            .is_some_and(|topics| topics.contains(topic))
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use tokio::{sync::oneshot, time::timeout};
    use tokio_stream::StreamExt;

    use super::*;

    fn registry() -> Arc<Registry> {
        Arc::new(Registry::new())
    }

    fn msg(payload: &'static str) -> Message {
        Message::new(
            PubSubId::from("pub-test"),
            vec!["t".into()],
            Bytes::from_static(payload.as_bytes()),
        )
    }

    #[test]
    fn test_default_capacity() {
        let reg = registry();
        assert_eq!(Subscriber::new(&reg, 0, false).unwrap().capacity(), 10);
        assert_eq!(Subscriber::new(&reg, 3, false).unwrap().capacity(), 3);
    }

    /// Тест проверяет, что огромный размер буфера не приводит к панике.
    #[test]
    fn test_huge_buffer_size_clamped() {
        let reg = registry();
        let s = Subscriber::new(&reg, usize::MAX, true).unwrap();
        assert_eq!(s.capacity(), tokio::sync::Semaphore::MAX_PERMITS);
        assert_eq!(s.try_consume(), Ok(None));
    }

    /// Тест проверяет, что подписка обновляет обе стороны связи сразу
    /// после возврата из вызова.
    #[test]
    fn test_subscribe_links_both_sides() {
        let reg = registry();
        let p = Publisher::new(&reg, true).unwrap();
        let s = Subscriber::new(&reg, 1, true).unwrap();

        s.subscribe(p.id(), "news");
        assert!(s.is_subscribed(p.id(), "news"));
        assert_eq!(p.subscriber_ids("news"), vec![s.id().clone()]);

        s.unsubscribe_topic(p.id(), &["news"]);
        assert!(!s.is_subscribed(p.id(), "news"));
        assert!(s.subscriptions().is_empty(), "пустая запись издателя удаляется");
        assert!(p.subscriber_ids("news").is_empty());
    }

    /// Тест проверяет отписку от издателя целиком.
    #[test]
    fn test_unsubscribe_publisher_removes_all_topics() {
        let reg = registry();
        let p = Publisher::new(&reg, true).unwrap();
        let s = Subscriber::new(&reg, 1, true).unwrap();

        for topic in ["a", "b", ""] {
            s.subscribe(p.id(), topic);
        }
        assert_eq!(s.topics_for(p.id()).len(), 3);

        s.unsubscribe_publisher(p.id());
        assert!(s.topics_for(p.id()).is_empty());
        assert!(p.topics().is_empty());

        // повторно: no-op
        s.unsubscribe_publisher(p.id());
    }

    /// Тест проверяет частичную отписку и отписку от неподписанной темы.
    #[test]
    fn test_unsubscribe_topic_partial() {
        let reg = registry();
        let p = Publisher::new(&reg, true).unwrap();
        let s = Subscriber::new(&reg, 1, true).unwrap();
        s.subscribe(p.id(), "a");
        s.subscribe(p.id(), "b");

        s.unsubscribe_topic(p.id(), &["a", "never"]);
        assert_eq!(
            s.topics_for(p.id()),
            HashSet::from(["b".to_string()])
        );
        assert_eq!(p.topics(), vec!["b".to_string()]);

        s.unsubscribe_topic(&PubSubId::from("pub-unknown"), &["x"]);
    }

    /// Тест проверяет подписку на незарегистрированного издателя: она
    /// сохраняется локально, а отписка не падает.
    #[test]
    fn test_subscribe_unresolved_publisher() {
        let reg = registry();
        let p = Publisher::new(&reg, false).unwrap();
        let s = Subscriber::new(&reg, 1, true).unwrap();

        s.subscribe(p.id(), "x");
        assert!(s.is_subscribed(p.id(), "x"));
        assert!(p.subscriber_ids("x").is_empty());

        s.unsubscribe_publisher(p.id());
        assert!(!s.is_subscribed(p.id(), "x"));
    }

    /// Тест проверяет, что отписка от удалённого издателя ничего не делает.
    #[test]
    fn test_unsubscribe_after_publisher_unregistered() {
        let reg = registry();
        let p = Publisher::new(&reg, true).unwrap();
        let s = Subscriber::new(&reg, 1, true).unwrap();
        s.subscribe(p.id(), "x");

        p.unregister();
        s.unsubscribe_topic(p.id(), &["x"]);
        s.unsubscribe_publisher(p.id());
        assert!(s.subscriptions().is_empty());
    }

    /// Тест проверяет, что сигнал отмены прерывает ожидание.
    #[tokio::test]
    async fn test_consume_cancelled() {
        let reg = registry();
        let s = Subscriber::new(&reg, 1, true).unwrap();
        let (tx, rx) = oneshot::channel::<()>();

        let waiter = {
            let s = s.clone();
            tokio::spawn(async move { s.consume_with_cancellation(rx).await })
        };
        tx.send(()).unwrap();

        let res = timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(res, Err(PubSubError::Cancelled));
    }

    /// Тест проверяет, что готовое сообщение выигрывает у сигнала отмены.
    #[tokio::test]
    async fn test_consume_with_cancellation_prefers_message() {
        let reg = registry();
        let s = Subscriber::new(&reg, 1, true).unwrap();
        s.receive(msg("ready")).await.unwrap();

        let got = s
            .consume_with_cancellation(std::future::ready(()))
            .await
            .unwrap();
        assert_eq!(got.payload_str(), "ready");
    }

    #[tokio::test(start_paused = true)]
    async fn test_consume_timeout() {
        let reg = registry();
        let s = Subscriber::new(&reg, 1, true).unwrap();
        assert_eq!(
            s.consume_timeout(Duration::from_secs(5)).await,
            Err(PubSubError::DeadlineExceeded)
        );
    }

    /// Тест проверяет жизненный цикл: после `unregister` буфер
    /// вычитывается по порядку, затем `SubscriberClosed`.
    #[tokio::test]
    async fn test_unregister_drains_then_closed() {
        let reg = registry();
        let s = Subscriber::new(&reg, 4, true).unwrap();
        s.receive(msg("1")).await.unwrap();
        s.receive(msg("2")).await.unwrap();
        assert_eq!(s.pending(), 2);

        assert!(s.unregister().await);
        assert!(!s.unregister().await);
        assert!(s.is_closed());
        assert!(reg.subscriber(s.id().as_str()).is_none());

        assert_eq!(
            s.receive(msg("late")).await,
            Err(PubSubError::MailboxClosed)
        );
        assert_eq!(s.consume().await.unwrap().payload_str(), "1");
        assert_eq!(s.try_consume().unwrap().unwrap().payload_str(), "2");
        assert_eq!(s.try_consume(), Err(PubSubError::SubscriberClosed));
        assert_eq!(s.consume().await, Err(PubSubError::SubscriberClosed));
        assert_eq!(
            s.consume_with_cancellation(std::future::pending::<()>())
                .await,
            Err(PubSubError::SubscriberClosed)
        );
    }

    /// Тест проверяет, что поток отдаёт сообщения по порядку и
    /// завершается без ошибки по сигналу отмены.
    #[tokio::test]
    async fn test_keep_consume_until_cancelled() {
        let reg = registry();
        let s = Subscriber::new(&reg, 4, true).unwrap();
        s.receive(msg("1")).await.unwrap();
        s.receive(msg("2")).await.unwrap();

        let (stop, cancel) = oneshot::channel::<()>();
        let mut stream = s.keep_consume(cancel).unwrap();

        for expected in ["1", "2"] {
            let got = timeout(Duration::from_secs(1), stream.next())
                .await
                .expect("stream stuck")
                .expect("stream ended early")
                .unwrap();
            assert_eq!(got.payload_str(), expected);
        }

        s.receive(msg("3")).await.unwrap();
        let got = timeout(Duration::from_secs(1), stream.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(got.payload_str(), "3");

        stop.send(()).unwrap();
        let end = timeout(Duration::from_secs(1), stream.next())
            .await
            .expect("stream stuck");
        assert!(end.is_none(), "отмена завершает поток без ошибки");
    }

    /// Тест проверяет, что истёкший срок тоже завершает поток штатно.
    #[tokio::test(start_paused = true)]
    async fn test_keep_consume_deadline() {
        let reg = registry();
        let s = Subscriber::new(&reg, 1, true).unwrap();
        let mut stream = s
            .keep_consume(tokio::time::sleep(Duration::from_secs(5)))
            .unwrap();
        assert!(stream.next().await.is_none());
    }

    /// Тест проверяет, что после закрытия ящика поток дочитывает буфер и
    /// заканчивается ошибкой `SubscriberClosed`.
    #[tokio::test]
    async fn test_keep_consume_ends_with_closed() {
        let reg = registry();
        let s = Subscriber::new(&reg, 2, true).unwrap();
        s.receive(msg("last")).await.unwrap();
        s.unregister().await;

        let mut stream = s.keep_consume(std::future::pending::<()>()).unwrap();
        let items: Vec<_> = timeout(Duration::from_secs(1), async {
            let mut items = Vec::new();
            while let Some(item) = stream.next().await {
                items.push(item);
            }
            items
        })
        .await
        .expect("stream stuck");

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap().payload_str(), "last");
        assert_eq!(items[1], Err(PubSubError::SubscriberClosed));
    }

    /// Тест проверяет, что поток нельзя открыть вне runtime.
    #[test]
    fn test_keep_consume_outside_runtime() {
        let reg = registry();
        let s = Subscriber::new(&reg, 1, true).unwrap();
        assert!(matches!(
            s.keep_consume(std::future::pending::<()>()),
            Err(PubSubError::NoRuntime)
        ));
    }
}
