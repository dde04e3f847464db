use postbox_error::{PubSubError, PubSubResult};
use tokio::sync::{
    mpsc::{self, error::TryRecvError},
    watch, Mutex, Semaphore,
};

use super::Message;

/// Ограниченная FIFO-очередь сообщений одного подписчика.
///
/// Состояния:
/// - открыт: `push` ждёт свободного места, `pop` ждёт сообщения;
/// - закрыт, но не пуст: `push` сразу отказывает, буфер ещё можно
///   вычитать;
/// - закрыт и пуст: `pop`/`try_pop` возвращают
///   [`PubSubError::SubscriberClosed`].
///
/// Закрытие необратимо и происходит ровно один раз.
#[derive(Debug)]
pub struct Mailbox {
    tx: mpsc::Sender<Message>,
    rx: Mutex<mpsc::Receiver<Message>>,
    closed: watch::Sender<bool>,
    capacity: usize,
}

impl Mailbox {
    /// Создаёт почтовый ящик на `capacity` сообщений.
    ///
    /// Ёмкость приводится к диапазону `1..=Semaphore::MAX_PERMITS`:
    /// больше канал Tokio не принимает.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, Semaphore::MAX_PERMITS);
        let (tx, rx) = mpsc::channel(capacity);
        let (closed, _) = watch::channel(false);
        Self {
            tx,
            rx: Mutex::new(rx),
            closed,
            capacity,
        }
    }

    /// Кладёт сообщение в очередь.
    ///
    /// Если очередь полна, ждёт освобождения места. Ожидание прерывается
    /// закрытием ящика; сообщение при этом не доставляется.
    pub async fn push(
        &self,
        msg: Message,
    ) -> PubSubResult<()> {
        let mut closed = self.closed.subscribe();
        if *closed.borrow_and_update() {
            return Err(PubSubError::MailboxClosed);
        }

        tokio::select! {
            biased;
            _ = closed.wait_for(|c| *c) => Err(PubSubError::MailboxClosed),
            sent = self.tx.send(msg) => sent.map_err(|_| PubSubError::MailboxClosed),
        }
    }

    /// Ждёт следующее сообщение.
    ///
    /// После закрытия сначала отдаются оставшиеся в буфере сообщения,
    /// затем [`PubSubError::SubscriberClosed`].
    pub async fn pop(&self) -> PubSubResult<Message> {
        let mut rx = self.rx.lock().await;
        let mut closed = self.closed.subscribe();

        tokio::select! {
            biased;
            msg = rx.recv() => msg.ok_or(PubSubError::SubscriberClosed),
            _ = closed.wait_for(|c| *c) => rx.try_recv().map_err(|_| PubSubError::SubscriberClosed),
        }
    }

    /// Неблокирующее получение.
    ///
    /// `Ok(None)`: сообщений нет (или их прямо сейчас ожидает другой
    /// потребитель этого ящика).
    pub fn try_pop(&self) -> PubSubResult<Option<Message>> {
        let Ok(mut rx) = self.rx.try_lock() else {
            return if self.is_closed() && self.is_empty() {
                Err(PubSubError::SubscriberClosed)
            } else {
                Ok(None)
            };
        };

        match rx.try_recv() {
            Ok(msg) => Ok(Some(msg)),
            Err(TryRecvError::Disconnected) => Err(PubSubError::SubscriberClosed),
            Err(TryRecvError::Empty) if self.is_closed() => {
                // отправка могла успеть до закрытия
                rx.try_recv()
                    .map(Some)
                    .map_err(|_| PubSubError::SubscriberClosed)
            }
            Err(TryRecvError::Empty) => Ok(None),
        }
    }

    /// Закрывает ящик. Возвращает `true`, если переход выполнил именно
    /// этот вызов.
    pub async fn close(&self) -> bool {
        let transitioned = self
            .closed
            .send_if_modified(|closed| !std::mem::replace(closed, true));
        if transitioned {
            self.rx.lock().await.close();
        }
        transitioned
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Количество сообщений в буфере (приблизительно при конкурентной
    /// записи).
    pub fn len(&self) -> usize {
        self.capacity.saturating_sub(self.tx.capacity())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
