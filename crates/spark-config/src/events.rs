//! 配置生命周期事件与异步通知器。
//!
//! # 教案式说明
//! - **意图 (Why)**：配置提交发生在 Init / Refresh 调用方线程上，订阅者的处理逻辑（重建连接池、
//!   调整日志级别等）不应拖慢甚至阻塞提交路径，因此事件经有界队列交给唯一的后台线程投递；
//! - **逻辑 (How)**：
//!   1. `notify` 把事件放入 `crossbeam` 有界通道，队列满时阻塞等待（不丢事件）；
//!   2. 后台线程按 FIFO 取出事件，在注册表锁内拷贝一份订阅快照后立即释放锁，再逐个调用处理器；
//!   3. 处理器返回的错误记录为 `warn`，panic 被捕获并记录为 `error`，均不影响后续处理器与事件；
//! - **契约 (What)**：
//!   - 单线程投递保证处理器按入队顺序观察事件，同一事件内按订阅顺序调用；
//!   - 处理器运行期间不持有注册表锁，处理器内部可以安全地订阅或取消订阅；
//!   - `shutdown` 关闭队列、等待剩余事件投递完毕后回收线程，`Drop` 时自动执行。
//!
//! # 风险提示（Trade-offs）
//! - 处理器若在队列已满时同步调用 `refresh`，会在自身所在的投递线程上阻塞；
//!   需要在处理器中回调加载器的宿主应适当调大队列容量。

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::error::{ConfigError, HandlerError};

const WORKER_THREAD_NAME: &str = "spark-config-events";

/// 事件类别。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum EventKind {
    /// 一次 Init 成功提交。
    Initialized,
    /// 一次 Refresh 成功提交。
    Refreshed,
}

impl EventKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::Refreshed => "refreshed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 投递给订阅者的事件。
///
/// `generation` 对应触发本事件的那次提交，处理器可与
/// [`ConfigLoader::generation`](crate::ConfigLoader::generation) 比较以判断是否已有更新的提交。
#[derive(Clone)]
pub struct Event {
    kind: EventKind,
    generation: u64,
    payload: Option<Arc<dyn Any + Send + Sync>>,
}

impl Event {
    pub fn new(kind: EventKind, generation: u64) -> Self {
        Self {
            kind,
            generation,
            payload: None,
        }
    }

    /// 附带任意负载，处理器通过 [`payload`](Self::payload) 按类型取回。
    #[must_use]
    pub fn with_payload<T>(mut self, payload: T) -> Self
    where
        T: Any + Send + Sync,
    {
        self.payload = Some(Arc::new(payload));
        self
    }

    #[inline]
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// 负载类型与 `T` 不符或没有负载时返回 `None`。
    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.payload.as_deref()?.downcast_ref::<T>()
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("kind", &self.kind)
            .field("generation", &self.generation)
            .field("has_payload", &self.payload.is_some())
            .finish()
    }
}

/// 订阅标识，进程内单调递增且永不复用。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

type Handler = Arc<dyn Fn(&Event) -> Result<(), HandlerError> + Send + Sync>;
type Registry = Mutex<Vec<(SubscriptionId, Handler)>>;

/// 订阅注册表与单线程投递队列。
pub struct EventNotifier {
    registry: Arc<Registry>,
    sender: Mutex<Option<Sender<Event>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    pending: Arc<AtomicUsize>,
}

impl EventNotifier {
    /// 创建通知器并启动投递线程，`capacity` 为 0 时按 1 处理。
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        let (sender, receiver) = channel::bounded(capacity.max(1));
        let registry: Arc<Registry> = Arc::default();
        let pending = Arc::new(AtomicUsize::new(0));

        let worker = {
            let registry = Arc::clone(&registry);
            let pending = Arc::clone(&pending);
            thread::Builder::new()
                .name(WORKER_THREAD_NAME.to_owned())
                .spawn(move || deliver_loop(&receiver, &registry, &pending))
                .map_err(ConfigError::WorkerSpawn)?
        };

        Ok(Self {
            registry,
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
            pending,
        })
    }

    /// 注册处理器，立即返回新的订阅标识。
    pub fn subscribe<F>(&self, handler: F) -> Result<SubscriptionId, ConfigError>
    where
        F: Fn(&Event) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        if self.sender.lock().is_none() {
            return Err(ConfigError::NotifierClosed);
        }
        let id = SubscriptionId::next();
        self.registry.lock().push((id, Arc::new(handler)));
        Ok(id)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> Result<(), ConfigError> {
        let mut registry = self.registry.lock();
        let position = registry
            .iter()
            .position(|(candidate, _)| *candidate == id)
            .ok_or(ConfigError::SubscriptionNotFound(id))?;
        registry.remove(position);
        Ok(())
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.lock().len()
    }

    /// 将事件放入投递队列；队列已满时阻塞直到有空位。
    ///
    /// 加载器在发布闸门内调用本方法，以保证事件顺序与提交顺序一致；
    /// 独立使用通知器的宿主需自行保证跨线程的入队顺序。
    pub fn notify(&self, event: Event) -> Result<(), ConfigError> {
        let sender = self
            .sender
            .lock()
            .clone()
            .ok_or(ConfigError::NotifierClosed)?;
        self.pending.fetch_add(1, Ordering::AcqRel);
        if sender.send(event).is_err() {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            return Err(ConfigError::NotifierClosed);
        }
        Ok(())
    }

    /// 已入队但尚未投递完毕的事件数。
    pub fn pending_events(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// 关闭队列并等待投递线程处理完剩余事件。
    ///
    /// 重复调用无副作用；在投递线程内部调用时只关闭队列，不等待自身退出。
    pub fn shutdown(&self) {
        drop(self.sender.lock().take());
        let Some(worker) = self.worker.lock().take() else {
            return;
        };
        if worker.thread().id() == thread::current().id() {
            return;
        }
        if worker.join().is_err() {
            error!("configuration event worker terminated abnormally");
        }
    }
}

impl fmt::Debug for EventNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventNotifier")
            .field("subscribers", &self.subscriber_count())
            .field("pending_events", &self.pending_events())
            .finish_non_exhaustive()
    }
}

impl Drop for EventNotifier {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn deliver_loop(receiver: &Receiver<Event>, registry: &Registry, pending: &AtomicUsize) {
    for event in receiver.iter() {
        let handlers: Vec<(SubscriptionId, Handler)> = registry.lock().clone();
        for (id, handler) in &handlers {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(&event))) {
                Ok(Ok(())) => {}
                Ok(Err(cause)) => warn!(
                    subscription = %id,
                    event = %event.kind(),
                    error = %cause,
                    "configuration event handler failed"
                ),
                Err(panic) => error!(
                    subscription = %id,
                    event = %event.kind(),
                    panic = panic_message(panic.as_ref()),
                    "configuration event handler panicked"
                ),
            }
        }
        debug!(
            event = %event.kind(),
            generation = event.generation(),
            subscribers = handlers.len(),
            "configuration event delivered"
        );
        pending.fetch_sub(1, Ordering::AcqRel);
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::time::{Duration, Instant};

    use super::*;

    const WAIT: Duration = Duration::from_secs(5);

    fn drain(notifier: &EventNotifier) {
        let deadline = Instant::now() + WAIT;
        while notifier.pending_events() > 0 {
            assert!(Instant::now() < deadline, "events were not delivered in time");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn subscription_ids_are_unique_and_render_with_prefix() {
        let notifier = EventNotifier::new(4).expect("notifier");
        let first = notifier.subscribe(|_| Ok(())).expect("subscribe");
        let second = notifier.subscribe(|_| Ok(())).expect("subscribe");
        assert_ne!(first, second);
        assert!(first.to_string().starts_with("sub-"));
        assert_eq!(notifier.subscriber_count(), 2);
    }

    #[test]
    fn unsubscribe_unknown_id_is_reported() {
        let notifier = EventNotifier::new(4).expect("notifier");
        let id = notifier.subscribe(|_| Ok(())).expect("subscribe");
        notifier.unsubscribe(id).expect("first unsubscribe");
        let error = notifier.unsubscribe(id).expect_err("already removed");
        assert!(matches!(error, ConfigError::SubscriptionNotFound(missing) if missing == id));
        assert!(error.to_string().contains(&id.to_string()));
    }

    #[test]
    fn notify_without_subscribers_is_accepted() {
        let notifier = EventNotifier::new(4).expect("notifier");
        notifier
            .notify(Event::new(EventKind::Initialized, 1))
            .expect("notify");
        drain(&notifier);
    }

    #[test]
    fn payload_is_recovered_by_type() {
        #[derive(Debug, PartialEq)]
        struct Marker(&'static str);

        let notifier = EventNotifier::new(4).expect("notifier");
        let (tx, rx) = mpsc::channel();
        notifier
            .subscribe(move |event| {
                let marker = event.payload::<Marker>().map(|marker| marker.0);
                let wrong_type = event.payload::<String>().is_some();
                tx.send((marker, wrong_type)).map_err(Into::into)
            })
            .expect("subscribe");

        notifier
            .notify(Event::new(EventKind::Refreshed, 7).with_payload(Marker("param-val")))
            .expect("notify");

        let (marker, wrong_type) = rx.recv_timeout(WAIT).expect("event delivered");
        assert_eq!(marker, Some("param-val"));
        assert!(!wrong_type);
    }

    #[test]
    fn failing_and_panicking_handlers_do_not_stop_delivery() {
        let notifier = EventNotifier::new(4).expect("notifier");
        let (tx, rx) = mpsc::channel();
        notifier
            .subscribe(|_| Err("handler refused".into()))
            .expect("subscribe");
        notifier
            .subscribe(|_| panic!("handler exploded"))
            .expect("subscribe");
        notifier
            .subscribe(move |event| tx.send(event.generation()).map_err(Into::into))
            .expect("subscribe");

        for generation in 1..=2 {
            notifier
                .notify(Event::new(EventKind::Refreshed, generation))
                .expect("notify");
        }

        assert_eq!(rx.recv_timeout(WAIT).expect("first"), 1);
        assert_eq!(rx.recv_timeout(WAIT).expect("second"), 2);
    }

    #[test]
    fn events_are_delivered_in_fifo_order_even_when_queue_is_small() {
        let notifier = EventNotifier::new(1).expect("notifier");
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = Arc::clone(&seen);
            notifier
                .subscribe(move |event| {
                    seen.lock().push(event.generation());
                    Ok(())
                })
                .expect("subscribe");
        }

        for generation in 1..=50 {
            notifier
                .notify(Event::new(EventKind::Refreshed, generation))
                .expect("notify");
        }
        drain(&notifier);

        assert_eq!(*seen.lock(), (1..=50).collect::<Vec<_>>());
    }

    #[test]
    fn handler_may_unsubscribe_itself_without_deadlock() {
        let notifier = Arc::new(EventNotifier::new(4).expect("notifier"));
        let (tx, rx) = mpsc::channel();
        let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::default();
        let id = {
            let weak = Arc::downgrade(&notifier);
            let slot = Arc::clone(&slot);
            notifier
                .subscribe(move |_| {
                    let id = slot.lock().expect("id recorded");
                    if let Some(notifier) = weak.upgrade() {
                        notifier.unsubscribe(id)?;
                    }
                    tx.send(()).map_err(Into::into)
                })
                .expect("subscribe")
        };
        *slot.lock() = Some(id);

        notifier
            .notify(Event::new(EventKind::Refreshed, 1))
            .expect("notify");
        rx.recv_timeout(WAIT).expect("handler ran");
        drain(&notifier);
        assert_eq!(notifier.subscriber_count(), 0);
    }

    #[test]
    fn shutdown_drains_queue_and_rejects_new_work() {
        let notifier = EventNotifier::new(8).expect("notifier");
        let delivered = Arc::new(AtomicUsize::new(0));
        {
            let delivered = Arc::clone(&delivered);
            notifier
                .subscribe(move |_| {
                    delivered.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .expect("subscribe");
        }
        for generation in 1..=3 {
            notifier
                .notify(Event::new(EventKind::Refreshed, generation))
                .expect("notify");
        }

        notifier.shutdown();

        assert_eq!(delivered.load(Ordering::SeqCst), 3);
        assert_eq!(notifier.pending_events(), 0);
        assert!(matches!(
            notifier.notify(Event::new(EventKind::Refreshed, 4)),
            Err(ConfigError::NotifierClosed)
        ));
        assert!(matches!(
            notifier.subscribe(|_| Ok(())),
            Err(ConfigError::NotifierClosed)
        ));
    }
}
