use std::sync::Arc;

use agentgit_types::{Event, EventKind};
use rusqlite::Connection;

use crate::error::{Error, Result};
use crate::logger::{LogLevel, Logger, NoopLogger};

/// A subscriber is handed the published event and, when the publisher
/// bound a connection, a handle into the transaction that every other
/// subscriber for this event shares. Subscribers must not commit or roll
/// back themselves — the bus owns that boundary.
pub trait Subscriber: Send + Sync {
    fn handle(&self, event: &Event, conn: Option<&Connection>) -> Result<()>;
}

impl<F> Subscriber for F
where
    F: Fn(&Event, Option<&Connection>) -> Result<()> + Send + Sync,
{
    fn handle(&self, event: &Event, conn: Option<&Connection>) -> Result<()> {
        self(event, conn)
    }
}

/// A process-local publish/subscribe registry with one ordered list of
/// subscribers per event kind.
pub struct EventBus {
    subscribers: [Vec<Arc<dyn Subscriber>>; EventKind::ALL.len()],
    logger: Box<dyn Logger>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: std::array::from_fn(|_| Vec::new()),
            logger: Box::new(NoopLogger),
        }
    }

    pub fn with_logger(logger: Box<dyn Logger>) -> Self {
        Self {
            subscribers: std::array::from_fn(|_| Vec::new()),
            logger,
        }
    }

    /// Append `subscriber` to the list for `kind`. Order of registration
    /// is the order of invocation during `publish`.
    pub fn subscribe(&mut self, kind: EventKind, subscriber: Arc<dyn Subscriber>) {
        self.subscribers[kind.index()].push(subscriber);
    }

    /// Append `subscriber` to every kind, in `EventKind::ALL` order.
    pub fn subscribe_all(&mut self, subscriber: Arc<dyn Subscriber>) {
        for kind in EventKind::ALL {
            self.subscribe(kind, subscriber.clone());
        }
    }

    /// Invoke every subscriber for `event.kind` in registration order.
    ///
    /// When `conn` is `Some`, the whole call runs inside one transaction:
    /// if every subscriber returns `Ok`, the transaction commits; if any
    /// subscriber returns `Err`, the transaction is rolled back and the
    /// error is re-raised here. When `conn` is `None`, subscribers simply
    /// run in order and the first error short-circuits the rest.
    pub fn publish(&self, event: &Event, conn: Option<&Connection>) -> Result<()> {
        let subscribers = &self.subscribers[event.kind.index()];

        match conn {
            Some(conn) => {
                let tx = conn.unchecked_transaction()?;
                for subscriber in subscribers {
                    if let Err(err) = subscriber.handle(event, Some(&tx)) {
                        self.logger.log(
                            LogLevel::Error,
                            &format!("subscriber failed for {:?}, rolling back: {err}", event.kind),
                        );
                        // tx is dropped here without commit, rolling back.
                        return Err(err);
                    }
                }
                tx.commit()?;
                Ok(())
            }
            None => {
                for subscriber in subscribers {
                    subscriber.handle(event, None)?;
                }
                Ok(())
            }
        }
    }
}

/// Convenience for turning a closure's error into [`Error::Subscriber`].
pub fn subscriber_error(err: impl std::error::Error + Send + Sync + 'static) -> Error {
    Error::Subscriber(Box::new(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentgit_types::Owner;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn test_event() -> Event {
        Event::new(EventKind::UserInput, Owner::default_sentinel())
    }

    #[test]
    fn subscribers_run_in_registration_order() {
        let mut bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let order_a = order.clone();
        bus.subscribe(
            EventKind::UserInput,
            Arc::new(move |_: &Event, _: Option<&Connection>| {
                order_a.lock().unwrap().push("a");
                Ok(())
            }),
        );
        let order_b = order.clone();
        bus.subscribe(
            EventKind::UserInput,
            Arc::new(move |_: &Event, _: Option<&Connection>| {
                order_b.lock().unwrap().push("b");
                Ok(())
            }),
        );

        bus.publish(&test_event(), None).unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn subscribe_all_registers_every_kind() {
        let mut bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        bus.subscribe_all(Arc::new(move |_: &Event, _: Option<&Connection>| {
            count_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        for kind in EventKind::ALL {
            bus.publish(&Event::new(kind, Owner::default_sentinel()), None)
                .unwrap();
        }
        assert_eq!(count.load(Ordering::SeqCst), EventKind::ALL.len());
    }

    #[test]
    fn failing_subscriber_rolls_back_and_propagates() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (v INTEGER)").unwrap();

        let mut bus = EventBus::new();
        bus.subscribe(
            EventKind::UserInput,
            Arc::new(|_: &Event, conn: Option<&Connection>| {
                conn.unwrap().execute("INSERT INTO t (v) VALUES (1)", [])?;
                Ok(())
            }),
        );
        bus.subscribe(
            EventKind::UserInput,
            Arc::new(|_: &Event, _: Option<&Connection>| {
                Err(subscriber_error(std::io::Error::other("boom")))
            }),
        );

        let result = bus.publish(&test_event(), Some(&conn));
        assert!(result.is_err());

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0, "rolled-back insert must not be visible");
    }

    #[test]
    fn successful_publish_commits_all_subscriber_writes() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (v INTEGER)").unwrap();

        let mut bus = EventBus::new();
        bus.subscribe(
            EventKind::UserInput,
            Arc::new(|_: &Event, conn: Option<&Connection>| {
                conn.unwrap().execute("INSERT INTO t (v) VALUES (1)", [])?;
                Ok(())
            }),
        );
        bus.subscribe(
            EventKind::UserInput,
            Arc::new(|_: &Event, conn: Option<&Connection>| {
                conn.unwrap().execute("INSERT INTO t (v) VALUES (2)", [])?;
                Ok(())
            }),
        );

        bus.publish(&test_event(), Some(&conn)).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }
}
