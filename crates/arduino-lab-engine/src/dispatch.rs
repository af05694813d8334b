use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::EngineError;

pub type Ticket = u64;

#[derive(Debug)]
pub struct Completed<R> {
    pub screen: String,
    pub ticket: Ticket,
    pub result: Result<R, EngineError>,
}

/// Runs blocking jobs on worker threads and hands back only the newest
/// result per screen. A job superseded by a later submission for the same
/// screen is dropped when it finishes, whatever order responses arrive in.
pub struct Dispatcher<R> {
    latest: Arc<Mutex<HashMap<String, Ticket>>>,
    next_ticket: Mutex<Ticket>,
    tx: Sender<Completed<R>>,
    rx: Receiver<Completed<R>>,
}

impl<R: Send + 'static> Default for Dispatcher<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Send + 'static> Dispatcher<R> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            latest: Arc::new(Mutex::new(HashMap::new())),
            next_ticket: Mutex::new(0),
            tx,
            rx,
        }
    }

    pub fn submit<F>(&self, screen: &str, job: F) -> Ticket
    where
        F: FnOnce() -> Result<R, EngineError> + Send + 'static,
    {
        let ticket = {
            let mut next = lock(&self.next_ticket);
            *next += 1;
            *next
        };
        lock(&self.latest).insert(screen.to_string(), ticket);
        tracing::debug!(screen, ticket, "job submitted");

        let tx = self.tx.clone();
        let screen = screen.to_string();
        thread::spawn(move || {
            let result = job();
            // The receiver only goes away with the dispatcher.
            let _ = tx.send(Completed {
                screen,
                ticket,
                result,
            });
        });
        ticket
    }

    pub fn is_current(&self, screen: &str, ticket: Ticket) -> bool {
        lock(&self.latest).get(screen) == Some(&ticket)
    }

    /// Forgets outstanding work for `screen`; anything still running for it
    /// will be discarded.
    pub fn cancel(&self, screen: &str) {
        lock(&self.latest).remove(screen);
    }

    pub fn poll(&self) -> Option<Completed<R>> {
        while let Ok(done) = self.rx.try_recv() {
            if let Some(done) = self.accept(done) {
                return Some(done);
            }
        }
        None
    }

    pub fn wait(&self, timeout: Duration) -> Option<Completed<R>> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(done) => {
                    if let Some(done) = self.accept(done) {
                        return Some(done);
                    }
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return None
                }
            }
        }
    }

    fn accept(&self, done: Completed<R>) -> Option<Completed<R>> {
        let mut latest = lock(&self.latest);
        if latest.get(&done.screen) != Some(&done.ticket) {
            tracing::debug!(
                screen = %done.screen,
                ticket = done.ticket,
                "discarding superseded result"
            );
            return None;
        }
        latest.remove(&done.screen);
        Some(done)
    }
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
