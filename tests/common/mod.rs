#![allow(dead_code)]

use futures::future::{ready, Ready};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use task_manager_core::EventHandlers;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Shared, ordered log of hook firings.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|e| *e == entry).count()
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }
}

fn mark<A: 'static>(journal: &Journal, label: String) -> impl Fn(A) -> Ready<()> + Send + Sync + 'static {
    let journal = journal.clone();
    move |_| {
        journal.push(label.clone());
        ready(())
    }
}

/// Hooks that log `<tag>:<event>` for every lifecycle event.
pub fn recording<P, T, E>(journal: &Journal, tag: &str) -> EventHandlers<P, T, E>
where
    P: Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    EventHandlers::new()
        .on_cache(mark(journal, format!("{}:cache", tag)))
        .on_request(mark(journal, format!("{}:request", tag)))
        .on_success(mark(journal, format!("{}:success", tag)))
        .on_error(mark(journal, format!("{}:error", tag)))
        .on_finally(mark(journal, format!("{}:finally", tag)))
}

#[derive(Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bump(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

pub async fn pause(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
