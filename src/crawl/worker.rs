use std::thread::{self, JoinHandle};

use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::client::{CrawlClient, CrawlConfig};
use super::results::Sample;
use crate::error::{Error, Result};
use crate::filter::Query;

type Outcome = Result<Vec<Sample>>;

/// One crawl on a dedicated thread with its own single-use runtime.
///
/// The runtime is built inside the worker and dropped with it, so no two
/// crawls ever share network state. The result travels back over a
/// oneshot channel; the thread is joined on every exit path.
pub struct CrawlWorker {
    handle: Option<JoinHandle<()>>,
    result_rx: Option<oneshot::Receiver<Outcome>>,
}

impl CrawlWorker {
    pub fn spawn(config: CrawlConfig, query: Query) -> Result<Self> {
        Self::spawn_job(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(async {
                let mut client = CrawlClient::new(&config)?;
                client.crawl(&query).await
            })
        })
    }

    pub(crate) fn spawn_job<F>(job: F) -> Result<Self>
    where
        F: FnOnce() -> Outcome + Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();
        let handle = thread::Builder::new()
            .name("preseea-crawl".to_string())
            .spawn(move || {
                let outcome = job();
                if result_tx.send(outcome).is_err() {
                    debug!("crawl result dropped, caller went away");
                }
            })?;
        Ok(Self {
            handle: Some(handle),
            result_rx: Some(result_rx),
        })
    }

    /// Block until the worker reports, then tear it down.
    pub fn wait(mut self) -> Outcome {
        let outcome = match self.result_rx.take() {
            Some(rx) => rx.blocking_recv().unwrap_or_else(|_| {
                Err(Error::Worker(
                    "worker exited without reporting a result".to_string(),
                ))
            }),
            None => Err(Error::Worker("result already taken".to_string())),
        };
        self.join();
        outcome
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("crawl worker panicked");
            }
        }
    }
}

impl Drop for CrawlWorker {
    fn drop(&mut self) {
        self.join();
    }
}

/// Run one crawl in a fresh worker and block for its result.
pub fn run(config: &CrawlConfig, query: Query) -> Outcome {
    CrawlWorker::spawn(config.clone(), query)?.wait()
}

// ── Tests ──
