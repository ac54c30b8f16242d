use std::time::Duration;

use reqwest::multipart::Form;
use reqwest::{redirect, Client};
use tracing::{debug, info, warn};

use super::form::FormState;
use super::results::{self, PageKind, Sample};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::filter::Query;

/// Where a crawl is in the form handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    InitialFetchDone,
    ResubmitReady,
    Submitted,
    ResultsReady,
    Failed,
}

/// Connection settings a crawl needs; owned so it can move into a worker.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl From<&Settings> for CrawlConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            base_url: settings.base_url.clone(),
            user_agent: settings.user_agent.clone(),
            timeout: Duration::from_secs(settings.timeout_secs),
        }
    }
}

/// Drives one GET/POST exchange against the corpus query form.
///
/// The cookie jar lives as long as the client, so build one per crawl.
pub struct CrawlClient {
    http: Client,
    base_url: String,
    stage: Stage,
}

impl CrawlClient {
    pub fn new(config: &CrawlConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .redirect(redirect::Policy::none())
            .cookie_store(true)
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            stage: Stage::Init,
        })
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Run the handshake once. Failures are returned, never retried.
    pub async fn crawl(&mut self, query: &Query) -> Result<Vec<Sample>> {
        let outcome = self.handshake(query).await;
        if let Err(e) = &outcome {
            warn!(stage = ?self.stage, error = %e, "crawl failed");
            self.advance(Stage::Failed);
        }
        outcome
    }

    async fn handshake(&mut self, query: &Query) -> Result<Vec<Sample>> {
        let landing = self.fetch_landing().await?;
        let mut form = FormState::scrape(&landing)?;
        self.advance(Stage::InitialFetchDone);

        let mut resubmitted = false;
        loop {
            self.advance(Stage::ResubmitReady);
            let page = self.submit(&form, query).await?;
            self.advance(Stage::Submitted);

            match results::classify_page(&page) {
                PageKind::Results | PageKind::NoMatches => {
                    let samples = results::parse_results(&page, &query.phrase)?;
                    self.advance(Stage::ResultsReady);
                    info!(samples = samples.len(), "crawl finished");
                    return Ok(samples);
                }
                PageKind::Postback if !resubmitted => {
                    // The server re-rendered the form; only its fresh tokens are valid now.
                    form = FormState::scrape(&page)?;
                    resubmitted = true;
                }
                PageKind::Postback => {
                    return Err(Error::Parse(
                        "server answered the resubmission with the query form again".to_string(),
                    ));
                }
                PageKind::Unknown => {
                    return Err(Error::Parse(
                        "response is neither a results page nor the query form".to_string(),
                    ));
                }
            }
        }
    }

    async fn fetch_landing(&self) -> Result<String> {
        let body = self
            .http
            .get(&self.base_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        info!(url = %self.base_url, bytes = body.len(), "fetched query form");
        Ok(body)
    }

    async fn submit(&self, form: &FormState, query: &Query) -> Result<String> {
        let payload = form
            .payload(query)
            .into_iter()
            .fold(Form::new(), |acc, (name, value)| acc.text(name, value));
        let body = self
            .http
            .post(&self.base_url)
            .multipart(payload)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        info!(phrase = %query.phrase, bytes = body.len(), "submitted query");
        Ok(body)
    }

    fn advance(&mut self, next: Stage) {
        debug!(from = ?self.stage, to = ?next, "crawl stage");
        self.stage = next;
    }
}
