use std::path::PathBuf;

use tracing::{info, warn};

use crate::config::Settings;
use crate::crawl::client::CrawlConfig;
use crate::crawl::{worker, CrawlWorker, Sample};
use crate::error::{Error, Result};
use crate::filter::FilterState;
use crate::report::Report;
use crate::taxonomy::{Dimension, Taxonomy, ALL};

/// Phrase that matches every excerpt; used to size a city's sub-corpus.
const COUNT_PHRASE: &str = " ";

/// Entry point tying the taxonomy, crawler and report writer together.
pub struct Corpus {
    settings: Settings,
    taxonomy: Taxonomy,
    crawl: CrawlConfig,
}

impl Corpus {
    pub fn new(settings: Settings) -> Result<Self> {
        let taxonomy = Taxonomy::load(settings.taxonomy_path.as_deref())?;
        Ok(Self::with_taxonomy(settings, taxonomy))
    }

    pub fn with_taxonomy(settings: Settings, taxonomy: Taxonomy) -> Self {
        let crawl = CrawlConfig::from(&settings);
        Self {
            settings,
            taxonomy,
            crawl,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    /// An empty filter bound to this corpus' taxonomy.
    pub fn filter(&self) -> FilterState<'_> {
        FilterState::new(&self.taxonomy)
    }

    /// Crawl the corpus once for `filter`.
    pub fn retrieve(&self, filter: &FilterState<'_>) -> Result<Vec<Sample>> {
        let query = filter.to_query()?;
        info!(filter = %filter, phrase = %query.phrase, "retrieving samples");
        worker::run(&self.crawl, query)
    }

    pub fn count(&self, filter: &FilterState<'_>) -> Result<usize> {
        self.retrieve(filter).map(|samples| samples.len())
    }

    /// Number of excerpts recorded for `city` across all speakers.
    pub fn city_sample_count(&self, city: &str) -> Result<usize> {
        let filter = self.city_filter(city, COUNT_PHRASE)?;
        self.count(&filter)
    }

    /// Crawl `phrase` in `city` over all speakers and write the CSV report.
    pub fn create_report(&self, city: &str, phrase: &str) -> Result<Option<PathBuf>> {
        let filter = self.city_filter(city, phrase)?;

        let phrase_worker = CrawlWorker::spawn(self.crawl.clone(), filter.to_query()?)?;
        let count_worker = if self.settings.count_city_samples {
            let count_filter = self.city_filter(city, COUNT_PHRASE)?;
            Some(CrawlWorker::spawn(self.crawl.clone(), count_filter.to_query()?)?)
        } else {
            None
        };

        let samples = phrase_worker.wait()?;
        let total = match count_worker.map(CrawlWorker::wait) {
            Some(Ok(counted)) => counted.len(),
            Some(Err(e)) => {
                warn!(city, error = %e, "city sample count failed, using retrieved samples");
                samples.len()
            }
            None => samples.len(),
        };

        self.report_from_samples(&filter, samples, total)
    }

    /// Analyse already retrieved samples and write the report.
    pub fn report_from_samples(
        &self,
        filter: &FilterState<'_>,
        samples: Vec<Sample>,
        total_samples: usize,
    ) -> Result<Option<PathBuf>> {
        let report = Report::build(
            filter,
            &self.settings.author,
            total_samples,
            samples,
            self.settings.word_range,
        );
        report.write_csv(&self.settings.report_dir)
    }

    /// `city` with every speaker dimension open.
    pub fn city_filter(&self, city: &str, phrase: &str) -> Result<FilterState<'_>> {
        if !self.taxonomy.contains(Dimension::City, city) {
            return Err(Error::not_found("City", city));
        }
        let mut filter = self.filter();
        filter.set_filter(city, ALL, ALL, ALL, phrase)?;
        Ok(filter)
    }
}

// ── Tests ──
