use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::analysis::environment::{self, WordWindow};
use crate::analysis::pronoun;
use crate::analysis::{PersonNumber, VerbClassification};
use crate::config::{CODE_URL, CORPUS_NAME, DOWNLOAD_URL};
use crate::crawl::Sample;
use crate::error::{Error, Result};
use crate::filter::FilterState;

const MISMATCH_MARK: &str = "x";
const CSV_EXTENSION: &str = ".csv";

/// Word window and verb buckets for one sample.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleAnalysis {
    pub window: WordWindow,
    pub leading: VerbClassification,
    pub following: VerbClassification,
}

/// Classify the surroundings of `phrase` in every sample, in sample order.
///
/// A sample that does not contain the phrase gets empty windows.
pub fn analyse(samples: &[Sample], phrase: &str, width: usize) -> Vec<SampleAnalysis> {
    samples
        .par_iter()
        .map(|sample| {
            let window = match environment::extract(&sample.text, phrase, width) {
                Ok(window) => window,
                Err(e) => {
                    warn!(label = %sample.label, error = %e, "no word window for sample");
                    WordWindow::default()
                }
            };
            let (leading, following) = crate::analysis::classify_window(&window);
            SampleAnalysis {
                window,
                leading,
                following,
            }
        })
        .collect()
}

/// Samples with a plural-address verb on one side of the phrase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerbTally {
    pub second_plural: usize,
    pub third_plural: usize,
}

impl VerbTally {
    fn count<'a>(sides: impl Iterator<Item = &'a VerbClassification>) -> Self {
        sides.fold(Self::default(), |mut tally, side| {
            if side.has(PersonNumber::SecondPlural) {
                tally.second_plural += 1;
            }
            if side.has(PersonNumber::ThirdPlural) {
                tally.third_plural += 1;
            }
            tally
        })
    }

    pub fn total(&self) -> usize {
        self.second_plural + self.third_plural
    }
}

/// Everything one report file is written from.
#[derive(Debug, Clone)]
pub struct Report {
    identifier: String,
    author: String,
    /// Filter values in header order.
    filter: [(&'static str, String); 4],
    phrase: String,
    total_samples: usize,
    samples: Vec<Sample>,
    analyses: Vec<SampleAnalysis>,
    rival: Option<PersonNumber>,
}

impl Report {
    pub fn build(
        filter: &FilterState<'_>,
        author: &str,
        total_samples: usize,
        samples: Vec<Sample>,
        width: usize,
    ) -> Self {
        let analyses = analyse(&samples, filter.phrase(), width);
        let rival = pronoun::pronoun_class(filter.phrase()).and_then(pronoun::agreement_rival);
        Self {
            identifier: filter.identifier(),
            author: author.to_string(),
            filter: [
                ("Gender", filter.gender().to_string()),
                ("Age", filter.age().to_string()),
                ("Education", filter.education().to_string()),
                ("City", filter.city().to_string()),
            ],
            phrase: filter.phrase().to_string(),
            total_samples,
            samples,
            analyses,
            rival,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn analyses(&self) -> &[SampleAnalysis] {
        &self.analyses
    }

    pub fn leading_tally(&self) -> VerbTally {
        VerbTally::count(self.analyses.iter().map(|a| &a.leading))
    }

    pub fn following_tally(&self) -> VerbTally {
        VerbTally::count(self.analyses.iter().map(|a| &a.following))
    }

    /// Whether sample `idx` has a verb that disagrees with the phrase's pronoun.
    pub fn is_mismatch(&self, idx: usize) -> bool {
        match (self.rival, self.analyses.get(idx)) {
            (Some(rival), Some(a)) => a.leading.has(rival) || a.following.has(rival),
            _ => false,
        }
    }

    /// Every sample needs text, date and country before anything is written.
    pub fn validate(&self) -> Result<()> {
        for (idx, sample) in self.samples.iter().enumerate() {
            let missing = [
                ("text", &sample.text),
                ("date", &sample.date),
                ("country", &sample.country),
            ]
            .into_iter()
            .find(|(_, value)| value.is_empty());
            if let Some((key, _)) = missing {
                return Err(Error::Schema(format!(
                    "sample {} ({}) has no {key}",
                    idx + 1,
                    sample.label
                )));
            }
        }
        Ok(())
    }

    /// Write `<dir>/<identifier>.csv`. Returns `None` when there is nothing
    /// to report.
    pub fn write_csv(&self, dir: &Path) -> Result<Option<PathBuf>> {
        if self.samples.is_empty() {
            warn!(report = %self.identifier, "no samples, report not written");
            return Ok(None);
        }
        self.validate()?;

        fs::create_dir_all(dir)?;
        let path = dir.join(with_csv_extension(&self.identifier));
        let mut out = BufWriter::new(File::create(&path)?);
        self.write_to(&mut out)?;
        out.flush()?;

        info!(path = %path.display(), samples = self.samples.len(), "report written");
        Ok(Some(path))
    }

    pub fn write_to<W: Write>(&self, mut w: W) -> Result<()> {
        let leading = self.leading_tally();
        let following = self.following_tally();

        write_section(&mut w, "Corpus", CORPUS_NAME)?;
        write_section(&mut w, "User", &self.author)?;
        write_row(&mut w, &["Code", "", CODE_URL])?;
        write_row(&mut w, &["Download", "", DOWNLOAD_URL])?;

        write_row(&mut w, &["Filter:"])?;
        for (name, value) in &self.filter {
            write_row(&mut w, &[*name, value.as_str()])?;
        }
        write_section(&mut w, "Phrase", &self.phrase)?;
        write_section(&mut w, "Samples total", &self.total_samples.to_string())?;

        write_row(&mut w, &["Leading verbs"])?;
        write_tally(&mut w, leading)?;
        write_row(&mut w, &["Following verbs"])?;
        write_tally(&mut w, following)?;
        let total = (leading.total() + following.total()).to_string();
        write_row(&mut w, &["#Verbs total", total.as_str()])?;
        let generated = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        write_row(&mut w, &["Generated", generated.as_str()])?;

        write_section(&mut w, "Found", &self.samples.len().to_string())?;
        write_row(&mut w, &["Index", "Sample", "Text", "Year", "Country", "Unmatch"])?;

        for (idx, sample) in self.samples.iter().enumerate() {
            let index = (idx + 1).to_string();
            let flag = if self.is_mismatch(idx) { MISMATCH_MARK } else { "" };
            write_row(
                &mut w,
                &[
                    index.as_str(),
                    sample.label.as_str(),
                    sample.text.as_str(),
                    sample.date.as_str(),
                    sample.country.as_str(),
                    flag,
                ],
            )?;
        }
        Ok(())
    }
}

fn with_csv_extension(name: &str) -> String {
    if name.ends_with(CSV_EXTENSION) {
        name.to_string()
    } else {
        format!("{name}{CSV_EXTENSION}")
    }
}

fn write_section<W: Write>(w: &mut W, title: &str, content: &str) -> Result<()> {
    write_row(w, &[title, content])?;
    writeln!(w)?;
    Ok(())
}

fn write_tally<W: Write>(w: &mut W, tally: VerbTally) -> Result<()> {
    let second = tally.second_plural.to_string();
    let third = tally.third_plural.to_string();
    write_row(w, &["#2PS, PL", second.as_str()])?;
    write_row(w, &["#3PS, PL", third.as_str()])
}

fn needs_quotes(field: &str) -> bool {
    field.contains([',', '"', '\n', '\r'])
}

fn write_row<W: Write>(w: &mut W, row: &[&str]) -> Result<()> {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            w.write_all(b",")?;
        }
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            w.write_all(cell.as_bytes())?;
        }
    }
    writeln!(w)?;
    Ok(())
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::Taxonomy;

    fn fixture_samples() -> Vec<Sample> {
        let json = std::fs::read_to_string("tests/fixtures/samples_ustedes.json").unwrap();
        serde_json::from_str(&json).unwrap()
    }

    fn madrid<'t>(t: &'t Taxonomy, phrase: &str) -> FilterState<'t> {
        let mut f = FilterState::new(t);
        f.set_filter("Madrid", "all", "all", "all", phrase).unwrap();
        f
    }

    fn body_rows(csv: &str) -> Vec<&str> {
        let lines: Vec<&str> = csv.lines().collect();
        let header = lines
            .iter()
            .position(|l| l.starts_with("Index,"))
            .unwrap();
        lines[header + 1..].to_vec()
    }

    #[test]
    fn following_third_plural_hits() {
        let analyses = analyse(&fixture_samples(), "ustedes ", 3);
        let hits: Vec<&[String]> = analyses
            .iter()
            .map(|a| a.following.get(PersonNumber::ThirdPlural))
            .collect();
        assert_eq!(hits[0], ["tienen"]);
        assert_eq!(hits[1], ["saben"]);
        assert_eq!(hits[2], ["están"]);
        assert!(hits[3].is_empty());
        assert_eq!(hits.iter().filter(|h| !h.is_empty()).count(), 3);
    }

    #[test]
    fn sample_without_phrase_gets_empty_window() {
        let samples = vec![Sample {
            label: "L".to_string(),
            text: "nada que ver".to_string(),
            date: "2001".to_string(),
            country: "España".to_string(),
        }];
        let analyses = analyse(&samples, "ustedes ", 3);
        assert_eq!(analyses[0].window, WordWindow::default());
    }

    #[test]
    fn one_indexed_row_per_sample() {
        let t = Taxonomy::bundled().unwrap();
        let samples = fixture_samples();
        let report = Report::build(&madrid(&t, "ustedes "), "tester", 120, samples.clone(), 3);
        let mut buf = Vec::new();
        report.write_to(&mut buf).unwrap();
        let csv = String::from_utf8(buf).unwrap();

        let rows = body_rows(&csv);
        assert_eq!(rows.len(), samples.len());
        for (idx, (row, sample)) in rows.iter().zip(&samples).enumerate() {
            let prefix = format!("{},{},", idx + 1, sample.label);
            assert!(row.starts_with(&prefix), "{row}");
        }
        assert!(csv.contains("Samples total,120"));
        assert!(csv.contains("Found,4"));
        assert!(csv.contains("City,Madrid"));
        assert!(csv.contains("\"#3PS, PL\",3"));
    }

    #[test]
    fn plural_address_mismatch_is_flagged() {
        let t = Taxonomy::bundled().unwrap();
        let mut samples = fixture_samples();
        samples[3].text = "ya ustedes sabéis todo".to_string();
        let report = Report::build(&madrid(&t, "ustedes "), "tester", 4, samples, 3);
        assert!(!report.is_mismatch(0));
        assert!(report.is_mismatch(3));
        assert_eq!(report.following_tally().second_plural, 1);
        assert_eq!(report.following_tally().third_plural, 3);

        let mut buf = Vec::new();
        report.write_to(&mut buf).unwrap();
        let csv = String::from_utf8(buf).unwrap();
        assert!(body_rows(&csv)[3].ends_with(",x"));
        assert!(body_rows(&csv)[0].ends_with(','));
    }

    #[test]
    fn writes_file_named_after_filter() {
        let t = Taxonomy::bundled().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("report");
        let report = Report::build(&madrid(&t, "ustedes "), "tester", 4, fixture_samples(), 3);

        let path = report.write_csv(&out).unwrap().unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "PRESEEA_city-Madrid_gender-all_age-all_education-all_phrase-ustedes.csv"
        );
        let csv = fs::read_to_string(&path).unwrap();
        assert!(csv.starts_with("Corpus,PRESEEA\n"));
    }

    #[test]
    fn missing_date_is_schema_error_and_no_file() {
        let t = Taxonomy::bundled().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let mut samples = fixture_samples();
        samples[2].date.clear();
        let report = Report::build(&madrid(&t, "ustedes "), "tester", 4, samples, 3);

        assert!(matches!(report.write_csv(dir.path()), Err(Error::Schema(_))));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn empty_samples_write_nothing() {
        let t = Taxonomy::bundled().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let report = Report::build(&madrid(&t, "ustedes "), "tester", 0, Vec::new(), 3);
        assert!(report.write_csv(dir.path()).unwrap().is_none());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn cells_with_separators_are_quoted() {
        let mut buf = Vec::new();
        write_row(&mut buf, &["a,b", "say \"hi\"", "plain"]).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "\"a,b\",\"say \"\"hi\"\"\",plain\n"
        );
    }
}
