use std::fmt;

use tracing::warn;

use crate::error::{Error, Result};
use crate::taxonomy::{Dimension, Taxonomy, ALL};

/// Characters that mark a phrase as accidentally non-Spanish input.
const FOREIGN_DIACRITICS: &[char] = &['ä', 'ö'];

/// The five query dimensions of one corpus search.
///
/// Every field is either a taxonomy label, `all`, or empty (unset).
/// Setters never fail on an unknown label: they clear the field and warn.
#[derive(Debug, Clone)]
pub struct FilterState<'t> {
    taxonomy: &'t Taxonomy,
    city: String,
    gender: String,
    age: String,
    education: String,
    phrase: String,
}

/// Filter resolved to form keys, owned so it can move into a crawl worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub phrase: String,
    pub filter_keys: Vec<String>,
}

impl<'t> FilterState<'t> {
    pub fn new(taxonomy: &'t Taxonomy) -> Self {
        Self {
            taxonomy,
            city: String::new(),
            gender: String::new(),
            age: String::new(),
            education: String::new(),
            phrase: String::new(),
        }
    }

    pub fn taxonomy(&self) -> &'t Taxonomy {
        self.taxonomy
    }

    /// Returns whether the label was accepted.
    pub fn set_city(&mut self, name: &str) -> bool {
        let accepted = validated(self.taxonomy, Dimension::City, name);
        self.city = accepted.clone().unwrap_or_default();
        accepted.is_some()
    }

    pub fn set_gender(&mut self, name: &str) -> bool {
        let accepted = validated(self.taxonomy, Dimension::Gender, name);
        self.gender = accepted.clone().unwrap_or_default();
        accepted.is_some()
    }

    pub fn set_age(&mut self, name: &str) -> bool {
        let accepted = validated(self.taxonomy, Dimension::Age, name);
        self.age = accepted.clone().unwrap_or_default();
        accepted.is_some()
    }

    pub fn set_education(&mut self, name: &str) -> bool {
        let accepted = validated(self.taxonomy, Dimension::Education, name);
        self.education = accepted.clone().unwrap_or_default();
        accepted.is_some()
    }

    pub fn set_phrase(&mut self, text: &str) -> Result<()> {
        if let Some(c) = text.chars().find(|c| FOREIGN_DIACRITICS.contains(c)) {
            return Err(Error::InvalidArgument(format!(
                "Spanish phrases should not contain '{c}': {text:?}"
            )));
        }
        self.phrase = text.to_string();
        Ok(())
    }

    pub fn set_filter(
        &mut self,
        city: &str,
        gender: &str,
        age: &str,
        education: &str,
        phrase: &str,
    ) -> Result<()> {
        self.set_city(city);
        self.set_gender(gender);
        self.set_age(age);
        self.set_education(education);
        self.set_phrase(phrase)
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn gender(&self) -> &str {
        &self.gender
    }

    pub fn age(&self) -> &str {
        &self.age
    }

    pub fn education(&self) -> &str {
        &self.education
    }

    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    pub fn get(&self, dimension: Dimension) -> &str {
        match dimension {
            Dimension::City => &self.city,
            Dimension::Gender => &self.gender,
            Dimension::Age => &self.age,
            Dimension::Education => &self.education,
        }
    }

    /// The only gate for starting a crawl.
    pub fn is_complete(&self) -> bool {
        [
            &self.city,
            &self.gender,
            &self.age,
            &self.education,
            &self.phrase,
        ]
        .iter()
        .all(|v| !v.is_empty())
    }

    /// Resolve labels to form keys. Fails if the filter is incomplete or
    /// a label has vanished from the taxonomy.
    pub fn to_query(&self) -> Result<Query> {
        if !self.is_complete() {
            return Err(Error::InvalidArgument(format!(
                "filter incomplete, refusing to crawl ({self})"
            )));
        }
        let filter_keys = Dimension::ALL
            .iter()
            .map(|d| self.taxonomy.form_key(*d, self.get(*d)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Query {
            phrase: self.phrase.clone(),
            filter_keys,
        })
    }

    /// Canonical name used for report files.
    pub fn identifier(&self) -> String {
        let raw = format!(
            "PRESEEA_city-{}_gender-{}_age-{}_education-{}_phrase-{}",
            self.city,
            self.gender,
            self.age,
            self.education,
            self.phrase.trim()
        );
        raw.chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
                c if c.is_whitespace() => '-',
                c => c,
            })
            .collect()
    }
}

impl fmt::Display for FilterState<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "City: {}, Gender: {}, Age: {}, Education: {}",
            self.city, self.gender, self.age, self.education
        )
    }
}

fn validated(taxonomy: &Taxonomy, dimension: Dimension, name: &str) -> Option<String> {
    if name == ALL || taxonomy.contains(dimension, name) {
        return Some(name.to_string());
    }
    if !name.is_empty() {
        warn!(dimension = %dimension, label = name, "label not defined in corpus, filter reset");
    }
    None
}

// ── Tests ──
