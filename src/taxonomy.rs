use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::{Error, Result};

/// Label accepted by every dimension in place of a concrete value.
pub const ALL: &str = "all";

/// Code sent for the `all` wildcard.
pub const WILDCARD_CODE: u32 = 0;

const BUNDLED: &str = include_str!("../data/preseea.json");
const FORM_KEY_PREFIX: &str = "dnn$ctr520$TranscriptionQuery$";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    City,
    Gender,
    Age,
    Education,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::City,
        Dimension::Gender,
        Dimension::Age,
        Dimension::Education,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Dimension::City => "City",
            Dimension::Gender => "Gender",
            Dimension::Age => "Age",
            Dimension::Education => "Education",
        }
    }

    /// Checkbox group name on the query form.
    fn form_field(self) -> &'static str {
        match self {
            Dimension::City => "chkFtCity",
            Dimension::Gender => "chkFtSex",
            Dimension::Age => "chkFtAgeGroup",
            Dimension::Education => "chkFtStudyLevel",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawTaxonomy {
    country: BTreeMap<String, Vec<String>>,
    city: HashMap<String, u32>,
    gender: HashMap<String, u32>,
    age: HashMap<String, u32>,
    education: HashMap<String, u32>,
}

/// Valid filter vocabulary of the corpus and the site codes behind it.
/// Built once and shared read-only.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    countries: BTreeMap<String, Vec<String>>,
    codes: HashMap<Dimension, HashMap<String, u32>>,
}

impl Taxonomy {
    /// The taxonomy shipped with the crate.
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let taxonomy = Self::from_json(&text)?;
        info!(path = %path.display(), cities = taxonomy.number_of_all_cities(), "taxonomy loaded");
        Ok(taxonomy)
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_path(p),
            None => Self::bundled(),
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let raw: RawTaxonomy = serde_json::from_str(text)?;
        let mut codes = HashMap::new();
        codes.insert(Dimension::City, raw.city);
        codes.insert(Dimension::Gender, raw.gender);
        codes.insert(Dimension::Age, raw.age);
        codes.insert(Dimension::Education, raw.education);

        let taxonomy = Taxonomy {
            countries: raw.country,
            codes,
        };
        taxonomy.validate()?;
        Ok(taxonomy)
    }

    fn validate(&self) -> Result<()> {
        for (dimension, map) in &self.codes {
            for (label, code) in map {
                if label == ALL || *code == WILDCARD_CODE {
                    return Err(Error::Config(format!(
                        "{dimension} entry '{label}' collides with the 'all' wildcard"
                    )));
                }
            }
        }

        let city_codes = &self.codes[&Dimension::City];
        let mut owner: HashMap<&str, &str> = HashMap::new();
        for (country, cities) in &self.countries {
            for city in cities {
                if let Some(previous) = owner.insert(city.as_str(), country.as_str()) {
                    return Err(Error::Config(format!(
                        "city '{city}' listed under both {previous} and {country}"
                    )));
                }
                if !city_codes.contains_key(city) {
                    return Err(Error::Config(format!("city '{city}' has no code")));
                }
            }
        }
        Ok(())
    }

    /// Site code for `label`; `all` maps to the wildcard code.
    pub fn code_for(&self, dimension: Dimension, label: &str) -> Result<u32> {
        if label == ALL {
            return Ok(WILDCARD_CODE);
        }
        self.codes[&dimension]
            .get(label)
            .copied()
            .ok_or_else(|| Error::not_found(dimension.name(), label))
    }

    /// Form field switched "on" to select `label`.
    pub fn form_key(&self, dimension: Dimension, label: &str) -> Result<String> {
        let code = self.code_for(dimension, label)?;
        Ok(format!("{FORM_KEY_PREFIX}{}${code}", dimension.form_field()))
    }

    pub fn contains(&self, dimension: Dimension, label: &str) -> bool {
        self.codes[&dimension].contains_key(label)
    }

    /// Labels of a dimension, sorted by site code.
    pub fn labels(&self, dimension: Dimension) -> Vec<&str> {
        let mut entries: Vec<(&str, u32)> = self.codes[&dimension]
            .iter()
            .map(|(label, code)| (label.as_str(), *code))
            .collect();
        entries.sort_by_key(|(_, code)| *code);
        entries.into_iter().map(|(label, _)| label).collect()
    }

    pub fn countries(&self) -> impl Iterator<Item = &str> {
        self.countries.keys().map(String::as_str)
    }

    pub fn cities_of(&self, country: &str) -> Result<&[String]> {
        self.countries
            .get(country)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::not_found("Country", country))
    }

    pub fn all_cities(&self) -> Vec<&str> {
        self.countries
            .values()
            .flatten()
            .map(String::as_str)
            .collect()
    }

    pub fn number_of_cities(&self, country: &str) -> Result<usize> {
        Ok(self.cities_of(country)?.len())
    }

    pub fn number_of_all_cities(&self) -> usize {
        self.countries.values().map(Vec::len).sum()
    }

    pub fn country_of(&self, city: &str) -> Option<&str> {
        self.countries
            .iter()
            .find(|(_, cities)| cities.iter().any(|c| c == city))
            .map(|(country, _)| country.as_str())
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn taxonomy() -> Taxonomy {
        Taxonomy::bundled().unwrap()
    }

    #[test]
    fn city_codes_are_stable() {
        let t = taxonomy();
        for city in t.all_cities() {
            let a = t.code_for(Dimension::City, city).unwrap();
            let b = t.code_for(Dimension::City, city).unwrap();
            assert_eq!(a, b);
            assert_ne!(a, WILDCARD_CODE);
        }
        assert_eq!(t.code_for(Dimension::City, "Madrid").unwrap(), 11);
    }

    #[test]
    fn all_is_wildcard() {
        let t = taxonomy();
        for d in Dimension::ALL {
            assert_eq!(t.code_for(d, ALL).unwrap(), WILDCARD_CODE);
        }
    }

    #[test]
    fn unknown_label_not_found() {
        let t = taxonomy();
        let err = t.code_for(Dimension::City, "Minga").unwrap_err();
        assert!(matches!(err, Error::NotFound { kind: "City", .. }));
        assert!(t.code_for(Dimension::Gender, "hardcore").is_err());
    }

    #[test]
    fn form_keys() {
        let t = taxonomy();
        assert_eq!(
            t.form_key(Dimension::City, "Madrid").unwrap(),
            "dnn$ctr520$TranscriptionQuery$chkFtCity$11"
        );
        assert_eq!(
            t.form_key(Dimension::Gender, "female").unwrap(),
            "dnn$ctr520$TranscriptionQuery$chkFtSex$2"
        );
        assert_eq!(
            t.form_key(Dimension::Age, "young").unwrap(),
            "dnn$ctr520$TranscriptionQuery$chkFtAgeGroup$1"
        );
        assert_eq!(
            t.form_key(Dimension::Education, ALL).unwrap(),
            "dnn$ctr520$TranscriptionQuery$chkFtStudyLevel$0"
        );
    }

    #[test]
    fn cities_by_country() {
        let t = taxonomy();
        assert!(t.cities_of("Spain").unwrap().iter().any(|c| c == "Madrid"));
        assert!(t.cities_of("Colombia").unwrap().iter().any(|c| c == "Bogotá"));
        assert!(t.number_of_cities("Spain").unwrap() >= 1);
        assert!(matches!(
            t.cities_of("Testcountry"),
            Err(Error::NotFound { kind: "Country", .. })
        ));
        assert_eq!(t.country_of("Pereira"), Some("Colombia"));
        assert_eq!(t.all_cities().len(), t.number_of_all_cities());
    }

    #[test]
    fn labels_sorted_by_code() {
        let t = taxonomy();
        assert_eq!(t.labels(Dimension::Age), vec!["young", "middle", "old"]);
        assert_eq!(t.labels(Dimension::Gender), vec!["male", "female"]);
    }

    #[test]
    fn rejects_city_in_two_countries() {
        let json = r#"{
            "Country": {"A": ["X"], "B": ["X"]},
            "City": {"X": 1},
            "Gender": {}, "Age": {}, "Education": {}
        }"#;
        assert!(matches!(Taxonomy::from_json(json), Err(Error::Config(_))));
    }

    #[test]
    fn rejects_wildcard_collision() {
        let json = r#"{
            "Country": {},
            "City": {},
            "Gender": {"all": 3}, "Age": {}, "Education": {}
        }"#;
        assert!(matches!(Taxonomy::from_json(json), Err(Error::Config(_))));
    }
}
