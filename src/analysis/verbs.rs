use std::collections::BTreeMap;
use std::fmt;

/// Grammatical person and number of a finite verb form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PersonNumber {
    FirstSingular,
    SecondSingular,
    ThirdSingular,
    FirstPlural,
    SecondPlural,
    ThirdPlural,
}

impl PersonNumber {
    pub const ALL: [PersonNumber; 6] = [
        PersonNumber::FirstSingular,
        PersonNumber::SecondSingular,
        PersonNumber::ThirdSingular,
        PersonNumber::FirstPlural,
        PersonNumber::SecondPlural,
        PersonNumber::ThirdPlural,
    ];

    pub fn key(self) -> &'static str {
        match self {
            PersonNumber::FirstSingular => "1ps_sg",
            PersonNumber::SecondSingular => "2ps_sg",
            PersonNumber::ThirdSingular => "3ps_sg",
            PersonNumber::FirstPlural => "1ps_pl",
            PersonNumber::SecondPlural => "2ps_pl",
            PersonNumber::ThirdPlural => "3ps_pl",
        }
    }
}

impl fmt::Display for PersonNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

struct Rule {
    class: PersonNumber,
    suffixes: &'static [&'static str],
    exceptions: &'static [&'static str],
    exception_prefixes: &'static [&'static str],
}

const RULES: &[Rule] = &[
    Rule {
        class: PersonNumber::FirstSingular,
        suffixes: &["o", "oy"],
        exceptions: &["no"],
        exception_prefixes: &["lo"],
    },
    Rule {
        class: PersonNumber::SecondSingular,
        suffixes: &["as", "es"],
        exceptions: &["les"],
        exception_prefixes: &[],
    },
    Rule {
        class: PersonNumber::ThirdSingular,
        suffixes: &["e", "a"],
        exceptions: &["les", "le", "la", "las"],
        exception_prefixes: &[],
    },
    Rule {
        class: PersonNumber::FirstPlural,
        suffixes: &["mos", "monos"],
        exceptions: &["monos"],
        exception_prefixes: &[],
    },
    Rule {
        class: PersonNumber::SecondPlural,
        suffixes: &["eis", "ois", "ais", "áis", "éis"],
        exceptions: &[],
        exception_prefixes: &[],
    },
    Rule {
        class: PersonNumber::ThirdPlural,
        suffixes: &["en", "on", "an", "án"],
        exceptions: &["con", "en"],
        exception_prefixes: &[],
    },
];

const GERUND_SUFFIXES: &[&str] = &["ando", "iendo", "yendo"];

impl Rule {
    fn matches(&self, word: &str) -> bool {
        !self.exceptions.contains(&word)
            && !self.exception_prefixes.iter().any(|p| word.starts_with(p))
            && self.suffixes.iter().any(|s| word.ends_with(s))
    }
}

/// Drop one trailing `?` or `!` and lowercase.
fn normalize(word: &str) -> String {
    let trimmed = match word.strip_suffix(['?', '!']) {
        Some(rest) if !rest.is_empty() => rest,
        _ => word,
    };
    trimmed.to_lowercase()
}

/// Every class whose ending fits `word`. Ambiguous endings yield several.
pub fn classify(word: &str) -> Vec<PersonNumber> {
    let word = normalize(word);
    if GERUND_SUFFIXES.iter().any(|s| word.ends_with(s)) {
        return Vec::new();
    }
    RULES
        .iter()
        .filter(|rule| rule.matches(&word))
        .map(|rule| rule.class)
        .collect()
}

/// Words bucketed by person/number; a word appears under every class it fits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerbClassification {
    buckets: BTreeMap<PersonNumber, Vec<String>>,
}

impl VerbClassification {
    pub fn classify_list<S: AsRef<str>>(words: &[S]) -> Self {
        let mut buckets: BTreeMap<PersonNumber, Vec<String>> =
            PersonNumber::ALL.iter().map(|c| (*c, Vec::new())).collect();
        for word in words {
            let word = word.as_ref();
            for class in classify(word) {
                buckets.entry(class).or_default().push(word.to_string());
            }
        }
        Self { buckets }
    }

    pub fn get(&self, class: PersonNumber) -> &[String] {
        self.buckets.get(&class).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn has(&self, class: PersonNumber) -> bool {
        !self.get(class).is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PersonNumber, &[String])> {
        self.buckets.iter().map(|(k, v)| (*k, v.as_slice()))
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use PersonNumber::*;

    #[test]
    fn second_plural_endings() {
        assert!(classify("estais").contains(&SecondPlural));
        assert!(classify("sois").contains(&SecondPlural));
        assert!(classify("habéis").contains(&SecondPlural));
        assert!(!classify("me").contains(&SecondPlural));
    }

    #[test]
    fn third_plural_endings_and_exceptions() {
        assert!(classify("eran").contains(&ThirdPlural));
        assert!(classify("están").contains(&ThirdPlural));
        assert!(!classify("me").contains(&ThirdPlural));
        assert!(!classify("con").contains(&ThirdPlural));
        assert!(!classify("en").contains(&ThirdPlural));
    }

    #[test]
    fn gerunds_match_nothing() {
        assert!(classify("comiendo").is_empty());
        assert!(classify("hablando").is_empty());
        assert!(classify("leyendo").is_empty());
    }

    #[test]
    fn exceptions_and_prefixes() {
        assert!(classify("no").is_empty());
        assert!(!classify("lo").contains(&FirstSingular));
        assert!(!classify("les").contains(&SecondSingular));
        assert!(!classify("la").contains(&ThirdSingular));
        assert!(classify("monos").is_empty());
        assert_eq!(classify("vamos"), vec![FirstPlural]);
    }

    #[test]
    fn punctuation_is_stripped() {
        assert_eq!(classify("voy!"), vec![FirstSingular]);
        assert_eq!(classify("tienen?"), vec![ThirdPlural]);
        assert!(classify("no!").is_empty());
        assert!(classify("?").is_empty());
    }

    #[test]
    fn one_bucket_per_distinct_ending() {
        let classes = classify("abres");
        assert_eq!(classes, vec![SecondSingular]);
        let classes = classify("ais");
        assert_eq!(classes, vec![SecondPlural]);
        let classes = classify("sean");
        assert_eq!(classes, vec![ThirdPlural]);
        let classes = classify("queda");
        assert_eq!(classes, vec![ThirdSingular]);
        let classes = classify("odian");
        assert_eq!(classes, vec![ThirdPlural]);
    }

    #[test]
    fn classify_list_buckets_words() {
        let words = ["Hola", "llamo", "vamos", "abren", "ves", "echan", "voy", "no!"];
        let c = VerbClassification::classify_list(&words);
        assert_eq!(c.get(FirstSingular), ["llamo", "voy"]);
        assert_eq!(c.get(FirstPlural), ["vamos"]);
        assert_eq!(c.get(ThirdPlural), ["abren", "echan"]);
        assert_eq!(c.get(SecondSingular), ["ves"]);
        assert_eq!(c.get(ThirdSingular), ["Hola"]);
        assert!(!c.has(SecondPlural));
    }

    #[test]
    fn empty_list_has_all_buckets_empty() {
        let c = VerbClassification::classify_list::<&str>(&[]);
        assert_eq!(c.iter().count(), 6);
        assert!(PersonNumber::ALL.iter().all(|k| !c.has(*k)));
    }
}
