use super::verbs::PersonNumber;

const PRONOUNS: &[(PersonNumber, &[&str])] = &[
    (PersonNumber::FirstSingular, &["yo"]),
    (PersonNumber::SecondSingular, &["tú"]),
    (PersonNumber::ThirdSingular, &["él", "ella", "usted"]),
    (PersonNumber::FirstPlural, &["nosotros", "nosotras"]),
    (PersonNumber::SecondPlural, &["vosotros", "vosotras"]),
    (PersonNumber::ThirdPlural, &["ellos", "ellas", "ustedes"]),
];

/// Slack allowed around a pronoun form inside a search phrase.
const PHRASE_SLACK: usize = 2;

/// Person/number of the pronoun a search phrase stands for, if any.
///
/// The longest matching form wins, so "ustedes" is plural even though it
/// contains "usted".
pub fn pronoun_class(phrase: &str) -> Option<PersonNumber> {
    let phrase = phrase.to_lowercase();
    let phrase_len = phrase.chars().count();
    PRONOUNS
        .iter()
        .flat_map(|(class, forms)| forms.iter().map(move |form| (*class, *form)))
        .filter(|(_, form)| {
            phrase.contains(form) && phrase_len <= form.chars().count() + PHRASE_SLACK
        })
        .max_by_key(|(_, form)| form.chars().count())
        .map(|(class, _)| class)
}

/// The class a verb takes when it disagrees with a pronoun of `class`
/// in the way the corpus studies (vosotros/ustedes crossover).
pub fn agreement_rival(class: PersonNumber) -> Option<PersonNumber> {
    match class {
        PersonNumber::SecondPlural => Some(PersonNumber::ThirdPlural),
        PersonNumber::ThirdPlural => Some(PersonNumber::SecondPlural),
        _ => None,
    }
}

// ── Tests ──
