use std::sync::LazyLock;

use scraper::{Html, Selector};

use crate::error::{Error, Result};
use crate::filter::Query;

static FORM_INPUT_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("form input").unwrap());

const FIELD_PREFIX: &str = "dnn$ctr520$TranscriptionQuery$";

const SCRIPT_MANAGER_TSM: &str = ";;System.Web.Extensions, Version=3.5.0.0, Culture=neutral, \
    PublicKeyToken=31bf3856ad364e35:en:16997a38-7253-4f67-80d9-0cbcc01b3057:ea597d4b:b25378d2";

// Identity fields the form insists on; any non-empty value is accepted.
const FIRST_NAME: &str = "x";
const SURNAME: &str = "x";
const INSTITUTION: &str = "x";

const CHECKED: &str = "on";
const SCROLL_TOP: &str = "536";

const SEARCH_BUTTON: &str = "btnFtSearch";
const RESHOW: &str = "summary1$hdnReShow";
const DNN_VARIABLE: &str = "__dnnVariable";

/// Hidden fields the page emits under their well-known ASP.NET names.
const ASPNET_FIELDS: &[&str] = &[
    "__EVENTTARGET",
    "__EVENTARGUMENT",
    "__VIEWSTATE",
    "__VIEWSTATEGENERATOR",
    "__VIEWSTATEENCRYPTED",
    "__EVENTVALIDATION",
];

/// Token slot: position among the form's valued inputs, the payload field
/// it feeds, and the suffix its `name` must carry when it has one.
struct Slot {
    position: usize,
    field: &'static str,
    name_suffix: &'static str,
}

const LAYOUT: &[Slot] = &[
    Slot {
        position: 2,
        field: "StylesheetManager_TSSM",
        name_suffix: "StylesheetManager_TSSM",
    },
    Slot {
        position: 3,
        field: "__EVENTTARGET",
        name_suffix: "__EVENTTARGET",
    },
    Slot {
        position: 4,
        field: "__EVENTARGUMENT",
        name_suffix: "__EVENTARGUMENT",
    },
    Slot {
        position: 5,
        field: "__VIEWSTATE",
        name_suffix: "__VIEWSTATE",
    },
    Slot {
        position: 6,
        field: "__VIEWSTATEGENERATOR",
        name_suffix: "__VIEWSTATEGENERATOR",
    },
    Slot {
        position: 7,
        field: "__VIEWSTATEENCRYPTED",
        name_suffix: "__VIEWSTATEENCRYPTED",
    },
    Slot {
        position: 8,
        field: "__EVENTVALIDATION",
        name_suffix: "__EVENTVALIDATION",
    },
    Slot {
        position: 9,
        field: SEARCH_BUTTON,
        name_suffix: SEARCH_BUTTON,
    },
    Slot {
        position: 11,
        field: RESHOW,
        name_suffix: "hdnReShow",
    },
    Slot {
        position: 12,
        field: DNN_VARIABLE,
        name_suffix: DNN_VARIABLE,
    },
];

/// Minimum number of valued inputs a query form must carry.
pub const MIN_INPUTS: usize = 13;

/// Session tokens scraped from one rendering of the query form.
///
/// Replaced wholesale whenever the server renders the form again; never
/// patched field by field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormState {
    tokens: Vec<(&'static str, String)>,
}

impl FormState {
    /// Pull the positional hidden tokens out of a rendered form page.
    pub fn scrape(html: &str) -> Result<Self> {
        let doc = Html::parse_document(html);
        let inputs: Vec<(Option<&str>, &str)> = doc
            .select(&FORM_INPUT_SEL)
            .filter_map(|el| {
                let attrs = el.value();
                attrs.attr("value").map(|v| (attrs.attr("name"), v))
            })
            .collect();

        if inputs.len() < MIN_INPUTS {
            return Err(Error::Parse(format!(
                "query form has {} valued inputs, expected at least {MIN_INPUTS}",
                inputs.len()
            )));
        }

        let mut tokens = Vec::with_capacity(LAYOUT.len());
        for slot in LAYOUT {
            let (name, value) = inputs[slot.position];
            if let Some(name) = name {
                if !name.ends_with(slot.name_suffix) {
                    return Err(Error::Parse(format!(
                        "form inputs misaligned: found {name} where {} was expected",
                        slot.field
                    )));
                }
            }
            let value = if slot.field == DNN_VARIABLE {
                renormalize_quotes(value)
            } else {
                value.to_string()
            };
            tokens.push((slot.field, value));
        }

        Ok(Self { tokens })
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.tokens
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, value)| value.as_str())
    }

    fn token(&self, field: &str) -> String {
        self.get(field).unwrap_or_default().to_string()
    }

    /// Form fields for the search POST, in submission order.
    pub fn payload(&self, query: &Query) -> Vec<(String, String)> {
        let field = |name: &str| format!("{FIELD_PREFIX}{name}");
        let mut fields = vec![
            ("StylesheetManager_TSSM".to_string(), self.token("StylesheetManager_TSSM")),
            ("ScriptManager_TSM".to_string(), SCRIPT_MANAGER_TSM.to_string()),
        ];
        for name in ASPNET_FIELDS {
            fields.push((name.to_string(), self.token(name)));
        }
        fields.push((field("txtFirstname"), FIRST_NAME.to_string()));
        fields.push((field("txtSurname"), SURNAME.to_string()));
        fields.push((field("txtInstitution"), INSTITUTION.to_string()));
        for key in &query.filter_keys {
            fields.push((key.clone(), CHECKED.to_string()));
        }
        fields.push((field("txtFtValue"), query.phrase.clone()));
        fields.push((field(SEARCH_BUTTON), self.token(SEARCH_BUTTON)));
        fields.push((field("hdnShowPagerResults"), String::new()));
        fields.push((field("hdnPagerIndex"), String::new()));
        fields.push((field("summary1$txtValidatorHack"), String::new()));
        fields.push((field(RESHOW), self.token(RESHOW)));
        fields.push(("ScrollTop".to_string(), SCROLL_TOP.to_string()));
        fields.push((DNN_VARIABLE.to_string(), self.token(DNN_VARIABLE)));
        fields
    }
}

/// Re-quote the nested serialization the page keeps in `__dnnVariable`.
///
/// Backticks become apostrophes, apostrophes and escaped quotes become
/// double quotes, then every double quote turns back into an apostrophe
/// except the outermost pair.
pub fn renormalize_quotes(raw: &str) -> String {
    let mut s = raw
        .replace('`', "'")
        .replace('\'', "\"")
        .replace("\\'", "\"")
        .replace("\\\"", "\"");
    s.push('"');
    let mut chars: Vec<char> = s.replace('"', "'").chars().collect();
    let last = chars.len() - 1;
    chars[0] = '"';
    chars[last] = '"';
    chars.into_iter().collect()
}

// ── Tests ──
