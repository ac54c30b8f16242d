pub mod environment;
pub mod pronoun;
pub mod verbs;

pub use environment::WordWindow;
pub use verbs::{PersonNumber, VerbClassification};

/// Two-pass pipeline: excerpt → word window → verb buckets per side.
pub fn classify_window(window: &WordWindow) -> (VerbClassification, VerbClassification) {
    (
        VerbClassification::classify_list(&window.leading),
        VerbClassification::classify_list(&window.following),
    )
}
