use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// How a question is handled for one turn.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum Intent {
    /// Answer from data fetched out of the movie collection.
    #[strum(serialize = "DataQuery", serialize = "Movies", serialize = "QnA")]
    DataQuery,
    Visualization,
    Help,
    NoContext,
}

impl Intent {
    /// Maps a router label onto an intent.
    ///
    /// Surrounding whitespace, quotes and trailing punctuation are ignored.
    /// Labels that do not name an intent become [`Intent::NoContext`].
    pub fn parse_label(label: &str) -> Self {
        let label = label
            .trim()
            .trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c == '.' || c == '*')
            .trim();
        label.parse().unwrap_or(Intent::NoContext)
    }

    /// The label the router is asked to produce for this intent.
    pub fn label(&self) -> &'static str {
        match self {
            Intent::DataQuery => "Movies",
            Intent::Visualization => "Visualization",
            Intent::Help => "Help",
            Intent::NoContext => "NoContext",
        }
    }
}
