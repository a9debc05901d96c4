use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::request::RequestError;

/// Closed set of content categories a request may target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Gaming,
    Education,
    Entertainment,
    Tech,
    Vlog,
    Food,
    Music,
    Howto,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Gaming,
        Category::Education,
        Category::Entertainment,
        Category::Tech,
        Category::Vlog,
        Category::Food,
        Category::Music,
        Category::Howto,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Gaming => "gaming",
            Category::Education => "education",
            Category::Entertainment => "entertainment",
            Category::Tech => "tech",
            Category::Vlog => "vlog",
            Category::Food => "food",
            Category::Music => "music",
            Category::Howto => "howto",
        }
    }

    /// Terms that describe typical content in the category, fed to the expansion prompt.
    #[must_use]
    pub fn seed_terms(self) -> &'static [&'static str] {
        match self {
            Category::Gaming => &["gameplay", "walkthrough", "guide", "let's play"],
            Category::Education => &["lecture", "tutorial", "learn", "study"],
            Category::Entertainment => &["funny", "reaction", "challenge", "prank"],
            Category::Tech => &["review", "unboxing", "comparison", "new release"],
            Category::Vlog => &["daily life", "vlog", "routine", "day in the life"],
            Category::Food => &["recipe", "cooking", "mukbang", "restaurant"],
            Category::Music => &["cover", "lyrics", "playlist", "live"],
            Category::Howto => &["diy", "how to", "fix", "step by step"],
        }
    }

    /// Words that tend to lift click-through in the category.
    #[must_use]
    pub fn boost_words(self) -> &'static [&'static str] {
        match self {
            Category::Gaming => &["beginner", "tips", "latest"],
            Category::Education => &["easy", "basics", "complete"],
            Category::Entertainment => &["legendary", "insane", "shocking"],
            Category::Tech => &["best", "latest", "in-depth"],
            Category::Vlog => &["real", "honest", "relatable"],
            Category::Food => &["simple", "quick", "delicious"],
            Category::Music => &["best", "relaxing", "official"],
            Category::Howto => &["easy", "quick", "cheap"],
        }
    }

    /// Keyword used as the reference series when measuring relative interest.
    #[must_use]
    pub fn trends_anchor(self) -> &'static str {
        match self {
            Category::Gaming => "games",
            Category::Education => "study",
            Category::Entertainment => "funny videos",
            Category::Tech => "smartphone",
            Category::Vlog => "vlog",
            Category::Food => "recipe",
            Category::Music => "music",
            Category::Howto => "how to",
        }
    }

    /// Anchor used when a request carries no category.
    pub const GENERAL_ANCHOR: &'static str = "youtube";
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == lowered)
            .ok_or_else(|| RequestError::UnknownCategory(s.to_string()))
    }
}
