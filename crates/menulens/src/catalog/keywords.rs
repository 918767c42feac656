use serde::Serialize;

use crate::catalog::normalize::normalize;

// Brand and spirit names seen on bar menus of coastal Indian restaurants.
const ALCOHOL_KEYWORDS: &[&str] = &[
    "rum",
    "whisky",
    "whiskey",
    "beer",
    "wine",
    "vodka",
    "gin",
    "brandy",
    "scotch",
    "royal challenge",
    "royal stag",
    "black label",
    "dsp",
    "old monk",
    "magic moment",
    "romanov",
    "tuborg",
    "kingfisher",
    "budweiser",
    "budwiser",
    "corona",
    "heineken",
    "bacardi",
    "smirnoff",
    "absolut",
    "teachers",
    "ballantine",
    "blenders",
    "imperial blue",
    "signature",
    "antiquity",
    "barrel",
    "calsberg",
    "breezer",
    "foster",
    "carlsberg",
    "feni",
    "urrak",
    "tequila",
    "mcdowell",
    "8pm",
    "officers choice",
    "bira",
    "hoegaarden",
];

const STAPLE_KEYWORDS: &[&str] = &[
    "thali",
    "rice",
    "chapati",
    "chapatti",
    "roti",
    "bhakri",
    "bhakari",
    "dal",
    "pulao",
    "biryani",
    "paratha",
    "naan",
    "bread",
    "pav",
    "curry",
    "fish",
    "chicken",
    "mutton",
    "prawns",
    "egg",
    "sol kadhi",
    "water",
];

/// Demand class used to bound plausible elasticity magnitudes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DemandClass {
    Alcohol,
    Staple,
    General,
}

impl DemandClass {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Alcohol => "ALCOHOL",
            Self::Staple => "STAPLE",
            Self::General => "GENERAL",
        }
    }
}

pub fn looks_like_alcohol(name: &str) -> bool {
    contains_keyword(&normalize(name), ALCOHOL_KEYWORDS)
}

pub fn looks_like_staple(name: &str) -> bool {
    contains_keyword(&normalize(name), STAPLE_KEYWORDS)
}

pub fn demand_class(name: &str, is_alcohol: bool) -> DemandClass {
    if is_alcohol {
        return DemandClass::Alcohol;
    }
    if looks_like_staple(name) {
        return DemandClass::Staple;
    }
    DemandClass::General
}

// Keywords match whole words (or whole word runs), so "gin" does not hit
// "ginger" and "rum" does not hit "drumstick".
fn contains_keyword(normalized: &str, keywords: &[&str]) -> bool {
    let padded = format!(" {normalized} ");
    keywords
        .iter()
        .any(|keyword| padded.contains(&format!(" {keyword} ")))
}
