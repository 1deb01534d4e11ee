//! Country codes used to classify channel groups
//!
//! The table order is significant: the classifier walks the codes in
//! declaration order and the first match wins, so short, ambiguous tokens of
//! earlier entries shadow later ones.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountryCode {
    Turkey,
    Germany,
    Romania,
    Austria,
    France,
    Italy,
    Spain,
    Uk,
    Usa,
    Netherlands,
    Poland,
    Russia,
    Arabic,
    India,
    Portugal,
    Greece,
    Albania,
    Serbia,
    Croatia,
    Bulgaria,
    Other,
}

impl CountryCode {
    /// Every code in classification order
    pub const ALL: [CountryCode; 21] = [
        CountryCode::Turkey,
        CountryCode::Germany,
        CountryCode::Romania,
        CountryCode::Austria,
        CountryCode::France,
        CountryCode::Italy,
        CountryCode::Spain,
        CountryCode::Uk,
        CountryCode::Usa,
        CountryCode::Netherlands,
        CountryCode::Poland,
        CountryCode::Russia,
        CountryCode::Arabic,
        CountryCode::India,
        CountryCode::Portugal,
        CountryCode::Greece,
        CountryCode::Albania,
        CountryCode::Serbia,
        CountryCode::Croatia,
        CountryCode::Bulgaria,
        CountryCode::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CountryCode::Turkey => "turkey",
            CountryCode::Germany => "germany",
            CountryCode::Romania => "romania",
            CountryCode::Austria => "austria",
            CountryCode::France => "france",
            CountryCode::Italy => "italy",
            CountryCode::Spain => "spain",
            CountryCode::Uk => "uk",
            CountryCode::Usa => "usa",
            CountryCode::Netherlands => "netherlands",
            CountryCode::Poland => "poland",
            CountryCode::Russia => "russia",
            CountryCode::Arabic => "arabic",
            CountryCode::India => "india",
            CountryCode::Portugal => "portugal",
            CountryCode::Greece => "greece",
            CountryCode::Albania => "albania",
            CountryCode::Serbia => "serbia",
            CountryCode::Croatia => "croatia",
            CountryCode::Bulgaria => "bulgaria",
            CountryCode::Other => "other",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            CountryCode::Turkey => "Turkey",
            CountryCode::Germany => "Germany",
            CountryCode::Romania => "Romania",
            CountryCode::Austria => "Austria",
            CountryCode::France => "France",
            CountryCode::Italy => "Italy",
            CountryCode::Spain => "Spain",
            CountryCode::Uk => "United Kingdom",
            CountryCode::Usa => "United States",
            CountryCode::Netherlands => "Netherlands",
            CountryCode::Poland => "Poland",
            CountryCode::Russia => "Russia",
            CountryCode::Arabic => "Arabic",
            CountryCode::India => "India",
            CountryCode::Portugal => "Portugal",
            CountryCode::Greece => "Greece",
            CountryCode::Albania => "Albania",
            CountryCode::Serbia => "Serbia",
            CountryCode::Croatia => "Croatia",
            CountryCode::Bulgaria => "Bulgaria",
            CountryCode::Other => "Other",
        }
    }

    pub fn flag(&self) -> &'static str {
        match self {
            CountryCode::Turkey => "🇹🇷",
            CountryCode::Germany => "🇩🇪",
            CountryCode::Romania => "🇷🇴",
            CountryCode::Austria => "🇦🇹",
            CountryCode::France => "🇫🇷",
            CountryCode::Italy => "🇮🇹",
            CountryCode::Spain => "🇪🇸",
            CountryCode::Uk => "🇬🇧",
            CountryCode::Usa => "🇺🇸",
            CountryCode::Netherlands => "🇳🇱",
            CountryCode::Poland => "🇵🇱",
            CountryCode::Russia => "🇷🇺",
            CountryCode::Arabic => "🇸🇦",
            CountryCode::India => "🇮🇳",
            CountryCode::Portugal => "🇵🇹",
            CountryCode::Greece => "🇬🇷",
            CountryCode::Albania => "🇦🇱",
            CountryCode::Serbia => "🇷🇸",
            CountryCode::Croatia => "🇭🇷",
            CountryCode::Bulgaria => "🇧🇬",
            CountryCode::Other => "🌍",
        }
    }

    /// Lowercase tokens matched against group labels, in match order
    pub fn tokens(&self) -> &'static [&'static str] {
        match self {
            CountryCode::Turkey => &["tr", "tur", "turkey", "türkiye", "turkiye", "turkish", "turk"],
            CountryCode::Germany => &["de", "ger", "germany", "deutschland", "german", "deutsch", "deu"],
            CountryCode::Romania => &["ro", "rom", "romania", "romanian", "rou"],
            CountryCode::Austria => &["at", "aut", "austria", "österreich", "austrian"],
            CountryCode::France => &["fr", "fra", "france", "french", "francais"],
            CountryCode::Italy => &["it", "ita", "italy", "italian", "italiano"],
            CountryCode::Spain => &["es", "esp", "spain", "spanish", "espanol", "españa"],
            CountryCode::Uk => &["uk", "gb", "gbr", "england", "british", "english"],
            CountryCode::Usa => &["us", "usa", "america", "american", "united states"],
            CountryCode::Netherlands => &["nl", "nld", "netherlands", "dutch", "holland"],
            CountryCode::Poland => &["pl", "pol", "poland", "polish", "polska"],
            CountryCode::Russia => &["ru", "rus", "russia", "russian"],
            CountryCode::Arabic => &["ar", "ara", "arabic", "arab", "عربي"],
            CountryCode::India => &["in", "ind", "india", "indian", "hindi"],
            CountryCode::Portugal => &["pt", "por", "portugal", "portuguese", "brasil", "brazil"],
            CountryCode::Greece => &["gr", "gre", "greece", "greek", "ελληνικά"],
            CountryCode::Albania => &["al", "alb", "albania", "albanian", "shqip"],
            CountryCode::Serbia => &["rs", "srb", "serbia", "serbian", "srpski"],
            CountryCode::Croatia => &["hr", "hrv", "croatia", "croatian", "hrvatski"],
            CountryCode::Bulgaria => &["bg", "bgr", "bulgaria", "bulgarian"],
            CountryCode::Other => &["other", "misc", "mixed", "international", "world"],
        }
    }

    /// Display priority, lower is shown first
    pub fn priority(&self) -> u8 {
        match self {
            CountryCode::Turkey => 0,
            CountryCode::Germany => 1,
            CountryCode::Romania => 2,
            CountryCode::Austria => 3,
            CountryCode::Other => 100,
            other => 10 + CountryCode::ALL.iter().position(|c| c == other).unwrap_or(0) as u8,
        }
    }

    /// Codes highlighted ahead of the alphabetical list
    pub fn is_featured(&self) -> bool {
        self.priority() < 10
    }

    /// All codes sorted by priority, ties broken by key
    pub fn by_priority() -> Vec<CountryCode> {
        let mut codes = Self::ALL.to_vec();
        codes.sort_by_key(|c| (c.priority(), c.as_str()));
        codes
    }
}

impl std::fmt::Display for CountryCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CountryCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| format!("Unknown country code: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_round_trip_keys() {
        for code in CountryCode::ALL {
            assert_eq!(CountryCode::from_str(code.as_str()), Ok(code));
        }
        assert_eq!(CountryCode::from_str(" Turkey "), Ok(CountryCode::Turkey));
        assert!(CountryCode::from_str("atlantis").is_err());
    }

    #[test]
    fn test_priority_order() {
        let ordered = CountryCode::by_priority();
        assert_eq!(ordered[0], CountryCode::Turkey);
        assert_eq!(ordered[1], CountryCode::Germany);
        assert_eq!(*ordered.last().unwrap(), CountryCode::Other);
        assert!(CountryCode::Romania.is_featured());
        assert!(!CountryCode::France.is_featured());
    }

    #[test]
    fn test_tokens_are_lowercase() {
        for code in CountryCode::ALL {
            for token in code.tokens() {
                assert_eq!(*token, token.to_lowercase());
            }
        }
    }
}
