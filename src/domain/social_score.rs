//! Social Score
//!
//! Heuristic scoring of a token's metadata JSON: twitter +40, telegram +40,
//! website +20. A token with no socials at all scores 0 and is rejected.

use serde::{Deserialize, Serialize};

/// Minimum score for a token to pass the filter (at least one of
/// twitter/telegram present)
pub const MIN_VALID_SCORE: u8 = 40;

/// Social links extracted from token metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SocialLinks {
    pub twitter: Option<String>,
    pub telegram: Option<String>,
    pub website: Option<String>,
}

impl SocialLinks {
    /// Pull links from a metadata JSON document. Links may sit at the top
    /// level or under `extensions` depending on the launchpad.
    pub fn from_metadata(json: &serde_json::Value) -> Self {
        let pick = |key: &str| -> Option<String> {
            json.get(key)
                .or_else(|| json.get("extensions").and_then(|e| e.get(key)))
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Self {
            twitter: pick("twitter"),
            telegram: pick("telegram"),
            website: pick("website"),
        }
    }

    /// Heuristic score: twitter 40, telegram 40, website 20
    pub fn score(&self) -> u8 {
        let mut score = 0;
        if self.twitter.is_some() {
            score += 40;
        }
        if self.telegram.is_some() {
            score += 40;
        }
        if self.website.is_some() {
            score += 20;
        }
        score
    }

    /// Valid iff at least one heavyweight social is present
    pub fn is_valid(&self) -> bool {
        self.score() >= MIN_VALID_SCORE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_full_socials_score_100() {
        let links = SocialLinks::from_metadata(&json!({
            "name": "Ape",
            "twitter": "https://x.com/ape",
            "telegram": "https://t.me/ape",
            "website": "https://ape.example"
        }));
        assert_eq!(links.score(), 100);
        assert!(links.is_valid());
    }

    #[test]
    fn test_extensions_block_is_checked() {
        let links = SocialLinks::from_metadata(&json!({
            "extensions": { "twitter": "https://x.com/ape" }
        }));
        assert_eq!(links.score(), 40);
        assert!(links.is_valid());
    }

    #[test]
    fn test_website_alone_fails() {
        let links = SocialLinks::from_metadata(&json!({
            "website": "https://ape.example"
        }));
        assert_eq!(links.score(), 20);
        assert!(!links.is_valid());
    }

    #[test]
    fn test_no_socials_scores_zero() {
        let links = SocialLinks::from_metadata(&json!({ "name": "Rug" }));
        assert_eq!(links.score(), 0);
        assert!(!links.is_valid());
    }

    #[test]
    fn test_empty_strings_ignored() {
        let links = SocialLinks::from_metadata(&json!({ "twitter": "" }));
        assert_eq!(links.score(), 0);
    }
}
