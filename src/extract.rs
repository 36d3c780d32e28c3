//! Release-label pattern extraction
//!
//! Every release block on a HorribleSubs listing page carries a short label
//! such as `Naruto Shippuuden - 495 [1080p]` or, for batches,
//! `Naruto Shippuuden (80-426) [1080p]`. This module pulls the episode
//! numeral (or batch range) and the video resolution out of those labels,
//! and locates the numeric show id embedded in a show's webpage.

use regex::Regex;
use thiserror::Error;

/// Errors raised when page text does not match any known HorribleSubs format
///
/// These are unrecoverable: a mismatching label means the website's page
/// structure has changed, so the caller aborts instead of skipping.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// A single-episode label did not have the expected shape
    #[error("episode label {label:?} does not match \"<title> - <episode> [<resolution>]\"")]
    EpisodeLabel { label: String },

    /// A batch label did not have the expected shape
    #[error("batch label {label:?} does not match \"<title> (<first>-<last>) [<resolution>]\"")]
    BatchLabel { label: String },
}

/// Episode numeral and resolution extracted from a single-episode label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeLabel {
    /// The episode numeral, kept as text: special editions use markers
    /// like "10.5" that are not plain integers
    pub number: String,
    /// The video resolution label, e.g. "1080p"
    pub resolution: String,
}

/// Inclusive episode range and resolution extracted from a batch label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchLabel {
    /// First episode number covered by the batch
    pub first: u32,
    /// Last episode number covered by the batch
    pub last: u32,
    /// The video resolution label, e.g. "1080p"
    pub resolution: String,
}

/// The compiled patterns for every text format the scraper recognizes
///
/// Compiled once per scrape and shared by all page-parsing threads.
pub struct LabelPatterns {
    /// Group 1 is the episode numeral, group 2 the resolution
    episode: Regex,
    /// Groups 1 and 2 are the first/last episode of the batch, group 3 the resolution
    batch: Regex,
    /// Group 1 is the numeric show id embedded in a show webpage
    show_id: Regex,
}

impl LabelPatterns {
    /// Compiles the label and show-id patterns
    pub fn new() -> Self {
        Self {
            episode: Regex::new(r"^.* - ([.\da-zA-Z]*) \[(\d*p)\]").unwrap(),
            batch: Regex::new(r"^.* \((\d+)-(\d+)\) \[(\d*p)\]").unwrap(),
            show_id: Regex::new(r"var hs_showid = (\d+)").unwrap(),
        }
    }

    /// Extracts the episode numeral and resolution from a single-episode label
    ///
    /// The numeral is preserved as text rather than parsed to an integer,
    /// since special editions use non-integer markers.
    pub fn episode_label(&self, label: &str) -> Result<EpisodeLabel, ExtractError> {
        let captures = self
            .episode
            .captures(label)
            .ok_or_else(|| ExtractError::EpisodeLabel {
                label: label.to_string(),
            })?;

        Ok(EpisodeLabel {
            number: captures[1].to_string(),
            resolution: captures[2].to_string(),
        })
    }

    /// Extracts the inclusive episode range and resolution from a batch label
    pub fn batch_label(&self, label: &str) -> Result<BatchLabel, ExtractError> {
        let mismatch = || ExtractError::BatchLabel {
            label: label.to_string(),
        };

        let captures = self.batch.captures(label).ok_or_else(mismatch)?;

        // The digit groups are guaranteed numeric; parse can still fail
        // on values too large for an episode number.
        let first = captures[1].parse().map_err(|_| mismatch())?;
        let last = captures[2].parse().map_err(|_| mismatch())?;

        Ok(BatchLabel {
            first,
            last,
            resolution: captures[3].to_string(),
        })
    }

    /// Finds the numeric show id in a show webpage body
    ///
    /// Searches the whole body for `var hs_showid = <digits>`; the first
    /// match wins. Returns `None` if the marker is absent.
    pub fn show_id(&self, html: &str) -> Option<u32> {
        self.show_id
            .captures(html)
            .and_then(|captures| captures[1].parse().ok())
    }
}

impl Default for LabelPatterns {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_episode_label_standard() {
        let patterns = LabelPatterns::new();
        let parsed = patterns
            .episode_label("Naruto Shippuuden - 495 [1080p]")
            .unwrap();

        assert_eq!(parsed.number, "495");
        assert_eq!(parsed.resolution, "1080p");
    }

    #[test]
    fn test_episode_label_special_edition_marker() {
        let patterns = LabelPatterns::new();
        let parsed = patterns.episode_label("Psycho-Pass - 10.5 [720p]").unwrap();

        // Non-integer numerals are preserved as text
        assert_eq!(parsed.number, "10.5");
        assert_eq!(parsed.resolution, "720p");
    }

    #[test]
    fn test_episode_label_title_containing_separator() {
        let patterns = LabelPatterns::new();
        // Greedy title match: the numeral is taken after the last " - "
        let parsed = patterns.episode_label("Re - Zero - 12 [480p]").unwrap();

        assert_eq!(parsed.number, "12");
        assert_eq!(parsed.resolution, "480p");
    }

    #[test]
    fn test_episode_label_mismatch() {
        let patterns = LabelPatterns::new();
        let result = patterns.episode_label("91 Days (1-12) [1080p]");

        assert!(matches!(result, Err(ExtractError::EpisodeLabel { .. })));
    }

    #[test]
    fn test_batch_label_standard() {
        let patterns = LabelPatterns::new();
        let parsed = patterns
            .batch_label("Naruto Shippuuden (80-426) [1080p]")
            .unwrap();

        assert_eq!(parsed.first, 80);
        assert_eq!(parsed.last, 426);
        assert_eq!(parsed.resolution, "1080p");
    }

    #[test]
    fn test_batch_label_mismatch_on_single_format() {
        let patterns = LabelPatterns::new();
        let result = patterns.batch_label("91 Days - 3 [1080p]");

        assert!(matches!(result, Err(ExtractError::BatchLabel { .. })));
    }

    #[test]
    fn test_show_id_found() {
        let patterns = LabelPatterns::new();
        let html = "<html><script>var hs_showid = 731;</script></html>";

        assert_eq!(patterns.show_id(html), Some(731));
    }

    #[test]
    fn test_show_id_first_match_wins() {
        let patterns = LabelPatterns::new();
        let html = "var hs_showid = 12; var hs_showid = 99;";

        assert_eq!(patterns.show_id(html), Some(12));
    }

    #[test]
    fn test_show_id_absent() {
        let patterns = LabelPatterns::new();

        assert_eq!(patterns.show_id("<html><body>nothing here</body></html>"), None);
    }
}
