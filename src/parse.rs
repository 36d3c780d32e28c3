//! Listing-page HTML parsing
//!
//! Turns the HTML fragments returned by the listing endpoint into release
//! candidates. Every release sits in a `div.release-links` block holding
//! the label in its first `<i>` element and the magnet link in a
//! `td.hs-magnet-link` cell. Candidates come out in reverse document
//! order: the page lists lower resolutions first, so reversal puts the
//! highest resolution first and first-writer-wins dedup keeps it.

use crate::extract::{EpisodeLabel, ExtractError, LabelPatterns};
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

/// Errors raised while dissecting a listing page
#[derive(Debug, Error)]
pub enum ParseError {
    /// A CSS selector failed to compile
    #[error("invalid selector: {0}")]
    Selector(String),

    /// A release block carried no label element
    #[error("release block has no label element")]
    MissingEpisodeLabel,

    /// A release block carried no magnet link
    #[error("release block has no magnet link")]
    MissingMagnetLink,

    /// A release label did not match the expected format
    #[error(transparent)]
    Label(#[from] ExtractError),
}

/// One single-episode release candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SingleRelease {
    pub(crate) number: String,
    pub(crate) resolution: String,
    pub(crate) magnet_url: String,
}

/// One batch release candidate covering an inclusive episode range
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BatchRelease {
    pub(crate) first: u32,
    pub(crate) last: u32,
    pub(crate) resolution: String,
    pub(crate) magnet_url: String,
}

/// Compiled selectors for the release-block structure
struct ReleaseSelectors {
    block: Selector,
    label: Selector,
    magnet_cell: Selector,
    link: Selector,
}

impl ReleaseSelectors {
    fn new() -> Result<Self, ParseError> {
        Ok(Self {
            block: Selector::parse("div.release-links")
                .map_err(|e| ParseError::Selector(e.to_string()))?,
            label: Selector::parse("i").map_err(|e| ParseError::Selector(e.to_string()))?,
            magnet_cell: Selector::parse("td.hs-magnet-link")
                .map_err(|e| ParseError::Selector(e.to_string()))?,
            link: Selector::parse("a").map_err(|e| ParseError::Selector(e.to_string()))?,
        })
    }
}

fn label_text(block: ElementRef<'_>, selectors: &ReleaseSelectors) -> Result<String, ParseError> {
    let label = block
        .select(&selectors.label)
        .next()
        .ok_or(ParseError::MissingEpisodeLabel)?;
    Ok(label.text().collect())
}

fn magnet_url(block: ElementRef<'_>, selectors: &ReleaseSelectors) -> Result<String, ParseError> {
    let link = block
        .select(&selectors.magnet_cell)
        .next()
        .and_then(|cell| cell.select(&selectors.link).next())
        .ok_or(ParseError::MissingMagnetLink)?;

    let href = link
        .value()
        .attr("href")
        .ok_or(ParseError::MissingMagnetLink)?;
    Ok(href.to_string())
}

/// Parses one page of the single-episode listing into release candidates
///
/// Candidates are yielded in reverse document order. A page without any
/// release blocks yields an empty list; a block that is missing its label
/// or magnet link, or whose label does not match the single-episode
/// format, fails the whole page.
pub(crate) fn parse_episode_page(
    html: &str,
    patterns: &LabelPatterns,
) -> Result<Vec<SingleRelease>, ParseError> {
    let selectors = ReleaseSelectors::new()?;
    let document = Html::parse_document(html);
    let blocks: Vec<ElementRef<'_>> = document.select(&selectors.block).collect();

    let mut releases = Vec::with_capacity(blocks.len());
    for block in blocks.into_iter().rev() {
        let label = patterns.episode_label(&label_text(block, &selectors)?)?;
        releases.push(SingleRelease {
            number: label.number,
            resolution: label.resolution,
            magnet_url: magnet_url(block, &selectors)?,
        });
    }

    Ok(releases)
}

/// Parses the batch listing into release candidates
///
/// Same traversal as [`parse_episode_page`], against the batch label
/// format. A body without release blocks (shows often have no batches,
/// and the endpoint answers those with a plain-text notice) yields an
/// empty list.
pub(crate) fn parse_batch_page(
    html: &str,
    patterns: &LabelPatterns,
) -> Result<Vec<BatchRelease>, ParseError> {
    let selectors = ReleaseSelectors::new()?;
    let document = Html::parse_document(html);
    let blocks: Vec<ElementRef<'_>> = document.select(&selectors.block).collect();

    let mut releases = Vec::with_capacity(blocks.len());
    for block in blocks.into_iter().rev() {
        let label = patterns.batch_label(&label_text(block, &selectors)?)?;
        releases.push(BatchRelease {
            first: label.first,
            last: label.last,
            resolution: label.resolution,
            magnet_url: magnet_url(block, &selectors)?,
        });
    }

    Ok(releases)
}

/// Reads the most recent episode's label from the unpaginated listing
///
/// The listing puts the newest episode first, so the first release block
/// in document order names the most recent episode. Returns `None` when
/// the listing has no release blocks at all, meaning the show has no
/// standalone episodes yet.
pub(crate) fn most_recent_episode_label(
    html: &str,
    patterns: &LabelPatterns,
) -> Result<Option<EpisodeLabel>, ParseError> {
    let selectors = ReleaseSelectors::new()?;
    let document = Html::parse_document(html);

    let Some(block) = document.select(&selectors.block).next() else {
        return Ok(None);
    };

    let label = patterns.episode_label(&label_text(block, &selectors)?)?;
    Ok(Some(label))
}
