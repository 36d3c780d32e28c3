//! HorribleSubs episode scraper
//!
//! This library collects the magnet links for every episode of a show
//! tracked on HorribleSubs, merging standalone episode releases with
//! batch releases and keeping the highest resolution of each, and can
//! hand the collected links to the platform's default torrent client.

mod download;
mod episodes;
mod extract;
mod fetch;
mod parse;

use episodes::EpisodeCollection;
use extract::LabelPatterns;
use fetch::{PageBody, PageFetcher, ShowType};
use parse::{most_recent_episode_label, parse_batch_page, parse_episode_page};

// Re-export error types
pub use extract::ExtractError;
pub use fetch::FetchError;
pub use parse::ParseError;

// Re-export the data model and collaborator seams
pub use download::{OpenFailure, download_all};
pub use episodes::{Episode, EpisodeNumber};
pub use fetch::{HttpGet, ReqwestHttp};

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use thiserror::Error;

/// How the caller names the show to scrape
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShowSelector {
    /// The numeric id the service assigns to the show
    Id(u32),
    /// The show's webpage URL, from which the id is discovered
    Url(String),
}

impl ShowSelector {
    /// Interprets free-form input as a show id or a show webpage URL
    ///
    /// Digits become [`ShowSelector::Id`], an `http(s)://` address becomes
    /// [`ShowSelector::Url`]; anything else is rejected before any network
    /// activity happens.
    pub fn parse(input: &str) -> Result<Self, HorribleSubsError> {
        let trimmed = input.trim();

        if let Ok(id) = trimmed.parse::<u32>() {
            return Ok(ShowSelector::Id(id));
        }
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            return Ok(ShowSelector::Url(trimmed.to_string()));
        }

        Err(HorribleSubsError::InvalidShow(input.to_string()))
    }
}

/// Progress event emitted during a scrape
///
/// These events allow library users to track progress and provide feedback
/// while pages are being fetched and parsed.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Looking up the show id on the show's webpage
    ResolvingShowId { url: String },

    /// The show id is known; scraping starts
    ShowIdResolved { show_id: u32 },

    /// Fetching the listing that names the most recent episode
    FetchingEpisodeCount,

    /// The most recent standalone episode number is known
    EpisodeCountFound { most_recent: u32 },

    /// The show has no standalone episodes yet; only batches can be
    /// collected and pagination is skipped
    NoStandaloneEpisodes,

    /// Fetching the batch listing
    FetchingBatches,

    /// Batch releases recorded
    BatchesFound { count: usize },

    /// Fetching one page of the single-episode listing
    FetchingPage { page: usize },

    /// Every available episode number has been collected; no further
    /// pages will be fetched
    AllEpisodesAcquired,

    /// The listing ran out of pages
    NoMorePages,

    /// Scrape complete
    Complete { entry_count: usize },
}

/// Top-level error type for scraper operations
#[derive(Debug, Error)]
pub enum HorribleSubsError {
    /// The show input was neither a numeric id nor a webpage URL
    #[error("Invalid show {0:?}: expected a numeric show id or a show page URL")]
    InvalidShow(String),

    /// The show's webpage did not embed a show id
    #[error("No show id found on {url}")]
    ShowIdNotFound { url: String },

    /// The most recent episode's numeral cannot bound the scrape
    #[error("Most recent episode number {number:?} is not an integer")]
    EpisodeCountNotNumeric { number: String },

    /// The unpaginated episode listing could not be parsed
    #[error("Episode listing parse error: {source}")]
    EpisodeListing { source: ParseError },

    /// The batch listing could not be parsed
    #[error("Batch listing parse error: {source}")]
    BatchListing { source: ParseError },

    /// One page of the episode listing could not be parsed
    #[error("Episode page {page} parse error: {source}")]
    EpisodePage { page: usize, source: ParseError },

    /// A page could not be fetched
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// A page-parsing worker terminated abnormally
    #[error("Worker parsing page {page} panicked")]
    WorkerPanicked { page: usize },
}

/// Scrapes the full episode collection of a show
///
/// Resolves the show id (fetching the show's webpage if a URL was given),
/// reads the most recent standalone episode number to learn how many
/// episodes exist, records the batch listing, then pages through the
/// single-episode listing until every known episode number is collected
/// or the listing runs out of pages. Fetched pages are parsed on worker
/// threads while the next page is fetched. Within the collection the
/// highest resolution of each episode wins and batch ranges suppress
/// single entries for the episodes they cover.
///
/// Progress events are emitted through the provided callback, allowing
/// library users to track progress, display status, or remain silent.
///
/// # Arguments
///
/// * `http` - The HTTP collaborator used for every fetch
/// * `show` - The show to scrape, by id or webpage URL
/// * `progress_callback` - Closure called with progress events (can be empty for silent operation)
///
/// # Returns
///
/// The collected entries in record order: batches first, then single
/// episodes in the order their pages were parsed.
///
/// # Examples
///
/// ```no_run
/// use horriblesubs_dl::{scrape_episodes, ProgressEvent, ReqwestHttp, ShowSelector};
///
/// // Scrape by numeric show id, printing page progress
/// let http = ReqwestHttp::new();
/// let episodes = scrape_episodes(&http, &ShowSelector::Id(731), |event| {
///     if let ProgressEvent::FetchingPage { page } = event {
///         println!("fetching page {}", page);
///     }
/// })
/// .unwrap();
///
/// // Silent operation, resolving the id from the show's webpage
/// let episodes = scrape_episodes(
///     &http,
///     &ShowSelector::Url("https://horriblesubs.info/shows/91-days".to_string()),
///     |_| {},
/// )
/// .unwrap();
/// ```
pub fn scrape_episodes<F>(
    http: &dyn HttpGet,
    show: &ShowSelector,
    mut progress_callback: F,
) -> Result<Vec<Episode>, HorribleSubsError>
where
    F: FnMut(ProgressEvent),
{
    let patterns = Arc::new(LabelPatterns::new());

    let show_id = match show {
        ShowSelector::Id(id) => *id,
        ShowSelector::Url(url) => {
            progress_callback(ProgressEvent::ResolvingShowId { url: url.clone() });
            let html = http.get(url)?;
            patterns
                .show_id(&html)
                .ok_or_else(|| HorribleSubsError::ShowIdNotFound { url: url.clone() })?
        }
    };
    progress_callback(ProgressEvent::ShowIdResolved { show_id });

    let fetcher = PageFetcher::new(http, show_id);

    // The most recent standalone episode bounds the scrape: episodes
    // 1 through that number are what pagination is expected to find.
    progress_callback(ProgressEvent::FetchingEpisodeCount);
    let listing = fetcher.fetch_listing(ShowType::Show)?;
    let most_recent = match most_recent_episode_label(&listing, &patterns)
        .map_err(|source| HorribleSubsError::EpisodeListing { source })?
    {
        Some(label) => {
            let number = label.number.parse::<u32>().map_err(|_| {
                HorribleSubsError::EpisodeCountNotNumeric {
                    number: label.number.clone(),
                }
            })?;
            progress_callback(ProgressEvent::EpisodeCountFound {
                most_recent: number,
            });
            Some(number)
        }
        None => {
            progress_callback(ProgressEvent::NoStandaloneEpisodes);
            None
        }
    };

    let mut collection = EpisodeCollection::new(most_recent);

    // Batch phase: recorded before pagination so batch ranges count
    // toward completion and suppress single entries they cover.
    progress_callback(ProgressEvent::FetchingBatches);
    let batch_listing = fetcher.fetch_listing(ShowType::Batch)?;
    let batches = parse_batch_page(&batch_listing, &patterns)
        .map_err(|source| HorribleSubsError::BatchListing { source })?;
    progress_callback(ProgressEvent::BatchesFound {
        count: batches.len(),
    });
    for batch in batches {
        collection.record_batch(batch.first, batch.last, batch.resolution, batch.magnet_url);
    }
    collection.refresh_completion();

    // Without a known episode count there is no way to tell when
    // pagination would be complete, so the run ends with the batches.
    let collection = if most_recent.is_some_and(|n| n > 0) {
        paginate(&fetcher, &patterns, collection, &mut progress_callback)?
    } else {
        collection
    };

    progress_callback(ProgressEvent::Complete {
        entry_count: collection.entries().len(),
    });
    Ok(collection.into_entries())
}

/// Pages through the single-episode listing, parsing each fetched page on
/// a worker thread while the next page is being fetched
///
/// Pages keep being fetched until the end-of-pages marker arrives or a
/// parse observes that every available episode has been collected. Every
/// dispatched worker is joined before the collection is final, so a page
/// still in flight when the stop condition appears is never lost.
fn paginate<F>(
    fetcher: &PageFetcher<'_>,
    patterns: &Arc<LabelPatterns>,
    collection: EpisodeCollection,
    progress_callback: &mut F,
) -> Result<EpisodeCollection, HorribleSubsError>
where
    F: FnMut(ProgressEvent),
{
    let shared = Arc::new(Mutex::new(collection));
    let mut handles: Vec<(usize, thread::JoinHandle<Result<(), ParseError>>)> = Vec::new();
    let mut run_error: Option<HorribleSubsError> = None;

    let mut page: usize = 0;
    progress_callback(ProgressEvent::FetchingPage { page });
    let mut body = fetcher.fetch_page(page);

    loop {
        let html = match body {
            Ok(PageBody::Html(html)) => html,
            Ok(PageBody::NoMorePages) => {
                progress_callback(ProgressEvent::NoMorePages);
                break;
            }
            Err(error) => {
                // Already-dispatched workers still get joined below
                run_error = Some(error.into());
                break;
            }
        };

        if lock(&shared).all_acquired() {
            progress_callback(ProgressEvent::AllEpisodesAcquired);
            break;
        }

        let worker_shared = Arc::clone(&shared);
        let worker_patterns = Arc::clone(patterns);
        let handle = thread::spawn(move || -> Result<(), ParseError> {
            let releases = parse_episode_page(&html, &worker_patterns)?;

            // One critical section per page: record everything, then
            // recompute completion, so two pages never interleave.
            let mut collection = lock(&worker_shared);
            for release in releases {
                collection.record_single(release.number, release.resolution, release.magnet_url);
            }
            collection.refresh_completion();
            Ok(())
        });
        handles.push((page, handle));

        page += 1;
        progress_callback(ProgressEvent::FetchingPage { page });
        body = fetcher.fetch_page(page);
    }

    // The collection is only final once every dispatched parse finished;
    // a worker dispatched before the stop condition may still be running.
    for (page, handle) in handles {
        match handle.join() {
            Ok(Ok(())) => {}
            Ok(Err(source)) => {
                if run_error.is_none() {
                    run_error = Some(HorribleSubsError::EpisodePage { page, source });
                }
            }
            Err(_) => {
                if run_error.is_none() {
                    run_error = Some(HorribleSubsError::WorkerPanicked { page });
                }
            }
        }
    }

    if let Some(error) = run_error {
        return Err(error);
    }

    let collection = match Arc::try_unwrap(shared) {
        Ok(mutex) => mutex.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner()),
        Err(shared) => lock(&shared).clone(),
    };
    Ok(collection)
}

/// Locks the shared collection, recovering from a poisoned lock
///
/// A worker that panicked leaves the collection intact apart from its own
/// page; the panic itself still surfaces when the worker is joined.
fn lock(shared: &Mutex<EpisodeCollection>) -> MutexGuard<'_, EpisodeCollection> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
