//! Episode entries and the collection built up during a scrape
//!
//! The collection is the single shared aggregate of a scrape run: the
//! entries found so far, the set of episode numbers they cover, and the
//! completion flag derived from comparing that set against the episodes
//! known to exist. Parsers feed it; it owns every dedup decision. It has
//! no interior locking: during concurrent pagination the coordinator
//! wraps it in a mutex and records each page as one critical section.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The episode number(s) covered by one release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EpisodeNumber {
    /// One standalone episode. The numeral is kept as text because
    /// special editions use markers like "10.5" that are not integers.
    Single(String),
    /// A batch covering an inclusive range, expanded in ascending order
    Batch(Vec<u32>),
}

impl EpisodeNumber {
    /// The last episode number covered, for ordering listings
    ///
    /// Returns `None` for a single release whose numeral is not an
    /// integer (and for an empty batch); such entries have no natural
    /// position in the episode sequence.
    pub fn last(&self) -> Option<u32> {
        match self {
            EpisodeNumber::Single(number) => number.parse().ok(),
            EpisodeNumber::Batch(range) => range.last().copied(),
        }
    }
}

/// One deliverable release: a single episode or a batch, at one resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    /// The episode number or expanded batch range
    pub number: EpisodeNumber,
    /// Video resolution label, e.g. "1080p"; used only for dedup priority
    pub resolution: String,
    /// Opaque magnet URI; never validated
    pub magnet_url: String,
}

/// The shared aggregate of one scrape run
#[derive(Debug, Clone)]
pub struct EpisodeCollection {
    /// Entries in the order they were recorded
    entries: Vec<Episode>,
    /// Every integer episode number covered so far, batch ranges expanded
    collected_numbers: HashSet<u32>,
    /// Raw numeral text of every single release recorded, so non-integer
    /// markers dedup too
    collected_markers: HashSet<String>,
    /// The target set {1..N}, N being the most recent standalone episode;
    /// `None` when the show has no standalone episodes yet
    available: Option<HashSet<u32>>,
    /// Set once the collected numbers equal the available set; never reset
    all_acquired: bool,
}

impl EpisodeCollection {
    /// Creates an empty collection targeting episodes 1 through
    /// `most_recent`, or with an unknown target when `None`
    pub fn new(most_recent: Option<u32>) -> Self {
        Self {
            entries: Vec::new(),
            collected_numbers: HashSet::new(),
            collected_markers: HashSet::new(),
            available: most_recent.map(|last| (1..=last).collect()),
            all_acquired: false,
        }
    }

    /// Records a single-episode release unless its number is already covered
    ///
    /// A number counts as covered when the same numeral text was recorded
    /// before, or when an integer numeral falls inside an already-recorded
    /// batch range. First writer wins: a later entry for the same number
    /// (a lower resolution, given reverse-document-order traversal) is
    /// discarded, never replacing the first.
    pub fn record_single(&mut self, number: String, resolution: String, magnet_url: String) {
        if self.collected_markers.contains(&number) {
            return;
        }
        let numeric: Option<u32> = number.parse().ok();
        if let Some(n) = numeric {
            if self.collected_numbers.contains(&n) {
                return;
            }
            self.collected_numbers.insert(n);
        }
        self.collected_markers.insert(number.clone());

        self.entries.push(Episode {
            number: EpisodeNumber::Single(number),
            resolution,
            magnet_url,
        });
    }

    /// Records a batch release unless an identical range is already present
    ///
    /// Only an exactly matching range dedups; overlapping ranges are
    /// distinct releases and are all kept. The covered numbers join the
    /// collected set so they count toward completion and suppress later
    /// single entries for the same episodes.
    pub fn record_batch(&mut self, first: u32, last: u32, resolution: String, magnet_url: String) {
        let range: Vec<u32> = (first..=last).collect();

        let duplicate = self.entries.iter().any(
            |entry| matches!(&entry.number, EpisodeNumber::Batch(existing) if *existing == range),
        );
        if duplicate {
            return;
        }

        self.collected_numbers.extend(range.iter().copied());

        self.entries.push(Episode {
            number: EpisodeNumber::Batch(range),
            resolution,
            magnet_url,
        });
    }

    /// Re-derives the completion flag after a page has been recorded
    ///
    /// Completion requires set equality with the known target; when the
    /// target is unknown the flag can never be raised and pagination ends
    /// only on the end-of-pages marker.
    pub fn refresh_completion(&mut self) {
        if let Some(available) = &self.available {
            if *available == self.collected_numbers {
                self.all_acquired = true;
            }
        }
    }

    /// Whether every available episode number has been collected
    pub fn all_acquired(&self) -> bool {
        self.all_acquired
    }

    /// The entries recorded so far, in record order
    pub fn entries(&self) -> &[Episode] {
        &self.entries
    }

    /// Consumes the collection, yielding the entries in record order
    pub fn into_entries(self) -> Vec<Episode> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(collection: &mut EpisodeCollection, number: &str, resolution: &str) {
        collection.record_single(
            number.to_string(),
            resolution.to_string(),
            format!("magnet:?xt={}-{}", number, resolution),
        );
    }

    #[test]
    fn test_first_recorded_resolution_wins() {
        let mut collection = EpisodeCollection::new(None);
        single(&mut collection, "5", "1080p");
        single(&mut collection, "5", "480p");

        assert_eq!(collection.entries().len(), 1);
        assert_eq!(collection.entries()[0].resolution, "1080p");
    }

    #[test]
    fn test_batch_coverage_suppresses_single_entries() {
        let mut collection = EpisodeCollection::new(None);
        collection.record_batch(1, 13, "1080p".to_string(), "magnet:?xt=batch".to_string());
        single(&mut collection, "5", "1080p");

        // Episode 5 is already covered by the batch range
        assert_eq!(collection.entries().len(), 1);
    }

    #[test]
    fn test_non_integer_marker_dedups_by_text() {
        let mut collection = EpisodeCollection::new(None);
        single(&mut collection, "10.5", "1080p");
        single(&mut collection, "10.5", "720p");

        assert_eq!(collection.entries().len(), 1);
        assert_eq!(collection.entries()[0].resolution, "1080p");
    }

    #[test]
    fn test_identical_batch_range_dedups() {
        let mut collection = EpisodeCollection::new(None);
        collection.record_batch(1, 13, "1080p".to_string(), "magnet:?xt=hd".to_string());
        collection.record_batch(1, 13, "480p".to_string(), "magnet:?xt=sd".to_string());

        assert_eq!(collection.entries().len(), 1);
        assert_eq!(collection.entries()[0].resolution, "1080p");
    }

    #[test]
    fn test_overlapping_batch_ranges_are_distinct() {
        let mut collection = EpisodeCollection::new(None);
        collection.record_batch(1, 13, "1080p".to_string(), "magnet:?xt=a".to_string());
        collection.record_batch(1, 12, "1080p".to_string(), "magnet:?xt=b".to_string());

        assert_eq!(collection.entries().len(), 2);
    }

    #[test]
    fn test_completion_requires_exact_set_equality() {
        let mut collection = EpisodeCollection::new(Some(2));

        single(&mut collection, "1", "1080p");
        collection.refresh_completion();
        assert!(!collection.all_acquired());

        single(&mut collection, "2", "1080p");
        collection.refresh_completion();
        assert!(collection.all_acquired());
    }

    #[test]
    fn test_completion_flag_never_resets() {
        let mut collection = EpisodeCollection::new(Some(1));
        single(&mut collection, "1", "1080p");
        collection.refresh_completion();
        assert!(collection.all_acquired());

        // Further recording and refreshing leaves the flag raised
        single(&mut collection, "3", "1080p");
        collection.refresh_completion();
        assert!(collection.all_acquired());
    }

    #[test]
    fn test_unknown_target_never_completes() {
        let mut collection = EpisodeCollection::new(None);
        for n in 1..=20 {
            single(&mut collection, &n.to_string(), "1080p");
        }
        collection.refresh_completion();

        assert!(!collection.all_acquired());
    }

    #[test]
    fn test_superset_does_not_complete() {
        // A batch running past the most recent standalone episode leaves
        // the collected set unequal to the available set
        let mut collection = EpisodeCollection::new(Some(12));
        collection.record_batch(1, 13, "1080p".to_string(), "magnet:?xt=batch".to_string());
        collection.refresh_completion();

        assert!(!collection.all_acquired());
    }

    #[test]
    fn test_disjoint_pages_merge_the_same_from_threads() {
        use std::sync::{Arc, Mutex};
        use std::thread;

        let pages: Vec<Vec<u32>> = vec![(1..=4).collect(), (5..=8).collect(), (9..=12).collect()];

        let mut sequential = EpisodeCollection::new(Some(12));
        for page in &pages {
            for n in page {
                single(&mut sequential, &n.to_string(), "1080p");
            }
            sequential.refresh_completion();
        }

        let shared = Arc::new(Mutex::new(EpisodeCollection::new(Some(12))));
        let handles: Vec<_> = pages
            .into_iter()
            .map(|page| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || {
                    let mut collection = shared.lock().unwrap();
                    for n in page {
                        collection.record_single(
                            n.to_string(),
                            "1080p".to_string(),
                            format!("magnet:?xt={}", n),
                        );
                    }
                    collection.refresh_completion();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let concurrent = shared.lock().unwrap();
        assert!(sequential.all_acquired());
        assert!(concurrent.all_acquired());
        assert_eq!(concurrent.entries().len(), sequential.entries().len());

        let numbers = |collection: &EpisodeCollection| -> HashSet<String> {
            collection
                .entries()
                .iter()
                .filter_map(|entry| match &entry.number {
                    EpisodeNumber::Single(n) => Some(n.clone()),
                    EpisodeNumber::Batch(_) => None,
                })
                .collect()
        };
        assert_eq!(numbers(&concurrent), numbers(&sequential));
    }

    #[test]
    fn test_last_number_for_ordering() {
        assert_eq!(EpisodeNumber::Single("495".to_string()).last(), Some(495));
        assert_eq!(EpisodeNumber::Single("SP".to_string()).last(), None);
        assert_eq!(EpisodeNumber::Batch(vec![80, 81, 82]).last(), Some(82));
    }

    #[test]
    fn test_episode_number_serializes_untagged() {
        let single = Episode {
            number: EpisodeNumber::Single("12".to_string()),
            resolution: "1080p".to_string(),
            magnet_url: "magnet:?xt=s".to_string(),
        };
        let batch = Episode {
            number: EpisodeNumber::Batch(vec![1, 2, 3]),
            resolution: "720p".to_string(),
            magnet_url: "magnet:?xt=b".to_string(),
        };

        assert_eq!(
            serde_json::to_string(&single.number).unwrap(),
            "\"12\""
        );
        assert_eq!(serde_json::to_string(&batch.number).unwrap(), "[1,2,3]");
    }
}
