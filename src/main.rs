use clap::Parser;
use dialoguer::Confirm;
use horriblesubs_dl::{
    Episode, EpisodeNumber, ProgressEvent, ReqwestHttp, ShowSelector, download_all,
    scrape_episodes,
};
use std::process;

#[derive(Parser)]
#[command(name = "horriblesubs-dl")]
#[command(author, version)]
#[command(about = "Collect the magnet links of every episode of a HorribleSubs show")]
struct Cli {
    /// Numeric show id (e.g. 731) or show page URL
    show: String,

    /// Open every collected magnet link with the default torrent client
    #[arg(short, long)]
    download: bool,

    /// Print the collected episodes as JSON instead of a listing
    #[arg(long)]
    json: bool,

    /// Skip the confirmation prompt before opening magnet links
    #[arg(short, long)]
    yes: bool,
}

/// Handles progress events and prints formatted output to stdout
fn handle_progress_event(event: ProgressEvent) {
    match event {
        ProgressEvent::ResolvingShowId { url } => {
            println!("Looking up show id on {}...", url);
        }
        ProgressEvent::ShowIdResolved { show_id } => {
            println!("Scraping show {}", show_id);
        }
        ProgressEvent::FetchingEpisodeCount => {
            println!("\nChecking the most recent episode...");
        }
        ProgressEvent::EpisodeCountFound { most_recent } => {
            println!("Most recent episode: {}", most_recent);
        }
        ProgressEvent::NoStandaloneEpisodes => {
            println!("No standalone episodes yet; collecting batches only.");
        }
        ProgressEvent::FetchingBatches => {
            println!("\nFetching batch releases...");
        }
        ProgressEvent::BatchesFound { count } => {
            if count == 0 {
                println!("No batch releases found.");
            } else {
                println!("Found {} batch release(s)", count);
            }
        }
        ProgressEvent::FetchingPage { page } => {
            println!("Fetching episode page {}...", page);
        }
        ProgressEvent::AllEpisodesAcquired => {
            println!("All available episodes collected.");
        }
        ProgressEvent::NoMorePages => {
            println!("No more pages.");
        }
        ProgressEvent::Complete { entry_count } => {
            println!("\nScrape complete! Collected {} release(s).", entry_count);
        }
    }
}

fn format_episode_number(number: &EpisodeNumber) -> String {
    match number {
        EpisodeNumber::Single(n) => n.clone(),
        EpisodeNumber::Batch(range) => match (range.first(), range.last()) {
            (Some(first), Some(last)) => format!("{}-{}", first, last),
            _ => String::from("-"),
        },
    }
}

fn print_listing(episodes: &[Episode]) {
    if episodes.is_empty() {
        println!("\nNo episodes found.");
        return;
    }

    println!("\n=== Collected Episodes ===\n");
    for episode in episodes {
        println!(
            "  {:>7}  [{:>5}]  {}",
            format_episode_number(&episode.number),
            episode.resolution,
            episode.magnet_url
        );
    }
}

/// Asks before handing all magnet links to the torrent client
///
/// A prompt that cannot be shown (no interactive terminal) counts as a
/// refusal rather than a silent go-ahead.
fn confirm_download(count: usize) -> bool {
    Confirm::new()
        .with_prompt(format!(
            "Open {} magnet link(s) with your torrent client?",
            count
        ))
        .default(false)
        .interact()
        .unwrap_or(false)
}

fn main() {
    let cli = Cli::parse();

    let show = match ShowSelector::parse(&cli.show) {
        Ok(show) => show,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    // JSON output keeps stdout clean for piping
    let silent = cli.json;

    let http = ReqwestHttp::new();
    let result = scrape_episodes(&http, &show, |event| {
        if !silent {
            handle_progress_event(event);
        }
    });

    let mut episodes = match result {
        Ok(episodes) => episodes,
        Err(e) => {
            eprintln!("\nError during scrape: {}", e);
            process::exit(1);
        }
    };

    // Entries arrive in record order (batches first, then page order);
    // sort by the last covered episode for a readable listing
    episodes.sort_by_key(|episode| episode.number.last().unwrap_or(u32::MAX));

    if cli.json {
        match serde_json::to_string_pretty(&episodes) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error encoding episodes as JSON: {}", e);
                process::exit(1);
            }
        }
    } else {
        print_listing(&episodes);
    }

    if cli.download && !episodes.is_empty() {
        if !cli.yes && !confirm_download(episodes.len()) {
            println!("Not opening anything.");
            return;
        }

        let failures = download_all(&episodes);
        for failure in &failures {
            eprintln!(
                "Warning: could not open {}: {}",
                failure.magnet_url, failure.source
            );
        }
        if !silent {
            println!(
                "Opened {} magnet link(s).",
                episodes.len() - failures.len()
            );
        }
    }
}
