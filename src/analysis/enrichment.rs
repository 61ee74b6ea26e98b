//! Supplementary content keyed by title and artist: chords, tabs and
//! backing track links.

use anyhow::Result;
use async_trait::async_trait;
use rand::seq::SliceRandom;

use super::models::{BackingTrackLinks, TabsAndChords};

const CHORD_POOL: [&str; 6] = ["C", "G", "Am", "F", "Dm", "Em"];
const CHORDS_PER_SONG: usize = 4;
const YOUTUBE_SEARCH_URL: &str = "https://www.youtube.com/results?search_query=";

#[async_trait]
pub trait EnrichmentProvider: Send + Sync {
    async fn fetch_tabs_and_chords(&self, title: &str, artist: &str) -> Result<TabsAndChords>;

    async fn fetch_backing_track(&self, title: &str, artist: &str) -> Result<BackingTrackLinks>;
}

/// Generates chord progressions and search links without calling any
/// third-party service.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockEnrichmentProvider;

#[async_trait]
impl EnrichmentProvider for MockEnrichmentProvider {
    async fn fetch_tabs_and_chords(&self, title: &str, artist: &str) -> Result<TabsAndChords> {
        let mut pool = CHORD_POOL.to_vec();
        pool.shuffle(&mut rand::rng());
        let chords: Vec<String> = pool
            .into_iter()
            .take(CHORDS_PER_SONG)
            .map(String::from)
            .collect();

        let tab_document = render_tab_document(title, artist, &chords);
        Ok(TabsAndChords {
            chords,
            tab_document,
        })
    }

    async fn fetch_backing_track(&self, title: &str, artist: &str) -> Result<BackingTrackLinks> {
        Ok(BackingTrackLinks {
            backing_track_url: Some(youtube_search_url(&format!(
                "{} {} backing track",
                title, artist
            ))),
            youtube_url: Some(youtube_search_url(&format!("{} {}", title, artist))),
        })
    }
}

/// Verse plays the progression as-is, chorus plays it backwards.
pub fn render_tab_document(title: &str, artist: &str, chords: &[String]) -> String {
    let verse = chords.join(" - ");
    let chorus = chords
        .iter()
        .rev()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" - ");
    format!(
        "Chords for {} by {}\n\nVerse:\n{}\n\nChorus:\n{}",
        title, artist, verse, chorus
    )
}

pub fn youtube_search_url(query: &str) -> String {
    format!("{}{}", YOUTUBE_SEARCH_URL, urlencoding::encode(query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[tokio::test]
    async fn picks_four_distinct_chords_from_pool() {
        let provider = MockEnrichmentProvider;

        for _ in 0..20 {
            let tabs = provider
                .fetch_tabs_and_chords("Yesterday", "The Beatles")
                .await
                .unwrap();

            assert_eq!(tabs.chords.len(), 4);
            let distinct: HashSet<_> = tabs.chords.iter().collect();
            assert_eq!(distinct.len(), 4);
            assert!(tabs.chords.iter().all(|c| CHORD_POOL.contains(&c.as_str())));
            assert!(tabs
                .tab_document
                .starts_with("Chords for Yesterday by The Beatles"));
        }
    }

    #[test]
    fn tab_document_reverses_chorus() {
        let chords: Vec<String> = ["C", "G", "Am", "F"].iter().map(|s| s.to_string()).collect();
        assert_eq!(
            render_tab_document("Song", "Band", &chords),
            "Chords for Song by Band\n\nVerse:\nC - G - Am - F\n\nChorus:\nF - Am - G - C"
        );
    }

    #[tokio::test]
    async fn backing_track_links_are_encoded_searches() {
        let links = MockEnrichmentProvider
            .fetch_backing_track("Let It Be", "The Beatles & Co")
            .await
            .unwrap();

        assert_eq!(
            links.backing_track_url.as_deref(),
            Some("https://www.youtube.com/results?search_query=Let%20It%20Be%20The%20Beatles%20%26%20Co%20backing%20track")
        );
        assert_eq!(
            links.youtube_url.as_deref(),
            Some("https://www.youtube.com/results?search_query=Let%20It%20Be%20The%20Beatles%20%26%20Co")
        );
    }
}
