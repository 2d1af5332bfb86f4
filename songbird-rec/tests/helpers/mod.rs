//! Shared test helpers: scripted provider and converter doubles
#![allow(dead_code)]

use async_trait::async_trait;
use songbird_rec::enrich::{CatalogSearch, DeezerSearchResponse, DeezerTrack, IdConverter};
use songbird_rec::provider::{ArtistInfo, MetadataProvider, ProviderError, ProviderTrack};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

/// One scripted response
#[derive(Debug, Clone)]
pub enum Reply {
    Tracks(Vec<ProviderTrack>),
    Fail,
    Slow(Duration, Vec<ProviderTrack>),
}

impl Reply {
    async fn play(self, limit: usize) -> Result<Vec<ProviderTrack>, ProviderError> {
        match self {
            Reply::Tracks(tracks) => Ok(tracks.into_iter().take(limit).collect()),
            Reply::Fail => Err(ProviderError::NoResponse("scripted failure".to_string())),
            Reply::Slow(delay, tracks) => {
                tokio::time::sleep(delay).await;
                Ok(tracks.into_iter().take(limit).collect())
            }
        }
    }
}

/// Recorded provider call
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Search(String),
    Similar(String, String),
    Top(String, usize),
    Info(String),
}

/// Replies are consumed in order; the last one repeats
#[derive(Default)]
struct Script {
    replies: HashMap<String, VecDeque<Reply>>,
}

impl Script {
    fn push(&mut self, key: String, reply: Reply) {
        self.replies.entry(key).or_default().push_back(reply);
    }

    fn next(&mut self, key: &str) -> Reply {
        match self.replies.get_mut(key) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(Reply::Tracks(vec![])),
            Some(queue) => queue.front().cloned().unwrap_or(Reply::Tracks(vec![])),
            None => Reply::Tracks(vec![]),
        }
    }
}

/// In-memory [`MetadataProvider`] driven by per-key scripts
///
/// Unscripted calls return empty lists; every artist exists unless marked
/// unknown.
#[derive(Default)]
pub struct ScriptedProvider {
    search: Mutex<Script>,
    similar: Mutex<Script>,
    top: Mutex<Script>,
    unknown_artists: HashSet<String>,
    calls: Mutex<Vec<Call>>,
}

fn similar_key(artist: &str, track: &str) -> String {
    format!("{}|{}", artist.to_lowercase(), track.to_lowercase())
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(self, query: &str, tracks: Vec<ProviderTrack>) -> Self {
        self.search_reply(query, Reply::Tracks(tracks))
    }

    pub fn search_reply(self, query: &str, reply: Reply) -> Self {
        self.search.lock().unwrap().push(query.to_string(), reply);
        self
    }

    pub fn similar(self, artist: &str, track: &str, tracks: Vec<ProviderTrack>) -> Self {
        self.similar_reply(artist, track, Reply::Tracks(tracks))
    }

    pub fn similar_reply(self, artist: &str, track: &str, reply: Reply) -> Self {
        self.similar.lock().unwrap().push(similar_key(artist, track), reply);
        self
    }

    pub fn top(self, artist: &str, tracks: Vec<ProviderTrack>) -> Self {
        self.top_reply(artist, Reply::Tracks(tracks))
    }

    pub fn top_reply(self, artist: &str, reply: Reply) -> Self {
        self.top.lock().unwrap().push(artist.to_lowercase(), reply);
        self
    }

    pub fn unknown_artist(mut self, artist: &str) -> Self {
        self.unknown_artists.insert(artist.to_lowercase());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl MetadataProvider for ScriptedProvider {
    async fn search_tracks(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ProviderTrack>, ProviderError> {
        self.record(Call::Search(query.to_string()));
        let reply = self.search.lock().unwrap().next(query);
        reply.play(limit).await
    }

    async fn get_similar_tracks(
        &self,
        artist: &str,
        track: &str,
        limit: usize,
    ) -> Result<Vec<ProviderTrack>, ProviderError> {
        self.record(Call::Similar(artist.to_string(), track.to_string()));
        let reply = self.similar.lock().unwrap().next(&similar_key(artist, track));
        reply.play(limit).await
    }

    async fn get_artist_top_tracks(
        &self,
        artist: &str,
        limit: usize,
        _page: usize,
    ) -> Result<Vec<ProviderTrack>, ProviderError> {
        self.record(Call::Top(artist.to_string(), limit));
        let reply = self.top.lock().unwrap().next(&artist.to_lowercase());
        reply.play(limit).await
    }

    async fn get_artist_info(&self, artist: &str) -> Result<Option<ArtistInfo>, ProviderError> {
        self.record(Call::Info(artist.to_string()));
        if self.unknown_artists.contains(&artist.to_lowercase()) {
            return Ok(None);
        }
        Ok(Some(ArtistInfo {
            name: artist.to_string(),
            mbid: None,
            url: String::new(),
        }))
    }
}

/// [`IdConverter`] returning IDs from a fixed table
#[derive(Default)]
pub struct TableConverter {
    ids: HashMap<String, String>,
    failing: HashSet<String>,
    unreachable: bool,
}

impl TableConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, name: &str, id: &str) -> Self {
        self.ids.insert(name.to_lowercase(), id.to_string());
        self
    }

    pub fn failing(mut self, name: &str) -> Self {
        self.failing.insert(name.to_lowercase());
        self
    }

    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl IdConverter for TableConverter {
    async fn find_id(
        &self,
        name: &str,
        _artist: Option<&str>,
    ) -> Result<Option<String>, ProviderError> {
        if self.failing.contains(&name.to_lowercase()) {
            return Err(ProviderError::RateLimited);
        }
        Ok(self.ids.get(&name.to_lowercase()).cloned())
    }

    async fn convert_batch(
        &self,
        items: &[songbird_rec::enrich::TrackRef],
    ) -> Result<Vec<Option<String>>, ProviderError> {
        if self.unreachable {
            return Err(ProviderError::NoResponse("converter offline".to_string()));
        }
        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            ids.push(
                self.find_id(&item.name, item.artist.as_deref())
                    .await
                    .unwrap_or(None),
            );
        }
        Ok(ids)
    }
}

/// Titles containing the query, in table order
#[async_trait]
impl CatalogSearch for TableConverter {
    async fn search_tracks(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<DeezerSearchResponse, ProviderError> {
        if self.unreachable {
            return Err(ProviderError::NoResponse("converter offline".to_string()));
        }
        let needle = query.to_lowercase();
        let mut hits: Vec<(&String, &String)> = self
            .ids
            .iter()
            .filter(|(title, _)| title.contains(&needle))
            .collect();
        hits.sort();

        let data: Vec<DeezerTrack> = hits
            .into_iter()
            .take(limit)
            .map(|(title, id)| DeezerTrack {
                id: id.parse().unwrap_or_default(),
                title: title.clone(),
                artist: None,
                link: None,
            })
            .collect();

        Ok(DeezerSearchResponse {
            total: data.len() as u64,
            data,
        })
    }
}

/// Provider track shorthand
pub fn track(name: &str, artist: &str) -> ProviderTrack {
    ProviderTrack::new(name, artist).with_url(format!(
        "https://www.last.fm/music/{}/_/{}",
        artist.replace(' ', "+"),
        name.replace(' ', "+")
    ))
}

/// Provider track with a similarity value
pub fn scored(name: &str, artist: &str, score: f64) -> ProviderTrack {
    track(name, artist).with_match(score)
}
