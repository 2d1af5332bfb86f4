//! Aggregation engine integration tests
//!
//! Drives [`Aggregator`] against a scripted in-memory provider so every
//! fallback path can be exercised deterministically.

mod helpers;

use helpers::{scored, track, Call, Reply, ScriptedProvider, TableConverter};
use songbird_rec::recommend::{
    Aggregator, AggregatorOptions, InputSong, Mode, RecommendError, RecommendRequest, Tier,
};
use std::sync::Arc;
use std::time::Duration;

fn weeknd() -> InputSong {
    InputSong::new("Blinding Lights").with_artist("The Weeknd")
}

const WEEKND_QUERY: &str = "Blinding Lights The Weeknd";

fn aggregator(provider: &Arc<ScriptedProvider>) -> Aggregator {
    Aggregator::new(provider.clone())
}

fn scores(result: &songbird_rec::recommend::RecommendationResult) -> Vec<f64> {
    result.recommendations.iter().map(|r| r.score()).collect()
}

fn names(result: &songbird_rec::recommend::RecommendationResult) -> Vec<&str> {
    result.recommendations.iter().map(|r| r.name.as_str()).collect()
}

// ---------------------------------------------------------------------------
// Reference scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_strict_mode_keeps_high_similarity_only() {
    // Given: one seed with three similar tracks scored 0.9, 0.8, 0.4
    let provider = Arc::new(
        ScriptedProvider::new()
            .search(WEEKND_QUERY, vec![track("Blinding Lights", "The Weeknd")])
            .similar(
                "The Weeknd",
                "Blinding Lights",
                vec![
                    scored("Save Your Tears", "The Weeknd", 0.9),
                    scored("Take On Me", "a-ha", 0.8),
                    scored("Physical", "Dua Lipa", 0.4),
                ],
            ),
    );

    // When: strict mode with limit 5
    let request = RecommendRequest::new(vec![weeknd()])
        .with_mode(Mode::Strict)
        .with_limit(5);
    let result = aggregator(&provider).recommend(&request).await.unwrap();

    // Then: only the two tracks at or above 0.5 survive
    assert_eq!(scores(&result), vec![0.9, 0.8]);
    assert_eq!(names(&result), vec!["Save Your Tears", "Take On Me"]);
    assert_eq!(result.found_songs, 1);
    assert_eq!(result.input_songs, 1);
    assert_eq!(result.mode, Mode::Strict);
    assert!(result.conversion.is_none());
}

#[tokio::test]
async fn test_empty_similarity_falls_back_to_artist_top_tracks() {
    // Given: no similar tracks, five artist top tracks
    let provider = Arc::new(
        ScriptedProvider::new()
            .search(WEEKND_QUERY, vec![track("Blinding Lights", "The Weeknd")])
            .top(
                "The Weeknd",
                vec![
                    track("Starboy", "The Weeknd"),
                    track("Save Your Tears", "The Weeknd"),
                    track("The Hills", "The Weeknd"),
                    track("Die For You", "The Weeknd"),
                    track("Earned It", "The Weeknd"),
                ],
            ),
    );

    // When: default mode
    let request = RecommendRequest::new(vec![weeknd()]);
    let result = aggregator(&provider).recommend(&request).await.unwrap();

    // Then: artist-top scores descend from 0.5 by 0.01 per rank
    assert_eq!(scores(&result), vec![0.5, 0.49, 0.48, 0.47, 0.46]);
    assert!(result
        .recommendations
        .iter()
        .all(|r| matches!(r.tier, Tier::ArtistTop(_))));
    assert_eq!(result.found_songs, 1);
    assert_eq!(result.mode, Mode::Normal);
}

#[tokio::test]
async fn test_exhausted_batch_reports_no_recommendations() {
    // Given: two songs no search resolves, with artists whose top tracks are empty
    let provider = Arc::new(ScriptedProvider::new());
    let request = RecommendRequest::new(vec![
        InputSong::new("Lost Track").with_artist("Ghost Band"),
        InputSong::new("Missing Song").with_artist("Phantom"),
    ]);

    // When: aggregating
    let err = aggregator(&provider).recommend(&request).await.unwrap_err();

    // Then: exhaustion error, and the last-resort pass was attempted for both artists
    assert!(matches!(err, RecommendError::NoRecommendations));
    let calls = provider.calls();
    assert!(calls.contains(&Call::Info("Ghost Band".to_string())));
    assert!(calls.contains(&Call::Info("Phantom".to_string())));
}

#[tokio::test]
async fn test_empty_batch_is_rejected_without_provider_calls() {
    let provider = Arc::new(ScriptedProvider::new());

    let err = aggregator(&provider)
        .recommend(&RecommendRequest::new(vec![]))
        .await
        .unwrap_err();

    assert!(matches!(err, RecommendError::Validation(_)));
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn test_unsearchable_batch_is_rejected_without_provider_calls() {
    let provider = Arc::new(ScriptedProvider::new());
    let request = RecommendRequest::new(vec![InputSong::new("  "), InputSong::default()]);

    let err = aggregator(&provider).recommend(&request).await.unwrap_err();

    assert!(matches!(err, RecommendError::Validation(_)));
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn test_recommend_runs_on_spawned_task() {
    // Handlers need the aggregation future to be Send + 'static once owned
    let provider = Arc::new(
        ScriptedProvider::new()
            .search(WEEKND_QUERY, vec![track("Blinding Lights", "The Weeknd")])
            .similar(
                "The Weeknd",
                "Blinding Lights",
                vec![scored("Save Your Tears", "The Weeknd", 0.9)],
            ),
    );
    let engine = Arc::new(aggregator(&provider));
    let request = RecommendRequest::new(vec![weeknd(), InputSong::new("Quiet Song")])
        .with_mode(Mode::Diverse);

    let handle = tokio::spawn(async move { engine.recommend(&request).await });
    let result = handle.await.unwrap().unwrap();

    assert_eq!(names(&result), vec!["Save Your Tears"]);
    assert_eq!(result.input_songs, 2);
}

// ---------------------------------------------------------------------------
// Deduplication and ordering
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_first_write_wins_across_songs_and_tiers() {
    // Given: song one proposes "Shared" with a weak similarity, song two
    // proposes the same track (different case) as a strong artist-top hit
    let provider = Arc::new(
        ScriptedProvider::new()
            .search("Song One Alpha", vec![track("Song One", "Alpha")])
            .similar("Alpha", "Song One", vec![scored("Shared", "Gamma", 0.1)])
            .search("Song Two Beta", vec![track("Song Two", "Beta")])
            .top("Beta", vec![track("SHARED", "gamma"), track("Beta Hit", "Beta")]),
    );
    let request = RecommendRequest::new(vec![
        InputSong::new("Song One").with_artist("Alpha"),
        InputSong::new("Song Two").with_artist("Beta"),
    ])
    .with_mode(Mode::Diverse);

    // When
    let result = aggregator(&provider).recommend(&request).await.unwrap();

    // Then: the first entry is kept untouched
    let shared: Vec<_> = result
        .recommendations
        .iter()
        .filter(|r| r.name.eq_ignore_ascii_case("shared"))
        .collect();
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0].name, "Shared");
    assert_eq!(shared[0].tier, Tier::Similarity(0.1));
    assert_eq!(result.found_songs, 2);
}

#[tokio::test]
async fn test_merge_order_follows_input_order_under_concurrency() {
    // Given: the first song's search is slow, the second is instant, and
    // both propose the same candidate with different scores
    let provider = Arc::new(
        ScriptedProvider::new()
            .search_reply(
                "Slow Song Alpha",
                Reply::Slow(Duration::from_millis(80), vec![track("Slow Song", "Alpha")]),
            )
            .similar("Alpha", "Slow Song", vec![scored("Shared", "Gamma", 0.2)])
            .search("Fast Song Beta", vec![track("Fast Song", "Beta")])
            .similar("Beta", "Fast Song", vec![scored("Shared", "Gamma", 0.8)]),
    );
    let request = RecommendRequest::new(vec![
        InputSong::new("Slow Song").with_artist("Alpha"),
        InputSong::new("Fast Song").with_artist("Beta"),
    ])
    .with_mode(Mode::Diverse);

    // When: seeds resolve in parallel
    let result = Aggregator::new(provider.clone())
        .with_options(AggregatorOptions {
            call_timeout: Duration::from_secs(5),
            seed_concurrency: 2,
        })
        .recommend(&request)
        .await
        .unwrap();

    // Then: the earlier input song still wins the identity
    assert_eq!(result.recommendations.len(), 1);
    assert_eq!(result.recommendations[0].score(), 0.2);
}

#[tokio::test]
async fn test_ranking_is_score_descending() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .search(WEEKND_QUERY, vec![track("Blinding Lights", "The Weeknd")])
            .similar(
                "The Weeknd",
                "Blinding Lights",
                vec![
                    scored("Low", "A", 0.35),
                    scored("High", "B", 0.95),
                    scored("Mid", "C", 62.0),
                ],
            ),
    );

    let request = RecommendRequest::new(vec![weeknd()]).with_mode(Mode::Diverse);
    let result = aggregator(&provider).recommend(&request).await.unwrap();

    // Percent-scale values are normalized before ranking
    assert_eq!(names(&result), vec!["High", "Mid", "Low"]);
    assert_eq!(scores(&result), vec![0.95, 0.62, 0.35]);
}

// ---------------------------------------------------------------------------
// Fallback gates
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_artist_top_tracks_exclude_the_seed() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .search(WEEKND_QUERY, vec![track("Blinding Lights", "The Weeknd")])
            .top(
                "The Weeknd",
                vec![
                    track("blinding lights", "the weeknd"),
                    track("Starboy", "The Weeknd"),
                    track("The Hills", "The Weeknd"),
                ],
            ),
    );

    let request = RecommendRequest::new(vec![weeknd()]);
    let result = aggregator(&provider).recommend(&request).await.unwrap();

    // Ranks keep their position in the provider list
    assert_eq!(names(&result), vec!["Starboy", "The Hills"]);
    assert_eq!(scores(&result), vec![0.49, 0.48]);
}

#[tokio::test]
async fn test_search_fallback_runs_when_map_is_small() {
    // Given: one similar track and two leftover search hits
    let provider = Arc::new(
        ScriptedProvider::new()
            .search(
                WEEKND_QUERY,
                vec![
                    track("Blinding Lights", "The Weeknd"),
                    track("Blinding Lights (Remix)", "The Weeknd"),
                    track("Blinding Lights", "Cover Band"),
                ],
            )
            .similar(
                "The Weeknd",
                "Blinding Lights",
                vec![scored("Save Your Tears", "The Weeknd", 0.9)],
            ),
    );

    let request = RecommendRequest::new(vec![weeknd()]).with_mode(Mode::Diverse);
    let result = aggregator(&provider).recommend(&request).await.unwrap();

    // Then: similarity first, then search hits at 0.40 and 0.39
    assert_eq!(
        names(&result),
        vec!["Save Your Tears", "Blinding Lights (Remix)", "Blinding Lights"]
    );
    assert_eq!(scores(&result), vec![0.9, 0.4, 0.39]);
    assert!(matches!(result.recommendations[2].tier, Tier::SearchFallback(1)));

    // Similarity yielded something, so artist top tracks were never requested
    assert!(!provider
        .calls()
        .iter()
        .any(|c| matches!(c, Call::Top(..))));
}

#[tokio::test]
async fn test_search_fallback_skipped_once_map_is_full_enough() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .search(
                WEEKND_QUERY,
                vec![
                    track("Blinding Lights", "The Weeknd"),
                    track("Blinding Lights (Remix)", "The Weeknd"),
                ],
            )
            .similar(
                "The Weeknd",
                "Blinding Lights",
                vec![
                    scored("One", "A", 0.9),
                    scored("Two", "B", 0.8),
                    scored("Three", "C", 0.7),
                ],
            ),
    );

    let request = RecommendRequest::new(vec![weeknd()]).with_mode(Mode::Diverse);
    let result = aggregator(&provider).recommend(&request).await.unwrap();

    assert_eq!(names(&result), vec!["One", "Two", "Three"]);
}

#[tokio::test]
async fn test_artist_top_gate_needs_an_artist() {
    // Seed has no artist; similarity is empty
    let provider = Arc::new(
        ScriptedProvider::new().search("Untitled", vec![track("Untitled", "")]),
    );

    let request = RecommendRequest::new(vec![InputSong::new("Untitled")]);
    let err = aggregator(&provider).recommend(&request).await.unwrap_err();

    assert!(matches!(err, RecommendError::NoRecommendations));
    assert!(!provider
        .calls()
        .iter()
        .any(|c| matches!(c, Call::Top(..))));
}

// ---------------------------------------------------------------------------
// Failure tolerance
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_failed_similarity_degrades_to_artist_top() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .search(WEEKND_QUERY, vec![track("Blinding Lights", "The Weeknd")])
            .similar_reply("The Weeknd", "Blinding Lights", Reply::Fail)
            .top("The Weeknd", vec![track("Starboy", "The Weeknd")]),
    );

    let request = RecommendRequest::new(vec![weeknd()]);
    let result = aggregator(&provider).recommend(&request).await.unwrap();

    assert_eq!(names(&result), vec!["Starboy"]);
    assert_eq!(result.recommendations[0].tier, Tier::ArtistTop(0));
}

#[tokio::test]
async fn test_slow_provider_call_hits_deadline_and_degrades() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .search(WEEKND_QUERY, vec![track("Blinding Lights", "The Weeknd")])
            .similar_reply(
                "The Weeknd",
                "Blinding Lights",
                Reply::Slow(
                    Duration::from_millis(500),
                    vec![scored("Too Late", "Nobody", 0.99)],
                ),
            )
            .top("The Weeknd", vec![track("Starboy", "The Weeknd")]),
    );

    let result = Aggregator::new(provider.clone())
        .with_options(AggregatorOptions {
            call_timeout: Duration::from_millis(30),
            seed_concurrency: 1,
        })
        .recommend(&RecommendRequest::new(vec![weeknd()]))
        .await
        .unwrap();

    assert_eq!(names(&result), vec!["Starboy"]);
}

#[tokio::test]
async fn test_failed_seed_search_uses_artist_fallback() {
    // Search fails outright; the song still has an artist
    let provider = Arc::new(
        ScriptedProvider::new()
            .search_reply(WEEKND_QUERY, Reply::Fail)
            .top(
                "The Weeknd",
                vec![track("Starboy", "The Weeknd"), track("After Hours", "The Weeknd")],
            ),
    );

    let request = RecommendRequest::new(vec![weeknd()]);
    let result = aggregator(&provider).recommend(&request).await.unwrap();

    assert_eq!(scores(&result), vec![0.3, 0.29]);
    assert!(matches!(result.recommendations[0].tier, Tier::ArtistFallback(0)));
    assert_eq!(result.found_songs, 0);
}

#[tokio::test]
async fn test_last_resort_runs_only_when_everything_else_is_empty() {
    // Strategy four fails for the artist; the global pass then succeeds
    let top_tracks: Vec<_> = (1..=7)
        .map(|i| track(&format!("Deep Cut {}", i), "Ghost Band"))
        .collect();
    let provider = Arc::new(
        ScriptedProvider::new()
            .top_reply("Ghost Band", Reply::Fail)
            .top_reply("Ghost Band", Reply::Tracks(top_tracks)),
    );

    let request = RecommendRequest::new(vec![InputSong::new("Lost Track").with_artist("Ghost Band")])
        .with_mode(Mode::Diverse);
    let result = aggregator(&provider).recommend(&request).await.unwrap();

    // Five of the ten requested tracks are kept, scored from 0.20 down
    assert_eq!(scores(&result), vec![0.2, 0.19, 0.18, 0.17, 0.16]);
    assert!(result
        .recommendations
        .iter()
        .all(|r| matches!(r.tier, Tier::LastResort(_))));
    // The last-resort pass does not count toward found songs
    assert_eq!(result.found_songs, 0);

    let calls = provider.calls();
    assert!(calls.contains(&Call::Info("Ghost Band".to_string())));
    assert!(calls.contains(&Call::Top("Ghost Band".to_string(), 10)));
}

#[tokio::test]
async fn test_last_resort_skips_unknown_artist() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .unknown_artist("Ghost Band")
            .top_reply("Ghost Band", Reply::Fail)
            .top_reply("Ghost Band", Reply::Tracks(vec![track("Never", "Ghost Band")])),
    );

    let request = RecommendRequest::new(vec![InputSong::new("Lost Track").with_artist("Ghost Band")]);
    let err = aggregator(&provider).recommend(&request).await.unwrap_err();

    assert!(matches!(err, RecommendError::NoRecommendations));
    assert!(!provider
        .calls()
        .contains(&Call::Top("Ghost Band".to_string(), 10)));
}

// ---------------------------------------------------------------------------
// Counting and limits
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_found_songs_counts_resolved_seeds_only() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .search(WEEKND_QUERY, vec![track("Blinding Lights", "The Weeknd")])
            .similar(
                "The Weeknd",
                "Blinding Lights",
                vec![scored("Save Your Tears", "The Weeknd", 0.9)],
            )
            // Resolves but contributes nothing
            .search("Quiet Song", vec![track("Quiet Song", "")]),
    );

    let request = RecommendRequest::new(vec![
        weeknd(),
        InputSong::new("Quiet Song"),
        // Skipped: nothing to search
        InputSong::new(" "),
        // Searched, nothing found, no artist to fall back on
        InputSong::new("Nowhere"),
    ]);
    let result = aggregator(&provider).recommend(&request).await.unwrap();

    assert_eq!(result.input_songs, 4);
    assert_eq!(result.found_songs, 2);
    assert_eq!(names(&result), vec!["Save Your Tears"]);
}

#[tokio::test]
async fn test_result_never_exceeds_limit_in_any_mode() {
    let similar: Vec<_> = (0..50)
        .map(|i| scored(&format!("Track {}", i), "Artist", 1.0 - i as f64 * 0.02))
        .collect();
    let provider = Arc::new(
        ScriptedProvider::new()
            .search(WEEKND_QUERY, vec![track("Blinding Lights", "The Weeknd")])
            .similar("The Weeknd", "Blinding Lights", similar),
    );
    let engine = aggregator(&provider);

    for mode in [Mode::Strict, Mode::Normal, Mode::Diverse] {
        for limit in [1, 3, 7, 10, 25] {
            let request = RecommendRequest::new(vec![weeknd()])
                .with_mode(mode)
                .with_limit(limit);
            let result = engine.recommend(&request).await.unwrap();

            assert!(
                result.recommendations.len() <= limit,
                "{} mode returned {} for limit {}",
                mode,
                result.recommendations.len(),
                limit
            );
            if mode == Mode::Strict {
                assert!(result.recommendations.iter().all(|r| r.score() >= 0.5));
            }
        }
    }
}

#[tokio::test]
async fn test_zero_limit_uses_default() {
    let similar: Vec<_> = (0..40)
        .map(|i| scored(&format!("Track {}", i), "Artist", 0.99))
        .collect();
    let provider = Arc::new(
        ScriptedProvider::new()
            .search(WEEKND_QUERY, vec![track("Blinding Lights", "The Weeknd")])
            .similar("The Weeknd", "Blinding Lights", similar),
    );

    let request = RecommendRequest::new(vec![weeknd()])
        .with_mode(Mode::Diverse)
        .with_limit(0);
    let result = aggregator(&provider).recommend(&request).await.unwrap();

    assert_eq!(result.recommendations.len(), 20);
}

#[tokio::test]
async fn test_mode_sets_provider_list_size() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .search(WEEKND_QUERY, vec![track("Blinding Lights", "The Weeknd")]),
    );

    let request = RecommendRequest::new(vec![weeknd()]).with_mode(Mode::Diverse);
    let _ = aggregator(&provider).recommend(&request).await;

    // Similarity empty → artist top tracks requested with the diverse list size
    assert!(provider
        .calls()
        .contains(&Call::Top("The Weeknd".to_string(), 50)));
}

// ---------------------------------------------------------------------------
// Enrichment
// ---------------------------------------------------------------------------

fn enrichable_provider() -> Arc<ScriptedProvider> {
    Arc::new(
        ScriptedProvider::new()
            .search(WEEKND_QUERY, vec![track("Blinding Lights", "The Weeknd")])
            .similar(
                "The Weeknd",
                "Blinding Lights",
                vec![
                    scored("Save Your Tears", "The Weeknd", 0.9),
                    scored("Take On Me", "a-ha", 0.8),
                    scored("Physical", "Dua Lipa", 0.7),
                ],
            ),
    )
}

#[tokio::test]
async fn test_enrichment_sets_ids_per_item() {
    let converter = TableConverter::new()
        .id("Save Your Tears", "1109731")
        .failing("Take On Me");
    let engine = Aggregator::new(enrichable_provider()).with_converter(Arc::new(converter));

    let result = engine
        .recommend_enriched(&RecommendRequest::new(vec![weeknd()]))
        .await
        .unwrap();

    let ids: Vec<_> = result
        .recommendations
        .iter()
        .map(|r| r.external_id.as_deref())
        .collect();
    assert_eq!(ids, vec![Some("1109731"), None, None]);

    let summary = result.conversion.unwrap();
    assert_eq!(summary.converted, 1);
    assert_eq!(summary.total, 3);
}

#[tokio::test]
async fn test_enrichment_failure_keeps_recommendations() {
    let engine = Aggregator::new(enrichable_provider())
        .with_converter(Arc::new(TableConverter::unreachable()));

    let result = engine
        .recommend_enriched(&RecommendRequest::new(vec![weeknd()]))
        .await
        .unwrap();

    assert_eq!(result.recommendations.len(), 3);
    assert!(result.recommendations.iter().all(|r| r.external_id.is_none()));
    assert!(result.conversion.is_none());
}

#[tokio::test]
async fn test_enrichment_without_converter_is_plain_recommend() {
    let engine = Aggregator::new(enrichable_provider());

    let result = engine
        .recommend_enriched(&RecommendRequest::new(vec![weeknd()]))
        .await
        .unwrap();

    assert_eq!(result.recommendations.len(), 3);
    assert!(result.conversion.is_none());
}
