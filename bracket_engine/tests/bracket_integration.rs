//! Integration tests for bracket generation and result recording
//!
//! These tests drive the public service API against the in-memory store,
//! from team registration through to a crowned champion.

use bracket_engine::bracket::{
    BracketError, BracketService, EngineConfig, ErrorKind, GenerationOutcome, Match, MatchStatus,
    Team,
};
use bracket_engine::db::{InMemoryStore, MatchRepository, TeamRepository};
use std::sync::Arc;

const TOURNAMENT: i64 = 1;

fn service(store: &InMemoryStore) -> BracketService {
    BracketService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        EngineConfig::default(),
    )
}

/// Register teams T1..Tn and return them in registration order
async fn register(store: &InMemoryStore, n: usize) -> Vec<Team> {
    let mut teams = Vec::with_capacity(n);
    for i in 1..=n {
        teams.push(
            store
                .create_team(&format!("T{i}"), TOURNAMENT, None)
                .await
                .unwrap(),
        );
    }
    teams
}

async fn matches(store: &InMemoryStore) -> Vec<Match> {
    store.list_matches(TOURNAMENT).await.unwrap()
}

fn round_one(all: &[Match]) -> Vec<&Match> {
    all.iter().filter(|m| m.round == 1).collect()
}

#[tokio::test]
async fn test_scenario_four_teams() {
    let store = InMemoryStore::new();
    let t = register(&store, 4).await;
    let service = service(&store);

    let bracket = service.generate(TOURNAMENT).await.unwrap();
    assert_eq!(bracket.rounds, 2);
    assert_eq!(bracket.match_count, 3);

    let all = matches(&store).await;
    let first = round_one(&all);
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].slot1.team_id, Some(t[0].id));
    assert_eq!(first[0].slot2.team_id, Some(t[1].id));
    assert_eq!(first[1].slot1.team_id, Some(t[2].id));
    assert_eq!(first[1].slot2.team_id, Some(t[3].id));
    assert!(first.iter().all(|m| m.status == MatchStatus::InProgress));
    assert!(first.iter().all(|m| m.next_match_id == Some(bracket.root.id)));
    assert_eq!(bracket.root.status, MatchStatus::Unstarted);

    // T1 beats T2 3-1
    let report = service.record_result(first[0].id, 3, 1).await.unwrap();
    assert_eq!(report.played.winner, Some(t[0].id));
    let final_match = report.next_match.unwrap();
    assert_eq!(final_match.slot1.team_id, Some(t[0].id));
    assert_eq!(final_match.status, MatchStatus::Unstarted);

    // T3 beats T4 2-0
    let report = service.record_result(first[1].id, 2, 0).await.unwrap();
    let final_match = report.next_match.unwrap();
    assert_eq!(final_match.slot1.team_id, Some(t[0].id));
    assert_eq!(final_match.slot2.team_id, Some(t[2].id));
    assert_eq!(final_match.status, MatchStatus::InProgress);

    let report = service.record_result(final_match.id, 1, 4).await.unwrap();
    assert_eq!(report.champion, Some(t[2].id));
    assert!(report.next_match.is_none());

    let view = service.view(TOURNAMENT).await.unwrap();
    assert_eq!(view.champion, Some(t[2].id));
}

#[tokio::test]
async fn test_scenario_three_teams_bye() {
    let store = InMemoryStore::new();
    let t = register(&store, 3).await;
    let service = service(&store);

    let bracket = service.generate(TOURNAMENT).await.unwrap();
    assert_eq!(bracket.rounds, 2);

    let all = matches(&store).await;
    let first = round_one(&all);
    assert_eq!(first.len(), 2);

    let played = first[0];
    assert_eq!(played.slot1.team_id, Some(t[0].id));
    assert_eq!(played.slot2.team_id, Some(t[1].id));
    assert_eq!(played.status, MatchStatus::InProgress);

    let bye = first[1];
    assert_eq!(bye.status, MatchStatus::Played);
    assert_eq!(bye.winner, Some(t[2].id));
    assert!(bye.slot2.team_id.is_none());
    assert!(bye.is_bye());

    // T3 is already waiting in the final
    assert!(bracket.root.contains_team(t[2].id));
    assert_eq!(bracket.root.status, MatchStatus::Unstarted);

    let report = service.record_result(played.id, 0, 2).await.unwrap();
    let final_match = report.next_match.unwrap();
    assert!(final_match.contains_team(t[1].id));
    assert!(final_match.contains_team(t[2].id));
    assert_eq!(final_match.status, MatchStatus::InProgress);
}

#[tokio::test]
async fn test_scenario_unstarted_match_rejects_result() {
    let store = InMemoryStore::new();
    register(&store, 4).await;
    let service = service(&store);
    let bracket = service.generate(TOURNAMENT).await.unwrap();

    let err = service
        .record_result(bracket.root.id, 2, 1)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert!(matches!(
        err,
        BracketError::InvalidState {
            actual: MatchStatus::Unstarted,
            ..
        }
    ));
}

#[tokio::test]
async fn test_scenario_tied_scores_rejected() {
    let store = InMemoryStore::new();
    register(&store, 2).await;
    let service = service(&store);
    let bracket = service.generate(TOURNAMENT).await.unwrap();

    let err = service
        .record_result(bracket.root.id, 2, 2)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Input);

    // Nothing was written
    let stored = store.find_match(bracket.root.id).await.unwrap().unwrap();
    assert_eq!(stored.status, MatchStatus::InProgress);
    assert_eq!(stored.version, 0);
}

#[tokio::test]
async fn test_scenario_siblings_in_reverse_order() {
    let store = InMemoryStore::new();
    let t = register(&store, 4).await;
    let service = service(&store);
    let bracket = service.generate(TOURNAMENT).await.unwrap();
    let all = matches(&store).await;
    let first = round_one(&all);

    // Second semi-final finishes first and takes slot1
    service.record_result(first[1].id, 0, 1).await.unwrap();
    let report = service.record_result(first[0].id, 1, 0).await.unwrap();

    let final_match = report.next_match.unwrap();
    assert_eq!(final_match.id, bracket.root.id);
    assert_eq!(final_match.slot1.team_id, Some(t[3].id));
    assert_eq!(final_match.slot2.team_id, Some(t[0].id));
    assert_eq!(final_match.status, MatchStatus::InProgress);
}

#[tokio::test]
async fn test_interim_scores_then_result() {
    let store = InMemoryStore::new();
    let t = register(&store, 2).await;
    let service = service(&store);
    let bracket = service.generate(TOURNAMENT).await.unwrap();

    for (s1, s2) in [(1, 0), (1, 1), (2, 1)] {
        let interim = service.update_scores(bracket.root.id, s1, s2).await.unwrap();
        assert_eq!(interim.status, MatchStatus::InProgress);
        assert_eq!(interim.winner, None);
    }

    let view = service.view(TOURNAMENT).await.unwrap();
    let summary = &view.rounds[0].matches[0];
    assert_eq!(summary.participants[0].score, 2);
    assert_eq!(summary.participants[1].score, 1);
    assert_eq!(view.champion, None);

    let report = service.record_result(bracket.root.id, 2, 3).await.unwrap();
    assert_eq!(report.champion, Some(t[1].id));
}

#[tokio::test]
async fn test_generate_all_divisions() {
    let store = InMemoryStore::new();
    let service = service(&store);
    // One sub-tournament per college division
    for (division, count) in [(10, 5), (11, 2), (12, 1)] {
        for i in 0..count {
            service
                .register_team(division, &format!("D{division}-{i}"), Some(division))
                .await
                .unwrap();
        }
    }

    let outcomes = service.generate_all(&[10, 11, 12]).await;

    assert_eq!(outcomes.len(), 3);
    assert!(matches!(
        &outcomes[0],
        (10, GenerationOutcome::Generated(bracket)) if bracket.rounds == 3
    ));
    assert!(matches!(
        &outcomes[1],
        (11, GenerationOutcome::Generated(bracket)) if bracket.rounds == 1
    ));
    assert!(matches!(
        &outcomes[2],
        (12, GenerationOutcome::Skipped { teams: 1 })
    ));

    assert_eq!(store.list_matches(10).await.unwrap().len(), 5);
    assert_eq!(store.list_matches(11).await.unwrap().len(), 1);
    assert!(store.list_matches(12).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_winner_never_changes() {
    let store = InMemoryStore::new();
    let t = register(&store, 2).await;
    let service = service(&store);
    let bracket = service.generate(TOURNAMENT).await.unwrap();

    service.record_result(bracket.root.id, 5, 3).await.unwrap();
    let err = service
        .record_result(bracket.root.id, 0, 9)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BracketError::InvalidState {
            actual: MatchStatus::Played,
            ..
        }
    ));

    let stored = store.find_match(bracket.root.id).await.unwrap().unwrap();
    assert_eq!(stored.winner, Some(t[0].id));
    assert_eq!((stored.slot1.score, stored.slot2.score), (5, 3));
}

#[tokio::test]
async fn test_reread_after_result_is_stable() {
    let store = InMemoryStore::new();
    register(&store, 4).await;
    let service = service(&store);
    service.generate(TOURNAMENT).await.unwrap();

    let target = round_one(&matches(&store).await)[0].id;
    let report = service.record_result(target, 1, 0).await.unwrap();

    for _ in 0..3 {
        let reread = store.find_match(target).await.unwrap().unwrap();
        assert_eq!(reread, report.played);
    }
}

#[tokio::test]
async fn test_generation_is_guarded() {
    let store = InMemoryStore::new();
    register(&store, 4).await;
    let service = service(&store);

    service.generate(TOURNAMENT).await.unwrap();
    let err = service.generate(TOURNAMENT).await.unwrap_err();

    assert!(matches!(err, BracketError::AlreadyGenerated(TOURNAMENT)));
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(store.match_count().await, 3);
}

#[tokio::test]
async fn test_generation_needs_two_teams() {
    let store = InMemoryStore::new();
    register(&store, 1).await;

    let err = service(&store).generate(TOURNAMENT).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Input);

    let err = service(&store).generate(42).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Input);
}

#[tokio::test]
async fn test_failed_generation_can_be_discarded_and_retried() {
    let store = InMemoryStore::new();
    register(&store, 8).await;
    let service = service(&store);

    // Round 1 (4 inserts) succeeds, round 2 fails part way
    store.fail_after_writes(6).await;
    let err = service.generate(TOURNAMENT).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StorageFault);
    assert!(store.match_count().await > 0);

    store.clear_fault().await;
    assert!(matches!(
        service.generate(TOURNAMENT).await,
        Err(BracketError::AlreadyGenerated(_))
    ));

    // Four round-1 matches plus the round-2 match whose second link failed
    assert_eq!(service.discard(TOURNAMENT).await.unwrap(), 5);
    assert_eq!(store.match_count().await, 0);

    let bracket = service.generate(TOURNAMENT).await.unwrap();
    assert_eq!(bracket.match_count, 7);
}

#[tokio::test]
async fn test_repropagate_repairs_interrupted_result() {
    let store = InMemoryStore::new();
    let t = register(&store, 4).await;
    let service = service(&store);
    let bracket = service.generate(TOURNAMENT).await.unwrap();
    let target = round_one(&matches(&store).await)[1].id;

    // The match write succeeds, the successor write fails
    store.fail_after_writes(1).await;
    let err = service.record_result(target, 4, 2).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StorageFault);

    let played = store.find_match(target).await.unwrap().unwrap();
    assert_eq!(played.status, MatchStatus::Played);
    let root = store.find_match(bracket.root.id).await.unwrap().unwrap();
    assert!(!root.contains_team(t[2].id));

    store.clear_fault().await;
    let next = service.repropagate(target).await.unwrap().unwrap();
    assert_eq!(next.slot1.team_id, Some(t[2].id));

    // Running it again changes nothing
    let again = service.repropagate(target).await.unwrap().unwrap();
    assert_eq!(again, next);
}

#[tokio::test]
async fn test_full_tournament_for_many_sizes() {
    for n in 2..=17 {
        let store = InMemoryStore::new();
        let teams = register(&store, n).await;
        let service = service(&store);
        let bracket = service.generate(TOURNAMENT).await.unwrap();

        // The lower team id always wins, so T1 must take the title
        let mut champion = None;
        loop {
            let ready: Vec<Match> = matches(&store)
                .await
                .into_iter()
                .filter(|m| m.status == MatchStatus::InProgress)
                .collect();
            if ready.is_empty() {
                break;
            }
            for m in ready {
                let (s1, s2) = if m.slot1.team_id < m.slot2.team_id {
                    (1, 0)
                } else {
                    (0, 1)
                };
                let report = service.record_result(m.id, s1, s2).await.unwrap();
                if report.champion.is_some() {
                    champion = report.champion;
                }
            }
        }

        let all = matches(&store).await;
        assert!(
            all.iter().all(|m| m.status == MatchStatus::Played),
            "{n} teams: bracket stalled"
        );
        assert_eq!(champion, Some(teams[0].id), "{n} teams");

        let root = store.find_match(bracket.root.id).await.unwrap().unwrap();
        assert_eq!(root.winner, champion);
    }
}

#[tokio::test]
async fn test_brackets_of_different_tournaments_are_independent() {
    let store = InMemoryStore::new();
    register(&store, 4).await;
    for name in ["A", "B"] {
        store.create_team(name, 2, Some(7)).await.unwrap();
    }
    let service = service(&store);

    service.generate(TOURNAMENT).await.unwrap();
    let other = service.generate(2).await.unwrap();

    assert_eq!(other.match_count, 1);
    assert_eq!(store.list_matches(2).await.unwrap().len(), 1);
    assert_eq!(matches(&store).await.len(), 3);

    for t in [TOURNAMENT, 2] {
        let finals = store
            .list_matches(t)
            .await
            .unwrap()
            .into_iter()
            .filter(Match::is_final)
            .count();
        assert_eq!(finals, 1, "tournament {t}");
    }
}
