//! Bracket API handlers.
//!
//! This module provides HTTP REST endpoints for bracket operations including:
//! - Registering teams for a tournament
//! - Generating, viewing and discarding a tournament's bracket
//! - Generating several tournaments' brackets in one request
//! - Reporting running scores and final results
//! - Re-advancing winners after a failure
//!
//! # Examples
//!
//! Generate a bracket:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/tournaments/1/bracket
//! ```
//!
//! Record a result:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/matches/4/result \
//!   -H "Content-Type: application/json" \
//!   -d '{"slot1_score": 3, "slot2_score": 1}'
//! ```

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use bracket_engine::bracket::{
    BracketError, BracketView, ErrorKind, GeneratedBracket, GenerationOutcome, Match, MatchId,
    MatchReport, Team, TournamentId,
};
use serde::{Deserialize, Serialize};

use super::{AppState, request_id::RequestId};
use crate::logging::{log_bracket_event, log_engine_error};

#[derive(Debug, Deserialize)]
pub struct RegisterTeamRequest {
    pub name: String,
    pub college_id: Option<i64>,
}

/// Scores for a final result or a running score update
#[derive(Debug, Deserialize)]
pub struct RecordResultRequest {
    pub slot1_score: i32,
    pub slot2_score: i32,
}

#[derive(Debug, Deserialize)]
pub struct GenerateAllRequest {
    pub tournament_ids: Vec<TournamentId>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub root_match_id: MatchId,
    pub rounds: u32,
    pub match_count: usize,
}

impl From<&GeneratedBracket> for GenerateResponse {
    fn from(bracket: &GeneratedBracket) -> Self {
        Self {
            root_match_id: bracket.root.id,
            rounds: bracket.rounds,
            match_count: bracket.match_count,
        }
    }
}

/// Outcome of one tournament in a batch generation
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TournamentOutcome {
    Generated {
        tournament_id: TournamentId,
        #[serde(flatten)]
        bracket: GenerateResponse,
    },
    Skipped {
        tournament_id: TournamentId,
        teams: usize,
    },
    Failed {
        tournament_id: TournamentId,
        error: String,
    },
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateAllResponse {
    pub results: Vec<TournamentOutcome>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DiscardResponse {
    pub removed: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RepropagateResponse {
    /// The successor as stored after placement, `None` for the final
    pub next_match: Option<Match>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiResult<T> = Result<T, (StatusCode, Json<ErrorResponse>)>;

/// HTTP status for each engine error kind
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Input => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidState | ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::StorageFault => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: BracketError, request_id: &RequestId) -> (StatusCode, Json<ErrorResponse>) {
    let status = status_for(err.kind());
    log_engine_error(request_id.as_str(), status.as_u16(), &err);
    (
        status,
        Json(ErrorResponse {
            error: err.client_message(),
        }),
    )
}

/// Register a team for a tournament.
///
/// Registration closes once the tournament's bracket has been generated.
///
/// # Request Body
///
/// ```json
/// { "name": "Owls", "college_id": 3 }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Blank team name
/// - `409 Conflict`: Bracket already generated
pub async fn register_team(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(tournament_id): Path<TournamentId>,
    Json(payload): Json<RegisterTeamRequest>,
) -> ApiResult<(StatusCode, Json<Team>)> {
    let team = state
        .service
        .register_team(tournament_id, &payload.name, payload.college_id)
        .await
        .map_err(|e| error_response(e, &request_id))?;

    Ok((StatusCode::CREATED, Json(team)))
}

/// Generate the bracket of a tournament from its registered teams.
///
/// # Response
///
/// Returns `201 Created`:
/// ```json
/// { "root_match_id": 7, "rounds": 3, "match_count": 5 }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Fewer than two teams registered
/// - `409 Conflict`: Bracket already generated
/// - `500 Internal Server Error`: Storage failure, part of the bracket may exist
pub async fn generate_bracket(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<(StatusCode, Json<GenerateResponse>)> {
    let bracket = state
        .service
        .generate(tournament_id)
        .await
        .map_err(|e| error_response(e, &request_id))?;

    log_bracket_event(
        "bracket_generated",
        Some(tournament_id),
        Some(bracket.root.id),
        request_id.as_str(),
        &format!(
            "{} rounds, {} matches",
            bracket.rounds, bracket.match_count
        ),
    );

    Ok((StatusCode::CREATED, Json(GenerateResponse::from(&bracket))))
}

/// Generate the brackets of several tournaments, e.g. one per college
/// division.
///
/// Tournaments with fewer than two teams are skipped. Always answers
/// `200 OK`; each tournament's entry says whether it was generated.
///
/// # Request Body
///
/// ```json
/// { "tournament_ids": [10, 11, 12] }
/// ```
///
/// # Response
///
/// ```json
/// { "results": [
///     { "status": "generated", "tournament_id": 10, "root_match_id": 7, "rounds": 3, "match_count": 5 },
///     { "status": "skipped", "tournament_id": 11, "teams": 1 },
///     { "status": "failed", "tournament_id": 12, "error": "Bracket already generated for tournament 12" }
/// ] }
/// ```
pub async fn generate_all(
    State(state): State<AppState>,
    request_id: RequestId,
    Json(payload): Json<GenerateAllRequest>,
) -> Json<GenerateAllResponse> {
    let outcomes = state.service.generate_all(&payload.tournament_ids).await;

    let results = outcomes
        .into_iter()
        .map(|(tournament_id, outcome)| match outcome {
            GenerationOutcome::Generated(bracket) => {
                log_bracket_event(
                    "bracket_generated",
                    Some(tournament_id),
                    Some(bracket.root.id),
                    request_id.as_str(),
                    &format!(
                        "{} rounds, {} matches",
                        bracket.rounds, bracket.match_count
                    ),
                );
                TournamentOutcome::Generated {
                    tournament_id,
                    bracket: GenerateResponse::from(&bracket),
                }
            }
            GenerationOutcome::Skipped { teams } => TournamentOutcome::Skipped {
                tournament_id,
                teams,
            },
            GenerationOutcome::Failed(err) => {
                let status = status_for(err.kind());
                log_engine_error(request_id.as_str(), status.as_u16(), &err);
                TournamentOutcome::Failed {
                    tournament_id,
                    error: err.client_message(),
                }
            }
        })
        .collect();

    Json(GenerateAllResponse { results })
}

/// Get the current bracket of a tournament, grouped by round.
///
/// # Errors
///
/// - `404 Not Found`: No bracket generated yet
pub async fn get_bracket(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<Json<BracketView>> {
    state
        .service
        .view(tournament_id)
        .await
        .map(Json)
        .map_err(|e| error_response(e, &request_id))
}

/// Delete every match of a tournament so the bracket can be generated again.
pub async fn discard_bracket(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<Json<DiscardResponse>> {
    let removed = state
        .service
        .discard(tournament_id)
        .await
        .map_err(|e| error_response(e, &request_id))?;

    log_bracket_event(
        "bracket_discarded",
        Some(tournament_id),
        None,
        request_id.as_str(),
        &format!("{removed} matches removed"),
    );

    Ok(Json(DiscardResponse { removed }))
}

/// Record the final score of an in-progress match.
///
/// # Request Body
///
/// ```json
/// { "slot1_score": 3, "slot2_score": 1 }
/// ```
///
/// # Response
///
/// Returns `200 OK` with the played match, the successor it fed and the
/// champion when the final was played.
///
/// # Errors
///
/// - `400 Bad Request`: Tied or negative score
/// - `404 Not Found`: Match doesn't exist
/// - `409 Conflict`: Match not in progress, or the successor stayed contended
pub async fn record_result(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(match_id): Path<MatchId>,
    Json(payload): Json<RecordResultRequest>,
) -> ApiResult<Json<MatchReport>> {
    let report = state
        .service
        .record_result(match_id, payload.slot1_score, payload.slot2_score)
        .await
        .map_err(|e| error_response(e, &request_id))?;

    let winner = report.played.winner.unwrap_or_default();
    log_bracket_event(
        "result_recorded",
        Some(report.played.tournament_id),
        Some(match_id),
        request_id.as_str(),
        &format!(
            "team {} wins {}-{}",
            winner, payload.slot1_score, payload.slot2_score
        ),
    );

    if let Some(champion) = report.champion {
        log_bracket_event(
            "champion_decided",
            Some(report.played.tournament_id),
            Some(match_id),
            request_id.as_str(),
            &format!("team {champion} wins the tournament"),
        );
    }

    Ok(Json(report))
}

/// Store a running score for an in-progress match without deciding it.
///
/// # Request Body
///
/// ```json
/// { "slot1_score": 1, "slot2_score": 1 }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Negative score
/// - `404 Not Found`: Match doesn't exist
/// - `409 Conflict`: Match not in progress, or another update landed first
pub async fn update_scores(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(match_id): Path<MatchId>,
    Json(payload): Json<RecordResultRequest>,
) -> ApiResult<Json<Match>> {
    state
        .service
        .update_scores(match_id, payload.slot1_score, payload.slot2_score)
        .await
        .map(Json)
        .map_err(|e| error_response(e, &request_id))
}

/// Place the winner of a played match into its successor again.
///
/// # Errors
///
/// - `404 Not Found`: Match doesn't exist
/// - `409 Conflict`: Match not played yet
pub async fn repropagate(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(match_id): Path<MatchId>,
) -> ApiResult<Json<RepropagateResponse>> {
    let next_match = state
        .service
        .repropagate(match_id)
        .await
        .map_err(|e| error_response(e, &request_id))?;

    log_bracket_event(
        "winner_repropagated",
        None,
        Some(match_id),
        request_id.as_str(),
        &format!("successor {:?}", next_match.as_ref().map(|m| m.id)),
    );

    Ok(Json(RepropagateResponse { next_match }))
}
