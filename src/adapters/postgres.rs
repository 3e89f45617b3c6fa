use crate::config::DatabaseConfig;
use crate::domain::{
    Decision, EvaluationRecord, FixtureRef, KickoffWindow, PredictedOutcome, TeamRef,
};
use crate::error::{AnalystError, Result};
use crate::persistence::{EvaluationStore, StoreConnector};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow};
use sqlx::types::Json;
use sqlx::{ConnectOptions, Connection, Row};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS fixture_evaluations (
        fixture_id BIGINT PRIMARY KEY,
        report_md TEXT NOT NULL,
        place_bet SMALLINT NOT NULL,
        predicted_outcome SMALLINT NOT NULL,
        confidence DOUBLE PRECISION NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    // Added after the first deployments
    "ALTER TABLE fixture_evaluations ADD COLUMN IF NOT EXISTS evidence_tags TEXT",
    r#"
    CREATE TABLE IF NOT EXISTS fixtures (
        fixture_id BIGINT PRIMARY KEY,
        league_id BIGINT NOT NULL,
        league_name TEXT,
        season INTEGER NOT NULL,
        round TEXT,
        kickoff TIMESTAMPTZ NOT NULL,
        status TEXT,
        home_team_id BIGINT NOT NULL,
        home_team_name TEXT NOT NULL,
        away_team_id BIGINT NOT NULL,
        away_team_name TEXT NOT NULL,
        raw JSONB,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_fixtures_league_kickoff ON fixtures (league_id, kickoff)",
];

/// Opens PostgreSQL connections with the configured session settings
#[derive(Clone)]
pub struct PostgresConnector {
    options: PgConnectOptions,
    connect_timeout: Duration,
}

impl PostgresConnector {
    pub fn new(config: &DatabaseConfig) -> Result<Self> {
        if config.url.is_empty() {
            return Err(AnalystError::Validation("database.url not configured".into()));
        }
        let options: PgConnectOptions = config.url.parse()?;
        let options = options.application_name(&config.application_name).options([
            ("statement_timeout", config.statement_timeout_ms.to_string()),
            (
                "idle_in_transaction_session_timeout",
                config.idle_in_transaction_timeout_ms.to_string(),
            ),
        ]);

        Ok(Self {
            options,
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
        })
    }

    pub async fn open(&self) -> Result<PostgresStore> {
        let conn = tokio::time::timeout(self.connect_timeout, self.options.connect())
            .await
            .map_err(|_| {
                AnalystError::Timeout(format!(
                    "connecting to PostgreSQL took longer than {:?}",
                    self.connect_timeout
                ))
            })??;
        debug!("Opened PostgreSQL connection");
        Ok(PostgresStore { conn: Some(conn) })
    }
}

#[async_trait]
impl StoreConnector for PostgresConnector {
    async fn connect(&self) -> Result<Box<dyn EvaluationStore>> {
        Ok(Box::new(self.open().await?))
    }
}

/// Evaluation store on a single PostgreSQL connection
pub struct PostgresStore {
    conn: Option<PgConnection>,
}

impl PostgresStore {
    fn conn(&mut self) -> Result<&mut PgConnection> {
        self.conn.as_mut().ok_or(AnalystError::StoreClosed)
    }

    /// A connection that saw a transient failure is not used again
    fn invalidate_on_transient<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.is_transient() && self.conn.take().is_some() {
                warn!("Discarding PostgreSQL connection after transient failure: {}", e);
            }
        }
        result
    }

    async fn write_evaluation(
        &mut self,
        fixture_id: i64,
        report: &str,
        decision: &Decision,
    ) -> Result<()> {
        let conn = self.conn()?;
        let mut tx = conn.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO fixture_evaluations
                (fixture_id, report_md, place_bet, predicted_outcome, confidence, evidence_tags)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (fixture_id) DO UPDATE SET
                report_md = EXCLUDED.report_md,
                place_bet = EXCLUDED.place_bet,
                predicted_outcome = EXCLUDED.predicted_outcome,
                confidence = EXCLUDED.confidence,
                evidence_tags = EXCLUDED.evidence_tags,
                updated_at = NOW()
            "#,
        )
        .bind(fixture_id)
        .bind(report)
        .bind(i16::from(decision.place_bet))
        .bind(decision.predicted_outcome.code())
        .bind(decision.confidence)
        .bind(&decision.evidence_tags)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn query_fixtures(
        &mut self,
        league_ids: &[i64],
        window: &KickoffWindow,
    ) -> Result<Vec<FixtureRef>> {
        let conn = self.conn()?;
        let rows = sqlx::query(
            r#"
            SELECT fixture_id, league_id, league_name, season, round, kickoff, status,
                   home_team_id, home_team_name, away_team_id, away_team_name
            FROM fixtures
            WHERE league_id = ANY($1) AND kickoff >= $2 AND kickoff < $3
            ORDER BY fixture_id
            "#,
        )
        .bind(league_ids.to_vec())
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&mut *conn)
        .await?;

        rows.iter().map(fixture_from_row).collect()
    }

    async fn query_existing(&mut self, fixture_ids: &[i64]) -> Result<HashSet<i64>> {
        let conn = self.conn()?;
        let rows = sqlx::query(
            "SELECT fixture_id FROM fixture_evaluations WHERE fixture_id = ANY($1)",
        )
        .bind(fixture_ids.to_vec())
        .fetch_all(&mut *conn)
        .await?;

        rows.iter()
            .map(|row| row.try_get::<i64, _>("fixture_id").map_err(AnalystError::from))
            .collect()
    }

    async fn query_evaluation(&mut self, fixture_id: i64) -> Result<Option<EvaluationRecord>> {
        let conn = self.conn()?;
        let row = sqlx::query(
            r#"
            SELECT fixture_id, report_md, place_bet, predicted_outcome, confidence,
                   evidence_tags, created_at, updated_at
            FROM fixture_evaluations
            WHERE fixture_id = $1
            "#,
        )
        .bind(fixture_id)
        .fetch_optional(&mut *conn)
        .await?;

        row.as_ref().map(evaluation_from_row).transpose()
    }

    async fn write_fixture(&mut self, fixture: &FixtureRef, raw: &Value) -> Result<()> {
        let conn = self.conn()?;
        sqlx::query(
            r#"
            INSERT INTO fixtures
                (fixture_id, league_id, league_name, season, round, kickoff, status,
                 home_team_id, home_team_name, away_team_id, away_team_name, raw)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (fixture_id) DO UPDATE SET
                league_id = EXCLUDED.league_id,
                league_name = EXCLUDED.league_name,
                season = EXCLUDED.season,
                round = EXCLUDED.round,
                kickoff = EXCLUDED.kickoff,
                status = EXCLUDED.status,
                home_team_id = EXCLUDED.home_team_id,
                home_team_name = EXCLUDED.home_team_name,
                away_team_id = EXCLUDED.away_team_id,
                away_team_name = EXCLUDED.away_team_name,
                raw = EXCLUDED.raw,
                updated_at = NOW()
            "#,
        )
        .bind(fixture.fixture_id)
        .bind(fixture.league_id)
        .bind(&fixture.league_name)
        .bind(fixture.season)
        .bind(&fixture.round)
        .bind(fixture.kickoff)
        .bind(&fixture.status)
        .bind(fixture.home.id)
        .bind(&fixture.home.name)
        .bind(fixture.away.id)
        .bind(&fixture.away.name)
        .bind(Json(raw))
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}

fn fixture_from_row(row: &PgRow) -> Result<FixtureRef> {
    Ok(FixtureRef {
        fixture_id: row.try_get("fixture_id")?,
        league_id: row.try_get("league_id")?,
        league_name: row.try_get("league_name")?,
        season: row.try_get("season")?,
        round: row.try_get("round")?,
        kickoff: row.try_get("kickoff")?,
        status: row.try_get("status")?,
        home: TeamRef {
            id: row.try_get("home_team_id")?,
            name: row.try_get("home_team_name")?,
        },
        away: TeamRef {
            id: row.try_get("away_team_id")?,
            name: row.try_get("away_team_name")?,
        },
    })
}

fn evaluation_from_row(row: &PgRow) -> Result<EvaluationRecord> {
    let place_bet: i16 = row.try_get("place_bet")?;
    let outcome: i16 = row.try_get("predicted_outcome")?;
    let evidence_tags: Option<String> = row.try_get("evidence_tags")?;

    Ok(EvaluationRecord {
        fixture_id: row.try_get("fixture_id")?,
        report: row.try_get("report_md")?,
        decision: Decision {
            place_bet: place_bet == 1,
            predicted_outcome: PredictedOutcome::from_code(i64::from(outcome)).unwrap_or_default(),
            confidence: row.try_get("confidence")?,
            evidence_tags: evidence_tags.unwrap_or_default(),
        },
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl EvaluationStore for PostgresStore {
    #[instrument(skip(self))]
    async fn ensure_schema(&mut self) -> Result<()> {
        let conn = self.conn()?;
        for statement in SCHEMA {
            sqlx::query(*statement).execute(&mut *conn).await?;
        }
        info!("Evaluation schema ensured");
        Ok(())
    }

    #[instrument(skip(self, league_ids), fields(leagues = league_ids.len()))]
    async fn fixtures_between(
        &mut self,
        league_ids: &[i64],
        window: &KickoffWindow,
    ) -> Result<Vec<FixtureRef>> {
        let result = self.query_fixtures(league_ids, window).await;
        self.invalidate_on_transient(result)
    }

    async fn existing_evaluations(&mut self, fixture_ids: &[i64]) -> Result<HashSet<i64>> {
        if fixture_ids.is_empty() {
            return Ok(HashSet::new());
        }
        let result = self.query_existing(fixture_ids).await;
        self.invalidate_on_transient(result)
    }

    #[instrument(skip(self, report, decision))]
    async fn upsert_evaluation(
        &mut self,
        fixture_id: i64,
        report: &str,
        decision: &Decision,
    ) -> Result<()> {
        let result = self.write_evaluation(fixture_id, report, decision).await;
        self.invalidate_on_transient(result)
    }

    async fn get_evaluation(&mut self, fixture_id: i64) -> Result<Option<EvaluationRecord>> {
        let result = self.query_evaluation(fixture_id).await;
        self.invalidate_on_transient(result)
    }

    async fn upsert_fixture(&mut self, fixture: &FixtureRef, raw: &Value) -> Result<()> {
        let result = self.write_fixture(fixture, raw).await;
        self.invalidate_on_transient(result)
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().await?;
            debug!("Closed PostgreSQL connection");
        }
        Ok(())
    }
}
