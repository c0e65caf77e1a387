use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::AnalysisError;

use super::ranking::{Ranking, SortKey};
use super::source::{collect, CollectPlan, RecordSnapshot, RecordSource};
use super::types::{AnalysisKind, AnalysisReport, AnalysisSettings, AnalysisWindow};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineStage {
    Idle,
    Collecting,
    Aggregating,
    Scoring,
    Ranking,
    Recommending,
    Reported,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Collecting => "collecting",
            Self::Aggregating => "aggregating",
            Self::Scoring => "scoring",
            Self::Ranking => "ranking",
            Self::Recommending => "recommending",
            Self::Reported => "reported",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PipelineTransitionError {
    #[error("invalid pipeline transition from {from:?} to {to:?}")]
    InvalidTransition { from: PipelineStage, to: PipelineStage },
}

/// Forward transitions run one stage at a time; any in-flight stage may
/// abort back to `Idle`.
pub fn transition(
    current: PipelineStage,
    target: PipelineStage,
) -> Result<PipelineStage, PipelineTransitionError> {
    use PipelineStage::*;

    match (current, target) {
        (Idle, Collecting)
        | (Collecting, Aggregating)
        | (Aggregating, Scoring)
        | (Scoring, Ranking)
        | (Ranking, Recommending)
        | (Recommending, Reported) => Ok(target),
        (Collecting | Aggregating | Scoring | Ranking | Recommending, Idle) => Ok(Idle),
        (from, to) => Err(PipelineTransitionError::InvalidTransition { from, to }),
    }
}

/// Tracks the stage of a single analysis invocation.
#[derive(Clone, Debug)]
pub struct PipelineRun {
    run_id: Uuid,
    kind: AnalysisKind,
    stage: PipelineStage,
    history: Vec<PipelineStage>,
}

impl PipelineRun {
    pub fn start(kind: AnalysisKind) -> Self {
        let run = Self {
            run_id: Uuid::new_v4(),
            kind,
            stage: PipelineStage::Idle,
            history: vec![PipelineStage::Idle],
        };
        info!(
            event_name = "analysis.run.started",
            correlation_id = %run.run_id,
            analysis_type = kind.as_str(),
            "analysis run started"
        );
        run
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub fn history(&self) -> &[PipelineStage] {
        &self.history
    }

    pub fn advance(&mut self, target: PipelineStage) -> Result<(), PipelineTransitionError> {
        self.stage = transition(self.stage, target)?;
        self.history.push(self.stage);
        debug!(
            event_name = "analysis.stage.entered",
            correlation_id = %self.run_id,
            analysis_type = self.kind.as_str(),
            stage = self.stage.as_str(),
            "analysis stage entered"
        );
        Ok(())
    }

    pub fn complete(&mut self, total_dishes: usize) -> Result<(), PipelineTransitionError> {
        self.advance(PipelineStage::Reported)?;
        info!(
            event_name = "analysis.run.completed",
            correlation_id = %self.run_id,
            analysis_type = self.kind.as_str(),
            total_dishes,
            "analysis run completed"
        );
        Ok(())
    }

    /// Drops back to `Idle` after a failed stage. A run that never left
    /// `Idle` has nothing to abort.
    pub fn abort(&mut self, error: &AnalysisError) {
        let failed_stage = self.stage;
        if let Ok(stage) = transition(self.stage, PipelineStage::Idle) {
            self.stage = stage;
            self.history.push(stage);
        }
        warn!(
            event_name = "analysis.run.aborted",
            correlation_id = %self.run_id,
            analysis_type = self.kind.as_str(),
            stage = failed_stage.as_str(),
            error_class = error.class(),
            error = %error,
            "analysis run aborted"
        );
    }
}

/// Per-analysis configuration of the shared pipeline.
pub trait AnalysisProfile {
    type Aggregate;
    type Entry: Clone;
    type Key: SortKey;
    type Breakdown;

    fn kind(&self) -> AnalysisKind;

    fn window(&self) -> Option<AnalysisWindow> {
        None
    }

    fn collect_plan(&self) -> CollectPlan;

    fn aggregate(&self, snapshot: &RecordSnapshot) -> Result<Self::Aggregate, AnalysisError>;

    /// Entries in aggregation order; the ranker relies on it for ties.
    fn score(
        &self,
        snapshot: &RecordSnapshot,
        aggregate: &Self::Aggregate,
    ) -> Result<Vec<Self::Entry>, AnalysisError>;

    fn rank_key(&self, entry: &Self::Entry) -> Self::Key;

    fn breakdown(
        &self,
        _aggregate: &Self::Aggregate,
        _settings: &AnalysisSettings,
    ) -> Option<Self::Breakdown> {
        None
    }

    fn recommend(
        &self,
        ranking: &Ranking<Self::Entry>,
        breakdown: Option<&Self::Breakdown>,
        settings: &AnalysisSettings,
    ) -> Vec<String>;
}

/// Runs one analysis end to end. Any stage failure aborts the run with no
/// partial report.
pub async fn run<P, S>(
    profile: &P,
    source: &S,
    settings: &AnalysisSettings,
) -> Result<AnalysisReport<P::Entry, P::Breakdown>, AnalysisError>
where
    P: AnalysisProfile,
    S: RecordSource + ?Sized,
{
    let mut run = PipelineRun::start(profile.kind());
    match execute(&mut run, profile, source, settings).await {
        Ok(report) => Ok(report),
        Err(error) => {
            run.abort(&error);
            Err(error)
        }
    }
}

async fn execute<P, S>(
    run: &mut PipelineRun,
    profile: &P,
    source: &S,
    settings: &AnalysisSettings,
) -> Result<AnalysisReport<P::Entry, P::Breakdown>, AnalysisError>
where
    P: AnalysisProfile,
    S: RecordSource + ?Sized,
{
    settings.validate()?;

    run.advance(PipelineStage::Collecting)?;
    let snapshot = collect(source, &profile.collect_plan()).await?;

    run.advance(PipelineStage::Aggregating)?;
    let aggregate = profile.aggregate(&snapshot)?;

    run.advance(PipelineStage::Scoring)?;
    let entries = profile.score(&snapshot, &aggregate)?;

    run.advance(PipelineStage::Ranking)?;
    let ranking = Ranking::rank_by(&entries, |entry| profile.rank_key(entry));
    let breakdown = profile.breakdown(&aggregate, settings);

    run.advance(PipelineStage::Recommending)?;
    let recommendations = profile.recommend(&ranking, breakdown.as_ref(), settings);

    let report = AnalysisReport {
        analysis_type: profile.kind(),
        window: profile.window(),
        total_dishes: ranking.len(),
        top: ranking.top(settings.cohort_size),
        bottom: ranking.bottom(settings.cohort_size),
        recommendations,
        breakdown,
    };
    run.complete(report.total_dishes)?;

    Ok(report)
}
