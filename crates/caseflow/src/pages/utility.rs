use super::common::secs;
use crate::actor::Actor;
use crate::case::CaseReference;
use crate::registry::{StepArgs, StepContext, StepFragment, StepKind, StepOutcome};
use crate::result::CaseflowResult;
use async_trait::async_trait;
use tracing::info;

/// Read the case reference from the current case URL
#[derive(Debug, Clone, Copy, Default)]
pub struct GetCaseRefFromUrl;

#[async_trait]
impl StepFragment for GetCaseRefFromUrl {
    fn kind(&self) -> StepKind {
        StepKind::ExtractCaseReference
    }

    fn description(&self) -> &str {
        "Capture the case reference from the current URL"
    }

    async fn run(
        &self,
        actor: &mut dyn Actor,
        _ctx: &StepContext<'_>,
        _args: &StepArgs,
    ) -> CaseflowResult<StepOutcome> {
        let url = actor.current_url().await?;
        Ok(StepOutcome::CaseReference(CaseReference::from_url(&url)?))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GrabText;

#[async_trait]
impl StepFragment for GrabText {
    fn kind(&self) -> StepKind {
        StepKind::ExtractText
    }

    fn description(&self) -> &str {
        "Return the trimmed text of the element at `selector`"
    }

    async fn run(
        &self,
        actor: &mut dyn Actor,
        ctx: &StepContext<'_>,
        args: &StepArgs,
    ) -> CaseflowResult<StepOutcome> {
        let selector = args.str("selector")?;
        actor
            .assert_visible(selector, ctx.config.timeouts.wait_for_text())
            .await?;
        let text = actor.read_text(selector).await?;
        Ok(StepOutcome::Text(text.trim().to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogInfo;

#[async_trait]
impl StepFragment for LogInfo {
    fn description(&self) -> &str {
        "Log `message` against the scenario and case reference"
    }

    async fn run(
        &self,
        _actor: &mut dyn Actor,
        ctx: &StepContext<'_>,
        args: &StepArgs,
    ) -> CaseflowResult<StepOutcome> {
        let message = args.str("message")?;
        match ctx.case_ref() {
            Ok(case_ref) => info!(scenario = ctx.scenario, case_ref = %case_ref, "{message}"),
            Err(_) => info!(scenario = ctx.scenario, "{message}"),
        }
        Ok(StepOutcome::Done)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Wait;

#[async_trait]
impl StepFragment for Wait {
    fn description(&self) -> &str {
        "Pause for `secs` seconds"
    }

    async fn run(
        &self,
        actor: &mut dyn Actor,
        _ctx: &StepContext<'_>,
        args: &StepArgs,
    ) -> CaseflowResult<StepOutcome> {
        actor.pause(args.duration_or("secs", secs(1))?).await?;
        Ok(StepOutcome::Done)
    }
}
