//! Case-detail verification: end state, tab contents, opening a case.

use super::common::{tab, END_STATE_CELL};
use crate::actor::Actor;
use crate::case::EndState;
use crate::registry::{StepArgs, StepContext, StepFragment, StepKind, StepOutcome};
use crate::result::CaseflowResult;
use async_trait::async_trait;

async fn open_tab(actor: &mut dyn Actor, ctx: &StepContext<'_>, label: &str) -> CaseflowResult<()> {
    let locator = tab(label);
    actor
        .assert_visible(&locator, ctx.config.timeouts.wait_for_text())
        .await?;
    actor.click(&locator).await
}

/// Assert the case's rendered end state equals `state` exactly
#[derive(Debug, Clone, Copy, Default)]
pub struct SeeEndState;

#[async_trait]
impl StepFragment for SeeEndState {
    fn kind(&self) -> StepKind {
        StepKind::StateCheck
    }

    fn description(&self) -> &str {
        "Assert the end state shown in the History tab (exact, case-sensitive)"
    }

    async fn run(
        &self,
        actor: &mut dyn Actor,
        ctx: &StepContext<'_>,
        args: &StepArgs,
    ) -> CaseflowResult<StepOutcome> {
        let expected = EndState::new(args.str("state")?);
        open_tab(actor, ctx, "History").await?;
        actor
            .assert_visible(END_STATE_CELL, ctx.config.timeouts.wait_for_text())
            .await?;
        let rendered = actor.read_text(END_STATE_CELL).await?;
        expected.verify(&rendered)?;
        Ok(StepOutcome::Done)
    }
}

/// Open `tab` and check each `fields` label and value is shown
#[derive(Debug, Clone, Copy, Default)]
pub struct SeeCaseDetails;

#[async_trait]
impl StepFragment for SeeCaseDetails {
    fn description(&self) -> &str {
        "Open a case tab and check the expected labels and values"
    }

    async fn run(
        &self,
        actor: &mut dyn Actor,
        ctx: &StepContext<'_>,
        args: &StepArgs,
    ) -> CaseflowResult<StepOutcome> {
        let timeout = ctx.config.timeouts.wait_for_text();
        let label = args.str("tab")?;
        let fields = args.map("fields")?;

        if let Ok(case_ref) = ctx.case_ref() {
            actor.wait_for_text(case_ref.as_str(), timeout).await?;
        }
        open_tab(actor, ctx, label).await?;
        for (field, value) in &fields {
            actor.wait_for_text(field, timeout).await?;
            if !value.is_empty() {
                actor.wait_for_text(value, timeout).await?;
            }
        }
        Ok(StepOutcome::Done)
    }
}

/// Open `tab` and check none of the `fields` labels is shown
#[derive(Debug, Clone, Copy, Default)]
pub struct DontSeeCaseDetails;

#[async_trait]
impl StepFragment for DontSeeCaseDetails {
    fn description(&self) -> &str {
        "Open a case tab and check the listed labels are absent"
    }

    async fn run(
        &self,
        actor: &mut dyn Actor,
        ctx: &StepContext<'_>,
        args: &StepArgs,
    ) -> CaseflowResult<StepOutcome> {
        let label = args.str("tab")?;
        let fields = args.list("fields")?;
        open_tab(actor, ctx, label).await?;
        for field in &fields {
            actor
                .assert_absent(&format!("//th[normalize-space()=\"{field}\"]"))
                .await?;
        }
        Ok(StepOutcome::Done)
    }
}

/// Open the captured case directly by URL
#[derive(Debug, Clone, Copy, Default)]
pub struct NavigateToCase;

#[async_trait]
impl StepFragment for NavigateToCase {
    fn description(&self) -> &str {
        "Open the captured case's detail page"
    }

    async fn run(
        &self,
        actor: &mut dyn Actor,
        ctx: &StepContext<'_>,
        _args: &StepArgs,
    ) -> CaseflowResult<StepOutcome> {
        let case_ref = ctx.case_ref()?;
        actor
            .navigate(&format!(
                "{}/cases/case-details/{}",
                ctx.config.base_url(),
                case_ref.compact()
            ))
            .await?;
        actor
            .wait_for_text(case_ref.as_str(), ctx.config.timeouts.navigation())
            .await?;
        Ok(StepOutcome::Done)
    }
}
