//! Case creation: the "Create case" link and the case-type filter page.

use super::common::{go_button_delay, secs, CCD_CREATE_CASE, SUBMIT_BUTTON, XUI_CREATE_CASE};
use crate::actor::Actor;
use crate::registry::{StepArgs, StepContext, StepFragment, StepOutcome};
use crate::result::CaseflowResult;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, Default)]
pub struct SelectNewCase;

#[async_trait]
impl StepFragment for SelectNewCase {
    fn description(&self) -> &str {
        "Open the create-case page (ExUI or legacy locator per the xui flag)"
    }

    async fn run(
        &self,
        actor: &mut dyn Actor,
        ctx: &StepContext<'_>,
        args: &StepArgs,
    ) -> CaseflowResult<StepOutcome> {
        let xui = args.bool_or("xui", ctx.config.flags.xui)?;
        let locator = if xui { XUI_CREATE_CASE } else { CCD_CREATE_CASE };
        actor
            .wait_for_text("Create case", ctx.config.timeouts.wait_for_text())
            .await?;
        actor.wait_for_navigation(locator, secs(120)).await?;
        Ok(StepOutcome::Done)
    }
}

/// Choose jurisdiction, case type and event, then start the event.
///
/// `jurisdiction` defaults to "Manage probate application".
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectCaseTypeOptions;

#[async_trait]
impl StepFragment for SelectCaseTypeOptions {
    fn description(&self) -> &str {
        "Pick jurisdiction, case type and event on the create-case page"
    }

    async fn run(
        &self,
        actor: &mut dyn Actor,
        ctx: &StepContext<'_>,
        args: &StepArgs,
    ) -> CaseflowResult<StepOutcome> {
        let timeouts = &ctx.config.timeouts;
        let jurisdiction = args
            .opt_str("jurisdiction")?
            .unwrap_or("Manage probate application");
        let case_type = args.str("case_type")?;
        let event = args.str("event")?;

        actor
            .wait_for_text("Create Case", timeouts.wait_for_text())
            .await?;
        actor
            .assert_visible("#cc-jurisdiction", timeouts.wait_for_text())
            .await?;
        actor.select_option("#cc-jurisdiction", jurisdiction).await?;
        actor
            .assert_visible("#cc-case-type", timeouts.wait_for_text())
            .await?;
        actor.select_option("#cc-case-type", case_type).await?;
        actor
            .assert_visible("#cc-event", timeouts.wait_for_text())
            .await?;
        actor.select_option("#cc-event", event).await?;

        go_button_delay(actor, ctx).await?;
        actor
            .wait_for_navigation(SUBMIT_BUTTON, timeouts.navigation())
            .await?;
        actor
            .pause(secs(ctx.config.delays.create_case_secs))
            .await?;
        Ok(StepOutcome::Done)
    }
}
