//! Case events: choosing the next step, completing and submitting it.
//!
//! `enter_event_summary`, `check_my_answers` and `change_state` submit an
//! event and may move the case to a new state, so each must be followed by
//! `see_end_state` in a scenario.

use super::common::{go_button_delay, submit, yes_no, CONTINUE_BUTTON, GO_BUTTON, NEXT_STEP_SELECT};
use crate::actor::Actor;
use crate::registry::{StepArgs, StepContext, StepFragment, StepKind, StepOutcome};
use crate::result::CaseflowResult;
use async_trait::async_trait;

/// Pick `next_step` from the case's event list and press Go
#[derive(Debug, Clone, Copy, Default)]
pub struct ChooseNextStep;

#[async_trait]
impl StepFragment for ChooseNextStep {
    fn description(&self) -> &str {
        "Choose the next event for the case and press Go"
    }

    async fn run(
        &self,
        actor: &mut dyn Actor,
        ctx: &StepContext<'_>,
        args: &StepArgs,
    ) -> CaseflowResult<StepOutcome> {
        let timeouts = &ctx.config.timeouts;
        let next_step = args.str("next_step")?;
        actor
            .assert_visible(NEXT_STEP_SELECT, timeouts.wait_for_text())
            .await?;
        actor.select_option(NEXT_STEP_SELECT, next_step).await?;
        go_button_delay(actor, ctx).await?;
        actor
            .wait_for_navigation(GO_BUTTON, timeouts.navigation())
            .await?;
        Ok(StepOutcome::Done)
    }
}

/// Complete one page of a case-data form and press Continue.
///
/// `clicks` run first in the given order, since radio answers often reveal
/// further inputs; then `selects` and `fields` (selector to value) are applied.
#[derive(Debug, Clone, Copy, Default)]
pub struct FillCasePage;

#[async_trait]
impl StepFragment for FillCasePage {
    fn description(&self) -> &str {
        "Click, select and fill the given inputs of a form page, then Continue"
    }

    async fn run(
        &self,
        actor: &mut dyn Actor,
        ctx: &StepContext<'_>,
        args: &StepArgs,
    ) -> CaseflowResult<StepOutcome> {
        let timeouts = &ctx.config.timeouts;
        if let Some(heading) = args.opt_str("heading")? {
            actor.wait_for_text(heading, timeouts.wait_for_text()).await?;
        }
        for selector in args.list("clicks")? {
            actor.click(&selector).await?;
        }
        for (selector, option) in args.map("selects")? {
            actor.select_option(&selector, &option).await?;
        }
        for (selector, value) in args.map("fields")? {
            actor.fill_field(&selector, &value).await?;
        }
        actor
            .wait_for_navigation(CONTINUE_BUTTON, timeouts.navigation())
            .await?;
        Ok(StepOutcome::Done)
    }
}

/// Fill the event summary page and submit the event
#[derive(Debug, Clone, Copy, Default)]
pub struct EnterEventSummary;

#[async_trait]
impl StepFragment for EnterEventSummary {
    fn kind(&self) -> StepKind {
        StepKind::Transition
    }

    fn description(&self) -> &str {
        "Enter event summary and description, then submit"
    }

    async fn run(
        &self,
        actor: &mut dyn Actor,
        ctx: &StepContext<'_>,
        args: &StepArgs,
    ) -> CaseflowResult<StepOutcome> {
        let summary = args.opt_str("summary")?.unwrap_or("Summary");
        let description = args.opt_str("description")?.unwrap_or("Description");
        actor
            .wait_for_text("Event summary", ctx.config.timeouts.wait_for_text())
            .await?;
        if let Ok(case_ref) = ctx.case_ref() {
            actor
                .wait_for_text(case_ref.as_str(), ctx.config.timeouts.wait_for_text())
                .await?;
        }
        actor.fill_field("#field-trigger-summary", summary).await?;
        actor
            .fill_field("#field-trigger-description", description)
            .await?;
        submit(actor, ctx).await?;
        Ok(StepOutcome::Done)
    }
}

/// Submit from the check-your-answers page
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckMyAnswers;

#[async_trait]
impl StepFragment for CheckMyAnswers {
    fn kind(&self) -> StepKind {
        StepKind::Transition
    }

    fn description(&self) -> &str {
        "Confirm the check-your-answers page and submit"
    }

    async fn run(
        &self,
        actor: &mut dyn Actor,
        ctx: &StepContext<'_>,
        args: &StepArgs,
    ) -> CaseflowResult<StepOutcome> {
        actor
            .wait_for_text("Check your answers", ctx.config.timeouts.wait_for_text())
            .await?;
        if let Some(next_step) = args.opt_str("next_step")? {
            actor
                .wait_for_text(next_step, ctx.config.timeouts.wait_for_text())
                .await?;
        }
        submit(actor, ctx).await?;
        Ok(StepOutcome::Done)
    }
}

/// Move the case to `state` through the change-state event
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeState;

#[async_trait]
impl StepFragment for ChangeState {
    fn kind(&self) -> StepKind {
        StepKind::Transition
    }

    fn description(&self) -> &str {
        "Transfer the case to another state"
    }

    async fn run(
        &self,
        actor: &mut dyn Actor,
        ctx: &StepContext<'_>,
        args: &StepArgs,
    ) -> CaseflowResult<StepOutcome> {
        let state = args.str("state")?;
        actor
            .assert_visible("#transferToState", ctx.config.timeouts.wait_for_text())
            .await?;
        actor.select_option("#transferToState", state).await?;
        submit(actor, ctx).await?;
        Ok(StepOutcome::Done)
    }
}

/// Answer the mark-as-ready-for-examination page
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkForExamination;

#[async_trait]
impl StepFragment for MarkForExamination {
    fn description(&self) -> &str {
        "Mark the case ready for examination (email_notification, default yes)"
    }

    async fn run(
        &self,
        actor: &mut dyn Actor,
        ctx: &StepContext<'_>,
        args: &StepArgs,
    ) -> CaseflowResult<StepOutcome> {
        let email = args.bool_or("email_notification", true)?;
        let field = "boEmailDocsReceivedNotification";
        actor
            .assert_visible(&format!("#{field}"), ctx.config.timeouts.wait_for_text())
            .await?;
        actor.click(&yes_no(field, email)).await?;
        actor
            .wait_for_navigation(CONTINUE_BUTTON, ctx.config.timeouts.navigation())
            .await?;
        Ok(StepOutcome::Done)
    }
}

/// Answer the examination checklist for mark-as-ready-to-issue
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkForIssue;

#[async_trait]
impl StepFragment for MarkForIssue {
    fn description(&self) -> &str {
        "Complete the examination checklist (checklist, default yes)"
    }

    async fn run(
        &self,
        actor: &mut dyn Actor,
        ctx: &StepContext<'_>,
        args: &StepArgs,
    ) -> CaseflowResult<StepOutcome> {
        let answer = args.bool_or("checklist", true)?;
        actor
            .wait_for_text("Examination checklist", ctx.config.timeouts.wait_for_text())
            .await?;
        for field in ["boExaminationChecklistQ1", "boExaminationChecklistQ2"] {
            actor.click(&yes_no(field, answer)).await?;
        }
        actor
            .wait_for_navigation(CONTINUE_BUTTON, ctx.config.timeouts.navigation())
            .await?;
        Ok(StepOutcome::Done)
    }
}

/// Answer the issue-grant page
#[derive(Debug, Clone, Copy, Default)]
pub struct IssueGrant;

#[async_trait]
impl StepFragment for IssueGrant {
    fn description(&self) -> &str {
        "Issue the grant (bulk_print and email_notification, default yes)"
    }

    async fn run(
        &self,
        actor: &mut dyn Actor,
        ctx: &StepContext<'_>,
        args: &StepArgs,
    ) -> CaseflowResult<StepOutcome> {
        let bulk_print = args.bool_or("bulk_print", true)?;
        let email = args.bool_or("email_notification", true)?;
        actor
            .assert_visible("#boSendToBulkPrint", ctx.config.timeouts.wait_for_text())
            .await?;
        actor.click(&yes_no("boSendToBulkPrint", bulk_print)).await?;
        actor
            .click(&yes_no("boEmailGrantIssuedNotification", email))
            .await?;
        actor
            .wait_for_navigation(CONTINUE_BUTTON, ctx.config.timeouts.navigation())
            .await?;
        Ok(StepOutcome::Done)
    }
}
