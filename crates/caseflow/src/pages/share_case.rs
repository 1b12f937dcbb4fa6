//! Share a case with another organisation user, and verify removal.

use super::common::{secs, CONTINUE_BUTTON, SIGN_OUT_LINK};
use crate::actor::Actor;
use crate::case::CaseReference;
use crate::registry::{StepArgs, StepContext, StepFragment, StepOutcome};
use crate::result::CaseflowResult;
use async_trait::async_trait;

const CASE_REFERENCE_HEADER: &str = "//div[normalize-space()=\"Case reference\"]";
const SHARE_BUTTON: &str = "#btn-share-button";
const ADD_USER_INPUT: &str = "#add-user input";
const ADD_USER_BUTTON: &str = "#btn-add-user";
const CONFIRM_BUTTON: &str = "//button[normalize-space()=\"Confirm\"]";

fn case_checkbox(case_ref: &CaseReference) -> String {
    format!("//input[@id=\"select-{}\"]", case_ref.compact())
}

async fn open_case_list(actor: &mut dyn Actor, ctx: &StepContext<'_>) -> CaseflowResult<()> {
    actor.wait_for_text("Your cases", secs(20)).await?;
    actor
        .pause(secs(ctx.config.delays.create_case_secs))
        .await?;
    actor.click(CASE_REFERENCE_HEADER).await?;
    actor.pause(secs(2)).await
}

/// Share the captured case with the user whose email is `email`
#[derive(Debug, Clone, Copy, Default)]
pub struct ShareCaseSelection;

#[async_trait]
impl StepFragment for ShareCaseSelection {
    fn description(&self) -> &str {
        "Share the captured case with another user by email"
    }

    async fn run(
        &self,
        actor: &mut dyn Actor,
        ctx: &StepContext<'_>,
        args: &StepArgs,
    ) -> CaseflowResult<StepOutcome> {
        let timeouts = &ctx.config.timeouts;
        let case_ref = ctx.case_ref()?;
        let email = args.str("email")?;

        open_case_list(actor, ctx).await?;
        actor.click(&case_checkbox(case_ref)).await?;
        actor
            .wait_for_navigation(SHARE_BUTTON, timeouts.navigation())
            .await?;
        actor
            .wait_for_text("Add recipient", timeouts.wait_for_text())
            .await?;
        actor.fill_field(ADD_USER_INPUT, email).await?;
        actor
            .click(&format!("//span[contains(normalize-space(),\"{email}\")]"))
            .await?;
        actor.click(ADD_USER_BUTTON).await?;
        actor
            .wait_for_navigation(CONTINUE_BUTTON, timeouts.navigation())
            .await?;
        actor
            .wait_for_text("Check and confirm", timeouts.wait_for_text())
            .await?;
        actor
            .wait_for_navigation(CONFIRM_BUTTON, timeouts.navigation())
            .await?;
        actor
            .wait_for_text("Your cases have been updated", timeouts.wait_for_text())
            .await?;
        Ok(StepOutcome::Done)
    }
}

/// Check the captured case no longer appears in the user's case list,
/// then sign out
#[derive(Debug, Clone, Copy, Default)]
pub struct VerifyShareCaseRemoved;

#[async_trait]
impl StepFragment for VerifyShareCaseRemoved {
    fn description(&self) -> &str {
        "Verify the captured case is no longer shared with this user"
    }

    async fn run(
        &self,
        actor: &mut dyn Actor,
        ctx: &StepContext<'_>,
        _args: &StepArgs,
    ) -> CaseflowResult<StepOutcome> {
        let case_ref = ctx.case_ref()?;
        open_case_list(actor, ctx).await?;
        actor.assert_absent(&case_checkbox(case_ref)).await?;
        actor.click(SIGN_OUT_LINK).await?;
        Ok(StepOutcome::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::MockActor;
    use crate::config::CaseflowConfig;
    use crate::pages::standard_registry;
    use crate::result::CaseflowError;

    #[tokio::test]
    async fn test_removal_check_uses_captured_case() {
        let registry = standard_registry().unwrap();
        let config = CaseflowConfig::default();
        let case_ref = CaseReference::parse("1111222233334444").unwrap();
        let ctx = StepContext::new(&config, "s", Some(&case_ref), &registry);

        let mut actor = MockActor::new().with_element("//input[@id=\"select-1111222233334444\"]");
        let err = registry
            .invoke(&mut actor, &ctx, "verify_share_case_removed", &StepArgs::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CaseflowError::ElementPresent { .. }));

        let mut actor = MockActor::new();
        let _ = registry
            .invoke(&mut actor, &ctx, "verify_share_case_removed", &StepArgs::new())
            .await
            .unwrap();
        assert_eq!(actor.history().last().unwrap(), &format!("click:{SIGN_OUT_LINK}"));
    }

    #[tokio::test]
    async fn test_share_requires_case_reference() {
        let registry = standard_registry().unwrap();
        let config = CaseflowConfig::default();
        let ctx = StepContext::new(&config, "s", None, &registry);
        let err = registry
            .invoke(
                &mut MockActor::new(),
                &ctx,
                "share_case_selection",
                &StepArgs::new().with("email", "sac2@test"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CaseflowError::MissingCaseReference));
    }
}
