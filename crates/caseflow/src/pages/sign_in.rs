//! IdAM sign-in and sign-out.

use super::common::{secs, IDAM_SUBMIT, REJECT_COOKIES_BUTTON, SIGN_OUT_LINK};
use crate::actor::Actor;
use crate::config::{Credentials, Role};
use crate::registry::{StepArgs, StepContext, StepFragment, StepOutcome};
use crate::result::CaseflowResult;
use async_trait::async_trait;
use std::time::Duration;

async fn sign_in(
    actor: &mut dyn Actor,
    ctx: &StepContext<'_>,
    credentials: &Credentials,
    delay: Duration,
) -> CaseflowResult<()> {
    let config = ctx.config;
    actor.navigate(&format!("{}/", config.base_url())).await?;
    actor.pause(secs(config.delays.manual_medium_secs)).await?;

    actor
        .wait_for_text("Sign in", config.timeouts.sign_in_page())
        .await?;
    actor
        .wait_for_text("Email address", config.timeouts.wait_for_text())
        .await?;
    actor
        .wait_for_text("Password", config.timeouts.wait_for_text())
        .await?;

    actor.fill_field("#username", &credentials.username).await?;
    actor.fill_field("#password", &credentials.password).await?;
    actor
        .wait_for_navigation(IDAM_SUBMIT, config.timeouts.navigation())
        .await?;
    actor.assert_absent("#username").await?;

    let _ = ctx.invoke(actor, "reject_cookies", &StepArgs::new()).await?;
    actor.pause(delay).await
}

/// Sign in as a configured role (`role`, default caseworker)
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthenticateWithIdam;

#[async_trait]
impl StepFragment for AuthenticateWithIdam {
    fn description(&self) -> &str {
        "Sign in through IdAM as the given role"
    }

    async fn run(
        &self,
        actor: &mut dyn Actor,
        ctx: &StepContext<'_>,
        args: &StepArgs,
    ) -> CaseflowResult<StepOutcome> {
        let role: Role = args.opt_str("role")?.unwrap_or("caseworker").parse()?;
        let delay = args.duration_or("delay", secs(ctx.config.delays.sign_in_secs))?;
        sign_in(actor, ctx, ctx.config.users.get(role), delay).await?;
        Ok(StepOutcome::Done)
    }
}

/// Sign in as one of the two share-a-case organisation users
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthenticateUserShareCase;

#[async_trait]
impl StepFragment for AuthenticateUserShareCase {
    fn description(&self) -> &str {
        "Sign in as the primary or secondary share-a-case user"
    }

    async fn run(
        &self,
        actor: &mut dyn Actor,
        ctx: &StepContext<'_>,
        args: &StepArgs,
    ) -> CaseflowResult<StepOutcome> {
        let role = if args.bool_or("primary", true)? {
            Role::SacPrimary
        } else {
            Role::SacSecondary
        };
        let delay = args.duration_or("delay", secs(ctx.config.delays.sign_in_secs))?;
        sign_in(actor, ctx, ctx.config.users.get(role), delay).await?;
        Ok(StepOutcome::Done)
    }
}

/// Dismiss the analytics cookie banner when it is shown
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectCookies;

#[async_trait]
impl StepFragment for RejectCookies {
    fn description(&self) -> &str {
        "Reject analytics cookies if the banner is shown"
    }

    async fn run(
        &self,
        actor: &mut dyn Actor,
        _ctx: &StepContext<'_>,
        _args: &StepArgs,
    ) -> CaseflowResult<StepOutcome> {
        if actor
            .assert_visible(REJECT_COOKIES_BUTTON, secs(2))
            .await
            .is_ok()
        {
            actor.click(REJECT_COOKIES_BUTTON).await?;
        }
        Ok(StepOutcome::Done)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SignOut;

#[async_trait]
impl StepFragment for SignOut {
    fn description(&self) -> &str {
        "Sign out and wait for the sign-in page"
    }

    async fn run(
        &self,
        actor: &mut dyn Actor,
        ctx: &StepContext<'_>,
        _args: &StepArgs,
    ) -> CaseflowResult<StepOutcome> {
        actor
            .wait_for_navigation(SIGN_OUT_LINK, ctx.config.timeouts.navigation())
            .await?;
        actor
            .wait_for_text("Sign in", ctx.config.timeouts.sign_in_page())
            .await?;
        Ok(StepOutcome::Done)
    }
}
