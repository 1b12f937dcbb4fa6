//! Locators and helpers shared by the back-office page fragments.

use crate::actor::Actor;
use crate::registry::StepContext;
use crate::result::CaseflowResult;
use std::time::Duration;

pub const SUBMIT_BUTTON: &str = "button[type=\"submit\"]";
pub const CONTINUE_BUTTON: &str = "//button[normalize-space()=\"Continue\"]";
pub const GO_BUTTON: &str = "//button[normalize-space()=\"Go\"]";
pub const SIGN_OUT_LINK: &str = "//a[normalize-space()=\"Sign out\"]";
pub const IDAM_SUBMIT: &str = "input[type=\"submit\"]";
pub const NEXT_STEP_SELECT: &str = "#next-step";
pub const REJECT_COOKIES_BUTTON: &str = "//button[normalize-space()=\"Reject analytics cookies\"]";

pub const XUI_CREATE_CASE: &str = "//a[contains(@href,\"/cases/case-filter\")]";
pub const CCD_CREATE_CASE: &str = "//a[@href=\"/create/case\"]";

/// Cell holding the end state in the History tab's event details
pub const END_STATE_CELL: &str =
    "//th[normalize-space()=\"End state\"]/following-sibling::td[1]";

pub fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

/// XPath for a case-detail tab by its label
pub fn tab(label: &str) -> String {
    format!("//div[@role=\"tab\"]/div[normalize-space()=\"{label}\"]")
}

/// Delay the back office needs before a Go/Submit click is accepted
pub async fn go_button_delay(actor: &mut dyn Actor, ctx: &StepContext<'_>) -> CaseflowResult<()> {
    actor
        .pause(secs(ctx.config.delays.caseworker_go_button_secs))
        .await
}

/// Wait for the submit button, then submit and wait for the next page
pub async fn submit(actor: &mut dyn Actor, ctx: &StepContext<'_>) -> CaseflowResult<()> {
    let timeouts = &ctx.config.timeouts;
    actor
        .assert_visible(SUBMIT_BUTTON, timeouts.wait_for_text())
        .await?;
    go_button_delay(actor, ctx).await?;
    actor
        .wait_for_navigation(SUBMIT_BUTTON, timeouts.navigation())
        .await
}

/// Yes/No radio button id as rendered by the case-data UI
pub fn yes_no(field: &str, yes: bool) -> String {
    format!("#{field}_{}", if yes { "Yes" } else { "No" })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_helpers() {
        assert_eq!(tab("History"), "//div[@role=\"tab\"]/div[normalize-space()=\"History\"]");
        assert_eq!(yes_no("boSendToBulkPrint", false), "#boSendToBulkPrint_No");
    }
}
