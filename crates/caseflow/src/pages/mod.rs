//! Standard page fragments for the probate back-office.
//!
//! Each sub-module owns one functional area of the UI. Fragments are
//! registered under `pages.<area>` with snake_case step names.

pub mod common;

mod case_details;
mod case_progress;
mod documents;
mod new_case;
mod share_case;
mod sign_in;
mod utility;

pub use case_details::{DontSeeCaseDetails, NavigateToCase, SeeCaseDetails, SeeEndState};
pub use case_progress::{
    ChangeState, CheckMyAnswers, ChooseNextStep, EnterEventSummary, FillCasePage, IssueGrant,
    MarkForExamination, MarkForIssue,
};
pub use documents::UploadDocument;
pub use new_case::{SelectCaseTypeOptions, SelectNewCase};
pub use share_case::{ShareCaseSelection, VerifyShareCaseRemoved};
pub use sign_in::{AuthenticateUserShareCase, AuthenticateWithIdam, RejectCookies, SignOut};
pub use utility::{GetCaseRefFromUrl, GrabText, LogInfo, Wait};

use crate::registry::{StepModule, StepRegistry};
use crate::result::CaseflowResult;

/// The standard fragment modules, grouped by area
#[must_use]
pub fn standard_modules() -> Vec<StepModule> {
    vec![StepModule::new("pages")
        .module(
            StepModule::new("sign_in")
                .step("authenticate_with_idam", AuthenticateWithIdam)
                .step("authenticate_user_share_case", AuthenticateUserShareCase)
                .step("reject_cookies", RejectCookies)
                .step("sign_out", SignOut),
        )
        .module(
            StepModule::new("new_case")
                .step("select_new_case", SelectNewCase)
                .step("select_case_type_options", SelectCaseTypeOptions),
        )
        .module(
            StepModule::new("case_progress")
                .step("choose_next_step", ChooseNextStep)
                .step("fill_case_page", FillCasePage)
                .step("enter_event_summary", EnterEventSummary)
                .step("check_my_answers", CheckMyAnswers)
                .step("change_state", ChangeState)
                .step("mark_for_examination", MarkForExamination)
                .step("mark_for_issue", MarkForIssue)
                .step("issue_grant", IssueGrant),
        )
        .module(
            StepModule::new("case_details")
                .step("see_end_state", SeeEndState)
                .step("see_case_details", SeeCaseDetails)
                .step("dont_see_case_details", DontSeeCaseDetails)
                .step("navigate_to_case", NavigateToCase),
        )
        .module(StepModule::new("documents").step("upload_document", UploadDocument))
        .module(
            StepModule::new("share_case")
                .step("share_case_selection", ShareCaseSelection)
                .step("verify_share_case_removed", VerifyShareCaseRemoved),
        )
        .module(
            StepModule::new("utility")
                .step("get_case_ref_from_url", GetCaseRefFromUrl)
                .step("grab_text", GrabText)
                .step("log_info", LogInfo)
                .step("wait", Wait),
        )]
}

/// Registry of every standard fragment
pub fn standard_registry() -> CaseflowResult<StepRegistry> {
    StepRegistry::build(standard_modules())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::StepKind;
    use crate::scenario::{CASE_REF_STEP, END_STATE_STEP};

    #[test]
    fn test_standard_registry_builds() {
        let registry = standard_registry().unwrap();
        assert_eq!(registry.len(), 25);
        assert_eq!(registry.kind(END_STATE_STEP).unwrap(), StepKind::StateCheck);
        assert_eq!(
            registry.kind(CASE_REF_STEP).unwrap(),
            StepKind::ExtractCaseReference
        );
        assert_eq!(registry.kind("grab_text").unwrap(), StepKind::ExtractText);
    }

    #[test]
    fn test_areas_are_nested() {
        let registry = standard_registry().unwrap();
        assert_eq!(registry.area("upload_document"), Some("pages.documents"));
        assert_eq!(registry.area("sign_out"), Some("pages.sign_in"));
    }

    #[test]
    fn test_fragments_are_debuggable() {
        assert_eq!(format!("{SeeEndState:?}"), "SeeEndState");
        assert_eq!(format!("{:?}", GrabText), "GrabText");
        let modules = format!("{:?}", standard_modules());
        assert!(modules.contains("share_case_selection"));
    }

    #[test]
    fn test_every_step_is_described() {
        let registry = standard_registry().unwrap();
        for descriptor in registry.descriptors() {
            assert!(!descriptor.description.is_empty(), "{}", descriptor.name);
        }
    }

    #[test]
    fn test_registering_twice_is_rejected() {
        let modules = standard_modules().into_iter().chain(standard_modules());
        assert!(StepRegistry::build(modules).is_err());
    }
}
