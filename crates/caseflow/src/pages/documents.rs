use super::common::{secs, CONTINUE_BUTTON};
use crate::actor::Actor;
use crate::registry::{StepArgs, StepContext, StepFragment, StepOutcome};
use crate::result::CaseflowResult;
use async_trait::async_trait;
use std::path::PathBuf;

const ADD_NEW: &str = "//button[normalize-space()=\"Add new\"]";
const DOCUMENT_TYPE: &str = "#boDocumentsUploaded_0_DocumentType";
const DOCUMENT_LINK: &str = "#boDocumentsUploaded_0_DocumentLink";
const COMMENT: &str = "#boDocumentsUploaded_0_Comment";

/// Attach one document on the upload-documents event page.
///
/// `file` defaults to the configured document fixture.
#[derive(Debug, Clone, Copy, Default)]
pub struct UploadDocument;

#[async_trait]
impl StepFragment for UploadDocument {
    fn description(&self) -> &str {
        "Upload a document with type and optional comment"
    }

    async fn run(
        &self,
        actor: &mut dyn Actor,
        ctx: &StepContext<'_>,
        args: &StepArgs,
    ) -> CaseflowResult<StepOutcome> {
        let config = ctx.config;
        let document_type = args.str("document_type")?;
        let file = args
            .opt_str("file")?
            .map_or_else(|| config.document_fixture.clone(), PathBuf::from);

        actor
            .assert_visible(ADD_NEW, config.timeouts.wait_for_text())
            .await?;
        actor.click(ADD_NEW).await?;
        actor
            .assert_visible(DOCUMENT_TYPE, config.timeouts.wait_for_text())
            .await?;
        actor.select_option(DOCUMENT_TYPE, document_type).await?;
        actor.upload_file(DOCUMENT_LINK, &file).await?;
        if let Some(comment) = args.opt_str("comment")? {
            actor.fill_field(COMMENT, comment).await?;
        }
        // Upload completes asynchronously after the file is attached.
        actor
            .pause(secs(config.delays.manual_medium_secs))
            .await?;
        actor
            .wait_for_navigation(CONTINUE_BUTTON, config.timeouts.navigation())
            .await?;
        Ok(StepOutcome::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::MockActor;
    use crate::config::CaseflowConfig;
    use crate::pages::standard_registry;

    #[tokio::test]
    async fn test_upload_defaults_to_fixture() {
        let registry = standard_registry().unwrap();
        let mut config = CaseflowConfig::default();
        config.document_fixture = PathBuf::from("fixtures/will.pdf");
        let ctx = StepContext::new(&config, "s", None, &registry);
        let mut actor = MockActor::new();
        let _ = registry
            .invoke(
                &mut actor,
                &ctx,
                "upload_document",
                &StepArgs::new()
                    .with("document_type", "Email")
                    .with("comment", "test file"),
            )
            .await
            .unwrap();
        assert!(actor.was_called(&format!("upload_file:{DOCUMENT_LINK}=fixtures/will.pdf")));
        assert_eq!(actor.fields[COMMENT], "test file");
        assert_eq!(actor.selections[DOCUMENT_TYPE], "Email");
    }
}
