//! End-to-end driver: secret -> decrypt -> parse -> validate -> core -> render.
pub mod collaborators;

pub use collaborators::{
    DecryptionError, Decryptor, JsonTreeParser, ParseError, Renderer, SchemaError, SchemaValidator,
    SecretNotFound, SecretStore, TreeParser,
};

use crate::config::SummaryConfig;
use crate::graph::BuildErrors;
use thiserror::Error;

/// Collaborator failures are passed through unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error(transparent)]
    Secret(#[from] SecretNotFound),
    #[error(transparent)]
    Decryption(#[from] DecryptionError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Build(#[from] BuildErrors),
}

pub struct Collaborators<'c> {
    pub secrets: &'c dyn SecretStore,
    pub decryptor: &'c dyn Decryptor,
    pub parser: &'c dyn TreeParser,
    pub validator: &'c dyn SchemaValidator,
    pub renderer: &'c dyn Renderer,
}

/// Produces the rendered report for an encrypted holdings document.
///
/// Holdings that cannot be computed do not fail the run; they are part of the
/// report handed to the renderer.
pub fn summarize(ciphertext: &[u8], collaborators: &Collaborators<'_>, config: &SummaryConfig) -> Result<String, PipelineError> {
    let passphrase = collaborators.secrets.get_secret(&config.passphrase_secret)?;
    let plaintext = collaborators.decryptor.decrypt(ciphertext, &passphrase)?;
    let tree = collaborators.parser.parse(&plaintext)?;
    let tree = collaborators.validator.validate(tree)?;

    let (report, _) = crate::build_and_aggregate_with(&tree, config)?;
    Ok(collaborators.renderer.render(&report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportModel;
    use serde_json::Value;
    use std::cell::RefCell;

    struct Secrets;
    impl SecretStore for Secrets {
        fn get_secret(&self, name: &str) -> Result<String, SecretNotFound> {
            match name {
                "networth" => Ok("hunter2".into()),
                other => Err(SecretNotFound(other.into())),
            }
        }
    }

    /// "Decrypts" by checking the passphrase and passing the bytes through.
    struct PlainDecryptor;
    impl Decryptor for PlainDecryptor {
        fn decrypt(&self, ciphertext: &[u8], passphrase: &str) -> Result<String, DecryptionError> {
            if passphrase != "hunter2" {
                return Err(DecryptionError("bad passphrase".into()));
            }
            String::from_utf8(ciphertext.to_vec()).map_err(|e| DecryptionError(e.to_string()))
        }
    }

    struct AcceptAll;
    impl SchemaValidator for AcceptAll {
        fn validate(&self, tree: Value) -> Result<Value, SchemaError> { Ok(tree) }
    }

    struct RejectAll;
    impl SchemaValidator for RejectAll {
        fn validate(&self, _: Value) -> Result<Value, SchemaError> {
            Err(SchemaError { violations: vec!["a".into(), "b".into()] })
        }
    }

    #[derive(Default)]
    struct Capture(RefCell<Option<ReportModel>>);
    impl Renderer for Capture {
        fn render(&self, report: &ReportModel) -> String {
            *self.0.borrow_mut() = Some(report.clone());
            format!("total {}", report.total())
        }
    }

    const DOC: &[u8] = br#"{ "institutions": { "Bank": { "accounts": { "Main": { "holdings": {
        "Cash": "$1,000", "Debt": "-200 USD", "Bad": "Cash + Ghost"
    }}}}}}"#;

    fn run(doc: &[u8], validator: &dyn SchemaValidator, config: &SummaryConfig) -> (Result<String, PipelineError>, Capture) {
        let renderer = Capture::default();
        let collaborators = Collaborators {
            secrets: &Secrets,
            decryptor: &PlainDecryptor,
            parser: &JsonTreeParser,
            validator,
            renderer: &renderer,
        };
        let result = summarize(doc, &collaborators, config);
        (result, renderer)
    }

    #[test]
    fn test_summarize_renders_report_with_unresolved_holdings() {
        let (result, renderer) = run(DOC, &AcceptAll, &SummaryConfig::default());
        assert_eq!(result.unwrap(), "total 800 USD");
        let report = renderer.0.into_inner().unwrap();
        assert_eq!(report.unresolved.len(), 1);
        assert_eq!(report.unresolved[0].holding, "Bank:Main:Bad");
    }

    #[test]
    fn test_collaborator_errors_pass_through() {
        let config = SummaryConfig { passphrase_secret: "missing".into(), ..Default::default() };
        let (result, _) = run(DOC, &AcceptAll, &config);
        assert_eq!(result.unwrap_err(), PipelineError::Secret(SecretNotFound("missing".into())));

        let (result, renderer) = run(DOC, &RejectAll, &SummaryConfig::default());
        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "schema violations: a; b");
        assert!(renderer.0.into_inner().is_none());

        let (result, _) = run(b"{ not json", &AcceptAll, &SummaryConfig::default());
        assert!(matches!(result, Err(PipelineError::Parse(ParseError { line: 1, .. }))));

        let (result, _) = run(br#"{ "institutions": { "Bank": {} } }"#, &AcceptAll, &SummaryConfig::default());
        assert!(matches!(result, Err(PipelineError::Build(_))));
    }
}
