//! Keycloak login page parsing
//!
//! The portal has no API contract for its login flow; the connector works
//! against the rendered HTML. Any deviation from the expected page shape is a
//! contract violation: it means the portal changed and no recovery is
//! possible from inside this process.

use impfbot_domain::{ImpfbotError, Result};
use scraper::{Html, Selector};

/// Outcome of inspecting a login response for error blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LoginFailure {
    /// The feedback text matched the portal's invalid-credentials message
    /// exactly.
    InvalidCredentials,
    /// Some other error block; carries the block's text.
    Rejected(String),
}

fn selector(css: &'static str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|err| ImpfbotError::Contract(format!("invalid selector [{css}]: {err}")))
}

fn element_text(element: scraper::ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Locate the login form on the authorization page and return its submission
/// target.
pub(crate) fn form_action(html: &str, expected_title: &str) -> Result<String> {
    let document = Html::parse_document(html);

    let title = document
        .select(&selector("title")?)
        .next()
        .map(element_text)
        .ok_or_else(|| ImpfbotError::Contract("login page has no title".to_string()))?;
    if title != expected_title {
        return Err(ImpfbotError::Contract(format!(
            "unexpected login page title [{title}], expected [{expected_title}]"
        )));
    }

    let form = document
        .select(&selector("form#kc-form-login")?)
        .next()
        .ok_or_else(|| ImpfbotError::Contract("login form not found on login page".to_string()))?;

    form.value()
        .attr("action")
        .map(str::to_string)
        .ok_or_else(|| ImpfbotError::Contract("login form has no action".to_string()))
}

/// Inspect a login response for error blocks.
///
/// `Ok(None)` means no error block was rendered and the caller may proceed to
/// code extraction.
pub(crate) fn login_failure(
    html: &str,
    invalid_credentials_text: &str,
) -> Result<Option<LoginFailure>> {
    let document = Html::parse_document(html);

    let errors: Vec<String> =
        document.select(&selector("div.alert.alert-error")?).map(element_text).collect();
    if errors.is_empty() {
        return Ok(None);
    }

    let feedback = document.select(&selector("span.kc-feedback-text")?).next().map(element_text);
    if feedback.as_deref() == Some(invalid_credentials_text) {
        return Ok(Some(LoginFailure::InvalidCredentials));
    }

    Ok(Some(LoginFailure::Rejected(errors.join("; "))))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TITLE: &str = "Anmeldung bei C19V-Citizen";
    const INVALID_CREDENTIALS: &str = "Ungültiger Benutzername oder Passwort.";

    fn login_page(action: &str) -> String {
        format!(
            r#"<html><head><title>{TITLE}</title></head>
            <body><form id="kc-form-login" action="{action}" method="post"></form></body></html>"#
        )
    }

    #[test]
    fn reads_the_form_action() {
        let action = form_action(&login_page("https://portal.test/login"), TITLE)
            .expect("well-formed page");
        assert_eq!(action, "https://portal.test/login");
    }

    #[test]
    fn rejects_an_unexpected_title() {
        let html = login_page("https://portal.test/login").replace(TITLE, "Under maintenance");
        let err = form_action(&html, TITLE).expect_err("wrong title");
        assert!(matches!(err, ImpfbotError::Contract(_)));
    }

    #[test]
    fn rejects_a_page_without_the_login_form() {
        let html = format!("<html><head><title>{TITLE}</title></head><body></body></html>");
        let err = form_action(&html, TITLE).expect_err("no form");
        assert!(matches!(err, ImpfbotError::Contract(_)));
    }

    #[test]
    fn rejects_a_form_without_an_action() {
        let html = format!(
            r#"<html><head><title>{TITLE}</title></head>
            <body><form id="kc-form-login"></form></body></html>"#
        );
        let err = form_action(&html, TITLE).expect_err("no action");
        assert!(matches!(err, ImpfbotError::Contract(_)));
    }

    #[test]
    fn a_clean_response_reports_no_failure() {
        let outcome =
            login_failure("<html><body>redirecting</body></html>", INVALID_CREDENTIALS)
                .expect("parseable");
        assert_eq!(outcome, None);
    }

    #[test]
    fn the_exact_feedback_text_means_invalid_credentials() {
        let html = format!(
            r#"<div class="alert alert-error">
                <span class="kc-feedback-text">{INVALID_CREDENTIALS}</span>
            </div>"#
        );
        let outcome = login_failure(&html, INVALID_CREDENTIALS).expect("parseable");
        assert_eq!(outcome, Some(LoginFailure::InvalidCredentials));
    }

    #[test]
    fn any_other_error_block_is_a_generic_rejection() {
        let html = r#"<div class="alert alert-error">
            <span class="kc-feedback-text">Account is temporarily locked.</span>
        </div>"#;
        let outcome = login_failure(html, INVALID_CREDENTIALS).expect("parseable");
        assert_eq!(
            outcome,
            Some(LoginFailure::Rejected("Account is temporarily locked.".to_string()))
        );
    }

    #[test]
    fn an_error_block_without_feedback_is_a_generic_rejection() {
        let html = r#"<div class="alert alert-error">Something went wrong</div>"#;
        let outcome = login_failure(html, INVALID_CREDENTIALS).expect("parseable");
        assert_eq!(outcome, Some(LoginFailure::Rejected("Something went wrong".to_string())));
    }
}
