use tracing::{debug, error, info, warn};

use crate::client::FormApi;
use crate::config::Controls;
use crate::form::FormState;
use crate::payload::SelectionPayload;

/// Which view of the session is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Form,
    Confirmation,
    /// The processing response replaced the document; nothing else is handled.
    Replaced,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    UrlGenerated(String),
    /// The server answered without a usable `api_url`.
    NoUrl { error: Option<String> },
    Failed,
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// Markup that replaces the whole document.
    Replaced(String),
    Failed,
    Ignored,
}

/// Drives the form through Form -> Confirmation -> Replaced.
///
/// Every operation takes `&mut self`, so a request in flight holds the
/// session exclusively and a second submission cannot overlap it.
pub struct FormSession<A> {
    api: A,
    form: FormState,
    controls: Controls,
    view: View,
    last_url: Option<String>,
}

impl<A: FormApi> FormSession<A> {
    pub fn new(api: A, form: FormState, controls: Controls) -> Self {
        Self {
            api,
            form,
            controls,
            view: View::Form,
            last_url: None,
        }
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn last_url(&self) -> Option<&str> {
        self.last_url.as_deref()
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    /// Form edits are only accepted while the form is on screen.
    pub fn form_mut(&mut self) -> Option<&mut FormState> {
        (self.view == View::Form).then_some(&mut self.form)
    }

    pub fn controls(&self) -> Controls {
        self.controls
    }

    pub fn form_visible(&self) -> bool {
        self.view == View::Form
    }

    pub fn confirmation_visible(&self) -> bool {
        self.view == View::Confirmation
    }

    pub async fn submit(&mut self) -> SubmitOutcome {
        if self.view != View::Form {
            debug!(view = ?self.view, "submit ignored");
            return SubmitOutcome::Ignored;
        }

        let payload = self.form.to_payload();
        match self.api.generate_url(&payload).await {
            Ok(response) => match response.api_url {
                Some(api_url) if !api_url.is_empty() => {
                    info!(%api_url, "API URL generated");
                    self.last_url = Some(api_url.clone());
                    self.view = View::Confirmation;
                    SubmitOutcome::UrlGenerated(api_url)
                }
                _ => {
                    warn!(
                        error = response.error.as_deref().unwrap_or("<none>"),
                        "URL generation returned no api_url"
                    );
                    SubmitOutcome::NoUrl {
                        error: response.error,
                    }
                }
            },
            Err(e) => {
                error!("URL generation failed: {}", e);
                SubmitOutcome::Failed
            }
        }
    }

    pub async fn confirm(&mut self) -> ConfirmOutcome {
        if self.view != View::Confirmation || !self.controls.confirm {
            debug!(view = ?self.view, "confirm ignored");
            return ConfirmOutcome::Ignored;
        }
        let Some(api_url) = self.last_url.as_deref() else {
            return ConfirmOutcome::Ignored;
        };

        let payload = self.confirmation_payload(api_url);
        match self.api.process_data(&payload).await {
            Ok(html) => {
                info!(bytes = html.len(), "processing returned replacement document");
                self.view = View::Replaced;
                ConfirmOutcome::Replaced(html)
            }
            Err(e) => {
                error!("processing request failed: {}", e);
                ConfirmOutcome::Failed
            }
        }
    }

    pub fn cancel(&mut self) -> bool {
        if self.view != View::Confirmation || !self.controls.cancel {
            debug!(view = ?self.view, "cancel ignored");
            return false;
        }
        self.view = View::Form;
        true
    }

    #[cfg(test)]
    pub(crate) fn api(&self) -> &A {
        &self.api
    }

    fn confirmation_payload(&self, api_url: &str) -> SelectionPayload {
        self.form.to_payload().with_api_url(api_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::{FakeApi, Reply};
    use crate::client::GenerateUrlResponse;
    use crate::config::FormDefaults;
    use crate::form::TABLE;
    use crate::payload::{API_URL, DATA_OPTION, SELECTED_VARIABLES, SELECT_VARIABLES};

    const URL: &str = "https://api.census.gov/data/2022/acs/acs5/profile?get=group(DP05)&for=state:*";

    fn session(api: FakeApi) -> FormSession<FakeApi> {
        FormSession::new(api, FormState::new(&FormDefaults::default()), Controls::default())
    }

    #[tokio::test]
    async fn starts_in_form_view() {
        let session = session(FakeApi::default());
        assert_eq!(session.view(), View::Form);
        assert!(session.form_visible());
        assert!(!session.confirmation_visible());
        assert_eq!(session.last_url(), None);
    }

    #[tokio::test]
    async fn generated_url_moves_to_confirmation() {
        let mut session = session(FakeApi::generating_url(URL));

        let outcome = session.submit().await;

        assert_eq!(outcome, SubmitOutcome::UrlGenerated(URL.to_string()));
        assert_eq!(session.last_url(), Some(URL));
        assert!(!session.form_visible());
        assert!(session.confirmation_visible());
    }

    #[tokio::test]
    async fn entire_table_submission_omits_variables() {
        let mut session = session(FakeApi::generating_url(URL));
        session
            .form_mut()
            .unwrap()
            .set_value(SELECTED_VARIABLES, "DP05_0001E");

        session.submit().await;

        let calls = session.api.generate_calls();
        assert_eq!(calls.len(), 1);
        assert!(!calls[0].contains_key(SELECTED_VARIABLES));
    }

    #[tokio::test]
    async fn variable_submission_carries_variables() {
        let mut session = session(FakeApi::generating_url(URL));
        let form = session.form_mut().unwrap();
        form.set_value(DATA_OPTION, SELECT_VARIABLES);
        form.set_value(SELECTED_VARIABLES, "DP05_0001E,DP05_0018E");

        session.submit().await;

        let calls = session.api.generate_calls();
        assert_eq!(calls[0].get(SELECTED_VARIABLES), Some("DP05_0001E,DP05_0018E"));
    }

    #[tokio::test]
    async fn error_response_changes_nothing() {
        let mut session = session(FakeApi::generating(GenerateUrlResponse {
            api_url: None,
            error: Some("bad request".to_string()),
        }));

        let outcome = session.submit().await;

        assert_eq!(
            outcome,
            SubmitOutcome::NoUrl {
                error: Some("bad request".to_string())
            }
        );
        assert_eq!(session.view(), View::Form);
        assert_eq!(session.last_url(), None);
    }

    #[tokio::test]
    async fn empty_url_is_treated_as_missing() {
        let mut session = session(FakeApi::generating_url(""));

        let outcome = session.submit().await;

        assert_eq!(outcome, SubmitOutcome::NoUrl { error: None });
        assert_eq!(session.view(), View::Form);
        assert_eq!(session.last_url(), None);
        assert_eq!(session.confirm().await, ConfirmOutcome::Ignored);
        assert!(session.api.process_calls().is_empty());
    }

    #[tokio::test]
    async fn transport_failure_changes_nothing() {
        let mut session = session(FakeApi::default());

        assert_eq!(session.submit().await, SubmitOutcome::Failed);
        assert_eq!(session.view(), View::Form);
        assert_eq!(session.last_url(), None);
    }

    #[tokio::test]
    async fn confirm_posts_payload_with_api_url() {
        let api = FakeApi::generating_url(URL)
            .then_processing(Reply::Ok("<html><body>done</body></html>".to_string()));
        let mut session = session(api);
        session.submit().await;
        let expected = session.form().to_payload().with_api_url(URL);

        let outcome = session.confirm().await;

        assert_eq!(
            outcome,
            ConfirmOutcome::Replaced("<html><body>done</body></html>".to_string())
        );
        assert_eq!(session.view(), View::Replaced);

        let calls = session.api.process_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], expected);
        assert_eq!(calls[0].get(API_URL), Some(URL));
    }

    #[tokio::test]
    async fn failed_confirm_stays_on_confirmation() {
        let api = FakeApi::generating_url(URL).then_processing(Reply::Fail);
        let mut session = session(api);
        session.submit().await;

        assert_eq!(session.confirm().await, ConfirmOutcome::Failed);
        assert_eq!(session.view(), View::Confirmation);
        assert_eq!(session.last_url(), Some(URL));
    }

    #[tokio::test]
    async fn server_error_body_still_replaces_document() {
        let body = r#"{"error": "HTTPError: 400 for census url"}"#;
        let api = FakeApi::generating_url(URL).then_processing(Reply::Ok(body.to_string()));
        let mut session = session(api);
        session.submit().await;

        assert_eq!(
            session.confirm().await,
            ConfirmOutcome::Replaced(body.to_string())
        );
        assert_eq!(session.view(), View::Replaced);
    }

    #[tokio::test]
    async fn cancel_returns_to_form_without_network() {
        let mut session = session(FakeApi::generating_url(URL));
        session.submit().await;
        assert!(session.form_mut().is_none());

        assert!(session.cancel());

        assert!(session.form_visible());
        assert!(!session.confirmation_visible());
        assert!(session.api.process_calls().is_empty());
        assert_eq!(session.api.generate_calls().len(), 1);
        assert_eq!(session.form().value(TABLE), Some("DP05"));
    }

    #[tokio::test]
    async fn actions_outside_their_view_are_ignored() {
        let mut session = session(FakeApi::default());

        assert_eq!(session.confirm().await, ConfirmOutcome::Ignored);
        assert!(!session.cancel());
        assert!(session.api.process_calls().is_empty());
    }

    #[tokio::test]
    async fn replaced_session_is_terminal() {
        let api = FakeApi::generating_url(URL).then_processing(Reply::Ok("<p>report</p>".to_string()));
        let mut session = session(api);
        session.submit().await;
        session.confirm().await;

        assert_eq!(session.submit().await, SubmitOutcome::Ignored);
        assert_eq!(session.confirm().await, ConfirmOutcome::Ignored);
        assert!(!session.cancel());
        assert!(session.form_mut().is_none());
        assert_eq!(session.view(), View::Replaced);
    }

    #[tokio::test]
    async fn disabled_controls_are_not_wired() {
        let controls = Controls {
            confirm: false,
            cancel: false,
        };
        let mut session = FormSession::new(
            FakeApi::generating_url(URL),
            FormState::new(&FormDefaults::default()),
            controls,
        );
        session.submit().await;

        assert_eq!(session.confirm().await, ConfirmOutcome::Ignored);
        assert!(!session.cancel());
        assert_eq!(session.view(), View::Confirmation);
    }
}
