use anyhow::Result;
use tracing::{debug, info};

use crate::{
    client::FormApi,
    document::DocumentRenderer,
    form::FormState,
    session::{ConfirmOutcome, FormSession, SubmitOutcome},
    ui::{UIState, UserAction, UI},
};

/// Interactive front end: maps key actions onto the form session and redraws.
pub struct App<A> {
    session: FormSession<A>,
    renderer: DocumentRenderer,
    ui: UI,
    current_state: UIState,
}

impl<A: FormApi> App<A> {
    pub fn new(session: FormSession<A>) -> Result<Self> {
        let current_state = UIState::Form {
            form: session.form().clone(),
            status: None,
        };
        Ok(Self {
            session,
            renderer: DocumentRenderer::new(),
            ui: UI::new()?,
            current_state,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        let result = self.main_loop().await;
        self.ui.cleanup()?;
        result
    }

    async fn main_loop(&mut self) -> Result<()> {
        self.ui.render(&self.current_state)?;

        loop {
            match self.ui.get_user_input(&self.current_state)? {
                UserAction::Quit => break,
                UserAction::NextField => self.edit_form(FormState::focus_next)?,
                UserAction::PrevField => self.edit_form(FormState::focus_prev)?,
                UserAction::NextOption => self.edit_form(|f| f.cycle_option(true))?,
                UserAction::PrevOption => self.edit_form(|f| f.cycle_option(false))?,
                UserAction::InputChar(c) => self.edit_form(|f| f.input_char(c))?,
                UserAction::Backspace => self.edit_form(FormState::backspace)?,
                UserAction::Submit => self.handle_submit().await?,
                UserAction::Confirm => self.handle_confirm().await?,
                UserAction::Cancel => self.handle_cancel()?,
                UserAction::ScrollUp => self.scroll(UI::scroll_up)?,
                UserAction::ScrollDown => self.scroll(UI::scroll_down)?,
                UserAction::PageUp => self.scroll(UI::page_up)?,
                UserAction::PageDown => self.scroll(UI::page_down)?,
                UserAction::PanLeft => self.scroll(UI::pan_left)?,
                UserAction::PanRight => self.scroll(UI::pan_right)?,
            }
        }

        info!(view = ?self.session.view(), "session closed");
        Ok(())
    }

    fn edit_form<F>(&mut self, edit: F) -> Result<()>
    where
        F: FnOnce(&mut FormState),
    {
        if let Some(form) = self.session.form_mut() {
            edit(form);
        }
        self.sync_state(None)
    }

    async fn handle_submit(&mut self) -> Result<()> {
        self.sync_state(Some("Generating API URL..."))?;

        match self.session.submit().await {
            SubmitOutcome::UrlGenerated(_) => {}
            outcome => debug!(?outcome, "form left unchanged"),
        }
        self.sync_state(None)
    }

    async fn handle_confirm(&mut self) -> Result<()> {
        self.sync_state(Some("Retrieving data..."))?;

        match self.session.confirm().await {
            ConfirmOutcome::Replaced(html) => {
                let document = self.renderer.render(&html);
                self.ui.reset_scroll();
                self.current_state = UIState::Document { document };
                self.ui.render(&self.current_state)
            }
            ConfirmOutcome::Failed | ConfirmOutcome::Ignored => self.sync_state(None),
        }
    }

    fn handle_cancel(&mut self) -> Result<()> {
        self.session.cancel();
        self.sync_state(None)
    }

    fn scroll(&mut self, step: fn(&mut UI)) -> Result<()> {
        step(&mut self.ui);
        self.ui.render(&self.current_state)
    }

    /// Rebuilds the screen from the session's view.
    fn sync_state(&mut self, status: Option<&str>) -> Result<()> {
        let status = status.map(str::to_string);
        // The document screen is installed by handle_confirm and never rebuilt.
        if self.session.form_visible() {
            self.current_state = UIState::Form {
                form: self.session.form().clone(),
                status,
            };
        } else if self.session.confirmation_visible() {
            self.current_state = UIState::Confirmation {
                api_url: self.session.last_url().unwrap_or_default().to_string(),
                controls: self.session.controls(),
                status,
            };
        }
        self.ui.render(&self.current_state)
    }
}
