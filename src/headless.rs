use anyhow::{anyhow, bail, Result};
use clap::Args;
use std::io::Write;

use crate::client::FormApi;
use crate::document::DocumentRenderer;
use crate::form::{ACS_TYPE, API_KEY, GEOGRAPHY, TABLE, YEAR};
use crate::payload::{DATA_OPTION, SELECTED_VARIABLES, SELECT_VARIABLES};
use crate::session::{ConfirmOutcome, FormSession, SubmitOutcome};

#[derive(Args, Debug, Default)]
pub struct GenerateArgs {
    /// ACS table id, e.g. DP05 or B01001
    #[arg(long)]
    pub table: Option<String>,

    /// Survey year (2009-2022)
    #[arg(long)]
    pub year: Option<String>,

    /// acs1 or acs5
    #[arg(long)]
    pub acs_type: Option<String>,

    /// Comma-separated variable codes; switches the request to variable selection
    #[arg(long)]
    pub variables: Option<String>,

    /// Census geography clause, e.g. "state:*"
    #[arg(long)]
    pub geography: Option<String>,

    /// Census API key
    #[arg(long, env = "ACSFORM_CENSUS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Also retrieve the data and print the returned document
    #[arg(long)]
    pub confirm: bool,

    /// Wrap width for the printed document
    #[arg(long, default_value_t = 100)]
    pub width: usize,
}

/// Runs the submission pipeline once without a terminal UI.
pub async fn run<A, W>(session: &mut FormSession<A>, args: &GenerateArgs, out: &mut W) -> Result<()>
where
    A: FormApi,
    W: Write,
{
    apply_args(session, args)?;

    let api_url = match session.submit().await {
        SubmitOutcome::UrlGenerated(url) => url,
        SubmitOutcome::NoUrl { error: Some(error) } => bail!("no API URL generated: {}", error),
        _ => bail!("no API URL generated"),
    };
    writeln!(out, "{}", api_url)?;

    if args.confirm {
        match session.confirm().await {
            ConfirmOutcome::Replaced(html) => {
                let document = DocumentRenderer::new().render(&html);
                writeln!(out)?;
                write!(out, "{}", document.to_plain_text(args.width))?;
            }
            _ => bail!("data retrieval failed for {}", api_url),
        }
    }

    Ok(())
}

fn apply_args<A: FormApi>(session: &mut FormSession<A>, args: &GenerateArgs) -> Result<()> {
    let form = session
        .form_mut()
        .ok_or_else(|| anyhow!("form is not editable"))?;

    let values = [
        (TABLE, args.table.as_deref()),
        (YEAR, args.year.as_deref()),
        (ACS_TYPE, args.acs_type.as_deref()),
        (DATA_OPTION, args.variables.as_ref().map(|_| SELECT_VARIABLES)),
        (SELECTED_VARIABLES, args.variables.as_deref()),
        (GEOGRAPHY, args.geography.as_deref()),
        (API_KEY, args.api_key.as_deref()),
    ];

    for (name, value) in values {
        if let Some(value) = value {
            if !form.set_value(name, value) {
                bail!("unsupported value for {}: {}", name, value);
            }
        }
    }
    Ok(())
}
