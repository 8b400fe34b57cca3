//! `docgen templates` command implementation.

use clap::Args;
use docgen_convert::TemplateStore;

use super::ConfigArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the templates command.
#[derive(Args)]
pub(crate) struct TemplatesArgs {
    #[command(flatten)]
    config: ConfigArgs,
}

impl TemplatesArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.config.load(None, None)?;
        let store = TemplateStore::new(&config.templates_resolved.dir);

        let templates = store.list()?;
        if templates.is_empty() {
            output.warning(&format!("No templates found in {}", store.dir().display()));
            return Ok(());
        }
        for template in templates {
            output.info(&format!("{}  {}", template.name, template.path.display()));
        }
        Ok(())
    }
}
