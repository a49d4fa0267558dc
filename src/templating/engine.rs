use crate::templating::Engine;
use crate::{Error, Result, DEFAULT_SORTABLE_TEMPLATE, DEFAULT_TEMPLATE};
use ::minijinja::Environment;
use ::serde_json::Value;

/// [`Engine`] backed by minijinja, preloaded with the default pagination
/// control and sortable link templates. Templates ending in `.html` are
/// auto-escaped.
#[derive(Debug)]
pub struct MiniJinjaEngine {
    env: Environment<'static>,
}

impl MiniJinjaEngine {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_template(DEFAULT_TEMPLATE, include_str!("../../templates/pagination/sliding.html"))
            .map_err(render_error)?;
        env.add_template(
            DEFAULT_SORTABLE_TEMPLATE,
            include_str!("../../templates/pagination/sortable_link.html"),
        )
        .map_err(render_error)?;
        Ok(Self { env })
    }

    /// Registers `source` under `name`, replacing any template of that name.
    pub fn add_template(&mut self, name: impl Into<String>, source: impl Into<String>) -> Result<&mut Self> {
        self.env
            .add_template_owned(name.into(), source.into())
            .map_err(render_error)?;
        Ok(self)
    }
}

impl Engine for MiniJinjaEngine {
    fn render(&self, template: &str, context: &Value) -> Result<String> {
        self.env
            .get_template(template)
            .and_then(|template| template.render(context))
            .map_err(render_error)
    }
}

fn render_error(err: ::minijinja::Error) -> Error {
    Error::Render(err.to_string())
}
