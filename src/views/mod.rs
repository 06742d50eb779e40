//! Template rendering: dotted view paths resolved against a Tera instance,
//! with helpers injected into the template scope before the view's own
//! variables.

pub mod helpers;

use tera::{Context, Tera};

use crate::errors::{AppError, AppResult};

pub use helpers::{Helper, HelperCall, HelperRegistry};

pub const LAYOUT: &str = "layout.html";

pub struct Views {
    tera: Tera,
    helpers: HelperRegistry,
}

impl Views {
    pub fn load(glob: &str) -> AppResult<Self> {
        let tera = Tera::new(glob)?;
        Ok(Self::new(tera, HelperRegistry::default()))
    }

    pub fn new(tera: Tera, helpers: HelperRegistry) -> Self {
        Self { tera, helpers }
    }

    /// `posts.index` → `posts/index.html`
    pub fn file_for(path: &str) -> String {
        format!("{}.html", path.replace('.', "/"))
    }

    pub fn has_file(&self, file: &str) -> bool {
        self.tera.get_template_names().any(|name| name == file)
    }

    /// Renders the view at `path`. Helpers are built from the registry and
    /// injected first, so a view variable with the same name wins.
    pub fn require_view(
        &self,
        path: &str,
        vars: &Context,
        helpers: &[HelperCall],
        autoload: &[HelperCall],
    ) -> AppResult<String> {
        let file = Self::file_for(path);
        if !self.has_file(&file) {
            return Err(AppError::Internal(format!("Ne trouve pas la vue {}", file)));
        }

        let mut ctx = Context::new();
        for call in helpers.iter().chain(autoload) {
            self.helpers.build(call)?.inject(&mut ctx);
        }
        ctx.extend(vars.clone());

        Ok(self.tera.render(&file, &ctx)?)
    }

    /// Renders a template file as is, without helpers.
    pub fn render_file(&self, file: &str, ctx: &Context) -> AppResult<String> {
        Ok(self.tera.render(file, ctx)?)
    }
}
