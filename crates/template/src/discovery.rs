//! Free variable discovery

use crate::render::base_environment;
use crate::{EXTRAS_GLOBAL, TemplateError};
use std::collections::BTreeSet;

/// Return the names of the free variables referenced by `source`.
///
/// Only top-level identifiers are reported (`{{ db.host }}` yields `db`).
/// Names bound inside the template (loop targets, `set` targets, macro
/// arguments) and the `ccr_extras` global are excluded. Nothing is evaluated.
///
/// # Errors
///
/// Returns [`TemplateError::Syntax`] if the template cannot be parsed.
pub fn discover(source: &str) -> Result<BTreeSet<String>, TemplateError> {
    let env = base_environment();
    let template = env
        .template_from_str(source)
        .map_err(|e| TemplateError::Syntax {
            template: "<discovery>".to_string(),
            message: e.to_string(),
        })?;

    Ok(template
        .undeclared_variables(false)
        .into_iter()
        .filter(|name| name != EXTRAS_GLOBAL)
        .collect())
}
