//! Template handling for ccr
//!
//! Templates are Jinja-style text files referenced on the command line as
//! `source:destination` pairs. This crate provides:
//!
//! - [`TemplateSpec`]: parsing of `source:destination` references
//! - [`discover`]: the set of free variables a template references
//! - [`Renderer`]: strict or lenient rendering against a set of bindings
//! - [`RuntimeExtras`]: read-only host facts exposed to every template as `ccr_extras`

mod discovery;
mod extras;
mod render;
mod spec;

pub use discovery::discover;
pub use extras::{EXTRAS_GLOBAL, LOOPBACK_ADDR, RuntimeExtras};
pub use render::{RenderMode, Renderer};
pub use spec::TemplateSpec;

use thiserror::Error;

/// Error types for template parsing and rendering
#[derive(Debug, Error)]
pub enum TemplateError {
    /// A template reference was not of the form `source:destination`
    #[error("Invalid template reference '{reference}': expected exactly one ':' between non-empty source and destination")]
    InvalidSpec {
        /// The reference as given
        reference: String,
    },

    /// The template text could not be parsed
    #[error("Failed to parse template '{template}': {message}")]
    Syntax {
        /// Template name (usually the source path)
        template: String,
        /// Parser message
        message: String,
    },

    /// A referenced variable has no binding (strict mode only)
    #[error("Variable '{name}' is undefined in template '{template}'")]
    Undefined {
        /// Template name (usually the source path)
        template: String,
        /// The first unbound variable
        name: String,
    },

    /// Any other failure raised while rendering
    #[error("Failed to render template '{template}': {message}")]
    Render {
        /// Template name (usually the source path)
        template: String,
        /// Engine message
        message: String,
    },
}
