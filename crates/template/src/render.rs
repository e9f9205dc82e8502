//! Strict and lenient template rendering

use crate::{EXTRAS_GLOBAL, RuntimeExtras, TemplateError};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use minijinja::value::{Enumerator, Object};
use minijinja::{Environment, ErrorKind, UndefinedBehavior, Value, escape_formatter};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// How references to unbound variables are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// Fail on the first undefined variable
    #[default]
    Strict,
    /// Render undefined variables as empty text
    Lenient,
}

impl RenderMode {
    /// Lenient when `allow_undefined` is set, strict otherwise
    #[must_use]
    pub const fn from_allow_undefined(allow_undefined: bool) -> Self {
        if allow_undefined {
            Self::Lenient
        } else {
            Self::Strict
        }
    }

    const fn undefined_behavior(self) -> UndefinedBehavior {
        match self {
            Self::Strict => UndefinedBehavior::Strict,
            Self::Lenient => UndefinedBehavior::Chainable,
        }
    }
}

/// Environment shared by discovery and rendering: filters and whitespace
/// handling, no globals.
pub(crate) fn base_environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_keep_trailing_newline(true);
    env.add_filter("b64decode", b64decode);
    env
}

fn b64decode(value: &str) -> Result<String, minijinja::Error> {
    let bytes = STANDARD.decode(value.trim()).map_err(|e| {
        minijinja::Error::new(
            ErrorKind::InvalidOperation,
            format!("b64decode: invalid base64 input: {e}"),
        )
    })?;
    String::from_utf8(bytes).map_err(|e| {
        minijinja::Error::new(
            ErrorKind::InvalidOperation,
            format!("b64decode: decoded value is not UTF-8: {e}"),
        )
    })
}

/// Globals the engine resolves when the bindings have no such name
const ENGINE_GLOBALS: [&str; 5] = ["range", "dict", "namespace", "debug", EXTRAS_GLOBAL];

/// Template context that remembers which names it was asked for but did
/// not have.
///
/// The engine consults the context before its globals, so misses for
/// [`ENGINE_GLOBALS`] are not recorded.
#[derive(Debug)]
struct Bindings {
    values: BTreeMap<String, Value>,
    misses: Mutex<Vec<String>>,
}

impl Bindings {
    fn last_miss(&self) -> Option<String> {
        self.misses.lock().ok()?.last().cloned()
    }
}

impl Object for Bindings {
    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        let name = key.as_str()?;
        if let Some(value) = self.values.get(name) {
            return Some(value.clone());
        }
        if !ENGINE_GLOBALS.contains(&name)
            && let Ok(mut misses) = self.misses.lock()
        {
            misses.push(name.to_string());
        }
        None
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        Enumerator::Values(self.values.keys().map(|k| Value::from(k.as_str())).collect())
    }
}

/// Renders templates against secret bindings.
///
/// The mode only switches the engine's undefined behavior; both modes share
/// the same lookup path, filters and extras.
pub struct Renderer {
    env: Environment<'static>,
    mode: RenderMode,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer").field("mode", &self.mode).finish()
    }
}

impl Renderer {
    /// Create a renderer with the given mode and runtime extras
    #[must_use]
    pub fn new(mode: RenderMode, extras: &RuntimeExtras) -> Self {
        let mut env = base_environment();
        env.set_undefined_behavior(mode.undefined_behavior());
        env.set_formatter(|out, state, value| {
            if value.is_none() {
                out.write_str("None")?;
                Ok(())
            } else {
                escape_formatter(out, state, value)
            }
        });
        env.add_global(EXTRAS_GLOBAL, Value::from_serialize(extras));
        Self { env, mode }
    }

    /// The configured mode
    #[must_use]
    pub const fn mode(&self) -> RenderMode {
        self.mode
    }

    /// Render `source` with `bindings`.
    ///
    /// `name` identifies the template in errors. A `None` binding renders as
    /// `None`. A binding named `ccr_extras` is ignored so the extras global
    /// stays visible.
    ///
    /// # Errors
    ///
    /// - [`TemplateError::Syntax`] if the template cannot be parsed
    /// - [`TemplateError::Undefined`] in strict mode when a referenced variable is unbound
    /// - [`TemplateError::Render`] for any other engine failure (e.g. bad `b64decode` input)
    pub fn render<'a, I>(&self, name: &str, source: &str, bindings: I) -> Result<String, TemplateError>
    where
        I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
    {
        let mut values = BTreeMap::new();
        for (key, value) in bindings {
            if key == EXTRAS_GLOBAL {
                tracing::warn!(
                    template = %name,
                    "Secret named '{EXTRAS_GLOBAL}' is shadowed by runtime extras"
                );
                continue;
            }
            values.insert(key.to_string(), value.map_or_else(|| Value::from(()), Value::from));
        }
        let bindings = Arc::new(Bindings {
            values,
            misses: Mutex::new(Vec::new()),
        });

        let template = self
            .env
            .template_from_str(source)
            .map_err(|e| TemplateError::Syntax {
                template: name.to_string(),
                message: e.to_string(),
            })?;

        template
            .render(Value::from_dyn_object(Arc::clone(&bindings)))
            .map_err(|err| {
                // rendering stops at the failing lookup, so it is the last miss
                if err.kind() == ErrorKind::UndefinedError
                    && let Some(missing) = bindings.last_miss()
                {
                    return TemplateError::Undefined {
                        template: name.to_string(),
                        name: missing,
                    };
                }
                TemplateError::Render {
                    template: name.to_string(),
                    message: err.to_string(),
                }
            })
    }
}
