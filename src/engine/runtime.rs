//! Single interpreter context bound to one predicate library

use boa_engine::{Context, JsResult, Source};
use std::rc::Rc;
use tracing::debug;

use super::bindings::{self, LibraryScope};
use crate::config::EngineConfig;
use crate::error::PacError;
use crate::predicates::PredicateLibrary;

const ENTRY_POINT: &str = "FindProxyForURL";

/// Owns the interpreter for one script source.
///
/// Every call runs the full script text followed by an invocation of the
/// entry point, so a refreshed script takes effect on the next call. When the
/// text changes the context is rebuilt and no globals carry over between
/// script versions.
pub struct ScriptRuntime {
    config: EngineConfig,
    library: Rc<PredicateLibrary>,
    context: Context,
    loaded_text: Option<String>,
}

impl ScriptRuntime {
    pub fn new(library: PredicateLibrary, config: &EngineConfig) -> Result<Self, PacError> {
        let library = Rc::new(library);
        let context = new_context(config).map_err(|e| {
            PacError::Evaluation(format!("failed to bind PAC functions: {e}"))
        })?;

        Ok(Self {
            config: config.clone(),
            library,
            context,
            loaded_text: None,
        })
    }

    /// Evaluate `script` followed by `FindProxyForURL(url, host)` and
    /// stringify the result.
    ///
    /// The clock is pinned for the whole call so every time predicate sees
    /// the same instant.
    pub fn evaluate(&mut self, script: &str, url: &str, host: &str) -> Result<String, PacError> {
        if self.loaded_text.as_deref() != Some(script) {
            self.context =
                new_context(&self.config).map_err(|e| PacError::Evaluation(e.to_string()))?;
            self.loaded_text = Some(script.to_string());
            debug!(bytes = script.len(), "New PAC script text, rebuilt context");
        }

        let program = program_text(script, url, host)?;

        let _scope = LibraryScope::enter(&self.library);
        self.library.pin_clock();
        let result = self
            .context
            .eval(Source::from_bytes(program.as_bytes()))
            .and_then(|answer| answer.to_string(&mut self.context));
        self.library.release_clock();

        result
            .map(|answer| answer.to_std_string_escaped())
            .map_err(|e| PacError::Evaluation(e.to_string()))
    }
}

fn new_context(config: &EngineConfig) -> JsResult<Context> {
    let mut context = Context::default();
    let limits = context.runtime_limits_mut();
    limits.set_loop_iteration_limit(config.loop_iteration_limit);
    limits.set_recursion_limit(config.recursion_limit);
    bindings::register_all(&mut context)?;
    Ok(context)
}

/// Script text with the entry point call appended.
///
/// Arguments are embedded as JSON string literals, which are valid script
/// string literals, so quotes or newlines in a URL cannot alter the program.
fn program_text(script: &str, url: &str, host: &str) -> Result<String, PacError> {
    let quote = |value: &str| {
        serde_json::to_string(value).map_err(|e| PacError::Evaluation(e.to_string()))
    };
    Ok(format!(
        "{script}\n;{ENTRY_POINT}({}, {});\n",
        quote(url)?,
        quote(host)?
    ))
}
