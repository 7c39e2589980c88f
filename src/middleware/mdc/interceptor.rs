//! Builds the label map for one call and scopes it around the handler.

use std::fmt;
use std::future::Future;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use super::context::{ClearOnDrop, DiagnosticContext};
use super::operation::{Argument, Invocation};
use super::path::extract;
use crate::error::Error;

/// The context key the label map is published under.
pub const KEY_MDC_LOGGING: &str = "mdcLogging";

/// Labels to stringified values, in parameter declaration order.
///
/// Renders as `{testKey=pepe, AnotherKey=sr}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelMap(IndexMap<String, String>);

impl LabelMap {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.0.get(label).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for LabelMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{k}={v}")?;
        }
        f.write_str("}")
    }
}

/// Strings render bare; everything else renders as compact JSON.
fn stringify(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Collects the marked arguments of `invocation`. Null or missing values are
/// left out entirely.
pub fn label_map(invocation: &Invocation<'_>) -> Result<LabelMap, Error> {
    let mut labels = IndexMap::new();
    let params = &invocation.operation.params;
    for (i, param) in params.iter().enumerate() {
        let Some(marker) = &param.marker else { continue };
        let argument = invocation.args.get(i).unwrap_or(&Argument::Absent);
        let value = extract(argument, marker.path.as_ref())
            .map_err(|source| Error::Extraction { label: marker.label.clone(), source })?;
        if let Some(value) = value {
            labels.insert(marker.label.clone(), stringify(value));
        }
    }
    Ok(LabelMap(labels))
}

/// Runs `proceed` with the invocation's labels published in the request's
/// diagnostic context, then clears the context.
///
/// Fails with [`Error::Misuse`] outside a request scope, before anything is
/// written. Inside a scope the context is cleared in full on every exit:
/// after `proceed` finishes, panics or is dropped, and also when a marked
/// argument cannot be evaluated ([`Error::Extraction`]), in which case
/// `proceed` is never called. Otherwise `proceed` runs exactly once and its
/// output is returned as-is.
pub async fn intercept<P, Fut>(invocation: Invocation<'_>, proceed: P) -> Result<Fut::Output, Error>
where
    P: FnOnce() -> Fut,
    Fut: Future,
{
    let operation = &invocation.operation.id;
    let Some(ctx) = DiagnosticContext::current() else {
        return Err(Error::Misuse { operation: operation.clone() });
    };
    let _clear = ClearOnDrop(ctx.clone());

    let labels = label_map(&invocation)?;
    if labels.is_empty() {
        debug!(%operation, "no labels to publish");
    } else {
        debug!(%operation, labels = %labels, "publishing diagnostic context");
        ctx.set(KEY_MDC_LOGGING, labels.to_string());
    }

    Ok(proceed().await)
}
