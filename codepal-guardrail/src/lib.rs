//! # codepal-guardrail
//!
//! Validation steps applied to model input and output.
//!
//! - [`SensitiveWordGuardrail`] rejects user input containing denylisted words.
//! - [`SchemaValidator`] (feature `schema`) checks that model output contains
//!   JSON matching a schema.
//! - [`GuardrailSet`] and [`run_guardrails`] evaluate several guardrails in
//!   order; only [`Severity::Critical`] failures reject.
//!
//! ```rust,ignore
//! use codepal_guardrail::{GuardrailSet, SensitiveWordGuardrail, run_guardrails};
//!
//! let input = GuardrailSet::new().with(SensitiveWordGuardrail::default());
//! match run_guardrails(&input, &Content::user(message)).await {
//!     Ok(content) => { /* continue with content */ }
//!     Err(e) => println!("Input validation failed: {}", e.reason()),
//! }
//! ```

mod error;
#[cfg(feature = "schema")]
mod schema;
mod sensitive;
mod set;
mod traits;

pub use error::{GuardrailError, Result};
#[cfg(feature = "schema")]
pub use schema::{SchemaValidator, extract_json};
pub use sensitive::{DEFAULT_SENSITIVE_WORDS, SensitiveWordGuardrail};
pub use set::{GuardrailSet, run_guardrails};
pub use traits::{Guardrail, GuardrailResult, Severity};
