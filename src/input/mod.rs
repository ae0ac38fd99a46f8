//! Request parameter handling.
//!
//! # Data Flow
//! ```text
//! query string / path params (text)   JSON body (typed)
//!     → coerce.rs                         │
//!         └──────────────┬────────────────┘
//!                        ▼
//!                 ParamMap (value.rs)
//!                        → validator.rs → ValidationResult
//! ```

pub mod coerce;
pub mod validator;
pub mod value;

pub use coerce::{coerce_text, coerce_text_params};
pub use validator::{validate_inputs, ValidationResult};
pub use value::{params_to_json, ParamMap, ParamValue};
