//! lea-jinja - Jinja templating for lea SQL scripts
//!
//! Scripts ending in `.sql.jinja` are rendered before parsing. The template
//! context exposes the process environment as `env` and a `load_yaml`
//! function; every file touched during a render is recorded so the caller
//! can compute the script's effective modification time.

pub mod environment;
pub mod error;

pub use environment::{JinjaEnvironment, RenderOutput};
pub use error::{JinjaError, JinjaResult};
