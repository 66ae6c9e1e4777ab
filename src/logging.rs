//! Log setup driven by the `Logging` configuration section.
//!
//! ```json
//! { "Logging": { "LogLevel": { "Default": "Information", "strata.config": "Debug" } } }
//! ```
//!
//! `Default` sets the global level; every other key names a target, with
//! `.` standing in for `::`.

use tracing_subscriber::EnvFilter;

use crate::config::Section;
use crate::Error;

/// Section name conventionally holding log settings.
pub const LOGGING_SECTION: &str = "Logging";

const DEFAULT_CATEGORY: &str = "Default";
const FALLBACK_LEVEL: &str = "info";

/// Maps a level name to its `tracing` directive spelling.
fn directive_level(category: &str, level: &str) -> Result<&'static str, Error> {
    let directive = match level.trim().to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "information" | "info" => "info",
        "warning" | "warn" => "warn",
        "error" | "critical" => "error",
        "none" | "off" => "off",
        _ => {
            return Err(Error::InvalidLogLevel {
                category: category.to_string(),
                level: level.to_string(),
            })
        }
    };
    Ok(directive)
}

/// Builds `EnvFilter` directives from a `Logging` section.
pub fn filter_directives(logging: &Section) -> Result<String, Error> {
    let levels = logging.get_section("LogLevel");
    let mut default = FALLBACK_LEVEL;
    let mut targets = Vec::new();

    for category in levels.children() {
        let Some(level) = levels.get(&category) else {
            continue;
        };
        let directive = directive_level(&category, &level)?;
        if category.eq_ignore_ascii_case(DEFAULT_CATEGORY) {
            default = directive;
        } else {
            targets.push(format!("{}={directive}", category.replace('.', "::")));
        }
    }

    let mut directives = vec![default.to_string()];
    directives.extend(targets);
    Ok(directives.join(","))
}

pub fn env_filter(logging: &Section) -> Result<EnvFilter, Error> {
    let directives = filter_directives(logging)?;
    EnvFilter::try_new(&directives).map_err(|e| Error::LoggingInit(format!("{directives}: {e}")))
}

/// Installs a global `fmt` subscriber filtered by the `Logging` section.
///
/// Fails if a global subscriber is already installed.
pub fn init(logging: &Section) -> Result<(), Error> {
    let filter = env_filter(logging)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| Error::LoggingInit(e.to_string()))
}
