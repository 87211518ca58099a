//! Session creation options.

use std::env;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{EncoderType, SessionId};

/// What to ask of the engine when creating a [`Session`](crate::Session).
///
/// # Example
///
/// ```
/// use rtc_bridge::{ContextOptions, EncoderType};
///
/// let opts = ContextOptions::from_toml_str(r#"
///     id = 3
///     encoder_type = "software"
/// "#)?;
/// assert_eq!(opts.encoder_type, EncoderType::Software);
/// assert!(!opts.for_test);
/// # Ok::<(), rtc_bridge::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContextOptions {
    /// Context id; two live sessions may not share one.
    pub id: SessionId,
    /// Video encoder; `Hardware` fails creation on machines without one.
    pub encoder_type: EncoderType,
    /// Create the context in the engine's test mode.
    pub for_test: bool,
}

impl ContextOptions {
    /// Options for a software-encoded context with the given id.
    pub fn software(id: i32) -> Self {
        Self {
            id: SessionId(id),
            encoder_type: EncoderType::Software,
            for_test: false,
        }
    }

    /// Parse options from a TOML document. Missing keys take defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load options from `RTC_BRIDGE_CONTEXT_ID`, `RTC_BRIDGE_ENCODER` and
    /// `RTC_BRIDGE_FOR_TEST`. Unset variables take defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut opts = Self::default();

        if let Some(id) = lookup("RTC_BRIDGE_CONTEXT_ID") {
            let id = id.trim().parse().map_err(|_| {
                Error::Config(format!("RTC_BRIDGE_CONTEXT_ID: not an integer: {}", id))
            })?;
            opts.id = SessionId(id);
        }

        if let Some(encoder) = lookup("RTC_BRIDGE_ENCODER") {
            opts.encoder_type = match encoder.trim().to_ascii_lowercase().as_str() {
                "hardware" => EncoderType::Hardware,
                "software" => EncoderType::Software,
                other => {
                    return Err(Error::Config(format!(
                        "RTC_BRIDGE_ENCODER: expected hardware or software, got {}",
                        other
                    )))
                }
            };
        }

        if let Some(for_test) = lookup("RTC_BRIDGE_FOR_TEST") {
            opts.for_test = match for_test.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                other => {
                    return Err(Error::Config(format!(
                        "RTC_BRIDGE_FOR_TEST: expected a boolean, got {}",
                        other
                    )))
                }
            };
        }

        Ok(opts)
    }
}
