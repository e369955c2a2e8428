//! Start source resolution

use crate::config::{parse_env_start, ConfigError};
use crate::models::{Asn, RangeId};

/// Start values offered to a run, one per source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartRequest {
    /// `--start`
    pub explicit: Option<u32>,
    /// Positional START argument
    pub positional: Option<u32>,
    /// Raw `ASN_START` value; parsed only when consulted
    pub environment: Option<String>,
    /// `--range`
    pub range: Option<RangeId>,
}

/// Which source supplied the start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartSource {
    Explicit,
    Positional,
    Environment,
    Range,
    Default,
}

impl StartSource {
    pub fn name(&self) -> &'static str {
        match self {
            StartSource::Explicit => "--start",
            StartSource::Positional => "positional argument",
            StartSource::Environment => "ASN_START",
            StartSource::Range => "range watermark",
            StartSource::Default => "default",
        }
    }
}

/// Whether the run records a watermark when it finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bookkeeping {
    Disabled,
    Range(RangeId),
}

/// Outcome of config resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPlan {
    /// Start fixed by the caller; no state is read or written
    Fixed { start: Asn, source: StartSource },
    /// Start derived from the range watermark
    Range(RangeId),
}

impl StartPlan {
    pub fn bookkeeping(&self) -> Bookkeeping {
        match self {
            StartPlan::Fixed { .. } => Bookkeeping::Disabled,
            StartPlan::Range(range) => Bookkeeping::Range(*range),
        }
    }

    pub fn source(&self) -> StartSource {
        match self {
            StartPlan::Fixed { source, .. } => *source,
            StartPlan::Range(_) => StartSource::Range,
        }
    }
}

/// Pick the first source that supplies a value:
/// `--start`, positional, `ASN_START`, `--range`, then `default_start`.
pub fn resolve_config(request: &StartRequest, default_start: u32) -> Result<StartPlan, ConfigError> {
    let fixed = |value: u32, source| StartPlan::Fixed {
        start: Asn::new(value),
        source,
    };

    if let Some(value) = request.explicit {
        return Ok(fixed(value, StartSource::Explicit));
    }
    if let Some(value) = request.positional {
        return Ok(fixed(value, StartSource::Positional));
    }
    if let Some(raw) = request.environment.as_deref().filter(|raw| !raw.trim().is_empty()) {
        return Ok(fixed(parse_env_start(raw)?, StartSource::Environment));
    }
    if let Some(range) = request.range {
        return Ok(StartPlan::Range(range));
    }
    Ok(fixed(default_start, StartSource::Default))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_sources() -> StartRequest {
        StartRequest {
            explicit: Some(10),
            positional: Some(20),
            environment: Some("30".to_string()),
            range: Some(RangeId::new(4).unwrap()),
        }
    }

    #[test]
    fn test_priority_order() {
        let mut request = all_sources();
        let plan = resolve_config(&request, 1).unwrap();
        assert_eq!(plan, StartPlan::Fixed { start: Asn::new(10), source: StartSource::Explicit });

        request.explicit = None;
        let plan = resolve_config(&request, 1).unwrap();
        assert_eq!(plan, StartPlan::Fixed { start: Asn::new(20), source: StartSource::Positional });

        request.positional = None;
        let plan = resolve_config(&request, 1).unwrap();
        assert_eq!(plan, StartPlan::Fixed { start: Asn::new(30), source: StartSource::Environment });

        request.environment = None;
        let plan = resolve_config(&request, 1).unwrap();
        assert_eq!(plan, StartPlan::Range(RangeId::new(4).unwrap()));
        assert_eq!(plan.bookkeeping(), Bookkeeping::Range(RangeId::new(4).unwrap()));

        request.range = None;
        let plan = resolve_config(&request, 190).unwrap();
        assert_eq!(plan, StartPlan::Fixed { start: Asn::new(190), source: StartSource::Default });
        assert_eq!(plan.bookkeeping(), Bookkeeping::Disabled);
    }

    #[test]
    fn test_bad_env_ignored_when_higher_source_present() {
        let request = StartRequest {
            positional: Some(5),
            environment: Some("not-a-number".to_string()),
            ..Default::default()
        };
        assert!(resolve_config(&request, 1).is_ok());
    }

    #[test]
    fn test_bad_env_is_config_error() {
        let request = StartRequest {
            environment: Some("not-a-number".to_string()),
            range: Some(RangeId::new(1).unwrap()),
            ..Default::default()
        };
        assert!(matches!(
            resolve_config(&request, 1),
            Err(ConfigError::InvalidEnvStart(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_env_is_config_error() {
        use std::os::unix::ffi::OsStringExt;

        let raw = std::ffi::OsString::from_vec(vec![0xff]);
        let request = StartRequest {
            environment: crate::config::env_start_value(Some(raw)),
            ..Default::default()
        };
        assert!(matches!(
            resolve_config(&request, 1),
            Err(ConfigError::InvalidEnvStart(_))
        ));
    }

    #[test]
    fn test_empty_env_falls_through() {
        let request = StartRequest {
            environment: Some("  ".to_string()),
            range: Some(RangeId::new(2).unwrap()),
            ..Default::default()
        };
        assert_eq!(resolve_config(&request, 1).unwrap(), StartPlan::Range(RangeId::new(2).unwrap()));
    }
}
