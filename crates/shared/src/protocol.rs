//! Line-delimited JSON events written by the engine process on stdout.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::Sample;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum EngineEvent {
    Message { text: String },
    FatalError { log_file: PathBuf },
}

impl EngineEvent {
    /// Parses one stdout line. Returns `None` for plain log output.
    pub fn parse_line(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if !trimmed.starts_with('{') {
            return None;
        }
        serde_json::from_str(trimmed).ok()
    }
}

/// Reply to `--list-samples`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleManifest {
    Wrapped { samples: Vec<Sample> },
    Bare(Vec<Sample>),
}

impl SampleManifest {
    pub fn into_samples(self) -> Vec<Sample> {
        match self {
            SampleManifest::Wrapped { samples } | SampleManifest::Bare(samples) => samples,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_engine_events() {
        let message = EngineEvent::parse_line(r#"{"type":"message","payload":{"text":"hi"}}"#);
        assert_eq!(
            message,
            Some(EngineEvent::Message {
                text: "hi".to_string()
            })
        );

        let fatal = EngineEvent::parse_line(
            r#" {"type":"fatal_error","payload":{"log_file":"/tmp/log.txt"}} "#,
        );
        assert_eq!(
            fatal,
            Some(EngineEvent::FatalError {
                log_file: PathBuf::from("/tmp/log.txt")
            })
        );
    }

    #[test]
    fn ignores_plain_log_lines() {
        assert_eq!(EngineEvent::parse_line("[info] frame 12"), None);
        assert_eq!(EngineEvent::parse_line("{not json"), None);
    }

    #[test]
    fn accepts_bare_and_wrapped_manifests() {
        let bare: SampleManifest = serde_json::from_str(
            r#"[{"id":"msaa","name":"MSAA","category":"performance"}]"#,
        )
        .expect("bare manifest");
        let samples = bare.into_samples();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].display_name, "MSAA");
        assert!(samples[0].description.is_empty());

        let wrapped: SampleManifest = serde_json::from_str(
            r#"{"samples":[{"id":"hpp","display_name":"HPP","category":"api","description":"d"}]}"#,
        )
        .expect("wrapped manifest");
        assert_eq!(wrapped.into_samples()[0].description, "d");
    }
}
