//! Per-epoch loss history.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Losses recorded for one epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochLosses {
    /// Loss of the last critic iteration (real + fake).
    pub critic: f64,
    /// Loss of the generator's composite update.
    pub generator: f64,
}

impl EpochLosses {
    pub fn is_finite(&self) -> bool {
        self.critic.is_finite() && self.generator.is_finite()
    }
}

/// Two append-only loss sequences, one entry per epoch.
///
/// Non-finite losses are written to JSON as the strings `"NaN"`,
/// `"Infinity"` and `"-Infinity"` so a diverged run reads back unchanged.
/// `null` reads back as NaN.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LossHistory {
    #[serde(with = "loss_values")]
    pub critic: Vec<f64>,
    #[serde(with = "loss_values")]
    pub generator: Vec<f64>,
}

/// JSON form of a single loss value.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum JsonLoss {
    Number(f64),
    Text(String),
    Null,
}

impl From<f64> for JsonLoss {
    fn from(value: f64) -> Self {
        if value.is_nan() {
            Self::Text("NaN".to_string())
        } else if value == f64::INFINITY {
            Self::Text("Infinity".to_string())
        } else if value == f64::NEG_INFINITY {
            Self::Text("-Infinity".to_string())
        } else {
            Self::Number(value)
        }
    }
}

impl JsonLoss {
    fn into_f64(self) -> Result<f64, String> {
        match self {
            Self::Number(v) => Ok(v),
            Self::Null => Ok(f64::NAN),
            Self::Text(t) => match t.as_str() {
                "NaN" => Ok(f64::NAN),
                "Infinity" => Ok(f64::INFINITY),
                "-Infinity" => Ok(f64::NEG_INFINITY),
                other => Err(format!("invalid loss value {other:?}")),
            },
        }
    }
}

mod loss_values {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::JsonLoss;

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(values.iter().map(|&v| JsonLoss::from(v)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        Vec::<JsonLoss>::deserialize(deserializer)?
            .into_iter()
            .map(|v| v.into_f64().map_err(D::Error::custom))
            .collect()
    }
}

impl LossHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, losses: EpochLosses) {
        self.critic.push(losses.critic);
        self.generator.push(losses.generator);
    }

    /// Number of recorded epochs.
    pub fn len(&self) -> usize {
        self.critic.len()
    }

    pub fn is_empty(&self) -> bool {
        self.critic.is_empty()
    }

    /// Losses of the most recent epoch.
    pub fn last(&self) -> Option<EpochLosses> {
        Some(EpochLosses {
            critic: *self.critic.last()?,
            generator: *self.generator.last()?,
        })
    }

    /// Write the history as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> anyhow::Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), self)
            .with_context(|| format!("failed to write loss history to {}", path.display()))?;
        Ok(())
    }

    /// Read a history written by [`LossHistory::write_json`].
    pub fn read_json(path: &Path) -> anyhow::Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        serde_json::from_reader(std::io::BufReader::new(file))
            .with_context(|| format!("failed to parse loss history {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_last() {
        let mut history = LossHistory::new();
        assert!(history.is_empty());
        assert_eq!(history.last(), None);

        history.push(EpochLosses { critic: -0.1, generator: 0.4 });
        history.push(EpochLosses { critic: -0.3, generator: 0.6 });

        assert_eq!(history.len(), 2);
        assert_eq!(history.critic, vec![-0.1, -0.3]);
        assert_eq!(history.generator, vec![0.4, 0.6]);
        assert_eq!(history.last(), Some(EpochLosses { critic: -0.3, generator: 0.6 }));
    }

    #[test]
    fn test_is_finite() {
        assert!(EpochLosses { critic: 0.0, generator: -1.0 }.is_finite());
        assert!(!EpochLosses { critic: f64::NAN, generator: 0.0 }.is_finite());
        assert!(!EpochLosses { critic: 0.0, generator: f64::INFINITY }.is_finite());
    }

    #[test]
    fn test_json_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("losses.json");

        let mut history = LossHistory::new();
        history.push(EpochLosses { critic: 0.25, generator: -0.5 });
        history.write_json(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"critic\""));
        assert!(text.contains("\"generator\""));
        assert_eq!(LossHistory::read_json(&path).unwrap(), history);
    }

    #[test]
    fn test_json_keeps_non_finite_losses() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("losses.json");

        let mut history = LossHistory::new();
        history.push(EpochLosses { critic: 0.5, generator: f64::NAN });
        history.push(EpochLosses { critic: f64::INFINITY, generator: f64::NEG_INFINITY });
        history.write_json(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(!text.contains("null"), "non-finite values written as null:\n{text}");

        let loaded = LossHistory::read_json(&path).unwrap();
        assert_eq!(loaded.critic, vec![0.5, f64::INFINITY]);
        assert!(loaded.generator[0].is_nan());
        assert_eq!(loaded.generator[1], f64::NEG_INFINITY);
    }

    #[test]
    fn test_json_null_reads_as_nan() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("losses.json");
        std::fs::write(&path, r#"{"critic": [null, 1], "generator": [0.25, -2.0]}"#).unwrap();

        let loaded = LossHistory::read_json(&path).unwrap();
        assert!(loaded.critic[0].is_nan());
        assert_eq!(loaded.critic[1], 1.0);
        assert_eq!(loaded.generator, vec![0.25, -2.0]);
    }

    #[test]
    fn test_json_rejects_unknown_text() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("losses.json");
        std::fs::write(&path, r#"{"critic": ["oops"], "generator": [0.0]}"#).unwrap();

        let err = LossHistory::read_json(&path).unwrap_err();
        assert!(format!("{err:#}").contains("oops"), "got {err:#}");
    }

    #[test]
    fn test_read_missing_file_names_path() {
        let err = LossHistory::read_json(Path::new("/nonexistent/losses.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/losses.json"));
    }
}
