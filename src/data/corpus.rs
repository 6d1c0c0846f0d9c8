use std::path::Path;

use crate::data::dataset::TokenSample;
use crate::data::DataConfig;
use crate::error::DatasetError;

/// Load a JSONL corpus: one sample per line with `tokens`, `ast`, `symbol`
/// and `error` arrays. Every line is validated against the configured vocab
/// size and class counts; blank lines are skipped.
pub fn load_jsonl(path: &Path, config: &DataConfig) -> Result<Vec<TokenSample>, DatasetError> {
    let content = std::fs::read_to_string(path).map_err(|e| DatasetError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut samples = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let line_no = idx + 1;
        let sample: TokenSample =
            serde_json::from_str(line).map_err(|e| DatasetError::MalformedLine {
                path: path.to_path_buf(),
                line: line_no,
                source: e,
            })?;
        validate_sample(&sample, line_no, config)?;
        samples.push(sample);
    }

    if samples.is_empty() {
        return Err(DatasetError::Empty);
    }
    tracing::debug!("loaded {} samples from {}", samples.len(), path.display());
    Ok(samples)
}

fn validate_sample(
    sample: &TokenSample,
    line: usize,
    config: &DataConfig,
) -> Result<(), DatasetError> {
    let tokens = sample.tokens.len();
    let streams: [(&'static str, &Vec<i32>, usize); 3] = [
        ("ast", &sample.ast_labels, config.ast_classes),
        ("symbol", &sample.symbol_labels, config.symbol_classes),
        ("error", &sample.error_labels, config.error_classes),
    ];

    for (stream, labels, classes) in streams {
        if labels.len() != tokens {
            return Err(DatasetError::LengthMismatch {
                line,
                stream,
                tokens,
                labels: labels.len(),
            });
        }
        for &label in labels.iter() {
            let unlabeled = label == config.padding_label;
            let in_range = label >= 0 && (label as usize) < classes;
            if !unlabeled && !in_range {
                return Err(DatasetError::LabelOutOfRange {
                    line,
                    stream,
                    label,
                    classes,
                });
            }
        }
    }

    for &id in &sample.tokens {
        if id as usize >= config.vocab_size {
            return Err(DatasetError::TokenOutOfRange {
                line,
                id,
                vocab_size: config.vocab_size,
            });
        }
    }

    Ok(())
}
