//! Reading of batch files.

use std::{fs, path::Path};

use anyhow::Context;
use facilitator::bulk_transactions::BulkTransactions;
use serde::Deserialize;
use tracing::debug;

#[derive(Deserialize)]
#[serde(untagged)]
enum BatchFile {
    Many(Vec<BulkTransactions>),
    One(BulkTransactions),
}

/// Reads the batches in the JSON file at `path`, in file order.
pub(crate) fn read_batches(path: &Path) -> anyhow::Result<Vec<BulkTransactions>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read batch file {}", path.display()))?;

    let batches = parse_batches(&contents)
        .with_context(|| format!("failed to parse batch file {}", path.display()))?;
    debug!(path = %path.display(), count = batches.len(), "read batch file");

    Ok(batches)
}

fn parse_batches(contents: &str) -> serde_json::Result<Vec<BulkTransactions>> {
    Ok(match serde_json::from_str(contents)? {
        BatchFile::Many(batches) => batches,
        BatchFile::One(batch) => vec![batch],
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_parse_single_batch() {
        let batches = parse_batches(r#"{"stakeRequesteds": [], "stakeIntentDeclareds": []}"#)
            .unwrap();

        assert_eq!(batches.len(), 1);
        assert_eq!(
            batches[0].kinds().collect::<Vec<_>>(),
            vec!["stakeRequesteds", "stakeIntentDeclareds"]
        );
    }

    #[test]
    fn test_parse_many_batches() {
        let batches = parse_batches(r#"[{"b": [{}]}, {"a": []}]"#).unwrap();

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].kinds().collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(batches[1].kinds().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn test_rejects_invalid_batches() {
        assert!(parse_batches(r#""stakeRequesteds""#).is_err());
        assert!(parse_batches(r#"{"stakeRequesteds": {}}"#).is_err());
    }

    #[test]
    fn test_read_batches() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"stakeRequesteds": [{{"n": 1}}]}}"#).unwrap();

        let batches = read_batches(file.path()).unwrap();
        assert_eq!(batches[0].get("stakeRequesteds").map(<[_]>::len), Some(1));

        assert!(read_batches(Path::new("/nonexistent/batch.json")).is_err());
    }
}
