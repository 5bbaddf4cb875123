pub mod error;
pub mod format;

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use siftmatch_core::{Feature, FeatureKind};
use siftmatch_kdtree::Correspondence;
use tracing::debug;

pub use error::{FeatureIoError, FeatureIoResult};
pub use format::{detect_kind, parse_features, write_features};

/// Matches between two feature sets, as produced by the matcher
pub type FeatureMatch<'q, 'a> = Correspondence<'q, 'a, Feature, Feature>;

/// Read features of a known format from any reader
pub fn read_features<R: Read>(mut reader: R, kind: FeatureKind) -> FeatureIoResult<Vec<Feature>> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    parse_features(&text, kind)
}

/// Load a feature file
pub fn import_features<P: AsRef<Path>>(path: P, kind: FeatureKind) -> FeatureIoResult<Vec<Feature>> {
    let path = path.as_ref();
    let features = read_features(File::open(path)?, kind)?;
    debug!(path = %path.display(), count = features.len(), ?kind, "imported features");
    Ok(features)
}

/// Load a feature file, guessing the format from its header
pub fn import_features_auto<P: AsRef<Path>>(path: P) -> FeatureIoResult<(Vec<Feature>, FeatureKind)> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let kind = detect_kind(&text).ok_or_else(|| FeatureIoError::Parse {
        line: 1,
        message: "unrecognised feature file header".to_string(),
    })?;
    let features = parse_features(&text, kind)?;
    debug!(path = %path.display(), count = features.len(), ?kind, "imported features");
    Ok((features, kind))
}

/// Write a feature file
pub fn export_features<P: AsRef<Path>>(path: P, features: &[Feature], kind: FeatureKind) -> FeatureIoResult<()> {
    let writer = BufWriter::new(File::create(path.as_ref())?);
    write_features(writer, features, kind)?;
    debug!(path = %path.as_ref().display(), count = features.len(), ?kind, "exported features");
    Ok(())
}

/// Write one line per match: `x1 y1 x2 y2 best_sq second_sq`, preceded by the match count
pub fn write_matches<W: Write>(mut writer: W, matches: &[FeatureMatch<'_, '_>]) -> FeatureIoResult<()> {
    writeln!(writer, "{}", matches.len())?;
    for m in matches {
        writeln!(
            writer,
            "{:.6} {:.6} {:.6} {:.6} {:.6} {:.6}",
            m.query.x, m.query.y, m.matched.x, m.matched.y, m.best_distance_sq, m.second_distance_sq
        )?;
    }
    writer.flush()?;
    Ok(())
}

pub fn export_matches<P: AsRef<Path>>(path: P, matches: &[FeatureMatch<'_, '_>]) -> FeatureIoResult<()> {
    write_matches(BufWriter::new(File::create(path)?), matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use siftmatch_kdtree::MatcherBuilder;

    fn sample() -> Vec<Feature> {
        vec![
            Feature::new(10.0, 20.0, 2.0, 0.1, vec![0.0, 0.0, 0.0]),
            Feature::new(30.0, 40.0, 1.0, 0.2, vec![100.0, 0.0, 0.0]),
            Feature::new(50.0, 60.0, 3.0, 0.3, vec![0.0, 100.0, 0.0]),
        ]
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features.key");
        let features = sample();

        export_features(&path, &features, FeatureKind::Lowe).unwrap();
        assert_eq!(import_features(&path, FeatureKind::Lowe).unwrap(), features);

        let (auto, kind) = import_features_auto(&path).unwrap();
        assert_eq!(kind, FeatureKind::Lowe);
        assert_eq!(auto, features);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = import_features(dir.path().join("nope.key"), FeatureKind::Lowe);
        assert!(matches!(result, Err(FeatureIoError::Io(_))));
    }

    #[test]
    fn test_write_matches() {
        let reference = sample();
        let queries = vec![Feature::new(1.0, 2.0, 1.0, 0.0, vec![99.0, 1.0, 0.0])];
        let matcher = MatcherBuilder::new().threads(1).build(&reference).unwrap();
        let matches = matcher.match_all(&queries).unwrap();
        assert_eq!(matches.len(), 1);

        let mut out = Vec::new();
        write_matches(&mut out, &matches).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "1");
        assert!(lines[1].starts_with("1.000000 2.000000 30.000000 40.000000 2.000000"));
    }
}
