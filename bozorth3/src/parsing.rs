//! Loading of `.xyt` minutia files, the optional `.min` kind sidecar, and
//! quality-based pruning.

use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;

use crate::consts::MAX_FILE_MINUTIAE;
use crate::types::{Minutia, MinutiaKind};

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("cannot read template: {0}")]
    Io(#[from] io::Error),
    #[error("malformed template value {0:?}")]
    Malformed(String),
}

/// A minutia as read from disk, before pruning.
#[derive(Debug, Copy, Clone)]
pub struct RawMinutia {
    pub x: i32,
    pub y: i32,
    pub t: i32,
    pub q: i32,
    pub kind: Option<MinutiaKind>,
}

/// Parses `.xyt` content: whitespace-separated integers, four per minutia
/// (`x y t q`), until the end of input or 1,000 minutiae. A trailing
/// partial record is dropped. Angles are normalized into (-180, 180].
pub fn parse_xyt_str(contents: &str) -> Result<Vec<RawMinutia>, TemplateError> {
    let mut values = contents.split_whitespace();
    let mut minutiae = Vec::new();

    while let Some(x) = values.next() {
        let (Some(y), Some(t), Some(q)) = (values.next(), values.next(), values.next()) else {
            break;
        };
        let x = parse_value(x)?;
        let y = parse_value(y)?;
        let t = parse_value(t)?;
        let q = parse_value(q)?;

        minutiae.push(RawMinutia {
            x,
            y,
            t: if t > 180 { t - 360 } else { t },
            q,
            kind: None,
        });
        if minutiae.len() == MAX_FILE_MINUTIAE {
            break;
        }
    }

    Ok(minutiae)
}

fn parse_value(token: &str) -> Result<i32, TemplateError> {
    token
        .parse()
        .map_err(|_| TemplateError::Malformed(token.to_string()))
}

/// Applies minutia kinds from `.min` content, positionally. The four
/// header lines are skipped; characters 33..36 of each following line
/// select the kind, anything unrecognized leaves it unknown.
pub fn apply_min_kinds(minutiae: &mut [RawMinutia], contents: &str) {
    for (minutia, line) in minutiae.iter_mut().zip(contents.lines().skip(4)) {
        minutia.kind = match line.get(33..36) {
            Some("BIF") => Some(MinutiaKind::Bif),
            Some("RIG") => Some(MinutiaKind::Rig),
            _ => None,
        };
    }
}

/// When more minutiae were read than `max_minutiae`, keeps the ones with
/// the highest quality. The descending sort is stable, so equal-quality
/// minutiae are kept in input order. The retained minutiae are then put
/// into the `(x, y)` order the edge builder requires.
pub fn prune_minutiae(mut minutiae: Vec<RawMinutia>, max_minutiae: u32) -> Vec<Minutia> {
    if minutiae.len() > max_minutiae as usize {
        minutiae.sort_by(|left, right| right.q.cmp(&left.q));
        minutiae.truncate(max_minutiae as usize);
    }

    minutiae.sort_by_key(|minutia| (minutia.x, minutia.y));
    minutiae
        .into_iter()
        .map(|minutia| Minutia {
            x: minutia.x,
            y: minutia.y,
            theta: minutia.t,
            kind: minutia.kind,
        })
        .collect()
}

/// Loads and prunes a `.xyt` template; a `.min` sidecar with the same stem
/// is applied when present.
pub fn load_minutiae(
    xyt_path: impl AsRef<Path>,
    max_minutiae: u32,
) -> Result<Vec<Minutia>, TemplateError> {
    let xyt_path = xyt_path.as_ref();
    let mut minutiae = parse_xyt_str(&fs::read_to_string(xyt_path)?)?;

    let min_path = xyt_path.with_extension("min");
    if min_path.exists() {
        apply_min_kinds(&mut minutiae, &fs::read_to_string(min_path)?);
    }

    Ok(prune_minutiae(minutiae, max_minutiae))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xyt_values_are_whitespace_separated() {
        let minutiae = parse_xyt_str("10 20 30 40\n50\t60  190 2\n").unwrap();
        assert_eq!(minutiae.len(), 2);
        assert_eq!(
            (minutiae[0].x, minutiae[0].y, minutiae[0].t, minutiae[0].q),
            (10, 20, 30, 40)
        );
        // 190 degrees folds down into (-180, 180]
        assert_eq!(minutiae[1].t, -170);
    }

    #[test]
    fn partial_trailing_record_is_dropped() {
        let minutiae = parse_xyt_str("1 2 3 4 5 6").unwrap();
        assert_eq!(minutiae.len(), 1);
    }

    #[test]
    fn malformed_value_is_an_error() {
        assert!(parse_xyt_str("1 2 x 4").is_err());
    }

    #[test]
    fn min_kinds_apply_by_position() {
        let mut minutiae = parse_xyt_str("1 1 0 1  2 2 0 1  3 3 0 1").unwrap();
        let pad = " ".repeat(33);
        let contents = format!(
            "h1\nh2\nh3\nh4\n{pad}BIF extra\n{pad}RIG\n{pad}???\n{pad}BIF ignored\n"
        );
        apply_min_kinds(&mut minutiae, &contents);

        assert_eq!(minutiae[0].kind, Some(MinutiaKind::Bif));
        assert_eq!(minutiae[1].kind, Some(MinutiaKind::Rig));
        assert_eq!(minutiae[2].kind, None);
    }

    fn raw(x: i32, y: i32, q: i32) -> RawMinutia {
        RawMinutia {
            x,
            y,
            t: 0,
            q,
            kind: None,
        }
    }

    #[test]
    fn pruning_keeps_the_best_and_sorts_by_position() {
        let minutiae = vec![raw(30, 0, 5), raw(10, 0, 9), raw(20, 0, 1), raw(0, 5, 9)];
        let pruned = prune_minutiae(minutiae, 3);
        let positions: Vec<_> = pruned.iter().map(|m| (m.x, m.y)).collect();
        assert_eq!(positions, vec![(0, 5), (10, 0), (30, 0)]);
    }

    #[test]
    fn pruning_ties_keep_input_order() {
        // all qualities equal: the first two of the input survive
        let minutiae = vec![raw(30, 0, 7), raw(10, 0, 7), raw(20, 0, 7)];
        let pruned = prune_minutiae(minutiae, 2);
        let positions: Vec<_> = pruned.iter().map(|m| (m.x, m.y)).collect();
        assert_eq!(positions, vec![(10, 0), (30, 0)]);
    }

    #[test]
    fn short_lists_are_only_sorted() {
        let minutiae = vec![raw(5, 5, 1), raw(1, 1, 2)];
        let pruned = prune_minutiae(minutiae, 150);
        assert_eq!((pruned[0].x, pruned[1].x), (1, 5));
    }
}
