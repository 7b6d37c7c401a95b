use std::{
    io::{self, BufReader, Read},
    path::Path,
};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    Match,
    Mismatch,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum CompareMode {
    /// Compare pairwise until either stream ends; a common prefix counts as a match.
    #[default]
    Prefix,
    /// Like `Prefix`, but both streams must also end together.
    Exact,
}

/// Byte-by-byte comparison that stops at the first differing byte or at the end of
/// either stream.
pub fn compare_streams<A, B>(a: A, b: B, mode: CompareMode) -> io::Result<Comparison>
where
    A: Read,
    B: Read,
{
    let mut a = BufReader::new(a).bytes();
    let mut b = BufReader::new(b).bytes();

    // Whether the longer stream still had bytes when the shorter one ended.
    let has_trailing = loop {
        let Some(x) = a.next().transpose()? else {
            break b.next().transpose()?.is_some();
        };
        let Some(y) = b.next().transpose()? else {
            break true;
        };
        if x != y {
            return Ok(Comparison::Mismatch);
        }
    };

    Ok(match mode {
        CompareMode::Prefix => Comparison::Match,
        CompareMode::Exact if has_trailing => Comparison::Mismatch,
        CompareMode::Exact => Comparison::Match,
    })
}

/// [`compare_streams`] over two files opened read-only.
pub fn compare_files(
    captured: impl AsRef<Path>,
    answer: impl AsRef<Path>,
    mode: CompareMode,
) -> fsutil::Result<Comparison> {
    let captured = captured.as_ref();
    let a = fsutil::open_file(captured)?;
    let b = fsutil::open_file(&answer)?;
    compare_streams(a, b, mode).map_err(|e| {
        fsutil::Error::FromToIO(
            "Cannot compare files",
            captured.to_owned(),
            answer.as_ref().to_owned(),
            e,
        )
    })
}
