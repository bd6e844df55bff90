//! Upload file naming.
//!
//! Every chunk of one job shares a base name built from two random,
//! pronounceable segments, the local time and the source extension:
//! `kasori-tenumi-05-06-2024-10-30.mp4`.

use chrono::NaiveDateTime;
use rand::Rng;

/// Extension used when the source path has none.
pub const DEFAULT_EXTENSION: &str = "mp4";

/// Syllables per random name segment.
const SEGMENT_SYLLABLES: usize = 3;

const TIMESTAMP_FORMAT: &str = "%d-%m-%Y-%H-%M";

const SYLLABLES: &[&str] = &[
    "a", "ka", "sa", "ta", "na", "ha", "ma", "ya", "ra", "wa", //
    "i", "ki", "shi", "chi", "ni", "hi", "mi", "ri", //
    "u", "ku", "su", "tsu", "nu", "fu", "mu", "yu", "ru", //
    "e", "ke", "se", "te", "ne", "he", "me", "re", //
    "o", "ko", "so", "to", "no", "ho", "mo", "yo", "ro",
];

fn name_segment<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..SEGMENT_SYLLABLES)
        .map(|_| SYLLABLES[rng.gen_range(0..SYLLABLES.len())])
        .collect()
}

/// Returns the text after the last `.` of the final path component, or
/// [`DEFAULT_EXTENSION`] when there is none.
pub fn extension_of(source: &str) -> &str {
    let file_name = source
        .rfind(['/', '\\'])
        .map_or(source, |sep| &source[sep + 1..]);
    match file_name.rfind('.') {
        Some(dot) if dot + 1 < file_name.len() => &file_name[dot + 1..],
        _ => DEFAULT_EXTENSION,
    }
}

/// Builds the base file name shared by all chunks of one upload.
pub fn generate_base_name<R: Rng + ?Sized>(
    rng: &mut R,
    now: NaiveDateTime,
    source: &str,
) -> String {
    let first = name_segment(rng);
    let second = name_segment(rng);
    format!(
        "{first}-{second}-{}.{}",
        now.format(TIMESTAMP_FORMAT),
        extension_of(source)
    )
}

/// Per-chunk `File-Name` value: the base name with the sequence number
/// inserted before the extension (`name.part2.mp4`).
pub fn chunk_file_name(base: &str, sequence: u64) -> String {
    match base.rfind('.') {
        Some(dot) => format!("{}.part{sequence}{}", &base[..dot], &base[dot..]),
        None => format!("{base}.part{sequence}"),
    }
}
