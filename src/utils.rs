use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};

use crate::types::Song;

fn random_alphanumeric(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

pub fn generate_code_verifier() -> String {
    random_alphanumeric(128)
}

pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Anti-forgery token for a single authorization attempt.
pub fn generate_state() -> String {
    random_alphanumeric(32)
}

/// Case-folds and trims a name for comparison.
pub fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Makes a playlist name safe to use as a file name.
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            other => other,
        })
        .collect();

    let trimmed = replaced.trim_matches(|c| c == ' ' || c == '.');
    if trimmed.is_empty() {
        "playlist".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Parses one line of a plain-text song list.
///
/// Accepts `Artist - Title`, `Artist: Title` and `Title by Artist`, trying
/// the spaced separators first so hyphenated names survive. Blank
/// lines and `#` / `//` comments yield `None`; anything else that does not
/// match becomes a title with artist `Unknown`.
pub fn parse_song_line(line: &str) -> Option<Song> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
        return None;
    }

    let split = |separator: &str| {
        line.split_once(separator)
            .and_then(|(artist, title)| non_empty_pair(artist, title))
    };

    split(" - ")
        .or_else(|| split(": "))
        .or_else(|| {
            line.rsplit_once(" by ")
                .and_then(|(title, artist)| non_empty_pair(artist, title))
        })
        .or_else(|| split("-"))
        .or_else(|| split(":"))
        .or_else(|| Some(Song::new("Unknown", line)))
}

/// Parses a plain-text song list, one song per line.
pub fn parse_song_list(text: &str) -> Vec<Song> {
    text.lines().filter_map(parse_song_line).collect()
}

fn non_empty_pair(artist: &str, title: &str) -> Option<Song> {
    let (artist, title) = (artist.trim(), title.trim());
    if artist.is_empty() || title.is_empty() {
        None
    } else {
        Some(Song::new(artist, title))
    }
}

/// Derives a playlist name from a song list file name, e.g.
/// `road_trip-mix.txt` becomes `Road Trip Mix`.
pub fn playlist_name_from_path(path: &std::path::Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("playlist");

    stem.split(['_', '-', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
