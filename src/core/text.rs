use crate::models::SongRecord;

/// Normalize a chart artist credit into a comma-joined list.
///
/// - "Featuring" becomes "ft."
/// - the separator words "x", "&" and "X" between names become ", "
///
/// An upper-case "X" directly before a featured credit or another separator
/// ends a name ("Lil Nas X ft. ...", "Lil Nas X & ...") and is kept. Runs of
/// separators collapse into one, so normalizing twice changes nothing.
pub fn normalize_artist(artist: &str) -> String {
    let credited = artist.replace("Featuring", "ft.");
    let words: Vec<&str> = credited.split_whitespace().collect();

    let mut names = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for (i, word) in words.iter().enumerate() {
        let interior = i > 0 && i + 1 < words.len();
        if interior && is_separator(word, words[i + 1]) {
            push_name(&mut names, &current);
            current.clear();
        } else {
            current.push(word);
        }
    }
    push_name(&mut names, &current);
    names.join(", ")
}

fn is_separator(word: &str, next: &str) -> bool {
    match word {
        "x" | "&" => true,
        "X" => !(next.starts_with("ft.") || next == "x" || next == "&"),
        _ => false,
    }
}

fn push_name(names: &mut Vec<String>, words: &[&str]) {
    let joined = words.join(" ");
    let name = joined.trim_matches(',').trim();
    if !name.is_empty() {
        names.push(name.to_string());
    }
}

/// Drop featured-artist credits: everything from the first " ft." on.
pub fn real_artist(artist: &str) -> &str {
    match artist.find(" ft.") {
        Some(pos) => &artist[..pos],
        None => artist,
    }
}

/// Build a search query for streaming and video lookups.
pub fn build_search_query(song: &SongRecord) -> String {
    let artist = real_artist(&song.artist);
    if artist.is_empty() {
        return song.title.clone();
    }
    format!("{} {}", song.title, artist)
}

/// Shorten a label for list cells, keeping at most `max` characters.
pub fn shorten(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max).collect();
    out.push_str("...");
    out
}
