/// Lower-cased spellings seen in the sheets, mapped to the display name.
const SYNONYMS: &[(&str, &str)] = &[
    ("sci-fi", "Science Fiction"),
    ("scifi", "Science Fiction"),
    ("sci fi", "Science Fiction"),
    ("sf", "Science Fiction"),
    ("science fiction", "Science Fiction"),
    ("science-fiction", "Science Fiction"),
    ("rom-com", "Romantic Comedy"),
    ("romcom", "Romantic Comedy"),
    ("romantic comedy", "Romantic Comedy"),
    ("animated", "Animation"),
    ("anime", "Animation"),
    ("cartoon", "Animation"),
    ("doc", "Documentary"),
    ("docu", "Documentary"),
    ("documentaries", "Documentary"),
    ("k-drama", "K-Drama"),
    ("kdrama", "K-Drama"),
    ("thrillers", "Thriller"),
    ("suspense", "Thriller"),
    ("bio", "Biography"),
    ("biopic", "Biography"),
    ("musical", "Music"),
    ("superhero", "Superhero"),
    ("super hero", "Superhero"),
    ("war film", "War"),
];

/// Canonical display form of one genre token.
pub fn canonicalize(token: &str) -> String {
    let trimmed = token.trim();
    let lower = trimmed.to_lowercase();
    if let Some((_, canonical)) = SYNONYMS.iter().find(|(k, _)| *k == lower) {
        return (*canonical).to_string();
    }
    title_case(trimmed)
}

fn title_case(s: &str) -> String {
    s.split(' ')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synonyms_map_to_display_names() {
        assert_eq!(canonicalize("sci-fi"), "Science Fiction");
        assert_eq!(canonicalize(" SCI-FI "), "Science Fiction");
        assert_eq!(canonicalize("Anime"), "Animation");
    }

    #[test]
    fn unknown_tokens_are_title_cased() {
        assert_eq!(canonicalize("dark comedy"), "Dark Comedy");
        assert_eq!(canonicalize("ACTION"), "Action");
        assert_eq!(canonicalize("Drama"), "Drama");
    }
}
