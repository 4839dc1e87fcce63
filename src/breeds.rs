use std::fs;
use std::path::Path;

/// Ordered class labels of the breed classifier.
///
/// Labels are the dataset's sub-directory names sorted by name, which is the
/// order the model was trained with.
#[derive(Debug, Clone, Default)]
pub struct BreedCatalog {
    labels: Vec<String>,
    /// (display name, lowercased search form) per label
    search: Vec<(String, String)>,
}

impl BreedCatalog {
    pub fn new(mut labels: Vec<String>) -> Self {
        labels.sort();
        let search = labels
            .iter()
            .map(|label| {
                let display = display_name(label);
                let needle = display.to_lowercase();
                (display, needle)
            })
            .collect();
        Self { labels, search }
    }

    /// Read labels from the sub-directories of `dir`; a missing directory gives
    /// an empty catalog
    pub fn load(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Breed directory {} not readable: {} - no labels", dir.display(), e);
                return Self::default();
            }
        };

        let labels: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        tracing::info!("Loaded {} breed labels from {}", labels.len(), dir.display());
        Self::new(labels)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label for a class index, or the index itself when out of range
    pub fn label(&self, index: usize) -> String {
        self.labels
            .get(index)
            .cloned()
            .unwrap_or_else(|| index.to_string())
    }

    /// Best-effort breed mentioned in a question; the longest name wins so
    /// "english springer" beats "springer"
    pub fn detect(&self, question: &str) -> Option<&str> {
        let haystack = question.to_lowercase();
        self.search
            .iter()
            .filter(|(_, needle)| !needle.is_empty() && haystack.contains(needle.as_str()))
            .max_by_key(|(_, needle)| needle.len())
            .map(|(display, _)| display.as_str())
    }
}

/// Human form of a label: WordNet id prefix removed, `_`/`-` turned into spaces
pub fn display_name(label: &str) -> String {
    let stripped = match label.split_once('-') {
        Some((prefix, rest))
            if prefix.len() > 1
                && prefix.starts_with('n')
                && prefix[1..].chars().all(|c| c.is_ascii_digit()) =>
        {
            rest
        }
        _ => label,
    };
    stripped
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_strips_wordnet_prefix() {
        assert_eq!(display_name("n02085620-Chihuahua"), "Chihuahua");
        assert_eq!(
            display_name("n02102040-English_springer"),
            "English springer"
        );
        assert_eq!(display_name("golden_retriever"), "golden retriever");
        assert_eq!(display_name("Shih-Tzu"), "Shih Tzu");
        assert_eq!(display_name("no-digits"), "no digits");
    }

    #[test]
    fn test_labels_are_sorted_and_indexed() {
        let catalog = BreedCatalog::new(vec!["pug".into(), "beagle".into(), "collie".into()]);
        assert_eq!(catalog.label(0), "beagle");
        assert_eq!(catalog.label(2), "pug");
        assert_eq!(catalog.label(7), "7");
    }

    #[test]
    fn test_detect_prefers_longest_match() {
        let catalog = BreedCatalog::new(vec![
            "n02102040-English_springer".into(),
            "n02102318-springer".into(),
            "n02085620-Chihuahua".into(),
        ]);
        assert_eq!(
            catalog.detect("How much exercise does an English Springer need?"),
            Some("English springer")
        );
        assert_eq!(catalog.detect("my chihuahua shivers"), Some("Chihuahua"));
        assert_eq!(catalog.detect("what about cats"), None);
    }

    #[test]
    fn test_load_reads_only_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("n02099601-golden_retriever")).unwrap();
        fs::create_dir(dir.path().join("n02088364-beagle")).unwrap();
        fs::write(dir.path().join("README.txt"), "not a breed").unwrap();

        let catalog = BreedCatalog::load(dir.path());
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.label(0), "n02088364-beagle");
        assert_eq!(catalog.detect("Do golden retrievers shed?"), Some("golden retriever"));
    }

    #[test]
    fn test_load_missing_directory_is_empty() {
        let catalog = BreedCatalog::load("/definitely/not/here");
        assert!(catalog.is_empty());
    }
}
