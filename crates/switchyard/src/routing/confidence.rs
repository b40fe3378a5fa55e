/// Keyword-overlap heuristic for [`Handler::confidence`](crate::handler::Handler::confidence).
///
/// Keywords are lowercased at construction and matched as substrings of the
/// lowercased request:
/// - two or more keyword hits: 0.9
/// - one hit: 0.7
/// - no hits: 0.3
#[derive(Debug, Clone, Default)]
pub struct KeywordConfidence {
    keywords: Vec<String>,
}

impl KeywordConfidence {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for keyword in keywords {
            let keyword = keyword.into().trim().to_lowercase();
            if !keyword.is_empty() && !normalized.contains(&keyword) {
                normalized.push(keyword);
            }
        }
        Self {
            keywords: normalized,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// Keywords found in `request`, in declaration order.
    pub fn matched(&self, request: &str) -> Vec<&str> {
        let request = request.to_lowercase();
        self.keywords
            .iter()
            .filter(|keyword| request.contains(keyword.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// `None` when no keywords are configured.
    pub fn score(&self, request: &str) -> Option<f64> {
        if self.keywords.is_empty() {
            return None;
        }
        let score = match self.matched(request).len() {
            0 => 0.3,
            1 => 0.7,
            _ => 0.9,
        };
        Some(score)
    }
}
