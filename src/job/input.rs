/// Immutable descriptor handed to a [`Job`](super::Job).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobInput {
    index: usize,
    title: String,
    ordinal: usize,
}

impl JobInput {
    /// Builds an input with an explicit position. The ordinal is `index + 1`.
    pub fn new(index: usize, title: impl Into<String>) -> Self {
        Self {
            index,
            title: title.into(),
            ordinal: index.saturating_add(1),
        }
    }

    /// Assigns indices and 1-based ordinals positionally.
    pub fn batch<I, S>(titles: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        titles
            .into_iter()
            .enumerate()
            .map(|(index, title)| Self::new(index, title))
            .collect()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }
}
