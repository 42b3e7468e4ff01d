//! # Topic Layout
//!
//! ```text
//! <top>/connected        connection state ("0" / "1" / "2"), retained
//! <top>/set/<item>       actions addressed to an item
//! <top>/status/<item>    status published for an item, retained
//! ```

/// Topic names under one top-level topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicLayout {
    top_level: String,
}

impl TopicLayout {
    pub fn new(top_level: impl Into<String>) -> Self {
        let top_level: String = top_level.into();
        Self {
            top_level: top_level.trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn top_level(&self) -> &str {
        &self.top_level
    }

    #[must_use]
    pub fn connected(&self) -> String {
        format!("{}/connected", self.top_level)
    }

    #[must_use]
    pub fn action(&self, item: &str) -> String {
        format!("{}/set/{}", self.top_level, item)
    }

    #[must_use]
    pub fn status(&self, item: &str) -> String {
        format!("{}/status/{}", self.top_level, item)
    }

    /// Filter matching every action topic.
    #[must_use]
    pub fn all_actions(&self) -> String {
        format!("{}/set/#", self.top_level)
    }

    /// Item addressed by an action topic, if `topic` is one.
    #[must_use]
    pub fn action_item<'a>(&self, topic: &'a str) -> Option<&'a str> {
        topic
            .strip_prefix(self.top_level.as_str())?
            .strip_prefix("/set/")
            .filter(|item| !item.is_empty())
    }
}

/// Whether `topic` matches the subscription `filter`.
///
/// `+` matches exactly one level; `#` must be the last level and matches
/// the remaining levels, including none.
#[must_use]
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');

    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return filter_levels.next().is_none(),
            (Some("+"), Some(_)) => {}
            (Some(f), Some(t)) if f == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}
