//! Episode description cache.
//!
//! Descriptions are HTML fragments fetched on demand and kept for the life
//! of the session: the first request for an episode triggers a fetch, every
//! later request only toggles visibility.  Long fragments get a
//! "show more / show less" affordance.

use std::collections::HashMap;

use scraper::{Html, Selector};

/// Text length beyond which a fragment is truncated by default.
const TRUNCATE_TEXT_LEN: usize = 1000;

#[derive(Debug, Clone, PartialEq)]
pub enum DescriptionStatus {
    Loading,
    Loaded(LoadedDescription),
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDescription {
    pub html: String,
    /// Plain text extracted from the fragment, for rendering and the
    /// truncation heuristic.
    pub text: String,
    /// True when the fragment embeds images or the text is long; such
    /// descriptions start collapsed with a "show more" affordance.
    pub truncatable: bool,
    pub expanded: bool,
}

/// What the caller should do after asking for an episode's description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchDecision {
    /// Not cached yet — go fetch it.
    Fetch,
    /// Cached — visibility was toggled, no network needed.
    ToggledVisibility,
    /// A fetch is already in flight; nothing to do.
    AlreadyLoading,
}

#[derive(Debug, Default)]
pub struct Descriptions {
    entries: HashMap<String, DescriptionStatus>,
    /// Episode whose description is currently shown, if any.
    visible: Option<String>,
}

impl Descriptions {
    pub fn request(&mut self, episode_id: &str) -> FetchDecision {
        match self.entries.get(episode_id) {
            Some(DescriptionStatus::Loading) => FetchDecision::AlreadyLoading,
            Some(_) => {
                if self.visible.as_deref() == Some(episode_id) {
                    self.visible = None;
                } else {
                    self.visible = Some(episode_id.to_string());
                }
                FetchDecision::ToggledVisibility
            }
            None => {
                self.entries
                    .insert(episode_id.to_string(), DescriptionStatus::Loading);
                self.visible = Some(episode_id.to_string());
                FetchDecision::Fetch
            }
        }
    }

    /// Mark a fetch as started without touching visibility (the player's
    /// auto-load path).  Returns true when a fetch is actually needed.
    pub fn begin_fetch(&mut self, episode_id: &str) -> bool {
        if self.entries.contains_key(episode_id) {
            return false;
        }
        self.entries
            .insert(episode_id.to_string(), DescriptionStatus::Loading);
        true
    }

    pub fn insert_loaded(&mut self, episode_id: &str, html: String) {
        let (text, has_images) = analyze_fragment(&html);
        let truncatable = has_images || text.chars().count() >= TRUNCATE_TEXT_LEN;
        self.entries.insert(
            episode_id.to_string(),
            DescriptionStatus::Loaded(LoadedDescription {
                html,
                text,
                truncatable,
                expanded: false,
            }),
        );
    }

    pub fn insert_failed(&mut self, episode_id: &str) {
        self.entries
            .insert(episode_id.to_string(), DescriptionStatus::Failed);
    }

    /// Flip the show-more / show-less state of a loaded description.
    pub fn toggle_expanded(&mut self, episode_id: &str) {
        if let Some(DescriptionStatus::Loaded(desc)) = self.entries.get_mut(episode_id) {
            desc.expanded = !desc.expanded;
        }
    }

    pub fn get(&self, episode_id: &str) -> Option<&DescriptionStatus> {
        self.entries.get(episode_id)
    }

    /// Loaded HTML for an episode, if the fetch succeeded.
    pub fn html_for(&self, episode_id: &str) -> Option<&str> {
        match self.entries.get(episode_id)? {
            DescriptionStatus::Loaded(desc) => Some(&desc.html),
            _ => None,
        }
    }

    pub fn visible(&self) -> Option<(&str, &DescriptionStatus)> {
        let id = self.visible.as_deref()?;
        Some((id, self.entries.get(id)?))
    }

    pub fn hide(&mut self) {
        self.visible = None;
    }
}

/// Extract plain text and image presence from an HTML fragment.
fn analyze_fragment(html: &str) -> (String, bool) {
    let fragment = Html::parse_fragment(html);
    let has_images = match Selector::parse("img") {
        Ok(sel) => fragment.select(&sel).next().is_some(),
        Err(_) => false,
    };
    let text = fragment
        .root_element()
        .text()
        .collect::<Vec<_>>()
        .join("")
        .trim()
        .to_string();
    (text, has_images)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_request_toggles_without_refetch() {
        let mut descriptions = Descriptions::default();

        assert_eq!(descriptions.request("ep-1"), FetchDecision::Fetch);
        assert_eq!(descriptions.request("ep-1"), FetchDecision::AlreadyLoading);

        descriptions.insert_loaded("ep-1", "<p>hello</p>".into());
        assert!(descriptions.visible().is_some());

        // Already loaded: toggles hide, then show — never Fetch again.
        assert_eq!(descriptions.request("ep-1"), FetchDecision::ToggledVisibility);
        assert!(descriptions.visible().is_none());
        assert_eq!(descriptions.request("ep-1"), FetchDecision::ToggledVisibility);
        assert!(descriptions.visible().is_some());
    }

    #[test]
    fn failed_fetch_stores_a_toggleable_placeholder() {
        let mut descriptions = Descriptions::default();
        assert_eq!(descriptions.request("ep-9"), FetchDecision::Fetch);
        descriptions.insert_failed("ep-9");

        assert_eq!(descriptions.get("ep-9"), Some(&DescriptionStatus::Failed));
        assert_eq!(descriptions.request("ep-9"), FetchDecision::ToggledVisibility);
        assert_eq!(descriptions.html_for("ep-9"), None);
    }

    #[test]
    fn image_triggers_truncation() {
        let mut descriptions = Descriptions::default();
        descriptions.insert_loaded("ep-1", "<p>short <img src=\"x.jpg\"> text</p>".into());
        match descriptions.get("ep-1") {
            Some(DescriptionStatus::Loaded(desc)) => {
                assert!(desc.truncatable);
                assert!(!desc.expanded);
            }
            other => panic!("unexpected status: {other:?}"),
        }
    }

    #[test]
    fn long_text_triggers_truncation_short_does_not() {
        let mut descriptions = Descriptions::default();

        let long = format!("<p>{}</p>", "a".repeat(TRUNCATE_TEXT_LEN));
        descriptions.insert_loaded("long", long);
        let Some(DescriptionStatus::Loaded(desc)) = descriptions.get("long") else {
            panic!("not loaded");
        };
        assert!(desc.truncatable);

        descriptions.insert_loaded("short", "<p>a quick note</p>".into());
        let Some(DescriptionStatus::Loaded(desc)) = descriptions.get("short") else {
            panic!("not loaded");
        };
        assert!(!desc.truncatable);
        assert_eq!(desc.text, "a quick note");
    }

    #[test]
    fn show_more_toggles_expanded() {
        let mut descriptions = Descriptions::default();
        descriptions.insert_loaded("ep-1", "<img src=\"x.jpg\">".into());
        descriptions.toggle_expanded("ep-1");
        let Some(DescriptionStatus::Loaded(desc)) = descriptions.get("ep-1") else {
            panic!("not loaded");
        };
        assert!(desc.expanded);
        descriptions.toggle_expanded("ep-1");
        let Some(DescriptionStatus::Loaded(desc)) = descriptions.get("ep-1") else {
            panic!("not loaded");
        };
        assert!(!desc.expanded);
    }

    #[test]
    fn text_extraction_strips_markup() {
        let (text, has_images) = analyze_fragment("<p>one <b>two</b></p><p>three</p>");
        assert_eq!(text, "one twothree");
        assert!(!has_images);
    }
}
