//! Article detail page extraction.
//!
//! Detail pages are scraped with a [`BestEffortExtractor`] per field: an
//! ordered list of independent steps, each tried only if the previous one
//! produced nothing. The steps rely on markup the site happens to emit today
//! (Open Graph tags, JSON-LD, `<title>`), so any of them may stop matching
//! without notice; a field that no step can fill is reported as `None`.
//!
//! | Field | Steps, in order |
//! |-------|-----------------|
//! | title | `og:title` → `<title>` with site suffix stripped |
//! | description | `og:description` |
//! | published_at | JSON-LD `datePublished` → `article:published_time` |

use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

use crate::models::EpochSeconds;
use crate::utils::{TitleSuffix, norm_text, parse_timestamp};

static DATE_PUBLISHED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)"datePublished"\s*:\s*"([^"]+)""#).expect("datePublished pattern is valid")
});

/// A parsed detail page plus what the steps need to interpret it.
pub struct ArticlePage {
    raw: String,
    document: Html,
    suffix: TitleSuffix,
    /// Zone for timestamps written without an offset.
    timezone: Tz,
}

impl ArticlePage {
    pub fn parse(raw: &str, suffix: &TitleSuffix, timezone: Tz) -> Self {
        Self {
            raw: raw.to_string(),
            document: Html::parse_document(raw),
            suffix: suffix.clone(),
            timezone,
        }
    }

    fn meta_property(&self, property: &str) -> Option<String> {
        let selector = Selector::parse(&format!(r#"meta[property="{property}"]"#)).ok()?;
        self.document
            .select(&selector)
            .filter_map(|el| el.value().attr("content"))
            .map(norm_text)
            .find(|content| !content.is_empty())
    }
}

/// One named step of an extraction chain.
pub struct ExtractionStep<T> {
    pub name: &'static str,
    pub run: fn(&ArticlePage) -> Option<T>,
}

/// An ordered fallback chain for one field.
pub struct BestEffortExtractor<T: 'static> {
    pub field: &'static str,
    pub steps: &'static [ExtractionStep<T>],
}

impl<T> BestEffortExtractor<T> {
    /// Run the steps in order and return the first value produced.
    pub fn extract(&self, page: &ArticlePage) -> Option<T> {
        for step in self.steps {
            if let Some(value) = (step.run)(page) {
                debug!(field = self.field, step = step.name, "Extracted");
                return Some(value);
            }
        }
        debug!(field = self.field, "No extraction step matched");
        None
    }
}

pub const TITLE: BestEffortExtractor<String> = BestEffortExtractor {
    field: "title",
    steps: &[
        ExtractionStep {
            name: "og:title",
            run: og_title,
        },
        ExtractionStep {
            name: "title-element",
            run: title_element,
        },
    ],
};

pub const DESCRIPTION: BestEffortExtractor<String> = BestEffortExtractor {
    field: "description",
    steps: &[ExtractionStep {
        name: "og:description",
        run: og_description,
    }],
};

pub const PUBLISHED_AT: BestEffortExtractor<EpochSeconds> = BestEffortExtractor {
    field: "published_at",
    steps: &[
        ExtractionStep {
            name: "json-ld:datePublished",
            run: json_ld_date_published,
        },
        ExtractionStep {
            name: "article:published_time",
            run: meta_published_time,
        },
    ],
};

fn og_title(page: &ArticlePage) -> Option<String> {
    page.meta_property("og:title")
}

fn title_element(page: &ArticlePage) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    let element = page.document.select(&selector).next()?;
    let text = norm_text(&element.text().collect::<String>());
    let title = page.suffix.strip(&text);
    (!title.is_empty()).then_some(title)
}

fn og_description(page: &ArticlePage) -> Option<String> {
    page.meta_property("og:description")
}

fn json_ld_date_published(page: &ArticlePage) -> Option<EpochSeconds> {
    DATE_PUBLISHED
        .captures_iter(&page.raw)
        .filter_map(|caps| parse_timestamp(&caps[1], page.timezone))
        .find(|ts| *ts > 0)
}

fn meta_published_time(page: &ArticlePage) -> Option<EpochSeconds> {
    page.meta_property("article:published_time")
        .and_then(|raw| parse_timestamp(&raw, page.timezone))
        .filter(|ts| *ts > 0)
}

/// Fields recovered from a detail page; `None` where every step came up empty.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ArticleFields {
    pub title: Option<String>,
    pub description: Option<String>,
    pub published_at: Option<EpochSeconds>,
}

/// Run all field chains over a detail page.
pub fn extract_article(raw: &str, suffix: &TitleSuffix, timezone: Tz) -> ArticleFields {
    let page = ArticlePage::parse(raw, suffix, timezone);
    ArticleFields {
        title: TITLE.extract(&page),
        description: DESCRIPTION.extract(&page),
        published_at: PUBLISHED_AT.extract(&page),
    }
}
