//! Field descriptor table: one entry per logical article field.
//!
//! Every field carries two selector variants targeting semantically the
//! same content:
//! - `static_selector`: CSS, applied by the `scraper` crate to the fetched,
//!   non-rendered document
//! - `rendered_selector`: XPath, passed opaquely to the rendering
//!   collaborator for the live page
//!
//! CSS cannot express XPath's `text()=` predicate, so descriptors that need
//! it (member_only) also carry `exact_text`: on the static channel only
//! elements whose trimmed text equals the literal count as matches.

use once_cell::sync::Lazy;

/// Whether a field collects one value or an ordered list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Multiplicity {
    Single,
    List,
}

/// Static configuration for one logical field.
#[derive(Debug)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub static_selector: &'static str,
    pub rendered_selector: &'static str,
    pub multiplicity: Multiplicity,
    /// Required exact (trimmed) element text, for fields whose selector
    /// alone is too broad on the static channel.
    pub exact_text: Option<&'static str>,
}

/// The full descriptor table, in feed order.
pub static FIELDS: Lazy<Vec<FieldDescriptor>> = Lazy::new(|| {
    vec![
        FieldDescriptor {
            name: "title",
            static_selector: r#"h1[data-testid="storyTitle"]"#,
            rendered_selector: "//h1[@data-testid='storyTitle']",
            multiplicity: Multiplicity::Single,
            exact_text: None,
        },
        FieldDescriptor {
            name: "subtitle",
            static_selector: "h2.pw-subtitle-paragraph",
            rendered_selector: "//h2[contains(@class, 'pw-subtitle-paragraph')]",
            multiplicity: Multiplicity::Single,
            exact_text: None,
        },
        FieldDescriptor {
            name: "summary",
            static_selector: "p.pw-post-body-paragraph",
            rendered_selector: "//p[contains(@class, 'pw-post-body-paragraph')]",
            multiplicity: Multiplicity::List,
            exact_text: None,
        },
        FieldDescriptor {
            name: "tags",
            static_selector: r#"a[href*="/tag/"] div"#,
            rendered_selector: "//a[contains(@href, '/tag/')]/div",
            multiplicity: Multiplicity::List,
            exact_text: None,
        },
        FieldDescriptor {
            name: "author",
            static_selector: r#"a[data-testid="authorName"]"#,
            rendered_selector: "//a[@data-testid='authorName']",
            multiplicity: Multiplicity::Single,
            exact_text: None,
        },
        FieldDescriptor {
            name: "publication",
            static_selector: r#"a[data-testid="publicationName"] p"#,
            rendered_selector: "//a[@data-testid='publicationName']/p",
            multiplicity: Multiplicity::Single,
            exact_text: None,
        },
        FieldDescriptor {
            name: "claps",
            static_selector: "div.pw-multi-vote-count p button",
            rendered_selector: "//div[contains(@class, 'pw-multi-vote-count')]/div/div/p/button",
            multiplicity: Multiplicity::Single,
            exact_text: None,
        },
        FieldDescriptor {
            name: "comments",
            static_selector: "span.pw-responses-count",
            rendered_selector: "//span[contains(@class, 'pw-responses-count')]",
            multiplicity: Multiplicity::Single,
            exact_text: None,
        },
        FieldDescriptor {
            name: "publish_date",
            static_selector: r#"span[data-testid="storyPublishDate"]"#,
            rendered_selector: "//span[@data-testid='storyPublishDate']",
            multiplicity: Multiplicity::Single,
            exact_text: None,
        },
        FieldDescriptor {
            name: "read_length",
            static_selector: r#"span[data-testid="storyReadTime"]"#,
            rendered_selector: "//span[@data-testid='storyReadTime']",
            multiplicity: Multiplicity::Single,
            exact_text: None,
        },
        FieldDescriptor {
            name: "member_only",
            static_selector: "div.speechify-ignore p",
            rendered_selector:
                "//div[contains(@class, 'speechify-ignore')]//p[text()='Member-only story']",
            multiplicity: Multiplicity::Single,
            exact_text: Some("Member-only story"),
        },
    ]
});
