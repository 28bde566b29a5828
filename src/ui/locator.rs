//! Element locators
//!
//! The viewer's web client is a qooxdoo application; in debug builds every
//! widget's root element carries a `qxclass` attribute naming its class,
//! which is the most stable handle the DOM offers.

use std::fmt;
use std::str::FromStr;

use crate::common::Error;

/// How to find an element in the rendered document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// Elements whose `qxclass` marker equals the given widget class
    WidgetClass(String),
    /// The parent of the element whose text is exactly the given label
    TextParent(String),
    /// A widget of the given class with a direct child labelled `text`
    WidgetText { class: String, text: String },
    /// Raw XPath
    XPath(String),
    /// CSS selector, e.g. a stable `[data-action=...]` attribute
    Css(String),
}

/// WebDriver location strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    XPath,
    Css,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::XPath => "xpath",
            Strategy::Css => "css selector",
        }
    }
}

/// Quote a string as an XPath literal
pub fn xpath_literal(s: &str) -> String {
    if !s.contains('\'') {
        format!("'{}'", s)
    } else if !s.contains('"') {
        format!("\"{}\"", s)
    } else {
        let parts: Vec<String> = s.split('\'').map(|p| format!("'{}'", p)).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

/// Quote a string as a CSS string token
pub fn css_string(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

impl Locator {
    pub fn widget_class(class: impl Into<String>) -> Self {
        Locator::WidgetClass(class.into())
    }

    pub fn text_parent(text: impl Into<String>) -> Self {
        Locator::TextParent(text.into())
    }

    pub fn widget_text(class: impl Into<String>, text: impl Into<String>) -> Self {
        Locator::WidgetText {
            class: class.into(),
            text: text.into(),
        }
    }

    /// Strategy and query string for a WebDriver element search
    pub fn query(&self) -> (Strategy, String) {
        match self {
            Locator::WidgetClass(class) => (
                Strategy::XPath,
                format!("//div[@qxclass={}]", xpath_literal(class)),
            ),
            Locator::TextParent(text) => (
                Strategy::XPath,
                format!("//div[text()={}]/..", xpath_literal(text)),
            ),
            Locator::WidgetText { class, text } => (
                Strategy::XPath,
                format!(
                    "//div[@qxclass={}][div[text()={}]]",
                    xpath_literal(class),
                    xpath_literal(text)
                ),
            ),
            Locator::XPath(xpath) => (Strategy::XPath, xpath.clone()),
            Locator::Css(css) => (Strategy::Css, css.clone()),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (strategy, query) = self.query();
        write!(f, "{} {}", strategy.as_str(), query)
    }
}

/// Parse the configuration form: `text:Session`, `class:skel.widgets.Window.DisplayDesktop`,
/// `widget:qx.ui.form.Button/Save`, `xpath://...`, `css:[data-action=save]`
impl FromStr for Locator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, value) = s
            .split_once(':')
            .ok_or_else(|| Error::Config(format!("Locator '{}' has no kind prefix", s)))?;

        if value.is_empty() {
            return Err(Error::Config(format!("Locator '{}' is empty", s)));
        }

        match kind {
            "text" => Ok(Locator::TextParent(value.to_string())),
            "class" => Ok(Locator::WidgetClass(value.to_string())),
            "widget" => {
                let (class, text) = value.split_once('/').ok_or_else(|| {
                    Error::Config(format!("Widget locator '{}' needs class/text", s))
                })?;
                Ok(Locator::widget_text(class, text))
            }
            "xpath" => Ok(Locator::XPath(value.to_string())),
            "css" => Ok(Locator::Css(value.to_string())),
            other => Err(Error::Config(format!("Unknown locator kind '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widget_class_query() {
        let (strategy, query) =
            Locator::widget_class("skel.widgets.Window.DisplayDesktop").query();
        assert_eq!(strategy, Strategy::XPath);
        assert_eq!(query, "//div[@qxclass='skel.widgets.Window.DisplayDesktop']");
    }

    #[test]
    fn test_text_parent_query() {
        let (_, query) = Locator::text_parent("Image Layout").query();
        assert_eq!(query, "//div[text()='Image Layout']/..");
    }

    #[test]
    fn test_widget_text_query() {
        let (_, query) = Locator::widget_text("qx.ui.form.Button", "Save").query();
        assert_eq!(query, "//div[@qxclass='qx.ui.form.Button'][div[text()='Save']]");
    }

    #[test]
    fn test_xpath_literal_quoting() {
        assert_eq!(xpath_literal("plain"), "'plain'");
        assert_eq!(xpath_literal("it's"), "\"it's\"");
        assert_eq!(
            xpath_literal("a'b\"c"),
            "concat('a', \"'\", 'b\"c')"
        );
    }

    #[test]
    fn test_parse_config_locators() {
        assert_eq!(
            "text:Session".parse::<Locator>().unwrap(),
            Locator::text_parent("Session")
        );
        assert_eq!(
            "css:[data-action=save]".parse::<Locator>().unwrap(),
            Locator::Css("[data-action=save]".to_string())
        );
        assert_eq!(
            "widget:qx.ui.form.Button/Close".parse::<Locator>().unwrap(),
            Locator::widget_text("qx.ui.form.Button", "Close")
        );
        assert_eq!(
            "xpath://div[@id='a']".parse::<Locator>().unwrap(),
            Locator::XPath("//div[@id='a']".to_string())
        );
        assert!("Session".parse::<Locator>().is_err());
        assert!("text:".parse::<Locator>().is_err());
        assert!("id:foo".parse::<Locator>().is_err());
    }
}
