use crate::rules::{RuleDefinition, RuleGroup, ToolField};

pub const NAME: &str = "web";

const PASTE_SITE: &str = r"^https?://([^/?#\s]*\.)?(pastebin\.com|hastebin\.com|pastie\.org|paste\.ee|gist\.github\.com|gist\.githubusercontent\.com)([/:?#]|$)";
const HTTP_URL: &str = r"^https?://\S+$";
const NON_EMPTY: &str = r"\S";

pub fn group() -> RuleGroup {
    RuleGroup::new(
        NAME,
        vec![
            RuleDefinition::deny(
                "paste-site-fetch",
                "webfetch",
                ToolField::Url,
                PASTE_SITE,
                "Fetch from a paste site",
            ),
            RuleDefinition::allow("safe-fetch", "webfetch", ToolField::Url, HTTP_URL, "Plain http(s) fetch"),
            RuleDefinition::allow("safe-search", "websearch", ToolField::Query, NON_EMPTY, "Web search"),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn paste_host_must_be_the_url_host() {
        let re = Regex::new(PASTE_SITE).unwrap();
        assert!(re.is_match("https://pastebin.com"));
        assert!(re.is_match("https://gist.githubusercontent.com/a/b/raw"));
        assert!(!re.is_match("https://notpastebin.com/x"));
        assert!(!re.is_match("https://example.com/?u=https://pastebin.com"));
    }
}
