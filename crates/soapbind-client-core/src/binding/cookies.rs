use tracing::trace;

/// One cookie as the server set it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    /// Value exactly as received, quotes included.
    pub value: String,
    pub version: Option<String>,
    pub path: Option<String>,
    pub domain: Option<String>,
}

impl Cookie {
    fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_owned(),
            value: value.to_owned(),
            version: None,
            path: None,
            domain: None,
        }
    }

    /// `$Version=1; name=value; $Path=/; $Domain=host`, omitting absent attributes.
    fn replay(&self) -> String {
        let mut attrs = Vec::with_capacity(4);
        if let Some(version) = self.version.as_deref().filter(|v| !v.is_empty() && *v != "0") {
            attrs.push(format!("$Version={version}"));
        }
        attrs.push(format!("{}={}", self.name, self.value));
        if let Some(path) = self.path.as_deref().filter(|p| !p.is_empty()) {
            attrs.push(format!("$Path={path}"));
        }
        if let Some(domain) = self.domain.as_deref().filter(|d| !d.is_empty()) {
            attrs.push(format!("$Domain={domain}"));
        }
        attrs.join("; ")
    }
}

const RESERVED: &[&str] = &[
    "expires", "path", "comment", "domain", "max-age", "secure", "version", "httponly", "samesite",
];

/// Cookies collected from `Set-Cookie` headers, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    cookies: Vec<Cookie>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    pub fn get(&self, name: &str) -> Option<&Cookie> {
        self.cookies.iter().find(|c| c.name == name)
    }

    pub fn clear(&mut self) {
        self.cookies.clear();
    }

    /// Merges one `Set-Cookie` value. A cookie with a known name replaces the old one in place.
    pub fn load(&mut self, set_cookie: &str) {
        let mut current: Option<Cookie> = None;

        for token in set_cookie.split(';') {
            let (key, value) = match token.split_once('=') {
                Some((key, value)) => (key.trim(), value.trim()),
                None => (token.trim(), ""),
            };
            if key.is_empty() {
                continue;
            }

            let lower = key.to_ascii_lowercase();
            if RESERVED.contains(&lower.as_str()) {
                if let Some(cookie) = current.as_mut() {
                    match lower.as_str() {
                        "version" => cookie.version = Some(value.to_owned()),
                        "path" => cookie.path = Some(value.to_owned()),
                        "domain" => cookie.domain = Some(value.to_owned()),
                        _ => {}
                    }
                }
                continue;
            }

            if let Some(done) = current.replace(Cookie::new(key, value)) {
                self.insert(done);
            }
        }

        if let Some(done) = current {
            self.insert(done);
        }
    }

    fn insert(&mut self, cookie: Cookie) {
        trace!(name = %cookie.name, "cookie stored");
        match self.cookies.iter_mut().find(|c| c.name == cookie.name) {
            Some(existing) => *existing = cookie,
            None => self.cookies.push(cookie),
        }
    }

    /// Value of the single `Cookie` request header, `None` for an empty jar.
    pub fn header_value(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(Cookie::replay)
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replay_keeps_attribute_order() {
        let mut jar = CookieJar::new();
        jar.load("sid=abc123; Version=1; Path=/x; Domain=example.com");

        assert_eq!(
            jar.header_value().as_deref(),
            Some("$Version=1; sid=abc123; $Path=/x; $Domain=example.com")
        );
    }

    #[test]
    fn version_zero_is_not_replayed() {
        let mut jar = CookieJar::new();
        jar.load("vmware_soap_session=\"52a1\"; Version=0; Path=/; HttpOnly; Secure");
        assert_eq!(
            jar.header_value().as_deref(),
            Some("vmware_soap_session=\"52a1\"; $Path=/")
        );
    }

    #[test]
    fn later_cookie_replaces_earlier_one_in_place() {
        let mut jar = CookieJar::new();
        jar.load("a=1");
        jar.load("b=2; Path=/");
        jar.load("a=3");

        assert_eq!(jar.header_value().as_deref(), Some("a=3; b=2; $Path=/"));
        assert_eq!(jar.get("a").map(|c| c.value.as_str()), Some("3"));
    }

    #[test]
    fn several_cookies_in_one_header() {
        let mut jar = CookieJar::new();
        jar.load("a=1; Path=/p; b=2; Domain=d");

        assert_eq!(jar.cookies().len(), 2);
        assert_eq!(jar.get("a").unwrap().path.as_deref(), Some("/p"));
        assert_eq!(jar.get("b").unwrap().domain.as_deref(), Some("d"));
    }

    #[test]
    fn clear_empties_the_jar() {
        let mut jar = CookieJar::new();
        jar.load("a=1");
        jar.clear();
        assert!(jar.is_empty());
        assert_eq!(jar.header_value(), None);
    }
}
