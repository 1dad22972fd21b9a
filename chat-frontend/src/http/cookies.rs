use std::fmt;

/// An ordered `Cookie` request header, e.g. `access_token=abc; refresh_token=def`.
///
/// Segments without `=` are kept verbatim so opaque strings survive a round
/// trip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieHeader {
    pairs: Vec<(String, Option<String>)>,
}

impl CookieHeader {
    pub fn parse(header: &str) -> Self {
        let pairs = header
            .split(';')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(|segment| match segment.split_once('=') {
                Some((name, value)) => (name.trim().to_string(), Some(value.trim().to_string())),
                None => (segment.to_string(), None),
            })
            .collect();

        Self { pairs }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.as_deref())
    }

    pub fn set(&mut self, name: &str, value: &str) {
        match self.pairs.iter_mut().find(|(n, _)| n == name) {
            Some(pair) => pair.1 = Some(value.to_string()),
            None => self.pairs.push((name.to_string(), Some(value.to_string()))),
        }
    }

    pub fn remove(&mut self, name: &str) {
        self.pairs.retain(|(n, _)| n != name);
    }

    /// Fold one `Set-Cookie` response header into this request header.
    ///
    /// Only the leading `name=value` is used; `Max-Age=0` deletes the cookie.
    pub fn apply_set_cookie(&mut self, set_cookie: &str) {
        let mut attributes = set_cookie.split(';').map(str::trim);

        let Some((name, value)) = attributes.next().and_then(|kv| kv.split_once('=')) else {
            return;
        };
        let name = name.trim();
        if name.is_empty() {
            return;
        }

        let expired = attributes.any(|attr| {
            attr.split_once('=')
                .map(|(k, v)| k.trim().eq_ignore_ascii_case("max-age") && v.trim() == "0")
                .unwrap_or(false)
        });

        if expired {
            self.remove(name);
        } else {
            self.set(name, value.trim().trim_matches('"'));
        }
    }
}

impl fmt::Display for CookieHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.pairs.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            match value {
                Some(value) => write!(f, "{}={}", name, value)?,
                None => f.write_str(name)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_formats_in_order() {
        let header = CookieHeader::parse("access_token=abc;  refresh_token=def");
        assert_eq!(header.get("access_token"), Some("abc"));
        assert_eq!(header.get("refresh_token"), Some("def"));
        assert_eq!(header.to_string(), "access_token=abc; refresh_token=def");
    }

    #[test]
    fn opaque_segment_survives() {
        let header = CookieHeader::parse("eyJhbGciOi.payload.sig");
        assert_eq!(header.to_string(), "eyJhbGciOi.payload.sig");
    }

    #[test]
    fn set_cookie_replaces_existing_value() {
        let mut header = CookieHeader::parse("access_token=old; refresh_token=r1");
        header.apply_set_cookie("access_token=new; HttpOnly; Path=/; SameSite=Lax");
        assert_eq!(header.to_string(), "access_token=new; refresh_token=r1");
    }

    #[test]
    fn set_cookie_appends_unknown_cookie() {
        let mut header = CookieHeader::parse("refresh_token=r1");
        header.apply_set_cookie("access_token=\"quoted\"; Path=/");
        assert_eq!(header.get("access_token"), Some("quoted"));
    }

    #[test]
    fn max_age_zero_removes_cookie() {
        let mut header = CookieHeader::parse("access_token=a; refresh_token=r1");
        header.apply_set_cookie("refresh_token=; Max-Age=0; Path=/");
        assert_eq!(header.to_string(), "access_token=a");
    }

    #[test]
    fn malformed_set_cookie_is_ignored() {
        let mut header = CookieHeader::parse("a=1");
        header.apply_set_cookie("garbage");
        header.apply_set_cookie("=value");
        assert_eq!(header.to_string(), "a=1");
    }
}
