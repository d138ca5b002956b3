//! Internet (RFC 822) transport headers
use std::borrow::Cow;
use time::format_description::well_known::Rfc2822;
use time::{OffsetDateTime, UtcOffset};
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, warn};

/// Parsed transport headers
#[derive(Debug, Clone, Default)]
pub struct InternetHeaders {
    /// Header fields in order of appearance, unfolded
    pub fields: Vec<(String, String)>,
    /// The `Date` header, in UTC
    pub date: Option<OffsetDateTime>,
    /// The dates of the `Received` headers, in order of appearance
    pub received: Vec<Option<OffsetDateTime>>,
}

impl InternetHeaders {
    /// Returns the first value of a header (case insensitive)
    pub fn get<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        self.get_all(name).next()
    }

    /// Returns all the values of a header (case insensitive)
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
        self.fields
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The date of the topmost `Received` header
    pub fn first_received(&self) -> Option<OffsetDateTime> {
        self.received.first().copied().flatten()
    }
}

/// Transport header parser
pub trait HeaderParser {
    /// Parses the raw header block of a message
    fn parse(&self, raw: &str) -> InternetHeaders;
}

/// The default [`HeaderParser`]: unfolds lines and parses RFC 2822 dates
#[derive(Debug, Clone, Copy, Default)]
pub struct MailHeaderParser;

impl HeaderParser for MailHeaderParser {
    fn parse(&self, raw: &str) -> InternetHeaders {
        let mut headers = InternetHeaders::default();
        for (k, v) in HeaderIter::new(raw) {
            if k.eq_ignore_ascii_case("date") && headers.date.is_none() {
                headers.date = parse_date(&v);
            } else if k.eq_ignore_ascii_case("received") {
                let date = v.rsplit_once(';').and_then(|(_, d)| parse_date(d));
                headers.received.push(date);
            }
            headers.fields.push((k.to_string(), v.into_owned()));
        }
        headers
    }
}

/// Parses an RFC 2822 date, ignoring comments, and converts it to UTC
pub fn parse_date(value: &str) -> Option<OffsetDateTime> {
    let mut clean = String::with_capacity(value.len());
    let mut depth = 0usize;
    for c in value.chars() {
        match c {
            '(' => depth += 1,
            ')' if depth > 0 => depth -= 1,
            c if depth == 0 => clean.push(c),
            _ => {}
        }
    }
    match OffsetDateTime::parse(clean.trim(), &Rfc2822) {
        Ok(dt) => Some(dt.to_offset(UtcOffset::UTC)),
        Err(e) => {
            debug!("Unparsable date \"{value}\": {e}");
            None
        }
    }
}

/// Iterator over unfolded header fields
pub struct HeaderIter<'a> {
    headers: &'a str,
    at: usize,
}

impl<'a> HeaderIter<'a> {
    /// Iterates the fields of a raw header block
    pub fn new(headers: &'a str) -> Self {
        Self { headers, at: 0 }
    }
}

impl<'a> Iterator for HeaderIter<'a> {
    type Item = (&'a str, Cow<'a, str>);

    fn next(&mut self) -> Option<Self::Item> {
        let mut lines = self.headers[self.at..].split_inclusive('\n');
        let (k, v) = loop {
            let line = lines.next()?;
            self.at += line.len();
            if line.trim().is_empty() {
                // End of the header block
                self.at = self.headers.len();
                return None;
            }
            if let Some((k, v)) = line.split_once(':') {
                break (k.trim(), v);
            }
            debug!("Skipping bogus header line");
        };
        let mut v = Cow::from(v.trim());
        for line in lines {
            if !line.starts_with(['\t', ' ']) || line.trim().is_empty() {
                break;
            }
            self.at += line.len();
            let v = v.to_mut();
            v.push(' ');
            v.push_str(line.trim());
        }
        Some((k, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_iter() {
        let hdrs = "one:1\n\
             two:    2:two\n\
             bogus line\n\
             novalue  :\n\
             folded:     one     \r\n\
             \t \t     two  \n\
             last: final";
        let mut it = HeaderIter::new(hdrs);
        assert_eq!(it.next().unwrap(), ("one", "1".into()));
        assert_eq!(it.next().unwrap(), ("two", "2:two".into()));
        assert_eq!(it.next().unwrap(), ("novalue", "".into()));
        assert_eq!(it.next().unwrap(), ("folded", "one two".into()));
        assert_eq!(it.next().unwrap(), ("last", "final".into()));
        assert!(it.next().is_none());
    }

    #[test]
    fn stops_at_body() {
        let mut it = HeaderIter::new("a: 1\r\n\r\nbody: not a header\r\n");
        assert_eq!(it.next().unwrap(), ("a", "1".into()));
        assert!(it.next().is_none());
    }

    #[test]
    fn parse_dates() {
        let h = MailHeaderParser.parse(
            "Received: from a by b; Tue, 2 Jan 2024 10:00:00 +0200\r\n\
             Received: from c by d; garbage\r\n\
             Date: Mon, 1 Jan 2024 23:30:00 -0100 (CET)\r\n\
             From: Someone <someone@example.com>\r\n",
        );
        assert_eq!(h.fields.len(), 4);
        assert_eq!(h.get("FROM"), Some("Someone <someone@example.com>"));
        assert_eq!(h.get_all("received").count(), 2);
        let date = h.date.unwrap();
        assert_eq!(date.offset(), UtcOffset::UTC);
        assert_eq!(date.unix_timestamp(), 1704155400);
        assert_eq!(h.received.len(), 2);
        assert_eq!(h.first_received().unwrap().unix_timestamp(), 1704182400);
        assert!(h.received[1].is_none());
    }
}
