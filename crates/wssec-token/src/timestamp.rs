#![forbid(unsafe_code)]

//! `wsu:Timestamp` token and the xsd:dateTime formatting shared by tokens.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use wssec_core::{ns, Error};
use wssec_xml::Element;

use crate::id;

/// Format an instant as a UTC xsd:dateTime, with or without milliseconds.
pub fn format_instant(instant: DateTime<Utc>, milliseconds: bool) -> String {
    let format = if milliseconds {
        SecondsFormat::Millis
    } else {
        SecondsFormat::Secs
    };
    instant.to_rfc3339_opts(format, true)
}

/// Parse an xsd:dateTime as found in `wsu:Created`.
pub fn parse_instant(text: &str) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(text.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::XmlStructure(format!("invalid xsd:dateTime {text:?}: {e}")))
}

/// A Timestamp with a Created time and, for a positive time to live, an
/// Expires time.
#[derive(Debug, Clone)]
pub struct Timestamp {
    id: String,
    created: DateTime<Utc>,
    time_to_live: i64,
    milliseconds: bool,
}

impl Timestamp {
    /// A timestamp created now, expiring after `time_to_live` seconds.
    pub fn new(time_to_live: i64, milliseconds: bool) -> Self {
        Self::at(Utc::now(), time_to_live, milliseconds)
    }

    pub fn at(created: DateTime<Utc>, time_to_live: i64, milliseconds: bool) -> Self {
        Self {
            id: id::generate_id("Timestamp-"),
            created,
            time_to_live,
            milliseconds,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn expires(&self) -> Option<DateTime<Utc>> {
        (self.time_to_live > 0).then(|| self.created + Duration::seconds(self.time_to_live))
    }

    pub fn to_element(&self) -> Element {
        let mut el = Element::new(ns::WSU, ns::prefix::WSU, ns::node::TIMESTAMP);
        id::set_wsu_id(&mut el, &self.id);
        el.push_child(
            Element::new(ns::WSU, ns::prefix::WSU, ns::node::CREATED)
                .text(format_instant(self.created, self.milliseconds)),
        );
        if let Some(expires) = self.expires() {
            el.push_child(
                Element::new(ns::WSU, ns::prefix::WSU, ns::node::EXPIRES)
                    .text(format_instant(expires, self.milliseconds)),
            );
        }
        el
    }
}
