//! Wire format of a log record.
//!
//! Each record is one JSON object per line:
//!
//! ```text
//! {"time":"2018-01-03T03:40:02.087012761Z","level":"warning","src_file":"src/app.rs:27",
//!  "src_line":"25","message":"...","context":{"f0":"..."},"backtrace":"..."}
//! ```
//!
//! Key names and the time layout are consumed by downstream log parsers and
//! must stay byte-stable.

use std::io::{self, Write};

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use log::{
    Record,
    kv::{self, Key, Source, Value, VisitSource},
};
use serde::{
    Deserialize, Serialize,
    ser::{SerializeMap, Serializer},
};
use serde_json::{Map, Value as JsonValue};

use crate::{
    error::{Error, Result},
    level::{Severity, encode_level},
};

/// ISO8601 with nanosecond precision. The instant is always rendered in UTC,
/// so the zone designator is the literal `Z`.
pub const ISO8601: &str = "%Y-%m-%dT%H:%M:%S%.9fZ";

pub const TIME_KEY: &str = "time";
pub const LEVEL_KEY: &str = "level";
pub const CALLER_KEY: &str = "src_file";
pub const SOURCE_LINE_KEY: &str = "src_line";
pub const MESSAGE_KEY: &str = "message";
pub const CONTEXT_KEY: &str = "context";
pub const BACKTRACE_KEY: &str = "backtrace";

/// Which serialization key each structural field is written under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldKeys {
    pub time: &'static str,
    pub level: &'static str,
    pub caller: &'static str,
    pub source_line: &'static str,
    pub message: &'static str,
    pub context: &'static str,
    pub backtrace: &'static str,
}

pub const FIELD_KEYS: FieldKeys = FieldKeys {
    time: TIME_KEY,
    level: LEVEL_KEY,
    caller: CALLER_KEY,
    source_line: SOURCE_LINE_KEY,
    message: MESSAGE_KEY,
    context: CONTEXT_KEY,
    backtrace: BACKTRACE_KEY,
};

impl FieldKeys {
    /// Keys in the order they appear in a record.
    pub fn in_wire_order(&self) -> [&'static str; 7] {
        [
            self.time,
            self.level,
            self.caller,
            self.source_line,
            self.message,
            self.context,
            self.backtrace,
        ]
    }
}

impl Default for FieldKeys {
    fn default() -> Self {
        FIELD_KEYS
    }
}

/// How the emitting call site is rendered under `src_file`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallerEncoding {
    /// Last two path components plus the line, e.g. `tests/logger.rs:42`.
    #[default]
    Short,
    /// Full path as recorded by the compiler plus the line.
    Full,
}

pub fn encode_time<Tz: TimeZone>(instant: &DateTime<Tz>) -> String {
    instant.with_timezone(&Utc).format(ISO8601).to_string()
}

/// Inverse of [`encode_time`].
pub fn parse_time(input: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(input, ISO8601)
        .map(|naive| naive.and_utc())
        .map_err(|source| Error::InvalidTime {
            input: input.to_string(),
            source,
        })
}

pub fn encode_caller(encoding: CallerEncoding, file: &str, line: Option<u32>) -> String {
    let path = match encoding {
        CallerEncoding::Short => trim_to_parent(file),
        CallerEncoding::Full => file,
    };
    match line {
        Some(line) => format!("{path}:{line}"),
        None => path.to_string(),
    }
}

fn trim_to_parent(file: &str) -> &str {
    const SEPARATORS: [char; 2] = ['/', '\\'];
    let Some(last) = file.rfind(SEPARATORS) else {
        return file;
    };
    match file[..last].rfind(SEPARATORS) {
        Some(parent) => &file[parent + 1..],
        None => file,
    }
}

/// Top-level values a handle attaches to a record besides the message.
///
/// Travels through the engine as the record's key/values and is decoded
/// again by [`RecordEncoder`].
#[derive(Debug)]
pub(crate) struct Envelope<'a> {
    pub(crate) src_line: &'a str,
    pub(crate) context: &'a Map<String, JsonValue>,
    pub(crate) backtrace: Option<&'a str>,
}

impl Source for Envelope<'_> {
    fn visit<'kvs>(
        &'kvs self,
        visitor: &mut dyn VisitSource<'kvs>,
    ) -> std::result::Result<(), kv::Error> {
        visitor.visit_pair(Key::from(FIELD_KEYS.source_line), Value::from(self.src_line))?;
        visitor.visit_pair(Key::from(FIELD_KEYS.context), Value::from_serde(self.context))?;
        if let Some(backtrace) = self.backtrace {
            visitor.visit_pair(Key::from(FIELD_KEYS.backtrace), Value::from(backtrace))?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Attached {
    src_line: Option<String>,
    context: Option<JsonValue>,
    backtrace: Option<String>,
}

impl<'kvs> VisitSource<'kvs> for Attached {
    fn visit_pair(
        &mut self,
        key: Key<'kvs>,
        value: Value<'kvs>,
    ) -> std::result::Result<(), kv::Error> {
        match key.as_str() {
            k if k == FIELD_KEYS.source_line => self.src_line = Some(value.to_string()),
            k if k == FIELD_KEYS.context => {
                let context = serde_json::to_value(&value)
                    .unwrap_or_else(|_| JsonValue::String(value.to_string()));
                self.context = Some(context);
            }
            k if k == FIELD_KEYS.backtrace => self.backtrace = Some(value.to_string()),
            _ => {}
        }
        Ok(())
    }
}

/// The engine's format function: renders one record as one JSON line.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RecordEncoder {
    keys: FieldKeys,
    caller: CallerEncoding,
}

impl RecordEncoder {
    pub(crate) fn new(caller: CallerEncoding) -> Self {
        Self {
            keys: FIELD_KEYS,
            caller,
        }
    }

    pub(crate) fn write<W: Write>(&self, out: &mut W, record: &Record<'_>) -> io::Result<()> {
        self.write_at(out, record, &Utc::now())
    }

    fn write_at<W: Write>(
        &self,
        out: &mut W,
        record: &Record<'_>,
        now: &DateTime<Utc>,
    ) -> io::Result<()> {
        let mut attached = Attached::default();
        // Attached never rejects a pair.
        let _ = record.key_values().visit(&mut attached);

        let keys = &self.keys;
        let mut ser = serde_json::Serializer::new(&mut *out);
        let mut map = ser.serialize_map(None)?;
        map.serialize_entry(keys.time, &encode_time(now))?;
        map.serialize_entry(keys.level, encode_level(Severity::from_record(record)))?;
        if let Some(file) = record.file() {
            map.serialize_entry(keys.caller, &encode_caller(self.caller, file, record.line()))?;
        }
        if let Some(src_line) = &attached.src_line {
            map.serialize_entry(keys.source_line, src_line)?;
        }
        match record.args().as_str() {
            Some(message) => map.serialize_entry(keys.message, message)?,
            None => map.serialize_entry(keys.message, &record.args().to_string())?,
        }
        match &attached.context {
            Some(context) => map.serialize_entry(keys.context, context)?,
            None => map.serialize_entry(keys.context, &Map::new())?,
        }
        if let Some(backtrace) = &attached.backtrace {
            map.serialize_entry(keys.backtrace, backtrace)?;
        }
        map.end()?;
        out.write_all(b"\n")
    }
}
