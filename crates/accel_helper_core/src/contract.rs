use std::collections::HashMap;

use crate::error::HelperError;

pub const KEY_TYPE: &str = "type";
pub const KEY_FILE: &str = "file";
pub const KEY_START: &str = "start";
pub const KEY_SIZE: &str = "size";
pub const KEY_SRPATH: &str = "srpath";
pub const KEY_ACCESS_KEY_ID: &str = "accessKeyId";
pub const KEY_ACCESS_KEY_SECRET: &str = "accessKeySecret";
pub const KEY_ENDPOINT: &str = "endpoint";
pub const KEY_BUCKET: &str = "bucket";
pub const KEY_NAS_FILE_PATH: &str = "nasFilePath";

pub const SUCCESS_MARKER: &str = "success";

/// The single operation a request performs, chosen by its `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Dump,
    OssUpload,
    NasUpload,
    Size,
    RangeRead,
}

impl Operation {
    /// Unknown or absent types fall through to a range read.
    pub fn from_type(value: Option<&str>) -> Self {
        match value {
            Some("dump") => Self::Dump,
            Some("ossUpload") => Self::OssUpload,
            Some("nasUpload") => Self::NasUpload,
            Some("size") => Self::Size,
            _ => Self::RangeRead,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dump => "dump",
            Self::OssUpload => "ossUpload",
            Self::NasUpload => "nasUpload",
            Self::Size => "size",
            Self::RangeRead => "range",
        }
    }
}

/// Decoded request payload. No key is mandatory at parse time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestFields {
    values: HashMap<String, String>,
}

impl RequestFields {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn require(&self, key: &'static str) -> Result<&str, HelperError> {
        self.get(key).ok_or(HelperError::MissingField(key))
    }

    pub fn operation(&self) -> Operation {
        Operation::from_type(self.get(KEY_TYPE))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Byte offset of a range read.
    pub fn start_offset(&self) -> Result<i64, HelperError> {
        let raw = self.require(KEY_START)?;
        raw.parse::<i64>()
            .map_err(|error| HelperError::invalid_field(KEY_START, raw, error))
    }

    /// Byte count of a range read.
    pub fn range_size(&self) -> Result<i32, HelperError> {
        let raw = self.require(KEY_SIZE)?;
        raw.parse::<i32>()
            .map_err(|error| HelperError::invalid_field(KEY_SIZE, raw, error))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RequestFields {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// Decodes `key=value;key=value` text. Malformed items are dropped silently.
///
/// Only the first two `=`-separated pieces of an item are used, so
/// `a=b=c` maps `a` to `b`.
pub fn parse_body(body: &str) -> RequestFields {
    let mut values = HashMap::new();
    for item in body.split(';') {
        let mut pieces = item.split('=');
        let key = pieces.next().unwrap_or_default();
        if key.is_empty() {
            continue;
        }
        let value = pieces.next().unwrap_or_default();
        values.insert(key.to_string(), value.to_string());
    }
    RequestFields { values }
}

/// Encodes pairs into the body format understood by [`parse_body`].
pub fn request_body(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(";")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pairs_and_bare_keys() {
        let fields = parse_body("a=1;b=2;c");

        assert_eq!(fields.len(), 3);
        assert_eq!(fields.get("a"), Some("1"));
        assert_eq!(fields.get("b"), Some("2"));
        assert_eq!(fields.get("c"), Some(""));
    }

    #[test]
    fn empty_body_yields_no_fields() {
        assert!(parse_body("").is_empty());
    }

    #[test]
    fn empty_segments_and_keys_are_skipped() {
        let fields = parse_body(";;a=1");
        assert_eq!(fields, RequestFields::from_iter([("a", "1")]));

        let fields = parse_body("=orphan;b=2;");
        assert_eq!(fields, RequestFields::from_iter([("b", "2")]));
    }

    #[test]
    fn last_duplicate_wins_and_extra_pieces_are_ignored() {
        let fields = parse_body("a=1;a=2;b=x=y;c=");

        assert_eq!(fields.get("a"), Some("2"));
        assert_eq!(fields.get("b"), Some("x"));
        assert_eq!(fields.get("c"), Some(""));
    }

    #[test]
    fn unknown_or_missing_type_selects_range_read() {
        assert_eq!(parse_body("type=size").operation(), Operation::Size);
        assert_eq!(parse_body("type=dump").operation(), Operation::Dump);
        assert_eq!(
            parse_body("type=ossUpload").operation(),
            Operation::OssUpload
        );
        assert_eq!(
            parse_body("type=nasUpload").operation(),
            Operation::NasUpload
        );
        assert_eq!(parse_body("type=DUMP").operation(), Operation::RangeRead);
        assert_eq!(parse_body("file=/tmp/x").operation(), Operation::RangeRead);
    }

    #[test]
    fn range_fields_reject_missing_and_malformed_numbers() {
        let fields = parse_body("start=12;size=abc");
        assert_eq!(fields.start_offset().expect("start should parse"), 12);

        let error = fields.range_size().expect_err("size should fail");
        assert!(error.to_string().contains("invalid `size` value \"abc\""));

        let error = parse_body("size=3")
            .start_offset()
            .expect_err("missing start should fail");
        assert_eq!(error.to_string(), "missing request field `start`");
    }

    #[test]
    fn size_must_fit_in_32_bits() {
        let fields = parse_body("size=4294967296");
        assert!(fields.range_size().is_err());
    }

    #[test]
    fn request_body_round_trips_through_parser() {
        let body = request_body(&[("type", "size"), ("file", "/tmp/srctl.tar.gz")]);
        assert_eq!(body, "type=size;file=/tmp/srctl.tar.gz");
        assert_eq!(parse_body(&body).get(KEY_FILE), Some("/tmp/srctl.tar.gz"));
    }
}
