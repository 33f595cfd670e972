//! Embedded image tag extraction.
//!
//! Walks every tag of an image's embedded metadata block into a plain
//! name-to-text mapping and layers the interesting derivations on top:
//! capture timestamps and decimal-degree GPS coordinates. GPS-sourced
//! timestamps are preferred over the camera's own clock fields since
//! they are UTC-normalized at the receiver.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use exif::{Field, In, Rational, Tag, Value};

use crate::error::ExifError;

const EXIF_DATETIME: &str = "%Y:%m:%d %H:%M:%S";
const EXIF_DATE: &str = "%Y:%m:%d";

/// The embedded tag block of one image, with every primary-image tag
/// rendered to text.
pub struct ExifData {
    raw: exif::Exif,
    tags: BTreeMap<String, String>,
}

impl ExifData {
    /// Reads the embedded tag block from an image container. A file
    /// without one is an error; policy about which encodings should
    /// carry tags belongs to the caller.
    pub fn read(path: &Path) -> Result<ExifData, ExifError> {
        let file = fs::File::open(path)?;
        let mut reader = io::BufReader::new(file);
        let raw = exif::Reader::new().read_from_container(&mut reader)?;

        let tags = raw
            .fields()
            .filter(|field| field.ifd_num == In::PRIMARY)
            .map(|field| (field.tag.to_string(), render_value(field)))
            .collect();

        Ok(ExifData { raw, tags })
    }

    /// Every discovered tag as name-to-text pairs, in name order.
    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    /// Consumes the block, keeping only the rendered tag mapping.
    pub fn into_tags(self) -> BTreeMap<String, String> {
        self.tags
    }

    /// Rendered value of one tag by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.tags.get(name).map(String::as_str)
    }

    /// When the image was taken. GPS-derived time wins over the
    /// camera's capture timestamp, which in turn wins over the generic
    /// metadata timestamp; fails only when none of them parses.
    pub fn date_taken(&self) -> Result<DateTime<Utc>, ExifError> {
        if let Ok(stamp) = self.gps_datetime() {
            return Ok(stamp);
        }

        self.capture_datetime()
    }

    /// Capture time assembled from the GPS receiver's clock. When the
    /// GPS date tag is absent the date portion of the capture timestamp
    /// stands in for it.
    pub fn gps_datetime(&self) -> Result<DateTime<Utc>, ExifError> {
        let stamp = self
            .field(Tag::GPSTimeStamp)
            .ok_or_else(|| missing(Tag::GPSTimeStamp))?;
        let parts = rationals(stamp, 3)?;
        let (hour, minute, second) = (whole(parts[0]), whole(parts[1]), whole(parts[2]));
        let time = NaiveTime::from_hms_opt(hour, minute, second)
            .ok_or_else(|| ExifError::Malformed(format!("GPSTimeStamp {hour}:{minute}:{second}")))?;

        let date = match self.field(Tag::GPSDateStamp) {
            Some(field) => NaiveDate::parse_from_str(render_value(field).trim(), EXIF_DATE)
                .map_err(|err| ExifError::Malformed(format!("GPSDateStamp: {err}")))?,
            None => self.capture_datetime()?.date_naive(),
        };

        Ok(date.and_time(time).and_utc())
    }

    /// Decimal-degree latitude and longitude. Southern and western
    /// references negate their axis.
    pub fn coordinates(&self) -> Result<(f64, f64), ExifError> {
        let latitude = self.coordinate(Tag::GPSLatitude, Tag::GPSLatitudeRef, "S")?;
        let longitude = self.coordinate(Tag::GPSLongitude, Tag::GPSLongitudeRef, "W")?;
        Ok((latitude, longitude))
    }

    fn coordinate(&self, value_tag: Tag, ref_tag: Tag, negative: &str) -> Result<f64, ExifError> {
        let field = self.field(value_tag).ok_or_else(|| missing(value_tag))?;
        let magnitude = angle(rationals(field, 3)?);

        let reference = self
            .field(ref_tag)
            .map(render_value)
            .ok_or_else(|| missing(ref_tag))?;

        if reference.eq_ignore_ascii_case(negative) {
            Ok(-magnitude)
        } else {
            Ok(magnitude)
        }
    }

    fn capture_datetime(&self) -> Result<DateTime<Utc>, ExifError> {
        let field = self
            .field(Tag::DateTimeOriginal)
            .or_else(|| self.field(Tag::DateTime))
            .ok_or_else(|| missing(Tag::DateTimeOriginal))?;

        parse_datetime(&render_value(field))
    }

    fn field(&self, tag: Tag) -> Option<&Field> {
        self.raw.get_field(tag, In::PRIMARY)
    }
}

/// Renders a tag value to text. ASCII values are decoded directly so
/// the mapping carries `Make: LGE` rather than a quoted form; anything
/// else uses the tag's own display rendering.
fn render_value(field: &Field) -> String {
    match &field.value {
        Value::Ascii(lines) => lines
            .iter()
            .map(|line| String::from_utf8_lossy(line))
            .collect::<Vec<_>>()
            .join(" ")
            .trim_matches(char::from(0))
            .trim()
            .to_string(),
        _ => field.display_value().to_string(),
    }
}

fn parse_datetime(text: &str) -> Result<DateTime<Utc>, ExifError> {
    NaiveDateTime::parse_from_str(text.trim(), EXIF_DATETIME)
        .map(|naive| naive.and_utc())
        .map_err(|err| ExifError::Malformed(format!("timestamp \"{text}\": {err}")))
}

fn rationals(field: &Field, expect: usize) -> Result<&[Rational], ExifError> {
    match &field.value {
        Value::Rational(parts) if parts.len() >= expect => Ok(parts),
        _ => Err(ExifError::Malformed(format!(
            "{} is not a {expect}-part rational",
            field.tag
        ))),
    }
}

fn angle(parts: &[Rational]) -> f64 {
    parts[0].to_f64() + parts[1].to_f64() / 60.0 + parts[2].to_f64() / 3600.0
}

fn whole(part: Rational) -> u32 {
    if part.denom == 0 {
        0
    } else {
        part.num / part.denom
    }
}

fn missing(tag: Tag) -> ExifError {
    ExifError::MissingTag(tag.to_string())
}
