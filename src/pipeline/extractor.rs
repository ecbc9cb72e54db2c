use exif::{Context, Field, In, Reader, Value};
use serde_json::{json, Map, Number, Value as Json};
use std::io::Cursor;

use super::types::ExifRecord;

/// A metadata namespace (IFD) that whitelisted fields are resolved against.
/// Namespaces are tried in the order given; the first one holding a non-empty
/// value for a field name wins.
pub struct Namespace {
    pub label: &'static str,
    contains: fn(&Field) -> bool,
}

impl Namespace {
    /// First non-empty value this namespace holds for `name`.
    fn resolve(&self, fields: &[&Field], name: &str) -> Option<Json> {
        let alias = legacy_alias(name);
        fields
            .iter()
            .filter(|f| {
                if !(self.contains)(f) {
                    return false;
                }
                let tag_name = f.tag.to_string();
                tag_name == name || Some(tag_name.as_str()) == alias
            })
            .find_map(|f| value_to_json(&f.value))
    }
}

/// Whitelists predate EXIF 2.3 renames; map the old field names onto the
/// names the parser reports.
fn legacy_alias(name: &str) -> Option<&'static str> {
    match name {
        "ISOSpeedRatings" => Some("PhotographicSensitivity"),
        _ => None,
    }
}

fn in_primary(field: &Field) -> bool {
    field.ifd_num == In::PRIMARY && field.tag.context() == Context::Tiff
}

fn in_capture(field: &Field) -> bool {
    field.tag.context() == Context::Exif
}

fn in_interop(field: &Field) -> bool {
    field.tag.context() == Context::Interop
}

/// Primary image IFD, then capture parameters, then interoperability.
pub const NAMESPACE_PRIORITY: [Namespace; 3] = [
    Namespace {
        label: "primary",
        contains: in_primary,
    },
    Namespace {
        label: "capture",
        contains: in_capture,
    },
    Namespace {
        label: "interop",
        contains: in_interop,
    },
];

/// Resolve one field name against an ordered namespace list, first non-empty
/// value wins. A namespace that holds the tag with an empty value does not
/// shadow a later namespace.
pub fn lookup_field(fields: &[&Field], namespaces: &[Namespace], name: &str) -> Option<Json> {
    for namespace in namespaces {
        if let Some(value) = namespace.resolve(fields, name) {
            tracing::trace!(namespace = namespace.label, field = name, "resolved field");
            return Some(value);
        }
    }
    None
}

/// Build the record for one file's raw bytes. Parse failures produce an
/// error-flagged record rather than aborting the batch.
pub fn extract_record(buf: &[u8], whitelist: &[String]) -> ExifRecord {
    let exif = match Reader::new().read_from_container(&mut Cursor::new(buf)) {
        Ok(exif) => exif,
        Err(err) => {
            return ExifRecord::parse_error(format!("Could not read EXIF: {err}"));
        }
    };

    let fields: Vec<&Field> = exif.fields().collect();
    let mut extracted = Map::new();
    for name in whitelist {
        if let Some(value) = lookup_field(&fields, &NAMESPACE_PRIORITY, name) {
            extracted.insert(name.clone(), value);
        }
    }
    ExifRecord::from_fields(extracted)
}

/// Convert an EXIF value into the JSON shape the analysis server consumes:
/// strings stay strings, integral values become numbers, rationals become
/// `[numerator, denominator]` pairs. Empty values map to `None`.
fn value_to_json(value: &Value) -> Option<Json> {
    match value {
        Value::Ascii(segments) => {
            let text = segments
                .iter()
                .map(|s| String::from_utf8_lossy(s))
                .collect::<Vec<_>>()
                .join(" ");
            let text = text.trim_end_matches('\0').trim();
            if text.is_empty() {
                None
            } else {
                Some(Json::String(text.to_string()))
            }
        }
        Value::Byte(v) => unsigned_to_json(v.iter().map(|&n| u64::from(n))),
        Value::Short(v) => unsigned_to_json(v.iter().map(|&n| u64::from(n))),
        Value::Long(v) => unsigned_to_json(v.iter().map(|&n| u64::from(n))),
        Value::SByte(v) => signed_to_json(v.iter().map(|&n| i64::from(n))),
        Value::SShort(v) => signed_to_json(v.iter().map(|&n| i64::from(n))),
        Value::SLong(v) => signed_to_json(v.iter().map(|&n| i64::from(n))),
        Value::Rational(v) => {
            pairs_to_json(v.iter().map(|r| json!([r.num, r.denom])).collect())
        }
        Value::SRational(v) => {
            pairs_to_json(v.iter().map(|r| json!([r.num, r.denom])).collect())
        }
        Value::Float(v) => floats_to_json(v.iter().map(|&n| f64::from(n))),
        Value::Double(v) => floats_to_json(v.iter().copied()),
        Value::Undefined(bytes, _) => {
            let trimmed: Vec<u8> = bytes.iter().copied().filter(|&b| b != 0).collect();
            if !trimmed.is_empty() && trimmed.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
                Some(Json::String(String::from_utf8_lossy(&trimmed).into_owned()))
            } else {
                None
            }
        }
        Value::Unknown(..) => None,
    }
}

fn unsigned_to_json(values: impl Iterator<Item = u64>) -> Option<Json> {
    let numbers: Vec<Json> = values.map(|n| Json::Number(Number::from(n))).collect();
    scalar_or_array(numbers)
}

fn signed_to_json(values: impl Iterator<Item = i64>) -> Option<Json> {
    let numbers: Vec<Json> = values.map(|n| Json::Number(Number::from(n))).collect();
    scalar_or_array(numbers)
}

fn floats_to_json(values: impl Iterator<Item = f64>) -> Option<Json> {
    let numbers: Vec<Json> = values
        .filter_map(Number::from_f64)
        .map(Json::Number)
        .collect();
    scalar_or_array(numbers)
}

fn pairs_to_json(pairs: Vec<Json>) -> Option<Json> {
    match pairs.len() {
        0 => None,
        1 => pairs.into_iter().next(),
        _ => Some(Json::Array(pairs)),
    }
}

fn scalar_or_array(mut numbers: Vec<Json>) -> Option<Json> {
    match numbers.len() {
        0 => None,
        1 => numbers.pop(),
        _ => Some(Json::Array(numbers)),
    }
}


#[cfg(test)]
mod tests {
    use super::testutil::{jpeg_with_exif, jpeg_without_exif};
    use super::*;
    use exif::{Tag, Value};

    fn ascii(text: &str) -> Value {
        Value::Ascii(vec![text.as_bytes().to_vec()])
    }

    fn whitelist(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn extracts_whitelisted_fields_from_primary_ifd() {
        let fields = [Field {
            tag: Tag::Make,
            ifd_num: In::PRIMARY,
            value: ascii("NIKON CORPORATION"),
        }];
        let jpeg = jpeg_with_exif(&fields);

        let record = extract_record(&jpeg, &whitelist(&["Make", "Model"]));
        assert!(!record.is_error());
        assert_eq!(record.fields["Make"], "NIKON CORPORATION");
        // Model is absent from every namespace: omitted, not an error.
        assert!(record.fields.get("Model").is_none());
    }

    #[test]
    fn falls_back_to_capture_namespace() {
        // LensModel lives in the capture-parameters IFD only; resolving it
        // proves the second lookup source is reached after the primary one
        // comes up empty.
        let fields = [
            Field {
                tag: Tag::Make,
                ifd_num: In::PRIMARY,
                value: ascii("SONY"),
            },
            Field {
                tag: Tag::LensModel,
                ifd_num: In::PRIMARY,
                value: ascii("FE 35mm F1.8"),
            },
        ];
        let jpeg = jpeg_with_exif(&fields);

        let record = extract_record(&jpeg, &whitelist(&["LensModel"]));
        assert_eq!(record.fields["LensModel"], "FE 35mm F1.8");
    }

    #[test]
    fn namespace_order_is_first_match_wins() {
        let primary = Field {
            tag: Tag::Make,
            ifd_num: In::PRIMARY,
            value: ascii("PRIMARY"),
        };
        let thumbnail = Field {
            tag: Tag::Make,
            ifd_num: In::THUMBNAIL,
            value: ascii("THUMBNAIL"),
        };
        let fields = [&thumbnail, &primary];

        fn any_tiff(field: &Field) -> bool {
            field.tag.context() == Context::Tiff
        }
        let loose = Namespace {
            label: "any-tiff",
            contains: any_tiff,
        };
        let strict = Namespace {
            label: "primary",
            contains: in_primary,
        };

        // Strict source first: the primary value wins even though the
        // thumbnail field appears earlier in the field list.
        let value = lookup_field(&fields, &[strict, loose], "Make").unwrap();
        assert_eq!(value, "PRIMARY");

        // Reversed priority resolves from the loose source instead.
        let strict = Namespace {
            label: "primary",
            contains: in_primary,
        };
        let loose = Namespace {
            label: "any-tiff",
            contains: any_tiff,
        };
        let value = lookup_field(&fields, &[loose, strict], "Make").unwrap();
        assert_eq!(value, "THUMBNAIL");
    }

    #[test]
    fn empty_value_does_not_shadow_later_namespace() {
        let empty_primary = Field {
            tag: Tag::Make,
            ifd_num: In::PRIMARY,
            value: ascii(""),
        };
        let thumbnail = Field {
            tag: Tag::Make,
            ifd_num: In::THUMBNAIL,
            value: ascii("FALLBACK"),
        };
        let fields = [&empty_primary, &thumbnail];

        fn any_tiff(field: &Field) -> bool {
            field.tag.context() == Context::Tiff
        }
        let sources = [
            Namespace {
                label: "primary",
                contains: in_primary,
            },
            Namespace {
                label: "any-tiff",
                contains: any_tiff,
            },
        ];
        let value = lookup_field(&fields, &sources, "Make").unwrap();
        assert_eq!(value, "FALLBACK");
    }

    #[test]
    fn parse_failure_yields_error_record() {
        let record = extract_record(&jpeg_without_exif(), &whitelist(&["Make"]));
        assert!(record.is_error());
        assert!(record
            .error
            .as_deref()
            .unwrap()
            .starts_with("Could not read EXIF:"));
        assert!(record.fields.is_empty());
    }

    #[test]
    fn rationals_serialize_as_numerator_denominator_pairs() {
        let fields = [
            Field {
                tag: Tag::FNumber,
                ifd_num: In::PRIMARY,
                value: Value::Rational(vec![exif::Rational { num: 28, denom: 10 }]),
            },
            Field {
                tag: Tag::PhotographicSensitivity,
                ifd_num: In::PRIMARY,
                value: Value::Short(vec![400]),
            },
        ];
        let jpeg = jpeg_with_exif(&fields);

        let names = whitelist(&["FNumber", "PhotographicSensitivity"]);
        let record = extract_record(&jpeg, &names);
        assert_eq!(record.fields["FNumber"], json!([28, 10]));
        assert_eq!(record.fields["PhotographicSensitivity"], json!(400));
    }

    #[test]
    fn legacy_field_names_resolve_through_aliases() {
        let fields = [Field {
            tag: Tag::PhotographicSensitivity,
            ifd_num: In::PRIMARY,
            value: Value::Short(vec![800]),
        }];
        let jpeg = jpeg_with_exif(&fields);

        // The record is keyed by the whitelist's own name, not the parser's.
        let record = extract_record(&jpeg, &whitelist(&["ISOSpeedRatings"]));
        assert_eq!(record.fields["ISOSpeedRatings"], json!(800));
    }

    #[test]
    fn undefined_bytes_become_text_when_printable() {
        assert_eq!(
            value_to_json(&Value::Undefined(b"0231".to_vec(), 0)),
            Some(Json::String("0231".to_string()))
        );
        assert_eq!(value_to_json(&Value::Undefined(vec![0, 1, 2, 3], 0)), None);
        assert_eq!(value_to_json(&Value::Undefined(Vec::new(), 0)), None);
    }

    #[test]
    fn multi_valued_numbers_become_arrays() {
        assert_eq!(
            value_to_json(&Value::Short(vec![1, 2, 3])),
            Some(json!([1, 2, 3]))
        );
        assert_eq!(value_to_json(&Value::Short(Vec::new())), None);
        assert_eq!(
            value_to_json(&Value::Rational(vec![
                exif::Rational { num: 1, denom: 2 },
                exif::Rational { num: 3, denom: 4 },
            ])),
            Some(json!([[1, 2], [3, 4]]))
        );
    }
}
