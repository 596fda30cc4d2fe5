use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};
use serde_json::Value;
use std::fmt::Debug;
use std::io;

/// A single submitted JSON value awaiting persistence.
///
/// No schema is enforced; any value accepted by `serde_json` is a record.
pub type Record = Value;

/// Convert any serializable value into a [`Record`].
///
/// Values whose `Serialize` impl fails (non-string map keys, custom impls
/// that return errors) are kept as their `Debug` representation instead of
/// being rejected.
pub fn to_record<T>(value: &T) -> Record
where
    T: Serialize + Debug + ?Sized,
{
    serde_json::to_value(value).unwrap_or_else(|_| Value::String(format!("{:?}", value)))
}

/// Single-line JSON with a space after every `,` and `:`, the layout
/// Python's `json.dumps` produces by default.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

/// Encode a batch as newline-delimited JSON.
///
/// Every record becomes one line (`{"id": 1}`) followed by `\n`, including
/// the last one, so each line can be parsed independently. Fails only if a
/// record's `Serialize` impl fails; [`Record`] values always encode.
pub fn encode_ndjson<T: Serialize>(records: &[T]) -> Result<Bytes, serde_json::Error> {
    let mut buf = BytesMut::with_capacity(records.len() * 64).writer();
    for record in records {
        let mut ser = Serializer::with_formatter(&mut buf, SpacedFormatter);
        record.serialize(&mut ser)?;
        buf.get_mut().put_u8(b'\n');
    }
    Ok(buf.into_inner().freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::ser::{Error as _, Serializer};
    use serde_json::json;
    use std::collections::BTreeMap;

    #[derive(Debug)]
    struct Opaque(u32);

    impl Serialize for Opaque {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("not representable"))
        }
    }

    #[test]
    fn ndjson_has_one_line_per_record_and_trailing_newline() {
        let records = vec![json!({"id": 1}), json!({"id": 2}), json!({"id": 3})];
        let blob = encode_ndjson(&records).unwrap();
        assert_eq!(&blob[..], b"{\"id\": 1}\n{\"id\": 2}\n{\"id\": 3}\n");
    }

    #[test]
    fn separators_are_spaced_inside_nested_values() {
        let records = vec![json!({"a": [1, 2, {"b": null}], "c": "x,y:z"})];
        let blob = encode_ndjson(&records).unwrap();
        assert_eq!(
            &blob[..],
            b"{\"a\": [1, 2, {\"b\": null}], \"c\": \"x,y:z\"}\n"
        );
    }

    #[test]
    fn empty_containers_stay_compact() {
        let blob = encode_ndjson(&[json!({}), json!([])]).unwrap();
        assert_eq!(&blob[..], b"{}\n[]\n");
    }

    #[test]
    fn empty_batch_encodes_to_nothing() {
        assert!(encode_ndjson::<Record>(&[]).unwrap().is_empty());
    }

    #[test]
    fn failing_record_fails_the_whole_batch() {
        assert!(encode_ndjson(&[Opaque(1)]).is_err());
    }

    #[test]
    fn lines_parse_back_to_submitted_values() {
        let records = vec![
            json!({"name": "Steve", "tags": ["a", "b"], "nested": {"x": 1.5}}),
            json!("plain string with\nnewline"),
            json!(null),
            json!([1, 2, 3]),
        ];
        let blob = encode_ndjson(&records).unwrap();
        let text = std::str::from_utf8(&blob).unwrap();
        let parsed: Vec<Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(parsed, records);
    }

    #[test]
    fn unserializable_values_are_coerced_to_strings() {
        let record = to_record(&Opaque(7));
        assert_eq!(record, Value::String("Opaque(7)".to_string()));
    }

    #[test]
    fn non_string_map_keys_fall_back_to_debug_string() {
        let mut map = BTreeMap::new();
        map.insert((1, 2), "pair");
        let record = to_record(&map);
        assert!(record.is_string());
        assert!(record.as_str().unwrap().contains("pair"));
    }

    #[test]
    fn serializable_values_pass_through() {
        #[derive(Debug, Serialize)]
        struct Event {
            id: u32,
            kind: &'static str,
        }
        let record = to_record(&Event { id: 4, kind: "click" });
        assert_eq!(record, json!({"id": 4, "kind": "click"}));
    }
}
