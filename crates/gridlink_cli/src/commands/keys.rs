//! Key flattening commands.

use super::Format;
use gridlink_codec::Value;

/// Parses one `<kind>:<value>` segment.
///
/// Kinds follow the flattened tags: `n` null, `b` bool, `i` integer, `d`
/// float, `s` text and `x` hex bytes.
pub fn parse_segment(segment: &str) -> Result<Value, String> {
    let (kind, raw) = segment
        .split_once(':')
        .ok_or_else(|| format!("segment `{segment}` is not <kind>:<value>"))?;
    let invalid = |e: &dyn std::fmt::Display| format!("segment `{segment}`: {e}");
    match kind {
        "n" if raw.is_empty() => Ok(Value::Null),
        "n" => Err(format!("segment `{segment}`: null takes no value")),
        "b" => raw.parse().map(Value::Bool).map_err(|e| invalid(&e)),
        "i" => raw.parse().map(Value::Integer).map_err(|e| invalid(&e)),
        "d" => raw.parse().map(Value::Float).map_err(|e| invalid(&e)),
        "s" => Ok(Value::from(raw)),
        "x" => parse_hex(raw).map(Value::Bytes).ok_or_else(|| invalid(&"invalid hex")),
        other => Err(format!("segment `{segment}`: unknown kind `{other}`")),
    }
}

fn parse_hex(raw: &str) -> Option<Vec<u8>> {
    if raw.len() % 2 != 0 {
        return None;
    }
    (0..raw.len())
        .step_by(2)
        .map(|i| raw.get(i..i + 2).and_then(|pair| u8::from_str_radix(pair, 16).ok()))
        .collect()
}

/// Runs the flatten command.
pub fn flatten(segments: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let values = segments
        .iter()
        .map(|s| parse_segment(s))
        .collect::<Result<Vec<_>, _>>()?;
    println!("{}", gridlink_codec::flatten(&values)?);
    Ok(())
}

/// Runs the unflatten command.
pub fn unflatten(key: &str, format: Format) -> Result<(), Box<dyn std::error::Error>> {
    let values = gridlink_codec::unflatten(key)?;
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&values)?),
        Format::Text => {
            for (i, value) in values.iter().enumerate() {
                println!("{i:>3}  {:<5}  {value}", value.type_name());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_parse_by_kind() {
        assert_eq!(parse_segment("s:users").unwrap(), Value::from("users"));
        assert_eq!(parse_segment("i:-4").unwrap(), Value::Integer(-4));
        assert_eq!(parse_segment("b:true").unwrap(), Value::Bool(true));
        assert_eq!(parse_segment("n:").unwrap(), Value::Null);
        assert_eq!(parse_segment("x:00ab").unwrap(), Value::Bytes(vec![0x00, 0xab]));
        assert_eq!(parse_segment("s:a:b").unwrap(), Value::from("a:b"));
    }

    #[test]
    fn malformed_segments_are_rejected() {
        assert!(parse_segment("users").is_err());
        assert!(parse_segment("q:1").is_err());
        assert!(parse_segment("i:one").is_err());
        assert!(parse_segment("x:abc").is_err());
        assert!(parse_segment("n:x").is_err());
    }
}
