use crate::error::SortError;

/// Extract the value of the field at `field_index` (zero based) from a delimited record.
///
/// A field that starts with `quote` may contain `separator` characters, a doubled `quote` inside
/// such a field stands for a single literal quote. The quotes around a quoted field are not part
/// of the returned key.
///
/// `record` must not contain the line terminator.
pub(crate) fn extract_key(record: &str, field_index: usize, separator: char, quote: char) -> Result<String, SortError> {
    let mut chars = record.chars().peekable();
    let mut current = 0;
    loop {
        let keep = current == field_index;
        let mut value = String::new();
        if chars.peek() == Some(&quote) {
            chars.next();
            let mut closed = false;
            while let Some(c) = chars.next() {
                if c == quote {
                    if chars.peek() == Some(&quote) {
                        chars.next();
                        if keep {
                            value.push(quote);
                        }
                    } else {
                        closed = true;
                        break;
                    }
                } else if keep {
                    value.push(c);
                }
            }
            if !closed {
                return Err(SortError::malformed(record, field_index, format!("unterminated quoted field {}", current)));
            }
        }

        // unquoted field, or text following the closing quote of a quoted one
        while let Some(&c) = chars.peek() {
            if c == separator {
                break;
            }
            if keep {
                value.push(c);
            }
            chars.next();
        }

        if keep {
            return Ok(value);
        }

        match chars.next() {
            Some(_) => current += 1,
            None => {
                return Err(
                    SortError::malformed(
                        record,
                        field_index,
                        format!("record has {} fields using '{}' as field separator", current + 1, separator),
                    )
                );
            }
        }
    }
}
