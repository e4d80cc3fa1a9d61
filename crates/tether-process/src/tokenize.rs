/// Splits `line` on runs of spaces.
///
/// See [`tokenize_with`].
pub fn tokenize(line: &str, max_splits: Option<usize>) -> Vec<String> {
    tokenize_with(line, max_splits, ' ')
}

/// Splits `line` on `separator`, collapsing consecutive separators into a
/// single boundary.
///
/// `max_splits` bounds the number of boundaries consumed (`None` is
/// unlimited). Once the bound is reached every remaining character,
/// separators included, belongs to the last field, so a free-form command
/// line survives intact. `Some(0)` yields no fields at all.
pub fn tokenize_with(line: &str, max_splits: Option<usize>, separator: char) -> Vec<String> {
    if max_splits == Some(0) {
        return Vec::new();
    }

    let mut fields = vec![String::new()];
    let mut splits = 0usize;
    let mut last: Option<char> = None;

    for c in line.chars() {
        let may_split = max_splits.is_none_or(|max| splits < max);
        if c == separator && may_split {
            if last != Some(separator) {
                splits += 1;
                fields.push(String::new());
            }
            last = Some(c);
            continue;
        }

        if let Some(field) = fields.last_mut() {
            field.push(c);
        }
        last = Some(c);
    }

    fields
}
