//! `${key}` placeholder resolution.
//!
//! Placeholders resolve against the store at read time and resolve
//! recursively. Unknown keys and unterminated placeholders are kept verbatim;
//! `$${` produces a literal `${`.

use crate::accessor::AccessError;

/// Resolves every placeholder in `text`, which belongs to `key`.
pub(crate) fn interpolate<L>(key: &str, text: &str, lookup: &L) -> Result<String, AccessError>
where
    L: Fn(&str) -> Option<String>,
{
    let mut resolving = vec![key.to_owned()];
    substitute(text, lookup, &mut resolving, key)
}

fn substitute<L>(
    text: &str,
    lookup: &L,
    resolving: &mut Vec<String>,
    origin: &str,
) -> Result<String, AccessError>
where
    L: Fn(&str) -> Option<String>,
{
    let mut output = String::with_capacity(text.len());
    let mut rest = text;
    while let Some((before, after)) = rest.split_once('$') {
        output.push_str(before);
        if let Some(escaped) = after.strip_prefix("${") {
            output.push_str("${");
            rest = escaped;
            continue;
        }
        if let Some((name, remainder)) = after
            .strip_prefix('{')
            .and_then(|body| body.split_once('}'))
        {
            match resolve(name, lookup, resolving, origin)? {
                Some(value) => output.push_str(&value),
                None => {
                    output.push_str("${");
                    output.push_str(name);
                    output.push('}');
                }
            }
            rest = remainder;
            continue;
        }
        output.push('$');
        rest = after;
    }
    output.push_str(rest);
    Ok(output)
}

fn resolve<L>(
    name: &str,
    lookup: &L,
    resolving: &mut Vec<String>,
    origin: &str,
) -> Result<Option<String>, AccessError>
where
    L: Fn(&str) -> Option<String>,
{
    if resolving.iter().any(|key| key == name) {
        return Err(AccessError::CyclicReference {
            key: origin.to_owned(),
            reference: name.to_owned(),
        });
    }
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    resolving.push(name.to_owned());
    let value = substitute(&raw, lookup, resolving, origin)?;
    resolving.pop();
    Ok(Some(value))
}
