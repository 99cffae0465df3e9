/// Replace `${ENV_VAR}` placeholders in the raw config text.
///
/// Unresolvable or malformed placeholders are left untouched, so secrets can
/// be referenced without the loader hard-failing on a missing variable.
pub fn substitute_env(input: &str) -> String {
    substitute_with(input, |name| std::env::var(name).ok())
}

fn substitute_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 2..];
        match tail.find('}') {
            Some(end) if end > 0 => {
                let name = &tail[..end];
                match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push_str("${");
                        out.push_str(name);
                        out.push('}');
                    },
                }
                rest = &tail[end + 1..];
            },
            _ => {
                // No closing brace (or empty name) — emit literally and move on.
                out.push_str("${");
                rest = tail;
            },
        }
    }

    out.push_str(rest);
    out
}
