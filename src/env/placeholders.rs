use crate::env::EnvMap;

/// The two lookup tables a run resolves against, applied in order: ad-hoc
/// run variables first, then the environment.
#[derive(Debug, Clone, Default)]
pub struct SubstitutionContext {
    pub variables: EnvMap,
    pub environment: EnvMap,
}

impl SubstitutionContext {
    pub fn new(variables: EnvMap, environment: EnvMap) -> Self {
        Self {
            variables,
            environment,
        }
    }

    /// Snapshots the current process environment as the second layer.
    pub fn with_process_env(variables: EnvMap) -> Self {
        Self::new(variables, std::env::vars().collect())
    }
}

/// Resolves one raw setting. Blank results come back as `None` so callers
/// can branch on presence.
pub fn resolve_value(raw: Option<&str>, ctx: &SubstitutionContext) -> Option<String> {
    let raw = raw?;
    let expanded = expand_macros(&expand_macros(raw, &ctx.variables), &ctx.environment);
    if expanded.trim().is_empty() {
        None
    } else {
        Some(expanded)
    }
}

/// Replaces `$NAME` and `${NAME}` with values from `vars`. Unknown names and
/// anything that does not look like a macro are copied through untouched.
pub fn expand_macros(input: &str, vars: &EnvMap) -> String {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.char_indices().peekable();

    while let Some((start, ch)) = chars.next() {
        if ch != '$' {
            output.push(ch);
            continue;
        }

        match chars.peek() {
            Some(&(_, '{')) => {
                let body_start = start + 2;
                let Some(len) = input[body_start..]
                    .find('}')
                    .filter(|len| is_valid_key(&input[body_start..body_start + len], true))
                else {
                    output.push('$');
                    continue;
                };

                let key = &input[body_start..body_start + len];
                match vars.get(key) {
                    Some(value) => output.push_str(value),
                    None => output.push_str(&input[start..=body_start + len]),
                }

                let end = body_start + len;
                while chars.next_if(|&(idx, _)| idx <= end).is_some() {}
            }
            Some(&(_, next)) if is_start_char(next) => {
                let mut key = String::new();
                while let Some((_, c)) =
                    chars.next_if(|&(_, c)| c.is_ascii_alphanumeric() || c == '_')
                {
                    key.push(c);
                }

                match vars.get(&key) {
                    Some(value) => output.push_str(value),
                    None => {
                        output.push('$');
                        output.push_str(&key);
                    }
                }
            }
            _ => output.push('$'),
        }
    }

    output
}

fn is_valid_key(key: &str, braced: bool) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if is_start_char(c) => {}
        _ => return false,
    }

    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || (braced && ch == '.'))
}

fn is_start_char(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}
