const VOLUME_UNITS: [&str; 8] = [
    "ml", "l", "ltr", "litre", "litres", "liter", "liters", "cl",
];

const TRAILING_CONNECTORS: [&str; 3] = ["can", "bottle", "tin"];

/// Canonical matching key for an item name.
///
/// The key is only used for lookups; display names always keep the raw
/// spelling from the source.
pub fn normalize(raw: &str) -> String {
    let mut current = normalize_pass(raw);
    // Every pass that changes the key shortens it or turns a dot into a
    // space, so the fixpoint is reached within a pass per byte.
    for _ in 0..=current.len() {
        let next = normalize_pass(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

pub fn tokens(normalized: &str) -> impl Iterator<Item = &str> {
    normalized.split_whitespace()
}

fn normalize_pass(value: &str) -> String {
    let lowered = value.to_lowercase();
    let without_groups = strip_parenthesized(&lowered);

    let mut spaced = String::with_capacity(without_groups.len());
    for character in without_groups.chars() {
        if character.is_alphanumeric() || character == '.' {
            spaced.push(character);
        } else {
            spaced.push(' ');
        }
    }

    let mut words: Vec<&str> = Vec::new();
    for token in spaced.split_whitespace() {
        if is_decimal_number(token) || is_volume_token(token) {
            words.push(token);
            continue;
        }
        for part in token.split('.') {
            if !part.is_empty() {
                words.push(part);
            }
        }
    }

    let mut kept: Vec<&str> = Vec::new();
    let mut index = 0;
    while index < words.len() {
        let word = words[index];
        if is_volume_token(word) {
            index += 1;
            continue;
        }
        if is_decimal_number(word)
            && let Some(next) = words.get(index + 1)
            && VOLUME_UNITS.contains(next)
        {
            index += 2;
            continue;
        }
        if is_decimal_number(word) && word.contains('.') {
            kept.extend(word.split('.').filter(|part| !part.is_empty()));
        } else {
            kept.push(word);
        }
        index += 1;
    }

    while kept.len() > 1 {
        let Some(last) = kept.last() else {
            break;
        };
        if !TRAILING_CONNECTORS.contains(last) {
            break;
        }
        kept.pop();
    }

    kept.join(" ")
}

fn strip_parenthesized(value: &str) -> String {
    let mut output = String::with_capacity(value.len());
    let mut depth = 0usize;
    for character in value.chars() {
        match character {
            '(' => {
                depth += 1;
                output.push(' ');
            }
            ')' if depth > 0 => {
                depth -= 1;
            }
            _ if depth > 0 => {}
            _ => output.push(character),
        }
    }
    output
}

fn is_decimal_number(token: &str) -> bool {
    let mut parts = token.split('.');
    let whole = parts.next().unwrap_or_default();
    let fractional = parts.next();
    if parts.next().is_some() || whole.is_empty() {
        return false;
    }
    if !whole.chars().all(|character| character.is_ascii_digit()) {
        return false;
    }
    match fractional {
        Some(digits) => {
            !digits.is_empty() && digits.chars().all(|character| character.is_ascii_digit())
        }
        None => true,
    }
}

fn is_volume_token(token: &str) -> bool {
    let split_at = token
        .char_indices()
        .find(|(_, character)| !(character.is_ascii_digit() || *character == '.'))
        .map(|(index, _)| index);
    let Some(split_at) = split_at else {
        return false;
    };
    if split_at == 0 {
        return false;
    }
    let (number, unit) = token.split_at(split_at);
    is_decimal_number(number) && VOLUME_UNITS.contains(&unit)
}
