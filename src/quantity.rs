use fraction::Fraction;

const VULGAR_FRACTIONS: &[(char, &str)] = &[
    ('½', "1/2"),
    ('⅓', "1/3"),
    ('⅔', "2/3"),
    ('¼', "1/4"),
    ('¾', "3/4"),
    ('⅕', "1/5"),
    ('⅛', "1/8"),
    ('⅜', "3/8"),
    ('⅝', "5/8"),
    ('⅞', "7/8"),
];

/// Denominators cooks read comfortably; anything else is shown as a decimal.
const KITCHEN_DENOMINATORS: &[u64] = &[2, 3, 4, 8];

/// Rewrites unicode vulgar fractions as ASCII, so "1½" becomes "1 1/2".
pub fn normalize_vulgar_fractions(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 4);
    for ch in text.chars() {
        match VULGAR_FRACTIONS.iter().find(|(glyph, _)| *glyph == ch) {
            Some((_, ascii)) => {
                if out.chars().last().is_some_and(|c| c.is_ascii_digit()) {
                    out.push(' ');
                }
                out.push_str(ascii);
            }
            None => out.push(ch),
        }
    }
    out
}

/// Parses a plain numeric quantity.
///
/// Accepts whole numbers ("2"), decimals ("0.5", "1,5"), fractions ("1/2")
/// and mixed numbers ("1 1/2", "1½"). Ranges, words and negative values
/// return `None`: those quantities are not summable.
pub fn parse_quantity(text: &str) -> Option<Fraction> {
    let normalized = normalize_vulgar_fractions(text.trim());
    let parts: Vec<&str> = normalized.split_whitespace().collect();
    match parts.as_slice() {
        [single] => parse_simple(single),
        [whole, frac] if frac.contains('/') && !whole.contains('/') => {
            let whole: u64 = whole.parse().ok()?;
            let frac = parse_fraction(frac)?;
            Some(Fraction::new(whole, 1u64) + frac)
        }
        _ => None,
    }
}

fn parse_simple(token: &str) -> Option<Fraction> {
    if token.contains('/') {
        return parse_fraction(token);
    }
    let token = token.replace(',', ".");
    if !token.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    let value: f64 = token.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(Fraction::from(value))
}

fn parse_fraction(token: &str) -> Option<Fraction> {
    let (numer, denom) = token.split_once('/')?;
    let numer: u64 = numer.trim().parse().ok()?;
    let denom: u64 = denom.trim().parse().ok()?;
    if denom == 0 {
        return None;
    }
    Some(Fraction::new(numer, denom))
}

/// Formats a quantity for a shopping list.
///
/// Whole values print as integers, halves/thirds/quarters/eighths as mixed
/// fractions ("1 1/2"), and anything else as a decimal with at most two
/// places.
pub fn format_quantity(quantity: Fraction) -> String {
    let (Some(&numer), Some(&denom)) = (quantity.numer(), quantity.denom()) else {
        return String::new();
    };
    if denom == 1 {
        return numer.to_string();
    }
    if KITCHEN_DENOMINATORS.contains(&denom) {
        let whole = numer / denom;
        let remainder = numer % denom;
        return if whole == 0 {
            format!("{}/{}", remainder, denom)
        } else {
            format!("{} {}/{}", whole, remainder, denom)
        };
    }
    let decimal = format!("{:.2}", numer as f64 / denom as f64);
    decimal.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_whole_number() {
        assert_eq!(parse_quantity("2"), Some(Fraction::new(2u64, 1u64)));
    }

    #[test]
    fn test_parse_mixed_fraction() {
        assert_eq!(parse_quantity("1 1/2"), Some(Fraction::new(3u64, 2u64)));
        assert_eq!(parse_quantity("1½"), Some(Fraction::new(3u64, 2u64)));
    }

    #[test]
    fn test_parse_decimal_with_comma() {
        assert_eq!(parse_quantity("2,5"), Some(Fraction::new(5u64, 2u64)));
    }

    #[test]
    fn test_non_numeric_quantities_are_rejected() {
        assert_eq!(parse_quantity("1-2"), None);
        assert_eq!(parse_quantity("to taste"), None);
        assert_eq!(parse_quantity("-1"), None);
        assert_eq!(parse_quantity("1/0"), None);
        assert_eq!(parse_quantity(""), None);
    }

    #[test]
    fn test_format_quantities() {
        assert_eq!(format_quantity(Fraction::new(6u64, 1u64)), "6");
        assert_eq!(format_quantity(Fraction::new(3u64, 2u64)), "1 1/2");
        assert_eq!(format_quantity(Fraction::new(3u64, 4u64)), "3/4");
        assert_eq!(format_quantity(Fraction::new(13u64, 10u64)), "1.3");
    }

    #[test]
    fn test_sum_of_fractions() {
        let sum = parse_quantity("1/2").unwrap() + parse_quantity("1/4").unwrap();
        assert_eq!(format_quantity(sum), "3/4");
    }
}
